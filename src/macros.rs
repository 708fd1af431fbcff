/// Compile a regex literal once and hand out a `&'static Regex`.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).expect("regex literal must compile"));
        &*RE
    }};
}

/// Return early with a selection validation error built from a format string.
macro_rules! bail_selection {
    ($($arg:tt)*) => {
        return Err($crate::error::EngineError::selection(format!($($arg)*)))
    };
}
