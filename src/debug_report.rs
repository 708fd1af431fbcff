use slicewise::{
    ComputationStatus, ConsistencyDetail, FeatureStatus, ListComputationResponse, SingleComputationResponse, Slice,
};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_consistency(response: &SingleComputationResponse<bool, ConsistencyDetail>, color: bool) {
    let palette = ansi::Palette::new(color);
    print_header("Consistency", &response.status, &palette);

    println!("\n{}", palette.paint("━━━ Results ━━━", ansi::GRAY));
    if response.results.is_empty() {
        println!("{}", palette.dim("  No results"));
    }
    for entry in &response.results {
        let verdict = if entry.result {
            palette.paint("consistent", ansi::GREEN)
        } else {
            palette.paint("inconsistent", ansi::RED)
        };
        println!("  {} {}", palette.bold(format!("#{}", entry.id)), verdict);
        print_slices(&entry.slices, &palette);
        for split in response.details.get(&entry.id).into_iter().flatten() {
            if let Some(example) = &split.detail.example {
                println!("      {} {}", palette.paint("example", ansi::GREEN), palette.dim(format!("[{}] {}", split.slice, example.join(" "))));
            }
            if let Some(explanation) = &split.detail.explanation {
                println!("      {} {}", palette.paint("conflict", ansi::RED), palette.dim(format!("[{}] {}", split.slice, explanation.join(", "))));
            }
        }
    }

    print_footer(&response.status, &palette);
}

pub fn print_buildability(response: &ListComputationResponse<String, FeatureStatus>, color: bool) {
    let palette = ansi::Palette::new(color);
    print_header("Buildability", &response.status, &palette);

    println!("\n{}", palette.paint("━━━ Results ━━━", ansi::GRAY));
    if response.results.is_empty() {
        println!("{}", palette.dim("  No features"));
    }
    for element in &response.results {
        println!(
            "  {} {}",
            palette.dim(format!("{:>3}.", element.element.id)),
            palette.bold(&element.element.content)
        );
        for entry in &element.results {
            let color = match entry.result {
                FeatureStatus::Mandatory => ansi::GREEN,
                FeatureStatus::Optional => ansi::BLUE,
                FeatureStatus::Forbidden => ansi::RED,
            };
            println!("      {} {}", palette.paint(entry.result.to_string(), color), palette.dim(slice_label(&entry.slices)));
        }
    }

    print_footer(&response.status, &palette);
}

fn print_header(name: &str, status: &ComputationStatus, palette: &ansi::Palette) {
    println!(
        "\n{}",
        palette.bold(palette.paint(format!("⚙  {name}: rule file \"{}\" (job {})", status.rule_file_id, status.job_id), ansi::CYAN))
    );

    println!("\n{}", palette.paint("━━━ Slice Sets ━━━", ansi::GRAY));
    if status.slice_sets.is_empty() {
        println!("{}", palette.dim("  No slice sets computed"));
    }
    for (idx, set) in status.slice_sets.iter().enumerate() {
        println!(
            "  {} {}",
            palette.paint(format!("Set {}:", idx + 1), ansi::BLUE),
            palette.dim(format!("{} slice{}", set.len(), plural(set.len())))
        );
        print_slices(set, palette);
    }
}

fn print_slices(slices: &[Slice], palette: &ansi::Palette) {
    for slice in slices {
        println!("      {}", palette.dim(slice.to_string()));
    }
}

fn slice_label(slices: &[Slice]) -> String {
    match slices {
        [] => String::new(),
        [only] => format!("[{only}]"),
        [first, rest @ ..] => format!("[{first}] +{} more", rest.len()),
    }
}

fn print_footer(status: &ComputationStatus, palette: &ansi::Palette) {
    if !status.warnings.is_empty() || !status.errors.is_empty() || !status.infos.is_empty() {
        println!("\n{}", palette.paint("━━━ Messages ━━━", ansi::GRAY));
        print_messages(&status.errors, "error", ansi::RED, palette);
        print_messages(&status.warnings, "warning", ansi::YELLOW, palette);
        print_messages(&status.infos, "info", ansi::CYAN, palette);
    }

    let stats = &status.statistics;
    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Slices: {}  │  Computations: {}  │  Avg: {}",
        palette.paint(format!("{}ms", stats.computation_time_ms), ansi::GREEN),
        palette.paint(stats.number_of_slices.to_string(), ansi::CYAN),
        palette.paint(stats.number_of_slice_computations.to_string(), ansi::CYAN),
        palette.dim(format!("{}ms", stats.avg_slice_computation_time_ms)),
    );

    let verdict = if status.success { palette.paint("✓ success", ansi::GREEN) } else { palette.paint("✗ failed", ansi::RED) };
    println!("  {verdict}");
    println!();
}

fn print_messages(messages: &[String], label: &str, color: &str, palette: &ansi::Palette) {
    for message in messages {
        println!("  {} {}", palette.paint(format!("{label}:"), color), message);
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
