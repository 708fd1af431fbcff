mod debug_report;

use slicewise::{
    BuildabilityComputation, ComputationRequest, ConsistencyComputation, Context, Options, RuleModel, run_list,
    run_single,
};
use std::io::{self, IsTerminal};

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(if config.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN })
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let (model, request) = match load_inputs(&config) {
        Ok(inputs) => inputs,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let ctx = Context { job_id: config.job_id.clone() };
    let mut options = Options::from_env();
    if let Some(max_slices) = config.max_slices {
        options.max_slices = max_slices;
    }

    let success = match config.command {
        Command::Consistency => match run_single(&ConsistencyComputation, &request, &model, &ctx, &options) {
            Ok(response) => {
                if config.json {
                    print_json(&response);
                } else {
                    debug_report::print_consistency(&response, config.color);
                }
                response.status.success
            }
            Err(err) => {
                eprintln!("error: {err}");
                false
            }
        },
        Command::Buildability => match run_list(&BuildabilityComputation, &request, &model, &ctx, &options) {
            Ok(response) => {
                if config.json {
                    print_json(&response);
                } else {
                    debug_report::print_buildability(&response, config.color);
                }
                response.status.success
            }
            Err(err) => {
                eprintln!("error: {err}");
                false
            }
        },
    };

    std::process::exit(if success { 0 } else { 1 });
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Consistency,
    Buildability,
}

struct CliConfig {
    command: Command,
    model: String,
    request: String,
    job_id: String,
    max_slices: Option<usize>,
    explain: bool,
    json: bool,
    color: bool,
    verbose: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut command: Option<Command> = None;
    let mut model: Option<String> = None;
    let mut request: Option<String> = None;
    let mut job_id = Context::default().job_id;
    let mut max_slices: Option<usize> = None;
    let mut explain = false;
    let mut json = false;
    let mut color = io::stdout().is_terminal();
    let mut verbose = false;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            match inline.clone() {
                Some(v) => Ok(v),
                None => args.next().ok_or_else(|| format!("error: {name} expects a value")),
            }
        };

        match flag.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("slicewise {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--json" => json = true,
            "--explain" => explain = true,
            "-v" | "--verbose" => verbose = true,
            "--model" | "-m" => model = Some(value("--model")?),
            "--request" | "-r" => request = Some(value("--request")?),
            "--job-id" => job_id = value("--job-id")?,
            "--max-slices" => {
                let raw = value("--max-slices")?;
                let parsed = raw
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("error: invalid --max-slices '{raw}' (expected a positive integer)"))?;
                max_slices = Some(parsed);
            }
            _ if flag.starts_with('-') => return Err(format!("error: unknown option '{arg}'")),
            "consistency" | "buildability" if command.is_some() => {
                return Err("error: computation provided multiple times".to_string());
            }
            "consistency" => command = Some(Command::Consistency),
            "buildability" => command = Some(Command::Buildability),
            _ => return Err(format!("error: unknown computation '{arg}'\n\n{}", help_text())),
        }
    }

    let command = command.ok_or_else(|| format!("error: no computation given\n\n{}", help_text()))?;
    let model = model.ok_or_else(|| "error: --model is required".to_string())?;
    let request = request.ok_or_else(|| "error: --request is required".to_string())?;
    Ok(CliConfig { command, model, request, job_id, max_slices, explain, json, color, verbose })
}

fn load_inputs(config: &CliConfig) -> Result<(RuleModel, ComputationRequest), String> {
    let read = |path: &str| {
        std::fs::read_to_string(path).map_err(|err| format!("error: failed to read '{path}': {err}"))
    };
    let model = RuleModel::from_json(&read(&config.model)?).map_err(|err| format!("error: {err}"))?;
    let mut request = ComputationRequest::from_json(&read(&config.request)?).map_err(|err| format!("error: {err}"))?;
    request.compute_all_details |= config.explain;
    Ok((model, request))
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(out) => println!("{out}"),
        Err(err) => eprintln!("error: failed to render response: {err}"),
    }
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "slicewise {version}

Slice-based configuration analysis CLI.

Usage:
  slicewise <consistency|buildability> --model <file> --request <file> [OPTIONS]

Options:
  -m, --model <file>         Compiled rule model (JSON).
  -r, --request <file>       Computation request (JSON).
  --job-id <id>              Job id echoed in the status. Default: local
  --max-slices <n>           Override the slice limit ({env_slices}).
  --explain                  Explain inconsistent slices (sets computeAllDetails).
  --json                     Print the response as JSON instead of a report.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -v, --verbose              Log engine details to stderr.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {env_slices}         Maximum number of slices per request.
  {env_vars}  Variable limit of the reference solver.

Exit codes:
  0  Success.
  1  Computation failed or reported errors.
  2  Invalid arguments or unreadable input.
",
        version = env!("CARGO_PKG_VERSION"),
        env_slices = slicewise::ENV_MAX_SLICES,
        env_vars = slicewise::ENV_MAX_SOLVER_VARIABLES,
    )
}
