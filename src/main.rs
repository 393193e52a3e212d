mod debug_report;

use amalgam::{BasicEntity, CompositeExtractor, DEFAULT_EXTRACTOR_NAME, Options, PatternFlags, PatternSet};
use serde::Deserialize;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "AMALGAM_LOG";

fn main() {
    init_tracing();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(&config) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

/// One message as produced by the upstream recognizers.
#[derive(Debug, Deserialize)]
struct Message {
    text: String,
    #[serde(default)]
    entities: Vec<BasicEntity>,
}

struct CliConfig {
    patterns: PathBuf,
    input: Option<PathBuf>,
    extractor_name: String,
    flags: PatternFlags,
    json: bool,
    color: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn run(config: &CliConfig) -> Result<(), String> {
    let patterns = PatternSet::from_path(&config.patterns).map_err(|err| format!("error: {err}"))?;
    let options = Options { extractor_name: config.extractor_name.clone(), flags: config.flags };
    let extractor = CompositeExtractor::new(&patterns, options).map_err(|err| format!("error: {err}"))?;

    let raw = match &config.input {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| format!("error: failed to read '{}': {err}", path.display()))?,
        None => read_stdin_input()?,
    };
    let message: Message = serde_json::from_str(&raw).map_err(|err| format!("error: malformed message: {err}"))?;

    let res = extractor.process_verbose(&message.text, &message.entities);

    if config.json {
        let out = serde_json::to_string_pretty(&res.results).map_err(|err| format!("error: {err}"))?;
        println!("{out}");
    } else {
        debug_report::print_run(&res, config.color);
    }
    Ok(())
}

fn parse_args() -> Result<CliConfig, String> {
    let mut patterns: Option<PathBuf> = None;
    let mut input: Option<PathBuf> = None;
    let mut extractor_name = DEFAULT_EXTRACTOR_NAME.to_string();
    let mut flags = PatternFlags::empty();
    let mut json = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("amalgam {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--json" => json = true,
            "--color" => color = true,
            "--no-color" => color = false,
            "--case-insensitive" => flags |= PatternFlags::CASE_INSENSITIVE,
            "--patterns" | "-p" => {
                let value = args.next().ok_or_else(|| "error: --patterns expects a value".to_string())?;
                patterns = Some(PathBuf::from(value));
            }
            "--input" | "-i" => {
                let value = args.next().ok_or_else(|| "error: --input expects a value".to_string())?;
                input = Some(PathBuf::from(value));
            }
            "--extractor" => {
                extractor_name = args.next().ok_or_else(|| "error: --extractor expects a value".to_string())?;
            }
            _ if arg.starts_with("--patterns=") => {
                patterns = Some(PathBuf::from(arg.trim_start_matches("--patterns=")));
            }
            _ if arg.starts_with("--input=") => {
                input = Some(PathBuf::from(arg.trim_start_matches("--input=")));
            }
            _ if arg.starts_with("--extractor=") => {
                extractor_name = arg.trim_start_matches("--extractor=").to_string();
            }
            _ => {
                return Err(format!("error: unknown argument '{arg}'\n\n{}", help_text()));
            }
        }
    }

    let patterns = patterns.ok_or_else(|| format!("error: --patterns is required\n\n{}", help_text()))?;
    if extractor_name.trim().is_empty() {
        return Err("error: --extractor must not be empty".to_string());
    }

    Ok(CliConfig { patterns, input, extractor_name, flags, json, color })
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "amalgam {version}

Bundle recognized entities into composite entities.

Usage:
  amalgam --patterns <file> [OPTIONS] < message.json
  amalgam --patterns <file> --input <message.json> [OPTIONS]

The message is a JSON object: {{\"text\": \"...\", \"entities\": [{{\"entity\", \"value\", \"start\", \"end\"}}, ...]}}
The pattern file holds {{\"composite_entities\": [{{\"name\", \"patterns\"}}, ...]}}, optionally
wrapped in {{\"rasa_nlu_data\": ...}}, or the bare list.

Options:
  -p, --patterns <file>      Pattern set to compile (required).
  -i, --input <file>         Message to process. Reads stdin when omitted.
  --json                     Print the result entities as JSON instead of a report.
  --case-insensitive         Compile patterns case-insensitively.
  --extractor <name>         Extractor name for composite records.
                             Default: {default_extractor}
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {log_env}=<filter>        Log filter for stderr diagnostics (default: warn).

Exit codes:
  0  Success.
  1  Pattern compilation, input or I/O error.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
        default_extractor = DEFAULT_EXTRACTOR_NAME,
        log_env = LOG_ENV,
    )
}
