mod debug_report;

use allocconf::{AllocatorConfig, Backend, ParseReport};
use std::io::{self, IsTerminal, Read};
use tracing_subscriber::EnvFilter;

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };
    init_logging();

    let allocator = AllocatorConfig::new();
    if let Some(backend) = config.loaded {
        allocator.set_allocator_loaded(backend);
    }

    let outcome: Result<(Option<&'static str>, ParseReport), allocconf::ConfigError> = match &config.input {
        Input::Environment => {
            allocator.init_from_env().map(|init| (init.source.map(|source| source.name), init.report.clone()))
        }
        Input::Text(text) => allocator.parse(text).map(|report| (None, report)),
    };

    match outcome {
        Ok((source, report)) => {
            let run = debug_report::Run {
                input: allocator.last_allocator_settings(),
                source,
                loaded: allocator.allocator_loaded(),
                settings: allocator.snapshot(),
                report,
            };
            debug_report::print_run(&run, config.color);
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).init();
}

enum Input {
    Environment,
    Text(String),
}

struct CliConfig {
    input: Input,
    loaded: Option<Backend>,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut input: Option<Input> = None;
    let mut loaded = None;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1).peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("allocconf {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--env" => set_input(&mut input, Input::Environment)?,
            "--loaded" => {
                let value = args.next().ok_or_else(|| "error: --loaded expects a value".to_string())?;
                loaded = Some(parse_backend(&value)?);
            }
            "--input" | "-i" => {
                let value = args.next().ok_or_else(|| "error: --input expects a value".to_string())?;
                set_input(&mut input, Input::Text(value))?;
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.trim().is_empty() {
                    set_input(&mut input, Input::Text(rest))?;
                }
                break;
            }
            _ if arg.starts_with("--loaded=") => {
                loaded = Some(parse_backend(arg.trim_start_matches("--loaded="))?);
            }
            _ if arg.starts_with("--input=") => {
                let value = arg.trim_start_matches("--input=");
                set_input(&mut input, Input::Text(value.to_string()))?;
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" ");
                set_input(&mut input, Input::Text(rest))?;
                break;
            }
        }
    }

    let input = match input {
        Some(value) => value,
        None => Input::Text(read_stdin_input()?),
    };

    Ok(CliConfig { input, loaded, color })
}

fn set_input(slot: &mut Option<Input>, value: Input) -> Result<(), String> {
    if slot.is_some() {
        return Err("error: input provided multiple times".to_string());
    }
    *slot = Some(value);
    Ok(())
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer.trim_end_matches(['\n', '\r']).to_string())
}

fn parse_backend(value: &str) -> Result<Backend, String> {
    Backend::from_token(value).ok_or_else(|| format!("error: invalid --loaded '{value}' (expected native or async)"))
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "allocconf {version}

Parse caching-allocator settings and print the resulting configuration.

Usage:
  allocconf [OPTIONS] [--] <settings...>
  allocconf [OPTIONS] --input <settings>
  allocconf [OPTIONS] --env

Options:
  -i, --input <settings>     Settings string to parse. If omitted, reads remaining
                             args or stdin when no args are provided.
  --env                      Read settings from {primary} (or a deprecated
                             fallback) instead.
  --loaded <backend>         Treat the allocator as already loaded with the
                             given backend (native or async).
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Logging is controlled by RUST_LOG (default: warn).

Exit codes:
  0  Success.
  1  Settings rejected.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
        primary = allocconf::PRIMARY_ENV_VAR,
    )
}
