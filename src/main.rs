//! thrash - an interactive, POSIX-style command shell
//!
//! Usage:
//!   thrash              Start the interactive REPL
//!   thrash -c "cmd"      Execute a single logical line and exit

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use thrash::line_assembler::LineAssembler;
use thrash::signals;
use thrash::Shell;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment-driven startup configuration. No file-based config format; non-goals
/// exclude rc files and profiles.
struct ShellConfig {
    history_path: Option<PathBuf>,
    log_filter: String,
    prompt_prefix: String,
}

impl ShellConfig {
    fn from_env() -> Self {
        let history_path = env::var_os("HOME").map(|h| PathBuf::from(h).join(".thrash_history"));
        let log_filter = env::var("THRASH_LOG").unwrap_or_else(|_| "info".to_string());
        Self { history_path, log_filter, prompt_prefix: "thrash".to_string() }
    }
}

fn init_logging(config: &ShellConfig) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run_repl(config: ShellConfig) -> ExitCode {
    let mut shell = match Shell::new() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {e}", config.prompt_prefix);
            return ExitCode::FAILURE;
        }
    };

    if signals::setup_shell_signals().is_err() {
        eprintln!("{}: warning: could not set shell signal dispositions", config.prompt_prefix);
    }

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("{}: {e}", config.prompt_prefix);
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &config.history_path {
        let _ = rl.load_history(path);
    }

    let mut assembler = LineAssembler::new();

    loop {
        let prompt = if assembler.is_pending() { format!("{}> ", config.prompt_prefix) } else { format!("{}$ ", config.prompt_prefix) };

        match rl.readline(&prompt) {
            Ok(line) => {
                if assembler.push(&line) {
                    let full = assembler.take();
                    if !full.trim().is_empty() {
                        let _ = rl.add_history_entry(full.as_str());
                    }
                    if !shell.run_line(&full) {
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                assembler.take();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", config.prompt_prefix);
                break;
            }
        }
    }

    if let Some(path) = &config.history_path {
        let _ = rl.save_history(path);
    }

    ExitCode::from(shell.state.last_exit_status.clamp(0, 255) as u8)
}

fn run_once(config: ShellConfig, line: &str) -> ExitCode {
    let mut shell = match Shell::new() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {e}", config.prompt_prefix);
            return ExitCode::FAILURE;
        }
    };

    if signals::setup_shell_signals().is_err() {
        eprintln!("{}: warning: could not set shell signal dispositions", config.prompt_prefix);
    }

    shell.run_line(line);
    ExitCode::from(shell.state.last_exit_status.clamp(0, 255) as u8)
}

fn main() -> ExitCode {
    let config = ShellConfig::from_env();
    init_logging(&config);

    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => run_repl(config),
        3 if args[1] == "-c" => run_once(config, &args[2]),
        2 if args[1] == "--version" || args[1] == "-V" => {
            println!("thrash {VERSION}");
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("usage: thrash [-c command]");
            ExitCode::FAILURE
        }
    }
}
