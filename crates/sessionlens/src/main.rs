#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use clap::error::ErrorKind;
use sessionlens::cli::app::{Cli, Command, RuntimeArgs};
use sessionlens::cli::commands;
use sessionlens::config::RuntimePaths;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    let command_name = command_name(&cli.command);
    println!("sessionlens: starting `{command_name}`");

    match execute(cli) {
        Ok(()) => {
            println!("sessionlens: completed `{command_name}` (exit_code={EXIT_SUCCESS})");
            EXIT_SUCCESS
        }
        Err(error) => {
            eprintln!("sessionlens: failed `{command_name}` (exit_code={EXIT_RUNTIME_FAILURE})");
            eprintln!("{error:#}");
            EXIT_RUNTIME_FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
    match cli.command {
        Command::Catalog(args) => commands::catalog::run(&args, &runtime_paths),
        Command::Metrics(args) => commands::metrics::run(&args, &runtime_paths),
        Command::List(args) => commands::list::run(&args, &runtime_paths),
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Catalog(_) => "catalog",
        Command::Metrics(_) => "metrics",
        Command::List(_) => "list",
    }
}

fn resolve_runtime_paths(args: &RuntimeArgs) -> Result<RuntimePaths> {
    let home_dir = match &args.home_dir {
        Some(path) => path.clone(),
        None => std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("HOME is not set; pass --home-dir"))?,
    };

    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    sessionlens::config::resolve_runtime_paths(&home_dir, &cwd, args.out_dir.as_deref())
}
