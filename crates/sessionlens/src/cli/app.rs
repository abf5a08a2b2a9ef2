use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::commands::{catalog::CatalogArgs, list::ListArgs, metrics::MetricsArgs};

#[derive(Debug, Parser)]
#[command(name = "sessionlens", version, about = "Cross-agent session log analytics")]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "PATH")]
    pub home_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Catalog(CatalogArgs),
    Metrics(MetricsArgs),
    List(ListArgs),
}
