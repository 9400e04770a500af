use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};
use ratchet::config::FlagOverrides;

#[derive(Parser)]
#[command(name = "ratchet")]
#[command(about = "Fail when a metric regresses against a base branch", long_about = None)]
#[command(version)]
#[command(subcommand_help_heading = "Commands")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub check: CheckArgs,

    /// Enable debug logging on stderr (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remove worktrees left behind by interrupted or killed runs
    Cleanup {
        /// Leave worktrees whose creating ratchet process is still running
        #[arg(long)]
        skip_active: bool,
    },
}

/// Arguments of the default check command
#[derive(Args, Debug, Default)]
#[command(group(ArgGroup::new("comparison").multiple(false)))]
#[command(group(ArgGroup::new("source").multiple(false)))]
pub struct CheckArgs {
    /// Shell command printing the metric value
    pub metric: Option<String>,

    /// Command to run before the metric in each code state
    #[arg(long)]
    pub pre: Option<String>,

    /// Command to run after the metric in each code state
    #[arg(long)]
    pub post: Option<String>,

    /// Require current < metric on BASE
    #[arg(long, value_name = "BASE", group = "comparison")]
    pub lt: Option<String>,

    /// Require current <= metric on BASE
    #[arg(long, value_name = "BASE", group = "comparison")]
    pub le: Option<String>,

    /// Require current == metric on BASE
    #[arg(long, value_name = "BASE", group = "comparison")]
    pub eq: Option<String>,

    /// Require current >= metric on BASE
    #[arg(long, value_name = "BASE", group = "comparison")]
    pub ge: Option<String>,

    /// Require current > metric on BASE
    #[arg(long, value_name = "BASE", group = "comparison")]
    pub gt: Option<String>,

    /// Config file (default: .ratchet in the current directory)
    #[arg(short, long, value_name = "FILE", group = "source")]
    pub config: Option<PathBuf>,

    /// Inline config as YAML or JSON
    #[arg(long, value_name = "TEXT", group = "source")]
    pub config_string: Option<String>,

    /// Show stage progress and the comparison result
    #[arg(short, long)]
    pub verbose: bool,
}

impl CheckArgs {
    pub fn overrides(&self) -> FlagOverrides {
        FlagOverrides {
            metric: self.metric.clone(),
            pre: self.pre.clone(),
            post: self.post.clone(),
            lt: self.lt.clone(),
            le: self.le.clone(),
            eq: self.eq.clone(),
            ge: self.ge.clone(),
            gt: self.gt.clone(),
            verbose: self.verbose,
        }
    }
}
