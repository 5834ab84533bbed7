use crate::pipeline::{ConfigValue, Registry};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use console::style;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gchurn")]
#[command(about = "Daily code churn of a git repository, globally and per author")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(long, help = "Path to git repository")]
    pub repo: Option<PathBuf>,

    #[arg(long, help = "Start from this commit or date (RFC3339, YYYY-MM-DD, or a duration like \"3weeks ago\")")]
    pub since: Option<String>,

    #[arg(long, help = "End at this commit or date (RFC3339, YYYY-MM-DD, or a duration like \"3weeks ago\")")]
    pub until: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Binary,
}

#[derive(Subcommand)]
pub enum Commands {
    Churn {
        #[arg(long = "churn-people", help = "Record detailed statistics per each developer")]
        people: bool,

        #[arg(long, help = "Output as JSON", conflicts_with = "binary")]
        json: bool,

        #[arg(long, help = "Output as a protobuf message")]
        binary: bool,
    },
    /// List the registered analyses and their options
    List,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Churn { people, json, binary } => {
                let format = if binary {
                    OutputFormat::Binary
                } else if json {
                    OutputFormat::Json
                } else {
                    OutputFormat::Text
                };
                crate::churn::exec(self.common, people, format)
            }
            Commands::List => list(&Registry::with_builtin()),
        }
    }
}

fn list(registry: &Registry) -> Result<()> {
    for item in registry.items() {
        println!(
            "{} {}",
            style(format!("--{}", item.flag())).bold(),
            style(item.name()).dim()
        );
        println!("    {}", item.description());
        let requires: Vec<&str> = item.requires().iter().map(|d| d.as_str()).collect();
        println!("    requires: {}", requires.join(", "));
        for option in item.list_configuration_options() {
            let ConfigValue::Bool(default) = option.default;
            println!(
                "    {:<20} {} (default: {})",
                style(format!("--{}", option.flag)).cyan(),
                option.description,
                default
            );
        }
    }
    Ok(())
}
