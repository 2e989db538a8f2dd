use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/costcounter.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Workspace directory holding the CSV files.
    pub workspace: Option<String>,
    /// Log level for the crates of this workspace.
    pub level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: None,
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "costcounter", version)]
#[command(about = "Itemized project cost calculations kept in CSV workspaces")]
struct Cli {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override the workspace directory.
    #[arg(long, short)]
    workspace: Option<String>,
    /// Override the log level (error, warn, info, debug, trace).
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute or save a cost calculation.
    #[command(subcommand)]
    Cost(CostCommand),
    /// Print every saved calculation.
    History,
    /// Maintain the reference table of typical values.
    #[command(subcommand)]
    Reference(ReferenceCommand),
    /// Maintain the project registry.
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Statistics over the saved history.
    #[command(subcommand)]
    Analysis(AnalysisCommand),
}

#[derive(Debug, Subcommand)]
pub enum CostCommand {
    /// Print the total of the given lines without saving.
    Total(LinesArgs),
    /// Save the given lines for a project.
    Save {
        #[arg(long, short)]
        project: String,
        #[command(flatten)]
        lines: LinesArgs,
    },
    /// Print the lines of the last saved calculation.
    Last,
}

#[derive(Debug, Args)]
pub struct LinesArgs {
    /// Fill empty values from the reference table.
    #[arg(long)]
    pub defaults: bool,
    /// Cost lines as LABEL=VALUE; VALUE may be a number or a percentage.
    #[arg(value_name = "LABEL=VALUE")]
    pub lines: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum ReferenceCommand {
    List,
    /// Add or replace a typical value.
    Set { name: String, value: String },
    Remove { name: String },
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    List,
    Add {
        name: String,
        #[arg(long, short, default_value = "")]
        description: String,
    },
    Edit {
        name: String,
        #[arg(long)]
        new_name: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
    },
    Delete {
        name: String,
    },
    /// Switch a project between active and completed.
    Toggle {
        name: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum AnalysisCommand {
    Report {
        #[command(flatten)]
        filter: FilterArgs,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Write the report as CSV.
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, short)]
        output: String,
    },
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Only this project (default: all projects).
    #[arg(long, short)]
    pub project: Option<String>,
    /// First day included (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Last day included (YYYY-MM-DD).
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

pub fn load() -> Result<(AppConfig, Command)> {
    let cli = Cli::parse();

    let config_path = cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("COSTCOUNTER"));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(workspace) = cli.workspace {
        settings.workspace = Some(workspace);
    }
    if let Some(level) = cli.log_level {
        settings.level = level;
    }

    Ok((settings, cli.command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_save_with_lines() {
        let cli = Cli::try_parse_from([
            "costcounter",
            "--workspace",
            "ws",
            "cost",
            "save",
            "--project",
            "Дом",
            "--defaults",
            "Аренда=100",
            "Налог=10%",
        ])
        .unwrap();
        assert_eq!(cli.workspace.as_deref(), Some("ws"));
        match cli.command {
            Command::Cost(CostCommand::Save { project, lines }) => {
                assert_eq!(project, "Дом");
                assert!(lines.defaults);
                assert_eq!(lines.lines, ["Аренда=100", "Налог=10%"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_analysis_dates() {
        let cli = Cli::try_parse_from([
            "costcounter",
            "analysis",
            "report",
            "--from",
            "2024-01-01",
            "--to",
            "2024-12-31",
        ])
        .unwrap();
        match cli.command {
            Command::Analysis(AnalysisCommand::Report { filter, json }) => {
                assert!(!json);
                assert_eq!(filter.from, NaiveDate::from_ymd_opt(2024, 1, 1));
                assert_eq!(filter.to, NaiveDate::from_ymd_opt(2024, 12, 31));
                assert!(filter.project.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_dates() {
        let parsed = Cli::try_parse_from(["costcounter", "analysis", "report", "--from", "01/02"]);
        assert!(parsed.is_err());
    }
}
