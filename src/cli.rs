//! Command-line interface definition and argument parsing
//!
//! This module uses clap to define and parse command-line arguments.
//! Every subcommand maps onto one view of the console; the shell in `main`
//! runs the route guard before dispatching.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::api::analysis::Engine;
use crate::api::reports::ReviewAction;
use crate::auth::types::Role;
use crate::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "threatdeck",
    about = "Console for a threat-intelligence backend",
    version,
    long_about = "Submit indicators for scanning, triage analysis reports, manage \
                  remediation tasks, and (for admins) drive AWS mitigation actions."
)]
pub struct Cli {
    /// Backend base URL (overrides THREATDECK_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Emit debug-level logs
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and persist the session
    Login {
        username: String,
        /// Password; read from THREATDECK_PASSWORD or prompted if omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Log out and clear the persisted session
    Logout,

    /// Show the current session
    Whoami,

    /// Submit an indicator (IP, domain, URL, hash) or file for analysis
    Analyze {
        /// Text indicator to analyze
        input: Option<String>,
        /// Analyze a file instead of a text indicator
        #[arg(long, conflicts_with = "input")]
        file: Option<PathBuf>,
        /// Scan engine: vt or otx
        #[arg(long, default_value = "vt")]
        engine: Engine,
    },

    /// Browse and triage analysis reports
    Reports {
        #[command(subcommand)]
        command: ReportsCommand,
    },

    /// Remediation tasks
    Tasks {
        #[command(subcommand)]
        command: TasksCommand,
    },

    /// AWS mitigation actions (admin)
    Mitigations {
        #[command(subcommand)]
        command: MitigationsCommand,
    },

    /// AWS configuration and infrastructure status (admin)
    Aws {
        #[command(subcommand)]
        command: AwsCommand,
    },

    /// Admin dashboard stats
    Dashboard {
        /// Show analytics instead of the overview
        #[arg(long)]
        analytics: bool,
        #[arg(long)]
        date_from: Option<String>,
        #[arg(long)]
        date_to: Option<String>,
        #[arg(long)]
        severity: Option<String>,
    },

    /// List users (assignees, escalation targets)
    Users {
        /// Filter by role: admin or analyst
        #[arg(long)]
        role: Option<Role>,
        /// Only active accounts
        #[arg(long)]
        active: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReportsCommand {
    /// List reports, paginated
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        severity: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one report in full
    Show { id: i64 },
    /// Update a report's status
    SetStatus {
        id: i64,
        status: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Review a pending report (admin)
    Review {
        id: i64,
        /// approve or false-positive
        #[arg(value_parser = parse_review_action)]
        action: ReviewAction,
    },
    /// Delete a report
    Delete { id: i64 },
    /// Escalate a report to an admin
    SendToAdmin {
        id: i64,
        #[arg(long)]
        admin_id: i64,
        #[arg(long)]
        message: Option<String>,
    },
    /// Print where the PDF export is served from
    Pdf { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum TasksCommand {
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
    },
    Show { id: i64 },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "medium")]
        priority: String,
        #[arg(long)]
        assigned_to: i64,
        #[arg(long)]
        report: i64,
        #[arg(long)]
        due_date: String,
    },
    /// Partial update of a task
    Update {
        id: i64,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        assigned_to: Option<i64>,
        #[arg(long)]
        due_date: Option<String>,
    },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum MitigationsCommand {
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        action_type: Option<String>,
        #[arg(long)]
        report: Option<i64>,
        #[arg(long)]
        page: Option<u32>,
    },
    Show { id: i64 },
    Create {
        #[arg(long)]
        action_type: String,
        #[arg(long)]
        target: String,
        #[arg(long, default_value = "us-east-1")]
        region: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        report: Option<i64>,
        /// NACL rule number (block_ip_nacl only)
        #[arg(long)]
        rule_number: Option<u32>,
    },
    /// Partial update of a pending mitigation
    Update {
        id: i64,
        #[arg(long)]
        action_type: Option<String>,
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        rule_number: Option<u32>,
    },
    /// Execute a pending mitigation against AWS
    Execute { id: i64 },
    Delete { id: i64 },
    /// Aggregate counts by status and type
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum AwsCommand {
    /// List stored configurations
    Configs,
    Show { id: i64 },
    /// Show the active configuration
    Active,
    /// Store a new configuration
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        access_key: String,
        #[arg(long)]
        secret_key: String,
        #[arg(long, default_value = "us-east-1")]
        region: String,
        #[arg(long)]
        vpc_id: Option<String>,
        #[arg(long)]
        security_group: Option<String>,
        /// Auto-block indicators above the threshold score
        #[arg(long)]
        auto_block: bool,
        #[arg(long, default_value_t = 80)]
        auto_block_threshold: u32,
    },
    /// Partial update of a stored configuration
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        access_key: Option<String>,
        #[arg(long)]
        secret_key: Option<String>,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        vpc_id: Option<String>,
        #[arg(long)]
        security_group: Option<String>,
        #[arg(long)]
        auto_block: Option<bool>,
        #[arg(long)]
        auto_block_threshold: Option<u32>,
    },
    Delete { id: i64 },
    /// Verify a configuration's credentials against AWS
    TestCredentials { id: i64 },
    /// Discover resources reachable with a configuration
    Resources { id: i64 },
    /// Make a configuration the active one
    SetActive { id: i64 },
    /// Infrastructure status overview
    Status,
}

fn parse_review_action(arg: &str) -> Result<ReviewAction, String> {
    match arg.to_ascii_lowercase().as_str() {
        "approve" => Ok(ReviewAction::Approve),
        "false-positive" | "false_positive" => Ok(ReviewAction::FalsePositive),
        other => Err(format!(
            "unknown review action '{other}', expected 'approve' or 'false-positive'"
        )),
    }
}

impl Cli {
    /// Fold CLI overrides into the environment-derived config.
    pub fn apply_to(&self, mut config: Config) -> Config {
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.clone();
        }
        config.verbose |= self.verbose;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_login() {
        let cli = Cli::parse_from(["threatdeck", "login", "amal"]);
        assert!(matches!(
            cli.command,
            Commands::Login { ref username, password: None } if username == "amal"
        ));
    }

    #[test]
    fn api_url_flag_overrides_config() {
        let cli = Cli::parse_from([
            "threatdeck",
            "--api-url",
            "https://ti.example.com/api",
            "whoami",
        ]);
        let config = cli.apply_to(Config::default());
        assert_eq!(config.api_url, "https://ti.example.com/api");
    }

    #[test]
    fn analyze_rejects_both_input_and_file() {
        let result = Cli::try_parse_from([
            "threatdeck",
            "analyze",
            "203.0.113.7",
            "--file",
            "sample.bin",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn aws_create_requires_credentials() {
        assert!(Cli::try_parse_from(["threatdeck", "aws", "create", "--name", "prod"]).is_err());

        let cli = Cli::parse_from([
            "threatdeck",
            "aws",
            "create",
            "--name",
            "prod",
            "--access-key",
            "AKIAEXAMPLE",
            "--secret-key",
            "s3cret",
            "--auto-block",
        ]);
        match cli.command {
            Commands::Aws {
                command:
                    AwsCommand::Create {
                        name,
                        region,
                        auto_block,
                        ..
                    },
            } => {
                assert_eq!(name, "prod");
                assert_eq!(region, "us-east-1");
                assert!(auto_block);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn aws_update_takes_a_sparse_field_set() {
        let cli = Cli::parse_from([
            "threatdeck",
            "aws",
            "update",
            "4",
            "--region",
            "eu-west-1",
        ]);
        match cli.command {
            Commands::Aws {
                command: AwsCommand::Update { id, region, name, .. },
            } => {
                assert_eq!(id, 4);
                assert_eq!(region.as_deref(), Some("eu-west-1"));
                assert!(name.is_none());
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn mitigation_update_parses() {
        let cli = Cli::parse_from([
            "threatdeck",
            "mitigations",
            "update",
            "9",
            "--rule-number",
            "120",
        ]);
        match cli.command {
            Commands::Mitigations {
                command: MitigationsCommand::Update { id, rule_number, .. },
            } => {
                assert_eq!(id, 9);
                assert_eq!(rule_number, Some(120));
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn review_action_parses_both_spellings() {
        assert!(parse_review_action("approve").is_ok());
        assert!(parse_review_action("false-positive").is_ok());
        assert!(parse_review_action("false_positive").is_ok());
        assert!(parse_review_action("reject").is_err());
    }
}
