//! SQL Query CLI
//!
//! Command-line interface for submitting SQL jobs and browsing the table
//! catalog of an SQL Query instance.
//!
//! Authentication and service settings come from the environment
//! (`SQL_AUTH_TYPE`, `SQL_BEARER_TOKEN`, `SQL_URL`, ...), using the prefix
//! derived from `--service-name`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sql_query_client::{
    ClientConfigBuilder, ExternalConfig, GetSqlJobOptions, GetTableOptions, ListSqlJobsOptions,
    ListTablesOptions, RequestContext, SqlQueryClient, SubmitSqlJobOptions, DEFAULT_SERVICE_NAME,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is not set
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser)]
#[command(name = "sqlq")]
#[command(version, about = "SQL Query service CLI", long_about = None)]
struct Cli {
    /// Service URL (overrides <SERVICE>_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// CRN of the SQL Query instance
    #[arg(long, env = "SQL_QUERY_CRN", global = true)]
    instance_crn: String,

    /// Service name used as the environment variable prefix
    #[arg(long, default_value = DEFAULT_SERVICE_NAME, global = true)]
    service_name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the table catalog
    Tables {
        #[command(subcommand)]
        command: TablesCommand,
    },

    /// Submit and inspect SQL jobs
    Jobs {
        #[command(subcommand)]
        command: JobsCommand,
    },
}

#[derive(Subcommand)]
enum TablesCommand {
    /// List catalog tables
    List {
        /// Only tables whose name matches this pattern
        #[arg(short, long)]
        pattern: Option<String>,

        /// Only tables of this type (table, view)
        #[arg(short = 't', long = "type")]
        table_type: Option<String>,
    },

    /// Show the columns of a table
    Get {
        /// Name of the table
        name: String,
    },
}

#[derive(Subcommand)]
enum JobsCommand {
    /// Submit an SQL statement
    Submit {
        /// SQL statement, usually with an INTO clause
        statement: String,

        /// Result set location (deprecated, prefer INTO)
        #[arg(long)]
        target: Option<String>,

        /// Wait for the job to finish and print its final state
        #[arg(short, long)]
        wait: bool,

        /// Poll interval in seconds when waiting
        #[arg(long, default_value_t = 2)]
        poll_interval: u64,
    },

    /// List recent jobs
    List,

    /// Show a job
    Get {
        /// ID of the job
        id: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client = build_client(&cli)?;

    match cli.command {
        Commands::Tables { command } => match command {
            TablesCommand::List {
                pattern,
                table_type,
            } => {
                let mut options = ListTablesOptions::new();
                if let Some(pattern) = pattern {
                    options = options.name_pattern(pattern);
                }
                if let Some(table_type) = table_type {
                    options = options.table_type(table_type);
                }
                let response = client.list_tables(&options).await?;
                print_json(&response.result)
            }
            TablesCommand::Get { name } => {
                let response = client.get_table(&GetTableOptions::new(name)).await?;
                print_json(&response.result)
            }
        },
        Commands::Jobs { command } => match command {
            JobsCommand::Submit {
                statement,
                target,
                wait,
                poll_interval,
            } => {
                let mut options = SubmitSqlJobOptions::new(statement);
                if let Some(target) = target {
                    options = options.resultset_target(target);
                }
                let submitted = client.submit_sql_job(&options).await?.into_result();
                tracing::info!(job_id = %submitted.job_id, status = %submitted.status, "Job submitted");

                if !wait {
                    return print_json(&submitted);
                }

                let job = client
                    .wait_for_sql_job(
                        &RequestContext::default(),
                        &submitted.job_id,
                        Duration::from_secs(poll_interval.max(1)),
                    )
                    .await?
                    .into_result();
                print_json(&job)?;

                if job.is_failed() {
                    anyhow::bail!(
                        "job {} failed: {}",
                        job.job_id,
                        job.error_message.as_deref().unwrap_or("no error message")
                    );
                }
                Ok(())
            }
            JobsCommand::List => {
                let response = client.list_sql_jobs(&ListSqlJobsOptions::new()).await?;
                print_json(&response.result)
            }
            JobsCommand::Get { id } => {
                let response = client.get_sql_job(&GetSqlJobOptions::new(id)).await?;
                print_json(&response.result)
            }
        },
    }
}

fn build_client(cli: &Cli) -> Result<SqlQueryClient> {
    let external = ExternalConfig::from_env(&cli.service_name);
    let mut builder = ClientConfigBuilder::from_external(&external, cli.instance_crn.clone())
        .context("Failed to read service configuration from the environment")?;
    if let Some(url) = &cli.url {
        builder = builder.service_url(url.clone());
    }
    let config = builder.build().context("Invalid client configuration")?;
    SqlQueryClient::new(config).context("Failed to create client")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_filter_shows_info() {
        let filter = EnvFilter::new(DEFAULT_LOG_FILTER);
        assert_eq!(
            filter.max_level_hint(),
            Some(tracing::level_filters::LevelFilter::INFO)
        );
    }

    #[test]
    fn test_submit_args() {
        let cli = Cli::try_parse_from([
            "sqlq",
            "--instance-crn",
            "crn:v1:test",
            "jobs",
            "submit",
            "SELECT 1",
            "--wait",
        ])
        .unwrap();
        match cli.command {
            Commands::Jobs {
                command:
                    JobsCommand::Submit {
                        statement,
                        wait,
                        poll_interval,
                        target,
                    },
            } => {
                assert_eq!(statement, "SELECT 1");
                assert!(wait);
                assert_eq!(poll_interval, 2);
                assert!(target.is_none());
            }
            _ => panic!("expected jobs submit"),
        }
    }
}
