//! SQL Query Client SDK
//!
//! A Rust HTTP client for the SQL Query REST API: submit SQL jobs against
//! data in object storage, poll their status, and browse the table catalog.
//!
//! # Features
//!
//! - **Typed operations**: one method per endpoint, with typed options and
//!   typed response models
//! - **Pluggable authentication**: no-auth, basic and bearer-token
//!   authenticators, or your own [`Authenticator`]
//! - **Automatic Retries**: opt-in exponential backoff for transient failures
//! - **Deadlines and cancellation**: every operation has a `*_with_context`
//!   form taking a [`RequestContext`]
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sql_query_client::{
//!     BearerTokenAuthenticator, ClientConfig, GetSqlJobOptions, SqlQueryClient,
//!     SubmitSqlJobOptions,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SqlQueryClient::new(
//!         ClientConfig::builder("crn:v1:bluemix:public:sql-query:us-south:a/...")
//!             .authenticator(BearerTokenAuthenticator::new(std::env::var("TOKEN")?))
//!             .build()?,
//!     )?;
//!
//!     let submitted = client
//!         .submit_sql_job(&SubmitSqlJobOptions::new(
//!             "SELECT * FROM cos://us-geo/sql/customers.csv INTO cos://us-geo/my-bucket/",
//!         ))
//!         .await?;
//!
//!     let job = client
//!         .get_sql_job(&GetSqlJobOptions::new(&submitted.result.job_id))
//!         .await?;
//!     println!("{}: {}", job.result.job_id, job.result.status);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return `Result<DetailedResponse<T>, ClientError>`.
//! Validation and configuration errors are raised before any request is
//! sent. Errors raised after a response arrived (`Decode`, `NotFound`,
//! `ServerError`, ...) carry the raw response; see [`ClientError::response`].
//! A job that fails on the service side is not an error: check
//! `SqlJobInfoFull::error`.

pub mod auth;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod options;
pub mod response;
pub mod sdk_headers;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use auth::{Authenticator, BasicAuthenticator, BearerTokenAuthenticator, NoAuthAuthenticator};
pub use client::{SharedClient, SqlQueryClient};
pub use config::{
    ClientConfig, ClientConfigBuilder, ExternalConfig, DEFAULT_SERVICE_NAME, DEFAULT_SERVICE_URL,
};
pub use context::RequestContext;
pub use error::{ClientError, Result};
pub use options::{
    GetSqlJobOptions, GetTableOptions, ListSqlJobsOptions, ListTablesOptions,
    SubmitSqlJobOptions, Validate,
};
pub use response::{DetailedResponse, RawResponse};
pub use transport::RetrySettings;
pub use types::{
    ColumnInformation, JobStatus, SqlJobInfoFull, SqlJobInfoList, SqlJobInfoShort,
    TableInformation, TableList, TableMetadata, TableType,
};
pub use tokio_util::sync::CancellationToken;
