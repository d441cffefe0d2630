//! Per-operation request options.
//!
//! Each options struct carries the operation's parameters plus optional
//! custom headers. Unset parameters are `None`; required ones are checked by
//! [`Validate::validate`] before any request is built, so an options value
//! created with `Default::default()` and never filled in is rejected without
//! touching the network.

use crate::error::{ClientError, Result};
use crate::types::TableType;
use std::collections::BTreeMap;

/// Required-field validation for request options.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn require_present(field: &str, value: &Option<String>, options: &str) -> Result<()> {
    match value {
        Some(_) => Ok(()),
        None => Err(ClientError::Validation(format!(
            "{options}: field '{field}' is required"
        ))),
    }
}

fn require_non_empty(field: &str, value: &Option<String>, options: &str) -> Result<()> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(()),
        Some(_) => Err(ClientError::Validation(format!(
            "{options}: field '{field}' must not be empty"
        ))),
        None => Err(ClientError::Validation(format!(
            "{options}: field '{field}' is required"
        ))),
    }
}

/// Options for listing catalog tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListTablesOptions {
    /// Hive-style name pattern; `*` is a wildcard, `|` separates alternatives
    pub name_pattern: Option<String>,
    /// Restrict the listing to tables or views
    pub table_type: Option<TableType>,
    /// Extra headers sent with this request
    pub headers: BTreeMap<String, String>,
}

impl ListTablesOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(pattern.into());
        self
    }

    pub fn table_type(mut self, table_type: impl Into<TableType>) -> Self {
        self.table_type = Some(table_type.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

impl Validate for ListTablesOptions {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Options for fetching a single catalog table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetTableOptions {
    /// Case-insensitive table name (letters, digits and `_`)
    pub table_name: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl GetTableOptions {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: Some(table_name.into()),
            ..Default::default()
        }
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

impl Validate for GetTableOptions {
    fn validate(&self) -> Result<()> {
        require_non_empty("table_name", &self.table_name, "GetTableOptions")
    }
}

/// Options for submitting an SQL job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitSqlJobOptions {
    /// The SQL statement; its `INTO` clause names the result location
    pub statement: Option<String>,
    /// Result location URI.
    ///
    /// Deprecated by the service in favour of the statement's `INTO`
    /// clause. When both are given they are sent as-is and the service
    /// decides which one applies.
    pub resultset_target: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl SubmitSqlJobOptions {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: Some(statement.into()),
            ..Default::default()
        }
    }

    pub fn statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    pub fn resultset_target(mut self, target: impl Into<String>) -> Self {
        self.resultset_target = Some(target.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

impl Validate for SubmitSqlJobOptions {
    fn validate(&self) -> Result<()> {
        require_present("statement", &self.statement, "SubmitSqlJobOptions")
    }
}

/// Options for listing recent SQL jobs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListSqlJobsOptions {
    pub headers: BTreeMap<String, String>,
}

impl ListSqlJobsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

impl Validate for ListSqlJobsOptions {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Options for fetching a single SQL job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetSqlJobOptions {
    /// Job ID as returned by submit or list
    pub job_id: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl GetSqlJobOptions {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            ..Default::default()
        }
    }

    pub fn job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

impl Validate for GetSqlJobOptions {
    fn validate(&self) -> Result<()> {
        require_non_empty("job_id", &self.job_id, "GetSqlJobOptions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_missing_required_fields() {
        assert!(GetTableOptions::default().validate().is_err());
        assert!(GetSqlJobOptions::default().validate().is_err());
        assert!(SubmitSqlJobOptions::default().validate().is_err());

        // No required fields
        assert!(ListTablesOptions::default().validate().is_ok());
        assert!(ListSqlJobsOptions::default().validate().is_ok());
    }

    #[test]
    fn test_empty_path_params_rejected() {
        let err = GetSqlJobOptions::new("").validate().unwrap_err();
        assert!(err.to_string().contains("job_id"));

        let err = GetTableOptions::new("").validate().unwrap_err();
        assert!(err.to_string().contains("table_name"));
    }

    #[test]
    fn test_submit_builder() {
        let options = SubmitSqlJobOptions::new("SELECT 1")
            .resultset_target("cos://us-geo/bucket/prefix")
            .header("x-custom-header", "x-custom-value");

        assert!(options.validate().is_ok());
        assert_eq!(options.statement.as_deref(), Some("SELECT 1"));
        assert_eq!(
            options.resultset_target.as_deref(),
            Some("cos://us-geo/bucket/prefix")
        );
        assert_eq!(
            options.headers.get("x-custom-header").map(String::as_str),
            Some("x-custom-value")
        );
    }

    #[test]
    fn test_list_tables_builder() {
        let options = ListTablesOptions::new()
            .name_pattern("pluto")
            .table_type(TableType::Table);

        assert_eq!(options.name_pattern.as_deref(), Some("pluto"));
        assert_eq!(options.table_type, Some(TableType::Table));
        assert!(options.headers.is_empty());
    }
}
