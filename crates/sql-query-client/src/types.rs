//! Response types for the SQL Query API.
//!
//! These types mirror the API response structures. Fields the service
//! always returns are plain values, so a response that omits one fails to
//! decode instead of producing a zeroed field. Optional fields are `Option`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Execution status of an SQL job.
///
/// Jobs move `queued -> running -> {completed, failed}` on the service side;
/// the client only observes snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    /// A status value this client version does not know about, kept verbatim
    Other(String),
}

impl JobStatus {
    /// Returns true once the job can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Other(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "queued" => JobStatus::Queued,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Other(value),
        }
    }
}

impl From<JobStatus> for String {
    fn from(value: JobStatus) -> Self {
        match value {
            JobStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The type of a catalog table.
///
/// The service has been observed returning both `table` and `TABLE`, so
/// parsing is case-insensitive. Unrecognized values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TableType {
    Table,
    View,
    Other(String),
}

impl TableType {
    pub fn as_str(&self) -> &str {
        match self {
            TableType::Table => "table",
            TableType::View => "view",
            TableType::Other(s) => s,
        }
    }
}

impl From<String> for TableType {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("table") {
            TableType::Table
        } else if value.eq_ignore_ascii_case("view") {
            TableType::View
        } else {
            TableType::Other(value)
        }
    }
}

impl From<&str> for TableType {
    fn from(value: &str) -> Self {
        TableType::from(value.to_string())
    }
}

impl From<TableType> for String {
    fn from(value: TableType) -> Self {
        match value {
            TableType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl FromStr for TableType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TableType::from(s))
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Abridged information about an SQL job (submit and list endpoints).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlJobInfoShort {
    /// Identifier for an SQL job
    pub job_id: String,
    /// Execution status
    pub status: JobStatus,
    /// ID of the user who submitted the job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// When the job was accepted by the service
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub submit_time: Option<DateTime<Utc>>,
    /// Whether the job has an improvement hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_hints: Option<bool>,
}

/// Full information about an SQL job, including output or error details.
///
/// A job that failed on the service side still decodes successfully; the
/// failure is reported in `error` and `error_message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlJobInfoFull {
    /// Identifier for an SQL job
    pub job_id: String,
    /// Execution status
    pub status: JobStatus,
    /// ID of the user who submitted the job
    pub user_id: String,
    /// When the job was accepted by the service
    #[serde(with = "timestamp")]
    pub submit_time: DateTime<Utc>,
    /// The SQL statement the job processes
    pub statement: String,
    /// Service plan id of the instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    /// Format of the query result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resultset_format: Option<String>,
    /// URI prefix under which the query result is stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resultset_location: Option<String>,
    /// When the job finished processing
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "counter::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub rows_returned: Option<u64>,
    #[serde(
        default,
        deserialize_with = "counter::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub rows_read: Option<u64>,
    #[serde(
        default,
        deserialize_with = "counter::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub bytes_read: Option<u64>,
    /// Objects skipped using index management
    #[serde(
        default,
        deserialize_with = "counter::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub objects_skipped: Option<u64>,
    /// Objects qualified using index management
    #[serde(
        default,
        deserialize_with = "counter::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub objects_qualified: Option<u64>,
    /// Error encountered while processing the job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Detailed information about the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Suggested query optimizations
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub hints: Vec<String>,
}

impl SqlJobInfoFull {
    /// Returns true if the service reported a failure for this job.
    pub fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed || self.error.is_some()
    }
}

/// List of recently submitted SQL jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlJobInfoList {
    pub jobs: Vec<SqlJobInfoShort>,
}

/// Short metadata about a catalog table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub table_type: TableType,
}

/// List of catalog tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableList {
    /// Table names
    pub tables: Vec<String>,
    /// Metadata about the returned tables
    pub tables_metadata: Vec<TableMetadata>,
}

/// Detailed information about a catalog table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInformation {
    pub name: String,
    #[serde(rename = "type")]
    pub table_type: TableType,
    /// Columns in table order
    pub columns: Vec<ColumnInformation>,
}

/// Information about a table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInformation {
    pub name: String,
    /// Data type of the column
    #[serde(rename = "type")]
    pub column_type: String,
    /// Whether the column may contain NULL values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
}

/// Body of a submit request. Unset fields are omitted, never sent as null.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SubmitSqlJobBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resultset_target: Option<&'a str>,
}

/// Error body returned by the service on non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiError {
    #[serde(default, alias = "message", alias = "errorMessage")]
    pub error: Option<String>,
    #[serde(default)]
    pub errors: Vec<ApiErrorItem>,
    #[serde(default, alias = "trace")]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorItem {
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiError {
    pub fn message(&self) -> Option<String> {
        self.error
            .clone()
            .or_else(|| self.errors.iter().find_map(|e| e.message.clone()))
    }
}

/// Reads `null` the same as an absent list.
fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(d).map(Option::unwrap_or_default)
}

/// Job counters are JSON numbers; integral values such as `12.0` or
/// `1.5e3` are accepted alongside plain integers.
mod counter {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        let Some(number) = Option::<serde_json::Number>::deserialize(d)? else {
            return Ok(None);
        };
        if let Some(n) = number.as_u64() {
            return Ok(Some(n));
        }
        number
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f < u64::MAX as f64)
            .map(|f| Some(f as u64))
            .ok_or_else(|| D::Error::custom(format!("invalid counter value: {number}")))
    }
}

/// Timestamp codec accepting RFC 3339 and zone-less ISO-8601.
///
/// The service emits values like `2019-01-01T12:00:00` without an offset;
/// those are read as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => super::serialize(v, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid timestamp: {raw}"))
                }),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_job_info_full_deserialize() {
        let json = r#"{
            "job_id": "637a0b7d-069d-453f-a418-a35d4db3ea64",
            "status": "completed",
            "user_id": "test_user@my.org",
            "submit_time": "2019-01-01T12:00:00",
            "statement": "SELECT 1",
            "end_time": "2019-01-01T12:00:05.250Z",
            "rows_returned": 12,
            "hints": ["use parquet"]
        }"#;

        let job: SqlJobInfoFull = serde_json::from_str(json).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(
            job.submit_time,
            Utc.with_ymd_and_hms(2019, 1, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(job.end_time.unwrap().timestamp_subsec_millis(), 250);
        assert_eq!(job.rows_returned, Some(12));
        assert_eq!(job.rows_read, None);
        assert_eq!(job.hints, vec!["use parquet".to_string()]);
        assert!(!job.is_failed());
    }

    #[test]
    fn test_job_info_missing_required_field() {
        // no job_id
        let json = r#"{"status": "queued"}"#;
        assert!(serde_json::from_str::<SqlJobInfoShort>(json).is_err());

        // no status
        let json = r#"{"job_id": "abc"}"#;
        assert!(serde_json::from_str::<SqlJobInfoShort>(json).is_err());

        // full info requires statement
        let json = r#"{"job_id": "abc", "status": "running", "user_id": "u", "submit_time": "2019-01-01T12:00:00"}"#;
        assert!(serde_json::from_str::<SqlJobInfoFull>(json).is_err());
    }

    #[test]
    fn test_unknown_status_keeps_service_value() {
        let json = r#"{"job_id": "abc", "status": "stopping"}"#;
        let job: SqlJobInfoShort = serde_json::from_str(json).unwrap();
        assert_eq!(job.status, JobStatus::Other("stopping".to_string()));
        assert!(!job.status.is_terminal());
        assert_eq!(job.status.to_string(), "stopping");

        let out = serde_json::to_value(&job).unwrap();
        assert_eq!(out["status"], "stopping");
    }

    #[test]
    fn test_counters_accept_integral_floats() {
        let json = r#"{
            "job_id": "abc",
            "status": "completed",
            "user_id": "u",
            "submit_time": "2019-01-01T12:00:00",
            "statement": "SELECT 1",
            "rows_returned": 12.0,
            "rows_read": 8,
            "bytes_read": 1.5e3,
            "objects_skipped": null
        }"#;

        let job: SqlJobInfoFull = serde_json::from_str(json).unwrap();
        assert_eq!(job.rows_returned, Some(12));
        assert_eq!(job.rows_read, Some(8));
        assert_eq!(job.bytes_read, Some(1500));
        assert_eq!(job.objects_skipped, None);
        assert_eq!(job.objects_qualified, None);
    }

    #[test]
    fn test_fractional_counter_rejected() {
        let json = r#"{"job_id": "abc", "status": "completed", "user_id": "u", "submit_time": "2019-01-01T12:00:00", "statement": "SELECT 1", "rows_read": 2.5}"#;
        assert!(serde_json::from_str::<SqlJobInfoFull>(json).is_err());
    }

    #[test]
    fn test_null_hints_read_as_empty() {
        let json = r#"{"job_id": "abc", "status": "running", "user_id": "u", "submit_time": "2019-01-01T12:00:00", "statement": "SELECT 1", "hints": null}"#;
        let job: SqlJobInfoFull = serde_json::from_str(json).unwrap();
        assert!(job.hints.is_empty());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_table_type_case_insensitive() {
        let json = r#"{"name": "orders", "type": "VIEW"}"#;
        let meta: TableMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.table_type, TableType::View);

        let json = r#"{"name": "orders", "type": "external"}"#;
        let meta: TableMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.table_type, TableType::Other("external".to_string()));
        assert_eq!(meta.table_type.to_string(), "external");
    }

    #[test]
    fn test_table_requires_columns() {
        let json = r#"{"name": "orders", "type": "table"}"#;
        assert!(serde_json::from_str::<TableInformation>(json).is_err());
    }

    #[test]
    fn test_submit_body_omits_unset_fields() {
        let body = SubmitSqlJobBody {
            statement: Some("SELECT 1"),
            resultset_target: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"statement":"SELECT 1"}"#);
    }

    #[test]
    fn test_api_error_message_fallbacks() {
        let err: ApiError =
            serde_json::from_str(r#"{"errors": [{"message": "bad crn"}], "trace": "t-1"}"#)
                .unwrap();
        assert_eq!(err.message(), Some("bad crn".to_string()));
        assert_eq!(err.request_id, Some("t-1".to_string()));
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let json = r#"{"job_id": "abc", "status": "queued", "submit_time": "yesterday"}"#;
        assert!(serde_json::from_str::<SqlJobInfoShort>(json).is_err());
    }
}
