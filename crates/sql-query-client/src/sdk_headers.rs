//! SDK-identifying headers attached to every operation.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

pub(crate) const SERVICE_NAME: &str = "sql";
pub(crate) const SERVICE_VERSION: &str = "V2";

const ANALYTICS_HEADER: HeaderName = HeaderName::from_static("x-ibmcloud-sdk-analytics");

/// User-Agent for this SDK: name/version plus language, arch and OS.
pub fn user_agent() -> String {
    format!(
        "sql-query-rust-sdk/{} (lang=rust; arch={}; os={})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH,
        std::env::consts::OS
    )
}

/// Analytics header for one operation.
pub(crate) fn sdk_headers(operation_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let analytics = format!(
        "service_name={};service_version={};operation_id={}",
        SERVICE_NAME, SERVICE_VERSION, operation_id
    );
    if let Ok(value) = HeaderValue::from_str(&analytics) {
        headers.insert(ANALYTICS_HEADER, value);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_format() {
        let ua = user_agent();
        assert!(ua.starts_with("sql-query-rust-sdk/"));
        assert!(ua.contains("lang=rust"));
    }

    #[test]
    fn test_analytics_header() {
        let headers = sdk_headers("ListTables");
        assert_eq!(
            headers.get("x-ibmcloud-sdk-analytics").unwrap().to_str().unwrap(),
            "service_name=sql;service_version=V2;operation_id=ListTables"
        );
    }
}
