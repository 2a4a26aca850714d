//! Transport seam between the gateways and the Google REST APIs.
//!
//! Each surface has a trait with one method per REST operation. A transport
//! performs exactly one dispatch per call and reports failures as
//! [`GatewayError`](crate::error::GatewayError), carrying the HTTP status when
//! there is one. [`RestClient`] is the reqwest implementation; tests inject
//! their own.

pub mod media;
pub mod rest;

pub use media::{MediaRequest, MediaStream};
pub use rest::RestClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Extra query parameters forwarded untouched to the API
/// (`fields`, `supportsAllDrives`, `pageToken`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestParams(BTreeMap<String, String>);

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// How Sheets interprets written values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueInputOption {
    /// Stored as-is
    #[default]
    Raw,
    /// Parsed as if typed into the UI (formulas, dates)
    UserEntered,
}

impl ValueInputOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInputOption::Raw => "RAW",
            ValueInputOption::UserEntered => "USER_ENTERED",
        }
    }
}

impl fmt::Display for ValueInputOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Google Drive v3 operations
#[async_trait]
pub trait DriveTransport: Send + Sync {
    /// Unsent request handle returned for media downloads and exports
    type Media: Send;

    async fn list_files(&self, query: Option<&str>, params: &RequestParams) -> Result<Value>;

    async fn get_file(&self, file_id: &str, params: &RequestParams) -> Result<Value>;

    async fn create_file(&self, body: &Value, params: &RequestParams) -> Result<Value>;

    async fn update_file(
        &self,
        file_id: &str,
        body: Option<&Value>,
        params: &RequestParams,
    ) -> Result<Value>;

    async fn delete_file(&self, file_id: &str, params: &RequestParams) -> Result<Value>;

    async fn copy_file(
        &self,
        file_id: &str,
        body: Option<&Value>,
        params: &RequestParams,
    ) -> Result<Value>;

    async fn list_permissions(&self, file_id: &str, params: &RequestParams) -> Result<Value>;

    async fn create_permission(
        &self,
        file_id: &str,
        body: &Value,
        params: &RequestParams,
    ) -> Result<Value>;

    async fn delete_permission(
        &self,
        file_id: &str,
        permission_id: &str,
        params: &RequestParams,
    ) -> Result<Value>;

    /// Build, but do not send, a download of the file's content
    fn get_media(&self, file_id: &str, params: &RequestParams) -> Result<Self::Media>;

    /// Build, but do not send, an export of a Google document to `mime_type`
    fn export_file(
        &self,
        file_id: &str,
        mime_type: &str,
        params: &RequestParams,
    ) -> Result<Self::Media>;
}

/// Google Sheets v4 operations
#[async_trait]
pub trait SheetsTransport: Send + Sync {
    async fn get_spreadsheet(&self, spreadsheet_id: &str, params: &RequestParams)
        -> Result<Value>;

    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        params: &RequestParams,
    ) -> Result<Value>;

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<Value>],
        value_input_option: ValueInputOption,
        params: &RequestParams,
    ) -> Result<Value>;

    /// `data` is a list of `ValueRange` objects (`range` + `values`)
    async fn batch_update_values(
        &self,
        spreadsheet_id: &str,
        data: &[Value],
        value_input_option: ValueInputOption,
        params: &RequestParams,
    ) -> Result<Value>;

    /// Structural changes (add sheet, update properties, ...)
    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        body: &Value,
        params: &RequestParams,
    ) -> Result<Value>;
}

/// Google Slides v1 operations
#[async_trait]
pub trait SlidesTransport: Send + Sync {
    async fn get_presentation(
        &self,
        presentation_id: &str,
        params: &RequestParams,
    ) -> Result<Value>;

    async fn get_page(
        &self,
        presentation_id: &str,
        page_id: &str,
        params: &RequestParams,
    ) -> Result<Value>;

    async fn batch_update(&self, presentation_id: &str, body: &Value) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_params() {
        let params = RequestParams::new()
            .with("fields", "files(id,name)")
            .with("pageSize", 100)
            .with("supportsAllDrives", true);

        assert_eq!(params.get("pageSize"), Some("100"));
        assert_eq!(params.get("supportsAllDrives"), Some("true"));
        assert_eq!(params.get("q"), None);

        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["fields", "pageSize", "supportsAllDrives"]);
        assert!(RequestParams::new().is_empty());
    }

    #[test]
    fn test_value_input_option_serialization() {
        assert_eq!(
            serde_json::to_value(ValueInputOption::UserEntered).unwrap(),
            serde_json::json!("USER_ENTERED")
        );
        assert_eq!(ValueInputOption::default().as_str(), "RAW");
    }
}
