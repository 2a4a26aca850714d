use super::media::MediaRequest;
use super::{DriveTransport, RequestParams, SheetsTransport, SlidesTransport, ValueInputOption};
use crate::config::EndpointsConfig;
use crate::credentials::Credentials;
use crate::error::{GatewayError, Result};
use crate::gateway::Surface;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// reqwest-backed transport for Drive, Sheets and Slides.
///
/// Sends one HTTP request per call, authenticated with the bearer token from
/// [`Credentials`]. Non-2xx answers become [`GatewayError::Http`]; requests
/// that never got an answer become [`GatewayError::Transport`].
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    credentials: Credentials,
    endpoints: EndpointsConfig,
}

impl RestClient {
    /// Create a new REST client
    pub fn new(
        credentials: Credentials,
        endpoints: EndpointsConfig,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            credentials,
            endpoints,
        })
    }

    /// Connector building one client per surface, for
    /// [`GatewayRegistry`](crate::registry::GatewayRegistry)
    pub fn connector(
        endpoints: EndpointsConfig,
        timeout: Duration,
    ) -> impl Fn(Surface, &Credentials) -> Result<RestClient> + Send + Sync + 'static {
        move |surface, credentials| {
            debug!(surface = %surface, "Creating REST transport");
            RestClient::new(credentials.clone(), endpoints.clone(), timeout)
        }
    }

    fn url(&self, base: &str, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(base)
            .map_err(|e| GatewayError::Config(format!("Invalid endpoint '{}': {}", base, e)))?;

        url.path_segments_mut()
            .map_err(|_| GatewayError::Config(format!("Endpoint '{}' cannot be a base", base)))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    fn request(&self, method: Method, url: Url, params: &RequestParams) -> RequestBuilder {
        debug!(method = %method, path = %url.path(), "Dispatching request");

        let request = self
            .client
            .request(method, url)
            .bearer_auth(self.credentials.bearer_token());

        if params.is_empty() {
            request
        } else {
            request.query(params)
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_response(status.as_u16(), &body));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            // e.g. 204 No Content from deletes
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    fn drive(&self, segments: &[&str]) -> Result<Url> {
        self.url(&self.endpoints.drive, segments)
    }

    fn sheets(&self, segments: &[&str]) -> Result<Url> {
        self.url(&self.endpoints.sheets, segments)
    }

    fn slides(&self, segments: &[&str]) -> Result<Url> {
        self.url(&self.endpoints.slides, segments)
    }
}

#[async_trait]
impl DriveTransport for RestClient {
    type Media = MediaRequest;

    async fn list_files(&self, query: Option<&str>, params: &RequestParams) -> Result<Value> {
        let mut params = params.clone();
        if let Some(query) = query {
            params.insert("q", query);
        }
        let url = self.drive(&["files"])?;
        self.send(self.request(Method::GET, url, &params)).await
    }

    async fn get_file(&self, file_id: &str, params: &RequestParams) -> Result<Value> {
        let url = self.drive(&["files", file_id])?;
        self.send(self.request(Method::GET, url, params)).await
    }

    async fn create_file(&self, body: &Value, params: &RequestParams) -> Result<Value> {
        let url = self.drive(&["files"])?;
        self.send(self.request(Method::POST, url, params).json(body))
            .await
    }

    async fn update_file(
        &self,
        file_id: &str,
        body: Option<&Value>,
        params: &RequestParams,
    ) -> Result<Value> {
        let url = self.drive(&["files", file_id])?;
        let request = self.request(Method::PATCH, url, params);
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };
        self.send(request).await
    }

    async fn delete_file(&self, file_id: &str, params: &RequestParams) -> Result<Value> {
        let url = self.drive(&["files", file_id])?;
        self.send(self.request(Method::DELETE, url, params)).await
    }

    async fn copy_file(
        &self,
        file_id: &str,
        body: Option<&Value>,
        params: &RequestParams,
    ) -> Result<Value> {
        let url = self.drive(&["files", file_id, "copy"])?;
        let body = body.cloned().unwrap_or_else(|| json!({}));
        self.send(self.request(Method::POST, url, params).json(&body))
            .await
    }

    async fn list_permissions(&self, file_id: &str, params: &RequestParams) -> Result<Value> {
        let url = self.drive(&["files", file_id, "permissions"])?;
        self.send(self.request(Method::GET, url, params)).await
    }

    async fn create_permission(
        &self,
        file_id: &str,
        body: &Value,
        params: &RequestParams,
    ) -> Result<Value> {
        let url = self.drive(&["files", file_id, "permissions"])?;
        self.send(self.request(Method::POST, url, params).json(body))
            .await
    }

    async fn delete_permission(
        &self,
        file_id: &str,
        permission_id: &str,
        params: &RequestParams,
    ) -> Result<Value> {
        let url = self.drive(&["files", file_id, "permissions", permission_id])?;
        self.send(self.request(Method::DELETE, url, params)).await
    }

    fn get_media(&self, file_id: &str, params: &RequestParams) -> Result<MediaRequest> {
        let params = params.clone().with("alt", "media");
        let url = self.drive(&["files", file_id])?;
        Ok(MediaRequest::new(
            file_id,
            self.request(Method::GET, url, &params),
        ))
    }

    fn export_file(
        &self,
        file_id: &str,
        mime_type: &str,
        params: &RequestParams,
    ) -> Result<MediaRequest> {
        let params = params.clone().with("mimeType", mime_type);
        let url = self.drive(&["files", file_id, "export"])?;
        Ok(MediaRequest::new(
            file_id,
            self.request(Method::GET, url, &params),
        ))
    }
}

#[async_trait]
impl SheetsTransport for RestClient {
    async fn get_spreadsheet(
        &self,
        spreadsheet_id: &str,
        params: &RequestParams,
    ) -> Result<Value> {
        let url = self.sheets(&["spreadsheets", spreadsheet_id])?;
        self.send(self.request(Method::GET, url, params)).await
    }

    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        params: &RequestParams,
    ) -> Result<Value> {
        let url = self.sheets(&["spreadsheets", spreadsheet_id, "values", range])?;
        self.send(self.request(Method::GET, url, params)).await
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<Value>],
        value_input_option: ValueInputOption,
        params: &RequestParams,
    ) -> Result<Value> {
        let params = params
            .clone()
            .with("valueInputOption", value_input_option);
        let url = self.sheets(&["spreadsheets", spreadsheet_id, "values", range])?;
        let body = json!({ "values": values });
        self.send(self.request(Method::PUT, url, &params).json(&body))
            .await
    }

    async fn batch_update_values(
        &self,
        spreadsheet_id: &str,
        data: &[Value],
        value_input_option: ValueInputOption,
        params: &RequestParams,
    ) -> Result<Value> {
        let url = self.sheets(&["spreadsheets", spreadsheet_id, "values:batchUpdate"])?;
        let body = json!({
            "valueInputOption": value_input_option,
            "data": data,
        });
        self.send(self.request(Method::POST, url, params).json(&body))
            .await
    }

    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        body: &Value,
        params: &RequestParams,
    ) -> Result<Value> {
        let target = format!("{}:batchUpdate", spreadsheet_id);
        let url = self.sheets(&["spreadsheets", &target])?;
        self.send(self.request(Method::POST, url, params).json(body))
            .await
    }
}

#[async_trait]
impl SlidesTransport for RestClient {
    async fn get_presentation(
        &self,
        presentation_id: &str,
        params: &RequestParams,
    ) -> Result<Value> {
        let url = self.slides(&["presentations", presentation_id])?;
        self.send(self.request(Method::GET, url, params)).await
    }

    async fn get_page(
        &self,
        presentation_id: &str,
        page_id: &str,
        params: &RequestParams,
    ) -> Result<Value> {
        let url = self.slides(&["presentations", presentation_id, "pages", page_id])?;
        self.send(self.request(Method::GET, url, params)).await
    }

    async fn batch_update(&self, presentation_id: &str, body: &Value) -> Result<Value> {
        let target = format!("{}:batchUpdate", presentation_id);
        let url = self.slides(&["presentations", &target])?;
        self.send(self.request(Method::POST, url, &RequestParams::new()).json(body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(drive: &str) -> RestClient {
        let endpoints = EndpointsConfig {
            drive: drive.to_string(),
            ..Default::default()
        };
        RestClient::new(
            Credentials::bearer("token"),
            endpoints,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_url_building_encodes_segments() {
        let client = client("https://www.googleapis.com/drive/v3/");
        let url = client.drive(&["files", "abc 123", "copy"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/drive/v3/files/abc%20123/copy"
        );

        let url = client
            .sheets(&["spreadsheets", "sheet-id", "values", "Data!A1:B2"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-id/values/Data!A1:B2"
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        let client = client("not a url");
        assert!(matches!(
            client.drive(&["files"]),
            Err(GatewayError::Config(_))
        ));
    }

    #[test]
    fn test_media_request_is_not_sent() {
        let client = client("https://www.googleapis.com/drive/v3");
        let media = client
            .get_media("file-1", &RequestParams::new())
            .unwrap();
        assert_eq!(media.file_id(), "file-1");
    }
}
