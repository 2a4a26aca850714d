use crate::error::{GatewayError, Result};
use bytes::{Bytes, BytesMut};
use tracing::debug;

/// An unsent download or export request.
///
/// The gateway charges one permit when it hands this out; sending it and
/// reading the body chunk by chunk costs nothing further.
#[derive(Debug)]
pub struct MediaRequest {
    file_id: String,
    request: reqwest::RequestBuilder,
}

impl MediaRequest {
    pub(crate) fn new(file_id: &str, request: reqwest::RequestBuilder) -> Self {
        Self {
            file_id: file_id.to_string(),
            request,
        }
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    /// Send the request and start streaming the body
    pub async fn send(self) -> Result<MediaStream> {
        let response = self.request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_response(status.as_u16(), &body));
        }

        debug!(
            file_id = %self.file_id,
            content_length = ?response.content_length(),
            "Media stream opened"
        );

        Ok(MediaStream { response })
    }
}

/// Body of a media download, read incrementally
#[derive(Debug)]
pub struct MediaStream {
    response: reqwest::Response,
}

impl MediaStream {
    /// Size announced by the server, if any
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Next chunk of the body, `None` once it is exhausted
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.response.chunk().await?)
    }

    /// Read the remaining body into memory
    pub async fn collect(mut self) -> Result<Bytes> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.next_chunk().await? {
            buffer.extend_from_slice(&chunk);
        }
        Ok(buffer.freeze())
    }
}
