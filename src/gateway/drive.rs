use super::{ServiceGateway, Surface};
use crate::error::Result;
use crate::rate_limit::{Channel, RateLimitConfig, RateLimiter};
use crate::retry::RetryConfig;
use crate::transport::{DriveTransport, RequestParams};
use serde_json::Value;
use std::sync::Arc;

/// Drive v3 behind the gateway.
///
/// Drive normally runs a single budget, so the read/write split below only
/// matters for metrics unless the configuration sets a `write_rate`.
#[derive(Debug)]
pub struct DriveApi<T> {
    core: ServiceGateway<T>,
}

impl<T: DriveTransport> DriveApi<T> {
    pub fn new(transport: Arc<T>, limits: &RateLimitConfig, retry: RetryConfig) -> Result<Self> {
        ServiceGateway::new(Surface::Drive, transport, limits, retry).map(Self::from_gateway)
    }

    pub fn from_gateway(core: ServiceGateway<T>) -> Self {
        Self { core }
    }

    pub fn gateway(&self) -> &ServiceGateway<T> {
        &self.core
    }

    pub fn limiter(&self) -> &dyn RateLimiter {
        self.core.limiter()
    }

    pub fn transport(&self) -> &Arc<T> {
        self.core.transport()
    }

    /// Search files; `query` uses the Drive `q` syntax
    pub async fn list_files(&self, query: Option<&str>, params: &RequestParams) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Read, "list_files", move || {
                transport.list_files(query, params)
            })
            .await
    }

    pub async fn get_file(&self, file_id: &str, params: &RequestParams) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Read, "get_file", move || {
                transport.get_file(file_id, params)
            })
            .await
    }

    pub async fn list_permissions(&self, file_id: &str, params: &RequestParams) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Read, "list_permissions", move || {
                transport.list_permissions(file_id, params)
            })
            .await
    }

    pub async fn create_file(&self, body: &Value, params: &RequestParams) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Write, "create_file", move || {
                transport.create_file(body, params)
            })
            .await
    }

    pub async fn update_file(
        &self,
        file_id: &str,
        body: Option<&Value>,
        params: &RequestParams,
    ) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Write, "update_file", move || {
                transport.update_file(file_id, body, params)
            })
            .await
    }

    pub async fn delete_file(&self, file_id: &str, params: &RequestParams) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Write, "delete_file", move || {
                transport.delete_file(file_id, params)
            })
            .await
    }

    pub async fn copy_file(
        &self,
        file_id: &str,
        body: Option<&Value>,
        params: &RequestParams,
    ) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Write, "copy_file", move || {
                transport.copy_file(file_id, body, params)
            })
            .await
    }

    pub async fn create_permission(
        &self,
        file_id: &str,
        body: &Value,
        params: &RequestParams,
    ) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Write, "create_permission", move || {
                transport.create_permission(file_id, body, params)
            })
            .await
    }

    pub async fn delete_permission(
        &self,
        file_id: &str,
        permission_id: &str,
        params: &RequestParams,
    ) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Write, "delete_permission", move || {
                transport.delete_permission(file_id, permission_id, params)
            })
            .await
    }

    /// Charge one read permit and hand back the unsent download
    pub async fn get_media(&self, file_id: &str, params: &RequestParams) -> Result<T::Media> {
        self.core
            .prepare(Channel::Read, "get_media", |transport| {
                transport.get_media(file_id, params)
            })
            .await
    }

    /// Charge one read permit and hand back the unsent export
    pub async fn export_file(
        &self,
        file_id: &str,
        mime_type: &str,
        params: &RequestParams,
    ) -> Result<T::Media> {
        self.core
            .prepare(Channel::Read, "export_file", |transport| {
                transport.export_file(file_id, mime_type, params)
            })
            .await
    }
}
