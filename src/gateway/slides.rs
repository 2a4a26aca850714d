use super::{ServiceGateway, Surface};
use crate::error::Result;
use crate::rate_limit::{Channel, RateLimitConfig, RateLimiter};
use crate::retry::RetryConfig;
use crate::transport::{RequestParams, SlidesTransport};
use serde_json::Value;
use std::sync::Arc;

/// Slides v1 behind the gateway.
///
/// Reads are cheap (600/min by default) while every `batch_update` draws on
/// the much smaller write budget.
#[derive(Debug)]
pub struct SlidesApi<T> {
    core: ServiceGateway<T>,
}

impl<T: SlidesTransport> SlidesApi<T> {
    pub fn new(transport: Arc<T>, limits: &RateLimitConfig, retry: RetryConfig) -> Result<Self> {
        ServiceGateway::new(Surface::Slides, transport, limits, retry).map(Self::from_gateway)
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

    pub async fn get_presentation(
        &self,
        presentation_id: &str,
        params: &RequestParams,
    ) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Read, "get_presentation", move || {
                transport.get_presentation(presentation_id, params)
            })
            .await
    }

    pub async fn get_page(
        &self,
        presentation_id: &str,
        page_id: &str,
        params: &RequestParams,
    ) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Read, "get_page", move || {
                transport.get_page(presentation_id, page_id, params)
            })
            .await
    }

    pub async fn batch_update(&self, presentation_id: &str, body: &Value) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Write, "batch_update", move || {
                transport.batch_update(presentation_id, body)
            })
            .await
    }
}
