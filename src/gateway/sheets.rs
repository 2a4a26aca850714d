use super::{ServiceGateway, Surface};
use crate::error::Result;
use crate::rate_limit::{Channel, RateLimitConfig, RateLimiter};
use crate::retry::RetryConfig;
use crate::transport::{RequestParams, SheetsTransport, ValueInputOption};
use serde_json::Value;
use std::sync::Arc;

/// Sheets v4 behind the gateway, with separate read and write budgets
#[derive(Debug)]
pub struct SheetsApi<T> {
    core: ServiceGateway<T>,
}

impl<T: SheetsTransport> SheetsApi<T> {
    pub fn new(transport: Arc<T>, limits: &RateLimitConfig, retry: RetryConfig) -> Result<Self> {
        ServiceGateway::new(Surface::Sheets, transport, limits, retry).map(Self::from_gateway)
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

    pub async fn get_spreadsheet(
        &self,
        spreadsheet_id: &str,
        params: &RequestParams,
    ) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Read, "get_spreadsheet", move || {
                transport.get_spreadsheet(spreadsheet_id, params)
            })
            .await
    }

    /// Read one A1 range
    pub async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        params: &RequestParams,
    ) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Read, "get_values", move || {
                transport.get_values(spreadsheet_id, range, params)
            })
            .await
    }

    /// Overwrite one A1 range with rows of cell values
    pub async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<Value>],
        value_input_option: ValueInputOption,
        params: &RequestParams,
    ) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Write, "update_values", move || {
                transport.update_values(spreadsheet_id, range, values, value_input_option, params)
            })
            .await
    }

    pub async fn batch_update_values(
        &self,
        spreadsheet_id: &str,
        data: &[Value],
        value_input_option: ValueInputOption,
        params: &RequestParams,
    ) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Write, "batch_update_values", move || {
                transport.batch_update_values(spreadsheet_id, data, value_input_option, params)
            })
            .await
    }

    pub async fn batch_update(
        &self,
        spreadsheet_id: &str,
        body: &Value,
        params: &RequestParams,
    ) -> Result<Value> {
        let transport = self.core.transport().as_ref();
        self.core
            .call(Channel::Write, "batch_update", move || {
                transport.batch_update(spreadsheet_id, body, params)
            })
            .await
    }
}
