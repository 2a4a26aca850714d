//! One shared gateway per API surface.
//!
//! Every task talking to, say, Sheets must draw on the same limiter or the
//! per-project quota is exceeded. [`GatewayRegistry`] hands out that shared
//! instance, creating it on first use.

use crate::config::GatewayConfig;
use crate::credentials::Credentials;
use crate::error::Result;
use crate::gateway::{DriveApi, SheetsApi, SlidesApi, Surface};
use crate::transport::{DriveTransport, SheetsTransport, SlidesTransport};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Builds the transport for a surface from the caller's credentials
pub type Connector<T> = Arc<dyn Fn(Surface, &Credentials) -> Result<T> + Send + Sync>;

type Slot<G> = RwLock<Option<Arc<G>>>;

/// Lazily created gateways, one per surface.
///
/// The credentials passed to a getter are only used when the gateway does not
/// exist yet; later callers receive the existing instance whatever they pass.
pub struct GatewayRegistry<T> {
    config: GatewayConfig,
    connector: Connector<T>,
    drive: Slot<DriveApi<T>>,
    sheets: Slot<SheetsApi<T>>,
    slides: Slot<SlidesApi<T>>,
}

impl<T> GatewayRegistry<T> {
    pub fn new<C>(config: GatewayConfig, connector: C) -> Self
    where
        C: Fn(Surface, &Credentials) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            config,
            connector: Arc::new(connector),
            drive: RwLock::new(None),
            sheets: RwLock::new(None),
            slides: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The shared Drive gateway, created on first use
    pub async fn drive(&self, credentials: &Credentials) -> Result<Arc<DriveApi<T>>>
    where
        T: DriveTransport,
    {
        get_or_init(&self.drive, Surface::Drive, || {
            let transport = Arc::new((self.connector)(Surface::Drive, credentials)?);
            DriveApi::new(transport, &self.config.drive, self.config.retry.clone())
        })
        .await
    }

    /// The shared Sheets gateway, created on first use
    pub async fn sheets(&self, credentials: &Credentials) -> Result<Arc<SheetsApi<T>>>
    where
        T: SheetsTransport,
    {
        get_or_init(&self.sheets, Surface::Sheets, || {
            let transport = Arc::new((self.connector)(Surface::Sheets, credentials)?);
            SheetsApi::new(transport, &self.config.sheets, self.config.retry.clone())
        })
        .await
    }

    /// The shared Slides gateway, created on first use
    pub async fn slides(&self, credentials: &Credentials) -> Result<Arc<SlidesApi<T>>>
    where
        T: SlidesTransport,
    {
        get_or_init(&self.slides, Surface::Slides, || {
            let transport = Arc::new((self.connector)(Surface::Slides, credentials)?);
            SlidesApi::new(transport, &self.config.slides, self.config.retry.clone())
        })
        .await
    }

    /// Drop the gateway of `surface`; the next getter call builds a new one.
    ///
    /// Handles obtained earlier stay usable but no longer share a limiter with
    /// new callers.
    pub async fn reset(&self, surface: Surface) {
        match surface {
            Surface::Drive => *self.drive.write().await = None,
            Surface::Sheets => *self.sheets.write().await = None,
            Surface::Slides => *self.slides.write().await = None,
        }
        info!(surface = %surface, "Gateway reset");
    }

    pub async fn reset_all(&self) {
        for surface in Surface::ALL {
            self.reset(surface).await;
        }
    }

    pub async fn is_initialized(&self, surface: Surface) -> bool {
        match surface {
            Surface::Drive => self.drive.read().await.is_some(),
            Surface::Sheets => self.sheets.read().await.is_some(),
            Surface::Slides => self.slides.read().await.is_some(),
        }
    }
}

/// Double-checked initialisation: a read-lock lookup, then a re-check
/// and construction under the write lock.
async fn get_or_init<G, F>(slot: &Slot<G>, surface: Surface, init: F) -> Result<Arc<G>>
where
    F: FnOnce() -> Result<G>,
{
    if let Some(existing) = slot.read().await.as_ref() {
        return Ok(existing.clone());
    }

    let mut guard = slot.write().await;
    if let Some(existing) = guard.as_ref() {
        return Ok(existing.clone());
    }

    let gateway = Arc::new(init()?);
    *guard = Some(gateway.clone());
    info!(surface = %surface, "Gateway created");

    Ok(gateway)
}
