use gapi_gateway::rate_limit::{Channel, ChannelMode};
use gapi_gateway::{Credentials, GatewayConfig, GatewayRegistry, RestClient, Surface};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Constructions = Arc<Mutex<HashMap<Surface, usize>>>;

fn registry() -> (Arc<GatewayRegistry<RestClient>>, Constructions) {
    let config = GatewayConfig::default();
    let constructions = Constructions::default();
    let connector = RestClient::connector(config.endpoints.clone(), Duration::from_secs(5));

    let counted = constructions.clone();
    let registry = GatewayRegistry::new(config, move |surface, credentials: &Credentials| {
        *counted.lock().unwrap().entry(surface).or_default() += 1;
        connector(surface, credentials)
    });

    (Arc::new(registry), constructions)
}

#[tokio::test]
async fn test_concurrent_first_calls_construct_once() {
    let (registry, constructions) = registry();
    let credentials = Credentials::bearer("token");

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = registry.clone();
            let credentials = credentials.clone();
            tokio::spawn(async move { registry.sheets(&credentials).await.unwrap() })
        })
        .collect();

    let mut gateways = Vec::new();
    for handle in handles {
        gateways.push(handle.await.unwrap());
    }

    assert!(gateways.iter().all(|g| Arc::ptr_eq(g, &gateways[0])));
    assert_eq!(constructions.lock().unwrap().get(&Surface::Sheets), Some(&1));
    assert!(registry.is_initialized(Surface::Sheets).await);
    assert!(!registry.is_initialized(Surface::Drive).await);
}

#[tokio::test]
async fn test_each_surface_gets_its_own_budget() {
    let (registry, constructions) = registry();
    let credentials = Credentials::bearer("token");

    let drive = registry.drive(&credentials).await.unwrap();
    let sheets = registry.sheets(&credentials).await.unwrap();
    let slides = registry.slides(&credentials).await.unwrap();

    assert_eq!(drive.limiter().mode(), ChannelMode::Single);
    assert_eq!(drive.limiter().rate(Channel::Read), 12000.0);
    assert_eq!(sheets.limiter().rate(Channel::Write), 60.0);
    assert_eq!(slides.limiter().rate(Channel::Read), 600.0);
    assert_eq!(constructions.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_reset_builds_a_new_instance() {
    let (registry, constructions) = registry();
    let credentials = Credentials::bearer("token");

    let first = registry.slides(&credentials).await.unwrap();
    let again = registry.slides(&credentials).await.unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    registry.reset(Surface::Slides).await;
    assert!(!registry.is_initialized(Surface::Slides).await);

    let second = registry.slides(&credentials).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(constructions.lock().unwrap().get(&Surface::Slides), Some(&2));

    // handles from before the reset keep working
    assert_eq!(first.limiter().mode(), ChannelMode::Dual);
}

#[tokio::test]
async fn test_reset_all() {
    let (registry, _) = registry();
    let credentials = Credentials::bearer("token");

    registry.drive(&credentials).await.unwrap();
    registry.sheets(&credentials).await.unwrap();
    registry.slides(&credentials).await.unwrap();

    registry.reset_all().await;

    for surface in Surface::ALL {
        assert!(!registry.is_initialized(surface).await, "{}", surface);
    }
}

#[tokio::test]
async fn test_reset_while_getting_is_safe() {
    let (registry, _) = registry();
    let credentials = Credentials::bearer("token");

    let mut handles = Vec::new();
    for i in 0..32 {
        let registry = registry.clone();
        let credentials = credentials.clone();
        handles.push(tokio::spawn(async move {
            if i % 4 == 0 {
                registry.reset(Surface::Drive).await;
            } else {
                registry.drive(&credentials).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let drive = registry.drive(&credentials).await.unwrap();
    assert_eq!(drive.gateway().surface(), Surface::Drive);
}
