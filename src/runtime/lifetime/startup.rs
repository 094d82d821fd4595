use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::StaticConfig;
use crate::services::delivery::DeliveryChannel;
use crate::services::{ActivationService, AdminService};
use crate::storage::{StateStore, StorageFactory};

pub struct StartupContext {
    pub store: StateStore,
    pub activation: Arc<ActivationService>,
    pub admin: Arc<AdminService>,
}

/// Opens the configured store, wrapped for typed record access.
pub async fn open_store(config: &StaticConfig, clock: Arc<dyn Clock>) -> Result<StateStore> {
    let backend = StorageFactory::create(&config.store, clock)
        .await
        .context("Failed to create storage backend")?;
    Ok(StateStore::new(backend).with_scan_count(config.store.scan_count))
}

/// 准备服务器启动的上下文
/// 包括存储、投递渠道和业务服务
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    for warning in config.warnings() {
        warn!("{}", warning);
    }

    let clock = SystemClock::arc();
    let store = open_store(config, clock.clone()).await?;
    let delivery = DeliveryChannel::from_config(&config.delivery);

    let activation = Arc::new(ActivationService::new(
        store.clone(),
        delivery,
        clock.clone(),
    ));
    let admin = Arc::new(AdminService::new(store.clone(), clock));

    info!(
        "Pre-startup completed in {:.2?} (store: {})",
        start_time.elapsed(),
        store.backend_name()
    );

    Ok(StartupContext {
        store,
        activation,
        admin,
    })
}

/// CLI 管理命令只需要存储和 AdminService
pub async fn prepare_admin(config: &StaticConfig) -> Result<AdminService> {
    let clock = SystemClock::arc();
    let store = open_store(config, clock.clone()).await?;
    Ok(AdminService::new(store, clock))
}
