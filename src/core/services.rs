//! Wiring of adapters, stores and workflows from configuration

use crate::adapters::notifier::{build_notifier, Notifier};
use crate::adapters::recup::{RecupApi, RecupHttpClient};
use crate::config::RecupConfig;
use crate::core::booking::BookingDriver;
use crate::core::cancellation::CancellationDriver;
use crate::core::monitor::{CycleScheduler, Monitor, Poller};
use crate::core::store::Stores;
use crate::domain::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared handles used by every command
#[derive(Clone)]
pub struct Services {
    pub api: Arc<dyn RecupApi>,
    pub notifier: Arc<dyn Notifier>,
    pub stores: Stores,
    pub scheduler: CycleScheduler,
    pub documents_dir: PathBuf,
}

impl Services {
    /// Builds the HTTP client, the notifier and opens the stores
    pub fn from_config(config: &RecupConfig) -> Result<Self> {
        let api: Arc<dyn RecupApi> = Arc::new(RecupHttpClient::new(config.recup.clone())?);
        let notifier = build_notifier(&config.telegram)?;
        Ok(Self::with_adapters(config, api, notifier))
    }

    /// Same wiring with caller-supplied adapters
    pub fn with_adapters(
        config: &RecupConfig,
        api: Arc<dyn RecupApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            notifier,
            stores: Stores::open(&config.storage),
            scheduler: CycleScheduler::from_config(&config.monitor),
            documents_dir: PathBuf::from(&config.storage.documents_dir),
        }
    }

    pub fn poller(&self) -> Poller {
        Poller::new(
            Arc::clone(&self.api),
            Arc::clone(&self.notifier),
            Arc::clone(&self.stores.subscriptions),
            Arc::clone(&self.stores.snapshots),
        )
    }

    pub fn monitor(&self, shutdown_signal: watch::Receiver<bool>) -> Monitor {
        Monitor::new(
            Arc::clone(&self.api),
            self.poller(),
            Arc::clone(&self.stores.subscriptions),
            self.scheduler.clone(),
            shutdown_signal,
        )
    }

    pub fn booking_driver(&self) -> BookingDriver {
        BookingDriver::new(Arc::clone(&self.api)).with_journal(Arc::clone(&self.stores.journal))
    }

    pub fn cancellation_driver(&self) -> CancellationDriver {
        CancellationDriver::new(Arc::clone(&self.api))
    }
}
