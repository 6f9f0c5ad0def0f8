//! ==============================================================================
//! fetcher.rs - scheduled fetch-append-trim-persist cycle
//! ==============================================================================
//!
//! purpose:
//!     on every tick: ask the weather source for the current temperature,
//!     stamp it, append it to the history store (which trims to capacity and
//!     rewrites the file).
//!
//! failure handling:
//!     a failed cycle is logged and skipped. there is no retry or backoff;
//!     the next tick simply tries again. a provider failure never touches the
//!     history file.
//!
//! relationships:
//!     - used by: main.rs (spawns run() as the polling loop)
//!     - uses: provider.rs (TemperatureSource), store.rs (HistoryStore)
//!
//! ==============================================================================

use crate::domain::Reading;
use crate::error::CycleError;
use crate::provider::TemperatureSource;
use crate::store::{AppendOutcome, HistoryStore};

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

pub struct Fetcher {
    source: Arc<dyn TemperatureSource>,
    store: Arc<dyn HistoryStore>,
    show_readings: bool,
}

/// what a successful cycle did
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub reading: Reading,
    pub outcome: AppendOutcome,
}

impl Fetcher {
    pub fn new(
        source: Arc<dyn TemperatureSource>,
        store: Arc<dyn HistoryStore>,
        show_readings: bool,
    ) -> Self {
        Self {
            source,
            store,
            show_readings,
        }
    }

    /// one fetch + append. nothing is written unless the fetch succeeded.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let temperature = self.source.current_temperature().await?;
        let reading = Reading::now(temperature);
        let outcome = self.store.append(reading.clone()).await?;
        Ok(CycleReport { reading, outcome })
    }

    /// run a cycle and log how it went
    pub async fn tick(&self) {
        match self.run_cycle().await {
            Ok(report) => {
                if self.show_readings {
                    tracing::info!(
                        temperature = report.reading.temperature,
                        history_len = report.outcome.len,
                        evicted = report.outcome.evicted,
                        "stored reading"
                    );
                } else {
                    tracing::debug!(
                        temperature = report.reading.temperature,
                        history_len = report.outcome.len,
                        "stored reading"
                    );
                }
            }
            Err(CycleError::Fetch(e)) => {
                tracing::warn!(error = %e, "weather fetch failed, skipping cycle");
            }
            Err(CycleError::Storage(e)) => {
                tracing::error!(error = %e, "history update failed, skipping cycle");
            }
        }
    }

    /// poll forever at a fixed period. the first cycle runs immediately.
    ///
    /// cycles run back to back on this task, so a slow cycle delays the next
    /// tick instead of overlapping it.
    pub async fn run(self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            period_secs = period.as_secs(),
            max_entries = self.store.max_entries(),
            "starting weather polling"
        );

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }
}
