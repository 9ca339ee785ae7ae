use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::services::ingest::{CycleReport, IngestionEngine};
use crate::services::retention::RetentionSweeper;
use crate::store::StoreError;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PipelineReport {
    pub ingestion: CycleReport,
    pub purged_rows: u64,
}

/// One ingestion cycle followed by one retention sweep.
///
/// Runs are serialized: a manual trigger issued while the scheduled run is in
/// flight waits for it instead of overlapping.
pub struct ForecastPipeline {
    ingestion: IngestionEngine,
    sweeper: RetentionSweeper,
    running: Mutex<()>,
}

impl ForecastPipeline {
    pub fn new(ingestion: IngestionEngine, sweeper: RetentionSweeper) -> Self {
        Self {
            ingestion,
            sweeper,
            running: Mutex::new(()),
        }
    }

    pub async fn run_once(&self) -> Result<PipelineReport, StoreError> {
        let _guard = self.running.lock().await;
        let ingestion = self.ingestion.run_cycle().await?;
        let purged_rows = self.sweeper.sweep().await?;
        Ok(PipelineReport {
            ingestion,
            purged_rows,
        })
    }
}

pub struct ForecastScheduler {
    pipeline: Arc<ForecastPipeline>,
    interval: Duration,
}

impl ForecastScheduler {
    pub fn new(pipeline: Arc<ForecastPipeline>, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    /// Spawns the periodic loop. The first run starts immediately; a run that
    /// overshoots the interval delays the next tick rather than bursting.
    pub fn start(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let pipeline = self.pipeline;
        let interval = self.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = pipeline.run_once().await {
                            tracing::warn!("forecast pipeline run failed: {err:#}");
                        }
                    }
                }
            }
            tracing::info!("forecast scheduler stopped");
        })
    }
}
