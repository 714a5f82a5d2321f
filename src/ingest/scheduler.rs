//! Periodic trigger for ingestion passes.

use super::Ingestor;
use crate::models::sync::RunReport;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{error, info, warn};

pub struct Scheduler;

/// Owns the background task. Dropping the handle also stops the task after its current pass.
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    reports: watch::Receiver<Option<RunReport>>,
    task: JoinHandle<()>,
}

impl Scheduler {
    /// Run one pass per `period`; a pass always completes before the next tick is taken.
    pub fn start(ingestor: Arc<Ingestor>, period: Duration) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let (report_tx, reports) = watch::channel(None);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("ingestion scheduler started, period {period:?}");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop_rx.changed() => {}
                }
                if *stop_rx.borrow() || stop_rx.has_changed().is_err() {
                    break;
                }

                let report = ingestor.run(&stop_rx).await;
                if let Some(err) = &report.error {
                    error!("sync run {} failed: {err}", report.run_id);
                }
                report_tx.send_replace(Some(report));
            }
            info!("ingestion scheduler stopped");
        });

        SchedulerHandle {
            stop_tx,
            reports,
            task,
        }
    }
}

impl SchedulerHandle {
    /// Last finished pass, `None` until the first one completes.
    pub fn reports(&self) -> watch::Receiver<Option<RunReport>> {
        self.reports.clone()
    }

    /// Ask the task to stop and wait until the in-flight pass has finished.
    pub async fn stop(self) {
        self.stop_tx.send_replace(true);
        if let Err(e) = self.task.await {
            warn!("ingestion scheduler task ended abnormally: {e}");
        }
    }
}
