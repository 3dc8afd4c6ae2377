use std::future::Future;
use std::time::Duration;

use shopfloor_core::ChangeFilter;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, info_span, warn, Instrument};
use ulid::Ulid;

use crate::cycle::CollectorCycle;
use crate::gateway::PersistenceGateway;
use crate::reader::DeviceReader;
use crate::store::TelemetryStore;

/// Outcome counts for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub collected: usize,
    pub failed: usize,
    pub persisted: usize,
    pub unchanged: usize,
    pub write_failures: usize,
}

/// Collect, filter, persist. Owns the change filter, so cycles never
/// overlap.
pub struct Collector<R, S> {
    cycle: CollectorCycle<R>,
    filter: ChangeFilter,
    gateway: PersistenceGateway<S>,
}

impl<R: DeviceReader, S: TelemetryStore> Collector<R, S> {
    pub fn new(cycle: CollectorCycle<R>, gateway: PersistenceGateway<S>) -> Self {
        Self {
            cycle,
            filter: ChangeFilter::new(),
            gateway,
        }
    }

    pub fn filter(&self) -> &ChangeFilter {
        &self.filter
    }

    pub fn gateway(&self) -> &PersistenceGateway<S> {
        &self.gateway
    }

    /// Run one full cycle. Nothing here fails the process: failed endpoints
    /// and failed writes are logged and retried on the next cycle.
    pub async fn run_once(&mut self) -> CycleReport {
        let span = info_span!("cycle", cycle = %Ulid::new());
        async {
            let batch = self.cycle.collect().await;
            let mut report = CycleReport {
                collected: batch.snapshots.len(),
                failed: batch.failed.len(),
                ..CycleReport::default()
            };

            for snapshot in batch.snapshots {
                if !self.filter.is_write_worthy(&snapshot) {
                    debug!(machine = snapshot.machine_id(), "unchanged");
                    report.unchanged += 1;
                    continue;
                }
                match self.gateway.write(&snapshot).await {
                    Ok(()) => {
                        self.filter.record_persisted(snapshot);
                        report.persisted += 1;
                    }
                    Err(err) => {
                        warn!(
                            machine = snapshot.machine_id(),
                            error = %err,
                            "write failed, snapshot dropped"
                        );
                        report.write_failures += 1;
                    }
                }
            }

            info!(
                collected = report.collected,
                failed = report.failed,
                persisted = report.persisted,
                unchanged = report.unchanged,
                write_failures = report.write_failures,
                "cycle complete"
            );
            report
        }
        .instrument(span)
        .await
    }

    /// Run a cycle every `period` until `shutdown` resolves. The first cycle
    /// starts immediately; an in-flight cycle finishes before shutdown.
    pub async fn run(mut self, period: Duration, shutdown: impl Future<Output = ()>) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("collector shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.run_once().await;
                }
            }
        }
    }
}
