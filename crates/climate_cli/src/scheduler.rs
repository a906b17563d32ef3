//! The long-running job loop behind `climate run`.

use anyhow::Result;
use climate_core::Clock;
use climate_engine::{ClimateService, JobSchedule};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct Scheduler {
    service: Arc<ClimateService>,
    clock: Arc<dyn Clock>,
    schedule: JobSchedule,
    tick: Duration,
}

impl Scheduler {
    pub fn new(
        service: Arc<ClimateService>,
        clock: Arc<dyn Clock>,
        schedule: JobSchedule,
        tick: Duration,
    ) -> Self {
        Self {
            service,
            clock,
            schedule,
            tick: tick.max(Duration::from_secs(1)),
        }
    }

    /// Run every due job once per slot, one at a time, until Ctrl-C.
    pub async fn run(mut self) -> Result<()> {
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            "Scheduler started: {} job(s), tick {}s",
            self.schedule.entries().len(),
            self.tick.as_secs()
        );

        loop {
            tokio::select! {
                _ = interval.tick() => self.tick_once().await,
                res = tokio::signal::ctrl_c() => {
                    if let Err(e) = res {
                        warn!("Failed to listen for Ctrl-C: {}", e);
                    }
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn tick_once(&mut self) {
        let now = self.clock.now();
        for (job, slot) in self.schedule.due_jobs(now) {
            // A failed job waits for its next slot.
            self.schedule.mark_fired(job, slot);
            match self.service.run_job(job).await {
                Ok(()) => info!("Job {} done (slot {})", job, slot.format("%H:%M")),
                Err(e) => error!("Job {} failed: {:#}", job, e),
            }
        }
    }
}
