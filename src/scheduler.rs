use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use async_trait::async_trait;
use log::{debug, error, info};
use tokio::sync::watch;
use tokio::time::{interval, timeout, MissedTickBehavior};
use crate::error::{Error, Result};
use crate::metrics::{TICKS, TICK_FAILURES};

/// A unit of work driven by a `TickScheduler`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Runs a job immediately and then once per period until shutdown.
///
/// Runs never overlap: a slow run delays the next tick instead of stacking
/// up missed ones. Shutdown is observed between runs, so an in-flight run
/// always completes. Each run is bounded by `work_timeout`.
pub struct TickScheduler {
    job: Arc<dyn Job>,
    period: Duration,
    work_timeout: Duration,
    state: Mutex<SchedulerState>,
}

impl TickScheduler {
    pub fn new(job: Arc<dyn Job>, period: Duration, work_timeout: Duration) -> Self {
        Self {
            job,
            period,
            work_timeout,
            state: Mutex::new(SchedulerState::Idle),
        }
    }

    pub fn state(&self) -> SchedulerState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, next: SchedulerState) {
        match self.state.lock() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Drives the job until `shutdown` flips to `true` or its sender is
    /// dropped. A scheduler can only be started once.
    pub async fn start(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        {
            let mut state = self
                .state
                .lock()
                .map_err(|_| Error::InternalError("scheduler state poisoned".to_string()))?;
            if *state != SchedulerState::Idle {
                return Err(Error::InternalError(format!(
                    "{} scheduler already started",
                    self.job.name()
                )));
            }
            *state = SchedulerState::Running;
        }

        let name = self.job.name();
        info!("{} scheduler started (period {:?})", name, self.period);

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.run_once().await;
                }
            }
        }

        self.set_state(SchedulerState::Stopped);
        info!("{} scheduler stopped", name);
        Ok(())
    }

    /// One bounded run. Failures are logged and counted, never propagated.
    pub async fn run_once(&self) {
        let name = self.job.name();
        debug!("{} tick: starting", name);
        TICKS.with_label_values(&[name]).inc();
        let started = Instant::now();

        match timeout(self.work_timeout, self.job.run()).await {
            Ok(Ok(())) => debug!("{} tick: completed in {:?}", name, started.elapsed()),
            Ok(Err(e)) => {
                TICK_FAILURES.with_label_values(&[name]).inc();
                error!("{} tick failed after {:?}: {}", name, started.elapsed(), e);
            }
            Err(_) => {
                TICK_FAILURES.with_label_values(&[name]).inc();
                error!("{} tick timed out after {:?}", name, self.work_timeout);
            }
        }
    }
}
