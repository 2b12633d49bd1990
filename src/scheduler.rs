use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::persistence::{backup_now, Persistence};

/// Periodic snapshot writer. Stopping is idempotent and also happens on drop.
pub struct BackupTimer {
    handle: Option<JoinHandle<()>>,
}

impl BackupTimer {
    /// Spawns the timer on the current tokio runtime.
    ///
    /// Returns `None` when called outside a runtime.
    pub fn start(persistence: Persistence, period: Duration) -> Option<Self> {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                log::warn!("auto backup not started: no async runtime");
                return None;
            }
        };
        let handle = runtime.spawn(run_backups(persistence, period));
        log::info!("auto backup started period_secs={}", period.as_secs());
        Some(Self {
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            log::info!("auto backup stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for BackupTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_backups(persistence: Persistence, period: Duration) {
    // First snapshot one full period after start, not immediately.
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        if let Err(err) = backup_now(&persistence) {
            log::error!("auto backup failed err={err}");
        }
    }
}
