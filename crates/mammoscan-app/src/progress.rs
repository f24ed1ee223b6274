//! Cosmetic upload progress.
//!
//! The ticker bumps a `watch` value by `step` every `tick` until it reaches
//! `ceiling`. It is not tied to bytes on the wire. Dropping the ticker aborts
//! the task, so whichever way the upload settles the interval is gone.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSettings {
    pub tick: Duration,
    pub step: u8,
    pub ceiling: u8,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self { tick: Duration::from_millis(200), step: 10, ceiling: 90 }
    }
}

pub struct ProgressTicker {
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    pub fn start(progress: Arc<watch::Sender<u8>>, settings: &ProgressSettings) -> Self {
        // interval() panics on a zero period
        let period = settings.tick.max(Duration::from_millis(1));
        let step = settings.step.max(1);
        let ceiling = settings.ceiling.min(100);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let mut done = false;
                progress.send_modify(|p| {
                    *p = p.saturating_add(step).min(ceiling);
                    done = *p >= ceiling;
                });
                if done {
                    break;
                }
            }
        });

        Self { handle }
    }

    /// Stop ticking now; the last value stays in the channel.
    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
