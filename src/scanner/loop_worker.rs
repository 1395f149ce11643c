use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

// Set to true to log loop start/stop
const ENABLE_LOGS: bool = true;

// tokio intervals panic on a zero period
const MIN_PERIOD: Duration = Duration::from_millis(1);

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Break,
}

/// A cancellable task that runs `tick` once per `period`, first after one full
/// period. Ticks never overlap: a slow tick delays the next one.
pub struct RepeatingTask {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl RepeatingTask {
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = TickControl> + Send + 'static,
    {
        if period < MIN_PERIOD {
            log_warn!("{name} loop period {period:?} too short, using {MIN_PERIOD:?}");
        }
        let period = period.max(MIN_PERIOD);
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            log_info!("{name} loop started ({} ms)", period.as_millis());

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        log_info!("{name} loop shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        if tick().await == TickControl::Break {
                            log_debug!("{name} loop finished on its own");
                            break;
                        }
                    }
                }
            }
        });

        Self {
            cancel_token,
            handle,
        }
    }

    /// Stops scheduling further ticks. A tick already running is left to finish.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }
}
