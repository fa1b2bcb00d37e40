//! Cancellable periodic tasks.

use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// A spawned loop that runs a tick function on a fixed period.
///
/// Stopping only prevents future ticks: a tick that is already running is
/// allowed to finish.
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    stop_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// Whether the loop should keep going after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    Break,
}

impl PeriodicTask {
    /// Spawn the loop. With `fire_immediately` the first tick runs right
    /// away, otherwise after one period.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, fire_immediately: bool, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = TickFlow> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = broadcast::channel(1);

        let handle = tokio::spawn(async move {
            let start = if fire_immediately { Instant::now() } else { Instant::now() + period };
            let mut ticker = time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::debug!(task = name, period_ms = period.as_millis() as u64, "Periodic task started");

            loop {
                // Stop wins over a tick that came due during a long tick body.
                tokio::select! {
                    biased;
                    _ = stop_rx.recv() => {
                        break;
                    }
                    _ = ticker.tick() => {
                        if tick().await == TickFlow::Break {
                            break;
                        }
                    }
                }
            }

            tracing::debug!(task = name, "Periodic task exited");
        });

        Self { name, stop_tx, handle }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the loop to exit after its current tick, if any.
    pub fn stop(self) -> JoinHandle<()> {
        let _ = self.stop_tx.send(());
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_stopped() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        let task = PeriodicTask::spawn("test", Duration::from_secs(10), true, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                TickFlow::Continue
            }
        });

        time::sleep(Duration::from_secs(25)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        task.stop().await.unwrap();
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_first_tick() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        let task = PeriodicTask::spawn("test", Duration::from_secs(10), false, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                TickFlow::Continue
            }
        });

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        let _ = task.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_after_stop_during_slow_tick() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        let task = PeriodicTask::spawn("test", Duration::from_secs(10), true, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                time::sleep(Duration::from_secs(25)).await;
                TickFlow::Continue
            }
        });

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        // Two ticks come due while the first body is still running.
        task.stop().await.unwrap();
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_break_ends_loop() {
        let task = PeriodicTask::spawn("test", Duration::from_secs(1), true, || async { TickFlow::Break });
        time::sleep(Duration::from_secs(2)).await;
        assert!(task.is_finished());
    }
}
