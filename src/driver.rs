//! Fixed-period tick loop for driving a registry from async code

use crate::registry::PoolRegistry;
use crate::resource::Resource;
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

/// Drives a [`PoolRegistry`] at a fixed frame period.
///
/// Each frame runs the caller's frame callback first, so its gets and returns
/// land before the registry's end-of-tick sweeps. Meant for a current-thread
/// runtime; the registry never leaves the task that owns it.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{PoolOptions, PoolRegistry, Resource, ResourceKey, ReturnType, TickDriver};
/// use std::time::Duration;
///
/// struct Spark(bool);
/// impl Resource for Spark {
///     fn set_live(&mut self, live: bool) { self.0 = live; }
///     fn is_live(&self) -> bool { self.0 }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut registry = PoolRegistry::init(|_: &ResourceKey| Spark(false));
/// registry
///     .create_pool("spark", PoolOptions::dynamic().with_return_type(ReturnType::Timed(Duration::from_millis(20))))
///     .unwrap();
///
/// let driver = TickDriver::new(Duration::from_millis(5));
/// let frames = driver
///     .run(
///         &mut registry,
///         |registry| {
///             registry.get("spark").unwrap();
///         },
///         tokio::time::sleep(Duration::from_millis(50)),
///     )
///     .await;
///
/// assert!(frames > 0);
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TickDriver {
    period: Duration,
}

impl TickDriver {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Tick `registry` every period until `shutdown` resolves.
    ///
    /// Returns the number of frames run. Late frames are delayed rather than
    /// bunched up, and the registry clock advances by the real elapsed time.
    pub async fn run<R, F, S>(&self, registry: &mut PoolRegistry<R>, mut frame: F, shutdown: S) -> u64
    where
        R: Resource,
        F: FnMut(&mut PoolRegistry<R>),
        S: Future<Output = ()>,
    {
        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut last = interval.tick().await;
        let mut frames = 0;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,
                now = interval.tick() => {
                    frame(registry);
                    registry.tick(now.duration_since(last));
                    last = now;
                    frames += 1;
                }
            }
        }

        log::debug!("Tick driver stopped after {frames} frame(s)");
        frames
    }
}
