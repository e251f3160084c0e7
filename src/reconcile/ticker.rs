// Tick scheduler - re-derives the dashboard once per period
//
// The snapshot only changes on refresh; between refreshes each tick just
// re-runs derive(now) so countdowns and active/ended transitions move
// without any contract traffic.

#[cfg(test)]
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

use super::derive::Dashboard;
use super::engine::ReconciliationEngine;

/// Source of the current time in Unix seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Manually driven clock
#[cfg(test)]
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

#[cfg(test)]
impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub struct TickScheduler {
    engine: Arc<ReconciliationEngine>,
    clock: Arc<dyn Clock>,
    period: Duration,
    tx: Arc<watch::Sender<Arc<Dashboard>>>,
}

impl TickScheduler {
    pub fn new(engine: Arc<ReconciliationEngine>, clock: Arc<dyn Clock>, period: Duration) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Dashboard::default()));
        Self {
            engine,
            clock,
            period,
            tx: Arc::new(tx),
        }
    }

    /// Receiver that always holds the latest tick
    pub fn subscribe(&self) -> watch::Receiver<Arc<Dashboard>> {
        self.tx.subscribe()
    }

    /// Derive once and publish
    pub fn tick_once(&self) -> Arc<Dashboard> {
        Self::publish(&self.engine, self.clock.as_ref(), &self.tx)
    }

    fn publish(
        engine: &ReconciliationEngine,
        clock: &dyn Clock,
        tx: &watch::Sender<Arc<Dashboard>>,
    ) -> Arc<Dashboard> {
        let dashboard = Arc::new(engine.derive(clock.now()));
        // send_replace keeps the value even with no subscribers
        tx.send_replace(dashboard.clone());
        dashboard
    }

    /// Start ticking in the background
    pub fn start(&self) -> JoinHandle<()> {
        let engine = self.engine.clone();
        let clock = self.clock.clone();
        let tx = self.tx.clone();
        let period = self.period;

        info!("⏱️ Tick scheduler started (every {:?})", period);

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let dashboard = Self::publish(&engine, clock.as_ref(), &tx);
                debug!(
                    "🕐 Tick at {}: {} active, {} ended",
                    dashboard.now,
                    dashboard.campaigns.active.len(),
                    dashboard.campaigns.ended.len()
                );
            }
        })
    }
}
