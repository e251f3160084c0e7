pub mod derive;
pub mod engine;
pub mod ticker;

pub use derive::Dashboard;
pub use engine::{ReconciliationEngine, WalletContext};
#[cfg(test)]
pub use ticker::FixedClock;
pub use ticker::{Clock, SystemClock, TickScheduler};
