//! Asynchronous notification dispatch for HRDesk.
//!
//! Business workflows (leave applied, leave approved, ...) store a
//! notification and hand it to the [`NotificationDispatcher`], which delivers
//! it in the background:
//!
//! - a bounded queue that rejects instead of blocking when full
//! - a pool of workers calling a [`MessageSender`]
//! - persisted retries on a fixed backoff schedule (5m / 15m / 1h / 24h)
//! - a periodic retry scheduler that requeues due notifications
//! - `stop()` drains everything already queued before returning

pub mod backoff;
pub mod dispatcher;
pub mod error;
mod queue;
pub mod scheduler;
pub mod sender;
pub mod stats;
pub mod store;
pub mod worker;

pub use dispatcher::{DispatcherConfig, NotificationDispatcher};
pub use error::{DispatchError, SendError, StoreError};
pub use scheduler::SweepReport;
pub use sender::{ConfiguredSender, LogSender, MessageSender, ResendSender};
pub use stats::QueueStats;
pub use store::{MemoryNotificationStore, NotificationStore, PgNotificationStore};
pub use worker::AttemptOutcome;
