//! # Lookout Notify - alert delivery
//!
//! [`NotificationDispatcher`] routes each triggered alert to the channels its
//! rule names and records it under an alerts directory:
//!
//! - `console`: one formatted line on standard output
//! - `file`: JSON lines appended to `alerts-YYYY-MM-DD.log`
//! - `webhook`: JSON POST when a URL is configured
//!
//! Unknown channel names are logged and skipped. Every dispatched alert is
//! written once to `alert-<id>.json`, independently of channel outcomes.

pub mod channels;
pub mod dispatcher;
pub mod error;
pub mod store;

pub use channels::{format_alert_line, ConsoleChannel, FileChannel, NotificationChannel, WebhookChannel};
pub use dispatcher::{DeliveryOutcome, DispatchReport, NotificationDispatcher};
pub use error::{NotifyError, Result};
pub use store::AlertStore;
