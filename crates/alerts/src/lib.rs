//! Alert dispatch: configuration storage, cooldown-gated evaluation cycles,
//! and broadcast fan-out.
//!
//! This crate provides:
//! - SQLite-based config CRUD and alert/signal persistence
//! - The dispatcher that drives the evaluation and scoring engine
//! - A schema-stable broadcast bus for real-time sinks

pub mod broadcast;
pub mod db;
pub mod dispatcher;

pub use broadcast::{AlertNotification, BroadcastEvent, EventBus};
pub use db::{Database, DbError};
pub use dispatcher::{
    ActionExecutor, AlertDispatcher, CycleSummary, DispatchError, LoggingActionExecutor,
    SentimentCycleSummary,
};
