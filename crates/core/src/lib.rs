//! Core data types for the token alert engine.

pub mod alert;
pub mod condition;
pub mod config;
pub mod kol;
pub mod sentiment;
pub mod token;

pub use alert::*;
pub use condition::*;
pub use config::*;
pub use kol::*;
pub use sentiment::*;
pub use token::*;
