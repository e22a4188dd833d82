//! Core domain types for HVC alert watching.
//!
//! This crate is pure: subject parsing, timeframe periods, and the
//! market-hours gate. Storage and dispatch live in `hvcwatch-alerts`.

pub mod extract;
pub mod market;
pub mod message;
pub mod nyse;
pub mod timeframe;

pub use extract::*;
pub use market::*;
pub use message::*;
pub use nyse::*;
pub use timeframe::*;
