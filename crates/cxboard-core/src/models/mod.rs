//! Data models for cxboard

pub mod call;
pub mod selection;

pub use call::{CallDuration, CallId, CallRecord, Intent, RawCallRecord};
pub use selection::{CategoryFilter, PeriodSelection};
