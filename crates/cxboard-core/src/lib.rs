//! cxboard-core - Core library for cxboard
//!
//! Provides call records, the period normalizer, record filters, KPI aggregates and
//! persisted selection state for the voice agent CX dashboard.

pub mod analytics;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod models;
pub mod period;
pub mod selection;
pub mod store;

pub use analytics::{aggregate, aggregate_with, AggregateResult, DashboardReport, OutcomeThresholds};
pub use config::DashboardConfig;
pub use error::{CoreError, LoadReport};
pub use export::{export_records_to_csv, export_records_to_json, export_report_to_json};
pub use filter::{filter_records, RecordQuery, TimeOfDayBounds};
pub use models::{CallRecord, CategoryFilter, Intent, PeriodSelection};
pub use period::{compute_range, DateRange, Granularity};
pub use selection::{JsonFileStore, KeyValueStore, MemoryStore, SelectionState};
pub use store::RecordStore;
