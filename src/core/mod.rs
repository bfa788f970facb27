//! Core domain types and the seams between pipeline stages and the outside world

pub mod config;
pub mod index;
pub mod log;
pub mod rate;
pub mod record;
pub mod table;
pub mod warehouse;

// Re-export main types for cleaner imports
pub use index::{PriceIndexDocument, PriceIndexSource};
pub use rate::{ExchangeRateSource, RateQuote};
pub use record::NormalizedRecord;
pub use table::{Table, Value};
pub use warehouse::Warehouse;
