pub mod sql;

pub use sql::SqlWarehouse;
