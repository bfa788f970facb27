pub mod run;
pub mod schedule;
pub mod setup;
pub mod ui;
