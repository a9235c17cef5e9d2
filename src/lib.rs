//! Country macroeconomic explorer: observed indicators, GDP composition and
//! precomputed model forecasts merged into one year-indexed table.

pub mod catalog;
pub mod chart_draw;
pub mod config;
pub mod csv_reader;
pub mod data;
pub mod engine;
pub mod format;
pub mod selection;
pub mod state;
pub mod store;
pub mod ui;
