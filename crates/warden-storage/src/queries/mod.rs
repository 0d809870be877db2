//! SQL queries, one module per table.

pub mod audit;
pub mod strategy_stats;
