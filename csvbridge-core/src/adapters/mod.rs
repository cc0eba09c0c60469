//! Adapter implementations
//!
//! Adapters implement the ports with concrete technologies:
//! - Firefly III HTTP client for the AccountingApi port
//! - DuckDB for the import journal

pub mod firefly;
pub mod journal;

#[cfg(test)]
pub mod firefly_mock;
