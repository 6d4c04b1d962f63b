//! oms-storage: Storage abstraction layer
//!
//! This crate provides the persistence layer for OMS:
//! - `DataStore` trait: find/save/delete repository operations for products,
//!   orders, jobs, and access-control records
//! - In-memory implementation for tests and development
//! - PostgreSQL implementation for production
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 oms-storage                 │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - DataStore trait definition   │
//! │  memory.rs   - In-memory implementation     │
//! │  postgres.rs - PostgreSQL implementation    │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod postgres;
pub mod traits;

// Re-export commonly used types
pub use error::{HealthStatus, StorageError, StorageResult};
pub use memory::MemoryDataStore;
pub use postgres::{PostgresConfig, PostgresDataStore};
pub use traits::{DataStore, NewOrder, NewProduct, StockDecrement};
