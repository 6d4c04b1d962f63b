//! oms-domain: Core order-management domain logic
//!
//! This crate contains the pure domain logic for OMS:
//! - Access-control entities and the permission resolver
//! - Products and stock rules
//! - Orders, order items, and pricing
//! - Batch-job progress tracking
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 oms-domain                  │
//! ├─────────────────────────────────────────────┤
//! │  access/  - Permission resolver             │
//! │  product  - Products & stock rules          │
//! │  order    - Orders & pricing                │
//! │  job      - Job progress state machine      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this crate performs I/O; storage and HTTP live in
//! `oms-storage` and `oms-api`.

pub mod access;
pub mod error;
pub mod job;
pub mod order;
pub mod product;

// Re-export commonly used types at the crate root
pub use access::{has_permission, Policy, Statement, User, UserGroup};
pub use error::{DomainError, DomainResult};
pub use job::{JobState, ProcessingStatus};
pub use order::{Order, OrderItem, OrderStatus, PriceBreakdown};
pub use product::Product;
