//! oms-server: Service layer for OMS
//!
//! Sits between the HTTP surface (`oms-api`) and persistence
//! (`oms-storage`):
//! - `config`   - layered configuration loading (defaults → YAML → env)
//! - `checkout` - the order-placement workflow
//! - `ship`     - bulk-shipment background jobs with persisted progress

pub mod checkout;
pub mod config;
pub mod error;
pub mod ship;

pub use checkout::{CheckoutService, PlaceOrderRequest};
pub use config::{LoggingSettings, OmsConfig, ServerSettings, StorageSettings};
pub use error::{ServiceError, ServiceResult};
pub use ship::BulkShipRunner;
