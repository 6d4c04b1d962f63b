//! HTTP middleware: request-id propagation and request logging.

pub mod logging;
pub mod request_id;

pub use logging::RequestLoggingLayer;
pub use request_id::{RequestIdLayer, REQUEST_ID_HEADER};
