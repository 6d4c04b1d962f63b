//! oms-api: HTTP surface for OMS
//!
//! Provides the axum router, request/response DTOs, API error mapping,
//! request-id and logging middleware, and observability initialization.
//! The server binary (`oms`) lives in this crate as well.

pub mod http;
pub mod middleware;
pub mod observability;

pub use http::{create_router, AppState};
