//! HTTP layer: application state, routes, and handlers.

pub mod routes;
pub mod state;


pub use routes::{create_router, ApiError};
pub use state::AppState;
