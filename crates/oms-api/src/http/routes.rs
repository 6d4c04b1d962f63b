//! HTTP route definitions and handlers.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;

use oms_domain::{
    access::has_permission, order::OrderLine, DomainError, Order, OrderStatus, Policy,
    ProcessingStatus, Product, User, UserGroup,
};
use oms_server::{PlaceOrderRequest, ServiceError};
use oms_storage::{DataStore, NewProduct, StorageError};

use super::state::AppState;
use crate::middleware::{RequestIdLayer, RequestLoggingLayer};

/// Default request body size limit (1MB), protecting against oversized
/// payloads.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Custom JSON extractor that returns 400 Bad Request instead of 422
/// Unprocessable Entity for deserialization errors, and preserves 413 for
/// body-limit rejections.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    StatusCode::PAYLOAD_TOO_LARGE
                } else {
                    StatusCode::BAD_REQUEST
                };
                let error = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    ApiError::new(error_codes::PAYLOAD_TOO_LARGE, rejection.body_text())
                } else {
                    ApiError::validation_error(rejection.body_text())
                };
                Err((status, Json(error)))
            }
        }
    }
}

// ============================================================
// Router
// ============================================================

fn api_routes<S: DataStore>() -> Router<Arc<AppState<S>>> {
    Router::new()
        // Product catalog
        .route(
            "/api/products",
            post(create_product::<S>).get(list_products::<S>),
        )
        .route(
            "/api/products/:id",
            get(get_product::<S>)
                .put(update_product::<S>)
                .delete(delete_product::<S>),
        )
        // Orders
        .route("/api/orders", post(create_order::<S>).get(list_orders::<S>))
        .route(
            "/api/orders/:id",
            get(get_order::<S>)
                .put(update_order::<S>)
                .delete(delete_order::<S>),
        )
        // Bulk shipment & job progress
        .route("/api/orders/bulk-ship", post(bulk_ship::<S>))
        .route("/api/jobs/:job_id", get(get_job::<S>))
        // Access control
        .route("/api/access/check", post(check_access::<S>))
        .route("/api/access/users", put(put_user::<S>))
        .route("/api/access/groups", put(put_group::<S>))
        .route("/api/access/policies", put(put_policy::<S>))
}

/// Creates the HTTP router with all OMS endpoints, health and readiness
/// probes, and the default middleware stack.
pub fn create_router<S: DataStore>(state: AppState<S>) -> Router {
    create_router_with_body_limit(state, DEFAULT_BODY_LIMIT)
}

/// Creates the HTTP router with a custom body size limit.
pub fn create_router_with_body_limit<S: DataStore>(
    state: AppState<S>,
    body_limit: usize,
) -> Router {
    let shared_state = Arc::new(state);
    api_routes::<S>()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check::<S>))
        .with_state(shared_state)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(RequestLoggingLayer::new())
        .layer(RequestIdLayer::new())
}

// ============================================================
// Error Handling
// ============================================================

/// Stable API error codes; each maps to an HTTP status via
/// [`ApiError::into_response`].
pub mod error_codes {
    // 400 Bad Request
    pub const VALIDATION_ERROR: &str = "validation_error";

    // 403 Forbidden
    pub const PERMISSION_DENIED: &str = "permission_denied";

    // 404 Not Found
    pub const PRODUCT_NOT_FOUND: &str = "product_not_found";
    pub const ORDER_NOT_FOUND: &str = "order_not_found";
    pub const JOB_NOT_FOUND: &str = "job_not_found";

    // 409 Conflict
    pub const INSUFFICIENT_STOCK: &str = "insufficient_stock";

    // 5xx
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const SERVICE_UNAVAILABLE: &str = "service_unavailable";

    // 413
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error (400).
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::VALIDATION_ERROR, message)
    }

    /// Creates an internal error (500).
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }

    fn status(&self) -> StatusCode {
        match self.code.as_str() {
            error_codes::VALIDATION_ERROR => StatusCode::BAD_REQUEST,
            error_codes::PERMISSION_DENIED => StatusCode::FORBIDDEN,
            error_codes::PRODUCT_NOT_FOUND
            | error_codes::ORDER_NOT_FOUND
            | error_codes::JOB_NOT_FOUND => StatusCode::NOT_FOUND,
            error_codes::INSUFFICIENT_STOCK => StatusCode::CONFLICT,
            error_codes::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            error_codes::SERVICE_UNAVAILABLE => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        (status, Json(self)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::Validation { .. }
            | DomainError::InvalidQuantity { .. }
            | DomainError::InvalidPrice { .. } => ApiError::validation_error(err.to_string()),
            DomainError::InsufficientStock { .. } => {
                ApiError::new(error_codes::INSUFFICIENT_STOCK, err.to_string())
            }
            DomainError::ProductNotFound { .. } => {
                ApiError::new(error_codes::PRODUCT_NOT_FOUND, err.to_string())
            }
            DomainError::OrderNotFound { .. } => {
                ApiError::new(error_codes::ORDER_NOT_FOUND, err.to_string())
            }
            DomainError::JobNotFound { .. } => {
                ApiError::new(error_codes::JOB_NOT_FOUND, err.to_string())
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::ProductNotFound { .. } => {
                ApiError::new(error_codes::PRODUCT_NOT_FOUND, err.to_string())
            }
            StorageError::OrderNotFound { .. } => {
                ApiError::new(error_codes::ORDER_NOT_FOUND, err.to_string())
            }
            StorageError::JobNotFound { .. } => {
                ApiError::new(error_codes::JOB_NOT_FOUND, err.to_string())
            }
            StorageError::InsufficientStock { .. } => {
                ApiError::new(error_codes::INSUFFICIENT_STOCK, err.to_string())
            }
            StorageError::InvalidInput { .. } => ApiError::validation_error(err.to_string()),
            StorageError::ConnectionError { .. } => {
                ApiError::new(error_codes::SERVICE_UNAVAILABLE, err.to_string())
            }
            _ => ApiError::internal_error(err.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => e.into(),
            ServiceError::Storage(e) => e.into(),
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================
// Product Handlers
// ============================================================

/// Request body for creating or updating a product.
#[derive(Debug, Deserialize)]
pub struct ProductBody {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub category: Option<String>,
}

fn validate_product_fields(name: &str, price: Decimal) -> ApiResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::Validation {
            message: "product name is required".to_string(),
        }
        .into());
    }
    if price <= Decimal::ZERO {
        return Err(DomainError::InvalidPrice { price }.into());
    }
    Ok(())
}

async fn create_product<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(body): JsonBody<ProductBody>,
) -> ApiResult<impl IntoResponse> {
    validate_product_fields(&body.name, body.price)?;
    let product = state
        .storage
        .create_product(NewProduct {
            name: body.name,
            description: body.description,
            price: body.price,
            stock_quantity: body.stock_quantity,
            category: body.category,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn get_product<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.storage.get_product(id).await?))
}

async fn list_products<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.storage.list_products().await?))
}

async fn update_product<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<ProductBody>,
) -> ApiResult<Json<Product>> {
    validate_product_fields(&body.name, body.price)?;
    let existing = state.storage.get_product(id).await?;
    let updated = state
        .storage
        .update_product(Product {
            id,
            name: body.name,
            description: body.description,
            price: body.price,
            stock_quantity: body.stock_quantity,
            category: body.category,
            created_at: existing.created_at,
            updated_at: existing.updated_at,
        })
        .await?;
    Ok(Json(updated))
}

async fn delete_product<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.storage.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Order Handlers
// ============================================================

/// Request body for placing an order.
#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    pub customer_name: String,
    pub customer_email: String,
    pub products: Vec<OrderLineBody>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderLineBody {
    pub product_id: i64,
    pub quantity: i32,
}

/// Request body for updating an order's customer fields and status.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderBody {
    pub customer_name: String,
    pub customer_email: String,
    pub status: OrderStatus,
}

async fn create_order<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(body): JsonBody<CreateOrderBody>,
) -> ApiResult<impl IntoResponse> {
    let order = state
        .checkout
        .place_order(PlaceOrderRequest {
            customer_name: body.customer_name,
            customer_email: body.customer_email,
            lines: body
                .products
                .into_iter()
                .map(|line| OrderLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect(),
            coupon_code: body.coupon_code,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.storage.get_order(id).await?))
}

async fn list_orders<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.storage.list_orders().await?))
}

async fn update_order<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<UpdateOrderBody>,
) -> ApiResult<Json<Order>> {
    let mut order = state.storage.get_order(id).await?;
    order.customer_name = body.customer_name;
    order.customer_email = body.customer_email;
    order.status = body.status;
    Ok(Json(state.storage.update_order(order).await?))
}

async fn delete_order<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.storage.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Bulk Shipment & Job Progress
// ============================================================

/// Request body for starting a bulk shipment job.
#[derive(Debug, Deserialize)]
pub struct BulkShipBody {
    /// Client-supplied job id; generated when absent so retries can reuse it.
    #[serde(default)]
    pub job_id: Option<String>,
    pub order_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BulkShipResponse {
    pub job_id: String,
}

async fn bulk_ship<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(body): JsonBody<BulkShipBody>,
) -> ApiResult<impl IntoResponse> {
    let job_id = body
        .job_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    // Persist the pending record before answering 202 so a prompt poll of
    // /api/jobs/:id finds the job rather than a 404.
    let job = ProcessingStatus::new(job_id.clone());
    state.storage.save_job(&job).await?;

    state.ship_runner.spawn(job_id.clone(), body.order_ids);

    Ok((
        StatusCode::ACCEPTED,
        Json(BulkShipResponse { job_id }),
    ))
}

async fn get_job<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<ProcessingStatus>> {
    Ok(Json(state.storage.get_job(&job_id).await?))
}

// ============================================================
// Access Control
// ============================================================

/// Request body for a permission check.
#[derive(Debug, Deserialize)]
pub struct CheckAccessBody {
    pub user_id: String,
    pub resource: String,
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct CheckAccessResponse {
    pub allowed: bool,
}

/// Loads the full access-control snapshots, runs the resolver, and maps the
/// boolean to 200 (allow) or 403 (deny). A failure to load the snapshots is
/// a storage error (5xx), not a deny.
async fn check_access<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(body): JsonBody<CheckAccessBody>,
) -> ApiResult<impl IntoResponse> {
    let users = state.storage.list_users().await?;
    let groups = state.storage.list_groups().await?;
    let policies = state.storage.list_policies().await?;

    let allowed = has_permission(
        &body.user_id,
        &body.resource,
        &body.action,
        &users,
        &groups,
        &policies,
    );

    let status = if allowed {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    };
    Ok((status, Json(CheckAccessResponse { allowed })))
}

async fn put_user<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(user): JsonBody<User>,
) -> ApiResult<StatusCode> {
    state.storage.put_user(user).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn put_group<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(group): JsonBody<UserGroup>,
) -> ApiResult<StatusCode> {
    state.storage.put_group(group).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn put_policy<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(policy): JsonBody<Policy>,
) -> ApiResult<StatusCode> {
    state.storage.put_policy(policy).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Health & Readiness
// ============================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn readiness_check<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    match state.storage.health_check().await {
        oms_storage::HealthStatus::Healthy => {
            (StatusCode::OK, Json(serde_json::json!({ "status": "ready" })))
        }
        oms_storage::HealthStatus::Unhealthy { message } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "degraded", "message": message })),
        ),
    }
}
