//! Service-layer error type.

use thiserror::Error;

use oms_domain::DomainError;
use oms_storage::StorageError;

/// Errors surfaced by the service layer: either a domain rule was violated
/// or the storage collaborator failed. The two categories stay distinct so
/// the HTTP layer can map them to client and server statuses respectively.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
