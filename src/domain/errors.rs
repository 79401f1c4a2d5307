use thiserror::Error;

/// Errores de dominio del servicio. Los textos visibles por el cliente se
/// mantienen estables: la interfaz web los muestra tal cual.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No active counting session")]
    NoActiveSession,
    #[error("A counting session is already open (started {0})")]
    SessionAlreadyOpen(String),
    #[error("No count ledger found for session {0}")]
    LedgerNotFound(String),
    #[error("Could not create count ledger: {0}")]
    LedgerCreate(String),
    #[error("Invalid image file")]
    InvalidImage,
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
