use async_trait::async_trait;
use image::RgbImage;

use crate::domain::{
    detection::{Classification, Detection},
    errors::DomainResult,
    session::{LedgerRow, SessionToken},
};

/// Detector de madurez: frame RGB → cajas con etiqueta y confianza.
#[async_trait]
pub trait MaturityDetectorPort: Send + Sync {
    async fn detect(&self, frame: &RgbImage) -> DomainResult<Vec<Detection>>;
}

/// Clasificador de enfermedad: frame RGB → clases ordenadas por confianza.
#[async_trait]
pub trait DiseaseClassifierPort: Send + Sync {
    async fn classify(&self, frame: &RgbImage) -> DomainResult<Vec<Classification>>;
}

/// Dispositivo de captura del stream. `start`/`stop` son idempotentes:
/// repetirlos no es un error, solo se anota en el log.
#[async_trait]
pub trait CameraPort: Send + Sync {
    async fn start(&self) -> DomainResult<()>;
    async fn stop(&self) -> DomainResult<()>;
    async fn capture_frame(&self) -> DomainResult<RgbImage>;
}

/// Almacén transitorio de recuentos, uno por sesión abierta. Los appends
/// son incrementales (nunca se reescribe lo ya anotado).
#[async_trait]
pub trait CountLedgerPort: Send + Sync {
    async fn create(&self, token: &SessionToken) -> DomainResult<()>;
    async fn append(&self, token: &SessionToken, row: LedgerRow) -> DomainResult<()>;
    async fn read_all(&self, token: &SessionToken) -> DomainResult<Vec<LedgerRow>>;
    async fn discard(&self, token: &SessionToken) -> DomainResult<()>;
    /// Elimina todo ledger transitorio que quede de sesiones anteriores.
    async fn clear_all(&self) -> DomainResult<()>;
}

/// Destino de los informes exportados. Un informe escrito no se toca más.
#[async_trait]
pub trait ReportSinkPort: Send + Sync {
    /// Escribe el informe de una sesión cerrada y devuelve su nombre de
    /// fichero (`{token_inicio}_{token_fin}.csv`).
    async fn write_report(
        &self,
        start: &SessionToken,
        end: &SessionToken,
        rows: &[LedgerRow],
    ) -> DomainResult<String>;
}
