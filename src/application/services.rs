use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    application::{
        frames,
        ports::{CountLedgerPort, DiseaseClassifierPort, MaturityDetectorPort, ReportSinkPort},
    },
    config::StorageLayout,
    domain::{
        counts::MaturityCounts,
        detection::{Classification, Detection},
        errors::{DomainError, DomainResult},
        session::{LedgerRow, SessionRegistry, SessionToken},
    },
};

/// Resumen devuelto al cerrar una sesión de conteo.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub message: String,
    pub filename: String,
}

/// Servicio del ciclo de vida de las sesiones de conteo: registro FIFO en
/// memoria, ledger transitorio en disco y exportación del informe final.
///
/// El registro vive dentro del servicio y se comparte vía `Arc`, de modo
/// que HTTP y WebSocket ven la misma cola de sesiones.
pub struct CountingService {
    registry: Mutex<SessionRegistry>,
    ledger: Arc<dyn CountLedgerPort>,
    reports: Arc<dyn ReportSinkPort>,
}

impl CountingService {
    pub fn new(ledger: Arc<dyn CountLedgerPort>, reports: Arc<dyn ReportSinkPort>) -> Self {
        Self {
            registry: Mutex::new(SessionRegistry::new()),
            ledger,
            reports,
        }
    }

    /// Abre una sesión nueva. El arranque limpia cualquier ledger
    /// transitorio previo antes de crear el de la sesión; como ese paso es
    /// destructivo, arrancar con otra sesión todavía pendiente se rechaza.
    ///
    /// El candado del registro se mantiene durante toda la transición para
    /// que dos arranques simultáneos no pasen ambos la comprobación.
    pub async fn start_counting(&self) -> DomainResult<SessionToken> {
        let mut registry = self.registry.lock().await;
        if let Ok(open) = registry.current() {
            return Err(DomainError::SessionAlreadyOpen(open.to_string()));
        }

        self.ledger.clear_all().await?;
        let token = SessionToken::now();
        self.ledger.create(&token).await?;
        registry.open(token.clone());

        info!("Sesión de conteo abierta: {token}");
        Ok(token)
    }

    /// Cierra la sesión abierta más antigua (frente de la cola FIFO) y la
    /// exporta: lee el ledger completo, escribe el informe transpuesto y
    /// descarta el ledger.
    pub async fn stop_counting(&self) -> DomainResult<ExportSummary> {
        let mut registry = self.registry.lock().await;
        let start = registry.close()?;
        let end = SessionToken::now();

        let rows = self.ledger.read_all(&start).await?;
        let filename = self.reports.write_report(&start, &end, &rows).await?;
        self.ledger.discard(&start).await?;

        info!(
            "Sesión {start} cerrada y exportada como {filename} ({} registros)",
            rows.len()
        );
        Ok(ExportSummary {
            message: format!("Report saved as {filename}"),
            filename,
        })
    }

    /// Atribuye un recuento a la sesión en curso, si la hay. Nunca
    /// interrumpe al llamador: sin sesión no se anota nada, y un fallo de
    /// persistencia se registra en el log y se traga.
    pub async fn record(&self, counts: &MaturityCounts) {
        let token = match self.registry.lock().await.current() {
            Ok(token) => token,
            Err(_) => return,
        };
        let row = LedgerRow::now(counts);
        if let Err(e) = self.ledger.append(&token, row).await {
            warn!("No se pudo anotar el recuento en la sesión {token}: {e}");
        }
    }

    /// Token de la sesión en curso (frente de la cola).
    pub async fn current_session(&self) -> DomainResult<SessionToken> {
        self.registry.lock().await.current()
    }
}

/// Umbrales de los flujos de visión. El de presentación decide qué cajas
/// se devuelven y se dibujan; el de contabilidad, qué detecciones suman.
#[derive(Debug, Clone, Copy)]
pub struct VisionParams {
    pub draw_confidence: f32,
    pub count_confidence: f32,
    pub classify_confidence: f32,
}

impl Default for VisionParams {
    fn default() -> Self {
        VisionParams {
            draw_confidence: 0.7,
            count_confidence: 0.0,
            classify_confidence: 0.3,
        }
    }
}

/// Resultado de una pasada de detección de madurez.
#[derive(Debug, Clone)]
pub struct MaturityOutcome {
    pub image_base64: String,
    pub detections: Vec<Detection>,
    pub counts: MaturityCounts,
    pub saved_path: Option<String>,
}

/// Resultado de una pasada del clasificador de enfermedad.
#[derive(Debug, Clone)]
pub struct DiseaseOutcome {
    pub image_base64: String,
    pub classifications: Vec<Classification>,
    pub saved_path: Option<String>,
}

/// Orquestador de los flujos de visión (subidas y stream). Cada frame de
/// madurez pasa por el mismo camino: detectar, contabilizar, anotar.
pub struct VisionService {
    maturity: Arc<dyn MaturityDetectorPort>,
    disease: Arc<dyn DiseaseClassifierPort>,
    counting: Arc<CountingService>,
    params: VisionParams,
    disease_dir: PathBuf,
    maturity_dir: PathBuf,
}

impl VisionService {
    pub fn new(
        maturity: Arc<dyn MaturityDetectorPort>,
        disease: Arc<dyn DiseaseClassifierPort>,
        counting: Arc<CountingService>,
        params: VisionParams,
        storage: &StorageLayout,
    ) -> Self {
        Self {
            maturity,
            disease,
            counting,
            params,
            disease_dir: storage.disease_uploads_dir(),
            maturity_dir: storage.maturity_uploads_dir(),
        }
    }

    /// Camino común de un frame de madurez ya decodificado: detectar,
    /// contabilizar contra la sesión en curso y anotar. El recuento usa su
    /// propio umbral, independiente del de presentación.
    pub async fn process_camera_frame(&self, frame: RgbImage) -> DomainResult<MaturityOutcome> {
        let (jpeg, detections, counts) = self.detect_and_annotate(frame).await?;
        Ok(MaturityOutcome {
            image_base64: frames::to_base64(&jpeg),
            detections,
            counts,
            saved_path: None,
        })
    }

    /// Flujo de `POST /upload/maturity`: decodifica la subida, la procesa
    /// como cualquier frame y guarda una copia anotada.
    pub async fn detect_maturity_upload(
        &self,
        bytes: &[u8],
        original_name: &str,
    ) -> DomainResult<MaturityOutcome> {
        let image = frames::decode_image(bytes)?;
        let (jpeg, detections, counts) = self.detect_and_annotate(image).await?;
        let saved_path = save_processed(&self.maturity_dir, original_name, &jpeg);

        Ok(MaturityOutcome {
            image_base64: frames::to_base64(&jpeg),
            detections,
            counts,
            saved_path,
        })
    }

    async fn detect_and_annotate(
        &self,
        frame: RgbImage,
    ) -> DomainResult<(Vec<u8>, Vec<Detection>, MaturityCounts)> {
        let frame = frames::resize_to_frame(&frame);
        let raw = self.maturity.detect(&frame).await?;

        let counts = MaturityCounts::tally(&raw, self.params.count_confidence);
        self.counting.record(&counts).await;

        let visible: Vec<Detection> = raw
            .into_iter()
            .filter(|d| d.confidence >= self.params.draw_confidence)
            .collect();
        let annotated = frames::annotate(&frame, &visible);
        let jpeg = frames::encode_jpeg(&annotated)?;
        Ok((jpeg, visible, counts))
    }

    /// Flujo de `POST /upload/disease`: clasifica la subida completa (sin
    /// cajas) y guarda la copia reescalada.
    pub async fn classify_disease_upload(
        &self,
        bytes: &[u8],
        original_name: &str,
    ) -> DomainResult<DiseaseOutcome> {
        let image = frames::decode_image(bytes)?;
        let frame = frames::resize_to_frame(&image);

        let all = self.disease.classify(&frame).await?;
        let classifications: Vec<Classification> = all
            .into_iter()
            .filter(|c| c.confidence >= self.params.classify_confidence)
            .collect();

        let jpeg = frames::encode_jpeg(&frame)?;
        let saved_path = save_processed(&self.disease_dir, original_name, &jpeg);

        Ok(DiseaseOutcome {
            image_base64: frames::to_base64(&jpeg),
            classifications,
            saved_path,
        })
    }
}

/// Nombre base de la subida sin rutas ni caracteres raros.
fn safe_stem(original_name: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Guarda la copia procesada de una subida. Es best-effort: si el disco
/// falla se anota en el log y la respuesta sigue adelante sin ruta.
fn save_processed(dir: &Path, original_name: &str, jpeg: &[u8]) -> Option<String> {
    let path = dir.join(format!("processed_{}.jpg", safe_stem(original_name)));
    let result = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, jpeg));
    match result {
        Ok(()) => Some(path.to_string_lossy().into_owned()),
        Err(e) => {
            warn!("No se pudo guardar la copia procesada en {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_stem_strips_paths_and_oddities() {
        assert_eq!(safe_stem("palm.jpg"), "palm");
        assert_eq!(safe_stem("../../etc/passwd"), "passwd");
        assert_eq!(safe_stem("mi foto (1).png"), "mifoto1");
        assert_eq!(safe_stem("...."), "upload");
    }
}
