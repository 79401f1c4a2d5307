//! Utilidades compartidas por los tests de integración: dobles de los
//! puertos de inferencia y montaje de la pila de servicios sobre un
//! directorio temporal.

// No todos los binarios de test usan todos los helpers.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use image::{Rgb, RgbImage};

use cocomat_server::adapters::storage::{ledger::CsvCountLedger, report::CsvReportSink};
use cocomat_server::application::ports::{DiseaseClassifierPort, MaturityDetectorPort};
use cocomat_server::application::services::{CountingService, VisionParams, VisionService};
use cocomat_server::config::StorageLayout;
use cocomat_server::domain::detection::{Classification, Detection};
use cocomat_server::domain::errors::DomainResult;

/// Detector de madurez de mentira: devuelve siempre la misma lista.
pub struct FixedDetector {
    detections: Vec<Detection>,
}

impl FixedDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }
}

#[async_trait]
impl MaturityDetectorPort for FixedDetector {
    async fn detect(&self, _frame: &RgbImage) -> DomainResult<Vec<Detection>> {
        Ok(self.detections.clone())
    }
}

/// Detector que devuelve una lista distinta en cada llamada, en orden.
/// Agotada la secuencia, devuelve listas vacías.
pub struct SequencedDetector {
    sequence: std::sync::Mutex<std::collections::VecDeque<Vec<Detection>>>,
}

impl SequencedDetector {
    pub fn new(sequence: Vec<Vec<Detection>>) -> Self {
        Self {
            sequence: std::sync::Mutex::new(sequence.into()),
        }
    }
}

#[async_trait]
impl MaturityDetectorPort for SequencedDetector {
    async fn detect(&self, _frame: &RgbImage) -> DomainResult<Vec<Detection>> {
        let mut sequence = self.sequence.lock().expect("sequence lock");
        Ok(sequence.pop_front().unwrap_or_default())
    }
}

/// Clasificador de enfermedad de mentira.
pub struct FixedClassifier {
    classifications: Vec<Classification>,
}

impl FixedClassifier {
    pub fn new(classifications: Vec<Classification>) -> Self {
        Self { classifications }
    }
}

#[async_trait]
impl DiseaseClassifierPort for FixedClassifier {
    async fn classify(&self, _frame: &RgbImage) -> DomainResult<Vec<Classification>> {
        Ok(self.classifications.clone())
    }
}

pub fn detection(label: &str, confidence: f32) -> Detection {
    Detection {
        label: label.to_string(),
        confidence,
        bbox: [10, 10, 60, 60],
    }
}

pub fn classification(label: &str, confidence: f32) -> Classification {
    Classification {
        label: label.to_string(),
        confidence,
    }
}

/// Imagen pequeña válida, codificada como PNG (para las rutas de subida).
pub fn test_image_png() -> Vec<u8> {
    let img = RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8, y as u8, 128]));
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("PNG encoding");
    buf.into_inner()
}

/// Pila de conteo completa (ledger CSV + informes) sobre `root`.
pub fn counting_stack(root: &Path) -> Arc<CountingService> {
    let storage = StorageLayout::with_root(root);
    let ledger = Arc::new(CsvCountLedger::new(storage.counts_dir()));
    let reports = Arc::new(CsvReportSink::new(storage.reports_dir()));
    Arc::new(CountingService::new(ledger, reports))
}

/// Pila de visión con los dobles de inferencia dados.
pub fn vision_stack(
    root: &Path,
    detections: Vec<Detection>,
    classifications: Vec<Classification>,
    params: VisionParams,
) -> (Arc<VisionService>, Arc<CountingService>) {
    let counting = counting_stack(root);
    let vision = Arc::new(VisionService::new(
        Arc::new(FixedDetector::new(detections)),
        Arc::new(FixedClassifier::new(classifications)),
        counting.clone(),
        params,
        &StorageLayout::with_root(root),
    ));
    (vision, counting)
}

/// Pila de visión con un detector arbitrario y una pila de conteo ya
/// existente (para compartir sesión entre varias llamadas del test).
pub fn vision_with_detector(
    root: &Path,
    detector: Arc<dyn MaturityDetectorPort>,
    counting: Arc<CountingService>,
    params: VisionParams,
) -> Arc<VisionService> {
    Arc::new(VisionService::new(
        detector,
        Arc::new(FixedClassifier::new(vec![])),
        counting,
        params,
        &StorageLayout::with_root(root),
    ))
}

/// Ledger auxiliar apuntando al mismo directorio que usa la pila, para
/// inspeccionar lo persistido desde los tests.
pub fn ledger_view(root: &Path) -> CsvCountLedger {
    CsvCountLedger::new(StorageLayout::with_root(root).counts_dir())
}
