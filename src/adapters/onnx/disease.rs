use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use image::RgbImage;
use ort::session::Session;
use tracing::info;

use crate::adapters::onnx::engine;
use crate::application::ports::DiseaseClassifierPort;
use crate::domain::detection::Classification;
use crate::domain::errors::{DomainError, DomainResult};

/// Lado de entrada de la cabeza de clasificación.
const INPUT_SIZE: u32 = 224;

/// Clasificador de enfermedad de la palmera: cabeza `[1, C]` → lista de
/// clases ordenada por confianza. Las etiquetas llegan por configuración,
/// en el orden de clases con el que se exportó el modelo.
pub struct OnnxDiseaseClassifier {
    session: Mutex<Session>,
    labels: Vec<String>,
}

impl OnnxDiseaseClassifier {
    pub fn load(path: &str, labels: Vec<String>) -> Result<Self> {
        let session = engine::load_session(path)?;
        info!(
            "Modelo de enfermedad cargado desde {path} ({} clases)",
            labels.len()
        );
        Ok(Self {
            session: Mutex::new(session),
            labels,
        })
    }

    fn infer(&self, rgb: &RgbImage) -> Result<Vec<Classification>> {
        let input_tensor = engine::to_input_tensor(rgb, INPUT_SIZE)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("disease session lock poisoned"))?;
        let outputs = session.run(ort::inputs![input_tensor])?;
        let (_, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        // El modelo exportado ya trae su activación aplicada; los valores
        // se leen como confianzas tal cual.
        let mut ranked: Vec<Classification> = data_out
            .iter()
            .enumerate()
            .map(|(i, &confidence)| Classification {
                label: self
                    .labels
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("Class {i}")),
                confidence,
            })
            .collect();
        ranked.sort_unstable_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(ranked)
    }
}

#[async_trait]
impl DiseaseClassifierPort for OnnxDiseaseClassifier {
    async fn classify(&self, frame: &RgbImage) -> DomainResult<Vec<Classification>> {
        self.infer(frame)
            .map_err(|e| DomainError::OperationFailed(format!("disease inference failed: {e}")))
    }
}
