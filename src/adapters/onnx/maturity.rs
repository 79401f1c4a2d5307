use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use image::RgbImage;
use ndarray::{s, ArrayViewD, Axis, IxDyn};
use ort::session::Session;
use tracing::info;

use crate::adapters::onnx::engine;
use crate::application::ports::MaturityDetectorPort;
use crate::domain::counts::MaturityClass;
use crate::domain::detection::Detection;
use crate::domain::errors::{DomainError, DomainResult};

/// Parámetros del detector de madurez.
#[derive(Debug, Clone)]
pub struct DetectorParams {
    pub input_size: u32,
    /// Umbral de candidato del decodificador, no el de presentación: por
    /// debajo de esto la salida del modelo es ruido y ni se construye.
    pub base_confidence: f32,
    pub max_detections: usize,
}

impl Default for DetectorParams {
    fn default() -> Self {
        DetectorParams {
            input_size: 640,
            base_confidence: 0.25,
            max_detections: 100,
        }
    }
}

/// Detector de madurez sobre un modelo YOLO exportado a ONNX. La sesión
/// no es `Sync`, así que va tras un candado: una inferencia a la vez.
pub struct OnnxMaturityDetector {
    session: Mutex<Session>,
    params: DetectorParams,
}

impl OnnxMaturityDetector {
    pub fn load(path: &str, params: DetectorParams) -> Result<Self> {
        let session = engine::load_session(path)?;
        info!("Modelo de madurez cargado desde {path}");
        Ok(Self {
            session: Mutex::new(session),
            params,
        })
    }

    fn infer(&self, rgb: &RgbImage) -> Result<Vec<Detection>> {
        let input_tensor = engine::to_input_tensor(rgb, self.params.input_size)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("maturity session lock poisoned"))?;
        let outputs = session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.into_iter().map(|&x| x as usize).collect();
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0);

        // Salida YOLO: [cx, cy, w, h, clase...] por candidato. Las cajas
        // vuelven a coordenadas del frame original.
        let num_candidates = view.shape()[1];
        let imgsz = self.params.input_size as f32;
        let sx = rgb.width() as f32 / imgsz;
        let sy = rgb.height() as f32 / imgsz;

        let mut detections = Vec::new();
        for i in 0..num_candidates {
            let scores = view.slice(s![4.., i]);
            let Some((class_id, &max_score)) = scores
                .indexed_iter()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
            else {
                continue;
            };

            if max_score > self.params.base_confidence {
                let cx = view[[0, i]];
                let cy = view[[1, i]];
                let w = view[[2, i]];
                let h = view[[3, i]];

                let label = MaturityClass::ALL
                    .get(class_id)
                    .map(|c| c.label().to_string())
                    .unwrap_or_else(|| "Unknown".to_string());

                detections.push(Detection {
                    label,
                    confidence: max_score,
                    bbox: [
                        ((cx - w / 2.0) * sx) as i32,
                        ((cy - h / 2.0) * sy) as i32,
                        ((cx + w / 2.0) * sx) as i32,
                        ((cy + h / 2.0) * sy) as i32,
                    ],
                });
            }
        }

        detections.sort_unstable_by(|a, b| b.confidence.total_cmp(&a.confidence));
        detections.truncate(self.params.max_detections);
        Ok(detections)
    }
}

#[async_trait]
impl MaturityDetectorPort for OnnxMaturityDetector {
    async fn detect(&self, frame: &RgbImage) -> DomainResult<Vec<Detection>> {
        self.infer(frame)
            .map_err(|e| DomainError::OperationFailed(format!("maturity inference failed: {e}")))
    }
}
