use serde::{Deserialize, Serialize};

use crate::domain::{
    counts::MaturityCounts,
    detection::{Classification, Detection},
};

/// Respuesta de `POST /start-counting`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartCountingResponse {
    pub start_time: String,
}

/// Respuesta de `POST /stop-counting`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopCountingResponse {
    pub message: String,
    pub filename: String,
}

/// Respuesta de `POST /upload/disease`. `image` lleva el frame procesado
/// en base64; `location` y `device` se devuelven tal cual llegaron.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseUploadResponse {
    pub image: String,
    pub classifications: Vec<Classification>,
    pub location: Option<String>,
    pub device: Option<String>,
    pub saved_path: Option<String>,
}

/// Respuesta de `POST /upload/maturity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaturityUploadResponse {
    pub image: String,
    pub detections: Vec<Detection>,
    pub counts: MaturityCounts,
    pub location: Option<String>,
    pub device: Option<String>,
    pub saved_path: Option<String>,
}

/// Mensaje por frame del stream WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsFrameMessage {
    pub image: String,
    pub detections: Vec<Detection>,
    pub counts: MaturityCounts,
}
