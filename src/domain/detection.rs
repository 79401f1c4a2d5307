use serde::{Deserialize, Serialize};

/// Caja detectada por el modelo de madurez, en píxeles del frame de
/// trabajo (`[x1, y1, x2, y2]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: [i32; 4],
}

/// Resultado del clasificador de enfermedad (sin localización espacial).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}
