use std::sync::Arc;

use crate::application::ports::CameraPort;
use crate::application::services::{CountingService, VisionService};

/// Estado compartido para los manejadores HTTP de Axum.
/// Siguiendo la Arquitectura Hexagonal, el estado contiene los servicios
/// (Casos de Uso) y la cámara del proceso; todos son singletons que HTTP
/// y WebSocket ven por igual.
#[derive(Clone)]
pub struct HttpState {
    /// Servicio de los flujos de visión (subidas y stream).
    pub vision: Arc<VisionService>,
    /// Servicio del ciclo de vida de las sesiones de conteo.
    pub counting: Arc<CountingService>,
    /// Dispositivo de captura que alimenta el stream.
    pub camera: Arc<dyn CameraPort>,
}
