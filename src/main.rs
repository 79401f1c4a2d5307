use std::sync::Arc;

use anyhow::Context;
use tower_http::services::ServeDir;

use cocomat_server::adapters::{
    camera::{synthetic::SyntheticCamera, v4l2::{CaptureConfig, V4l2Camera}},
    http::{router, state::HttpState},
    onnx::{disease::OnnxDiseaseClassifier, maturity::{DetectorParams, OnnxMaturityDetector}},
    storage::{ledger::CsvCountLedger, report::CsvReportSink},
};
use cocomat_server::application::{
    ports::CameraPort,
    services::{CountingService, VisionParams, VisionService},
};
use cocomat_server::config::{AppConfig, CameraBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto)
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    // 2. Configuración y directorios de datos
    let cfg = AppConfig::from_env();
    cfg.storage
        .ensure_dirs()
        .context("creando los directorios de datos")?;

    tracing::info!("🔧 Inicializando adaptadores de infraestructura...");

    // 3. Instanciar Adaptadores (Capa de Infraestructura)
    // Usamos Arc porque serán compartidos entre servicios y el servidor HTTP.
    let maturity = Arc::new(
        OnnxMaturityDetector::load(&cfg.maturity_model, DetectorParams::default())
            .context("cargando el modelo de madurez")?,
    );
    let disease = Arc::new(
        OnnxDiseaseClassifier::load(&cfg.disease_model, cfg.disease_labels.clone())
            .context("cargando el modelo de enfermedad")?,
    );
    let ledger = Arc::new(CsvCountLedger::new(cfg.storage.counts_dir()));
    let reports = Arc::new(CsvReportSink::new(cfg.storage.reports_dir()));
    let camera: Arc<dyn CameraPort> = match cfg.camera {
        CameraBackend::V4l2 => Arc::new(V4l2Camera::new(CaptureConfig {
            device_path: cfg.camera_device.clone(),
            fourcc: "MJPG".to_string(),
            width: cfg.frame_width,
            height: cfg.frame_height,
            fps: cfg.camera_fps,
        })),
        CameraBackend::Synthetic => Arc::new(SyntheticCamera::new(
            cfg.frame_width,
            cfg.frame_height,
            cfg.camera_fps,
        )),
    };

    // 4. Instanciar Servicios (Capa de Aplicación - Casos de Uso)
    let counting = Arc::new(CountingService::new(ledger, reports));
    let vision = Arc::new(VisionService::new(
        maturity,
        disease,
        counting.clone(),
        VisionParams {
            draw_confidence: cfg.draw_confidence,
            count_confidence: cfg.count_confidence,
            classify_confidence: cfg.classify_confidence,
        },
        &cfg.storage,
    ));

    // 5. Configurar el Estado de la API y el Router
    let state = HttpState {
        vision,
        counting,
        camera: camera.clone(),
    };
    let app = router(state).fallback_service(ServeDir::new(&cfg.static_dir));

    // 6. Lanzar el Servidor
    let addr = format!("0.0.0.0:{}", cfg.port);

    tracing::info!("🚀 Servidor COCOMAT iniciado en http://{}", addr);
    tracing::info!("📂 Archivos estáticos servidos desde '{}'", cfg.static_dir);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Con el servidor ya caído, soltar el dispositivo de captura.
    let _ = camera.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Señal de apagado recibida, cerrando...");
}
