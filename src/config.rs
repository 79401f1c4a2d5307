use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Backend de cámara del stream. Se elige por configuración, nunca
/// sondeando el hardware en tiempo de ejecución.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraBackend {
    /// Dispositivo de captura real (`/dev/videoN`).
    V4l2,
    /// Generador de frames para máquinas sin cámara.
    Synthetic,
}

/// Rutas de datos del servicio, todas colgando de una raíz común.
/// `with_root` permite inyectar un directorio temporal en los tests.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        StorageLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ledgers transitorios de sesiones abiertas, uno por token.
    pub fn counts_dir(&self) -> PathBuf {
        self.root.join("counting_sessions")
    }

    /// Informes finales ya exportados.
    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    pub fn disease_uploads_dir(&self) -> PathBuf {
        self.root.join("uploaded_images_disease")
    }

    pub fn maturity_uploads_dir(&self) -> PathBuf {
        self.root.join("uploaded_images_maturity")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.counts_dir(),
            self.reports_dir(),
            self.disease_uploads_dir(),
            self.maturity_uploads_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        StorageLayout::with_root(".")
    }
}

/// Configuración completa del servidor, leída del entorno con valores
/// por defecto utilizables en desarrollo.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub static_dir: String,
    pub maturity_model: String,
    pub disease_model: String,
    pub disease_labels: Vec<String>,
    pub camera: CameraBackend,
    pub camera_device: String,
    pub frame_width: u32,
    pub frame_height: u32,
    pub camera_fps: u32,
    /// Umbral de presentación: qué cajas se dibujan y se devuelven.
    pub draw_confidence: f32,
    /// Umbral de contabilidad: qué detecciones suman al recuento.
    pub count_confidence: f32,
    /// Umbral del clasificador de enfermedad.
    pub classify_confidence: f32,
    pub storage: StorageLayout,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            port: 8000,
            static_dir: "static".to_string(),
            maturity_model: "models/maturity.onnx".to_string(),
            disease_model: "models/disease.onnx".to_string(),
            disease_labels: vec![
                "Bud Rot".to_string(),
                "Gray Leaf Spot".to_string(),
                "Stem Bleeding".to_string(),
                "Healthy".to_string(),
            ],
            camera: CameraBackend::Synthetic,
            camera_device: "/dev/video0".to_string(),
            frame_width: 640,
            frame_height: 360,
            camera_fps: 30,
            draw_confidence: 0.7,
            count_confidence: 0.0,
            classify_confidence: 0.3,
            storage: StorageLayout::default(),
        }
    }
}

impl AppConfig {
    /// Lee la configuración de variables `COCOMAT_*`; lo que falte o no
    /// parsee cae al valor por defecto.
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();
        let camera = match env::var("COCOMAT_CAMERA").as_deref() {
            Ok("v4l2") => CameraBackend::V4l2,
            Ok("synthetic") => CameraBackend::Synthetic,
            _ => defaults.camera,
        };
        let disease_labels = env::var("COCOMAT_DISEASE_LABELS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .ok()
            .filter(|labels| !labels.is_empty())
            .unwrap_or(defaults.disease_labels);

        AppConfig {
            port: env_or("COCOMAT_PORT", defaults.port),
            static_dir: env_or("COCOMAT_STATIC_DIR", defaults.static_dir),
            maturity_model: env_or("COCOMAT_MATURITY_MODEL", defaults.maturity_model),
            disease_model: env_or("COCOMAT_DISEASE_MODEL", defaults.disease_model),
            disease_labels,
            camera,
            camera_device: env_or("COCOMAT_CAMERA_DEVICE", defaults.camera_device),
            frame_width: env_or("COCOMAT_FRAME_WIDTH", defaults.frame_width),
            frame_height: env_or("COCOMAT_FRAME_HEIGHT", defaults.frame_height),
            camera_fps: env_or("COCOMAT_CAMERA_FPS", defaults.camera_fps),
            draw_confidence: env_or("COCOMAT_DRAW_CONFIDENCE", defaults.draw_confidence),
            count_confidence: env_or("COCOMAT_COUNT_CONFIDENCE", defaults.count_confidence),
            classify_confidence: env_or(
                "COCOMAT_CLASSIFY_CONFIDENCE",
                defaults.classify_confidence,
            ),
            storage: StorageLayout::with_root(env_or(
                "COCOMAT_DATA_DIR",
                ".".to_string(),
            )),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn layout_paths_hang_from_the_root() {
        let layout = StorageLayout::with_root("/srv/cocomat");
        assert_eq!(
            layout.counts_dir(),
            PathBuf::from("/srv/cocomat/counting_sessions")
        );
        assert_eq!(layout.reports_dir(), PathBuf::from("/srv/cocomat/reports"));
        assert_eq!(
            layout.disease_uploads_dir(),
            PathBuf::from("/srv/cocomat/uploaded_images_disease")
        );
        assert_eq!(
            layout.maturity_uploads_dir(),
            PathBuf::from("/srv/cocomat/uploaded_images_maturity")
        );
    }

    #[test]
    fn ensure_dirs_creates_the_whole_layout() {
        let tmp = TempDir::new().unwrap();
        let layout = StorageLayout::with_root(tmp.path());
        layout.ensure_dirs().unwrap();
        assert!(layout.counts_dir().is_dir());
        assert!(layout.reports_dir().is_dir());
        assert!(layout.disease_uploads_dir().is_dir());
        assert!(layout.maturity_uploads_dir().is_dir());
    }

    #[test]
    fn defaults_are_consistent() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.camera, CameraBackend::Synthetic);
        assert_eq!((cfg.frame_width, cfg.frame_height), (640, 360));
        assert!(cfg.count_confidence <= cfg.draw_confidence);
        assert_eq!(cfg.disease_labels.len(), 4);
    }
}
