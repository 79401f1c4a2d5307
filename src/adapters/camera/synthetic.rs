use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use tracing::info;

use crate::application::ports::CameraPort;
use crate::domain::errors::{DomainError, DomainResult};

/// Cámara para máquinas sin hardware de captura: genera un patrón
/// determinista que se desplaza frame a frame y se auto-regula a los FPS
/// configurados. Mismo contrato de ciclo de vida que la cámara real.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    frame_interval: Duration,
    running: AtomicBool,
    frame_no: AtomicU64,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            frame_interval: Duration::from_millis(1000 / fps.max(1) as u64),
            running: AtomicBool::new(false),
            frame_no: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl CameraPort for SyntheticCamera {
    async fn start(&self) -> DomainResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            info!("La cámara sintética ya estaba en marcha");
        }
        Ok(())
    }

    async fn stop(&self) -> DomainResult<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            info!("La cámara sintética ya estaba parada");
        }
        Ok(())
    }

    async fn capture_frame(&self) -> DomainResult<RgbImage> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(DomainError::CameraUnavailable(
                "camera is not started".into(),
            ));
        }
        tokio::time::sleep(self.frame_interval).await;

        let n = self.frame_no.fetch_add(1, Ordering::SeqCst);
        let shift = (n % 256) as u32;
        let height = self.height.max(1);
        Ok(RgbImage::from_fn(self.width, self.height, move |x, y| {
            Rgb([
                ((x + shift) % 256) as u8,
                ((y * 255) / height) as u8,
                ((x + y) % 256) as u8,
            ])
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lifecycle_is_idempotent() {
        let cam = SyntheticCamera::new(64, 48, 1000);
        cam.start().await.unwrap();
        cam.start().await.unwrap();
        cam.stop().await.unwrap();
        cam.stop().await.unwrap();
    }

    #[tokio::test]
    async fn capture_requires_a_started_camera() {
        let cam = SyntheticCamera::new(64, 48, 1000);
        let err = cam.capture_frame().await.unwrap_err();
        assert!(matches!(err, DomainError::CameraUnavailable(_)));

        cam.start().await.unwrap();
        let frame = cam.capture_frame().await.unwrap();
        assert_eq!((frame.width(), frame.height()), (64, 48));
    }

    #[tokio::test]
    async fn consecutive_frames_differ() {
        let cam = SyntheticCamera::new(32, 32, 1000);
        cam.start().await.unwrap();
        let a = cam.capture_frame().await.unwrap();
        let b = cam.capture_frame().await.unwrap();
        assert_ne!(a.as_raw(), b.as_raw());
    }
}
