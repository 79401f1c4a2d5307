use base64::{prelude::BASE64_STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::domain::counts::MaturityClass;
use crate::domain::detection::Detection;
use crate::domain::errors::{DomainError, DomainResult};

/// Tamaño de trabajo de los frames. Las subidas se reescalan a esto antes
/// de la inferencia, igual que los frames del stream.
pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 360;

/// Calidad JPEG de los frames servidos al panel.
const JPEG_QUALITY: u8 = 80;

/// Decodifica bytes subidos como imagen RGB. Cualquier formato que la
/// librería reconozca vale; lo demás es `InvalidImage`.
pub fn decode_image(bytes: &[u8]) -> DomainResult<RgbImage> {
    let img = image::load_from_memory(bytes).map_err(|_| DomainError::InvalidImage)?;
    Ok(img.to_rgb8())
}

/// Lleva la imagen al tamaño de trabajo (si ya lo tiene, no copia dos veces).
pub fn resize_to_frame(img: &RgbImage) -> RgbImage {
    if img.width() == FRAME_WIDTH && img.height() == FRAME_HEIGHT {
        return img.clone();
    }
    image::imageops::resize(img, FRAME_WIDTH, FRAME_HEIGHT, FilterType::Triangle)
}

/// Color del recuadro por clase, los mismos que usa el panel web.
fn class_color(label: &str) -> Rgb<u8> {
    match MaturityClass::from_label(label) {
        Some(MaturityClass::Premature) => Rgb([208, 161, 214]),
        Some(MaturityClass::Potential) => Rgb([240, 198, 160]),
        Some(MaturityClass::Mature) => Rgb([165, 214, 167]),
        None => Rgb([0, 255, 0]),
    }
}

/// Dibuja los recuadros de detección sobre una copia del frame. Función
/// pura del par (frame, detecciones); dos rectángulos anidados por caja
/// para un trazo de 2 px.
pub fn annotate(frame: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut out = frame.clone();
    for det in detections {
        let color = class_color(&det.label);
        let [x1, y1, x2, y2] = det.bbox;
        let w = (x2 - x1).max(1) as u32;
        let h = (y2 - y1).max(1) as u32;
        for inset in 0..2u32 {
            let rect = Rect::at(x1 + inset as i32, y1 + inset as i32)
                .of_size(w.saturating_sub(inset * 2).max(1), h.saturating_sub(inset * 2).max(1));
            draw_hollow_rect_mut(&mut out, rect, color);
        }
    }
    out
}

/// Codifica el frame como JPEG con la calidad del stream.
pub fn encode_jpeg(frame: &RgbImage) -> DomainResult<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder
        .encode(
            frame.as_raw(),
            frame.width(),
            frame.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| DomainError::OperationFailed(format!("JPEG encoding failed: {e}")))?;
    Ok(buf)
}

pub fn to_base64(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(bytes)
}
