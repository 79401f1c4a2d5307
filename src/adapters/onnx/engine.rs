use std::fs;
use std::path::Path;

use anyhow::{bail, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::Array4;
use ort::session::Session;
use ort::value::{Tensor, Value};

/// Carga una sesión ONNX en CPU. El objetivo de despliegue es una placa
/// sin GPU, así que no se registra ningún execution provider extra.
pub fn load_session(path: &str) -> Result<Session> {
    if path.trim().is_empty() {
        bail!("model path is empty");
    }
    if !Path::new(path).is_file() {
        bail!("model file not found: {path}");
    }

    let builder = Session::builder()?.with_intra_threads(4)?;
    // Leemos el fichero entero y usamos commit_from_memory.
    let model_bytes = fs::read(path)?;
    Ok(builder.commit_from_memory(&model_bytes)?)
}

/// Reescala el frame al cuadrado de entrada del modelo y lo empaqueta
/// como tensor NCHW f32 normalizado a [0, 1].
pub fn to_input_tensor(rgb: &RgbImage, input_size: u32) -> Result<Tensor<f32>> {
    let imgsz = input_size as usize;
    let resized = image::imageops::resize(rgb, input_size, input_size, FilterType::Nearest);

    let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
    for (x, y, pixel) in resized.enumerate_pixels() {
        input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
    }

    let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
    Ok(Value::from_array((input_shape, input.into_raw_vec()))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_paths_are_rejected_before_loading() {
        assert!(load_session("").is_err());
        assert!(load_session("   ").is_err());
        assert!(load_session("/no/existe/modelo.onnx").is_err());
    }
}
