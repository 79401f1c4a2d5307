use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::adapters::http::state::HttpState;
use crate::application::dto::{
    DiseaseUploadResponse, MaturityUploadResponse, StartCountingResponse, StopCountingResponse,
};
use crate::domain::errors::DomainError;

/// Mapea un error de dominio a la respuesta `{"error": ...}` con el
/// código HTTP que le corresponde.
fn error_response(err: DomainError) -> Response {
    let status = match &err {
        DomainError::NoActiveSession
        | DomainError::SessionAlreadyOpen(_)
        | DomainError::InvalidImage => StatusCode::BAD_REQUEST,
        DomainError::LedgerNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::LedgerCreate(_)
        | DomainError::CameraUnavailable(_)
        | DomainError::OperationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

pub async fn start_counting(State(st): State<HttpState>) -> Response {
    match st.counting.start_counting().await {
        Ok(token) => Json(StartCountingResponse {
            start_time: token.to_string(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn stop_counting(State(st): State<HttpState>) -> Response {
    match st.counting.stop_counting().await {
        Ok(summary) => Json(StopCountingResponse {
            message: summary.message,
            filename: summary.filename,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Campos que aceptan los formularios de subida.
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    location: Option<String>,
    device: Option<String>,
}

/// Recorre el multipart una sola vez y se queda con los campos conocidos;
/// el resto se ignora sin protestar.
async fn read_upload(mut multipart: Multipart) -> Result<UploadForm, DomainError> {
    let mut form = UploadForm {
        file: None,
        location: None,
        device: None,
    };
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DomainError::OperationFailed(format!("multipart error: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| DomainError::OperationFailed(format!("multipart error: {e}")))?;
                form.file = Some((filename, bytes.to_vec()));
            }
            Some("location") => {
                form.location = field.text().await.ok().filter(|s| !s.is_empty());
            }
            Some("device") => {
                form.device = field.text().await.ok().filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }
    Ok(form)
}

pub async fn upload_disease(State(st): State<HttpState>, multipart: Multipart) -> Response {
    let form = match read_upload(multipart).await {
        Ok(form) => form,
        Err(e) => return error_response(e),
    };
    // Sin campo de fichero no hay imagen que validar.
    let Some((filename, bytes)) = form.file else {
        return error_response(DomainError::InvalidImage);
    };

    match st.vision.classify_disease_upload(&bytes, &filename).await {
        Ok(outcome) => Json(DiseaseUploadResponse {
            image: outcome.image_base64,
            classifications: outcome.classifications,
            location: form.location,
            device: form.device,
            saved_path: outcome.saved_path,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn upload_maturity(State(st): State<HttpState>, multipart: Multipart) -> Response {
    let form = match read_upload(multipart).await {
        Ok(form) => form,
        Err(e) => return error_response(e),
    };
    let Some((filename, bytes)) = form.file else {
        return error_response(DomainError::InvalidImage);
    };

    match st.vision.detect_maturity_upload(&bytes, &filename).await {
        Ok(outcome) => Json(MaturityUploadResponse {
            image: outcome.image_base64,
            detections: outcome.detections,
            counts: outcome.counts,
            location: form.location,
            device: form.device,
            saved_path: outcome.saved_path,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses_follow_the_taxonomy() {
        let cases = [
            (DomainError::NoActiveSession, StatusCode::BAD_REQUEST),
            (
                DomainError::SessionAlreadyOpen("t".into()),
                StatusCode::BAD_REQUEST,
            ),
            (DomainError::InvalidImage, StatusCode::BAD_REQUEST),
            (
                DomainError::LedgerNotFound("t".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                DomainError::LedgerCreate("disk".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                DomainError::CameraUnavailable("gone".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(error_response(err).status(), expected);
        }
    }
}
