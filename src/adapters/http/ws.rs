use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use tracing::{info, warn};

use crate::adapters::http::state::HttpState;
use crate::application::dto::WsFrameMessage;

pub async fn ws_handler(ws: WebSocketUpgrade, State(st): State<HttpState>) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, st))
}

/// Bucle del stream: capturar, detectar, anotar y enviar, un frame por
/// iteración. La cámara se arranca al entrar y se libera en todas las
/// salidas del bucle, incluidas las de error.
async fn handle_socket(mut socket: WebSocket, st: HttpState) {
    if let Err(e) = st.camera.start().await {
        warn!("No se pudo arrancar la cámara para el stream: {e}");
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    info!("Stream de cámara iniciado");

    loop {
        let frame = match st.camera.capture_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Captura interrumpida: {e}");
                break;
            }
        };
        let outcome = match st.vision.process_camera_frame(frame).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("El pipeline de detección falló: {e}");
                break;
            }
        };

        let msg = WsFrameMessage {
            image: outcome.image_base64,
            detections: outcome.detections,
            counts: outcome.counts,
        };
        let json = serde_json::to_string(&msg).unwrap_or_default();
        if socket.send(Message::Text(json.into())).await.is_err() {
            break; // cliente desconectado
        }
    }

    if let Err(e) = st.camera.stop().await {
        warn!("Fallo al parar la cámara: {e}");
    }
    info!("Stream de cámara finalizado");
}
