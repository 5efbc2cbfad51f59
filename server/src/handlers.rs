use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use pokify_common::{
    AuthError, InvokeRequest, InvokeResponse, Manifest, RunContext, RunError, SIGNATURE_HEADER,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/trigger", get(manifest).post(invoke))
        .route("/api/trigger/*path", get(manifest).post(invoke))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- errores HTTP ---------------- */

/// Rechazos antes de llegar a ejecutar la tarea.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(AuthError),
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::Unauthorized(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, format!("body inválido: {msg}"))
            }
            ApiError::NotFound(id) => {
                (StatusCode::NOT_FOUND, format!("tarea desconocida: {id}"))
            }
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

fn signature(headers: &HeaderMap) -> Option<&str> {
    headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok())
}

// Lista las tareas registradas; el engine la usa para descubrirlas
async fn manifest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Manifest>, ApiError> {
    state
        .client
        .verify(&body, signature(&headers))
        .map_err(ApiError::Unauthorized)?;

    Ok(Json(state.registry.manifest(state.client.id())))
}

// Recibe una invocación del engine y ejecuta la tarea pedida
async fn invoke(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<InvokeResponse>), ApiError> {
    // 1) autenticación sobre el body crudo
    if let Err(e) = state.client.verify(&body, signature(&headers)) {
        warn!("request rechazado: {}", e);
        return Err(ApiError::Unauthorized(e));
    }

    // 2) parseo
    let req: InvokeRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    // 3) búsqueda de la tarea, sin ejecutar nada si no existe
    let def = match state.registry.get(&req.task_id) {
        Some(def) => def.clone(),
        None => {
            warn!("invocación de tarea desconocida {}", req.task_id);
            return Err(ApiError::NotFound(req.task_id));
        }
    };

    let ctx = RunContext::new(def.id.clone(), req.ctx, req.checkpoints);
    info!(
        "ejecutando tarea {} (run={}, intento={})",
        def.id, ctx.run_id, ctx.attempt
    );

    // 4) ejecución en su propia task de tokio para que un panic no tire el handler
    let outcome = match tokio::spawn(def.run(req.payload, ctx.clone())).await {
        Ok(res) => res,
        Err(e) => Err(RunError::failed(format!("la tarea terminó en pánico: {e}"))),
    };

    let reply = match outcome {
        Ok(output) => {
            info!("tarea {} completada (run={})", def.id, ctx.run_id);
            (StatusCode::OK, InvokeResponse::Completed { output })
        }
        Err(RunError::Suspended(wait)) => {
            info!(
                "tarea {} suspendida en {} por {}s (run={})",
                def.id, wait.key, wait.seconds, ctx.run_id
            );
            (
                StatusCode::ACCEPTED,
                InvokeResponse::Waiting {
                    wait,
                    checkpoints: ctx.new_checkpoints(),
                },
            )
        }
        Err(RunError::Failed(error)) => {
            warn!(
                "tarea {} falló (run={}, intento={}): {}",
                def.id, ctx.run_id, ctx.attempt, error
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                InvokeResponse::Failed {
                    error,
                    checkpoints: ctx.new_checkpoints(),
                },
            )
        }
    };

    Ok((reply.0, Json(reply.1)))
}
