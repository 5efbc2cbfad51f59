use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use pokify_common::{
    Checkpoint, InvokeRequest, InvokeResponse, Manifest, RunMeta, TaskClient, SIGNATURE_HEADER,
};
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Estado de un run mientras el CLI hace de engine local.
#[derive(Debug, Clone)]
pub struct RunState {
    pub task_id: String,
    pub payload: Value,
    pub run_id: String,
    pub attempt: u32,
    /// Fijo para todo el run, como lo manda el engine
    pub created_at: DateTime<Utc>,
    pub checkpoints: Vec<Checkpoint>,
}

impl RunState {
    pub fn new(task_id: &str, payload: Value) -> Self {
        Self {
            task_id: task_id.to_string(),
            payload,
            run_id: format!("run_{}", uuid::Uuid::new_v4().simple()),
            attempt: 1,
            created_at: Utc::now(),
            checkpoints: Vec::new(),
        }
    }

    fn request(&self) -> InvokeRequest {
        InvokeRequest {
            task_id: self.task_id.clone(),
            payload: self.payload.clone(),
            ctx: RunMeta {
                run_id: self.run_id.clone(),
                attempt: self.attempt,
                created_at: self.created_at,
            },
            checkpoints: self.checkpoints.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Next {
    Done(Value),
    /// Reinvocar después de la espera pedida por la tarea
    Resume(Duration),
    /// Reintentar con attempt + 1
    Retry,
    GiveUp(String),
}

/// Decide qué hacer con la respuesta del endpoint y actualiza el estado del run.
pub fn advance(state: &mut RunState, resp: InvokeResponse, max_attempts: u32) -> Next {
    match resp {
        InvokeResponse::Completed { output } => Next::Done(output),
        InvokeResponse::Waiting { wait, checkpoints } => {
            state.checkpoints.extend(checkpoints);
            state.checkpoints.push(Checkpoint {
                key: wait.key,
                output: Value::Null,
            });
            Next::Resume(Duration::from_secs(wait.seconds))
        }
        InvokeResponse::Failed { error, checkpoints } => {
            // los pasos completados valen también para el reintento
            state.checkpoints.extend(checkpoints);
            if state.attempt < max_attempts {
                state.attempt += 1;
                Next::Retry
            } else {
                Next::GiveUp(error)
            }
        }
    }
}

/// Cliente HTTP del endpoint de tareas, firmando como lo haría el engine.
pub struct Endpoint {
    http: Client,
    url: String,
    signer: TaskClient,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, signer: TaskClient) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
            signer,
        }
    }

    pub async fn manifest(&self) -> Result<Manifest> {
        let resp = self
            .http
            .get(&self.url)
            .header(SIGNATURE_HEADER, self.signer.sign(b""))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("el endpoint devolvió {}: {}", status, text);
        }
        Ok(resp.json().await?)
    }

    /// Una invocación. Los 4xx son errores de configuración y no se reintentan.
    pub async fn invoke_once(&self, req: &InvokeRequest) -> Result<InvokeResponse> {
        let body = serde_json::to_vec(req)?;
        let resp = self
            .http
            .post(&self.url)
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, self.signer.sign(&body))
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if status.is_client_error() {
            bail!("el endpoint rechazó la invocación ({}): {}", status, text);
        }

        match serde_json::from_str::<InvokeResponse>(&text) {
            Ok(r) => Ok(r),
            Err(_) if status.is_server_error() => Ok(InvokeResponse::Failed {
                error: format!("status {}: {}", status, text),
                checkpoints: Vec::new(),
            }),
            Err(e) => bail!("respuesta inesperada del endpoint ({}): {}", e, text),
        }
    }

    /// Ejecuta la tarea hasta que termine, respetando esperas y reintentos.
    pub async fn run_to_completion(
        &self,
        task_id: &str,
        payload: Value,
        max_attempts: u32,
    ) -> Result<Value> {
        let mut state = RunState::new(task_id, payload);
        info!("iniciando run {} de la tarea {}", state.run_id, task_id);

        loop {
            let resp = self.invoke_once(&state.request()).await?;

            match advance(&mut state, resp, max_attempts) {
                Next::Done(output) => {
                    info!("run {} completado", state.run_id);
                    return Ok(output);
                }
                Next::Resume(wait) => {
                    info!("run {} en espera {:?}, reanudando después", state.run_id, wait);
                    tokio::time::sleep(wait).await;
                }
                Next::Retry => {
                    warn!(
                        "run {} falló, reintentando (intento {}/{})",
                        state.run_id, state.attempt, max_attempts
                    );
                }
                Next::GiveUp(error) => {
                    bail!(
                        "run {} falló después de {} intentos: {}",
                        state.run_id,
                        state.attempt,
                        error
                    );
                }
            }
        }
    }
}
