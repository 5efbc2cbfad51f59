use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::task::TaskId;

/// Header con la firma del body: `sha256=<hex>`.
pub const SIGNATURE_HEADER: &str = "x-trigger-signature";

/* --------- Invocación (engine -> endpoint) --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeRequest {
    pub task_id: TaskId,
    #[serde(default)]
    pub payload: Value,
    pub ctx: RunMeta,
    /// Pasos ya completados en intentos anteriores de este run
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
}

/// Metadata del run que manda el engine en cada invocación.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    #[serde(default = "first_attempt")]
    pub attempt: u32,
    pub created_at: DateTime<Utc>,
}

fn first_attempt() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub key: String,
    pub output: Value,
}

/// Punto de suspensión durable: el engine espera `seconds` y vuelve a invocar
/// con un checkpoint `{ key, output: null }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitToken {
    pub key: String,
    pub seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvokeResponse {
    Completed {
        output: Value,
    },
    Waiting {
        wait: WaitToken,
        checkpoints: Vec<Checkpoint>,
    },
    /// Los pasos completados antes del fallo viajan igual, para que el
    /// reintento no los vuelva a ejecutar.
    Failed {
        error: String,
        #[serde(default)]
        checkpoints: Vec<Checkpoint>,
    },
}

/* --------- Descubrimiento de tareas --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub project: String,
    /// Siempre "server": el endpoint necesita un proceso de larga vida.
    pub runtime: String,
    pub tasks: Vec<TaskManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskManifestEntry {
    pub id: TaskId,
    pub max_duration: u64,
}

/* --------- Trigger (app -> engine) --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    /// Id del run creado por el engine
    pub id: String,
}
