use std::{fmt, future::Future, sync::Arc};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::client::TaskClient;
use crate::context::RunContext;
use crate::error::{ClientError, RunError};
use crate::wire::{TaskManifestEntry, TriggerResponse};

pub type TaskId = String;

/// Función de ejecución de una tarea: recibe el payload y el contexto del run.
pub type RunFn =
    Arc<dyn Fn(Value, RunContext) -> BoxFuture<'static, Result<Value, RunError>> + Send + Sync>;

/// Envuelve un closure async como `RunFn`.
pub fn run_fn<F, Fut>(f: F) -> RunFn
where
    F: Fn(Value, RunContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, RunError>> + Send + 'static,
{
    Arc::new(move |payload, ctx| Box::pin(f(payload, ctx)))
}

/// Lo que la aplicación declara para registrar una tarea.
pub struct TaskConfig {
    pub id: TaskId,
    /// Segundos de cómputo permitidos por intento (lo aplica el engine)
    pub max_duration: u64,
    pub run: RunFn,
}

/// Tarea ya registrada. Inmutable después del registro.
#[derive(Clone)]
pub struct TaskDefinition {
    pub id: TaskId,
    pub max_duration: u64,
    run: RunFn,
}

impl TaskDefinition {
    pub(crate) fn from_config(config: TaskConfig) -> Self {
        Self {
            id: config.id,
            max_duration: config.max_duration,
            run: config.run,
        }
    }

    pub fn run(
        &self,
        payload: Value,
        ctx: RunContext,
    ) -> BoxFuture<'static, Result<Value, RunError>> {
        (self.run)(payload, ctx)
    }

    pub fn manifest_entry(&self) -> TaskManifestEntry {
        TaskManifestEntry {
            id: self.id.clone(),
            max_duration: self.max_duration,
        }
    }
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("id", &self.id)
            .field("max_duration", &self.max_duration)
            .finish_non_exhaustive()
    }
}

/// Handle exportable que devuelve el registro; sirve para disparar la tarea
/// desde cualquier parte de la aplicación.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub id: TaskId,
    pub max_duration: u64,
}

impl TaskHandle {
    /// Encola un run de esta tarea en el engine externo.
    pub async fn trigger(
        &self,
        client: &TaskClient,
        payload: Value,
    ) -> Result<TriggerResponse, ClientError> {
        client.trigger(&self.id, payload).await
    }
}
