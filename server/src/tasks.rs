use std::time::Duration;

use pokify_common::{run_fn, RunError, TaskConfig, TaskError, TaskHandle, TaskRegistry};
use serde_json::json;
use tracing::info;

pub const HELLO_WORLD_ID: &str = "hello-world";

/// Tarea de ejemplo: espera 5s (durable), loguea y devuelve un mensaje.
pub fn hello_world() -> TaskConfig {
    TaskConfig {
        id: HELLO_WORLD_ID.to_string(),
        max_duration: 300,
        run: run_fn(|payload, ctx| async move {
            ctx.wait_for("wait-5s", Duration::from_secs(5))?;
            info!(
                "hello-world (run {}, intento {}) payload={}",
                ctx.run_id, ctx.attempt, payload
            );
            Ok::<_, RunError>(json!({ "message": "Hello, world!" }))
        }),
    }
}

/// Registra todas las tareas de la aplicación.
pub fn register_all(registry: &mut TaskRegistry) -> Result<Vec<TaskHandle>, TaskError> {
    let handles = vec![registry.define(hello_world())?];
    Ok(handles)
}
