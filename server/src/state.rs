// server/src/state.rs

use pokify_common::{TaskClient, TaskRegistry};
use std::sync::Arc;

/// Estado compartido por los handlers. Todo es de solo lectura después del
/// arranque, así que alcanza con `Arc` sin locks.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<TaskClient>,
    pub registry: Arc<TaskRegistry>,
}

impl AppState {
    pub fn new(client: TaskClient, registry: TaskRegistry) -> Self {
        Self {
            client: Arc::new(client),
            registry: Arc::new(registry),
        }
    }
}
