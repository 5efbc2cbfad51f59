use std::collections::HashMap;

use tracing::info;

use crate::error::TaskError;
use crate::task::{TaskConfig, TaskDefinition, TaskHandle};
use crate::wire::{Manifest, TaskManifestEntry};

/// Registro de tareas de un proceso, indexado por id.
///
/// Se arma al arrancar y después se comparte como `Arc<TaskRegistry>`
/// (solo lectura) con el endpoint.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, TaskDefinition>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra una tarea. Un id repetido se rechaza y el registro queda igual.
    pub fn define(&mut self, config: TaskConfig) -> Result<TaskHandle, TaskError> {
        if config.id.trim().is_empty() {
            return Err(TaskError::InvalidId(config.id));
        }
        if config.max_duration == 0 {
            return Err(TaskError::InvalidMaxDuration(config.id));
        }
        if self.tasks.contains_key(&config.id) {
            return Err(TaskError::DuplicateId(config.id));
        }

        let def = TaskDefinition::from_config(config);
        let handle = TaskHandle {
            id: def.id.clone(),
            max_duration: def.max_duration,
        };

        info!("tarea registrada: {} (max_duration={}s)", def.id, def.max_duration);
        self.tasks.insert(def.id.clone(), def);
        Ok(handle)
    }

    pub fn get(&self, id: &str) -> Option<&TaskDefinition> {
        self.tasks.get(id)
    }

    /// Ids ordenados
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tasks.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Documento que escanea el engine para conocer las tareas del proyecto.
    pub fn manifest(&self, project: &str) -> Manifest {
        let mut tasks: Vec<TaskManifestEntry> =
            self.tasks.values().map(|t| t.manifest_entry()).collect();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));

        Manifest {
            project: project.to_string(),
            runtime: "server".to_string(),
            tasks,
        }
    }
}
