use thiserror::Error;

use crate::wire::WaitToken;

/// Errores al registrar una definición de tarea.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("id de tarea inválido: {0:?}")]
    InvalidId(String),

    #[error("max_duration debe ser > 0 (tarea {0})")]
    InvalidMaxDuration(String),

    #[error("ya existe una tarea registrada con id {0}")]
    DuplicateId(String),
}

/// Resultado de una función `run` que no terminó con un valor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunError {
    /// La tarea pidió una espera durable; el engine externo la reanuda.
    #[error("ejecución suspendida en {} ({}s)", .0.key, .0.seconds)]
    Suspended(WaitToken),

    #[error("{0}")]
    Failed(String),
}

impl RunError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

impl From<serde_json::Error> for RunError {
    fn from(e: serde_json::Error) -> Self {
        Self::Failed(format!("error de serialización: {e}"))
    }
}

/// Fallos de autenticación de requests entrantes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("el cliente no tiene credencial configurada")]
    MissingCredential,

    #[error("falta la firma del request")]
    MissingSignature,

    #[error("firma inválida")]
    InvalidSignature,
}

/// Errores del cliente al hablar con el engine externo.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("error HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("el engine rechazó el request (status {status}): {body}")]
    Rejected { status: u16, body: String },
}
