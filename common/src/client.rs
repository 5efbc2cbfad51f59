use std::{env, fmt};

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::Value;
use sha2::Sha256;
use tracing::{info, warn};

use crate::error::{AuthError, ClientError};
use crate::wire::{TriggerRequest, TriggerResponse};

pub const DEFAULT_API_URL: &str = "https://api.trigger.dev";

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct ClientConfig {
    /// Identidad de la aplicación frente al engine
    pub id: String,
    pub api_key: String,
    pub api_url: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("id", &self.id)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Oculta una credencial para logs; solo dice si está vacía.
pub fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<vacía>"
    } else {
        "<oculta>"
    }
}

/// Identidad + credencial del proceso frente al engine externo.
///
/// Se construye una vez al arrancar y se comparte por referencia; nunca se
/// modifica.
#[derive(Clone)]
pub struct TaskClient {
    id: String,
    api_key: String,
    api_url: String,
    http: Client,
}

impl fmt::Debug for TaskClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskClient")
            .field("id", &self.id)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl TaskClient {
    pub fn new(config: ClientConfig) -> Self {
        if config.api_key.is_empty() {
            warn!(
                "cliente {} sin api key: todos los requests van a ser rechazados",
                config.id
            );
        }
        Self {
            id: config.id,
            api_key: config.api_key,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Lee TRIGGER_API_KEY (vacía si no existe) y TRIGGER_API_URL.
    pub fn from_env(id: impl Into<String>) -> Self {
        Self::new(ClientConfig {
            id: id.into(),
            api_key: env::var("TRIGGER_API_KEY").unwrap_or_default(),
            api_url: env::var("TRIGGER_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC acepta claves de cualquier largo, incluida la vacía
        HmacSha256::new_from_slice(self.api_key.as_bytes())
            .expect("HMAC acepta claves de cualquier largo")
    }

    /// Firma un body: `sha256=<hex(HMAC-SHA256(api_key, body))>`.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    /// Verifica la firma de un request entrante contra la credencial del cliente.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), AuthError> {
        if !self.has_credential() {
            return Err(AuthError::MissingCredential);
        }
        let signature = signature.ok_or(AuthError::MissingSignature)?;
        let tag = signature
            .trim()
            .strip_prefix("sha256=")
            .and_then(|h| hex::decode(h).ok())
            .ok_or(AuthError::InvalidSignature)?;

        let mut mac = self.mac();
        mac.update(body);
        mac.verify_slice(&tag).map_err(|_| AuthError::InvalidSignature)
    }

    /// Pide al engine que encole un run de `task_id`. Sin reintentos: la
    /// credencial se valida del lado del engine.
    pub async fn trigger(
        &self,
        task_id: &str,
        payload: Value,
    ) -> Result<TriggerResponse, ClientError> {
        let url = format!("{}/api/v1/tasks/{}/trigger", self.api_url, task_id);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&TriggerRequest { payload })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("engine devolvió {} al disparar {}", status, task_id);
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let run: TriggerResponse = resp.json().await?;
        info!("tarea {} disparada, run {}", task_id, run.id);
        Ok(run)
    }
}
