use std::{env, fmt};

use pokify_common::client::{redact, DEFAULT_API_URL};
use pokify_common::ClientConfig;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_PROJECT_ID: &str = "pokify";

/// Configuración del proceso, leída una sola vez de variables de entorno.
#[derive(Clone)]
pub struct Config {
    pub bind_addr: String,
    pub project_id: String,
    /// Vacía si TRIGGER_API_KEY no está definida
    pub api_key: String,
    pub api_url: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("project_id", &self.project_id)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", DEFAULT_BIND_ADDR),
            project_id: env_or("TRIGGER_PROJECT_ID", DEFAULT_PROJECT_ID),
            api_key: env::var("TRIGGER_API_KEY").unwrap_or_default(),
            api_url: env_or("TRIGGER_API_URL", DEFAULT_API_URL),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            id: self.project_id.clone(),
            api_key: self.api_key.clone(),
            api_url: self.api_url.clone(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pokify_common::TaskClient;

    #[test]
    fn env_or_usa_default_si_falta_o_esta_vacia() {
        env::remove_var("POKIFY_TEST_FALTA");
        env::set_var("POKIFY_TEST_VACIA", "  ");
        env::set_var("POKIFY_TEST_OK", "127.0.0.1:9000");

        assert_eq!(env_or("POKIFY_TEST_FALTA", "x"), "x");
        assert_eq!(env_or("POKIFY_TEST_VACIA", "x"), "x");
        assert_eq!(env_or("POKIFY_TEST_OK", "x"), "127.0.0.1:9000");
    }

    #[test]
    fn client_config_copia_identidad_y_credencial() {
        let cfg = Config {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            project_id: "pokify".into(),
            api_key: "".into(),
            api_url: DEFAULT_API_URL.into(),
        };

        let cc = cfg.client_config();

        assert_eq!(cc.id, "pokify");
        assert_eq!(cc.api_key, "");
        assert_eq!(cc.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn sin_trigger_api_key_la_credencial_queda_vacia() {
        env::remove_var("TRIGGER_API_KEY");

        let cfg = Config::from_env();

        assert_eq!(cfg.api_key, "");
        assert!(!TaskClient::new(cfg.client_config()).has_credential());
        assert!(!TaskClient::from_env("pokify").has_credential());
    }

    #[test]
    fn debug_oculta_la_api_key() {
        let cfg = Config {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            project_id: "pokify".into(),
            api_key: "tr_prod_secreta".into(),
            api_url: DEFAULT_API_URL.into(),
        };

        let out = format!("{:?}", cfg);

        assert!(!out.contains("tr_prod_secreta"), "{out}");
        assert!(out.contains("api_key: \"<oculta>\""));
        assert!(out.contains("project_id: \"pokify\""));
    }
}
