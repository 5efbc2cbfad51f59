use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pokify_common::TaskClient;
use serde_json::Value;
use std::env;

use crate::runner::{Endpoint, DEFAULT_MAX_ATTEMPTS};

/// - En Docker: POKIFY_ENDPOINT_URL=http://server:8080/api/trigger
/// - Local: default http://localhost:8080/api/trigger
fn endpoint_url() -> String {
    env::var("POKIFY_ENDPOINT_URL")
        .unwrap_or_else(|_| "http://localhost:8080/api/trigger".to_string())
}

fn project_id() -> String {
    env::var("TRIGGER_PROJECT_ID").unwrap_or_else(|_| "pokify".to_string())
}

#[derive(Parser)]
#[command(name = "pokify")]
#[command(about = "CLI para listar, probar y disparar tareas en segundo plano")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lista las tareas que expone el endpoint
    Tasks,

    /// Ejecuta una tarea contra el endpoint local, haciendo de engine
    Invoke {
        #[arg(value_name = "TASK_ID")]
        task_id: String,

        /// Payload JSON
        #[arg(long, default_value = "{}")]
        payload: String,

        /// Intentos máximos ante fallos
        #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
        max_attempts: u32,
    },

    /// Encola un run en el engine externo
    Trigger {
        #[arg(value_name = "TASK_ID")]
        task_id: String,

        /// Payload JSON
        #[arg(long, default_value = "{}")]
        payload: String,
    },
}

fn parse_payload(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("payload no es JSON válido: {raw}"))
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = TaskClient::from_env(project_id());

    match cli.command {
        Commands::Tasks => {
            let endpoint = Endpoint::new(endpoint_url(), client);
            let manifest = endpoint.manifest().await?;

            println!("Proyecto {} (runtime {}):", manifest.project, manifest.runtime);
            if manifest.tasks.is_empty() {
                println!("  (sin tareas registradas)");
            }
            for t in manifest.tasks {
                println!("  - {:<24} max_duration={}s", t.id, t.max_duration);
            }
        }

        Commands::Invoke {
            task_id,
            payload,
            max_attempts,
        } => {
            let payload = parse_payload(&payload)?;
            let endpoint = Endpoint::new(endpoint_url(), client);

            let output = endpoint
                .run_to_completion(&task_id, payload, max_attempts.max(1))
                .await?;

            println!("Resultado de {}:", task_id);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Trigger { task_id, payload } => {
            let payload = parse_payload(&payload)?;
            let run = client.trigger(&task_id, payload).await?;

            println!("Run creado:");
            println!("  tarea: {}", task_id);
            println!("  id: {}", run.id);
            println!("  engine: {}", client.api_url());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_es_valida() {
        Cli::command().debug_assert();
    }

    #[test]
    fn invoke_usa_defaults() {
        let cli = Cli::try_parse_from(["pokify", "invoke", "hello-world"]).unwrap();

        match cli.command {
            Commands::Invoke { task_id, payload, max_attempts } => {
                assert_eq!(task_id, "hello-world");
                assert_eq!(payload, "{}");
                assert_eq!(max_attempts, DEFAULT_MAX_ATTEMPTS);
            }
            _ => panic!("se esperaba invoke"),
        }
    }

    #[test]
    fn parse_payload_rechaza_json_invalido() {
        assert!(parse_payload("{\"a\": 1}").is_ok());
        assert!(parse_payload("no es json").is_err());
    }
}
