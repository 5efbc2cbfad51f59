use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::RunError;
use crate::task::TaskId;
use crate::wire::{Checkpoint, RunMeta, WaitToken};

/// Contexto de una invocación. Lo crea el endpoint por cada request del engine
/// y se descarta cuando `run` termina.
///
/// Los clones comparten el mismo journal de checkpoints nuevos, así que la
/// función `run` puede moverlo a otras tareas async sin perder pasos.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub task_id: TaskId,
    pub run_id: String,
    pub attempt: u32,
    pub created_at: DateTime<Utc>,

    // checkpoints que el engine reenvió de intentos anteriores
    replayed: Arc<HashMap<String, Value>>,
    // checkpoints producidos en esta invocación
    journal: Arc<Mutex<Vec<Checkpoint>>>,
}

impl RunContext {
    pub fn new(task_id: impl Into<TaskId>, meta: RunMeta, checkpoints: Vec<Checkpoint>) -> Self {
        let replayed = checkpoints
            .into_iter()
            .map(|c| (c.key, c.output))
            .collect::<HashMap<_, _>>();

        Self {
            task_id: task_id.into(),
            run_id: meta.run_id,
            attempt: meta.attempt,
            created_at: meta.created_at,
            replayed: Arc::new(replayed),
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Ejecuta un paso idempotente identificado por `key`.
    ///
    /// Si el engine ya tiene el resultado de ese paso (intento anterior o
    /// reanudación después de una espera), se devuelve sin ejecutar `fut`.
    /// Si no, se ejecuta y el resultado queda en el journal.
    pub async fn step<T, Fut>(&self, key: &str, fut: Fut) -> Result<T, RunError>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = Result<T, RunError>>,
    {
        if let Some(output) = self.lookup(key) {
            debug!("run {}: paso {} ya completado, se reutiliza", self.run_id, key);
            return Ok(serde_json::from_value(output)?);
        }

        let value = fut.await?;
        let output = serde_json::to_value(&value)?;
        self.record(key, output);
        Ok(value)
    }

    /// Espera durable. La primera vez devuelve `RunError::Suspended` para que
    /// `run` corte con `?`; el engine vuelve a invocar pasado `duration` con el
    /// checkpoint de `key` y entonces la espera se considera cumplida.
    pub fn wait_for(&self, key: &str, duration: Duration) -> Result<(), RunError> {
        if self.lookup(key).is_some() {
            debug!("run {}: espera {} ya cumplida", self.run_id, key);
            return Ok(());
        }

        // redondeo hacia arriba: nunca reanudar antes de tiempo
        let seconds = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
        Err(RunError::Suspended(WaitToken {
            key: key.to_string(),
            seconds,
        }))
    }

    /// Checkpoints registrados durante esta invocación, en orden.
    pub fn new_checkpoints(&self) -> Vec<Checkpoint> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        if let Some(v) = self.replayed.get(key) {
            return Some(v.clone());
        }
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.output.clone())
    }

    fn record(&self, key: &str, output: Value) {
        let mut journal = self.journal.lock().unwrap_or_else(PoisonError::into_inner);
        journal.push(Checkpoint {
            key: key.to_string(),
            output,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn meta() -> RunMeta {
        RunMeta {
            run_id: "run_test".to_string(),
            attempt: 1,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn step_ejecuta_y_registra_checkpoint() {
        let ctx = RunContext::new("t", meta(), vec![]);

        let n: u32 = ctx.step("calc", async { Ok(41 + 1) }).await.unwrap();

        assert_eq!(n, 42);
        assert_eq!(
            ctx.new_checkpoints(),
            vec![Checkpoint { key: "calc".into(), output: json!(42) }]
        );
    }

    #[tokio::test]
    async fn step_reutiliza_checkpoint_reenviado_sin_ejecutar() {
        let calls = AtomicUsize::new(0);
        let ctx = RunContext::new(
            "t",
            meta(),
            vec![Checkpoint { key: "calc".into(), output: json!(7) }],
        );

        let n: u32 = ctx
            .step("calc", async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(99)
            })
            .await
            .unwrap();

        assert_eq!(n, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(ctx.new_checkpoints().is_empty());
    }

    #[tokio::test]
    async fn step_con_error_no_registra_nada() {
        let ctx = RunContext::new("t", meta(), vec![]);

        let res: Result<u32, _> = ctx.step("boom", async { Err(RunError::failed("x")) }).await;

        assert_eq!(res, Err(RunError::Failed("x".into())));
        assert!(ctx.new_checkpoints().is_empty());
    }

    #[tokio::test]
    async fn clones_comparten_el_journal() {
        let ctx = RunContext::new("t", meta(), vec![]);
        let other = ctx.clone();

        let _: String = other.step("a", async { Ok("x".to_string()) }).await.unwrap();

        assert_eq!(ctx.new_checkpoints().len(), 1);
    }

    #[test]
    fn wait_for_suspende_la_primera_vez() {
        let ctx = RunContext::new("t", meta(), vec![]);

        let err = ctx.wait_for("wait-5s", Duration::from_secs(5)).unwrap_err();

        assert_eq!(
            err,
            RunError::Suspended(WaitToken { key: "wait-5s".into(), seconds: 5 })
        );
    }

    #[test]
    fn wait_for_continua_cuando_el_engine_reanuda() {
        let ctx = RunContext::new(
            "t",
            meta(),
            vec![Checkpoint { key: "wait-5s".into(), output: Value::Null }],
        );

        assert!(ctx.wait_for("wait-5s", Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn wait_for_redondea_fracciones_de_segundo_hacia_arriba() {
        let ctx = RunContext::new("t", meta(), vec![]);
        let seconds = |d| match ctx.wait_for("w", d) {
            Err(RunError::Suspended(wait)) => wait.seconds,
            other => panic!("se esperaba suspensión: {other:?}"),
        };

        assert_eq!(seconds(Duration::from_millis(500)), 1);
        assert_eq!(seconds(Duration::from_millis(1500)), 2);
        assert_eq!(seconds(Duration::from_secs(3)), 3);
        assert_eq!(seconds(Duration::ZERO), 0);
    }
}
