pub mod client;
pub mod context;
pub mod error;
pub mod registry;
pub mod task;
pub mod wire;

pub use client::{ClientConfig, TaskClient};
pub use context::RunContext;
pub use error::{AuthError, ClientError, RunError, TaskError};
pub use registry::TaskRegistry;
pub use task::{run_fn, RunFn, TaskConfig, TaskDefinition, TaskHandle, TaskId};
pub use wire::{
    Checkpoint, InvokeRequest, InvokeResponse, Manifest, RunMeta, TaskManifestEntry,
    TriggerRequest, TriggerResponse, WaitToken, SIGNATURE_HEADER,
};
