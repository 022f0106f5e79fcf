//! callq Runtime
//!
//! This crate embeds the Boa JavaScript engine and lets background threads
//! call script functions safely.
//!
//! - [`CallQueue`] - thread-safe FIFO of pending calls, drained on the engine
//!   thread
//! - [`ScriptHost`] - the engine-thread context, its host bindings and the
//!   `main`/`loop` run loop
//! - [`spawn_producer`] - a tokio task that feeds the queue on an interval

pub mod config;
pub mod producer;
pub mod runtime;

pub use config::{HostConfig, ProducerConfig};
pub use producer::spawn_producer;
pub use runtime::{
    forward_json, ArgumentSupplier, CallQueue, CallRecord, JsonArguments, ResultCallback,
    ScriptHost,
};
