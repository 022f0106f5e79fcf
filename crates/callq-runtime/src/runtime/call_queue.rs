//! Cross-thread call queue
//!
//! Boa's `Context` is single-threaded. Background threads that want to run a
//! script function append a [`CallRecord`] here instead; the engine thread
//! executes every pending record when it reaches a drain point.
//!
//! # Execution Model
//!
//! - `append` may be called from any thread at any time, including while a
//!   drain is running. It only holds the lock for one push.
//! - `drain` must run on the engine thread. It pops one record at a time and
//!   releases the lock before executing it, so producers never wait on script
//!   code. Records appended during a drain are picked up by the same drain.
//!
//! # Failure Semantics
//!
//! - A callee that is missing from the global scope, not callable, or whose
//!   lookup throws is skipped and the drain continues.
//! - An exception from a supplier, a callee or a callback ends the drain and
//!   is returned to the caller. The failing record is consumed; records still
//!   queued stay queued for the next drain.

use boa_engine::{value::JsValue, Context, JsObject, JsResult, JsString};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::runtime::supplier::{ArgumentSupplier, ResultCallback};

/// One deferred call: a global function name, an optional argument recipe
/// and an optional consumer of the return value.
///
/// Fields are private; a record cannot change once built.
pub struct CallRecord {
    name: String,
    arguments: Option<Box<dyn ArgumentSupplier>>,
    callback: Option<Box<dyn ResultCallback>>,
}

impl CallRecord {
    /// Create a record that calls `name` with no arguments and discards the
    /// result.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        debug_assert!(!name.is_empty(), "callee name must not be empty");
        Self {
            name,
            arguments: None,
            callback: None,
        }
    }

    /// Build the arguments with `supplier` when the call executes.
    pub fn with_arguments(mut self, supplier: impl ArgumentSupplier) -> Self {
        self.arguments = Some(Box::new(supplier));
        self
    }

    /// Hand the callee's return value to `callback` after the call.
    pub fn with_callback(mut self, callback: impl ResultCallback) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallRecord")
            .field("name", &self.name)
            .field("arguments", &self.arguments.is_some())
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// FIFO of pending calls shared between producer threads and the engine
/// thread.
///
/// Share it as `Arc<CallQueue>`. There is no capacity limit and no way to
/// wait for a call to finish; producers that need a result send it back
/// themselves from a [`ResultCallback`].
#[derive(Default)]
pub struct CallQueue {
    records: Mutex<VecDeque<CallRecord>>,
}

impl CallQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `record` at the tail. Never blocks on engine work.
    pub fn append(&self, record: CallRecord) {
        tracing::trace!(callee = %record.name, "Queueing call");
        self.lock().push_back(record);
    }

    /// Number of records waiting for the next drain.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Execute every pending call against the global scope of `context`.
    ///
    /// Returns the number of callees that were invoked. Skipped records
    /// (unresolved names) are not counted.
    ///
    /// # Errors
    ///
    /// Returns the first exception raised by a supplier, callee or callback.
    /// Records behind the failing one remain queued.
    pub fn drain(&self, context: &mut Context) -> JsResult<usize> {
        let mut executed = 0;

        while let Some(record) = self.pop_front() {
            let global = context.global_object();
            let Some(function) = resolve_callee(&global, &record.name, context) else {
                tracing::trace!(callee = %record.name, "Callee not found in global scope, skipping");
                continue;
            };

            let args = match record.arguments {
                Some(supplier) => supplier.supply(context)?,
                None => Vec::new(),
            };

            tracing::trace!(callee = %record.name, argc = args.len(), "Executing queued call");
            let result = function.call(&JsValue::from(global), &args, context)?;
            executed += 1;

            if let Some(callback) = record.callback {
                callback.complete(result, context)?;
            }
        }

        if executed > 0 {
            tracing::debug!(executed, "Drained call queue");
        }
        Ok(executed)
    }

    fn pop_front(&self) -> Option<CallRecord> {
        self.lock().pop_front()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<CallRecord>> {
        // A panic while holding the lock cannot leave the deque half-updated,
        // so a poisoned lock is still usable.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CallQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallQueue").field("pending", &self.len()).finish()
    }
}

/// Look `name` up on the global object and return it if it is callable.
///
/// A throwing getter counts as "not found".
fn resolve_callee(global: &JsObject, name: &str, context: &mut Context) -> Option<JsObject> {
    let value = global.get(JsString::from(name), context).ok()?;
    value.as_callable().map(|f| f.clone())
}
