use boa_engine::{value::JsValue, Context, JsError, JsObject, JsString, Source};
use callq_common::{CallqError, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{capped_millis, HostConfig};
use crate::runtime::{bindings, call_queue::CallQueue};

const MAIN_ENTRY_POINT: &str = "main";
const LOOP_ENTRY_POINT: &str = "loop";
const SLEEP_INTERVAL_GLOBAL: &str = "sleepInterval";
const GC_AFTER_LOOP_GLOBAL: &str = "garbageCollectionAfterLoop";

/// Boa context with the host bindings installed, owned by the engine thread.
///
/// `ScriptHost` is `!Send` because Boa's `Context` is. Whoever creates it is
/// the engine thread, and only that thread can drain the call queue into it.
/// Producers get a clone of [`ScriptHost::queue`] instead.
pub struct ScriptHost {
    ctx: Context,
    queue: Arc<CallQueue>,
    config: HostConfig,
}

impl ScriptHost {
    /// Create a context wired to `queue`.
    pub fn new(queue: Arc<CallQueue>, config: HostConfig) -> Result<Self> {
        config.validate()?;

        let mut ctx = Context::default();
        bindings::install_host_bindings(&mut ctx, Arc::clone(&queue))?;

        Ok(Self { ctx, queue, config })
    }

    /// Read `path` and evaluate it as a script.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let script = std::fs::read_to_string(path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("Failed to load script {}: {}", path.display(), e))
        })?;

        tracing::info!("Evaluating script {}", path.display());
        self.eval(&script)?;
        Ok(())
    }

    /// Evaluate `source` in the global scope.
    pub fn eval(&mut self, source: &str) -> Result<JsValue> {
        self.ctx
            .eval(Source::from_bytes(source))
            .map_err(|e| CallqError::ScriptEvaluation(e.to_string()))
    }

    /// The queue producers append to.
    pub fn queue(&self) -> &Arc<CallQueue> {
        &self.queue
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    /// Run every pending call now. Returns how many callees ran.
    pub fn drain(&mut self) -> Result<usize> {
        self.queue.drain(&mut self.ctx).map_err(execution_error)
    }

    /// Verify that the script defines `main` and `loop` as functions.
    pub fn check(&mut self) -> Result<()> {
        self.entry_points().map(|_| ())
    }

    /// Call `main()` once, then iterate until `loop()` returns a falsy value.
    ///
    /// Each iteration drains the call queue before calling `loop()`, then
    /// optionally forces a garbage collection (`garbageCollectionAfterLoop`)
    /// and sleeps (`sleepInterval`, or the configured default).
    ///
    /// Returns the number of completed iterations.
    ///
    /// # Errors
    ///
    /// `CallqError::MissingEntryPoint` if `main` or `loop` is not a function;
    /// `CallqError::JavaScriptExecution` for any exception, including one
    /// raised by a drained call.
    pub fn run(&mut self) -> Result<u64> {
        let (main_fn, loop_fn) = self.entry_points()?;
        let this = JsValue::from(self.ctx.global_object());

        tracing::info!("Calling {}()", MAIN_ENTRY_POINT);
        main_fn
            .call(&this, &[], &mut self.ctx)
            .map_err(execution_error)?;

        let mut iterations = 0;
        loop {
            self.drain()?;

            let keep_going = loop_fn
                .call(&this, &[], &mut self.ctx)
                .map_err(execution_error)?
                .to_boolean();
            iterations += 1;

            if !keep_going {
                tracing::info!(iterations, "{}() returned false, stopping", LOOP_ENTRY_POINT);
                break;
            }

            if self.config.max_iterations.is_some_and(|max| iterations >= max) {
                tracing::info!(iterations, "Iteration limit reached, stopping");
                break;
            }

            if self.global(GC_AFTER_LOOP_GLOBAL)?.as_boolean() == Some(true) {
                boa_gc::force_collect();
            }

            let pause = self.sleep_interval()?;
            if !pause.is_zero() {
                std::thread::sleep(pause);
            }
        }

        Ok(iterations)
    }

    fn entry_points(&mut self) -> Result<(JsObject, JsObject)> {
        let main_fn = self.global(MAIN_ENTRY_POINT)?.as_callable().map(|f| f.clone());
        let loop_fn = self.global(LOOP_ENTRY_POINT)?.as_callable().map(|f| f.clone());

        match (main_fn, loop_fn) {
            (Some(main_fn), Some(loop_fn)) => Ok((main_fn, loop_fn)),
            _ => Err(CallqError::MissingEntryPoint(format!(
                "{} or {} not found!",
                MAIN_ENTRY_POINT, LOOP_ENTRY_POINT
            ))),
        }
    }

    fn sleep_interval(&mut self) -> Result<Duration> {
        match self.global(SLEEP_INTERVAL_GLOBAL)?.as_number() {
            Some(ms) if ms.is_finite() && ms > 0.0 => Ok(capped_millis(ms)),
            Some(_) => Ok(Duration::ZERO),
            None => Ok(self.config.default_sleep),
        }
    }

    fn global(&mut self, name: &str) -> Result<JsValue> {
        self.ctx
            .global_object()
            .get(JsString::from(name), &mut self.ctx)
            .map_err(execution_error)
    }
}

fn execution_error(e: JsError) -> CallqError {
    CallqError::JavaScriptExecution(e.to_string())
}
