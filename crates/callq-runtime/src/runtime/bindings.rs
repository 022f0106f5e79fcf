//! Host functions exposed to scripts
//!
//! # JavaScript API
//!
//! The following global functions are registered on every host context:
//!
//! - `print(...args)` - write the string arguments to stdout, then a newline
//! - `sleep(ms)` - block the engine thread for `ms` milliseconds
//! - `processCalls()` - drain the host's call queue right now
//! - `deferCall(name, ...args)` - queue a call to `name` for the next drain
//!
//! `deferCall` arguments travel as JSON, so `undefined` and functions reach
//! the callee as `null`. Cyclic values and non-finite numbers make
//! `deferCall` throw a `TypeError` and nothing is queued.
//!
//! `sleep` waits at most one hour per call.
//!
//! # Queue Access
//!
//! `processCalls` and `deferCall` capture the host's `Arc<CallQueue>`. The
//! queue holds no garbage-collected values (records only carry `Send`
//! recipes), so the capture is excluded from tracing.

use boa_engine::{
    js_string, native_function::NativeFunction, value::JsValue, Context, JsError, JsNativeError,
    JsResult,
};
use boa_gc::{Finalize, Trace};
use callq_common::{CallqError, Result};
use std::io::Write;
use std::sync::Arc;

use crate::config::capped_millis;
use crate::runtime::call_queue::{CallQueue, CallRecord};
use crate::runtime::conversions::js_value_to_json;
use crate::runtime::supplier::JsonArguments;

/// Queue handle captured by native functions.
#[derive(Trace, Finalize)]
struct QueueCapture {
    #[unsafe_ignore_trace]
    queue: Arc<CallQueue>,
}

/// Install all host bindings into `ctx`.
///
/// This is the single place where native functions are exposed to scripts.
///
/// # Errors
///
/// Returns `CallqError::JavaScriptExecution` if a global cannot be defined,
/// which only happens if the script already defined it as non-configurable.
pub(crate) fn install_host_bindings(ctx: &mut Context, queue: Arc<CallQueue>) -> Result<()> {
    ctx.register_global_builtin_callable(js_string!("print"), 0, NativeFunction::from_fn_ptr(print))
        .map_err(binding_error)?;

    ctx.register_global_builtin_callable(js_string!("sleep"), 1, NativeFunction::from_fn_ptr(sleep))
        .map_err(binding_error)?;

    ctx.register_global_builtin_callable(
        js_string!("processCalls"),
        0,
        NativeFunction::from_copy_closure_with_captures(
            |_this, _args, capture: &QueueCapture, context| {
                capture.queue.drain(context)?;
                Ok(JsValue::undefined())
            },
            QueueCapture {
                queue: Arc::clone(&queue),
            },
        ),
    )
    .map_err(binding_error)?;

    ctx.register_global_builtin_callable(
        js_string!("deferCall"),
        1,
        NativeFunction::from_copy_closure_with_captures(
            |_this, args, capture: &QueueCapture, context| {
                defer_call(&capture.queue, args, context)?;
                Ok(JsValue::undefined())
            },
            QueueCapture { queue },
        ),
    )
    .map_err(binding_error)?;

    Ok(())
}

fn binding_error(e: JsError) -> CallqError {
    CallqError::JavaScriptExecution(format!("Failed to install host binding: {}", e))
}

/// `print(...args)`: non-string arguments are skipped.
fn print(_this: &JsValue, args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    let mut line = String::new();
    for arg in args {
        if let Some(s) = arg.as_string() {
            line.push_str(&s.to_std_string_escaped());
        }
    }

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line)
        .map_err(|e| JsNativeError::error().with_message(format!("print failed: {}", e)))?;
    Ok(JsValue::undefined())
}

/// `sleep(ms)`: anything but a positive number is ignored.
fn sleep(_this: &JsValue, args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    if let Some(ms) = args.first().and_then(|v| v.as_number()) {
        if ms.is_finite() && ms >= 1.0 {
            std::thread::sleep(capped_millis(ms));
        }
    }
    Ok(JsValue::undefined())
}

/// `deferCall(name, ...args)`: the arguments are snapshotted as JSON now and
/// rebuilt when the call is drained.
fn defer_call(queue: &CallQueue, args: &[JsValue], context: &mut Context) -> JsResult<()> {
    let name = args
        .first()
        .and_then(|v| v.as_string())
        .map(|s| s.to_std_string_escaped())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            JsNativeError::typ().with_message("deferCall: first argument must be a function name")
        })?;

    let mut json_args = Vec::with_capacity(args.len().saturating_sub(1));
    for arg in args.iter().skip(1) {
        let json = js_value_to_json(arg.clone(), context).map_err(|e| {
            JsNativeError::typ().with_message(format!("deferCall: argument not transferable: {}", e))
        })?;
        json_args.push(json);
    }

    queue.append(CallRecord::new(name).with_arguments(JsonArguments::new(json_args)));
    Ok(())
}
