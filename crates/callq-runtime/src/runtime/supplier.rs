//! Deferred argument suppliers and result callbacks
//!
//! Engine values (`JsValue`) belong to the context that created them and are
//! `!Send`. A producer thread therefore cannot build the arguments of a call
//! itself. It hands over a *recipe* instead: an [`ArgumentSupplier`] that runs
//! on the engine thread during a drain and builds the values there.
//!
//! The `Send + 'static` bounds on both traits mean captured data is moved into
//! the call record at append time. A closure cannot smuggle a `JsValue` across
//! the boundary because it would no longer be `Send`.
//!
//! # Example
//!
//! ```ignore
//! use boa_engine::{js_string, JsValue};
//!
//! let label = String::from("tick");
//! let record = CallRecord::new("onTick")
//!     .with_arguments(move |_ctx: &mut Context| -> JsResult<Vec<JsValue>> {
//!         Ok(vec![JsValue::new(js_string!(label.as_str())), JsValue::new(1)])
//!     });
//! ```

use boa_engine::{value::JsValue, Context, JsError, JsNativeError, JsResult};
use serde_json::Value as JsonValue;
use tokio::sync::mpsc::UnboundedSender;

use crate::runtime::conversions::{js_value_to_json, json_to_js_value};

/// Builds the argument list of one call, on the engine thread.
///
/// Consumed on use: a supplier runs at most once. Returning an error aborts
/// the call and the drain pass it belongs to.
pub trait ArgumentSupplier: Send + 'static {
    fn supply(self: Box<Self>, context: &mut Context) -> JsResult<Vec<JsValue>>;
}

impl<F> ArgumentSupplier for F
where
    F: FnOnce(&mut Context) -> JsResult<Vec<JsValue>> + Send + 'static,
{
    fn supply(self: Box<Self>, context: &mut Context) -> JsResult<Vec<JsValue>> {
        (*self)(context)
    }
}

/// Receives the return value of one call, on the engine thread.
///
/// Returning an error aborts the drain pass like a throwing callee.
pub trait ResultCallback: Send + 'static {
    fn complete(self: Box<Self>, value: JsValue, context: &mut Context) -> JsResult<()>;
}

impl<F> ResultCallback for F
where
    F: FnOnce(JsValue, &mut Context) -> JsResult<()> + Send + 'static,
{
    fn complete(self: Box<Self>, value: JsValue, context: &mut Context) -> JsResult<()> {
        (*self)(value, context)
    }
}

/// Arguments carried as JSON and rebuilt as engine values on drain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonArguments(Vec<JsonValue>);

impl JsonArguments {
    pub fn new(args: Vec<JsonValue>) -> Self {
        Self(args)
    }
}

impl ArgumentSupplier for JsonArguments {
    fn supply(self: Box<Self>, context: &mut Context) -> JsResult<Vec<JsValue>> {
        self.0
            .into_iter()
            .map(|arg| {
                json_to_js_value(arg, context)
                    .map_err(|e| JsError::from(JsNativeError::typ().with_message(e.to_string())))
            })
            .collect()
    }
}

/// A callback that converts the return value to JSON and sends it to `tx`.
///
/// This is the hand-off a producer uses when it needs the result back on its
/// own thread. A closed receiver is not an error; the result is dropped.
pub fn forward_json(tx: UnboundedSender<JsonValue>) -> impl ResultCallback {
    move |value: JsValue, context: &mut Context| -> JsResult<()> {
        let json = js_value_to_json(value, context)
            .map_err(|e| JsNativeError::typ().with_message(e.to_string()))?;
        if tx.send(json).is_err() {
            tracing::warn!("Result receiver dropped, discarding call result");
        }
        Ok(())
    }
}
