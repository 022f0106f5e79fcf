//! JSON <-> JavaScript value conversions
//!
//! `serde_json::Value` is the thread-agnostic form used to carry call
//! arguments and results across the engine thread boundary. Boa's `JsValue`
//! is tied to the context that created it, so conversion in either direction
//! must happen on the engine thread.
//!
//! # Type Mapping
//!
//! | JSON Type | JavaScript Type |
//! |-----------|-----------------|
//! | null | null |
//! | boolean | Boolean |
//! | number | Number |
//! | string | String |
//! | array | Array |
//! | object | Object |
//!
//! `undefined`, functions and symbols convert to JSON null. Symbol keys are
//! skipped. Cyclic values and values nested deeper than [`MAX_DEPTH`] are
//! rejected.

use boa_engine::{
    object::{builtins::JsArray, JsObject},
    property::PropertyKey,
    value::JsValue,
    Context, JsString,
};
use callq_common::{CallqError, Result};
use serde_json::Value as JsonValue;

/// Deepest array/object nesting `js_value_to_json` accepts.
pub const MAX_DEPTH: usize = 128;

/// Convert a `serde_json::Value` into a value owned by `ctx`.
///
/// # Errors
///
/// Returns `CallqError::Conversion` if a number is not representable, or
/// `CallqError::JavaScriptExecution` if building an array or object fails.
pub fn json_to_js_value(json: JsonValue, ctx: &mut Context) -> Result<JsValue> {
    match json {
        JsonValue::Null => Ok(JsValue::null()),
        JsonValue::Bool(b) => Ok(JsValue::new(b)),
        JsonValue::Number(n) => n
            .as_f64()
            .map(JsValue::new)
            .ok_or_else(|| CallqError::Conversion(format!("Number out of range: {}", n))),
        JsonValue::String(s) => Ok(JsValue::new(JsString::from(s.as_str()))),
        JsonValue::Array(arr) => {
            let js_array = JsArray::new(ctx);
            for (i, v) in arr.into_iter().enumerate() {
                let js_value = json_to_js_value(v, ctx)?;
                js_array.push(js_value, ctx).map_err(|e| {
                    CallqError::JavaScriptExecution(format!(
                        "Failed to push array element {}: {}",
                        i, e
                    ))
                })?;
            }
            Ok(js_array.into())
        }
        JsonValue::Object(obj) => {
            let js_obj = JsObject::with_object_proto(ctx.intrinsics());
            for (key, value) in obj {
                let js_value = json_to_js_value(value, ctx)?;
                js_obj
                    .create_data_property_or_throw(JsString::from(key.as_str()), js_value, ctx)
                    .map_err(|e| {
                        CallqError::JavaScriptExecution(format!(
                            "Failed to set property '{}': {}",
                            key, e
                        ))
                    })?;
            }
            Ok(js_obj.into())
        }
    }
}

/// Convert a value of `ctx` into a `serde_json::Value` that may leave the
/// engine thread.
///
/// Integral numbers are emitted as JSON integers so that `5` round-trips as
/// `5` rather than `5.0`.
///
/// # Errors
///
/// Returns `CallqError::Conversion` for non-finite numbers, strings that are
/// not valid UTF-16, array lengths that overflow `usize`, cyclic values and
/// nesting deeper than [`MAX_DEPTH`], and `CallqError::JavaScriptExecution`
/// if a property getter throws.
pub fn js_value_to_json(value: JsValue, ctx: &mut Context) -> Result<JsonValue> {
    let mut ancestors = Vec::new();
    to_json(value, ctx, &mut ancestors)
}

/// `ancestors` holds the objects currently being converted, outermost first.
fn to_json(value: JsValue, ctx: &mut Context, ancestors: &mut Vec<JsObject>) -> Result<JsonValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(JsonValue::Null);
    }

    if let Some(b) = value.as_boolean() {
        return Ok(JsonValue::Bool(b));
    }

    if let Some(i) = value.as_i32() {
        return Ok(JsonValue::Number(i.into()));
    }

    if let Some(n) = value.as_number() {
        if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
            return Ok(JsonValue::Number((n as i64).into()));
        }
        return serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .ok_or_else(|| CallqError::Conversion(format!("Invalid float: {}", n)));
    }

    if let Some(s) = value.as_string() {
        return s
            .to_std_string()
            .map(JsonValue::String)
            .map_err(|e| CallqError::Conversion(format!("String conversion error: {:?}", e)));
    }

    if value.is_callable() {
        return Ok(JsonValue::Null);
    }

    if let Some(obj) = value.as_object() {
        let obj: JsObject = obj.clone();
        if ancestors.iter().any(|seen| JsObject::equals(seen, &obj)) {
            return Err(CallqError::Conversion("cyclic value".into()));
        }
        if ancestors.len() >= MAX_DEPTH {
            return Err(CallqError::Conversion(format!(
                "value nested deeper than {} levels",
                MAX_DEPTH
            )));
        }

        ancestors.push(obj.clone());
        let result = object_to_json(&obj, ctx, ancestors);
        ancestors.pop();
        return result;
    }

    // Symbols and bigints have no JSON form.
    Ok(JsonValue::Null)
}

fn object_to_json(
    obj: &JsObject,
    ctx: &mut Context,
    ancestors: &mut Vec<JsObject>,
) -> Result<JsonValue> {
    if obj.is_array() {
        let array = JsArray::from_object(obj.clone()).map_err(|e| {
            CallqError::Conversion(format!("Object is not a valid array: {}", e))
        })?;

        let length: usize = array
            .length(ctx)
            .map_err(|e| {
                CallqError::JavaScriptExecution(format!("Failed to get array length: {}", e))
            })?
            .try_into()
            .map_err(|_| CallqError::Conversion("Array length overflow".into()))?;

        let mut result = Vec::with_capacity(length);
        for i in 0..length {
            let elem = array.get(i, ctx).map_err(|e| {
                CallqError::JavaScriptExecution(format!(
                    "Failed to get array element {}: {}",
                    i, e
                ))
            })?;
            result.push(to_json(elem, ctx, ancestors)?);
        }
        return Ok(JsonValue::Array(result));
    }

    let keys = obj.own_property_keys(ctx).map_err(|e| {
        CallqError::JavaScriptExecution(format!("Failed to get object keys: {}", e))
    })?;

    let mut result = serde_json::Map::new();
    for key in keys {
        let key_str = match &key {
            PropertyKey::String(s) => s.to_std_string().map_err(|e| {
                CallqError::Conversion(format!("String conversion error: {:?}", e))
            })?,
            PropertyKey::Index(i) => i.get().to_string(),
            PropertyKey::Symbol(_) => continue,
        };

        let prop_value = obj.get(key.clone(), ctx).map_err(|e| {
            CallqError::JavaScriptExecution(format!(
                "Failed to get property '{}': {}",
                key_str, e
            ))
        })?;
        result.insert(key_str, to_json(prop_value, ctx, ancestors)?);
    }

    Ok(JsonValue::Object(result))
}
