//! Background producer
//!
//! A tokio task that appends a call for the engine thread on a fixed
//! interval, forever. It only talks to the [`CallQueue`]; the engine thread
//! runs the calls whenever it drains.

use boa_engine::{
    js_string, object::ObjectInitializer, property::Attribute, value::JsValue, Context, JsResult,
};
use callq_common::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::ProducerConfig;
use crate::runtime::{CallQueue, CallRecord};

/// Start the producer on the current tokio runtime.
///
/// The first call is appended immediately, then one per interval. Abort the
/// returned handle to stop it.
///
/// # Errors
///
/// Returns `CallqError::InvalidConfig` if `config` does not validate.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn spawn_producer(queue: Arc<CallQueue>, config: ProducerConfig) -> Result<JoinHandle<()>> {
    config.validate()?;
    tracing::info!(
        callee = %config.callee,
        interval_ms = config.interval.as_millis() as u64,
        "Starting background producer"
    );

    Ok(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            queue.append(CallRecord::new(config.callee.as_str()).with_arguments(demo_arguments));
        }
    }))
}

/// Arguments of every producer call: `5`, `"Hallo welt"` and
/// `{ member: 10 }`, built on the engine thread.
pub fn demo_arguments(context: &mut Context) -> JsResult<Vec<JsValue>> {
    let object = ObjectInitializer::new(context)
        .property(js_string!("member"), 10, Attribute::all())
        .build();

    Ok(vec![
        JsValue::new(5),
        JsValue::new(js_string!("Hallo welt")),
        object.into(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::conversions::js_value_to_json;
    use boa_engine::Source;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_demo_arguments_shape() {
        let mut ctx = Context::default();
        let args = demo_arguments(&mut ctx).unwrap();
        assert_eq!(args.len(), 3);

        let json: Vec<_> = args
            .into_iter()
            .map(|arg| js_value_to_json(arg, &mut ctx).unwrap())
            .collect();
        assert_eq!(json, vec![json!(5), json!("Hallo welt"), json!({"member": 10})]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_producer_appends_on_interval() {
        let queue = Arc::new(CallQueue::new());
        let handle = spawn_producer(
            Arc::clone(&queue),
            ProducerConfig::new("test").with_interval(Duration::from_millis(10)),
        )
        .unwrap();

        // Paused clock: the sleep auto-advances through the ticks at 0, 10,
        // 20 and 30ms, polling the producer at each one.
        tokio::time::sleep(Duration::from_millis(35)).await;
        handle.abort();

        assert_eq!(queue.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_producer_calls_reach_script() {
        let queue = Arc::new(CallQueue::new());
        let handle = spawn_producer(
            Arc::clone(&queue),
            ProducerConfig::new("test").with_interval(Duration::from_millis(10)),
        )
        .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        handle.abort();

        let mut ctx = Context::default();
        ctx.eval(Source::from_bytes(
            "var got = []; function test(n, s, o) { got.push(n + '|' + s + '|' + o.member); }",
        ))
        .unwrap();

        let executed = queue.drain(&mut ctx).unwrap();
        assert!(executed >= 1);
        let first = ctx.eval(Source::from_bytes("got[0]")).unwrap();
        assert_eq!(
            first.to_string(&mut ctx).unwrap().to_std_string_escaped(),
            "5|Hallo welt|10"
        );
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let queue = Arc::new(CallQueue::new());
        let result = spawn_producer(queue, ProducerConfig::new("test").with_interval(Duration::ZERO));
        assert!(result.is_err());
    }
}
