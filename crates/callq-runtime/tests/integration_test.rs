// Integration tests for callq-runtime
//
// These tests drive a real ScriptHost from the engine thread while several
// producer threads append to the shared queue.

use callq_runtime::{forward_json, CallQueue, CallRecord, HostConfig, JsonArguments, ScriptHost};
use serde_json::json;
use std::collections::HashSet;
use std::io::Write;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

/// Create a temporary test script with the given content
fn create_test_script(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create test script");
    file.write_all(content.as_bytes())
        .expect("Failed to write test script");
    file
}

fn host_with_script(queue: Arc<CallQueue>, script: &str) -> ScriptHost {
    let file = create_test_script(script);
    let mut host = ScriptHost::new(queue, HostConfig::new().with_default_sleep(Duration::ZERO))
        .expect("Failed to create host");
    host.load_file(file.path()).expect("Failed to load script");
    host
}

const RECORDER_SCRIPT: &str = r#"
    var seen = {};
    var total = 0;
    function record(producer, seq) {
        var key = producer + ":" + seq;
        seen[key] = (seen[key] || 0) + 1;
        total++;
        return key;
    }
"#;

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_concurrent_producers_no_lost_or_duplicated_calls() {
    const PRODUCERS: usize = 8;
    const CALLS_PER_PRODUCER: usize = 250;

    let queue = Arc::new(CallQueue::new());
    let mut host = host_with_script(Arc::clone(&queue), RECORDER_SCRIPT);
    let results = Arc::new(Mutex::new(Vec::new()));
    let barrier = Arc::new(Barrier::new(PRODUCERS));

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let queue = Arc::clone(&queue);
            let results = Arc::clone(&results);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for seq in 0..CALLS_PER_PRODUCER {
                    let results = Arc::clone(&results);
                    queue.append(
                        CallRecord::new("record")
                            .with_arguments(JsonArguments::new(vec![json!(producer), json!(seq)]))
                            .with_callback(
                                move |value: boa_engine::JsValue,
                                      ctx: &mut boa_engine::Context|
                                      -> boa_engine::JsResult<()> {
                                    let key = value.to_string(ctx)?.to_std_string_escaped();
                                    results.lock().unwrap().push(key);
                                    Ok(())
                                },
                            ),
                    );
                }
            })
        })
        .collect();

    // Drain while the producers are still appending.
    let mut executed = 0;
    while handles.iter().any(|h| !h.is_finished()) {
        executed += host.drain().unwrap();
        thread::yield_now();
    }
    for handle in handles {
        handle.join().unwrap();
    }
    executed += host.drain().unwrap();

    let expected = PRODUCERS * CALLS_PER_PRODUCER;
    assert_eq!(executed, expected);
    assert!(queue.is_empty());

    let results = results.lock().unwrap();
    assert_eq!(results.len(), expected);
    let unique: HashSet<_> = results.iter().collect();
    assert_eq!(unique.len(), expected, "a call ran more than once");

    let total = host.eval("total").unwrap();
    assert_eq!(total.as_number(), Some(expected as f64));
    let duplicates = host
        .eval("Object.keys(seen).filter(function (k) { return seen[k] !== 1; }).length")
        .unwrap();
    assert_eq!(duplicates.as_number(), Some(0.0));
}

#[test]
fn test_per_producer_order_is_preserved() {
    let queue = Arc::new(CallQueue::new());
    let mut host = host_with_script(
        Arc::clone(&queue),
        r#"
        var lastSeq = {};
        var outOfOrder = 0;
        function ordered(producer, seq) {
            if (lastSeq[producer] !== undefined && lastSeq[producer] >= seq) { outOfOrder++; }
            lastSeq[producer] = seq;
        }
        "#,
    );

    let handles: Vec<_> = (0..4)
        .map(|producer| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for seq in 0..200 {
                    queue.append(
                        CallRecord::new("ordered")
                            .with_arguments(JsonArguments::new(vec![json!(producer), json!(seq)])),
                    );
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(host.drain().unwrap(), 800);
    let out_of_order = host.eval("outOfOrder").unwrap();
    assert_eq!(out_of_order.as_number(), Some(0.0));
}

#[test]
fn test_results_flow_back_to_producer_thread() {
    let queue = Arc::new(CallQueue::new());
    let mut host = host_with_script(
        Arc::clone(&queue),
        "function describe(o) { return { doubled: o.member * 2, tag: 'ok' }; }",
    );

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            queue.append(
                CallRecord::new("describe")
                    .with_arguments(JsonArguments::new(vec![json!({"member": 10})]))
                    .with_callback(forward_json(tx)),
            );
        })
    };
    producer.join().unwrap();

    host.drain().unwrap();
    assert_eq!(rx.try_recv().unwrap(), json!({"doubled": 20, "tag": "ok"}));
}

#[test]
fn test_append_during_drain_from_other_thread_is_not_lost() {
    let queue = Arc::new(CallQueue::new());
    let mut host = host_with_script(
        Arc::clone(&queue),
        "var hits = 0; function slow() { sleep(5); hits++; } function fast() { hits++; }",
    );
    for _ in 0..5 {
        queue.append(CallRecord::new("slow"));
    }

    let late = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            for _ in 0..5 {
                queue.append(CallRecord::new("fast"));
                thread::sleep(Duration::from_millis(2));
            }
        })
    };

    let mut executed = host.drain().unwrap();
    late.join().unwrap();
    executed += host.drain().unwrap();

    assert_eq!(executed, 10);
    assert_eq!(host.eval("hits").unwrap().as_number(), Some(10.0));
}
