// crates/flowruntime/tests/app_test.rs

use flowcore::{
    ExecutionEvent, FlowError, Input, JoinConfig, NodeError, NodeRef, RunOutcome, RunState, Value,
};
use flowruntime::{App, RuntimeConfig, Sequence};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

/// Initialize tracing for tests
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

fn no_inputs() -> Vec<Input> {
    Vec::new()
}

fn increment(name: &str) -> NodeRef {
    NodeRef::from_fn(name, |_, inputs| {
        let n = flowcore::require_input(inputs, 0)?
            .as_f64()
            .ok_or_else(|| NodeError::failed("not a number"))?;
        Ok(Value::from(n + 1.0))
    })
}

fn counting(name: &str, calls: Arc<AtomicUsize>) -> NodeRef {
    NodeRef::from_fn(name, move |_, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Null)
    })
}

/// A node whose closure needs the orchestrator that runs it.
fn with_app<F>(app: &Arc<App>, name: &str, f: F) -> NodeRef
where
    F: Fn(&App, &flowcore::NodeContext) -> Result<Value, NodeError> + Send + Sync + 'static,
{
    let weak: Weak<App> = Arc::downgrade(app);
    NodeRef::from_fn(name, move |ctx, _| {
        let app = weak.upgrade().ok_or_else(|| NodeError::failed("app dropped"))?;
        f(&app, ctx)
    })
}

#[test]
fn test_independent_nodes_produce_independent_records() {
    init_tracing();
    let app = App::new();
    let t1 = increment("t1");
    let t2 = increment("t2");

    app.enqueue(&t1, [0]);
    app.enqueue(&t2, [1]);
    app.run().unwrap();

    let results = app.results();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].value(), &Value::from(1));
    assert_eq!(results[1].value(), &Value::from(2));
    assert_eq!(results[0].sources()[0].value(), &Value::from(0));
    assert_eq!(results[1].sources()[0].value(), &Value::from(1));
    assert!(results[0].sources()[0].sources().is_empty());
    assert_eq!(app.results_for(&t2).len(), 1);
    assert_eq!(app.state(), RunState::Ready);
}

#[test]
fn test_run_with_empty_queue_returns_immediately() {
    let app = App::new();
    app.run().unwrap();
    assert_eq!(app.state(), RunState::Ready);
    assert!(app.results().is_empty());
}

#[test]
fn test_run_while_running_is_noop() {
    let app = Arc::new(App::new());
    let reenter = with_app(&app, "reenter", |app, _| {
        app.run().map_err(|e| NodeError::failed(e.to_string()))?;
        Ok(Value::from(app.state() == RunState::Running))
    });
    let after = increment("after");

    app.enqueue(&reenter, no_inputs());
    app.enqueue(&after, [1]);
    app.run().unwrap();

    let results = app.results();
    assert_eq!(results[0].value(), &Value::Bool(true));
    assert_eq!(results[1].value(), &Value::from(2));
    assert_eq!(app.state(), RunState::Ready);
}

#[test]
fn test_stop_lets_current_node_finish() {
    init_tracing();
    let app = Arc::new(App::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let stopper = with_app(&app, "stopper", |app, _| {
        app.stop().map_err(|e| NodeError::failed(e.to_string()))?;
        Ok(Value::from("finished"))
    });
    let next = counting("next", calls.clone());

    app.enqueue(&stopper, no_inputs());
    app.enqueue(&next, no_inputs());
    app.run().unwrap();

    assert_eq!(app.results_for(&stopper)[0].value(), &Value::from("finished"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(app.queue_len(), 1);
    assert_eq!(app.state(), RunState::Ready);

    app.run().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_terminate_unwinds_probing_node() {
    let app = Arc::new(App::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let probe = with_app(&app, "probe", |app, ctx| {
        app.terminate().map_err(|e| NodeError::failed(e.to_string()))?;
        ctx.check_terminate()?;
        Ok(Value::from("unreachable"))
    });
    let next = counting("next", calls.clone());

    app.enqueue(&probe, no_inputs());
    app.enqueue(&next, no_inputs());
    app.run().unwrap();

    assert!(app.results().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(app.queue_len(), 1);
    assert_eq!(app.state(), RunState::Ready);
}

#[test]
fn test_terminate_without_probe_behaves_like_stop() {
    let app = Arc::new(App::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let oblivious = with_app(&app, "oblivious", |app, _| {
        app.terminate().map_err(|e| NodeError::failed(e.to_string()))?;
        Ok(Value::from("done anyway"))
    });
    let next = counting("next", calls.clone());

    app.enqueue(&oblivious, no_inputs());
    app.enqueue(&next, no_inputs());
    app.run().unwrap();

    assert_eq!(app.results()[0].value(), &Value::from("done anyway"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(app.state(), RunState::Ready);
}

#[test]
fn test_terminate_from_another_thread() {
    init_tracing();
    let app = Arc::new(App::new());
    let started = Arc::new(AtomicBool::new(false));
    let slow = {
        let started = Arc::clone(&started);
        NodeRef::from_fn("slow", move |ctx, _| {
            started.store(true, Ordering::SeqCst);
            let start = Instant::now();
            while start.elapsed() < Duration::from_secs(30) {
                ctx.check_terminate()?;
                thread::sleep(Duration::from_millis(2));
            }
            Ok(Value::Null)
        })
    };
    app.enqueue(&slow, no_inputs());

    let runner = {
        let app = Arc::clone(&app);
        thread::spawn(move || app.run())
    };
    while !started.load(Ordering::SeqCst) {
        thread::yield_now();
    }
    // Enqueue stays available while a dispatch is in flight.
    app.enqueue(&slow, no_inputs());
    app.terminate().unwrap();

    runner.join().unwrap().unwrap();
    assert_eq!(app.state(), RunState::Ready);
    assert_eq!(app.queue_len(), 1);
    assert!(app.results().is_empty());
}

#[test]
fn test_node_failure_is_logged_and_queue_kept() {
    init_tracing();
    let app = App::new();
    let failing = NodeRef::from_fn("failing", |_, _| Err(NodeError::failed("boom")));
    let after = increment("after");

    app.enqueue(&failing, no_inputs());
    app.enqueue(&after, [1]);
    app.run().unwrap();

    assert!(app.results().is_empty());
    assert_eq!(app.queue_len(), 1);
    assert_eq!(app.state(), RunState::Ready);

    app.run().unwrap();
    assert_eq!(app.results()[0].value(), &Value::from(2));
}

#[test]
fn test_debug_flag_propagates_node_failure() {
    let app = App::with_config(RuntimeConfig {
        debug: true,
        ..RuntimeConfig::default()
    });
    let failing = NodeRef::from_fn("failing", |_, _| Err(NodeError::failed("boom")));

    app.enqueue(&failing, no_inputs());
    match app.run() {
        Err(FlowError::Node(NodeError::ExecutionFailed(msg))) => assert_eq!(msg, "boom"),
        other => panic!("expected node failure, got {:?}", other),
    }
    assert_eq!(app.state(), RunState::Ready);
}

#[test]
fn test_stop_and_terminate_rejected_outside_a_run() {
    let app = App::new();
    assert!(matches!(app.stop(), Err(FlowError::InvalidTransition { .. })));
    assert!(matches!(app.terminate(), Err(FlowError::InvalidTransition { .. })));
}

#[test]
fn test_info_reflects_running_state() {
    let app = Arc::new(App::new());
    let reporter = with_app(&app, "reporter", |app, _| Ok(Value::from(app.info())));
    let idle = increment("idle");

    app.enqueue(&reporter, no_inputs());
    app.enqueue(&idle, [0]);
    assert_eq!(app.info(), "READY (queue: 2)");
    app.run().unwrap();

    assert_eq!(app.results()[0].value(), &Value::from("RUNNING (queue: 1)"));
}

#[test]
fn test_inline_sequence_dispatches_within_one_entry() {
    let app = App::new();
    let mut events = app.subscribe_events();
    let first = increment("first");
    let second = increment("second");
    Sequence::connect(&first, &second, JoinConfig::default().inline());

    app.enqueue(&first, [1]);
    app.run().unwrap();

    assert_eq!(app.results()[0].value(), &Value::from(3));
    let mut dispatched = None;
    while let Ok(event) = events.try_recv() {
        if let ExecutionEvent::RunFinished { dispatched: n, .. } = event {
            dispatched = Some(n);
        }
    }
    assert_eq!(dispatched, Some(1));
}

#[test]
fn test_events_describe_run_lifecycle() {
    let app = App::new();
    let mut events = app.subscribe_events();
    app.enqueue(&increment("t1"), [0]);
    app.enqueue(&increment("t2"), [1]);
    app.run().unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }

    assert!(matches!(
        seen.first(),
        Some(ExecutionEvent::StateChanged { from: RunState::Ready, to: RunState::Running, .. })
    ));
    assert!(seen.iter().any(|e| matches!(e, ExecutionEvent::RunStarted { queued: 2, .. })));
    assert_eq!(
        seen.iter().filter(|e| matches!(e, ExecutionEvent::NodeCompleted { .. })).count(),
        2
    );
    assert!(seen.iter().any(|e| matches!(
        e,
        ExecutionEvent::RunFinished { outcome: RunOutcome::Drained, dispatched: 2, .. }
    )));
    assert!(matches!(
        seen.last(),
        Some(ExecutionEvent::StateChanged { to: RunState::Ready, .. })
    ));
}

#[test]
fn test_take_results_empties_aggregator() {
    let app = App::new();
    app.enqueue(&increment("t"), [0]);
    app.run().unwrap();

    assert_eq!(app.take_results().len(), 1);
    assert!(app.results().is_empty());
}
