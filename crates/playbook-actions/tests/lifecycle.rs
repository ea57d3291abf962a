//! End-to-end lifecycle traces: phase ordering, rollback, aggregation,
//! and retry recovery observed through hook side effects.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use playbook_actions::{invoke, ActionGroup, ArcAction, ChainedAction, LeafAction};
use playbook_core::PlaybookError;
use playbook_hooks::{CircuitBreaker, Phase, RetryHandler};
use serde_json::{json, Value};

type Trace = Arc<Mutex<Vec<String>>>;

fn record(trace: &Trace, entry: impl Into<String>) {
    trace.lock().unwrap().push(entry.into());
}

/// Register before/after/on_error/on_teardown trace hooks on a leaf.
fn traced_leaf(name: &str, trace: Trace) -> LeafAction {
    let tag = name.to_string();
    let body_trace = trace.clone();
    let mut leaf = LeafAction::new(name, move |_args| {
        record(&body_trace, format!("{tag}:body"));
        Ok(json!(tag))
    });
    install_trace(name, leaf.hooks_mut(), trace);
    leaf
}

fn install_trace(name: &str, hooks: &mut playbook_hooks::HookManager, trace: Trace) {
    for phase in Phase::ALL {
        let trace = trace.clone();
        let entry = format!("{name}:{phase}");
        hooks.register_fn(phase, format!("trace_{phase}"), move |_ctx| {
            record(&trace, entry.clone());
            Ok(())
        });
    }
}

fn entries(trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clone()
}

fn count(trace: &Trace, entry: &str) -> usize {
    entries(trace).iter().filter(|e| *e == entry).count()
}

#[tokio::test]
async fn linear_chain_success_trace() {
    let trace: Trace = Arc::new(Mutex::new(Vec::new()));
    let mut chain = ChainedAction::new(
        "pipeline",
        vec![
            Arc::new(traced_leaf("a", trace.clone())) as ArcAction,
            Arc::new(traced_leaf("b", trace.clone())) as ArcAction,
            Arc::new(traced_leaf("c", trace.clone())) as ArcAction,
        ],
    );
    install_trace("pipeline", chain.hooks_mut(), trace.clone());
    let chain: ArcAction = Arc::new(chain);

    invoke(&chain, Value::Null).await.unwrap();

    assert_eq!(
        entries(&trace),
        vec![
            "pipeline:before",
            "a:before",
            "a:body",
            "a:after",
            "a:on_teardown",
            "b:before",
            "b:body",
            "b:after",
            "b:on_teardown",
            "c:before",
            "c:body",
            "c:after",
            "c:on_teardown",
            "pipeline:after",
            "pipeline:on_teardown",
        ]
    );
}

#[tokio::test]
async fn chain_failure_trace_with_rollback() {
    let trace: Trace = Arc::new(Mutex::new(Vec::new()));

    let rb_trace = trace.clone();
    let a = traced_leaf("a", trace.clone()).with_rollback(move |_args| {
        record(&rb_trace, "a:rollback");
        Ok(Value::Null)
    });

    let mut b = LeafAction::new("b", |_args| {
        Err(PlaybookError::action("b exploded"))
    });
    install_trace("b", b.hooks_mut(), trace.clone());

    let c = traced_leaf("c", trace.clone());

    let chain: ArcAction = Arc::new(ChainedAction::new(
        "pipeline",
        vec![Arc::new(a) as ArcAction, Arc::new(b) as ArcAction, Arc::new(c) as ArcAction],
    ));

    let err = invoke(&chain, Value::Null).await.unwrap_err();
    assert!(err.to_string().contains("b exploded"));

    let trace = entries(&trace);
    // A's lifecycle completed normally.
    assert!(trace.contains(&"a:after".to_string()));
    // B ended with on_error then teardown, never after.
    let b_error = trace.iter().position(|e| e == "b:on_error").unwrap();
    let b_teardown = trace.iter().position(|e| e == "b:on_teardown").unwrap();
    assert!(b_error < b_teardown);
    assert!(!trace.contains(&"b:after".to_string()));
    // A rolled back exactly once, C never started.
    assert_eq!(trace.iter().filter(|e| *e == "a:rollback").count(), 1);
    assert!(!trace.iter().any(|e| e.starts_with("c:")));
}

#[tokio::test]
async fn group_failure_is_an_aggregate_and_partitions_children() {
    let trace: Trace = Arc::new(Mutex::new(Vec::new()));
    let boom: ArcAction = Arc::new(LeafAction::new("y", |_args| {
        Err(PlaybookError::action("y exploded"))
    }));
    let group = Arc::new(ActionGroup::new(
        "fanout",
        vec![
            Arc::new(traced_leaf("x", trace.clone())) as ArcAction,
            boom,
            Arc::new(traced_leaf("z", trace.clone())) as ArcAction,
        ],
    ));
    let action: ArcAction = group.clone();

    let err = invoke(&action, Value::Null).await.unwrap_err();

    match err {
        PlaybookError::Aggregate { failures, total, .. } => {
            assert_eq!(total, 3);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, "y");
            assert!(failures[0].1.to_string().contains("y exploded"));
        }
        other => panic!("expected aggregate, got {other}"),
    }
    assert_eq!(group.results().len() + group.errors().len(), 3);
    // Siblings of the failing child still completed their lifecycles.
    assert_eq!(count(&trace, "x:on_teardown"), 1);
    assert_eq!(count(&trace, "z:on_teardown"), 1);
}

#[tokio::test]
async fn group_after_hooks_observe_the_result_map() {
    let seen = Arc::new(Mutex::new(None));
    let seen_in_hook = seen.clone();
    let mut group = ActionGroup::new(
        "fanout",
        vec![
            Arc::new(LeafAction::new("x", |_| Ok(json!(1)))) as ArcAction,
            Arc::new(LeafAction::new("y", |_| Ok(json!(2)))) as ArcAction,
        ],
    );
    group.hooks_mut().register_fn(Phase::After, "capture", move |ctx| {
        *seen_in_hook.lock().unwrap() = ctx.result().cloned();
        Ok(())
    });
    let group: ArcAction = Arc::new(group);

    invoke(&group, Value::Null).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), Some(json!({"x": 1, "y": 2})));
}

#[tokio::test]
async fn retry_recovery_runs_after_exactly_once() {
    let trace: Trace = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::new(AtomicU32::new(0));

    let body_calls = calls.clone();
    let mut flaky = LeafAction::new("flaky", move |_args| {
        let call = body_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= 2 {
            Err(PlaybookError::action(format!("attempt {call} failed")))
        } else {
            Ok(json!("third time lucky"))
        }
    });
    install_trace("flaky", flaky.hooks_mut(), trace.clone());
    flaky
        .hooks_mut()
        .register(Phase::OnError, RetryHandler::new(3, Duration::ZERO, 1.0));
    let flaky: ArcAction = Arc::new(flaky);

    let result = invoke(&flaky, Value::Null).await.unwrap();

    assert_eq!(result, json!("third time lucky"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // One before (retries bypass it), one on_error phase, one after.
    assert_eq!(count(&trace, "flaky:before"), 1);
    assert_eq!(count(&trace, "flaky:on_error"), 1);
    assert_eq!(count(&trace, "flaky:after"), 1);
    assert_eq!(count(&trace, "flaky:on_teardown"), 1);
}

#[tokio::test]
async fn duration_is_stamped_before_error_and_teardown_hooks_run() {
    let durations = Arc::new(Mutex::new(Vec::new()));
    let mut doomed = LeafAction::new("doomed", |_args| {
        Err(PlaybookError::action("nope"))
    });
    for phase in [Phase::OnError, Phase::OnTeardown] {
        let durations = durations.clone();
        doomed.hooks_mut().register_fn(phase, "duration_check", move |ctx| {
            durations.lock().unwrap().push(ctx.duration);
            Ok(())
        });
    }
    let doomed: ArcAction = Arc::new(doomed);

    invoke(&doomed, Value::Null).await.unwrap_err();

    let durations = durations.lock().unwrap();
    assert_eq!(durations.len(), 2);
    assert!(durations.iter().all(|d| d.is_some()));
}

#[tokio::test]
async fn before_hook_veto_skips_the_body() {
    let ran = Arc::new(AtomicU32::new(0));
    let body_ran = ran.clone();
    let mut vetoed = LeafAction::new("vetoed", move |_args| {
        body_ran.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Null)
    });
    vetoed.hooks_mut().register_fn(Phase::Before, "veto", |ctx| {
        ctx.fail(PlaybookError::action("not today"));
        Ok(())
    });
    let vetoed: ArcAction = Arc::new(vetoed);

    let err = invoke(&vetoed, Value::Null).await.unwrap_err();

    assert!(err.to_string().contains("not today"));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn circuit_opens_after_max_failures_and_blocks_the_body() {
    let calls = Arc::new(AtomicU32::new(0));
    let body_calls = calls.clone();
    let mut risky = LeafAction::new("risky", move |_args| {
        body_calls.fetch_add(1, Ordering::SeqCst);
        Err(PlaybookError::action("deterministic failure"))
    });
    let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
    breaker.install(risky.hooks_mut());
    let risky: ArcAction = Arc::new(risky);

    // First two invocations fail with the original error and count.
    for _ in 0..2 {
        let err = invoke(&risky, Value::Null).await.unwrap_err();
        assert!(err.to_string().contains("deterministic failure"));
    }
    assert!(breaker.is_open());

    // Third invocation is blocked before the body runs.
    let err = invoke(&risky, Value::Null).await.unwrap_err();
    assert_eq!(err.code(), "CIRCUIT_OPEN");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn recovered_retry_keeps_the_breaker_closed() {
    let calls = Arc::new(AtomicU32::new(0));
    let body_calls = calls.clone();
    let mut flaky = LeafAction::new("flaky", move |_args| {
        let call = body_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == 1 {
            Err(PlaybookError::action("first call fails"))
        } else {
            Ok(json!("ok"))
        }
    });
    let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
    // Retry first: when it recovers, the breaker's on_error hook sees a
    // non-failed outcome and does not count.
    flaky
        .hooks_mut()
        .register(Phase::OnError, RetryHandler::new(2, Duration::ZERO, 1.0));
    breaker.install(flaky.hooks_mut());
    let flaky: ArcAction = Arc::new(flaky);

    let result = invoke(&flaky, Value::Null).await.unwrap();

    assert_eq!(result, json!("ok"));
    assert_eq!(breaker.failures(), 0);
    assert!(!breaker.is_open());
}

#[tokio::test]
async fn teardown_runs_exactly_once_on_failure() {
    let trace: Trace = Arc::new(Mutex::new(Vec::new()));
    let mut doomed = LeafAction::new("doomed", |_args| {
        Err(PlaybookError::action("nope"))
    });
    install_trace("doomed", doomed.hooks_mut(), trace.clone());
    let doomed: ArcAction = Arc::new(doomed);

    invoke(&doomed, Value::Null).await.unwrap_err();

    assert_eq!(count(&trace, "doomed:on_teardown"), 1);
    assert_eq!(count(&trace, "doomed:after"), 0);
}
