//! Integration Tests for the Reactive Runtime
//!
//! These tests verify that views, reactions and schedulers work together
//! correctly through the public API only.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use trellis_core::graph::OperationKind;
use trellis_core::{
    Error, ObjectRef, Observable, ObserveOptions, PropertyKey, ReactionQueue, Runtime, Scheduler,
    Value,
};

/// Observe a computation that bumps a counter on every run.
fn counted<F>(
    runtime: &Runtime,
    options: ObserveOptions,
    body: F,
) -> (trellis_core::Reaction, Arc<AtomicI32>)
where
    F: Fn() + Send + Sync + 'static,
{
    let runs = Arc::new(AtomicI32::new(0));
    let runs_clone = runs.clone();
    let reaction = runtime
        .observe(
            move |_: &[Value]| {
                runs_clone.fetch_add(1, Ordering::SeqCst);
                body();
                Ok(Value::Undefined)
            },
            options,
        )
        .unwrap();
    (reaction, runs)
}

fn runs(counter: &AtomicI32) -> i32 {
    counter.load(Ordering::SeqCst)
}

/// Test that a reaction re-runs when a property it read changes.
#[test]
fn reaction_tracks_property_reads() {
    let runtime = Runtime::new();
    let counter = runtime.observable(ObjectRef::from_entries([("num", 0)])).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let view = counter.clone();
    let seen_clone = seen.clone();
    let _reaction = runtime
        .observe(
            move |_: &[Value]| {
                seen_clone.lock().push(view.get("num"));
                Ok(Value::Undefined)
            },
            ObserveOptions::new(),
        )
        .unwrap();

    counter.set("num", 7);
    assert_eq!(*seen.lock(), vec![Value::from(0), Value::from(7)]);
}

/// Test that writing an identical value does not notify.
#[test]
fn identical_write_is_not_a_change() {
    let runtime = Runtime::new();
    let state = runtime.observable(ObjectRef::from_entries([("a", 1)])).unwrap();
    let view = state.clone();
    let (_reaction, count) = counted(&runtime, ObserveOptions::new(), move || {
        view.get("a");
    });

    state.set("a", 1);
    assert_eq!(runs(&count), 1);
    state.set("a", 2);
    assert_eq!(runs(&count), 2);
}

/// Test that only the keys actually read are dependencies.
#[test]
fn unrelated_keys_do_not_notify() {
    let runtime = Runtime::new();
    let state = runtime
        .observable(ObjectRef::from_entries([("a", 1), ("b", 2)]))
        .unwrap();
    let view = state.clone();
    let (_reaction, count) = counted(&runtime, ObserveOptions::new(), move || {
        view.get("a");
    });

    state.set("b", 3);
    state.set("c", 4);
    assert_eq!(runs(&count), 1);
}

/// Test that dependencies are exactly the reads of the latest run.
#[test]
fn dependencies_follow_branches() {
    let runtime = Runtime::new();
    let state = runtime
        .observable(ObjectRef::from_entries([
            ("flag", Value::from(true)),
            ("a", Value::from(1)),
            ("b", Value::from(2)),
        ]))
        .unwrap();
    let view = state.clone();
    let (reaction, count) = counted(&runtime, ObserveOptions::new(), move || {
        if view.get("flag") == Value::from(true) {
            view.get("a");
        } else {
            view.get("b");
        }
    });
    assert_eq!(reaction.dependency_count(), 2);

    state.set("flag", false);
    assert_eq!(runs(&count), 2);

    // `a` is no longer read.
    state.set("a", 10);
    assert_eq!(runs(&count), 2);
    state.set("b", 20);
    assert_eq!(runs(&count), 3);
    assert_eq!(runtime.dependents(state.raw(), "a"), 0);
    assert_eq!(runtime.dependents(state.raw(), "b"), 1);
}

/// Test that nested objects become views when read inside a reaction, and
/// that the nested view is tracked too.
#[test]
fn nested_objects_are_tracked_lazily() {
    let runtime = Runtime::new();
    let state = runtime
        .observable_from_json(json!({ "user": { "name": "Ada" } }))
        .unwrap();
    let user_raw = state.raw().get("user").as_object().cloned().unwrap();

    let seen = Arc::new(Mutex::new(Value::Undefined));
    let view = state.clone();
    let seen_clone = seen.clone();
    let _reaction = runtime
        .observe(
            move |_: &[Value]| {
                let user = view.get_view("user").ok_or_else(|| Error::computation("no user"))?;
                *seen_clone.lock() = user.get("name");
                Ok(Value::Undefined)
            },
            ObserveOptions::new(),
        )
        .unwrap();

    let user = runtime.cached_view(&user_raw).unwrap();
    user.set("name", "Grace");
    assert_eq!(*seen.lock(), Value::from("Grace"));
}

/// Test that wrapping is idempotent and that raw objects never hold views.
#[test]
fn identity_is_preserved() {
    let runtime = Runtime::new();
    let raw = ObjectRef::plain();
    let first = runtime.observable(raw.clone()).unwrap();
    let second = runtime.observable(raw.clone()).unwrap();
    assert_eq!(first, second);
    assert_eq!(runtime.wrap(Value::View(first.clone())), Value::View(first.clone()));

    let child = runtime.observable(ObjectRef::plain()).unwrap();
    first.set("child", child.clone());
    assert_eq!(raw.get("child"), Value::Object(child.raw().clone()));
    assert_eq!(first.get("child"), Value::View(child));
}

/// Test that adding and deleting keys notifies enumerating reactions, while
/// reassigning an existing key does not.
#[test]
fn enumeration_tracks_structure() {
    let runtime = Runtime::new();
    let state = runtime.observable(ObjectRef::from_entries([("a", 1)])).unwrap();
    let view = state.clone();
    let (_reaction, count) = counted(&runtime, ObserveOptions::new(), move || {
        view.keys();
    });

    state.set("a", 2);
    assert_eq!(runs(&count), 1);
    state.set("b", 1);
    assert_eq!(runs(&count), 2);
    state.delete("b");
    assert_eq!(runs(&count), 3);
    // Deleting a missing key is a no-op.
    state.delete("missing");
    assert_eq!(runs(&count), 3);
}

/// Test that `has` is tracked per key, including for missing keys.
#[test]
fn containment_checks_are_tracked() {
    let runtime = Runtime::new();
    let state = runtime.observable(ObjectRef::plain()).unwrap();
    let view = state.clone();
    let (_reaction, count) = counted(&runtime, ObserveOptions::new(), move || {
        view.has("a");
    });

    state.set("a", 1);
    assert_eq!(runs(&count), 2);
    state.delete("a");
    assert_eq!(runs(&count), 3);
}

/// Test array element writes and pushes.
#[test]
fn arrays_notify_length_readers() {
    let runtime = Runtime::new();
    let list = runtime.observable(ObjectRef::from_values([1, 2])).unwrap();
    let lengths = Arc::new(Mutex::new(Vec::new()));

    let view = list.clone();
    let lengths_clone = lengths.clone();
    let _reaction = runtime
        .observe(
            move |_: &[Value]| {
                lengths_clone.lock().push(view.len());
                Ok(Value::Undefined)
            },
            ObserveOptions::new(),
        )
        .unwrap();

    list.push(3);
    assert_eq!(lengths.lock().last(), Some(&3));

    let before = lengths.lock().len();
    list.set(0usize, 10);
    assert_eq!(lengths.lock().len(), before);
}

/// Test that writing a far index or a huge length through a view is a
/// cheap sparse change that still notifies length readers.
#[test]
fn sparse_array_writes_notify_length_readers() {
    let runtime = Runtime::new();
    let list = runtime.observable(ObjectRef::from_values([1])).unwrap();
    let lengths = Arc::new(Mutex::new(Vec::new()));

    let view = list.clone();
    let lengths_clone = lengths.clone();
    let _reaction = runtime
        .observe(
            move |_: &[Value]| {
                lengths_clone.lock().push(view.len());
                Ok(Value::Undefined)
            },
            ObserveOptions::new(),
        )
        .unwrap();

    assert!(list.set(3_000_000_000usize, 1));
    assert_eq!(lengths.lock().last(), Some(&3_000_000_001));
    assert_eq!(list.get(3_000_000_000usize), Value::from(1));

    assert!(list.set(PropertyKey::length(), Value::Number(4e9)));
    assert_eq!(lengths.lock().last(), Some(&4_000_000_000));
    assert_eq!(list.raw().own_keys().len(), 3);

    assert!(list.set(PropertyKey::length(), 1usize));
    assert_eq!(lengths.lock().last(), Some(&1));
    assert!(!list.has(3_000_000_000usize));
}

/// Test that the change check is strict equality: `NaN` over `NaN` is a
/// change, `-0` over `0` is not.
#[test]
fn change_detection_uses_strict_equality() {
    let runtime = Runtime::new();
    let state = runtime
        .observable(ObjectRef::from_entries([("a", f64::NAN), ("b", 0.0)]))
        .unwrap();
    let view = state.clone();
    let (_reaction, count) = counted(&runtime, ObserveOptions::new(), move || {
        view.get("a");
        view.get("b");
    });

    state.set("a", f64::NAN);
    assert_eq!(runs(&count), 2);

    state.set("b", -0.0);
    assert_eq!(runs(&count), 2);
    state.set("b", 1.0);
    assert_eq!(runs(&count), 3);
}

/// Test that enumerating an array depends on its length.
#[test]
fn array_iteration_uses_length() {
    let runtime = Runtime::new();
    let list = runtime.observable(ObjectRef::from_values(["a"])).unwrap();
    let view = list.clone();
    let (_reaction, count) = counted(&runtime, ObserveOptions::new(), move || {
        view.keys();
    });
    assert_eq!(runtime.iteration_dependents(list.raw()), 1);
    assert_eq!(runtime.dependents(list.raw(), PropertyKey::length()), 1);

    list.set(PropertyKey::length(), 0usize);
    assert_eq!(runs(&count), 2);
}

/// Test that unobserve stops all future runs, including queued ones.
#[test]
fn unobserve_cancels_reaction() {
    let runtime = Runtime::new();
    let queue = ReactionQueue::new();
    let state = runtime.observable(ObjectRef::from_entries([("a", 1)])).unwrap();
    let view = state.clone();
    let (reaction, count) = counted(
        &runtime,
        ObserveOptions::new().scheduler(Scheduler::queue(&queue)),
        move || {
            view.get("a");
        },
    );

    state.set("a", 2);
    assert!(queue.contains(&reaction));

    runtime.unobserve(&reaction);
    assert!(queue.is_empty());
    assert!(!reaction.is_active());
    assert_eq!(reaction.dependency_count(), 0);

    state.set("a", 3);
    assert!(queue.is_empty());
    assert_eq!(runs(&count), 1);

    // Unobserving twice is harmless.
    runtime.unobserve(&reaction);
}

/// Test that a queue scheduler deduplicates and defers runs.
#[test]
fn queue_scheduler_batches_runs() {
    let runtime = Runtime::new();
    let queue = ReactionQueue::new();
    let state = runtime
        .observable(ObjectRef::from_entries([("a", 1), ("b", 1)]))
        .unwrap();
    let view = state.clone();
    let (_reaction, count) = counted(
        &runtime,
        ObserveOptions::new().scheduler(Scheduler::queue(&queue)),
        move || {
            view.get("a");
            view.get("b");
        },
    );

    state.set("a", 2);
    state.set("b", 2);
    state.set("a", 3);
    assert_eq!(queue.len(), 1);
    assert_eq!(runs(&count), 1);

    assert_eq!(queue.flush().unwrap(), 1);
    assert_eq!(runs(&count), 2);
    assert!(queue.is_empty());
}

/// Test that a callback scheduler receives the reaction instead of running it.
#[test]
fn callback_scheduler_receives_reaction() {
    let runtime = Runtime::new();
    let scheduled = Arc::new(Mutex::new(Vec::new()));
    let scheduled_clone = scheduled.clone();
    let state = runtime.observable(ObjectRef::from_entries([("a", 1)])).unwrap();
    let view = state.clone();
    let (reaction, count) = counted(
        &runtime,
        ObserveOptions::new().scheduler(Scheduler::callback(move |reaction| {
            scheduled_clone.lock().push(reaction.id());
        })),
        move || {
            view.get("a");
        },
    );

    state.set("a", 2);
    assert_eq!(*scheduled.lock(), vec![reaction.id()]);
    assert_eq!(runs(&count), 1);

    reaction.call().unwrap();
    assert_eq!(runs(&count), 2);
}

/// Test that a write into a prototype-backed object notifies only the
/// receiver's readers.
#[test]
fn prototype_writes_notify_receiver_only() {
    let runtime = Runtime::new();
    let proto = runtime.observable(ObjectRef::from_entries([("greeting", "hi")])).unwrap();
    let child_raw = ObjectRef::plain();
    child_raw
        .set_prototype(Some(Value::View(proto.clone())))
        .unwrap();
    let child = runtime.observable(child_raw.clone()).unwrap();

    let proto_view = proto.clone();
    let (_proto_reaction, proto_runs) = counted(&runtime, ObserveOptions::new(), move || {
        proto_view.get("greeting");
    });
    let child_view = child.clone();
    let seen = Arc::new(Mutex::new(Value::Undefined));
    let seen_clone = seen.clone();
    let _child_reaction = runtime
        .observe(
            move |_: &[Value]| {
                *seen_clone.lock() = child_view.get("greeting");
                Ok(Value::Undefined)
            },
            ObserveOptions::new(),
        )
        .unwrap();
    assert_eq!(*seen.lock(), Value::from("hi"));

    child.set("greeting", "hello");
    assert_eq!(*seen.lock(), Value::from("hello"));
    assert_eq!(runs(&proto_runs), 1);
    assert_eq!(proto.get("greeting"), Value::from("hi"));
    assert!(child_raw.has_own(&"greeting".into()));
}

/// Test that reads inside a nested reaction are attributed to it, and the
/// outer reaction resumes tracking afterwards.
#[test]
fn nested_reactions_attribute_reads() {
    let runtime = Runtime::new();
    let state = runtime
        .observable(ObjectRef::from_entries([("inner", 1), ("outer", 1)]))
        .unwrap();

    let inner_view = state.clone();
    let (inner, inner_runs) = counted(&runtime, ObserveOptions::new().lazy(), move || {
        inner_view.get("inner");
    });

    let outer_view = state.clone();
    let inner_clone = inner.clone();
    let (outer, outer_runs) = counted(&runtime, ObserveOptions::new(), move || {
        let _ = inner_clone.call();
        outer_view.get("outer");
    });
    assert_eq!(runs(&inner_runs), 1);
    assert_eq!(inner.dependency_count(), 1);
    assert_eq!(outer.dependency_count(), 1);

    state.set("inner", 2);
    assert_eq!(runs(&inner_runs), 2);
    assert_eq!(runs(&outer_runs), 1);

    state.set("outer", 2);
    assert_eq!(runs(&outer_runs), 2);
}

/// Test that a reaction writing what it reads does not loop.
#[test]
fn self_triggering_reaction_is_skipped() {
    let runtime = Runtime::new();
    let state = runtime.observable(ObjectRef::from_entries([("n", 0)])).unwrap();
    let view = state.clone();
    let (_reaction, count) = counted(&runtime, ObserveOptions::new(), move || {
        let next = view.get("n").as_f64().unwrap_or(0.0) + 1.0;
        view.set("n", next);
    });

    assert_eq!(runs(&count), 1);
    assert_eq!(state.get("n"), Value::from(1));

    state.set("n", 10);
    assert_eq!(runs(&count), 2);
    assert_eq!(state.get("n"), Value::from(11));
}

/// Test that a failing run propagates its error and leaves no stale
/// tracking state behind.
#[test]
fn failing_reaction_restores_stack() {
    let runtime = Runtime::new();
    let state = runtime.observable(ObjectRef::from_entries([("a", 1)])).unwrap();
    let view = state.clone();
    let reaction = runtime
        .observe(
            move |_: &[Value]| {
                view.get("a");
                Err(Error::computation("boom"))
            },
            ObserveOptions::new().lazy(),
        )
        .unwrap();

    assert!(reaction.call().is_err());
    assert!(!runtime.is_tracking());
    // The read before the failure still counts.
    assert_eq!(reaction.dependency_count(), 1);

    // A failure during an immediate re-run is logged, not raised.
    assert!(state.set("a", 2));
    assert!(!runtime.is_tracking());
}

/// Test that a panicking computation unwinds the execution stack.
#[test]
fn panicking_reaction_restores_stack() {
    let runtime = Runtime::new();
    let reaction = runtime
        .observe(
            |_: &[Value]| -> trellis_core::Result<Value> { panic!("computation panicked") },
            ObserveOptions::new().lazy(),
        )
        .unwrap();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| reaction.call()));
    assert!(result.is_err());
    assert!(!runtime.is_tracking());
    assert!(runtime.current_reaction().is_none());
}

/// Test that the debugger sees reads and writes, and that operations the
/// debugger performs itself are not passed back to it.
#[test]
fn debugger_observes_operations() {
    let runtime = Runtime::new();
    let state = runtime.observable(ObjectRef::from_entries([("a", 1)])).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let view = state.clone();
    let debug_view = state.clone();
    let log_clone = log.clone();
    let reaction = runtime
        .observe(
            move |_: &[Value]| {
                view.get("a");
                Ok(Value::Undefined)
            },
            ObserveOptions::new().debugger(move |operation| {
                debug_view.get("hidden");
                log_clone.lock().push(operation.kind);
            }),
        )
        .unwrap();

    state.set("a", 2);
    assert_eq!(
        *log.lock(),
        vec![OperationKind::Get, OperationKind::Set, OperationKind::Get]
    );
    // Reads made by the debugger during a run still belong to that run.
    assert_eq!(runtime.dependents(state.raw(), "hidden"), 1);
    assert_eq!(reaction.dependency_count(), 2);
}

/// Test that dropping every handle to a reaction releases its edges.
#[test]
fn dropped_reaction_releases_edges() {
    let runtime = Runtime::new();
    let state = runtime.observable(ObjectRef::from_entries([("a", 1)])).unwrap();
    let view = state.clone();
    let (reaction, count) = counted(&runtime, ObserveOptions::new(), move || {
        view.get("a");
    });
    assert_eq!(runtime.dependents(state.raw(), "a"), 1);

    drop(reaction);
    assert_eq!(runtime.dependents(state.raw(), "a"), 0);
    state.set("a", 2);
    assert_eq!(runs(&count), 1);
}

/// Test that a policy can keep objects raw.
#[test]
fn policy_can_refuse_objects() {
    let runtime = Runtime::builder()
        .policy(|object: &ObjectRef| !object.is_frozen())
        .build();
    let frozen = ObjectRef::plain();
    frozen.freeze();

    assert!(matches!(
        runtime.observable(frozen.clone()),
        Err(Error::NotInstrumentable(_))
    ));
    assert_eq!(runtime.wrap(frozen.clone()), Value::Object(frozen));
}

/// Test that reactions run with their call arguments.
#[test]
fn reactions_receive_arguments() {
    let runtime = Runtime::new();
    let reaction = runtime
        .observe(
            |args: &[Value]| Ok(args.first().cloned().unwrap_or_default()),
            ObserveOptions::new().lazy(),
        )
        .unwrap();
    assert_eq!(reaction.call_with(&[Value::from(5)]).unwrap(), Some(Value::from(5)));
}

/// Test reading a view graph back out as JSON.
#[test]
fn views_serialize_to_json() {
    let runtime = Runtime::new();
    let state: Observable = runtime
        .observable_from_json(json!({ "items": [1, 2], "name": "list" }))
        .unwrap();
    state.set("done", true);
    assert_eq!(
        Value::View(state).to_json().unwrap(),
        json!({ "items": [1, 2], "name": "list", "done": true })
    );
}
