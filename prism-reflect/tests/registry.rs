//! Reflection dispatch: overload resolution, properties, events.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use prism_core::{DuplicatePolicy, ErrorKind, MetaError, TypeDescriptor, describe_type};
use prism_reflect::{
    ListenerPanicPolicy, ReflectionRegistry, TypeMetadata, arg, expect_arity,
};
use prism_value::{BoxedValue, boxed};

#[derive(Clone, Debug, Default, PartialEq)]
struct Person {
    name: String,
    age: i64,
    address: String,
}

describe_type!(Person => CLASS | DEFAULT_CONSTRUCTIBLE | MOVABLE | COPYABLE);

fn person_type_name() -> String {
    TypeDescriptor::of::<Person>().name().to_string()
}

/// A registry with the two `update` overloads of the Person type.
fn registry_with_updates() -> ReflectionRegistry {
    let mut metadata = TypeMetadata::new();

    // update(name, age)
    metadata.add_method("update", |target, args| {
        expect_arity(args, 2)?;
        let name: String = arg(args, 0)?;
        let age: i64 = arg(args, 1)?;
        target.with_mut(|p: &mut Person| {
            p.name = name.clone();
            p.age = age;
        })?;
        Ok(boxed("short".to_string()))
    });

    // update(name, age, address)
    metadata.add_method("update", |target, args| {
        expect_arity(args, 3)?;
        let name: String = arg(args, 0)?;
        let age: i64 = arg(args, 1)?;
        let address: String = arg(args, 2)?;
        target.with_mut(|p: &mut Person| {
            p.name = name.clone();
            p.age = age;
            p.address = address.clone();
        })?;
        Ok(boxed("long".to_string()))
    });

    let registry = ReflectionRegistry::new();
    registry
        .register_type(&person_type_name(), metadata)
        .unwrap();
    registry
}

#[test]
fn overload_resolution_picks_by_argument_shape() {
    let registry = registry_with_updates();
    let target = boxed(Person::default());

    // Three arguments: the second overload runs.
    let out = registry
        .call_method(
            &target,
            "update",
            &[
                boxed("Ada".to_string()),
                boxed(36_i64),
                boxed("Crunchy Lane 1".to_string()),
            ],
        )
        .unwrap();
    assert_eq!(out.try_cast::<String>().as_deref(), Some("long"));
    assert_eq!(
        target.with(|p: &Person| p.address.clone()).unwrap(),
        "Crunchy Lane 1"
    );

    // Two arguments: the first overload runs.
    let out = registry
        .call_method(&target, "update", &[boxed("Bob".to_string()), boxed(9_i64)])
        .unwrap();
    assert_eq!(out.try_cast::<String>().as_deref(), Some("short"));

    // No overload accepts (int, int): promoted to NotFound.
    let err = registry
        .call_method(&target, "update", &[boxed(1_i64), boxed(2_i64)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn overload_resolution_is_deterministic() {
    // Two overloads that both accept the same shape: the first registered
    // one wins, every time.
    let mut metadata = TypeMetadata::new();
    metadata.add_method("which", |_t, _a| Ok(boxed("first".to_string())));
    metadata.add_method("which", |_t, _a| Ok(boxed("second".to_string())));

    let registry = ReflectionRegistry::new();
    registry
        .register_type(&person_type_name(), metadata)
        .unwrap();

    let target = boxed(Person::default());
    for _ in 0..16 {
        let out = registry.call_method(&target, "which", &[]).unwrap();
        assert_eq!(out.try_cast::<String>().as_deref(), Some("first"));
    }
}

#[test]
fn failing_overloads_propagate_their_error() {
    // A matching overload that fails for a non-shape reason is NOT skipped.
    let mut metadata = TypeMetadata::new();
    metadata.add_method("explode", |_t, _a| {
        Err(MetaError::Internal {
            detail: "boom".to_string(),
        })
    });
    metadata.add_method("explode", |_t, _a| Ok(boxed(())));

    let registry = ReflectionRegistry::new();
    registry
        .register_type(&person_type_name(), metadata)
        .unwrap();

    let err = registry
        .call_method(&boxed(Person::default()), "explode", &[])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[test]
fn unknown_method_and_type_are_not_found() {
    let registry = registry_with_updates();
    let err = registry
        .call_method(&boxed(Person::default()), "missing", &[])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = registry
        .call_method(&boxed(77_i8), "update", &[])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn methods_can_be_added_and_removed_after_registration() {
    let registry = registry_with_updates();
    let type_name = person_type_name();
    registry
        .add_method(&type_name, "greet", |target, _args| {
            let name = target.with(|p: &Person| p.name.clone())?;
            Ok(boxed(format!("hello, {name}")))
        })
        .unwrap();

    let target = boxed(Person {
        name: "Grace".to_string(),
        ..Person::default()
    });
    let out = registry.call_method(&target, "greet", &[]).unwrap();
    assert_eq!(out.try_cast::<String>().as_deref(), Some("hello, Grace"));

    registry.remove_method(&type_name, "greet").unwrap();
    assert_eq!(
        registry
            .call_method(&target, "greet", &[])
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );
}

//////////////////////////////////////////////////////////////////////
// Properties
//////////////////////////////////////////////////////////////////////

fn registry_with_name_property(with_setter: bool) -> ReflectionRegistry {
    let mut metadata = TypeMetadata::new();
    let getter: prism_reflect::GetterFn =
        Arc::new(|target| target.with(|p: &Person| p.name.clone()).map(boxed));
    let setter: Option<prism_reflect::SetterFn> = with_setter.then(|| {
        Arc::new(|target: &BoxedValue, value: &BoxedValue| {
            let name: String = value.try_cast().ok_or_else(|| MetaError::TypeMismatch {
                expected: "String".to_string(),
                actual: value.type_info().name().to_string(),
                operation: "set_property(name)",
            })?;
            target.with_mut(|p: &mut Person| p.name = name.clone())
        }) as prism_reflect::SetterFn
    });
    metadata.add_property(
        "name",
        getter,
        setter,
        boxed(String::new()),
        "the person's display name",
    );

    let registry = ReflectionRegistry::new();
    registry
        .register_type(&person_type_name(), metadata)
        .unwrap();
    registry
}

#[test]
fn property_get_and_set_round_trip() {
    let registry = registry_with_name_property(true);
    let target = boxed(Person::default());

    registry
        .set_property(&target, "name", &boxed("Ada".to_string()))
        .unwrap();
    let name = registry.get_property(&target, "name").unwrap();
    assert_eq!(name.try_cast::<String>().as_deref(), Some("Ada"));
}

#[test]
fn setterless_properties_are_readonly() {
    let registry = registry_with_name_property(false);
    let target = boxed(Person::default());
    let err = registry
        .set_property(&target, "name", &boxed("X".to_string()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReadOnly);
}

#[test]
fn missing_properties_are_not_found_and_accessor_errors_propagate() {
    let registry = registry_with_name_property(true);
    let target = boxed(Person::default());
    assert_eq!(
        registry
            .get_property(&target, "missing")
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );

    // A setter rejecting the value type surfaces unchanged.
    let err = registry
        .set_property(&target, "name", &boxed(12_i32))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

//////////////////////////////////////////////////////////////////////
// Constructors
//////////////////////////////////////////////////////////////////////

#[test]
fn constructors_dispatch_by_arity_and_registration_order() {
    let mut metadata = TypeMetadata::new();
    metadata.add_constructor(0, |_args| Ok(boxed(Person::default())));
    metadata.add_constructor(2, |args| {
        let name: String = arg(args, 0)?;
        let age: i64 = arg(args, 1)?;
        Ok(boxed(Person {
            name,
            age,
            address: String::new(),
        }))
    });

    let registry = ReflectionRegistry::new();
    let type_name = person_type_name();
    registry.register_type(&type_name, metadata).unwrap();

    let made = registry.create_instance(&type_name, &[]).unwrap();
    assert_eq!(made.try_cast::<Person>(), Some(Person::default()));

    let made = registry
        .create_instance(&type_name, &[boxed("Ada".to_string()), boxed(36_i64)])
        .unwrap();
    assert_eq!(
        made.with(|p: &Person| (p.name.clone(), p.age)).unwrap(),
        ("Ada".to_string(), 36)
    );

    // No constructor takes one argument.
    let err = registry
        .create_instance(&type_name, &[boxed(1_i64)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstructorFailure);

    // Indexed access follows registration order.
    assert!(registry.get_constructor(&type_name, 0).is_some());
    assert!(registry.get_constructor(&type_name, 1).is_some());
    assert!(registry.get_constructor(&type_name, 2).is_none());
}

#[test]
fn register_defaults_provides_ctor_events_and_print() {
    let registry = ReflectionRegistry::new();
    let type_name = person_type_name();
    registry.register_defaults::<Person>(&type_name).unwrap();

    let made = registry.create_instance(&type_name, &[]).unwrap();
    assert!(made.is_type::<Person>());

    // The default events exist; firing without listeners is a no-op.
    registry.fire_event(&made, "on_create", &[]).unwrap();

    let printed = registry.call_method(&made, "print", &[]).unwrap();
    assert!(printed.try_cast::<String>().is_some());
}

//////////////////////////////////////////////////////////////////////
// Events
//////////////////////////////////////////////////////////////////////

type EventLog = Arc<Mutex<Vec<&'static str>>>;

fn registry_with_event(log: &EventLog) -> ReflectionRegistry {
    let mut metadata = TypeMetadata::new();
    metadata.add_event("changed", "fires on mutation");
    for (label, priority) in [("high", 10), ("mid", 5), ("low", 0)] {
        let log = Arc::clone(log);
        metadata.add_listener("changed", move |_t, _a| log.lock().push(label), priority);
    }

    let registry = ReflectionRegistry::new();
    registry
        .register_type(&person_type_name(), metadata)
        .unwrap();
    registry
}

#[test]
fn listeners_fire_in_priority_order_with_stable_ties() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let registry = registry_with_event(&log);
    let target = boxed(Person::default());

    registry.fire_event(&target, "changed", &[]).unwrap();
    assert_eq!(*log.lock(), vec!["high", "mid", "low"]);

    // A second priority-5 listener lands after the existing one.
    let tied = Arc::clone(&log);
    registry
        .add_listener(
            &person_type_name(),
            "changed",
            move |_t, _a| tied.lock().push("mid2"),
            5,
        )
        .unwrap();

    log.lock().clear();
    registry.fire_event(&target, "changed", &[]).unwrap();
    assert_eq!(*log.lock(), vec!["high", "mid", "mid2", "low"]);
}

#[test]
fn unknown_events_are_not_found() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let registry = registry_with_event(&log);
    let err = registry
        .fire_event(&boxed(Person::default()), "missing", &[])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn event_arguments_reach_listeners() {
    let seen: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
    let registry = ReflectionRegistry::new();
    let mut metadata = TypeMetadata::new();
    let sink = Arc::clone(&seen);
    metadata.add_listener(
        "changed",
        move |_t, args| {
            if let Ok(v) = arg::<i64>(args, 0) {
                sink.lock().push(v);
            }
        },
        0,
    );
    registry
        .register_type(&person_type_name(), metadata)
        .unwrap();

    registry
        .fire_event(&boxed(Person::default()), "changed", &[boxed(41_i64)])
        .unwrap();
    assert_eq!(*seen.lock(), vec![41]);
}

#[test]
fn panicking_listeners_are_swallowed_by_default() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let registry = ReflectionRegistry::new();
    let mut metadata = TypeMetadata::new();
    metadata.add_listener("changed", |_t, _a| panic!("listener bug"), 10);
    let tail = Arc::clone(&log);
    metadata.add_listener("changed", move |_t, _a| tail.lock().push("tail"), 0);
    registry
        .register_type(&person_type_name(), metadata)
        .unwrap();

    // The panic is swallowed; the remaining listener still runs.
    registry
        .fire_event(&boxed(Person::default()), "changed", &[])
        .unwrap();
    assert_eq!(*log.lock(), vec!["tail"]);
}

#[test]
fn rethrow_policies_propagate_listener_panics() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let registry = ReflectionRegistry::new();
    let mut metadata = TypeMetadata::new();
    metadata.add_listener("changed", |_t, _a| panic!("first"), 10);
    let tail = Arc::clone(&log);
    metadata.add_listener("changed", move |_t, _a| tail.lock().push("tail"), 0);
    registry
        .register_type(&person_type_name(), metadata)
        .unwrap();
    let target = boxed(Person::default());

    registry.set_listener_panic_policy(ListenerPanicPolicy::RethrowImmediately);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _ = registry.fire_event(&target, "changed", &[]);
    }));
    assert!(outcome.is_err());
    // The tail listener never ran.
    assert!(log.lock().is_empty());

    registry.set_listener_panic_policy(ListenerPanicPolicy::RethrowAfterAll);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _ = registry.fire_event(&target, "changed", &[]);
    }));
    assert!(outcome.is_err());
    // This time the tail listener ran before the rethrow.
    assert_eq!(*log.lock(), vec!["tail"]);
}

#[test]
fn listeners_may_reenter_the_registry() {
    let registry = Arc::new(ReflectionRegistry::new());
    let mut metadata = TypeMetadata::new();
    metadata.add_method("status", |_t, _a| Ok(boxed("ok".to_string())));

    let reentrant = Arc::clone(&registry);
    metadata.add_listener(
        "changed",
        move |target, _args| {
            // No registry lock is held while listeners run, so calling
            // back in must not deadlock.
            let _ = reentrant.call_method(target, "status", &[]);
        },
        0,
    );
    registry
        .register_type(&person_type_name(), metadata)
        .unwrap();

    registry
        .fire_event(&boxed(Person::default()), "changed", &[])
        .unwrap();
}

//////////////////////////////////////////////////////////////////////
// Registration policies and dispatch by reference
//////////////////////////////////////////////////////////////////////

#[test]
fn duplicate_registration_follows_the_policy() {
    let registry = ReflectionRegistry::new();
    let type_name = person_type_name();
    registry
        .register_type(&type_name, TypeMetadata::new())
        .unwrap();
    let err = registry
        .register_type(&type_name, TypeMetadata::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyRegistered);

    registry.set_duplicate_policy(DuplicatePolicy::Ignore);
    assert!(registry.register_type(&type_name, TypeMetadata::new()).is_ok());

    assert_eq!(registry.registered_types(), vec![type_name.clone()]);
    assert!(registry.is_registered(&type_name));
    assert!(registry.lookup_entry(&type_name).is_some());
}

#[test]
fn borrowed_targets_dispatch_through_the_bare_name() {
    let registry = registry_with_updates();
    let mut person = Person::default();
    let target = unsafe { prism_value::boxed_ref(&mut person) };

    let out = registry
        .call_method(&target, "update", &[boxed("Ref".to_string()), boxed(1_i64)])
        .unwrap();
    assert_eq!(out.try_cast::<String>().as_deref(), Some("short"));
    drop(target);
    assert_eq!(person.name, "Ref");
}
