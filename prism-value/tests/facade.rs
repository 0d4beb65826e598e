//! Capability probing, skill dispatch and the fallback matrix.

use core::fmt;

use prism_core::{ErrorKind, MetaError, describe_type};
use prism_value::{
    BoxedValue, DynCall, FacadeVTable, ProxyFn, Skill, TextSerial, boxed, boxed_with_flags,
    probe_facade, register_facade,
};

/// Satisfies no capability at all.
struct Opaque;

describe_type!(Opaque => CLASS | MOVABLE);

/// Satisfies every capability.
#[derive(Clone, PartialEq, PartialOrd)]
struct Reading(f64);

describe_type!(Reading => CLASS | MOVABLE | COPYABLE | FINAL);

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}dB", self.0)
    }
}

impl TextSerial for Reading {
    fn serialize(&self) -> String {
        self.0.to_string()
    }

    fn deserialize(&mut self, text: &str) -> bool {
        match text.trim().parse::<f64>() {
            Ok(v) => {
                self.0 = v;
                true
            }
            Err(_) => false,
        }
    }
}

impl DynCall for Reading {
    fn dyn_call(&self, args: &[BoxedValue]) -> Result<BoxedValue, MetaError> {
        // Zero-argument invocation yields the raw level.
        if args.is_empty() {
            Ok(boxed(self.0))
        } else {
            Err(MetaError::ArgumentMismatch {
                detail: "Reading takes no arguments".to_string(),
            })
        }
    }
}

const ALL_SKILLS: [Skill; 6] = [
    Skill::Printable,
    Skill::Stringable,
    Skill::Comparable,
    Skill::Serializable,
    Skill::Cloneable,
    Skill::Callable,
];

#[test]
fn probe_discovers_every_satisfied_capability() {
    let vt = probe_facade!(Reading);
    assert!(vt.print.is_some());
    assert!(vt.to_string.is_some());
    assert!(vt.equals.is_some());
    assert!(vt.less.is_some());
    assert!(vt.serialize.is_some());
    assert!(vt.deserialize.is_some());
    assert!(vt.clone_fn.is_some());
    assert!(vt.call.is_some());
    for skill in ALL_SKILLS {
        assert!(vt.supports(skill), "missing {}", skill.name());
    }
}

#[test]
fn probe_leaves_unsatisfied_capabilities_absent() {
    let vt = probe_facade!(Opaque);
    for skill in ALL_SKILLS {
        assert!(!vt.supports(skill), "unexpected {}", skill.name());
    }
}

#[test]
fn capability_free_type_raises_unsupported_everywhere() {
    let value = boxed(Opaque);

    assert_eq!(
        value.serialize().unwrap_err().kind(),
        ErrorKind::Unsupported
    );
    assert_eq!(
        value.deserialize_into("x").unwrap_err().kind(),
        ErrorKind::Unsupported
    );
    assert_eq!(
        value.clone_value().unwrap_err().kind(),
        ErrorKind::Unsupported
    );
    assert_eq!(
        value.call_value(&[]).unwrap_err().kind(),
        ErrorKind::Unsupported
    );
    for skill in ALL_SKILLS {
        assert!(!value.has_skill(skill));
    }
}

#[test]
fn fully_capable_type_raises_nothing() {
    register_facade(probe_facade!(Reading));
    let value = boxed(Reading(3.5));

    for skill in ALL_SKILLS {
        assert!(value.has_skill(skill));
    }
    assert_eq!(value.serialize().unwrap(), "3.5");
    value.deserialize_into("4.5").unwrap();
    assert_eq!(value.try_cast::<Reading>().map(|r| r.0), Some(4.5));
    let copy = value.clone_value().unwrap();
    assert!(copy.skill_eq(&value));
    assert_eq!(value.call_value(&[]).unwrap().try_cast::<f64>(), Some(4.5));
    assert_eq!(value.to_display_string(), "4.5dB");
}

#[test]
fn builtin_scalars_use_the_minimal_encoding() {
    assert_eq!(boxed(42_i32).serialize().unwrap(), "42");
    assert_eq!(boxed(2.5_f64).serialize().unwrap(), "2.5");
    assert_eq!(boxed(true).serialize().unwrap(), "true");
    assert_eq!(
        boxed(String::from("plain")).serialize().unwrap(),
        "\"plain\""
    );
    assert_eq!(boxed(()).serialize().unwrap(), "null");
}

#[test]
fn serialize_round_trips_through_deserialize() {
    let source = boxed(1234_i64);
    let text = source.serialize().unwrap();

    let target = boxed(0_i64);
    target.deserialize_into(&text).unwrap();
    assert!(source.skill_eq(&target));

    let quoted = boxed(String::from("text value"));
    let text = quoted.serialize().unwrap();
    let back = boxed(String::new());
    back.deserialize_into(&text).unwrap();
    assert_eq!(back.try_cast::<String>().as_deref(), Some("text value"));
}

#[test]
fn deserialize_respects_readonly_and_rejects_garbage() {
    let readonly = boxed_with_flags(1_i32, false, true);
    assert_eq!(
        readonly.deserialize_into("2").unwrap_err().kind(),
        ErrorKind::ReadOnly
    );

    let target = boxed(1_i32);
    let err = target.deserialize_into("not a number").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CastFailure);
    // The payload is untouched by the rejected decode.
    assert_eq!(target.try_cast::<i32>(), Some(1));
}

#[test]
fn comparison_requires_the_skill_on_both_sides() {
    assert!(boxed(3_i32).skill_eq(&boxed(3_i32)));
    assert!(!boxed(3_i32).skill_eq(&boxed(4_i32)));
    assert!(boxed(3_i32).skill_lt(&boxed(4_i32)));
    assert!(boxed(1_i32) < boxed(2_i32));
    assert!(boxed(2_i32) == boxed(2_i32));

    // Heterogeneous concrete types never compare equal.
    assert!(!boxed(1_i32).skill_eq(&boxed(1_i64)));
    assert_eq!(boxed(1_i32).partial_cmp(&boxed(2_i64)), None);

    // Capability-free values are never equal, never less, even to
    // themselves.
    let opaque = boxed(Opaque);
    assert!(!opaque.skill_eq(&opaque.clone()));
    assert!(!opaque.skill_lt(&boxed(Opaque)));
}

#[test]
fn print_and_string_fallbacks() {
    let mut out = String::new();
    boxed(7_u8).print_to(&mut out).unwrap();
    assert_eq!(out, "7");

    // Printable absent: the debug rendering is streamed instead.
    let mut out = String::new();
    boxed(Opaque).print_to(&mut out).unwrap();
    assert!(out.ends_with(":<opaque>"));

    // Stringable absent: the descriptor name stands in.
    let rendered = boxed(Opaque).to_display_string();
    assert!(rendered.contains("Opaque"));
}

#[test]
fn clone_value_is_a_deep_copy_sharing_attributes() {
    let source = boxed(String::from("original"));
    source.set_attr("tag", boxed(1_i32)).unwrap();

    let copy = source.clone_value().unwrap();
    assert_eq!(copy.try_cast::<String>().as_deref(), Some("original"));

    // Payloads are independent...
    source
        .with_mut(|s: &mut String| *s = String::from("changed"))
        .unwrap();
    assert_eq!(copy.try_cast::<String>().as_deref(), Some("original"));

    // ...but the attribute map is the shared one.
    copy.set_attr("tag", boxed(2_i32)).unwrap();
    assert_eq!(
        source.get_attr("tag").unwrap().try_cast::<i32>(),
        Some(2)
    );
}

#[test]
fn proxy_functions_carry_the_callable_skill() {
    let add = ProxyFn::new("add", |args| {
        let a = args[0]
            .try_cast::<i64>()
            .ok_or_else(|| MetaError::ArgumentMismatch {
                detail: "first argument must be an i64".to_string(),
            })?;
        let b = args[1]
            .try_cast::<i64>()
            .ok_or_else(|| MetaError::ArgumentMismatch {
                detail: "second argument must be an i64".to_string(),
            })?;
        Ok(boxed(a + b))
    })
    .with_description("sum of two integers")
    .with_arity(2);

    assert_eq!(add.name(), "add");
    assert_eq!(add.arity(), Some(2));
    assert_eq!(add.invoke(&[boxed(2_i64), boxed(3_i64)]).unwrap().try_cast::<i64>(), Some(5));

    let value = boxed(add);
    assert!(value.has_skill(Skill::Callable));
    assert_eq!(
        value
            .call_value(&[boxed(20_i64), boxed(22_i64)])
            .unwrap()
            .try_cast::<i64>(),
        Some(42)
    );
    assert_eq!(
        value.call_value(&[]).unwrap_err().kind(),
        ErrorKind::ArgumentMismatch
    );
    assert_eq!(value.to_display_string(), "fn add/2");
}

#[test]
fn vtables_can_be_built_explicitly() {
    #[derive(Clone, PartialEq)]
    struct Narrow(u8);

    describe_type!(Narrow => CLASS | MOVABLE | COPYABLE);

    // Only what the builder was asked for is advertised.
    let vt = FacadeVTable::builder::<Narrow>().comparable().cloneable().build();
    assert!(vt.supports(Skill::Comparable));
    assert!(vt.supports(Skill::Cloneable));
    assert!(!vt.supports(Skill::Printable));
    assert!(!vt.supports(Skill::Serializable));

    register_facade(vt);
    let value = boxed(Narrow(9));
    assert!(value.skill_eq(&boxed(Narrow(9))));
    assert_eq!(value.serialize().unwrap_err().kind(), ErrorKind::Unsupported);
}

#[test]
fn invoke_skill_is_the_uniform_entry_point() {
    let value = boxed(21_i32);

    let printed = value.invoke_skill(Skill::Printable, &[]).unwrap();
    assert_eq!(printed.try_cast::<String>().as_deref(), Some("21"));

    let equal = value.invoke_skill(Skill::Comparable, &[boxed(21_i32)]).unwrap();
    assert_eq!(equal.try_cast::<bool>(), Some(true));

    let text = value.invoke_skill(Skill::Serializable, &[]).unwrap();
    assert_eq!(text.try_cast::<String>().as_deref(), Some("21"));

    value
        .invoke_skill(Skill::Serializable, &[boxed(String::from("42"))])
        .unwrap();
    assert_eq!(value.try_cast::<i32>(), Some(42));

    let copy = value.invoke_skill(Skill::Cloneable, &[]).unwrap();
    assert!(copy.skill_eq(&value));

    // Wrong argument shapes reject instead of guessing.
    assert_eq!(
        value
            .invoke_skill(Skill::Comparable, &[])
            .unwrap_err()
            .kind(),
        ErrorKind::ArgumentMismatch
    );
    assert_eq!(
        boxed(Opaque)
            .invoke_skill(Skill::Callable, &[])
            .unwrap_err()
            .kind(),
        ErrorKind::Unsupported
    );
}

#[test]
fn void_values_refuse_skill_calls_that_need_a_payload() {
    let void = prism_value::boxed_void();
    assert_eq!(void.serialize().unwrap_err().kind(), ErrorKind::Undefined);
    assert_eq!(void.call_value(&[]).unwrap_err().kind(), ErrorKind::Undefined);
    // Cloning void is just void again.
    assert!(void.clone_value().unwrap().is_undefined());
}
