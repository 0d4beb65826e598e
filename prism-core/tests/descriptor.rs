//! Descriptor identity, bare equality and the JSON diagnostic form.

use std::collections::{BTreeSet, HashMap};

use prism_core::{TypeDescriptor, TypeTraits, describe_type, for_instance};

#[derive(Clone)]
struct Widget {
    #[allow(dead_code)]
    label: String,
}

describe_type!(Widget => CLASS | DEFAULT_CONSTRUCTIBLE | MOVABLE | COPYABLE);

#[test]
fn same_type_same_descriptor() {
    assert_eq!(TypeDescriptor::of::<i32>(), TypeDescriptor::of::<i32>());
    assert_ne!(TypeDescriptor::of::<i32>(), TypeDescriptor::of::<u32>());
    assert_eq!(TypeDescriptor::of::<Widget>(), TypeDescriptor::of::<Widget>());
}

#[test]
fn for_instance_matches_for_type() {
    let w = Widget {
        label: "x".to_string(),
    };
    assert_eq!(for_instance(&w), TypeDescriptor::of::<Widget>());
}

#[test]
fn bare_equality_ignores_decoration() {
    let plain = TypeDescriptor::of::<i32>();
    assert!(plain.bare_equals(&TypeDescriptor::of::<&'static i32>()));
    assert!(plain.bare_equals(&TypeDescriptor::of::<*const i32>()));
    assert!(plain.bare_equals(&TypeDescriptor::of::<Box<i32>>()));
    assert!(plain.bare_equals(&plain.as_reference()));
    assert!(plain.bare_equals(&plain.as_const()));
    assert!(!plain.bare_equals(&TypeDescriptor::of::<i64>()));
}

#[test]
fn decorated_descriptors_are_distinct_identities() {
    let plain = TypeDescriptor::of::<String>();
    let reference = plain.as_reference();
    assert_ne!(plain, reference);
    assert_eq!(reference.name(), "&alloc::string::String");
    assert_eq!(reference.bare_name(), plain.bare_name());
    assert!(reference.has_trait(TypeTraits::REFERENCE));
    assert!(!plain.has_trait(TypeTraits::REFERENCE));

    let constant = plain.as_const();
    assert!(constant.has_trait(TypeTraits::CONST));
    assert_ne!(constant, plain);
    assert_ne!(constant, reference);

    assert_eq!(reference.undecorated(), plain);
}

#[test]
fn undefined_descriptor_is_unique() {
    let undef = TypeDescriptor::undefined();
    assert_eq!(undef, TypeDescriptor::undefined());
    assert!(undef.is_undefined());
    assert!(undef.has_trait(TypeTraits::UNDEFINED));
    assert_ne!(undef, TypeDescriptor::of::<()>());
    assert_eq!(undef.name(), "undefined");
}

#[test]
fn descriptors_key_maps_and_order() {
    let mut map = HashMap::new();
    map.insert(TypeDescriptor::of::<i32>(), "int");
    map.insert(TypeDescriptor::of::<String>(), "string");
    assert_eq!(map.get(&TypeDescriptor::of::<i32>()), Some(&"int"));

    let mut set = BTreeSet::new();
    set.insert(TypeDescriptor::of::<i32>());
    set.insert(TypeDescriptor::of::<String>());
    set.insert(TypeDescriptor::of::<i32>());
    assert_eq!(set.len(), 2);

    // Distinct descriptors order strictly, one way or the other.
    let a = TypeDescriptor::of::<i32>();
    let b = TypeDescriptor::of::<String>();
    assert!(a.less(&b) ^ b.less(&a));
}

#[test]
fn trait_flags_reflect_declarations() {
    let scalar = TypeDescriptor::of::<f64>();
    assert!(scalar.has_trait(TypeTraits::ARITHMETIC));
    assert!(scalar.has_trait(TypeTraits::TRIVIAL));
    assert!(scalar.has_trait(TypeTraits::COPYABLE));

    let widget = TypeDescriptor::of::<Widget>();
    assert!(widget.has_trait(TypeTraits::CLASS));
    assert!(widget.has_trait(TypeTraits::DEFAULT_CONSTRUCTIBLE));
    assert!(!widget.has_trait(TypeTraits::ARITHMETIC));

    let array = TypeDescriptor::of::<[u8; 4]>();
    assert!(array.has_trait(TypeTraits::ARRAY));
    assert!(array.has_trait(TypeTraits::BOUNDED_ARRAY));
    assert!(array.has_trait(TypeTraits::TRIVIAL));
}

#[test]
fn to_json_has_the_documented_shape() {
    let json = TypeDescriptor::of::<i32>().to_json();
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");

    assert_eq!(parsed["typeName"], "i32");
    assert_eq!(parsed["bareTypeName"], "i32");
    let traits = parsed["traits"].as_object().expect("traits object");
    assert_eq!(traits.len(), 23);
    assert_eq!(traits["isArithmetic"], true);
    assert_eq!(traits["isTrivial"], true);
    assert_eq!(traits["isClass"], false);
    assert_eq!(traits["isUndefined"], false);
}

#[test]
fn to_json_emits_traits_in_bitset_order() {
    let json = TypeDescriptor::of::<bool>().to_json();
    let positions: Vec<usize> = ["isConst", "isReference", "isPointer", "isVoid", "isArithmetic"]
        .iter()
        .map(|key| json.find(key).expect("key present"))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(json.starts_with("{\"typeName\":"));
}
