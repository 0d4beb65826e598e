//! Conversion edges: directed functions between two descriptors.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;

use prism_core::{Describe, MetaError, TypeDescriptor};
use prism_value::{BoxedValue, boxed};

/// A conversion function: consumes a value of the edge's source type,
/// produces one of its target type.
pub type ConvertFn = Arc<dyn Fn(&BoxedValue) -> Result<BoxedValue, MetaError> + Send + Sync>;

/// Which half of an edge to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Inverse,
}

/// A directed conversion between two descriptors, optionally carrying its
/// inverse so both directions are stored together.
pub struct ConversionEdge {
    from: TypeDescriptor,
    to: TypeDescriptor,
    forward: ConvertFn,
    inverse: Option<ConvertFn>,
}

impl ConversionEdge {
    /// One-way edge.
    pub fn new<F>(from: TypeDescriptor, to: TypeDescriptor, forward: F) -> ConversionEdge
    where
        F: Fn(&BoxedValue) -> Result<BoxedValue, MetaError> + Send + Sync + 'static,
    {
        ConversionEdge {
            from,
            to,
            forward: Arc::new(forward),
            inverse: None,
        }
    }

    /// Bidirectional edge; the inverse is registered alongside the forward
    /// direction.
    pub fn bidirectional<F, G>(
        from: TypeDescriptor,
        to: TypeDescriptor,
        forward: F,
        inverse: G,
    ) -> ConversionEdge
    where
        F: Fn(&BoxedValue) -> Result<BoxedValue, MetaError> + Send + Sync + 'static,
        G: Fn(&BoxedValue) -> Result<BoxedValue, MetaError> + Send + Sync + 'static,
    {
        ConversionEdge {
            from,
            to,
            forward: Arc::new(forward),
            inverse: Some(Arc::new(inverse)),
        }
    }

    /// Source descriptor.
    pub fn from(&self) -> &TypeDescriptor {
        &self.from
    }

    /// Target descriptor.
    pub fn to(&self) -> &TypeDescriptor {
        &self.to
    }

    /// True when the edge carries an inverse.
    pub fn is_bidirectional(&self) -> bool {
        self.inverse.is_some()
    }

    pub(crate) fn apply(&self, dir: Direction, value: &BoxedValue) -> Result<BoxedValue, MetaError> {
        match dir {
            Direction::Forward => (self.forward)(value),
            Direction::Inverse => match &self.inverse {
                Some(inverse) => inverse(value),
                None => Err(MetaError::Internal {
                    detail: "inverse direction applied to a one-way edge".to_string(),
                }),
            },
        }
    }
}

/// Pull the typed payload an edge expects out of the incoming value.
fn expect_payload<T: Clone + 'static>(
    value: &BoxedValue,
    from: &str,
    to: &str,
) -> Result<T, MetaError> {
    value.try_cast::<T>().ok_or_else(|| MetaError::CastFailure {
        from: from.to_string(),
        to: to.to_string(),
        detail: format!("edge input holds {}", value.type_info()),
    })
}

/// Cast edge: static upcast via `From` forward, runtime-checked downcast
/// via `TryFrom` backwards.
///
/// A polymorphic hierarchy is modelled as a concrete handle type (an
/// `Arc<dyn Trait>` newtype, say) with `From<Derived>` and fallible
/// `TryFrom` back; the `TryFrom` failure surfaces as `CastFailure`.
pub fn cast_edge<A, B>() -> ConversionEdge
where
    A: Describe + Clone + Send + Sync + TryFrom<B>,
    B: Describe + Clone + Send + Sync + From<A>,
{
    let from = TypeDescriptor::of::<A>();
    let to = TypeDescriptor::of::<B>();
    let (fname, tname) = (from.name().to_string(), to.name().to_string());
    let (fname2, tname2) = (fname.clone(), tname.clone());
    ConversionEdge::bidirectional(
        from,
        to,
        move |value| {
            let a: A = expect_payload(value, &fname, &tname)?;
            Ok(boxed(B::from(a)))
        },
        move |value| {
            let b: B = expect_payload(value, &tname2, &fname2)?;
            A::try_from(b).map(boxed).map_err(|_| MetaError::CastFailure {
                from: tname2.clone(),
                to: fname2.clone(),
                detail: "runtime value is not an instance of the target type".to_string(),
            })
        },
    )
}

/// Convert every element of an ordered collection, aborting on the first
/// rejected element. Partial output is discarded by the abort.
fn convert_elements<A, B, E>(
    items: impl IntoIterator<Item = A>,
    from: &str,
    to: &str,
) -> Result<E, MetaError>
where
    B: TryFrom<A>,
    E: FromIterator<B>,
{
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            B::try_from(item).map_err(|_| MetaError::CastFailure {
                from: from.to_string(),
                to: to.to_string(),
                detail: format!("element {index} is not convertible"),
            })
        })
        .collect()
}

macro_rules! container_edge {
    (
        $(#[$doc:meta])*
        $name:ident, $container:ident, [$($extra:tt)*]
    ) => {
        $(#[$doc])*
        pub fn $name<A, B>() -> ConversionEdge
        where
            A: Describe + Clone + Send + Sync + TryFrom<B> $($extra)*,
            B: Describe + Clone + Send + Sync + From<A> $($extra)*,
        {
            let from = TypeDescriptor::of::<$container<A>>();
            let to = TypeDescriptor::of::<$container<B>>();
            let (fname, tname) = (from.name().to_string(), to.name().to_string());
            let (fname2, tname2) = (fname.clone(), tname.clone());
            ConversionEdge::bidirectional(
                from,
                to,
                move |value| {
                    let items: $container<A> = expect_payload(value, &fname, &tname)?;
                    let out: $container<B> = items
                        .into_iter()
                        .map(B::from)
                        .collect();
                    Ok(boxed(out))
                },
                move |value| {
                    let items: $container<B> = expect_payload(value, &tname2, &fname2)?;
                    let out: $container<A> =
                        convert_elements::<B, A, $container<A>>(items, &tname2, &fname2)?;
                    Ok(boxed(out))
                },
            )
        }
    };
}

container_edge! {
    /// Elementwise `Vec<A>` ↔ `Vec<B>` conversion over a registered-style
    /// `From`/`TryFrom` pair. Shape (length, order) is preserved; the
    /// first failing element aborts with `CastFailure`.
    seq_edge, Vec, []
}

container_edge! {
    /// Elementwise unordered-set conversion.
    set_edge, HashSet, [+ Eq + Hash]
}

container_edge! {
    /// Elementwise ordered-set conversion.
    btree_set_edge, BTreeSet, [+ Ord]
}

/// Elementwise map-value conversion: `HashMap<K, A>` ↔ `HashMap<K, B>`.
/// Keys are cloned, values run through the `From`/`TryFrom` pair.
pub fn map_edge<K, A, B>() -> ConversionEdge
where
    K: Describe + Clone + Send + Sync + Eq + Hash,
    A: Describe + Clone + Send + Sync + TryFrom<B>,
    B: Describe + Clone + Send + Sync + From<A>,
{
    let from = TypeDescriptor::of::<HashMap<K, A>>();
    let to = TypeDescriptor::of::<HashMap<K, B>>();
    let (fname, tname) = (from.name().to_string(), to.name().to_string());
    let (fname2, tname2) = (fname.clone(), tname.clone());
    ConversionEdge::bidirectional(
        from,
        to,
        move |value| {
            let items: HashMap<K, A> = expect_payload(value, &fname, &tname)?;
            let out: HashMap<K, B> = items.into_iter().map(|(k, v)| (k, B::from(v))).collect();
            Ok(boxed(out))
        },
        move |value| {
            let items: HashMap<K, B> = expect_payload(value, &tname2, &fname2)?;
            let out: HashMap<K, A> = items
                .into_iter()
                .map(|(k, v)| {
                    A::try_from(v)
                        .map(|v| (k, v))
                        .map_err(|_| MetaError::CastFailure {
                            from: tname2.clone(),
                            to: fname2.clone(),
                            detail: "map value is not convertible".to_string(),
                        })
                })
                .collect::<Result<_, _>>()?;
            Ok(boxed(out))
        },
    )
}

/// Parse edge: `String` ↔ `T` through `FromStr`/`ToString`, for
/// string↔domain-type conversions. A parse failure surfaces as
/// `CastFailure`.
pub fn parse_edge<T>() -> ConversionEdge
where
    T: Describe + Clone + Send + Sync + ToString + FromStr,
{
    let from = TypeDescriptor::of::<String>();
    let to = TypeDescriptor::of::<T>();
    let (fname, tname) = (from.name().to_string(), to.name().to_string());
    let (fname2, tname2) = (fname.clone(), tname.clone());
    ConversionEdge::bidirectional(
        from,
        to,
        move |value| {
            let text: String = expect_payload(value, &fname, &tname)?;
            text.parse::<T>()
                .map(boxed)
                .map_err(|_| MetaError::CastFailure {
                    from: fname.clone(),
                    to: tname.clone(),
                    detail: format!("{text:?} does not parse"),
                })
        },
        move |value| {
            let v: T = expect_payload(value, &tname2, &fname2)?;
            Ok(boxed(v.to_string()))
        },
    )
}
