//! The conversion graph: edge table, shortest-path search, memo cache.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use parking_lot::RwLock;
use prism_core::{Describe, DescriptorId, MetaError, TypeDescriptor};
use prism_value::BoxedValue;

use crate::edge::{ConversionEdge, Direction};

type AdjacencyRow = IndexMap<DescriptorId, (Arc<ConversionEdge>, Direction)>;

struct GraphInner {
    /// Outgoing adjacency, insertion-ordered: the BFS visit order (and
    /// therefore the shortest-path tie-break) is registration order.
    edges: IndexMap<DescriptorId, AdjacencyRow>,
    /// Descriptor lookup for path reconstruction.
    descriptors: HashMap<DescriptorId, TypeDescriptor>,
    /// Memoized `(from, to)` → node sequence. Cleared on any edge
    /// mutation.
    cache: HashMap<(DescriptorId, DescriptorId), Vec<DescriptorId>>,
}

/// Registry of directed conversions between descriptors.
///
/// At most one conversion exists per ordered `(from, to)` pair;
/// re-registering replaces it (logged). A bidirectional edge stores its
/// forward and inverse halves together and contributes an outgoing edge to
/// both endpoints.
///
/// `convert` applies the fewest-edges route between two descriptors;
/// routes are discovered breadth-first and memoized. Edge callables run
/// with no graph lock held.
pub struct ConversionGraph {
    inner: RwLock<GraphInner>,
    cache_enabled: bool,
}

impl Default for ConversionGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionGraph {
    /// An empty graph with path caching enabled.
    pub fn new() -> ConversionGraph {
        ConversionGraph::with_cache(true)
    }

    /// An empty graph; `cache_enabled` controls path memoization.
    pub fn with_cache(cache_enabled: bool) -> ConversionGraph {
        ConversionGraph {
            inner: RwLock::new(GraphInner {
                edges: IndexMap::new(),
                descriptors: HashMap::new(),
                cache: HashMap::new(),
            }),
            cache_enabled,
        }
    }

    /// Register an edge. Replaces any existing conversion for the same
    /// ordered pair; a bidirectional edge also claims the reverse pair.
    pub fn register(&self, edge: ConversionEdge) {
        let edge = Arc::new(edge);
        let (from, to) = (edge.from().clone(), edge.to().clone());
        let mut inner = self.inner.write();
        inner.descriptors.insert(from.id(), from.clone());
        inner.descriptors.insert(to.id(), to.clone());
        let replaced = inner
            .edges
            .entry(from.id())
            .or_default()
            .insert(to.id(), (Arc::clone(&edge), Direction::Forward));
        if replaced.is_some() {
            log::warn!("conversion graph: replacing edge {from} -> {to}");
        }
        if edge.is_bidirectional() {
            inner
                .edges
                .entry(to.id())
                .or_default()
                .insert(from.id(), (Arc::clone(&edge), Direction::Inverse));
        }
        inner.cache.clear();
    }

    /// Remove the conversion for one ordered pair. Each direction of a
    /// bidirectional edge is removed separately. Returns whether an edge
    /// was removed.
    pub fn unregister(&self, from: &TypeDescriptor, to: &TypeDescriptor) -> bool {
        let mut inner = self.inner.write();
        let removed = inner
            .edges
            .get_mut(&from.id())
            .and_then(|row| row.shift_remove(&to.id()))
            .is_some();
        if removed {
            inner.cache.clear();
        }
        removed
    }

    /// True when a route (of any length) exists.
    pub fn can_convert(&self, from: &TypeDescriptor, to: &TypeDescriptor) -> bool {
        self.find_path(from.id(), to.id()).is_some()
    }

    /// Compatibility in the loose sense: same bare type, or a route in
    /// either direction.
    pub fn compatible(&self, a: &TypeDescriptor, b: &TypeDescriptor) -> bool {
        a.bare_equals(b) || self.can_convert(a, b) || self.can_convert(b, a)
    }

    /// The node sequence `convert` would traverse, for diagnostics.
    pub fn path_between(
        &self,
        from: &TypeDescriptor,
        to: &TypeDescriptor,
    ) -> Option<Vec<TypeDescriptor>> {
        let ids = self.find_path(from.id(), to.id())?;
        let inner = self.inner.read();
        Some(
            ids.iter()
                .map(|id| {
                    inner
                        .descriptors
                        .get(id)
                        .cloned()
                        .unwrap_or_else(TypeDescriptor::undefined)
                })
                .collect(),
        )
    }

    /// Convert `value` from `from` to `to` along the shortest registered
    /// route.
    ///
    /// Fails with `NoPath` when no route exists and `CastFailure` when an
    /// edge rejects the runtime value; the input value is never mutated,
    /// and partial results are discarded.
    pub fn convert(
        &self,
        from: &TypeDescriptor,
        to: &TypeDescriptor,
        value: &BoxedValue,
    ) -> Result<BoxedValue, MetaError> {
        let path = self
            .find_path(from.id(), to.id())
            .ok_or_else(|| MetaError::NoPath {
                from: from.name().to_string(),
                to: to.name().to_string(),
            })?;
        if path.len() <= 1 {
            return Ok(value.clone());
        }
        // Resolve the hops under the read lock, run them after release.
        let hops: Vec<(Arc<ConversionEdge>, Direction)> = {
            let inner = self.inner.read();
            path.windows(2)
                .map(|pair| inner.edges.get(&pair[0]).and_then(|row| row.get(&pair[1]).cloned()))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| MetaError::Internal {
                    detail: "conversion path references a removed edge".to_string(),
                })?
        };
        let mut current = value.clone();
        for (edge, direction) in hops {
            current = edge.apply(direction, &current)?;
        }
        Ok(current)
    }

    /// Convert `value` to `To` by trying every registered edge ending in
    /// `To`, in registration order; the first edge that accepts the value
    /// wins.
    pub fn convert_to<To: Describe>(&self, value: &BoxedValue) -> Result<BoxedValue, MetaError> {
        let to = TypeDescriptor::of::<To>();
        let candidates: Vec<(Arc<ConversionEdge>, Direction)> = {
            let inner = self.inner.read();
            inner
                .edges
                .values()
                .filter_map(|row| row.get(&to.id()).cloned())
                .collect()
        };
        for (edge, direction) in candidates {
            if let Ok(converted) = edge.apply(direction, value) {
                return Ok(converted);
            }
        }
        Err(MetaError::NoPath {
            from: value.type_info().name().to_string(),
            to: to.name().to_string(),
        })
    }

    /// Breadth-first search from `from`; first arrival at `to` is the
    /// shortest route. The discovered node sequence is memoized until the
    /// next edge mutation.
    fn find_path(&self, from: DescriptorId, to: DescriptorId) -> Option<Vec<DescriptorId>> {
        if from == to {
            return Some(vec![from]);
        }
        if self.cache_enabled
            && let Some(path) = self.inner.read().cache.get(&(from, to))
        {
            return Some(path.clone());
        }

        let path = {
            let inner = self.inner.read();
            let mut prev: HashMap<DescriptorId, DescriptorId> = HashMap::new();
            let mut queue = VecDeque::from([from]);
            let mut found = false;
            'bfs: while let Some(node) = queue.pop_front() {
                let Some(row) = inner.edges.get(&node) else {
                    continue;
                };
                for next in row.keys().copied() {
                    if next == from || prev.contains_key(&next) {
                        continue;
                    }
                    prev.insert(next, node);
                    if next == to {
                        found = true;
                        break 'bfs;
                    }
                    queue.push_back(next);
                }
            }
            if !found {
                return None;
            }
            let mut path = vec![to];
            let mut cursor = to;
            while cursor != from {
                cursor = *prev.get(&cursor)?;
                path.push(cursor);
            }
            path.reverse();
            path
        };

        log::trace!("conversion graph: discovered path of {} hop(s)", path.len() - 1);
        if self.cache_enabled {
            self.inner.write().cache.insert((from, to), path.clone());
        }
        Some(path)
    }
}

/// The process-wide conversion graph. Lazily initialized on first touch.
pub fn conversion_graph() -> &'static ConversionGraph {
    static GRAPH: LazyLock<ConversionGraph> = LazyLock::new(ConversionGraph::new);
    &GRAPH
}
