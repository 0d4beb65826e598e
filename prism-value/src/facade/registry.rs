//! Process-wide TypeId → vtable map, consulted at value construction.

use core::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

use crate::facade::{FacadeVTable, ProxyFn};

static FACADES: LazyLock<RwLock<HashMap<TypeId, Arc<FacadeVTable>>>> =
    LazyLock::new(|| RwLock::new(builtin_vtables()));

/// Register the capability vtable for a concrete type.
///
/// Values of the type constructed afterwards carry the vtable and dispatch
/// skills in O(1). Re-registering replaces the previous table (and is
/// logged); values built against the old table keep it.
pub fn register_facade(vtable: FacadeVTable) -> Arc<FacadeVTable> {
    let vtable = Arc::new(vtable);
    let previous = FACADES.write().insert(vtable.type_id(), Arc::clone(&vtable));
    if previous.is_some() {
        log::warn!(
            "facade registry: replacing vtable for {}",
            vtable.descriptor().name()
        );
    }
    vtable
}

/// The registered vtable for a concrete type, if any.
pub fn facade_for(type_id: TypeId) -> Option<Arc<FacadeVTable>> {
    FACADES.read().get(&type_id).cloned()
}

/// Vtables the crate ships for the standard scalar surface.
///
/// These carry the minimal default text encoding: strings double-quoted
/// with no escaping, booleans as `true`/`false`, numbers in decimal, the
/// unit type as `null`.
fn builtin_vtables() -> HashMap<TypeId, Arc<FacadeVTable>> {
    let mut map = HashMap::new();

    macro_rules! install {
        ($vt:expr) => {{
            let vt = Arc::new($vt);
            map.insert(vt.type_id(), vt);
        }};
    }

    macro_rules! install_scalars {
        ($($t:ty),* $(,)?) => {
            $(
                install!(
                    FacadeVTable::builder::<$t>()
                        .printable()
                        .stringable()
                        .comparable()
                        .ordered()
                        .serializable()
                        .cloneable()
                        .build()
                );
            )*
        };
    }

    install_scalars!(
        u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char,
        String,
    );

    // &str has no deserialize target, so no Serializable skill.
    install!(
        FacadeVTable::builder::<&'static str>()
            .printable()
            .stringable()
            .comparable()
            .ordered()
            .cloneable()
            .build()
    );

    // () has no Display; it still compares, clones and encodes as null.
    install!(
        FacadeVTable::builder::<()>()
            .comparable()
            .ordered()
            .serializable()
            .cloneable()
            .build()
    );

    install!(
        FacadeVTable::builder::<ProxyFn>()
            .printable()
            .stringable()
            .cloneable()
            .callable()
            .build()
    );

    map
}
