//! Exception registry
//!
//! Rebuilds a typed [`RtiError`] from the (name, details) pair the coordinator
//! puts on the wire. Lookup goes through a table built once from
//! [`RtiError::KINDS`] plus the legacy aliases below.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::{RtiError, RtiResult};

type Constructor = fn(String) -> RtiError;

/// Wire names from the newer API vocabulary mapped onto the fault kind that
/// carries the same meaning in this one.
pub const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("CouldNotOpenFOM", "CouldNotOpenFDD"),
    ("ErrorReadingFOM", "ErrorReadingFDD"),
    ("Unauthorized", "ConnectionFailed"),
];

fn registry() -> &'static HashMap<&'static str, Constructor> {
    static REGISTRY: OnceLock<HashMap<&'static str, Constructor>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<&'static str, Constructor> = RtiError::KINDS.iter().copied().collect();
        for &(alias, target) in LEGACY_ALIASES {
            if let Some(make) = map.get(target).copied() {
                map.insert(alias, make);
            }
        }
        map
    })
}

/// Whether `name` resolves to a typed fault kind.
pub fn is_registered(name: &str) -> bool {
    registry().contains_key(name)
}

/// Build the fault named `name`.
///
/// Unregistered names never get dropped: they come back as
/// [`RtiError::Unexpected`] holding both the name and the details.
pub fn create(name: &str, details: &str) -> RtiError {
    match registry().get(name) {
        Some(make) => make(details.to_owned()),
        None => RtiError::Unexpected {
            name: name.to_owned(),
            details: details.to_owned(),
        },
    }
}

/// Build the fault named `name` and return it as an `Err`, for use with `?`.
pub fn raise<T>(name: &str, details: &str) -> RtiResult<T> {
    Err(create(name, details))
}
