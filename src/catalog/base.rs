//! Base-image chain resolution
//!
//! An image's recipe declares its starting point on the first line. A
//! `FROM` reference under the managed namespace points at another catalog
//! image and the chain continues; anything else is an external root and
//! the chain stops.

use crate::catalog::{Catalog, ImageSpec};
use crate::error::{StalecheckError, StalecheckResult};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;

/// Read the base reference declared by an image's recipe.
///
/// Returns `None` when the base is an external, unmanaged image. A missing
/// recipe file is fatal; there is no meaningful decision without it.
pub fn declared_base(spec: &ImageSpec, namespace: &str) -> StalecheckResult<Option<String>> {
    let path = spec.dockerfile();
    let contents = fs::read_to_string(&path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            StalecheckError::RecipeNotFound {
                image: spec.name().to_string(),
                path: path.clone(),
            }
        } else {
            StalecheckError::io(format!("reading {}", path.display()), e)
        }
    })?;

    Ok(parse_base(contents.lines().next().unwrap_or(""), namespace))
}

/// Extract a managed base name from a recipe's first line.
fn parse_base(first_line: &str, namespace: &str) -> Option<String> {
    let reference = first_line
        .trim()
        .strip_prefix("FROM ")?
        .split_whitespace()
        .next()?;
    let name = reference.strip_prefix(namespace)?.strip_prefix('/')?;
    let name = name.split(':').next().unwrap_or(name);
    (!name.is_empty()).then(|| name.to_string())
}

/// Walk base references from `name` to the external root.
///
/// Returns the chain starting at `name`, each element the base of the one
/// before it. A repeated name means the recipes declare a cycle; that is
/// not a supported input and fails fast rather than recursing forever.
pub fn base_chain(
    catalog: &Catalog,
    name: &str,
    namespace: &str,
) -> StalecheckResult<Vec<String>> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = name.to_string();

    loop {
        if !seen.insert(current.clone()) {
            chain.push(current);
            return Err(StalecheckError::BaseChainCycle {
                image: name.to_string(),
                chain: chain.join(" -> "),
            });
        }
        chain.push(current.clone());

        match declared_base(catalog.get(&current)?, namespace)? {
            Some(base) => current = base,
            None => break,
        }
    }

    Ok(chain)
}
