//! Ordering & plugin kind resolution
//!
//! Containers in a FOMOD file declare how their children are presented.
//! Names compare by code point; sorting is stable so equal names keep their
//! document order.

use tracing::debug;

use crate::config::{Named, OrderedList, TypeDescriptor};
use crate::logic::dependency::{FactSource, is_satisfied};
use crate::types::{Order, PluginKind};

/// Document positions of the children of `list`, in presentation order
pub fn ordered_indices<T: Named>(list: &OrderedList<T>) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..list.items.len()).collect();
    let name = |i: &usize| list.items[*i].name();
    match list.order {
        Order::Explicit => {}
        Order::Ascending => indices.sort_by(|a, b| name(a).cmp(name(b))),
        Order::Descending => indices.sort_by(|a, b| name(b).cmp(name(a))),
    }
    indices
}

/// Children of `list` in presentation order
pub fn ordered_children<T: Named>(list: &OrderedList<T>) -> Vec<&T> {
    ordered_indices(list).into_iter().map(|i| &list.items[i]).collect()
}

/// Effective kind of a plugin under the current facts.
///
/// A fixed `type` wins; otherwise the first pattern whose dependencies hold
/// supplies the kind, falling back to the default. Pattern failures are not
/// errors, they just mean the pattern does not apply.
pub fn resolve_plugin_kind(descriptor: &TypeDescriptor, facts: &impl FactSource) -> PluginKind {
    match descriptor {
        TypeDescriptor::Fixed(kind) => *kind,
        TypeDescriptor::Conditional { default, patterns } => {
            let resolved = patterns
                .iter()
                .find(|pattern| is_satisfied(pattern.dependencies.as_ref(), facts))
                .map(|pattern| pattern.kind)
                .unwrap_or(*default);
            debug!(kind = %resolved, "resolved conditional plugin type");
            resolved
        }
    }
}
