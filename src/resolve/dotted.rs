//
//  dotted.rs
//  Lattice
//
//  Created by hak (tharun)
//

use std::collections::HashSet;

use super::rank::filter_overloads;
use super::KindFilter;
use crate::symbol::{Symbol, SymbolIndex};

/// Bound on id-segment scans so a hostile index cannot stall a query.
const MAX_ID_SCAN: usize = 100;

/// Result of one dotted-resolution attempt: the surviving candidates
/// and the strategy that produced them.
pub struct DottedHit<'a> {
    pub candidates: Vec<&'a Symbol>,
    pub strategy: &'static str,
}

/// `Type.method` resolution. Strategies run in order; the first that
/// yields candidates passing the kind filter wins.
pub fn resolve_dotted<'a>(
    index: &'a SymbolIndex,
    type_name: &str,
    method_name: &str,
    filter: KindFilter,
    max_depth: usize,
) -> Option<DottedHit<'a>> {
    // (a) Receiver match: parser recorded the enclosing type.
    let exact_receiver: Vec<&Symbol> = index
        .named(method_name)
        .into_iter()
        .filter(|s| s.receiver == type_name && filter.accepts(s.kind))
        .collect();
    if !exact_receiver.is_empty() {
        return Some(DottedHit {
            candidates: filter_overloads(exact_receiver),
            strategy: "receiver_match",
        });
    }

    // (b) Id match: the dotted name is embedded in the symbol id.
    let segment = format!(":{}.{}", type_name, method_name);
    let id_hits: Vec<&Symbol> = index
        .ids_containing(&segment, MAX_ID_SCAN)
        .into_iter()
        .filter(|s| filter.accepts(s.kind))
        .collect();
    if !id_hits.is_empty() {
        return Some(DottedHit {
            candidates: filter_overloads(id_hits),
            strategy: "id_match",
        });
    }

    // (c) Parent class: direct children of the named type. A child on
    // the named type always wins over any ancestor's.
    let types: Vec<&Symbol> = index
        .named(type_name)
        .into_iter()
        .filter(|s| s.kind.is_type())
        .collect();

    let direct: Vec<&Symbol> = types
        .iter()
        .flat_map(|t| children_named(index, t, method_name))
        .filter(|s| filter.accepts(s.kind))
        .collect();
    if !direct.is_empty() {
        return Some(DottedHit {
            candidates: filter_overloads(direct),
            strategy: "children",
        });
    }

    // (d) Inheritance walk up the extends chain.
    for t in &types {
        let inherited: Vec<&Symbol> = find_in_ancestors(index, t, method_name, max_depth)
            .into_iter()
            .filter(|s| filter.accepts(s.kind))
            .collect();
        if !inherited.is_empty() {
            return Some(DottedHit {
                candidates: filter_overloads(inherited),
                strategy: "inheritance",
            });
        }
    }

    // (e) Receiver prefix, boundary-aware. Exact matches were handled
    // by (a).
    let prefixed: Vec<&Symbol> = index
        .named(method_name)
        .into_iter()
        .filter(|s| receiver_has_prefix(&s.receiver, type_name) && filter.accepts(s.kind))
        .collect();
    if !prefixed.is_empty() {
        return Some(DottedHit {
            candidates: filter_overloads(prefixed),
            strategy: "receiver_prefix",
        });
    }

    None
}

/// Children of `parent` named `method`. Children are matched on the
/// nested entities the parser attached, not on the flat index.
fn children_named<'a>(
    index: &'a SymbolIndex,
    parent: &'a Symbol,
    method: &str,
) -> Vec<&'a Symbol> {
    parent
        .children
        .iter()
        .filter(|c| c.name == method)
        // Children were flat-indexed on add; prefer the indexed copy so
        // re-adds are honored.
        .map(|c| index.get(&c.id).unwrap_or(c))
        .collect()
}

/// Walk `extends` upward from `origin`, breadth-first, with cycle
/// detection and a hard depth cap. Qualified base names are stripped to
/// their last segment ("generic.NDFrame" -> "NDFrame"). Returns the
/// first ancestor level that defines `method`.
fn find_in_ancestors<'a>(
    index: &'a SymbolIndex,
    origin: &'a Symbol,
    method: &str,
    max_depth: usize,
) -> Vec<&'a Symbol> {
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(origin.name.clone());

    let mut level: Vec<&Symbol> = vec![origin];
    for _ in 0..max_depth {
        let mut next: Vec<&Symbol> = Vec::new();
        for t in &level {
            let Some(base) = t.extends() else {
                continue;
            };
            let base_name = base.rsplit('.').next().unwrap_or(base);
            if !visited.insert(base_name.to_string()) {
                continue;
            }
            for base_sym in index.named(base_name) {
                if !base_sym.kind.is_type() {
                    continue;
                }
                let hits = children_named(index, base_sym, method);
                if !hits.is_empty() {
                    return hits;
                }
                next.push(base_sym);
            }
        }
        if next.is_empty() {
            break;
        }
        level = next;
    }
    Vec::new()
}

/// `receiver` starts with `prefix` and the next character is
/// non-alphanumeric (or the strings are unequal lengths with nothing
/// alphanumeric following). Equality is not a prefix here.
fn receiver_has_prefix(receiver: &str, prefix: &str) -> bool {
    if receiver == prefix || !receiver.starts_with(prefix) {
        return false;
    }
    receiver[prefix.len()..]
        .chars()
        .next()
        .is_some_and(|c| !c.is_alphanumeric())
}
