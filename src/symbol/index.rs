//
//  index.rs
//  Lattice
//
//  Created by hak (tharun)
//

use std::collections::HashMap;

use super::types::Symbol;

/// One ranked fuzzy-search hit.
#[derive(Debug, Clone)]
pub struct FuzzyMatch {
    pub id: String,
    pub name: String,
    /// Match tier: 0 exact, 1 case-insensitive exact, 2 prefix,
    /// 3 substring. Lower is better.
    pub tier: u8,
    /// Jaro-Winkler similarity to the query, used inside a tier.
    pub similarity: f64,
}

/// The symbol store. Symbols are owned here; the graph and the resolver
/// hold ids.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    /// Index: id -> symbol. Constant-time flat lookup.
    by_id: HashMap<String, Symbol>,
    /// Index: name (case-sensitive) -> ids sharing that name,
    /// insertion order.
    by_name: HashMap<String, Vec<String>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol and, recursively, its children. Children of a class
    /// are reachable by flat id lookup too. Re-adding an existing id
    /// replaces the entry, never silently diverges.
    pub fn add(&mut self, symbol: Symbol) {
        for child in &symbol.children {
            self.add(child.clone());
        }

        if let Some(old) = self.by_id.get(&symbol.id) {
            if old.name != symbol.name {
                if let Some(ids) = self.by_name.get_mut(&old.name) {
                    ids.retain(|id| id != &symbol.id);
                }
            }
        }

        let ids = self.by_name.entry(symbol.name.clone()).or_default();
        if !ids.contains(&symbol.id) {
            ids.push(symbol.id.clone());
        }
        self.by_id.insert(symbol.id.clone(), symbol);
    }

    /// Look up a symbol by its full id.
    pub fn get(&self, id: &str) -> Option<&Symbol> {
        self.by_id.get(id)
    }

    /// All symbols sharing a name, in insertion order.
    pub fn named(&self, name: &str) -> Vec<&Symbol> {
        self.by_name
            .get(name)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    /// Ids whose id string contains `segment`. Used for
    /// `:<Type>.<method>` id-segment matching; bounded scan.
    pub fn ids_containing(&self, segment: &str, max: usize) -> Vec<&Symbol> {
        let mut hits: Vec<&Symbol> = self
            .by_id
            .iter()
            .filter(|(id, _)| id.contains(segment))
            .map(|(_, sym)| sym)
            .take(max)
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        hits
    }

    /// Iterate every indexed symbol.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Case-insensitive fuzzy search: exact, case-folded, prefix, then
    /// substring tiers; ranked within a tier by string similarity, id
    /// as the stable final key. The candidate set is finite: the full
    /// name scan is collected first, then `candidate_cap` trims by the
    /// same tier/similarity/id ordering the results promise, never by
    /// incidental map order.
    pub fn fuzzy_search(&self, query: &str, max: usize, candidate_cap: usize) -> Vec<FuzzyMatch> {
        if query.is_empty() {
            return Vec::new();
        }
        let query_lower = query.to_lowercase();

        let mut matches: Vec<FuzzyMatch> = Vec::new();
        for (name, ids) in &self.by_name {
            let name_lower = name.to_lowercase();
            let tier = if name == query {
                0
            } else if name_lower == query_lower {
                1
            } else if name_lower.starts_with(&query_lower) {
                2
            } else if name_lower.contains(&query_lower) {
                3
            } else {
                continue;
            };

            let similarity = strsim::jaro_winkler(&name_lower, &query_lower);
            for id in ids {
                matches.push(FuzzyMatch {
                    id: id.clone(),
                    name: name.clone(),
                    tier,
                    similarity,
                });
            }
        }

        matches.sort_by(|a, b| {
            a.tier
                .cmp(&b.tier)
                .then_with(|| {
                    b.similarity
                        .partial_cmp(&a.similarity)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(max.min(candidate_cap));
        matches
    }
}
