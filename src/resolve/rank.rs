//
//  rank.rs
//  Lattice
//
//  Created by hak (tharun)
//

use std::cmp::Ordering;

use super::scope::{file_tier, is_test_file};
use crate::symbol::Symbol;

/// Overload-stub suppression: when the candidate set contains both
/// overload stubs and a non-overload symbol of the same (name, kind),
/// keep only the non-overloads. A set of stubs alone is returned
/// unchanged (Protocol definitions are real answers).
pub fn filter_overloads<'a>(candidates: Vec<&'a Symbol>) -> Vec<&'a Symbol> {
    let filtered: Vec<&Symbol> = candidates
        .iter()
        .copied()
        .filter(|c| {
            !c.is_overload_stub()
                || !candidates
                    .iter()
                    .any(|o| !o.is_overload_stub() && o.name == c.name && o.kind == c.kind)
        })
        .collect();
    filtered
}

/// Rank candidates best-first. The ladder, higher wins:
/// kind significance (Any filter only), non-stub, non-empty calls,
/// receiver populated, non-test file, reference-file tier, shorter
/// path; symbol id is the stable final key.
pub fn rank_candidates<'a>(
    mut candidates: Vec<&'a Symbol>,
    use_significance: bool,
) -> Vec<&'a Symbol> {
    candidates.sort_by(|a, b| compare(a, b, use_significance));
    candidates
}

/// Pick the single best candidate, or `None` for an empty set.
pub fn pick_best<'a>(candidates: Vec<&'a Symbol>, use_significance: bool) -> Option<&'a Symbol> {
    rank_candidates(candidates, use_significance).into_iter().next()
}

fn compare(a: &Symbol, b: &Symbol, use_significance: bool) -> Ordering {
    if use_significance {
        let ord = b.kind.significance().cmp(&a.kind.significance());
        if ord != Ordering::Equal {
            return ord;
        }
    }

    let ord = a.is_overload_stub().cmp(&b.is_overload_stub());
    if ord != Ordering::Equal {
        return ord;
    }

    let ord = a.calls.is_empty().cmp(&b.calls.is_empty());
    if ord != Ordering::Equal {
        return ord;
    }

    let ord = a.receiver.is_empty().cmp(&b.receiver.is_empty());
    if ord != Ordering::Equal {
        return ord;
    }

    let ord = is_test_file(&a.file_path).cmp(&is_test_file(&b.file_path));
    if ord != Ordering::Equal {
        return ord;
    }

    let ord = file_tier(&a.file_path).cmp(&file_tier(&b.file_path));
    if ord != Ordering::Equal {
        return ord;
    }

    let ord = a.file_path.len().cmp(&b.file_path.len());
    if ord != Ordering::Equal {
        return ord;
    }

    a.id.cmp(&b.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{CallSite, Symbol, SymbolKind, SymbolMetadata};

    fn sym(name: &str, kind: SymbolKind, file: &str, line: u32) -> Symbol {
        Symbol::new(name, kind, file, line)
    }

    #[test]
    fn test_significance_only_under_any() {
        let class = sym("Render", SymbolKind::Class, "a.ts", 1);
        let func = sym("Render", SymbolKind::Function, "b.ts", 1);

        let best = pick_best(vec![&func, &class], true).unwrap();
        assert_eq!(best.kind, SymbolKind::Class);

        // With a concrete filter the significance rung is skipped and
        // the stable id key decides
        let best = pick_best(vec![&func, &class], false).unwrap();
        assert_eq!(best.file_path, "a.ts");
    }

    #[test]
    fn test_non_overload_beats_stub() {
        let mut stub = sym("get", SymbolKind::Method, "a.pyi", 1);
        stub.metadata = Some(SymbolMetadata {
            is_overload: true,
            ..Default::default()
        });
        let implementation = sym("get", SymbolKind::Method, "z_longer_path.py", 9);

        let best = pick_best(vec![&stub, &implementation], false).unwrap();
        assert!(!best.is_overload_stub());
    }

    #[test]
    fn test_overload_filter_keeps_stubs_when_alone() {
        let mut stub_a = sym("get", SymbolKind::Method, "a.pyi", 1);
        stub_a.metadata = Some(SymbolMetadata {
            is_overload: true,
            ..Default::default()
        });
        let mut stub_b = sym("get", SymbolKind::Method, "a.pyi", 5);
        stub_b.metadata = Some(SymbolMetadata {
            is_overload: true,
            ..Default::default()
        });

        let kept = filter_overloads(vec![&stub_a, &stub_b]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_overload_filter_drops_stubs_next_to_impl() {
        let mut stub = sym("get", SymbolKind::Method, "a.py", 1);
        stub.metadata = Some(SymbolMetadata {
            is_overload: true,
            ..Default::default()
        });
        let implementation = sym("get", SymbolKind::Method, "a.py", 9);

        let kept = filter_overloads(vec![&stub, &implementation]);
        assert_eq!(kept.len(), 1);
        assert!(!kept[0].is_overload_stub());
    }

    #[test]
    fn test_calls_and_receiver_rungs() {
        let mut with_calls = sym("render", SymbolKind::Function, "a.ts", 1);
        with_calls.calls.push(CallSite {
            target: "draw".into(),
            ..Default::default()
        });
        let without_calls = sym("render", SymbolKind::Function, "b.ts", 1);
        let best = pick_best(vec![&without_calls, &with_calls], false).unwrap();
        assert_eq!(best.file_path, "a.ts");

        let mut with_receiver = sym("run", SymbolKind::Method, "a.ts", 1);
        with_receiver.receiver = "Engine".into();
        let without_receiver = sym("run", SymbolKind::Method, "b.ts", 1);
        let best = pick_best(vec![&without_receiver, &with_receiver], false).unwrap();
        assert_eq!(best.file_path, "a.ts");
    }

    #[test]
    fn test_production_beats_test_beats_nothing() {
        let prod = sym("render", SymbolKind::Function, "src/view/render_helpers.ts", 1);
        let test = sym("render", SymbolKind::Function, "src/view.test.ts", 1);
        let best = pick_best(vec![&test, &prod], false).unwrap();
        assert!(!is_test_file(&best.file_path));
    }

    #[test]
    fn test_tier_then_path_length() {
        let stubbed = sym("apply", SymbolKind::Function, "x.pyi", 1);
        let prod = sym("apply", SymbolKind::Function, "much/longer/path/core.py", 1);
        let best = pick_best(vec![&stubbed, &prod], false).unwrap();
        assert_eq!(best.file_path, "much/longer/path/core.py");

        let short = sym("apply", SymbolKind::Function, "a.py", 1);
        let long = sym("apply", SymbolKind::Function, "dir/a.py", 1);
        let best = pick_best(vec![&long, &short], false).unwrap();
        assert_eq!(best.file_path, "a.py");
    }

    #[test]
    fn test_deterministic_final_key() {
        let a = sym("x", SymbolKind::Function, "a.go", 1);
        let b = sym("x", SymbolKind::Function, "b.go", 1);
        let first = pick_best(vec![&b, &a], true).unwrap().id.clone();
        let second = pick_best(vec![&a, &b], true).unwrap().id.clone();
        assert_eq!(first, second);
    }
}
