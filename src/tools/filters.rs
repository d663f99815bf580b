//
//  filters.rs
//  Lattice
//
//  Created by hak (tharun)
//

use crate::resolve::scope::{is_test_file, matches_package};

/// Remove results from test files. When every result is a test, the
/// unfiltered set is kept: over-reporting beats silently hiding the
/// only answers. This is a product decision, not an optimization
/// target.
pub fn exclude_tests<T>(items: Vec<T>, enabled: bool, path_of: impl Fn(&T) -> &str) -> Vec<T> {
    if !enabled {
        return items;
    }
    let any_production = items.iter().any(|i| !is_test_file(path_of(i)));
    if !any_production {
        return items;
    }
    items
        .into_iter()
        .filter(|i| !is_test_file(path_of(i)))
        .collect()
}

/// Keep results whose package or path contains the hint as a
/// boundary-aware segment. An empty hint keeps everything.
pub fn filter_package<T>(
    items: Vec<T>,
    hint: Option<&str>,
    keys_of: impl Fn(&T) -> (String, String),
) -> Vec<T> {
    let Some(hint) = hint else {
        return items;
    };
    items
        .into_iter()
        .filter(|i| {
            let (package, path) = keys_of(i);
            matches_package(&package, hint) || matches_package(&path, hint)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tests_removed_when_production_exists() {
        let items = vec!["src/a.go", "src/a_test.go", "src/b.go"];
        let kept = exclude_tests(items, true, |p| p);
        assert_eq!(kept, vec!["src/a.go", "src/b.go"]);
    }

    #[test]
    fn test_all_tests_are_kept() {
        let items = vec!["src/a_test.go", "tests/b.py"];
        let kept = exclude_tests(items.clone(), true, |p| p);
        assert_eq!(kept, items);
    }

    #[test]
    fn test_disabled_keeps_everything() {
        let items = vec!["src/a.go", "src/a_test.go"];
        let kept = exclude_tests(items.clone(), false, |p| p);
        assert_eq!(kept, items);
    }

    #[test]
    fn test_package_filter_boundary() {
        let items = vec![("log", "lib/log/w.go"), ("ui", "ui/dialog/d.go")];
        let kept = filter_package(items, Some("log"), |(p, f)| (p.to_string(), f.to_string()));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].0, "log");
    }

    #[test]
    fn test_package_filter_none_keeps_all() {
        let items = vec![("a", "a.go"), ("b", "b.go")];
        assert_eq!(
            filter_package(items, None, |(p, f)| (p.to_string(), f.to_string())).len(),
            2
        );
    }
}
