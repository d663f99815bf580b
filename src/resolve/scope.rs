//
//  scope.rs
//  Lattice
//
//  Created by hak (tharun)
//

/// Reference-file tiers for tie-breaking. Lower wins.
pub const TIER_PRODUCTION: u8 = 0;
pub const TIER_TYPE_STUB: u8 = 1;
pub const TIER_TEST_HELPER: u8 = 2;
pub const TIER_TEST: u8 = 3;

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn has_dir_component(path: &str, dir: &str) -> bool {
    path.split('/').rev().skip(1).any(|c| c == dir)
}

/// Test files: `_test.go` suffix, `.test.*` / `.spec.*` infix, a
/// `test/` or `tests/` directory, or a Python `test_` prefix.
pub fn is_test_file(path: &str) -> bool {
    let base = basename(path);
    base.ends_with("_test.go")
        || base.contains(".test.")
        || base.contains(".spec.")
        || base.starts_with("test_")
        || has_dir_component(path, "test")
        || has_dir_component(path, "tests")
}

/// Test helpers: `conftest.py`, or anything under `_testing/` or
/// `_helpers/`.
pub fn is_test_helper(path: &str) -> bool {
    basename(path) == "conftest.py"
        || has_dir_component(path, "_testing")
        || has_dir_component(path, "_helpers")
}

/// Type stubs: `.pyi`, `.d.ts`, or anything under `stubs/`.
pub fn is_type_stub(path: &str) -> bool {
    let base = basename(path);
    base.ends_with(".pyi") || base.ends_with(".d.ts") || has_dir_component(path, "stubs")
}

/// Tier of a file path for the pick-best ladder:
/// production < type stub < test helper < test/bench.
pub fn file_tier(path: &str) -> u8 {
    if is_type_stub(path) {
        TIER_TYPE_STUB
    } else if is_test_helper(path) {
        TIER_TEST_HELPER
    } else if is_test_file(path) {
        TIER_TEST
    } else {
        TIER_PRODUCTION
    }
}

/// Boundary-aware, case-insensitive segment match. The hint must sit
/// between boundary characters (`/`, `.`, `_`, `:`, start, end) on
/// both sides: `log` matches `lib/log/x.go` but never `dialog`.
pub fn matches_package(haystack: &str, hint: &str) -> bool {
    if hint.is_empty() {
        return false;
    }
    let haystack = haystack.to_lowercase();
    let hint = hint.to_lowercase();

    let bytes = haystack.as_bytes();
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(&hint) {
        let begin = start + pos;
        let end = begin + hint.len();
        let before_ok = begin == 0 || is_boundary(bytes[begin - 1]);
        let after_ok = end == bytes.len() || is_boundary(bytes[end]);
        if before_ok && after_ok {
            return true;
        }
        start = begin + 1;
        if start >= haystack.len() {
            break;
        }
    }
    false
}

fn is_boundary(b: u8) -> bool {
    matches!(b, b'/' | b'.' | b'_' | b':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_file_rules() {
        assert!(is_test_file("pkg/server_test.go"));
        assert!(is_test_file("src/App.test.tsx"));
        assert!(is_test_file("src/app.spec.ts"));
        assert!(is_test_file("tests/helpers.py"));
        assert!(is_test_file("test/util.js"));
        assert!(is_test_file("pkg/test_models.py"));
        assert!(!is_test_file("src/contest.py"));
        assert!(!is_test_file("src/server.go"));
        // "testing" directory is not "tests"
        assert!(!is_test_file("testing_grounds/app.go"));
    }

    #[test]
    fn test_helper_and_stub_rules() {
        assert!(is_test_helper("tests/conftest.py"));
        assert!(is_test_helper("pandas/_testing/asserters.py"));
        assert!(is_test_helper("lib/_helpers/mk.ts"));
        assert!(!is_test_helper("lib/helpers/mk.ts"));

        assert!(is_type_stub("pandas/core/frame.pyi"));
        assert!(is_type_stub("types/react/index.d.ts"));
        assert!(is_type_stub("stubs/requests.py"));
        assert!(!is_type_stub("src/frame.py"));
    }

    #[test]
    fn test_file_tier_ordering() {
        assert_eq!(file_tier("src/frame.py"), TIER_PRODUCTION);
        assert_eq!(file_tier("src/frame.pyi"), TIER_TYPE_STUB);
        assert_eq!(file_tier("tests/conftest.py"), TIER_TEST_HELPER);
        assert_eq!(file_tier("tests/test_frame.py"), TIER_TEST);
    }

    #[test]
    fn test_matches_package_boundaries() {
        // Substring inside a word must not qualify
        assert!(!matches_package("dialog", "log"));
        assert!(matches_package("lib/pkg/x.go", "pkg"));

        assert!(matches_package("my_log/writer.go", "log"));
        assert!(matches_package("net.http", "http"));
        assert!(matches_package("a.go:12:log", "log"));
        assert!(matches_package("LOG/x.go", "log"));
        assert!(!matches_package("catalog/x.go", "log"));
        assert!(!matches_package("logging/x.go", "log"));
        assert!(!matches_package("anything", ""));
    }
}
