//
//  validate.rs
//  Lattice
//
//  Created by hak (tharun)
//

use crate::error::{LatticeError, Result};

/// Generic English words the agent extracts by mistake. Closed set,
/// matched lowercased. "constructor" is a real symbol name and is
/// deliberately absent.
const GENERIC_WORDS: &[&str] = &[
    "the",
    "all",
    "any",
    "this",
    "that",
    "it",
    "them",
    "everything",
    "something",
    "anything",
    "stuff",
    "children",
    "parent",
    "parents",
    "class",
    "classes",
    "function",
    "functions",
    "method",
    "methods",
    "property",
    "properties",
    "handler",
    "handlers",
    "callback",
    "callbacks",
    "symbol",
    "symbols",
    "name",
    "names",
    "type",
    "types",
    "object",
    "objects",
    "variable",
    "variables",
    "value",
    "values",
    "field",
    "fields",
    "import",
    "imports",
    "module",
    "modules",
    "component",
    "components",
    "item",
    "items",
    "element",
    "elements",
    "code",
    "file",
    "files",
    "list",
    "lists",
];

pub fn is_generic_word(name: &str) -> bool {
    let lowered = name.to_lowercase();
    GENERIC_WORDS.contains(&lowered.as_str())
}

/// Validate a user-supplied symbol name. Rejects empty names and
/// generic words with a message that names the parameter and shows
/// example valid inputs so the caller can self-correct.
pub fn validate_symbol_name(name: &str, param: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(LatticeError::invalid_parameter(
            param,
            format!(
                "empty symbol name; pass a concrete identifier for '{}' \
                 (e.g. 'parseConfig', 'UserService.login', 'constructor')",
                param
            ),
        ));
    }
    if is_generic_word(name) {
        return Err(LatticeError::invalid_parameter(
            param,
            format!(
                "'{}' is a generic word, not a symbol name; pass a concrete \
                 identifier for '{}' (e.g. 'parseConfig', 'UserService.login', \
                 'constructor')",
                name, param
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_words_rejected() {
        for word in ["classes", "functions", "handler", "the", "all", "children"] {
            let err = validate_symbol_name(word, "from").unwrap_err();
            assert_eq!(err.kind(), "invalid-parameter");
            let msg = err.to_string();
            assert!(msg.contains("from"), "message should name the parameter: {}", msg);
            assert!(msg.contains("generic word"), "message should say why: {}", msg);
            assert!(msg.contains("parseConfig"), "message should show examples: {}", msg);
        }
    }

    #[test]
    fn test_case_insensitive_rejection() {
        assert!(validate_symbol_name("Classes", "from").is_err());
        assert!(validate_symbol_name("HANDLER", "to").is_err());
    }

    #[test]
    fn test_constructor_is_not_generic() {
        assert!(validate_symbol_name("constructor", "from").is_ok());
    }

    #[test]
    fn test_empty_rejected() {
        let err = validate_symbol_name("", "to").unwrap_err();
        assert_eq!(err.kind(), "invalid-parameter");
        assert!(err.to_string().contains("to"));
    }

    #[test]
    fn test_real_names_pass() {
        for name in ["main", "parseConfig", "UserService.login", "render", "__init__"] {
            assert!(validate_symbol_name(name, "symbol").is_ok(), "{}", name);
        }
    }
}
