//
//  mod.rs
//  Lattice
//
//  Created by hak (tharun)
//

pub mod dotted;
pub mod rank;
pub mod scope;
pub mod validate;

use tracing::debug;

use crate::config::ResolutionConfig;
use crate::error::{LatticeError, Result};
use crate::symbol::{Symbol, SymbolIndex, SymbolKind};
use dotted::resolve_dotted;
use rank::{filter_overloads, rank_candidates};
use scope::matches_package;
use validate::validate_symbol_name;

/// Kind classes a caller can restrict resolution to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    Callable,
    Type,
    #[default]
    Any,
}

impl KindFilter {
    pub fn accepts(&self, kind: SymbolKind) -> bool {
        match self {
            KindFilter::Callable => kind.is_callable(),
            KindFilter::Type => kind.is_type(),
            KindFilter::Any => true,
        }
    }
}

/// Options for one resolution call.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub kind_filter: KindFilter,
    /// When dotted resolution fails, retry on the bare method part and
    /// disambiguate with the type prefix.
    pub bare_method_fallback: bool,
    /// Retain only candidates whose package or path contains this hint
    /// as a boundary-aware segment. Ignored when it filters everything.
    pub package_hint: Option<String>,
    /// Parameter name used in validation errors.
    pub param: String,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            kind_filter: KindFilter::Any,
            bare_method_fallback: false,
            package_hint: None,
            param: "symbol".to_string(),
        }
    }
}

impl ResolveOptions {
    pub fn callable() -> Self {
        Self {
            kind_filter: KindFilter::Callable,
            ..Default::default()
        }
    }

    pub fn for_param(param: &str) -> Self {
        Self {
            param: param.to_string(),
            ..Default::default()
        }
    }
}

/// A resolved symbol plus how it was found.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub symbol: Symbol,
    /// True when only the fuzzy tier matched.
    pub fuzzy: bool,
    /// Pipeline step that produced the answer.
    pub strategy: &'static str,
}

/// Known lowercase package / stdlib roots. A `root.Name` qualifier from
/// this set is stripped; a PascalCase prefix is kept as `Type.Method`.
const PACKAGE_ROOTS: &[&str] = &[
    "gin", "flask", "express", "pandas", "http", "os", "np", "pd", "fmt", "json", "numpy",
    "django", "react", "requests", "axios", "torch", "plt", "re", "sys", "io", "net", "url",
    "math", "time", "strings", "sort", "context", "sync", "path",
];

/// The symbol-resolution pipeline of the query layer. Read-only over a
/// populated index; safe to share across concurrent tool calls.
pub struct Resolver<'a> {
    index: &'a SymbolIndex,
    config: &'a ResolutionConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a SymbolIndex, config: &'a ResolutionConfig) -> Self {
        Self { index, config }
    }

    /// Resolve a user-supplied name to the single best symbol.
    pub fn resolve(&self, name: &str, options: &ResolveOptions) -> Result<Resolution> {
        let (candidates, strategy, fuzzy) = self.pipeline(name, options)?;
        let best = candidates
            .into_iter()
            .next()
            .ok_or_else(|| LatticeError::not_found(name))?;
        Ok(Resolution {
            symbol: best.clone(),
            fuzzy,
            strategy,
        })
    }

    /// Resolve to a ranked candidate list, primary first.
    pub fn resolve_candidates(
        &self,
        name: &str,
        options: &ResolveOptions,
        max: usize,
    ) -> Result<Vec<Resolution>> {
        let (candidates, strategy, fuzzy) = self.pipeline(name, options)?;
        Ok(candidates
            .into_iter()
            .take(max)
            .map(|s| Resolution {
                symbol: s.clone(),
                fuzzy,
                strategy,
            })
            .collect())
    }

    /// The ordered pipeline. Each step that succeeds returns a ranked,
    /// non-empty candidate list.
    fn pipeline(
        &self,
        raw_name: &str,
        options: &ResolveOptions,
    ) -> Result<(Vec<&'a Symbol>, &'static str, bool)> {
        validate_symbol_name(raw_name, &options.param)?;

        // 1. Full-id bypass: ids contain colons, names never do. The
        // kind filter does not apply to an explicit id.
        if raw_name.contains(':') {
            return match self.index.get(raw_name) {
                Some(sym) => Ok((vec![sym], "id", false)),
                None => Err(LatticeError::not_found(raw_name)),
            };
        }

        // 2. Package-qualifier strip.
        let name = strip_package_qualifiers(raw_name);
        let use_significance = options.kind_filter == KindFilter::Any;

        // 3. Dotted resolution.
        let dotted_parts = name.rsplit_once('.');
        if let Some((type_name, method_name)) = dotted_parts {
            if let Some(hit) = resolve_dotted(
                self.index,
                type_name,
                method_name,
                options.kind_filter,
                self.config.max_inheritance_depth,
            ) {
                let kept = self.apply_hint(hit.candidates, options);
                if !kept.is_empty() {
                    return Ok((rank_candidates(kept, use_significance), hit.strategy, false));
                }
            }
        }

        // 4. Exact name lookup.
        let exact: Vec<&Symbol> = self
            .index
            .named(name)
            .into_iter()
            .filter(|s| options.kind_filter.accepts(s.kind))
            .collect();
        let had_name_hits = !self.index.named(name).is_empty();
        if !exact.is_empty() {
            let kept = self.apply_hint(filter_overloads(exact), options);
            return Ok((rank_candidates(kept, use_significance), "exact", false));
        }

        // 5. Bare-method fallback, opt-in, only for dotted names.
        if options.bare_method_fallback {
            if let Some((type_name, method_name)) = dotted_parts {
                let bare: Vec<&Symbol> = self
                    .index
                    .named(method_name)
                    .into_iter()
                    .filter(|s| options.kind_filter.accepts(s.kind))
                    .collect();
                if !bare.is_empty() {
                    debug!(name = raw_name, "dotted resolution failed, using bare-method fallback");
                    let bare = filter_overloads(bare);
                    let disambiguated = disambiguate_by_prefix(bare, type_name);
                    let kept = self.apply_hint(disambiguated, options);
                    if !kept.is_empty() {
                        return Ok((rank_candidates(kept, use_significance), "bare_fallback", false));
                    }
                }
            }
        }

        // 6. Fuzzy search.
        let fuzzy_hits = self
            .index
            .fuzzy_search(name, 25, self.config.max_fuzzy_candidates);
        let fuzzy_syms: Vec<&Symbol> = fuzzy_hits
            .iter()
            .filter_map(|m| self.index.get(&m.id))
            .filter(|s| options.kind_filter.accepts(s.kind))
            .collect();
        if !fuzzy_syms.is_empty() {
            let kept = self.apply_hint(filter_overloads(fuzzy_syms), options);
            if !kept.is_empty() {
                return Ok((rank_candidates(kept, use_significance), "fuzzy", true));
            }
        }

        // 7. Nothing matched. Distinguish "exists but filtered" from
        // plain absence so the agent can loosen the filter.
        if had_name_hits {
            return Err(LatticeError::NotFound {
                name: format!("{} (candidates exist but none match the kind filter)", name),
            });
        }
        Err(LatticeError::not_found(name))
    }

    fn apply_hint(&self, candidates: Vec<&'a Symbol>, options: &ResolveOptions) -> Vec<&'a Symbol> {
        let Some(hint) = options.package_hint.as_deref() else {
            return candidates;
        };
        if hint.is_empty() {
            return candidates;
        }
        let filtered: Vec<&Symbol> = candidates
            .iter()
            .copied()
            .filter(|s| matches_package(&s.package, hint) || matches_package(&s.file_path, hint))
            .collect();
        if filtered.is_empty() {
            // A hint that filters everything is ignored, not fatal.
            debug!(hint, "package hint matched nothing; keeping all candidates");
            candidates
        } else {
            filtered
        }
    }
}

/// Strip known lowercase package/stdlib qualifiers: `gin.New` becomes
/// `New`, `pandas.DataFrame.apply` becomes `DataFrame.apply`, while
/// `Engine.ServeHTTP` is kept as a `Type.Method` name.
fn strip_package_qualifiers(name: &str) -> &str {
    let mut current = name;
    while let Some((prefix, rest)) = current.split_once('.') {
        let is_lower_root = !prefix.is_empty()
            && prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            && PACKAGE_ROOTS.contains(&prefix);
        if is_lower_root && !rest.is_empty() {
            current = rest;
        } else {
            break;
        }
    }
    current
}

/// Soft disambiguation for the bare-method fallback: score candidates
/// by affinity to the user-supplied type prefix (receiver, file path,
/// id), keep the best-scoring group.
fn disambiguate_by_prefix<'a>(candidates: Vec<&'a Symbol>, type_name: &str) -> Vec<&'a Symbol> {
    let score = |s: &Symbol| -> u8 {
        if s.receiver == type_name {
            0
        } else if s.receiver.starts_with(type_name) && !s.receiver.is_empty() {
            1
        } else if file_stem(&s.file_path).starts_with(type_name) {
            2
        } else if s.id.contains(type_name) {
            3
        } else {
            4
        }
    };
    let best = candidates.iter().map(|s| score(s)).min().unwrap_or(4);
    candidates.into_iter().filter(|s| score(s) == best).collect()
}

fn file_stem(path: &str) -> &str {
    let base = path.rsplit('/').next().unwrap_or(path);
    base.split('.').next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{CallSite, Symbol, SymbolKind, SymbolMetadata};

    fn config() -> ResolutionConfig {
        ResolutionConfig::default()
    }

    fn func(name: &str, file: &str, line: u32) -> Symbol {
        Symbol::new(name, SymbolKind::Function, file, line)
    }

    #[test]
    fn test_full_id_bypass_ignores_kind_filter() {
        let mut index = SymbolIndex::new();
        index.add(Symbol::new("Config", SymbolKind::Class, "src/config.ts", 3));

        let cfg = config();


        let resolver = Resolver::new(&index, &cfg);
        let mut options = ResolveOptions::callable();
        options.param = "symbol".into();

        let res = resolver.resolve("src/config.ts:3:Config", &options).unwrap();
        assert_eq!(res.symbol.kind, SymbolKind::Class);
        assert_eq!(res.strategy, "id");
    }

    #[test]
    fn test_package_root_stripped() {
        let mut index = SymbolIndex::new();
        index.add(func("New", "gin.go", 50));

        let cfg = config();


        let resolver = Resolver::new(&index, &cfg);
        let res = resolver.resolve("gin.New", &ResolveOptions::default()).unwrap();
        assert_eq!(res.symbol.name, "New");
    }

    #[test]
    fn test_pascal_case_prefix_kept_as_type() {
        let mut index = SymbolIndex::new();
        let mut serve = Symbol::new("ServeHTTP", SymbolKind::Method, "gin.go", 100);
        serve.receiver = "Engine".to_string();
        index.add(serve);
        // A decoy bare function that a naive strip would hit
        index.add(func("ServeHTTP", "middleware.go", 5));

        let cfg = config();


        let resolver = Resolver::new(&index, &cfg);
        let res = resolver
            .resolve("Engine.ServeHTTP", &ResolveOptions::default())
            .unwrap();
        assert_eq!(res.strategy, "receiver_match");
        assert_eq!(res.symbol.file_path, "gin.go");
    }

    #[test]
    fn test_exact_lookup_with_tiebreak() {
        let mut index = SymbolIndex::new();
        index.add(func("Default", "gin.go", 20));
        index.add(func("Default", "binding/binding.go", 95));

        let cfg = config();


        let resolver = Resolver::new(&index, &cfg);
        let res = resolver.resolve("Default", &ResolveOptions::default()).unwrap();
        // Shorter file path wins the last rung
        assert_eq!(res.symbol.id, "gin.go:20:Default");
    }

    #[test]
    fn test_bare_method_fallback_disambiguates_by_path() {
        let mut index = SymbolIndex::new();
        index.add(func("Default", "gin.go", 20));
        index.add(func("Default", "binding/binding.go", 95));

        let cfg = config();


        let resolver = Resolver::new(&index, &cfg);
        let options = ResolveOptions {
            bare_method_fallback: true,
            ..Default::default()
        };
        // "gin" is a package root, so the qualifier is stripped and the
        // exact-name step resolves the bare name
        let res = resolver.resolve("gin.Default", &options).unwrap();
        assert_eq!(res.symbol.id, "gin.go:20:Default");

        // A non-root PascalCase-free prefix exercises the fallback
        let res = resolver.resolve("binding.Default", &options).unwrap();
        assert_eq!(res.strategy, "bare_fallback");
        assert_eq!(res.symbol.id, "binding/binding.go:95:Default");
    }

    #[test]
    fn test_fuzzy_is_flagged() {
        let mut index = SymbolIndex::new();
        index.add(func("renderLoop", "src/render.ts", 8));

        let cfg = config();


        let resolver = Resolver::new(&index, &cfg);
        let res = resolver.resolve("renderloop", &ResolveOptions::default()).unwrap();
        assert!(res.fuzzy);
        assert_eq!(res.symbol.name, "renderLoop");
    }

    #[test]
    fn test_not_found() {
        let index = SymbolIndex::new();
        let cfg = config();

        let resolver = Resolver::new(&index, &cfg);
        let err = resolver
            .resolve("missingThing", &ResolveOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), "not-found");
    }

    #[test]
    fn test_generic_word_rejected_with_param() {
        let mut index = SymbolIndex::new();
        index.add(func("main", "main.go", 1));

        let cfg = config();


        let resolver = Resolver::new(&index, &cfg);
        let err = resolver
            .resolve("functions", &ResolveOptions::for_param("from"))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid-parameter");
        assert!(err.to_string().contains("from"));
    }

    #[test]
    fn test_kind_filter_soundness() {
        let mut index = SymbolIndex::new();
        index.add(Symbol::new("Render", SymbolKind::Class, "a.ts", 1));
        index.add(Symbol::new("Render", SymbolKind::Variable, "b.ts", 1));
        index.add(func("Render", "c.ts", 1));

        let cfg = config();


        let resolver = Resolver::new(&index, &cfg);
        let res = resolver.resolve("Render", &ResolveOptions::callable()).unwrap();
        assert!(res.symbol.kind.is_callable());

        let type_options = ResolveOptions {
            kind_filter: KindFilter::Type,
            ..Default::default()
        };
        let res = resolver.resolve("Render", &type_options).unwrap();
        assert!(res.symbol.kind.is_type());
    }

    #[test]
    fn test_all_filtered_names_the_filter() {
        let mut index = SymbolIndex::new();
        index.add(Symbol::new("Config", SymbolKind::Class, "a.ts", 1));

        let cfg = config();


        let resolver = Resolver::new(&index, &cfg);
        let err = resolver.resolve("Config", &ResolveOptions::callable()).unwrap_err();
        assert_eq!(err.kind(), "not-found");
        assert!(err.to_string().contains("kind filter"));
    }

    #[test]
    fn test_package_hint_boundary_segment() {
        let mut index = SymbolIndex::new();
        let mut a = func("Open", "ui/dialog/open.go", 10);
        a.package = "dialog".to_string();
        let mut b = func("Open", "lib/log/open.go", 10);
        b.package = "log".to_string();
        index.add(a);
        index.add(b);

        let cfg = config();


        let resolver = Resolver::new(&index, &cfg);
        let options = ResolveOptions {
            package_hint: Some("log".to_string()),
            ..Default::default()
        };
        let res = resolver.resolve("Open", &options).unwrap();
        // "log" must not match "dialog"
        assert_eq!(res.symbol.package, "log");
    }

    #[test]
    fn test_package_hint_filtering_everything_is_ignored() {
        let mut index = SymbolIndex::new();
        index.add(func("Open", "lib/a.go", 10));

        let cfg = config();


        let resolver = Resolver::new(&index, &cfg);
        let options = ResolveOptions {
            package_hint: Some("zzz".to_string()),
            ..Default::default()
        };
        assert!(resolver.resolve("Open", &options).is_ok());
    }

    #[test]
    fn test_resolution_determinism() {
        let mut index = SymbolIndex::new();
        for (file, line) in [("b.go", 10), ("a.go", 10), ("c.go", 10)] {
            index.add(func("dup", file, line));
        }

        let cfg = config();


        let resolver = Resolver::new(&index, &cfg);
        let first = resolver.resolve("dup", &ResolveOptions::default()).unwrap();
        let second = resolver.resolve("dup", &ResolveOptions::default()).unwrap();
        assert_eq!(first.symbol.id, second.symbol.id);
    }

    #[test]
    fn test_resolve_candidates_primary_first() {
        let mut index = SymbolIndex::new();
        let mut primary = func("render", "src/render.ts", 5);
        primary.calls.push(CallSite {
            target: "draw".into(),
            ..Default::default()
        });
        index.add(primary);
        index.add(func("render", "tests/render.test.ts", 5));

        let cfg = config();


        let resolver = Resolver::new(&index, &cfg);
        let candidates = resolver
            .resolve_candidates("render", &ResolveOptions::default(), 3)
            .unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].symbol.file_path, "src/render.ts");
    }

    #[test]
    fn test_overload_suppression_end_to_end() {
        let mut stub = Symbol::new("apply", SymbolKind::Method, "frame.py", 10);
        stub.metadata = Some(SymbolMetadata {
            is_overload: true,
            ..Default::default()
        });
        let implementation = Symbol::new("apply", SymbolKind::Method, "frame.py", 40);

        let mut index = SymbolIndex::new();
        index.add(stub);
        index.add(implementation);

        let cfg = config();


        let resolver = Resolver::new(&index, &cfg);
        let res = resolver.resolve("apply", &ResolveOptions::default()).unwrap();
        assert!(!res.symbol.is_overload_stub());
    }

    #[test]
    fn test_strip_is_iterative() {
        assert_eq!(strip_package_qualifiers("os.path.join"), "join");
        assert_eq!(strip_package_qualifiers("pandas.DataFrame.apply"), "DataFrame.apply");
        assert_eq!(strip_package_qualifiers("Engine.ServeHTTP"), "Engine.ServeHTTP");
        assert_eq!(strip_package_qualifiers("plain"), "plain");
    }
}
