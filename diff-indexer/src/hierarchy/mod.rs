//! Language-aware hierarchy parsing: file text → ordered symbol records.
//!
//! Each record carries byte spans and its inclusive scope chain (outermost
//! to innermost, the record's own scope last). The module-level record has
//! an empty chain and spans the whole file. Unsupported language tags
//! degrade to that single module-level record, so projection still works
//! file-wide.
//!
//! A new tree-sitter parser is created per call; parsing is CPU-bound and
//! cheap at changed-file granularity.

mod ecma;
mod python;
mod rust;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One entry in a symbol's scope chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeEntry {
    pub name: String,
    pub kind: String,
}

impl ScopeEntry {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// A parsed symbol, before and after indexer enrichment.
///
/// The parser fills `start_byte`, `end_byte` and `inclusive_scopes`; the
/// indexer enriches the remaining fields (line numbers, surfaced name and
/// kind) before projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub start_byte: usize,
    pub end_byte: usize,
    /// Scope chain from outermost to innermost; empty for the module level.
    pub inclusive_scopes: Vec<ScopeEntry>,

    // Enriched in-place by the indexer.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol_kind: String,
    #[serde(default)]
    pub start_line: u32,
    #[serde(default)]
    pub end_line: u32,
}

impl SymbolRecord {
    pub fn new(start_byte: usize, end_byte: usize, inclusive_scopes: Vec<ScopeEntry>) -> Self {
        Self {
            start_byte,
            end_byte,
            inclusive_scopes,
            name: String::new(),
            symbol_kind: String::new(),
            start_line: 0,
            end_line: 0,
        }
    }

    /// The scope-name tuple used as the containment key within a file.
    pub fn scope_key(&self) -> Vec<String> {
        self.inclusive_scopes.iter().map(|s| s.name.clone()).collect()
    }
}

/// Parses `content` into ordered symbol records for the given language tag.
///
/// Empty content yields no records; callers treat that as "no parseable
/// hierarchy". Supported tags: python, rust, typescript, javascript
/// (plus common aliases); everything else falls back to a single
/// module-level record.
pub fn parse_hierarchy(content: &str, language: &str, path: &str) -> Vec<SymbolRecord> {
    if content.is_empty() {
        return Vec::new();
    }

    let mut records = vec![SymbolRecord::new(0, content.len(), Vec::new())];

    let parsed = match language.to_ascii_lowercase().as_str() {
        "python" | "py" => python::extract(content),
        "rust" | "rs" => rust::extract(content),
        "typescript" | "ts" | "tsx" => ecma::extract(content, ecma::EcmaDialect::TypeScript),
        "javascript" | "js" | "jsx" => ecma::extract(content, ecma::EcmaDialect::JavaScript),
        other => {
            debug!("hierarchy: unsupported language '{}' for {}, module-level only", other, path);
            Some(Vec::new())
        }
    };

    match parsed {
        Some(symbols) => records.extend(symbols),
        // Grammar failed to load or parse; degrade to module level.
        None => debug!("hierarchy: parser unavailable for {}, module-level only", path),
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    const PY_SOURCE: &str = r#"RETRY_LIMIT = 3


class PaymentClient:
    def charge(self, amount):
        return self.gateway.post(amount)

    def refund(self, amount):
        return self.gateway.post(-amount)


def helper():
    return RETRY_LIMIT
"#;

    #[test]
    fn python_hierarchy_carries_scope_chains() {
        let records = parse_hierarchy(PY_SOURCE, "python", "src/payment.py");

        let keys: Vec<Vec<String>> = records.iter().map(|r| r.scope_key()).collect();
        assert!(keys.contains(&vec![]));
        assert!(keys.contains(&vec!["PaymentClient".to_string()]));
        assert!(keys.contains(&vec!["PaymentClient".to_string(), "charge".to_string()]));
        assert!(keys.contains(&vec!["PaymentClient".to_string(), "refund".to_string()]));
        assert!(keys.contains(&vec!["helper".to_string()]));

        let charge = records
            .iter()
            .find(|r| r.scope_key() == vec!["PaymentClient".to_string(), "charge".to_string()])
            .unwrap();
        assert_eq!(charge.inclusive_scopes.last().unwrap().kind, "method");
        assert!(charge.start_byte < charge.end_byte);
    }

    #[test]
    fn rust_hierarchy_extracts_items() {
        let source = "struct Config;\n\nimpl Config {\n    fn load() -> Self {\n        Config\n    }\n}\n";
        let records = parse_hierarchy(source, "rust", "src/config.rs");
        let keys: Vec<Vec<String>> = records.iter().map(|r| r.scope_key()).collect();
        assert!(keys.contains(&vec!["Config".to_string(), "load".to_string()]));
    }

    #[test]
    fn typescript_hierarchy_extracts_methods() {
        let source = "class Router {\n  dispatch(req: Request): void {\n    return;\n  }\n}\n";
        let records = parse_hierarchy(source, "typescript", "src/router.ts");
        let keys: Vec<Vec<String>> = records.iter().map(|r| r.scope_key()).collect();
        assert!(keys.contains(&vec!["Router".to_string(), "dispatch".to_string()]));
    }

    #[test]
    fn unsupported_language_degrades_to_module_record() {
        let records = parse_hierarchy("some content", "cobol", "prog.cbl");
        assert_eq!(records.len(), 1);
        assert!(records[0].inclusive_scopes.is_empty());
        assert_eq!(records[0].start_byte, 0);
        assert_eq!(records[0].end_byte, "some content".len());
    }

    #[test]
    fn empty_content_yields_no_records() {
        assert!(parse_hierarchy("", "python", "empty.py").is_empty());
    }
}
