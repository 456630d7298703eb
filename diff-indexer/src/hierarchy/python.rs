//! Python symbol extraction: classes, functions and methods with full
//! scope chains.

use super::{ScopeEntry, SymbolRecord};
use tree_sitter::{Node, Parser};

/// Extracts nested symbol records from Python source. Returns `None` when
/// the grammar cannot be loaded or the parse produces no tree.
pub fn extract(code: &str) -> Option<Vec<SymbolRecord>> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .ok()?;
    let tree = parser.parse(code, None)?;

    let mut out = Vec::new();
    let mut chain: Vec<ScopeEntry> = Vec::new();
    walk(tree.root_node(), code, &mut chain, &mut out);
    Some(out)
}

fn walk(node: Node, code: &str, chain: &mut Vec<ScopeEntry>, out: &mut Vec<SymbolRecord>) {
    let scope = match node.kind() {
        "class_definition" => node
            .child_by_field_name("name")
            .map(|n| ScopeEntry::new(text(code, n), "class")),
        "function_definition" => node.child_by_field_name("name").map(|n| {
            let inside_class = chain.iter().any(|s| s.kind == "class");
            let kind = if inside_class { "method" } else { "function" };
            ScopeEntry::new(text(code, n), kind)
        }),
        _ => None,
    };

    if let Some(entry) = scope {
        chain.push(entry);
        out.push(SymbolRecord::new(
            node.start_byte(),
            node.end_byte(),
            chain.clone(),
        ));
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            walk(child, code, chain, out);
        }
        chain.pop();
    } else {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            walk(child, code, chain, out);
        }
    }
}

fn text<'a>(code: &'a str, node: Node) -> &'a str {
    &code[node.byte_range()]
}
