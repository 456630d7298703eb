//! Rust symbol extraction: modules, types, impls and functions.

use super::{ScopeEntry, SymbolRecord};
use tree_sitter::{Node, Parser};

pub fn extract(code: &str) -> Option<Vec<SymbolRecord>> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_rust::LANGUAGE.into())
        .ok()?;
    let tree = parser.parse(code, None)?;

    let mut out = Vec::new();
    let mut chain: Vec<ScopeEntry> = Vec::new();
    walk(tree.root_node(), code, &mut chain, &mut out);
    Some(out)
}

fn walk(node: Node, code: &str, chain: &mut Vec<ScopeEntry>, out: &mut Vec<SymbolRecord>) {
    let scope = match node.kind() {
        "mod_item" => named(code, node, "mod"),
        "struct_item" => named(code, node, "struct"),
        "enum_item" => named(code, node, "enum"),
        "trait_item" => named(code, node, "trait"),
        "function_item" => {
            let inside_impl = chain.iter().any(|s| s.kind == "impl" || s.kind == "trait");
            named(code, node, if inside_impl { "method" } else { "function" })
        }
        // An impl block scopes its methods under the implemented type name.
        "impl_item" => node
            .child_by_field_name("type")
            .map(|n| ScopeEntry::new(text(code, n), "impl")),
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

fn named(code: &str, node: Node, kind: &str) -> Option<ScopeEntry> {
    node.child_by_field_name("name")
        .map(|n| ScopeEntry::new(text(code, n), kind))
}

fn text<'a>(code: &'a str, node: Node) -> &'a str {
    &code[node.byte_range()]
}
