//! TypeScript / JavaScript symbol extraction. Both dialects share one
//! walker; the grammar differs but the relevant node kinds align.

use super::{ScopeEntry, SymbolRecord};
use tree_sitter::{Node, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcmaDialect {
    TypeScript,
    JavaScript,
}

pub fn extract(code: &str, dialect: EcmaDialect) -> Option<Vec<SymbolRecord>> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = match dialect {
        EcmaDialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        EcmaDialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
    };
    parser.set_language(&language).ok()?;
    let tree = parser.parse(code, None)?;

    let mut out = Vec::new();
    let mut chain: Vec<ScopeEntry> = Vec::new();
    walk(tree.root_node(), code, &mut chain, &mut out);
    Some(out)
}

fn walk(node: Node, code: &str, chain: &mut Vec<ScopeEntry>, out: &mut Vec<SymbolRecord>) {
    let scope = match node.kind() {
        "class_declaration" => named(code, node, "class"),
        "interface_declaration" => named(code, node, "interface"),
        "enum_declaration" => named(code, node, "enum"),
        "function_declaration" | "generator_function_declaration" => {
            named(code, node, "function")
        }
        "method_definition" => named(code, node, "method"),
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
