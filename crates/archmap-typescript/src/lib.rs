use std::path::Path;

use tree_sitter::{Language as TsLanguage, Node, Parser};

use archmap_core::parser::{source_file, LanguageParser};
use archmap_core::types::{ImportKind, ImportRecord, Language, ParsedFile};

/// TypeScript/JavaScript parser backed by tree-sitter.
///
/// Tree-sitter recovers from syntax errors, so partially broken files still
/// yield whatever imports and exports are intact; errors are reported in
/// `ParsedFile.errors` instead of aborting.
pub struct TypeScriptParser {
    ts: TsLanguage,
    tsx: TsLanguage,
    js: TsLanguage,
}

impl TypeScriptParser {
    pub fn new() -> Self {
        Self {
            ts: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            tsx: tree_sitter_typescript::LANGUAGE_TSX.into(),
            js: tree_sitter_javascript::LANGUAGE.into(),
        }
    }

    fn grammar_for(&self, path: &Path) -> &TsLanguage {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("tsx") => &self.tsx,
            Some("js" | "jsx" | "mjs" | "cjs") => &self.js,
            _ => &self.ts,
        }
    }

    fn language_tag(path: &Path) -> Language {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("js" | "jsx" | "mjs" | "cjs") => Language::JavaScript,
            _ => Language::TypeScript,
        }
    }
}

impl Default for TypeScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for TypeScriptParser {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn extensions(&self) -> &[&'static str] {
        &["ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts"]
    }

    fn parse(&self, content: &str, path: &Path, root: &Path) -> ParsedFile {
        let mut file = ParsedFile::new(source_file(path, root, content, Self::language_tag(path)));

        let mut parser = Parser::new();
        if let Err(err) = parser.set_language(self.grammar_for(path)) {
            file.errors.push(format!("failed to load grammar: {err}"));
            return file;
        }
        let Some(tree) = parser.parse(content, None) else {
            file.errors.push("parse produced no syntax tree".to_string());
            return file;
        };

        let source = content.as_bytes();
        let root_node = tree.root_node();
        if root_node.has_error() {
            if let Some(node) = first_error_node(root_node) {
                file.errors.push(format!(
                    "syntax error near line {}",
                    node.start_position().row + 1
                ));
            } else {
                file.errors.push("syntax error".to_string());
            }
        }

        // Pre-order traversal keeps records in source order.
        let mut stack = vec![root_node];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "import_statement" => extract_import(node, source, &mut file),
                "export_statement" => extract_export(node, source, &mut file),
                "call_expression" => extract_call(node, source, &mut file),
                _ => {}
            }
            let mut cursor = node.walk();
            let children: Vec<Node> = node.children(&mut cursor).collect();
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        }

        file
    }
}

/// Static `import` declarations: default, named, namespace and
/// side-effect-only forms.
fn extract_import(node: Node, source: &[u8], file: &mut ParsedFile) {
    let Some(spec) = import_source(node, source) else {
        return;
    };

    let mut default_name: Option<String> = None;
    let mut namespace_name: Option<String> = None;
    let mut named: Vec<String> = Vec::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "import_clause" {
            let mut clause_cursor = child.walk();
            for part in child.children(&mut clause_cursor) {
                match part.kind() {
                    "identifier" => default_name = Some(node_text(part, source)),
                    "namespace_import" => namespace_name = namespace_identifier(part, source),
                    "named_imports" => named.extend(named_import_locals(part, source)),
                    _ => {}
                }
            }
        }
    }

    let (kind, names) = if let Some(ns) = namespace_name {
        (ImportKind::Es6Namespace, vec![ns])
    } else if let Some(default) = default_name {
        let mut names = vec![default];
        names.append(&mut named);
        (ImportKind::Es6Default, names)
    } else {
        // Side-effect imports are named imports with an empty name list.
        (ImportKind::Es6Named, named)
    };

    push_import(file, &spec, kind, Some(names), node);
}

/// Export statements contribute exported names; re-export forms also
/// contribute an import record for the source module.
fn extract_export(node: Node, source: &[u8], file: &mut ParsedFile) {
    let re_export_source = import_source(node, source);

    let mut clause_names: Vec<String> = Vec::new();
    let mut has_star = false;
    let mut has_default = false;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "export_clause" => clause_names.extend(export_clause_names(child, source)),
            "*" => has_star = true,
            "default" => has_default = true,
            _ => {}
        }
    }

    if let Some(spec) = re_export_source {
        if has_star {
            push_import(file, &spec, ImportKind::ReExport, None, node);
        } else {
            for name in &clause_names {
                file.exports.insert(name.clone());
            }
            push_import(file, &spec, ImportKind::ReExport, Some(clause_names), node);
        }
        return;
    }

    if has_default {
        file.exports.insert("default".to_string());
        return;
    }

    for name in clause_names {
        file.exports.insert(name);
    }
    if let Some(declaration) = node.child_by_field_name("declaration") {
        for name in declaration_names(declaration, source) {
            file.exports.insert(name);
        }
    }
}

/// `require('x')` and `import('x')` call expressions.
fn extract_call(node: Node, source: &[u8], file: &mut ParsedFile) {
    let Some(function) = node.child_by_field_name("function") else {
        return;
    };
    let kind = match function.kind() {
        "import" => ImportKind::Dynamic,
        "identifier" if node_text(function, source) == "require" => ImportKind::CommonJs,
        _ => return,
    };
    let Some(arguments) = node.child_by_field_name("arguments") else {
        return;
    };
    let mut cursor = arguments.walk();
    let Some(spec) = arguments
        .children(&mut cursor)
        .find(|c| c.kind() == "string")
        .and_then(|s| string_value(s, source))
    else {
        return;
    };

    let names = match kind {
        ImportKind::CommonJs => require_binding(node, source).map(|b| vec![b]),
        _ => None,
    };
    push_import(file, &spec, kind, names, node);
}

fn push_import(
    file: &mut ParsedFile,
    spec: &str,
    kind: ImportKind,
    names: Option<Vec<String>>,
    node: Node,
) {
    if spec.is_empty() {
        return;
    }
    let (is_relative, is_external) = ImportRecord::classify_ecma(spec);
    file.imports.push(ImportRecord {
        source: spec.to_string(),
        kind,
        names,
        is_relative,
        is_external,
        line: node.start_position().row + 1,
    });
}

/// The statement's `source` string, unquoted.
fn import_source(node: Node, source: &[u8]) -> Option<String> {
    node.child_by_field_name("source")
        .and_then(|s| string_value(s, source))
}

fn string_value(string_node: Node, source: &[u8]) -> Option<String> {
    let mut cursor = string_node.walk();
    let result = string_node
        .children(&mut cursor)
        .find(|c| c.kind() == "string_fragment")
        .map(|fragment| node_text(fragment, source));
    result
}

fn node_text(node: Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or_default().to_string()
}

/// `* as ns` — the identifier has no field name; find it by kind.
fn namespace_identifier(node: Node, source: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    let result = node
        .children(&mut cursor)
        .find(|c| c.kind() == "identifier")
        .map(|c| node_text(c, source));
    result
}

/// Local binding names from `{ a, b as c }`.
fn named_import_locals(node: Node, source: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "import_specifier" {
            continue;
        }
        let local = child
            .child_by_field_name("alias")
            .or_else(|| child.child_by_field_name("name"));
        if let Some(local) = local {
            names.push(node_text(local, source));
        }
    }
    names
}

/// Exported names from `{ a, b as c }`: the alias wins when present.
fn export_clause_names(node: Node, source: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "export_specifier" {
            continue;
        }
        let exported = child
            .child_by_field_name("alias")
            .or_else(|| child.child_by_field_name("name"));
        if let Some(exported) = exported {
            names.push(node_text(exported, source));
        }
    }
    names
}

/// Identifiers declared by an exported declaration (const/let/var chains,
/// functions, classes).
fn declaration_names(declaration: Node, source: &[u8]) -> Vec<String> {
    match declaration.kind() {
        "function_declaration"
        | "generator_function_declaration"
        | "class_declaration"
        | "abstract_class_declaration" => declaration
            .child_by_field_name("name")
            .map(|n| vec![node_text(n, source)])
            .unwrap_or_default(),
        "lexical_declaration" | "variable_declaration" => {
            let mut names = Vec::new();
            let mut cursor = declaration.walk();
            for child in declaration.children(&mut cursor) {
                if child.kind() == "variable_declarator" {
                    if let Some(name) = child.child_by_field_name("name") {
                        if name.kind() == "identifier" {
                            names.push(node_text(name, source));
                        }
                    }
                }
            }
            names
        }
        _ => Vec::new(),
    }
}

/// Variable name bound to a `require(...)` call, when there is one.
fn require_binding(call: Node, source: &[u8]) -> Option<String> {
    let mut current = call.parent();
    while let Some(node) = current {
        if node.kind() == "variable_declarator" {
            let name = node.child_by_field_name("name")?;
            if name.kind() == "identifier" {
                return Some(node_text(name, source));
            }
            return None;
        }
        current = node.parent();
    }
    None
}

fn first_error_node(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    for child in children {
        if let Some(found) = first_error_node(child) {
            return Some(found);
        }
    }
    Some(node)
}
