use std::path::Path;

use regex::Regex;

use archmap_core::parser::{source_file, LanguageParser};
use archmap_core::types::{ImportKind, ImportRecord, Language, ParsedFile};

/// JDK-reserved import roots.
const STD_ROOTS: &[&str] = &["java", "javax", "sun"];

/// Lexical Java parser: `import [static] dotted.name[.*];` declarations and
/// public type declarations, scanned over comment-stripped lines.
pub struct JavaParser {
    package_re: Regex,
    import_re: Regex,
    type_re: Regex,
}

impl JavaParser {
    pub fn new() -> Self {
        Self {
            package_re: Regex::new(r"^\s*package\s+([\w.]+)\s*;")
                .expect("package pattern must compile"),
            import_re: Regex::new(r"^\s*import\s+(?:static\s+)?([\w.]+?)(\.\*)?\s*;")
                .expect("import pattern must compile"),
            type_re: Regex::new(
                r"^\s*public\s+(?:abstract\s+|final\s+)*(?:class|interface|enum)\s+(\w+)",
            )
            .expect("type pattern must compile"),
        }
    }
}

impl Default for JavaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for JavaParser {
    fn language(&self) -> Language {
        Language::Java
    }

    fn extensions(&self) -> &[&'static str] {
        &["java"]
    }

    fn parse(&self, content: &str, path: &Path, root: &Path) -> ParsedFile {
        let mut file = ParsedFile::new(source_file(path, root, content, Language::Java));
        let stripped = strip_comments(content);

        let package_root = stripped
            .lines()
            .find_map(|line| self.package_re.captures(line))
            .map(|captures| {
                captures[1]
                    .split('.')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            })
            .unwrap_or_default();

        for (index, line) in stripped.lines().enumerate() {
            if let Some(captures) = self.import_re.captures(line) {
                let dotted = captures[1].to_string();
                let is_wildcard = captures.get(2).is_some();
                let names = if is_wildcard {
                    vec!["*".to_string()]
                } else {
                    vec![dotted
                        .rsplit('.')
                        .next()
                        .unwrap_or(dotted.as_str())
                        .to_string()]
                };
                file.imports.push(ImportRecord {
                    is_external: is_external_import(&dotted, &package_root),
                    source: dotted,
                    kind: ImportKind::JavaImport,
                    names: Some(names),
                    is_relative: false,
                    line: index + 1,
                });
            } else if let Some(captures) = self.type_re.captures(line) {
                file.exports.insert(captures[1].to_string());
            }
        }

        file
    }
}

/// External iff the import root is a JDK prefix, or the import's top-level
/// segment differs from the file's package top-level segment.
fn is_external_import(dotted: &str, package_root: &str) -> bool {
    if dotted == "com.sun" || dotted.starts_with("com.sun.") {
        return true;
    }
    let root = dotted.split('.').next().unwrap_or(dotted);
    if STD_ROOTS.contains(&root) {
        return true;
    }
    root != package_root
}

/// Replace `//` and `/* */` comments with blanks, preserving newlines and
/// leaving string literals untouched.
fn strip_comments(content: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        StringLiteral,
    }

    let chars: Vec<char> = content.chars().collect();
    let mut out = String::with_capacity(content.len());
    let mut state = State::Code;
    let mut index = 0;
    while index < chars.len() {
        let c = chars[index];
        let next = chars.get(index + 1).copied();
        match state {
            State::Code => match c {
                '/' if next == Some('/') => {
                    state = State::LineComment;
                    out.push_str("  ");
                    index += 2;
                }
                '/' if next == Some('*') => {
                    state = State::BlockComment;
                    out.push_str("  ");
                    index += 2;
                }
                '"' => {
                    state = State::StringLiteral;
                    out.push(c);
                    index += 1;
                }
                _ => {
                    out.push(c);
                    index += 1;
                }
            },
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                    out.push('\n');
                } else {
                    out.push(' ');
                }
                index += 1;
            }
            State::BlockComment => {
                if c == '*' && next == Some('/') {
                    state = State::Code;
                    out.push_str("  ");
                    index += 2;
                } else {
                    out.push(if c == '\n' { '\n' } else { ' ' });
                    index += 1;
                }
            }
            State::StringLiteral => {
                if c == '\\' {
                    out.push(c);
                    if let Some(n) = next {
                        out.push(n);
                    }
                    index += 2;
                } else {
                    if c == '"' {
                        state = State::Code;
                    }
                    out.push(c);
                    index += 1;
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> ParsedFile {
        let parser = JavaParser::new();
        let root = Path::new("/repo");
        parser.parse(content, &root.join("src/com/app/Service.java"), root)
    }

    #[test]
    fn test_simple_import() {
        let file = parse("package com.app;\n\nimport java.util.List;\n");
        assert_eq!(file.imports.len(), 1);
        let import = &file.imports[0];
        assert_eq!(import.kind, ImportKind::JavaImport);
        assert_eq!(import.source, "java.util.List");
        assert_eq!(import.names.as_deref(), Some(&["List".to_string()][..]));
        assert!(import.is_external);
        assert!(!import.is_relative);
        assert_eq!(import.line, 3);
    }

    #[test]
    fn test_wildcard_import() {
        let file = parse("package com.app;\nimport com.app.util.*;\n");
        let import = &file.imports[0];
        assert_eq!(import.source, "com.app.util");
        assert_eq!(import.names.as_deref(), Some(&["*".to_string()][..]));
        assert!(!import.is_external);
    }

    #[test]
    fn test_static_import() {
        let file = parse("package com.app;\nimport static org.junit.Assert.assertEquals;\n");
        let import = &file.imports[0];
        assert_eq!(import.source, "org.junit.Assert.assertEquals");
        assert!(import.is_external);
    }

    #[test]
    fn test_same_project_import_is_internal() {
        let file = parse("package com.app;\nimport com.app.model.User;\n");
        assert!(!file.imports[0].is_external);
    }

    #[test]
    fn test_other_top_segment_is_external() {
        let file = parse("package com.app;\nimport org.slf4j.Logger;\n");
        assert!(file.imports[0].is_external);
    }

    #[test]
    fn test_com_sun_is_external() {
        assert!(is_external_import("com.sun.net.httpserver.HttpServer", "com"));
        assert!(is_external_import("javax.inject.Inject", "com"));
        assert!(!is_external_import("com.app.util.Helper", "com"));
    }

    #[test]
    fn test_public_type_exports() {
        let file = parse(
            "package com.app;\n\npublic class Service {}\npublic abstract class Base {}\npublic interface Port {}\npublic enum Mode { A, B }\nclass Hidden {}\n",
        );
        let exports: Vec<&str> = file.exports.iter().map(String::as_str).collect();
        assert_eq!(exports, vec!["Base", "Mode", "Port", "Service"]);
    }

    #[test]
    fn test_comments_ignored() {
        let file = parse(
            "package com.app;\n// import java.fake.One;\n/*\nimport java.fake.Two;\n*/\nimport java.util.Map;\n",
        );
        assert_eq!(file.imports.len(), 1);
        assert_eq!(file.imports[0].source, "java.util.Map");
        assert_eq!(file.imports[0].line, 6);
    }

    #[test]
    fn test_no_package_declaration() {
        let file = parse("import util.Helper;\n");
        // With no package, any non-JDK top segment counts as external.
        assert!(file.imports[0].is_external);
    }

    #[test]
    fn test_malformed_input_never_panics() {
        let file = parse("import ;;;\npublic class {\n");
        assert!(file.imports.is_empty());
        assert!(file.exports.is_empty());
    }

    #[test]
    fn test_can_parse_extension() {
        let parser = JavaParser::new();
        assert!(parser.can_parse(Path::new("Main.java")));
        assert!(!parser.can_parse(Path::new("main.go")));
    }
}
