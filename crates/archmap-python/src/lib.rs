use std::path::Path;

use regex::Regex;

use archmap_core::parser::{source_file, LanguageParser};
use archmap_core::types::{ImportKind, ImportRecord, Language, ParsedFile};

/// Lexical Python parser.
///
/// Imports occupy a restricted grammar, so a line-oriented pass over
/// string- and comment-stripped content is sufficient. The strip pass
/// preserves line counts so reported line numbers match the original file.
pub struct PythonParser {
    import_re: Regex,
    from_re: Regex,
    all_re: Regex,
    string_re: Regex,
    name_re: Regex,
}

impl PythonParser {
    pub fn new() -> Self {
        Self {
            import_re: Regex::new(r"^\s*import\s+(.+)$").expect("import pattern must compile"),
            from_re: Regex::new(r"^\s*from\s+([.\w]+)\s+import\s+(.*)$")
                .expect("from pattern must compile"),
            all_re: Regex::new(r"^__all__\s*=\s*[\[(]").expect("__all__ pattern must compile"),
            string_re: Regex::new(r#"'[^'\n]*'|"[^"\n]*""#).expect("string pattern must compile"),
            name_re: Regex::new(r#"["']([^"']+)["']"#).expect("name pattern must compile"),
        }
    }

    /// Remove triple-quoted strings, then `#` comments, then single-line
    /// strings, leaving the same number of lines.
    fn strip_noncode(&self, content: &str) -> String {
        let without_blocks = strip_triple_quoted(content);
        let without_comments: String = without_blocks
            .lines()
            .map(|line| match line.find('#') {
                Some(position) => &line[..position],
                None => line,
            })
            .collect::<Vec<_>>()
            .join("\n");
        self.string_re.replace_all(&without_comments, "''").into_owned()
    }

    fn parse_imports(&self, stripped: &str, file: &mut ParsedFile) {
        let lines: Vec<&str> = stripped.lines().collect();
        let mut index = 0;
        while index < lines.len() {
            let line = lines[index];
            let line_number = index + 1;

            if let Some(captures) = self.from_re.captures(line) {
                let module = captures[1].to_string();
                let mut names_part = captures[2].to_string();
                // Parenthesized name lists may span lines.
                if names_part.trim_start().starts_with('(') {
                    while !names_part.contains(')') && index + 1 < lines.len() {
                        index += 1;
                        names_part.push(' ');
                        names_part.push_str(lines[index]);
                    }
                }
                let names = split_import_names(&names_part);
                let is_relative = module.starts_with('.');
                file.imports.push(ImportRecord {
                    is_external: !is_relative && !module.contains('.'),
                    source: module,
                    kind: ImportKind::PythonFrom,
                    names: Some(names),
                    is_relative,
                    line: line_number,
                });
            } else if let Some(captures) = self.import_re.captures(line) {
                for item in captures[1].split(',') {
                    let item = item.trim();
                    if item.is_empty() {
                        continue;
                    }
                    let (module, alias) = split_alias(item);
                    if module.is_empty() {
                        continue;
                    }
                    let is_relative = module.starts_with('.');
                    file.imports.push(ImportRecord {
                        is_external: !is_relative && !module.contains('.'),
                        source: module.to_string(),
                        kind: ImportKind::PythonImport,
                        names: alias.map(|a| vec![a.to_string()]),
                        is_relative,
                        line: line_number,
                    });
                }
            }
            index += 1;
        }
    }

    /// `__all__ = [...]` at module level defines the export list.
    fn parse_exports(&self, content: &str, file: &mut ParsedFile) {
        let lines: Vec<&str> = content.lines().collect();
        for (index, line) in lines.iter().enumerate() {
            if !self.all_re.is_match(line) {
                continue;
            }
            let close = if line.contains('[') { ']' } else { ')' };
            let mut block = (*line).to_string();
            let mut cursor = index;
            while !block.contains(close) && cursor + 1 < lines.len() {
                cursor += 1;
                block.push(' ');
                block.push_str(lines[cursor]);
            }
            for captures in self.name_re.captures_iter(&block) {
                file.exports.insert(captures[1].to_string());
            }
            break;
        }
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for PythonParser {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extensions(&self) -> &[&'static str] {
        &["py", "pyw", "pyi"]
    }

    fn parse(&self, content: &str, path: &Path, root: &Path) -> ParsedFile {
        let mut file = ParsedFile::new(source_file(path, root, content, Language::Python));
        let stripped = self.strip_noncode(content);
        self.parse_imports(&stripped, &mut file);
        self.parse_exports(content, &mut file);
        file
    }
}

/// `name as alias` -> (name, Some(alias)).
fn split_alias(item: &str) -> (&str, Option<&str>) {
    let mut parts = item.split_whitespace();
    let name = parts.next().unwrap_or("");
    match (parts.next(), parts.next()) {
        (Some("as"), Some(alias)) => (name, Some(alias)),
        _ => (name, None),
    }
}

/// Split a from-import name list, dropping parens and aliases. `*` survives.
fn split_import_names(names_part: &str) -> Vec<String> {
    names_part
        .replace(['(', ')'], " ")
        .split(',')
        .filter_map(|item| {
            let (name, _) = split_alias(item.trim());
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

/// Replace triple-quoted string contents with blanks, preserving newlines.
fn strip_triple_quoted(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut out = String::with_capacity(content.len());
    let mut inside: Option<char> = None;
    let mut index = 0;
    while index < chars.len() {
        let c = chars[index];
        let is_triple = (c == '"' || c == '\'')
            && index + 2 < chars.len()
            && chars[index + 1] == c
            && chars[index + 2] == c;
        match inside {
            Some(quote) => {
                if is_triple && c == quote {
                    inside = None;
                    index += 3;
                } else {
                    if c == '\n' {
                        out.push('\n');
                    }
                    index += 1;
                }
            }
            None => {
                if is_triple {
                    inside = Some(c);
                    index += 3;
                } else {
                    out.push(c);
                    index += 1;
                }
            }
        }
    }
    out
}
