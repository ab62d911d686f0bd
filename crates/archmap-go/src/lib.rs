use std::path::Path;

use regex::Regex;

use archmap_core::parser::{source_file, LanguageParser};
use archmap_core::types::{ImportKind, ImportRecord, Language, ParsedFile};

/// Go standard library top-level packages (fixed list).
pub const GO_STDLIB: &[&str] = &[
    "archive", "bufio", "builtin", "bytes", "cmp", "compress", "container", "context", "crypto",
    "database", "debug", "embed", "encoding", "errors", "expvar", "flag", "fmt", "go", "hash",
    "html", "image", "index", "io", "iter", "log", "maps", "math", "mime", "net", "os", "path",
    "plugin", "reflect", "regexp", "runtime", "slices", "sort", "strconv", "strings", "sync",
    "syscall", "testing", "text", "time", "unicode", "unsafe",
];

/// Well-known hosting prefixes for module paths.
const HOSTING_PREFIXES: &[&str] = &[
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "golang.org",
    "google.golang.org",
    "gopkg.in",
    "k8s.io",
    "sigs.k8s.io",
];

/// Lexical Go parser. Imports sit in a restricted top-of-file grammar, so a
/// comment-stripped line scan recovers them reliably.
pub struct GoParser {
    single_re: Regex,
    block_start_re: Regex,
    block_entry_re: Regex,
    block_end_re: Regex,
    func_re: Regex,
    type_re: Regex,
}

impl GoParser {
    pub fn new() -> Self {
        Self {
            single_re: Regex::new(r#"^\s*import\s+(?:([\w.]+)\s+)?"([^"]+)""#)
                .expect("single import pattern must compile"),
            block_start_re: Regex::new(r"^\s*import\s*\(")
                .expect("import block pattern must compile"),
            block_entry_re: Regex::new(r#"^\s*(?:([\w.]+|_)\s+)?"([^"]+)""#)
                .expect("block entry pattern must compile"),
            block_end_re: Regex::new(r"^\s*\)").expect("block end pattern must compile"),
            func_re: Regex::new(r"^func\s+(?:\([^)]*\)\s*)?([A-Z][A-Za-z0-9_]*)")
                .expect("func pattern must compile"),
            type_re: Regex::new(r"^type\s+([A-Z][A-Za-z0-9_]*)")
                .expect("type pattern must compile"),
        }
    }

    fn push_import(&self, file: &mut ParsedFile, alias: Option<&str>, path: &str, line: usize) {
        let is_relative = path.starts_with("./") || path.starts_with("../");
        let name = alias.map(str::to_string).unwrap_or_else(|| {
            path.rsplit('/').next().unwrap_or(path).to_string()
        });
        file.imports.push(ImportRecord {
            source: path.to_string(),
            kind: ImportKind::GoImport,
            names: Some(vec![name]),
            is_relative,
            is_external: !is_relative && is_external_module(path),
            line,
        });
    }
}

impl Default for GoParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for GoParser {
    fn language(&self) -> Language {
        Language::Go
    }

    fn extensions(&self) -> &[&'static str] {
        &["go"]
    }

    fn parse(&self, content: &str, path: &Path, root: &Path) -> ParsedFile {
        let mut file = ParsedFile::new(source_file(path, root, content, Language::Go));
        let stripped = strip_comments(content);

        let lines: Vec<&str> = stripped.lines().collect();
        let mut in_block = false;
        for (index, line) in lines.iter().enumerate() {
            let line_number = index + 1;
            if in_block {
                if self.block_end_re.is_match(line) {
                    in_block = false;
                } else if let Some(captures) = self.block_entry_re.captures(line) {
                    let alias = captures.get(1).map(|m| m.as_str());
                    self.push_import(&mut file, alias, &captures[2], line_number);
                }
                continue;
            }
            if self.block_start_re.is_match(line) {
                in_block = true;
                continue;
            }
            if let Some(captures) = self.single_re.captures(line) {
                let alias = captures.get(1).map(|m| m.as_str());
                self.push_import(&mut file, alias, &captures[2], line_number);
                continue;
            }
            if let Some(captures) = self.func_re.captures(line) {
                file.exports.insert(captures[1].to_string());
            } else if let Some(captures) = self.type_re.captures(line) {
                file.exports.insert(captures[1].to_string());
            }
        }

        file
    }
}

/// External iff the first slash-segment looks like a module host (contains
/// a dot or is a known hosting prefix); standard-library and plain internal
/// paths are not external.
fn is_external_module(path: &str) -> bool {
    let first = path.split('/').next().unwrap_or(path);
    if GO_STDLIB.contains(&first) {
        return false;
    }
    first.contains('.') || HOSTING_PREFIXES.contains(&first)
}

/// Replace `//` and `/* */` comments with blanks, preserving newlines and
/// leaving string contents untouched.
fn strip_comments(content: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        DoubleQuote,
        Backtick,
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
                    state = State::DoubleQuote;
                    out.push(c);
                    index += 1;
                }
                '`' => {
                    state = State::Backtick;
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
            State::DoubleQuote => {
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
            State::Backtick => {
                if c == '`' {
                    state = State::Code;
                }
                out.push(c);
                index += 1;
            }
        }
    }
    out
}
