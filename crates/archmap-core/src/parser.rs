use std::path::Path;

use crate::scanner::relative_slash_path;
use crate::types::{Language, ParsedFile, SourceFile};

/// Trait that each language parser must implement.
///
/// `parse` must never fail: malformed input yields a `ParsedFile` whose
/// `errors` list records what went wrong and whose imports/exports hold
/// whatever was recovered.
pub trait LanguageParser: Send + Sync {
    fn language(&self) -> Language;

    /// File extensions this parser handles, without the leading dot.
    fn extensions(&self) -> &[&'static str];

    fn can_parse(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = ext.to_lowercase();
        self.extensions().iter().any(|e| *e == ext)
    }

    fn parse(&self, content: &str, path: &Path, root: &Path) -> ParsedFile;
}

/// Build the `SourceFile` header every parser stamps onto its output.
pub fn source_file(path: &Path, root: &Path, content: &str, language: Language) -> SourceFile {
    SourceFile {
        path: path.to_path_buf(),
        relative_path: relative_slash_path(root, path),
        size: content.len() as u64,
        language,
    }
}

/// Ordered parser collection; dispatch picks the first parser claiming
/// a file's extension.
pub struct ParserRegistry {
    parsers: Vec<Box<dyn LanguageParser>>,
}

impl ParserRegistry {
    pub fn new(parsers: Vec<Box<dyn LanguageParser>>) -> Self {
        Self { parsers }
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    pub fn parser_for(&self, path: &Path) -> Option<&dyn LanguageParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(path))
            .map(|p| p.as_ref())
    }

    /// Extensions claimed by at least one registered parser (dotless).
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut exts: Vec<&'static str> = self
            .parsers
            .iter()
            .flat_map(|p| p.extensions().iter().copied())
            .collect();
        exts.sort_unstable();
        exts.dedup();
        exts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct FakeParser;

    impl LanguageParser for FakeParser {
        fn language(&self) -> Language {
            Language::Python
        }

        fn extensions(&self) -> &[&'static str] {
            &["py", "pyi"]
        }

        fn parse(&self, content: &str, path: &Path, root: &Path) -> ParsedFile {
            ParsedFile::new(source_file(path, root, content, Language::Python))
        }
    }

    #[test]
    fn test_can_parse_by_extension() {
        let parser = FakeParser;
        assert!(parser.can_parse(Path::new("pkg/mod.py")));
        assert!(parser.can_parse(Path::new("pkg/MOD.PY")));
        assert!(!parser.can_parse(Path::new("pkg/mod.go")));
        assert!(!parser.can_parse(Path::new("Makefile")));
    }

    #[test]
    fn test_registry_dispatch() {
        let registry = ParserRegistry::new(vec![Box::new(FakeParser)]);
        assert!(registry.parser_for(Path::new("a.py")).is_some());
        assert!(registry.parser_for(Path::new("a.ts")).is_none());
        assert_eq!(registry.supported_extensions(), vec!["py", "pyi"]);
    }

    #[test]
    fn test_source_file_relative_path() {
        let root = PathBuf::from("/repo");
        let file = source_file(Path::new("/repo/pkg/mod.py"), &root, "x = 1\n", Language::Python);
        assert_eq!(file.relative_path, "pkg/mod.py");
        assert_eq!(file.size, 6);
    }
}
