use regex::{Regex, RegexBuilder};

/// Translate a glob pattern into a regular expression string.
///
/// `*` matches any run of non-slash characters, `**` matches any run
/// including slashes, and every other character is literal. A pattern not
/// starting with `**` is anchored at the start; a pattern not ending with
/// `*` or `**` is anchored at the end.
pub fn glob_to_regex_str(pattern: &str) -> String {
    let mut re = String::new();
    if !pattern.starts_with("**") {
        re.push('^');
    }
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    re.push_str(".*");
                } else {
                    re.push_str("[^/]*");
                }
            }
            _ => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    if !pattern.ends_with('*') {
        re.push('$');
    }
    re
}

/// Compile a glob into a case-sensitive matcher (scanner ignore rules).
pub fn compile_glob(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&glob_to_regex_str(pattern))
}

/// Compile a glob into a case-insensitive matcher (layer grouping rules).
pub fn compile_glob_ci(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&glob_to_regex_str(pattern))
        .case_insensitive(true)
        .build()
}
