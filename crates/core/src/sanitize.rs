//! Filename sanitization for blob storage paths.
//!
//! Uploaded filenames end up as path segments under `incoming/`,
//! `processing/`, `approved/` and `rejected/`, so anything that could be
//! interpreted by the storage layer must be stripped before the first
//! write.

/// Sanitize an uploaded filename into a safe storage path segment.
///
/// Strips path separators and special characters, collapses whitespace to
/// hyphens, removes `..` sequences, lowercases, and preserves the
/// extension. An input that sanitizes to nothing becomes `"file"`.
pub fn sanitize_filename(name: &str) -> String {
    let lowered = name.trim().to_lowercase();

    let mut out = String::with_capacity(lowered.len());
    let mut last_was_hyphen = false;
    for ch in lowered.chars() {
        let mapped = match ch {
            'a'..='z' | '0'..='9' | '.' | '_' | '-' => Some(ch),
            c if c.is_whitespace() => Some('-'),
            // Path separators and shell/url special characters are dropped.
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '#' | '%' | '&' | '{' | '}'
            | '$' | '!' | '\'' | '@' | '+' | '`' | '=' | '~' | ';' | ',' | '(' | ')' | '[' | ']' => {
                None
            }
            // Anything else non-ascii is dropped too.
            _ => None,
        };
        if let Some(c) = mapped {
            if c == '-' {
                if last_was_hyphen {
                    continue;
                }
                last_was_hyphen = true;
            } else {
                last_was_hyphen = false;
            }
            out.push(c);
        }
    }

    // Remove parent-directory sequences after character stripping.
    while out.contains("..") {
        out = out.replace("..", ".");
    }
    let out = out.trim_matches(['-', '.']).to_string();

    if out.is_empty() {
        "file".to_string()
    } else {
        out
    }
}
