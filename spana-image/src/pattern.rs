//! Shell-style label patterns
//!
//! `*` matches any run of characters, `?` any single character, `[abc]` a set
//! and `[!abc]` its complement. Matching is case-sensitive and anchored at both
//! ends. Patterns are translated once into a [`Regex`].

use regex::Regex;

/// Compiled glob pattern
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob pattern
    ///
    /// # Errors
    /// Returns the regex error if the translated pattern is rejected
    /// (only possible for malformed character sets).
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&translate(pattern))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `text` matches the whole pattern
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Translate a glob into an anchored regex
fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("(?s)^");
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => {
                // collapse runs of stars
                while i < chars.len() && chars[i] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => {
                let mut j = i;
                if j < chars.len() && chars[j] == '!' {
                    j += 1;
                }
                if j < chars.len() && chars[j] == ']' {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }

                if j >= chars.len() {
                    // unterminated set is a literal bracket
                    out.push_str(r"\[");
                    continue;
                }

                let body: String = chars[i..j].iter().collect();
                i = j + 1;
                out.push('[');
                out.push_str(&translate_set(&body));
                out.push(']');
            }
            other => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(other.encode_utf8(&mut buf)));
            }
        }
    }

    out.push('$');
    out
}

/// Translate the inside of a `[...]` set
fn translate_set(body: &str) -> String {
    let (negated, body) = match body.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, body),
    };

    let mut out = String::new();
    if negated {
        out.push('^');
    }
    for (k, c) in body.chars().enumerate() {
        match c {
            // '-' keeps its range meaning
            '\\' | '[' | ']' | '&' | '~' => {
                out.push('\\');
                out.push(c);
            }
            '^' if k == 0 && !negated => out.push_str(r"\^"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, text: &str) -> bool {
        GlobPattern::new(pattern).unwrap().matches(text)
    }

    #[test]
    fn test_literal_is_anchored() {
        assert!(matches("Angel", "Angel"));
        assert!(!matches("Angel", "Angels"));
        assert!(!matches("Angel", "angel"));
    }

    #[test]
    fn test_star_and_question() {
        assert!(matches("*Beep*", "Beep"));
        assert!(matches("*Beep*", "Low Beep 2"));
        assert!(matches("An?el", "Angel"));
        assert!(!matches("An?el", "Anel"));
    }

    #[test]
    fn test_sets() {
        assert!(matches("[AB]ngel", "Angel"));
        assert!(!matches("[!AB]ngel", "Angel"));
        assert!(matches("[!AB]ngel", "Cngel"));
        assert!(matches("x[a-c]", "xb"));
        assert!(matches("[]]", "]"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(matches("S (as in sun).", "S (as in sun)."));
        assert!(!matches("a.c", "abc"));
        assert!(matches("[", "["));
        assert!(matches("a+b", "a+b"));
    }

    #[test]
    fn test_filename_style_patterns() {
        assert!(matches("*042*.wav", "042_angel.wav"));
        assert!(!matches("*042*.wav", "043_another.wav"));
    }
}
