//! Shell-style wildcard patterns (`*`, `?`, `[abc]`, `[!abc]`) for record filters.

use regex::Regex;

use crate::error::{KekError, Result};

/// A compiled wildcard pattern matching whole strings, case-sensitive.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&translate(pattern))
            .map_err(|e| KekError::InvalidInput(format!("bad pattern '{}': {}", pattern, e)))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Translate a wildcard pattern into an anchored regex.
fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("(?s)^");
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let mut j = i;
                if j < chars.len() && chars[j] == '!' {
                    j += 1;
                }
                // a leading ']' is part of the set
                if j < chars.len() && chars[j] == ']' {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    out.push_str("\\[");
                    continue;
                }

                let mut set = String::from("[");
                let mut k = i;
                if chars[k] == '!' {
                    set.push('^');
                    k += 1;
                }
                for &sc in &chars[k..j] {
                    match sc {
                        '\\' | '[' | ']' | '^' | '&' | '~' => {
                            set.push('\\');
                            set.push(sc);
                        }
                        _ => set.push(sc),
                    }
                }
                set.push(']');
                out.push_str(&set);
                i = j + 1;
            }
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }

    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, text: &str) -> bool {
        Pattern::new(pattern).unwrap().is_match(text)
    }

    #[test]
    fn test_literal_is_whole_string() {
        assert!(matches("ARD", "ARD"));
        assert!(!matches("ARD", "ARD Mediathek"));
        assert!(!matches("ard", "ARD"));
    }

    #[test]
    fn test_star_and_question_mark() {
        assert!(matches("*Verlag*", "Axel Springer Verlag GmbH"));
        assert!(matches("Radio ?", "Radio 7"));
        assert!(!matches("Radio ?", "Radio 21"));
        assert!(matches("*", ""));
    }

    #[test]
    fn test_character_classes() {
        assert!(matches("[RT]V", "TV"));
        assert!(!matches("[!RT]V", "TV"));
        assert!(matches("[!RT]V", "SV"));
        assert!(matches("[]]x", "]x"));
    }

    #[test]
    fn test_unclosed_bracket_is_literal() {
        assert!(matches("a[b", "a[b"));
        assert!(!matches("a[b", "ab"));
    }

    #[test]
    fn test_regex_metacharacters_escaped() {
        assert!(matches("Sat.1 (Bayern)", "Sat.1 (Bayern)"));
        assert!(!matches("Sat.1", "Sat11"));
        assert_eq!(Pattern::new("x*").unwrap().as_str(), "x*");
    }
}
