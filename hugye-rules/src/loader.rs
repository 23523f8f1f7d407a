//! Reads rule files into a [`DomainTree`](crate::tree::DomainTree).
//!
//! A rule file is plain UTF-8 text with one hostname pattern per line.
//! Comment lines start with `#`. Host file dumps commonly carry bare IPv4
//! addresses, those lines are skipped. A line longer than 512 bytes aborts
//! the file.

use crate::tree::DomainTree;
use std::fmt::Display;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const MAX_LINE_LENGTH: usize = 512;

#[derive(Debug)]
pub enum RulesError {
    Io(std::io::Error),
    LineTooLong { line: usize },
}

impl Display for RulesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(inner) => write!(f, "unable to read rules: {inner}"),
            Self::LineTooLong { line } => {
                write!(f, "line {line} exceeds {MAX_LINE_LENGTH} bytes")
            }
        }
    }
}

impl std::error::Error for RulesError {}

impl From<std::io::Error> for RulesError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Textual IPv4 literal detection: 8 to 15 characters of digits and dots,
/// exactly three dots, no empty group.
fn is_ipv4(value: &str) -> bool {
    let value = value.trim();
    if value.len() < 8 || value.len() > 15 {
        return false;
    }

    let mut digits = 0;
    let mut dots = 0;
    for c in value.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => {
                if digits == 0 {
                    return false;
                }
                digits = 0;
                dots += 1;
            }
            _ => return false,
        }
    }
    dots == 3 && digits > 0
}

/// Load the rule file at `path` into the tree, returning the number of
/// patterns added.
pub fn load_file(path: &Path, tree: &mut DomainTree) -> Result<usize, RulesError> {
    let file = std::fs::File::open(path)?;
    read_rules(file, tree)
}

/// Feed every pattern line of `input` into the tree. Comments, IPv4
/// literals and empty lines are skipped; an invalid pattern is logged and
/// skipped; an overlong line aborts the whole input.
pub fn read_rules<R: Read>(input: R, tree: &mut DomainTree) -> Result<usize, RulesError> {
    let mut reader = BufReader::new(input);
    let mut buffer = Vec::with_capacity(MAX_LINE_LENGTH);
    let mut line_number = 0;
    let mut added = 0;

    loop {
        line_number += 1;
        buffer.clear();
        let size = reader.read_until(b'\n', &mut buffer)?;
        if size == 0 {
            return Ok(added);
        }
        // the trailing newline is not part of the line
        if buffer.last() == Some(&b'\n') {
            buffer.pop();
        }
        if buffer.len() > MAX_LINE_LENGTH {
            return Err(RulesError::LineTooLong { line: line_number });
        }

        let line = String::from_utf8_lossy(&buffer);
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || is_ipv4(line) {
            continue;
        }
        match tree.add(line) {
            Ok(()) => added += 1,
            Err(error) => tracing::warn!("skipping rule at line {line_number}: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{is_ipv4, read_rules, RulesError};
    use crate::tree::DomainTree;

    #[test]
    fn should_detect_ipv4_literals() {
        assert!(is_ipv4("192.168.0.1"));
        assert!(is_ipv4("10.20.30.40"));
        assert!(is_ipv4("255.255.255.255"));
        // below the 8 character floor, kept as a pattern
        assert!(!is_ipv4("8.8.8.8"));
        assert!(!is_ipv4("192.168..1"));
        assert!(!is_ipv4("192.168.0"));
        assert!(!is_ipv4("192.168.0.1.2"));
        assert!(!is_ipv4("a92.168.0.1"));
        assert!(!is_ipv4("192.168.0.1x"));
    }

    #[test]
    fn should_load_patterns_and_skip_noise() {
        let data = "# ads and trackers\nads.example.com\n192.168.10.20\n\n  tracker.net  \n";
        let mut tree = DomainTree::default();
        let added = read_rules(data.as_bytes(), &mut tree).unwrap();
        assert_eq!(added, 2);
        assert!(tree.matches("ads.example.com"));
        assert!(tree.matches("tracker.net"));
        assert!(!tree.matches("192.168.10.20"));
    }

    #[test]
    fn should_skip_invalid_patterns() {
        let data = "valid.example.com\nbro{ken\nalso-valid.net\n";
        let mut tree = DomainTree::default();
        let added = read_rules(data.as_bytes(), &mut tree).unwrap();
        assert_eq!(added, 2);
        assert!(tree.matches("valid.example.com"));
        assert!(tree.matches("also-valid.net"));
    }

    #[test]
    fn should_handle_missing_final_newline() {
        let data = "one.example.com\ntwo.example.com";
        let mut tree = DomainTree::default();
        let added = read_rules(data.as_bytes(), &mut tree).unwrap();
        assert_eq!(added, 2);
        assert!(tree.matches("two.example.com"));
    }

    #[test]
    fn should_abort_on_overlong_line() {
        let mut data = String::from("fine.example.com\n");
        data.push_str(&"x".repeat(600));
        data.push('\n');
        let mut tree = DomainTree::default();
        let error = read_rules(data.as_bytes(), &mut tree).unwrap_err();
        assert!(matches!(error, RulesError::LineTooLong { line: 2 }));
        // patterns before the failure are kept
        assert!(tree.matches("fine.example.com"));
    }
}
