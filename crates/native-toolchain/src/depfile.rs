//! Make-style dependency output parser.
//!
//! Handles the subset gcc and clang emit for `-M`:
//! - `target: prereq prereq \` with backslash-newline continuations
//! - `\ ` for spaces inside paths, `$$` for a literal dollar, `\#` for `#`
//! - several rules in one file (as produced by `-MP`)
//! - Windows drive letters in paths (`C:\x\y.h`)

use crate::error::{ToolchainError, ToolchainResult};

/// Return the prerequisites of every rule in `content`, first occurrence
/// order, duplicates removed.
pub fn parse_depfile(content: &str) -> ToolchainResult<Vec<String>> {
    let joined = content
        .replace("\\\r\n", " ")
        .replace("\\\n", " ");

    let mut seen = std::collections::HashSet::new();
    let mut prereqs = Vec::new();

    for line in joined.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let sep = rule_separator(line)
            .ok_or_else(|| ToolchainError::Depfile(format!("no rule separator in '{}'", line.trim())))?;
        for item in split_escaped(&line[sep + 1..]) {
            if seen.insert(item.clone()) {
                prereqs.push(item);
            }
        }
    }

    Ok(prereqs)
}

/// Index of the ':' separating targets from prerequisites.
///
/// A colon followed by a path separator is a drive letter, not a separator.
fn rule_separator(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    bytes.iter().enumerate().find_map(|(i, &b)| {
        if b != b':' {
            return None;
        }
        match bytes.get(i + 1) {
            Some(b'\\') | Some(b'/') if i == 1 || (i >= 2 && bytes[i - 2].is_ascii_whitespace()) => None,
            _ => Some(i),
        }
    })
}

fn split_escaped(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(' ') | Some('#') => {
                    current.push(chars.next().unwrap_or(' '));
                }
                _ => current.push('\\'),
            },
            '$' if chars.peek() == Some(&'$') => {
                chars.next();
                current.push('$');
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    items.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        items.push(current);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_rule() {
        let deps = parse_depfile("a.o: a.cpp a.h b.h\n").unwrap();
        assert_eq!(deps, vec!["a.cpp", "a.h", "b.h"]);
    }

    #[test]
    fn test_continuations() {
        let text = "a.o: a.cpp \\\n  include/a.h \\\n  /usr/include/stdio.h\n";
        let deps = parse_depfile(text).unwrap();
        assert_eq!(deps, vec!["a.cpp", "include/a.h", "/usr/include/stdio.h"]);
    }

    #[test]
    fn test_escaped_space_and_dollar() {
        let deps = parse_depfile("a.o: my\\ dir/a.h cost$$.h\n").unwrap();
        assert_eq!(deps, vec!["my dir/a.h", "cost$.h"]);
    }

    #[test]
    fn test_multiple_rules_deduplicated() {
        let text = "a.o: a.cpp common.h\nb.o: b.cpp common.h\ncommon.h:\n";
        let deps = parse_depfile(text).unwrap();
        assert_eq!(deps, vec!["a.cpp", "common.h", "b.cpp"]);
    }

    #[test]
    fn test_windows_drive_letters() {
        let deps = parse_depfile("C:\\out\\a.obj: C:\\src\\a.cpp C:\\src\\a.h\n").unwrap();
        assert_eq!(deps, vec!["C:\\src\\a.cpp", "C:\\src\\a.h"]);
    }

    #[test]
    fn test_missing_separator_is_error() {
        assert!(matches!(
            parse_depfile("just some words\n"),
            Err(ToolchainError::Depfile(_))
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_depfile("").unwrap().is_empty());
    }
}
