//! Static syntax checking of candidate scripts
//!
//! A candidate that does not parse is rejected before anything is written
//! into a sandbox, let alone executed.

use tree_sitter::{Node, Parser};

/// A static parse failure in a candidate script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    /// Human-readable description
    pub message: String,
    /// 1-based line of the first offending node, when located
    pub line: Option<usize>,
    /// 0-based column of the first offending node, when located
    pub column: Option<usize>,
}

impl std::fmt::Display for SyntaxIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => {
                write!(f, "{} at line {}, column {}", self.message, line, column)
            }
            _ => write!(f, "{}", self.message),
        }
    }
}

/// Statically parse `source` as Python.
///
/// Returns the first detected issue, or `Ok(())` for a syntactically valid
/// script. Semantic problems (undefined names, bad imports) are out of
/// reach here; those surface during sandbox execution instead.
pub fn check_python(source: &str) -> Result<(), SyntaxIssue> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| SyntaxIssue {
            message: format!("python grammar unavailable: {e}"),
            line: None,
            column: None,
        })?;

    let tree = parser.parse(source, None).ok_or_else(|| SyntaxIssue {
        message: "parser produced no tree".to_string(),
        line: None,
        column: None,
    })?;

    let root = tree.root_node();
    if !root.has_error() {
        return Ok(());
    }

    let node = first_error_node(root).unwrap_or(root);
    let point = node.start_position();
    let message = if node.is_missing() {
        format!("missing {}", node.kind())
    } else {
        "invalid python syntax".to_string()
    };
    Err(SyntaxIssue {
        message,
        line: Some(point.row + 1),
        column: Some(point.column),
    })
}

fn first_error_node(node: Node<'_>) -> Option<Node<'_>> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    for child in children {
        if let Some(found) = first_error_node(child) {
            return Some(found);
        }
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_script() {
        let script = "import subprocess\n\ncmd = ['ffmpeg', '-i', 'in.mp4', 'out.mp4']\nsubprocess.run(cmd, check=True)\n";
        assert!(check_python(script).is_ok());
    }

    #[test]
    fn rejects_unbalanced_parentheses() {
        let issue = check_python("print('hello'\n").unwrap_err();
        assert!(issue.line.is_some());
    }

    #[test]
    fn rejects_broken_block() {
        let issue = check_python("def f(:\n    pass\n").unwrap_err();
        assert_eq!(issue.line, Some(1));
    }

    #[test]
    fn accepts_empty_source() {
        assert!(check_python("").is_ok());
    }

    #[test]
    fn issue_display_mentions_location() {
        let issue = check_python("x = (1,\n").unwrap_err();
        let rendered = issue.to_string();
        assert!(rendered.contains("line"), "got: {rendered}");
    }
}
