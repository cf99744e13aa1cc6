// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Textual rendering of IR trees.

use crate::Node;

/// Output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderStyle {
    /// Two-space indentation, one field per line. The canonical form.
    #[default]
    Pretty,
    /// Single line without whitespace.
    Compact,
}

/// Renders a tree as JSON with the tag first and fields in a fixed order.
pub fn render(node: &Node, style: RenderStyle) -> serde_json::Result<String> {
    match style {
        RenderStyle::Pretty => serde_json::to_string_pretty(node),
        RenderStyle::Compact => serde_json::to_string(node),
    }
}

/// Reads a rendered tree back.
pub fn parse(text: &str) -> serde_json::Result<Node> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment() -> Node {
        Node::Assign {
            idents: vec![Node::ident("z")],
            vals: vec![Node::binop("+", Node::ident("z"), Node::ident("x"))],
            op: "=".to_string(),
        }
    }

    #[test]
    fn test_pretty_uses_two_space_indent() {
        let text = render(&Node::Go { call: Box::new(Node::call(Node::ident("f"), vec![])) }, RenderStyle::Pretty).unwrap();
        assert_eq!(
            text,
            r#"{
  "tag": "go",
  "call": {
    "tag": "call",
    "fun": {
      "tag": "ident",
      "val": "f"
    },
    "args": []
  }
}"#
        );
    }

    #[test]
    fn test_compact_is_single_line() {
        let text = render(&assignment(), RenderStyle::Compact).unwrap();
        assert!(!text.contains('\n'));
        assert!(text.starts_with(r#"{"tag":"assign","idents":"#));
        assert!(text.ends_with(r#""op":"="}"#));
    }

    #[test]
    fn test_both_styles_parse_back() {
        for style in [RenderStyle::Pretty, RenderStyle::Compact] {
            let text = render(&assignment(), style).unwrap();
            assert_eq!(parse(&text).unwrap(), assignment());
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        assert!(parse(r#"{"tag":"for","body":[]}"#).is_err());
    }
}
