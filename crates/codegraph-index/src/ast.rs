//! AST Adapter (C3): the minimum surface the Parser and Seam Detector
//! need over a tree-sitter tree. No backend type beyond `tree_sitter::Node`
//! itself leaks past this module's callers — if the backend were ever
//! swapped out, this is the only module whose internals would change.

use tree_sitter::Node;

/// A 1-based, inclusive-at-start/exclusive-at-end-character span, per the
/// location model §3.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

pub fn span(node: Node) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span {
        start_line: start.row as u32 + 1,
        start_col: start.column as u32 + 1,
        end_line: end.row as u32 + 1,
        end_col: end.column as u32,
    }
}

pub fn text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Every descendant of `root` (root included) whose AST kind is in
/// `kinds`, in pre-order.
pub fn find_all<'a>(root: Node<'a>, kinds: &[&str]) -> Vec<Node<'a>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if kinds.contains(&node.kind()) {
            out.push(node);
        }
        let mut cursor = node.walk();
        let mut children: Vec<_> = node.children(&mut cursor).collect();
        children.reverse();
        stack.extend(children);
    }
    out.reverse();
    out
}

pub fn child_by_field<'a>(node: Node<'a>, field: &str) -> Option<Node<'a>> {
    node.child_by_field_name(field)
}

/// Count every descendant of `node` (node itself excluded) whose kind is
/// in `branch_kinds`, for cyclomatic-complexity purposes. `&&`/`||` are
/// matched against tree-sitter's own operator-token kind strings for the
/// relevant language (most grammars emit them as literal `"&&"`/`"||"`
/// leaf tokens).
pub fn count_branches(node: Node, branch_kinds: &[&str]) -> u32 {
    let mut count = 0u32;
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            if branch_kinds.contains(&child.kind()) {
                count += 1;
            }
            count += count_branches(child, branch_kinds);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    #[test]
    fn finds_all_descendants_of_kind() {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        let source = "fn a() {} fn b() {} struct S;";
        let tree = parser.parse(source, None).unwrap();
        let functions = find_all(tree.root_node(), &["function_item"]);
        assert_eq!(functions.len(), 2);
    }

    #[test]
    fn counts_branches_in_subtree() {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        let source = "fn f(x: i32) -> i32 { if x > 0 { return x; } else { return 0; } }";
        let tree = parser.parse(source, None).unwrap();
        let func = find_all(tree.root_node(), &["function_item"])[0];
        let branches = count_branches(func, &["if_expression"]);
        assert_eq!(branches, 1);
    }
}
