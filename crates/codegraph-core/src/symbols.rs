//! Symbol table for call/import resolution across files.

use crate::model::{Language, NodeId};
use dashmap::DashMap;

/// Maps `(language, simple_name)` to every node that declares a symbol by
/// that name. Kept per-language (rather than one global namespace) since
/// the same simple name commonly exists independently in unrelated
/// languages within the same repository. Multi-valued because a call or
/// import site can legitimately resolve to more than one declaration —
/// resolution emits one edge per candidate with `ambiguous` set rather
/// than guessing.
pub struct SymbolTable {
    symbols: DashMap<(Language, String), Vec<NodeId>>,
    /// Per-file reverse index, recording exactly which `(key, node_id)`
    /// pair each file contributed — not just the key — so that removing
    /// one file's symbols never touches another file's entries under a
    /// key they happen to share (e.g. two files both declaring `fn foo`).
    file_symbols: DashMap<String, Vec<((Language, String), NodeId)>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            symbols: DashMap::new(),
            file_symbols: DashMap::new(),
        }
    }

    /// Register a declaration under its simple name.
    pub fn insert(&self, language: Language, simple_name: String, node_id: NodeId, file_path: String) {
        let key = (language, simple_name.clone());
        self.symbols.entry(key.clone()).or_default().push(node_id);
        self.file_symbols.entry(file_path).or_default().push((key, node_id));
    }

    /// Every candidate declaration matching a simple name in a language.
    /// Empty means unresolved; more than one means resolution is
    /// ambiguous and the caller should mark resulting edges accordingly.
    pub fn lookup(&self, language: Language, simple_name: &str) -> Vec<NodeId> {
        self.symbols
            .get(&(language, simple_name.to_string()))
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// All symbol ids declared in a file, across every name registered
    /// from it.
    pub fn symbols_in_file(&self, file_path: &str) -> Vec<NodeId> {
        self.file_symbols
            .get(file_path)
            .map(|r| r.value().iter().map(|(_, id)| *id).collect())
            .unwrap_or_default()
    }

    /// Drop every symbol declared in a file, so incremental re-analysis
    /// can re-register them from scratch without leaving stale entries
    /// (or stale candidates inflating ambiguous-resolution counts) behind.
    /// Only the `NodeId`s this file itself contributed are removed from a
    /// shared `(language, simple_name)` bucket — another file's
    /// same-named declaration is left untouched.
    pub fn remove_file(&self, file_path: &str) {
        if let Some((_, contributions)) = self.file_symbols.remove(file_path) {
            for (key, node_id) in contributions {
                if let Some(mut ids) = self.symbols.get_mut(&key) {
                    ids.retain(|id| *id != node_id);
                }
                self.symbols.remove_if(&key, |_, v| v.is_empty());
            }
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use crate::model::NodeKind;

    #[test]
    fn ambiguous_lookup_returns_every_candidate() {
        let table = SymbolTable::new();
        let a = NodeId::new("a.rs", NodeKind::Function, "helper", 3);
        let b = NodeId::new("b.rs", NodeKind::Function, "helper", 9);
        table.insert(Language::Rust, "helper".into(), a, "a.rs".into());
        table.insert(Language::Rust, "helper".into(), b, "b.rs".into());

        let candidates = table.lookup(Language::Rust, "helper");
        assert_eq!(candidates.len(), 2);
        assert!(candidates.contains(&a));
        assert!(candidates.contains(&b));
    }

    #[test]
    fn remove_file_drops_its_symbols_only() {
        let table = SymbolTable::new();
        let a = NodeId::new("a.rs", NodeKind::Function, "only_in_a", 1);
        let b = NodeId::new("b.rs", NodeKind::Function, "only_in_b", 1);
        table.insert(Language::Rust, "only_in_a".into(), a, "a.rs".into());
        table.insert(Language::Rust, "only_in_b".into(), b, "b.rs".into());

        table.remove_file("a.rs");

        assert!(table.lookup(Language::Rust, "only_in_a").is_empty());
        assert_eq!(table.lookup(Language::Rust, "only_in_b"), vec![b]);
        let _ = PathBuf::from("a.rs");
    }

    #[test]
    fn remove_file_leaves_another_files_same_named_symbol_intact() {
        let table = SymbolTable::new();
        let a = NodeId::new("a.py", NodeKind::Function, "foo", 1);
        let b = NodeId::new("b.py", NodeKind::Function, "foo", 1);
        table.insert(Language::Python, "foo".into(), a, "a.py".into());
        table.insert(Language::Python, "foo".into(), b, "b.py".into());

        table.remove_file("b.py");

        let remaining = table.lookup(Language::Python, "foo");
        assert_eq!(remaining, vec![a], "removing b.py must not drop a.py's own `foo`");
    }
}
