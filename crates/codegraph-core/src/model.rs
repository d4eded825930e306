//! Core data structures for the code property graph

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Content-addressed, stable identifier for a node.
///
/// Derived from `<kind>:<relative_path>:<qualified_name>:<start_line>` so
/// that re-running analysis over an unchanged file produces the same ids,
/// rather than ids tied to insertion order. Two distinct constructs that
/// happen to share kind, path, name and start line (e.g. a same-line
/// rename race during incremental analysis) will collide; this is a known
/// limitation rather than something this scheme tries to solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(relative_path: &str, kind: NodeKind, qualified_name: &str, start_line: u32) -> Self {
        let mut hasher = DefaultHasher::new();
        kind.hash(&mut hasher);
        relative_path.hash(&mut hasher);
        qualified_name.hash(&mut hasher);
        start_line.hash(&mut hasher);
        NodeId(hasher.finish())
    }
}

/// Content-addressed identifier for an edge: a hash of its kind and the
/// ids of its two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct EdgeId(pub u64);

impl EdgeId {
    pub fn new(kind: EdgeKind, source: NodeId, target: NodeId) -> Self {
        let mut hasher = DefaultHasher::new();
        kind.hash(&mut hasher);
        source.hash(&mut hasher);
        target.hash(&mut hasher);
        EdgeId(hasher.finish())
    }
}

/// Discriminates what kind of code entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Module,
    Class,
    Function,
    Method,
    Import,
    Variable,
    Interface,
    Enum,
    TypeAlias,
    Namespace,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Module => "module",
            NodeKind::Class => "class",
            NodeKind::Function => "function",
            NodeKind::Method => "method",
            NodeKind::Import => "import",
            NodeKind::Variable => "variable",
            NodeKind::Interface => "interface",
            NodeKind::Enum => "enum",
            NodeKind::TypeAlias => "type_alias",
            NodeKind::Namespace => "namespace",
        }
    }
}

/// A single node in the code graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub qualified_name: String,
    pub file_path: PathBuf,
    pub language: Option<Language>,
    pub start_line: u32,
    pub end_line: u32,
    pub start_col: u32,
    pub end_col: u32,
    /// Cyclomatic complexity; only populated for function/method nodes.
    pub complexity: Option<u32>,
    pub is_container: bool,
    pub child_count: u32,
    pub loc: Option<u32>,
    pub metadata: HashMap<String, String>,
}

/// Languages this system can detect and, where a pattern table exists,
/// extract entities from. `from_path` never fails — every file gets a
/// language, even if that language's pattern table is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Rust,
    TypeScript,
    JavaScript,
    Python,
    Go,
    Java,
    C,
    Cpp,
    Ruby,
    Php,
    CSharp,
    Kotlin,
    Swift,
    Scala,
    Shell,
    Lua,
    Elixir,
    Haskell,
    R,
    Perl,
    Dart,
    ObjectiveC,
    Zig,
    Html,
    Css,
    Other,
}

impl Language {
    /// Detect language purely from file extension. The language registry
    /// (`codegraph_index::registry`) layers shebang and content-signature
    /// detection on top of this for extensionless files.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Some(match ext {
            "rs" => Language::Rust,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "py" | "pyi" => Language::Python,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            "cs" => Language::CSharp,
            "kt" | "kts" => Language::Kotlin,
            "swift" => Language::Swift,
            "scala" | "sc" => Language::Scala,
            "sh" | "bash" | "zsh" => Language::Shell,
            "lua" => Language::Lua,
            "ex" | "exs" => Language::Elixir,
            "hs" => Language::Haskell,
            "r" => Language::R,
            "pl" | "pm" => Language::Perl,
            "dart" => Language::Dart,
            "m" | "mm" => Language::ObjectiveC,
            "zig" => Language::Zig,
            "html" | "htm" => Language::Html,
            "css" | "scss" | "sass" => Language::Css,
            _ => return None,
        })
    }

    pub fn from_path(path: &PathBuf) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .unwrap_or(Language::Other)
    }

    /// Whether a populated tree-sitter pattern table exists for this
    /// language. The remaining languages are named in the registry purely
    /// so detection succeeds; files in them degrade to file-only nodes.
    pub fn has_pattern_table(&self) -> bool {
        matches!(
            self,
            Language::Rust
                | Language::Python
                | Language::TypeScript
                | Language::JavaScript
                | Language::Go
                | Language::Java
                | Language::C
                | Language::Cpp
        )
    }
}

/// What kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Filesystem/syntactic containment (file contains module contains
    /// class contains method, etc).
    Contains,
    /// A call site resolved (possibly ambiguously) to a callee symbol.
    Calls,
    /// An import/require/use statement resolved to the imported entity.
    Imports,
    /// A class/interface extends another.
    Inherits,
    /// A class implements an interface.
    Implements,
    /// A type reference that is neither a call, import, nor inheritance.
    References,
    /// A cross-language boundary: embedded SQL, an HTTP route, a shell
    /// invocation, or an FFI call crossing into another language's code.
    Seam,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Calls => "calls",
            EdgeKind::Imports => "imports",
            EdgeKind::Inherits => "inherits",
            EdgeKind::Implements => "implements",
            EdgeKind::References => "references",
            EdgeKind::Seam => "seam",
        }
    }
}

/// How this edge was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeSource {
    /// Determined directly from the AST. Always correct given the parse.
    Structural,
    /// Determined by pattern-matching heuristics (seam detection, or a
    /// call/import that could not be uniquely resolved).
    Heuristic,
}

/// A directed edge in the code graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    pub edge_source: EdgeSource,
    /// 1.0 for Structural edges. For Heuristic edges (seams, ambiguous
    /// calls), a confidence band: "low" | "medium" | "high" is also
    /// written into metadata for seams with non-determinable literals.
    pub confidence: f32,
    /// True when more than one symbol-table candidate resolved to this
    /// call/import site — one edge is emitted per candidate.
    pub ambiguous: bool,
    pub label: Option<String>,
    pub file_path: Option<PathBuf>,
    pub line: Option<u32>,
}

impl GraphEdge {
    pub fn structural(kind: EdgeKind, source: NodeId, target: NodeId) -> Self {
        GraphEdge {
            id: EdgeId::new(kind, source, target),
            source,
            target,
            kind,
            edge_source: EdgeSource::Structural,
            confidence: 1.0,
            ambiguous: false,
            label: None,
            file_path: None,
            line: None,
        }
    }
}
