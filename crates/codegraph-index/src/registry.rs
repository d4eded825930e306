//! Language registry (C1): the frozen, process-wide table mapping files to
//! languages and languages to the AST-kind patterns the extractor and
//! seam detector consume. No per-project configuration — this is a
//! closed set, versioned as a whole by `PATTERN_SET_VERSION`.

use codegraph_core::Language;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Bumped whenever a pattern table entry changes in a way that would
/// make previously-cached analysis unsafe to reuse. The cache layer
/// folds this into `meta:generation` at startup.
pub const PATTERN_SET_VERSION: u32 = 1;

/// AST-kind strings the extractor and seam detector look for, per
/// language. A `None`/empty field means "this extractor is a no-op for
/// this language" — the Parser must tolerate (and does) missing entries
/// rather than treating them as an error.
#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    pub function: &'static [&'static str],
    pub class: &'static [&'static str],
    pub method: &'static [&'static str],
    pub import: &'static [&'static str],
    pub call: &'static [&'static str],
    pub assignment: &'static [&'static str],
    pub interface: &'static [&'static str],
    pub enum_: &'static [&'static str],
    pub type_alias: &'static [&'static str],
    /// AST kinds counted as a cyclomatic-complexity branch within a
    /// function/method's subtree.
    pub branches: &'static [&'static str],
}

pub fn patterns(language: Language) -> PatternTable {
    match language {
        Language::Rust => PatternTable {
            function: &["function_item"],
            class: &["struct_item", "impl_item"],
            method: &["function_item"],
            import: &["use_declaration"],
            call: &["call_expression", "macro_invocation"],
            assignment: &["let_declaration"],
            interface: &["trait_item"],
            enum_: &["enum_item"],
            type_alias: &["type_item"],
            branches: &[
                "if_expression",
                "if_let_expression",
                "match_arm",
                "for_expression",
                "while_expression",
                "while_let_expression",
                "loop_expression",
                "&&",
                "||",
            ],
        },
        Language::Python => PatternTable {
            function: &["function_definition"],
            class: &["class_definition"],
            method: &["function_definition"],
            import: &["import_statement", "import_from_statement"],
            call: &["call"],
            assignment: &["assignment"],
            interface: &[],
            enum_: &[],
            type_alias: &[],
            branches: &[
                "if_statement",
                "elif_clause",
                "for_statement",
                "while_statement",
                "except_clause",
                "conditional_expression",
                "boolean_operator",
            ],
        },
        Language::TypeScript => PatternTable {
            function: &["function_declaration", "arrow_function", "function_expression"],
            class: &["class_declaration"],
            method: &["method_definition"],
            import: &["import_statement"],
            call: &["call_expression"],
            assignment: &["variable_declarator"],
            interface: &["interface_declaration"],
            enum_: &["enum_declaration"],
            type_alias: &["type_alias_declaration"],
            branches: &[
                "if_statement",
                "for_statement",
                "for_in_statement",
                "while_statement",
                "do_statement",
                "switch_case",
                "catch_clause",
                "ternary_expression",
                "&&",
                "||",
            ],
        },
        Language::JavaScript => PatternTable {
            function: &["function_declaration", "arrow_function", "function_expression"],
            class: &["class_declaration"],
            method: &["method_definition"],
            import: &["import_statement"],
            call: &["call_expression"],
            assignment: &["variable_declarator"],
            interface: &[],
            enum_: &[],
            type_alias: &[],
            branches: &[
                "if_statement",
                "for_statement",
                "for_in_statement",
                "while_statement",
                "do_statement",
                "switch_case",
                "catch_clause",
                "ternary_expression",
                "&&",
                "||",
            ],
        },
        Language::Go => PatternTable {
            function: &["function_declaration"],
            class: &["type_declaration"],
            method: &["method_declaration"],
            import: &["import_spec"],
            call: &["call_expression"],
            assignment: &["short_var_declaration"],
            interface: &["interface_type"],
            enum_: &[],
            type_alias: &["type_alias"],
            branches: &[
                "if_statement",
                "for_statement",
                "expression_case",
                "communication_case",
                "&&",
                "||",
            ],
        },
        Language::Java => PatternTable {
            function: &["method_declaration"],
            class: &["class_declaration"],
            method: &["method_declaration"],
            import: &["import_declaration"],
            call: &["method_invocation"],
            assignment: &["variable_declarator"],
            interface: &["interface_declaration"],
            enum_: &["enum_declaration"],
            type_alias: &[],
            branches: &[
                "if_statement",
                "for_statement",
                "enhanced_for_statement",
                "while_statement",
                "do_statement",
                "switch_label",
                "catch_clause",
                "ternary_expression",
                "&&",
                "||",
            ],
        },
        Language::C => PatternTable {
            function: &["function_definition"],
            class: &["struct_specifier"],
            method: &[],
            import: &["preproc_include"],
            call: &["call_expression"],
            assignment: &["init_declarator"],
            interface: &[],
            enum_: &["enum_specifier"],
            type_alias: &["type_definition"],
            branches: &[
                "if_statement",
                "for_statement",
                "while_statement",
                "do_statement",
                "case_statement",
                "&&",
                "||",
            ],
        },
        Language::Cpp => PatternTable {
            function: &["function_definition"],
            class: &["class_specifier", "struct_specifier"],
            method: &["function_definition"],
            import: &["preproc_include"],
            call: &["call_expression"],
            assignment: &["init_declarator"],
            interface: &[],
            enum_: &["enum_specifier"],
            type_alias: &["type_definition", "alias_declaration"],
            branches: &[
                "if_statement",
                "for_statement",
                "for_range_loop",
                "while_statement",
                "do_statement",
                "case_statement",
                "catch_clause",
                "condition_clause",
                "&&",
                "||",
            ],
        },
        _ => PatternTable::default(),
    }
}

static SHEBANG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#!.*\b(\w+)\s*$").unwrap());

/// Content signatures consulted only when extension-based detection
/// fails (e.g. extensionless scripts): a small set of unambiguous
/// first-lines/markers scanned over the first 4 KiB.
static CONTENT_SIGNATURES: &[(Language, &str)] = &[
    (Language::Shell, r"^#!/"),
    (Language::Python, r"^#!.*python"),
];

/// Detect a file's language. Precedence: extension -> shebang -> content
/// signature. Never fails — unrecognized files resolve to
/// `Language::Other` so detection is always cacheable by
/// `(path, content_hash)` and the parser can still emit a FILE-only node.
pub fn detect(path: &Path, content: Option<&[u8]>) -> Language {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if let Some(lang) = Language::from_extension(ext) {
            return lang;
        }
    }

    let Some(content) = content else {
        return Language::Other;
    };
    let window = &content[..content.len().min(4096)];
    let Ok(text) = std::str::from_utf8(window) else {
        return Language::Other;
    };

    if let Some(first_line) = text.lines().next() {
        if let Some(caps) = SHEBANG_RE.captures(first_line) {
            let interp = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            if interp.contains("python") {
                return Language::Python;
            }
            if interp.contains("bash") || interp.contains("sh") || interp.contains("zsh") {
                return Language::Shell;
            }
        }
    }

    for (lang, pattern) in CONTENT_SIGNATURES {
        if Regex::new(pattern).unwrap().is_match(text) {
            return *lang;
        }
    }

    Language::Other
}

/// The file extensions (without the leading dot) that resolve to
/// `language` via `Language::from_extension`. The inverse of that
/// mapping, kept here rather than on `Language` itself since it is a
/// registry-level contract function (§4.1), not a property of the enum.
pub fn extensions(language: Language) -> &'static [&'static str] {
    match language {
        Language::Rust => &["rs"],
        Language::TypeScript => &["ts", "tsx", "mts", "cts"],
        Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
        Language::Python => &["py", "pyi"],
        Language::Go => &["go"],
        Language::Java => &["java"],
        Language::C => &["c", "h"],
        Language::Cpp => &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
        Language::Ruby => &["rb"],
        Language::Php => &["php"],
        Language::CSharp => &["cs"],
        Language::Kotlin => &["kt", "kts"],
        Language::Swift => &["swift"],
        Language::Scala => &["scala", "sc"],
        Language::Shell => &["sh", "bash", "zsh"],
        Language::Lua => &["lua"],
        Language::Elixir => &["ex", "exs"],
        Language::Haskell => &["hs"],
        Language::R => &["r"],
        Language::Perl => &["pl", "pm"],
        Language::Dart => &["dart"],
        Language::ObjectiveC => &["m", "mm"],
        Language::Zig => &["zig"],
        Language::Html => &["html", "htm"],
        Language::Css => &["css", "scss", "sass"],
        Language::Other => &[],
    }
}

pub fn is_supported(path: &Path) -> bool {
    detect(path, None) != Language::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_extension() {
        assert_eq!(detect(Path::new("main.rs"), None), Language::Rust);
        assert_eq!(detect(Path::new("app.py"), None), Language::Python);
        assert_eq!(detect(Path::new("index.tsx"), None), Language::TypeScript);
    }

    #[test]
    fn detects_shebang_when_no_extension() {
        let content = b"#!/usr/bin/env python\nprint('hi')\n";
        assert_eq!(detect(Path::new("script"), Some(content)), Language::Python);
    }

    #[test]
    fn unknown_extension_is_other_not_an_error() {
        assert_eq!(detect(Path::new("data.xyz123"), None), Language::Other);
    }

    #[test]
    fn extensions_round_trip_through_language_from_extension() {
        for lang in [
            Language::Rust,
            Language::TypeScript,
            Language::JavaScript,
            Language::Python,
            Language::Go,
            Language::Java,
            Language::C,
            Language::Cpp,
            Language::Ruby,
            Language::Shell,
            Language::Html,
            Language::Css,
        ] {
            for ext in extensions(lang) {
                assert_eq!(Language::from_extension(ext), Some(lang), "extension {ext} should map back to {lang:?}");
            }
        }
    }

    #[test]
    fn extensions_of_other_is_empty() {
        assert!(extensions(Language::Other).is_empty());
    }

    #[test]
    fn pattern_tables_exist_for_tree_sitter_backed_languages() {
        for lang in [
            Language::Rust,
            Language::Python,
            Language::TypeScript,
            Language::JavaScript,
            Language::Go,
            Language::Java,
            Language::C,
            Language::Cpp,
        ] {
            assert!(!patterns(lang).function.is_empty() || !patterns(lang).call.is_empty());
        }
    }
}
