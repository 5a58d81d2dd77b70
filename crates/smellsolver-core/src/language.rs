//! Language detection and per-language comment syntax profiles.

use serde::{Deserialize, Serialize};

const LANGUAGE_BY_EXTENSION: &[(&str, Language)] = &[
    (".java", Language::Java),
    (".py", Language::Python),
    (".ts", Language::TypeScript),
    (".go", Language::Go),
];

/// Languages whose comments the engine can locate and rewrite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Python,
    TypeScript,
    Go,
}

impl Language {
    /// Detect the language from a file path's extension.
    pub fn from_path(path: &str) -> Option<Self> {
        let lowered = path.to_lowercase();
        LANGUAGE_BY_EXTENSION
            .iter()
            .find(|(ext, _)| lowered.ends_with(ext))
            .map(|(_, lang)| *lang)
    }

    /// Parse a free-form language tag such as `"Java"` or `"py"`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "java" => Some(Self::Java),
            "python" | "py" => Some(Self::Python),
            "typescript" | "ts" => Some(Self::TypeScript),
            "go" | "golang" => Some(Self::Go),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Python => "python",
            Self::TypeScript => "typescript",
            Self::Go => "go",
        }
    }

    /// The comment syntax used by this language, selected once per file.
    pub fn profile(&self) -> &'static LanguageProfile {
        match self {
            Self::Python => &HASH_PROFILE,
            Self::Java | Self::TypeScript | Self::Go => &C_FAMILY_PROFILE,
        }
    }
}

/// Comment markers for one language family.
///
/// `block_open`/`block_close` double as the multi-line container used by the
/// rewriter. For languages without real block comments (`block_comments`
/// false) the container is a string literal that only holds comment text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LanguageProfile {
    pub single_marker: &'static str,
    pub block_open: &'static str,
    pub block_close: &'static str,
    pub continuation_prefix: &'static str,
    pub block_comments: bool,
}

pub const C_FAMILY_PROFILE: LanguageProfile = LanguageProfile {
    single_marker: "//",
    block_open: "/*",
    block_close: "*/",
    continuation_prefix: " *",
    block_comments: true,
};

pub const HASH_PROFILE: LanguageProfile = LanguageProfile {
    single_marker: "#",
    block_open: "'''",
    block_close: "'''",
    continuation_prefix: "",
    block_comments: false,
};

impl LanguageProfile {
    /// Marker that opens a comment on its first physical line.
    pub fn opening_marker(&self, block: bool) -> &'static str {
        if block && self.block_comments {
            self.block_open
        } else {
            self.single_marker
        }
    }
}
