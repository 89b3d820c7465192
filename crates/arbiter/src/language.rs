use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported language: {0}")]
pub struct UnknownLanguage(pub String);

/// Source language tag of a submission
///
/// The tag only names the language; how it is compiled and launched is
/// looked up in the configured toolchain table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Python,
    Cpp,
    C,
    Rust,
    Go,
    Php,
    Kotlin,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::Java,
        Language::Python,
        Language::Cpp,
        Language::C,
        Language::Rust,
        Language::Go,
        Language::Php,
        Language::Kotlin,
    ];

    /// Configuration key for this language (e.g. "cpp")
    pub fn id(self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Python => "python",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Php => "php",
            Language::Kotlin => "kotlin",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Language {
    type Err = UnknownLanguage;

    /// Parse a language tag, case-insensitively, accepting common aliases
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let language = match s.trim().to_ascii_lowercase().as_str() {
            "java" => Language::Java,
            "python" | "python3" | "py" => Language::Python,
            "cpp" | "c++" | "cxx" => Language::Cpp,
            "c" => Language::C,
            "rust" | "rs" => Language::Rust,
            "go" | "golang" => Language::Go,
            "php" => Language::Php,
            "kotlin" | "kt" => Language::Kotlin,
            _ => return Err(UnknownLanguage(s.to_owned())),
        };
        Ok(language)
    }
}
