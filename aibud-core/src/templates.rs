//! Personality templates.
//!
//! A [`TemplateSet`] is read-only reference data loaded once at startup. Server
//! records never edit it; they take their own copy through
//! [`TemplateSet::fresh_transcripts`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Templates shipped with the binary.
const BUILTIN_TEMPLATES_TOML: &str = include_str!("../templates/personalities.toml");

/// Errors that can occur when loading templates
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read templates from {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("Failed to parse templates: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Template set is empty")]
    Empty,

    #[error("Template '{0}' has no description line")]
    MissingDescription(String),
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    templates: BTreeMap<String, String>,
}

/// Immutable mapping from template name to template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    templates: BTreeMap<String, String>,
}

impl TemplateSet {
    /// The personalities compiled into the crate.
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::from_toml(BUILTIN_TEMPLATES_TOML)
    }

    /// Load a template file from disk.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let content =
            fs::read_to_string(path).map_err(|e| TemplateError::Io(path.to_path_buf(), e))?;
        Self::from_toml(&content)
    }

    /// Parse a `[templates]` table.
    pub fn from_toml(content: &str) -> Result<Self, TemplateError> {
        let file: TemplateFile = toml::from_str(content)?;
        Self::from_map(file.templates)
    }

    pub fn from_map(templates: BTreeMap<String, String>) -> Result<Self, TemplateError> {
        if templates.is_empty() {
            return Err(TemplateError::Empty);
        }
        for (name, text) in &templates {
            if text.lines().next().is_none_or(|line| line.trim().is_empty()) {
                return Err(TemplateError::MissingDescription(name.clone()));
            }
        }
        Ok(Self { templates })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Template names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// A deep copy of every template, ready to be extended as a transcript.
    pub fn fresh_transcripts(&self) -> BTreeMap<String, String> {
        self.templates.clone()
    }
}
