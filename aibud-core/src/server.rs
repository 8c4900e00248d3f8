//! Per-server conversation state.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::templates::TemplateSet;
use crate::transcript;

/// External server identifier (a Discord guild id).
pub type ServerId = u64;

/// Errors returned by state mutations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// Empty name for the given setting ("personality" or "model")
    #[error("Empty or invalid {0} name entered")]
    InvalidInput(&'static str),

    /// Template name not present in the server's transcripts
    #[error("Personality {0} not found")]
    NotFound(String),
}

/// Outcome of a successful `set_*` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Changed,
    AlreadySet,
}

/// Values a fresh record starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDefaults {
    pub template: String,
    pub model: String,
}

/// State for one server: selected template and model, one transcript per
/// template, and whether the placeholder name has been replaced yet.
#[derive(Debug, Clone)]
pub struct ServerRecord {
    server_id: ServerId,
    templates: Arc<TemplateSet>,
    transcripts: BTreeMap<String, String>,
    selected_template: String,
    selected_model: String,
    name_substituted: bool,
}

impl ServerRecord {
    pub fn new(server_id: ServerId, templates: Arc<TemplateSet>, defaults: &RecordDefaults) -> Self {
        let transcripts = templates.fresh_transcripts();
        let selected_template = if transcripts.contains_key(&defaults.template) {
            defaults.template.clone()
        } else {
            // Config validation rejects this; keep the invariant anyway.
            transcripts.keys().next().cloned().unwrap_or_default()
        };

        Self {
            server_id,
            templates,
            transcripts,
            selected_template,
            selected_model: defaults.model.clone(),
            name_substituted: false,
        }
    }

    pub fn server_id(&self) -> ServerId {
        self.server_id
    }

    pub fn selected_template(&self) -> &str {
        &self.selected_template
    }

    pub fn selected_model(&self) -> &str {
        &self.selected_model
    }

    pub fn name_substituted(&self) -> bool {
        self.name_substituted
    }

    pub fn transcripts(&self) -> &BTreeMap<String, String> {
        &self.transcripts
    }

    /// Transcript of the selected template.
    pub fn active_transcript(&self) -> &str {
        self.transcripts
            .get(&self.selected_template)
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn active_transcript_mut(&mut self) -> &mut String {
        self.transcripts
            .entry(self.selected_template.clone())
            .or_default()
    }

    /// Replace the placeholder with `name` in every transcript, once per
    /// record lifetime. Returns `true` if this call did the substitution.
    pub fn substitute_name_once(&mut self, placeholder: &str, name: &str) -> bool {
        if self.name_substituted {
            return false;
        }
        for text in self.transcripts.values_mut() {
            *text = transcript::substitute_placeholder(text, placeholder, name);
        }
        self.name_substituted = true;
        debug!(server_id = self.server_id, name, "Placeholder name substituted");
        true
    }

    /// Trim the active transcript to the character budget.
    pub fn truncate_active(&mut self, char_limit: usize) {
        let current = self.active_transcript_mut();
        let trimmed = match transcript::truncate(current, char_limit) {
            Cow::Owned(trimmed) => trimmed,
            Cow::Borrowed(_) => return,
        };
        *current = trimmed;
    }

    pub fn append_to_active(&mut self, turn: &str) {
        transcript::append(self.active_transcript_mut(), turn);
    }

    /// Restore every transcript from the template set.
    pub fn reset(&mut self) {
        self.transcripts = self.templates.fresh_transcripts();
        self.name_substituted = false;
        info!(
            server_id = self.server_id,
            template = %self.selected_template,
            "Conversation reset"
        );
    }

    pub fn set_template(&mut self, name: &str) -> Result<SetOutcome, StateError> {
        if name.is_empty() {
            return Err(StateError::InvalidInput("personality"));
        }
        if !self.transcripts.contains_key(name) {
            return Err(StateError::NotFound(name.to_string()));
        }
        if self.selected_template == name {
            return Ok(SetOutcome::AlreadySet);
        }

        self.selected_template = name.to_string();
        info!(server_id = self.server_id, template = name, "Personality changed");
        Ok(SetOutcome::Changed)
    }

    /// Switch model. A model change resets the transcripts since prompts
    /// are not assumed portable between backends.
    pub fn set_model(&mut self, name: &str) -> Result<SetOutcome, StateError> {
        if name.is_empty() {
            return Err(StateError::InvalidInput("model"));
        }
        if self.selected_model == name {
            return Ok(SetOutcome::AlreadySet);
        }

        self.selected_model = name.to_string();
        info!(server_id = self.server_id, model = name, "Model changed");
        self.reset();
        Ok(SetOutcome::Changed)
    }
}
