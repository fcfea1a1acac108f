//! Deck interchange model.
//!
//! The presentation collaborator extracts placeholder content into a deck
//! JSON file and writes updated content back from it. The core never opens
//! the presentation itself; this file is the whole boundary.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::markup::StyledText;

#[derive(Debug, Error)]
pub enum DeckError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("deck file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One row of a task table: description, planned, remaining, done, assignee.
pub type TaskRow = [String; 5];

/// One slide of the extracted presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Slide {
    /// A story slide: placeholder slot index to extracted styled text.
    Story { placeholders: BTreeMap<u32, StyledText> },
    /// A task table slide.
    Tasks { rows: Vec<TaskRow> },
}

impl Slide {
    /// The styled text in placeholder `slot`, if the slide is a story slide
    /// and the slot exists.
    pub fn placeholder(&self, slot: u32) -> Option<&StyledText> {
        match self {
            Self::Story { placeholders } => placeholders.get(&slot),
            Self::Tasks { .. } => None,
        }
    }
}

/// The extracted presentation: slides in deck order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub slides: Vec<Slide>,
}

impl Deck {
    pub fn load(path: &Path) -> Result<Self, DeckError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), DeckError> {
        let mut raw = serde_json::to_string_pretty(self)?;
        raw.push('\n');
        fs::write(path, raw)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}
