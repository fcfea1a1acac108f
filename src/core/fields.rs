//! Story field to placeholder slot mapping.
//!
//! Which placeholder of a story slide holds which semantic field ("title",
//! "status", "size 1", ...) depends on the slide master, so the mapping is
//! learned once from a labeled template slide and persisted. Every
//! interchange path consumes it read-only afterwards.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;

/// Section name in the persisted field map file.
pub const FIELD_MAP_SECTION: &str = "STORY";

#[derive(Debug, Error)]
pub enum FieldMapError {
    #[error("field map has no [{FIELD_MAP_SECTION}] table")]
    MissingSection,

    #[error("field map entry '{0}' is not a string")]
    MalformedEntry(String),

    #[error("field '{0}' has no learned slot index; run the learn command")]
    Unresolved(String),

    #[error("malformed template: {0}")]
    MalformedTemplate(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("field map is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Mapping from story field names to placeholder slot indices.
///
/// Entries keep their string-encoded persisted form so that a skeleton file
/// with unlearned (empty) slots loads and saves untouched; [`resolve`]
/// produces the numeric view the interchange paths need.
///
/// [`resolve`]: FieldMap::resolve
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: IndexMap<String, String>,
}

impl FieldMap {
    /// Load the persisted field map. The key order of the file is preserved;
    /// learning depends on it.
    pub fn load(path: &Path) -> Result<Self, FieldMapError> {
        let raw = fs::read_to_string(path)?;
        let table: toml::Table = raw.parse()?;
        let section = table
            .get(FIELD_MAP_SECTION)
            .and_then(toml::Value::as_table)
            .ok_or(FieldMapError::MissingSection)?;

        let mut entries = IndexMap::new();
        for (key, value) in section {
            let slot = value
                .as_str()
                .ok_or_else(|| FieldMapError::MalformedEntry(key.clone()))?;
            entries.insert(key.clone(), slot.to_string());
        }
        Ok(Self { entries })
    }

    pub fn save(&self, path: &Path) -> Result<(), FieldMapError> {
        let mut section = toml::Table::new();
        for (key, slot) in &self.entries {
            section.insert(key.clone(), toml::Value::String(slot.clone()));
        }
        let mut table = toml::Table::new();
        table.insert(FIELD_MAP_SECTION.to_string(), toml::Value::Table(section));
        fs::write(path, table.to_string())?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Numeric view of the mapping, in key order. Fails on the first field
    /// whose slot was never learned or does not parse as an index.
    pub fn resolve(&self) -> Result<IndexMap<String, u32>, FieldMapError> {
        let mut resolved = IndexMap::with_capacity(self.entries.len());
        for (key, slot) in &self.entries {
            let index = slot
                .trim()
                .parse::<u32>()
                .map_err(|_| FieldMapError::Unresolved(key.clone()))?;
            resolved.insert(key.clone(), index);
        }
        Ok(resolved)
    }

    /// Learn slot indices from a labeled template slide.
    ///
    /// Each placeholder of the template carries, as visible text, the decimal
    /// position of the field it holds - position in this map's key order.
    /// `placeholders` supplies `(slot index, visible text)` pairs.
    ///
    /// All-or-nothing: a text that does not parse as an integer, a position
    /// outside the key set, a position claimed twice, or a field left
    /// unlabeled fails with [`FieldMapError::MalformedTemplate`] and leaves
    /// the map untouched. A partial map would silently corrupt every future
    /// story interchange.
    pub fn learn<I>(&mut self, placeholders: I) -> Result<(), FieldMapError>
    where
        I: IntoIterator<Item = (u32, String)>,
    {
        let mut learned: Vec<Option<u32>> = vec![None; self.entries.len()];

        for (slot, text) in placeholders {
            let label: String = text.chars().filter(char::is_ascii).collect();
            let position = label.trim().parse::<usize>().map_err(|_| {
                FieldMapError::MalformedTemplate(format!(
                    "placeholder {slot} reads '{}', not a field position",
                    label.trim()
                ))
            })?;
            if position >= self.entries.len() {
                return Err(FieldMapError::MalformedTemplate(format!(
                    "placeholder {slot} names field position {position}, but only {} fields exist",
                    self.entries.len()
                )));
            }
            if learned[position].is_some() {
                return Err(FieldMapError::MalformedTemplate(format!(
                    "field position {position} is labeled twice"
                )));
            }
            learned[position] = Some(slot);
        }

        if let Some(missing) = learned.iter().position(Option::is_none) {
            let field = self.entries.get_index(missing).map_or("?", |(k, _)| k);
            return Err(FieldMapError::MalformedTemplate(format!(
                "field '{field}' (position {missing}) is not labeled by the template"
            )));
        }

        for (index, slot) in learned.into_iter().enumerate() {
            if let (Some(slot), Some((_, value))) = (slot, self.entries.get_index_mut(index)) {
                *value = slot.to_string();
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, String)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}
