//! Codec for the BepInEx `.cfg` dialect: `[section]` headers followed by
//! `key = value` lines. Comments and blank lines are not kept.

use serde::{Deserialize, Serialize};

use crate::codec::strip_bom;
use crate::error::{DecodeError, ManagerError, Result};

/// Bounds for edited integer entries. Signed so prefab GUIDs such as
/// `-257494203` stay editable.
pub const MIN_INT_VALUE: i64 = -999_999_999;
pub const MAX_INT_VALUE: i64 = 999_999_999;

/// How a raw value should be edited. Storage is always the string form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    Bool,
    Integer,
    Text,
}

/// Classify a raw value: `true`/`false` in any case is a bool, anything that
/// parses as an integer is an integer, everything else is text.
pub fn classify_value(value: &str) -> ValueKind {
    let lower = value.to_ascii_lowercase();
    if lower == "true" || lower == "false" {
        ValueKind::Bool
    } else if value.parse::<i64>().is_ok() {
        ValueKind::Integer
    } else {
        ValueKind::Text
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

// The presentation layer gets the inferred kind alongside each value.
impl Serialize for Entry {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Entry", 3)?;
        state.serialize_field("key", &self.key)?;
        state.serialize_field("value", &self.value)?;
        state.serialize_field("kind", &classify_value(&self.value))?;
        state.end()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub entries: Vec<Entry>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }
}

/// Ordered sections, each with ordered entries. Section names are unique.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub sections: Vec<Section>,
}

impl ConfigDocument {
    pub fn is_blank(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    fn section_index_or_insert(&mut self, name: &str) -> usize {
        match self.sections.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.get(key)
    }

    /// First section holding `key`, with the value found there.
    pub fn find(&self, key: &str) -> Option<(&str, &str)> {
        self.sections
            .iter()
            .find_map(|s| s.get(key).map(|v| (s.name.as_str(), v)))
    }

    pub fn kind_of(&self, section: &str, key: &str) -> Option<ValueKind> {
        self.get(section, key).map(classify_value)
    }

    /// Overwrite an existing entry or append a new one, creating the
    /// section when needed.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        let value = value.into();
        let idx = self.section_index_or_insert(section);
        let entries = &mut self.sections[idx].entries;
        match entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = value,
            None => entries.push(Entry {
                key: key.to_string(),
                value,
            }),
        }
    }

    pub fn set_bool(&mut self, section: &str, key: &str, value: bool) {
        self.set(section, key, if value { "true" } else { "false" });
    }

    pub fn set_int(&mut self, section: &str, key: &str, value: i64) -> Result<()> {
        if !(MIN_INT_VALUE..=MAX_INT_VALUE).contains(&value) {
            return Err(ManagerError::validation(
                format!("{section}.{key}"),
                format!("{value} is outside {MIN_INT_VALUE}..={MAX_INT_VALUE}"),
            ));
        }
        self.set(section, key, value.to_string());
        Ok(())
    }

    /// Edit an existing entry, checking the new value against the kind of
    /// the value it replaces.
    pub fn update_checked(&mut self, section: &str, key: &str, value: &str) -> Result<()> {
        let kind = self.kind_of(section, key).ok_or_else(|| {
            ManagerError::validation(
                format!("{section}.{key}"),
                "no such entry in the loaded config",
            )
        })?;

        match kind {
            ValueKind::Bool => match value.trim().to_ascii_lowercase().as_str() {
                "true" => self.set_bool(section, key, true),
                "false" => self.set_bool(section, key, false),
                other => {
                    return Err(ManagerError::validation(
                        format!("{section}.{key}"),
                        format!("`{other}` is not true or false"),
                    ))
                }
            },
            ValueKind::Integer => {
                let parsed = value.trim().parse::<i64>().map_err(|_| {
                    ManagerError::validation(
                        format!("{section}.{key}"),
                        format!("`{value}` is not an integer"),
                    )
                })?;
                self.set_int(section, key, parsed)?;
            }
            ValueKind::Text => self.set(section, key, value),
        }
        Ok(())
    }
}

/// Parse config text. Entries that appear before the first section header
/// have nowhere to live and are dropped.
pub fn decode(text: &str) -> ConfigDocument {
    let mut doc = ConfigDocument::default();
    let mut current: Option<usize> = None;

    for raw in text.split('\n') {
        let line = raw.trim();
        if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
            let name = &line[1..line.len() - 1];
            current = Some(doc.section_index_or_insert(name));
        } else if line.contains('=') && !line.starts_with('#') {
            let Some(idx) = current else { continue };
            if let Some((key, value)) = line.split_once('=') {
                let value = value.split('#').next().unwrap_or_default();
                doc.sections[idx].entries.push(Entry {
                    key: key.trim().to_string(),
                    value: value.trim().to_string(),
                });
            }
        }
    }

    doc
}

pub fn decode_bytes(bytes: &[u8]) -> std::result::Result<ConfigDocument, DecodeError> {
    let text = std::str::from_utf8(strip_bom(bytes)).map_err(|_| DecodeError::Utf8)?;
    Ok(decode(text))
}

pub fn encode(doc: &ConfigDocument) -> String {
    let mut lines = Vec::new();
    for section in &doc.sections {
        lines.push(format!("[{}]", section.name));
        for entry in &section.entries {
            lines.push(format!("{} = {}", entry.key, entry.value));
        }
    }
    lines.join("\n")
}
