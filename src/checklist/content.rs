// SPDX-License-Identifier: MIT

//! Checklist content document
//!
//! The document is a JSON object of ordered sections. Keys starting with `$`
//! carry metadata instead of sections:
//! - `$completed`: keys that count as completed for every player
//! - `$axes`: ordered stage names for each progression field

use super::keys::{escape_key, make_key};
use super::progress::ProgressStore;
use crate::condition::{Gate, Values};
use crate::error::GateError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

const META_PREFIX: char = '$';

/// A checklist section or sub-section
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Section {
    #[serde(default)]
    pub title: String,
    /// Short label shown in place of the title in tab headers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<SectionList>,
    #[serde(rename = "$condition", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

/// Contents of a section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SectionList {
    /// Checkable items
    Items(Vec<Item>),
    /// Named sub-sections, in document order
    Groups(IndexMap<String, Section>),
}

/// A checkable entry
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Item {
    Label(String),
    Entry(Box<ItemEntry>),
}

/// An item with details
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ItemEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Explicit key segment, used instead of the escaped title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bait: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<Item>>,
    #[serde(rename = "$condition", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl Item {
    /// Label shown for the item: name, else code, else title
    pub fn title(&self) -> &str {
        match self {
            Item::Label(label) => label,
            Item::Entry(entry) => non_empty(&entry.name)
                .or_else(|| non_empty(&entry.code))
                .or_else(|| non_empty(&entry.title))
                .unwrap_or_default(),
        }
    }

    /// Title with the serial number appended when there is one
    pub fn display_title(&self) -> String {
        match self {
            Item::Entry(entry) => match &entry.serial {
                Some(Value::String(serial)) => format!("{} (No. {})", self.title(), serial),
                Some(serial) => format!("{} (No. {})", self.title(), serial),
                None => self.title().to_string(),
            },
            Item::Label(_) => self.title().to_string(),
        }
    }

    /// Key segment: the explicit key, else the escaped title
    pub fn key_segment(&self) -> String {
        match self {
            Item::Entry(entry) => match &entry.key {
                Some(key) => key.clone(),
                None => escape_key(self.title()),
            },
            Item::Label(label) => escape_key(label),
        }
    }

    /// Full key under `data_key`
    pub fn key(&self, data_key: &str) -> String {
        make_key(data_key, [self.key_segment().as_str()])
    }

    pub fn variants(&self) -> Option<&[Item]> {
        match self {
            Item::Entry(entry) => entry.variants.as_deref(),
            Item::Label(_) => None,
        }
    }

    pub fn condition(&self) -> Option<&Value> {
        match self {
            Item::Entry(entry) => entry.condition.as_ref(),
            Item::Label(_) => None,
        }
    }

    /// Whether the entry carries a `code`, which is shown verbatim
    pub fn is_code(&self) -> bool {
        matches!(self, Item::Entry(entry) if non_empty(&entry.code).is_some())
    }
}

/// Number of checkable entries in `list`; each variant counts on its own
pub fn total(list: &[Item]) -> usize {
    list.iter()
        .map(|item| item.variants().map_or(1, <[Item]>::len))
        .sum()
}

/// Completion and lock state of a single checkable entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemStatus {
    pub key: String,
    pub title: String,
    pub completed: bool,
    pub locked: bool,
    /// The entry is a code to be shown verbatim
    pub code: bool,
}

/// Lock state of a section as shown in navigation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionStatus {
    /// `key` for a top-level section, `key/sub` for one of its groups
    pub key: String,
    pub title: String,
    pub locked: bool,
}

/// A loaded checklist document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChecklistDocument {
    sections: IndexMap<String, Section>,
    completed_defaults: Vec<String>,
    axes: IndexMap<String, Vec<String>>,
}

impl ChecklistDocument {
    /// Build a document from parsed JSON
    pub fn from_json(value: Value) -> Result<Self, GateError> {
        let Value::Object(entries) = value else {
            return Err(GateError::content("checklist document must be a JSON object"));
        };

        let mut document = Self::default();
        for (key, value) in entries {
            match key.as_str() {
                "$completed" => {
                    document.completed_defaults = serde_json::from_value(value).map_err(|e| {
                        GateError::content(format!("invalid $completed: {}", e))
                    })?;
                }
                "$axes" => {
                    document.axes = serde_json::from_value(value)
                        .map_err(|e| GateError::content(format!("invalid $axes: {}", e)))?;
                }
                meta if meta.starts_with(META_PREFIX) => {
                    log::debug!("Ignoring metadata key '{}'", meta);
                }
                _ => {
                    let section: Section = serde_json::from_value(value).map_err(|e| {
                        GateError::content(format!("invalid section '{}': {}", key, e))
                    })?;
                    document.sections.insert(key, section);
                }
            }
        }
        Ok(document)
    }

    /// Parse a document from a JSON string
    pub fn parse(content: &str) -> Result<Self, GateError> {
        Self::from_json(serde_json::from_str(content)?)
    }

    /// Load a document from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GateError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let document = Self::parse(&content)?;
        log::info!(
            "Loaded {} checklist sections from {}",
            document.sections.len(),
            path.display()
        );
        Ok(document)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&String, &Section)> {
        self.sections.iter()
    }

    pub fn section(&self, key: &str) -> Option<&Section> {
        self.sections.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Keys completed for every player
    pub fn completed_defaults(&self) -> &[String] {
        &self.completed_defaults
    }

    /// Ordered stage names per progression field
    pub fn axes(&self) -> &IndexMap<String, Vec<String>> {
        &self.axes
    }

    /// Walk every checkable entry and report its state
    ///
    /// An entry is locked when the nearest `$condition` (variant, item, then
    /// enclosing sections, innermost first) does not hold for the progress
    /// values.
    pub fn statuses(&self, progress: &ProgressStore, gate: &Gate) -> Vec<ItemStatus> {
        let mut walker = StatusWalker {
            progress,
            gate,
            values: progress.values(),
            out: Vec::new(),
        };
        for (key, section) in &self.sections {
            walker.section(key, section, None);
        }
        walker.out
    }

    /// Top-level sections, each followed by its direct groups
    pub fn outline(&self, progress: &ProgressStore, gate: &Gate) -> Vec<SectionStatus> {
        let mut out = Vec::new();
        for (key, section) in &self.sections {
            out.push(SectionStatus {
                key: key.clone(),
                title: section.title.clone(),
                locked: self.is_section_locked(key, progress, gate),
            });
            let Some(SectionList::Groups(groups)) = &section.list else {
                continue;
            };
            for (child, group) in groups {
                let path = make_key(key, [child.as_str()]);
                let locked = self.is_section_locked(&path, progress, gate);
                out.push(SectionStatus {
                    key: path,
                    title: group.title.clone(),
                    locked,
                });
            }
        }
        out
    }

    /// Whether the section at `path` (`key` or `key/sub`) is locked
    pub fn is_section_locked(&self, path: &str, progress: &ProgressStore, gate: &Gate) -> bool {
        let values = progress.values();
        let mut parts = path.split('/');
        let Some(section) = parts.next().and_then(|key| self.sections.get(key)) else {
            return false;
        };

        let mut condition = section.condition.as_ref();
        let mut current = section;
        for part in parts {
            let Some(SectionList::Groups(groups)) = &current.list else {
                break;
            };
            let Some(next) = groups.get(part) else {
                break;
            };
            condition = next.condition.as_ref().or(condition);
            current = next;
        }
        !gate.is_unlocked_json(condition, &values)
    }
}

struct StatusWalker<'a> {
    progress: &'a ProgressStore,
    gate: &'a Gate,
    values: Values,
    out: Vec<ItemStatus>,
}

impl StatusWalker<'_> {
    fn section(&mut self, data_key: &str, section: &Section, inherited: Option<&Value>) {
        let condition = section.condition.as_ref().or(inherited);
        match &section.list {
            Some(SectionList::Items(items)) => {
                for item in items {
                    self.item(data_key, item, condition);
                }
            }
            Some(SectionList::Groups(groups)) => {
                for (key, group) in groups {
                    self.section(&make_key(data_key, [key.as_str()]), group, condition);
                }
            }
            None => {}
        }
    }

    fn item(&mut self, data_key: &str, item: &Item, inherited: Option<&Value>) {
        let condition = item.condition().or(inherited);
        let key = item.key(data_key);

        match item.variants() {
            Some(variants) => {
                for variant in variants {
                    let variant_condition = variant.condition().or(condition);
                    self.push(variant.key(&key), variant, variant.title(), variant_condition);
                }
            }
            None => self.push(key, item, &item.display_title(), condition),
        }
    }

    fn push(&mut self, key: String, item: &Item, title: &str, condition: Option<&Value>) {
        let completed = self.progress.is_completed(&key);
        let locked = !self.gate.is_unlocked_json(condition, &self.values);
        self.out.push(ItemStatus {
            key,
            title: title.to_string(),
            completed,
            locked,
            code: item.is_code(),
        });
    }
}
