// SPDX-License-Identifier: MIT

//! Progress export and import
//!
//! JSON exports carry the progress key so a file from another checklist is
//! never imported by mistake. Markdown exports are read-only snapshots.

use super::content::{ChecklistDocument, Item, Section, SectionList};
use super::keys::make_key;
use super::progress::ProgressStore;
use crate::error::GateError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SECTION_RULE: &str = "--------------------------------------\n";

/// Portable progress snapshot
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProgressExport {
    pub key: String,
    pub completed: Vec<String>,
}

/// Serialize completed keys, sorted; `None` when nothing is completed
pub fn export_json(store: &ProgressStore, progress_key: &str) -> Result<Option<String>, GateError> {
    if store.completed().is_empty() {
        return Ok(None);
    }
    let mut completed = store.completed().to_vec();
    completed.sort();
    let export = ProgressExport {
        key: progress_key.to_string(),
        completed,
    };
    Ok(Some(serde_json::to_string_pretty(&export)?))
}

/// Parse an export produced for `progress_key`
pub fn import_json(content: &str, progress_key: &str) -> Result<Vec<String>, GateError> {
    let data: Value = serde_json::from_str(content)
        .map_err(|e| GateError::import(format!("invalid file format: {}", e)))?;

    match data.get("key").and_then(Value::as_str) {
        Some(key) if key == progress_key => {}
        Some(key) => {
            return Err(GateError::import(format!(
                "file belongs to '{}', expected '{}'",
                key, progress_key
            )))
        }
        None => return Err(GateError::import("missing progress key")),
    }

    let Some(Value::Array(entries)) = data.get("completed") else {
        return Err(GateError::import("completed must be a list"));
    };
    entries
        .iter()
        .map(|entry| {
            entry
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| GateError::import(format!("completed entry {} is not a string", entry)))
        })
        .collect()
}

/// Import an export into `store`, replacing its completed keys
pub fn import_into(store: &mut ProgressStore, content: &str, progress_key: &str) -> Result<usize, GateError> {
    let completed = import_json(content, progress_key)?;
    store.replace_completed(completed);
    log::info!("Imported {} completed keys", store.completed().len());
    Ok(store.completed().len())
}

/// Render the document as a Markdown checklist; `None` for an empty document
pub fn generate_markdown(
    title: &str,
    document: &ChecklistDocument,
    store: &ProgressStore,
) -> Option<String> {
    if document.is_empty() {
        return None;
    }

    let mut writer = MarkdownWriter {
        store,
        lines: vec![format!("# {}\n", title)],
    };
    for (key, section) in document.sections() {
        writer.lines.push(format!("## {}\n", section.title));
        match &section.list {
            Some(SectionList::Items(items)) => writer.items(key, items),
            Some(SectionList::Groups(groups)) => writer.groups(key, groups, "###"),
            None => {}
        }
        writer.lines.push(SECTION_RULE.to_string());
    }
    Some(writer.lines.join("\n"))
}

struct MarkdownWriter<'a> {
    store: &'a ProgressStore,
    lines: Vec<String>,
}

impl MarkdownWriter<'_> {
    fn check(&self, key: &str) -> &'static str {
        if self.store.is_completed(key) {
            "[x]"
        } else {
            "[ ]"
        }
    }

    fn items(&mut self, data_key: &str, items: &[Item]) {
        for (i, item) in items.iter().enumerate() {
            let key = item.key(data_key);
            match item.variants() {
                Some(variants) => {
                    self.lines.push(format!(" {}. {}", i + 1, item.title()));
                    for variant in variants {
                        let check = self.check(&variant.key(&key));
                        self.lines.push(format!("   - {} {}", check, variant.title()));
                    }
                    self.lines.push(String::new());
                }
                None => {
                    let check = self.check(&key);
                    self.lines.push(format!(" {}. {} {}", i + 1, check, item.title()));
                }
            }
        }
        self.lines.push(String::new());
    }

    fn groups(&mut self, data_key: &str, groups: &indexmap::IndexMap<String, Section>, head: &str) {
        for (key, group) in groups {
            self.lines.push(format!("{} {}\n", head, group.title));
            let group_key = make_key(data_key, [key.as_str()]);
            match &group.list {
                Some(SectionList::Items(items)) => self.items(&group_key, items),
                Some(SectionList::Groups(nested)) => {
                    self.groups(&group_key, nested, &format!("{}#", head))
                }
                None => {}
            }
        }
    }
}
