// SPDX-License-Identifier: MIT

//! Checklist content, player progress and their exports

mod content;
mod export;
mod keys;
mod progress;

pub use content::{
    total, ChecklistDocument, Item, ItemEntry, ItemStatus, Section, SectionList, SectionStatus,
};
pub use export::{export_json, generate_markdown, import_into, import_json, ProgressExport};
pub use keys::{escape_key, make_key};
pub use progress::ProgressStore;
