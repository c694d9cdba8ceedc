//! Derived projections of a [`Delta`] document. Pure, no I/O.

use crate::delta::{Delta, ListFormat};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub position: usize,
}

/// Concatenates every text run in document order and trims the result.
pub fn to_plain_text(delta: &Delta) -> String {
    let text: String = delta.ops.iter().map(|op| op.text_run()).collect();
    text.trim().to_string()
}

/// One entry per operation carrying `list: checked | unchecked`.
///
/// Each operation is its own item even when several styling runs belong to the
/// same visual line. `position` counts extracted items only; `id` is derived
/// from the operation ordinal so the projection depends on `delta` alone.
pub fn extract_checklist_items(delta: &Delta) -> Vec<ChecklistItem> {
    let mut items = Vec::new();
    for (index, op) in delta.ops.iter().enumerate() {
        let completed = match op.list_format() {
            Some(ListFormat::Checked) => true,
            Some(ListFormat::Unchecked) => false,
            _ => continue,
        };
        items.push(ChecklistItem {
            id: format!("check_{}", index),
            text: op.text_run().trim().to_string(),
            completed,
            position: items.len(),
        });
    }
    items
}

pub fn has_checklists(delta: &Delta) -> bool {
    delta
        .ops
        .iter()
        .any(|op| op.list_format().is_some_and(ListFormat::is_checklist))
}

/// Editor-side extraction that joins runs into lines.
///
/// A `list` attribute opens (or, for non-checklist values, closes) a checklist
/// segment; text runs inside the segment accumulate until a bare `"\n"` run
/// ends the line. Not used when persisting notes.
pub fn checklist_lines(delta: &Delta) -> Vec<ChecklistItem> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_checklist = false;
    let mut checked = false;

    for op in &delta.ops {
        if let Some(format) = op.list_format() {
            in_checklist = format.is_checklist();
            checked = format == ListFormat::Checked;
        }

        let run = op.text_run();
        if !in_checklist {
            continue;
        }
        if run == "\n" {
            if !current.trim().is_empty() {
                push_line(&mut items, &current, checked);
                current.clear();
            }
        } else if !run.trim().is_empty() {
            current.push_str(run);
        }
    }

    if !current.trim().is_empty() {
        push_line(&mut items, &current, checked);
    }

    items
}

fn push_line(items: &mut Vec<ChecklistItem>, text: &str, completed: bool) {
    let position = items.len();
    items.push(ChecklistItem {
        id: format!("check_{}", position),
        text: text.trim().to_string(),
        completed,
        position,
    });
}
