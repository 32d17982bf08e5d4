//! Repository for the task journal: tags and the focus task.

use std::sync::Arc;

use super::{edit_or_log, keys, read_or_empty, PreferenceStore, Preferences};
use crate::types::{FocusTask, Tag};

/// Tags and the focus task kept in the preference store.
///
/// Tags are stored as one list ordered by id. Ids are never reused while the
/// highest tag survives.
pub struct TagsRepository {
    store: Arc<dyn PreferenceStore>,
}

impl TagsRepository {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Returns every tag ordered by id.
    pub fn tags(&self) -> Vec<Tag> {
        decode_tags(&read_or_empty(self.store.as_ref()))
    }

    /// Adds a tag named `name` and returns it.
    ///
    /// Returns `None` when the name is blank or already taken.
    pub fn insert_tag(&self, name: &str) -> Option<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut inserted = None;
        edit_or_log(self.store.as_ref(), |prefs| {
            let mut tags = decode_tags(prefs);
            if tags.iter().any(|t| t.name == name) {
                tracing::debug!("Tag '{}' already exists", name);
                return;
            }
            let tag = Tag {
                id: tags.iter().map(|t| t.id).max().unwrap_or(0) + 1,
                name: name.to_string(),
                seconds: 0,
            };
            tags.push(tag.clone());
            encode_tags(prefs, &tags);
            inserted = Some(tag);
        });
        inserted
    }

    /// Removes the tag with `id`; a focus on it falls back to the default.
    pub fn delete_tag(&self, id: u32) -> bool {
        let mut removed = false;
        edit_or_log(self.store.as_ref(), |prefs| {
            let mut tags = decode_tags(prefs);
            let before = tags.len();
            tags.retain(|t| t.id != id);
            if tags.len() == before {
                return;
            }
            encode_tags(prefs, &tags);
            if decode_focus(prefs).tag_id == id {
                let task_name = decode_focus(prefs).task_name;
                encode_focus(
                    prefs,
                    &FocusTask {
                        task_name,
                        ..FocusTask::default()
                    },
                );
            }
            removed = true;
        });
        removed
    }

    /// Adds `seconds` of focused time to the tag with `id`.
    pub fn credit_tag(&self, id: u32, seconds: u64) -> bool {
        let mut credited = false;
        edit_or_log(self.store.as_ref(), |prefs| {
            let mut tags = decode_tags(prefs);
            if let Some(tag) = tags.iter_mut().find(|t| t.id == id) {
                tag.seconds = tag.seconds.saturating_add(seconds);
                encode_tags(prefs, &tags);
                credited = true;
            }
        });
        credited
    }

    /// Returns the focus task.
    pub fn focus_task(&self) -> FocusTask {
        decode_focus(&read_or_empty(self.store.as_ref()))
    }

    /// Focuses the tag with `tag_id` (0 clears the tag) and optionally
    /// renames the task. Returns `None` when the tag does not exist.
    pub fn update_focus_task(&self, tag_id: u32, task_name: Option<&str>) -> Option<FocusTask> {
        let mut updated = None;
        edit_or_log(self.store.as_ref(), |prefs| {
            let tag_name = if tag_id == 0 {
                FocusTask::default().tag_name
            } else {
                match decode_tags(prefs).into_iter().find(|t| t.id == tag_id) {
                    Some(tag) => tag.name,
                    None => return,
                }
            };

            let task_name = match task_name.map(str::trim) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => decode_focus(prefs).task_name,
            };

            let focus = FocusTask {
                tag_id,
                tag_name,
                task_name,
            };
            encode_focus(prefs, &focus);
            updated = Some(focus);
        });
        updated
    }
}

fn decode_tags(prefs: &Preferences) -> Vec<Tag> {
    let mut tags: Vec<Tag> = prefs.get(keys::TAGS).unwrap_or_default();
    tags.sort_by_key(|t| t.id);
    tags
}

fn encode_tags(prefs: &mut Preferences, tags: &[Tag]) {
    match serde_json::to_value(tags) {
        Ok(value) => prefs.set(keys::TAGS, value),
        Err(e) => tracing::error!("Failed to encode tags: {}", e),
    }
}

fn decode_focus(prefs: &Preferences) -> FocusTask {
    let defaults = FocusTask::default();
    FocusTask {
        tag_id: prefs.get_u32(keys::TAG_ID).unwrap_or(defaults.tag_id),
        tag_name: prefs
            .get_str(keys::TAG_NAME)
            .map_or(defaults.tag_name, str::to_string),
        task_name: prefs
            .get_str(keys::TASK_NAME)
            .map_or(defaults.task_name, str::to_string),
    }
}

fn encode_focus(prefs: &mut Preferences, focus: &FocusTask) {
    prefs.set(keys::TAG_ID, focus.tag_id);
    prefs.set(keys::TAG_NAME, focus.tag_name.as_str());
    prefs.set(keys::TASK_NAME, focus.task_name.as_str());
}
