//! Client-side view over the note listing.
//!
//! The index never touches the filesystem. It holds the last confirmed
//! listing and replaces it wholesale after each successful operation, so a
//! reader holding a snapshot never sees a half-applied change.

use std::cmp::Reverse;
use std::sync::Arc;

use crate::models::{NoteExt, NoteKey, NoteRecord, TrashEntry};

const DAY_MS: i64 = 86_400_000;

/// Filters `notes` by a case-insensitive title substring and orders the
/// result: pinned titles first, then most recently edited first within
/// each group. Equal keys keep their input order.
pub fn filter_and_sort(notes: &[NoteRecord], pinned: &[String], query: &str) -> Vec<NoteRecord> {
    let query = query.trim().to_lowercase();

    let mut view: Vec<NoteRecord> = notes
        .iter()
        .filter(|note| query.is_empty() || note.title.to_lowercase().contains(&query))
        .cloned()
        .collect();

    view.sort_by_key(|note| (!pinned.contains(&note.title), Reverse(note.last_edit_time)));
    view
}

/// Orders trash entries most recently deleted first.
pub fn sort_trash(mut entries: Vec<TrashEntry>) -> Vec<TrashEntry> {
    entries.sort_by_key(|entry| Reverse(entry.deleted_at));
    entries
}

/// Relative age shown next to a trash entry.
pub fn deleted_ago_label(deleted_at: i64, now: i64) -> String {
    let days = now.saturating_sub(deleted_at).div_euclid(DAY_MS);
    match days {
        d if d <= 0 => "Today".to_string(),
        1 => "1 day ago".to_string(),
        d if d < 30 => format!("{} days ago", d),
        d => format!("{} month(s) ago", d / 30),
    }
}

/// Last known listing plus pins, search query and selection.
///
/// `selected` indexes into [`NoteIndex::filtered`].
#[derive(Debug, Clone, Default)]
pub struct NoteIndex {
    notes: Arc<Vec<NoteRecord>>,
    pinned: Arc<Vec<String>>,
    query: String,
    selected: Option<usize>,
}

impl NoteIndex {
    pub fn new(pinned: Vec<String>) -> Self {
        Self {
            pinned: Arc::new(pinned),
            ..Default::default()
        }
    }

    /// The current listing. Cloning the `Arc` is enough to keep reading it
    /// while the index moves on.
    pub fn snapshot(&self) -> Arc<Vec<NoteRecord>> {
        Arc::clone(&self.notes)
    }

    pub fn pinned(&self) -> &[String] {
        &self.pinned
    }

    pub fn is_pinned(&self, title: &str) -> bool {
        self.pinned.iter().any(|t| t == title)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        let selected = self.selected_key();
        self.query = query.into();
        self.reselect(selected);
    }

    pub fn filtered(&self) -> Vec<NoteRecord> {
        filter_and_sort(&self.notes, &self.pinned, &self.query)
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// Selects a position in the filtered view; out of range clears it.
    pub fn select(&mut self, index: Option<usize>) {
        self.selected = index.filter(|&i| i < self.filtered().len());
    }

    pub fn selected_note(&self) -> Option<NoteRecord> {
        self.selected.and_then(|i| self.filtered().into_iter().nth(i))
    }

    /// Replaces the listing with a fresh one, most recently edited first.
    pub fn replace_notes(&mut self, mut notes: Vec<NoteRecord>) {
        notes.sort_by_key(|note| Reverse(note.last_edit_time));
        let selected = self.selected_key();
        self.notes = Arc::new(notes);
        self.reselect(selected);
    }

    /// A note was created: put it at the front and select it.
    pub fn apply_created(&mut self, key: &NoteKey, now: i64) {
        let created = NoteRecord {
            title: key.title.clone(),
            ext: key.ext,
            last_edit_time: now,
        };
        let notes = std::iter::once(created)
            .chain(self.notes.iter().filter(|n| !n.is(&key.title, key.ext)).cloned())
            .collect();
        self.notes = Arc::new(notes);
        self.reselect(Some(key.clone()));
    }

    /// A note left the active set (trashed or deleted). Clears the
    /// selection if it pointed at that note.
    pub fn apply_removed(&mut self, key: &NoteKey) {
        let selected = self.selected_key().filter(|k| k != key);
        let notes = self
            .notes
            .iter()
            .filter(|n| !n.is(&key.title, key.ext))
            .cloned()
            .collect();
        self.notes = Arc::new(notes);
        self.reselect(selected);
    }

    /// Content was written: bump the edit time.
    pub fn apply_written(&mut self, key: &NoteKey, now: i64) {
        let selected = self.selected_key();
        let notes = self
            .notes
            .iter()
            .map(|n| {
                if n.is(&key.title, key.ext) {
                    NoteRecord {
                        last_edit_time: now,
                        ..n.clone()
                    }
                } else {
                    n.clone()
                }
            })
            .collect();
        self.notes = Arc::new(notes);
        self.reselect(selected);
    }

    /// A rename succeeded. The pin follows the title; returns `true` when the
    /// pin set changed and needs persisting.
    pub fn apply_renamed(&mut self, old_title: &str, new_title: &str, ext: NoteExt, now: i64) -> bool {
        let selected = self.selected_key().map(|k| {
            if k.title == old_title && k.ext == ext {
                NoteKey::new(new_title, ext)
            } else {
                k
            }
        });

        let notes = self
            .notes
            .iter()
            .map(|n| {
                if n.is(old_title, ext) {
                    NoteRecord {
                        title: new_title.to_string(),
                        ext,
                        last_edit_time: now,
                    }
                } else {
                    n.clone()
                }
            })
            .collect();
        self.notes = Arc::new(notes);

        let pins_changed = self.is_pinned(old_title);
        if pins_changed {
            let pinned = self
                .pinned
                .iter()
                .map(|t| if t == old_title { new_title.to_string() } else { t.clone() })
                .collect();
            self.pinned = Arc::new(pinned);
        }

        self.reselect(selected);
        pins_changed
    }

    /// Flips the pin on a title; returns whether it is now pinned.
    pub fn toggle_pin(&mut self, title: &str) -> bool {
        let selected = self.selected_key();
        let now_pinned = !self.is_pinned(title);
        let pinned = if now_pinned {
            self.pinned.iter().cloned().chain(std::iter::once(title.to_string())).collect()
        } else {
            self.pinned.iter().filter(|t| *t != title).cloned().collect()
        };
        self.pinned = Arc::new(pinned);
        self.reselect(selected);
        now_pinned
    }

    fn selected_key(&self) -> Option<NoteKey> {
        self.selected_note().map(|n| n.key())
    }

    /// Points the selection at `key`'s position in the current view.
    fn reselect(&mut self, key: Option<NoteKey>) {
        self.selected = key.and_then(|key| {
            self.filtered()
                .iter()
                .position(|n| n.is(&key.title, key.ext))
        });
    }
}
