//! Tag chip input: turns free-text entry into an ordered list of tags.
//!
//! The same [`TagChipInput`] backs every place a user types tags: each staged
//! upload, the edit dialog, and the query tag filter. It holds the committed
//! tags (the "chips") plus one in-progress draft string.
//!
//! # Behaviour
//!
//! | Event | Effect |
//! |-------|--------|
//! | text change containing `,` | text before the first comma is trimmed and committed if non-empty; the rest becomes the draft (re-checked for further commas) |
//! | text change without `,` | draft replaced verbatim |
//! | backspace on an empty draft | last chip popped back into the draft, verbatim |
//! | flush (submit) | non-empty draft committed as the final tag |
//!
//! Under [`TagPolicy::Verbatim`] (the default) tags are only trimmed.
//! [`TagPolicy::Normalize`] additionally lowercases and drops duplicates.

/// Ordered list of committed tags.
pub type TagSet = Vec<String>;

/// Delimiter used when a tag list travels as a single string.
pub const TAG_DELIMITER: char = ',';
const TAG_DELIMITER_STR: &str = ",";

/// How committed tags are cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagPolicy {
    /// Trim only; duplicates and case are kept.
    #[default]
    Verbatim,
    /// Trim, lowercase, and skip tags that are already present.
    Normalize,
}

impl TagPolicy {
    pub fn from_normalize_flag(normalize: bool) -> Self {
        if normalize {
            TagPolicy::Normalize
        } else {
            TagPolicy::Verbatim
        }
    }
}

/// Committed tags plus one in-progress draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagChipInput {
    tags: TagSet,
    draft: String,
    policy: TagPolicy,
}

impl TagChipInput {
    pub fn new(policy: TagPolicy) -> Self {
        Self {
            tags: Vec::new(),
            draft: String::new(),
            policy,
        }
    }

    /// Start from an existing tag list, e.g. when opening the edit dialog.
    ///
    /// The tags are copied; later edits never reach the source list. Under
    /// [`TagPolicy::Normalize`] they are normalized on the way in.
    pub fn with_tags(tags: &[String], policy: TagPolicy) -> Self {
        let mut input = Self::new(policy);
        match policy {
            TagPolicy::Verbatim => input.tags = tags.to_vec(),
            TagPolicy::Normalize => {
                for tag in tags {
                    input.commit(tag);
                }
            }
        }
        input
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn policy(&self) -> TagPolicy {
        self.policy
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.draft.trim().is_empty()
    }

    /// Apply a text-change event carrying the whole new input value.
    pub fn on_text_change(&mut self, new_text: &str) {
        let mut rest = new_text;
        while let Some((head, tail)) = rest.split_once(TAG_DELIMITER) {
            self.commit(head);
            rest = tail;
        }
        self.draft = rest.to_string();
    }

    /// Type `text` one character at a time onto the end of the draft.
    ///
    /// Equivalent to a user typing it into the field, so every comma
    /// commits a chip as it is entered.
    pub fn type_str(&mut self, text: &str) {
        for ch in text.chars() {
            let mut next = self.draft.clone();
            next.push(ch);
            self.on_text_change(&next);
        }
    }

    /// Backspace key on the input.
    ///
    /// Only acts when the draft is empty and at least one chip exists: the
    /// last chip is removed and restored into the draft for correction.
    /// Returns `true` when a chip was popped.
    pub fn on_backspace(&mut self) -> bool {
        if !self.draft.is_empty() {
            return false;
        }
        match self.tags.pop() {
            Some(tag) => {
                self.draft = tag;
                true
            }
            None => false,
        }
    }

    /// Remove the chip at `index` (the chip's close button).
    pub fn remove(&mut self, index: usize) -> Option<String> {
        if index < self.tags.len() {
            Some(self.tags.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.tags.clear();
        self.draft.clear();
    }

    /// Commit any non-empty draft as the final tag and clear the draft.
    pub fn flush(&mut self) -> &[String] {
        let draft = std::mem::take(&mut self.draft);
        self.commit(&draft);
        &self.tags
    }

    /// The tags this input would submit, without mutating it.
    pub fn committed_with_draft(&self) -> TagSet {
        let mut preview = self.clone();
        preview.flush();
        preview.tags
    }

    fn commit(&mut self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return false;
        }
        let tag = match self.policy {
            TagPolicy::Verbatim => trimmed.to_string(),
            TagPolicy::Normalize => trimmed.to_lowercase(),
        };
        if self.policy == TagPolicy::Normalize && self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }
}

/// Join tags into the single delimiter-separated string sent per upload.
pub fn join_tags(tags: &[String]) -> String {
    tags.join(TAG_DELIMITER_STR)
}

/// Split a delimiter-separated string into trimmed, non-empty tags.
pub fn split_tags(text: &str) -> TagSet {
    text.split(TAG_DELIMITER)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
