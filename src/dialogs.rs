//! Edit and delete dialogs as explicit state machines.
//!
//! ```text
//! Edit:    Closed ──open──▶ Open(session) ──begin_save──▶ Saving
//!            ▲                 │  ▲                         │
//!            └─────cancel──────┘  └──────finish_save(err)───┤
//!            └───────────────────────finish_save(ok)────────┘
//!
//! Delete:  Idle ──request──▶ ConfirmPending(path) ──begin_confirm──▶ Deleting(path)
//!           ▲                     │                                    │
//!           └──────cancel─────────┘                                    │
//!           └──────────────────────finish_confirm (ok or err)──────────┘
//! ```
//!
//! A failed save returns the dialog to the exact session the user had
//! before pressing save. A failed delete returns to `Idle` and leaves the
//! results untouched.

use crate::models::ImageResult;
use crate::tags::{TagChipInput, TagPolicy, TagSet};

/// Transient state of one open edit dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    target: ImageResult,
    input: TagChipInput,
}

impl EditSession {
    pub fn target(&self) -> &ImageResult {
        &self.target
    }

    pub fn input(&self) -> &TagChipInput {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut TagChipInput {
        &mut self.input
    }

    pub fn working_tags(&self) -> &[String] {
        self.input.tags()
    }
}

/// A tag update waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSave {
    pub path: String,
    pub tags: TagSet,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditDialog {
    #[default]
    Closed,
    Open(EditSession),
    Saving {
        snapshot: EditSession,
        save: PendingSave,
    },
}

impl EditDialog {
    /// Open on a copy of `result`'s tags. Replaces any open session.
    pub fn open(&mut self, result: &ImageResult, policy: TagPolicy) -> bool {
        if matches!(self, EditDialog::Saving { .. }) {
            return false;
        }
        *self = EditDialog::Open(EditSession {
            target: result.clone(),
            input: TagChipInput::with_tags(&result.tags, policy),
        });
        true
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, EditDialog::Closed)
    }

    pub fn session(&self) -> Option<&EditSession> {
        match self {
            EditDialog::Open(s) => Some(s),
            EditDialog::Saving { snapshot, .. } => Some(snapshot),
            EditDialog::Closed => None,
        }
    }

    /// The editable session; `None` while closed or saving.
    pub fn session_mut(&mut self) -> Option<&mut EditSession> {
        match self {
            EditDialog::Open(s) => Some(s),
            _ => None,
        }
    }

    /// Discard the open session without any network call.
    pub fn cancel(&mut self) -> Option<EditSession> {
        match std::mem::take(self) {
            EditDialog::Open(s) => Some(s),
            other => {
                *self = other;
                None
            }
        }
    }

    /// Flush the draft and move to `Saving`, returning the update to send.
    pub fn begin_save(&mut self) -> Option<PendingSave> {
        match std::mem::take(self) {
            EditDialog::Open(snapshot) => {
                let mut working = snapshot.input.clone();
                let save = PendingSave {
                    path: snapshot.target.path.clone(),
                    tags: working.flush().to_vec(),
                };
                *self = EditDialog::Saving {
                    snapshot,
                    save: save.clone(),
                };
                Some(save)
            }
            other => {
                *self = other;
                None
            }
        }
    }

    /// Resolve a save. Success closes the dialog and returns the committed
    /// update; failure reopens the pre-save session.
    pub fn finish_save(&mut self, succeeded: bool) -> Option<PendingSave> {
        match std::mem::take(self) {
            EditDialog::Saving { snapshot, save } => {
                if succeeded {
                    Some(save)
                } else {
                    *self = EditDialog::Open(snapshot);
                    None
                }
            }
            other => {
                *self = other;
                None
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeleteDialog {
    #[default]
    Idle,
    ConfirmPending(String),
    Deleting(String),
}

impl DeleteDialog {
    pub fn request(&mut self, path: impl Into<String>) -> bool {
        match self {
            DeleteDialog::Deleting(_) => false,
            _ => {
                *self = DeleteDialog::ConfirmPending(path.into());
                true
            }
        }
    }

    pub fn pending_path(&self) -> Option<&str> {
        match self {
            DeleteDialog::ConfirmPending(p) | DeleteDialog::Deleting(p) => Some(p),
            DeleteDialog::Idle => None,
        }
    }

    pub fn cancel(&mut self) -> bool {
        if matches!(self, DeleteDialog::ConfirmPending(_)) {
            *self = DeleteDialog::Idle;
            true
        } else {
            false
        }
    }

    pub fn begin_confirm(&mut self) -> Option<String> {
        match std::mem::take(self) {
            DeleteDialog::ConfirmPending(path) => {
                *self = DeleteDialog::Deleting(path.clone());
                Some(path)
            }
            other => {
                *self = other;
                None
            }
        }
    }

    /// Resolve the delete. Success returns to `Idle` and yields the deleted
    /// path; failure goes back to `ConfirmPending` so the user can retry or
    /// cancel.
    pub fn finish_confirm(&mut self, succeeded: bool) -> Option<String> {
        match std::mem::take(self) {
            DeleteDialog::Deleting(path) if succeeded => Some(path),
            DeleteDialog::Deleting(path) => {
                *self = DeleteDialog::ConfirmPending(path);
                None
            }
            other => {
                *self = other;
                None
            }
        }
    }
}
