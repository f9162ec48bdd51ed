//! Application controller.
//!
//! [`AppController`] owns all client-side state (staging area, result set,
//! dialogs, status text, query settings) and wires user actions to
//! [`ImageIndex`] calls. It has no rendering surface, so every transition
//! can be driven and checked headlessly.
//!
//! Each network-backed action comes in two forms:
//!
//! - a one-call `async fn` (`submit_batch`, `run_query`, `save_edit`,
//!   `confirm_delete`) for callers that simply await the result, and
//! - a `begin_*` / `finish_*` pair for an event loop that keeps handling
//!   input while the request is outstanding.
//!
//! Queries carry a monotonically increasing sequence number. A response is
//! applied only if it belongs to the most recently issued query, so a slow
//! early response can never overwrite a newer one.

use log::{debug, warn};
use std::sync::Arc;

use crate::client::ImageIndex;
use crate::config::Config;
use crate::dialogs::{DeleteDialog, EditDialog, EditSession, PendingSave};
use crate::error::ApiError;
use crate::files::FileHandle;
use crate::models::{AddImagesResponse, ImageResult, QueryRequest};
use crate::results::ResultSet;
use crate::staging::{StagingError, UploadBatch, UploadStaging};
use crate::tags::{TagChipInput, TagPolicy};

/// A query that has been issued but not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTicket {
    pub seq: u64,
    pub request: QueryRequest,
}

/// What happened to a query response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Results replaced with this many entries.
    Applied(usize),
    /// The query failed; results cleared and the error recorded.
    Failed,
    /// A newer query was issued meanwhile; response discarded.
    Stale,
}

/// Status line text after a successful upload.
pub fn add_status(response: &AddImagesResponse) -> String {
    let mut status = format!("Added {} images", response.added);
    if response.skipped > 0 {
        let plural = if response.skipped > 1 { "s" } else { "" };
        status.push_str(&format!(
            " ({} duplicate{} skipped)",
            response.skipped, plural
        ));
    }
    status
}

fn error_status(err: &ApiError) -> String {
    format!("Error: {}", err)
}

pub struct AppController {
    index: Arc<dyn ImageIndex>,
    policy: TagPolicy,
    staging: UploadStaging,
    results: ResultSet,
    query_error: Option<String>,
    edit: EditDialog,
    delete: DeleteDialog,
    status: Option<String>,
    top_k: u32,
    tag_filter: TagChipInput,
    last_query_seq: u64,
}

impl AppController {
    pub fn new(index: Arc<dyn ImageIndex>, config: &Config) -> Self {
        let policy = config.tags.policy();
        Self {
            index,
            policy,
            staging: UploadStaging::new(policy),
            results: ResultSet::new(),
            query_error: None,
            edit: EditDialog::default(),
            delete: DeleteDialog::default(),
            status: None,
            top_k: config.query.default_top_k.max(1),
            tag_filter: TagChipInput::new(policy),
            last_query_seq: 0,
        }
    }

    // ============ Accessors ============

    pub fn index(&self) -> &Arc<dyn ImageIndex> {
        &self.index
    }

    pub fn staging(&self) -> &UploadStaging {
        &self.staging
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    /// Message of the last failed query, shown in place of results.
    pub fn query_error(&self) -> Option<&str> {
        self.query_error.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn edit_dialog(&self) -> &EditDialog {
        &self.edit
    }

    pub fn delete_dialog(&self) -> &DeleteDialog {
        &self.delete
    }

    pub fn asset_url(&self, path: &str) -> String {
        self.index.asset_url(path)
    }

    // ============ Staging ============

    pub fn add_files(&mut self, handles: Vec<FileHandle>) -> Result<usize, StagingError> {
        self.staging.add_files(handles)
    }

    pub fn remove_upload(&mut self, index: usize) -> Result<(), StagingError> {
        self.staging.remove_upload(index).map(|_| ())
    }

    pub fn update_upload_tags(
        &mut self,
        index: usize,
        patch: impl FnOnce(&mut TagChipInput),
    ) -> Result<(), StagingError> {
        self.staging.update_upload_tags(index, patch)
    }

    /// Build the batch and freeze staging. `None` when there is nothing to
    /// send or a batch is already in flight.
    pub fn begin_submit_batch(&mut self) -> Option<UploadBatch> {
        match self.staging.begin_submit() {
            Ok(batch) => batch,
            Err(e) => {
                debug!("submit ignored: {}", e);
                None
            }
        }
    }

    pub fn finish_submit_batch(
        &mut self,
        result: Result<AddImagesResponse, ApiError>,
    ) -> Result<AddImagesResponse, ApiError> {
        match &result {
            Ok(response) => {
                self.staging.finish_submit(true);
                self.status = Some(add_status(response));
            }
            Err(e) => {
                self.staging.finish_submit(false);
                self.status = Some(error_status(e));
            }
        }
        result
    }

    /// Upload everything staged. `None` when the call was a no-op.
    pub async fn submit_batch(&mut self) -> Option<Result<AddImagesResponse, ApiError>> {
        let batch = self.begin_submit_batch()?;
        let result = self.index.add_images(&batch).await;
        Some(self.finish_submit_batch(result))
    }

    // ============ Query ============

    pub fn top_k(&self) -> u32 {
        self.top_k
    }

    /// Set top-k, clamped to at least 1.
    pub fn set_top_k(&mut self, value: i64) {
        self.top_k = value.clamp(1, i64::from(u32::MAX)) as u32;
    }

    pub fn increment_top_k(&mut self) {
        self.top_k = self.top_k.saturating_add(1);
    }

    pub fn decrement_top_k(&mut self) {
        self.top_k = self.top_k.saturating_sub(1).max(1);
    }

    pub fn tag_filter(&self) -> &TagChipInput {
        &self.tag_filter
    }

    pub fn tag_filter_mut(&mut self) -> &mut TagChipInput {
        &mut self.tag_filter
    }

    /// Issue a query. `None` when `text` is blank.
    pub fn begin_query(&mut self, text: &str) -> Option<QueryTicket> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let filter = self.tag_filter.committed_with_draft();
        self.last_query_seq += 1;
        Some(QueryTicket {
            seq: self.last_query_seq,
            request: QueryRequest {
                text: text.to_string(),
                top_k: self.top_k,
                tags: if filter.is_empty() { None } else { Some(filter) },
            },
        })
    }

    pub fn finish_query(
        &mut self,
        seq: u64,
        result: Result<Vec<ImageResult>, ApiError>,
    ) -> QueryOutcome {
        if seq != self.last_query_seq {
            warn!(
                "discarding stale query response #{} (latest #{})",
                seq, self.last_query_seq
            );
            return QueryOutcome::Stale;
        }
        match result {
            Ok(results) => {
                self.query_error = None;
                self.results.replace(results);
                QueryOutcome::Applied(self.results.len())
            }
            Err(e) => {
                self.results.clear();
                self.query_error = Some(e.to_string());
                QueryOutcome::Failed
            }
        }
    }

    pub async fn run_query(&mut self, text: &str) -> Option<QueryOutcome> {
        let ticket = self.begin_query(text)?;
        let result = self.index.query(&ticket.request).await;
        Some(self.finish_query(ticket.seq, result))
    }

    // ============ Edit ============

    /// Open the edit dialog on the result at `path`.
    pub fn open_edit(&mut self, path: &str) -> bool {
        match self.results.get(path) {
            Some(result) => self.edit.open(result, self.policy),
            None => false,
        }
    }

    pub fn edit_session(&self) -> Option<&EditSession> {
        self.edit.session()
    }

    /// The edit dialog's tag input, while it is open and not saving.
    pub fn edit_input_mut(&mut self) -> Option<&mut TagChipInput> {
        self.edit.session_mut().map(EditSession::input_mut)
    }

    pub fn cancel_edit(&mut self) -> bool {
        self.edit.cancel().is_some()
    }

    pub fn begin_save_edit(&mut self) -> Option<PendingSave> {
        self.edit.begin_save()
    }

    pub fn finish_save_edit(&mut self, result: Result<(), ApiError>) -> Result<(), ApiError> {
        match &result {
            Ok(()) => {
                if let Some(save) = self.edit.finish_save(true) {
                    self.status = Some(format!("Saved tags for {}", save.path));
                    if !self.results.patch_tags(&save.path, save.tags) {
                        debug!("edited {} is no longer in the result set", save.path);
                    }
                }
            }
            Err(e) => {
                self.edit.finish_save(false);
                self.status = Some(error_status(e));
            }
        }
        result
    }

    pub async fn save_edit(&mut self) -> Option<Result<(), ApiError>> {
        let save = self.begin_save_edit()?;
        let result = self.index.update_tags(&save.path, &save.tags).await;
        Some(self.finish_save_edit(result))
    }

    // ============ Delete ============

    pub fn request_delete(&mut self, path: &str) -> bool {
        self.delete.request(path)
    }

    pub fn cancel_delete(&mut self) -> bool {
        self.delete.cancel()
    }

    pub fn begin_confirm_delete(&mut self) -> Option<String> {
        self.delete.begin_confirm()
    }

    pub fn finish_confirm_delete(&mut self, result: Result<(), ApiError>) -> Result<(), ApiError> {
        match &result {
            Ok(()) => {
                if let Some(path) = self.delete.finish_confirm(true) {
                    self.results.remove(&path);
                    self.status = Some(format!("Deleted {}", path));
                }
            }
            Err(e) => {
                self.delete.finish_confirm(false);
                self.status = Some(error_status(e));
            }
        }
        result
    }

    pub async fn confirm_delete(&mut self) -> Option<Result<(), ApiError>> {
        let path = self.begin_confirm_delete()?;
        let result = self.index.delete(&path).await;
        Some(self.finish_confirm_delete(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::memory::{Call, InMemoryIndex, Operation};

    fn setup() -> (Arc<InMemoryIndex>, AppController) {
        let index = Arc::new(InMemoryIndex::new());
        let controller = AppController::new(index.clone(), &Config::minimal());
        (index, controller)
    }

    fn png(name: &str) -> FileHandle {
        FileHandle::new(name, "image/png", name.as_bytes().to_vec())
    }

    fn tags_of(controller: &AppController, path: &str) -> Vec<String> {
        controller.results().get(path).unwrap().tags.clone()
    }

    #[test]
    fn test_add_status_text() {
        let r = |added, skipped| AddImagesResponse { added, skipped };
        assert_eq!(add_status(&r(3, 0)), "Added 3 images");
        assert_eq!(add_status(&r(1, 1)), "Added 1 images (1 duplicate skipped)");
        assert_eq!(add_status(&r(0, 2)), "Added 0 images (2 duplicates skipped)");
    }

    #[tokio::test]
    async fn test_submit_sends_aligned_tags_and_clears() {
        let (index, mut c) = setup();
        c.add_files(vec![png("cat.png"), png("plain.png")]).unwrap();
        c.update_upload_tags(0, |t| t.type_str("cat,")).unwrap();

        let response = c.submit_batch().await.unwrap().unwrap();
        assert_eq!(response.added, 2);
        assert_eq!(
            index.calls(),
            [Call::Add {
                file_names: vec!["cat.png".into(), "plain.png".into()],
                tags: vec!["cat".into(), "".into()],
            }]
        );
        assert!(c.staging().is_empty());
        assert_eq!(c.status(), Some("Added 2 images"));
    }

    #[tokio::test]
    async fn test_submit_clears_even_when_all_skipped() {
        let (index, mut c) = setup();
        index.insert("old.png", &[], b"dup.png");
        c.add_files(vec![png("dup.png")]).unwrap();

        let response = c.submit_batch().await.unwrap().unwrap();
        assert_eq!((response.added, response.skipped), (0, 1));
        assert!(c.staging().is_empty());
        assert_eq!(c.status(), Some("Added 0 images (1 duplicate skipped)"));
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_staging() {
        let (index, mut c) = setup();
        c.add_files(vec![png("a.png")]).unwrap();
        index.fail_next(Operation::Add, "disk full");

        assert!(c.submit_batch().await.unwrap().is_err());
        assert_eq!(c.staging().len(), 1);
        assert!(!c.staging().is_in_flight());
        assert_eq!(c.status(), Some("Error: disk full"));

        assert!(c.submit_batch().await.unwrap().is_ok());
        assert!(c.staging().is_empty());
    }

    #[tokio::test]
    async fn test_empty_submit_and_blank_query_are_noops() {
        let (index, mut c) = setup();
        assert!(c.submit_batch().await.is_none());
        assert!(c.run_query("   ").await.is_none());
        assert!(index.calls().is_empty());
        assert_eq!(c.status(), None);
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_noop() {
        let (_index, mut c) = setup();
        c.add_files(vec![png("a.png")]).unwrap();
        let batch = c.begin_submit_batch().unwrap();
        assert!(c.begin_submit_batch().is_none());
        assert!(c.add_files(vec![png("b.png")]).is_err());
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_top_k_never_below_one() {
        let (_index, mut c) = setup();
        c.set_top_k(1);
        c.decrement_top_k();
        assert_eq!(c.top_k(), 1);
        c.set_top_k(-4);
        assert_eq!(c.top_k(), 1);
        c.increment_top_k();
        assert_eq!(c.top_k(), 2);
    }

    #[tokio::test]
    async fn test_query_replaces_results_verbatim() {
        let (index, mut c) = setup();
        index.insert("sunset.png", &["sky"], b"1");
        index.insert("sunset_red.png", &[], b"2");
        index.insert("cat.png", &[], b"3");
        c.set_top_k(3);

        assert_eq!(c.run_query(" sunset ").await, Some(QueryOutcome::Applied(2)));
        let paths: Vec<&str> = c.results().iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["store/sunset.png", "store/sunset_red.png"]);
        assert!(c.results().iter().all(|r| !r.tag_match));
        assert_eq!(
            index.calls(),
            [Call::Query(QueryRequest {
                text: "sunset".into(),
                top_k: 3,
                tags: None,
            })]
        );

        c.run_query("cat").await;
        assert_eq!(c.results().len(), 1);
        assert_eq!(c.results().get_index(0).unwrap().path, "store/cat.png");
    }

    #[tokio::test]
    async fn test_query_sends_tag_filter() {
        let (index, mut c) = setup();
        index.insert("dog.png", &["pet"], b"1");
        c.tag_filter_mut().type_str("pet");

        c.run_query("anything").await;
        assert!(c.results().get("store/dog.png").unwrap().tag_match);
        match &index.calls()[0] {
            Call::Query(req) => assert_eq!(req.tags.as_deref(), Some(&["pet".to_string()][..])),
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_query_records_error() {
        let (index, mut c) = setup();
        index.insert("a.png", &[], b"1");
        c.run_query("a").await;
        index.fail_next(Operation::Query, "embedding backend down");

        assert_eq!(c.run_query("a").await, Some(QueryOutcome::Failed));
        assert!(c.results().is_empty());
        assert_eq!(c.query_error(), Some("embedding backend down"));

        c.run_query("a").await;
        assert_eq!(c.query_error(), None);
        assert_eq!(c.results().len(), 1);
    }

    #[test]
    fn test_stale_query_response_is_discarded() {
        let (_index, mut c) = setup();
        let first = c.begin_query("first").unwrap();
        let second = c.begin_query("second").unwrap();
        assert!(second.seq > first.seq);

        let newer = vec![ImageResult {
            path: "store/new.png".into(),
            tags: vec![],
            tag_match: false,
        }];
        assert_eq!(c.finish_query(second.seq, Ok(newer)), QueryOutcome::Applied(1));
        assert_eq!(c.finish_query(first.seq, Ok(vec![])), QueryOutcome::Stale);
        assert_eq!(c.results().len(), 1);
    }

    async fn with_results(index: &InMemoryIndex, c: &mut AppController) {
        index.insert("a.png", &["a", "b"], b"1");
        index.insert("b.png", &["keep"], b"2");
        c.run_query("png").await;
        assert_eq!(c.results().len(), 2);
    }

    #[tokio::test]
    async fn test_edit_scenario_sends_flushed_tags() {
        let (index, mut c) = setup();
        with_results(&index, &mut c).await;

        assert!(c.open_edit("store/a.png"));
        let input = c.edit_input_mut().unwrap();
        input.remove(0);
        input.on_text_change("c");
        assert_eq!(tags_of(&c, "store/a.png"), ["a", "b"]);

        c.save_edit().await.unwrap().unwrap();
        assert!(index.calls().contains(&Call::UpdateTags {
            path: "store/a.png".into(),
            tags: vec!["b".into(), "c".into()],
        }));
        assert_eq!(tags_of(&c, "store/a.png"), ["b", "c"]);
        assert_eq!(tags_of(&c, "store/b.png"), ["keep"]);
        assert!(!c.edit_dialog().is_open());
    }

    #[tokio::test]
    async fn test_cancel_edit_changes_nothing() {
        let (index, mut c) = setup();
        with_results(&index, &mut c).await;
        c.open_edit("store/a.png");
        c.edit_input_mut().unwrap().clear();
        assert!(c.cancel_edit());
        assert_eq!(tags_of(&c, "store/a.png"), ["a", "b"]);
        assert!(!index
            .calls()
            .iter()
            .any(|call| matches!(call, Call::UpdateTags { .. })));
    }

    #[tokio::test]
    async fn test_failed_edit_keeps_dialog_open() {
        let (index, mut c) = setup();
        with_results(&index, &mut c).await;
        c.open_edit("store/a.png");
        c.edit_input_mut().unwrap().on_text_change("new");
        index.fail_next(Operation::UpdateTags, "read-only index");

        assert!(c.save_edit().await.unwrap().is_err());
        assert!(c.edit_dialog().is_open());
        assert_eq!(c.edit_session().unwrap().input().draft(), "new");
        assert_eq!(tags_of(&c, "store/a.png"), ["a", "b"]);
        assert_eq!(c.status(), Some("Error: read-only index"));

        c.save_edit().await.unwrap().unwrap();
        assert_eq!(tags_of(&c, "store/a.png"), ["a", "b", "new"]);
        assert_eq!(c.status(), Some("Saved tags for store/a.png"));
    }

    #[test]
    fn test_open_edit_requires_known_path() {
        let (_index, mut c) = setup();
        assert!(!c.open_edit("store/ghost.png"));
        assert!(!c.edit_dialog().is_open());
    }

    #[tokio::test]
    async fn test_confirm_delete_removes_one_entry() {
        let (index, mut c) = setup();
        with_results(&index, &mut c).await;

        c.request_delete("store/a.png");
        c.confirm_delete().await.unwrap().unwrap();
        assert_eq!(c.results().len(), 1);
        assert_eq!(tags_of(&c, "store/b.png"), ["keep"]);
        assert_eq!(c.status(), Some("Deleted store/a.png"));
        assert_eq!(c.delete_dialog(), &DeleteDialog::Idle);
    }

    #[tokio::test]
    async fn test_delete_unknown_path_leaves_results() {
        let (index, mut c) = setup();
        with_results(&index, &mut c).await;
        c.request_delete("store/ghost.png");
        assert!(c.confirm_delete().await.unwrap().is_ok());
        assert_eq!(c.results().len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_and_failed_delete() {
        let (index, mut c) = setup();
        with_results(&index, &mut c).await;

        c.request_delete("store/a.png");
        assert!(c.cancel_delete());
        assert!(c.confirm_delete().await.is_none());

        c.request_delete("store/a.png");
        index.fail_next(Operation::Delete, "permission denied");
        assert!(c.confirm_delete().await.unwrap().is_err());
        assert_eq!(c.results().len(), 2);
        assert_eq!(
            c.delete_dialog(),
            &DeleteDialog::ConfirmPending("store/a.png".into())
        );
        assert_eq!(c.status(), Some("Error: permission denied"));

        c.confirm_delete().await.unwrap().unwrap();
        assert_eq!(c.results().len(), 1);
        assert_eq!(c.delete_dialog(), &DeleteDialog::Idle);
        assert_eq!(c.status(), Some("Deleted store/a.png"));
    }
}
