use std::sync::Arc;

use tokio::sync::watch;

use crate::api::{CareerApi, ContentDraft, ContentItem};
use crate::auth::AuthManager;
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    NewestFirst,
    OldestFirst,
    TitleAsc,
}

/// Reactive library state. `items` is the authoritative in-memory copy
/// for the active session; the filtered, sorted projection is derived
/// through [`LibraryState::visible`] and holds no state of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryState {
    pub items: Vec<ContentItem>,
    pub query: String,
    pub sort: SortOrder,
    /// The item open in a detail view, if any.
    pub selected: Option<u64>,
    pub error: Option<String>,
}

impl Default for LibraryState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            query: String::new(),
            sort: SortOrder::NewestFirst,
            selected: None,
            error: None,
        }
    }
}

impl LibraryState {
    /// Case-insensitive substring filter over title and body, then the
    /// selected sort.
    pub fn visible(&self) -> Vec<&ContentItem> {
        let needle = self.query.to_lowercase();
        let mut items: Vec<&ContentItem> = self
            .items
            .iter()
            .filter(|i| {
                needle.is_empty()
                    || i.title.to_lowercase().contains(&needle)
                    || i.body.to_lowercase().contains(&needle)
            })
            .collect();
        match self.sort {
            SortOrder::NewestFirst => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::OldestFirst => items.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::TitleAsc => {
                items.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            }
        }
        items
    }
}

/// The saved-content collection with optimistic mutation.
///
/// Title edits and deletes apply to the in-memory collection first and
/// confirm remotely afterwards. The pre-mutation collection is
/// snapshotted in the same atomic step as the mutation, so a remote
/// failure rolls back with a clean full replace, never a patch.
pub struct ContentLibrary {
    state: watch::Sender<LibraryState>,
    api: Arc<dyn CareerApi>,
    auth: Arc<AuthManager>,
}

impl ContentLibrary {
    pub fn new(api: Arc<dyn CareerApi>, auth: Arc<AuthManager>) -> Self {
        let (state, _) = watch::channel(LibraryState::default());
        Self { state, api, auth }
    }

    pub fn subscribe(&self) -> watch::Receiver<LibraryState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> LibraryState {
        self.state.borrow().clone()
    }

    pub fn set_query(&self, query: &str) {
        self.state.send_modify(|s| s.query = query.to_string());
    }

    pub fn set_sort(&self, sort: SortOrder) {
        self.state.send_modify(|s| s.sort = sort);
    }

    /// Open the detail view for a known item.
    pub fn open(&self, id: u64) {
        self.state.send_modify(|s| {
            if s.items.iter().any(|i| i.id == id) {
                s.selected = Some(id);
            }
        });
    }

    pub fn close(&self) {
        self.state.send_modify(|s| s.selected = None);
    }

    /// Reload the collection from the backend.
    pub async fn refresh(&self) {
        let Some(token) = self.auth.token() else {
            self.unauthorized_locally();
            return;
        };
        match self.api.list_content(&token).await {
            Ok(items) => {
                log::info!("Loaded {} content items", items.len());
                self.state.send_modify(move |s| {
                    s.items = items;
                    s.error = None;
                });
            }
            Err(e) => {
                log::error!("Could not load content items: {e}");
                if e.is_unauthorized() {
                    self.auth.logout().await;
                }
                let message = e.user_message();
                self.state.send_modify(move |s| s.error = Some(message));
            }
        }
    }

    /// Persist a freshly generated draft and append the server's copy.
    pub async fn save(&self, draft: &ContentDraft) -> Result<ContentItem> {
        let Some(token) = self.auth.token() else {
            return Err(ClientError::Unauthorized);
        };
        match self.api.save_content(&token, draft).await {
            Ok(item) => {
                log::info!("Saved content item {}", item.id);
                let appended = item.clone();
                self.state.send_modify(move |s| s.items.push(appended));
                Ok(item)
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.auth.logout().await;
                }
                Err(e)
            }
        }
    }

    /// Rename an item optimistically, closing its detail view, then
    /// confirm remotely. On failure the whole collection rolls back.
    pub async fn edit_title(&self, id: u64, new_title: &str) {
        let Some(token) = self.auth.token() else {
            self.unauthorized_locally();
            return;
        };
        let mut snapshot = Vec::new();
        let mut found = false;
        self.state.send_modify(|s| {
            snapshot = s.items.clone();
            if let Some(item) = s.items.iter_mut().find(|i| i.id == id) {
                item.title = new_title.to_string();
                found = true;
            }
            if s.selected == Some(id) {
                s.selected = None;
            }
            s.error = None;
        });
        if !found {
            return;
        }

        // The optimistic value stands on success; the server copy is not
        // reconciled back in.
        if let Err(e) = self.api.update_title(&token, id, new_title).await {
            self.fail_and_rollback(e, snapshot).await;
        }
    }

    /// Remove an item optimistically, then confirm remotely. On failure
    /// the whole collection rolls back.
    pub async fn delete(&self, id: u64) {
        let Some(token) = self.auth.token() else {
            self.unauthorized_locally();
            return;
        };
        let mut snapshot = Vec::new();
        let mut found = false;
        self.state.send_modify(|s| {
            snapshot = s.items.clone();
            let before = s.items.len();
            s.items.retain(|i| i.id != id);
            found = s.items.len() != before;
            if s.selected == Some(id) {
                s.selected = None;
            }
            s.error = None;
        });
        if !found {
            return;
        }

        match self.api.delete_content(&token, id).await {
            Ok(()) => log::info!("Deleted content item {id}"),
            Err(e) => self.fail_and_rollback(e, snapshot).await,
        }
    }

    fn unauthorized_locally(&self) {
        self.state
            .send_modify(|s| s.error = Some(ClientError::Unauthorized.user_message()));
    }

    async fn fail_and_rollback(&self, e: ClientError, snapshot: Vec<ContentItem>) {
        log::error!("Remote confirmation failed, rolling back: {e}");
        if e.is_unauthorized() {
            self.auth.logout().await;
        }
        let message = e.user_message();
        self.state.send_modify(move |s| {
            // The detail view stays closed; only the collection reverts.
            s.items = snapshot;
            s.error = Some(message);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ContentKind;
    use crate::mocks::{content_item, signed_in_auth, signed_out_auth, ScriptedApi};
    use chrono::{DateTime, Utc};

    fn dated_item(id: u64, title: &str, created_at: &str) -> ContentItem {
        let mut item = content_item(id, title);
        item.created_at = created_at.parse::<DateTime<Utc>>().unwrap();
        item
    }

    async fn loaded_library(items: Vec<ContentItem>) -> (Arc<ScriptedApi>, ContentLibrary) {
        let api = ScriptedApi::new();
        api.push_list_content(Ok(items));
        let library = ContentLibrary::new(api.clone(), signed_in_auth("tok"));
        library.refresh().await;
        (api, library)
    }

    #[tokio::test]
    async fn failed_title_edit_rolls_back_exactly() {
        let items = vec![content_item(1, "X"), content_item(2, "Y")];
        let (api, library) = loaded_library(items).await;
        let before = library.current().items;
        api.push_update_title(Err(ClientError::Remote {
            status: 500,
            message: "boom".into(),
        }));

        library.edit_title(1, "Z").await;

        let state = library.current();
        assert_eq!(state.items, before);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn successful_title_edit_keeps_the_optimistic_value() {
        let (api, library) = loaded_library(vec![content_item(1, "X")]).await;
        // The server answers with a different title; the optimistic one
        // must still win.
        let mut server_copy = content_item(1, "X");
        server_copy.title = "server-title".into();
        api.push_update_title(Ok(server_copy));

        library.edit_title(1, "Z").await;

        let state = library.current();
        assert_eq!(state.items[0].title, "Z");
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn failed_delete_restores_the_prior_collection() {
        let (api, library) = loaded_library(vec![content_item(1, "X")]).await;
        api.push_delete_content(Err(ClientError::Remote {
            status: 500,
            message: "boom".into(),
        }));

        library.delete(1).await;

        let state = library.current();
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].title, "X");
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn successful_delete_removes_the_item() {
        let (api, library) = loaded_library(vec![content_item(1, "X"), content_item(2, "Y")]).await;
        api.push_delete_content(Ok(()));

        library.delete(1).await;

        let state = library.current();
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].id, 2);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn mutating_the_open_item_closes_its_detail_view() {
        let (api, library) = loaded_library(vec![content_item(1, "X")]).await;
        api.push_update_title(Ok(content_item(1, "Z")));

        library.open(1);
        assert_eq!(library.current().selected, Some(1));

        library.edit_title(1, "Z").await;
        assert_eq!(library.current().selected, None);
    }

    #[tokio::test]
    async fn rollback_does_not_reopen_the_closed_detail_view() {
        let (api, library) = loaded_library(vec![content_item(1, "X")]).await;
        api.push_delete_content(Err(ClientError::Remote {
            status: 500,
            message: "boom".into(),
        }));

        library.open(1);
        library.delete(1).await;

        let state = library.current();
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.selected, None);
    }

    #[tokio::test]
    async fn unauthorized_mutation_rolls_back_and_forces_logout() {
        let auth = signed_in_auth("tok");
        let api = ScriptedApi::new();
        api.push_list_content(Ok(vec![content_item(1, "X")]));
        let library = ContentLibrary::new(api.clone(), auth.clone());
        library.refresh().await;

        api.push_update_title(Err(ClientError::Unauthorized));
        library.edit_title(1, "Z").await;

        let state = library.current();
        assert_eq!(state.items[0].title, "X");
        assert!(!auth.current().is_authenticated());
    }

    #[tokio::test]
    async fn mutations_without_a_session_never_reach_the_backend() {
        let api = ScriptedApi::new();
        let library = ContentLibrary::new(api.clone(), signed_out_auth());

        library.edit_title(1, "Z").await;

        assert!(library.current().error.is_some());
        assert_eq!(api.call_count("update_title"), 0);
    }

    #[tokio::test]
    async fn save_appends_the_server_item() {
        let (api, library) = loaded_library(vec![content_item(1, "X")]).await;
        api.push_save_content(Ok(content_item(2, "New Letter")));

        let draft = ContentDraft {
            title: "New Letter".into(),
            body: "Dear team,".into(),
            kind: ContentKind::CoverLetter,
            source_cv_text: None,
            source_job_description: None,
        };
        let saved = library.save(&draft).await.unwrap();

        assert_eq!(saved.id, 2);
        let state = library.current();
        assert_eq!(state.items.len(), 2);
        assert!(state.items.iter().any(|i| i.id == 2));
    }

    #[tokio::test]
    async fn refresh_failure_surfaces_a_message() {
        let api = ScriptedApi::new();
        api.push_list_content(Err(ClientError::Remote {
            status: 503,
            message: "down".into(),
        }));
        let library = ContentLibrary::new(api.clone(), signed_in_auth("tok"));

        library.refresh().await;
        assert!(library.current().error.is_some());
    }

    #[test]
    fn search_filters_title_and_body_case_insensitively() {
        let state = LibraryState {
            items: vec![
                dated_item(1, "Backend Engineer Letter", "2024-05-02T10:00:00Z"),
                dated_item(2, "Bio", "2024-05-03T10:00:00Z"),
            ],
            query: "engineer".into(),
            ..LibraryState::default()
        };

        for sort in [SortOrder::NewestFirst, SortOrder::OldestFirst, SortOrder::TitleAsc] {
            let state = LibraryState {
                sort,
                ..state.clone()
            };
            let visible = state.visible();
            assert_eq!(visible.len(), 1);
            assert_eq!(visible[0].id, 1);
        }
    }

    #[test]
    fn sort_orders_arrange_the_projection() {
        let state = LibraryState {
            items: vec![
                dated_item(1, "beta", "2024-05-01T00:00:00Z"),
                dated_item(2, "Alpha", "2024-05-03T00:00:00Z"),
                dated_item(3, "gamma", "2024-05-02T00:00:00Z"),
            ],
            ..LibraryState::default()
        };

        let ids = |sort: SortOrder| {
            let state = LibraryState {
                sort,
                ..state.clone()
            };
            state
                .visible()
                .iter()
                .map(|i| i.id)
                .collect::<Vec<_>>()
        };

        assert_eq!(ids(SortOrder::NewestFirst), vec![2, 3, 1]);
        assert_eq!(ids(SortOrder::OldestFirst), vec![1, 3, 2]);
        assert_eq!(ids(SortOrder::TitleAsc), vec![2, 1, 3]);
    }
}
