//! Ingredient Store
//!
//! Session-owned ordered list of ingredients kept in sync with the remote
//! service. Every mutation tries the remote first and, when it fails, applies
//! an equivalent local change so the caller never loses work. The outcome
//! says whether the change reached the server.

mod positioning;


use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::error::{RemoteError, StoreError};
use crate::export;
use crate::inference;
use crate::models::{ExportFormat, Ingredient, IngredientAnalysis, IngredientPatch, NewIngredient};
use crate::notify::{Notification, NotificationSink};
use crate::remote::IngredientRemote;

pub use positioning::is_contiguous;

/// Whether a change reached the remote service
#[derive(Debug, Clone, PartialEq)]
pub enum SyncStatus {
    Synced,
    /// Applied locally only; the remote call failed with this error
    LocalOnly(RemoteError),
}

/// Result of a store operation: the value plus where it lives
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub status: SyncStatus,
}

impl<T> Outcome<T> {
    fn synced(value: T) -> Self {
        Self {
            value,
            status: SyncStatus::Synced,
        }
    }

    fn local(value: T, error: RemoteError) -> Self {
        Self {
            value,
            status: SyncStatus::LocalOnly(error),
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self.status, SyncStatus::Synced)
    }

    pub fn remote_error(&self) -> Option<&RemoteError> {
        match &self.status {
            SyncStatus::Synced => None,
            SyncStatus::LocalOnly(e) => Some(e),
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

pub struct IngredientStore {
    remote: Arc<dyn IngredientRemote>,
    sink: Arc<dyn NotificationSink>,
    items: Vec<Ingredient>,
    /// Ids created offline that the server has never seen
    local_only: HashSet<String>,
    offline: bool,
}

impl IngredientStore {
    /// An empty store that has not talked to the remote yet
    pub fn new(remote: Arc<dyn IngredientRemote>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            remote,
            sink,
            items: Vec::new(),
            local_only: HashSet::new(),
            offline: false,
        }
    }

    /// Create a store and fetch the initial list. Never fails; an unreachable
    /// remote leaves the store empty and in offline mode.
    pub async fn load(remote: Arc<dyn IngredientRemote>, sink: Arc<dyn NotificationSink>) -> Self {
        let mut store = Self::new(remote, sink);
        store.reload().await;
        store
    }

    /// Fetch the list again. Records created offline are kept after the
    /// server's records and the whole list is renumbered; on failure the
    /// current list is left as is.
    pub async fn reload(&mut self) -> Outcome<usize> {
        match self.remote.list().await {
            Ok(mut fetched) => {
                fetched.sort_by_key(|item| item.order);
                let pending: Vec<Ingredient> = self
                    .items
                    .drain(..)
                    .filter(|item| self.local_only.contains(&item.id))
                    .filter(|item| !fetched.iter().any(|f| f.id == item.id))
                    .collect();
                self.local_only.retain(|id| pending.iter().any(|p| &p.id == id));

                fetched.extend(pending);
                positioning::reindex(&mut fetched);
                self.items = fetched;
                self.offline = false;
                log::info!("Loaded {} ingredients", self.items.len());
                Outcome::synced(self.items.len())
            }
            Err(e) => {
                log::warn!("Failed to load ingredients: {}", e);
                self.offline = true;
                self.sink.notify(Notification::offline(format!(
                    "Working offline: could not load ingredients ({})",
                    e.message()
                )));
                Outcome::local(self.items.len(), e)
            }
        }
    }

    // ========================
    // Mutations
    // ========================

    /// Append a new ingredient. The only error is missing input; a remote
    /// failure produces a local record with inferred tags and allergens.
    pub async fn add(&mut self, draft: NewIngredient) -> Result<Outcome<Ingredient>, StoreError> {
        let draft = match validate(draft) {
            Ok(draft) => draft,
            Err(e) => {
                self.sink.notify(Notification::error(e.to_string()));
                return Err(e);
            }
        };
        let position = self.items.len() as i32;

        match self.remote.create(&draft).await {
            Ok(mut created) => {
                if created.order != position {
                    log::debug!(
                        "Server placed {} at {}, keeping local position {}",
                        created.id,
                        created.order,
                        position
                    );
                    created.order = position;
                }
                self.items.push(created.clone());
                self.sink
                    .notify(Notification::success(format!("Added {}", created.name)));
                Ok(Outcome::synced(created))
            }
            Err(e) => {
                log::warn!("Failed to create ingredient '{}' remotely: {}", draft.name, e);
                let created = local_record(draft, position);
                self.local_only.insert(created.id.clone());
                self.items.push(created.clone());
                self.sink.notify(Notification::offline(format!(
                    "{} saved offline; it will be lost on reload until the server is reachable",
                    created.name
                )));
                Ok(Outcome::local(created, e))
            }
        }
    }

    /// Patch a record. The local copy is updated whatever the remote says.
    /// `value` is `None` when no record has this id. An empty patch changes
    /// nothing and is not sent.
    pub async fn update(
        &mut self,
        id: &str,
        patch: IngredientPatch,
    ) -> Result<Outcome<Option<Ingredient>>, StoreError> {
        let patch = match validate_patch(patch) {
            Ok(patch) => patch,
            Err(e) => {
                self.sink.notify(Notification::error(e.to_string()));
                return Err(e);
            }
        };
        if patch.is_empty() {
            return Ok(Outcome::synced(self.get(id).cloned()));
        }

        let remote_result = self.remote.update(id, &patch).await;

        let updated = self.items.iter_mut().find(|item| item.id == id).map(|item| {
            item.apply(&patch);
            item.updated_at = Utc::now();
            item.clone()
        });

        match remote_result {
            Ok(_) => {
                self.sink.notify(Notification::success("Ingredient updated"));
                Ok(Outcome::synced(updated))
            }
            Err(e) => {
                log::warn!("Failed to update ingredient {} remotely: {}", id, e);
                self.sink.notify(Notification::offline(format!(
                    "Ingredient updated locally; server not updated ({})",
                    e.message()
                )));
                Ok(Outcome::local(updated, e))
            }
        }
    }

    /// Remove a record locally whatever the remote says. Returns the removed record.
    /// Records created offline are only dropped locally, since the server never had them.
    pub async fn delete(&mut self, id: &str) -> Outcome<Option<Ingredient>> {
        if self.local_only.remove(id) {
            let removed = self.take(id);
            log::debug!("Dropped offline ingredient {} without a remote call", id);
            self.sink.notify(Notification::success("Ingredient removed"));
            return Outcome::synced(removed);
        }

        let remote_result = self.remote.delete(id).await;
        let removed = self.take(id);

        match remote_result {
            Ok(()) => {
                self.sink.notify(Notification::success("Ingredient removed"));
                Outcome::synced(removed)
            }
            Err(e) => {
                log::warn!("Failed to delete ingredient {} remotely: {}", id, e);
                self.sink.notify(Notification::offline(format!(
                    "Ingredient removed locally; server not updated ({})",
                    e.message()
                )));
                Outcome::local(removed, e)
            }
        }
    }

    /// Arrange the list in the sequence of `ordered` and renumber `order` to
    /// match positions. Only ids are read from `ordered`; see `reorder_ids`.
    pub async fn reorder(&mut self, ordered: &[Ingredient]) -> Outcome<()> {
        let ids: Vec<&str> = ordered.iter().map(|item| item.id.as_str()).collect();
        self.reorder_ids(&ids).await
    }

    /// Arrange the list in the sequence of `ids`, then persist the order
    /// remotely. Unknown ids are ignored and records missing from `ids` keep
    /// their relative order after the named ones. A remote failure is logged
    /// and returned, never notified.
    pub async fn reorder_ids(&mut self, ids: &[&str]) -> Outcome<()> {
        let current = std::mem::take(&mut self.items);
        self.items = positioning::arrange(current, ids);
        positioning::reindex(&mut self.items);

        let entries = positioning::order_entries(&self.items);
        match self.remote.reorder(&entries).await {
            Ok(()) => Outcome::synced(()),
            Err(e) => {
                log::warn!("Failed to persist ingredient order: {}", e);
                Outcome::local((), e)
            }
        }
    }

    /// Move one record to `position` (clamped to the end of the list).
    /// `None` when no record has this id.
    pub async fn move_to(&mut self, id: &str, position: usize) -> Option<Outcome<()>> {
        let from = self.items.iter().position(|item| item.id == id)?;
        let mut ids: Vec<String> = self.items.iter().map(|item| item.id.clone()).collect();
        positioning::move_to(&mut ids, from, position);
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        Some(self.reorder_ids(&ids).await)
    }

    // ========================
    // Queries
    // ========================

    /// Tags and allergens for a name, inferred locally when the remote is down
    pub async fn analyze(&self, name: &str) -> Outcome<IngredientAnalysis> {
        match self.remote.analyze(name).await {
            Ok(analysis) => Outcome::synced(analysis),
            Err(e) => {
                log::debug!("Remote analyze failed, using keyword inference: {}", e);
                Outcome::local(inference::analyze(name), e)
            }
        }
    }

    /// Remote search, falling back to matching the local list
    pub async fn search(&self, query: &str) -> Outcome<Vec<Ingredient>> {
        match self.remote.search(query).await {
            Ok(found) => Outcome::synced(found),
            Err(e) => {
                log::debug!("Remote search failed, searching locally: {}", e);
                self.sink
                    .notify(Notification::info("Offline: showing matches from the local list"));
                let found = self.items.iter().filter(|i| i.matches(query)).cloned().collect();
                Outcome::local(found, e)
            }
        }
    }

    /// Remote export, falling back to rendering the local list
    pub async fn export(&self, format: ExportFormat) -> Outcome<String> {
        match self.remote.export(format).await {
            Ok(content) => {
                self.sink.notify(Notification::success(format!(
                    "Exported ingredients as {}",
                    format.as_str()
                )));
                Outcome::synced(content)
            }
            Err(e) => {
                log::warn!("Remote export failed, rendering locally: {}", e);
                let content = export::render(&self.items, format);
                self.sink.notify(Notification::offline(format!(
                    "Exported local copy as {}; it may not match the server",
                    format.as_str()
                )));
                Outcome::local(content, e)
            }
        }
    }

    // ========================
    // Accessors
    // ========================

    pub fn items(&self) -> &[Ingredient] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Ingredient> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Set when the last load failed
    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn is_local_only(&self, id: &str) -> bool {
        self.local_only.contains(id)
    }

    pub fn local_only_count(&self) -> usize {
        self.local_only.len()
    }

    fn take(&mut self, id: &str) -> Option<Ingredient> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }
}

/// Presence checks only: a name and a positive quantity.
fn validate(mut draft: NewIngredient) -> Result<NewIngredient, StoreError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(StoreError::Validation("ingredient name is required".to_string()));
    }
    if !draft.quantity.is_finite() || draft.quantity <= 0.0 {
        return Err(StoreError::Validation(format!(
            "quantity must be a positive number, got {}",
            draft.quantity
        )));
    }
    draft.name = name.to_string();
    Ok(draft)
}

/// Same checks as `validate` for the fields a patch sets.
fn validate_patch(mut patch: IngredientPatch) -> Result<IngredientPatch, StoreError> {
    if let Some(name) = patch.name.take() {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("ingredient name cannot be blank".to_string()));
        }
        patch.name = Some(name.to_string());
    }
    if let Some(quantity) = patch.quantity {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(StoreError::Validation(format!(
                "quantity must be a positive number, got {}",
                quantity
            )));
        }
    }
    Ok(patch)
}

/// Offline stand-in for a server-created record
fn local_record(draft: NewIngredient, position: i32) -> Ingredient {
    let analysis = inference::analyze(&draft.name);
    let now = Utc::now();
    Ingredient {
        id: uuid::Uuid::new_v4().to_string(),
        name: draft.name,
        quantity: draft.quantity,
        unit: draft.unit,
        notes: draft.notes,
        tags: analysis.tags,
        allergens: analysis.allergens,
        order: position,
        created_at: now,
        updated_at: now,
    }
}
