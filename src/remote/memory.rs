//! In-Memory Remote
//!
//! Behaves like the REST service (server-side inference, order assignment)
//! and can be switched offline to exercise the fallback paths.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::traits::IngredientRemote;
use crate::error::{RemoteError, RemoteResult};
use crate::export;
use crate::inference;
use crate::models::{ExportFormat, Ingredient, IngredientAnalysis, IngredientPatch, NewIngredient, OrderEntry};

pub struct InMemoryRemote {
    items: Mutex<Vec<Ingredient>>,
    online: AtomicBool,
    calls: Mutex<Vec<&'static str>>,
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    pub fn with_items(items: Vec<Ingredient>) -> Self {
        Self {
            items: Mutex::new(items),
            online: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A service that fails every call
    pub fn offline() -> Self {
        let remote = Self::new();
        remote.set_online(false);
        remote
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Server-side copy of the list
    pub async fn snapshot(&self) -> Vec<Ingredient> {
        self.items.lock().await.clone()
    }

    /// Operation names in call order, including failed attempts
    pub async fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().await.clone()
    }

    async fn enter(&self, op: &'static str) -> RemoteResult<()> {
        self.calls.lock().await.push(op);
        if self.is_online() {
            Ok(())
        } else {
            Err(RemoteError::Unavailable(format!("{} failed: service offline", op)))
        }
    }
}

fn not_found(id: &str) -> RemoteError {
    RemoteError::Status {
        status: 404,
        message: format!("Ingredient {} not found", id),
    }
}

#[async_trait]
impl IngredientRemote for InMemoryRemote {
    async fn list(&self) -> RemoteResult<Vec<Ingredient>> {
        self.enter("list").await?;
        let mut items = self.items.lock().await.clone();
        items.sort_by_key(|item| item.order);
        Ok(items)
    }

    async fn create(&self, draft: &NewIngredient) -> RemoteResult<Ingredient> {
        self.enter("create").await?;
        let mut items = self.items.lock().await;

        let analysis = inference::analyze(&draft.name);
        let now = Utc::now();
        let created = Ingredient {
            id: uuid::Uuid::new_v4().to_string(),
            name: draft.name.clone(),
            quantity: draft.quantity,
            unit: draft.unit,
            notes: draft.notes.clone(),
            tags: analysis.tags,
            allergens: analysis.allergens,
            order: items.len() as i32,
            created_at: now,
            updated_at: now,
        };
        items.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &IngredientPatch) -> RemoteResult<Ingredient> {
        self.enter("update").await?;
        let mut items = self.items.lock().await;

        let item = items.iter_mut().find(|i| i.id == id).ok_or_else(|| not_found(id))?;
        item.apply(patch);
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn delete(&self, id: &str) -> RemoteResult<()> {
        self.enter("delete").await?;
        let mut items = self.items.lock().await;

        let before = items.len();
        items.retain(|i| i.id != id);
        if items.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn reorder(&self, entries: &[OrderEntry]) -> RemoteResult<()> {
        self.enter("reorder").await?;
        let mut items = self.items.lock().await;

        let now = Utc::now();
        for entry in entries {
            if let Some(item) = items.iter_mut().find(|i| i.id == entry.id) {
                item.order = entry.order;
                item.updated_at = now;
            }
        }
        items.sort_by_key(|item| item.order);
        Ok(())
    }

    async fn analyze(&self, name: &str) -> RemoteResult<IngredientAnalysis> {
        self.enter("analyze").await?;
        Ok(inference::analyze(name))
    }

    async fn export(&self, format: ExportFormat) -> RemoteResult<String> {
        self.enter("export").await?;
        let items = self.items.lock().await;
        Ok(export::render(&items, format))
    }

    async fn search(&self, query: &str) -> RemoteResult<Vec<Ingredient>> {
        self.enter("search").await?;
        let items = self.items.lock().await;
        Ok(items.iter().filter(|i| i.matches(query)).cloned().collect())
    }
}
