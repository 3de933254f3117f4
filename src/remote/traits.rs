//! Remote Service - Core Trait
//!
//! Abstract interface to the ingredient REST service.
//! Implementations can use HTTP, in-memory, etc.

use async_trait::async_trait;

use crate::error::RemoteResult;
use crate::models::{ExportFormat, Ingredient, IngredientAnalysis, IngredientPatch, NewIngredient, OrderEntry};

/// Remote ingredient service for one ingredient list
///
/// Every call may fail; callers decide how to degrade.
#[async_trait]
pub trait IngredientRemote: Send + Sync {
    /// Fetch the full list
    async fn list(&self) -> RemoteResult<Vec<Ingredient>>;

    /// Create a record; the server assigns id, order, tags and allergens
    async fn create(&self, draft: &NewIngredient) -> RemoteResult<Ingredient>;

    async fn update(&self, id: &str, patch: &IngredientPatch) -> RemoteResult<Ingredient>;

    async fn delete(&self, id: &str) -> RemoteResult<()>;

    /// Persist display order
    async fn reorder(&self, entries: &[OrderEntry]) -> RemoteResult<()>;

    /// Infer tags and allergens from a name
    async fn analyze(&self, name: &str) -> RemoteResult<IngredientAnalysis>;

    async fn export(&self, format: ExportFormat) -> RemoteResult<String>;

    async fn search(&self, query: &str) -> RemoteResult<Vec<Ingredient>>;
}
