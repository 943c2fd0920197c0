use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::{
    GenerationKind, GenerationOptions, RemainingQuota, ServiceMode, StudyItem,
};
use crate::provider_gateway::ProviderGateway;
use crate::sm2_scheduler::Sm2Scheduler;
use crate::storage::Storage;

/// High-level facade tying generation, persistence and review scheduling
/// together. Items live in one storage collection per [`GenerationKind`].
pub struct StudyEngine {
    gateway: ProviderGateway,
    scheduler: Sm2Scheduler,
    storage: Arc<dyn Storage>,
}

impl StudyEngine {
    pub fn new(gateway: ProviderGateway, storage: Arc<dyn Storage>) -> Self {
        Self {
            gateway,
            scheduler: Sm2Scheduler::new(),
            storage,
        }
    }

    /// Generate study items from source text and persist them. Generation
    /// itself never fails; only persistence can return an error.
    pub async fn generate_items(
        &mut self,
        kind: GenerationKind,
        text: &str,
        source_document_id: Option<&str>,
        options: &GenerationOptions,
    ) -> Result<Vec<StudyItem>> {
        let mut items = self.gateway.generate(kind, text, options).await;
        for item in &mut items {
            item.source_document_id = source_document_id.map(str::to_string);
        }

        self.storage.save_many(kind.collection_name(), &items).await?;
        info!(
            kind = ?kind,
            item_count = items.len(),
            document_id = ?source_document_id,
            "Generated and persisted study items"
        );
        Ok(items)
    }

    /// Record a review with a quality rating in 1..=5 and reschedule the
    /// item. Returns `None` when the item does not exist.
    pub async fn review_item(
        &self,
        kind: GenerationKind,
        item_id: Uuid,
        quality: u8,
    ) -> Result<Option<StudyItem>> {
        self.review_item_at(kind, item_id, quality, Utc::now()).await
    }

    /// Review with an injected timestamp.
    pub async fn review_item_at(
        &self,
        kind: GenerationKind,
        item_id: Uuid,
        quality: u8,
        now: DateTime<Utc>,
    ) -> Result<Option<StudyItem>> {
        let collection = kind.collection_name();
        let items = self.storage.get_all(collection).await?;
        let Some(mut item) = items.into_iter().find(|item| item.id == item_id) else {
            return Ok(None);
        };

        self.scheduler.apply_review(&mut item, quality, now)?;
        self.storage.save_many(collection, std::slice::from_ref(&item)).await?;
        info!(
            item_id = %item.id,
            quality,
            interval = item.interval,
            next_review = %item.next_review,
            "Item reviewed and rescheduled"
        );
        Ok(Some(item))
    }

    /// Items due for review at `now`, soonest first.
    pub async fn due_items(
        &self,
        kind: GenerationKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<StudyItem>> {
        let mut due: Vec<StudyItem> = self
            .storage
            .get_all(kind.collection_name())
            .await?
            .into_iter()
            .filter(|item| item.next_review <= now)
            .collect();
        due.sort_by_key(|item| item.next_review);
        Ok(due)
    }

    /// Remove every item generated from the given source document.
    pub async fn delete_document(
        &self,
        kind: GenerationKind,
        document_id: &str,
    ) -> Result<usize> {
        let removed = self
            .storage
            .delete_by_document(kind.collection_name(), document_id)
            .await?;
        info!(document_id, removed, "Deleted items for source document");
        Ok(removed)
    }

    pub fn remaining_quota(&self) -> RemainingQuota {
        self.gateway.get_remaining()
    }

    pub fn mode(&self) -> ServiceMode {
        self.gateway.mode()
    }

    pub async fn set_mode(&mut self, mode: ServiceMode) -> Result<()> {
        self.gateway.set_mode(mode).await
    }
}
