//! Survey client facade
//!
//! Thin glue binding the remote actor, the cache store, and the retry
//! policy: reads go through the cache with remote fetchers, writes go
//! through the retry policy (which purges the mapped partitions on
//! success). The view layer talks to this and nothing below it.

use std::sync::Arc;

use serde_json::Value;

use crate::cache::{CacheKey, CacheStore, Partition, Topic};
use crate::error::Result;
use crate::remote::{EntityKind, RemoteActor};
use crate::retry::MutationRetryPolicy;

pub struct SurveyClient {
    remote: Arc<dyn RemoteActor>,
    cache: CacheStore,
    retry: MutationRetryPolicy,
}

impl SurveyClient {
    pub fn new(
        remote: Arc<dyn RemoteActor>,
        cache: CacheStore,
        retry: MutationRetryPolicy,
    ) -> Self {
        Self {
            remote,
            cache,
            retry,
        }
    }

    /// Clear and re-mark every partition, then let reads repopulate.
    /// Called once at session start.
    pub async fn resync(&self) {
        self.cache.forced_full_sync().await;
    }

    pub async fn species_list(&self) -> Result<Value> {
        let remote = Arc::clone(&self.remote);
        self.cache
            .read(CacheKey::of(Partition::SpeciesList), move || async move {
                remote.list(EntityKind::Species).await
            })
            .await
    }

    pub async fn species_detail(&self, name: &str) -> Result<Value> {
        let remote = Arc::clone(&self.remote);
        let key = name.to_string();
        self.cache
            .read(
                CacheKey::with_param(Partition::SpeciesDetail, name),
                move || async move { remote.get(EntityKind::Species, &key).await },
            )
            .await
    }

    pub async fn location_list(&self) -> Result<Value> {
        let remote = Arc::clone(&self.remote);
        self.cache
            .read(CacheKey::of(Partition::LocationList), move || async move {
                remote.list(EntityKind::Location).await
            })
            .await
    }

    pub async fn media_gallery(&self, species: &str) -> Result<Value> {
        let remote = Arc::clone(&self.remote);
        let key = species.to_string();
        self.cache
            .read(
                CacheKey::with_param(Partition::MediaGallery, species),
                move || async move { remote.get(EntityKind::Media, &key).await },
            )
            .await
    }

    pub async fn team_roster(&self) -> Result<Value> {
        let remote = Arc::clone(&self.remote);
        self.cache
            .read(CacheKey::of(Partition::TeamRoster), move || async move {
                remote.list(EntityKind::Team).await
            })
            .await
    }

    pub async fn save_species(&self, name: &str, record: Value) -> Result<Value> {
        let remote = Arc::clone(&self.remote);
        self.retry
            .execute(Topic::Species, move || {
                let remote = Arc::clone(&remote);
                let record = record.clone();
                let name = name.to_string();
                async move { remote.put(EntityKind::Species, &name, record).await }
            })
            .await
    }

    pub async fn delete_species(&self, name: &str) -> Result<()> {
        let remote = Arc::clone(&self.remote);
        self.retry
            .execute(Topic::Species, move || {
                let remote = Arc::clone(&remote);
                let name = name.to_string();
                async move { remote.delete(EntityKind::Species, &name).await }
            })
            .await
    }

    pub async fn save_location(&self, name: &str, record: Value) -> Result<Value> {
        let remote = Arc::clone(&self.remote);
        self.retry
            .execute(Topic::Location, move || {
                let remote = Arc::clone(&remote);
                let record = record.clone();
                let name = name.to_string();
                async move { remote.put(EntityKind::Location, &name, record).await }
            })
            .await
    }

    pub async fn save_media_item(&self, id: &str, record: Value) -> Result<Value> {
        let remote = Arc::clone(&self.remote);
        self.retry
            .execute(Topic::Media, move || {
                let remote = Arc::clone(&remote);
                let record = record.clone();
                let id = id.to_string();
                async move { remote.put(EntityKind::Media, &id, record).await }
            })
            .await
    }

    pub async fn save_team_member(&self, name: &str, record: Value) -> Result<Value> {
        let remote = Arc::clone(&self.remote);
        self.retry
            .execute(Topic::Team, move || {
                let remote = Arc::clone(&remote);
                let record = record.clone();
                let name = name.to_string();
                async move { remote.put(EntityKind::Team, &name, record).await }
            })
            .await
    }
}
