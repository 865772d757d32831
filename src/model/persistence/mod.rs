//! Durable key-value storage of the roster state.
//!
//! Four records are kept, each a JSON document under a fixed key:
//! the drawn ids, the excluded ids, the visible actors and a cache of the
//! award counts. Loading never fails: a missing or unreadable record is
//! treated as empty, and the problem is logged.

use std::sync::Arc;

use log::{error, warn};
use rocket::serde::json::{serde_json, Value};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;
use crate::model::{
    actor::{Actor, ActorId},
    allocator::IdAllocator,
    awards::count_awards,
    collection::ActorCollection,
};

mod file;
mod memory;
mod mongo;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Key of the drawn-id record.
pub const DRAWN_IDS: &str = "idsGenerados";
/// Key of the excluded-id record.
pub const EXCLUDED_IDS: &str = "idsEliminados";
/// Key of the visible-actor record.
pub const ACTORS: &str = "actores";
/// Key of the award-count cache.
pub const AWARD_COUNTS: &str = "premiosContados";

/// A backend able to durably hold JSON text under string keys.
#[rocket::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Remove every key.
    async fn clear(&self) -> Result<()>;
}

/// State recovered from storage at startup.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub actors: Vec<Actor>,
    pub drawn: Vec<ActorId>,
    pub excluded: Vec<ActorId>,
}

/// Typed access to the roster records on top of a [`KeyValueStore`].
#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Load and decode a record, falling back to the default on any failure.
    pub async fn load<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                error!("Failed to read '{key}' from storage: {e}");
                return T::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Discarding corrupt '{key}' record: {e}");
            T::default()
        })
    }

    /// Encode and store a record.
    pub async fn save<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw).await
    }

    /// Recover the roster state. Individual actors that fail to decode are
    /// skipped rather than discarding the whole record.
    pub async fn load_snapshot(&self) -> Snapshot {
        let actors = self
            .load::<Vec<Value>>(ACTORS)
            .await
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Actor>(value) {
                Ok(actor) => Some(actor),
                Err(e) => {
                    warn!("Discarding corrupt actor in '{ACTORS}': {e}");
                    None
                }
            })
            .collect();
        Snapshot {
            actors,
            drawn: self.load(DRAWN_IDS).await,
            excluded: self.load(EXCLUDED_IDS).await,
        }
    }

    /// Write back the drawn and excluded ids. Both records are always
    /// attempted; the first failure is returned.
    pub async fn save_allocator(&self, allocator: &IdAllocator) -> Result<()> {
        let drawn = self.save(DRAWN_IDS, allocator.drawn()).await;
        let excluded = self.save(EXCLUDED_IDS, allocator.excluded()).await;
        drawn.and(excluded)
    }

    /// Write back the visible actors and the award counts derived from them.
    pub async fn save_collection(&self, collection: &ActorCollection) -> Result<()> {
        let actors = collection.all();
        let saved = self.save(ACTORS, &actors).await;
        let counted = self.save(AWARD_COUNTS, &count_awards(&actors)).await;
        saved.and(counted)
    }

    /// Write back everything.
    pub async fn save_all(
        &self,
        collection: &ActorCollection,
        allocator: &IdAllocator,
    ) -> Result<()> {
        let ids = self.save_allocator(allocator).await;
        let actors = self.save_collection(collection).await;
        ids.and(actors)
    }

    /// Forget every record.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }
}
