use mongodb::{
    bson::doc,
    options::{ClientOptions, ReplaceOptions},
    Client, Collection,
};
use serde::{Deserialize, Serialize};

use super::KeyValueStore;
use crate::error::Result;

/// Name of the collection holding the records.
const KV: &str = "kv";

/// A single stored record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    #[serde(rename = "_id")]
    key: String,
    value: String,
}

/// Storage backed by a MongoDB collection of `{ _id: key, value }` documents.
#[derive(Debug, Clone)]
pub struct MongoStore {
    entries: Collection<Entry>,
}

impl MongoStore {
    /// Connect to the server at `uri` and use the given database.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;
        Ok(Self {
            entries: client.database(database).collection(KV),
        })
    }
}

#[rocket::async_trait]
impl KeyValueStore for MongoStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = self.entries.find_one(doc! { "_id": key }, None).await?;
        Ok(entry.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let upsert = ReplaceOptions::builder().upsert(true).build();
        let entry = Entry {
            key: key.to_string(),
            value,
        };
        self.entries
            .replace_one(doc! { "_id": key }, entry, upsert)
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.delete_many(doc! {}, None).await?;
        Ok(())
    }
}
