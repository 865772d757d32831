use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Orbit, Rocket,
};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{
    persistence::{FileStore, MemoryStore, MongoStore, Persistence},
    roster::{Roster, RosterSettings},
    source::HttpSource,
};

/// Where the roster state is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Nothing survives a restart.
    Memory,
    /// JSON files in `storage_path`.
    File,
    /// A MongoDB database reached through `db_uri`.
    Mongodb,
}

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_catalog_url")]
    catalog_url: String,
    #[serde(default = "default_catalog_size")]
    catalog_size: u32,
    #[serde(default = "default_refresh_interval")]
    refresh_interval: u64,
    #[serde(default = "default_fetch_timeout")]
    fetch_timeout: u64,
    #[serde(default)]
    bulk_bootstrap: bool,
    #[serde(default = "default_storage")]
    storage: StorageKind,
    #[serde(default = "default_storage_path")]
    storage_path: PathBuf,
    // secrets
    #[serde(default)]
    db_uri: Option<String>,
}

fn default_catalog_url() -> String {
    "https://freetestapi.com/api/v1/actors".to_string()
}

fn default_catalog_size() -> u32 {
    40
}

fn default_refresh_interval() -> u64 {
    5
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_storage() -> StorageKind {
    StorageKind::File
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("roster_state")
}

impl Config {
    /// Base URL of the actor catalog.
    pub fn catalog_url(&self) -> &str {
        &self.catalog_url
    }

    /// Number of actors in the catalog, ids running from 1.
    pub fn catalog_size(&self) -> u32 {
        self.catalog_size
    }

    /// Seconds between population cycles.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    /// Seconds before a catalog request is abandoned.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    /// Fill the roster from the whole catalog at launch when it is empty.
    pub fn bulk_bootstrap(&self) -> bool {
        self.bulk_bootstrap
    }

    pub fn storage(&self) -> StorageKind {
        self.storage
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Connection string for the MongoDB backend.
    pub fn db_uri(&self) -> Option<&str> {
        self.db_uri.as_deref()
    }

    pub fn roster_settings(&self) -> RosterSettings {
        RosterSettings {
            catalog_size: self.catalog_size,
            refresh_interval: self.refresh_interval(),
            scheduling: true,
        }
    }

    /// Open the configured storage backend.
    pub async fn persistence(&self) -> Result<Persistence> {
        Ok(match self.storage {
            StorageKind::Memory => Persistence::new(MemoryStore::default()),
            StorageKind::File => Persistence::new(FileStore::new(&self.storage_path)),
            StorageKind::Mongodb => {
                let uri = self.db_uri().ok_or_else(|| {
                    Error::Config("`db_uri` must be set for MongoDB storage".to_string())
                })?;
                Persistence::new(MongoStore::connect(uri, &get_database_name()).await?)
            }
        })
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!(
            "Catalog of {} actors at {}, refreshing every {}s",
            config.catalog_size,
            config.catalog_url,
            config.refresh_interval
        );

        // Manage the state.
        Ok(rocket.manage(config))
    }
}

/// A fairing that opens storage, restores the roster from it and places the
/// [`Roster`] into managed state. Population starts once the server is up and
/// stops when it shuts down.
///
/// Must be attached after [`ConfigFairing`].
pub struct RosterFairing;

#[rocket::async_trait]
impl Fairing for RosterFairing {
    fn info(&self) -> Info {
        Info {
            name: "Roster",
            kind: Kind::Ignite | Kind::Liftoff | Kind::Shutdown,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = rocket.state::<Config>().cloned() else {
            error!("Roster requires the application config to be loaded first");
            return Err(rocket);
        };

        info!("Opening {:?} storage...", config.storage());
        let persistence = match config.persistence().await {
            Ok(persistence) => persistence,
            Err(e) => {
                error!("Failed to open storage: {e}");
                return Err(rocket);
            }
        };
        let source = match HttpSource::new(config.catalog_url(), config.fetch_timeout()) {
            Ok(source) => source,
            Err(e) => {
                error!("Failed to build catalog client: {e}");
                return Err(rocket);
            }
        };

        let roster = Roster::restore(config.roster_settings(), persistence, Arc::new(source)).await;
        info!("...roster restored!");

        Ok(rocket.manage(roster))
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let (Some(roster), Some(config)) = (rocket.state::<Roster>(), rocket.state::<Config>())
        else {
            return;
        };
        if config.bulk_bootstrap() && roster.status().await.visible == 0 {
            if let Err(e) = roster.bootstrap().await {
                warn!("Bulk bootstrap failed, falling back to incremental population: {e}");
            }
        }
        roster.start().await;
        info!("Population started");
    }

    async fn on_shutdown(&self, rocket: &Rocket<Orbit>) {
        if let Some(roster) = rocket.state::<Roster>() {
            roster.stop().await;
            info!("Population stopped");
        }
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
fn get_database_name() -> String {
    "actor_roster".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

#[cfg(test)]
mod tests {
    use rocket::figment::Figment;

    use super::*;

    #[test]
    fn defaults() {
        let config = Figment::new().extract::<Config>().unwrap();
        assert_eq!(config.catalog_url(), "https://freetestapi.com/api/v1/actors");
        assert_eq!(config.catalog_size(), 40);
        assert_eq!(config.refresh_interval(), Duration::from_secs(5));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert!(!config.bulk_bootstrap());
        assert_eq!(config.storage(), StorageKind::File);
        assert_eq!(config.storage_path(), Path::new("roster_state"));
        assert_eq!(config.db_uri(), None);
    }

    #[test]
    fn overrides() {
        let config = Figment::new()
            .merge(("catalog_size", 12))
            .merge(("refresh_interval", 1))
            .merge(("storage", "memory"))
            .merge(("bulk_bootstrap", true))
            .extract::<Config>()
            .unwrap();
        assert_eq!(config.catalog_size(), 12);
        assert_eq!(config.storage(), StorageKind::Memory);
        assert!(config.bulk_bootstrap());

        let settings = config.roster_settings();
        assert_eq!(settings.catalog_size, 12);
        assert_eq!(settings.refresh_interval, Duration::from_secs(1));
        assert!(settings.scheduling);
    }

    #[test]
    fn unknown_storage_is_rejected() {
        let result = Figment::new()
            .merge(("storage", "floppy"))
            .extract::<Config>();
        assert!(result.is_err());
    }

    #[rocket::async_test]
    async fn mongodb_needs_a_uri() {
        let config = Figment::new()
            .merge(("storage", "mongodb"))
            .extract::<Config>()
            .unwrap();
        assert!(matches!(
            config.persistence().await,
            Err(Error::Config(_))
        ));
    }
}
