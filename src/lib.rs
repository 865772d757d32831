#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, RosterFairing};
use crate::logging::LoggerFairing;
use crate::model::roster::Roster;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod scheduled_task;

pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(RosterFairing)
}

/// A server around an existing roster, skipping config and storage setup.
pub fn rocket_for_roster(roster: Roster) -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .manage(roster)
}

/// A roster over the example catalog, kept in memory, that only populates
/// when told to.
#[cfg(test)]
pub(crate) async fn test_roster() -> Roster {
    use std::sync::Arc;
    use std::time::Duration;

    use rand::{rngs::StdRng, SeedableRng};

    use crate::model::{
        persistence::{MemoryStore, Persistence},
        roster::RosterSettings,
        source::FixtureSource,
    };

    let settings = RosterSettings {
        catalog_size: 5,
        refresh_interval: Duration::from_secs(3600),
        scheduling: false,
    };
    Roster::restore_with_rng(
        settings,
        Persistence::new(MemoryStore::default()),
        Arc::new(FixtureSource::example()),
        StdRng::seed_from_u64(40),
    )
    .await
}
