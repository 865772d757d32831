use rocket::serde::json::Value;
use serde::{Deserialize, Serialize};

use crate::model::actor::{Actor, ActorId};

/// Shown in place of a death year for actors who are still alive.
pub const ALIVE: &str = "Alive";

/// An actor as shown in the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSummary {
    pub id: ActorId,
    pub name: String,
    pub awards: Vec<String>,
}

impl From<Actor> for ActorSummary {
    fn from(actor: Actor) -> Self {
        Self {
            id: actor.id,
            name: actor.name,
            awards: actor.awards,
        }
    }
}

/// The listing, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorList {
    pub total: usize,
    pub actors: Vec<ActorSummary>,
}

impl From<Vec<Actor>> for ActorList {
    fn from(actors: Vec<Actor>) -> Self {
        Self {
            total: actors.len(),
            actors: actors.into_iter().map(Into::into).collect(),
        }
    }
}

/// Everything known about one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorDetails {
    pub id: ActorId,
    pub name: String,
    pub nationality: Option<String>,
    pub birth_year: Option<Value>,
    /// The year of death, or [`ALIVE`].
    pub death_year: Value,
    pub known_for: Vec<String>,
    pub biography: Option<String>,
    pub image: Option<String>,
    pub awards: Vec<String>,
}

impl From<&Actor> for ActorDetails {
    fn from(actor: &Actor) -> Self {
        let text = |key: &str| {
            actor
                .attribute(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let known_for = actor
            .attribute("known_for")
            .and_then(Value::as_array)
            .map(|titles| {
                titles
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: actor.id,
            name: actor.name.clone(),
            nationality: text("nationality"),
            birth_year: actor.attribute("birth_year").cloned(),
            death_year: actor
                .attribute("death_year")
                .cloned()
                .unwrap_or_else(|| Value::from(ALIVE)),
            known_for,
            biography: text("biography"),
            image: text("image"),
            awards: actor.awards.clone(),
        }
    }
}
