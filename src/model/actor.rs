use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

use rocket::{
    http::{
        impl_from_uri_param_identity,
        uri::fmt::{Path, UriDisplay},
    },
    request::FromParam,
    serde::json::{serde_json::Map, Value},
};
use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Identifier of an actor within the catalog's id space `1..=N`.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub u32);

impl ActorId {
    /// Every id in the catalog space `1..=size`.
    pub fn space(size: u32) -> impl Iterator<Item = ActorId> {
        (1..=size).map(ActorId)
    }

    /// Is this id a member of the catalog space `1..=size`?
    pub fn within(self, size: u32) -> bool {
        (1..=size).contains(&self.0)
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActorId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<u32> for ActorId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl<'a> FromParam<'a> for ActorId {
    type Error = ParseIntError;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse::<ActorId>()
    }
}

impl UriDisplay<Path> for ActorId {
    fn fmt(&self, formatter: &mut rocket::http::uri::fmt::Formatter<'_, Path>) -> std::fmt::Result {
        formatter.write_value(self.0)
    }
}

impl_from_uri_param_identity!([Path] ActorId);

/// An actor as delivered by the catalog.
///
/// Only `id`, `name` and `awards` are interpreted here; every other field the
/// catalog sends is carried through untouched in `attributes`, so a snapshot
/// written back to storage reproduces what was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    #[serde(default)]
    pub awards: Vec<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Actor {
    pub fn new(id: impl Into<ActorId>, name: impl Into<String>, awards: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            awards,
            attributes: Map::new(),
        }
    }

    /// Look up one of the additional catalog fields.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|value| !value.is_null())
    }

    /// The key actors are displayed and sorted by: the name with accents
    /// stripped and case folded, so "Émilie" sorts among the other E's.
    pub(crate) fn sort_key(&self) -> String {
        self.name
            .nfd()
            .filter(|c| !is_combining_mark(*c))
            .collect::<String>()
            .to_lowercase()
    }
}

#[cfg(test)]
impl Actor {
    pub fn example(id: u32, name: &str, awards: &[&str]) -> Self {
        Self::new(id, name, awards.iter().map(|a| a.to_string()).collect())
    }

    /// The fixture catalog used throughout the tests.
    pub fn catalog_example() -> Vec<Self> {
        vec![
            Self::example(1, "Zoe Saldana", &["Saturn Award"]),
            Self::example(2, "Amy Adams", &["Golden Globe", "Golden Globe"]),
            Self::example(3, "Mia Farrow", &["Golden Globe", "BAFTA"]),
            Self::example(4, "Denzel Washington", &["Oscar", "Golden Globe"]),
            Self::example(5, "meryl Streep", &["Oscar", "Oscar", "Oscar", "BAFTA"]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::{json, serde_json};

    use super::*;

    #[test]
    fn extra_fields_are_kept() {
        let raw = json!({
            "id": 7,
            "name": "Tom Hanks",
            "awards": ["Oscar"],
            "nationality": "American",
            "birth_year": 1956,
            "known_for": ["Forrest Gump"],
        });
        let actor: Actor = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(actor.id, ActorId(7));
        assert_eq!(actor.awards, vec!["Oscar".to_string()]);
        assert_eq!(actor.attribute("nationality"), Some(&json!("American")));
        assert_eq!(serde_json::to_value(&actor).unwrap(), raw);
    }

    #[test]
    fn missing_awards_default_to_empty() {
        let actor: Actor = serde_json::from_value(json!({"id": 1, "name": "Amy"})).unwrap();
        assert!(actor.awards.is_empty());
    }

    #[test]
    fn null_attributes_are_absent() {
        let actor: Actor =
            serde_json::from_value(json!({"id": 1, "name": "Amy", "death_year": null})).unwrap();
        assert_eq!(actor.attribute("death_year"), None);
    }

    #[test]
    fn sort_key_ignores_accents_and_case() {
        assert_eq!(Actor::example(1, "Émilie de Ravin", &[]).sort_key(), "emilie de ravin");
        assert_eq!(Actor::example(2, "PENÉLOPE Cruz", &[]).sort_key(), "penelope cruz");
    }

    #[test]
    fn id_space() {
        let ids = ActorId::space(3).collect::<Vec<_>>();
        assert_eq!(ids, vec![ActorId(1), ActorId(2), ActorId(3)]);
        assert!(ActorId(40).within(40));
        assert!(!ActorId(0).within(40));
        assert!(!ActorId(41).within(40));
    }
}
