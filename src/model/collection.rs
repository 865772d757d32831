use std::collections::BTreeMap;

use super::actor::{Actor, ActorId};

/// The visible actors, keyed by id and capped at the catalog size.
///
/// Insertion order is never observable: every read goes through [`Self::all`],
/// which returns a sorted snapshot.
#[derive(Debug, Clone)]
pub struct ActorCollection {
    capacity: usize,
    actors: BTreeMap<ActorId, Actor>,
}

impl ActorCollection {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            actors: BTreeMap::new(),
        }
    }

    /// Insert `actor` unless an actor with the same id is already present or
    /// the collection is full. Returns true iff the actor was inserted.
    ///
    /// Repeat deliveries of the same actor are expected and silently absorbed.
    pub fn upsert_if_absent(&mut self, actor: Actor) -> bool {
        if self.actors.contains_key(&actor.id) || self.is_full() {
            return false;
        }
        self.actors.insert(actor.id, actor);
        true
    }

    /// Remove the actor with the given id, if present.
    pub fn remove(&mut self, id: ActorId) -> Option<Actor> {
        self.actors.remove(&id)
    }

    pub fn get(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.actors.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.actors.clear();
    }

    /// Snapshot of every actor, ordered by name ignoring case and accents.
    ///
    /// Names equal under that folding fall back to the exact name and then the
    /// id, so the order is total and stable across calls.
    pub fn all(&self) -> Vec<Actor> {
        let mut keyed = self
            .actors
            .values()
            .map(|actor| (actor.sort_key(), actor))
            .collect::<Vec<_>>();
        keyed.sort_by(|(a_key, a), (b_key, b)| {
            a_key
                .cmp(b_key)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        keyed.into_iter().map(|(_, actor)| actor.clone()).collect()
    }

    /// The subsequence of [`Self::all`] whose name contains `query`, ignoring
    /// case. An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<Actor> {
        let query = query.to_lowercase();
        if query.is_empty() {
            return self.all();
        }
        self.all()
            .into_iter()
            .filter(|actor| actor.name.to_lowercase().contains(&query))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(actors: &[Actor]) -> Vec<&str> {
        actors.iter().map(|a| a.name.as_str()).collect()
    }

    fn amy_and_bob() -> ActorCollection {
        let mut collection = ActorCollection::new(40);
        collection.upsert_if_absent(Actor::example(2, "Bob", &[]));
        collection.upsert_if_absent(Actor::example(1, "Amy", &[]));
        collection
    }

    #[test]
    fn empty_search_returns_everything_sorted() {
        let collection = amy_and_bob();
        assert_eq!(names(&collection.search("")), vec!["Amy", "Bob"]);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let collection = amy_and_bob();
        assert_eq!(names(&collection.search("am")), vec!["Amy"]);
        assert_eq!(names(&collection.search("MY")), vec!["Amy"]);
        assert_eq!(names(&collection.search("o")), vec!["Bob"]);
        assert!(collection.search("zed").is_empty());
    }

    #[test]
    fn duplicates_are_absorbed() {
        let mut collection = amy_and_bob();
        assert!(!collection.upsert_if_absent(Actor::example(1, "Someone Else", &[])));
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get(ActorId(1)).unwrap().name, "Amy");
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut collection = ActorCollection::new(3);
        for round in 0..3 {
            for id in 1..=10 {
                collection.upsert_if_absent(Actor::example(id, &format!("Actor {round}"), &[]));
            }
        }
        assert_eq!(collection.len(), 3);
        assert!(collection.is_full());
        let mut ids = collection.all().iter().map(|a| a.id).collect::<Vec<_>>();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn sorting_ignores_case() {
        let mut collection = ActorCollection::new(40);
        for actor in Actor::catalog_example() {
            collection.upsert_if_absent(actor);
        }
        assert_eq!(
            names(&collection.all()),
            vec![
                "Amy Adams",
                "Denzel Washington",
                "meryl Streep",
                "Mia Farrow",
                "Zoe Saldana"
            ]
        );
    }

    #[test]
    fn accented_names_sort_with_their_base_letter() {
        let mut collection = ActorCollection::new(40);
        collection.upsert_if_absent(Actor::example(1, "Zoe Saldana", &[]));
        collection.upsert_if_absent(Actor::example(2, "Émilie de Ravin", &[]));
        collection.upsert_if_absent(Actor::example(3, "Eva Green", &[]));
        collection.upsert_if_absent(Actor::example(4, "emilie Fox", &[]));
        assert_eq!(
            names(&collection.all()),
            vec!["Émilie de Ravin", "emilie Fox", "Eva Green", "Zoe Saldana"]
        );
        assert_eq!(names(&collection.search("émi")), vec!["Émilie de Ravin"]);
    }

    #[test]
    fn remove_then_all() {
        let mut collection = amy_and_bob();
        assert_eq!(collection.remove(ActorId(1)).map(|a| a.name), Some("Amy".into()));
        assert_eq!(collection.remove(ActorId(1)), None);
        assert_eq!(names(&collection.all()), vec!["Bob"]);
    }

    #[test]
    fn snapshots_do_not_alias() {
        let mut collection = amy_and_bob();
        let snapshot = collection.all();
        collection.remove(ActorId(2));
        assert_eq!(snapshot.len(), 2);
    }
}
