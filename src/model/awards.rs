use std::collections::BTreeMap;

use super::actor::Actor;

/// Award name to number of times it occurs across the given actors.
pub type AwardCounts = BTreeMap<String, u32>;

/// Fold every actor's awards into per-award counts. An award listed twice by
/// the same actor counts twice.
pub fn count_awards<'a>(actors: impl IntoIterator<Item = &'a Actor>) -> AwardCounts {
    actors
        .into_iter()
        .flat_map(|actor| actor.awards.iter())
        .fold(AwardCounts::new(), |mut counts, award| {
            *counts.entry(award.clone()).or_default() += 1;
            counts
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_repeated_awards() {
        let actors = Actor::catalog_example();
        let counts = count_awards(&actors);
        assert_eq!(counts["Oscar"], 4);
        assert_eq!(counts["Golden Globe"], 4);
        assert_eq!(counts["BAFTA"], 2);
        assert_eq!(counts["Saturn Award"], 1);
        assert_eq!(counts.len(), 4);
    }

    #[test]
    fn no_actors_no_counts() {
        assert!(count_awards(&Vec::<Actor>::new()).is_empty());
    }
}
