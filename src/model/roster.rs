//! The application state: visible actors, id allocation and the population
//! cycle that grows the collection towards the catalog size.
//!
//! Every mutation happens while holding the single state lock, so inserts,
//! removals, draws and write-backs never interleave. Only the catalog fetch
//! runs outside the lock, which keeps searches responsive while a request is
//! outstanding.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rocket::tokio::sync::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scheduled_task::ScheduledTask;

use super::{
    actor::{Actor, ActorId},
    allocator::IdAllocator,
    awards::{count_awards, AwardCounts},
    collection::ActorCollection,
    persistence::Persistence,
    source::ActorSource,
};

/// Where the population cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "id", rename_all = "snake_case")]
pub enum Cycle {
    Idle,
    AwaitingId,
    Fetching(ActorId),
    /// Every id has been drawn. Only a reset leaves this state.
    Exhausted,
}

/// A summary of the roster for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterStatus {
    pub cycle: Cycle,
    pub visible: usize,
    pub drawn: usize,
    pub excluded: usize,
    pub capacity: u32,
    /// When the last cycle finished, if one has since the start or last reset.
    pub last_cycle: Option<DateTime<Utc>>,
    /// When the next cycle is due, if one is scheduled.
    pub next_cycle: Option<DateTime<Utc>>,
}

/// Knobs for [`Roster`], usually derived from the application config.
#[derive(Debug, Clone)]
pub struct RosterSettings {
    /// Size of the catalog id space, which is also the collection's cap.
    pub catalog_size: u32,
    /// Delay between population cycles.
    pub refresh_interval: Duration,
    /// When false, cycles only run when called explicitly.
    pub scheduling: bool,
}

struct State {
    collection: ActorCollection,
    allocator: IdAllocator,
    cycle: Cycle,
    /// Bumped by every reset so that fetches begun before it are discarded.
    generation: u64,
    /// A removal happened mid-cycle; run the next cycle without delay.
    backfill: bool,
    /// Set by [`Roster::stop`]; no cycle is scheduled until started again.
    stopped: bool,
    last_cycle: Option<DateTime<Utc>>,
    pending: Option<ScheduledTask<()>>,
    rng: StdRng,
}

struct Inner {
    settings: RosterSettings,
    persistence: Persistence,
    source: Arc<dyn ActorSource>,
    state: Mutex<State>,
}

/// Which path started a cycle.
enum Trigger {
    /// The pending scheduled task fired.
    Timer,
    /// Someone called [`Roster::run_cycle`].
    Manual,
}

type CycleFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Cheaply cloneable handle on the application state.
#[derive(Clone)]
pub struct Roster {
    inner: Arc<Inner>,
}

impl Roster {
    /// Build a roster from whatever state was persisted.
    ///
    /// Persisted ids outside the catalog are dropped, actors that have been
    /// excluded are evicted, and every restored actor is marked drawn.
    pub async fn restore(
        settings: RosterSettings,
        persistence: Persistence,
        source: Arc<dyn ActorSource>,
    ) -> Self {
        Self::restore_with_rng(settings, persistence, source, StdRng::from_entropy()).await
    }

    pub async fn restore_with_rng(
        settings: RosterSettings,
        persistence: Persistence,
        source: Arc<dyn ActorSource>,
        rng: StdRng,
    ) -> Self {
        let size = settings.catalog_size;
        let snapshot = persistence.load_snapshot().await;
        let mut allocator = IdAllocator::restore(size, snapshot.drawn, snapshot.excluded);
        let mut collection = ActorCollection::new(size as usize);
        for actor in snapshot.actors {
            if !actor.id.within(size) || allocator.is_excluded(actor.id) {
                warn!("Dropping restored actor {} ({})", actor.id, actor.name);
                continue;
            }
            allocator.claim(actor.id);
            collection.upsert_if_absent(actor);
        }
        info!(
            "Restored {} actors, {} drawn IDs, {} excluded IDs",
            collection.len(),
            allocator.drawn().len(),
            allocator.excluded().len()
        );
        if let Err(e) = persistence.save_all(&collection, &allocator).await {
            error!("Failed to write back restored state: {e}");
        }

        Self {
            inner: Arc::new(Inner {
                settings,
                persistence,
                source,
                state: Mutex::new(State {
                    collection,
                    allocator,
                    cycle: Cycle::Idle,
                    generation: 0,
                    backfill: false,
                    stopped: false,
                    last_cycle: None,
                    pending: None,
                    rng,
                }),
            }),
        }
    }

    /// Every visible actor, sorted by name.
    pub async fn all(&self) -> Vec<Actor> {
        self.inner.state.lock().await.collection.all()
    }

    /// Visible actors whose name contains `query`, sorted by name.
    pub async fn search(&self, query: &str) -> Vec<Actor> {
        self.inner.state.lock().await.collection.search(query)
    }

    pub async fn get(&self, id: ActorId) -> Option<Actor> {
        self.inner.state.lock().await.collection.get(id).cloned()
    }

    /// How often each award occurs across the visible actors.
    pub async fn award_counts(&self) -> AwardCounts {
        let state = self.inner.state.lock().await;
        count_awards(state.collection.all().iter())
    }

    pub async fn status(&self) -> RosterStatus {
        let state = self.inner.state.lock().await;
        RosterStatus {
            cycle: state.cycle,
            visible: state.collection.len(),
            drawn: state.allocator.drawn().len(),
            excluded: state.allocator.excluded().len(),
            capacity: self.inner.settings.catalog_size,
            last_cycle: state.last_cycle,
            next_cycle: state.pending.as_ref().map(ScheduledTask::run_at),
        }
    }

    pub async fn excluded(&self) -> Vec<ActorId> {
        let state = self.inner.state.lock().await;
        state.allocator.excluded().iter().copied().collect()
    }

    /// Remove a visible actor and exclude its id from ever being drawn again.
    /// The vacancy is backfilled straight away.
    ///
    /// Returns `None`, changing nothing, if no such actor is visible.
    pub async fn remove(&self, id: ActorId) -> Option<Actor> {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        let actor = state.collection.remove(id)?;
        state.allocator.exclude(id);
        self.inner.write_all(state).await;
        info!("Removed actor {id} ({}), now excluded", actor.name);

        match state.cycle {
            Cycle::AwaitingId | Cycle::Fetching(_) => state.backfill = true,
            Cycle::Idle | Cycle::Exhausted => self.reschedule(state, Duration::ZERO).await,
        }
        Some(actor)
    }

    /// Forget every actor, drawn id and excluded id, then start populating
    /// again from scratch.
    pub async fn reset(&self) {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        state.collection.clear();
        state.allocator.reset();
        state.generation += 1;
        state.cycle = Cycle::Idle;
        state.backfill = false;
        state.last_cycle = None;
        state.stopped = false;
        if let Err(e) = self.inner.persistence.clear().await {
            error!("Failed to clear storage: {e}");
        }
        self.inner.write_all(state).await;
        warn!("Roster reset, all actors and IDs forgotten");

        self.reschedule(state, Duration::ZERO).await;
    }

    /// Start the periodic population, with the first cycle one interval away.
    pub async fn start(&self) {
        let mut state = self.inner.state.lock().await;
        state.stopped = false;
        if state.pending.is_none() {
            let interval = self.inner.settings.refresh_interval;
            self.reschedule(&mut state, interval).await;
        }
    }

    /// Cancel any pending cycle and schedule no more until [`Self::start`] or
    /// [`Self::reset`]. A fetch already in flight still completes.
    pub async fn stop(&self) {
        let mut state = self.inner.state.lock().await;
        state.stopped = true;
        if let Some(task) = state.pending.take() {
            task.cancel().await;
        }
    }

    /// Run one population cycle now, replacing any pending one.
    /// Returns the state the cycle finished in.
    pub async fn run_cycle(&self) -> Cycle {
        self.cycle(Trigger::Manual).await
    }

    /// Fill the collection in one go from the whole catalog, picking a random
    /// sample of the actors that are neither excluded nor already drawn.
    /// Returns how many actors were added.
    pub async fn bootstrap(&self) -> Result<usize> {
        let catalog = self.inner.source.catalog().await?;

        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        let mut candidates = catalog
            .into_iter()
            .filter(|actor| !state.allocator.is_drawn(actor.id))
            .collect::<Vec<_>>();
        candidates.shuffle(&mut state.rng);

        let mut added = 0;
        for actor in candidates {
            if state.collection.is_full() {
                break;
            }
            // Fails for ids outside the space, excluded ids and duplicates.
            if state.allocator.claim(actor.id) && state.collection.upsert_if_absent(actor) {
                added += 1;
            }
        }
        self.inner.write_all(state).await;
        info!("Bootstrapped {added} actors from the full catalog");
        Ok(added)
    }

    async fn cycle(&self, trigger: Trigger) -> Cycle {
        let (id, generation) = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            match trigger {
                // This is our own handle; letting go of it detaches us so the
                // running cycle can no longer be cancelled.
                Trigger::Timer => drop(state.pending.take()),
                Trigger::Manual => {
                    if let Some(task) = state.pending.take() {
                        task.cancel().await;
                    }
                }
            }

            state.cycle = Cycle::AwaitingId;
            let Some(id) = state.allocator.draw(&mut state.rng) else {
                state.cycle = Cycle::Exhausted;
                state.last_cycle = Some(Utc::now());
                info!("No more actor IDs available, population stopped");
                return state.cycle;
            };
            debug!("Drew actor ID {id}");
            self.inner.write_allocator(state).await;
            state.cycle = Cycle::Fetching(id);
            (id, state.generation)
        };

        let fetched = self.inner.source.actor(id).await;

        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        if state.generation != generation {
            debug!("Discarding actor {id}, fetched before a reset");
            return state.cycle;
        }
        match fetched {
            Ok(actor) => {
                if state.allocator.is_excluded(id) {
                    debug!("Discarding actor {id}, excluded while fetching");
                } else if state.collection.upsert_if_absent(actor) {
                    info!("Added actor {id}, {} now visible", state.collection.len());
                    self.inner.write_collection(state).await;
                }
            }
            Err(e) if e.is_permanent_absence() => {
                warn!("Actor {id} is not in the catalog, giving up on it: {e}");
            }
            Err(e) => {
                warn!("Error fetching actor {id}, will retry later: {e}");
                state.allocator.release(id);
                self.inner.write_allocator(state).await;
            }
        }

        state.cycle = Cycle::Idle;
        state.last_cycle = Some(Utc::now());
        let delay = if std::mem::take(&mut state.backfill) {
            Duration::ZERO
        } else {
            self.inner.settings.refresh_interval
        };
        self.reschedule(state, delay).await;
        state.cycle
    }

    /// Replace the pending cycle with one due after `delay`.
    async fn reschedule(&self, state: &mut State, delay: Duration) {
        if !self.inner.settings.scheduling || state.stopped {
            return;
        }
        if let Some(task) = state.pending.take() {
            task.cancel().await;
        }
        state.pending = Some(ScheduledTask::after(self.timer_cycle(), delay));
    }

    // Boxed with a named type so that a cycle may schedule its successor.
    fn timer_cycle(&self) -> CycleFuture {
        let roster = self.clone();
        Box::pin(async move {
            roster.cycle(Trigger::Timer).await;
        })
    }
}

impl Inner {
    async fn write_allocator(&self, state: &State) {
        if let Err(e) = self.persistence.save_allocator(&state.allocator).await {
            error!("Failed to persist drawn IDs: {e}");
        }
    }

    async fn write_collection(&self, state: &State) {
        if let Err(e) = self.persistence.save_collection(&state.collection).await {
            error!("Failed to persist actors: {e}");
        }
    }

    async fn write_all(&self, state: &State) {
        self.write_allocator(state).await;
        self.write_collection(state).await;
    }
}
