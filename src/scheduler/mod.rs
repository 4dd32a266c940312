pub mod binder;
pub mod deletion;
mod error;
pub mod grid;
pub mod recurrence;
pub mod store;
mod validation;

pub use error::{FieldError, SchedulerError};
pub use grid::{CategoryLookup, GridConfig, WeekGrid};
pub use store::EventStore;
pub use validation::{check_invariants, find_overlaps};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{debug, info};
use ulid::Ulid;

use crate::hierarchy::Hierarchy;
use crate::model::*;
use crate::repository::EventRepository;

/// What to do when a save would overlap an existing booking on the same unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Store it anyway; the grid shows the first event in store order.
    #[default]
    Allow,
    Reject,
}

impl std::str::FromStr for OverlapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(OverlapPolicy::Allow),
            "reject" => Ok(OverlapPolicy::Reject),
            other => Err(format!("unknown overlap policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerConfig {
    pub grid: GridConfig,
    pub overlap: OverlapPolicy,
}

/// Facility occupancy scheduler over one store.
///
/// Every mutation works on a copy of the in-memory snapshot, persists the
/// copy wholesale, and only then swaps it in. A failed save leaves the
/// scheduler on its previous snapshot.
pub struct Scheduler {
    hierarchy: Hierarchy,
    store: EventStore,
    repo: Arc<dyn EventRepository>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn open(
        hierarchy: Hierarchy,
        repo: Arc<dyn EventRepository>,
        config: SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        let store = EventStore::from_events(repo.load()?);
        info!("scheduler opened with {} events", store.len());
        metrics::gauge!(crate::observability::STORE_EVENTS).set(store.len() as f64);
        Ok(Self {
            hierarchy,
            store,
            repo,
            config,
        })
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Re-read the whole store, e.g. after a change notification from another writer.
    pub fn reload(&mut self) -> Result<(), SchedulerError> {
        self.store = EventStore::from_events(self.repo.load()?);
        debug!("reloaded store: {} events", self.store.len());
        metrics::gauge!(crate::observability::STORE_EVENTS).set(self.store.len() as f64);
        Ok(())
    }

    /// Create a booking. Returns the ids of every instance inserted.
    pub fn save_booking(&mut self, request: &BookingRequest) -> Result<Vec<Ulid>, SchedulerError> {
        self.replace_with(&[], request)
    }

    /// Replace the identity class of `old_id` with the instances planned from `request`.
    ///
    /// The class is the whole match if the instance is a match leaf, else the
    /// whole series if it is recurrent, else the instance alone. Editing one
    /// date of a series therefore rewrites the entire series.
    pub fn edit_booking(
        &mut self,
        old_id: Ulid,
        request: &BookingRequest,
    ) -> Result<Vec<Ulid>, SchedulerError> {
        let old = self.store.get(&old_id).ok_or(SchedulerError::NotFound(old_id))?;
        let class = identity_class(&self.store, old);
        self.replace_with(&class, request)
    }

    fn replace_with(
        &mut self,
        replacing: &[Ulid],
        request: &BookingRequest,
    ) -> Result<Vec<Ulid>, SchedulerError> {
        let target = validation::validate_request(request, &self.hierarchy)?;
        let planned = binder::plan_booking(request, target);

        if self.config.overlap == OverlapPolicy::Reject {
            let replacing: HashSet<Ulid> = replacing.iter().copied().collect();
            if let Err(e) = validation::check_no_overlap(&self.store, &planned, &replacing) {
                metrics::counter!(crate::observability::OVERLAPS_REJECTED_TOTAL).increment(1);
                return Err(e);
            }
        }

        let mut next = self.store.clone();
        next.remove_all(replacing);
        let ids: Vec<Ulid> = planned.iter().map(|e| e.id).collect();
        for event in planned {
            next.insert(event);
        }
        self.commit(next)?;

        info!(
            "saved {} booking: {} instances, {} replaced",
            request.kind.label(),
            ids.len(),
            replacing.len()
        );
        metrics::counter!(crate::observability::BOOKINGS_SAVED_TOTAL, "kind" => request.kind.label())
            .increment(1);
        metrics::histogram!(crate::observability::INSTANCES_CREATED).record(ids.len() as f64);
        Ok(ids)
    }

    /// Which deletion scopes to offer. `None` if the id is unknown.
    pub fn request_delete(&self, event_id: &Ulid) -> Option<DeletePrompt> {
        deletion::classify(&self.store, event_id)
    }

    /// Delete with the chosen scope. An unknown id is a no-op and saves nothing.
    pub fn confirm_delete(
        &mut self,
        event_id: &Ulid,
        scope: DeleteScope,
    ) -> Result<Vec<Event>, SchedulerError> {
        let Some(event) = self.store.get(event_id) else {
            debug!("delete of unknown event {event_id} ignored");
            return Ok(Vec::new());
        };
        let applied = deletion::effective_scope(&self.store, scope, event);

        let mut next = self.store.clone();
        let removed = deletion::apply(&mut next, applied, event_id);
        if removed.is_empty() {
            return Ok(removed);
        }
        self.commit(next)?;

        info!("deleted {} events with scope {}", removed.len(), applied.label());
        metrics::counter!(crate::observability::DELETIONS_TOTAL, "scope" => applied.label())
            .increment(1);
        Ok(removed)
    }

    pub fn week_grid(&self, any_day: NaiveDate, categories: &dyn CategoryLookup) -> WeekGrid {
        grid::week_grid(
            &self.hierarchy,
            self.store.as_slice(),
            any_day,
            &self.config.grid,
            categories,
        )
    }

    /// Pairs of stored events that occupy the same unit at the same time.
    pub fn overlaps(&self) -> Vec<(Ulid, Ulid)> {
        find_overlaps(self.store.as_slice())
    }

    fn commit(&mut self, next: EventStore) -> Result<(), SchedulerError> {
        let started = Instant::now();
        self.repo.save(next.as_slice())?;
        metrics::histogram!(crate::observability::COMMIT_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        metrics::gauge!(crate::observability::STORE_EVENTS).set(next.len() as f64);
        self.store = next;
        Ok(())
    }
}

/// Instances an edit of `event` replaces.
fn identity_class(store: &EventStore, event: &Event) -> Vec<Ulid> {
    if let Some(mid) = event.match_id {
        return store.match_leaves(&mid).iter().map(|e| e.id).collect();
    }
    if let Some(rid) = event.recurrence_id() {
        return store.series(&rid).iter().map(|e| e.id).collect();
    }
    vec![event.id]
}
