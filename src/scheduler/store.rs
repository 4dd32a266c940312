use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

/// Arena of booking instances in insertion order, with secondary indexes
/// by id, by recurrence id and by match id.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: Vec<Event>,
    by_id: HashMap<Ulid, usize>,
    by_recurrence: HashMap<Ulid, Vec<Ulid>>,
    by_match: HashMap<Ulid, Vec<Ulid>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a loaded snapshot. Later duplicates of an id are dropped.
    pub fn from_events(events: Vec<Event>) -> Self {
        let mut store = Self::new();
        for event in events {
            let id = event.id;
            if !store.insert(event) {
                tracing::warn!("dropping duplicate event id {id} from snapshot");
            }
        }
        store
    }

    // ── Reads ────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn contains(&self, id: &Ulid) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, id: &Ulid) -> Option<&Event> {
        self.by_id.get(id).map(|&pos| &self.events[pos])
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn on_date(&self, date: NaiveDate) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.date == date)
    }

    /// Every instance of a recurrence series.
    pub fn series(&self, recurrence_id: &Ulid) -> Vec<&Event> {
        self.indexed(self.by_recurrence.get(recurrence_id))
    }

    /// Every fan-out leaf of a match, across all of its dates.
    pub fn match_leaves(&self, match_id: &Ulid) -> Vec<&Event> {
        self.indexed(self.by_match.get(match_id))
    }

    fn indexed(&self, ids: Option<&Vec<Ulid>>) -> Vec<&Event> {
        ids.map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    // ── Writes ───────────────────────────────────────────────

    /// Insert an instance. Returns false (and stores nothing) if the id is taken.
    pub fn insert(&mut self, event: Event) -> bool {
        if self.by_id.contains_key(&event.id) {
            return false;
        }
        if let Some(rid) = event.recurrence_id() {
            self.by_recurrence.entry(rid).or_default().push(event.id);
        }
        if let Some(mid) = event.match_id {
            self.by_match.entry(mid).or_default().push(event.id);
        }
        self.by_id.insert(event.id, self.events.len());
        self.events.push(event);
        true
    }

    /// Remove every listed id that is present; unknown ids are ignored.
    /// Returns the removed events in store order.
    pub fn remove_all(&mut self, ids: &[Ulid]) -> Vec<Event> {
        let doomed: HashSet<Ulid> = ids.iter().copied().filter(|id| self.contains(id)).collect();
        if doomed.is_empty() {
            return Vec::new();
        }

        let mut removed = Vec::with_capacity(doomed.len());
        let mut kept = Vec::with_capacity(self.events.len() - doomed.len());
        for event in self.events.drain(..) {
            if doomed.contains(&event.id) {
                removed.push(event);
            } else {
                kept.push(event);
            }
        }
        self.events = kept;

        for event in &removed {
            if let Some(rid) = event.recurrence_id() {
                unindex(&mut self.by_recurrence, &rid, &event.id);
            }
            if let Some(mid) = event.match_id {
                unindex(&mut self.by_match, &mid, &event.id);
            }
        }
        self.by_id = self
            .events
            .iter()
            .enumerate()
            .map(|(pos, e)| (e.id, pos))
            .collect();
        removed
    }

    pub fn remove(&mut self, id: &Ulid) -> Option<Event> {
        self.remove_all(&[*id]).pop()
    }
}

fn unindex(index: &mut HashMap<Ulid, Vec<Ulid>>, key: &Ulid, id: &Ulid) {
    if let Some(ids) = index.get_mut(key) {
        ids.retain(|i| i != id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    fn event(d: u32, recurrence: Option<Ulid>, match_id: Option<Ulid>) -> Event {
        Event {
            id: Ulid::new(),
            date: date(d),
            time: TimeRange::new(hm(17, 0), hm(18, 0)),
            stade_unit_id: Ulid::new(),
            category_name: "U11".into(),
            kind: EventType::Entrainement,
            recurrence: recurrence.map(|id| Recurrence {
                id,
                kind: RecurrenceType::Weekly,
                end_date: date(30),
            }),
            match_id,
            plateau: PlateauCriterium::default(),
        }
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let mut store = EventStore::new();
        let e = event(2, None, None);
        assert!(store.insert(e.clone()));
        assert!(!store.insert(e));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn indexes_follow_inserts_and_removals() {
        let rid = Ulid::new();
        let mid = Ulid::new();
        let mut store = EventStore::new();
        let a = event(2, Some(rid), Some(mid));
        let b = event(9, Some(rid), Some(mid));
        let c = event(2, None, None);
        for e in [a.clone(), b.clone(), c.clone()] {
            store.insert(e);
        }

        assert_eq!(store.series(&rid).len(), 2);
        assert_eq!(store.match_leaves(&mid).len(), 2);

        let removed = store.remove(&a.id).unwrap();
        assert_eq!(removed.id, a.id);
        assert_eq!(store.series(&rid).len(), 1);
        assert_eq!(store.get(&b.id).map(|e| e.id), Some(b.id));
        assert_eq!(store.get(&c.id).map(|e| e.id), Some(c.id));

        store.remove(&b.id);
        assert!(store.series(&rid).is_empty());
        assert!(store.match_leaves(&mid).is_empty());
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut store = EventStore::new();
        store.insert(event(2, None, None));
        assert!(store.remove(&Ulid::new()).is_none());
        assert!(store.remove_all(&[Ulid::new(), Ulid::new()]).is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn removal_preserves_insertion_order() {
        let mut store = EventStore::new();
        let events: Vec<Event> = (2..5).map(|d| event(d, None, None)).collect();
        for e in &events {
            store.insert(e.clone());
        }
        store.remove(&events[1].id);
        let ids: Vec<Ulid> = store.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![events[0].id, events[2].id]);
        assert_eq!(store.on_date(date(4)).count(), 1);
    }

    #[test]
    fn from_events_drops_duplicates() {
        let e = event(2, None, None);
        let store = EventStore::from_events(vec![e.clone(), e]);
        assert_eq!(store.len(), 1);
    }
}
