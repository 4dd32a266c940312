use ulid::Ulid;

use crate::model::*;

use super::store::EventStore;

/// Decide which deletion scopes to offer for an instance.
///
/// Returns `None` if the id is not in the store.
pub fn classify(store: &EventStore, event_id: &Ulid) -> Option<DeletePrompt> {
    let event = store.get(event_id)?;

    if let Some(mid) = event.match_id
        && match_leaves_on_date(store, &mid, event).len() > 1
    {
        return Some(DeletePrompt::Match {
            recurrent: event.is_recurrent(),
        });
    }

    if let Some(rid) = event.recurrence_id()
        && store.series(&rid).len() > 1
    {
        return Some(DeletePrompt::InstanceOrSeries {
            match_aware: event.match_id.is_some(),
        });
    }

    Some(DeletePrompt::SingleOnly)
}

/// Rewrite a requested scope into the one that is actually applied.
///
/// Match-aware scopes win whenever the instance carries a match id, a lone
/// `Single` on a multi-unit match widens to the whole match on that date,
/// and scopes naming a tag the instance lacks narrow to what it has.
pub fn effective_scope(store: &EventStore, scope: DeleteScope, event: &Event) -> DeleteScope {
    let recurrent = event.is_recurrent();
    match (event.match_id, scope) {
        (Some(mid), DeleteScope::Single) if match_leaves_on_date(store, &mid, event).len() > 1 => {
            DeleteScope::AllMatchInstancesOnDate
        }
        (Some(_), DeleteScope::AllInSeries | DeleteScope::AllMatchInstancesInSeries) if recurrent => {
            DeleteScope::AllMatchInstancesInSeries
        }
        (Some(_), DeleteScope::AllInSeries | DeleteScope::AllMatchInstancesInSeries) => {
            DeleteScope::AllMatchInstancesOnDate
        }
        (None, DeleteScope::AllInSeries | DeleteScope::AllMatchInstancesInSeries) if recurrent => {
            DeleteScope::AllInSeries
        }
        (None, _) => DeleteScope::Single,
        (Some(_), other) => other,
    }
}

/// Ids removed by applying `scope` to `event_id`. Empty if the id is unknown.
pub fn scope_members(store: &EventStore, scope: DeleteScope, event_id: &Ulid) -> Vec<Ulid> {
    let Some(event) = store.get(event_id) else {
        return Vec::new();
    };
    match effective_scope(store, scope, event) {
        DeleteScope::Single => vec![event.id],
        DeleteScope::AllInSeries => match event.recurrence_id() {
            Some(rid) => store.series(&rid).iter().map(|e| e.id).collect(),
            None => vec![event.id],
        },
        DeleteScope::AllMatchInstancesOnDate => match event.match_id {
            Some(mid) => match_leaves_on_date(store, &mid, event),
            None => vec![event.id],
        },
        DeleteScope::AllMatchInstancesInSeries => match event.match_id {
            Some(mid) => store
                .match_leaves(&mid)
                .iter()
                .filter(|e| e.recurrence_id() == event.recurrence_id())
                .map(|e| e.id)
                .collect(),
            None => vec![event.id],
        },
    }
}

/// Remove the instances covered by `scope` from `store`, returning them.
/// Unknown ids are a no-op.
pub fn apply(store: &mut EventStore, scope: DeleteScope, event_id: &Ulid) -> Vec<Event> {
    let ids = scope_members(store, scope, event_id);
    store.remove_all(&ids)
}

/// The store that survives applying `scope` to `event_id`.
pub fn surviving(store: &EventStore, scope: DeleteScope, event_id: &Ulid) -> EventStore {
    let mut next = store.clone();
    apply(&mut next, scope, event_id);
    next
}

fn match_leaves_on_date(store: &EventStore, match_id: &Ulid, event: &Event) -> Vec<Ulid> {
    store
        .match_leaves(match_id)
        .iter()
        .filter(|e| e.date == event.date)
        .map(|e| e.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::hierarchy::tests::sample;
    use crate::hierarchy::{Commune, Field, Hierarchy, PlannableUnit};
    use crate::scheduler::binder::plan_booking;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, day).unwrap()
    }

    fn request(target: Ulid, kind: EventType, end: Option<u32>) -> BookingRequest {
        BookingRequest {
            date: d(2),
            time: TimeRange::new(hm(17, 0), hm(18, 30)),
            target,
            category_name: "U17".into(),
            kind,
            recurrence: end.map(|e| RecurrenceRequest {
                kind: RecurrenceType::Weekly,
                end_date: d(e),
            }),
            plateau: PlateauCriterium::default(),
        }
    }

    /// Store holding: a weekly training series (4 dates) on unit A1, a
    /// recurrent whole-field match on field A (3 dates x 3 units), and a
    /// lone training on field B.
    fn fixture() -> (EventStore, Vec<Event>, Vec<Event>, Event) {
        let h = sample();
        let field_a = &h.communes()[0].fields[0];
        let field_b = &h.communes()[0].fields[1];
        let unit = &field_a.units[0];

        let series = plan_booking(
            &request(unit.id, EventType::Entrainement, Some(23)),
            h.target(&unit.id).unwrap(),
        );
        let matches = plan_booking(
            &request(field_a.id, EventType::Match, Some(16)),
            h.target(&field_a.id).unwrap(),
        );
        let lone = plan_booking(
            &request(field_b.id, EventType::Entrainement, None),
            h.target(&field_b.id).unwrap(),
        )
        .remove(0);

        let mut store = EventStore::new();
        for e in series.iter().chain(matches.iter()).chain(std::iter::once(&lone)) {
            store.insert(e.clone());
        }
        (store, series, matches, lone)
    }

    #[test]
    fn classify_priorities() {
        let (store, series, matches, lone) = fixture();
        assert_eq!(
            classify(&store, &matches[0].id),
            Some(DeletePrompt::Match { recurrent: true })
        );
        assert_eq!(
            classify(&store, &series[1].id),
            Some(DeletePrompt::InstanceOrSeries { match_aware: false })
        );
        assert_eq!(classify(&store, &lone.id), Some(DeletePrompt::SingleOnly));
        assert_eq!(classify(&store, &Ulid::new()), None);
    }

    #[test]
    fn last_instance_of_series_is_single_only() {
        let (mut store, series, _, _) = fixture();
        for e in &series[1..] {
            store.remove(&e.id);
        }
        assert_eq!(classify(&store, &series[0].id), Some(DeletePrompt::SingleOnly));
    }

    #[test]
    fn single_removes_exactly_one() {
        let (mut store, series, _, _) = fixture();
        let before = store.len();
        let removed = apply(&mut store, DeleteScope::Single, &series[2].id);
        assert_eq!(removed.len(), 1);
        assert_eq!(store.len(), before - 1);
        assert!(!store.contains(&series[2].id));
        assert_eq!(store.series(&series[0].recurrence_id().unwrap()).len(), 3);
    }

    #[test]
    fn all_in_series_is_isolated() {
        let (mut store, series, matches, lone) = fixture();
        let removed = apply(&mut store, DeleteScope::AllInSeries, &series[0].id);
        assert_eq!(removed.len(), 4);
        // match leaves share dates with the series but survive
        assert!(matches.iter().all(|e| store.contains(&e.id)));
        assert!(store.contains(&lone.id));
    }

    #[test]
    fn match_on_date_removes_all_units_of_that_date() {
        let (mut store, _, matches, _) = fixture();
        let target = &matches[4];
        let removed = apply(&mut store, DeleteScope::AllMatchInstancesOnDate, &target.id);
        assert_eq!(removed.len(), 3);
        assert!(removed.iter().all(|e| e.date == target.date));
        assert_eq!(store.match_leaves(&target.match_id.unwrap()).len(), 6);
    }

    #[test]
    fn match_on_date_twice_is_noop() {
        let (mut store, _, matches, _) = fixture();
        let id = matches[0].id;
        apply(&mut store, DeleteScope::AllMatchInstancesOnDate, &id);
        let len = store.len();
        let removed = apply(&mut store, DeleteScope::AllMatchInstancesOnDate, &id);
        assert!(removed.is_empty());
        assert_eq!(store.len(), len);
    }

    #[test]
    fn match_in_series_removes_every_leaf() {
        let (mut store, series, matches, _) = fixture();
        let removed = apply(&mut store, DeleteScope::AllMatchInstancesInSeries, &matches[0].id);
        assert_eq!(removed.len(), 9);
        assert!(series.iter().all(|e| store.contains(&e.id)));
    }

    #[test]
    fn whole_series_on_match_prefers_match_scope() {
        let (store, _, matches, _) = fixture();
        assert_eq!(
            effective_scope(&store, DeleteScope::AllInSeries, &matches[0]),
            DeleteScope::AllMatchInstancesInSeries
        );
        let next = surviving(&store, DeleteScope::AllInSeries, &matches[0].id);
        assert!(matches.iter().all(|e| !next.contains(&e.id)));
        // the input snapshot is untouched
        assert!(matches.iter().all(|e| store.contains(&e.id)));
    }

    #[test]
    fn single_on_match_never_leaves_partial_match() {
        let (mut store, _, matches, _) = fixture();
        let removed = apply(&mut store, DeleteScope::Single, &matches[1].id);
        assert_eq!(removed.len(), 3);
        let date = matches[1].date;
        assert!(store.iter().all(|e| !(e.match_id == matches[1].match_id && e.date == date)));
    }

    #[test]
    fn match_scopes_on_plain_event_narrow_to_single() {
        let (mut store, series, _, lone) = fixture();
        assert_eq!(
            effective_scope(&store, DeleteScope::AllMatchInstancesOnDate, &series[0]),
            DeleteScope::Single
        );
        assert_eq!(
            effective_scope(&store, DeleteScope::AllInSeries, &lone),
            DeleteScope::Single
        );
        let removed = apply(&mut store, DeleteScope::AllMatchInstancesInSeries, &series[0].id);
        assert_eq!(removed.len(), 4);
    }

    #[test]
    fn recurrent_match_on_single_unit_field_offers_match_series() {
        let h = Hierarchy::new(vec![Commune {
            id: Ulid::new(),
            name: "Ville".into(),
            fields: vec![Field {
                id: Ulid::new(),
                name: "Stabilise".into(),
                units: vec![PlannableUnit {
                    id: Ulid::new(),
                    header_name: "S1".into(),
                }],
            }],
        }])
        .unwrap();
        let field = &h.communes()[0].fields[0];
        let unit = field.units[0].id;

        let mut req = request(field.id, EventType::Match, Some(21));
        req.date = d(7);
        let matches = plan_booking(&req, h.target(&field.id).unwrap());
        assert_eq!(matches.len(), 3);
        let training = plan_booking(
            &request(unit, EventType::Entrainement, Some(23)),
            h.target(&unit).unwrap(),
        );

        let mut store = EventStore::new();
        for e in matches.iter().chain(training.iter()) {
            store.insert(e.clone());
        }

        assert_eq!(
            classify(&store, &matches[1].id),
            Some(DeletePrompt::InstanceOrSeries { match_aware: true })
        );

        let removed = apply(&mut store, DeleteScope::AllInSeries, &matches[1].id);
        let mut removed_ids: Vec<Ulid> = removed.iter().map(|e| e.id).collect();
        let mut match_ids: Vec<Ulid> = matches.iter().map(|e| e.id).collect();
        removed_ids.sort();
        match_ids.sort();
        assert_eq!(removed_ids, match_ids);
        assert_eq!(store.len(), training.len());
        assert!(training.iter().all(|e| store.contains(&e.id)));
    }

    #[test]
    fn unknown_id_leaves_store_unchanged() {
        let (store, _, _, _) = fixture();
        let next = surviving(&store, DeleteScope::AllInSeries, &Ulid::new());
        assert_eq!(next.as_slice(), store.as_slice());
    }
}
