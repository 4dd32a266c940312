use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use ulid::Ulid;

use crate::hierarchy::{Hierarchy, Target};
use crate::limits::*;
use crate::model::*;

use super::store::EventStore;
use super::{FieldError, SchedulerError};

/// Check a create/edit request before anything is expanded or stored.
/// Every field-level failure is reported at once.
pub(crate) fn validate_request<'h>(
    request: &BookingRequest,
    hierarchy: &'h Hierarchy,
) -> Result<Target<'h>, SchedulerError> {
    let mut errors = Vec::new();

    if request.time.start >= request.time.end {
        errors.push(FieldError::new("endTime", "end time must be after start time"));
    } else if request.time.end > END_OF_DAY {
        errors.push(FieldError::new("endTime", "end time must be within the day"));
    }

    let category = request.category_name.trim();
    if category.is_empty() {
        errors.push(FieldError::new("categoryName", "category is required"));
    } else if category.len() > MAX_CATEGORY_LEN {
        errors.push(FieldError::new("categoryName", "category name too long"));
    }

    if let Some(tag) = &request.plateau.tag
        && tag.len() > MAX_PLATEAU_TAG_LEN
    {
        errors.push(FieldError::new("typePlateauCriterium", "tag too long"));
    }

    if let Some(r) = request.recurrence
        && r.end_date <= request.date
    {
        errors.push(FieldError::new("endDate", "end date must be after the start date"));
    }

    let target = hierarchy.target(&request.target);
    match target {
        None => errors.push(FieldError::new("stadeUnitId", "unknown unit or field")),
        Some(Target::Field(field)) if request.kind != EventType::Match && !field.units.is_empty() => {
            errors.push(FieldError::new(
                "stadeUnitId",
                "whole-field booking of a divided field is only available for matches",
            ));
        }
        Some(_) => {}
    }

    if !errors.is_empty() {
        return Err(SchedulerError::Validation(errors));
    }

    if let Some(r) = request.recurrence
        && occurrence_count(request.date, r.end_date, r.kind) > MAX_OCCURRENCES_PER_SERIES
    {
        return Err(SchedulerError::LimitExceeded("too many occurrences in series"));
    }

    target.ok_or(SchedulerError::NotFound(request.target))
}

fn occurrence_count(date: NaiveDate, end_date: NaiveDate, kind: RecurrenceType) -> usize {
    let days = (end_date - date).num_days().max(0) as usize;
    days / kind.stride_days() as usize + 1
}

/// Refuse candidates that overlap a stored event on the same unit and date.
/// Events listed in `replacing` are about to be removed and do not count.
pub(crate) fn check_no_overlap(
    store: &EventStore,
    candidates: &[Event],
    replacing: &HashSet<Ulid>,
) -> Result<(), SchedulerError> {
    for candidate in candidates {
        let clash = store.on_date(candidate.date).find(|e| {
            !replacing.contains(&e.id)
                && e.stade_unit_id == candidate.stade_unit_id
                && e.time.overlaps(&candidate.time)
        });
        if let Some(existing) = clash {
            return Err(SchedulerError::Conflict(existing.id));
        }
    }
    Ok(())
}

/// Every pair of stored events sharing a unit and date with overlapping times.
pub fn find_overlaps(events: &[Event]) -> Vec<(Ulid, Ulid)> {
    let mut by_cell: HashMap<(NaiveDate, Ulid), Vec<&Event>> = HashMap::new();
    for e in events {
        by_cell.entry((e.date, e.stade_unit_id)).or_default().push(e);
    }

    let mut pairs = Vec::new();
    for cell in by_cell.values_mut() {
        cell.sort_by_key(|e| e.time.start);
        for i in 0..cell.len() {
            for j in (i + 1)..cell.len() {
                if cell[j].time.start >= cell[i].time.end {
                    break;
                }
                pairs.push((cell[i].id, cell[j].id));
            }
        }
    }
    pairs.sort();
    pairs
}

/// Check a snapshot against the stored-event invariants. Returns a message per violation.
pub fn check_invariants(store: &EventStore, hierarchy: &Hierarchy) -> Vec<String> {
    let mut problems = Vec::new();
    for e in store.iter() {
        if e.time.start >= e.time.end {
            problems.push(format!("{}: end time not after start time", e.id));
        }
        if hierarchy.target(&e.stade_unit_id).is_none() {
            problems.push(format!("{}: unknown unit {}", e.id, e.stade_unit_id));
        }
    }

    let mut seen = HashSet::new();
    for e in store.iter().filter(|e| e.match_id.is_some()) {
        let Some(mid) = e.match_id else { continue };
        if !seen.insert((mid, e.date)) {
            continue;
        }
        let leaves: Vec<&Event> = store
            .match_leaves(&mid)
            .into_iter()
            .filter(|l| l.date == e.date)
            .collect();
        let same_shape = leaves.iter().all(|l| {
            l.time == e.time && l.category_name == e.category_name && l.recurrence_id() == e.recurrence_id()
        });
        if !same_shape {
            problems.push(format!("match {mid} on {}: leaves disagree", e.date));
        }
        let units: HashSet<Ulid> = leaves.iter().map(|l| l.stade_unit_id).collect();
        let expected: Option<HashSet<Ulid>> = hierarchy
            .field_of_unit(&e.stade_unit_id)
            .map(|f| f.unit_ids().collect());
        if expected.as_ref() != Some(&units) {
            problems.push(format!("match {mid} on {}: does not cover its field", e.date));
        }
    }
    problems
}
