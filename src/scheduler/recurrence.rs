use chrono::{Days, NaiveDate};
use ulid::Ulid;

use crate::model::*;

/// Weekday-aligned dates of a series, `date` first, `end_date` inclusive.
///
/// Returns just `[date]` when `end_date` does not come after `date`.
pub fn occurrence_dates(date: NaiveDate, end_date: NaiveDate, kind: RecurrenceType) -> Vec<NaiveDate> {
    let stride = Days::new(kind.stride_days() as u64);
    let mut dates = vec![date];
    let mut cur = date;
    while let Some(next) = cur.checked_add_days(stride) {
        if next > end_date {
            break;
        }
        dates.push(next);
        cur = next;
    }
    dates
}

/// True if the request asks for a series that would actually recur.
pub fn is_effectively_recurrent(request: &BookingRequest) -> bool {
    request
        .recurrence
        .is_some_and(|r| r.end_date > request.date)
}

/// Expand a request into dated instances targeting `request.target`.
///
/// All instances of a series share one fresh recurrence id. A request
/// without recurrence, or whose end date does not follow its start date,
/// yields exactly one non-recurrent instance.
pub fn expand(request: &BookingRequest) -> Vec<Event> {
    let recurrence = match request.recurrence {
        Some(r) if r.end_date > request.date => Some(Recurrence {
            id: Ulid::new(),
            kind: r.kind,
            end_date: r.end_date,
        }),
        _ => None,
    };

    let dates = match recurrence {
        Some(r) => occurrence_dates(request.date, r.end_date, r.kind),
        None => vec![request.date],
    };

    dates
        .into_iter()
        .map(|date| Event {
            id: Ulid::new(),
            date,
            time: request.time,
            stade_unit_id: request.target,
            category_name: request.category_name.clone(),
            kind: request.kind,
            recurrence,
            match_id: None,
            plateau: request.plateau.clone(),
        })
        .collect()
}
