use ulid::Ulid;

use crate::hierarchy::{Field, Target};
use crate::model::*;

use super::recurrence::expand;

/// Fan a whole-field match template out into one leaf per unit of `field`.
///
/// Leaves get fresh ids and share `match_id`; recurrence is inherited from
/// the template unchanged. A field without units cannot be fanned out: the
/// template is returned as a single instance on the field itself.
pub fn bind(template: &Event, field: &Field, match_id: Ulid) -> Vec<Event> {
    if field.units.is_empty() {
        return vec![Event {
            stade_unit_id: field.id,
            match_id: None,
            ..template.clone()
        }];
    }
    field
        .unit_ids()
        .map(|unit_id| Event {
            id: Ulid::new(),
            stade_unit_id: unit_id,
            match_id: Some(match_id),
            ..template.clone()
        })
        .collect()
}

/// Turn a validated request into the concrete instances to insert:
/// recurrence expansion first, then whole-field match fan-out per date.
pub fn plan_booking(request: &BookingRequest, target: Target<'_>) -> Vec<Event> {
    let templates = expand(request);
    match (request.kind, target) {
        (EventType::Match, Target::Field(field)) => {
            let match_id = Ulid::new();
            templates
                .iter()
                .flat_map(|t| bind(t, field, match_id))
                .collect()
        }
        _ => templates,
    }
}
