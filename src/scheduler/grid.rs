use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, Days, NaiveDate, Weekday};
use ulid::Ulid;

use crate::hierarchy::{Column, Hierarchy};
use crate::limits::*;
use crate::model::*;

/// Result of resolving one `(day, slot, unit)` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotHit<'a> {
    pub event: &'a Event,
    /// The slot is the one the event starts in.
    pub is_starting_slot: bool,
    /// Half-hour slots the event spans. Only meaningful on the starting slot.
    pub row_span: u16,
}

/// Number of half-hour slots a range occupies (a trailing partial slot counts).
pub fn slot_count(range: &TimeRange) -> u16 {
    range.duration().div_ceil(SLOT_MINUTES)
}

fn floor_to_slot(m: Minute) -> Minute {
    m - m % SLOT_MINUTES
}

fn ceil_to_slot(m: Minute) -> Minute {
    m.div_ceil(SLOT_MINUTES) * SLOT_MINUTES
}

/// Find the event occupying `slot_start` on `unit_id` and `day`.
///
/// Overlapping events are not prevented elsewhere; the first match in
/// iteration order wins.
pub fn resolve<'a>(
    day: NaiveDate,
    slot_start: Minute,
    unit_id: Ulid,
    events: impl IntoIterator<Item = &'a Event>,
) -> Option<SlotHit<'a>> {
    events
        .into_iter()
        .filter(|e| e.date == day && e.stade_unit_id == unit_id)
        .find(|e| e.time.contains_minute(slot_start))
        .map(|event| SlotHit {
            event,
            is_starting_slot: slot_start == event.time.start,
            row_span: slot_count(&event.time),
        })
}

// ── Display windows ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    pub training: TimeRange,
    pub midweek_training: TimeRange,
    pub midweek_day: Weekday,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            training: TimeRange::new(TRAINING_START, TRAINING_END),
            midweek_training: TimeRange::new(MIDWEEK_TRAINING_START, TRAINING_END),
            midweek_day: Weekday::Wed,
        }
    }
}

impl GridConfig {
    pub fn default_training_window(&self, day: NaiveDate) -> TimeRange {
        if day.weekday() == self.midweek_day {
            self.midweek_training
        } else {
            self.training
        }
    }

    /// The day's training window, widened so no training on that day is clipped.
    pub fn training_window<'a>(
        &self,
        day: NaiveDate,
        events: impl IntoIterator<Item = &'a Event>,
    ) -> TimeRange {
        events
            .into_iter()
            .filter(|e| e.date == day && e.kind == EventType::Entrainement)
            .fold(self.default_training_window(day), |window, e| {
                let booked = TimeRange {
                    start: floor_to_slot(e.time.start),
                    end: ceil_to_slot(e.time.end).min(END_OF_DAY),
                };
                window.union(&booked)
            })
    }
}

/// Slot starts of a contiguous window.
pub fn window_slots(window: &TimeRange) -> Vec<Minute> {
    (window.start..window.end)
        .step_by(SLOT_MINUTES as usize)
        .collect()
}

/// Matches have no default window: the union of every slot start booked by a
/// match on that day.
pub fn match_slots<'a>(day: NaiveDate, events: impl IntoIterator<Item = &'a Event>) -> Vec<Minute> {
    let mut slots = BTreeSet::new();
    for e in events
        .into_iter()
        .filter(|e| e.date == day && e.kind == EventType::Match)
    {
        let mut s = floor_to_slot(e.time.start);
        while s < e.time.end {
            slots.insert(s);
            s += SLOT_MINUTES;
        }
    }
    slots.into_iter().collect()
}

// ── Render model ─────────────────────────────────────────────────

/// Rendering-only category information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStyle {
    pub label: String,
    pub color: Option<String>,
}

pub trait CategoryLookup {
    fn lookup(&self, category: &str) -> Option<CategoryStyle>;
}

impl CategoryLookup for HashMap<String, CategoryStyle> {
    fn lookup(&self, category: &str) -> Option<CategoryStyle> {
        self.get(category).cloned()
    }
}

/// Lookup that knows no categories; cells fall back to the category name.
pub struct NoCategories;

impl CategoryLookup for NoCategories {
    fn lookup(&self, _category: &str) -> Option<CategoryStyle> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Empty,
    /// First visible row of an event; the renderer merges `row_span` rows.
    Start {
        event_id: Ulid,
        row_span: u16,
        style: CategoryStyle,
    },
    /// Row merged into the `Start` cell above it.
    Covered { event_id: Ulid },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGrid {
    pub date: NaiveDate,
    pub kind: EventType,
    pub columns: Vec<Column>,
    pub slots: Vec<Minute>,
    /// `cells[row][column]`, one row per slot.
    pub cells: Vec<Vec<Cell>>,
}

impl DayGrid {
    pub fn cell(&self, slot: Minute, column: &Ulid) -> Option<&Cell> {
        let row = self.slots.iter().position(|s| *s == slot)?;
        let col = self.columns.iter().position(|c| c.id == *column)?;
        Some(&self.cells[row][col])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayPlan {
    pub training: DayGrid,
    pub matches: DayGrid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekGrid {
    pub monday: NaiveDate,
    pub days: Vec<DayPlan>,
}

/// Lay out one day's grid of `kind` events over `slots`.
///
/// A cell becomes a `Start` on the event's starting slot, or on the first
/// visible row of an event whose start falls off the slot boundary.
pub fn day_grid<'a>(
    day: NaiveDate,
    kind: EventType,
    columns: &[Column],
    slots: Vec<Minute>,
    events: impl IntoIterator<Item = &'a Event>,
    categories: &dyn CategoryLookup,
) -> DayGrid {
    let day_events: Vec<&Event> = events
        .into_iter()
        .filter(|e| e.date == day && e.kind == kind)
        .collect();

    let mut cells = vec![vec![Cell::Empty; columns.len()]; slots.len()];
    for (col, column) in columns.iter().enumerate() {
        let mut prev: Option<Ulid> = None;
        for (row, &slot) in slots.iter().enumerate() {
            let Some(hit) = resolve(day, slot, column.id, day_events.iter().copied()) else {
                prev = None;
                continue;
            };
            let id = hit.event.id;
            if hit.is_starting_slot || prev != Some(id) {
                let visible = slots[row..]
                    .iter()
                    .take_while(|s| hit.event.time.contains_minute(**s))
                    .count() as u16;
                let style = categories
                    .lookup(&hit.event.category_name)
                    .unwrap_or_else(|| CategoryStyle {
                        label: hit.event.category_name.clone(),
                        color: None,
                    });
                cells[row][col] = Cell::Start {
                    event_id: id,
                    row_span: hit.row_span.min(visible),
                    style,
                };
            } else {
                cells[row][col] = Cell::Covered { event_id: id };
            }
            prev = Some(id);
        }
    }

    DayGrid {
        date: day,
        kind,
        columns: columns.to_vec(),
        slots,
        cells,
    }
}

/// Monday of the ISO week containing `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Days::new(day.weekday().num_days_from_monday() as u64)
}

/// Seven days of training and match grids for the week containing `any_day`.
pub fn week_grid(
    hierarchy: &Hierarchy,
    events: &[Event],
    any_day: NaiveDate,
    config: &GridConfig,
    categories: &dyn CategoryLookup,
) -> WeekGrid {
    let monday = week_start(any_day);
    let columns = hierarchy.columns();
    let days = monday
        .iter_days()
        .take(7)
        .map(|day| {
            let window = config.training_window(day, events);
            DayPlan {
                training: day_grid(
                    day,
                    EventType::Entrainement,
                    &columns,
                    window_slots(&window),
                    events,
                    categories,
                ),
                matches: day_grid(
                    day,
                    EventType::Match,
                    &columns,
                    match_slots(day, events),
                    events,
                    categories,
                ),
            }
        })
        .collect();
    WeekGrid { monday, days }
}
