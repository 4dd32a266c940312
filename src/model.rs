use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Minute of the day (0..=1440). The only time-of-day type.
pub type Minute = u16;

/// Build a minute-of-day from hours and minutes.
pub const fn hm(hours: u16, minutes: u16) -> Minute {
    hours * 60 + minutes
}

/// Render a minute-of-day as `HH:MM`.
pub fn fmt_minute(m: Minute) -> String {
    format!("{:02}:{:02}", m / 60, m % 60)
}

/// Half-open interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Minute,
    pub end: Minute,
}

impl TimeRange {
    pub fn new(start: Minute, end: Minute) -> Self {
        debug_assert!(start < end, "TimeRange start must be before end");
        Self { start, end }
    }

    pub fn duration(&self) -> Minute {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_minute(&self, t: Minute) -> bool {
        self.start <= t && t < self.end
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Entrainement,
    Match,
}

impl EventType {
    pub fn label(&self) -> &'static str {
        match self {
            EventType::Entrainement => "entrainement",
            EventType::Match => "match",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    Weekly,
    Biweekly,
}

impl RecurrenceType {
    /// Days between two consecutive occurrences.
    pub fn stride_days(&self) -> i64 {
        match self {
            RecurrenceType::Weekly => 7,
            RecurrenceType::Biweekly => 14,
        }
    }
}

impl std::str::FromStr for RecurrenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(RecurrenceType::Weekly),
            "biweekly" => Ok(RecurrenceType::Biweekly),
            other => Err(format!("unknown recurrence type: {other}")),
        }
    }
}

/// Series membership of an instance. Present iff the instance is recurrent,
/// so `recurrence_id` and `end_date` can never exist without each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub id: Ulid,
    pub kind: RecurrenceType,
    /// Last date of the series window (inclusive).
    pub end_date: NaiveDate,
}

/// Plateau / criterium tagging carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlateauCriterium {
    pub tag: Option<String>,
    pub headcount: Option<u32>,
}

/// One concrete booking instance on a date, time range and unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Ulid,
    pub date: NaiveDate,
    pub time: TimeRange,
    /// Plannable unit id, or a field id for a whole-field booking on a field without units.
    pub stade_unit_id: Ulid,
    pub category_name: String,
    pub kind: EventType,
    pub recurrence: Option<Recurrence>,
    /// Shared by every fan-out leaf of one whole-field match.
    pub match_id: Option<Ulid>,
    pub plateau: PlateauCriterium,
}

impl Event {
    pub fn is_recurrent(&self) -> bool {
        self.recurrence.is_some()
    }

    pub fn recurrence_id(&self) -> Option<Ulid> {
        self.recurrence.map(|r| r.id)
    }
}

/// Requested recurrence for a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRequest {
    pub kind: RecurrenceType,
    pub end_date: NaiveDate,
}

/// A create/edit request as produced by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// First (or only) occurrence.
    pub date: NaiveDate,
    pub time: TimeRange,
    /// Unit id, or field id for a whole-field booking.
    pub target: Ulid,
    pub category_name: String,
    pub kind: EventType,
    pub recurrence: Option<RecurrenceRequest>,
    #[serde(default)]
    pub plateau: PlateauCriterium,
}

// ── Deletion scopes ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteScope {
    Single,
    AllInSeries,
    AllMatchInstancesOnDate,
    AllMatchInstancesInSeries,
}

impl DeleteScope {
    pub fn label(&self) -> &'static str {
        match self {
            DeleteScope::Single => "single",
            DeleteScope::AllInSeries => "all_in_series",
            DeleteScope::AllMatchInstancesOnDate => "all_match_instances_on_date",
            DeleteScope::AllMatchInstancesInSeries => "all_match_instances_in_series",
        }
    }
}

/// What the user should be asked before deleting an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePrompt {
    /// No choice: the instance stands alone.
    SingleOnly,
    /// Recurring instance: this one, or the whole series.
    InstanceOrSeries { match_aware: bool },
    /// Multi-unit match on this date, optionally part of a series.
    Match { recurrent: bool },
}

impl DeletePrompt {
    pub fn candidates(&self) -> Vec<DeleteScope> {
        match self {
            DeletePrompt::SingleOnly => vec![DeleteScope::Single],
            DeletePrompt::InstanceOrSeries { match_aware: false } => {
                vec![DeleteScope::Single, DeleteScope::AllInSeries]
            }
            DeletePrompt::InstanceOrSeries { match_aware: true } => {
                vec![DeleteScope::Single, DeleteScope::AllMatchInstancesInSeries]
            }
            DeletePrompt::Match { recurrent: false } => vec![DeleteScope::AllMatchInstancesOnDate],
            DeletePrompt::Match { recurrent: true } => vec![
                DeleteScope::AllMatchInstancesOnDate,
                DeleteScope::AllMatchInstancesInSeries,
            ],
        }
    }
}

// ── Change notifications ─────────────────────────────────────────

/// Published after every wholesale save of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    Saved {
        store: String,
        revision: u64,
        events: usize,
    },
}
