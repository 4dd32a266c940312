use crate::model::{hm, Minute};

/// Grid slot length in minutes.
pub const SLOT_MINUTES: Minute = 30;

/// Upper bound of a minute-of-day (24:00).
pub const END_OF_DAY: Minute = hm(24, 0);

/// Default training window on ordinary days.
pub const TRAINING_START: Minute = hm(17, 0);
pub const TRAINING_END: Minute = hm(22, 0);

/// Default training window on the mid-week day (school afternoon off).
pub const MIDWEEK_TRAINING_START: Minute = hm(14, 0);

/// A single series may not expand beyond this many dates (five years weekly).
pub const MAX_OCCURRENCES_PER_SERIES: usize = 260;

pub const MAX_CATEGORY_LEN: usize = 128;
pub const MAX_PLATEAU_TAG_LEN: usize = 128;

/// Largest snapshot frame accepted on load. A longer length header is a corrupt tail.
pub const MAX_FRAME_LEN: usize = 64 * 1024;
