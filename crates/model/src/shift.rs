//! Shift-date attribution for weighbridge readings.
//!
//! Shifts do not line up with midnight: anything recorded between 00:00 and
//! 06:59 still belongs to the previous day's night shift. The resulting value is
//! a date at midnight plus one or two seconds, where the seconds tag the shift.

use chrono::{Days, NaiveDateTime, NaiveTime, Timelike};

/// Which bucket of the three-range hour rule a timestamp falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    /// 07:00 - 18:59
    Day,
    /// 19:00 - 23:59
    Evening,
    /// 00:00 - 06:59, attributed to the previous calendar day
    LateNight,
}

impl Shift {
    pub fn of(t: NaiveDateTime) -> Shift {
        match t.hour() {
            7..=18 => Shift::Day,
            19..=23 => Shift::Evening,
            _ => Shift::LateNight,
        }
    }

    /// Seconds past midnight used as the shift marker.
    pub fn marker_seconds(self) -> u32 {
        match self {
            Shift::Day => 1,
            Shift::Evening | Shift::LateNight => 2,
        }
    }
}

/// Maps a reading's timestamp to the shift date it is booked under.
pub fn shift_date(t: NaiveDateTime) -> NaiveDateTime {
    let shift = Shift::of(t);
    let date = match shift {
        Shift::LateNight => t
            .date()
            .checked_sub_days(Days::new(1))
            .unwrap_or_else(|| t.date()),
        Shift::Day | Shift::Evening => t.date(),
    };

    let marker = NaiveTime::from_hms_opt(0, 0, shift.marker_seconds()).unwrap_or(NaiveTime::MIN);
    date.and_time(marker)
}

/// Shift date for an optional reading; `None` stays `None`.
pub fn shift_date_opt(t: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
    t.map(shift_date)
}
