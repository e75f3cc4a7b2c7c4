use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;

/// Fixed display offset (UTC+5:30). All user-facing times are rendered in this
/// zone; everything stored or fetched stays in UTC.
pub const DISPLAY_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub static DISPLAY_OFFSET: Lazy<FixedOffset> = Lazy::new(|| {
    FixedOffset::east_opt(DISPLAY_OFFSET_SECS).expect("display offset within bounds")
});

/// Convert a stored UTC time-of-day to display wall-clock time.
///
/// The date anchors the shift so callers can reason about values near
/// midnight; with a fixed offset only the time component changes.
pub fn utc_to_display(time: NaiveTime, date: NaiveDate) -> NaiveTime {
    (date.and_time(time) + Duration::seconds(DISPLAY_OFFSET_SECS as i64)).time()
}

/// Convert a display wall-clock time on a display-zone date to UTC time-of-day.
pub fn display_to_utc(time: NaiveTime, date: NaiveDate) -> NaiveTime {
    (date.and_time(time) - Duration::seconds(DISPLAY_OFFSET_SECS as i64)).time()
}

/// Full-datetime variants, used when rendering audit-trail entries.
pub fn utc_datetime_to_display(dt: NaiveDateTime) -> NaiveDateTime {
    dt + Duration::seconds(DISPLAY_OFFSET_SECS as i64)
}

/// UTC datetime corresponding to a display wall-clock time on a display date.
/// A display time shortly after midnight lands on the previous UTC date.
pub fn display_to_utc_datetime(time: NaiveTime, date: NaiveDate) -> NaiveDateTime {
    date.and_time(time) - Duration::seconds(DISPLAY_OFFSET_SECS as i64)
}

/// Half-open UTC window `[start, end)` covering one display-zone calendar day.
/// This is the fetch window for provider sync and the operational day boundary
/// for manual actions.
pub fn display_day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = date.and_time(NaiveTime::MIN) - Duration::seconds(DISPLAY_OFFSET_SECS as i64);
    let start = DateTime::<Utc>::from_naive_utc_and_offset(midnight, Utc);
    (start, start + Duration::days(1))
}

/// Current calendar date in the display zone. The clock is always passed in
/// explicitly; nothing in this crate reads an ambient "today".
pub fn display_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&*DISPLAY_OFFSET).date_naive()
}

/// Seconds worked between two UTC times of day, wrapping across midnight.
pub fn worked_seconds(start: NaiveTime, end: NaiveTime) -> i64 {
    let span = (end - start).num_seconds();
    if span < 0 { span + 86_400 } else { span }
}

/// Render a second count as `HH:MM` for report cells and totals.
pub fn format_hhmm(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60)
}
