//! Indonesian (id-ID) date and time formatting.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, TimeZone, Timelike, Utc};

const WEEKDAYS: [&str; 7] = ["Minggu", "Senin", "Selasa", "Rabu", "Kamis", "Jumat", "Sabtu"];
const MONTHS: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni", "Juli", "Agustus", "September",
    "Oktober", "November", "Desember",
];

/// Western Indonesia Time, UTC+7
pub fn wib() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).unwrap_or_else(|| Utc.fix())
}

/// `17/5/2025`
pub fn short_date<D: Datelike>(date: &D) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

/// `Sabtu, 17 Mei 2025`
pub fn long_date<D: Datelike>(date: &D) -> String {
    let weekday = WEEKDAYS
        .get(date.weekday().num_days_from_sunday() as usize)
        .copied()
        .unwrap_or_default();
    let month = MONTHS.get(date.month0() as usize).copied().unwrap_or_default();
    format!("{}, {} {} {}", weekday, date.day(), month, date.year())
}

/// `14.05.09`
pub fn time_of_day<T: Timelike>(time: &T) -> String {
    format!("{:02}.{:02}.{:02}", time.hour(), time.minute(), time.second())
}

/// `17/5/2025, 14.05.09`
pub fn date_time<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    format!("{}, {}", short_date(at), time_of_day(at))
}

/// Whole years between `dob` and `on`; `None` when `dob` is in the future.
pub fn age_on(dob: NaiveDate, on: NaiveDate) -> Option<u32> {
    on.years_since(dob)
}
