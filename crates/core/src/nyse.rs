//! NYSE trading calendar.
//!
//! Regular session 09:30-16:00 America/New_York, 13:00 close on the usual
//! half days. Holidays are derived from the exchange's observance rules
//! rather than a fixed table, plus a short list of one-off closures.

use crate::market::{CalendarError, MarketSession, TradingCalendar};
use chrono::{Datelike, Days, NaiveDate, NaiveTime, TimeZone, Weekday};
use chrono_tz::America::New_York;
use chrono_tz::Tz;

/// Years the holiday rules are maintained for.
pub const NYSE_FIRST_YEAR: i32 = 1990;
pub const NYSE_LAST_YEAR: i32 = 2099;

/// Unscheduled full-day closures (national mourning, weather, 9/11).
const SPECIAL_CLOSURES: &[(i32, u32, u32)] = &[
    (1994, 4, 27),
    (2001, 9, 11),
    (2001, 9, 12),
    (2001, 9, 13),
    (2001, 9, 14),
    (2004, 6, 11),
    (2007, 1, 2),
    (2012, 10, 29),
    (2012, 10, 30),
    (2018, 12, 5),
    (2025, 1, 9),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct NyseCalendar;

impl NyseCalendar {
    pub fn new() -> Self {
        Self
    }

    fn open_time() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN)
    }

    fn close_time(date: NaiveDate) -> NaiveTime {
        if is_early_close(date) {
            NaiveTime::from_hms_opt(13, 0, 0).unwrap_or(NaiveTime::MIN)
        } else {
            NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN)
        }
    }
}

impl TradingCalendar for NyseCalendar {
    fn timezone(&self) -> Tz {
        New_York
    }

    fn session_for(&self, date: NaiveDate) -> Result<Option<MarketSession>, CalendarError> {
        if !(NYSE_FIRST_YEAR..=NYSE_LAST_YEAR).contains(&date.year()) {
            return Err(CalendarError::Unavailable(date));
        }
        if !is_trading_day(date) {
            return Ok(None);
        }

        let localize = |time: NaiveTime| {
            let naive = date.and_time(time);
            New_York
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(|| CalendarError::InvalidSessionTime(naive.to_string()))
        };

        Ok(Some(MarketSession {
            date,
            open: localize(Self::open_time())?,
            close: localize(Self::close_time(date))?,
        }))
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Weekday that isn't a holiday or special closure.
pub fn is_trading_day(date: NaiveDate) -> bool {
    !is_weekend(date) && !is_holiday(date)
}

/// Full-day NYSE holiday (including observed dates).
pub fn is_holiday(date: NaiveDate) -> bool {
    let year = date.year();

    if SPECIAL_CLOSURES.contains(&(year, date.month(), date.day())) {
        return true;
    }

    // New Year's Day moves to Monday when on Sunday; a Saturday New Year is
    // not made up on the Friday before.
    if ymd(year, 1, 1).is_some_and(|d| d.weekday() != Weekday::Sat && observed(d) == date) {
        return true;
    }

    let mut fixed = vec![ymd(year, 7, 4), ymd(year, 12, 25)];
    if year >= 2022 {
        fixed.push(ymd(year, 6, 19));
    }
    if fixed.into_iter().flatten().any(|d| observed(d) == date) {
        return true;
    }

    let floating = [
        // Martin Luther King Jr. Day, observed from 1998
        (year >= 1998)
            .then(|| NaiveDate::from_weekday_of_month_opt(year, 1, Weekday::Mon, 3))
            .flatten(),
        // Washington's Birthday
        NaiveDate::from_weekday_of_month_opt(year, 2, Weekday::Mon, 3),
        good_friday(year),
        last_weekday_of_month(year, 5, Weekday::Mon),
        // Labor Day
        NaiveDate::from_weekday_of_month_opt(year, 9, Weekday::Mon, 1),
        // Thanksgiving
        NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Thu, 4),
    ];
    floating.into_iter().flatten().any(|d| d == date)
}

/// 13:00 close: July 3rd, the day after Thanksgiving, and Christmas Eve,
/// when those are otherwise trading days.
pub fn is_early_close(date: NaiveDate) -> bool {
    if !is_trading_day(date) {
        return false;
    }

    let year = date.year();
    let after_thanksgiving = NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Thu, 4)
        .and_then(|d| d.succ_opt());

    Some(date) == ymd(year, 7, 3)
        || Some(date) == after_thanksgiving
        || Some(date) == ymd(year, 12, 24)
}

/// Saturday holidays are observed Friday, Sunday holidays Monday.
fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Days::new(1),
        Weekday::Sun => date + Days::new(1),
        _ => date,
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, 5)
        .or_else(|| NaiveDate::from_weekday_of_month_opt(year, month, weekday, 4))
}

/// Easter Sunday minus two days (anonymous Gregorian computus).
fn good_friday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;

    let easter = ymd(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)?;
    easter.checked_sub_days(Days::new(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_good_friday() {
        assert_eq!(good_friday(2024), Some(d(2024, 3, 29)));
        assert_eq!(good_friday(2025), Some(d(2025, 4, 18)));
        assert_eq!(good_friday(2026), Some(d(2026, 4, 3)));
    }

    #[test]
    fn test_holidays_2024() {
        let holidays = [
            d(2024, 1, 1),
            d(2024, 1, 15),
            d(2024, 2, 19),
            d(2024, 3, 29),
            d(2024, 5, 27),
            d(2024, 6, 19),
            d(2024, 7, 4),
            d(2024, 9, 2),
            d(2024, 11, 28),
            d(2024, 12, 25),
        ];
        for h in holidays {
            assert!(is_holiday(h), "{h} should be a holiday");
        }
        assert!(!is_holiday(d(2024, 12, 2)));
    }

    #[test]
    fn test_observed_holidays() {
        // July 4th 2026 is a Saturday
        assert!(is_holiday(d(2026, 7, 3)));
        // Christmas 2022 is a Sunday
        assert!(is_holiday(d(2022, 12, 26)));
        // New Year 2023 is a Sunday
        assert!(is_holiday(d(2023, 1, 2)));
        // New Year 2022 is a Saturday: no Friday make-up
        assert!(!is_holiday(d(2021, 12, 31)));
        // Juneteenth only from 2022
        assert!(!is_holiday(d(2021, 6, 18)));
        assert!(is_holiday(d(2023, 6, 19)));
    }

    #[test]
    fn test_special_closure() {
        assert!(is_holiday(d(2025, 1, 9)));
        assert!(!is_trading_day(d(2001, 9, 12)));
    }

    #[test]
    fn test_regular_session_times() {
        let session = NyseCalendar.session_for(d(2024, 12, 2)).unwrap().unwrap();
        assert_eq!((session.open.hour(), session.open.minute()), (9, 30));
        assert_eq!(session.close.hour(), 16);
    }

    #[test]
    fn test_early_close() {
        let session = NyseCalendar.session_for(d(2024, 11, 29)).unwrap().unwrap();
        assert_eq!(session.close.hour(), 13);
        let session = NyseCalendar.session_for(d(2024, 12, 24)).unwrap().unwrap();
        assert_eq!(session.close.hour(), 13);
        assert!(!is_early_close(d(2024, 12, 23)));
        // July 3rd 2026 is itself the observed holiday
        assert!(!is_early_close(d(2026, 7, 3)));
    }

    #[test]
    fn test_no_session_on_weekend_or_holiday() {
        assert_eq!(NyseCalendar.session_for(d(2024, 12, 7)).unwrap(), None);
        assert_eq!(NyseCalendar.session_for(d(2024, 12, 25)).unwrap(), None);
    }

    #[test]
    fn test_out_of_range_is_unavailable() {
        assert_eq!(
            NyseCalendar.session_for(d(1985, 6, 3)),
            Err(CalendarError::Unavailable(d(1985, 6, 3)))
        );
    }

    #[test]
    fn test_session_offset_follows_dst() {
        // Summer: open 09:30 EDT = 13:30 UTC
        let summer = NyseCalendar.session_for(d(2024, 7, 1)).unwrap().unwrap();
        assert_eq!(summer.open.naive_utc().hour(), 13);
        // Winter: open 09:30 EST = 14:30 UTC
        let winter = NyseCalendar.session_for(d(2024, 12, 2)).unwrap().unwrap();
        assert_eq!(winter.open.naive_utc().hour(), 14);
    }
}
