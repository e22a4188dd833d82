//! Market-hours admission gate.
//!
//! Decides whether a timestamp is inside a regular trading session, or
//! within a buffer of hours before the open or after the close. Non-session
//! dates (weekends, holidays) never pass, whatever the buffer.

use crate::message::MessageTime;
use chrono::{DateTime, NaiveDate, TimeDelta};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::debug;

/// Default width of the pre/post-market window, in hours.
pub const DEFAULT_BUFFER_HOURS: u32 = 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Trading calendar has no data for {0}")]
    Unavailable(NaiveDate),
    #[error("Session time {0} does not exist in the exchange timezone")]
    InvalidSessionTime(String),
}

/// Regular trading session for one date, in exchange-local time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSession {
    pub date: NaiveDate,
    pub open: DateTime<Tz>,
    pub close: DateTime<Tz>,
}

impl MarketSession {
    /// Whether `t` lies in `[open, close]`.
    pub fn contains(&self, t: &DateTime<Tz>) -> bool {
        self.open <= *t && *t <= self.close
    }

    /// Whether `t` lies in `[open - buffer, open)` or `(close, close + buffer]`.
    ///
    /// A buffer reaching past the representable range leaves that side
    /// unbounded.
    pub fn is_near(&self, t: &DateTime<Tz>, buffer: TimeDelta) -> bool {
        let pre_market = *t < self.open
            && self
                .open
                .checked_sub_signed(buffer)
                .map_or(true, |lo| lo <= *t);
        let post_market = self.close < *t
            && self
                .close
                .checked_add_signed(buffer)
                .map_or(true, |hi| *t <= hi);
        pre_market || post_market
    }
}

/// Source of exchange trading sessions.
pub trait TradingCalendar: Send + Sync {
    /// Exchange-local timezone.
    fn timezone(&self) -> Tz;

    /// Session for `date`, or `None` when the exchange is closed all day.
    fn session_for(&self, date: NaiveDate) -> Result<Option<MarketSession>, CalendarError>;
}

impl<C: TradingCalendar + ?Sized> TradingCalendar for &C {
    fn timezone(&self) -> Tz {
        (**self).timezone()
    }

    fn session_for(&self, date: NaiveDate) -> Result<Option<MarketSession>, CalendarError> {
        (**self).session_for(date)
    }
}

impl<C: TradingCalendar + ?Sized> TradingCalendar for std::sync::Arc<C> {
    fn timezone(&self) -> Tz {
        (**self).timezone()
    }

    fn session_for(&self, date: NaiveDate) -> Result<Option<MarketSession>, CalendarError> {
        (**self).session_for(date)
    }
}

/// True if `check_time` is in session, or within `hours` of the open or
/// close, on its own calendar date.
pub fn is_market_hours_or_near<C: TradingCalendar + ?Sized>(
    calendar: &C,
    check_time: MessageTime,
    hours: u32,
) -> Result<bool, CalendarError> {
    let local = check_time.in_timezone(calendar.timezone());

    let Some(session) = calendar.session_for(local.date_naive())? else {
        debug!(time = %local, "No trading session on this date");
        return Ok(false);
    };

    if session.contains(&local) {
        return Ok(true);
    }

    Ok(session.is_near(&local, TimeDelta::hours(i64::from(hours))))
}

/// Market-hours gate bound to a calendar and buffer width.
#[derive(Debug, Clone)]
pub struct MarketGate<C> {
    calendar: C,
    buffer_hours: u32,
}

impl<C: TradingCalendar> MarketGate<C> {
    pub fn new(calendar: C, buffer_hours: u32) -> Self {
        Self {
            calendar,
            buffer_hours,
        }
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    pub fn buffer_hours(&self) -> u32 {
        self.buffer_hours
    }

    pub fn timezone(&self) -> Tz {
        self.calendar.timezone()
    }

    /// See [`is_market_hours_or_near`].
    pub fn admits(&self, check_time: MessageTime) -> Result<bool, CalendarError> {
        is_market_hours_or_near(&self.calendar, check_time, self.buffer_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, NaiveTime, TimeZone};
    use chrono_tz::America::New_York;

    /// Every date is a 09:30-16:00 session except the listed closed dates.
    struct FixedCalendar {
        closed: Vec<NaiveDate>,
    }

    impl TradingCalendar for FixedCalendar {
        fn timezone(&self) -> Tz {
            New_York
        }

        fn session_for(&self, date: NaiveDate) -> Result<Option<MarketSession>, CalendarError> {
            if self.closed.contains(&date) {
                return Ok(None);
            }
            let at = |h, m| {
                New_York
                    .from_local_datetime(&date.and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap()))
                    .unwrap()
            };
            Ok(Some(MarketSession {
                date,
                open: at(9, 30),
                close: at(16, 0),
            }))
        }
    }

    struct BrokenCalendar;

    impl TradingCalendar for BrokenCalendar {
        fn timezone(&self) -> Tz {
            New_York
        }

        fn session_for(&self, date: NaiveDate) -> Result<Option<MarketSession>, CalendarError> {
            Err(CalendarError::Unavailable(date))
        }
    }

    fn at(s: &str) -> MessageTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .into()
    }

    fn open_calendar() -> FixedCalendar {
        FixedCalendar { closed: Vec::new() }
    }

    #[test]
    fn test_inside_session() {
        let cal = open_calendar();
        assert!(is_market_hours_or_near(&cal, at("2024-12-02 09:30:00"), 1).unwrap());
        assert!(is_market_hours_or_near(&cal, at("2024-12-02 12:00:00"), 1).unwrap());
        assert!(is_market_hours_or_near(&cal, at("2024-12-02 16:00:00"), 0).unwrap());
    }

    #[test]
    fn test_pre_market_boundary() {
        let cal = open_calendar();
        assert!(is_market_hours_or_near(&cal, at("2024-12-02 08:30:00"), 1).unwrap());
        assert!(!is_market_hours_or_near(&cal, at("2024-12-02 08:29:59"), 1).unwrap());
    }

    #[test]
    fn test_post_market_boundary() {
        let cal = open_calendar();
        assert!(is_market_hours_or_near(&cal, at("2024-12-02 17:00:00"), 1).unwrap());
        assert!(!is_market_hours_or_near(&cal, at("2024-12-02 17:00:01"), 1).unwrap());
    }

    #[test]
    fn test_zero_buffer() {
        let cal = open_calendar();
        assert!(!is_market_hours_or_near(&cal, at("2024-12-02 09:29:59"), 0).unwrap());
        assert!(!is_market_hours_or_near(&cal, at("2024-12-02 16:00:01"), 0).unwrap());
    }

    #[test]
    fn test_wider_buffer() {
        let cal = open_calendar();
        assert!(is_market_hours_or_near(&cal, at("2024-12-02 06:30:00"), 3).unwrap());
        assert!(is_market_hours_or_near(&cal, at("2024-12-02 19:00:00"), 3).unwrap());
        assert!(!is_market_hours_or_near(&cal, at("2024-12-02 19:00:01"), 3).unwrap());
    }

    #[test]
    fn test_closed_date_ignores_buffer() {
        let closed = NaiveDate::from_ymd_opt(2024, 12, 7).unwrap();
        let cal = FixedCalendar {
            closed: vec![closed],
        };
        assert!(!is_market_hours_or_near(&cal, at("2024-12-07 12:00:00"), 1).unwrap());
        assert!(!is_market_hours_or_near(&cal, at("2024-12-07 12:00:00"), 24).unwrap());
    }

    #[test]
    fn test_aware_time_converted_before_check() {
        let cal = open_calendar();
        // 13:45 UTC = 08:45 New York (EST)
        let t: MessageTime = chrono::DateTime::parse_from_rfc3339("2024-12-02T13:45:00Z")
            .unwrap()
            .into();
        assert!(is_market_hours_or_near(&cal, t, 1).unwrap());
        // 22:00 UTC = 17:00 New York, 22:00:01 just past the window
        let t: MessageTime = chrono::DateTime::parse_from_rfc3339("2024-12-02T22:00:01Z")
            .unwrap()
            .into();
        assert!(!is_market_hours_or_near(&cal, t, 1).unwrap());
    }

    #[test]
    fn test_huge_buffer_does_not_overflow() {
        let cal = open_calendar();
        assert!(is_market_hours_or_near(&cal, at("2024-12-02 20:00:00"), u32::MAX).unwrap());
        assert!(is_market_hours_or_near(&cal, at("2024-12-02 00:00:01"), u32::MAX).unwrap());
        assert!(
            is_market_hours_or_near(&crate::NyseCalendar, at("2024-12-02 20:00:00"), u32::MAX)
                .unwrap()
        );

        let closed = FixedCalendar {
            closed: vec![NaiveDate::from_ymd_opt(2024, 12, 7).unwrap()],
        };
        assert!(!is_market_hours_or_near(&closed, at("2024-12-07 12:00:00"), u32::MAX).unwrap());
    }

    #[test]
    fn test_calendar_failure_propagates() {
        let err = is_market_hours_or_near(&BrokenCalendar, at("2024-12-02 12:00:00"), 1);
        assert!(matches!(err, Err(CalendarError::Unavailable(_))));
    }

    #[test]
    fn test_gate_uses_buffer() {
        let gate = MarketGate::new(open_calendar(), 2);
        assert_eq!(gate.buffer_hours(), 2);
        assert!(gate.admits(at("2024-12-02 07:30:00")).unwrap());
        assert!(!gate.admits(at("2024-12-02 07:29:00")).unwrap());
    }
}
