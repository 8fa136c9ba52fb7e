use billing_client::domain::{InvalidKey, InvoiceKey};
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Half-open instant range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

/// A calendar month on the facility-local clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BillingPeriod {
    year: i32,
    month: Month,
}

impl BillingPeriod {
    pub fn new(year: i32, month: i32) -> Result<Self, InvalidKey> {
        if !(2000..=2100).contains(&year) {
            return Err(InvalidKey::Year(year));
        }
        let month = u8::try_from(month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .ok_or(InvalidKey::Month(month))?;
        Ok(Self { year, month })
    }

    pub fn of_key(key: &InvoiceKey) -> Result<Self, InvalidKey> {
        Self::new(key.period_year, key.period_month)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> i32 {
        i32::from(u8::from(self.month))
    }

    pub fn first_day(&self) -> Date {
        // Day 1 exists in every month and the year is range-checked.
        Date::from_calendar_date(self.year, self.month, 1).unwrap_or(Date::MIN)
    }

    pub fn last_day(&self) -> Date {
        Date::from_calendar_date(self.year, self.month, self.month.length(self.year)).unwrap_or(Date::MIN)
    }

    pub fn next(&self) -> Self {
        match self.month {
            Month::December => Self {
                year: self.year + 1,
                month: Month::January,
            },
            m => Self {
                year: self.year,
                month: m.next(),
            },
        }
    }

    /// The instants covered by this month when months start at local midnight.
    pub fn time_range(&self, offset: UtcOffset) -> TimeRange {
        let at_midnight = |date: Date| PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_offset(offset);
        TimeRange {
            start: at_midnight(self.first_day()),
            end: at_midnight(self.next().first_day()),
        }
    }

    /// Number of hours in the month, for coverage checks on fetched series.
    pub fn hours(&self) -> usize {
        usize::from(self.month.length(self.year)) * 24
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime, offset};

    use super::*;

    #[test]
    fn month_range_is_cut_at_local_midnight() {
        let period = BillingPeriod::new(2024, 3).unwrap();
        let range = period.time_range(offset!(+3));
        assert_eq!(range.start, datetime!(2024-02-29 21:00 UTC));
        assert_eq!(range.end, datetime!(2024-03-31 21:00 UTC));
    }

    #[test]
    fn december_rolls_into_next_year() {
        let period = BillingPeriod::new(2023, 12).unwrap();
        assert_eq!(period.next(), BillingPeriod::new(2024, 1).unwrap());
        assert_eq!(period.last_day(), date!(2023 - 12 - 31));
    }

    #[test]
    fn leap_february_has_696_hours() {
        let period = BillingPeriod::new(2024, 2).unwrap();
        assert_eq!(period.hours(), 29 * 24);
        assert_eq!(period.last_day(), date!(2024 - 02 - 29));
    }

    #[test]
    fn invalid_months_are_rejected() {
        assert_eq!(BillingPeriod::new(2024, 0), Err(InvalidKey::Month(0)));
        assert_eq!(BillingPeriod::new(2024, 13), Err(InvalidKey::Month(13)));
        assert_eq!(BillingPeriod::new(1999, 5), Err(InvalidKey::Year(1999)));
    }
}
