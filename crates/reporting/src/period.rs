use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// A closed time window `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Period {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        if from <= to {
            Self { from, to }
        } else {
            Self { from: to, to: from }
        }
    }

    /// From the first instant of `from` to the last instant of `to`.
    pub fn from_dates(from: NaiveDate, to: NaiveDate) -> Self {
        Self::new(start_of_day(from), end_of_day(to))
    }

    /// The first day of the month containing `now`, up to `now`.
    pub fn month_to_date(now: DateTime<Utc>) -> Self {
        Self::new(start_of_day(first_of_month(now.date_naive())), now)
    }

    /// The `days` days ending at `now`.
    pub fn trailing_days(now: DateTime<Utc>, days: i64) -> Self {
        let from = now
            .checked_sub_signed(Duration::days(days))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self::new(from, now)
    }

    /// The calendar month before the one containing `now`.
    pub fn previous_month(now: DateTime<Utc>) -> Self {
        let this_month = first_of_month(now.date_naive());
        let last_day = this_month.pred_opt().unwrap_or(this_month);
        Self::from_dates(first_of_month(last_day), last_day)
    }

    /// The window of equal length that ends just before this one starts.
    /// `None` when that window would fall outside the representable range.
    pub fn preceding(&self) -> Option<Self> {
        let length = self.to - self.from;
        let to = self.from.checked_sub_signed(Duration::seconds(1))?;
        let from = to.checked_sub_signed(length)?;
        Some(Self::new(from, to))
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.to.date_naive();
        self.from
            .date_naive()
            .iter_days()
            .take_while(move |d| *d <= end)
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    match date.and_hms_opt(23, 59, 59) {
        Some(last) => Utc.from_utc_datetime(&last),
        None => start_of_day(date),
    }
}

/// Used by bucketed reports.
pub(crate) fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    (start_of_day(date), end_of_day(date))
}
