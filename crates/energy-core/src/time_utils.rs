use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};

// ── TimestampParser ───────────────────────────────────────────────────────────

/// Parses meter timestamps from the formats found in building CSV exports.
///
/// Timestamps stay in the wall-clock time of the export. An explicit UTC
/// offset is accepted but dropped; no zone conversion is ever applied.
pub struct TimestampParser;

impl TimestampParser {
    /// Date-time patterns tried in order after RFC 3339.
    const DATETIME_FORMATS: &'static [&'static str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ];

    /// Date-only patterns; the reading is placed at midnight.
    const DATE_FORMATS: &'static [&'static str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

    /// Parse a single timestamp cell. Returns `None` for blank or unrecognised
    /// values.
    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        // Accept a trailing 'Z' the same way as '+00:00'.
        let normalised = match s.strip_suffix('Z') {
            Some(stripped) => format!("{}+00:00", stripped),
            None => s.to_string(),
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.naive_local());
        }

        for fmt in Self::DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(naive);
            }
        }

        for fmt in Self::DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return date.and_hms_opt(0, 0, 0);
            }
        }

        None
    }
}

// ── Buckets ───────────────────────────────────────────────────────────────────

/// Calendar granularity used to resample readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
    /// One bucket per calendar day, boundary at midnight.
    Daily,
    /// One bucket per ISO week (Monday to Sunday), labelled by its Sunday.
    Weekly,
}

impl BucketKind {
    /// First day of the bucket containing `date`.
    pub fn bucket_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            BucketKind::Daily => date,
            BucketKind::Weekly => week_start(date),
        }
    }

    /// Last day (inclusive) of the bucket starting at `start`.
    pub fn bucket_end(self, start: NaiveDate) -> NaiveDate {
        match self {
            BucketKind::Daily => start,
            BucketKind::Weekly => start + Days::new(6),
        }
    }

    /// Label used as the period key: the day itself, or the week's Sunday.
    pub fn label(self, start: NaiveDate) -> NaiveDate {
        self.bucket_end(start)
    }

    /// Start of the bucket following the one that starts at `start`.
    pub fn next_start(self, start: NaiveDate) -> NaiveDate {
        self.bucket_end(start) + Days::new(1)
    }
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// Every bucket start between the buckets of `first` and `last`, inclusive.
///
/// Returns an empty list when `last` precedes `first`.
pub fn bucket_starts(kind: BucketKind, first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let end = kind.bucket_start(last);
    let mut current = kind.bucket_start(first);
    let mut starts = Vec::new();
    while current <= end {
        starts.push(current);
        current = kind.next_start(current);
    }
    starts
}

// ── Tests ─────────────────────────────────────────────────────────────────────
