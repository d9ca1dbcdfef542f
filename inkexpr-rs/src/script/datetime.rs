//! Date and duration text used by the date functions in [`builtins`].
//!
//! Dates are UTC wall-clock strings `YYYY-MM-DD hh:mm:ss`.  The time part
//! may be shortened to `hh:mm` or left out entirely (midnight), and fields
//! need not be zero-padded.  Durations accept either the stopwatch form
//! `D:HH:MM:SS` (leading fields optional) or unit-suffixed terms such as
//! `2h5m` and `1d 30s`; a bare number is seconds.
//!
//! [`builtins`]: super::builtins

use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Parse a date string.  `None` when it is not a date.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Render a date the way [`parse_date`] reads it back, e.g.
/// `2021-12-10 01:02:03`.
pub fn format_date(date: &NaiveDateTime) -> String {
    date.format("%Y-%-m-%-d %H:%M:%S").to_string()
}

/// The current UTC time.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// `date` moved by `seconds`, or `None` past chrono's representable range.
pub fn add_seconds(date: &NaiveDateTime, seconds: i64) -> Option<NaiveDateTime> {
    date.checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

/// Whole seconds from `now` until `target`, 0 once `target` has passed.
pub fn seconds_until(target: &NaiveDateTime, now: &NaiveDateTime) -> i64 {
    (*target - *now).num_seconds().max(0)
}

// ── Durations ─────────────────────────────────────────────────────────────────

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn at_end(&self) -> bool {
        self.rest.is_empty()
    }

    /// Optional whitespace, optional sign, digits.  0 when there are none.
    fn int(&mut self) -> i64 {
        self.rest = self.rest.trim_start();
        let (neg, body) = match self.rest.strip_prefix('-') {
            Some(body) => (true, body),
            None => (false, self.rest.strip_prefix('+').unwrap_or(self.rest)),
        };
        let len = body.find(|c: char| !c.is_ascii_digit()).unwrap_or(body.len());
        let n = body[..len].bytes().fold(0i64, |acc, b| {
            acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
        });
        self.rest = &body[len..];
        if neg {
            -n
        } else {
            n
        }
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.rest.chars().next()?;
        self.rest = &self.rest[c.len_utf8()..];
        Some(c)
    }

    fn skip(&mut self, want: char) -> bool {
        match self.rest.strip_prefix(want) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }
}

/// Parse a duration to seconds.  Unrecognised unit letters are ignored.
pub fn parse_delta(text: &str) -> i64 {
    let mut cur = Cursor { rest: text.trim() };
    let mut total = 0i64;

    let colons = text.matches(':').count();
    if colons > 0 {
        let units = [DAY, HOUR, MINUTE, 1];
        let fields = (colons + 1).min(units.len());
        for (i, unit) in units[units.len() - fields..].iter().enumerate() {
            if i > 0 && !cur.skip(':') {
                return total;
            }
            total = total.saturating_add(cur.int().saturating_mul(*unit));
        }
    }

    while !cur.at_end() {
        let value = cur.int();
        let unit = match cur.next_char() {
            Some('d' | 'D') => DAY,
            Some('h' | 'H') => HOUR,
            Some('m' | 'M') => MINUTE,
            Some('s' | 'S') | None => 1,
            Some(_) => continue,
        };
        total = total.saturating_add(value.saturating_mul(unit));
    }
    total
}

/// Format seconds as `[-][Dd ][HHh ]MMm[ SSs]`.  Days and hours are left out
/// when zero; seconds when `hide_seconds` is set.
pub fn format_letters(seconds: i64, hide_seconds: bool) -> String {
    let total = seconds.unsigned_abs();
    let (day, hour, minute) = (DAY as u64, HOUR as u64, MINUTE as u64);
    let days = total / day;
    let hours = total % day / hour;
    let minutes = total % hour / minute;
    let secs = total % minute;

    let mut out = String::new();
    if seconds < 0 {
        out.push('-');
    }
    if days > 0 {
        out.push_str(&format!("{days}d "));
    }
    if hours > 0 {
        out.push_str(&format!("{hours:02}h "));
    }
    out.push_str(&format!("{minutes:02}m"));
    if !hide_seconds {
        out.push_str(&format!(" {secs:02}s"));
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
