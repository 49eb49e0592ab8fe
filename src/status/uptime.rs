//! Status-string parsing.
//!
//! Gateways, boxes and SMSC links all report a free-text status that carries
//! a state and an uptime in one of two shapes:
//!
//! - `"online 379990s"`: state followed by a plain seconds count
//! - `"running, uptime 2d 3h 4m 5s"` or `"on-line 2d 3h 4m 5s"`: labelled components
//!
//! Anything else parses to [`StatusLine::Unrecognized`], which renders as `-`.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Duration as ChronoDuration, Local, Utc};
use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

const PLACEHOLDER: &str = "-";

/// An uptime split into days, hours, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Uptime {
    total_seconds: u64,
}

impl Uptime {
    pub fn from_seconds(total_seconds: u64) -> Self {
        Self { total_seconds }
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    pub fn days(&self) -> u64 {
        self.total_seconds / 86_400
    }

    pub fn hours(&self) -> u64 {
        self.total_seconds % 86_400 / 3_600
    }

    pub fn minutes(&self) -> u64 {
        self.total_seconds % 3_600 / 60
    }

    pub fn seconds(&self) -> u64 {
        self.total_seconds % 60
    }
}

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d {:02}:{:02}:{:02}",
            self.days(),
            self.hours(),
            self.minutes(),
            self.seconds()
        )
    }
}

/// The parsed form of a status string.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StatusLine {
    Parsed {
        state: String,
        started_at: DateTime<Utc>,
        uptime: Uptime,
    },
    /// Neither grammar matched, or there was no status at all.
    #[default]
    Unrecognized,
}

impl StatusLine {
    pub fn state(&self) -> &str {
        match self {
            StatusLine::Parsed { state, .. } => state,
            StatusLine::Unrecognized => PLACEHOLDER,
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            StatusLine::Parsed { started_at, .. } => Some(*started_at),
            StatusLine::Unrecognized => None,
        }
    }

    pub fn uptime(&self) -> Option<Uptime> {
        match self {
            StatusLine::Parsed { uptime, .. } => Some(*uptime),
            StatusLine::Unrecognized => None,
        }
    }

    /// Start time in server-local time, `YYYY-MM-DD HH:MM:SS`, or `-`.
    pub fn started_display(&self) -> String {
        self.started_at()
            .map(|t| {
                t.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    pub fn uptime_display(&self) -> String {
        self.uptime()
            .map(|u| u.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }
}

impl Serialize for StatusLine {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("StatusLine", 4)?;
        s.serialize_field("state", self.state())?;
        s.serialize_field("started_at", &self.started_at())?;
        s.serialize_field("uptime", &self.uptime_display())?;
        s.serialize_field("uptime_seconds", &self.uptime().map(|u| u.total_seconds()))?;
        s.end()
    }
}

/// Parse a status string against the current clock.
///
/// Normalization reads the clock once per document and goes through
/// [`parse_status_string_at`] instead.
#[cfg(test)]
pub fn parse_status_string(s: &str) -> StatusLine {
    parse_status_string_at(s, Utc::now())
}

/// Parse a status string, computing the start time relative to `now`.
pub fn parse_status_string_at(s: &str, now: DateTime<Utc>) -> StatusLine {
    let s = s.trim();
    let parsed = parse_seconds_form(s).or_else(|| parse_labelled_form(s));

    match parsed {
        Some((state, total_seconds)) => StatusLine::Parsed {
            state,
            started_at: started_at(now, total_seconds),
            uptime: Uptime::from_seconds(total_seconds),
        },
        None => StatusLine::Unrecognized,
    }
}

fn started_at(now: DateTime<Utc>, total_seconds: u64) -> DateTime<Utc> {
    i64::try_from(total_seconds)
        .ok()
        .and_then(ChronoDuration::try_seconds)
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// `"<state> <N>s"`
fn parse_seconds_form(s: &str) -> Option<(String, u64)> {
    static SECONDS_RE: OnceLock<Regex> = OnceLock::new();
    let re = SECONDS_RE.get_or_init(|| Regex::new(r"^(?P<state>.*) (?P<secs>\d+)s$").unwrap());

    // A trailing "Ns" after other labelled components is the labelled form.
    static LABEL_TAIL_RE: OnceLock<Regex> = OnceLock::new();
    let label_tail =
        LABEL_TAIL_RE.get_or_init(|| Regex::new(r"(?:^|\s)(?:\d+[dhm]|uptime)$").unwrap());

    let caps = re.captures(s)?;
    let state = caps.name("state")?.as_str();
    if label_tail.is_match(state) {
        return None;
    }
    let secs = caps.name("secs")?.as_str().parse::<u64>().ok()?;
    Some((state.to_string(), secs))
}

/// `"<state>, uptime <D>d <H>h <M>m <S>s"` or `"<state> <D>d <H>h <M>m <S>s"`
fn parse_labelled_form(s: &str) -> Option<(String, u64)> {
    static LABELLED_RE: OnceLock<Regex> = OnceLock::new();
    let re = LABELLED_RE.get_or_init(|| {
        Regex::new(r"^(?P<state>.*?),?\s+(?:uptime\s+)?(?P<parts>\d+[dhms](?:\s+\d+[dhms])*)$")
            .unwrap()
    });

    let caps = re.captures(s)?;
    let state = caps.name("state")?.as_str();
    let total = sum_components(caps.name("parts")?.as_str())?;
    Some((state.to_string(), total))
}

/// Sum `Nd Nh Nm Ns` components; units must appear once each, in order.
fn sum_components(parts: &str) -> Option<u64> {
    const UNITS: [(char, u64); 4] = [('d', 86_400), ('h', 3_600), ('m', 60), ('s', 1)];

    let mut next_unit = 0;
    let mut total: u64 = 0;
    for token in parts.split_whitespace() {
        let unit = token.chars().last()?;
        let value = token[..token.len() - 1].parse::<u64>().ok()?;
        let pos = UNITS[next_unit..].iter().position(|(u, _)| *u == unit)?;
        let (_, weight) = UNITS[next_unit + pos];
        total = total.checked_add(value.checked_mul(weight)?)?;
        next_unit += pos + 1;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_seconds_form() {
        let line = parse_status_string_at("online 379990s", now());
        assert_eq!(line.state(), "online");

        let uptime = line.uptime().unwrap();
        assert_eq!(uptime.total_seconds(), 379_990);
        assert_eq!(uptime.to_string(), "4d 09:33:10");
        assert_eq!(
            line.started_at().unwrap(),
            now() - ChronoDuration::seconds(379_990)
        );
    }

    #[test]
    fn test_seconds_form_against_clock() {
        let before = Utc::now();
        let line = parse_status_string("online 60s");
        let after = Utc::now();

        let started = line.started_at().unwrap();
        assert!(started >= before - ChronoDuration::seconds(60));
        assert!(started <= after - ChronoDuration::seconds(60));
    }

    #[test]
    fn test_multi_word_state() {
        let line = parse_status_string_at("re-connecting soon 12s", now());
        assert_eq!(line.state(), "re-connecting soon");
        assert_eq!(line.uptime_display(), "0d 00:00:12");
    }

    #[test]
    fn test_labelled_form_with_uptime_keyword() {
        let line = parse_status_string_at("online, uptime 2d 3h 4m 5s", now());
        assert_eq!(line.state(), "online");
        assert_eq!(line.uptime_display(), "2d 03:04:05");
        assert_eq!(
            line.started_at().unwrap(),
            now() - ChronoDuration::seconds(2 * 86_400 + 3 * 3_600 + 4 * 60 + 5)
        );
    }

    #[test]
    fn test_labelled_form_without_keyword() {
        let line = parse_status_string_at("on-line 0d 0h 1m 16s", now());
        assert_eq!(line.state(), "on-line");
        assert_eq!(line.uptime().unwrap().total_seconds(), 76);
    }

    #[test]
    fn test_labelled_form_missing_components() {
        let line = parse_status_string_at("running, uptime 1d 5m", now());
        assert_eq!(line.state(), "running");
        assert_eq!(line.uptime_display(), "1d 00:05:00");

        let line = parse_status_string_at("running, uptime 9s", now());
        assert_eq!(line.state(), "running");
        assert_eq!(line.uptime_display(), "0d 00:00:09");
    }

    #[test]
    fn test_unrecognized() {
        let line = parse_status_string_at("garbage-text", now());
        assert_eq!(line, StatusLine::Unrecognized);
        assert_eq!(line.state(), "-");
        assert_eq!(line.started_display(), "-");
        assert_eq!(line.uptime_display(), "-");

        assert_eq!(parse_status_string_at("", now()), StatusLine::Unrecognized);
        assert_eq!(parse_status_string_at("online", now()), StatusLine::Unrecognized);
        assert_eq!(
            parse_status_string_at("online 5s 4m", now()),
            StatusLine::Unrecognized
        );
    }

    #[test]
    fn test_uptime_components() {
        let uptime = Uptime::from_seconds(90_061);
        assert_eq!(uptime.days(), 1);
        assert_eq!(uptime.hours(), 1);
        assert_eq!(uptime.minutes(), 1);
        assert_eq!(uptime.seconds(), 1);
    }
}
