use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Month names indexed by 0-based month, used for annual-cycle x axes
/// and time-of-year labels.
pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Season names indexed by 0-based season. Winter is December through
/// February, with December belonging to the following winter.
pub const SEASONS: [&str; 4] = ["Winter-DJF", "Spring-MAM", "Summer-JJA", "Fall-SON"];

/// Errors raised by time-index parsing and bucketing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("inconsistent time resolution: {0} data points is not monthly, seasonal, or yearly")]
    InconsistentResolution(usize),
    #[error("time index {index} is out of range for {timescale} data")]
    IndexOutOfRange { timescale: Timescale, index: u32 },
    #[error("malformed time key: {0}")]
    MalformedKey(String),
    #[error("unrecognized timescale: {0}")]
    UnknownTimescale(String),
    #[error("unparseable timestamp: {0}")]
    BadTimestamp(String),
}

/// The temporal resolution of a dataset: one value per month, per season,
/// or per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timescale {
    Monthly,
    Seasonal,
    Yearly,
}

impl Timescale {
    /// Number of buckets in one representative year at this resolution.
    pub fn buckets(&self) -> usize {
        match self {
            Timescale::Monthly => 12,
            Timescale::Seasonal => 4,
            Timescale::Yearly => 1,
        }
    }
}

impl fmt::Display for Timescale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Timescale::Monthly => "monthly",
            Timescale::Seasonal => "seasonal",
            Timescale::Yearly => "yearly",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Timescale {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Timescale::Monthly),
            "seasonal" => Ok(Timescale::Seasonal),
            "yearly" => Ok(Timescale::Yearly),
            other => Err(TimeError::UnknownTimescale(other.to_string())),
        }
    }
}

/// Classify a payload by its point count: 12 points is monthly data,
/// 4 seasonal, 1 yearly. Anything else, 17 included (a known malformed
/// concatenation of all three), is rejected.
pub fn resolution_of(n_points: usize) -> Result<Timescale, TimeError> {
    match n_points {
        12 => Ok(Timescale::Monthly),
        4 => Ok(Timescale::Seasonal),
        1 => Ok(Timescale::Yearly),
        n => Err(TimeError::InconsistentResolution(n)),
    }
}

/// A typed time-index key: which bucket of a dataset's representative
/// year (or which year of a nominal series) is being addressed.
///
/// The UI-facing wire encoding is the JSON string
/// `{"timescale":"monthly","timeidx":"0"}` with `timeidx` carried as a
/// decimal string. [`TimeKey::encode`] and [`TimeKey::decode`] preserve
/// that encoding byte-for-byte so stored links keep resolving; nothing
/// else in the workspace touches the string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeKey {
    pub timescale: Timescale,
    pub time_idx: u32,
}

#[derive(Serialize, Deserialize)]
struct WireTimeKey {
    timescale: String,
    timeidx: String,
}

impl TimeKey {
    /// Create a key, rejecting indices past the bucket count for monthly
    /// and seasonal data. Yearly indices are unbounded (nominal series
    /// address one index per year).
    pub fn new(timescale: Timescale, time_idx: u32) -> Result<Self, TimeError> {
        match timescale {
            Timescale::Monthly if time_idx >= 12 => {
                Err(TimeError::IndexOutOfRange { timescale, index: time_idx })
            }
            Timescale::Seasonal if time_idx >= 4 => {
                Err(TimeError::IndexOutOfRange { timescale, index: time_idx })
            }
            _ => Ok(TimeKey { timescale, time_idx }),
        }
    }

    /// The canonical default key for a timescale: January, Winter, or the
    /// first year.
    pub fn origin(timescale: Timescale) -> Self {
        TimeKey { timescale, time_idx: 0 }
    }

    /// True for January / Winter / first-year keys.
    pub fn is_origin(&self) -> bool {
        self.time_idx == 0
    }

    /// Serialize to the external wire encoding. Field order and the
    /// decimal-string index are fixed.
    pub fn encode(&self) -> String {
        format!(
            "{{\"timescale\":\"{}\",\"timeidx\":\"{}\"}}",
            self.timescale, self.time_idx
        )
    }

    /// Parse the external wire encoding. The index must be a plain
    /// non-negative decimal integer; `"-1"` and `"1.5"` are rejected.
    pub fn decode(s: &str) -> Result<Self, TimeError> {
        let wire: WireTimeKey =
            serde_json::from_str(s).map_err(|e| TimeError::MalformedKey(e.to_string()))?;
        let timescale = wire.timescale.parse::<Timescale>()?;
        if wire.timeidx.is_empty() || !wire.timeidx.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TimeError::MalformedKey(format!(
                "timeidx is not a non-negative integer: {}",
                wire.timeidx
            )));
        }
        let time_idx = wire
            .timeidx
            .parse::<u32>()
            .map_err(|e| TimeError::MalformedKey(e.to_string()))?;
        TimeKey::new(timescale, time_idx)
    }

    /// Human-readable time-of-year label: `"January"`, `"Winter-DJF"`,
    /// `"Annual"`.
    pub fn label(&self) -> Result<String, TimeError> {
        time_of_year(self.timescale, self.time_idx)
    }
}

/// Time-of-year label for a (timescale, index) pair.
pub fn time_of_year(timescale: Timescale, index: u32) -> Result<String, TimeError> {
    match timescale {
        Timescale::Monthly => MONTHS
            .get(index as usize)
            .map(|m| m.to_string())
            .ok_or(TimeError::IndexOutOfRange { timescale, index }),
        Timescale::Seasonal => SEASONS
            .get(index as usize)
            .map(|s| s.to_string())
            .ok_or(TimeError::IndexOutOfRange { timescale, index }),
        Timescale::Yearly => Ok("Annual".to_string()),
    }
}

/// Parse a backend timestamp. The backend emits ISO datetimes with or
/// without a trailing `Z`, and occasionally bare dates.
pub fn parse_timestamp(ts: &str) -> Result<NaiveDate, TimeError> {
    for fmt in ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(ts, fmt) {
            return Ok(dt.date());
        }
    }
    NaiveDate::parse_from_str(ts, "%Y-%m-%d")
        .map_err(|_| TimeError::BadTimestamp(ts.to_string()))
}

/// The season (0 = winter) a 0-based month belongs to. December counts
/// toward the following winter.
pub fn season_of_month(month0: u32) -> u32 {
    match month0 {
        11 | 0 | 1 => 0,
        2..=4 => 1,
        5..=7 => 2,
        _ => 3,
    }
}

/// Bucket a timestamp into the time index appropriate for its timescale.
pub fn timestamp_to_time_key(ts: &str, timescale: Timescale) -> Result<TimeKey, TimeError> {
    let date = parse_timestamp(ts)?;
    let month0 = date.month0();
    let idx = match timescale {
        Timescale::Monthly => month0,
        Timescale::Seasonal => season_of_month(month0),
        Timescale::Yearly => 0,
    };
    TimeKey::new(timescale, idx)
}

/// Time-of-year label for a timestamp at a given timescale, as used in
/// export summaries and filenames.
pub fn timestamp_to_time_of_year(ts: &str, timescale: Timescale) -> Result<String, TimeError> {
    let key = timestamp_to_time_key(ts, timescale)?;
    key.label()
}
