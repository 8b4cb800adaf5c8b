use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// An optimistic-lock version marker: a counter or a timestamp.
///
/// Both forms normalize to an integer so they can be compared and printed the
/// same way. Timestamps become milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "i64")]
pub enum LockVersion {
    Number(i64),
    Timestamp(DateTime<Utc>),
}

impl LockVersion {
    pub fn as_millis(&self) -> i64 {
        match self {
            Self::Number(n) => *n,
            Self::Timestamp(ts) => ts.timestamp_millis(),
        }
    }
}

impl From<LockVersion> for i64 {
    fn from(version: LockVersion) -> Self {
        version.as_millis()
    }
}

impl From<i64> for LockVersion {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for LockVersion {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<u32> for LockVersion {
    fn from(n: u32) -> Self {
        Self::Number(n.into())
    }
}

impl From<DateTime<Utc>> for LockVersion {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

/// Times outside chrono's range keep only their saturated millisecond value.
impl From<SystemTime> for LockVersion {
    fn from(ts: SystemTime) -> Self {
        let ms = epoch_millis(ts);
        DateTime::<Utc>::from_timestamp_millis(ms).map_or(Self::Number(ms), Self::Timestamp)
    }
}

/// Milliseconds since the epoch, floored like `DateTime::timestamp_millis`.
fn epoch_millis(ts: SystemTime) -> i64 {
    match ts.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
        Err(before) => {
            let before = before.duration();
            let mut ms = before.as_millis();
            if before.subsec_nanos() % 1_000_000 != 0 {
                ms += 1;
            }
            i64::try_from(ms).map(|ms| -ms).unwrap_or(i64::MIN)
        }
    }
}

impl fmt::Display for LockVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_millis())
    }
}
