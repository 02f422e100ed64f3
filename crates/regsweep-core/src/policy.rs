//! Retention policy configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of images retained per group.
pub const DEFAULT_KEEP_COUNT: usize = 3;

/// Which recency source orders a group.
///
/// When the preferred source is absent for a record, the other one is the
/// fallback. A record with neither cannot be ordered and fails planning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecencyPolicy {
    /// The timestamp embedded in the tag is authoritative.
    #[default]
    TagTimestamp,
    /// The registry-reported push time is authoritative.
    PushTime,
}

impl RecencyPolicy {
    /// Picks the recency marker for one record under this policy.
    #[must_use]
    pub fn recency_of(
        self,
        tag_timestamp: Option<DateTime<Utc>>,
        pushed_at: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        match self {
            Self::TagTimestamp => tag_timestamp.or(pushed_at),
            Self::PushTime => pushed_at.or(tag_timestamp),
        }
    }

    /// Returns true when this policy consults the registry push time first,
    /// so listings should resolve creation times up front.
    #[must_use]
    pub const fn needs_push_time(self) -> bool {
        matches!(self, Self::PushTime)
    }
}

impl<'de> Deserialize<'de> for RecencyPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for RecencyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tag-timestamp" | "tag_timestamp" => Ok(Self::TagTimestamp),
            "push-time" | "push_time" => Ok(Self::PushTime),
            _ => Err(format!(
                "unknown recency policy `{s}`, expected `tag-timestamp` or `push-time`"
            )),
        }
    }
}

impl std::fmt::Display for RecencyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TagTimestamp => write!(f, "tag-timestamp"),
            Self::PushTime => write!(f, "push-time"),
        }
    }
}

/// Retention policy: how many images each group keeps and what "newest"
/// means.
///
/// An explicit immutable value passed into the planner at call time, not
/// process-wide state, so multiple policies can coexist in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Keep the newest N images in every group. Zero is a valid
    /// configuration and empties every group.
    pub keep_count: usize,
    /// Recency source used to order each group.
    pub recency: RecencyPolicy,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep_count: DEFAULT_KEEP_COUNT,
            recency: RecencyPolicy::default(),
        }
    }
}

impl RetentionPolicy {
    /// Creates a policy keeping `keep_count` images under the default
    /// recency order.
    #[must_use]
    pub fn keep(keep_count: usize) -> Self {
        Self {
            keep_count,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_tag_timestamp_precedence() {
        let policy = RecencyPolicy::TagTimestamp;
        assert_eq!(policy.recency_of(Some(ts(1)), Some(ts(2))), Some(ts(1)));
        assert_eq!(policy.recency_of(None, Some(ts(2))), Some(ts(2)));
        assert_eq!(policy.recency_of(None, None), None);
    }

    #[test]
    fn test_push_time_precedence() {
        let policy = RecencyPolicy::PushTime;
        assert_eq!(policy.recency_of(Some(ts(1)), Some(ts(2))), Some(ts(2)));
        assert_eq!(policy.recency_of(Some(ts(1)), None), Some(ts(1)));
    }

    #[test]
    fn test_recency_policy_from_str() {
        assert_eq!(
            "tag-timestamp".parse::<RecencyPolicy>().unwrap(),
            RecencyPolicy::TagTimestamp
        );
        assert_eq!(
            "push-time".parse::<RecencyPolicy>().unwrap(),
            RecencyPolicy::PushTime
        );
        assert!("newest".parse::<RecencyPolicy>().is_err());
    }

    #[test]
    fn test_defaults() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.keep_count, DEFAULT_KEEP_COUNT);
        assert_eq!(policy.recency, RecencyPolicy::TagTimestamp);
    }
}
