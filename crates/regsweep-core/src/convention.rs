//! Tag naming conventions.
//!
//! A [`TagConvention`] is a pluggable policy mapping raw tag strings to
//! structured fields. The convention is injected into the planner, never
//! hard-coded: swapping the pattern changes which tags conform and how they
//! group, without touching any retention logic.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::error::ConventionError;

/// Capture group carrying the project identifier. Required.
pub const GROUP_PROJECT: &str = "project";
/// Capture group carrying the environment (e.g. prod, staging). Required.
pub const GROUP_ENVIRONMENT: &str = "environment";
/// Capture group carrying the client identifier. Optional.
pub const GROUP_CLIENT: &str = "client";
/// Capture group carrying a short build revision. Optional.
pub const GROUP_REVISION: &str = "revision";
/// Capture group carrying the build timestamp. Optional.
pub const GROUP_TIMESTAMP: &str = "timestamp";

/// Layout of the timestamp embedded in conforming tags.
const TAG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Default convention:
/// `{project}-{revision}-{timestamp}[-{client}]-{environment}`, where the
/// revision is a 7-character hex hash and the timestamp uses
/// `%Y-%m-%d-%H-%M-%S` (e.g. `shop-3f2a91c-2024-06-01-12-30-00-acme-prod`).
pub const DEFAULT_PATTERN: &str = concat!(
    r"^(?P<project>.+?)-",
    r"(?P<revision>[a-f0-9]{7})-",
    r"(?P<timestamp>\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2})",
    r"(?:-(?P<client>.+?))?-",
    r"(?P<environment>[a-zA-Z]+)$",
);

/// Structured fields extracted from a conforming tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagFields {
    /// Project identifier.
    pub project: String,
    /// Client identifier. Empty when the tag carries no client; the empty
    /// string is an explicit sentinel so every conforming tag belongs to
    /// exactly one group.
    pub client: String,
    /// Environment identifier.
    pub environment: String,
    /// Short build revision, when the convention captures one.
    pub revision: Option<String>,
    /// Build timestamp embedded in the tag, when the convention captures one.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Why a tag was rejected by the convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    /// The tag does not match the convention pattern.
    NoMatch,
    /// The pattern matched but a required field did not participate.
    MissingField(&'static str),
    /// The embedded timestamp has the right shape but is not a real date.
    InvalidTimestamp(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoMatch => write!(f, "does not match the convention"),
            Self::MissingField(name) => write!(f, "missing required field `{name}`"),
            Self::InvalidTimestamp(raw) => write!(f, "invalid timestamp `{raw}`"),
        }
    }
}

/// A tag the convention rejected. Reported for operator review, excluded
/// from grouping, never deleted automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedTag {
    /// The original tag string.
    pub tag: String,
    /// Why it was rejected.
    pub reason: RejectReason,
}

/// Outcome of applying a convention to a single tag.
///
/// Non-conformance is an expected, reportable outcome, not an error:
/// parsing never fails, it classifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedTag {
    /// The tag matches the convention.
    Conforming(TagFields),
    /// The tag does not match the convention.
    Rejected(RejectedTag),
}

impl ParsedTag {
    /// Returns the extracted fields for a conforming tag.
    #[must_use]
    pub const fn fields(&self) -> Option<&TagFields> {
        match self {
            Self::Conforming(fields) => Some(fields),
            Self::Rejected(_) => None,
        }
    }

    /// Returns true if the tag matched the convention.
    #[must_use]
    pub const fn is_conforming(&self) -> bool {
        matches!(self, Self::Conforming(_))
    }
}

/// A compiled tag naming convention.
///
/// Built from a regular expression with named capture groups. `project` and
/// `environment` are required; `client`, `revision` and `timestamp` are
/// optional. Parsing is pure: the same tag and the same pattern always
/// produce the same outcome.
#[derive(Debug, Clone)]
pub struct TagConvention {
    pattern: Regex,
}

impl TagConvention {
    /// Compiles a convention from a named-capture pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid regular expression or
    /// lacks the `project` or `environment` capture group.
    pub fn new(pattern: &str) -> Result<Self, ConventionError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| ConventionError::InvalidPattern(e.to_string()))?;

        let names: Vec<&str> = pattern.capture_names().flatten().collect();
        for required in [GROUP_PROJECT, GROUP_ENVIRONMENT] {
            if !names.contains(&required) {
                return Err(ConventionError::MissingGroup(required));
            }
        }

        Ok(Self { pattern })
    }

    /// Returns the pattern the convention was compiled from.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Applies the convention to a single tag.
    ///
    /// Never panics: malformed or empty tags are classified as
    /// [`ParsedTag::Rejected`] with a reason.
    #[must_use]
    pub fn parse(&self, tag: &str) -> ParsedTag {
        let Some(captures) = self.pattern.captures(tag) else {
            return Self::reject(tag, RejectReason::NoMatch);
        };

        let group = |name: &str| captures.name(name).map(|m| m.as_str().to_string());

        // Required groups may still be non-participating in a match when a
        // custom pattern marks them optional. Such tags cannot be grouped.
        let Some(project) = group(GROUP_PROJECT) else {
            return Self::reject(tag, RejectReason::MissingField(GROUP_PROJECT));
        };
        let Some(environment) = group(GROUP_ENVIRONMENT) else {
            return Self::reject(tag, RejectReason::MissingField(GROUP_ENVIRONMENT));
        };

        let timestamp = match group(GROUP_TIMESTAMP) {
            Some(raw) => match NaiveDateTime::parse_from_str(&raw, TAG_TIMESTAMP_FORMAT) {
                Ok(naive) => Some(naive.and_utc()),
                Err(_) => return Self::reject(tag, RejectReason::InvalidTimestamp(raw)),
            },
            None => None,
        };

        ParsedTag::Conforming(TagFields {
            project,
            client: group(GROUP_CLIENT).unwrap_or_default(),
            environment,
            revision: group(GROUP_REVISION),
            timestamp,
        })
    }

    fn reject(tag: &str, reason: RejectReason) -> ParsedTag {
        ParsedTag::Rejected(RejectedTag {
            tag: tag.to_string(),
            reason,
        })
    }
}

impl Default for TagConvention {
    /// The convention of the original deployment pipeline.
    ///
    /// # Panics
    ///
    /// Never panics: [`DEFAULT_PATTERN`] is a valid convention.
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN).expect("default pattern is a valid convention")
    }
}
