//! Retention planning: group, order, partition.
//!
//! [`plan_retention`] is the single pipeline entry point: it applies a
//! [`TagConvention`] to a registry listing, buckets conforming tags into
//! groups, ranks each group newest-first and splits it at the policy's keep
//! count. The computed [`RetentionPlan`] is the only thing a deletion
//! collaborator may act on; computing it has no side effects.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::convention::{ParsedTag, RejectedTag, TagConvention};
use crate::error::PlanError;
use crate::policy::RetentionPolicy;

/// One entry of a registry listing: the inbound collaborator contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    /// Raw tag string.
    pub tag: String,
    /// Content digest identifying the image.
    pub digest: String,
    /// Registry-reported push or build time, when known.
    pub pushed_at: Option<DateTime<Utc>>,
}

/// Identity fields a group shares.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    /// Project identifier.
    pub project: String,
    /// Client identifier; empty when the convention captured none.
    pub client: String,
    /// Environment identifier.
    pub environment: String,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.client.is_empty() {
            write!(f, "{}/{}", self.project, self.environment)
        } else {
            write!(f, "{}/{}/{}", self.project, self.client, self.environment)
        }
    }
}

/// One image inside a group plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedImage {
    /// Raw tag string.
    pub tag: String,
    /// Content digest.
    pub digest: String,
    /// The recency marker the ordering used.
    pub ordered_by: DateTime<Utc>,
}

/// Keep/delete partition for a single group.
///
/// Invariants: `keep` and `delete` are disjoint, together they cover the
/// whole group, and `keep.len() == min(keep_count, group size)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupPlan {
    /// The group's identity.
    pub key: GroupKey,
    /// Members retained, newest first.
    pub keep: Vec<PlannedImage>,
    /// Members past the keep window, same ordering.
    pub delete: Vec<PlannedImage>,
}

impl GroupPlan {
    /// Total number of members in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keep.len() + self.delete.len()
    }

    /// Returns true if the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keep.is_empty() && self.delete.is_empty()
    }
}

/// The computed retention plan.
///
/// Groups are ordered by key and each group newest-first, so two runs over
/// the same listing produce byte-identical plans. Holds no external
/// resource handles; a failed deletion never invalidates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetentionPlan {
    /// Keep/delete partition per group, ordered by key.
    pub groups: Vec<GroupPlan>,
    /// Tags the convention rejected. Reported, never grouped, never
    /// deleted automatically.
    pub rejected: Vec<RejectedTag>,
}

impl RetentionPlan {
    /// Digests that are safe to delete.
    ///
    /// A digest may back several tags across groups; one that is kept
    /// anywhere must never be deleted, so the kept set is subtracted from
    /// the deletion candidates.
    #[must_use]
    pub fn digests_to_delete(&self) -> Vec<String> {
        let kept: BTreeSet<&str> = self
            .groups
            .iter()
            .flat_map(|g| g.keep.iter().map(|i| i.digest.as_str()))
            .collect();

        let candidates: BTreeSet<&str> = self
            .groups
            .iter()
            .flat_map(|g| g.delete.iter().map(|i| i.digest.as_str()))
            .collect();

        candidates
            .difference(&kept)
            .map(|d| (*d).to_string())
            .collect()
    }

    /// Total number of images marked for deletion across all groups.
    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.groups.iter().map(|g| g.delete.len()).sum()
    }

    /// Returns true if nothing is marked for deletion.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.delete_count() == 0
    }
}

/// Computes the retention plan for a registry listing.
///
/// Parsing and planning are pure: the same convention, records and policy
/// always yield an identical plan, including under recency ties (broken
/// lexicographically by digest, then tag).
///
/// A `keep_count` of zero legally empties every group. An empty listing
/// produces an empty plan.
///
/// # Errors
///
/// Returns [`PlanError::MissingRecency`] if a conforming record cannot be
/// ordered: it has neither an embedded timestamp nor a push time.
pub fn plan_retention(
    convention: &TagConvention,
    records: &[ImageRecord],
    policy: &RetentionPolicy,
) -> Result<RetentionPlan, PlanError> {
    let mut rejected = Vec::new();
    let mut groups: BTreeMap<GroupKey, Vec<PlannedImage>> = BTreeMap::new();

    for record in records {
        match convention.parse(&record.tag) {
            ParsedTag::Conforming(fields) => {
                let recency = policy
                    .recency
                    .recency_of(fields.timestamp, record.pushed_at)
                    .ok_or_else(|| PlanError::MissingRecency {
                        tag: record.tag.clone(),
                    })?;

                let key = GroupKey {
                    project: fields.project,
                    client: fields.client,
                    environment: fields.environment,
                };
                groups.entry(key).or_default().push(PlannedImage {
                    tag: record.tag.clone(),
                    digest: record.digest.clone(),
                    ordered_by: recency,
                });
            }
            ParsedTag::Rejected(reject) => {
                debug!(tag = %reject.tag, reason = %reject.reason, "tag excluded from planning");
                rejected.push(reject);
            }
        }
    }

    let mut planned = Vec::with_capacity(groups.len());
    for (key, mut members) in groups {
        // Newest first; ties fall back to (digest, tag) so reruns agree.
        members.sort_by(|a, b| {
            b.ordered_by
                .cmp(&a.ordered_by)
                .then_with(|| a.digest.cmp(&b.digest))
                .then_with(|| a.tag.cmp(&b.tag))
        });

        let keep_len = policy.keep_count.min(members.len());
        let delete = members.split_off(keep_len);

        info!(
            group = %key,
            total = members.len() + delete.len(),
            keep = members.len(),
            delete = delete.len(),
            "planned group"
        );

        planned.push(GroupPlan {
            key,
            keep: members,
            delete,
        });
    }

    Ok(RetentionPlan {
        groups: planned,
        rejected,
    })
}
