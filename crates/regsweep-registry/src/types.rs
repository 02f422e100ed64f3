//! Registry API payload types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag listing page returned by `GET /v2/<name>/tags/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct TagPage {
    /// Repository name.
    pub name: String,
    /// Tags in this page. Some registries report `null` instead of an
    /// empty array once a repository has no tags left.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Image manifest, reduced to the fields the collaborator needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    /// Schema version (should be 2).
    pub schema_version: u32,
    /// Media type.
    #[serde(default)]
    pub media_type: String,
    /// Config descriptor.
    pub config: Descriptor,
}

/// Multi-architecture manifest list (fat manifest).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestList {
    /// Schema version (should be 2).
    pub schema_version: u32,
    /// Media type.
    pub media_type: String,
    /// Platform-specific manifests.
    pub manifests: Vec<PlatformManifest>,
}

/// Platform-specific manifest entry in a manifest list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformManifest {
    /// Media type of the referenced manifest.
    pub media_type: String,
    /// Content digest.
    pub digest: String,
    /// Content size.
    pub size: u64,
}

/// Content descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type.
    pub media_type: String,
    /// Content digest.
    pub digest: String,
    /// Content size.
    pub size: u64,
}

/// Image config blob, reduced to the creation timestamp.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfigBlob {
    /// Build time recorded by the image builder.
    pub created: Option<DateTime<Utc>>,
}

/// Manifest fetch result: a single manifest or a manifest list.
#[derive(Debug, Clone)]
pub enum ManifestResponse {
    /// Single-platform manifest.
    Manifest(ImageManifest),
    /// Multi-platform manifest list.
    ManifestList(ManifestList),
}

/// A single failed deletion.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteFailure {
    /// Digest that could not be deleted.
    pub digest: String,
    /// Failure description.
    pub error: String,
}

/// Outcome of a deletion pass over a plan's delete set.
///
/// Partial failure is expected: failed digests are reported back per
/// identifier and the plan stays re-attemptable as-is.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteOutcome {
    /// Digests deleted (or already gone) during this pass.
    pub deleted: Vec<String>,
    /// Digests that failed, with reasons.
    pub failures: Vec<DeleteFailure>,
}

impl DeleteOutcome {
    /// Returns true if any deletion failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
