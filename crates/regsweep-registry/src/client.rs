//! Docker Registry v2 API client.
//!
//! Supports Docker Hub and OCI-compliant registries with token
//! authentication. Listing is paginated and deduplicated; deletion is
//! processed in bounded batches and treats an already-gone manifest as
//! success so a plan can be re-applied idempotently.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regsweep_core::ImageRecord;
use reqwest::{header, Client, Method, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{RegistryError, Result};
use crate::types::{
    DeleteFailure, DeleteOutcome, ImageConfigBlob, ImageManifest, ManifestList, ManifestResponse,
    TagPage,
};

/// Docker Hub registry URL.
const DOCKER_REGISTRY_URL: &str = "https://registry-1.docker.io";

/// Accept header value for manifest requests.
const ACCEPT_MANIFEST: &str = concat!(
    "application/vnd.docker.distribution.manifest.v2+json, ",
    "application/vnd.docker.distribution.manifest.list.v2+json, ",
    "application/vnd.oci.image.manifest.v1+json, ",
    "application/vnd.oci.image.index.v1+json"
);

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default connect timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Page size requested from `tags/list`.
const TAG_PAGE_SIZE: usize = 100;

/// Maximum deletions processed per batch.
const DELETE_BATCH_SIZE: usize = 100;

/// Registry authentication credentials.
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    /// Username.
    pub username: String,
    /// Password or token.
    pub password: String,
}

/// Token response from the registry auth service.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    #[allow(dead_code)]
    expires_in: Option<u64>,
}

/// WWW-Authenticate challenge parsed from a 401 response.
#[derive(Debug, Default)]
struct AuthChallenge {
    realm: String,
    service: String,
    scope: String,
}

/// Registry client for the Docker Registry v2 API.
#[derive(Debug)]
pub struct RegistryClient {
    /// HTTP client.
    client: Client,
    /// Registry base URL.
    registry_url: String,
    /// Optional basic auth credentials.
    auth: Option<RegistryAuth>,
    /// Cached bearer token (per-repository).
    tokens: Arc<RwLock<HashMap<String, String>>>,
}

impl RegistryClient {
    /// Creates a new registry client for the specified registry.
    ///
    /// # Arguments
    ///
    /// * `registry` - Registry hostname (e.g., "docker.io", "ghcr.io")
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// practice).
    #[must_use]
    pub fn new(registry: impl Into<String>) -> Self {
        let registry = registry.into();
        let registry_url = Self::registry_to_url(&registry);

        let client = Client::builder()
            .user_agent("regsweep/0.1")
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(std::time::Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .pool_max_idle_per_host(4)
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            registry_url,
            auth: None,
            tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn with_auth(mut self, auth: RegistryAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Gets the registry URL.
    #[must_use]
    pub fn registry(&self) -> &str {
        &self.registry_url
    }

    /// Converts registry hostname to base URL.
    fn registry_to_url(registry: &str) -> String {
        match registry {
            "docker.io" => DOCKER_REGISTRY_URL.to_string(),
            r if r.starts_with("http://") || r.starts_with("https://") => r.to_string(),
            r => format!("https://{r}"),
        }
    }

    /// Lists every tag of a repository.
    ///
    /// Pages through `tags/list` until exhausted and returns a complete,
    /// deduplicated listing in registry order.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository does not exist or a page cannot
    /// be fetched.
    #[instrument(skip(self))]
    pub async fn list_tags(&self, repository: &str) -> Result<Vec<String>> {
        let mut tags = Vec::new();
        let mut seen = HashSet::new();
        let mut last: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/v2/{}/tags/list?n={}",
                self.registry_url, repository, TAG_PAGE_SIZE
            );
            if let Some(marker) = &last {
                url.push_str("&last=");
                url.push_str(&urlencoding::encode(marker));
            }

            debug!(url = %url, "fetching tag page");

            let response = self
                .request_with_auth(Method::GET, &url, repository)
                .await?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(RegistryError::NotFound(format!("repository {repository}")));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(RegistryError::Registry(format!(
                    "failed to list tags: {status} - {body}"
                )));
            }

            let page: TagPage = response
                .json()
                .await
                .map_err(|e| RegistryError::Registry(format!("failed to read tag page: {e}")))?;

            let Some(page_tags) = page.tags else { break };
            if page_tags.is_empty() {
                break;
            }

            let page_len = page_tags.len();
            let before = tags.len();
            last = page_tags.last().cloned();
            for tag in page_tags {
                if seen.insert(tag.clone()) {
                    tags.push(tag);
                }
            }

            // Registries that ignore `n` return everything at once; stop as
            // soon as a page brings nothing new.
            if page_len < TAG_PAGE_SIZE || tags.len() == before {
                break;
            }
        }

        Ok(tags)
    }

    /// Resolves a tag to its manifest digest.
    ///
    /// Returns `Ok(None)` when the tag no longer exists (it may vanish
    /// between listing and resolution).
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or when the registry omits
    /// the `Docker-Content-Digest` header.
    #[instrument(skip(self))]
    pub async fn resolve_digest(&self, repository: &str, tag: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.registry_url, repository, tag
        );

        let response = self
            .request_with_auth(Method::HEAD, &url, repository)
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RegistryError::Registry(format!(
                "failed to resolve digest for {tag}: {status}"
            )));
        }

        let digest = response
            .headers()
            .get("docker-content-digest")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
            .ok_or_else(|| {
                RegistryError::Registry(format!(
                    "registry returned no Docker-Content-Digest for {tag}"
                ))
            })?;

        Ok(Some(digest))
    }

    /// Gets an image manifest from the registry.
    ///
    /// Returns either a single manifest or a manifest list for multi-arch
    /// images.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be fetched or parsed.
    #[instrument(skip(self))]
    pub async fn get_manifest(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<ManifestResponse> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.registry_url, repository, reference
        );

        debug!(url = %url, "fetching manifest");

        let response = self
            .request_with_auth(Method::GET, &url, repository)
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(format!(
                "{repository}:{reference}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Registry(format!(
                "failed to fetch manifest: {status} - {body}"
            )));
        }

        // Check content type to determine manifest type.
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| RegistryError::Registry(format!("failed to read manifest body: {e}")))?;

        trace!(content_type = %content_type, body_len = body.len(), "received manifest");

        if content_type.contains("manifest.list") || content_type.contains("image.index") {
            let list: ManifestList = serde_json::from_slice(&body)?;
            Ok(ManifestResponse::ManifestList(list))
        } else {
            let manifest: ImageManifest = serde_json::from_slice(&body)?;
            Ok(ManifestResponse::Manifest(manifest))
        }
    }

    /// Resolves the creation time of an image from its config blob.
    ///
    /// Multi-arch references are resolved through the first entry of the
    /// manifest list; every platform's config carries the same build time.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest or config blob cannot be fetched.
    #[instrument(skip(self))]
    pub async fn resolve_created(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        let manifest = match self.get_manifest(repository, reference).await? {
            ManifestResponse::Manifest(manifest) => manifest,
            ManifestResponse::ManifestList(list) => {
                let Some(entry) = list.manifests.first() else {
                    return Ok(None);
                };
                match self.get_manifest(repository, &entry.digest).await? {
                    ManifestResponse::Manifest(manifest) => manifest,
                    ManifestResponse::ManifestList(_) => {
                        return Err(RegistryError::Registry(
                            "manifest list points at another manifest list".to_string(),
                        ));
                    }
                }
            }
        };

        let config = self
            .get_config_blob(repository, &manifest.config.digest)
            .await?;
        Ok(config.created)
    }

    /// Lists a repository as planner-ready image records.
    ///
    /// Tags without a resolvable digest are skipped with a warning; they
    /// cannot be planned or deleted. Creation times are resolved only when
    /// `resolve_created` is set, since each one costs two extra requests.
    ///
    /// # Errors
    ///
    /// Returns an error if listing or any digest resolution fails.
    #[instrument(skip(self))]
    pub async fn list_images(
        &self,
        repository: &str,
        resolve_created: bool,
    ) -> Result<Vec<ImageRecord>> {
        let tags = self.list_tags(repository).await?;
        info!(repository = %repository, count = tags.len(), "retrieved tags");

        let mut records = Vec::with_capacity(tags.len());
        for tag in tags {
            let Some(digest) = self.resolve_digest(repository, &tag).await? else {
                warn!(tag = %tag, "tag has no resolvable digest, skipping");
                continue;
            };

            let pushed_at = if resolve_created {
                self.resolve_created(repository, &tag).await?
            } else {
                None
            };

            records.push(ImageRecord {
                tag,
                digest,
                pushed_at,
            });
        }

        Ok(records)
    }

    /// Deletes manifests by digest, in batches.
    ///
    /// A digest that is already gone counts as deleted, so re-applying the
    /// same plan after a partial failure is safe. Per-digest failures are
    /// collected rather than aborting the pass; the computed plan they came
    /// from is never mutated.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry has manifest deletion disabled,
    /// since no digest could ever succeed.
    #[instrument(skip(self, digests))]
    pub async fn delete_images(
        &self,
        repository: &str,
        digests: &[String],
    ) -> Result<DeleteOutcome> {
        let mut outcome = DeleteOutcome::default();

        for batch in digests.chunks(DELETE_BATCH_SIZE) {
            for digest in batch {
                match self.delete_manifest(repository, digest).await {
                    Ok(()) => outcome.deleted.push(digest.clone()),
                    Err(e @ RegistryError::DeleteUnsupported(_)) => return Err(e),
                    Err(e) => {
                        warn!(digest = %digest, error = %e, "failed to delete manifest");
                        outcome.failures.push(DeleteFailure {
                            digest: digest.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
            info!(
                repository = %repository,
                deleted = outcome.deleted.len(),
                failed = outcome.failures.len(),
                "processed deletion batch"
            );
        }

        Ok(outcome)
    }

    /// Deletes a single manifest by digest.
    async fn delete_manifest(&self, repository: &str, digest: &str) -> Result<()> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.registry_url, repository, digest
        );

        let response = self
            .request_with_auth(Method::DELETE, &url, repository)
            .await?;

        let status = response.status();
        // Already gone: a previous pass got here first.
        if status == StatusCode::NOT_FOUND {
            debug!(digest = %digest, "manifest already deleted");
            return Ok(());
        }
        if status == StatusCode::METHOD_NOT_ALLOWED {
            return Err(RegistryError::DeleteUnsupported(
                "the registry is not configured with delete enabled".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Registry(format!(
                "failed to delete manifest: {status} - {body}"
            )));
        }

        Ok(())
    }

    /// Gets an image config blob.
    async fn get_config_blob(&self, repository: &str, digest: &str) -> Result<ImageConfigBlob> {
        let url = format!(
            "{}/v2/{}/blobs/{}",
            self.registry_url, repository, digest
        );

        let response = self
            .request_with_auth(Method::GET, &url, repository)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Registry(format!(
                "failed to fetch config blob: {status} - {body}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RegistryError::Registry(format!("failed to read config blob: {e}")))?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Makes an authenticated request to the registry.
    ///
    /// Handles token authentication (401 challenge) automatically.
    async fn request_with_auth(
        &self,
        method: Method,
        url: &str,
        repository: &str,
    ) -> Result<reqwest::Response> {
        // First, try with cached token if available.
        let cached_token = {
            let tokens = self.tokens.read().await;
            tokens.get(repository).cloned()
        };

        if let Some(token) = cached_token {
            let response = self
                .client
                .request(method.clone(), url)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::ACCEPT, ACCEPT_MANIFEST)
                .send()
                .await
                .map_err(|e| RegistryError::Registry(format!("request failed: {e}")))?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }
            // Token expired, clear it and retry.
            let mut tokens = self.tokens.write().await;
            tokens.remove(repository);
        }

        // Make initial request without auth.
        let response = self
            .client
            .request(method.clone(), url)
            .header(header::ACCEPT, ACCEPT_MANIFEST)
            .send()
            .await
            .map_err(|e| RegistryError::Registry(format!("request failed: {e}")))?;

        // If 401, parse challenge and get token.
        if response.status() == StatusCode::UNAUTHORIZED {
            let challenge_header = response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    RegistryError::Auth("missing WWW-Authenticate header".to_string())
                })?
                .to_string();
            let challenge = Self::parse_www_authenticate(&challenge_header)?;
            let token = self.get_token(&challenge).await?;

            // Cache the token.
            {
                let mut tokens = self.tokens.write().await;
                tokens.insert(repository.to_string(), token.clone());
            }

            // Retry with token.
            let response = self
                .client
                .request(method, url)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::ACCEPT, ACCEPT_MANIFEST)
                .send()
                .await
                .map_err(|e| RegistryError::Registry(format!("request failed: {e}")))?;

            return Ok(response);
        }

        Ok(response)
    }

    /// Parses a WWW-Authenticate header value from a 401 response.
    fn parse_www_authenticate(header: &str) -> Result<AuthChallenge> {
        trace!(header = %header, "parsing WWW-Authenticate");

        let mut challenge = AuthChallenge::default();

        // Parse Bearer realm="...",service="...",scope="..."
        for part in header.trim_start_matches("Bearer ").split(',') {
            let part = part.trim();
            if let Some(value) = part.strip_prefix("realm=") {
                challenge.realm = value.trim_matches('"').to_string();
            } else if let Some(value) = part.strip_prefix("service=") {
                challenge.service = value.trim_matches('"').to_string();
            } else if let Some(value) = part.strip_prefix("scope=") {
                challenge.scope = value.trim_matches('"').to_string();
            }
        }

        if challenge.realm.is_empty() {
            return Err(RegistryError::Auth(
                "invalid WWW-Authenticate header".to_string(),
            ));
        }

        Ok(challenge)
    }

    /// Gets a bearer token from the auth service.
    async fn get_token(&self, challenge: &AuthChallenge) -> Result<String> {
        use std::fmt::Write;

        let mut url = format!(
            "{}?service={}&scope={}",
            challenge.realm, challenge.service, challenge.scope
        );

        // Add basic auth if provided.
        if let Some(auth) = &self.auth {
            let _ = write!(url, "&account={}", urlencoding::encode(&auth.username));
        }

        debug!(url = %url, "requesting token");

        let mut request = self.client.get(&url);

        // Add basic auth header if credentials provided.
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| RegistryError::Auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Auth(format!("token request failed: {body}")));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::Auth(format!("failed to parse token response: {e}")))?;

        Ok(token_response.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_to_url() {
        assert_eq!(
            RegistryClient::registry_to_url("docker.io"),
            "https://registry-1.docker.io"
        );
        assert_eq!(
            RegistryClient::registry_to_url("ghcr.io"),
            "https://ghcr.io"
        );
        assert_eq!(
            RegistryClient::registry_to_url("http://localhost:5000"),
            "http://localhost:5000"
        );
    }

    #[test]
    fn test_parse_www_authenticate() {
        let challenge = RegistryClient::parse_www_authenticate(
            r#"Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:library/alpine:pull""#,
        )
        .unwrap();

        assert_eq!(challenge.realm, "https://auth.docker.io/token");
        assert_eq!(challenge.service, "registry.docker.io");
        assert_eq!(challenge.scope, "repository:library/alpine:pull");
    }

    #[test]
    fn test_parse_www_authenticate_without_realm() {
        let result = RegistryClient::parse_www_authenticate("Basic");
        assert!(result.is_err());
    }

    #[test]
    fn test_tag_page_with_null_tags() {
        let page: TagPage = serde_json::from_str(r#"{"name":"team/app","tags":null}"#).unwrap();
        assert!(page.tags.is_none());

        let page: TagPage =
            serde_json::from_str(r#"{"name":"team/app","tags":["v1","v2"]}"#).unwrap();
        assert_eq!(page.tags.unwrap().len(), 2);
    }
}
