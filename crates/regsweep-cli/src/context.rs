//! Resolved execution context for planning commands.

use anyhow::{Context as _, Result};
use regsweep_core::{RetentionPolicy, TagConvention};
use regsweep_registry::{RegistryAuth, RegistryClient};

use crate::commands::TargetArgs;
use crate::config::Config;

/// Everything a planning command needs, resolved from configuration with
/// command-line overrides applied (flags win).
///
/// Resolution validates the policy before any registry call: a malformed
/// convention pattern aborts here.
#[derive(Debug)]
pub struct PlanContext {
    /// Registry collaborator.
    pub client: RegistryClient,
    /// Repository to operate on.
    pub repository: String,
    /// Tag convention.
    pub convention: TagConvention,
    /// Retention policy.
    pub policy: RetentionPolicy,
}

impl PlanContext {
    /// Resolves a context from configuration and command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if no repository is specified anywhere or the
    /// convention pattern is invalid.
    pub fn resolve(target: &TargetArgs, config: &Config) -> Result<Self> {
        let repository = target
            .repository
            .clone()
            .or_else(|| config.registry.repository.clone())
            .context("no repository specified; pass --repository or set registry.repository")?;

        let pattern = target
            .pattern
            .as_deref()
            .unwrap_or(&config.convention.pattern);
        let convention = TagConvention::new(pattern).context("invalid tag convention")?;

        let mut policy = config.retention.clone();
        if let Some(keep) = target.keep {
            policy.keep_count = keep;
        }
        if let Some(recency) = target.recency {
            policy.recency = recency;
        }

        let registry = target.registry.as_deref().unwrap_or(&config.registry.url);
        let mut client = RegistryClient::new(registry);

        let username = target
            .username
            .clone()
            .or_else(|| config.registry.username.clone());
        let password = target
            .password
            .clone()
            .or_else(|| config.registry.password.clone());
        if let (Some(username), Some(password)) = (username, password) {
            client = client.with_auth(RegistryAuth { username, password });
        }

        Ok(Self {
            client,
            repository,
            convention,
            policy,
        })
    }

    /// True when listing should resolve creation times up front.
    #[must_use]
    pub const fn needs_push_time(&self) -> bool {
        self.policy.recency.needs_push_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regsweep_core::RecencyPolicy;

    fn target() -> TargetArgs {
        TargetArgs {
            repository: None,
            registry: None,
            username: None,
            password: None,
            pattern: None,
            keep: None,
            recency: None,
        }
    }

    #[test]
    fn test_repository_is_required() {
        let err = PlanContext::resolve(&target(), &Config::default()).unwrap_err();
        assert!(err.to_string().contains("no repository"));
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        config.registry.repository = Some("team/app".to_string());
        config.retention.keep_count = 3;

        let overrides = TargetArgs {
            repository: Some("team/other".to_string()),
            keep: Some(7),
            recency: Some(RecencyPolicy::PushTime),
            ..target()
        };

        let ctx = PlanContext::resolve(&overrides, &config).unwrap();
        assert_eq!(ctx.repository, "team/other");
        assert_eq!(ctx.policy.keep_count, 7);
        assert_eq!(ctx.policy.recency, RecencyPolicy::PushTime);
        assert!(ctx.needs_push_time());
    }

    #[test]
    fn test_invalid_pattern_is_fatal_before_any_registry_call() {
        let mut config = Config::default();
        config.registry.repository = Some("team/app".to_string());
        config.convention.pattern = "(".to_string();

        let err = PlanContext::resolve(&target(), &config).unwrap_err();
        assert!(err.to_string().contains("invalid tag convention"));
    }
}
