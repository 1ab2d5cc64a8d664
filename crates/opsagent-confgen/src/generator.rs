use std::collections::BTreeMap;

use opsagent_config::{BuiltinConfig, DefaultPipelineOverrides, PlatformFacts, UnifiedConfig, Validator, merge, validation};

use crate::fluentbit::{self, MAIN_CONFIG_FILE, PARSER_CONFIG_FILE};
use crate::otel::{self, OTEL_CONFIG_FILE};
use crate::{GenerateError, Paths, RenderContext};

/// Output of one successful generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    /// File name to file content
    pub files: BTreeMap<String, String>,
    /// Whether user pipelines replaced the built-in ones, per domain
    pub default_pipeline_overridden: DefaultPipelineOverrides,
}

/// Turns unified configuration text into engine configuration files
///
/// Holds only immutable inputs; each call is independent, so one generator
/// may be shared between threads.
#[derive(Debug, Clone)]
pub struct Generator {
    builtin: BuiltinConfig,
    platform: PlatformFacts,
    paths: Paths,
    version: String,
}

impl Generator {
    pub fn new(builtin: BuiltinConfig, platform: PlatformFacts, paths: Paths) -> Self {
        Self {
            builtin,
            platform,
            paths,
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    /// Generator using the built-in defaults of the given platform
    pub fn for_platform(platform: PlatformFacts, paths: Paths) -> Self {
        let builtin = BuiltinConfig::for_platform(&platform);
        Self::new(builtin, platform, paths)
    }

    /// Override the version reported in user agents
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Decode, validate, merge and render a unified configuration
    ///
    /// Either every file is returned or none is.
    ///
    /// # Errors
    ///
    /// Returns the decode error, every validation error, or the first
    /// rendering error
    pub fn generate(&self, raw: &str) -> Result<Generated, GenerateError> {
        let user = UnifiedConfig::from_yaml(raw)?;
        self.generate_config(&user)
    }

    /// Same as [`Generator::generate`] for an already decoded document
    ///
    /// # Errors
    ///
    /// Returns every validation error or the first rendering error
    pub fn generate_config(&self, user: &UnifiedConfig) -> Result<Generated, GenerateError> {
        let merged = self.resolve(user)?;
        let config = &merged.config;

        for path in validation::unreferenced(user, config) {
            tracing::warn!(component = %path, "component is declared but not used by any pipeline");
        }

        let ctx = RenderContext {
            platform: &self.platform,
            builtin: &self.builtin,
            paths: &self.paths,
            version: &self.version,
        };

        let fluent_bit = fluentbit::render(&ctx, config.logging.as_ref())?;
        let collector = otel::render(&ctx, config.metrics.as_ref(), config.combined.as_ref())?;

        let files = BTreeMap::from([
            (MAIN_CONFIG_FILE.to_owned(), fluent_bit.main),
            (PARSER_CONFIG_FILE.to_owned(), fluent_bit.parsers),
            (OTEL_CONFIG_FILE.to_owned(), collector),
        ]);

        tracing::info!(
            platform = %self.platform.key(),
            files = files.len(),
            logging_overridden = merged.overrides.logging,
            metrics_overridden = merged.overrides.metrics,
            "generated engine configuration"
        );

        Ok(Generated {
            files,
            default_pipeline_overridden: merged.overrides,
        })
    }

    /// The merged configuration as YAML, with secrets redacted
    ///
    /// # Errors
    ///
    /// Returns the decode error or every validation error
    pub fn effective_config(&self, raw: &str) -> Result<String, GenerateError> {
        let user = UnifiedConfig::from_yaml(raw)?;
        self.effective_config_for(&user)
    }

    /// Same as [`Generator::effective_config`] for an already decoded document
    ///
    /// # Errors
    ///
    /// Returns every validation error
    pub fn effective_config_for(&self, user: &UnifiedConfig) -> Result<String, GenerateError> {
        let merged = self.resolve(user)?;
        Ok(merged.config.to_yaml()?)
    }

    fn resolve(&self, user: &UnifiedConfig) -> Result<opsagent_config::Merged, GenerateError> {
        let validator = Validator::new(&self.platform, &self.builtin);

        // Declarations are checked before merging so errors point at the user's document
        validator.validate_declarations(user)?;

        let merged = merge(user, &self.builtin);
        validator.validate(&merged.config)?;

        tracing::debug!(platform = %self.platform.key(), "configuration is valid");

        Ok(merged)
    }
}
