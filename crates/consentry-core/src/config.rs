//! Store options and configuration file loading.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConsentError, ConsentResult};

/// Default name of the cookie holding the policy record.
pub const DEFAULT_POLICIES_KEY: &str = "cookies_policy";

/// Options recognised when opening a policy store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreOptions {
    /// Domain cookies are registered with; the current host when unset.
    pub domain: Option<String>,
    /// Restrict writes to secure transport.
    pub secure: bool,
    /// Cookie name holding the serialised policy record.
    pub policies_key: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            domain: None,
            secure: true,
            policies_key: DEFAULT_POLICIES_KEY.to_string(),
        }
    }
}

impl StoreOptions {
    /// Options using a custom policies key.
    #[must_use]
    pub fn with_policies_key(policies_key: impl Into<String>) -> Self {
        Self {
            policies_key: policies_key.into(),
            ..Self::default()
        }
    }

    /// Reject options the store cannot operate with.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentError::InvalidOptions`] when the policies key is blank.
    pub fn validate(&self) -> ConsentResult<()> {
        if self.policies_key.trim().is_empty() {
            return Err(ConsentError::InvalidOptions {
                field: "policiesKey",
                reason: "must not be blank",
            });
        }
        Ok(())
    }
}

/// File-level configuration: extra policies plus store options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsentConfig {
    /// Policies managed in addition to `essential`, `usage`, and `settings`.
    pub extra_policies: Vec<String>,
    /// Store options.
    #[serde(flatten)]
    pub store: StoreOptions,
}

/// Load a JSON configuration file.
///
/// # Errors
///
/// Returns [`ConsentError::ConfigIo`] when the file cannot be read and
/// [`ConsentError::ConfigParse`] when it is not valid JSON for
/// [`ConsentConfig`].
pub fn load_config(path: &Path) -> ConsentResult<ConsentConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConsentError::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ConsentConfig =
        serde_json::from_str(&raw).map_err(|source| ConsentError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(
        path = %path.display(),
        policies_key = %config.store.policies_key,
        extra_policies = config.extra_policies.len(),
        "loaded consent configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_cookie_conventions() {
        let options = StoreOptions::default();
        assert_eq!(options.policies_key, "cookies_policy");
        assert!(options.secure);
        assert_eq!(options.domain, None);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn blank_policies_key_is_rejected() {
        let err = StoreOptions::with_policies_key("  ")
            .validate()
            .expect_err("blank key should fail");
        assert!(matches!(
            err,
            ConsentError::InvalidOptions {
                field: "policiesKey",
                ..
            }
        ));
    }

    #[test]
    fn config_file_fills_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"extraPolicies":["Marketing"],"domain":"example.com"}}"#
        )
        .expect("write config");

        let config = load_config(file.path()).expect("config should load");
        assert_eq!(config.extra_policies, vec!["Marketing".to_string()]);
        assert_eq!(config.store.domain.as_deref(), Some("example.com"));
        assert_eq!(config.store.policies_key, DEFAULT_POLICIES_KEY);
        assert!(config.store.secure);
    }

    #[test]
    fn config_errors_carry_the_path() {
        let missing = Path::new("/nonexistent/consentry.json");
        assert!(matches!(
            load_config(missing),
            Err(ConsentError::ConfigIo { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{{not json").expect("write config");
        assert!(matches!(
            load_config(file.path()),
            Err(ConsentError::ConfigParse { .. })
        ));
    }
}
