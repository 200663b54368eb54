//! Schema validation for `BuildOptions` (no filesystem checks).

use std::collections::HashSet;

use crate::error::{ConfigError, Result};
use crate::options::{BuildOptions, Platform};

impl BuildOptions {
    /// Validate the options before any job is scheduled.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` for a zero `max_parallel`, empty or
    /// path-like entry names, duplicate entries within a target, empty
    /// classifier ids, and empty alias names.
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel == Some(0) {
            return Err(ConfigError::Validation {
                message: "max_parallel must be at least 1".to_string(),
                hint: Some("Omit max_parallel to use the number of CPUs".to_string()),
            });
        }

        for platform in Platform::all() {
            let mut seen = HashSet::new();
            for entry in self.targets.for_platform(platform) {
                validate_entry_name(entry, platform)?;
                if !seen.insert(entry.as_str()) {
                    return Err(ConfigError::Validation {
                        message: format!("duplicate {platform} entry '{entry}'"),
                        hint: Some(
                            "Each entry owns one output and one cache file; list it once"
                                .to_string(),
                        ),
                    });
                }
            }
        }

        let classifier = &self.classifier;
        if classifier.externals.iter().any(|id| id.trim().is_empty())
            || classifier
                .redirects
                .iter()
                .any(|(from, to)| from.trim().is_empty() || to.trim().is_empty())
        {
            return Err(ConfigError::Validation {
                message: "classifier module ids cannot be empty".to_string(),
                hint: Some("Remove empty strings from 'externals' and 'redirects'".to_string()),
            });
        }

        if self.aliases.keys().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::Validation {
                message: "alias names cannot be empty".to_string(),
                hint: None,
            });
        }

        Ok(())
    }
}

fn validate_entry_name(entry: &str, platform: Platform) -> Result<()> {
    if entry.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: format!("empty entry name in '{platform}' target"),
            hint: None,
        });
    }

    if entry.contains('/') || entry.contains('\\') || entry == "." || entry == ".." {
        return Err(ConfigError::Validation {
            message: format!("entry '{entry}' must be a plain file name"),
            hint: Some(format!(
                "Entries are resolved against src/sys/{}/bundles/",
                platform.dir_name()
            )),
        });
    }

    Ok(())
}
