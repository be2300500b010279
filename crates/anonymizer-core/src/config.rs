use crate::error::{Error, Result};
use crate::namer::{HashAlgorithm, NamingOptions, DEFAULT_DIGEST_LENGTH};
use crate::store::DEFAULT_MAPPING_FILE;
use config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonymizerConfig {
    pub algorithm: HashAlgorithm,
    pub prefix: String,
    pub separator: String,
    pub dry_run: bool,
    pub digest_length: usize,
    /// Walk subdirectories instead of only the top level of the root.
    pub recursive: bool,
    pub ignore_patterns: Vec<String>,
    /// Mapping file name, created inside the root directory.
    pub mapping_file: String,
}

impl Default for AnonymizerConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            prefix: String::new(),
            separator: String::new(),
            dry_run: false,
            digest_length: DEFAULT_DIGEST_LENGTH,
            recursive: false,
            ignore_patterns: Vec::new(),
            mapping_file: DEFAULT_MAPPING_FILE.to_string(),
        }
    }
}

impl AnonymizerConfig {
    pub fn naming_options(&self) -> NamingOptions {
        NamingOptions {
            digest_length: self.digest_length,
            separator: self.separator.clone(),
        }
    }

    /// Reject option combinations that would fail halfway through a run.
    pub fn validate(&self) -> Result<()> {
        let full_len = self.algorithm.hex_len();
        if self.digest_length == 0 || self.digest_length > full_len {
            return Err(Error::configuration(format!(
                "digest_length must be between 1 and {} for {}, got {}",
                full_len, self.algorithm, self.digest_length
            )));
        }
        for (label, value) in [("prefix", &self.prefix), ("separator", &self.separator)] {
            if value.contains(['/', '\\', '\0']) {
                return Err(Error::configuration(format!(
                    "{} must not contain path separators: '{}'",
                    label, value
                )));
            }
        }
        if self.mapping_file.is_empty()
            || self.mapping_file.contains(['/', '\\', '\0'])
            || self.mapping_file == "."
            || self.mapping_file == ".."
        {
            return Err(Error::configuration(format!(
                "mapping_file must be a plain file name, got '{}'",
                self.mapping_file
            )));
        }
        Ok(())
    }
}

/// Layer defaults, an optional `Anonymizer.*` file (or `path` when given, which
/// must exist), then `ANONYMIZER_*` environment variables.
pub fn load_configuration(path: Option<&Path>) -> Result<AnonymizerConfig> {
    let file_source = match path {
        Some(p) => ConfigFile::from(p).required(true),
        None => ConfigFile::with_name("Anonymizer").required(false),
    };

    let builder = Config::builder()
        .add_source(file_source)
        .add_source(
            Environment::with_prefix("ANONYMIZER")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;

    let config = builder.try_deserialize::<AnonymizerConfig>()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AnonymizerConfig::default();
        assert_eq!(config.algorithm, HashAlgorithm::Sha256);
        assert_eq!(config.prefix, "");
        assert_eq!(config.digest_length, 16);
        assert!(!config.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_digest_length() {
        let config = AnonymizerConfig {
            algorithm: HashAlgorithm::Md5,
            digest_length: 40,
            ..AnonymizerConfig::default()
        };
        assert!(config.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_validate_rejects_path_in_prefix() {
        let config = AnonymizerConfig {
            prefix: "../escape".to_string(),
            ..AnonymizerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("anon.toml");
        fs::write(
            &path,
            "algorithm = \"sha1\"\nprefix = \"anon_\"\ndigest_length = 8\nrecursive = true\n",
        )
        .unwrap();

        let config = load_configuration(Some(&path)).unwrap();
        assert_eq!(config.algorithm, HashAlgorithm::Sha1);
        assert_eq!(config.prefix, "anon_");
        assert_eq!(config.digest_length, 8);
        assert!(config.recursive);
        assert_eq!(config.mapping_file, DEFAULT_MAPPING_FILE);
    }

    #[test]
    fn test_load_unknown_algorithm_fails() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("anon.toml");
        fs::write(&path, "algorithm = \"crc32\"\n").unwrap();

        let err = load_configuration(Some(&path)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let tmp = tempdir().unwrap();
        let err = load_configuration(Some(&tmp.path().join("nope.toml"))).unwrap_err();
        assert!(err.is_configuration());
    }
}
