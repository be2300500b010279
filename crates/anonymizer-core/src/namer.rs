use crate::error::{Error, Result};
use blake2::Blake2b512;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_DIGEST_LENGTH: usize = 16;

/// Digest functions a name can be derived with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha1,
    Md5,
    Sha512,
    /// BLAKE2b-512
    Blake2,
    Blake3,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 6] = [
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha1,
        HashAlgorithm::Md5,
        HashAlgorithm::Sha512,
        HashAlgorithm::Blake2,
        HashAlgorithm::Blake3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Blake2 => "blake2",
            HashAlgorithm::Blake3 => "blake3",
        }
    }

    /// Length of the full digest rendered as hex.
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => 32,
            HashAlgorithm::Sha1 => 40,
            HashAlgorithm::Sha256 | HashAlgorithm::Blake3 => 64,
            HashAlgorithm::Sha512 | HashAlgorithm::Blake2 => 128,
        }
    }

    /// Full lowercase hex digest of `input`.
    pub fn hex_digest(&self, input: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(input)),
            HashAlgorithm::Sha1 => hex::encode(Sha1::digest(input)),
            HashAlgorithm::Md5 => hex::encode(Md5::digest(input)),
            HashAlgorithm::Sha512 => hex::encode(Sha512::digest(input)),
            HashAlgorithm::Blake2 => hex::encode(Blake2b512::digest(input)),
            HashAlgorithm::Blake3 => blake3::hash(input).to_hex().to_string(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "sha1" | "sha-1" => Ok(HashAlgorithm::Sha1),
            "md5" => Ok(HashAlgorithm::Md5),
            "sha512" | "sha-512" => Ok(HashAlgorithm::Sha512),
            "blake2" | "blake2b" => Ok(HashAlgorithm::Blake2),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(Error::configuration(format!(
                "unsupported hash algorithm '{}' (expected one of: {})",
                other,
                HashAlgorithm::ALL
                    .iter()
                    .map(|a| a.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}

/// Everything besides the algorithm and prefix that shapes a derived name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingOptions {
    pub digest_length: usize,
    pub separator: String,
}

impl Default for NamingOptions {
    fn default() -> Self {
        Self {
            digest_length: DEFAULT_DIGEST_LENGTH,
            separator: String::new(),
        }
    }
}

/// Split a file name into `(stem, extension)`.
///
/// Leading dots never start an extension, so `.bashrc` has none. Otherwise the
/// extension runs from the last `.` to the end, dot included.
pub fn split_extension(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(idx) => name.split_at(leading + idx),
        None => (name, ""),
    }
}

/// Derive the candidate anonymized name for `original_name`.
///
/// The result is `prefix + separator + digest[..digest_length] + extension`,
/// with the separator only present when the prefix is non-empty.
pub fn derive(
    original_name: &str,
    algorithm: HashAlgorithm,
    prefix: &str,
    options: &NamingOptions,
) -> Result<String> {
    let full_len = algorithm.hex_len();
    if options.digest_length == 0 || options.digest_length > full_len {
        return Err(Error::configuration(format!(
            "digest length {} out of range for {} (1..={})",
            options.digest_length, algorithm, full_len
        )));
    }

    let digest = algorithm.hex_digest(original_name.as_bytes());
    let (_, extension) = split_extension(original_name);

    let mut name = String::with_capacity(
        prefix.len() + options.separator.len() + options.digest_length + extension.len(),
    );
    if !prefix.is_empty() {
        name.push_str(prefix);
        name.push_str(&options.separator);
    }
    name.push_str(&digest[..options.digest_length]);
    name.push_str(extension);
    Ok(name)
}
