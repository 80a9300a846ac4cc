use std::fmt;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;

use aws_sdk_s3::types::{DeleteMarkerEntry, ObjectIdentifier, ObjectVersion};
use zeroize_derive::{Zeroize, ZeroizeOnDrop};

pub mod error;
pub mod token;

/// Delimiter used to discover top-level prefixes.
pub const PREFIX_DELIMITER: &str = "/";

/// One deletable unit: a specific version of a key.
///
/// Produced by a listing worker and consumed exactly once by a deletion
/// worker. Unversioned objects are listed with the version id `"null"`,
/// which is kept verbatim because it addresses the null version; `None` is
/// only used when the listing carries no version id at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentity {
    pub key: String,
    pub version_id: Option<String>,
}

impl ObjectIdentity {
    pub fn new(key: impl Into<String>, version_id: Option<String>) -> Self {
        Self {
            key: key.into(),
            version_id,
        }
    }

    pub fn from_object_version(version: &ObjectVersion) -> Option<Self> {
        Some(Self::new(
            version.key()?,
            version.version_id().map(String::from),
        ))
    }

    pub fn from_delete_marker(marker: &DeleteMarkerEntry) -> Option<Self> {
        Some(Self::new(marker.key()?, marker.version_id().map(String::from)))
    }

    /// Build the identifier used by the DeleteObjects API.
    pub fn to_object_identifier(&self) -> ObjectIdentifier {
        ObjectIdentifier::builder()
            .key(&self.key)
            .set_version_id(self.version_id.clone())
            .build()
            // key is always set above, so the builder cannot fail.
            .expect("ObjectIdentifier build failed")
    }
}

/// An independent ListObjectVersions stream handled by one listing worker.
///
/// Top-level common prefixes are listed recursively (no delimiter). The root
/// shard lists with the `/` delimiter so it only sees keys that do not belong
/// to any common prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingShard {
    pub prefix: String,
    pub delimiter: Option<String>,
}

impl ListingShard {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: None,
        }
    }

    pub fn root() -> Self {
        Self {
            prefix: String::new(),
            delimiter: Some(PREFIX_DELIMITER.to_string()),
        }
    }

    pub fn is_root(&self) -> bool {
        self.prefix.is_empty() && self.delimiter.is_some()
    }
}

impl fmt::Display for ListingShard {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.prefix)
        }
    }
}

/// AWS configuration file locations.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigLocation {
    pub aws_config_file: Option<PathBuf>,
    pub aws_shared_credentials_file: Option<PathBuf>,
}

/// AWS credential sources.
#[derive(Debug, Clone)]
pub enum S3Credentials {
    Profile(String),
    Credentials { access_keys: AccessKeys },
    FromEnvironment,
}

/// AWS access key pair, cleared from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessKeys {
    pub access_key: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Debug for AccessKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys = f.debug_struct("AccessKeys");
        let session_token = self
            .session_token
            .as_ref()
            .map_or("None", |_| "** redacted **");
        keys.field("access_key", &self.access_key)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &session_token);
        keys.finish()
    }
}
