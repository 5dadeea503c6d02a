use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Logical coordinates of an upload: which box, which version, which provider.
///
/// Only used to namespace the session URLs; it carries no hashing semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadScope {
    pub owner: String,
    pub box_name: String,
    pub version: String,
    pub provider: String,
}

impl UploadScope {
    pub fn new(
        owner: impl Into<String>,
        box_name: impl Into<String>,
        version: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            box_name: box_name.into(),
            version: version.into(),
            provider: provider.into(),
        }
    }

    /// Builds a scope from a `owner/name` box tag.
    pub fn from_tag(
        tag: &str,
        version: impl Into<String>,
        provider: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        let Some((owner, name)) = tag.split_once('/') else {
            return Err(ProtocolError::InvalidTag(tag.to_string()));
        };
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(ProtocolError::InvalidTag(tag.to_string()));
        }
        Ok(Self::new(owner, name, version, provider))
    }
}

impl fmt::Display for UploadScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} v{} {}",
            self.owner, self.box_name, self.version, self.provider
        )
    }
}

/// Hex-encoded digest of a box file; the content-addressing key of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wraps a digest, normalizing it to lower-case hex.
    pub fn parse(hex_digest: &str) -> Result<Self, ProtocolError> {
        let trimmed = hex_digest.trim();
        if trimmed.is_empty()
            || trimmed.len() % 2 != 0
            || !trimmed.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(ProtocolError::InvalidChecksum(hex_digest.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Encodes raw digest bytes.
    pub fn from_digest(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest algorithm tag sent alongside the checksum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumType {
    #[default]
    Md5,
    Sha1,
    Sha256,
}

impl ChecksumType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumType::Md5 => "md5",
            ChecksumType::Sha1 => "sha1",
            ChecksumType::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChecksumType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(ChecksumType::Md5),
            "sha1" => Ok(ChecksumType::Sha1),
            "sha256" => Ok(ChecksumType::Sha256),
            _ => Err(ProtocolError::UnknownChecksumType(s.to_string())),
        }
    }
}

/// Server-side state of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    #[serde(rename = "S")]
    Started,
    #[serde(rename = "I")]
    InProgress,
    #[serde(rename = "C")]
    Completed,
}

/// Upload session as represented by the registry.
///
/// `offset` is the number of bytes the server has durably accepted and is
/// always in `[0, file_size]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSessionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub file_size: u64,
    #[serde(default)]
    pub offset: u64,
    pub checksum: ContentHash,
    #[serde(default)]
    pub checksum_type: ChecksumType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_expires: Option<String>,
}

impl UploadSessionInfo {
    /// Returns `true` once every declared byte has been accepted.
    pub fn is_complete(&self) -> bool {
        self.offset >= self.file_size
    }

    /// Bytes the server still expects.
    pub fn remaining(&self) -> u64 {
        self.file_size.saturating_sub(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_from_tag() {
        let scope = UploadScope::from_tag("hashicorp/precise64", "1.0.0", "virtualbox").unwrap();
        assert_eq!(scope.owner, "hashicorp");
        assert_eq!(scope.box_name, "precise64");
        assert_eq!(scope.to_string(), "hashicorp/precise64 v1.0.0 virtualbox");
    }

    #[test]
    fn scope_rejects_bad_tags() {
        assert!(UploadScope::from_tag("precise64", "1.0.0", "vb").is_err());
        assert!(UploadScope::from_tag("/precise64", "1.0.0", "vb").is_err());
        assert!(UploadScope::from_tag("a/b/c", "1.0.0", "vb").is_err());
    }

    #[test]
    fn content_hash_normalizes_case() {
        let hash = ContentHash::parse("D41D8CD98F00B204E9800998ECF8427E").unwrap();
        assert_eq!(hash.as_str(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn content_hash_rejects_non_hex() {
        assert!(ContentHash::parse("").is_err());
        assert!(ContentHash::parse("xyz0").is_err());
        assert!(ContentHash::parse("abc").is_err());
    }

    #[test]
    fn checksum_type_wire_names() {
        assert_eq!(serde_json::to_string(&ChecksumType::Md5).unwrap(), "\"md5\"");
        assert_eq!(
            serde_json::to_string(&ChecksumType::Sha256).unwrap(),
            "\"sha256\""
        );
        assert_eq!("SHA1".parse::<ChecksumType>().unwrap(), ChecksumType::Sha1);
        assert!("crc32".parse::<ChecksumType>().is_err());
    }

    #[test]
    fn session_info_from_server_json() {
        let json = r#"{
            "url": "http://localhost/api/v1/boxes/u/b/uploads/abc/",
            "id": "0f1c",
            "user": "u",
            "tag": "u/b",
            "date_created": "2016-07-10T13:57:00Z",
            "date_expires": "2016-07-11T13:57:00Z",
            "file_size": 12582912,
            "offset": 5242880,
            "status": "I",
            "checksum_type": "md5",
            "checksum": "abcd"
        }"#;
        let info: UploadSessionInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.offset, 5_242_880);
        assert_eq!(info.status, Some(SessionStatus::InProgress));
        assert_eq!(info.remaining(), 12_582_912 - 5_242_880);
        assert!(!info.is_complete());
    }

    #[test]
    fn session_info_minimal() {
        let json = r#"{"file_size": 10, "checksum": "00ff"}"#;
        let info: UploadSessionInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.offset, 0);
        assert_eq!(info.checksum_type, ChecksumType::Md5);
        assert!(info.status.is_none());
    }
}
