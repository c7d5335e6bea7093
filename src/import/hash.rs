//! Content hashing for import identity.
//!
//! Records without a source-native identifier get a SHA256 fingerprint of
//! their identifying fields, so that importing the same export twice yields
//! the same `sourceId` (and therefore the same event id).

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Compute a SHA256 hash of a serializable value.
///
/// The value is serialized to JSON and hashed, giving a deterministic
/// fingerprint of its content. Values that fail to serialize hash as the
/// empty document.
#[must_use]
pub fn content_hash<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_string(value).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Short (16 hex chars) SHA256 fingerprint of a string key.
#[must_use]
pub fn fingerprint(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row<'a> {
        company: &'a str,
        started: &'a str,
    }

    #[test]
    fn test_content_hash_deterministic() {
        let row = Row { company: "Acme", started: "Jan 2020" };

        let hash1 = content_hash(&row);
        let hash2 = content_hash(&row);

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_content_hash_changes_with_content() {
        let a = content_hash(&Row { company: "Acme", started: "Jan 2020" });
        let b = content_hash(&Row { company: "Acme", started: "Feb 2020" });
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_is_short_and_stable() {
        assert_eq!(fingerprint("google:a/b.jpg").len(), 16);
        assert_eq!(fingerprint("x"), fingerprint("x"));
        assert_ne!(fingerprint("x"), fingerprint("y"));
    }
}
