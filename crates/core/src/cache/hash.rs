//! Request identity hashing for cache entries.

use sha2::{Digest, Sha256};

/// Hex SHA-256 of `METHOD url`, the primary key of a cached response.
///
/// `url` is expected in canonical form; the method is uppercased here.
pub fn request_key(method: &str, url: &str) -> String {
    let identity = format!("{} {}", method.to_ascii_uppercase(), url);
    hex::encode(Sha256::digest(identity.as_bytes()))
}
