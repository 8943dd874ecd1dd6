//! Canonical serialization and integrity hashing of tool arguments.
//!
//! The canonical form is the *sole* basis for the integrity hash that
//! binds a tool proposal to its arguments: semantically equal arguments
//! must yield byte-identical canonical text. The risk gate recomputes
//! both and compares them against what the executor claimed.

mod canonical;

pub use canonical::canonicalize;

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of the canonical argument text (UTF-8 bytes).
pub fn args_hash(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Canonicalize `args` and hash the result in one step.
pub fn canonicalize_and_hash(args: &serde_json::Value) -> wd_domain::error::Result<(String, String)> {
    let canonical = canonicalize(args)?;
    let hash = args_hash(&canonical);
    Ok((canonical, hash))
}
