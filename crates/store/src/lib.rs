//! Persistence for the graph runtime: the content-addressed eviction
//! store for oversized tool outputs, and the per-thread state store
//! that makes turns resumable across process restarts.

mod eviction;
mod state;

pub use eviction::EvictionStore;
pub use state::StateStore;

use wd_domain::error::{Error, Result};

/// Thread ids become path components in both stores; constrain them to
/// a filename-safe alphabet.
pub(crate) fn validate_id(id: &str) -> Result<()> {
    if id.is_empty()
        || !id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(Error::PathEscape(format!(
            "invalid thread id '{id}': expected [A-Za-z0-9_-]+"
        )));
    }
    Ok(())
}
