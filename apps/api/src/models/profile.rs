use serde::{Deserialize, Serialize};

/// A candidate profile as returned by the external search source.
/// Never mutated after it leaves the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProfile {
    pub external_id: String,
    pub handle: String,
    pub display_name: String,
    pub bio: String,
    pub follower_count: u64,
    pub following_count: u64,
    pub avatar_url: String,
    pub banner_url: Option<String>,
    pub recent_activity_text: String,
}

/// Normalizes a handle into its storage identity: surrounding whitespace
/// trimmed and leading `@` stripped. Case is preserved.
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_string()
}
