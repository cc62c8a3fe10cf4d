//! Session store adapters
//!
//! Both stores implement the
//! [`SessionStore`](roundtable_application::SessionStore) port:
//!
//! | Store | Backing | Use |
//! |-------|---------|-----|
//! | [`FileSessionStore`] | one directory per session + `sessions_index.json` | CLI runs |
//! | [`MemorySessionStore`] | process memory | tests, embedding |

mod file_store;
mod memory_store;

pub use file_store::FileSessionStore;
pub use memory_store::MemorySessionStore;

use chrono::Utc;

/// New session id: `session_<YYYYmmdd_HHMMSS>_<8 hex>`
///
/// The random suffix keeps ids unique when sessions start in the same second.
pub fn new_session_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "session_{}_{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        &suffix[..8]
    )
}

/// Session ids become directory names; anything path-like is rejected
pub(crate) fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
