//! Chat session ids
//!
//! One session id per site and browsing session, kept in a session-scoped
//! store so that reloads continue the same backend conversation.

use crate::store::StateStore;
use tracing::{info, warn};
use uuid::Uuid;

/// Storage key for a site's session id
pub fn session_key(site_key: &str) -> String {
    format!("chatbot-session-{}", site_key)
}

/// Return the stored session id for a site, creating one if needed
///
/// If the store is unavailable a fresh id is returned for this page view
/// only.
pub fn session_id_for(store: &dyn StateStore, site_key: &str) -> String {
    let key = session_key(site_key);

    match store.get(&key) {
        Ok(Some(existing)) if !existing.trim().is_empty() => {
            info!("Existing session restored: {}", existing);
            existing
        }
        Ok(_) => {
            let session_id = Uuid::new_v4().to_string();
            if let Err(e) = store.set(&key, &session_id) {
                warn!("Failed to store session id, using temporary session: {}", e);
            } else {
                info!("New session created: {}", session_id);
            }
            session_id
        }
        Err(e) => {
            warn!("Failed to access session store, using temporary session: {}", e);
            Uuid::new_v4().to_string()
        }
    }
}
