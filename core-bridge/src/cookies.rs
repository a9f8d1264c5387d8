//! Cookie access routed to the native cookie store.

use bridge_traits::CookieStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads and writes cookies through the native [`CookieStore`] when native
/// cookies are enabled.
///
/// Failures of the store are logged and swallowed. Scheme-less URLs are
/// treated as `http://`.
pub struct CookieBridge {
    store: Option<Arc<dyn CookieStore>>,
    enabled: bool,
}

impl CookieBridge {
    pub fn new(store: Option<Arc<dyn CookieStore>>, enabled: bool) -> Self {
        Self { store, enabled }
    }

    /// Bridge that ignores writes and reports empty cookies.
    pub fn disabled() -> Self {
        Self::new(None, false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && self.store.is_some()
    }

    pub fn set_cookie(&self, url: &str, value: &str) {
        debug!(url, enabled = self.enabled, "Set cookie");
        let Some(store) = self.active_store() else {
            return;
        };
        if url.is_empty() || value.is_empty() {
            return;
        }

        let url = with_scheme(url);
        if let Err(e) = store.set_cookie(&url, value) {
            warn!(url = %url, error = %e, "Native set_cookie failed");
        }
    }

    /// Cookie header value for `url`.
    ///
    /// `Some("")` while native cookies are disabled, `None` for an empty URL,
    /// a store failure, or when the store has no cookie.
    pub fn get_cookie(&self, url: &str) -> Option<String> {
        debug!(url, enabled = self.enabled, "Get cookie");
        let Some(store) = self.active_store() else {
            return Some(String::new());
        };
        if url.is_empty() {
            return None;
        }

        let url = with_scheme(url);
        match store.get_cookie(&url) {
            Ok(cookie) => cookie.filter(|c| !c.is_empty()),
            Err(e) => {
                warn!(url = %url, error = %e, "Native get_cookie failed");
                None
            }
        }
    }

    fn active_store(&self) -> Option<&Arc<dyn CookieStore>> {
        if self.enabled {
            self.store.as_ref()
        } else {
            None
        }
    }
}

impl fmt::Debug for CookieBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieBridge")
            .field("enabled", &self.enabled)
            .field("store", &self.store.as_ref().map(|_| "CookieStore { ... }"))
            .finish()
    }
}

fn with_scheme(url: &str) -> String {
    let has_scheme = url
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("http"));
    if has_scheme {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}
