//! Fire-and-forget notifications to the host application.

use bridge_traits::channel::topics;
use bridge_traits::HostChannel;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Serialize)]
struct LogEventContent<'a> {
    event: &'a str,
    params: Option<&'a HashMap<String, String>>,
}

/// Posts topic messages to the host. Without a host channel every post is a
/// logged no-op.
pub struct NativeChannel {
    host: Option<Arc<dyn HostChannel>>,
}

impl NativeChannel {
    pub fn new(host: Option<Arc<dyn HostChannel>>) -> Self {
        Self { host }
    }

    /// Returns whether a host channel received the message.
    pub fn post(&self, topic: &str, content: &str) -> bool {
        match &self.host {
            Some(host) => {
                debug!(topic, content_len = content.len(), "Posting to host channel");
                host.post(topic.as_bytes(), content.as_bytes());
                true
            }
            None => {
                debug!(topic, "No host channel; message dropped");
                false
            }
        }
    }

    /// Analytics event, posted as `{"event", "params"}` JSON.
    pub fn log_event(&self, event: &str, params: Option<&HashMap<String, String>>) -> bool {
        match serde_json::to_string(&LogEventContent { event, params }) {
            Ok(content) => self.post(topics::LOG_EVENT, &content),
            Err(e) => {
                warn!(event, error = %e, "Failed to encode log event");
                false
            }
        }
    }

    pub fn default_user_agent(&self, user_agent: &str) -> bool {
        self.post(topics::DEFAULT_USER_AGENT, user_agent)
    }

    pub fn update_status(&self, running: bool) -> bool {
        self.post(topics::UPDATE_STATUS, if running { "START" } else { "STOP" })
    }

    pub fn download_started(&self) -> bool {
        self.post(topics::DOWNLOAD_START, "")
    }
}

impl fmt::Debug for NativeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeChannel")
            .field("host", &self.host.as_ref().map(|_| "HostChannel { ... }"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingHost {
        posts: Mutex<Vec<(String, String)>>,
    }

    impl HostChannel for RecordingHost {
        fn post(&self, topic: &[u8], content: &[u8]) {
            self.posts.lock().push((
                String::from_utf8_lossy(topic).into_owned(),
                String::from_utf8_lossy(content).into_owned(),
            ));
        }
    }

    #[test]
    fn test_topics() {
        let host = Arc::new(RecordingHost::default());
        let channel = NativeChannel::new(Some(host.clone()));

        assert!(channel.default_user_agent("Mozilla/5.0"));
        assert!(channel.update_status(false));
        assert!(channel.download_started());

        assert_eq!(
            *host.posts.lock(),
            vec![
                ("USERAGENT:DEFAULT".to_string(), "Mozilla/5.0".to_string()),
                ("UPDATE:STATUS".to_string(), "STOP".to_string()),
                ("DOWNLOAD:START".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_log_event_payload() {
        let host = Arc::new(RecordingHost::default());
        let channel = NativeChannel::new(Some(host.clone()));

        let mut params = HashMap::new();
        params.insert("source".to_string(), "42".to_string());
        channel.log_event("library_update", Some(&params));
        channel.log_event("app_start", None);

        let posts = host.posts.lock();
        assert_eq!(posts[0].0, "LOG_EVENT");
        assert_eq!(
            posts[0].1,
            r#"{"event":"library_update","params":{"source":"42"}}"#
        );
        assert_eq!(posts[1].1, r#"{"event":"app_start","params":null}"#);
    }

    #[test]
    fn test_without_host() {
        assert!(!NativeChannel::new(None).post("LOG_EVENT", "{}"));
    }
}
