//! Host channel that records messages in the tracing log.
//!
//! Desktop hosts have no native shell listening for topic messages, so they
//! end up in the application log instead.

use bridge_traits::channel::HostChannel;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct TracingChannel;

impl TracingChannel {
    pub fn new() -> Self {
        Self
    }
}

impl HostChannel for TracingChannel {
    fn post(&self, topic: &[u8], content: &[u8]) {
        info!(
            topic = %String::from_utf8_lossy(topic),
            content_len = content.len(),
            "Host channel message"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_accepts_non_utf8() {
        TracingChannel::new().post(b"LOG_EVENT", &[0xff, 0xfe]);
    }
}
