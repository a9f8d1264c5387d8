//! Host Notification Channel
//!
//! Fire-and-forget messages from the core to the host application, keyed by
//! a topic string.

/// Well-known topics posted by the core.
pub mod topics {
    pub const LOG_EVENT: &str = "LOG_EVENT";
    pub const DEFAULT_USER_AGENT: &str = "USERAGENT:DEFAULT";
    pub const UPDATE_STATUS: &str = "UPDATE:STATUS";
    pub const DOWNLOAD_START: &str = "DOWNLOAD:START";
}

/// Host channel trait
///
/// Both arguments are UTF-8. Delivery is best effort; the host is not
/// expected to answer.
pub trait HostChannel: Send + Sync {
    fn post(&self, topic: &[u8], content: &[u8]);
}
