use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{BridgeError, CookieStore, HostChannel, NativeAddress, WebEngine};
use core_bridge::webview::tags;
use core_bridge::{BridgeContext, CoreError, Delivery};
use core_runtime::config::{BridgeConfig, FeatureFlags, DEFAULT_EVENT_BUFFER_SIZE};
use core_runtime::events::{BridgeEvent, LifecycleEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[derive(Default)]
struct StubWeb {
    next: AtomicU64,
}

impl WebEngine for StubWeb {
    fn create_instance(&self) -> BridgeResult<NativeAddress> {
        Ok(0x100 + self.next.fetch_add(1, Ordering::SeqCst))
    }

    fn invoke(&self, _instance: NativeAddress, _method: &str, _payload_json: &str) -> BridgeResult<()> {
        Ok(())
    }

    fn release_instance(&self, _instance: NativeAddress) {}
}

#[derive(Default)]
struct MemoryJar {
    cookies: Mutex<HashMap<String, String>>,
    fail: bool,
}

impl CookieStore for MemoryJar {
    fn get_cookie(&self, url: &str) -> BridgeResult<Option<String>> {
        if self.fail {
            return Err(BridgeError::NotAvailable("jar locked".to_string()));
        }
        Ok(self.cookies.lock().get(url).cloned())
    }

    fn set_cookie(&self, url: &str, value: &str) -> BridgeResult<()> {
        if self.fail {
            return Err(BridgeError::NotAvailable("jar locked".to_string()));
        }
        self.cookies
            .lock()
            .insert(url.to_string(), value.to_string());
        Ok(())
    }
}

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

/// Configuration with nothing injected, bypassing any platform defaults.
fn bare_config() -> BridgeConfig {
    BridgeConfig {
        image_engine: None,
        net_engine: None,
        web_engine: None,
        cookie_store: None,
        host_channel: None,
        features: FeatureFlags::default(),
        event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
    }
}

fn web_context() -> BridgeContext {
    let mut config = bare_config();
    config.web_engine = Some(Arc::new(StubWeb::default()));
    BridgeContext::new(config).unwrap()
}

#[test]
fn test_missing_capabilities() {
    let context = BridgeContext::new(bare_config()).unwrap();

    assert!(matches!(
        context.create_web_view(),
        Err(CoreError::CapabilityMissing {
            capability: "WebEngine",
            ..
        })
    ));
    assert!(matches!(
        context.net(),
        Err(CoreError::CapabilityMissing {
            capability: "NetEngine",
            ..
        })
    ));
    assert!(matches!(
        context.decode_bitmap(b"png"),
        Err(CoreError::CapabilityMissing {
            capability: "ImageEngine",
            ..
        })
    ));
    assert!(matches!(
        context.create_bitmap(1, 1),
        Err(CoreError::CapabilityMissing { .. })
    ));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = bare_config();
    config.event_buffer_size = 0;
    assert!(matches!(
        BridgeContext::new(config),
        Err(CoreError::Config(_))
    ));

    let mut config = bare_config();
    config.features.enable_native_cookie = true;
    assert!(matches!(
        BridgeContext::new(config),
        Err(CoreError::Config(_))
    ));
}

#[test]
fn test_unknown_object_is_noop() {
    let context = web_context();
    let mut stream = context.subscribe();

    assert_eq!(
        context.deliver_event(0xdead, tags::LOAD_PROGRESS, r#"{"progress":10}"#),
        Delivery::UnknownObject
    );
    assert_eq!(context.live_objects(), 0);
    assert_eq!(
        stream.try_recv().unwrap().unwrap(),
        BridgeEvent::Lifecycle(LifecycleEvent::EventDropped {
            object_id: 0xdead,
            method: tags::LOAD_PROGRESS.to_string(),
        })
    );
}

#[test]
fn test_contexts_are_isolated() {
    let first = web_context();
    let second = web_context();

    let view = first.create_web_view().unwrap();
    assert_eq!(first.live_objects(), 1);
    assert_eq!(second.live_objects(), 0);

    assert_eq!(
        second.deliver_event(view.object_id(), tags::LOAD_PROGRESS, r#"{"progress":1}"#),
        Delivery::UnknownObject
    );
    assert_eq!(
        first.deliver_event(view.object_id(), tags::LOAD_PROGRESS, r#"{"progress":1}"#),
        Delivery::Routed
    );

    drop(view);
    assert_eq!(first.live_objects(), 0);
}

#[test]
fn test_pending_callbacks_tracked_per_context() {
    let context = web_context();
    let view = context.create_web_view().unwrap();

    view.evaluate_javascript("a()", Some(|_: Option<String>| {}))
        .unwrap();
    assert_eq!(context.pending_callbacks(), 1);

    context.deliver_event(
        view.object_id(),
        tags::EVALUATE_RESULT,
        r#"{"callbackId":1,"result":null}"#,
    );
    assert_eq!(context.pending_callbacks(), 0);
}

#[test]
fn test_delivery_races_with_destroy() {
    let context = Arc::new(web_context());
    let view = context.create_web_view().unwrap();
    let object_id = view.object_id();
    let barrier = Arc::new(Barrier::new(5));

    let deliverers: Vec<_> = (0..4)
        .map(|_| {
            let context = Arc::clone(&context);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..100)
                    .map(|i| {
                        context.deliver_event(
                            object_id,
                            tags::LOAD_PROGRESS,
                            &format!(r#"{{"progress":{}}}"#, i),
                        )
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    barrier.wait();
    view.destroy();

    for deliverer in deliverers {
        for delivery in deliverer.join().unwrap() {
            assert!(matches!(
                delivery,
                Delivery::Routed | Delivery::UnknownObject
            ));
        }
    }
    assert_eq!(
        context.deliver_event(object_id, tags::LOAD_PROGRESS, r#"{"progress":1}"#),
        Delivery::UnknownObject
    );
}

#[test]
fn test_cookie_bridge() {
    let jar = Arc::new(MemoryJar::default());
    let mut config = bare_config();
    config.cookie_store = Some(jar.clone());
    config.features.enable_native_cookie = true;
    let context = BridgeContext::new(config).unwrap();
    let cookies = context.cookies();

    assert!(cookies.is_enabled());
    cookies.set_cookie("example.com", "sid=1");
    cookies.set_cookie("https://secure.example.com", "sid=2");
    cookies.set_cookie("", "ignored=1");
    cookies.set_cookie("example.org", "");

    assert_eq!(
        jar.cookies.lock().get("http://example.com").map(String::as_str),
        Some("sid=1")
    );
    assert_eq!(jar.cookies.lock().len(), 2);

    assert_eq!(cookies.get_cookie("example.com").as_deref(), Some("sid=1"));
    assert_eq!(
        cookies.get_cookie("https://secure.example.com").as_deref(),
        Some("sid=2")
    );
    assert_eq!(cookies.get_cookie("unknown.example.com"), None);
    assert_eq!(cookies.get_cookie(""), None);

    jar.cookies
        .lock()
        .insert("http://empty.example.com".to_string(), String::new());
    assert_eq!(cookies.get_cookie("empty.example.com"), None);
}

#[test]
fn test_cookie_store_failures_are_swallowed() {
    let jar = Arc::new(MemoryJar {
        fail: true,
        ..Default::default()
    });
    let mut config = bare_config();
    config.cookie_store = Some(jar);
    config.features.enable_native_cookie = true;
    let context = BridgeContext::new(config).unwrap();

    context.cookies().set_cookie("example.com", "sid=1");
    assert_eq!(context.cookies().get_cookie("example.com"), None);
}

#[test]
fn test_cookies_disabled_by_flag() {
    let jar = Arc::new(MemoryJar::default());
    let mut config = bare_config();
    config.cookie_store = Some(jar.clone());
    let context = BridgeContext::new(config).unwrap();

    context.cookies().set_cookie("example.com", "sid=1");
    assert!(jar.cookies.lock().is_empty());
    assert_eq!(
        context.cookies().get_cookie("example.com"),
        Some(String::new())
    );
}

#[test]
fn test_host_channel() {
    let host = Arc::new(RecordingHost::default());
    let mut config = bare_config();
    config.host_channel = Some(host.clone());
    let context = BridgeContext::new(config).unwrap();

    assert!(context.channel().update_status(true));
    assert!(context.channel().post("CUSTOM:TOPIC", "payload"));

    assert_eq!(
        *host.posts.lock(),
        vec![
            ("UPDATE:STATUS".to_string(), "START".to_string()),
            ("CUSTOM:TOPIC".to_string(), "payload".to_string()),
        ]
    );

    let silent = BridgeContext::new(bare_config()).unwrap();
    assert!(!silent.channel().download_started());
}
