#![cfg(feature = "ffi")]

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{NativeAddress, WebEngine};
use core_runtime::config::{BridgeConfig, FeatureFlags, DEFAULT_EVENT_BUFFER_SIZE};
use core_service::ffi::{
    install, installed, native_bridge_deliver_event, DELIVERY_DROPPED, DELIVERY_ROUTED,
    DELIVERY_UNAVAILABLE,
};
use core_service::{BridgeService, ServiceError};
use mockall::mock;
use std::ffi::CString;
use std::ptr;
use std::sync::Arc;

mock! {
    pub Web {}

    impl WebEngine for Web {
        fn create_instance(&self) -> BridgeResult<NativeAddress>;
        fn invoke(&self, instance: NativeAddress, method: &str, payload_json: &str) -> BridgeResult<()>;
        fn release_instance(&self, instance: NativeAddress);
    }
}

fn service() -> BridgeService {
    let mut engine = MockWeb::new();
    engine.expect_create_instance().returning(|| Ok(0x42));
    engine.expect_release_instance().return_const(());

    BridgeService::new(BridgeConfig {
        image_engine: None,
        net_engine: None,
        web_engine: Some(Arc::new(engine)),
        cookie_store: None,
        host_channel: None,
        features: FeatureFlags::default(),
        event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
    })
    .unwrap()
}

// Installation is process-wide, so the whole lifecycle runs in one test.
#[test]
fn test_deliver_event_lifecycle() {
    let method = CString::new("onNativeLoadProgress").unwrap();
    let payload = CString::new(r#"{"progress":100}"#).unwrap();

    unsafe {
        assert!(installed().is_none());
        assert_eq!(
            native_bridge_deliver_event(0x42, method.as_ptr(), payload.as_ptr()),
            DELIVERY_UNAVAILABLE
        );

        let installed_service = install(service()).unwrap();
        assert!(matches!(
            install(service()),
            Err(ServiceError::AlreadyInstalled)
        ));

        // No live object yet.
        assert_eq!(
            native_bridge_deliver_event(0x42, method.as_ptr(), payload.as_ptr()),
            DELIVERY_DROPPED
        );

        let view = installed_service.create_web_view().unwrap();
        assert_eq!(view.object_id(), 0x42);
        assert_eq!(
            native_bridge_deliver_event(0x42, method.as_ptr(), payload.as_ptr()),
            DELIVERY_ROUTED
        );

        // Bad input is dropped, not fatal.
        assert_eq!(
            native_bridge_deliver_event(0x42, ptr::null(), payload.as_ptr()),
            DELIVERY_DROPPED
        );
        let unknown = CString::new("onSomethingElse").unwrap();
        assert_eq!(
            native_bridge_deliver_event(0x42, unknown.as_ptr(), ptr::null()),
            DELIVERY_DROPPED
        );
        let broken = CString::new("{progress").unwrap();
        assert_eq!(
            native_bridge_deliver_event(0x42, method.as_ptr(), broken.as_ptr()),
            DELIVERY_DROPPED
        );

        drop(view);
        assert_eq!(
            native_bridge_deliver_event(0x42, method.as_ptr(), payload.as_ptr()),
            DELIVERY_DROPPED
        );
    }
}
