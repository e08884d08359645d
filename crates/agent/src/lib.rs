pub mod bridge;
pub mod channel;

pub use bridge::AgentBridge;
pub use channel::AgentChannel;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio::sync::{mpsc, Mutex};

    use tabwire_browser::{
        BrowserSurface, CaptureOptions, CookieDetails, CookieFilter, CreateTabParams, FrameInfo,
        FrameResult, PageFunction, ScriptInjection, TabId, TabInfo,
    };
    use tabwire_core::envelope::AgentRequest;
    use tabwire_core::{Error, Result};
    use tabwire_transport::Reply;

    use crate::AgentBridge;

    /// Surface double that answers every injection with a canned value and
    /// records what was injected.
    struct StubSurface {
        script_result: Value,
        injections: Mutex<Vec<ScriptInjection>>,
    }

    impl StubSurface {
        fn returning(value: Value) -> Self {
            Self {
                script_result: value,
                injections: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BrowserSurface for StubSurface {
        async fn list_tabs(&self) -> Result<Vec<TabInfo>> {
            Ok(Vec::new())
        }
        async fn create_tab(&self, _params: CreateTabParams) -> Result<TabInfo> {
            Err(Error::Other("not stubbed".into()))
        }
        async fn close_tab(&self, _tab_id: TabId) -> Result<()> {
            Ok(())
        }
        async fn activate_tab(&self, _tab_id: TabId) -> Result<()> {
            Ok(())
        }
        async fn reload_tab(&self, _tab_id: TabId, _bypass_cache: bool) -> Result<()> {
            Ok(())
        }
        async fn set_tab_url(&self, _tab_id: TabId, _url: &str) -> Result<()> {
            Ok(())
        }
        async fn wait_for_load(&self, _tab_id: TabId) -> Result<()> {
            Ok(())
        }
        async fn go_back(&self, _tab_id: TabId) -> Result<()> {
            Ok(())
        }
        async fn go_forward(&self, _tab_id: TabId) -> Result<()> {
            Ok(())
        }
        async fn execute_script(&self, injection: ScriptInjection) -> Result<Vec<FrameResult>> {
            self.injections.lock().await.push(injection);
            Ok(vec![FrameResult {
                frame_id: 0,
                result: self.script_result.clone(),
            }])
        }
        async fn capture_visible_tab(&self, _opts: CaptureOptions) -> Result<String> {
            Err(Error::Other("not stubbed".into()))
        }
        async fn get_cookies(&self, _filter: CookieFilter) -> Result<Value> {
            Ok(json!([]))
        }
        async fn set_cookie(&self, _details: CookieDetails) -> Result<Value> {
            Ok(Value::Null)
        }
        async fn delete_cookie(&self, _url: &str, _name: &str) -> Result<()> {
            Ok(())
        }
        async fn get_frames(&self, _tab_id: TabId) -> Result<Vec<FrameInfo>> {
            Ok(Vec::new())
        }
    }

    fn bridge_with(surface: StubSurface, timeout_ms: u64) -> Arc<AgentBridge> {
        Arc::new(AgentBridge::new(
            Arc::new(surface),
            Duration::from_millis(timeout_ms),
        ))
    }

    #[tokio::test]
    async fn test_forward_without_agent_falls_back_to_injection() {
        let bridge = bridge_with(StubSurface::returning(json!({"tag": "button"})), 1000);

        let result = bridge
            .forward(
                7,
                &PageFunction::ElementInfo {
                    selector: "#submit".into(),
                    include_styles: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(result, json!({"tag": "button"}));
    }

    #[tokio::test]
    async fn test_forward_routes_through_connected_agent() {
        let bridge = bridge_with(StubSurface::returning(json!("unreached")), 1000);
        let (tx, mut rx) = mpsc::channel::<String>(4);
        bridge.attach(3, tx).await;

        // Answer the forwarded request like a page agent would.
        let responder = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                let frame = rx.recv().await.unwrap();
                let request: AgentRequest = serde_json::from_str(&frame).unwrap();
                assert_eq!(request.command, "highlightElement");
                bridge
                    .resolve_response(&request.id, Reply::Result(json!({"highlighted": true})))
                    .await
            })
        };

        let result = bridge
            .forward(
                3,
                &PageFunction::Highlight {
                    selector: ".hit".into(),
                    outline: None,
                    background: None,
                    duration_ms: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(result, json!({"highlighted": true}));
        assert!(responder.await.unwrap());
    }

    #[tokio::test]
    async fn test_forward_times_out_with_agent_error() {
        let bridge = bridge_with(StubSurface::returning(Value::Null), 50);
        let (tx, _rx) = mpsc::channel::<String>(4);
        bridge.attach(1, tx).await;

        let err = bridge
            .forward(1, &PageFunction::DomSnapshot { root: None })
            .await
            .unwrap_err();
        match err {
            Error::Timeout(msg) => assert!(msg.contains("page agent")),
            other => panic!("expected timeout, got {other}"),
        }
        // The waiter is gone; a late reply resolves nothing.
        assert!(
            !bridge
                .resolve_response(&"agent-1-1".into(), Reply::Result(Value::Null))
                .await
        );
    }

    #[tokio::test]
    async fn test_disconnect_rejects_pending_forward() {
        let bridge = bridge_with(StubSurface::returning(Value::Null), 5_000);
        let (tx, _rx) = mpsc::channel::<String>(4);
        bridge.attach(9, tx).await;

        let pending = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                bridge
                    .forward(9, &PageFunction::DomSnapshot { root: None })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        bridge.detach(9).await;

        let err = pending.await.unwrap().unwrap_err();
        match err {
            Error::Handler(msg) => assert!(msg.contains("disconnected")),
            other => panic!("expected rejection, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_agent_error_reply_surfaces_as_handler_error() {
        let bridge = bridge_with(StubSurface::returning(Value::Null), 1000);
        let (tx, mut rx) = mpsc::channel::<String>(4);
        bridge.attach(2, tx).await;

        let responder = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                let frame = rx.recv().await.unwrap();
                let request: AgentRequest = serde_json::from_str(&frame).unwrap();
                bridge
                    .resolve_response(&request.id, Reply::Error("No element matches".into()))
                    .await
            })
        };

        let err = bridge
            .forward(
                2,
                &PageFunction::ElementInfo {
                    selector: "#gone".into(),
                    include_styles: false,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No element matches");
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_frame_scoped_injection_forwards_through_agent() {
        let bridge = bridge_with(StubSurface::returning(json!("unreached")), 1000);
        let (tx, mut rx) = mpsc::channel::<String>(4);
        bridge.attach(5, tx).await;

        let responder = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                let frame = rx.recv().await.unwrap();
                let request: AgentRequest = serde_json::from_str(&frame).unwrap();
                assert_eq!(request.command, "click");
                assert_eq!(request.params["frameId"], json!(7));
                bridge
                    .resolve_response(&request.id, Reply::Result(json!(true)))
                    .await
            })
        };

        let injection = ScriptInjection {
            tab_id: 5,
            func: PageFunction::Click {
                selector: "#go".into(),
                index: 0,
            },
            world: tabwire_browser::ScriptWorld::Isolated,
            frame_id: Some(7),
            all_frames: false,
        };
        let frames = bridge.execute_script(injection).await.unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].frame_id, 7);
        assert_eq!(frames[0].result, json!(true));
        assert!(responder.await.unwrap());
    }

    #[tokio::test]
    async fn test_frame_scoped_injection_without_agent_reaches_surface() {
        let bridge = bridge_with(StubSurface::returning(json!("from-surface")), 1000);

        let injection = ScriptInjection {
            tab_id: 2,
            func: PageFunction::SelectorExists {
                selector: "input".into(),
            },
            world: tabwire_browser::ScriptWorld::Isolated,
            frame_id: Some(4),
            all_frames: false,
        };
        // The surface decides whether it can honor the scope; the stub can.
        let frames = bridge.execute_script(injection).await.unwrap();
        assert_eq!(frames[0].result, json!("from-surface"));
    }

    #[tokio::test]
    async fn test_style_registry_updates_in_place() {
        let bridge = bridge_with(StubSurface::returning(Value::Null), 1000);

        bridge.record_style(4, "theme").await;
        bridge.record_style(4, "theme").await;
        bridge.record_style(4, "banner").await;
        assert_eq!(bridge.styles_for(4).await, vec!["banner", "theme"]);

        assert!(bridge.remove_style(4, "theme").await);
        assert!(!bridge.remove_style(4, "theme").await);
        assert_eq!(bridge.styles_for(4).await, vec!["banner"]);
    }

    #[tokio::test]
    async fn test_observer_handle_replaced_not_leaked() {
        let bridge = bridge_with(StubSurface::returning(Value::Null), 1000);

        assert_eq!(bridge.set_observer(5, "obs-1").await, None);
        assert_eq!(bridge.set_observer(5, "obs-2").await, Some("obs-1".into()));
        assert_eq!(bridge.clear_observer(5).await, Some("obs-2".into()));
        assert_eq!(bridge.clear_observer(5).await, None);
    }
}
