//! 对话编排集成测试

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Map};
    use stepwise::config::AppConfig;
    use stepwise::dialogue::Response;
    use stepwise::tools::{Tool, ToolOutcome};
    use stepwise::{DialogueError, Orchestrator, OrchestratorBuilder};

    struct CountingTool {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            "counter"
        }

        fn description(&self) -> &str {
            "Counts how often it really runs"
        }

        async fn execute(&self, input: &str, _session_id: &str) -> Result<ToolOutcome, String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ToolOutcome::Success(json!({ "echo": input, "call": n })))
        }
    }

    fn orchestrator() -> Orchestrator {
        OrchestratorBuilder::new(AppConfig::default()).build()
    }

    #[tokio::test]
    async fn test_install_walkthrough_runs_to_completion() {
        let orch = orchestrator();
        let message = "install docker on ubuntu";

        let tags = orch.classify(message);
        assert!(tags.is_technical);
        assert!(!tags.is_content);

        for expected in 1..=4 {
            match orch.classify_and_respond(message, "s1").await {
                Response::Step(step) => {
                    assert_eq!(step.step_number, expected);
                    assert_eq!(step.total_steps, 4);
                    assert!(step.requires_confirmation);
                    if expected == 1 {
                        assert!(step.content.contains("system requirements"));
                    }
                }
                other => panic!("expected step {}, got {:?}", expected, other),
            }
            let session = orch.get_session("s1").await;
            assert_eq!(session.current_task.as_ref().map(|t| t.steps.len()), Some(4));
        }

        match orch.classify_and_respond(message, "s1").await {
            Response::Completion(done) => {
                assert_eq!(done.total_steps, 4);
                assert!(done.content.contains("All 4 steps executed"));
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert!(orch.get_session("s1").await.current_task.is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let orch = orchestrator();
        orch.classify_and_respond("fix this error", "a").await;
        orch.classify_and_respond("fix this error", "a").await;
        match orch.classify_and_respond("fix this error", "b").await {
            Response::Step(step) => assert_eq!(step.step_number, 1),
            other => panic!("expected step, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_notes_request_is_complete_output() {
        let orch = orchestrator();
        let response = orch
            .classify_and_respond("write notes on photosynthesis", "s1")
            .await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], "content");
        assert_eq!(value["format"], "notes");
        assert_eq!(value["content"]["title"], "Notes: write notes on photosynthesis");
    }

    #[tokio::test]
    async fn test_manual_confirmation_gates_progress() {
        let mut cfg = AppConfig::default();
        cfg.dialogue.auto_advance = false;
        let orch = OrchestratorBuilder::new(cfg).build();

        for _ in 0..2 {
            match orch.classify_and_respond("setup nginx", "s1").await {
                Response::Step(step) => assert_eq!(step.step_number, 1),
                other => panic!("expected step 1, got {:?}", other),
            }
        }

        match orch.confirm_step("s1", Some(json!({ "ok": true }))).await {
            Some(Response::Step(step)) => {
                assert_eq!(step.step_number, 2);
                assert_eq!(step.context["step_1_result"], json!({ "ok": true }));
            }
            other => panic!("expected step 2, got {:?}", other),
        }

        let task = orch.get_session("s1").await.current_task.unwrap();
        assert_eq!(task.completed_steps, vec![0]);
    }

    #[tokio::test]
    async fn test_tool_results_are_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let orch = OrchestratorBuilder::new(AppConfig::default())
            .with_tool(CountingTool {
                calls: calls.clone(),
            })
            .build();

        let first = orch.use_tool("counter", "ping", "s1").await.unwrap();
        let second = orch.use_tool("COUNTER", "ping", "s2").await.unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        orch.use_tool("counter", "pong", "s1").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let orch = orchestrator();
        for input in ["", "2 + 2", "anything"] {
            let err = orch.use_tool("teleporter", input, "s1").await.unwrap_err();
            assert_eq!(err, DialogueError::ToolNotFound("teleporter".to_string()));
        }
    }

    #[tokio::test]
    async fn test_calculator_through_registry() {
        let orch = orchestrator();
        let out = orch.use_tool("calculator", "5 km to miles", "s1").await.unwrap().to_value();
        assert_eq!(out["success"], true);
        assert_eq!(out["type"], "unit_conversion");
        assert!((out["result"].as_f64().unwrap() - 3.1069).abs() < 0.0001);

        let out = orch.use_tool("calculator", "2 +", "s1").await.unwrap().to_value();
        assert_eq!(out["success"], false);
        assert_eq!(out["error"], "Invalid mathematical expression");
    }

    #[tokio::test]
    async fn test_deeply_nested_expression_does_not_crash() {
        let orch = orchestrator();
        let input = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let out = orch.use_tool("calculator", &input, "s1").await.unwrap().to_value();
        assert_eq!(out["success"], false);

        let out = orch.use_tool("calculator", "(1 + 2) * 3", "s1").await.unwrap().to_value();
        assert_eq!(out["result"], 9.0);
    }

    #[tokio::test]
    async fn test_preferences_merge_over_defaults() {
        let orch = orchestrator();
        let mut partial = Map::new();
        partial.insert("stepByStep".to_string(), json!(false));
        let merged = orch.set_preferences("s1", partial).await;
        assert_eq!(merged.flag("personalizedMode"), Some(true));
        assert_eq!(merged.flag("learningMode"), Some(true));
        assert_eq!(merged.flag("stepByStep"), Some(false));
        assert_eq!(orch.get_session("s1").await.preferences, merged);
    }

    #[tokio::test]
    async fn test_session_capacity_is_bounded() {
        let mut cfg = AppConfig::default();
        cfg.sessions.capacity = 2;
        let orch = OrchestratorBuilder::new(cfg).build();
        for sid in ["a", "b", "c"] {
            orch.classify_and_respond("hello", sid).await;
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(orch.session_count().await, 2);
        assert!(orch.sessions().get("a").await.is_none());
    }

    #[cfg(feature = "gateway")]
    mod http {
        use super::*;

        use axum::body::{to_bytes, Body};
        use axum::http::{Request, StatusCode};
        use serde_json::Value;
        use stepwise::gateway::router;
        use tower::ServiceExt;

        async fn call(app: axum::Router, req: Request<Body>) -> (StatusCode, Value) {
            let resp = app.oneshot(req).await.unwrap();
            let status = resp.status();
            let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            (status, serde_json::from_slice(&bytes).unwrap())
        }

        fn post(uri: &str, body: Value) -> Request<Body> {
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        }

        #[tokio::test]
        async fn test_list_tools() {
            let app = router(Arc::new(orchestrator()));
            let req = Request::builder().uri("/api/tools").body(Body::empty()).unwrap();
            let (status, body) = call(app, req).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            assert_eq!(body["tools"].as_array().unwrap().len(), 6);
            assert!(body["timestamp"].is_string());
        }

        #[tokio::test]
        async fn test_execute_tool() {
            let app = router(Arc::new(orchestrator()));
            let (status, body) = call(app, post("/api/tools/calculator", json!({ "input": "2 + 2" }))).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            assert_eq!(body["result"], 4.0);
        }

        #[tokio::test]
        async fn test_soft_failure_keeps_tool_success_flag() {
            let app = router(Arc::new(orchestrator()));
            let (status, body) = call(app, post("/api/tools/calculator", json!({ "input": "2 +" }))).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], false);
            assert_eq!(body["suggestion"], "Please check your input format");
        }

        #[tokio::test]
        async fn test_missing_input_is_bad_request() {
            let app = router(Arc::new(orchestrator()));
            let (status, body) = call(app, post("/api/tools/calculator", json!({ "sessionId": "x" }))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Input is required");
        }

        #[tokio::test]
        async fn test_non_string_input_is_bad_request() {
            let app = router(Arc::new(orchestrator()));
            let (status, body) = call(app, post("/api/tools/calculator", json!({ "input": 5 }))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "Input is required");
        }

        #[tokio::test]
        async fn test_missing_body_is_bad_request() {
            let app = router(Arc::new(orchestrator()));
            let req = Request::builder()
                .method("POST")
                .uri("/api/tools/calculator")
                .body(Body::empty())
                .unwrap();
            let (status, body) = call(app, req).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Input is required");
        }

        #[tokio::test]
        async fn test_deeply_nested_expression_is_soft_failure() {
            let app = router(Arc::new(orchestrator()));
            let input = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
            let (status, body) = call(app, post("/api/tools/calculator", json!({ "input": input }))).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "Invalid mathematical expression");
        }

        #[tokio::test]
        async fn test_unknown_tool_is_server_error() {
            let app = router(Arc::new(orchestrator()));
            let (status, body) = call(app, post("/api/tools/teleporter", json!({ "input": "x" }))).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "Tool 'teleporter' not found");
        }
    }
}
