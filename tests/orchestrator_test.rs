//! 编排器集成测试：用回放客户端驱动完整轮次

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use barista::catalog::Catalog;
    use barista::llm::ScriptedLlmClient;
    use barista::memory::{Message, Role, ToolInvocation};
    use barista::persistence::{
        CheckpointStore, Database, InMemoryCheckpointStore, InMemoryOrderStore, OrderStore,
        SqliteCheckpointStore, StoreError,
    };
    use barista::response::{OrderField, Progress};
    use barista::tools::{Order, ORDER_FAILURE, ORDER_SUCCESS};
    use barista::{AgentParts, BaristaAgent};
    use serde_json::{json, Value};

    struct FailingOrderStore;

    #[async_trait]
    impl OrderStore for FailingOrderStore {
        async fn save_order(&self, _order: &Order) -> Result<i64, StoreError> {
            Err(StoreError::Database("disk I/O error".to_string()))
        }
    }

    /// 保存成功，直到被切换为故障状态
    #[derive(Default)]
    struct FlakyOrderStore {
        down: AtomicBool,
        saved: InMemoryOrderStore,
    }

    #[async_trait]
    impl OrderStore for FlakyOrderStore {
        async fn save_order(&self, order: &Order) -> Result<i64, StoreError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StoreError::Database("down".to_string()));
            }
            self.saved.save_order(order).await
        }
    }

    fn build_agent(
        llm: Arc<ScriptedLlmClient>,
        checkpoints: Arc<dyn CheckpointStore>,
        orders: Arc<dyn OrderStore>,
    ) -> BaristaAgent {
        BaristaAgent::new(AgentParts {
            llm,
            checkpoints,
            orders,
            catalog: Catalog::default(),
            max_steps: 15,
            tool_timeout_secs: 30,
        })
    }

    fn structured(message: &str, order: Value, progress: &str) -> Message {
        let payload = json!({
            "message": message,
            "current_order": order,
            "suggestions": ["Make it large", "Add oat milk"],
            "progress": progress,
        });
        Message::assistant(format!("Here you go.\n```json\n{payload}\n```"))
    }

    fn latte_only() -> Value {
        json!({
            "drink": "Latte",
            "size": "unknown",
            "milk": "unknown",
            "syrup": "unknown",
            "sweetener": "unknown",
            "toppings": "unknown",
            "quantity": "unknown",
        })
    }

    fn confirmed_order() -> Value {
        json!({
            "drink": "Latte",
            "size": "Large",
            "mil": "Oat",
            "syrup": "Vanilla",
            "sweeteners": "none",
            "toppings": "Cinnamon",
            "quantity": 2,
        })
    }

    fn create_order_call(id: &str, order: Value) -> Message {
        Message::assistant_with_tools(
            "",
            vec![ToolInvocation::new(id, "create_order", json!({ "order": order }))],
        )
    }

    #[tokio::test]
    async fn test_first_mention_of_latte() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![structured(
            "A latte, great choice! What size would you like?",
            latte_only(),
            "in_progress",
        )]));
        let orders = Arc::new(InMemoryOrderStore::new());
        let agent = build_agent(llm.clone(), Arc::new(InMemoryCheckpointStore::new()), orders.clone());

        let outcome = agent
            .process_turn_detailed("t-latte", "I want a latte")
            .await
            .unwrap();

        assert_eq!(outcome.result.progress, Progress::InProgress);
        assert_eq!(outcome.result.current_order.drink, OrderField::Known("Latte".to_string()));
        assert_eq!(outcome.result.current_order.size, OrderField::Unknown);
        assert_eq!(outcome.result.current_order.quantity, OrderField::Unknown);
        assert_eq!(outcome.tool_rounds, 0);
        assert_eq!(outcome.steps, 1);
        assert!(orders.orders().await.is_empty());

        let json = serde_json::to_value(&outcome.result).unwrap();
        assert_eq!(json["current_order"]["size"], "unknown");
        assert_eq!(json["current_order"]["quantity"], "unknown");
        assert_eq!(json.as_object().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_confirmed_order_is_created() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            create_order_call("call_1", confirmed_order()),
            structured("Your order is placed!", confirmed_order(), "completed"),
        ]));
        let orders = Arc::new(InMemoryOrderStore::new());
        let agent = build_agent(llm.clone(), Arc::new(InMemoryCheckpointStore::new()), orders.clone());

        let outcome = agent
            .process_turn_detailed("t-confirm", "Yes, that's right, place the order")
            .await
            .unwrap();

        assert_eq!(outcome.tool_rounds, 1);
        assert_eq!(outcome.steps, 2);
        assert_eq!(outcome.result.progress, Progress::Completed);
        assert_eq!(outcome.result.current_order.milk, OrderField::Known("Oat".to_string()));
        assert_eq!(outcome.result.current_order.quantity, OrderField::Known(2));

        let saved = orders.orders().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].drink, "Latte");
        assert_eq!(saved[0].milk, "Oat");
        assert_eq!(saved[0].sweetener, "none");
        assert_eq!(saved[0].quantity, 2);

        // human, assistant(tool call), tool result, assistant(final)
        let roles: Vec<Role> = outcome.appended.iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec![Role::Human, Role::Assistant, Role::Tool, Role::Assistant]);
        let tool_msg = &outcome.appended[2];
        assert_eq!(tool_msg.tool_call_id(), Some("call_1"));
        assert_eq!(tool_msg.content(), ORDER_SUCCESS);

        // 第二次模型调用看到了工具结果
        let second = &llm.requests()[1];
        assert_eq!(second.last().map(|m| m.content()), Some(ORDER_SUCCESS));
    }

    #[tokio::test]
    async fn test_order_persistence_failure_is_recoverable() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            create_order_call("call_1", confirmed_order()),
            structured(
                "Sorry, I couldn't place your order. Want me to try again?",
                confirmed_order(),
                "in_progress",
            ),
        ]));
        let agent = build_agent(
            llm.clone(),
            Arc::new(InMemoryCheckpointStore::new()),
            Arc::new(FailingOrderStore),
        );

        let outcome = agent
            .process_turn_detailed("t-fail", "Confirm")
            .await
            .unwrap();

        assert_eq!(outcome.result.progress, Progress::InProgress);
        assert_eq!(outcome.tool_rounds, 1);
        let tool_msg = &outcome.appended[2];
        assert!(tool_msg.content().starts_with(ORDER_FAILURE));
        assert!(tool_msg.content().contains("disk I/O error"));
    }

    #[tokio::test]
    async fn test_completed_without_order_is_downgraded() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            create_order_call("call_1", confirmed_order()),
            structured("All done!", confirmed_order(), "completed"),
        ]));
        let agent = build_agent(
            llm,
            Arc::new(InMemoryCheckpointStore::new()),
            Arc::new(FailingOrderStore),
        );

        let result = agent.process_turn("t-lie", "Confirm").await.unwrap();
        assert_eq!(result.progress, Progress::InProgress);
    }

    #[tokio::test]
    async fn test_earlier_order_does_not_vouch_for_failed_retry() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            create_order_call("call_1", confirmed_order()),
            structured("Your order is placed!", confirmed_order(), "completed"),
            create_order_call("call_2", confirmed_order()),
            structured("Placed another one!", confirmed_order(), "completed"),
        ]));
        let orders = Arc::new(FlakyOrderStore::default());
        let agent = build_agent(llm, Arc::new(InMemoryCheckpointStore::new()), orders.clone());

        let first = agent.process_turn("t-again", "Confirm").await.unwrap();
        assert_eq!(first.progress, Progress::Completed);

        orders.down.store(true, Ordering::SeqCst);
        let second = agent
            .process_turn_detailed("t-again", "Same again please")
            .await
            .unwrap();
        let tool_msg = &second.appended[2];
        assert_eq!(tool_msg.content(), format!("{ORDER_FAILURE} Reason: database error: down"));
        assert_eq!(second.result.progress, Progress::InProgress);
        assert_eq!(orders.saved.orders().await.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_quantity_rejected_before_persistence() {
        let mut order = confirmed_order();
        order["quantity"] = json!(11);
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            create_order_call("call_1", order),
            structured("Sorry, at most 10 drinks per order.", latte_only(), "in_progress"),
        ]));
        let orders = Arc::new(InMemoryOrderStore::new());
        let agent = build_agent(llm, Arc::new(InMemoryCheckpointStore::new()), orders.clone());

        let outcome = agent.process_turn_detailed("t-q", "Eleven lattes").await.unwrap();
        assert!(outcome.appended[2]
            .content()
            .starts_with("Error: invalid arguments for create_order"));
        assert!(orders.orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_back() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Message::assistant_with_tools(
                "",
                vec![ToolInvocation::new("call_9", "refund_order", json!({}))],
            ),
            structured("I can only place orders.", latte_only(), "in_progress"),
        ]));
        let agent = build_agent(
            llm,
            Arc::new(InMemoryCheckpointStore::new()),
            Arc::new(InMemoryOrderStore::new()),
        );

        let outcome = agent.process_turn_detailed("t-unknown", "Refund me").await.unwrap();
        let tool_msg = &outcome.appended[2];
        assert_eq!(tool_msg.tool_call_id(), Some("call_9"));
        assert!(tool_msg.content().starts_with("Error: unknown tool 'refund_order'"));
        assert!(tool_msg.content().contains("create_order"));
    }

    #[tokio::test]
    async fn test_multiple_invocations_answered_in_order() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Message::assistant_with_tools(
                "",
                vec![
                    ToolInvocation::new("a", "create_order", json!({ "order": confirmed_order() })),
                    ToolInvocation::new("b", "nope", json!({})),
                ],
            ),
            structured("Done.", confirmed_order(), "completed"),
        ]));
        let agent = build_agent(
            llm,
            Arc::new(InMemoryCheckpointStore::new()),
            Arc::new(InMemoryOrderStore::new()),
        );

        let outcome = agent.process_turn_detailed("t-multi", "Two things").await.unwrap();
        let ids: Vec<_> = outcome
            .appended
            .iter()
            .filter(|m| m.role() == Role::Tool)
            .map(|m| m.tool_call_id().unwrap_or_default().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(outcome.tool_rounds, 1);
    }

    #[tokio::test]
    async fn test_step_budget_exhausted() {
        let llm = Arc::new(ScriptedLlmClient::repeating(create_order_call(
            "call_loop",
            json!({}),
        )));
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());
        let agent = build_agent(
            llm.clone(),
            checkpoints.clone(),
            Arc::new(InMemoryOrderStore::new()),
        );

        let err = agent.process_turn("t-loop", "Order something").await.unwrap_err();
        assert_eq!(err.kind(), "step_budget");
        assert_eq!(llm.calls(), 15);
        assert!(checkpoints.load("t-loop").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_is_fatal_and_not_persisted() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![]));
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());
        let agent = build_agent(llm, checkpoints.clone(), Arc::new(InMemoryOrderStore::new()));

        let err = agent.process_turn("t-down", "Hello").await.unwrap_err();
        assert_eq!(err.kind(), "model");
        assert!(checkpoints.load("t-down").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_structured_block_is_fatal() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![Message::assistant(
            "Sure, what size would you like?",
        )]));
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());
        let agent = build_agent(llm, checkpoints.clone(), Arc::new(InMemoryOrderStore::new()));

        let err = agent.process_turn("t-prose", "A latte").await.unwrap_err();
        assert_eq!(err.kind(), "extraction");
        // 本轮已到达 End，消息先落库再提取
        assert_eq!(checkpoints.load("t-prose").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_conversation_resumes_from_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("barista.db");
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            structured("A latte! What size?", latte_only(), "in_progress"),
            structured("Large latte, anything else?", latte_only(), "in_progress"),
        ]));

        {
            let checkpoints = Arc::new(SqliteCheckpointStore::new(Database::open(&path).unwrap()));
            let agent = build_agent(llm.clone(), checkpoints, Arc::new(InMemoryOrderStore::new()));
            agent.process_turn("t-resume", "I want a latte").await.unwrap();
        }

        // 重新打开数据库，模拟进程重启
        let checkpoints = Arc::new(SqliteCheckpointStore::new(Database::open(&path).unwrap()));
        let first = checkpoints.load("t-resume").await.unwrap();
        let second = checkpoints.load("t-resume").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);

        let agent = build_agent(llm.clone(), checkpoints.clone(), Arc::new(InMemoryOrderStore::new()));
        agent.process_turn("t-resume", "Large please").await.unwrap();

        let seen = &llm.requests()[1];
        assert_eq!(&seen[..2], first.all());
        assert_eq!(seen[2].role(), Role::Human);
        assert_eq!(seen[2].content(), "Large please");
        assert_eq!(checkpoints.load("t-resume").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_threads_are_isolated() {
        let llm = Arc::new(ScriptedLlmClient::repeating(structured(
            "Hi!",
            latte_only(),
            "in_progress",
        )));
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());
        let agent = build_agent(llm.clone(), checkpoints.clone(), Arc::new(InMemoryOrderStore::new()));

        agent.process_turn("alice", "Latte").await.unwrap();
        agent.process_turn("bob", "Mocha").await.unwrap();

        // bob 的第一轮看不到 alice 的消息
        assert_eq!(llm.requests()[1].len(), 1);
        assert_eq!(checkpoints.thread_count().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_turns_on_same_thread_serialize() {
        let llm = Arc::new(ScriptedLlmClient::repeating(structured(
            "Noted.",
            latte_only(),
            "in_progress",
        )));
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());
        let agent = Arc::new(build_agent(
            llm,
            checkpoints.clone(),
            Arc::new(InMemoryOrderStore::new()),
        ));

        let a = {
            let agent = agent.clone();
            tokio::spawn(async move { agent.process_turn("shared", "first").await })
        };
        let b = {
            let agent = agent.clone();
            tokio::spawn(async move { agent.process_turn("shared", "second").await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let log = checkpoints.load("shared").await.unwrap();
        let roles: Vec<Role> = log.all().iter().map(|m| m.role()).collect();
        assert_eq!(
            roles,
            vec![Role::Human, Role::Assistant, Role::Human, Role::Assistant]
        );
    }
}
