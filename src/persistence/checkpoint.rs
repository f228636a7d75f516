//! Checkpoint 存储：按 thread id 持久化 / 恢复 MessageLog
//!
//! load 对未见过的 thread 返回空日志；append 返回前保证消息已与该 thread 持久关联。
//! 各 thread 的日志相互独立。

use std::collections::HashMap;

use async_trait::async_trait;
use rusqlite::params;
use tokio::sync::RwLock;

use crate::memory::{Message, MessageLog, Role, ToolInvocation};
use crate::persistence::{Database, StoreError};

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, thread_id: &str) -> Result<MessageLog, StoreError>;

    async fn append(&self, thread_id: &str, messages: &[Message]) -> Result<(), StoreError>;
}

/// 内存实现（进程内有效）
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    threads: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.len()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<MessageLog, StoreError> {
        let threads = self.threads.read().await;
        Ok(threads
            .get(thread_id)
            .map(|m| MessageLog::from_messages(m.clone()))
            .unwrap_or_default())
    }

    async fn append(&self, thread_id: &str, messages: &[Message]) -> Result<(), StoreError> {
        self.threads
            .write()
            .await
            .entry(thread_id.to_string())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }
}

/// SQLite 实现：每次 append 一个事务，消息按 seq 排序
#[derive(Clone)]
pub struct SqliteCheckpointStore {
    db: Database,
}

impl SqliteCheckpointStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<MessageLog, StoreError> {
        let thread_id = thread_id.to_string();
        self.db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT role, content, tool_invocations, tool_call_id
                     FROM checkpoint_messages WHERE thread_id = ?1 ORDER BY seq ASC",
                )?;
                let rows = stmt.query_map(params![thread_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                })?;

                let mut log = MessageLog::new();
                for row in rows {
                    let (role, content, invocations, tool_call_id) = row?;
                    let role = Role::parse(&role)
                        .ok_or_else(|| StoreError::Corrupt(format!("unknown role '{role}'")))?;
                    let invocations: Vec<ToolInvocation> = match invocations {
                        Some(raw) => serde_json::from_str(&raw)?,
                        None => Vec::new(),
                    };
                    log.push(Message::from_parts(role, content, invocations, tool_call_id));
                }
                Ok(log)
            })
            .await
    }

    async fn append(&self, thread_id: &str, messages: &[Message]) -> Result<(), StoreError> {
        if messages.is_empty() {
            return Ok(());
        }
        let thread_id = thread_id.to_string();
        let messages = messages.to_vec();
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                let next: i64 = tx.query_row(
                    "SELECT COALESCE(MAX(seq), -1) + 1 FROM checkpoint_messages WHERE thread_id = ?1",
                    params![thread_id],
                    |row| row.get(0),
                )?;
                let now = chrono::Utc::now().to_rfc3339();
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO checkpoint_messages
                         (thread_id, seq, role, content, tool_invocations, tool_call_id, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    )?;
                    for (offset, msg) in messages.iter().enumerate() {
                        let invocations = if msg.tool_invocations().is_empty() {
                            None
                        } else {
                            Some(serde_json::to_string(msg.tool_invocations())?)
                        };
                        stmt.execute(params![
                            thread_id,
                            next + offset as i64,
                            msg.role().as_str(),
                            msg.content(),
                            invocations,
                            msg.tool_call_id(),
                            now,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_turn() -> Vec<Message> {
        vec![
            Message::human("Yes, place it"),
            Message::assistant_with_tools(
                "",
                vec![ToolInvocation::new(
                    "call_1",
                    "create_order",
                    json!({"order": {"drink": "Latte", "quantity": 1}}),
                )],
            ),
            Message::tool_result("call_1", "Order created successfully."),
            Message::assistant("```json\n{}\n```"),
        ]
    }

    async fn roundtrip(store: &dyn CheckpointStore) {
        assert!(store.load("t-1").await.unwrap().is_empty());

        store.append("t-1", &sample_turn()).await.unwrap();
        store.append("t-1", &[Message::human("thanks")]).await.unwrap();
        store.append("t-2", &[Message::human("other")]).await.unwrap();

        let log = store.load("t-1").await.unwrap();
        let mut expected = sample_turn();
        expected.push(Message::human("thanks"));
        assert_eq!(log.all(), expected.as_slice());

        let again = store.load("t-1").await.unwrap();
        assert_eq!(log, again);
        assert_eq!(store.load("t-2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_roundtrip() {
        let store = InMemoryCheckpointStore::new();
        roundtrip(&store).await;
        assert_eq!(store.thread_count().await, 2);
    }

    #[tokio::test]
    async fn test_sqlite_roundtrip() {
        let store = SqliteCheckpointStore::new(Database::open_in_memory().unwrap());
        roundtrip(&store).await;
    }

    #[tokio::test]
    async fn test_sqlite_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoints.db");
        {
            let store = SqliteCheckpointStore::new(Database::open(&path).unwrap());
            store.append("t-9", &sample_turn()).await.unwrap();
        }
        let store = SqliteCheckpointStore::new(Database::open(&path).unwrap());
        assert_eq!(store.load("t-9").await.unwrap().all(), sample_turn().as_slice());
    }
}
