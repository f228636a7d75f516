//! SQLite 数据库句柄
//!
//! 服务启动时显式打开一次，通过 Clone（内部 Arc）注入各个存储；
//! 每次调用在 spawn_blocking 中获取连接锁，闭包结束即释放。

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::persistence::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS checkpoint_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    thread_id TEXT NOT NULL,
    seq INTEGER NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    tool_invocations TEXT,
    tool_call_id TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (thread_id, seq)
);
CREATE INDEX IF NOT EXISTS idx_checkpoint_messages_thread ON checkpoint_messages(thread_id);
CREATE TABLE IF NOT EXISTS orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    drink TEXT NOT NULL,
    size TEXT NOT NULL,
    milk TEXT NOT NULL,
    syrup TEXT NOT NULL,
    sweetener TEXT NOT NULL,
    toppings TEXT NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity BETWEEN 1 AND 10),
    created_at TEXT NOT NULL
);
";

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// 打开（必要时创建）数据库文件并建表；父目录不存在时自动创建
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 在阻塞线程池中执行 f
    pub async fn call<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&mut *guard)
        })
        .await
        .map_err(|e| StoreError::Io(format!("blocking task failed: {e}")))?
    }
}
