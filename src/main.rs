//! Barista REPL
//!
//! 用法：`barista [thread_id]`；每行输入为一轮，输出该轮结构化结果 JSON。
//! 不传 thread_id 时生成新的 UUID；配置了 database_path 时可用同一 thread_id 续接对话。

use anyhow::Context;
use barista::{config::load_config, observability, BaristaAgent};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).context("Failed to load config")?;
    let agent = BaristaAgent::from_config(&cfg).context("Failed to create agent")?;

    let thread_id = std::env::args()
        .nth(1)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    eprintln!("thread: {thread_id} (Ctrl-D to quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        match agent.process_turn(&thread_id, &line).await {
            Ok(result) => {
                let json = serde_json::to_string_pretty(&result)
                    .context("Failed to serialize turn result")?;
                println!("{json}");
            }
            // 致命错误只结束本轮，REPL 继续
            Err(e) => eprintln!("error ({}): {e}", e.kind()),
        }
    }

    let (prompt, completion, total) = agent.token_usage();
    tracing::info!(prompt, completion, total, "session token usage");
    Ok(())
}
