//! 终端对话驱动
//!
//! 用法：`easyai [config.yaml]`。输入文本发送消息，Ctrl-C 停止当前生成。
//! 命令：`/models` 列出模型，`/use <序号>` 切换模型，`/new` 新建会话，`/quit` 退出。

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use uuid::Uuid;

use easyai_core::render::compose_status_text;
use easyai_lib::{
    create_orchestrator, load_config, logger, AIModel, ChatListSnapshot, ConfigHandle,
    InMemoryPersistence, TurnEndReason, TurnOrchestrator, TurnOutcome,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref()).context("加载配置失败")?;
    logger::init(&config.log_level);
    tracing::info!("easyAI {} 启动", easyai_lib::version());

    if !config.has_api_key() {
        eprintln!("未配置 API Key，请设置 OPENROUTER_API_KEY 或在配置文件中填写 api_key");
    }

    let orchestrator = Arc::new(
        create_orchestrator(
            ConfigHandle::new(config),
            Arc::new(InMemoryPersistence::new()),
        )
        .context("创建编排器失败")?,
    );

    let mut models = orchestrator.load_models().await;
    print_selection(&orchestrator);
    let printer = spawn_stream_printer(orchestrator.subscribe());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await.context("读取输入失败")? {
        let line = line.trim().to_string();
        if line.is_empty() {
            prompt();
            continue;
        }

        match line.split_once(' ').map_or((line.as_str(), ""), |(c, a)| (c, a.trim())) {
            ("/quit", _) => break,
            ("/new", _) => {
                let id = orchestrator.new_conversation().await;
                println!("已新建会话 {id}");
            }
            ("/models", _) => {
                models = orchestrator.load_models().await;
                print_models(&models, orchestrator.selected_model().as_ref());
            }
            ("/use", index) => match index.parse::<usize>().ok().and_then(|i| models.get(i)) {
                Some(model) => {
                    orchestrator.select_model(model.clone());
                    print_selection(&orchestrator);
                }
                None => println!("无效的序号：{index}"),
            },
            _ => {
                let outcome = run_turn(orchestrator.clone(), line).await?;
                print_outcome(&outcome);
            }
        }
        prompt();
    }

    printer.abort();
    Ok(())
}

/// 执行一轮，期间 Ctrl-C 触发停止
async fn run_turn(orchestrator: Arc<TurnOrchestrator>, content: String) -> Result<TurnOutcome> {
    let runner = orchestrator.clone();
    let mut turn = tokio::spawn(async move { runner.send_message(&content, Vec::new()).await });

    tokio::select! {
        outcome = &mut turn => outcome.context("轮次任务异常退出"),
        _ = tokio::signal::ctrl_c() => {
            orchestrator.stop();
            turn.await.context("轮次任务异常退出")
        }
    }
}

/// 订阅快照，把流式消息的新增部分打印到终端
fn spawn_stream_printer(mut rx: broadcast::Receiver<ChatListSnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut printed: Option<(Uuid, usize)> = None;
        loop {
            let snapshot = match rx.recv().await {
                Ok(snapshot) => snapshot,
                // 丢失的快照由下一次的完整内容补齐
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            let Some(last) = snapshot.state.messages.last().filter(|m| m.is_streaming) else {
                continue;
            };

            let offset = match printed {
                Some((id, len)) if id == last.id => len,
                _ => 0,
            };
            if let Some(fresh) = last.content.get(offset..).filter(|s| !s.is_empty()) {
                print!("{fresh}");
                let _ = std::io::stdout().flush();
            }
            printed = Some((last.id, last.content.len()));
        }
    })
}

fn print_outcome(outcome: &TurnOutcome) {
    let Some(message) = outcome.assistant_message.as_ref() else {
        println!();
        return;
    };
    if message.was_streamed {
        println!();
    } else if !message.content.is_empty() {
        println!("{}", message.content);
    }

    let notice = (outcome.reason == TurnEndReason::Cancelled)
        .then_some(easyai_core::render::STOPPED_NOTICE_TEXT);
    if let Some(status) = compose_status_text(
        notice,
        message.runtime_status_text.as_deref(),
        message.metrics.as_ref(),
    ) {
        println!("[{status}]");
    }
}

fn print_models(models: &[AIModel], selected: Option<&AIModel>) {
    for (index, model) in models.iter().enumerate() {
        let marker = if selected.is_some_and(|s| s.id == model.id) { "*" } else { " " };
        let free = if model.is_free() { " (free)" } else { "" };
        println!("{marker}{index:>3}  {}{free}  {}", model.name, model.api_model);
    }
}

fn print_selection(orchestrator: &TurnOrchestrator) {
    match orchestrator.selected_model() {
        Some(model) => println!("当前模型：{} ({})", model.name, model.api_model),
        None => println!("模型列表为空，请检查网络或 API Key"),
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}
