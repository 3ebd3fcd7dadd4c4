//! SSE 解码
//!
//! 按 `\n` 切行（兼容 `\r\n`），行可能跨多个网络分块，UTF-8 字符也可能被切开，
//! 所以缓冲区按字节累积，凑满一行再解码。

use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};

use easyai_core::{ChatFailure, StreamEvent, TokenStream};

use super::errors::idle_timeout_error;
use super::wire::StreamChunk;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

/// 单行解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// 增量与用量
    Events(Vec<StreamEvent>),
    /// 结束标记
    Done,
}

/// 行缓冲
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个分块，返回已完整的行
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// 流结束时取出残留的最后一行
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest).trim_end().to_string();
        (!line.is_empty()).then_some(line)
    }
}

/// 解析一行
///
/// 空行、注释行（`:` 开头）与非 data 字段返回 `None`；无法解析的 JSON 记录后跳过。
pub fn parse_line(line: &str) -> Result<Option<SseLine>, ChatFailure> {
    let line = line.trim_end();
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    let payload = payload.trim();
    if payload == DONE_MARKER {
        return Ok(Some(SseLine::Done));
    }
    if payload.is_empty() {
        return Ok(None);
    }

    let chunk: StreamChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            let preview: String = payload.chars().take(200).collect();
            tracing::warn!("[OpenRouter] 解析 SSE 数据失败: {} - {}", e, preview);
            return Ok(None);
        }
    };

    if let Some(error) = chunk.error {
        let status = error.status_code().unwrap_or(500);
        let message = error
            .message
            .unwrap_or_else(|| "stream error".to_string());
        return Err(ChatFailure::api(status, message));
    }

    let mut events = Vec::new();
    if let Some(content) = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|content| !content.is_empty())
    {
        events.push(StreamEvent::Delta(content));
    }
    if let Some(usage) = chunk.usage {
        events.push(StreamEvent::Usage(usage.into()));
    }
    Ok(Some(SseLine::Events(events)))
}

/// 把字节流解码为增量流
///
/// 每次读取最多等待 `idle_timeout`，超时以 `TimedOut` 结束。
pub fn decode_stream<S>(bytes: S, idle_timeout: Duration) -> TokenStream
where
    S: Stream<Item = Result<Bytes, ChatFailure>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut bytes = Box::pin(bytes);
        let mut decoder = SseDecoder::new();
        let mut chunk_count: u64 = 0;

        loop {
            let next = match tokio::time::timeout(idle_timeout, bytes.next()).await {
                Ok(next) => next,
                Err(_) => {
                    yield Err::<StreamEvent, ChatFailure>(idle_timeout_error(idle_timeout.as_secs()));
                    return;
                }
            };

            let ended = next.is_none();
            let lines = match next {
                Some(Ok(chunk)) => {
                    chunk_count += 1;
                    decoder.feed(&chunk)
                }
                Some(Err(e)) => {
                    yield Err(e);
                    return;
                }
                None => decoder.finish().into_iter().collect(),
            };

            for line in lines {
                match parse_line(&line) {
                    Ok(Some(SseLine::Done)) => {
                        tracing::debug!("[OpenRouter] 收到 [DONE]，共 {} 个分块", chunk_count);
                        return;
                    }
                    Ok(Some(SseLine::Events(events))) => {
                        for event in events {
                            yield Ok(event);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            if ended {
                tracing::debug!("[OpenRouter] 连接关闭，未收到 [DONE]");
                return;
            }
        }
    };
    Box::pin(stream)
}
