//! 对话轮次编排
//!
//! # 流程
//!
//! 1. 身份类问题拦截（无附件时）
//! 2. 追加用户消息，校验模型是否就绪、是否支持附件
//! 3. 意图识别与发送前路由
//! 4. 构建上下文，流式或一次性调用传输层
//! 5. 失败时分类；可重试且有未尝试候选时降级重发，否则以错误消息结束
//! 6. 成功时计算指标，定稿消息并持久化
//!
//! 所有状态修改都经 [`ConversationStore`] 提交，渲染层通过订阅快照获得更新。

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use easyai_config::ConfigHandle;
use easyai_core::metrics::make_metrics;
use easyai_core::render::merge_status;
use easyai_core::{
    AIModel, ChatErrorCategory, ChatFailure, ChatListSnapshot, ChatTransport,
    ClassifiedChatError, CompletionRequest, ContextBuilder, ErrorClassifier, FallbackPlanner,
    IntentClassifier, ItemKind, MediaContent, Message, ModelCatalog, ModelRouter,
    SpecialResponsePolicy, StopNotice, StreamEvent, TokenUsage, TurnIdentity,
};

use crate::persistence::ChatPersistence;
use crate::state::ChatEvent;
use crate::store::ConversationStore;
use crate::turn::{TurnContext, TurnEndReason};

const MODEL_NOT_READY_TEXT: &str = "⚠️ 模型列表正在加载中，请稍候再试。";

/// 流式分块日志间隔
const CHUNK_LOG_INTERVAL: u64 = 50;

fn model_not_multimodal_text(model_name: &str) -> String {
    format!(
        "⚠️ 当前选择的模型（{model_name}）不支持图片输入。\n\n请切换到支持多模态的模型，例如：\n\
         • GPT-4 Vision\n• Claude 3 Sonnet\n• Gemini Pro Vision\n• Gemini 2.0 Flash"
    )
}

/// 轮次结果
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub base_id: String,
    pub reason: TurnEndReason,
    /// 本轮最后一条助手消息：回复、错误提示或被停止的部分回复
    pub assistant_message: Option<Message>,
    pub error: Option<ClassifiedChatError>,
}

/// 单次尝试的结果
enum AttemptOutcome {
    Completed {
        message_id: Uuid,
        usage: Option<TokenUsage>,
        reason: TurnEndReason,
    },
    Cancelled {
        message_id: Option<Uuid>,
    },
    Failed {
        failure: ChatFailure,
        message_id: Option<Uuid>,
    },
}

/// 对话轮次编排器
///
/// 同一会话同一时刻只执行一轮；`stop` 可在轮次进行中从其他任务调用。
pub struct TurnOrchestrator {
    transport: Arc<dyn ChatTransport>,
    catalog: Arc<dyn ModelCatalog>,
    persistence: Arc<dyn ChatPersistence>,
    config: ConfigHandle,
    store: Arc<ConversationStore>,
    selected_model: RwLock<Option<AIModel>>,
    /// 当前轮次的取消令牌，每轮重新生成
    cancel: Mutex<CancellationToken>,
    intent_classifier: IntentClassifier,
    router: ModelRouter,
    context_builder: ContextBuilder,
    error_classifier: ErrorClassifier,
}

impl TurnOrchestrator {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        catalog: Arc<dyn ModelCatalog>,
        persistence: Arc<dyn ChatPersistence>,
        config: ConfigHandle,
    ) -> Self {
        let max_stored = config.read(|c| c.max_stored_messages);
        Self {
            transport,
            catalog,
            persistence,
            store: Arc::new(ConversationStore::new(Uuid::new_v4().to_string(), max_stored)),
            config,
            selected_model: RwLock::new(None),
            cancel: Mutex::new(CancellationToken::new()),
            intent_classifier: IntentClassifier::new(),
            router: ModelRouter::new(),
            context_builder: ContextBuilder::new(),
            error_classifier: ErrorClassifier::new(),
        }
    }

    pub fn store(&self) -> Arc<ConversationStore> {
        self.store.clone()
    }

    /// 订阅列表快照
    pub fn subscribe(&self) -> broadcast::Receiver<ChatListSnapshot> {
        self.store.subscribe()
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn selected_model(&self) -> Option<AIModel> {
        self.selected_model.read().clone()
    }

    pub fn select_model(&self, model: AIModel) {
        tracing::info!("[MODEL] 选择模型: {} ({})", model.name, model.id);
        *self.selected_model.write() = Some(model);
    }

    /// 拉取模型列表
    ///
    /// 已选模型仍在列表中时保持不变，否则选择列表第一个。
    pub async fn load_models(&self) -> Vec<AIModel> {
        let filter = self.config.read(|c| c.model_filter);
        let models = self.catalog.fetch(filter).await;

        let mut selected = self.selected_model.write();
        let still_available = selected
            .as_ref()
            .and_then(|current| models.iter().find(|m| m.id == current.id))
            .cloned();
        *selected = still_available.or_else(|| models.first().cloned());

        tracing::info!(
            "[MODEL] 模型列表已加载: {} 个, 当前选择: {}",
            models.len(),
            selected.as_ref().map(|m| m.id.as_str()).unwrap_or("无")
        );
        models
    }

    /// 停止当前轮次
    pub fn stop(&self) {
        tracing::info!("[TURN] 用户停止生成");
        self.cancel.lock().cancel();
    }

    /// 切换到已有会话
    pub async fn switch_conversation(&self, conversation_id: &str) {
        self.stop();
        let messages = match self.persistence.load_messages(conversation_id).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("[PERSIST] 加载会话失败: {} - {}", conversation_id, e);
                Vec::new()
            }
        };
        tracing::info!(
            "[TURN] 切换会话: {} ({} 条消息)",
            conversation_id,
            messages.len()
        );
        self.store.dispatch(ChatEvent::ConversationSwitched {
            conversation_id: conversation_id.to_string(),
            messages,
        });
    }

    /// 新建会话，返回会话 ID
    pub async fn new_conversation(&self) -> String {
        let conversation_id = Uuid::new_v4().to_string();
        self.switch_conversation(&conversation_id).await;
        conversation_id
    }

    /// 发送一条消息并执行完整的一轮
    pub async fn send_message(&self, content: &str, media: Vec<MediaContent>) -> TurnOutcome {
        let config = self.config.snapshot();
        let cancel = self.regenerate_cancel_token();
        let identity = TurnIdentity::new(self.store.conversation_id(), Uuid::new_v4());
        let has_media = !media.is_empty();

        let user_message = Message::user(content).with_media(media).with_identity(
            identity.turn_id,
            &identity.base_id,
            identity.item_id(ItemKind::UserMsg, "main"),
        );
        tracing::info!(
            "[TURN] baseId={} itemId={} 开始: stream={}, media={}",
            identity.base_id,
            user_message.item_id.as_deref().unwrap_or_default(),
            config.enable_stream,
            has_media
        );

        let policy = SpecialResponsePolicy::new(
            config.special_response.enabled,
            config.special_response.text.clone(),
        );
        if let Some(reply) = policy.intercept(content, has_media) {
            return self.respond_special(&identity, user_message, reply).await;
        }

        self.emit(
            &identity,
            vec![ChatEvent::MessageAppended {
                message: user_message.clone(),
            }],
        );
        self.persist_save(&identity.conversation_id, &user_message).await;

        let Some(model) = self.selected_model() else {
            return self
                .reject(&identity, TurnEndReason::ModelNotReady, MODEL_NOT_READY_TEXT.to_string())
                .await;
        };
        if has_media && !model.supports_multimodal {
            return self
                .reject(
                    &identity,
                    TurnEndReason::ModelNotSupportMultimodal,
                    model_not_multimodal_text(&model.name),
                )
                .await;
        }

        self.emit(&identity, vec![ChatEvent::LoadingChanged { is_loading: true }]);

        let catalog = self.catalog.fetch(config.model_filter).await;
        let history = self.store.messages();
        let previous: Vec<Message> = history
            .iter()
            .filter(|m| m.id != user_message.id)
            .cloned()
            .collect();
        let intent = self.intent_classifier.classify(content, has_media, &previous);

        let mut ctx = TurnContext::new(identity, config, model, has_media, cancel);
        let budget_mode = ctx.config.routing.budget_mode;
        if ctx.config.routing.enabled {
            if let Some(decision) =
                self.router
                    .recommend(Some(&ctx.model), &catalog, &intent, budget_mode)
            {
                tracing::info!(
                    "[ROUTE] baseId={} {} → {} ({})",
                    ctx.base_id(),
                    ctx.model.id,
                    decision.model.id,
                    decision.reason
                );
                ctx.apply_routing(decision, budget_mode);
            }
        }

        let request_messages = self.context_builder.build(
            &history,
            &user_message,
            ctx.config.context_strategy,
            ctx.config.max_context_messages,
        );
        tracing::debug!(
            "[TURN] baseId={} 上下文: strategy={}, messages={}, task={}",
            ctx.base_id(),
            ctx.config.context_strategy.display_name(),
            request_messages.len(),
            intent.task_type.as_str()
        );

        self.run_attempts(&mut ctx, &catalog, request_messages).await
    }

    /// 发送循环，失败时按降级规划重试
    async fn run_attempts(
        &self,
        ctx: &mut TurnContext,
        catalog: &[AIModel],
        request_messages: Vec<Message>,
    ) -> TurnOutcome {
        let planner = FallbackPlanner::new(ctx.config.fallback.clone());
        let budget_mode = ctx.config.routing.budget_mode;

        loop {
            let native_fallbacks = planner.native_fallback_models(
                &ctx.model,
                catalog,
                budget_mode,
                ctx.requires_multimodal,
            );
            let request = CompletionRequest::new(request_messages.clone(), ctx.model.api_model.clone())
                .with_max_tokens(ctx.config.max_tokens_for(ctx.requires_multimodal))
                .with_temperature(ctx.config.temperature)
                .with_fallback_models(native_fallbacks);

            let outcome = if ctx.config.enable_stream {
                self.stream_attempt(ctx, request).await
            } else {
                self.atomic_attempt(ctx, request).await
            };

            match outcome {
                AttemptOutcome::Completed {
                    message_id,
                    usage,
                    reason,
                } => {
                    return self
                        .complete(ctx, &request_messages, message_id, usage.as_ref(), reason)
                        .await;
                }
                AttemptOutcome::Cancelled { message_id } => {
                    return self.cancelled(ctx, message_id).await;
                }
                AttemptOutcome::Failed {
                    failure,
                    message_id,
                } => {
                    let classified = self.error_classifier.classify(&failure);
                    if classified.category == ChatErrorCategory::Cancelled {
                        return self.cancelled(ctx, message_id).await;
                    }
                    tracing::warn!(
                        "[TURN] baseId={} 请求失败: model={}, category={:?}, detail={}",
                        ctx.base_id(),
                        ctx.model.id,
                        classified.category,
                        classified.technical_message
                    );

                    // 已经输出部分内容时不再重发
                    let received_content = message_id
                        .and_then(|id| self.store.find_message(id))
                        .is_some_and(|m| !m.content.is_empty());
                    let next = if !received_content && planner.should_retry_fallback(classified.category) {
                        planner.next_candidate(
                            &ctx.model,
                            catalog,
                            ctx.attempt_index,
                            classified.category,
                            budget_mode,
                            &ctx.tried_ids,
                            ctx.requires_multimodal,
                        )
                    } else {
                        None
                    };

                    match next {
                        Some(next) => {
                            if let Some(id) = message_id {
                                self.emit(
                                    &ctx.identity,
                                    vec![ChatEvent::MessageRemoved { message_id: id }],
                                );
                            }
                            tracing::info!(
                                "[FALLBACK] baseId={} {} → {} (attempt={}, category={:?})",
                                ctx.base_id(),
                                ctx.model.id,
                                next.id,
                                ctx.attempt_index + 1,
                                classified.category
                            );
                            ctx.record_fallback(next);
                        }
                        None => return self.fail(ctx, classified, message_id).await,
                    }
                }
            }
        }
    }

    /// 流式尝试：先插入占位消息，增量按到达顺序写入
    async fn stream_attempt(&self, ctx: &TurnContext, request: CompletionRequest) -> AttemptOutcome {
        let item_id = ctx.stream_item_id();
        let mut placeholder = Message::assistant("")
            .streaming()
            .with_identity(ctx.identity.turn_id, ctx.base_id(), item_id.clone())
            .with_runtime_status(ctx.runtime_status());
        placeholder.routing_metadata = ctx.routing_metadata.clone();
        let message_id = placeholder.id;

        self.emit(
            &ctx.identity,
            vec![ChatEvent::MessageAppended {
                message: placeholder,
            }],
        );
        tracing::info!(
            "[TURN] baseId={} itemId={} 流式占位: model={}",
            ctx.base_id(),
            item_id,
            ctx.model.api_model
        );

        let opened = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                return AttemptOutcome::Cancelled { message_id: Some(message_id) };
            }
            opened = self.transport.stream_tokens(request) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(failure) => {
                return AttemptOutcome::Failed {
                    failure,
                    message_id: Some(message_id),
                }
            }
        };

        let mut usage = None;
        let mut chunk_count: u64 = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => {
                    return AttemptOutcome::Cancelled { message_id: Some(message_id) };
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(StreamEvent::Delta(delta))) => {
                    chunk_count += 1;
                    if chunk_count == 1 || chunk_count % CHUNK_LOG_INTERVAL == 0 {
                        tracing::debug!(
                            "[TURN] baseId={} itemId={} chunk #{}",
                            ctx.base_id(),
                            item_id,
                            chunk_count
                        );
                    }
                    self.emit(
                        &ctx.identity,
                        vec![ChatEvent::ContentUpdated { message_id, delta }],
                    );
                }
                Some(Ok(StreamEvent::Usage(reported))) => usage = Some(reported),
                Some(Err(failure)) => {
                    return AttemptOutcome::Failed {
                        failure,
                        message_id: Some(message_id),
                    }
                }
                None => break,
            }
        }

        AttemptOutcome::Completed {
            message_id,
            usage,
            reason: TurnEndReason::Closed,
        }
    }

    /// 一次性尝试：拿到完整文本后才插入消息
    async fn atomic_attempt(&self, ctx: &TurnContext, request: CompletionRequest) -> AttemptOutcome {
        let result = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                return AttemptOutcome::Cancelled { message_id: None };
            }
            result = self.transport.send_once(request) => result,
        };

        match result {
            Ok(completion) => {
                let mut message = Message::assistant(completion.text)
                    .with_identity(ctx.identity.turn_id, ctx.base_id(), ctx.final_item_id())
                    .with_runtime_status(ctx.runtime_status());
                message.routing_metadata = ctx.routing_metadata.clone();
                let message_id = message.id;
                self.emit(&ctx.identity, vec![ChatEvent::MessageAppended { message }]);
                AttemptOutcome::Completed {
                    message_id,
                    usage: completion.usage,
                    reason: TurnEndReason::NonStreamDone,
                }
            }
            Err(failure) => AttemptOutcome::Failed {
                failure,
                message_id: None,
            },
        }
    }

    /// 成功：写入指标并定稿
    async fn complete(
        &self,
        ctx: &TurnContext,
        request_messages: &[Message],
        message_id: Uuid,
        usage: Option<&TokenUsage>,
        reason: TurnEndReason,
    ) -> TurnOutcome {
        let Some(mut message) = self.store.find_message(message_id) else {
            // 会话已被切换
            self.emit(
                &ctx.identity,
                vec![ChatEvent::LoadingChanged { is_loading: false }],
            );
            return self.finish(ctx.base_id(), reason, None, None, ctx.elapsed_ms());
        };

        let latency_ms = ctx.elapsed_ms();
        message.metrics = Some(make_metrics(
            request_messages,
            &message.content,
            &ctx.model,
            latency_ms,
            usage,
        ));
        message.finish_streaming();
        message.runtime_status_text = ctx.runtime_status();
        message.routing_metadata = ctx.routing_metadata.clone();

        self.emit(
            &ctx.identity,
            vec![
                ChatEvent::MessageUpdated {
                    message: message.clone(),
                },
                ChatEvent::LoadingChanged { is_loading: false },
            ],
        );
        self.persist_save(&ctx.identity.conversation_id, &message).await;
        self.persist_touch(&ctx.identity.conversation_id).await;

        self.finish(ctx.base_id(), reason, Some(message), None, latency_ms)
    }

    /// 用户停止：保留已输出内容并附加停止提示
    async fn cancelled(&self, ctx: &TurnContext, message_id: Option<Uuid>) -> TurnOutcome {
        let mut events = Vec::new();
        if let Some(id) = message_id {
            events.push(ChatEvent::StreamFinalized { message_id: id });
        }
        events.push(ChatEvent::StopNoticeAdded {
            notice: StopNotice::stopped(message_id),
        });
        events.push(ChatEvent::LoadingChanged { is_loading: false });
        self.emit(&ctx.identity, events);

        let message = message_id.and_then(|id| self.store.find_message(id));
        if let Some(partial) = message.as_ref().filter(|m| !m.content.is_empty()) {
            self.persist_save(&ctx.identity.conversation_id, partial).await;
        }
        self.finish(
            ctx.base_id(),
            TurnEndReason::Cancelled,
            message,
            None,
            ctx.elapsed_ms(),
        )
    }

    /// 终止性失败：以错误消息结束本轮
    async fn fail(
        &self,
        ctx: &TurnContext,
        classified: ClassifiedChatError,
        message_id: Option<Uuid>,
    ) -> TurnOutcome {
        let mut events = Vec::new();
        if let Some(partial) = message_id.and_then(|id| self.store.find_message(id)) {
            if partial.content.is_empty() {
                events.push(ChatEvent::MessageRemoved {
                    message_id: partial.id,
                });
            } else {
                events.push(ChatEvent::StreamFinalized {
                    message_id: partial.id,
                });
                let mut finalized = partial;
                finalized.finish_streaming();
                self.persist_save(&ctx.identity.conversation_id, &finalized).await;
            }
        }

        // 降级过才带状态行，说明已尝试过哪个模型
        let runtime_status = if ctx.has_fallen_back() {
            merge_status([
                ctx.fallback_status.clone(),
                Some(classified.status_message()),
            ])
        } else {
            None
        };
        let error_message = Message::assistant(classified.banner_message())
            .with_identity(
                ctx.identity.turn_id,
                ctx.base_id(),
                ctx.identity
                    .item_id(ItemKind::Error, TurnEndReason::Error.as_str()),
            )
            .with_runtime_status(runtime_status);

        events.push(ChatEvent::MessageAppended {
            message: error_message.clone(),
        });
        events.push(ChatEvent::LoadingChanged { is_loading: false });
        self.emit(&ctx.identity, events);

        self.persist_save(&ctx.identity.conversation_id, &error_message)
            .await;
        self.persist_touch(&ctx.identity.conversation_id).await;

        self.finish(
            ctx.base_id(),
            TurnEndReason::Error,
            Some(error_message),
            Some(classified),
            ctx.elapsed_ms(),
        )
    }

    /// 发送前校验未通过
    async fn reject(
        &self,
        identity: &TurnIdentity,
        reason: TurnEndReason,
        text: String,
    ) -> TurnOutcome {
        let message = Message::assistant(text).with_identity(
            identity.turn_id,
            &identity.base_id,
            identity.item_id(ItemKind::Error, reason.as_str()),
        );
        self.emit(
            identity,
            vec![ChatEvent::MessageAppended {
                message: message.clone(),
            }],
        );
        self.persist_save(&identity.conversation_id, &message).await;
        self.finish(&identity.base_id, reason, Some(message), None, 0)
    }

    /// 固定回复，不经过传输层
    async fn respond_special(
        &self,
        identity: &TurnIdentity,
        user_message: Message,
        reply: &str,
    ) -> TurnOutcome {
        let reply = Message::assistant(reply).with_identity(
            identity.turn_id,
            &identity.base_id,
            identity.item_id(
                ItemKind::AssistantFinal,
                TurnEndReason::SpecialResponse.as_str(),
            ),
        );
        self.emit(
            identity,
            vec![
                ChatEvent::MessageAppended {
                    message: user_message.clone(),
                },
                ChatEvent::MessageAppended {
                    message: reply.clone(),
                },
            ],
        );
        self.persist_save(&identity.conversation_id, &user_message)
            .await;
        self.persist_save(&identity.conversation_id, &reply).await;
        self.persist_touch(&identity.conversation_id).await;

        self.finish(
            &identity.base_id,
            TurnEndReason::SpecialResponse,
            Some(reply),
            None,
            0,
        )
    }

    fn finish(
        &self,
        base_id: &str,
        reason: TurnEndReason,
        assistant_message: Option<Message>,
        error: Option<ClassifiedChatError>,
        elapsed_ms: u64,
    ) -> TurnOutcome {
        tracing::info!(
            "[TURN] baseId={} itemId={} 结束: reason={}, success={}, elapsed_ms={}",
            base_id,
            assistant_message
                .as_ref()
                .and_then(|m| m.item_id.as_deref())
                .unwrap_or("-"),
            reason.as_str(),
            reason.is_success(),
            elapsed_ms
        );
        TurnOutcome {
            base_id: base_id.to_string(),
            reason,
            assistant_message,
            error,
        }
    }

    /// 提交本轮事件；会话已切换时丢弃
    fn emit(&self, identity: &TurnIdentity, events: Vec<ChatEvent>) {
        self.store.dispatch_for(&identity.conversation_id, events);
    }

    /// 替换取消令牌，旧令牌不触发
    fn regenerate_cancel_token(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        token
    }

    async fn persist_save(&self, conversation_id: &str, message: &Message) {
        if let Err(e) = self.persistence.save_message(conversation_id, message).await {
            tracing::warn!("[PERSIST] 保存消息失败: {} - {}", message.id, e);
        }
    }

    async fn persist_touch(&self, conversation_id: &str) {
        if let Err(e) = self.persistence.touch_conversation(conversation_id).await {
            tracing::warn!("[PERSIST] 更新会话时间失败: {} - {}", conversation_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use easyai_config::ChatConfig;
    use easyai_core::{Completion, ModelFilter, ModelPricing, TokenStream};
    use futures::stream;

    use crate::persistence::InMemoryPersistence;

    struct StaticCatalog(Vec<AIModel>);

    #[async_trait]
    impl ModelCatalog for StaticCatalog {
        async fn fetch(&self, filter: ModelFilter) -> Vec<AIModel> {
            filter.apply(&self.0)
        }
    }

    /// 固定回复的传输层
    struct EchoTransport;

    #[async_trait]
    impl ChatTransport for EchoTransport {
        async fn send_once(&self, request: CompletionRequest) -> Result<Completion, ChatFailure> {
            Ok(Completion {
                text: format!("echo:{}", request.model),
                usage: None,
            })
        }

        async fn stream_tokens(&self, _request: CompletionRequest) -> Result<TokenStream, ChatFailure> {
            let events: Vec<Result<StreamEvent, ChatFailure>> = vec![
                Ok(StreamEvent::Delta("你".to_string())),
                Ok(StreamEvent::Delta("好".to_string())),
            ];
            Ok(Box::pin(stream::iter(events)))
        }
    }

    fn create_test_models() -> Vec<AIModel> {
        vec![
            AIModel::new("openrouter-a", "Alpha", "a/alpha")
                .with_pricing(ModelPricing::new("0", "0")),
            AIModel::new("openrouter-v", "Vision", "v/vision")
                .with_multimodal(true)
                .with_pricing(ModelPricing::new("0.000001", "0.000001")),
        ]
    }

    fn create_orchestrator(config: ChatConfig) -> TurnOrchestrator {
        TurnOrchestrator::new(
            Arc::new(EchoTransport),
            Arc::new(StaticCatalog(create_test_models())),
            Arc::new(InMemoryPersistence::new()),
            ConfigHandle::new(config),
        )
    }

    fn manual_config() -> ChatConfig {
        let mut config = ChatConfig::default();
        config.routing.enabled = false;
        config
    }

    #[tokio::test]
    async fn test_load_models_selects_first_and_keeps_choice() {
        let orchestrator = create_orchestrator(manual_config());
        assert!(orchestrator.selected_model().is_none());

        orchestrator.load_models().await;
        assert_eq!(orchestrator.selected_model().unwrap().id, "openrouter-a");

        orchestrator.select_model(create_test_models()[1].clone());
        orchestrator.load_models().await;
        assert_eq!(orchestrator.selected_model().unwrap().id, "openrouter-v");
    }

    #[tokio::test]
    async fn test_model_not_ready() {
        let orchestrator = create_orchestrator(manual_config());
        let outcome = orchestrator.send_message("你好", vec![]).await;

        assert_eq!(outcome.reason, TurnEndReason::ModelNotReady);
        let message = outcome.assistant_message.unwrap();
        assert_eq!(message.content, MODEL_NOT_READY_TEXT);
        assert!(message
            .item_id
            .unwrap()
            .ends_with("|k:error|p:model_not_ready"));
        assert_eq!(orchestrator.store().messages().len(), 2);
        assert!(!orchestrator.store().is_loading());
    }

    #[tokio::test]
    async fn test_media_requires_multimodal_model() {
        let orchestrator = create_orchestrator(manual_config());
        orchestrator.load_models().await;

        let outcome = orchestrator
            .send_message("看看这张图", vec![MediaContent::image(vec![1, 2, 3], "image/png")])
            .await;
        assert_eq!(outcome.reason, TurnEndReason::ModelNotSupportMultimodal);
        assert!(outcome
            .assistant_message
            .unwrap()
            .content
            .contains("当前选择的模型（Alpha）不支持图片输入"));
    }

    #[tokio::test]
    async fn test_streaming_turn_completes() {
        let orchestrator = create_orchestrator(manual_config());
        orchestrator.load_models().await;

        let outcome = orchestrator.send_message("写一首诗", vec![]).await;
        assert_eq!(outcome.reason, TurnEndReason::Closed);
        let message = outcome.assistant_message.unwrap();
        assert_eq!(message.content, "你好");
        assert!(message.was_streamed);
        assert!(!message.is_streaming);
        assert!(message.metrics.as_ref().unwrap().is_estimated);
    }

    #[tokio::test]
    async fn test_atomic_turn_completes() {
        let mut config = manual_config();
        config.enable_stream = false;
        let orchestrator = create_orchestrator(config);
        orchestrator.load_models().await;

        let outcome = orchestrator.send_message("写一首诗", vec![]).await;
        assert_eq!(outcome.reason, TurnEndReason::NonStreamDone);
        let message = outcome.assistant_message.unwrap();
        assert_eq!(message.content, "echo:a/alpha");
        assert!(!message.was_streamed);
        assert!(message
            .item_id
            .unwrap()
            .ends_with("|k:assistant_final|p:main"));
    }

    #[tokio::test]
    async fn test_special_response_skips_transport() {
        let orchestrator = create_orchestrator(manual_config());
        let outcome = orchestrator.send_message("你是什么模型？", vec![]).await;

        assert_eq!(outcome.reason, TurnEndReason::SpecialResponse);
        let messages = orchestrator.store().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[1].content,
            ChatConfig::default().special_response.text
        );
    }

    #[tokio::test]
    async fn test_new_conversation_resets_state() {
        let orchestrator = create_orchestrator(manual_config());
        orchestrator.load_models().await;
        let first = orchestrator.store().conversation_id();
        orchestrator.send_message("写一首诗", vec![]).await;

        let second = orchestrator.new_conversation().await;
        assert_ne!(first, second);
        assert!(orchestrator.store().messages().is_empty());

        orchestrator.switch_conversation(&first).await;
        assert_eq!(orchestrator.store().messages().len(), 2);
    }
}
