//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；支持原生工具绑定与
//! 多模态 user 内容（图像 data URL），评估调用传空工具集即不绑定。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
    ChatCompletionTool, ChatCompletionTools, CreateChatCompletionRequestArgs, FunctionCall,
    FunctionObject, ImageUrlArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::history::{ContentPart, Message, Role, ToolCall};
use crate::llm::{LlmClient, LlmReply, ToolSpec};

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容客户端：持有 Client 与 model 名
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            usage: TokenUsage::new(),
        }
    }

    fn to_user_message(&self, message: &Message) -> Result<ChatCompletionRequestMessage, String> {
        let has_images = message
            .content
            .iter()
            .any(|p| matches!(p, ContentPart::ImageRef { .. }));

        let content = if has_images {
            let mut parts: Vec<ChatCompletionRequestUserMessageContentPart> = Vec::new();
            for part in &message.content {
                match part {
                    ContentPart::Text { text } => parts.push(
                        ChatCompletionRequestMessageContentPartTextArgs::default()
                            .text(text.clone())
                            .build()
                            .map_err(|e| e.to_string())?
                            .into(),
                    ),
                    ContentPart::ImageRef { download_link, .. } => parts.push(
                        ChatCompletionRequestMessageContentPartImageArgs::default()
                            .image_url(
                                ImageUrlArgs::default()
                                    .url(download_link.clone())
                                    .build()
                                    .map_err(|e| e.to_string())?,
                            )
                            .build()
                            .map_err(|e| e.to_string())?
                            .into(),
                    ),
                }
            }
            ChatCompletionRequestUserMessageContent::Array(parts)
        } else {
            ChatCompletionRequestUserMessageContent::Text(message.text())
        };

        Ok(ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| e.to_string())?
            .into())
    }

    fn to_assistant_message(
        &self,
        message: &Message,
    ) -> Result<ChatCompletionRequestMessage, String> {
        let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
        builder.content(message.text());
        if !message.tool_calls.is_empty() {
            let calls: Vec<ChatCompletionMessageToolCalls> = message
                .tool_calls
                .iter()
                .map(|call| {
                    ChatCompletionMessageToolCalls::Function(ChatCompletionMessageToolCall {
                        id: call.call_id.clone(),
                        function: FunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    })
                })
                .collect();
            builder.tool_calls(calls);
        }
        Ok(builder.build().map_err(|e| e.to_string())?.into())
    }

    fn to_openai_messages(
        &self,
        system: &str,
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, String> {
        let mut out = Vec::with_capacity(messages.len() + 1);
        if !system.is_empty() {
            out.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system.to_string())
                    .build()
                    .map_err(|e| e.to_string())?
                    .into(),
            );
        }
        for message in messages {
            let converted = match message.role {
                Role::User => self.to_user_message(message)?,
                Role::Assistant => self.to_assistant_message(message)?,
                Role::ToolResult => ChatCompletionRequestToolMessageArgs::default()
                    .content(message.text())
                    .tool_call_id(
                        message
                            .tool_call_id
                            .clone()
                            .unwrap_or_else(|| "call_0".to_string()),
                    )
                    .build()
                    .map_err(|e| e.to_string())?
                    .into(),
            };
            out.push(converted);
        }
        Ok(out)
    }

    fn to_openai_tools(&self, tools: &[ToolSpec]) -> Vec<ChatCompletionTools> {
        tools
            .iter()
            .map(|spec| {
                ChatCompletionTools::Function(ChatCompletionTool {
                    function: FunctionObject {
                        name: spec.name.clone(),
                        description: Some(spec.description.clone()),
                        parameters: Some(spec.parameters.clone()),
                        strict: None,
                    },
                })
            })
            .collect()
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolSpec],
        tags: &[&str],
    ) -> Result<LlmReply, String> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(self.to_openai_messages(system, messages)?);
        if !tools.is_empty() {
            builder.tools(self.to_openai_tools(tools));
        }
        let request = builder.build().map_err(|e| e.to_string())?;

        tracing::info!(model = %self.model, tags = ?tags, tool_count = tools.len(), "llm chat");

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| e.to_string())?;

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| "empty choices in chat response".to_string())?;

        let text = choice.message.content.unwrap_or_default();
        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|call| match call {
                ChatCompletionMessageToolCalls::Function(call) => Some(ToolCall {
                    name: call.function.name,
                    call_id: call.id,
                    arguments: serde_json::from_str(&call.function.arguments)
                        .unwrap_or_else(|_| serde_json::json!({})),
                }),
                #[allow(unreachable_patterns)]
                _ => None,
            })
            .collect();

        Ok(LlmReply { text, tool_calls })
    }
}
