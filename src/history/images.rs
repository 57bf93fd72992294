//! 工具结果中的图像引用：检测与多模态展开
//!
//! 工具结果载荷带 `images` 字段即视为含可视内容（路由到 visual_eval 的唯一判据）；
//! visual_eval 前把引用的图像解码为 data URL 分段，作为多模态输入重发给 LLM。

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use crate::history::{ContentPart, Message, Role};

/// 图像引用条目（工具结果 `images` 数组的元素）
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ImageEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_mime")]
    pub mime_type: String,
    pub download_link: String,
}

fn default_mime() -> String {
    "image/png".to_string()
}

/// 结果载荷是否携带内嵌可视内容
pub fn value_contains_images(value: &Value) -> bool {
    value.get("images").is_some()
}

/// 消息的某个文本分段解析为 JSON 后是否带 `images` 字段
pub fn message_contains_images(message: &Message) -> bool {
    message.content.iter().any(|part| match part {
        ContentPart::Text { text } => serde_json::from_str::<Value>(text)
            .map(|v| value_contains_images(&v))
            .unwrap_or(false),
        ContentPart::ImageRef { .. } => false,
    })
}

/// 把图像引用解码为 data URL：http(s) 链接按原样透传，本地路径读文件后 base64 编码
pub async fn load_image_as_data_url(link: &str, mime_type: &str) -> Result<String, String> {
    if link.starts_with("http://") || link.starts_with("https://") || link.starts_with("data:") {
        return Ok(link.to_string());
    }
    let bytes = tokio::fs::read(link)
        .await
        .map_err(|e| format!("failed to read image {}: {}", link, e))?;
    Ok(format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes)))
}

/// 将（通常是工具结果）消息展开为多模态 user 消息：文本保留，images 引用解码为图像分段。
/// 解码失败的条目记 warn 并跳过，不中断评估。
pub async fn into_multimodal(message: &Message) -> Message {
    let mut parts = Vec::new();
    for part in &message.content {
        match part {
            ContentPart::Text { text } => {
                parts.push(ContentPart::Text { text: text.clone() });
                let Ok(value) = serde_json::from_str::<Value>(text) else {
                    continue;
                };
                let Some(images) = value.get("images") else {
                    continue;
                };
                let entries: Vec<ImageEntry> =
                    serde_json::from_value(images.clone()).unwrap_or_default();
                for entry in entries {
                    match load_image_as_data_url(&entry.download_link, &entry.mime_type).await {
                        Ok(url) => parts.push(ContentPart::ImageRef {
                            name: entry.name,
                            mime_type: entry.mime_type,
                            download_link: url,
                        }),
                        Err(e) => tracing::warn!(error = %e, "skipping undecodable image"),
                    }
                }
            }
            ContentPart::ImageRef { .. } => parts.push(part.clone()),
        }
    }

    Message {
        role: Role::User,
        content: parts,
        tool_calls: Vec::new(),
        tool_call_id: None,
        metadata: message.metadata.clone(),
    }
    .ensure_content()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_detects_images_field() {
        let with = Message::tool_result(
            r#"{"response":"ok","images":[{"download_link":"/tmp/x.png"}]}"#,
            "c1",
        );
        let without = Message::tool_result(r#"{"response":"ok"}"#, "c1");
        let not_json = Message::tool_result("plain text", "c1");
        assert!(message_contains_images(&with));
        assert!(!message_contains_images(&without));
        assert!(!message_contains_images(&not_json));
    }

    #[tokio::test]
    async fn test_into_multimodal_decodes_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG fake").unwrap();
        let payload = serde_json::json!({
            "response": "plotted",
            "images": [{
                "name": "plot.png",
                "mime_type": "image/png",
                "download_link": file.path().to_string_lossy(),
            }]
        });
        let message = Message::tool_result(payload.to_string(), "c1");
        let multimodal = into_multimodal(&message).await;
        assert_eq!(multimodal.role, Role::User);
        assert!(multimodal.content.iter().any(|p| matches!(
            p,
            ContentPart::ImageRef { download_link, .. } if download_link.starts_with("data:image/png;base64,")
        )));
    }

    #[tokio::test]
    async fn test_into_multimodal_skips_missing_file() {
        let payload = serde_json::json!({
            "response": "plotted",
            "images": [{ "download_link": "/nonexistent/p.png" }]
        });
        let message = Message::tool_result(payload.to_string(), "c1");
        let multimodal = into_multimodal(&message).await;
        assert!(!multimodal
            .content
            .iter()
            .any(|p| matches!(p, ContentPart::ImageRef { .. })));
    }
}
