//! Image question answering through a vision-capable chat model

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use mmchat_core::services::ImageAnswerer;
use tracing::debug;

use crate::base::{ContentPart, ImageUrl, Message, ProviderError, ProviderResult};
use crate::client::ChatClient;

const SYSTEM_PROMPT: &str = "You describe images and answer questions about them. Be specific \
about what is visible and say when something cannot be determined from the image.";

const DEFAULT_QUESTION: &str = "Describe this image.";

/// Answers questions about a single uploaded image
pub struct VisionClient {
    client: ChatClient,
}

impl VisionClient {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }

    /// Messages for one image question
    pub fn build_messages(&self, image: &[u8], question: &str) -> ProviderResult<Vec<Message>> {
        let question = if question.trim().is_empty() {
            DEFAULT_QUESTION
        } else {
            question
        };

        Ok(vec![
            Message::system(SYSTEM_PROMPT),
            Message::user_parts(vec![
                ContentPart::Text {
                    text: question.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: data_url(image)?,
                    },
                },
            ]),
        ])
    }
}

#[async_trait]
impl ImageAnswerer for VisionClient {
    async fn answer(&self, image: &[u8], question: &str) -> mmchat_core::Result<String> {
        let messages = self.build_messages(image, question)?;
        debug!(
            "Asking {} about a {} byte image",
            self.client.model(),
            image.len()
        );
        Ok(self.client.complete(&messages).await?)
    }
}

/// Mime type of an image, judged by its magic bytes
pub fn sniff_image_mime(image: &[u8]) -> Option<&'static str> {
    if image.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png")
    } else if image.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if image.starts_with(b"GIF8") {
        Some("image/gif")
    } else if image.len() >= 12 && &image[..4] == b"RIFF" && &image[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

fn data_url(image: &[u8]) -> ProviderResult<String> {
    if image.is_empty() {
        return Err(ProviderError::DocumentError("image is empty".to_string()));
    }
    let mime = sniff_image_mime(image).ok_or_else(|| {
        ProviderError::DocumentError("unsupported image format".to_string())
    })?;
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(image)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::MessageContent;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_sniff_image_mime() {
        assert_eq!(sniff_image_mime(PNG), Some("image/png"));
        assert_eq!(sniff_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_image_mime(b"GIF89a"), Some("image/gif"));
        assert_eq!(sniff_image_mime(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image_mime(b"plain text"), None);
    }

    #[test]
    fn test_build_messages_embeds_data_url() {
        let vision = VisionClient::new(ChatClient::new("http://localhost", None, "gpt-4o"));
        let messages = vision.build_messages(PNG, "What is shown?").unwrap();

        assert_eq!(messages.len(), 2);
        match &messages[1].content {
            MessageContent::Parts(parts) => {
                assert_eq!(
                    parts[0],
                    ContentPart::Text {
                        text: "What is shown?".into()
                    }
                );
                match &parts[1] {
                    ContentPart::ImageUrl { image_url } => {
                        assert!(image_url.url.starts_with("data:image/png;base64,"))
                    }
                    other => panic!("unexpected part: {other:?}"),
                }
            }
            MessageContent::Text(_) => panic!("expected multimodal content"),
        }
    }

    #[test]
    fn test_blank_question_gets_default_prompt() {
        let vision = VisionClient::new(ChatClient::new("http://localhost", None, "gpt-4o"));
        let messages = vision.build_messages(PNG, "  ").unwrap();
        let value = serde_json::to_value(&messages[1]).unwrap();
        assert_eq!(value["content"][0]["text"], DEFAULT_QUESTION);
    }

    #[test]
    fn test_unknown_image_format_is_rejected() {
        let vision = VisionClient::new(ChatClient::new("http://localhost", None, "gpt-4o"));
        assert!(vision.build_messages(b"not an image", "q").is_err());
        assert!(vision.build_messages(&[], "q").is_err());
    }

    #[tokio::test]
    async fn test_answer_posts_image() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::Regex("data:image/png;base64,".to_string()))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"A tiny png."}}]}"#)
            .create_async()
            .await;

        let vision = VisionClient::new(ChatClient::new(server.url(), None, "gpt-4o"));
        let answer = vision.answer(PNG, "What is this?").await.unwrap();
        assert_eq!(answer, "A tiny png.");
        mock.assert_async().await;
    }
}
