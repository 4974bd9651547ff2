// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response bodies for the Cloud API `/messages` endpoint.

use courier_core::OutboundMessage;
use serde::{Deserialize, Serialize};

/// Top-level send request.
#[derive(Debug, Clone, Serialize)]
pub struct SendRequest<'a> {
    pub messaging_product: &'static str,
    pub recipient_type: &'static str,
    pub to: &'a str,
    #[serde(flatten)]
    pub body: MessageBody<'a>,
}

impl<'a> SendRequest<'a> {
    pub fn new(to: &'a str, message: &'a OutboundMessage) -> Self {
        Self {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to,
            body: MessageBody::from(message),
        }
    }
}

/// Typed message payload, tagged by `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody<'a> {
    Text { text: TextBody<'a> },
    Image { image: ImageBody<'a> },
    Template { template: TemplateBody<'a> },
}

#[derive(Debug, Clone, Serialize)]
pub struct TextBody<'a> {
    pub preview_url: bool,
    pub body: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageBody<'a> {
    pub link: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateBody<'a> {
    pub name: &'a str,
    pub language: Language<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Language<'a> {
    pub code: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component<'a> {
    Body {
        parameters: Vec<Parameter<'a>>,
    },
    Button {
        sub_type: &'static str,
        index: &'static str,
        parameters: Vec<Parameter<'a>>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Parameter<'a> {
    Text { text: &'a str },
    Payload { payload: &'a str },
}

impl<'a> From<&'a OutboundMessage> for MessageBody<'a> {
    fn from(message: &'a OutboundMessage) -> Self {
        match message {
            OutboundMessage::Text { body } => Self::Text {
                text: TextBody {
                    preview_url: false,
                    body,
                },
            },
            OutboundMessage::Image { url, caption } => Self::Image {
                image: ImageBody {
                    link: url,
                    caption: caption.as_deref(),
                },
            },
            OutboundMessage::Template {
                name,
                language,
                params,
                button_payload,
            } => {
                let mut components = Vec::new();
                if !params.is_empty() {
                    components.push(Component::Body {
                        parameters: params.iter().map(|p| Parameter::Text { text: p }).collect(),
                    });
                }
                if let Some(payload) = button_payload {
                    components.push(Component::Button {
                        sub_type: "quick_reply",
                        index: "0",
                        parameters: vec![Parameter::Payload { payload }],
                    });
                }
                Self::Template {
                    template: TemplateBody {
                        name,
                        language: Language { code: language },
                        components,
                    },
                }
            }
        }
    }
}

/// Successful send response.
#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub messages: Vec<SentMessageRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentMessageRef {
    pub id: String,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_request_shape() {
        let msg = OutboundMessage::text("hello");
        let value = serde_json::to_value(SendRequest::new("919800000001", &msg)).unwrap();
        assert_eq!(
            value,
            json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "919800000001",
                "type": "text",
                "text": {"preview_url": false, "body": "hello"}
            })
        );
    }

    #[test]
    fn image_without_caption_omits_field() {
        let msg = OutboundMessage::image("https://cdn.example/a.png", None);
        let value = serde_json::to_value(SendRequest::new("1", &msg)).unwrap();
        assert_eq!(value["type"], "image");
        assert_eq!(value["image"], json!({"link": "https://cdn.example/a.png"}));
    }

    #[test]
    fn template_carries_params_and_quick_reply_payload() {
        let msg = OutboundMessage::Template {
            name: "daily_content_ready".into(),
            language: "en".into(),
            params: vec!["02 Mar 2026".into(), "3".into()],
            button_payload: Some("UNLOCK_CONTENT_content_1_abc".into()),
        };
        let value = serde_json::to_value(SendRequest::new("1", &msg)).unwrap();
        let template = &value["template"];
        assert_eq!(template["name"], "daily_content_ready");
        assert_eq!(template["language"]["code"], "en");
        assert_eq!(template["components"][0]["type"], "body");
        assert_eq!(template["components"][0]["parameters"][1]["text"], "3");
        assert_eq!(template["components"][1]["type"], "button");
        assert_eq!(template["components"][1]["sub_type"], "quick_reply");
        assert_eq!(
            template["components"][1]["parameters"][0]["payload"],
            "UNLOCK_CONTENT_content_1_abc"
        );
    }

    #[test]
    fn template_without_params_has_no_components() {
        let msg = OutboundMessage::Template {
            name: "hello_world".into(),
            language: "en_US".into(),
            params: vec![],
            button_payload: None,
        };
        let value = serde_json::to_value(SendRequest::new("1", &msg)).unwrap();
        assert!(value["template"].get("components").is_none());
    }

    #[test]
    fn error_envelope_parses() {
        let err: ApiErrorResponse = serde_json::from_str(
            r#"{"error":{"message":"Invalid OAuth access token.","type":"OAuthException","code":190}}"#,
        )
        .unwrap();
        assert_eq!(err.error.code, Some(190));
        assert_eq!(err.error.message, "Invalid OAuth access token.");
    }
}
