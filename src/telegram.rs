// Minimal Telegram Bot API client: long-poll `getUpdates` plus
// `sendMessage`, which is all the bot front-end needs. The poll loop
// itself lives in the bot binary; this module only speaks the wire
// format.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const API_BASE: &str = "https://api.telegram.org";

/// Long-poll window. The HTTP timeout below must stay comfortably above
/// it or every empty poll turns into a client-side timeout error.
pub const POLL_TIMEOUT_SECS: u64 = 50;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with `ok: false`; carries Telegram's description.
    #[error("telegram api error: {0}")]
    Api(String),
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
}

/// Telegram's standard response envelope.
#[derive(Debug, Deserialize)]
struct ApiReply<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

#[derive(Serialize)]
struct SendMessagePayload<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

pub struct BotClient {
    http: reqwest::Client,
    base_url: String,
}

impl BotClient {
    pub fn new(token: &str) -> Result<Self, TelegramError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .build()?;
        Ok(Self {
            http,
            base_url: format!("{API_BASE}/bot{token}"),
        })
    }

    /// Point the client at a different API root (token segment included).
    /// Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// One long-poll round. `offset` is the usual high-water mark:
    /// pass `last_update_id + 1` to acknowledge everything seen so far.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TelegramError> {
        let mut request = self
            .http
            .get(format!("{}/getUpdates", self.base_url))
            .query(&[("timeout", POLL_TIMEOUT_SECS.to_string())]);
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset.to_string())]);
        }

        let reply: ApiReply<Vec<Update>> = request.send().await?.json().await?;
        let updates = into_result(reply)?;
        if !updates.is_empty() {
            debug!(count = updates.len(), "received updates");
        }
        Ok(updates)
    }

    /// Send a plain-text message.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        self.send(chat_id, text, None).await
    }

    /// Send a message rendered with Telegram's HTML parse mode.
    pub async fn send_html(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        self.send(chat_id, text, Some("HTML")).await
    }

    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<(), TelegramError> {
        let payload = SendMessagePayload {
            chat_id,
            text,
            parse_mode,
        };
        let reply: ApiReply<serde_json::Value> = self
            .http
            .post(format!("{}/sendMessage", self.base_url))
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;
        into_result(reply)?;
        Ok(())
    }
}

/// HTML inline mention of a user, like the one Telegram renders for
/// `tg://user` links.
pub fn mention_html(user: &User) -> String {
    format!(
        "<a href=\"tg://user?id={}\">{}</a>",
        user.id,
        escape_html(&user.first_name)
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn into_result<T>(reply: ApiReply<T>) -> Result<T, TelegramError> {
    if reply.ok {
        reply
            .result
            .ok_or_else(|| TelegramError::Api("ok reply without result".to_string()))
    } else {
        Err(TelegramError::Api(
            reply
                .description
                .unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> BotClient {
        BotClient::new("TEST")
            .unwrap()
            .with_base_url(format!("{}/botTEST", server.uri()))
    }

    #[tokio::test]
    async fn test_get_updates_parses_messages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/botTEST/getUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [{
                    "update_id": 7,
                    "message": {
                        "message_id": 1,
                        "chat": { "id": 42, "type": "private" },
                        "from": { "id": 9, "is_bot": false, "first_name": "سارا" },
                        "text": "/start"
                    }
                }]
            })))
            .mount(&server)
            .await;

        let updates = client_for(&server).get_updates(None).await.unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].update_id, 7);
        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(message.chat.id, 42);
        assert_eq!(message.text.as_deref(), Some("/start"));
    }

    #[tokio::test]
    async fn test_get_updates_passes_offset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/botTEST/getUpdates"))
            .and(query_param("offset", "8"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": [] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let updates = client_for(&server).get_updates(Some(8)).await.unwrap();
        assert!(updates.is_empty());
    }

    #[tokio::test]
    async fn test_send_message_posts_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/sendMessage"))
            .and(body_json(json!({ "chat_id": 42, "text": "سلام" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": { "message_id": 5, "chat": { "id": 42 } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .send_message(42, "سلام")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_api_error_carries_description() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/botTEST/getUpdates"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "ok": false,
                "error_code": 401,
                "description": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).get_updates(None).await.err().unwrap();
        match err {
            TelegramError::Api(description) => assert_eq!(description, "Unauthorized"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_mention_html_escapes_name() {
        let user = User {
            id: 9,
            first_name: "<Ali & Co>".to_string(),
        };
        let mention = mention_html(&user);
        assert_eq!(
            mention,
            "<a href=\"tg://user?id=9\">&lt;Ali &amp; Co&gt;</a>"
        );
    }
}
