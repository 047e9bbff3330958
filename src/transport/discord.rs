//! Discord REST transport.
//!
//! Talks to the v10 HTTP API with a bot token. Each [`StatusSummary`] is
//! posted as a single embed.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::render::StatusSummary;

use super::{ChannelId, ChannelInfo, ChatTransport, GuildId, GuildInfo, MessageId, PostedMessage};

/// Default API base.
pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Discord epoch (2015-01-01T00:00:00Z) in milliseconds.
const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Bulk delete rejects messages older than this.
const BULK_DELETE_MAX_AGE_DAYS: i64 = 14;

/// Page size for history listing and bulk delete.
const PAGE_SIZE: usize = 100;

/// Upper bound on history pages processed by one clear.
const MAX_CLEAR_PAGES: usize = 50;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Channel types that accept messages (text, voice, announcement, threads, stage).
const TEXT_CHANNEL_TYPES: &[u8] = &[0, 2, 5, 10, 11, 12, 13];

#[derive(Debug, Deserialize)]
struct GuildPayload {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelPayload {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    id: String,
}

/// [`ChatTransport`] backed by the Discord HTTP API.
#[derive(Debug, Clone)]
pub struct DiscordTransport {
    client: Client,
    base: String,
    token: String,
}

impl DiscordTransport {
    /// Creates a transport for a bot token against the public API.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(token: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_base(token, DISCORD_API_BASE)
    }

    /// Creates a transport against a custom API base (for proxies and tests).
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn with_base(token: impl Into<String>, base: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::ConnectionFailed {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("Bot {}", self.token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        self.authorized(request)
            .send()
            .await
            .map_err(|e| TransportError::ConnectionFailed {
                message: e.to_string(),
            })
    }

    /// Sends a lookup; 404 becomes `Ok(None)`.
    async fn lookup<T: for<'de> Deserialize<'de>>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>, TransportError> {
        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response).await?;
        decode(response).await.map(Some)
    }

    async fn list_messages(&self, channel: &ChannelId) -> Result<Vec<MessageId>, TransportError> {
        let request = self
            .client
            .get(self.url(&format!("/channels/{channel}/messages")))
            .query(&[("limit", PAGE_SIZE)]);
        let response = ensure_success(self.send(request).await?).await?;
        let messages: Vec<MessagePayload> = decode(response).await?;
        Ok(messages.into_iter().map(|m| MessageId::new(m.id)).collect())
    }

    async fn delete_message(&self, channel: &ChannelId, message: &MessageId) -> Result<(), TransportError> {
        let request = self
            .client
            .delete(self.url(&format!("/channels/{channel}/messages/{message}")));
        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success(response).await.map(|_| ())
    }

    async fn bulk_delete(&self, channel: &ChannelId, messages: &[MessageId]) -> Result<(), TransportError> {
        if let [single] = messages {
            return self.delete_message(channel, single).await;
        }
        let request = self
            .client
            .post(self.url(&format!("/channels/{channel}/messages/bulk-delete")))
            .json(&json!({ "messages": messages }));
        ensure_success(self.send(request).await?).await.map(|_| ())
    }
}

/// Encodes a summary as a message body carrying one embed.
#[must_use]
pub fn embed_payload(content: &StatusSummary) -> JsonValue {
    json!({
        "embeds": [{
            "title": content.title,
            "description": content.body,
            "url": content.link,
            "color": content.color,
            "footer": { "text": content.footer },
        }]
    })
}

/// Returns true if the snowflake is young enough for bulk delete at `now_ms`.
#[must_use]
pub fn bulk_deletable(message: &MessageId, now_ms: i64) -> bool {
    let Ok(raw) = message.as_str().parse::<u64>() else {
        return false;
    };
    let created_ms = (raw >> 22) + DISCORD_EPOCH_MS;
    let Ok(created_ms) = i64::try_from(created_ms) else {
        return false;
    };
    let max_age_ms = BULK_DELETE_MAX_AGE_DAYS * 24 * 60 * 60 * 1000;
    // Keep a minute of margin so a message never ages out between listing and deleting.
    now_ms - created_ms < max_age_ms - 60_000
}

async fn ensure_success(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(TransportError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, TransportError> {
    response.json::<T>().await.map_err(|e| TransportError::Decode {
        message: e.to_string(),
    })
}

#[async_trait]
impl ChatTransport for DiscordTransport {
    async fn fetch_guild(&self, guild: &GuildId) -> Result<Option<GuildInfo>, TransportError> {
        let request = self.client.get(self.url(&format!("/guilds/{guild}")));
        let payload: Option<GuildPayload> = self.lookup(request).await?;
        Ok(payload.map(|g| GuildInfo {
            id: GuildId::new(g.id),
            name: g.name,
        }))
    }

    async fn fetch_channel(&self, channel: &ChannelId) -> Result<Option<ChannelInfo>, TransportError> {
        let request = self.client.get(self.url(&format!("/channels/{channel}")));
        let payload: Option<ChannelPayload> = self.lookup(request).await?;
        Ok(payload.map(|c| ChannelInfo {
            id: ChannelId::new(c.id),
            text_based: TEXT_CHANNEL_TYPES.contains(&c.kind),
        }))
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        content: &StatusSummary,
    ) -> Result<MessageId, TransportError> {
        let request = self
            .client
            .post(self.url(&format!("/channels/{channel}/messages")))
            .json(&embed_payload(content));
        let response = ensure_success(self.send(request).await?).await?;
        let message: MessagePayload = decode(response).await?;
        Ok(MessageId::new(message.id))
    }

    async fn fetch_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<Option<PostedMessage>, TransportError> {
        let request = self
            .client
            .get(self.url(&format!("/channels/{channel}/messages/{message}")));
        let payload: Option<MessagePayload> = self.lookup(request).await?;
        Ok(payload.map(|m| PostedMessage {
            id: MessageId::new(m.id),
        }))
    }

    async fn edit_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        content: &StatusSummary,
    ) -> Result<(), TransportError> {
        let request = self
            .client
            .patch(self.url(&format!("/channels/{channel}/messages/{message}")))
            .json(&embed_payload(content));
        ensure_success(self.send(request).await?).await.map(|_| ())
    }

    async fn clear_channel_history(&self, channel: &ChannelId) -> Result<usize, TransportError> {
        let mut deleted = 0;
        for _ in 0..MAX_CLEAR_PAGES {
            let page = self.list_messages(channel).await?;
            if page.is_empty() {
                return Ok(deleted);
            }
            let page_len = page.len();

            let now_ms = Utc::now().timestamp_millis();
            let (recent, old): (Vec<_>, Vec<_>) =
                page.into_iter().partition(|m| bulk_deletable(m, now_ms));

            for chunk in recent.chunks(PAGE_SIZE) {
                self.bulk_delete(channel, chunk).await?;
                deleted += chunk.len();
            }
            for message in &old {
                self.delete_message(channel, message).await?;
                deleted += 1;
            }
            debug!(%channel, page_len, "deleted history page");

            if page_len < PAGE_SIZE {
                return Ok(deleted);
            }
        }

        warn!(%channel, deleted, "history clear stopped at page limit");
        Ok(deleted)
    }
}

/// Snowflake for a message created at `created` (for tests and tooling).
#[must_use]
pub fn snowflake_at<Tz: TimeZone>(created: &chrono::DateTime<Tz>) -> MessageId {
    let ms = u64::try_from(created.timestamp_millis()).unwrap_or(0);
    MessageId::new((ms.saturating_sub(DISCORD_EPOCH_MS) << 22).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Request line and body seen by the stub server.
    #[derive(Debug, Clone)]
    struct SeenRequest {
        head: String,
        body: String,
    }

    impl SeenRequest {
        fn line(&self) -> &str {
            self.head.lines().next().unwrap_or_default()
        }
    }

    /// Serves `responses` in order, one per connection, and records requests.
    async fn stub_api(responses: Vec<(u16, String)>) -> (String, Arc<Mutex<Vec<SeenRequest>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let request = read_request(&mut stream).await;
                log.lock().unwrap().push(request);
                let mut reply = format!("HTTP/1.1 {status} Stub\r\nConnection: close\r\n");
                if status != 204 {
                    reply.push_str(&format!(
                        "Content-Type: application/json\r\nContent-Length: {}\r\n",
                        body.len()
                    ));
                }
                reply.push_str("\r\n");
                reply.push_str(&body);
                let _ = stream.write_all(reply.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        (base, seen)
    }

    async fn read_request(stream: &mut TcpStream) -> SeenRequest {
        let mut raw = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            raw.extend_from_slice(&chunk[..n]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
        let length = head
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        while raw.len() < header_end + length {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);
        }
        SeenRequest {
            head,
            body: String::from_utf8_lossy(&raw[header_end..]).to_string(),
        }
    }

    #[tokio::test]
    async fn missing_message_is_none() {
        let (base, seen) = stub_api(vec![(404, r#"{"message":"Unknown Message","code":10008}"#.to_string())]).await;
        let transport = DiscordTransport::with_base("secret", base).unwrap();

        let found = transport
            .fetch_message(&ChannelId::new("1"), &MessageId::new("2"))
            .await
            .unwrap();

        assert!(found.is_none());
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].line(), "GET /channels/1/messages/2 HTTP/1.1");
        assert!(seen[0].head.to_ascii_lowercase().contains("authorization: bot secret"));
    }

    #[tokio::test]
    async fn existing_message_is_some() {
        let (base, _) = stub_api(vec![(200, r#"{"id":"2","content":""}"#.to_string())]).await;
        let transport = DiscordTransport::with_base("secret", base).unwrap();

        let found = transport
            .fetch_message(&ChannelId::new("1"), &MessageId::new("2"))
            .await
            .unwrap();
        assert_eq!(found.map(|m| m.id), Some(MessageId::new("2")));
    }

    #[tokio::test]
    async fn server_error_on_lookup_is_api_error() {
        let (base, _) = stub_api(vec![(500, r#"{"message":"boom"}"#.to_string())]).await;
        let transport = DiscordTransport::with_base("secret", base).unwrap();

        let err = transport
            .fetch_message(&ChannelId::new("1"), &MessageId::new("2"))
            .await
            .unwrap_err();
        match err {
            TransportError::Api { status, message } => {
                assert_eq!(status, 500);
                assert!(message.contains("boom"));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_posts_embed_and_returns_id() {
        let (base, seen) = stub_api(vec![(200, r#"{"id":"555"}"#.to_string())]).await;
        let transport = DiscordTransport::with_base("secret", base).unwrap();
        let summary = StatusSummary {
            title: "Core Monitor".to_string(),
            body: "🟢 | API".to_string(),
            link: String::new(),
            footer: String::new(),
            color: 0x0099FF,
        };

        let id = transport.send_message(&ChannelId::new("9"), &summary).await.unwrap();

        assert_eq!(id, MessageId::new("555"));
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].line(), "POST /channels/9/messages HTTP/1.1");
        let body: JsonValue = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body["embeds"][0]["title"], "Core Monitor");
    }

    #[tokio::test]
    async fn clear_pages_until_history_is_empty() {
        let first = snowflake_at(&(Utc::now() - ChronoDuration::hours(1)));
        let base_id: u64 = first.as_str().parse().unwrap();
        let page: Vec<JsonValue> = (0..100u64)
            .map(|i| json!({ "id": (base_id + i).to_string() }))
            .collect();
        let (base, seen) = stub_api(vec![
            (200, JsonValue::Array(page).to_string()),
            (204, String::new()),
            (200, "[]".to_string()),
        ])
        .await;
        let transport = DiscordTransport::with_base("secret", base).unwrap();

        let deleted = transport.clear_channel_history(&ChannelId::new("9")).await.unwrap();

        assert_eq!(deleted, 100);
        let seen = seen.lock().unwrap();
        let lines: Vec<_> = seen.iter().map(SeenRequest::line).collect();
        assert_eq!(
            lines,
            vec![
                "GET /channels/9/messages?limit=100 HTTP/1.1",
                "POST /channels/9/messages/bulk-delete HTTP/1.1",
                "GET /channels/9/messages?limit=100 HTTP/1.1",
            ]
        );
        let body: JsonValue = serde_json::from_str(&seen[1].body).unwrap();
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(100));
    }

    #[tokio::test]
    async fn clear_deletes_old_messages_one_by_one() {
        let old = snowflake_at(&(Utc::now() - ChronoDuration::days(30)));
        let (base, seen) = stub_api(vec![
            (200, json!([{ "id": old.as_str() }]).to_string()),
            (204, String::new()),
        ])
        .await;
        let transport = DiscordTransport::with_base("secret", base).unwrap();

        let deleted = transport.clear_channel_history(&ChannelId::new("9")).await.unwrap();

        // A short page ends the clear without another listing.
        assert_eq!(deleted, 1);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].line(), format!("DELETE /channels/9/messages/{old} HTTP/1.1"));
    }

    #[test]
    fn embed_carries_every_summary_field() {
        let summary = StatusSummary {
            title: "Core Monitor".to_string(),
            body: "🟢 | API".to_string(),
            link: "https://kuma.example/metrics".to_string(),
            footer: "Last updated: 1/2/2026, 3:04:05 PM".to_string(),
            color: 0x0099FF,
        };
        let payload = embed_payload(&summary);
        let embed = &payload["embeds"][0];
        assert_eq!(embed["title"], "Core Monitor");
        assert_eq!(embed["description"], "🟢 | API");
        assert_eq!(embed["url"], "https://kuma.example/metrics");
        assert_eq!(embed["color"], 0x0099FF);
        assert_eq!(embed["footer"]["text"], "Last updated: 1/2/2026, 3:04:05 PM");
    }

    #[test]
    fn bulk_delete_window() {
        let now = Utc::now();
        let fresh = snowflake_at(&(now - ChronoDuration::days(1)));
        let stale = snowflake_at(&(now - ChronoDuration::days(20)));
        assert!(bulk_deletable(&fresh, now.timestamp_millis()));
        assert!(!bulk_deletable(&stale, now.timestamp_millis()));
        assert!(!bulk_deletable(&MessageId::new("not-a-snowflake"), now.timestamp_millis()));
    }

    #[test]
    fn base_url_is_normalized() {
        let transport = DiscordTransport::with_base("t", "http://localhost:9999/api/").unwrap();
        assert_eq!(transport.url("/channels/1"), "http://localhost:9999/api/channels/1");
    }
}
