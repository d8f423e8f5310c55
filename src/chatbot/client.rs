//! Conversation model behind the storefront chat widget.
//!
//! A [`ChatSession`] owns the ordered list of turns and talks to
//! `POST /api/chatbot/chat` through a [`ChatTransport`]. Any failure, whether
//! transport-level or a `success: false` body, becomes one fixed apology turn.

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::dto::{ChatRequest, ChatResponse, ProductCard};

pub const GREETING: &str = "Hi! I'm QuickBite's AI food assistant 🤖\n\n\
I can help you:\n\
• Find food by name or category\n\
• Filter by price (under ₹100, ₹150, etc.)\n\
• Get personalized recommendations\n\
• Discover popular dishes\n\n\
What are you craving today?";

pub const APOLOGY: &str = "Oops! I'm having trouble connecting right now. Please try again! 😅";

pub const QUICK_REPLIES: [&str; 6] = [
    "🍕 Pizza",
    "💰 Under ₹100",
    "💵 Under ₹150",
    "💸 Under ₹200",
    "⭐ Popular items",
    "💡 Recommend me",
];

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat endpoint reported failure: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, message: &str) -> Result<ChatResponse, TransportError>;
}

pub struct HttpChatTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpChatTransport {
    pub fn new(server_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/api/chatbot/chat", server_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(&self, message: &str) -> Result<ChatResponse, TransportError> {
        let body = ChatRequest {
            message: Some(message.to_string()),
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatResponse>()
            .await?;
        Ok(resp)
    }
}

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub id: u64,
    pub text: String,
    pub is_bot: bool,
    pub products: Vec<ProductCard>,
    pub recommendations: Vec<ProductCard>,
    pub timestamp: OffsetDateTime,
}

pub struct ChatSession<T> {
    transport: T,
    turns: Vec<ChatTurn>,
    input: String,
    is_loading: bool,
    next_id: u64,
}

impl<T: ChatTransport> ChatSession<T> {
    pub fn new(transport: T) -> Self {
        let mut session = Self {
            transport,
            turns: Vec::new(),
            input: String::new(),
            is_loading: false,
            next_id: 1,
        };
        session.push(GREETING.to_string(), true, Vec::new(), Vec::new());
        session
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    fn push(
        &mut self,
        text: String,
        is_bot: bool,
        products: Vec<ProductCard>,
        recommendations: Vec<ProductCard>,
    ) -> &ChatTurn {
        let id = self.next_id;
        self.next_id += 1;
        self.turns.push(ChatTurn {
            id,
            text,
            is_bot,
            products,
            recommendations,
            timestamp: OffsetDateTime::now_utc(),
        });
        &self.turns[self.turns.len() - 1]
    }

    /// Moves the input into a user turn and marks the session busy.
    /// Returns `None` for blank input or while a request is in flight.
    pub fn begin_send(&mut self) -> Option<String> {
        if self.input.trim().is_empty() || self.is_loading {
            return None;
        }
        let text = std::mem::take(&mut self.input);
        self.push(text.clone(), false, Vec::new(), Vec::new());
        self.is_loading = true;
        Some(text)
    }

    /// Records the outcome of a request started by [`begin_send`](Self::begin_send).
    pub fn finish_send(&mut self, result: Result<ChatResponse, TransportError>) -> &ChatTurn {
        self.is_loading = false;
        let outcome = result.and_then(|resp| match (resp.success, resp.data) {
            (true, Some(reply)) => Ok(reply),
            (_, _) => Err(TransportError::Rejected(
                resp.message.unwrap_or_else(|| "response not successful".into()),
            )),
        });
        match outcome {
            Ok(reply) => {
                debug!(
                    products = reply.products.len(),
                    recommendations = reply.recommendations.len(),
                    "chat reply received"
                );
                self.push(reply.message, true, reply.products, reply.recommendations)
            }
            Err(e) => {
                warn!(error = %e, "chatbot error");
                self.push(APOLOGY.to_string(), true, Vec::new(), Vec::new())
            }
        }
    }

    /// Sends the current input. Returns the bot turn, or `None` if nothing was sent.
    pub async fn send(&mut self) -> Option<&ChatTurn> {
        let text = self.begin_send()?;
        let result = self.transport.send(&text).await;
        Some(self.finish_send(result))
    }

    /// Fills the input from a quick-reply label (minus its leading emoji) and sends it.
    pub async fn quick_reply(&mut self, label: &str) -> Option<&ChatTurn> {
        self.input = strip_leading_token(label).to_string();
        self.send().await
    }
}

fn strip_leading_token(label: &str) -> &str {
    match label.split_once(char::is_whitespace) {
        Some((_, rest)) => rest,
        None => label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::dto::ChatReply;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedTransport {
        sent: Mutex<Vec<String>>,
        reply: Option<ChatResponse>,
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send(&self, message: &str) -> Result<ChatResponse, TransportError> {
            self.sent.lock().unwrap().push(message.to_string());
            self.reply
                .clone()
                .ok_or_else(|| TransportError::Rejected("offline".into()))
        }
    }

    fn answering(text: &str) -> ScriptedTransport {
        ScriptedTransport {
            reply: Some(ChatResponse::ok(ChatReply {
                message: text.into(),
                ..Default::default()
            })),
            ..Default::default()
        }
    }

    #[test]
    fn session_starts_with_greeting() {
        let session = ChatSession::new(ScriptedTransport::default());
        assert_eq!(session.turns().len(), 1);
        assert!(session.turns()[0].is_bot);
        assert_eq!(session.turns()[0].text, GREETING);
    }

    #[tokio::test]
    async fn successful_send_appends_user_and_bot_turns() {
        let mut session = ChatSession::new(answering("Found 2 item(s)"));
        session.set_input("pizza");
        let bot = session.send().await.expect("sent").clone();
        assert_eq!(bot.text, "Found 2 item(s)");

        let turns = session.turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].text, "pizza");
        assert!(!turns[1].is_bot);
        assert!(turns[1].id < turns[2].id);
        assert_eq!(session.input(), "");
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn failures_become_the_apology_turn() {
        let mut session = ChatSession::new(ScriptedTransport::default());
        session.set_input("pizza");
        assert_eq!(session.send().await.unwrap().text, APOLOGY);

        let rejected = ScriptedTransport {
            reply: Some(ChatResponse::failed("Message is required")),
            ..Default::default()
        };
        let mut session = ChatSession::new(rejected);
        session.set_input("pizza");
        assert_eq!(session.send().await.unwrap().text, APOLOGY);
    }

    #[tokio::test]
    async fn blank_input_is_not_sent() {
        let mut session = ChatSession::new(answering("x"));
        session.set_input("   ");
        assert!(session.send().await.is_none());
        assert_eq!(session.turns().len(), 1);
    }

    #[test]
    fn second_send_is_refused_while_loading() {
        let mut session = ChatSession::new(answering("x"));
        session.set_input("pizza");
        assert_eq!(session.begin_send().as_deref(), Some("pizza"));
        session.set_input("burger");
        assert!(session.begin_send().is_none());
        assert!(session.is_loading());

        session.finish_send(Err(TransportError::Rejected("down".into())));
        assert!(!session.is_loading());
        assert_eq!(session.begin_send().as_deref(), Some("burger"));
    }

    #[tokio::test]
    async fn quick_reply_strips_emoji_and_submits() {
        let transport = answering("ok");
        let mut session = ChatSession::new(transport);
        session.quick_reply(QUICK_REPLIES[1]).await.unwrap();
        assert_eq!(session.turns()[1].text, "Under ₹100");
        assert_eq!(
            session.transport.sent.lock().unwrap().as_slice(),
            ["Under ₹100".to_string()]
        );
    }

    #[test]
    fn endpoint_is_under_api_prefix() {
        let t = HttpChatTransport::new("http://localhost:8080/");
        assert_eq!(t.endpoint, "http://localhost:8080/api/chatbot/chat");
    }
}
