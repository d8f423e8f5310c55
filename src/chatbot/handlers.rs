use axum::{
    async_trait,
    extract::{FromRequest, Request, State},
    routing::post,
    Json, Router,
};
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::{
    dto::{ChatRequest, ChatResponse},
    services::{ChatError, ChatService},
};
use crate::state::AppState;

pub fn chat_routes() -> Router<AppState> {
    Router::new().route("/chatbot/chat", post(chat))
}

/// `Json` whose rejection answers in the chat envelope.
pub struct ChatJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ChatJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ChatError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[instrument(skip(service, payload))]
pub async fn chat(
    State(service): State<ChatService>,
    ChatJson(payload): ChatJson<ChatRequest>,
) -> Result<Json<ChatResponse>, ChatError> {
    let message = payload.message.unwrap_or_default();
    let reply = service.reply(&message).await?;
    Ok(Json(ChatResponse::ok(reply)))
}
