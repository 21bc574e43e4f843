use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::{Deserialize, Serialize};

use crate::api::dto::{api_error, internal_error, ApiError};
use crate::api::middleware::Claims;
use crate::api::AppState;
use crate::application::chat::{
    ChatroomAccessError, GetChatroom, GetChatroomInput, ListMessages, ListMessagesError,
    ListMessagesInput, ListMyChatrooms, PostMessage, PostMessageError, PostMessageInput,
};
use crate::domain::entities::{ChatMessage, Chatroom};
use crate::infrastructure::services::LobbyEvent;

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub before: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct ChatroomsResponse {
    pub success: bool,
    pub chatrooms: Vec<Chatroom>,
}

#[derive(Debug, Serialize)]
pub struct ChatroomResponse {
    pub success: bool,
    pub chatroom: Chatroom,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub success: bool,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: ChatMessage,
}

fn access_error(e: ChatroomAccessError) -> ApiError {
    match e {
        ChatroomAccessError::ChatroomNotFound => {
            api_error(StatusCode::NOT_FOUND, "CHATROOM_NOT_FOUND", "Chatroom not found")
        }
        ChatroomAccessError::NotMember => api_error(
            StatusCode::FORBIDDEN,
            "NOT_IN_CHATROOM",
            "Not a member of this chatroom",
        ),
        ChatroomAccessError::Repository(e) => {
            internal_error("CHATROOM_ERROR", "Failed to load chatroom", e)
        }
    }
}

/// GET /api/chatrooms - Chatrooms of the current user, newest first
pub async fn list_my_chatrooms(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ChatroomsResponse>, ApiError> {
    let chatrooms = ListMyChatrooms::new(state.chatroom_repo.clone())
        .execute(&claims.user_id)
        .await
        .map_err(|e| internal_error("GET_CHATROOMS_ERROR", "Failed to get chatrooms", e))?;

    Ok(Json(ChatroomsResponse {
        success: true,
        chatrooms,
    }))
}

/// GET /api/chatrooms/:chatroomId
pub async fn get_chatroom(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(chatroom_id): Path<String>,
) -> Result<Json<ChatroomResponse>, ApiError> {
    let chatroom = GetChatroom::new(state.chatroom_repo.clone())
        .execute(GetChatroomInput {
            chatroom_id,
            user_id: claims.user_id,
        })
        .await
        .map_err(access_error)?;

    Ok(Json(ChatroomResponse {
        success: true,
        chatroom,
    }))
}

/// GET /api/chatrooms/:chatroomId/messages?before=<messageId>&limit=
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(chatroom_id): Path<String>,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = ListMessages::new(state.chatroom_repo.clone())
        .execute(ListMessagesInput {
            chatroom_id,
            user_id: claims.user_id,
            before: query.before,
            limit: query.limit,
        })
        .await
        .map_err(|e| match e {
            ListMessagesError::Access(e) => access_error(e),
            ListMessagesError::Repository(e) => {
                internal_error("GET_MESSAGES_ERROR", "Failed to get messages", e)
            }
        })?;

    Ok(Json(MessagesResponse {
        success: true,
        messages,
    }))
}

/// POST /api/chatrooms/:chatroomId/messages
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(chatroom_id): Path<String>,
    Json(body): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let result = PostMessage::new(state.chatroom_repo.clone())
        .execute(PostMessageInput {
            chatroom_id,
            user_id: claims.user_id.clone(),
            body: body.body,
        })
        .await
        .map_err(|e| match e {
            PostMessageError::Validation(msg) => {
                api_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
            }
            PostMessageError::Access(e) => access_error(e),
            PostMessageError::Repository(e) => {
                internal_error("POST_MESSAGE_ERROR", "Failed to post message", e)
            }
        })?;

    state.broadcast_event(
        LobbyEvent::new("chatMessage")
            .with_user(&claims.user_id)
            .with_data(serde_json::json!({
                "chatroomId": result.chatroom.id,
                "messageId": result.message.id,
                "username": claims.username,
                "body": result.message.body,
            }))
            .with_audience(result.chatroom.member_ids.clone()),
    );

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            success: true,
            message: result.message,
        }),
    ))
}
