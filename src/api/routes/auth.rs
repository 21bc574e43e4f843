use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::dto::{api_error, internal_error, ApiError};
use crate::application::auth::{
    LoginError, LoginUser, LoginUserInput, RegisterError, RegisterUser, RegisterUserInput,
};
use crate::infrastructure::app_state::AppState;

/// Create auth router
pub fn create_auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
}

// ========== DTOs ==========

#[derive(Deserialize)]
pub struct RegisterRequest {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    success: bool,
    user: RegisterUserInfo,
    token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserInfo {
    id: String,
    username: String,
    created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    success: bool,
    user: LoginUserInfo,
    token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUserInfo {
    id: String,
    username: String,
    last_login_at: Option<String>,
}

// ========== Handlers ==========

fn missing_credentials() -> ApiError {
    api_error(
        StatusCode::BAD_REQUEST,
        "MISSING_CREDENTIALS",
        "Username and password are required",
    )
}

/// Convert timestamp to RFC3339 string
fn timestamp_to_rfc3339(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string())
}

async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let username = req.username.filter(|s| !s.is_empty()).ok_or_else(missing_credentials)?;

    let password = req.password.filter(|s| !s.is_empty()).ok_or_else(missing_credentials)?;

    let use_case = RegisterUser::new(state.user_repo.clone(), state.jwt_service.clone());

    let input = RegisterUserInput { username, password };

    match use_case.execute(input).await {
        Ok(output) => Ok((
            StatusCode::CREATED,
            Json(RegisterResponse {
                success: true,
                user: RegisterUserInfo {
                    id: output.user.id.clone(),
                    username: output.user.username.clone(),
                    created_at: timestamp_to_rfc3339(output.user.created_at),
                },
                token: output.token,
            }),
        )),
        Err(RegisterError::Validation(msg)) => {
            Err(api_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg))
        }
        Err(RegisterError::UsernameExists) => Err(api_error(
            StatusCode::CONFLICT,
            "USERNAME_EXISTS",
            "Username already exists",
        )),
        Err(e) => Err(internal_error("REGISTRATION_ERROR", "Registration failed", e)),
    }
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let username = req.username.filter(|s| !s.is_empty()).ok_or_else(missing_credentials)?;

    let password = req.password.filter(|s| !s.is_empty()).ok_or_else(missing_credentials)?;

    let use_case = LoginUser::new(state.user_repo.clone(), state.jwt_service.clone());

    let input = LoginUserInput { username, password };

    match use_case.execute(input).await {
        Ok(output) => Ok(Json(LoginResponse {
            success: true,
            user: LoginUserInfo {
                id: output.user.id.clone(),
                username: output.user.username.clone(),
                last_login_at: output.user.last_login_at.map(timestamp_to_rfc3339),
            },
            token: output.token,
        })),
        Err(LoginError::Validation(msg)) => {
            Err(api_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg))
        }
        Err(LoginError::InvalidCredentials) => Err(api_error(
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            "Invalid username or password",
        )),
        Err(e) => Err(internal_error("LOGIN_ERROR", "Login failed", e)),
    }
}
