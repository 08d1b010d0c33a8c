use crate::error::{ApiError, ApiResult};
use crate::server::CopilotServer;
use crate::validation::RequestValidation;
use crate::{validate_email, validate_length, validate_required};
use axum::{extract::State, Json};
use database_layer::{NewUser, User};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const MIN_PASSWORD_CHARS: usize = 8;
const MAX_PASSWORD_CHARS: usize = 128;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

impl RequestValidation for RegisterRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.email, "Email is required");
        validate_email!(self.email, "Invalid email format");
        validate_required!(self.password, "Password is required");
        validate_length!(
            self.password,
            MIN_PASSWORD_CHARS,
            MAX_PASSWORD_CHARS,
            "Password must be between 8 and 128 characters"
        );
        validate_required!(self.name, "Name is required");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RequestValidation for LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.email, "Email is required");
        validate_required!(self.password, "Password is required");
        Ok(())
    }
}

/// Account fields safe to return to the client
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: i32,
    pub email: String,
    pub name: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register(
    State(server): State<CopilotServer>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    request.validate()?;

    let password_hash = server.passwords.hash_password(&request.password).await?;
    let new_user = NewUser {
        email: normalize_email(&request.email),
        password_hash,
        name: request.name.trim().to_string(),
    };

    let user = match server.users.create_user(&new_user).await {
        Ok(user) => user,
        Err(e) if e.is_unique_violation() => {
            return Err(ApiError::bad_request("Email already exists"));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, "User registered");
    Ok(Json(RegisterResponse {
        message: "Registered",
        user: user.into(),
    }))
}

pub async fn login(
    State(server): State<CopilotServer>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    request.validate()?;

    let email = normalize_email(&request.email);
    let Some(user) = server.users.find_by_email(&email).await? else {
        warn!(email = %logger_redacted::fingerprint(&email), "Login for unknown account");
        return Err(ApiError::authentication("Invalid credentials"));
    };

    if !server
        .passwords
        .verify_password(&request.password, &user.password_hash)
        .await?
    {
        warn!(user_id = user.id, "Login with wrong password");
        return Err(ApiError::authentication("Invalid credentials"));
    }

    let token = server
        .tokens
        .issue(&user)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    info!(user_id = user.id, "User logged in");
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}
