// Authentication: password hashing, JWT tokens, and the bearer-token
// extractor that turns a request into an Actor.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::{self, Database};
use crate::error::{ApiError, ApiResult};

// ── Roles and actors ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Parse the DB/claims representation ("ADMIN"/"USER").
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Self::Admin),
            "USER" => Some(Self::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }
}

/// The authenticated principal behind an operation. Built from verified
/// token claims; the core trusts this resolution completely.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// ── JWT ──────────────────────────────────────────────────────────────

/// JWT secret – in production this should come from an env var.
fn jwt_secret() -> Vec<u8> {
    std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "groupstage-dev-secret-change-in-production".to_string())
        .into_bytes()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64, // user id
    pub username: String,
    pub role: String,
    pub exp: usize, // expiry (unix timestamp)
}

pub fn create_token(user_id: i64, username: &str, role: &str) -> Result<String, String> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(24))
        .expect("valid timestamp")
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role: role.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(&jwt_secret()),
    )
    .map_err(|e| format!("Failed to create token: {e}"))
}

pub fn verify_token(token: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(&jwt_secret()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {e}"))
}

// ── Password hashing ─────────────────────────────────────────────────

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| format!("Failed to hash password: {e}"))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| format!("Invalid password hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

// ── Axum extractor: AuthUser ─────────────────────────────────────────

/// Extracts the authenticated user from the Authorization header.
/// Usage: `AuthUser(claims)` in handler parameters.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// The claims as an Actor for the lifecycle managers.
    pub fn actor(&self) -> ApiResult<Actor> {
        let role = Role::from_str_name(&self.0.role)
            .ok_or_else(|| ApiError::Validation(format!("Unknown role: {}", self.0.role)))?;
        Ok(Actor {
            id: self.0.sub,
            username: self.0.username.clone(),
            role,
        })
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({"error": "Missing Authorization header"})),
                )
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Invalid Authorization header format"})),
            )
        })?;

        match verify_token(token) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(_) => Err((
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Invalid token"})),
            )),
        }
    }
}

// ── Auth API handlers ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// "ADMIN" or "USER"; defaults to USER.
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserPublic,
}

#[derive(Serialize)]
pub struct UserPublic {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub active: bool,
    pub created_at: String,
}

impl From<db::User> for UserPublic {
    fn from(user: db::User) -> Self {
        UserPublic {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            active: user.active,
            created_at: user.created_at,
        }
    }
}

pub async fn register(
    State(db): State<Arc<Database>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.is_empty() || req.password.is_empty() || req.email.is_empty() {
        return Err(ApiError::Validation(
            "username, email, and password are required".to_string(),
        ));
    }
    if req.username.len() < 3 || req.username.len() > 30 {
        return Err(ApiError::Validation(
            "username must be 3-30 characters".to_string(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let role = match req.role.as_deref() {
        None => Role::User,
        Some(s) => Role::from_str_name(s)
            .ok_or_else(|| ApiError::Validation(format!("Unknown role: {s}")))?,
    };

    if db.get_user_by_username(&req.username).await?.is_some() {
        return Err(ApiError::DuplicateName("Username already exists"));
    }
    if db.get_user_by_email(&req.email).await?.is_some() {
        return Err(ApiError::DuplicateName("Email already exists"));
    }

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!("Password hash error: {e}");
        ApiError::Internal
    })?;

    let user = match db
        .create_user(&req.username, &req.email, &password_hash, role.as_str())
        .await
    {
        Ok(user) => user,
        // Backstop for a register race on the same name/email
        Err(e) if e.to_string().contains("UNIQUE") => {
            return Err(ApiError::DuplicateName("Username or email already taken"));
        }
        Err(e) => return Err(e.into()),
    };

    let token = create_token(user.id, &user.username, &user.role).map_err(|e| {
        tracing::error!("Token creation error: {e}");
        ApiError::Internal
    })?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

pub async fn login(
    State(db): State<Arc<Database>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Unknown user, wrong password, and deactivated account all answer
    // the same way.
    let user = db
        .get_user_by_username(&req.username)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !user.active {
        return Err(ApiError::InvalidCredentials);
    }

    match verify_password(&req.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return Err(ApiError::InvalidCredentials),
        Err(e) => {
            tracing::error!("Password verify error: {e}");
            return Err(ApiError::Internal);
        }
    }

    let token = create_token(user.id, &user.username, &user.role).map_err(|e| {
        tracing::error!("Token creation error: {e}");
        ApiError::Internal
    })?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

pub async fn me(
    AuthUser(claims): AuthUser,
    State(db): State<Arc<Database>>,
) -> Result<impl IntoResponse, ApiError> {
    let user = db
        .get_user(claims.sub)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(UserPublic::from(user)))
}
