use std::sync::Arc;

use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use referee_core::Engine;
use referee_types::api::Claims;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub engine: Engine,
    pub jwt_secret: String,
}

/// Sign a bearer token in the format `require_auth` accepts. Accounts and
/// sign-in live in an external service; this exists for that service's
/// shared-secret setup and for tests.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    username: &str,
    role: &str,
    ttl: chrono::Duration,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role: role.to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
