use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};

use market_db::Database;
use market_types::api::{Claims, LoginRequest, LoginResponse};

use crate::blocking;
use crate::credentials::CredentialScheme;
use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;

/// Same answer for an unknown phone and a wrong password.
const BAD_CREDENTIALS: &str = "Invalid phone number or password";

pub type AppState = Arc<AppStateInner>;

/// Built once at startup and shared read-only by every handler.
pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenIssuer,
    pub credentials: Box<dyn CredentialScheme>,
}

/// Signs and checks HS256 bearer tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: chrono::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: i64) -> anyhow::Result<String> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp() as usize,
            nbf: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
        };

        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf"]);

        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

/// POST /login: phone + password in, `{ id, token }` out.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = blocking(&state, move |state| {
        let Some(credential) = state.db.get_credential_by_phone(&req.phone)? else {
            warn!("Login rejected: unknown phone number");
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
        };

        if !state.credentials.verify(&credential.password, &req.password) {
            warn!("Login rejected for user {}: password mismatch", credential.id);
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
        }

        let token = state.tokens.issue(credential.id)?;
        info!("User {} logged in", credential.id);
        Ok(LoginResponse {
            id: credential.id,
            token,
        })
    })
    .await?;

    Ok(Json(response))
}
