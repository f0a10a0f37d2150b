//! Wallet-signed sessions.
//!
//! A player id is derived from the wallet that signed the session message, so
//! a token can only ever speak for the wallet that asked for it.

use std::sync::Arc;

use alloy::{
    primitives::{Address, eip191_hash_message},
    signers::Signature,
};
use axum::{
    Json, RequestPartsExt as _,
    extract::{FromRequestParts, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::IntoResponse,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::AppState;

const SESSION_LIFETIME_HOURS: i64 = 24;

/// How far `issued_at` may drift from the server clock, in seconds.
const SIGNATURE_WINDOW_SECS: u64 = 300;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("invalid or missing token")]
    InvalidToken,

    #[error("could not verify signature")]
    InvalidSignature,

    #[error("session signature is too old or from the future")]
    StaleSignature,

    #[error("not allowed for this session")]
    Forbidden,

    #[error("failed to issue token: {0}")]
    Encode(jsonwebtoken::errors::Error),
}

impl IntoResponse for SessionError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            SessionError::InvalidToken
            | SessionError::InvalidSignature
            | SessionError::StaleSignature => StatusCode::UNAUTHORIZED,
            SessionError::Forbidden => StatusCode::FORBIDDEN,
            SessionError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

pub struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthBody {
    pub access_token: String,
    pub token_type: String,
}

impl AuthBody {
    #[must_use]
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub wallet: Address,
    /// Unix seconds at which the message was signed
    pub issued_at: i64,
    pub signature: Signature,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub player_id: String,
    pub wallet: Address,
    #[serde(default)]
    pub admin: bool,
    pub exp: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub player_id: String,
    pub wallet: Address,
    pub admin: bool,
}

/// The message a wallet signs (EIP-191) to open a session.
#[must_use]
pub fn session_message(wallet: Address, issued_at: i64) -> String {
    format!("pokerd-view session for {wallet} issued at {issued_at}")
}

/// Player id owned by `wallet`: the low 64 bits of the address.
#[must_use]
pub fn player_id_for(wallet: &Address) -> u64 {
    let mut low = [0u8; 8];
    low.copy_from_slice(&wallet.as_slice()[12..]);
    u64::from_be_bytes(low)
}

impl Claims {
    /// Reject unless this session owns `player_id`.
    pub fn ensure_player(&self, player_id: u64) -> Result<(), SessionError> {
        if self.player_id == player_id.to_string() {
            Ok(())
        } else {
            Err(SessionError::Forbidden)
        }
    }
}

impl FromRequestParts<Arc<AppState>> for Claims {
    type Rejection = SessionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| SessionError::InvalidToken)?;
        let token_data =
            decode::<Claims>(bearer.token(), &state.keys.decoding, &Validation::default())
                .map_err(|_| SessionError::InvalidToken)?;
        Ok(token_data.claims)
    }
}

/// A session whose wallet is on the configured admin list.
#[derive(Debug, Clone)]
pub struct Admin(pub Claims);

impl FromRequestParts<Arc<AppState>> for Admin {
    type Rejection = SessionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let claims = Claims::from_request_parts(parts, state).await?;
        if !claims.admin {
            return Err(SessionError::Forbidden);
        }
        Ok(Admin(claims))
    }
}

/// Who is looking at the table. Anonymous viewers have an empty id and see
/// every hole card hidden.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    pub player_id: String,
}

impl FromRequestParts<Arc<AppState>> for Viewer {
    type Rejection = SessionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(Viewer::default());
        }
        let claims = Claims::from_request_parts(parts, state).await?;
        Ok(Viewer {
            player_id: claims.player_id,
        })
    }
}

pub async fn authorize(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<AuthBody>, SessionError> {
    let now = Utc::now();
    if now.timestamp().abs_diff(payload.issued_at) > SIGNATURE_WINDOW_SECS {
        return Err(SessionError::StaleSignature);
    }
    let prehash = eip191_hash_message(session_message(payload.wallet, payload.issued_at));
    match payload.signature.recover_address_from_prehash(&prehash) {
        Ok(signer) if signer == payload.wallet => {}
        _ => return Err(SessionError::InvalidSignature),
    }

    let wallet = payload.wallet;
    let exp = now + Duration::hours(SESSION_LIFETIME_HOURS);
    let claims = Claims {
        player_id: player_id_for(&wallet).to_string(),
        wallet,
        admin: state.admins.contains(&wallet),
        exp: u64::try_from(exp.timestamp()).unwrap_or_default(),
    };
    let token =
        encode(&Header::default(), &claims, &state.keys.encoding).map_err(SessionError::Encode)?;
    debug!(player_id = %claims.player_id, %wallet, admin = claims.admin, "session opened");
    Ok(Json(AuthBody::new(token)))
}

pub async fn whoami(claims: Claims) -> Json<SessionInfo> {
    Json(SessionInfo {
        player_id: claims.player_id,
        wallet: claims.wallet,
        admin: claims.admin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_id_is_the_low_address_bits() {
        let wallet: Address = "0x00000000000000000000000000000000000001ff".parse().unwrap();
        assert_eq!(player_id_for(&wallet), 511);
        let wallet: Address = "0xffffffffffffffffffffffff0000000000000001".parse().unwrap();
        assert_eq!(player_id_for(&wallet), 1);
    }

    #[test]
    fn claims_only_cover_their_own_player() {
        let claims = Claims {
            player_id: "7".to_string(),
            wallet: Address::ZERO,
            admin: false,
            exp: 0,
        };
        assert!(claims.ensure_player(7).is_ok());
        assert!(matches!(claims.ensure_player(8), Err(SessionError::Forbidden)));
    }

    #[test]
    fn message_names_wallet_and_time() {
        assert_eq!(
            session_message(Address::ZERO, 1_700_000_000),
            "pokerd-view session for 0x0000000000000000000000000000000000000000 issued at 1700000000"
        );
    }
}
