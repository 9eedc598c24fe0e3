use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use parlor_core::AccountId;
use pasetors::{
    claims::{Claims, ClaimsValidationRules},
    keys::SymmetricKey,
    local,
    token::UntrustedToken,
    version4::V4,
    Local,
};

use super::{
    core::{AppState, ACCESS_TOKEN_TTL_SECS},
    errors::ApiFailure,
};

/// The identity the external auth service vouched for via the bearer
/// token. `developer` carries the platform-moderation override.
#[derive(Debug, Clone)]
pub(crate) struct AuthContext {
    pub(crate) account_id: AccountId,
    pub(crate) developer: bool,
}

/// Mint an access token for an account. Token issuance belongs to the
/// external auth collaborator; this is its seam, exercised by tests.
pub(crate) fn issue_access_token(
    key: &SymmetricKey<V4>,
    account_id: AccountId,
    developer: bool,
) -> anyhow::Result<String> {
    let mut claims = Claims::new_expires_in(&Duration::from_secs(ACCESS_TOKEN_TTL_SECS as u64))
        .map_err(|e| anyhow!("claims init failed: {e}"))?;
    claims
        .subject(&account_id.to_string())
        .map_err(|e| anyhow!("claim sub failed: {e}"))?;
    claims
        .add_additional("developer", developer)
        .map_err(|e| anyhow!("claim developer failed: {e}"))?;

    local::encrypt(key, &claims, None, None).map_err(|e| anyhow!("access token mint failed: {e}"))
}

fn verify_access_token(key: &SymmetricKey<V4>, token: &str) -> anyhow::Result<Claims> {
    let untrusted = UntrustedToken::<Local, V4>::try_from(token).map_err(|e| anyhow!("{e}"))?;
    let validation_rules = ClaimsValidationRules::new();
    let trusted = local::decrypt(key, &untrusted, &validation_rules, None, None)
        .map_err(|e| anyhow!("token decrypt failed: {e}"))?;
    trusted
        .payload_claims()
        .cloned()
        .ok_or_else(|| anyhow!("token claims missing"))
}

pub(crate) fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, ApiFailure> {
    let access_token = bearer_token(headers).ok_or(ApiFailure::Unauthorized)?;
    authenticate_with_token(state, access_token)
}

/// Absent credentials are fine for public read paths; present-but-invalid
/// credentials are not.
pub(crate) fn optional_authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<AuthContext>, ApiFailure> {
    match bearer_token(headers) {
        None => Ok(None),
        Some(token) => authenticate_with_token(state, token).map(Some),
    }
}

fn authenticate_with_token(state: &AppState, token: &str) -> Result<AuthContext, ApiFailure> {
    let claims =
        verify_access_token(&state.token_key, token).map_err(|_| ApiFailure::Unauthorized)?;
    let subject = claims
        .get_claim("sub")
        .and_then(serde_json::Value::as_str)
        .ok_or(ApiFailure::Unauthorized)?;
    let account_id =
        AccountId::try_from(subject.to_owned()).map_err(|_| ApiFailure::Unauthorized)?;
    let developer = claims
        .get_claim("developer")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    Ok(AuthContext {
        account_id,
        developer,
    })
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    header.strip_prefix("Bearer ")
}

pub(crate) fn now_unix() -> i64 {
    let now = SystemTime::now();
    let seconds = now
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs();
    i64::try_from(seconds).unwrap_or(i64::MAX)
}
