//! Session tokens and the credential store.
//!
//! Accounts are matched by display name plus a numeric code. Codes are kept
//! only as bcrypt hashes in the document store; nothing compares them in
//! cleartext.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use quest_algo::Role;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::store::paths::account_key;
use crate::store::{StoreError, StoreProxy};

pub const SESSION_COOKIE_NAME: &str = "quest_session";
const MAX_CODE_LEN: usize = 12;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    Expired,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account already exists: {0}")]
    AccountExists(String),
    #[error("invalid account seed: {0}")]
    InvalidSeed(String),
    #[error("hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ==================== Accounts ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub user_id: String,
    pub display_name: String,
    pub role: Role,
}

impl Account {
    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAccount {
    user_id: String,
    display_name: String,
    role: Role,
    code_hash: String,
}

/// Entry of an `ACCOUNTS_FILE` (JSON array).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSeed {
    pub display_name: String,
    pub code: String,
    pub role: Role,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the account when `code` matches; `None` on any mismatch.
    async fn verify(&self, display_name: &str, code: &str) -> Result<Option<Account>, AuthError>;

    async fn register(&self, seed: AccountSeed) -> Result<Account, AuthError>;
}

pub struct DocumentCredentialStore {
    proxy: StoreProxy,
    bcrypt_cost: u32,
}

impl DocumentCredentialStore {
    pub fn new(proxy: StoreProxy, bcrypt_cost: u32) -> Self {
        Self { proxy, bcrypt_cost }
    }
}

pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty() && code.len() <= MAX_CODE_LEN && code.chars().all(|c| c.is_ascii_digit())
}

#[async_trait]
impl CredentialStore for DocumentCredentialStore {
    async fn verify(&self, display_name: &str, code: &str) -> Result<Option<Account>, AuthError> {
        if account_key(display_name).is_empty() || !is_valid_code(code) {
            return Ok(None);
        }

        let path = self.proxy.paths().account(display_name);
        let Some(stored) = self.proxy.read::<StoredAccount>(&path).await? else {
            return Ok(None);
        };

        if !bcrypt::verify(code, &stored.code_hash)? {
            return Ok(None);
        }

        Ok(Some(Account {
            user_id: stored.user_id,
            display_name: stored.display_name,
            role: stored.role,
        }))
    }

    async fn register(&self, seed: AccountSeed) -> Result<Account, AuthError> {
        let display_name = seed.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(AuthError::InvalidSeed("empty display name".to_string()));
        }
        if !is_valid_code(&seed.code) {
            return Err(AuthError::InvalidSeed(format!("code for {display_name} must be numeric")));
        }

        let path = self.proxy.paths().account(&display_name);
        if self.proxy.store().get(&path).await?.is_some() {
            return Err(AuthError::AccountExists(display_name));
        }

        let stored = StoredAccount {
            user_id: seed
                .user_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            display_name,
            role: seed.role,
            code_hash: bcrypt::hash(&seed.code, self.bcrypt_cost)?,
        };
        self.proxy.write(&path, &stored).await?;

        Ok(Account {
            user_id: stored.user_id,
            display_name: stored.display_name,
            role: stored.role,
        })
    }
}

pub async fn load_account_seeds(path: &Path) -> Result<Vec<AccountSeed>, AuthError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AuthError::InvalidSeed(format!("{}: {e}", path.display())))?;
    serde_json::from_slice(&bytes).map_err(|e| AuthError::InvalidSeed(format!("{}: {e}", path.display())))
}

/// Registers every seed whose display name is not taken yet.
pub async fn seed_accounts(credentials: &Arc<dyn CredentialStore>, seeds: Vec<AccountSeed>) -> usize {
    let mut created = 0;
    for seed in seeds {
        let name = seed.display_name.clone();
        match credentials.register(seed).await {
            Ok(account) => {
                created += 1;
                tracing::info!(user_id = %account.user_id, role = account.role.as_str(), "seeded account");
            }
            Err(AuthError::AccountExists(_)) => {
                tracing::debug!(display_name = %name, "account already present");
            }
            Err(err) => tracing::warn!(display_name = %name, error = %err, "failed to seed account"),
        }
    }
    created
}

pub fn demo_account_seeds() -> Vec<AccountSeed> {
    [
        ("선생님", "1234", Role::Teacher),
        ("김민지", "1111", Role::Student),
        ("이서준", "2222", Role::Student),
    ]
    .into_iter()
    .map(|(name, code, role)| AccountSeed {
        display_name: name.to_string(),
        code: code.to_string(),
        role,
        user_id: None,
    })
    .collect()
}

// ==================== Session tokens ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub sub: String,
    /// `None` for an anonymous session that has not logged in yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn account(&self) -> Option<Account> {
        Some(Account {
            user_id: self.sub.clone(),
            display_name: self.name.clone()?,
            role: self.role?,
        })
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// HS256 signer for session tokens.
pub struct SessionSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl SessionSigner {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            ttl,
        }
    }

    pub fn issue_anonymous(&self) -> Result<(String, SessionClaims), AuthError> {
        self.issue(uuid::Uuid::new_v4().to_string(), None, None)
    }

    pub fn issue_for(&self, account: &Account) -> Result<(String, SessionClaims), AuthError> {
        self.issue(
            account.user_id.clone(),
            Some(account.role),
            Some(account.display_name.clone()),
        )
    }

    fn issue(&self, sub: String, role: Option<Role>, name: Option<String>) -> Result<(String, SessionClaims), AuthError> {
        let issued_at = Utc::now();
        let claims = SessionClaims {
            sub,
            role,
            name,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        Ok((self.sign(&claims)?, claims))
    }

    fn sign(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        let header_json = serde_json::json!({ "alg": "HS256", "typ": "JWT" });
        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header_json).map_err(|_| AuthError::InvalidToken)?);
        let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).map_err(|_| AuthError::InvalidToken)?);
        let signing_input = format!("{header_b64}.{payload_b64}");

        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| AuthError::InvalidToken)?;
        mac.update(signing_input.as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{sig_b64}"))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
        let payload_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
        let sig_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
        if parts.next().is_some() {
            return Err(AuthError::InvalidToken);
        }

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64.as_bytes())
            .map_err(|_| AuthError::InvalidToken)?;
        let header_json: serde_json::Value =
            serde_json::from_slice(&header_bytes).map_err(|_| AuthError::InvalidToken)?;
        if header_json.get("alg").and_then(|v| v.as_str()) != Some("HS256") {
            return Err(AuthError::InvalidToken);
        }

        let sig_bytes = URL_SAFE_NO_PAD
            .decode(sig_b64.as_bytes())
            .map_err(|_| AuthError::InvalidToken)?;
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| AuthError::InvalidToken)?;
        mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
        mac.verify_slice(&sig_bytes).map_err(|_| AuthError::InvalidToken)?;

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload_b64.as_bytes())
            .map_err(|_| AuthError::InvalidToken)?;
        let claims: SessionClaims =
            serde_json::from_slice(&payload_bytes).map_err(|_| AuthError::InvalidToken)?;

        if Utc::now().timestamp() >= claims.exp {
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }
}

/// Bearer header first, then the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    bearer.or_else(|| get_cookie(headers, SESSION_COOKIE_NAME))
}

fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Fingerprint of a token for logs; never log the token itself.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}
