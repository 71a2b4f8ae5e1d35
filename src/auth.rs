use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm as ArgonAlgorithm, Argon2, Params, Version};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{Claims, Credential, IssuedToken};
use crate::store::CredentialStore;

// Argon2id cost: ~19 MiB, 2 passes, 1 lane
const ARGON2_MEMORY_KIB: u32 = 19_456;
const ARGON2_ITERATIONS: u32 = 2;
const ARGON2_LANES: u32 = 1;

pub const MIN_PASSWORD_LEN: usize = 6;

fn hasher() -> Result<Argon2<'static>, AppError> {
    let params = Params::new(ARGON2_MEMORY_KIB, ARGON2_ITERATIONS, ARGON2_LANES, None)
        .map_err(|e| AppError::Configuration(format!("argon2 params: {e}")))?;
    Ok(Argon2::new(ArgonAlgorithm::Argon2id, Version::V0x13, params))
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Configuration(format!("salt encoding: {e}")))?;
    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Configuration(format!("password hashing: {e}")))?;
    Ok(hash.to_string())
}

/// Checks `password` against a PHC hash string. Unparseable hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    let Ok(argon2) = hasher() else {
        return false;
    };
    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

fn require_secret(secret: &str) -> Result<&[u8], AppError> {
    if secret.is_empty() {
        return Err(AppError::Configuration(
            "token signing secret is not set".to_string(),
        ));
    }
    Ok(secret.as_bytes())
}

pub fn issue_token(subject: &str, secret: &str, ttl: Duration) -> Result<IssuedToken, AppError> {
    issue_token_at(subject, secret, ttl, OffsetDateTime::now_utc())
}

/// Signs `{sub, iat, exp}` with HS256, where `exp = now + ttl`.
pub fn issue_token_at(
    subject: &str,
    secret: &str,
    ttl: Duration,
    now: OffsetDateTime,
) -> Result<IssuedToken, AppError> {
    let key = EncodingKey::from_secret(require_secret(secret)?);
    // exp carries whole seconds, so the advertised expiry must too
    let expires_at = now + ttl;
    let expires_at = expires_at - Duration::nanoseconds(i64::from(expires_at.nanosecond()));
    let claims = Claims {
        sub: subject.to_string(),
        iat: now.unix_timestamp(),
        exp: expires_at.unix_timestamp(),
    };
    let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
        .map_err(|e| AppError::Configuration(format!("token signing: {e}")))?;

    Ok(IssuedToken {
        token,
        subject: claims.sub,
        expires_at,
    })
}

pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    validate_token_at(token, secret, OffsetDateTime::now_utc())
}

/// Accepts a token only if the signature matches `secret` and `exp` is
/// strictly after `now`.
pub fn validate_token_at(
    token: &str,
    secret: &str,
    now: OffsetDateTime,
) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(require_secret(secret)?);

    // expiry is checked below against `now`, with no leeway
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let claims = jsonwebtoken::decode::<Claims>(token, &key, &validation)
        .map_err(|_| AppError::Unauthorized)?
        .claims;

    if claims.exp <= now.unix_timestamp() {
        return Err(AppError::Unauthorized);
    }
    Ok(claims)
}

/// Registration, login and token checks over a credential store.
pub struct Authenticator {
    credentials: Arc<dyn CredentialStore>,
    secret: String,
    ttl: Duration,
    // verified against when the username is unknown, so both failures cost the same
    dummy_hash: String,
}

impl Authenticator {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        secret: impl Into<String>,
        ttl: Duration,
    ) -> Result<Self, AppError> {
        Ok(Authenticator {
            credentials,
            secret: secret.into(),
            ttl,
            dummy_hash: hash_password("not-a-real-password")?,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn register(&self, username: &str, password: &str) -> Result<Credential, AppError> {
        if username.trim().is_empty() {
            return Err(AppError::BadRequest("Username cannot be empty"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest("Password is too short"));
        }
        if self.credentials.find_credential(username)?.is_some() {
            return Err(AppError::Conflict("Username already exists"));
        }

        let hash = hash_password(password)?;
        let credential = self.credentials.insert_credential(username, &hash)?;
        info!(id = credential.id, username = %credential.username, "Registered user");
        Ok(credential)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AppError> {
        let verified = match self.credentials.find_credential(username)? {
            Some(credential) => verify_password(password, &credential.password_hash),
            None => {
                let _ = verify_password(password, &self.dummy_hash);
                false
            }
        };

        if !verified {
            warn!("Rejected login attempt");
            return Err(AppError::Unauthorized);
        }

        let token = issue_token(username, &self.secret, self.ttl)?;
        info!("User logged in");
        Ok(token)
    }

    pub fn authenticate(&self, token: &str) -> Result<Claims, AppError> {
        validate_token(token, &self.secret)
    }
}
