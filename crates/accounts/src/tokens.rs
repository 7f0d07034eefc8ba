use chrono::{DateTime, Duration, Utc};
use hana_models::{HanaError, TokenClaims};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

/// Issues and checks HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: u64) -> Result<Self, HanaError> {
        if secret.is_empty() {
            return Err(HanaError::Config {
                reason: "JWT secret cannot be empty".to_string(),
            });
        }
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .filter(|ttl| *ttl > Duration::zero())
            .ok_or_else(|| HanaError::Config {
                reason: format!("Invalid token TTL: {ttl_secs}s"),
            })?;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, sub: &str) -> Result<String, HanaError> {
        self.issue_at(sub, Utc::now())
    }

    fn issue_at(&self, sub: &str, now: DateTime<Utc>) -> Result<String, HanaError> {
        let claims = TokenClaims {
            sub: sub.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| HanaError::TokenIssue { reason: e.to_string() })
    }

    /// Any decoding, signature or expiry failure collapses into `InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, HanaError> {
        let data = decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|_| HanaError::InvalidToken)?;
        if data.claims.sub.is_empty() {
            return Err(HanaError::InvalidToken);
        }
        Ok(data.claims)
    }
}
