use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::auth::{AuthConfig, AuthError, AuthResult, TokenError};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AccessTokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct SignedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies HS256 access tokens with a secret fixed at startup.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_ttl: Duration,
}

impl JwtService {
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        if config.jwt_secret.is_empty() {
            return Err(AuthError::Config("jwt secret must not be empty".into()));
        }
        if config.access_token_ttl_secs <= 0 {
            return Err(AuthError::Config(
                "access token lifetime must be positive".into(),
            ));
        }

        let secret_bytes = config.jwt_secret.as_bytes();
        let encoding_key = EncodingKey::from_secret(secret_bytes);
        let decoding_key = DecodingKey::from_secret(secret_bytes);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.leeway = 0;

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            access_token_ttl: Duration::seconds(config.access_token_ttl_secs),
        })
    }

    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    pub fn issue_access_token(&self, username: &str) -> AuthResult<SignedAccessToken> {
        self.issue_access_token_at(username, Utc::now())
    }

    pub fn issue_access_token_at(
        &self,
        username: &str,
        issued_at: DateTime<Utc>,
    ) -> AuthResult<SignedAccessToken> {
        let expires_at = issued_at + self.access_token_ttl;
        let claims = AccessTokenClaims {
            sub: Some(username.to_string()),
            iat: Some(issued_at.timestamp()),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(SignedAccessToken { token, expires_at })
    }

    /// Signature is checked before any claim is looked at; `exp` is checked
    /// against the current time afterwards.
    pub fn decode_access_token(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| classify(&err))?;
        Ok(token_data.claims)
    }

    /// Returns the username the token was issued to.
    pub fn verify_access_token(&self, token: &str) -> Result<String, TokenError> {
        let claims = self.decode_access_token(token)?;
        claims
            .sub
            .filter(|sub| !sub.trim().is_empty())
            .ok_or(TokenError::MissingSubject)
    }
}

fn classify(err: &jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::BadSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}
