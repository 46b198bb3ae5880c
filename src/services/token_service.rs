use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;

/// Identity extracted from a verified session token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthClaims {
    pub user_id: String,
}

#[derive(Debug)]
pub enum VerifyError {
    /// Signature or expiry verification failed.
    Invalid(String),
    /// Token verified but carries no usable identity claim.
    MissingClaim(&'static str),
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyError::Invalid(e) => write!(f, "Token verification failed: {}", e),
            VerifyError::MissingClaim(claim) => write!(f, "Token missing '{}' claim", claim),
        }
    }
}

impl std::error::Error for VerifyError {}

/// Verifies bearer session tokens presented during connection admission.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<AuthClaims, VerifyError>;
}

/// HS256 JWT verifier backed by a shared secret.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<AuthClaims, VerifyError> {
        let token_data = decode::<Value>(token, &self.decoding_key, &self.validation)
            .map_err(|e| VerifyError::Invalid(e.to_string()))?;

        // Session tokens carry the user id in the "id" claim. Numeric ids
        // are normalized to their string form.
        let user_id = match token_data.claims.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(VerifyError::MissingClaim("id")),
        };

        Ok(AuthClaims { user_id })
    }
}
