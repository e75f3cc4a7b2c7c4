use crate::models::Claims;
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Token issuance lives in the auth service; this side only verifies.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
