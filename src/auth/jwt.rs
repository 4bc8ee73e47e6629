use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub exp: i64,
}

impl UserClaims {
    pub fn new(user_id: Uuid, ttl: chrono::Duration) -> Self {
        Self {
            sub: user_id.to_string(),
            exp: (chrono::Utc::now() + ttl).timestamp(),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.sub.parse().ok()
    }
}

/// Claims of a refresh token. `jti` is random so that two tokens issued in
/// the same second still differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub exp: i64,
    pub jti: String,
}

impl RefreshClaims {
    pub fn new(user_id: Uuid, ttl: chrono::Duration) -> Self {
        Self {
            sub: user_id.to_string(),
            exp: (chrono::Utc::now() + ttl).timestamp(),
            jti: super::generate_refresh_token(),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.sub.parse().ok()
    }
}

pub fn generate_token<K: AsRef<[u8]>>(
    claims: UserClaims,
    key: K,
) -> jsonwebtoken::errors::Result<String> {
    let header = Header::default();
    let key = EncodingKey::from_secret(key.as_ref());

    let token = jsonwebtoken::encode(&header, &claims, &key)?;
    Ok(token)
}

pub fn process_token<K: AsRef<[u8]>>(
    token: &str,
    key: K,
) -> jsonwebtoken::errors::Result<TokenData<UserClaims>> {
    let validation = Validation::default();
    let key = DecodingKey::from_secret(key.as_ref());

    let claims = jsonwebtoken::decode::<UserClaims>(token, &key, &validation)?;
    Ok(claims)
}

pub fn generate_refresh_token_jwt<K: AsRef<[u8]>>(
    claims: &RefreshClaims,
    key: K,
) -> jsonwebtoken::errors::Result<String> {
    jsonwebtoken::encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(key.as_ref()),
    )
}

pub fn process_refresh_token<K: AsRef<[u8]>>(
    token: &str,
    key: K,
) -> jsonwebtoken::errors::Result<RefreshClaims> {
    let data = jsonwebtoken::decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(key.as_ref()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn token_carries_user_id() {
        let id = Uuid::new_v4();
        let token = generate_token(UserClaims::new(id, chrono::Duration::minutes(5)), "secret").unwrap();
        let data = process_token(&token, "secret").unwrap();
        assert_eq!(data.claims.user_id(), Some(id));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let token =
            generate_token(UserClaims::new(Uuid::new_v4(), chrono::Duration::minutes(5)), "a").unwrap();
        assert!(process_token(&token, "b").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // default validation leeway is 60s
        let claims = UserClaims::new(Uuid::new_v4(), chrono::Duration::minutes(-5));
        let token = generate_token(claims, "secret").unwrap();
        let err = process_token(&token, "secret").unwrap_err();
        assert!(matches!(
            err.kind(),
            jsonwebtoken::errors::ErrorKind::ExpiredSignature
        ));
    }

    #[test]
    fn refresh_tokens_are_unique_and_keyed_separately() {
        let id = Uuid::new_v4();
        let ttl = chrono::Duration::days(7);
        let a = generate_refresh_token_jwt(&RefreshClaims::new(id, ttl), "refresh").unwrap();
        let b = generate_refresh_token_jwt(&RefreshClaims::new(id, ttl), "refresh").unwrap();
        assert_ne!(a, b);

        let claims = process_refresh_token(&a, "refresh").unwrap();
        assert_eq!(claims.user_id(), Some(id));
        assert!(process_refresh_token(&a, "access").is_err());
    }
}
