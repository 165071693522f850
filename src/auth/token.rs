// JWT token generation and validation service

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::auth::error::AuthError;
use crate::auth::models::{Identity, Role};
use crate::config::JwtConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32, // user_id
    pub role: Role,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.sub,
            role: self.role,
        }
    }
}

/// Token service for JWT operations. Stateless: nothing is persisted.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(&config.secret, config.access_ttl_secs, config.refresh_ttl_secs)
    }

    /// Signed access token for the given identity
    pub fn issue(&self, user_id: i32, role: Role) -> Result<String, AuthError> {
        self.sign(user_id, role, TokenType::Access, self.access_ttl_secs)
    }

    /// Access token plus refresh token
    pub fn issue_pair(&self, user_id: i32, role: Role) -> Result<(String, String), AuthError> {
        let access_token = self.issue(user_id, role)?;
        let refresh_token = self.sign(user_id, role, TokenType::Refresh, self.refresh_ttl_secs)?;
        Ok((access_token, refresh_token))
    }

    /// Verifies an access token and returns the identity it carries
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.decode_expecting(token, TokenType::Access)
            .map(|claims| claims.identity())
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Identity, AuthError> {
        self.decode_expecting(token, TokenType::Refresh)
            .map(|claims| claims.identity())
    }

    fn sign(
        &self,
        user_id: i32,
        role: Role,
        token_type: TokenType,
        ttl_secs: i64,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            role,
            token_type,
            iat: now,
            exp: now + ttl_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    pub(crate) fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidSignature,
            })
    }

    fn decode_expecting(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let claims = self.decode_claims(token)?;
        if claims.token_type != expected {
            return Err(AuthError::WrongTokenType {
                expected: expected.as_str(),
            });
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "test_secret_key_for_testing_purposes";

    fn test_token_service() -> TokenService {
        TokenService::new(SECRET, 900, 604_800)
    }

    fn encode_raw(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn access_token_lifetime_comes_from_config() {
        let service = test_token_service();
        let token = service.issue(1, Role::Volunteer).unwrap();
        let claims = service.decode_claims(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_token_lifetime_comes_from_config() {
        let service = test_token_service();
        let (_, refresh) = service.issue_pair(1, Role::Volunteer).unwrap();
        let claims = service.decode_claims(&refresh).unwrap();
        assert_eq!(claims.exp - claims.iat, 604_800);
        assert_eq!(claims.token_type, TokenType::Refresh);
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            role: Role::Beneficiary,
            token_type: TokenType::Access,
            iat: now - 1000,
            exp: now - 10,
        };
        let token = encode_raw(&claims, SECRET);
        assert!(matches!(
            test_token_service().verify(&token),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn token_signed_with_another_key_is_rejected() {
        let other = TokenService::new("some_other_secret", 900, 604_800);
        let token = other.issue(1, Role::Moderator).unwrap();
        assert!(matches!(
            test_token_service().verify(&token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let service = test_token_service();
        let token = service.issue(1, Role::Volunteer).unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        // Payload claiming a different role, original signature
        let forged = service.issue(1, Role::Moderator).unwrap();
        parts[1] = forged.split('.').nth(1).unwrap().to_string();
        let tampered = parts.join(".");
        assert!(matches!(
            service.verify(&tampered),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let service = test_token_service();
        let (access, refresh) = service.issue_pair(5, Role::Volunteer).unwrap();
        assert!(matches!(
            service.verify(&refresh),
            Err(AuthError::WrongTokenType { .. })
        ));
        assert!(matches!(
            service.verify_refresh(&access),
            Err(AuthError::WrongTokenType { .. })
        ));
        assert!(service.verify_refresh(&refresh).is_ok());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let service = test_token_service();
        for token in ["", "not.a.token", "invalid_token_format"] {
            assert!(matches!(
                service.verify(token),
                Err(AuthError::InvalidSignature)
            ));
        }
    }

    fn role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn issued_tokens_carry_identity(user_id in 1i32..1_000_000, role in role()) {
            let service = test_token_service();
            let identity = service.verify(&service.issue(user_id, role).unwrap()).unwrap();
            prop_assert_eq!(identity, Identity { user_id, role });

            let (_, refresh) = service.issue_pair(user_id, role).unwrap();
            prop_assert_eq!(service.verify_refresh(&refresh).unwrap(), Identity { user_id, role });
        }

        #[test]
        fn random_strings_are_not_tokens(garbage in "[a-zA-Z0-9.]{10,60}") {
            prop_assert!(test_token_service().verify(&garbage).is_err());
        }
    }
}
