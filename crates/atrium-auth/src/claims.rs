use atrium_core::AuthError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID (subject claim)
    pub sub: String,
    pub email: String,
    /// Token expiration timestamp (Unix timestamp)
    pub exp: usize,
    /// Token issued-at timestamp (Unix timestamp)
    pub iat: usize,
    /// Unique token identifier
    pub jti: String,
}

impl SessionClaims {
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::Unauthenticated("Invalid session subject"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: String) -> SessionClaims {
        SessionClaims {
            sub,
            email: "editor@example.com".to_string(),
            exp: 9999999999,
            iat: 1234567890,
            jti: Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn test_user_id_parses_subject() {
        let id = Uuid::new_v4();
        assert_eq!(claims(id.to_string()).user_id().unwrap(), id);
    }

    #[test]
    fn test_user_id_rejects_garbage_subject() {
        let err = claims("not-a-uuid".to_string()).user_id().unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated(_)));
    }

    #[test]
    fn test_claims_serialize() {
        let json = serde_json::to_value(claims("abc".to_string())).unwrap();
        assert_eq!(json["sub"], "abc");
        assert_eq!(json["email"], "editor@example.com");
        assert!(json.get("permissions").is_none());
    }
}
