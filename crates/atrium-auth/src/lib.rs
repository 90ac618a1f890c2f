//! # Atrium Auth
//!
//! Session tokens for the Atrium API.
//!
//! A session token is a signed JWT naming the user. It deliberately carries no
//! roles or permissions: those are read from the store on every check, so a
//! role change applies to the very next request.
//!
//! - [`claims`]: The session claim structure
//! - [`jwt`]: Token creation and verification
//!
//! # Example
//!
//! ```ignore
//! use atrium_auth::{create_session_token, verify_session_token};
//! use atrium_config::SessionConfig;
//!
//! let config = SessionConfig::from_env();
//! let token = create_session_token(user_id, "editor@example.com", &config)?;
//! let claims = verify_session_token(&token, &config)?;
//! assert_eq!(claims.user_id()?, user_id);
//! ```

pub mod claims;
pub mod jwt;

// Re-export commonly used types at crate root
pub use claims::SessionClaims;
pub use jwt::{create_session_token, verify_session_token};
