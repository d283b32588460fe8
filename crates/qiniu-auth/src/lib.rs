//! Request signing and upload tokens.
//!
//! This crate provides:
//! - Credential validation and HMAC-SHA1 signing (`QBox` management tokens)
//! - Upload policies (`PutPolicy`) with optional constraints
//! - A caching upload token issuer bound to one bucket

pub mod error;
pub mod mac;
pub mod policy;
pub mod token;

pub use error::{AuthError, AuthResult};
pub use mac::{encoded_entry, urlsafe_base64, Credentials, Mac};
pub use policy::{PolicyTemplate, PutPolicy, DEFAULT_POLICY_TTL_SECS};
pub use token::{UploadTokenIssuer, POLICY_REFRESH_MARGIN};
