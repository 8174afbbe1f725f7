//! `filequeue-auth`: credential handling (hashing, verification, presence checks).
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod credentials;
pub mod password;

pub use credentials::{CompleteLogin, CompleteRegistration, LoginCredentials, Registration};
pub use password::{BcryptCredentials, CredentialError, CredentialService};
