//! Credential and secret types enforced across the broker domain.

pub mod credentials;
pub mod secret;

pub use credentials::{CLIENT_ID_KEY, CLIENT_SECRET_KEY, ImsCredentials};
pub use secret::TokenSecret;
