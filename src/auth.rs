//! Client identities, redacted secrets, and the credential header decoder.

pub mod credential;
pub mod id;
pub mod secret;

pub use credential::*;
pub use id::*;
pub use secret::*;
