//! Secrets, scope sets, and the token models issued by the provider.

pub mod scope;
pub mod secret;
pub mod token;

pub use scope::*;
pub use secret::*;
pub use token::*;
