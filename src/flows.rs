//! Token flows against the provider's OAuth endpoints.
//!
//! [`TokenExchanger`] performs the refresh-token exchange the backup pipeline starts with and
//! the authorization-code exchange `strava-auth` finishes with. [`AuthorizationSession`] and
//! [`RedirectListener`] cover the browser half of the one-time consent flow.

pub mod authorize;
pub mod loopback;
pub mod refresh;

pub use authorize::*;
pub use loopback::*;
pub use refresh::*;
