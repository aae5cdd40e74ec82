//! Per-entity stores composed by the adapter facade.

pub mod key;
pub mod session;
pub mod user;

pub use key::KeyStore;
pub use session::SessionStore;
pub use user::UserStore;
