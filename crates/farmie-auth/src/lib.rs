pub mod provider;
pub mod storage;

pub use provider::{StaticToken, StoredToken, TokenProvider};
pub use storage::{SecureStorage, TokenSet};
