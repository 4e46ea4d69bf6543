// Authentication module
// Token acquisition and the shared token cache

mod grant;
mod store;
mod types;

pub use grant::{PasswordGrant, TokenFetcher};
pub use store::TokenStore;
pub use types::{AccessToken, AccessTokenResponse, Credentials, TOKEN_PATH, TOKEN_SCOPE};
