// X OAuth 2.0 (PKCE) login. Only the authorization leg is implemented; the
// code-for-token exchange answers 501.

pub mod handlers;
pub mod oauth_state;
