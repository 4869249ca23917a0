//! Authorization headers for the Twitter/X and Imgur APIs.
//!
//! Tokens are obtained outside the bot; this module only formats them.

/// Builds the Authorization header for OAuth 2.0 User Context authentication.
///
/// # Format
///
/// ```text
/// Bearer YOUR_ACCESS_TOKEN_HERE
/// ```
///
/// # Example
///
/// ```rust
/// use tweetcloud::build_oauth2_user_context_header;
///
/// let header = build_oauth2_user_context_header("your_access_token");
/// assert_eq!(header, "Bearer your_access_token");
/// ```
pub fn build_oauth2_user_context_header(access_token: &str) -> String {
    format!("Bearer {}", access_token)
}

/// Builds the Authorization header for an Imgur upload.
///
/// Uploads go to the account when an access token is available and are
/// anonymous (`Client-ID`) otherwise.
///
/// # Example
///
/// ```rust
/// use tweetcloud::build_imgur_auth_header;
///
/// assert_eq!(build_imgur_auth_header("abc", None), "Client-ID abc");
/// assert_eq!(build_imgur_auth_header("abc", Some("tok")), "Bearer tok");
/// ```
pub fn build_imgur_auth_header(client_id: &str, access_token: Option<&str>) -> String {
    match access_token {
        Some(token) => build_oauth2_user_context_header(token),
        None => format!("Client-ID {}", client_id),
    }
}
