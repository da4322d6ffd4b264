//! Customer accounts.
//!
//! Login and registration store the issued token pair in local storage, where
//! the API client picks it up for every later request and refreshes it on a
//! 401. A headless client talks to the same endpoints but keeps no tokens.

use bakery_core::Email;
use serde::Serialize;
use tracing::{info, instrument};

use crate::api::{ApiClient, ApiError};
use crate::error::Result;
use crate::models::{
    AuthTokens, ChangePasswordRequest, LoginRequest, MessageResponse, RegisterRequest, User,
};

#[derive(Serialize)]
struct ForgotPasswordRequest<'a> {
    email: &'a Email,
}

/// Client for login, registration and the signed-in profile.
#[derive(Debug, Clone)]
pub struct AuthClient {
    api: ApiClient,
}

impl AuthClient {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Sign in and return the customer's profile.
    ///
    /// # Errors
    ///
    /// Returns an API error for bad credentials (401) or an inactive account
    /// (403), or a storage error if the tokens cannot be saved.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<User> {
        if request.password.is_empty() {
            return Err(ApiError::InvalidRequest("password is required".to_string()).into());
        }
        let tokens: AuthTokens = self.api.post("/auth/login", request).await?;
        self.api.store_tokens(&tokens)?;
        let user = self.me_with(&tokens).await?;
        info!(user_id = %user.id, "Signed in");
        Ok(user)
    }

    /// Create an account, sign in with it and return the profile.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` for an incomplete request, an API
    /// error if the email is already registered (400), or a storage error.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<User> {
        request.validate().map_err(ApiError::InvalidRequest)?;
        let tokens: AuthTokens = self.api.post("/auth/register", request).await?;
        self.api.store_tokens(&tokens)?;
        let user = self.me_with(&tokens).await?;
        info!(user_id = %user.id, "Account registered");
        Ok(user)
    }

    /// Profile of the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns an API error (401) when no valid token is available.
    #[instrument(skip(self))]
    pub async fn me(&self) -> Result<User> {
        Ok(self.api.get("/auth/me").await?)
    }

    /// Change the signed-in customer's password. Returns the server's
    /// confirmation message.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` for an empty new password, or an
    /// API error when the current password is wrong (400).
    #[instrument(skip(self, request))]
    pub async fn change_password(&self, request: &ChangePasswordRequest) -> Result<String> {
        if request.new_password.is_empty() {
            return Err(ApiError::InvalidRequest("new password is required".to_string()).into());
        }
        let response: MessageResponse = self.api.post("/auth/change-password", request).await?;
        Ok(response.message)
    }

    /// Ask for a password reset email. The server answers the same way
    /// whether or not the address is registered.
    ///
    /// # Errors
    ///
    /// Returns any transport or API error.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn forgot_password(&self, email: &Email) -> Result<String> {
        let response: MessageResponse = self
            .api
            .post("/auth/forgot-password", &ForgotPasswordRequest { email })
            .await?;
        Ok(response.message)
    }

    /// Forget the stored tokens. The cart session is kept.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the tokens cannot be removed.
    #[instrument(skip(self))]
    pub fn logout(&self) -> Result<()> {
        self.api.clear_tokens()?;
        info!("Signed out");
        Ok(())
    }

    /// Whether an access token is stored.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.api.has_access_token()
    }

    /// `GET /auth/me` right after tokens were issued. Interactive clients
    /// already attach the stored token; headless ones have none stored, so
    /// the fresh token is sent explicitly.
    async fn me_with(&self, tokens: &AuthTokens) -> Result<User> {
        if self.api.environment().attaches_identity() {
            return self.me().await;
        }
        Ok(self.api.get_with_token("/auth/me", &tokens.access_token).await?)
    }
}
