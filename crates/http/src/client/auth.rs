//! Authentication API client methods

use reqwest::Method;
use smm_core::Identity;
use tracing::{info, warn};

use super::{ClientError, SmmClient};
use crate::types::MessageResponse;
use crate::types::auth::{
    LoginRequest, LoginResponse, PasswordResetRequest, RefreshTokenRequest, ResetPasswordRequest,
    SignupRequest,
};

impl SmmClient {
    /// Log a storefront user in and keep the issued tokens
    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<LoginResponse, ClientError> {
        let body = LoginRequest {
            email: email.into(),
            password: password.into(),
        };
        let request = self
            .request(Identity::User, Method::POST, "/auth/login")
            .json(&body)?;
        let response: LoginResponse = self.execute(request).await?;
        self.store_tokens(Identity::User, &response)?;
        Ok(response)
    }

    /// Log an administrator in and keep the issued tokens
    pub async fn login_admin(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<LoginResponse, ClientError> {
        let body = LoginRequest {
            email: email.into(),
            password: password.into(),
        };
        let request = self
            .request(Identity::Admin, Method::POST, "/admin/auth/login")
            .json(&body)?;
        let response: LoginResponse = self.execute(request).await?;
        self.store_tokens(Identity::Admin, &response)?;
        Ok(response)
    }

    /// Create a storefront account; the user is signed in right away
    pub async fn signup(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<LoginResponse, ClientError> {
        let body = SignupRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        };
        let request = self
            .request(Identity::User, Method::POST, "/auth/signup")
            .json(&body)?;
        let response: LoginResponse = self.execute(request).await?;
        self.store_tokens(Identity::User, &response)?;
        Ok(response)
    }

    /// End a session
    ///
    /// The backend is told to revoke the refresh token when there is one, but
    /// the local tokens are cleared whatever it answers.
    pub async fn logout(&self, identity: Identity) {
        let session = self.session(identity);
        if let Some(refresh_token) = session.refresh_token() {
            let result = async {
                let request = self
                    .request(identity, Method::POST, "/auth/logout")
                    .json(&RefreshTokenRequest { refresh_token })?;
                self.send(&request).await
            }
            .await;
            if let Err(e) = result {
                warn!(%identity, error = %e, "Logout request failed, clearing session anyway");
            }
        }
        session.logout();
    }

    /// Ask for a password reset email
    pub async fn request_password_reset(
        &self,
        email: impl Into<String>,
    ) -> Result<MessageResponse, ClientError> {
        let request = self
            .request(Identity::User, Method::POST, "/auth/request-reset")
            .json(&PasswordResetRequest {
                email: email.into(),
            })?;
        self.execute(request).await
    }

    /// Set a new password using the token from the reset email
    pub async fn reset_password(
        &self,
        token: impl Into<String>,
        new_password: impl Into<String>,
    ) -> Result<MessageResponse, ClientError> {
        let request = self
            .request(Identity::User, Method::POST, "/auth/reset-password")
            .json(&ResetPasswordRequest {
                token: token.into(),
                new_password: new_password.into(),
            })?;
        self.execute(request).await
    }

    fn store_tokens(
        &self,
        identity: Identity,
        response: &LoginResponse,
    ) -> Result<(), ClientError> {
        if let Some(error) = &response.error {
            return Err(ClientError::Rejected(error.clone()));
        }
        let present = |token: &Option<String>| token.clone().filter(|t| !t.is_empty());
        match (present(&response.access_token), present(&response.refresh_token)) {
            (Some(access), Some(refresh)) => {
                self.session(identity).set_tokens(access, refresh);
                info!(%identity, "Signed in");
                Ok(())
            }
            _ => Err(ClientError::AuthenticationFailed(
                response
                    .message
                    .clone()
                    .unwrap_or_else(|| "no tokens in login response".to_string()),
            )),
        }
    }
}
