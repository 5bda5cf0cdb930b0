//! Login / 2FA flow. Drives the auth adapter with prompt-supplied input.

use crate::domain::{DomainError, SignInResult};
use crate::ports::{AuthPort, LoginPrompt};
use std::sync::Arc;
use tracing::info;

/// Auth use case. Checks the saved session first; a full login happens only
/// when `interactive` allows prompting.
pub struct AuthService {
    auth: Arc<dyn AuthPort>,
    prompt: Arc<dyn LoginPrompt>,
    api_hash: String,
    /// Phone from config; prompted for when absent.
    phone: Option<String>,
}

impl AuthService {
    pub fn new(
        auth: Arc<dyn AuthPort>,
        prompt: Arc<dyn LoginPrompt>,
        api_hash: String,
        phone: Option<String>,
    ) -> Self {
        Self {
            auth,
            prompt,
            api_hash,
            phone,
        }
    }

    /// Ensure the session is authorized. Without `interactive` a missing
    /// session is an error, not a prompt: the normal run must never block on
    /// stdin.
    pub async fn ensure_authorized(&self, interactive: bool) -> Result<(), DomainError> {
        if self.auth.is_authenticated().await? {
            return Ok(());
        }
        if !interactive {
            return Err(DomainError::AuthRequired(
                "no saved session; run with --login first".into(),
            ));
        }
        self.run_login().await
    }

    /// Full phone -> code -> optional 2FA flow.
    async fn run_login(&self) -> Result<(), DomainError> {
        let phone = match &self.phone {
            Some(p) => p.clone(),
            None => self.prompt.phone().await?,
        };
        info!(phone = %phone, "requesting login code");
        self.auth.request_login_code(&phone, &self.api_hash).await?;

        let code = self.prompt.login_code().await?;
        match self.auth.sign_in(&code).await? {
            SignInResult::Success => {}
            SignInResult::PasswordRequired { hint } => {
                let password = self.prompt.password(hint.as_deref()).await?;
                self.auth.check_password(password.as_bytes()).await?;
            }
        }
        info!("login complete; session saved");
        Ok(())
    }
}
