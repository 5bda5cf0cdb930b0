//! Implements AuthPort over the grammers login flow.
//!
//! grammers hands out single-use tokens between the login steps (code
//! request, sign-in, 2FA). They are parked in one guarded slot so the port
//! stays stateless for its callers; each step consumes what the previous one
//! left. The client is a clone of the gateway's, both on one session.

use crate::domain::{DomainError, SignInResult};
use crate::ports::AuthPort;
use async_trait::async_trait;
use grammers_client::client::{LoginToken, PasswordToken};
use grammers_client::Client;
use tokio::sync::Mutex;

/// Where the login flow currently stands.
#[derive(Default)]
enum FlowStep {
    #[default]
    Idle,
    /// Code requested; waiting for sign_in.
    CodeSent(LoginToken),
    /// Account has 2FA; waiting for check_password.
    PasswordChallenge(PasswordToken),
}

pub struct GrammersAuthAdapter {
    client: Client,
    step: Mutex<FlowStep>,
}

impl GrammersAuthAdapter {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            step: Mutex::new(FlowStep::Idle),
        }
    }
}

#[async_trait]
impl AuthPort for GrammersAuthAdapter {
    async fn is_authenticated(&self) -> Result<bool, DomainError> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| DomainError::Auth(e.to_string()))
    }

    async fn request_login_code(&self, phone: &str, api_hash: &str) -> Result<(), DomainError> {
        let token = self
            .client
            .request_login_code(phone, api_hash)
            .await
            .map_err(|e| DomainError::Auth(format!("request login code: {}", e)))?;
        *self.step.lock().await = FlowStep::CodeSent(token);
        Ok(())
    }

    async fn sign_in(&self, code: &str) -> Result<SignInResult, DomainError> {
        let FlowStep::CodeSent(token) = std::mem::take(&mut *self.step.lock().await) else {
            return Err(DomainError::Auth("no pending login code request".into()));
        };
        match self.client.sign_in(&token, code).await {
            Ok(_user) => Ok(SignInResult::Success),
            Err(grammers_client::SignInError::PasswordRequired(pt)) => {
                let hint = pt.hint().map(String::from);
                *self.step.lock().await = FlowStep::PasswordChallenge(pt);
                Ok(SignInResult::PasswordRequired { hint })
            }
            Err(grammers_client::SignInError::InvalidCode) => {
                Err(DomainError::Auth("invalid login code".into()))
            }
            Err(grammers_client::SignInError::SignUpRequired) => Err(DomainError::Auth(
                "account does not exist; sign up with an official client first".into(),
            )),
            Err(e) => Err(DomainError::Auth(format!("sign in: {}", e))),
        }
    }

    async fn check_password(&self, password: &[u8]) -> Result<(), DomainError> {
        let FlowStep::PasswordChallenge(pt) = std::mem::take(&mut *self.step.lock().await) else {
            return Err(DomainError::Auth("no pending password challenge".into()));
        };
        self.client
            .check_password(pt, password)
            .await
            .map_err(|e| DomainError::Auth(format!("check password: {}", e)))?;
        Ok(())
    }
}
