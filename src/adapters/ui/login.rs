//! Implements LoginPrompt. Inquire-based interactive prompts, used only for
//! the --login flow; the discovery run itself never touches stdin.

use crate::domain::DomainError;
use crate::ports::LoginPrompt;
use async_trait::async_trait;
use inquire::{Password, PasswordDisplayMode, Text};

pub struct InquireLoginPrompt;

#[async_trait]
impl LoginPrompt for InquireLoginPrompt {
    async fn phone(&self) -> Result<String, DomainError> {
        Text::new("Phone number (international format):")
            .prompt()
            .map_err(|e| DomainError::Auth(e.to_string()))
    }

    async fn login_code(&self) -> Result<String, DomainError> {
        Text::new("Login code:")
            .prompt()
            .map_err(|e| DomainError::Auth(e.to_string()))
    }

    async fn password(&self, hint: Option<&str>) -> Result<String, DomainError> {
        let label = match hint {
            Some(h) => format!("2FA password (hint: {}):", h),
            None => "2FA password:".to_string(),
        };
        Password::new(&label)
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .map_err(|e| DomainError::Auth(e.to_string()))
    }
}
