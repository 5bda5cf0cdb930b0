//! Inbound port. CLI prompts call into the application auth flow.

use crate::domain::DomainError;

/// Login prompts: phone number, login code, 2FA password.
#[async_trait::async_trait]
pub trait LoginPrompt: Send + Sync {
    async fn phone(&self) -> Result<String, DomainError>;

    async fn login_code(&self) -> Result<String, DomainError>;

    async fn password(&self, hint: Option<&str>) -> Result<String, DomainError>;
}
