//! Login modal.

use crate::assertion::SoftAssertions;
use crate::config::SuiteConfig;
use crate::driver::Surface;
use crate::fixtures::Credentials;
use crate::pages::common::{PageBase, PageObject};
use crate::registry::{LocatorKey, PageFamily};
use crate::result::StorefrontResult;
use crate::step::step;

/// The login modal opened from the navbar
#[derive(Debug, Clone)]
pub struct LoginPage {
    base: PageBase,
}

impl PageObject for LoginPage {
    fn base(&self) -> &PageBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PageBase {
        &mut self.base
    }
}

impl LoginPage {
    #[must_use]
    pub fn new(surface: &Surface, config: &SuiteConfig) -> Self {
        Self {
            base: PageBase::new(PageFamily::Login, surface, config),
        }
    }

    #[must_use]
    pub const fn from_base(base: PageBase) -> Self {
        Self { base }
    }

    /// Click the navbar login link and wait for the modal
    pub async fn open_login_modal(&self) -> StorefrontResult<()> {
        self.base.click(LocatorKey::NavbarLogin).await?;
        self.base.wait_visible(LocatorKey::LoginModal, None).await?;
        Ok(())
    }

    /// Log in and wait for the welcome banner.
    ///
    /// The modal must close and the banner appear before this returns.
    pub async fn login(&self, credentials: &Credentials) -> StorefrontResult<()> {
        credentials.validate()?;
        step(&format!("Login as {}", credentials.username), async {
            self.open_login_modal().await?;
            self.base
                .fill(LocatorKey::UsernameInput, &credentials.username)
                .await?;
            self.base
                .fill(LocatorKey::PasswordInput, &credentials.password)
                .await?;
            self.base.click(LocatorKey::LoginButton).await?;
            self.base.wait_hidden(LocatorKey::LoginModal, None).await?;
            self.base.wait_visible(LocatorKey::WelcomeMessage, None).await?;
            Ok(())
        })
        .await
    }

    /// Close the modal without logging in
    pub async fn close_login_modal(&self) -> StorefrontResult<()> {
        self.base.click(LocatorKey::CloseLoginModal).await?;
        self.base.wait_hidden(LocatorKey::LoginModal, None).await?;
        Ok(())
    }

    /// Soft check that the banner greets `username`
    pub async fn verify_login_success(
        &self,
        username: &str,
        soft: &mut SoftAssertions,
    ) -> StorefrontResult<()> {
        if self
            .base
            .expect_visible(LocatorKey::WelcomeMessage, soft, "welcome banner visible")
            .await?
        {
            let text = self.base.text(LocatorKey::WelcomeMessage).await?;
            soft.assert_contains(&text, &format!("Welcome {username}"), "welcome banner");
        }
        Ok(())
    }

    /// Soft check that the logout link is shown
    pub async fn verify_logout_visible(&self, soft: &mut SoftAssertions) -> StorefrontResult<()> {
        self.base
            .expect_visible(LocatorKey::NavbarLogout, soft, "logout link visible")
            .await
            .map(|_| ())
    }

    /// Soft check that the login link is gone
    pub async fn verify_login_hidden(&self, soft: &mut SoftAssertions) -> StorefrontResult<()> {
        self.base
            .expect_hidden(LocatorKey::NavbarLogin, soft, "login link hidden")
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockStorefront;
    use crate::result::StorefrontError;

    fn config() -> SuiteConfig {
        SuiteConfig::default()
            .with_timeout_ms(300)
            .with_poll_interval_ms(5)
            .with_navigation_timeout_ms(300)
    }

    async fn opened(mock: &MockStorefront) -> LoginPage {
        let surface = Surface::new(mock.clone());
        let page = LoginPage::new(&surface, &config());
        page.base().goto_base().await.unwrap();
        page
    }

    #[tokio::test]
    async fn test_login_shows_welcome() {
        let mock = MockStorefront::new();
        let page = opened(&mock).await;
        page.login(&Credentials::new("storefront_tester", "storefront_tester"))
            .await
            .unwrap();
        assert_eq!(mock.logged_in_user().as_deref(), Some("storefront_tester"));

        let mut soft = SoftAssertions::new();
        page.verify_login_success("storefront_tester", &mut soft).await.unwrap();
        page.verify_logout_visible(&mut soft).await.unwrap();
        page.verify_login_hidden(&mut soft).await.unwrap();
        assert!(soft.verify().is_ok());
    }

    #[tokio::test]
    async fn test_wrong_password_times_out_on_modal() {
        let mock = MockStorefront::new();
        let page = opened(&mock).await;
        let err = page
            .login(&Credentials::new("storefront_tester", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::WaitTimeout { .. }));
        assert_eq!(mock.unhandled_dialogs()[0].message(), "Wrong password.");
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected_before_driving() {
        let mock = MockStorefront::new();
        let page = opened(&mock).await;
        let err = page.login(&Credentials::new("", "pw")).await.unwrap_err();
        assert!(matches!(err, StorefrontError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_close_modal() {
        let mock = MockStorefront::new();
        let page = opened(&mock).await;
        page.open_login_modal().await.unwrap();
        page.close_login_modal().await.unwrap();
        let mut soft = SoftAssertions::new();
        page.verify_login_success("storefront_tester", &mut soft).await.unwrap();
        assert_eq!(soft.failure_count(), 1);
    }
}
