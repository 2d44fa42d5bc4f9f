//! Login screen.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::join_url;
use crate::driver::SemanticsDriver;
use crate::helper::{ActivationPath, FlutterHelper};
use crate::locator::SemanticLocator;
use crate::page_object::PageObject;
use crate::result::ProbeResult;
use crate::semantics::{EMAIL_FIELD, GLASS_PANE, TEXT_FIELD};

/// Routes a successful login lands on
pub const POST_LOGIN_ROUTE: &str = "org-selector|dashboard|home";

/// Login page object
#[derive(Debug)]
pub struct LoginPage<'d, D: SemanticsDriver + ?Sized> {
    flutter: FlutterHelper<'d, D>,
    app_url: String,
}

impl<'d, D: SemanticsDriver + ?Sized> LoginPage<'d, D> {
    /// Create the page object
    #[must_use]
    pub fn new(flutter: FlutterHelper<'d, D>, app_url: &str) -> Self {
        Self {
            flutter,
            app_url: app_url.to_string(),
        }
    }

    fn already_have_account() -> SemanticLocator {
        SemanticLocator::role_text("button", "já tenho uma conta").named("already-have-account button")
    }

    fn email_input() -> SemanticLocator {
        SemanticLocator::css(EMAIL_FIELD).named("email input")
    }

    fn password_input() -> SemanticLocator {
        SemanticLocator::css(TEXT_FIELD).nth(1).named("password input")
    }

    fn login_button() -> SemanticLocator {
        SemanticLocator::label("login-button")
            .or_role_text("button", "entrar")
            .named("login button")
    }

    fn error_banner() -> SemanticLocator {
        SemanticLocator::role("alert")
            .or_text("erro|error|inválido|invalid")
            .named("login error")
    }

    /// Open `/login`, passing the landing page if the app shows it first
    pub async fn goto(&self) -> ProbeResult<()> {
        self.flutter.open(&join_url(&self.app_url, "/login")).await?;

        let landing = Self::already_have_account();
        if self
            .flutter
            .is_visible_within(&landing, Duration::from_secs(2))
            .await?
        {
            tracing::debug!("landing page shown, following the login link");
            self.flutter.activate_required(&landing).await?;
            Self::email_input()
                .wait_for(self.flutter.driver(), &self.flutter.timeouts().element_wait())
                .await?;
        }
        Ok(())
    }

    /// Fill the form and press the login button without waiting for a route
    pub async fn submit(&self, email: &str, password: &str) -> ProbeResult<ActivationPath> {
        self.flutter.wait_for_flutter().await?;
        self.flutter.fill_input(&Self::email_input(), email).await?;
        self.flutter.fill_input(&Self::password_input(), password).await?;
        let path = self.flutter.activate_required(&Self::login_button()).await?;
        tracing::info!(email, ?path, "login submitted");
        Ok(path)
    }

    /// Fill the form, submit, and wait for the post-login route
    pub async fn login(&self, email: &str, password: &str) -> ProbeResult<String> {
        self.submit(email, password).await?;
        self.flutter.wait_for_route(POST_LOGIN_ROUTE).await
    }

    /// Error text shown after a failed login
    pub async fn error_message(&self) -> ProbeResult<Option<String>> {
        let banner = Self::error_banner();
        if self
            .flutter
            .is_visible_within(&banner, Duration::from_secs(2))
            .await?
        {
            return banner.text_content(self.flutter.driver()).await;
        }
        Ok(None)
    }
}

#[async_trait]
impl<'d, D: SemanticsDriver + ?Sized> PageObject for LoginPage<'d, D> {
    fn url_pattern(&self) -> &str {
        "/login"
    }

    async fn is_displayed(&self) -> ProbeResult<bool> {
        if self.flutter.driver().count(GLASS_PANE).await? == 0 {
            return Ok(false);
        }
        self.flutter.has_text("entrar|login").await
    }
}
