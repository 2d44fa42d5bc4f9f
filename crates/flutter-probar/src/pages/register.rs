//! Welcome and registration screens.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::join_url;
use crate::driver::SemanticsDriver;
use crate::helper::FlutterHelper;
use crate::locator::SemanticLocator;
use crate::page_object::PageObject;
use crate::result::ProbeResult;
use crate::semantics::{EMAIL_FIELD, TEXT_FIELD};

/// Account type picked on the user-type screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Personal trainer
    Personal,
    /// Student
    Student,
}

impl UserType {
    fn card_pattern(self) -> &'static str {
        match self {
            Self::Personal => "personal trainer",
            Self::Student => "aluno",
        }
    }
}

/// Registration page object
#[derive(Debug)]
pub struct RegisterPage<'d, D: SemanticsDriver + ?Sized> {
    flutter: FlutterHelper<'d, D>,
    app_url: String,
}

impl<'d, D: SemanticsDriver + ?Sized> RegisterPage<'d, D> {
    /// Create the page object
    #[must_use]
    pub fn new(flutter: FlutterHelper<'d, D>, app_url: &str) -> Self {
        Self {
            flutter,
            app_url: app_url.to_string(),
        }
    }

    fn button(pattern: &str) -> SemanticLocator {
        SemanticLocator::role_text("button", pattern)
    }

    async fn press(&self, pattern: &str) -> ProbeResult<()> {
        self.flutter.activate_required(&Self::button(pattern)).await?;
        Ok(())
    }

    async fn visible_button(&self, pattern: &str) -> ProbeResult<bool> {
        self.flutter
            .is_visible_within(&Self::button(pattern), Duration::from_secs(3))
            .await
    }

    /// Open the welcome page
    pub async fn goto(&self) -> ProbeResult<()> {
        self.flutter.open(&join_url(&self.app_url, "/")).await?;
        Ok(())
    }

    /// "Começar Gratuitamente"
    pub async fn click_start_free(&self) -> ProbeResult<()> {
        self.press("começar gratuitamente").await
    }

    /// "Já tenho uma conta"
    pub async fn click_already_have_account(&self) -> ProbeResult<()> {
        self.press("já tenho uma conta").await
    }

    /// Pick the account type card
    pub async fn select_user_type(&self, user_type: UserType) -> ProbeResult<()> {
        self.press(user_type.card_pattern()).await
    }

    /// "Continuar"
    pub async fn click_continue(&self) -> ProbeResult<()> {
        self.press("continuar").await
    }

    /// Whether the "Você é..." question is on screen
    pub async fn is_user_type_selection_displayed(&self) -> ProbeResult<bool> {
        self.flutter.has_text("você é").await
    }

    /// "Continuar com Google"
    pub async fn is_google_button_visible(&self) -> ProbeResult<bool> {
        self.visible_button("google").await
    }

    /// "Continuar com Apple"
    pub async fn is_apple_button_visible(&self) -> ProbeResult<bool> {
        self.visible_button("apple").await
    }

    /// Name, e-mail and password fields, in that order
    pub async fn fill_registration_form(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> ProbeResult<()> {
        let fields = [
            (SemanticLocator::css(TEXT_FIELD).named("name input"), name),
            (SemanticLocator::css(EMAIL_FIELD).named("email input"), email),
            (
                SemanticLocator::css(TEXT_FIELD).nth(2).named("password input"),
                password,
            ),
        ];
        for (locator, value) in &fields {
            self.flutter.fill_input(locator, value).await?;
        }
        Ok(())
    }

    /// "Criar conta"
    pub async fn click_create_account(&self) -> ProbeResult<()> {
        self.press("criar conta").await
    }

    /// Whether the registration form is on screen
    pub async fn is_registration_page_displayed(&self) -> ProbeResult<bool> {
        self.flutter.has_text("criar conta|cadastro").await
    }

    /// Error text, if any
    pub async fn error_message(&self) -> ProbeResult<Option<String>> {
        let banner = SemanticLocator::role("alert").or_text("erro|error|inválido|invalid");
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
impl<'d, D: SemanticsDriver + ?Sized> PageObject for RegisterPage<'d, D> {
    fn url_pattern(&self) -> &str {
        "/$|/register|/welcome"
    }

    async fn is_displayed(&self) -> ProbeResult<bool> {
        Ok(self.flutter.has_text("começar gratuitamente").await?
            || self.is_registration_page_displayed().await?)
    }
}
