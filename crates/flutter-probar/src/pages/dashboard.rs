//! Trainer and student home screens.

use std::time::Duration;

use async_trait::async_trait;

use crate::driver::SemanticsDriver;
use crate::helper::{ActivationPath, FlutterHelper};
use crate::locator::SemanticLocator;
use crate::page_object::PageObject;
use crate::result::ProbeResult;

/// Routes that count as a home screen
pub const HOME_ROUTE: &str = "dashboard|home|org-selector";

/// Dashboard page object, shared by both roles
#[derive(Debug)]
pub struct DashboardPage<'d, D: SemanticsDriver + ?Sized> {
    flutter: FlutterHelper<'d, D>,
}

impl<'d, D: SemanticsDriver + ?Sized> DashboardPage<'d, D> {
    /// Create the page object
    #[must_use]
    pub const fn new(flutter: FlutterHelper<'d, D>) -> Self {
        Self { flutter }
    }

    fn student_card(name: &str) -> SemanticLocator {
        SemanticLocator::label(format!("student-card-{name}"))
            .or_text(regex::escape(name))
            .named(format!("student card {name}"))
    }

    fn assigned_plan() -> SemanticLocator {
        SemanticLocator::label("assigned-plan")
            .or_text("seu plano|your plan|treino de hoje")
            .named("assigned plan")
    }

    fn start_workout_action() -> SemanticLocator {
        SemanticLocator::labeled(
            "quick-action-iniciar-treino",
            "button",
            "iniciar.*treino|start.*workout",
        )
        .named("start workout action")
    }

    /// Wait for a home route and a rendered tree
    pub async fn wait_for_load(&self) -> ProbeResult<String> {
        let url = self.flutter.wait_for_route(HOME_ROUTE).await?;
        self.flutter.wait_for_flutter().await?;
        Ok(url)
    }

    /// Name shown in the app bar or profile header
    pub async fn user_name(&self) -> ProbeResult<Option<String>> {
        SemanticLocator::label("user-name")
            .or_role("heading")
            .text_content(self.flutter.driver())
            .await
    }

    /// Whether the recent-students section lists `name`
    pub async fn has_active_student(&self, name: &str) -> ProbeResult<bool> {
        let section = SemanticLocator::label("active-students").or_text("alunos? recentes");
        match section
            .wait_for(self.flutter.driver(), &self.flutter.timeouts().expect_wait())
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_absence() => return Ok(false),
            Err(e) => return Err(e),
        }
        Self::student_card(name).is_visible(self.flutter.driver()).await
    }

    /// Open the student's card, then its join button
    pub async fn join_student_session(&self, name: &str) -> ProbeResult<()> {
        self.flutter.activate_required(&Self::student_card(name)).await?;
        let join = SemanticLocator::labeled("join-session", "button", "acompanhar|join")
            .named("join session button");
        self.flutter.activate_required(&join).await?;
        tracing::info!(student = name, "joined student session");
        Ok(())
    }

    /// Whether the student's assigned plan is on screen
    pub async fn has_assigned_plan(&self) -> ProbeResult<bool> {
        self.flutter
            .is_visible_within(&Self::assigned_plan(), Duration::from_secs(5))
            .await
    }

    /// "Iniciar treino", then the named workout or the suggested one
    pub async fn start_workout(&self, workout: Option<&str>) -> ProbeResult<ActivationPath> {
        self.flutter
            .activate_required(&Self::start_workout_action())
            .await?;
        let card = match workout {
            Some(name) => SemanticLocator::text(regex::escape(name)).named(name),
            None => SemanticLocator::label_pattern("workout-card-treino-a")
                .or_text("sugerido")
                .or_role("group")
                .named("suggested workout"),
        };
        self.flutter.activate_required(&card).await
    }

    /// "Treinar com personal"
    pub async fn enable_cotraining_mode(&self) -> ProbeResult<()> {
        let button = SemanticLocator::labeled("cotraining-mode", "button", "treinar com personal");
        self.flutter.activate_required(&button).await?;
        Ok(())
    }

    /// "Treinar sozinho"
    pub async fn start_workout_solo(&self) -> ProbeResult<()> {
        let button = SemanticLocator::labeled("start-workout-solo", "button", "treinar sozinho");
        self.flutter.activate_required(&button).await?;
        Ok(())
    }

    /// Pick the mode the workout starts in
    pub async fn select_training_mode(&self, cotraining: bool) -> ProbeResult<()> {
        if cotraining {
            self.enable_cotraining_mode().await
        } else {
            self.start_workout_solo().await
        }
    }

    /// Resume an unfinished workout; `false` when none is offered
    pub async fn continue_workout(&self) -> ProbeResult<bool> {
        let resume = SemanticLocator::labeled("continue-workout", "button", "continuar treino|retomar");
        self.flutter
            .activate_if_present(&resume, Duration::from_secs(2))
            .await
    }
}

#[async_trait]
impl<'d, D: SemanticsDriver + ?Sized> PageObject for DashboardPage<'d, D> {
    fn url_pattern(&self) -> &str {
        "dashboard|home"
    }

    async fn is_displayed(&self) -> ProbeResult<bool> {
        let url = self.flutter.driver().current_url().await?;
        Ok(self.matches_url(&url))
    }
}
