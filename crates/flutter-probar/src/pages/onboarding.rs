//! Trainer and student onboarding wizards.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::driver::SemanticsDriver;
use crate::helper::FlutterHelper;
use crate::locator::SemanticLocator;
use crate::page_object::PageObject;
use crate::result::{ProbeError, ProbeResult};
use crate::semantics::TEXT_FIELD;
use crate::wait::{wait_for_url, WaitOptions};

/// How long optional wizard controls get to show up
const OPTIONAL_CONTROL: Duration = Duration::from_secs(2);

const CREF_FORMAT: &str = r"^\d{6}-[GBLF]$";

/// Routes the wizard hands over to when it finishes
const HOME_ROUTE: &str = "home|dashboard|trainer";

fn compiled(
    cell: &'static OnceLock<Result<Regex, regex::Error>>,
    pattern: &str,
) -> ProbeResult<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .map_err(|e| ProbeError::InvalidPattern(e.clone()))
}

fn cref_regex() -> ProbeResult<&'static Regex> {
    static COMPILED: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    compiled(&COMPILED, CREF_FORMAT)
}

fn home_regex() -> ProbeResult<&'static Regex> {
    static COMPILED: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    compiled(&COMPILED, HOME_ROUTE)
}

/// Registration number of a physical-education professional: six digits,
/// a dash and the category letter (G, B, L or F).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cref(String);

impl Cref {
    /// Validate and wrap a CREF number
    pub fn parse(value: &str) -> ProbeResult<Self> {
        let value = value.trim();
        if cref_regex()?.is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(ProbeError::Validation {
                message: format!("CREF must look like 000000-G (category G, B, L or F), got {value:?}"),
            })
        }
    }

    /// Category letter
    #[must_use]
    pub fn category(&self) -> char {
        self.0.chars().last().unwrap_or('G')
    }

    /// The number as typed into the field
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Cref {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Cref {
    type Error = ProbeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cref> for String {
    fn from(cref: Cref) -> Self {
        cref.0
    }
}

impl fmt::Display for Cref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Student goal cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessGoal {
    /// "Perder peso"
    LoseWeight,
    /// "Ganhar massa"
    GainMass,
    /// "Saúde"
    Health,
    /// "Condicionamento"
    Conditioning,
}

impl FitnessGoal {
    fn card_pattern(self) -> &'static str {
        match self {
            Self::LoseWeight => "perder peso|emagrecer",
            Self::GainMass => "ganhar massa|hipertrofia",
            Self::Health => "saúde|bem-estar",
            Self::Conditioning => "condicionamento|resistência",
        }
    }
}

/// Student experience cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    /// "Iniciante"
    Beginner,
    /// "Intermediário"
    Intermediate,
    /// "Avançado"
    Advanced,
}

impl ExperienceLevel {
    fn card_pattern(self) -> &'static str {
        match self {
            Self::Beginner => "iniciante",
            Self::Intermediate => "intermediário",
            Self::Advanced => "avançado",
        }
    }
}

/// Onboarding page object
#[derive(Debug)]
pub struct OnboardingPage<'d, D: SemanticsDriver + ?Sized> {
    flutter: FlutterHelper<'d, D>,
}

impl<'d, D: SemanticsDriver + ?Sized> OnboardingPage<'d, D> {
    /// Create the page object
    #[must_use]
    pub const fn new(flutter: FlutterHelper<'d, D>) -> Self {
        Self { flutter }
    }

    fn next_button() -> SemanticLocator {
        SemanticLocator::role_text("button", "próximo|continuar").named("next button")
    }

    fn skip_button() -> SemanticLocator {
        SemanticLocator::role_text("button", "pular|skip").named("skip button")
    }

    fn complete_button() -> SemanticLocator {
        SemanticLocator::role_text("button", "concluir|finalizar|complete").named("complete button")
    }

    async fn pick(&self, role: &str, pattern: &str) -> ProbeResult<bool> {
        self.flutter
            .activate_if_present(&SemanticLocator::role_text(role, pattern), OPTIONAL_CONTROL)
            .await
    }

    /// Wait for the wizard to render
    pub async fn wait_for_load(&self) -> ProbeResult<()> {
        self.flutter.wait_for_flutter().await?;
        Ok(())
    }

    /// Whether the first step is showing
    pub async fn is_on_welcome_step(&self) -> ProbeResult<bool> {
        self.flutter.has_text("bem-vindo|welcome").await
    }

    /// "Próximo" or "Continuar"
    pub async fn click_next(&self) -> ProbeResult<()> {
        self.flutter.activate_required(&Self::next_button()).await?;
        Ok(())
    }

    /// "Pular", when the step offers it
    pub async fn click_skip(&self) -> ProbeResult<bool> {
        self.flutter
            .activate_if_present(&Self::skip_button(), OPTIONAL_CONTROL)
            .await
    }

    /// "Concluir" or "Finalizar"
    pub async fn click_complete(&self) -> ProbeResult<()> {
        self.flutter.activate_required(&Self::complete_button()).await?;
        Ok(())
    }

    /// Type a validated CREF into the first field
    pub async fn fill_cref(&self, cref: &Cref) -> ProbeResult<()> {
        self.flutter
            .fill_input(&SemanticLocator::css(TEXT_FIELD).named("CREF input"), cref.as_str())
            .await
    }

    /// Open the UF dropdown and pick `state`; `false` when either is missing
    pub async fn select_state(&self, state: &str) -> ProbeResult<bool> {
        if !self
            .flutter
            .activate_if_present(&SemanticLocator::role("combobox"), OPTIONAL_CONTROL)
            .await?
        {
            return Ok(false);
        }
        self.pick("option", &regex::escape(state)).await
    }

    /// Pick a goal card
    pub async fn select_fitness_goal(&self, goal: FitnessGoal) -> ProbeResult<bool> {
        self.pick("button", goal.card_pattern()).await
    }

    /// Pick an experience card
    pub async fn select_experience(&self, level: ExperienceLevel) -> ProbeResult<bool> {
        self.pick("button", level.card_pattern()).await
    }

    /// Weight then height; `false` when the step has no such fields
    pub async fn fill_physical_data(&self, weight: &str, height: &str) -> ProbeResult<bool> {
        let driver = self.flutter.driver();
        let fields = SemanticLocator::css(TEXT_FIELD);
        if fields.count(driver).await? < 2 {
            return Ok(false);
        }
        self.flutter.fill_input(&fields.clone().nth(0), weight).await?;
        self.flutter.fill_input(&fields.nth(1), height).await?;
        Ok(true)
    }

    /// Weekly training frequency card ("3 vezes", "3x")
    pub async fn select_frequency(&self, days: u8) -> ProbeResult<bool> {
        self.pick("button", &format!("{days}.*vez|{days}x")).await
    }

    async fn skip_or_next(&self) -> ProbeResult<()> {
        if !self.click_skip().await? {
            self.flutter
                .activate_if_present(&Self::next_button(), OPTIONAL_CONTROL)
                .await?;
        }
        Ok(())
    }

    async fn complete_or_next(&self) -> ProbeResult<()> {
        if !self
            .flutter
            .activate_if_present(&Self::complete_button(), OPTIONAL_CONTROL)
            .await?
        {
            self.flutter
                .activate_if_present(&Self::next_button(), OPTIONAL_CONTROL)
                .await?;
        }
        Ok(())
    }

    /// Welcome, then skip CREF, invite, plan and templates, then finish
    pub async fn complete_trainer_onboarding(&self) -> ProbeResult<()> {
        self.wait_for_load().await?;
        self.click_next().await?;
        for _ in 0..4 {
            self.skip_or_next().await?;
        }
        self.complete_or_next().await
    }

    /// Welcome, first goal card, then skip through the remaining steps
    pub async fn complete_student_onboarding(&self) -> ProbeResult<()> {
        self.wait_for_load().await?;
        self.click_next().await?;
        self.flutter
            .activate_if_present(&SemanticLocator::role("button"), OPTIONAL_CONTROL)
            .await?;
        self.flutter
            .activate_if_present(&Self::next_button(), OPTIONAL_CONTROL)
            .await?;
        for _ in 0..5 {
            self.skip_or_next().await?;
        }
        self.complete_or_next().await
    }

    /// Whether the wizard handed over to a home route
    pub async fn is_on_dashboard(&self) -> ProbeResult<bool> {
        let home = home_regex()?;
        let options = WaitOptions::with_timeout(Duration::from_secs(10));
        match wait_for_url(self.flutter.driver(), home, &options).await {
            Ok(_) => Ok(true),
            Err(ProbeError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// "Passo 2 de 5" style indicator
    pub async fn current_step_text(&self) -> ProbeResult<Option<String>> {
        let indicator = SemanticLocator::text(r"passo \d|step \d");
        if self
            .flutter
            .is_visible_within(&indicator, OPTIONAL_CONTROL)
            .await?
        {
            return indicator.text_content(self.flutter.driver()).await;
        }
        Ok(None)
    }
}

#[async_trait]
impl<'d, D: SemanticsDriver + ?Sized> PageObject for OnboardingPage<'d, D> {
    fn url_pattern(&self) -> &str {
        "onboarding"
    }

    async fn is_displayed(&self) -> ProbeResult<bool> {
        self.flutter.has_text("passo|step|próximo|continuar").await
    }
}
