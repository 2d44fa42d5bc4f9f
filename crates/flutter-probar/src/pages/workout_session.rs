//! Active workout view, for both sides of a co-training session.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};

use crate::driver::SemanticsDriver;
use crate::helper::FlutterHelper;
use crate::locator::SemanticLocator;
use crate::page_object::PageObject;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{poll_until, WaitOptions};

const SESSION_TEXT: &str = "treino ativo|exercício|série";

const ADJUSTMENT_WEIGHT: &str = r"([+-]?\d+(?:\.\d+)?)\s*kg";

fn adjustment_weight_regex() -> ProbeResult<&'static Regex> {
    static COMPILED: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    COMPILED
        .get_or_init(|| RegexBuilder::new(ADJUSTMENT_WEIGHT).case_insensitive(true).build())
        .as_ref()
        .map_err(|e| ProbeError::InvalidPattern(e.clone()))
}

/// Weight in a notification such as "Personal sugere +2.5 kg"
pub fn parse_adjustment_weight(text: &str) -> ProbeResult<Option<f64>> {
    let weight = adjustment_weight_regex()?
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok());
    Ok(weight)
}

/// Workout session page object
#[derive(Debug)]
pub struct WorkoutSessionPage<'d, D: SemanticsDriver + ?Sized> {
    flutter: FlutterHelper<'d, D>,
}

impl<'d, D: SemanticsDriver + ?Sized> WorkoutSessionPage<'d, D> {
    /// Create the page object
    #[must_use]
    pub const fn new(flutter: FlutterHelper<'d, D>) -> Self {
        Self { flutter }
    }

    fn notification() -> SemanticLocator {
        SemanticLocator::label("adjustment-notification")
            .or_text("sugestão do personal|ajuste do personal|personal sugere")
            .named("adjustment notification")
    }

    async fn press(&self, locator: SemanticLocator) -> ProbeResult<()> {
        self.flutter.activate_required(&locator).await?;
        Ok(())
    }

    /// Wait until session content is rendered
    pub async fn wait_for_load(&self) -> ProbeResult<()> {
        self.flutter.wait_for_flutter().await?;
        SemanticLocator::label("workout-session")
            .or_text(SESSION_TEXT)
            .named("workout session")
            .wait_for(self.flutter.driver(), &self.flutter.timeouts().element_wait())
            .await?;
        Ok(())
    }

    /// Start in co-training mode and wait for the "waiting for trainer" state
    pub async fn select_cotraining_mode(&self) -> ProbeResult<()> {
        self.press(
            SemanticLocator::label("cotraining-mode")
                .or_role_text("button", "treinar com personal|co-training"),
        )
        .await?;
        SemanticLocator::text("aguardando|waiting")
            .named("waiting for trainer")
            .wait_for(
                self.flutter.driver(),
                &WaitOptions::with_timeout(Duration::from_secs(5)),
            )
            .await?;
        Ok(())
    }

    /// Whether the trainer has joined
    pub async fn is_trainer_connected(&self) -> ProbeResult<bool> {
        SemanticLocator::label("trainer-connected")
            .or_text("personal conectado|trainer connected")
            .is_visible(self.flutter.driver())
            .await
    }

    /// Name of the exercise on screen
    pub async fn current_exercise(&self) -> ProbeResult<Option<String>> {
        SemanticLocator::label("current-exercise")
            .or_role_text("heading", "supino|rosca|agachamento")
            .text_content(self.flutter.driver())
            .await
    }

    /// Fill reps and weight, then complete the set
    pub async fn complete_set(&self, reps: u32, weight_kg: f64) -> ProbeResult<()> {
        let reps_input = SemanticLocator::label("reps-input")
            .or_role_text("spinbutton", "reps|repetições")
            .named("reps input");
        let weight_input = SemanticLocator::label("weight-input")
            .or_role_text("spinbutton", "peso|weight")
            .named("weight input");
        self.flutter.fill_input(&reps_input, &reps.to_string()).await?;
        self.flutter
            .fill_input(&weight_input, &weight_kg.to_string())
            .await?;
        self.press(
            SemanticLocator::role_text("button", "concluir|complete|próxima|completar série")
                .or_label("complete-set")
                .named("complete set button"),
        )
        .await?;
        tracing::info!(reps, weight_kg, "set completed");
        Ok(())
    }

    /// Trainer side: suggest a new weight with an optional note
    pub async fn send_adjustment(&self, weight_kg: f64, note: Option<&str>) -> ProbeResult<()> {
        self.press(SemanticLocator::labeled(
            "suggest-adjustment",
            "button",
            "sugerir ajuste|suggest",
        ))
        .await?;
        let weight = SemanticLocator::label("suggested-weight")
            .or_role_text("spinbutton", "peso sugerido")
            .named("suggested weight");
        self.flutter.fill_input(&weight, &weight_kg.to_string()).await?;
        if let Some(note) = note {
            let note_input = SemanticLocator::label("adjustment-note")
                .or_role_text("textbox", "nota|note")
                .named("adjustment note");
            self.flutter.fill_input(&note_input, note).await?;
        }
        self.press(SemanticLocator::labeled("send-adjustment", "button", "enviar|send"))
            .await
    }

    /// Student side: whether a suggestion arrives within `timeout`
    pub async fn wait_for_adjustment(&self, timeout: Duration) -> ProbeResult<bool> {
        match Self::notification()
            .wait_for(self.flutter.driver(), &WaitOptions::with_timeout(timeout))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_absence() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Suggested weight read from the notification
    pub async fn adjustment_weight(&self) -> ProbeResult<Option<f64>> {
        let text = Self::notification()
            .text_content(self.flutter.driver())
            .await?;
        match text {
            Some(text) => parse_adjustment_weight(&text),
            None => Ok(None),
        }
    }

    /// Accept the suggestion
    pub async fn apply_adjustment(&self) -> ProbeResult<()> {
        self.press(
            SemanticLocator::role_text("button", "aplicar|apply").or_label("apply-adjustment"),
        )
        .await
    }

    /// Whether the notification has left the screen within `timeout`
    pub async fn adjustment_cleared_within(&self, timeout: Duration) -> ProbeResult<bool> {
        let notification = Self::notification();
        let options = WaitOptions::with_timeout(timeout);
        let cleared = poll_until(&options, "adjustment notification to clear", || async {
            Ok((!notification.is_visible(self.flutter.driver()).await?).then_some(()))
        })
        .await;
        match cleared {
            Ok(()) => Ok(true),
            Err(ProbeError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Reject the suggestion
    pub async fn dismiss_adjustment(&self) -> ProbeResult<()> {
        self.press(
            SemanticLocator::role_text("button", "ignorar|dismiss|cancel")
                .or_label("dismiss-adjustment"),
        )
        .await
    }

    /// Open the session chat if it is collapsed, type and send
    pub async fn send_message(&self, text: &str) -> ProbeResult<()> {
        let input = SemanticLocator::label("message-input")
            .or_role_text("textbox", "mensagem|message")
            .named("message input");
        if !input.is_visible(self.flutter.driver()).await? {
            self.flutter
                .activate_if_present(
                    &SemanticLocator::labeled("session-chat", "button", "chat|mensagem"),
                    Duration::from_secs(2),
                )
                .await?;
        }
        self.flutter.fill_input(&input, text).await?;
        self.press(SemanticLocator::labeled("send-message", "button", "enviar|send"))
            .await
    }

    /// Whether a chat message with `text` is visible
    pub async fn has_message(&self, text: &str) -> ProbeResult<bool> {
        self.flutter
            .is_visible_within(
                &SemanticLocator::text(regex::escape(text)),
                Duration::from_secs(5),
            )
            .await
    }

    /// Whether set `n` is marked completed
    pub async fn is_set_completed(&self, n: u32) -> ProbeResult<bool> {
        SemanticLocator::label(format!("set-completed-{n}"))
            .or_text(format!("série {n}.*complet|set {n}.*completed"))
            .is_visible(self.flutter.driver())
            .await
    }
}

#[async_trait]
impl<'d, D: SemanticsDriver + ?Sized> PageObject for WorkoutSessionPage<'d, D> {
    fn url_pattern(&self) -> &str {
        "workout|session|treino"
    }

    async fn is_displayed(&self) -> ProbeResult<bool> {
        self.flutter.has_text(SESSION_TEXT).await
    }
}
