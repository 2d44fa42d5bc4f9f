//! Scripted end-to-end journeys.
//!
//! A journey is a sequence of named steps. Steps run in order and the first
//! failure stops the line: the failing step is recorded with its error, each
//! actor's page is captured to the output directory, and the remaining steps
//! are skipped. Backend reset runs in teardown whatever happened before it.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::actor::{Actor, ActorRole};
use crate::backend::{Adjustment, BackendClient, CotrainingScenario, FeedbackLoopScenario};
use crate::config::ProbeConfig;
use crate::driver::SemanticsDriver;
use crate::helper::FlutterHelper;
use crate::locator::SemanticLocator;
use crate::pages::{LoginPage, RegisterPage, UserType, WorkoutSessionPage, POST_LOGIN_ROUTE};
use crate::page_object::PageObject;
use crate::rendezvous::Rendezvous;
use crate::result::{ProbeError, ProbeResult};

/// Database flavour the E2E backend runs on
pub const E2E_DATABASE: &str = "sqlite_in_memory";

/// Trainer seeded by the `cotraining` scenario
pub const SEEDED_TRAINER_EMAIL: &str = "trainer@example.com";

/// Student seeded by the `cotraining` scenario
pub const SEEDED_STUDENT_EMAIL: &str = "student@example.com";

/// Workouts in the seeded plan
pub const SEEDED_WORKOUTS: usize = 3;

/// `localStorage` key the app reads its API token from
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Credentials no seeded scenario creates
const UNKNOWN_EMAIL: &str = "invalid@example.com";
const UNKNOWN_PASSWORD: &str = "wrongpassword";

/// Load suggested in the co-training journey
const COTRAINING_ADJUSTMENT_KG: f64 = 30.0;

/// Load suggested in the feedback-loop journey
const FEEDBACK_ADJUSTMENT_KG: f64 = 5.0;

/// How long an applied adjustment notification gets to leave the screen
const NOTIFICATION_CLEAR: Duration = Duration::from_secs(2);

/// Chat line sent in the feedback-loop journey
const FEEDBACK_MESSAGE: &str = "Ótimo trabalho! Mantenha a postura!";

/// Journeys the harness can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyKind {
    /// Backend health, scenario seeding and reset; no browser
    Smoke,
    /// Welcome page, login and user-type navigation
    Welcome,
    /// User-type selection into registration, rejected and accepted logins
    Auth,
    /// Two actors from login to a backend-observed adjustment
    Cotraining,
    /// Adjustment, set and chat round-trips in a running session
    FeedbackLoop,
    /// Running session opened straight from a stored student token
    SessionAccess,
}

impl JourneyKind {
    /// Every journey, in the order `run all` would use
    pub const ALL: [Self; 6] = [
        Self::Smoke,
        Self::Welcome,
        Self::Auth,
        Self::Cotraining,
        Self::FeedbackLoop,
        Self::SessionAccess,
    ];

    /// Kebab-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Smoke => "smoke",
            Self::Welcome => "welcome",
            Self::Auth => "auth",
            Self::Cotraining => "cotraining",
            Self::FeedbackLoop => "feedback-loop",
            Self::SessionAccess => "session-access",
        }
    }

    /// Whether the journey drives a browser
    #[must_use]
    pub const fn needs_browser(self) -> bool {
        !matches!(self, Self::Smoke)
    }

    /// Number of browser sessions the journey drives
    #[must_use]
    pub const fn actors(self) -> usize {
        match self {
            Self::Smoke => 0,
            Self::Welcome | Self::Auth | Self::SessionAccess => 1,
            Self::Cotraining | Self::FeedbackLoop => 2,
        }
    }
}

impl fmt::Display for JourneyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JourneyKind {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| ProbeError::Validation {
                message: format!(
                    "unknown journey {s:?} (expected one of: {})",
                    Self::ALL.map(Self::as_str).join(", ")
                ),
            })
    }
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Step name
    pub name: String,
    /// Whether the step succeeded
    pub passed: bool,
    /// Wall time spent in the step
    pub duration_ms: u64,
    /// Error on failure, or a note on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Pages captured when the step failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub screenshots: Vec<PathBuf>,
}

/// Outcome of a journey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyReport {
    /// Run identifier
    pub id: Uuid,
    /// Which journey ran
    pub journey: JourneyKind,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time, after teardown
    pub finished_at: DateTime<Utc>,
    /// Steps in execution order, teardown included
    pub steps: Vec<StepReport>,
}

impl JourneyReport {
    /// Empty report stamped with the current time
    #[must_use]
    pub fn new(journey: JourneyKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            journey,
            started_at: now,
            finished_at: now,
            steps: Vec::new(),
        }
    }

    /// Whether at least one step ran and every step passed
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.passed)
    }

    /// First failing step
    #[must_use]
    pub fn first_failure(&self) -> Option<&StepReport> {
        self.steps.iter().find(|s| !s.passed)
    }

    /// Step by name
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Sum of step durations
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.duration_ms).sum()
    }

    /// Pretty JSON
    pub fn to_json(&self) -> ProbeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write `dir/{journey}-{id}.json`
    pub async fn write_to(&self, dir: &Path) -> ProbeResult<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}-{}.json", self.journey, self.id));
        tokio::fs::write(&path, self.to_json()?).await?;
        Ok(path)
    }
}

/// Fail a step with `message` unless `condition` holds
pub fn ensure(condition: bool, message: impl Into<String>) -> ProbeResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ProbeError::assertion(message))
    }
}

/// Accumulates a [`JourneyReport`] as steps run
#[derive(Debug)]
struct Recorder {
    report: JourneyReport,
    output_dir: PathBuf,
}

impl Recorder {
    fn new(journey: JourneyKind, output_dir: &Path) -> Self {
        tracing::info!(%journey, "journey started");
        Self {
            report: JourneyReport::new(journey),
            output_dir: output_dir.to_path_buf(),
        }
    }

    fn record(&mut self, name: &str, started: Instant, outcome: Result<(), String>) {
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &outcome {
            Ok(()) => tracing::info!(step = name, duration_ms, "step passed"),
            Err(detail) => tracing::error!(step = name, duration_ms, %detail, "step failed"),
        }
        self.report.steps.push(StepReport {
            name: name.to_string(),
            passed: outcome.is_ok(),
            duration_ms,
            detail: outcome.err(),
            screenshots: Vec::new(),
        });
    }

    async fn step<T, Fut>(&mut self, name: &str, fut: Fut) -> ProbeResult<T>
    where
        Fut: Future<Output = ProbeResult<T>>,
    {
        let started = Instant::now();
        let result = fut.await;
        self.record(
            name,
            started,
            result.as_ref().map(|_| ()).map_err(ToString::to_string),
        );
        result
    }

    fn failed(&self) -> bool {
        self.report.first_failure().is_some()
    }

    /// File stem for captures of the failing step
    fn failure_stem(&self) -> Option<String> {
        let step = self.report.first_failure()?;
        let slug: String = step
            .name
            .chars()
            .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        Some(format!("{}-{slug}", self.report.journey))
    }

    fn attach(&mut self, path: PathBuf) {
        if let Some(step) = self.report.steps.iter_mut().find(|s| !s.passed) {
            step.screenshots.push(path);
        }
    }

    /// Record a body that hit the journey deadline
    fn deadline_passed(&mut self, started: Instant, ms: u64) {
        let error = ProbeError::Timeout {
            what: format!("journey {}", self.report.journey),
            ms,
        };
        self.record("journey deadline", started, Err(error.to_string()));
    }

    async fn capture_actors<D: SemanticsDriver + ?Sized>(&mut self, actors: &[&Actor<'_, D>]) {
        let Some(stem) = self.failure_stem() else {
            return;
        };
        for actor in actors {
            match actor.screenshot_to(&self.output_dir, &stem).await {
                Ok(path) => self.attach(path),
                Err(e) => tracing::warn!(role = %actor.role(), error = %e, "failure screenshot not saved"),
            }
        }
    }

    /// Screenshot a single-page journey under the failing step
    async fn capture_page<D: SemanticsDriver + ?Sized>(&mut self, flutter: FlutterHelper<'_, D>) {
        let Some(stem) = self.failure_stem() else {
            return;
        };
        match flutter.save_screenshot(&self.output_dir, &stem).await {
            Ok(path) => self.attach(path),
            Err(e) => tracing::warn!(error = %e, "failure screenshot not saved"),
        }
    }

    async fn reset(&mut self, client: &BackendClient) {
        let _ = self.step("reset backend", client.reset()).await;
    }

    fn finish(mut self) -> JourneyReport {
        self.report.finished_at = Utc::now();
        tracing::info!(
            journey = %self.report.journey,
            passed = self.report.passed(),
            steps = self.report.steps.len(),
            "journey finished"
        );
        self.report
    }
}

/// Backend health, `cotraining` seeding and reset
pub async fn smoke(client: &BackendClient) -> JourneyReport {
    let mut rec = Recorder::new(JourneyKind::Smoke, Path::new("."));
    let _ = smoke_steps(&mut rec, client).await;
    rec.reset(client).await;
    rec.finish()
}

async fn smoke_steps(rec: &mut Recorder, client: &BackendClient) -> ProbeResult<()> {
    rec.step("backend health", async {
        let health = client.health().await?;
        ensure(health.is_ok(), format!("health status is {:?}", health.status))?;
        ensure(
            health.database.as_deref() == Some(E2E_DATABASE),
            format!("database is {:?}, expected {E2E_DATABASE}", health.database),
        )
    })
    .await?;

    rec.step("seed cotraining scenario", async {
        let scenario = client.setup_cotraining().await?;
        check_cotraining_seed(&scenario)
    })
    .await
}

fn check_cotraining_seed(scenario: &CotrainingScenario) -> ProbeResult<()> {
    ensure(
        scenario.trainer.email == SEEDED_TRAINER_EMAIL,
        format!("trainer is {}", scenario.trainer.email),
    )?;
    ensure(
        scenario.student.email == SEEDED_STUDENT_EMAIL,
        format!("student is {}", scenario.student.email),
    )?;
    ensure(
        scenario.workouts.len() == SEEDED_WORKOUTS,
        format!(
            "expected {SEEDED_WORKOUTS} workouts, got {}",
            scenario.workouts.len()
        ),
    )
}

/// Welcome page calls to action and the two navigation paths out of it
pub async fn welcome<D: SemanticsDriver + ?Sized>(driver: &D, config: &ProbeConfig) -> JourneyReport {
    let mut rec = Recorder::new(JourneyKind::Welcome, &config.output_dir);
    let flutter = FlutterHelper::new(driver, config.timeouts);
    let started = Instant::now();
    let outcome = tokio::time::timeout(
        config.timeouts.test_timeout(),
        welcome_steps(&mut rec, flutter, config),
    )
    .await;
    if outcome.is_err() {
        rec.deadline_passed(started, config.timeouts.test_ms);
    }
    rec.capture_page(flutter).await;
    rec.finish()
}

async fn welcome_steps<D: SemanticsDriver + ?Sized>(
    rec: &mut Recorder,
    flutter: FlutterHelper<'_, D>,
    config: &ProbeConfig,
) -> ProbeResult<()> {
    let register = RegisterPage::new(flutter, &config.app_url);
    let cta_wait = config.timeouts.element_wait().timeout;

    rec.step("open welcome page", async {
        register.goto().await?;
        ensure(register.is_displayed().await?, "welcome page not displayed")
    })
    .await?;

    rec.step("main calls to action", async {
        for (pattern, what) in [
            ("começar gratuitamente", "start-free button"),
            ("já tenho uma conta", "already-have-account button"),
        ] {
            let cta = SemanticLocator::role_text("button", pattern);
            ensure(
                flutter.is_visible_within(&cta, cta_wait).await?,
                format!("{what} not visible"),
            )?;
        }
        Ok(())
    })
    .await?;

    rec.step("login link opens login", async {
        register.click_already_have_account().await?;
        let login = LoginPage::new(flutter, &config.app_url);
        ensure(login.is_displayed().await?, "login page not displayed")
    })
    .await?;

    rec.step("social sign-in buttons", async {
        ensure(register.is_google_button_visible().await?, "Google button not visible")?;
        ensure(register.is_apple_button_visible().await?, "Apple button not visible")
    })
    .await?;

    rec.step("start free opens user-type selection", async {
        register.goto().await?;
        register.click_start_free().await?;
        ensure(
            register.is_user_type_selection_displayed().await?,
            "user-type selection not displayed",
        )
    })
    .await
}

/// User-type selection into registration for both account types, then a
/// rejected and an accepted login against the seeded trainer
pub async fn auth<D: SemanticsDriver + ?Sized>(
    client: &BackendClient,
    driver: &D,
    config: &ProbeConfig,
) -> JourneyReport {
    let mut rec = Recorder::new(JourneyKind::Auth, &config.output_dir);
    let flutter = FlutterHelper::new(driver, config.timeouts);
    let seeded = rec
        .step("seed cotraining scenario", client.setup_cotraining())
        .await;

    if let Ok(scenario) = seeded {
        let started = Instant::now();
        let outcome = tokio::time::timeout(
            config.timeouts.test_timeout(),
            auth_steps(&mut rec, flutter, &scenario, config),
        )
        .await;
        if outcome.is_err() {
            rec.deadline_passed(started, config.timeouts.test_ms);
        }
        rec.capture_page(flutter).await;
    }

    rec.reset(client).await;
    rec.finish()
}

async fn auth_steps<D: SemanticsDriver + ?Sized>(
    rec: &mut Recorder,
    flutter: FlutterHelper<'_, D>,
    scenario: &CotrainingScenario,
    config: &ProbeConfig,
) -> ProbeResult<()> {
    let register = RegisterPage::new(flutter, &config.app_url);
    let login = LoginPage::new(flutter, &config.app_url);

    rec.step(
        "personal trainer reaches registration",
        reach_registration(&register, UserType::Personal),
    )
    .await?;

    rec.step("registration offers social sign-in", async {
        ensure(register.is_google_button_visible().await?, "Google button not visible")?;
        ensure(register.is_apple_button_visible().await?, "Apple button not visible")
    })
    .await?;

    rec.step(
        "student reaches registration",
        reach_registration(&register, UserType::Student),
    )
    .await?;

    rec.step(
        "registration form takes input",
        register.fill_registration_form("Aluno Teste", "aluno.teste@example.com", "TestPass123!"),
    )
    .await?;

    rec.step("invalid credentials are rejected", async {
        login.goto().await?;
        login.submit(UNKNOWN_EMAIL, UNKNOWN_PASSWORD).await?;
        let error = login.error_message().await?;
        ensure(error.is_some(), "no error message after invalid login")?;
        let url = flutter.driver().current_url().await?;
        ensure(
            !regex::Regex::new(POST_LOGIN_ROUTE)?.is_match(&url),
            format!("invalid login reached {url}"),
        )
    })
    .await?;

    rec.step("seeded trainer logs in", async {
        login.goto().await?;
        let url = login
            .login(&scenario.trainer.email, &scenario.trainer.password)
            .await?;
        tracing::info!(%url, "trainer landed");
        Ok(())
    })
    .await
}

/// Trainer and student from login to an adjustment the backend has seen
pub async fn cotraining<D: SemanticsDriver + ?Sized>(
    client: &BackendClient,
    trainer: &D,
    student: &D,
    config: &ProbeConfig,
) -> JourneyReport {
    let mut rec = Recorder::new(JourneyKind::Cotraining, &config.output_dir);
    let seeded = rec
        .step("seed cotraining scenario", async {
            let scenario = client.setup_cotraining().await?;
            ensure(!scenario.workouts.is_empty(), "scenario has no workouts")?;
            Ok(scenario)
        })
        .await;

    if let Ok(scenario) = seeded {
        let trainer = Actor::new(ActorRole::Trainer, scenario.trainer.clone(), trainer, config);
        let student = Actor::new(ActorRole::Student, scenario.student.clone(), student, config);
        let started = Instant::now();
        let outcome = tokio::time::timeout(
            config.timeouts.test_timeout(),
            cotraining_steps(&mut rec, client, &scenario, &trainer, &student, config),
        )
        .await;
        if outcome.is_err() {
            rec.deadline_passed(started, config.timeouts.test_ms);
        }
        if rec.failed() {
            rec.capture_actors(&[&trainer, &student]).await;
        }
    }

    rec.reset(client).await;
    rec.finish()
}

async fn cotraining_steps<D: SemanticsDriver + ?Sized>(
    rec: &mut Recorder,
    client: &BackendClient,
    scenario: &CotrainingScenario,
    trainer: &Actor<'_, D>,
    student: &Actor<'_, D>,
    config: &ProbeConfig,
) -> ProbeResult<()> {
    let workout = scenario
        .workouts
        .first()
        .ok_or_else(|| ProbeError::assertion("scenario has no workouts"))?;

    rec.step("trainer logs in", trainer.login()).await?;
    rec.step("student logs in", student.login()).await?;

    rec.step("student sees assigned plan", async {
        ensure(
            student.dashboard().has_assigned_plan().await?,
            "assigned plan not visible",
        )
    })
    .await?;

    rec.step("student opens first workout", async {
        student.dashboard().start_workout(Some(&workout.name)).await?;
        Ok(())
    })
    .await?;

    rec.step("student picks co-training mode", student.dashboard().select_training_mode(true))
        .await?;

    let session = rec
        .step("backend session opened", async {
            let session = client
                .create_session(&student.user().id, &workout.id)
                .await?;
            let joined = client.join_session(&session.id, &trainer.user().id).await?;
            ensure(joined.has_trainer(), "trainer not attached to session")?;
            Ok(joined)
        })
        .await?;

    rec.step("trainer dashboard reloads", async {
        trainer.flutter().reload().await?;
        trainer.dashboard().wait_for_load().await?;
        ensure(
            trainer.dashboard().is_displayed().await?,
            "trainer dashboard not displayed after reload",
        )
    })
    .await?;

    rec.step("adjustment reaches session", async {
        let adjustment = Adjustment {
            exercise_id: workout.exercises.first().map(|e| e.id.clone()),
            weight_kg: COTRAINING_ADJUSTMENT_KG,
            note: Some("Boa execução! Pode aumentar.".to_string()),
        };
        client.post_adjustment(&session.id, &adjustment).await?;
        Rendezvous::from_timeouts(&config.timeouts)
            .remote(client, &session.id, |s| {
                s.latest_adjustment()
                    .is_some_and(|a| (a.weight_kg - COTRAINING_ADJUSTMENT_KG).abs() < f64::EPSILON)
            })
            .await?;
        Ok(())
    })
    .await
}

/// Adjustment, completed set and chat round-trips in a running session
pub async fn feedback_loop<D: SemanticsDriver + ?Sized>(
    client: &BackendClient,
    trainer: &D,
    student: &D,
    config: &ProbeConfig,
) -> JourneyReport {
    let mut rec = Recorder::new(JourneyKind::FeedbackLoop, &config.output_dir);
    let seeded = rec
        .step("seed feedback-loop scenario", client.setup_feedback_loop())
        .await;

    if let Ok(scenario) = seeded {
        let trainer = Actor::new(ActorRole::Trainer, scenario.trainer.clone(), trainer, config);
        let student = Actor::new(ActorRole::Student, scenario.student.clone(), student, config);
        let started = Instant::now();
        let outcome = tokio::time::timeout(
            config.timeouts.test_timeout(),
            feedback_loop_steps(&mut rec, &scenario, &trainer, &student, config),
        )
        .await;
        if outcome.is_err() {
            rec.deadline_passed(started, config.timeouts.test_ms);
        }
        if rec.failed() {
            rec.capture_actors(&[&trainer, &student]).await;
        }
    }

    rec.reset(client).await;
    rec.finish()
}

async fn feedback_loop_steps<D: SemanticsDriver + ?Sized>(
    rec: &mut Recorder,
    scenario: &FeedbackLoopScenario,
    trainer: &Actor<'_, D>,
    student: &Actor<'_, D>,
    config: &ProbeConfig,
) -> ProbeResult<()> {
    let rendezvous = Rendezvous::from_timeouts(&config.timeouts);
    let active = &scenario.active_session;
    let student_session = student.workout_session();
    let trainer_session = trainer.workout_session();

    rec.step("trainer logs in", trainer.login()).await?;
    rec.step("student logs in", student.login()).await?;

    rec.step("student resumes session", async {
        if !student.dashboard().continue_workout().await? {
            let url = config.app_route(&format!("/workouts/active/{}", active.workout_id));
            student.flutter().open(&url).await?;
        }
        student_session.wait_for_load().await
    })
    .await?;

    rec.step("student sees trainer connected", async {
        let connected = SemanticLocator::label("trainer-connected")
            .or_text("personal conectado|trainer connected");
        rendezvous.ui(student.driver(), &connected, false).await?;
        Ok(())
    })
    .await?;

    rec.step("trainer joins student", async {
        let dashboard = trainer.dashboard();
        ensure(
            dashboard.has_active_student(&student.user().name).await?,
            format!("{} not among active students", student.user().name),
        )?;
        dashboard.join_student_session(&student.user().name).await?;
        trainer_session.wait_for_load().await
    })
    .await?;

    rec.step(
        "trainer sends adjustment",
        trainer_session.send_adjustment(FEEDBACK_ADJUSTMENT_KG, Some("Aumenta um pouco o peso!")),
    )
    .await?;

    rec.step("student applies adjustment", async {
        ensure(
            student_session
                .wait_for_adjustment(config.timeouts.expect_wait().timeout)
                .await?,
            "adjustment notification never arrived",
        )?;
        let weight = student_session.adjustment_weight().await?;
        ensure(
            weight.is_some_and(|w| (w - FEEDBACK_ADJUSTMENT_KG).abs() < f64::EPSILON),
            format!("notification shows {weight:?} kg"),
        )?;
        student_session.apply_adjustment().await?;
        ensure(
            student_session
                .adjustment_cleared_within(NOTIFICATION_CLEAR)
                .await?,
            "adjustment notification still visible after applying",
        )
    })
    .await?;

    let set_number = active.current_exercise.current_set;
    rec.step("trainer sees completed set", async {
        student_session.complete_set(12, 27.5).await?;
        let completed = SemanticLocator::label(format!("set-completed-{set_number}"))
            .or_text("série.*completa|set.*completed");
        rendezvous.ui(trainer.driver(), &completed, false).await?;
        Ok(())
    })
    .await?;

    rec.step("student receives chat message", async {
        trainer_session.send_message(FEEDBACK_MESSAGE).await?;
        let message = SemanticLocator::text(regex::escape(FEEDBACK_MESSAGE));
        rendezvous.ui(student.driver(), &message, false).await?;
        Ok(())
    })
    .await
}

/// Welcome, start free, pick `user_type`, continue
async fn reach_registration<D: SemanticsDriver + ?Sized>(
    register: &RegisterPage<'_, D>,
    user_type: UserType,
) -> ProbeResult<()> {
    register.goto().await?;
    register.click_start_free().await?;
    ensure(
        register.is_user_type_selection_displayed().await?,
        "user-type selection not displayed",
    )?;
    register.select_user_type(user_type).await?;
    register.click_continue().await?;
    ensure(
        register.is_registration_page_displayed().await?,
        format!("registration page not displayed for {user_type:?}"),
    )
}

/// Student opens the running session from a stored token, without the login form
pub async fn session_access<D: SemanticsDriver + ?Sized>(
    client: &BackendClient,
    driver: &D,
    config: &ProbeConfig,
) -> JourneyReport {
    let mut rec = Recorder::new(JourneyKind::SessionAccess, &config.output_dir);
    let flutter = FlutterHelper::new(driver, config.timeouts);
    let seeded = rec
        .step("seed feedback-loop scenario", client.setup_feedback_loop())
        .await;

    if let Ok(scenario) = seeded {
        let started = Instant::now();
        let outcome = tokio::time::timeout(
            config.timeouts.test_timeout(),
            session_access_steps(&mut rec, flutter, &scenario, config),
        )
        .await;
        if outcome.is_err() {
            rec.deadline_passed(started, config.timeouts.test_ms);
        }
        rec.capture_page(flutter).await;
    }

    rec.reset(client).await;
    rec.finish()
}

async fn session_access_steps<D: SemanticsDriver + ?Sized>(
    rec: &mut Recorder,
    flutter: FlutterHelper<'_, D>,
    scenario: &FeedbackLoopScenario,
    config: &ProbeConfig,
) -> ProbeResult<()> {
    let active = &scenario.active_session;
    let session = WorkoutSessionPage::new(flutter);

    rec.step("student token stored", async {
        ensure(!scenario.student.token.is_empty(), "scenario student has no token")?;
        flutter.open(&config.app_route("/")).await?;
        flutter
            .driver()
            .set_local_storage(AUTH_TOKEN_KEY, &scenario.student.token)
            .await
    })
    .await?;

    rec.step("active session opens directly", async {
        let url = config.app_route(&format!("/workouts/active/{}", active.workout_id));
        flutter.open(&url).await?;
        session.wait_for_load().await
    })
    .await?;

    rec.step("current exercise shown", async {
        let name = &active.current_exercise.name;
        let exercise = SemanticLocator::text(regex::escape(name));
        ensure(
            flutter
                .is_visible_within(&exercise, config.timeouts.expect_wait().timeout)
                .await?,
            format!("exercise {name:?} not visible"),
        )
    })
    .await?;

    rec.step("session progress shown", async {
        let progress = SemanticLocator::label("session-progress").or_text("progresso|progress");
        ensure(
            flutter
                .is_visible_within(&progress, Duration::from_secs(3))
                .await?,
            "session progress not visible",
        )
    })
    .await
}
