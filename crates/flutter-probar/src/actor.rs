//! One scenario user driving one browser session.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::ScenarioUser;
use crate::config::ProbeConfig;
use crate::driver::SemanticsDriver;
use crate::helper::FlutterHelper;
use crate::pages::{DashboardPage, LoginPage, WorkoutSessionPage};
use crate::result::{ProbeError, ProbeResult};

/// Which side of a co-training session an actor plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    /// Personal trainer
    Trainer,
    /// Student
    Student,
}

impl ActorRole {
    /// Lower-case name used in logs and file names
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trainer => "trainer",
            Self::Student => "student",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trainer" | "personal" => Ok(Self::Trainer),
            "student" | "aluno" => Ok(Self::Student),
            other => Err(ProbeError::Validation {
                message: format!("unknown actor role {other:?}"),
            }),
        }
    }
}

/// A scenario user bound to its own driver.
///
/// Actors never share a driver, so focus, cookies and storage of one can
/// not leak into the other.
#[derive(Debug)]
pub struct Actor<'d, D: SemanticsDriver + ?Sized> {
    role: ActorRole,
    user: ScenarioUser,
    flutter: FlutterHelper<'d, D>,
    app_url: String,
}

impl<'d, D: SemanticsDriver + ?Sized> Actor<'d, D> {
    /// Bind `user` to `driver`
    #[must_use]
    pub fn new(role: ActorRole, user: ScenarioUser, driver: &'d D, config: &ProbeConfig) -> Self {
        Self {
            role,
            user,
            flutter: FlutterHelper::new(driver, config.timeouts),
            app_url: config.app_url.clone(),
        }
    }

    /// Role played
    #[must_use]
    pub const fn role(&self) -> ActorRole {
        self.role
    }

    /// Credentials and identity
    #[must_use]
    pub const fn user(&self) -> &ScenarioUser {
        &self.user
    }

    /// The actor's own driver
    #[must_use]
    pub const fn driver(&self) -> &'d D {
        self.flutter.driver()
    }

    /// Composite helpers over the actor's driver
    #[must_use]
    pub const fn flutter(&self) -> FlutterHelper<'d, D> {
        self.flutter
    }

    /// Login screen
    #[must_use]
    pub fn login_page(&self) -> LoginPage<'d, D> {
        LoginPage::new(self.flutter, &self.app_url)
    }

    /// Home screen
    #[must_use]
    pub const fn dashboard(&self) -> DashboardPage<'d, D> {
        DashboardPage::new(self.flutter)
    }

    /// Active workout screen
    #[must_use]
    pub const fn workout_session(&self) -> WorkoutSessionPage<'d, D> {
        WorkoutSessionPage::new(self.flutter)
    }

    /// Log in with the scenario credentials and wait for the home screen
    pub async fn login(&self) -> ProbeResult<String> {
        let login = self.login_page();
        login.goto().await?;
        login.login(&self.user.email, &self.user.password).await?;
        let url = self.dashboard().wait_for_load().await?;
        tracing::info!(role = %self.role, email = %self.user.email, url = %url, "actor logged in");
        Ok(url)
    }

    /// Write a PNG of the actor's page to `dir/{stem}-{role}.png`
    pub async fn screenshot_to(&self, dir: &Path, stem: &str) -> ProbeResult<PathBuf> {
        self.flutter
            .save_screenshot(dir, &format!("{stem}-{}", self.role))
            .await
    }
}
