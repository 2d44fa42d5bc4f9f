//! Page objects for the screens the journeys walk through.
//!
//! All of them follow one pattern: ordered label-first locator chains,
//! activation through [`FlutterHelper::activate`](crate::FlutterHelper::activate)
//! (pointer first, keyboard fallback), and scenario data created through the
//! backend instead of the UI.

mod dashboard;
mod login;
mod onboarding;
mod register;
mod workout_session;

pub use dashboard::{DashboardPage, HOME_ROUTE};
pub use login::{LoginPage, POST_LOGIN_ROUTE};
pub use onboarding::{Cref, ExperienceLevel, FitnessGoal, OnboardingPage};
pub use register::{RegisterPage, UserType};
pub use workout_session::{parse_adjustment_weight, WorkoutSessionPage};
