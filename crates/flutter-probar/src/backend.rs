//! HTTP client for the backend's test-control API.
//!
//! The E2E backend exposes `/test/*` endpoints that seed scenarios, wipe the
//! database and drive co-training sessions directly, so journeys can set up
//! state without going through the UI. Every endpoint except `/test/health`
//! answers with a `{status, data}` envelope.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::join_url;
use crate::result::{ProbeError, ProbeResult};

/// Request timeout of the default client
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Scenario seeded by [`BackendClient::setup_cotraining`]
pub const COTRAINING_SCENARIO: &str = "cotraining";

/// Scenario seeded by [`BackendClient::setup_feedback_loop`]
pub const FEEDBACK_LOOP_SCENARIO: &str = "feedback_loop";

/// `GET /test/health` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// `"ok"` when the backend is ready
    pub status: String,
    /// Database flavour, `sqlite_in_memory` for the E2E server
    #[serde(default)]
    pub database: Option<String>,
}

impl<T> Envelope<T> {
    /// Whether the backend reported success
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Payload of an `ok` envelope; any other status fails with the envelope as body
fn envelope_data<T: DeserializeOwned>(
    http_status: u16,
    envelope: Envelope<serde_json::Value>,
) -> ProbeResult<T> {
    if !envelope.is_ok() {
        tracing::warn!(status = %envelope.status, http_status, "backend envelope status is not ok");
        return Err(ProbeError::Backend {
            status: http_status,
            body: serde_json::to_string(&envelope)?,
        });
    }
    Ok(serde_json::from_value(envelope.data)?)
}

impl Health {
    /// Whether the backend reports ready
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// `{status, data}` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// `"ok"` on success
    pub status: String,
    /// Payload
    pub data: T,
}

/// Seeded account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioUser {
    /// Login e-mail
    pub email: String,
    /// Login password
    pub password: String,
    /// User id
    #[serde(default)]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// API token
    #[serde(default)]
    pub token: String,
}

/// Exercise of a seeded workout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioExercise {
    /// Exercise id
    pub id: String,
    /// Exercise name
    pub name: String,
}

/// Seeded workout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioWorkout {
    /// Workout id
    pub id: String,
    /// Workout name
    pub name: String,
    /// Short label ("A", "B", ...)
    #[serde(default)]
    pub label: String,
    /// Exercises in order
    #[serde(default)]
    pub exercises: Vec<ScenarioExercise>,
}

/// Data of the `cotraining` scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CotrainingScenario {
    /// Trainer account
    pub trainer: ScenarioUser,
    /// Student account
    pub student: ScenarioUser,
    /// Organization both belong to
    #[serde(default)]
    pub organization_id: String,
    /// Plan assigned to the student
    #[serde(default)]
    pub plan_id: String,
    /// Assignment linking plan and student
    #[serde(default)]
    pub assignment_id: String,
    /// Workouts of the plan
    #[serde(default)]
    pub workouts: Vec<ScenarioWorkout>,
}

/// A finished set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSet {
    /// 1-based set number
    pub set_number: u32,
    /// Repetitions done
    pub reps: u32,
    /// Load in kilograms
    pub weight_kg: f64,
}

/// Exercise a running session is on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentExercise {
    /// Exercise id
    pub id: String,
    /// Exercise name
    pub name: String,
    /// Set in progress
    pub current_set: u32,
}

/// Session already running when the `feedback_loop` scenario is seeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSession {
    /// Session id
    pub id: String,
    /// Workout id
    pub workout_id: String,
    /// Workout name
    pub workout_name: String,
    /// Exercise in progress
    pub current_exercise: CurrentExercise,
    /// Sets done so far
    #[serde(default)]
    pub completed_sets: Vec<CompletedSet>,
    /// Sets planned for the exercise
    pub total_sets: u32,
}

/// Data of the `feedback_loop` scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackLoopScenario {
    /// Trainer account
    pub trainer: ScenarioUser,
    /// Student account
    pub student: ScenarioUser,
    /// Organization both belong to
    #[serde(default)]
    pub organization_id: String,
    /// The running session
    pub active_session: ActiveSession,
}

/// Weight suggestion sent by the trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Exercise the suggestion is for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<String>,
    /// Suggested load in kilograms
    pub weight_kg: f64,
    /// Free-text note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Chat message inside a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMessage {
    /// Author user id
    pub sender_id: String,
    /// Message text
    pub text: String,
}

/// Co-training session as the backend sees it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Session id
    pub id: String,
    /// `waiting`, `active` or `ended`
    pub status: String,
    /// Student running the workout
    pub student_id: String,
    /// Trainer, once joined
    pub trainer_id: Option<String>,
    /// Workout being run
    pub workout_id: String,
    /// Suggestions in arrival order
    pub adjustments: Vec<Adjustment>,
    /// Chat in arrival order
    pub messages: Vec<SessionMessage>,
    /// Finished sets
    pub completed_sets: Vec<CompletedSet>,
}

impl SessionState {
    /// Whether a trainer has joined
    #[must_use]
    pub fn has_trainer(&self) -> bool {
        self.trainer_id.is_some()
    }

    /// Most recent suggestion
    #[must_use]
    pub fn latest_adjustment(&self) -> Option<&Adjustment> {
        self.adjustments.last()
    }
}

#[derive(Debug, Serialize)]
struct CreateSession<'a> {
    student_id: &'a str,
    workout_id: &'a str,
}

#[derive(Debug, Serialize)]
struct JoinSession<'a> {
    trainer_id: &'a str,
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    sender_id: &'a str,
    text: &'a str,
}

/// Client for the backend's `/test/*` API
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl BackendClient {
    /// Create a client for `base_url` (e.g. `http://localhost:8001`)
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self::with_client(base_url, client)
    }

    /// Create a client around a preconfigured `reqwest::Client`
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn read<T: DeserializeOwned>(resp: reqwest::Response) -> ProbeResult<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProbeError::Backend {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }

    async fn read_data<T: DeserializeOwned>(resp: reqwest::Response) -> ProbeResult<T> {
        let status = resp.status().as_u16();
        let envelope: Envelope<serde_json::Value> = Self::read(resp).await?;
        envelope_data(status, envelope)
    }

    /// `GET /test/health`
    pub async fn health(&self) -> ProbeResult<Health> {
        let resp = self.client.get(self.url("/test/health")).send().await?;
        Self::read(resp).await
    }

    /// `POST /test/setup/{name}`; the scenario payload as raw JSON
    pub async fn setup(&self, name: &str) -> ProbeResult<serde_json::Value> {
        let resp = self
            .client
            .post(self.url(&format!("/test/setup/{name}")))
            .send()
            .await?;
        let data = Self::read_data(resp).await?;
        tracing::info!(scenario = name, "scenario seeded");
        Ok(data)
    }

    /// `POST /test/setup/{name}`, decoded into `T`
    pub async fn setup_as<T: DeserializeOwned>(&self, name: &str) -> ProbeResult<T> {
        Ok(serde_json::from_value(self.setup(name).await?)?)
    }

    /// Seed trainer, student, plan and three workouts
    pub async fn setup_cotraining(&self) -> ProbeResult<CotrainingScenario> {
        self.setup_as(COTRAINING_SCENARIO).await
    }

    /// Seed a session already in progress
    pub async fn setup_feedback_loop(&self) -> ProbeResult<FeedbackLoopScenario> {
        self.setup_as(FEEDBACK_LOOP_SCENARIO).await
    }

    /// `POST /test/reset`
    pub async fn reset(&self) -> ProbeResult<()> {
        let resp = self.client.post(self.url("/test/reset")).send().await?;
        let _: serde_json::Value = Self::read(resp).await?;
        tracing::info!("backend reset");
        Ok(())
    }

    /// Open a session for `student_id` on `workout_id`
    pub async fn create_session(
        &self,
        student_id: &str,
        workout_id: &str,
    ) -> ProbeResult<SessionState> {
        let resp = self
            .client
            .post(self.url("/test/sessions"))
            .json(&CreateSession {
                student_id,
                workout_id,
            })
            .send()
            .await?;
        Self::read_data(resp).await
    }

    /// Attach `trainer_id` to the session
    pub async fn join_session(
        &self,
        session_id: &str,
        trainer_id: &str,
    ) -> ProbeResult<SessionState> {
        let resp = self
            .client
            .post(self.url(&format!("/test/sessions/{session_id}/join")))
            .json(&JoinSession { trainer_id })
            .send()
            .await?;
        Self::read_data(resp).await
    }

    /// Send a weight suggestion
    pub async fn post_adjustment(
        &self,
        session_id: &str,
        adjustment: &Adjustment,
    ) -> ProbeResult<SessionState> {
        let resp = self
            .client
            .post(self.url(&format!("/test/sessions/{session_id}/adjustments")))
            .json(adjustment)
            .send()
            .await?;
        Self::read_data(resp).await
    }

    /// Send a chat message
    pub async fn post_message(
        &self,
        session_id: &str,
        sender_id: &str,
        text: &str,
    ) -> ProbeResult<SessionState> {
        let resp = self
            .client
            .post(self.url(&format!("/test/sessions/{session_id}/messages")))
            .json(&PostMessage { sender_id, text })
            .send()
            .await?;
        Self::read_data(resp).await
    }

    /// Record a finished set
    pub async fn post_set(&self, session_id: &str, set: &CompletedSet) -> ProbeResult<SessionState> {
        let resp = self
            .client
            .post(self.url(&format!("/test/sessions/{session_id}/sets")))
            .json(set)
            .send()
            .await?;
        Self::read_data(resp).await
    }

    /// Current state of a session
    pub async fn session(&self, session_id: &str) -> ProbeResult<SessionState> {
        let resp = self
            .client
            .get(self.url(&format!("/test/sessions/{session_id}")))
            .send()
            .await?;
        Self::read_data(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod decode_tests {
        use super::*;

        #[test]
        fn test_cotraining_scenario_decodes() {
            let json = serde_json::json!({
                "status": "ok",
                "data": {
                    "trainer": {"email": "trainer@example.com", "password": "p", "id": "t1", "name": "Tina", "token": "x"},
                    "student": {"email": "student@example.com", "password": "p", "id": "s1", "name": "Bruno", "token": "y"},
                    "organization_id": "o1",
                    "plan_id": "p1",
                    "assignment_id": "a1",
                    "workouts": [
                        {"id": "w1", "name": "Treino A", "label": "A", "exercises": [{"id": "e1", "name": "Supino"}]},
                        {"id": "w2", "name": "Treino B", "label": "B", "exercises": []},
                        {"id": "w3", "name": "Treino C", "label": "C", "exercises": []}
                    ]
                }
            });
            let envelope: Envelope<CotrainingScenario> = serde_json::from_value(json).unwrap();
            assert_eq!(envelope.data.trainer.email, "trainer@example.com");
            assert_eq!(envelope.data.workouts.len(), 3);
            assert_eq!(envelope.data.workouts[0].exercises[0].name, "Supino");
        }

        #[test]
        fn test_feedback_loop_scenario_decodes() {
            let json = serde_json::json!({
                "trainer": {"email": "t@e.com", "password": "p"},
                "student": {"email": "s@e.com", "password": "p"},
                "active_session": {
                    "id": "sess-1",
                    "workout_id": "w1",
                    "workout_name": "Treino A",
                    "current_exercise": {"id": "e1", "name": "Supino", "current_set": 3},
                    "completed_sets": [
                        {"set_number": 1, "reps": 12, "weight_kg": 25.0},
                        {"set_number": 2, "reps": 10, "weight_kg": 27.5}
                    ],
                    "total_sets": 4
                }
            });
            let scenario: FeedbackLoopScenario = serde_json::from_value(json).unwrap();
            assert_eq!(scenario.active_session.current_exercise.current_set, 3);
            assert_eq!(scenario.active_session.completed_sets[1].weight_kg, 27.5);
            assert!(scenario.trainer.token.is_empty());
        }

        #[test]
        fn test_error_envelope_is_backend_error() {
            let envelope: Envelope<serde_json::Value> = serde_json::from_value(serde_json::json!({
                "status": "error",
                "data": {"id": "s"}
            }))
            .unwrap();
            assert!(!envelope.is_ok());
            let err = envelope_data::<SessionState>(200, envelope).unwrap_err();
            match err {
                ProbeError::Backend { status, body } => {
                    assert_eq!(status, 200);
                    assert!(body.contains(r#""status":"error""#));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn test_ok_envelope_yields_data() {
            let envelope: Envelope<serde_json::Value> = serde_json::from_value(serde_json::json!({
                "status": "ok",
                "data": {"id": "s", "status": "waiting"}
            }))
            .unwrap();
            let state: SessionState = envelope_data(200, envelope).unwrap();
            assert_eq!(state.status, "waiting");
        }

        #[test]
        fn test_session_state_defaults() {
            let state: SessionState = serde_json::from_str(r#"{"id": "s"}"#).unwrap();
            assert!(!state.has_trainer());
            assert!(state.latest_adjustment().is_none());
        }

        #[test]
        fn test_adjustment_skips_empty_fields() {
            let json = serde_json::to_value(Adjustment {
                exercise_id: None,
                weight_kg: 30.0,
                note: None,
            })
            .unwrap();
            assert_eq!(json, serde_json::json!({"weight_kg": 30.0}));
        }
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = BackendClient::new("http://localhost:8001/");
        assert_eq!(client.base_url(), "http://localhost:8001");
        assert_eq!(client.url("/test/health"), "http://localhost:8001/test/health");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_http_error() {
        let client = BackendClient::new("http://127.0.0.1:9");
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, ProbeError::Http(_)));
    }
}
