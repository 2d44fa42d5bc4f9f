//! In-process fake of the backend's `/test/*` API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use flutter_probar::backend::{Adjustment, CompletedSet, SessionMessage, SessionState};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TRAINER_ID: &str = "trainer-1";
pub const STUDENT_ID: &str = "student-1";
pub const STUDENT_NAME: &str = "Bruno Silva";
pub const FIRST_WORKOUT: &str = "Treino A - Peito e Tríceps";
pub const FEEDBACK_SESSION: &str = "session-fl-1";
pub const FEEDBACK_CURRENT_SET: u32 = 2;

#[derive(Debug, Default)]
pub struct FakeState {
    pub sessions: HashMap<String, SessionState>,
    pub seeded: Vec<String>,
    pub resets: usize,
    pub fail_setup: bool,
    pub error_envelope: bool,
    next_session: usize,
}

type Shared = Arc<Mutex<FakeState>>;
type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn lock(state: &Shared) -> MutexGuard<'_, FakeState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn ok(data: impl serde::Serialize) -> Reply {
    Ok(Json(json!({ "status": "ok", "data": data })))
}

fn missing(what: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": what })))
}

fn user(id: &str, email: &str, name: &str) -> Value {
    json!({
        "id": id,
        "email": email,
        "password": "TestPass123!",
        "name": name,
        "token": format!("token-{id}"),
    })
}

pub fn cotraining_data() -> Value {
    json!({
        "trainer": user(TRAINER_ID, "trainer@example.com", "Carla Personal"),
        "student": user(STUDENT_ID, "student@example.com", STUDENT_NAME),
        "organization_id": "org-1",
        "plan_id": "plan-1",
        "assignment_id": "assign-1",
        "workouts": [
            {
                "id": "workout-a",
                "name": FIRST_WORKOUT,
                "label": "A",
                "exercises": [
                    { "id": "ex-supino", "name": "Supino Reto" },
                    { "id": "ex-triceps", "name": "Tríceps Pulley" }
                ]
            },
            { "id": "workout-b", "name": "Treino B - Costas e Bíceps", "label": "B", "exercises": [] },
            { "id": "workout-c", "name": "Treino C - Pernas", "label": "C", "exercises": [] }
        ]
    })
}

pub fn feedback_loop_data() -> Value {
    json!({
        "trainer": user(TRAINER_ID, "trainer@example.com", "Carla Personal"),
        "student": user(STUDENT_ID, "student@example.com", STUDENT_NAME),
        "organization_id": "org-1",
        "active_session": {
            "id": FEEDBACK_SESSION,
            "workout_id": "workout-a",
            "workout_name": FIRST_WORKOUT,
            "current_exercise": {
                "id": "ex-supino",
                "name": "Supino Reto",
                "current_set": FEEDBACK_CURRENT_SET
            },
            "completed_sets": [ { "set_number": 1, "reps": 12, "weight_kg": 25.0 } ],
            "total_sets": 4
        }
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "database": "sqlite_in_memory" }))
}

async fn setup(State(state): State<Shared>, Path(name): Path<String>) -> Reply {
    let mut s = lock(&state);
    if s.fail_setup {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "seeding failed" })),
        ));
    }
    let data = match name.as_str() {
        "cotraining" => cotraining_data(),
        "feedback_loop" => feedback_loop_data(),
        other => return Err(missing(&format!("unknown scenario {other}"))),
    };
    s.seeded.push(name);
    if s.error_envelope {
        return Ok(Json(json!({ "status": "error", "data": data })));
    }
    ok(data)
}

async fn reset(State(state): State<Shared>) -> Json<Value> {
    let mut s = lock(&state);
    s.sessions.clear();
    s.seeded.clear();
    s.resets += 1;
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct CreateSession {
    student_id: String,
    workout_id: String,
}

async fn create_session(State(state): State<Shared>, Json(body): Json<CreateSession>) -> Reply {
    let mut s = lock(&state);
    s.next_session += 1;
    let session = SessionState {
        id: format!("session-{}", s.next_session),
        status: "waiting".to_string(),
        student_id: body.student_id,
        workout_id: body.workout_id,
        ..SessionState::default()
    };
    s.sessions.insert(session.id.clone(), session.clone());
    ok(session)
}

fn update(state: &Shared, id: &str, apply: impl FnOnce(&mut SessionState)) -> Reply {
    let mut s = lock(state);
    let session = s
        .sessions
        .get_mut(id)
        .ok_or_else(|| missing(&format!("session {id} not found")))?;
    apply(session);
    ok(session.clone())
}

#[derive(Deserialize)]
struct JoinSession {
    trainer_id: String,
}

async fn join_session(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<JoinSession>,
) -> Reply {
    update(&state, &id, |s| {
        s.trainer_id = Some(body.trainer_id);
        s.status = "active".to_string();
    })
}

async fn post_adjustment(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Adjustment>,
) -> Reply {
    update(&state, &id, |s| s.adjustments.push(body))
}

async fn post_message(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<SessionMessage>,
) -> Reply {
    update(&state, &id, |s| s.messages.push(body))
}

async fn post_set(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<CompletedSet>,
) -> Reply {
    update(&state, &id, |s| s.completed_sets.push(body))
}

async fn session(State(state): State<Shared>, Path(id): Path<String>) -> Reply {
    update(&state, &id, |_| {})
}

/// Fake backend bound to an ephemeral localhost port
pub struct FakeBackend {
    pub url: String,
    state: Shared,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Shared::default();
        let app = Router::new()
            .route("/test/health", get(health))
            .route("/test/setup/{name}", post(setup))
            .route("/test/reset", post(reset))
            .route("/test/sessions", post(create_session))
            .route("/test/sessions/{id}", get(session))
            .route("/test/sessions/{id}/join", post(join_session))
            .route("/test/sessions/{id}/adjustments", post(post_adjustment))
            .route("/test/sessions/{id}/messages", post(post_message))
            .route("/test/sessions/{id}/sets", post(post_set))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        lock(&self.state)
    }

    pub fn resets(&self) -> usize {
        self.state().resets
    }

    pub fn fail_setup(&self) {
        self.state().fail_setup = true;
    }

    /// Answer setup with HTTP 200 but an `error` envelope status
    pub fn error_envelope(&self) {
        self.state().error_envelope = true;
    }

    pub fn session(&self, id: &str) -> Option<SessionState> {
        self.state().sessions.get(id).cloned()
    }

    /// Pre-insert the session the `feedback_loop` scenario describes
    pub fn insert_feedback_session(&self) {
        let session = SessionState {
            id: FEEDBACK_SESSION.to_string(),
            status: "active".to_string(),
            student_id: STUDENT_ID.to_string(),
            trainer_id: Some(TRAINER_ID.to_string()),
            workout_id: "workout-a".to_string(),
            ..SessionState::default()
        };
        self.state().sessions.insert(session.id.clone(), session);
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
