//! Journeys end to end: mock drivers for both actors, fake backend behind them.

mod common;

use std::path::Path;

use common::{FakeBackend, FEEDBACK_CURRENT_SET, FEEDBACK_SESSION, FIRST_WORKOUT, STUDENT_NAME};
use flutter_probar::backend::BackendClient;
use flutter_probar::journey::{self, JourneyKind};
use flutter_probar::mock::{MockNode, MockSemanticsPage, SIGN_IN_ERROR};
use flutter_probar::{ProbeConfig, SemanticsDriver, Timeouts};

fn config(output: &Path) -> ProbeConfig {
    ProbeConfig {
        app_url: "http://app.test".to_string(),
        timeouts: Timeouts::fast(),
        output_dir: output.to_path_buf(),
        ..ProbeConfig::default()
    }
}

fn login_screen(home: &str) -> Vec<MockNode> {
    vec![
        MockNode::email_field(),
        MockNode::text_field("password"),
        MockNode::button("Entrar").navigates_to(home),
    ]
}

fn step_names(report: &journey::JourneyReport) -> Vec<&str> {
    report.steps.iter().map(|s| s.name.as_str()).collect()
}

mod smoke_tests {
    use super::*;

    #[tokio::test]
    async fn test_smoke_passes_and_resets() {
        let fake = FakeBackend::start().await;
        let report = journey::smoke(&BackendClient::new(&fake.url)).await;
        assert!(report.passed(), "{report:#?}");
        assert_eq!(report.journey, JourneyKind::Smoke);
        assert_eq!(
            step_names(&report),
            vec!["backend health", "seed cotraining scenario", "reset backend"]
        );
        assert_eq!(fake.resets(), 1);
    }

    #[tokio::test]
    async fn test_smoke_fails_on_error_envelope() {
        let fake = FakeBackend::start().await;
        fake.error_envelope();
        let report = journey::smoke(&BackendClient::new(&fake.url)).await;
        assert!(!report.passed());
        let failed = report.first_failure().unwrap();
        assert_eq!(failed.name, "seed cotraining scenario");
        assert!(failed.detail.as_deref().is_some_and(|d| d.contains("error")));
        assert_eq!(fake.resets(), 1);
    }

    #[tokio::test]
    async fn test_smoke_against_dead_backend() {
        let report = journey::smoke(&BackendClient::new("http://127.0.0.1:9")).await;
        assert!(!report.passed());
        assert_eq!(step_names(&report), vec!["backend health", "reset backend"]);
        assert!(report.steps.iter().all(|s| !s.passed));
    }
}

mod cotraining_tests {
    use super::*;

    fn trainer_app() -> MockSemanticsPage {
        MockSemanticsPage::new("about:blank")
            .with_screen("/login", login_screen("/trainer/dashboard"))
            .with_screen(
                "/trainer/dashboard",
                vec![
                    MockNode::text("Alunos recentes"),
                    MockNode::labeled("button", &format!("student-card-{STUDENT_NAME}")),
                ],
            )
    }

    fn student_app(with_plan: bool) -> MockSemanticsPage {
        let mut home = vec![MockNode::labeled("button", "quick-action-iniciar-treino")
            .navigates_to("/workouts/select")];
        if with_plan {
            home.insert(0, MockNode::labeled("group", "assigned-plan"));
        }
        MockSemanticsPage::new("about:blank")
            .with_screen("/login", login_screen("/student/home"))
            .with_screen("/student/home", home)
            .with_screen(
                "/workouts/select",
                vec![
                    MockNode::button(FIRST_WORKOUT).navigates_to("/workouts/workout-a/mode"),
                    MockNode::button("Treino B - Costas e Bíceps"),
                ],
            )
            .with_screen(
                "/workouts/workout-a/mode",
                vec![
                    MockNode::labeled("button", "cotraining-mode")
                        .navigates_to("/workouts/active/workout-a"),
                    MockNode::labeled("button", "start-workout-solo"),
                ],
            )
            .with_screen(
                "/workouts/active/workout-a",
                vec![MockNode::text("Aguardando personal...")],
            )
    }

    #[tokio::test]
    async fn test_cotraining_journey_passes() {
        let fake = FakeBackend::start().await;
        let out = tempfile::tempdir().unwrap();
        let trainer = trainer_app();
        let student = student_app(true);

        let report = journey::cotraining(
            &BackendClient::new(&fake.url),
            &trainer,
            &student,
            &config(out.path()),
        )
        .await;

        assert!(report.passed(), "{report:#?}");
        assert_eq!(
            step_names(&report),
            vec![
                "seed cotraining scenario",
                "trainer logs in",
                "student logs in",
                "student sees assigned plan",
                "student opens first workout",
                "student picks co-training mode",
                "backend session opened",
                "trainer dashboard reloads",
                "adjustment reaches session",
                "reset backend",
            ]
        );
        assert_eq!(
            student.activations(),
            vec![
                "Entrar",
                "quick-action-iniciar-treino",
                FIRST_WORKOUT,
                "cotraining-mode"
            ]
        );
        assert_eq!(trainer.activations(), vec!["Entrar"]);
        assert_eq!(trainer.reloads(), 1);
        assert_eq!(fake.resets(), 1);
        assert!(std::fs::read_dir(out.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_missing_plan_stops_line_and_captures_both_actors() {
        let fake = FakeBackend::start().await;
        let out = tempfile::tempdir().unwrap();
        let trainer = trainer_app();
        let student = student_app(false);

        let report = journey::cotraining(
            &BackendClient::new(&fake.url),
            &trainer,
            &student,
            &config(out.path()),
        )
        .await;

        assert!(!report.passed());
        let failed = report.first_failure().unwrap();
        assert_eq!(failed.name, "student sees assigned plan");
        assert!(failed
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("assigned plan")));
        assert_eq!(failed.screenshots.len(), 2);
        assert!(failed.screenshots.iter().all(|p| p.exists()));
        assert_eq!(
            step_names(&report).last().copied(),
            Some("reset backend")
        );
        assert_eq!(report.steps.len(), 5);
        assert_eq!(student.activations(), vec!["Entrar"]);
        assert_eq!(fake.resets(), 1);
    }

    #[tokio::test]
    async fn test_setup_failure_is_fatal() {
        let fake = FakeBackend::start().await;
        fake.fail_setup();
        let out = tempfile::tempdir().unwrap();
        let trainer = trainer_app();
        let student = student_app(true);

        let report = journey::cotraining(
            &BackendClient::new(&fake.url),
            &trainer,
            &student,
            &config(out.path()),
        )
        .await;

        assert_eq!(
            step_names(&report),
            vec!["seed cotraining scenario", "reset backend"]
        );
        assert!(!report.steps[0].passed);
        assert!(report.steps[1].passed);
        assert!(trainer.history().is_empty());
        assert!(student.history().is_empty());
    }
}

mod feedback_loop_tests {
    use super::*;

    const CHAT: &str = "Ótimo trabalho! Mantenha a postura!";

    fn trainer_app() -> MockSemanticsPage {
        MockSemanticsPage::new("about:blank")
            .with_screen("/login", login_screen("/trainer/dashboard"))
            .with_screen(
                "/trainer/dashboard",
                vec![
                    MockNode::text("Alunos recentes"),
                    MockNode::labeled("button", &format!("student-card-{STUDENT_NAME}"))
                        .navigates_to("/trainer/students/student-1"),
                ],
            )
            .with_screen(
                "/trainer/students/student-1",
                vec![MockNode::labeled("button", "join-session")
                    .navigates_to(&format!("/trainer/sessions/{FEEDBACK_SESSION}"))],
            )
            .with_screen(
                &format!("/trainer/sessions/{FEEDBACK_SESSION}"),
                vec![
                    MockNode::labeled("region", "workout-session"),
                    MockNode::labeled("button", "suggest-adjustment"),
                    MockNode::labeled("spinbutton", "suggested-weight"),
                    MockNode::labeled("textbox", "adjustment-note"),
                    MockNode::labeled("button", "send-adjustment"),
                    MockNode::labeled("status", &format!("set-completed-{FEEDBACK_CURRENT_SET}")),
                    MockNode::labeled("textbox", "message-input"),
                    MockNode::labeled("button", "send-message"),
                ],
            )
    }

    fn student_app(apply_clears: bool) -> MockSemanticsPage {
        let session = format!("/workouts/active/{FEEDBACK_SESSION}");
        let apply = if apply_clears {
            MockNode::button("Aplicar").dismisses("adjustment-notification")
        } else {
            MockNode::button("Aplicar")
        };
        MockSemanticsPage::new("about:blank")
            .with_screen("/login", login_screen("/student/home"))
            .with_screen(
                "/student/home",
                vec![MockNode::labeled("button", "continue-workout").navigates_to(&session)],
            )
            .with_screen(
                &session,
                vec![
                    MockNode::text("Treino ativo"),
                    MockNode::labeled("status", "trainer-connected"),
                    MockNode::labeled("spinbutton", "reps-input"),
                    MockNode::labeled("spinbutton", "weight-input"),
                    MockNode::button("Completar série"),
                    MockNode::labeled("alert", "adjustment-notification")
                        .with_text("Personal sugere +5 kg"),
                    apply,
                    MockNode::text(CHAT),
                ],
            )
    }

    #[tokio::test]
    async fn test_feedback_loop_journey_passes() {
        let fake = FakeBackend::start().await;
        let out = tempfile::tempdir().unwrap();
        let trainer = trainer_app();
        let student = student_app(true);

        let report = journey::feedback_loop(
            &BackendClient::new(&fake.url),
            &trainer,
            &student,
            &config(out.path()),
        )
        .await;

        assert!(report.passed(), "{report:#?}");
        assert_eq!(report.steps.len(), 11);
        let card = format!("student-card-{STUDENT_NAME}");
        assert_eq!(
            student.activations(),
            vec!["Entrar", "continue-workout", "Aplicar", "Completar série"]
        );
        assert_eq!(
            trainer.activations(),
            vec![
                "Entrar",
                card.as_str(),
                "join-session",
                "suggest-adjustment",
                "send-adjustment",
                "send-message",
            ]
        );
        assert_eq!(trainer.value_of("suggested-weight").as_deref(), Some("5"));
        assert_eq!(trainer.value_of("message-input").as_deref(), Some(CHAT));
        assert_eq!(student.value_of("reps-input").as_deref(), Some("12"));
        assert_eq!(student.value_of("weight-input").as_deref(), Some("27.5"));
        assert_eq!(fake.resets(), 1);
    }

    #[tokio::test]
    async fn test_notification_left_on_screen_fails_apply() {
        let fake = FakeBackend::start().await;
        let out = tempfile::tempdir().unwrap();
        let trainer = trainer_app();
        let student = student_app(false);

        let report = journey::feedback_loop(
            &BackendClient::new(&fake.url),
            &trainer,
            &student,
            &config(out.path()),
        )
        .await;

        assert!(!report.passed());
        let failed = report.first_failure().unwrap();
        assert_eq!(failed.name, "student applies adjustment");
        assert!(failed
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("still visible")));
        assert_eq!(failed.screenshots.len(), 2);
        assert_eq!(report.steps.len(), 9);
        assert_eq!(
            student.activations(),
            vec!["Entrar", "continue-workout", "Aplicar"]
        );
        assert_eq!(fake.resets(), 1);
    }
}

mod auth_tests {
    use super::*;

    const TRAINER_EMAIL: &str = "trainer@example.com";

    fn app(with_apple: bool) -> MockSemanticsPage {
        let mut register = vec![
            MockNode::text("Criar conta"),
            MockNode::text_field("name"),
            MockNode::email_field(),
            MockNode::text_field("password"),
            MockNode::button("Continuar com Google"),
            MockNode::button("Criar conta"),
        ];
        if with_apple {
            register.push(MockNode::button("Continuar com Apple"));
        }
        MockSemanticsPage::new("about:blank")
            .with_screen(
                "/",
                vec![
                    MockNode::button("Começar Gratuitamente").navigates_to("/user-type"),
                    MockNode::button("Já tenho uma conta").navigates_to("/login"),
                ],
            )
            .with_screen(
                "/user-type",
                vec![
                    MockNode::text("Você é..."),
                    MockNode::button("Personal Trainer"),
                    MockNode::button("Aluno"),
                    MockNode::button("Continuar").navigates_to("/register"),
                ],
            )
            .with_screen("/register", register)
            .with_screen(
                "/login",
                vec![
                    MockNode::text("Bem-vindo de volta"),
                    MockNode::email_field(),
                    MockNode::text_field("password"),
                    MockNode::button("Entrar").signs_in(TRAINER_EMAIL, "/org-selector"),
                ],
            )
    }

    #[tokio::test]
    async fn test_auth_journey_passes() {
        let fake = FakeBackend::start().await;
        let out = tempfile::tempdir().unwrap();
        let page = app(true);

        let report = journey::auth(&BackendClient::new(&fake.url), &page, &config(out.path())).await;

        assert!(report.passed(), "{report:#?}");
        assert_eq!(report.journey, JourneyKind::Auth);
        assert_eq!(
            step_names(&report),
            vec![
                "seed cotraining scenario",
                "personal trainer reaches registration",
                "registration offers social sign-in",
                "student reaches registration",
                "registration form takes input",
                "invalid credentials are rejected",
                "seeded trainer logs in",
                "reset backend",
            ]
        );
        assert_eq!(
            page.activations(),
            vec![
                "Começar Gratuitamente",
                "Personal Trainer",
                "Continuar",
                "Começar Gratuitamente",
                "Aluno",
                "Continuar",
                "Entrar",
                "Entrar",
            ]
        );
        assert_eq!(page.current_url().await.unwrap(), "http://app.test/org-selector");
        assert_eq!(fake.resets(), 1);
        assert!(std::fs::read_dir(out.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_rejected_seeded_login_fails_after_error_check() {
        let fake = FakeBackend::start().await;
        let out = tempfile::tempdir().unwrap();
        let page = app(true).with_screen(
            "/login",
            vec![
                MockNode::email_field(),
                MockNode::text_field("password"),
                MockNode::button("Entrar").signs_in("nobody@example.com", "/home"),
            ],
        );

        let report = journey::auth(&BackendClient::new(&fake.url), &page, &config(out.path())).await;

        assert!(report.step("invalid credentials are rejected").unwrap().passed);
        let failed = report.first_failure().unwrap();
        assert_eq!(failed.name, "seeded trainer logs in");
        assert_eq!(failed.screenshots.len(), 1);
        assert_eq!(page.current_url().await.unwrap(), "http://app.test/login");
        let alert = r#"flt-semantics[role="alert"]"#;
        assert_eq!(page.count(alert).await.unwrap(), 1);
        assert_eq!(
            page.snapshot(alert).await.unwrap()[0].label.as_deref(),
            Some(SIGN_IN_ERROR)
        );
        assert_eq!(fake.resets(), 1);
    }

    #[tokio::test]
    async fn test_missing_apple_button_stops_line() {
        let fake = FakeBackend::start().await;
        let out = tempfile::tempdir().unwrap();
        let page = app(false);

        let report = journey::auth(&BackendClient::new(&fake.url), &page, &config(out.path())).await;

        assert!(!report.passed());
        let failed = report.first_failure().unwrap();
        assert_eq!(failed.name, "registration offers social sign-in");
        assert_eq!(failed.screenshots.len(), 1);
        assert!(failed.screenshots[0].exists());
        assert_eq!(report.steps.len(), 4);
        assert_eq!(fake.resets(), 1);
    }
}

mod session_access_tests {
    use super::*;

    fn app(with_progress: bool) -> MockSemanticsPage {
        let mut session = vec![
            MockNode::text("Treino ativo"),
            MockNode::labeled("heading", "current-exercise").with_text("Supino Reto"),
        ];
        if with_progress {
            session.push(MockNode::text("Progresso: 1 de 4 séries"));
        }
        MockSemanticsPage::new("about:blank")
            .with_screen("/", vec![MockNode::text("Treine com seu personal")])
            .with_screen("/workouts/active/workout-a", session)
    }

    #[tokio::test]
    async fn test_session_opens_from_stored_token() {
        let fake = FakeBackend::start().await;
        let out = tempfile::tempdir().unwrap();
        let page = app(true);

        let report =
            journey::session_access(&BackendClient::new(&fake.url), &page, &config(out.path())).await;

        assert!(report.passed(), "{report:#?}");
        assert_eq!(
            step_names(&report),
            vec![
                "seed feedback-loop scenario",
                "student token stored",
                "active session opens directly",
                "current exercise shown",
                "session progress shown",
                "reset backend",
            ]
        );
        assert_eq!(
            page.local_storage(journey::AUTH_TOKEN_KEY).as_deref(),
            Some("token-student-1")
        );
        let history = page.history();
        let stored = history.iter().position(|h| h == "storage:auth_token").unwrap();
        let opened = history
            .iter()
            .position(|h| h == "navigate:http://app.test/workouts/active/workout-a")
            .unwrap();
        assert!(stored < opened);
        assert!(page.activations().is_empty());
        assert_eq!(fake.resets(), 1);
    }

    #[tokio::test]
    async fn test_missing_progress_fails_last_step() {
        let fake = FakeBackend::start().await;
        let out = tempfile::tempdir().unwrap();
        let page = app(false);

        let report =
            journey::session_access(&BackendClient::new(&fake.url), &page, &config(out.path())).await;

        let failed = report.first_failure().unwrap();
        assert_eq!(failed.name, "session progress shown");
        assert_eq!(failed.screenshots.len(), 1);
        assert_eq!(report.steps.len(), 6);
        assert_eq!(fake.resets(), 1);
    }
}
