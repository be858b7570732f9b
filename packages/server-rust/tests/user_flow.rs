//! End-to-end scenarios through the full decoration pipeline, backed by the
//! in-memory store and the broadcast notifier.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use proptest::prelude::*;
use roster_core::{
    CreateUserRequest, DeleteUserRequest, GetUsersRequest, UpdateUserRequest, UserEnvelope,
    UserFields, DEFAULT_PAGE_LIMIT,
};
use roster_server::notify::{ChannelNotifier, EnvelopeHandler, Notifier, Subscription};
use roster_server::repository::{MemoryUserRepository, UserRepository};
use roster_server::service::{
    build_operation_pipeline, ErrorKind, Protocol, ServiceConfig, UserClient, UserService,
};
use roster_server::store::MemoryStore;
use roster_server::{ErrorReport, ErrorReporter};
use tokio::sync::mpsc;

#[derive(Default)]
struct Reports(Mutex<Vec<ErrorReport>>);

impl ErrorReporter for Reports {
    fn capture(&self, report: ErrorReport) {
        self.0.lock().push(report);
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    repo: Arc<MemoryUserRepository>,
    notifier: Arc<ChannelNotifier>,
    reports: Arc<Reports>,
    client: UserClient,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    fn with_config(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let repo = Arc::new(MemoryUserRepository::new(
            Arc::clone(&store),
            Duration::from_secs(60),
        ));
        let notifier = Arc::new(ChannelNotifier::new("roster_user_updated"));
        let reports = Arc::new(Reports::default());

        let core = Arc::new(UserService::new(
            repo.clone(),
            notifier.clone(),
            config.clone(),
        ));
        let pipeline = build_operation_pipeline(core, &config, reports.clone());
        let client = UserClient::new(pipeline, config.default_operation_timeout_ms);

        Self {
            store,
            repo,
            notifier,
            reports,
            client,
        }
    }

    async fn subscribe(&self) -> (Subscription, mpsc::UnboundedReceiver<UserEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler: EnvelopeHandler = Arc::new(move |env: UserEnvelope| {
            let _ = tx.send(env);
        });
        let sub = self.notifier.subscribe(handler).await.unwrap();
        (sub, rx)
    }

    async fn create(&self, nickname: &str) -> String {
        self.client
            .create_user(
                self.client.context(Protocol::Internal),
                create_req(nickname, "p", "p"),
            )
            .await
            .unwrap()
            .id
    }

    async fn list(&self, req: GetUsersRequest) -> Result<Vec<String>, ErrorKind> {
        self.client
            .get_users(self.client.context(Protocol::Internal), req)
            .await
            .map(|resp| resp.0.into_iter().map(|user| user.nickname).collect())
            .map_err(|err| err.kind())
    }
}

fn create_req(nickname: &str, password: &str, confirm: &str) -> CreateUserRequest {
    CreateUserRequest {
        fields: UserFields {
            nickname: nickname.to_string(),
            password: password.to_string(),
            ..UserFields::default()
        },
        password_confirm: confirm.to_string(),
    }
}

fn rename(id: &str, nickname: &str) -> UpdateUserRequest {
    UpdateUserRequest {
        id: id.to_string(),
        fields: UserFields {
            nickname: nickname.to_string(),
            ..UserFields::default()
        },
        ..UpdateUserRequest::default()
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_then_update_notifies_subscriber() {
    let h = Harness::new();
    let (_sub, mut rx) = h.subscribe().await;

    let id = h.create("alice").await;
    assert!(!id.is_empty());

    let status = h
        .client
        .update_user(h.client.context(Protocol::Internal), rename(&id, "alice2"))
        .await
        .unwrap();
    assert!(status.status);

    let env = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("envelope within the wait window")
        .unwrap();
    assert_eq!(env.id, id);
    assert_eq!(env.nickname, "alice2");
    assert!(env.email.is_empty());

    // Exactly one envelope per successful update.
    let extra = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(extra.is_err());

    let names = h.list(GetUsersRequest::default()).await.unwrap();
    assert_eq!(names, vec!["alice2"]);
}

#[tokio::test]
async fn update_of_missing_user_is_not_found_and_silent() {
    let h = Harness::new();
    let (_sub, mut rx) = h.subscribe().await;

    let err = h
        .client
        .update_user(h.client.context(Protocol::Internal), rename("missing", "x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let waited = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(waited.is_err(), "no notification for a failed update");
}

#[tokio::test]
async fn publish_failure_never_reaches_the_caller() {
    let h = Harness::new();
    let id = h.create("bob").await;

    h.notifier.set_connected(false);
    let status = h
        .client
        .update_user(h.client.context(Protocol::Internal), rename(&id, "bobby"))
        .await
        .unwrap();
    assert!(status.status);
    assert_eq!(h.list(GetUsersRequest::default()).await.unwrap(), vec!["bobby"]);
}

#[tokio::test]
async fn delete_missing_then_existing() {
    let h = Harness::new();
    let id = h.create("carol").await;

    let err = h
        .client
        .delete_user(
            h.client.context(Protocol::Internal),
            DeleteUserRequest {
                id: "missing-id".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    h.client
        .delete_user(h.client.context(Protocol::Internal), DeleteUserRequest { id })
        .await
        .unwrap();
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn password_mismatch_never_reaches_storage() {
    let h = Harness::new();
    // Any store call would now fail as Unavailable.
    h.store.set_failing(true);

    let err = h
        .client
        .create_user(h.client.context(Protocol::Internal), create_req("dave", "a", "b"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert!(h.store.is_empty());
    assert!(h.reports.0.lock().is_empty(), "validation errors are not reported");
}

#[tokio::test]
async fn page_limit_defaults_and_ceiling() {
    let h = Harness::new();
    for n in 0..60 {
        h.create(&format!("user{n}")).await;
    }

    let page = h.list(GetUsersRequest::default()).await.unwrap();
    assert_eq!(page.len(), DEFAULT_PAGE_LIMIT as usize);

    h.store.set_failing(true);
    let err = h
        .list(GetUsersRequest {
            limit: 501,
            ..GetUsersRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err, ErrorKind::ValidationFailed);
}

#[tokio::test]
async fn default_page_is_capped_by_a_lower_ceiling() {
    let h = Harness::with_config(ServiceConfig {
        max_page_limit: 20,
        ..ServiceConfig::default()
    });
    for n in 0..30 {
        h.create(&format!("user{n}")).await;
    }

    let page = h.list(GetUsersRequest::default()).await.unwrap();
    assert_eq!(page.len(), 20);
}

#[tokio::test]
async fn filters_are_conjunctive() {
    let h = Harness::new();
    for (nickname, country) in [("a", "NZ"), ("b", "NZ"), ("c", "UK")] {
        h.client
            .create_user(
                h.client.context(Protocol::Internal),
                CreateUserRequest {
                    fields: UserFields {
                        nickname: nickname.to_string(),
                        country: country.to_string(),
                        ..UserFields::default()
                    },
                    password_confirm: String::new(),
                },
            )
            .await
            .unwrap();
    }

    let mut req = GetUsersRequest::default();
    req.set_filter("country", "NZ".to_string()).unwrap();
    assert_eq!(h.list(req.clone()).await.unwrap(), vec!["a", "b"]);

    req.set_filter("nickname", "b".to_string()).unwrap();
    assert_eq!(h.list(req).await.unwrap(), vec!["b"]);
}

#[tokio::test]
async fn store_failure_is_unavailable_and_reported() {
    let h = Harness::new();
    h.store.set_failing(true);

    let err = h.list(GetUsersRequest::default()).await.unwrap_err();
    assert_eq!(err, ErrorKind::Unavailable);

    let reports = h.reports.0.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].tag_value("operation"), Some("GetUsers"));
    assert_eq!(reports[0].tag_value("code"), Some("503"));
}

#[tokio::test]
async fn readiness_follows_probe_not_requests() {
    let h = Harness::new();
    h.store.set_failing(true);
    for _ in 0..5 {
        assert!(h.list(GetUsersRequest::default()).await.is_err());
    }
    assert!(h.repo.is_ready(), "failed requests leave readiness alone");

    h.store.set_reachable(false);
    assert_eq!(h.repo.readiness().check_now().await, Some(false));
    assert!(!h.repo.is_ready());

    h.store.set_reachable(true);
    assert_eq!(h.repo.readiness().check_now().await, Some(true));
    assert!(h.repo.is_ready());

    h.repo.close().await;
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn created_ids_are_unique(count in 1usize..40) {
        let ids = runtime().block_on(async {
            let h = Harness::new();
            let mut ids = Vec::with_capacity(count);
            for n in 0..count {
                ids.push(h.create(&format!("u{n}")).await);
            }
            ids
        });

        prop_assert!(ids.iter().all(|id| !id.is_empty()));
        let unique: HashSet<_> = ids.iter().collect();
        prop_assert_eq!(unique.len(), count);
    }

    #[test]
    fn unfiltered_page_is_a_window(total in 0usize..30, limit in 1u32..12, offset in 0u32..35) {
        let page = runtime().block_on(async {
            let h = Harness::new();
            for n in 0..total {
                h.create(&format!("u{n:02}")).await;
            }
            h.list(GetUsersRequest { limit, offset, ..GetUsersRequest::default() })
                .await
                .unwrap()
        });

        let start = offset.max(1) as usize - 1;
        let expected: Vec<String> = (0..total)
            .skip(start)
            .take(limit as usize)
            .map(|n| format!("u{n:02}"))
            .collect();
        prop_assert!(page.len() <= limit as usize);
        prop_assert_eq!(page, expected);
    }
}
