use std::sync::Arc;

use reqwest::Method;

use crate::api::{paths, HttpApiClient};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::fake_api::FakeApi;
use crate::session::{SessionStore, SESSION_HEADER};

fn client_for(session: &Arc<SessionStore>) -> HttpApiClient {
    let config = ClientConfig {
        base_url: "http://bang.local:8081/".to_string(),
        ..ClientConfig::default()
    };
    HttpApiClient::new(&config, Arc::clone(session)).expect("client")
}

#[tokio::test]
async fn token_is_read_per_request_and_sent_as_header() {
    // Arrange
    let session = Arc::new(SessionStore::in_memory());
    let auth = FakeApi::new();
    auth.user("ops", "hunter2", "tok-1");
    let client = client_for(&session);

    // Act
    let anonymous = client
        .request(Method::GET, paths::INCIDENTS)
        .build()
        .expect("request");
    session.login(&auth, "ops", "hunter2").await.expect("login");
    let authed = client
        .request(Method::DELETE, &paths::incident("abc"))
        .build()
        .expect("request");
    session.logout().expect("logout");
    let after_logout = client
        .request(Method::GET, paths::INCIDENTS)
        .build()
        .expect("request");

    // Assert
    assert!(anonymous.headers().get(SESSION_HEADER).is_none());
    assert_eq!(
        authed.headers().get(SESSION_HEADER).and_then(|v| v.to_str().ok()),
        Some("tok-1")
    );
    assert_eq!(authed.url().as_str(), "http://bang.local:8081/api/incident/abc");
    assert!(!authed.url().as_str().contains("tok-1"));
    assert!(after_logout.headers().get(SESSION_HEADER).is_none());
}

#[tokio::test]
async fn login_from_another_process_reaches_the_next_request() {
    // Arrange
    let dir = std::env::temp_dir().join(format!("bang-tests-api-shared-{}", std::process::id()));
    let file = dir.join("session.json");
    let session = Arc::new(SessionStore::open(&file));
    let client = client_for(&session);
    let auth = FakeApi::new();
    auth.user("ops", "hunter2", "tok-2");

    // Act
    let before = client
        .request(Method::GET, paths::INCIDENTS)
        .build()
        .expect("request");
    SessionStore::open(&file)
        .login(&auth, "ops", "hunter2")
        .await
        .expect("login elsewhere");
    let after = client
        .request(Method::GET, paths::INCIDENTS)
        .build()
        .expect("request");

    // Assert
    assert!(before.headers().get(SESSION_HEADER).is_none());
    assert_eq!(
        after.headers().get(SESSION_HEADER).and_then(|v| v.to_str().ok()),
        Some("tok-2")
    );

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn names_stay_inside_their_path_segment() {
    // Arrange
    let session = Arc::new(SessionStore::in_memory());
    let client = client_for(&session);

    // Act
    let policy = client
        .request(Method::POST, &paths::policy("cpu/high?x=1#frag"))
        .build()
        .expect("request");
    let incident = client
        .request(Method::DELETE, &paths::incident("db host"))
        .build()
        .expect("request");

    // Assert
    assert_eq!(
        policy.url().as_str(),
        "http://bang.local:8081/api/policy/config/cpu%2Fhigh%3Fx%3D1%23frag"
    );
    assert_eq!(policy.url().query(), None);
    assert_eq!(policy.url().fragment(), None);
    assert_eq!(incident.url().path(), "/api/incident/db%20host");
    assert_eq!(paths::version("abc123"), "api/config/version/abc123");
}

#[test]
fn auth_statuses_are_classified() {
    assert!(ApiError::from_status(401, String::new()).is_auth_failure());
    assert!(ApiError::from_status(403, String::new()).is_auth_failure());
    assert!(!ApiError::from_status(500, "boom".to_string()).is_auth_failure());
    assert!(!ApiError::Transport("refused".to_string()).is_auth_failure());
}
