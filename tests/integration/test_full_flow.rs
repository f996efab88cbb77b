// Full flow against a mock backend: restore, sign-in, author, logout

use crate::config_for;
use ancr_portal::auth::{AuthContext, GuardDecision, ProfileResolver, RouteGuard, SessionStore};
use ancr_portal::core::models::{ChurchId, NewsDraft};
use ancr_portal::infra::{
    CredentialVerifier, GoTrueClient, ObjectStore, PostgrestClient, RecordStore, StorageClient,
};
use ancr_portal::panel::PanelService;
use mockito::Matcher;
use secrecy::SecretString;
use std::sync::Arc;

const USER_ID: &str = "0a6b1e2c-8a4d-4c7e-9a3b-2f1d5e6c7a8b";

struct Flow {
    context: Arc<AuthContext>,
    panel: PanelService,
    session_file: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

fn wire(server: &mockito::ServerGuard) -> Flow {
    let dir = tempfile::TempDir::new().unwrap();
    let session_file = dir.path().join("session.json");

    let mut config = config_for(server);
    config.session_file = Some(session_file.clone());

    let verifier: Arc<dyn CredentialVerifier> = Arc::new(GoTrueClient::new(&config));
    let records: Arc<dyn RecordStore> = Arc::new(PostgrestClient::new(&config));
    let objects: Arc<dyn ObjectStore> = Arc::new(StorageClient::new(&config));

    let sessions = Arc::new(SessionStore::new(config.session_file.clone()));
    let profiles = Arc::new(ProfileResolver::new(Arc::clone(&records), &config));
    let context = Arc::new(AuthContext::new(verifier, sessions, profiles));
    let panel = PanelService::new(records, objects);

    Flow {
        context,
        panel,
        session_file,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_sign_in_author_and_logout_roundtrip() {
    let mut server = mockito::Server::new_async().await;

    let token_mock = server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::UrlEncoded("grant_type".into(), "password".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "access_token": "jwt-access",
                "refresh_token": "jwt-refresh",
                "token_type": "bearer",
                "expires_in": 3600,
                "user": { "id": USER_ID }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let profile_mock = server
        .mock("GET", "/rest/v1/profiles")
        .match_query(Matcher::UrlEncoded("id".into(), format!("eq.{}", USER_ID)))
        .match_header("Authorization", "Bearer jwt-access")
        .with_status(200)
        .with_body(
            serde_json::json!([{
                "id": USER_ID,
                "full_name": "Comunicaciones Heredia",
                "role": "iglesia",
                "district_id": null,
                "church_id": 7,
            }])
            .to_string(),
        )
        .create_async()
        .await;

    let churches_mock = server
        .mock("GET", "/rest/v1/churches")
        .match_query(Matcher::UrlEncoded("id".into(), "eq.7".into()))
        .with_status(200)
        .with_body(serde_json::json!([{ "id": 7, "name": "Heredia", "district_id": 2 }]).to_string())
        .create_async()
        .await;

    let news_mock = server
        .mock("POST", "/rest/v1/news")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "church_id": 7,
            "created_by": USER_ID,
        })))
        .with_status(201)
        .create_async()
        .await;

    let logout_mock = server
        .mock("POST", "/auth/v1/logout")
        .match_header("Authorization", "Bearer jwt-access")
        .with_status(204)
        .create_async()
        .await;

    let flow = wire(&server);
    let guard = RouteGuard::new("/login");

    // Nothing persisted yet: restore settles anonymous
    flow.context.restore().await;
    assert!(matches!(
        guard.evaluate(&flow.context.state()),
        GuardDecision::RedirectToLogin { .. }
    ));

    // Sign in and resolve the church-account profile
    flow.context
        .sign_in("heredia@ancr.test", &SecretString::new("hunter2".to_string()))
        .await
        .unwrap();
    let state = flow.context.state();
    assert_eq!(guard.evaluate(&state), GuardDecision::Allow);
    assert_eq!(state.profile.as_ref().unwrap().church_id, Some(ChurchId(7)));
    assert!(flow.session_file.exists(), "session persisted for silent restore");

    // Scope filter offers exactly the account's own church
    let churches = flow.panel.selectable_churches(&state).await.unwrap();
    assert_eq!(churches.len(), 1);
    assert_eq!(churches[0].id, ChurchId(7));

    // Untagged draft is forced to church 7 on the wire
    flow.panel
        .create_news(
            &state,
            NewsDraft {
                title: "Youth week".to_string(),
                summary: "Announcements".to_string(),
                church_id: None,
            },
        )
        .await
        .unwrap();

    // Logout revokes remotely and cleans up the persisted session
    flow.context.logout().await;
    assert!(flow.context.state().session.is_none());
    assert!(!flow.session_file.exists(), "persisted session removed on logout");

    token_mock.assert_async().await;
    profile_mock.assert_async().await;
    churches_mock.assert_async().await;
    news_mock.assert_async().await;
    logout_mock.assert_async().await;
}

#[tokio::test]
async fn test_silent_restore_reuses_persisted_session() {
    let mut server = mockito::Server::new_async().await;

    let profile_mock = server
        .mock("GET", "/rest/v1/profiles")
        .match_query(Matcher::UrlEncoded("id".into(), format!("eq.{}", USER_ID)))
        .with_status(200)
        .with_body(
            serde_json::json!([{
                "id": USER_ID,
                "full_name": "Comunicaciones Heredia",
                "role": "iglesia",
                "district_id": null,
                "church_id": 7,
            }])
            .to_string(),
        )
        .create_async()
        .await;

    let flow = wire(&server);

    // A previous run left a live session behind
    let session = ancr_portal::core::models::Session {
        access_token: "jwt-access".to_string(),
        refresh_token: "jwt-refresh".to_string(),
        user_id: uuid::Uuid::parse_str(USER_ID).unwrap(),
        expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
    };
    std::fs::write(&flow.session_file, serde_json::to_string(&session).unwrap()).unwrap();

    flow.context.restore().await;

    let state = flow.context.state();
    assert!(state.session.is_some());
    assert_eq!(state.profile.as_ref().unwrap().church_id, Some(ChurchId(7)));
    profile_mock.assert_async().await;
}
