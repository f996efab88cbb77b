// Authoring tests: the scope rule runs before any record-store call

use crate::common::*;
use ancr_portal::core::errors::PortalError;
use ancr_portal::core::models::*;
use ancr_portal::panel::PanelService;
use chrono::NaiveDate;
use std::sync::Arc;

fn authed_state(profile: Profile) -> AuthState {
    AuthState {
        session: Some(test_session()),
        profile: Some(profile),
        loading: false,
    }
}

fn news(church_id: Option<i64>) -> NewsDraft {
    NewsDraft {
        title: "Youth week".to_string(),
        summary: "Announcements for the week".to_string(),
        church_id: church_id.map(ChurchId),
    }
}

fn setup(records: MockRecordStore) -> (Arc<MockRecordStore>, Arc<MockObjectStore>, PanelService) {
    let records = Arc::new(records);
    let objects = Arc::new(MockObjectStore::default());
    let panel = PanelService::new(records.clone(), objects.clone());
    (records, objects, panel)
}

#[tokio::test]
async fn test_iglesia_cannot_tag_a_foreign_church() {
    let (records, _, panel) = setup(MockRecordStore::default());
    let state = authed_state(test_profile(Role::Iglesia, None, Some(7)));

    let err = panel.create_news(&state, news(Some(9))).await.unwrap_err();

    assert!(matches!(err, PortalError::ScopeViolation(_)));
    assert_eq!(records.news_count(), 0, "rejected before any record-store call");
}

#[tokio::test]
async fn test_iglesia_tag_is_forced_to_own_church() {
    let (records, _, panel) = setup(MockRecordStore::default());
    let state = authed_state(test_profile(Role::Iglesia, None, Some(7)));

    panel.create_news(&state, news(None)).await.unwrap();

    let inserted = records.inserted_news.lock().unwrap();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].church_id, Some(ChurchId(7)));
    assert_eq!(inserted[0].created_by, test_user_id());
}

#[tokio::test]
async fn test_admin_untagged_news_inserts_with_null_church() {
    let (records, _, panel) = setup(MockRecordStore::default());
    let state = authed_state(test_profile(Role::Admin, None, None));

    panel.create_news(&state, news(None)).await.unwrap();

    let inserted = records.inserted_news.lock().unwrap();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].church_id, None, "general (association-wide) record");
}

#[tokio::test]
async fn test_pastor_must_select_a_church_in_district() {
    let records = MockRecordStore {
        churches: vec![church(1, Some(1)), church(2, Some(1)), church(9, Some(2))],
        ..Default::default()
    };
    let (records, _, panel) = setup(records);
    let state = authed_state(test_profile(Role::Pastor, Some(1), None));

    // No selection
    assert!(panel.create_news(&state, news(None)).await.is_err());
    // Outside the district
    assert!(panel.create_news(&state, news(Some(9))).await.is_err());
    assert_eq!(records.news_count(), 0);

    // Inside the district
    panel.create_news(&state, news(Some(2))).await.unwrap();
    let inserted = records.inserted_news.lock().unwrap();
    assert_eq!(inserted[0].church_id, Some(ChurchId(2)));
}

#[tokio::test]
async fn test_pastor_blocked_while_church_list_unavailable() {
    let records = MockRecordStore {
        churches_should_fail: true,
        ..Default::default()
    };
    let (records, _, panel) = setup(records);
    let state = authed_state(test_profile(Role::Pastor, Some(1), None));

    let err = panel.create_news(&state, news(Some(1))).await.unwrap_err();

    assert!(matches!(err, PortalError::ScopeViolation(_)));
    assert_eq!(records.news_count(), 0);
}

#[tokio::test]
async fn test_pastor_without_district_cannot_author() {
    let (records, _, panel) = setup(MockRecordStore::default());
    let state = authed_state(test_profile(Role::Pastor, None, None));

    assert!(panel.create_news(&state, news(Some(1))).await.is_err());
    assert_eq!(records.news_count(), 0);
}

#[tokio::test]
async fn test_roleless_session_cannot_author() {
    let (records, _, panel) = setup(MockRecordStore::default());
    let state = AuthState {
        session: Some(test_session()),
        profile: None,
        loading: false,
    };

    let err = panel.create_news(&state, news(None)).await.unwrap_err();

    assert!(matches!(err, PortalError::ScopeViolation(_)));
    assert_eq!(records.news_count(), 0);
}

#[tokio::test]
async fn test_loading_state_cannot_author() {
    let (_, _, panel) = setup(MockRecordStore::default());
    let state = AuthState {
        session: Some(test_session()),
        profile: Some(test_profile(Role::Admin, None, None)),
        loading: true,
    };

    let err = panel.create_news(&state, news(None)).await.unwrap_err();
    assert!(matches!(err, PortalError::NotAuthenticated));
}

#[tokio::test]
async fn test_event_tag_scoped_like_news() {
    let (records, _, panel) = setup(MockRecordStore::default());
    let state = authed_state(test_profile(Role::Iglesia, None, Some(4)));

    let draft = EventDraft {
        title: "Vigil".to_string(),
        description: None,
        date: NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(),
        place: "Main hall".to_string(),
        church_id: None,
    };
    panel.create_event(&state, draft).await.unwrap();

    let inserted = records.inserted_events.lock().unwrap();
    assert_eq!(inserted[0].church_id, Some(ChurchId(4)));
}

#[tokio::test]
async fn test_upload_failure_aborts_resource_insert() {
    let records = Arc::new(MockRecordStore::default());
    let objects = Arc::new(MockObjectStore {
        upload_should_fail: true,
        ..Default::default()
    });
    let panel = PanelService::new(records.clone(), objects.clone());
    let state = authed_state(test_profile(Role::Admin, None, None));

    let draft = ResourceDraft {
        title: "Study guide".to_string(),
        description: None,
        category: Some("Guides".to_string()),
        source: ResourceSource::Upload {
            file_name: "guide.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: vec![1, 2, 3],
        },
    };
    let err = panel.create_resource(&state, draft).await.unwrap_err();

    assert!(matches!(err, PortalError::Upload(_)));
    assert!(
        records.inserted_resources.lock().unwrap().is_empty(),
        "no insert without a complete public URL"
    );
}

#[tokio::test]
async fn test_uploaded_resource_row_carries_public_url() {
    let (records, objects, panel) = setup(MockRecordStore::default());
    let state = authed_state(test_profile(Role::Admin, None, None));

    let draft = ResourceDraft {
        title: "Songbook".to_string(),
        description: Some("Chords included".to_string()),
        category: Some("Music".to_string()),
        source: ResourceSource::Upload {
            file_name: "songbook.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: vec![7; 16],
        },
    };
    panel.create_resource(&state, draft).await.unwrap();

    let uploads = objects.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].ends_with("_songbook.pdf"));

    let inserted = records.inserted_resources.lock().unwrap();
    assert_eq!(inserted[0].url, format!("https://cdn.test/{}", uploads[0]));
}

#[tokio::test]
async fn test_non_admin_cannot_publish_resources() {
    let (records, _, panel) = setup(MockRecordStore::default());
    let state = authed_state(test_profile(Role::Pastor, Some(1), None));

    let draft = ResourceDraft {
        title: "Study guide".to_string(),
        description: None,
        category: None,
        source: ResourceSource::Url("https://example.test/guide.pdf".to_string()),
    };
    let err = panel.create_resource(&state, draft).await.unwrap_err();

    assert!(matches!(err, PortalError::ScopeViolation(_)));
    assert!(records.inserted_resources.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_selectable_churches_surfaces_load_failure() {
    let records = MockRecordStore {
        churches_should_fail: true,
        ..Default::default()
    };
    let (_, _, panel) = setup(records);
    let state = authed_state(test_profile(Role::Pastor, Some(1), None));

    let err = panel.selectable_churches(&state).await.unwrap_err();
    assert!(err.is_retryable(), "a failed church load is a retryable condition");
}

#[tokio::test]
async fn test_selectable_churches_follow_the_rule_table() {
    let records = MockRecordStore {
        churches: vec![church(1, Some(1)), church(2, Some(1)), church(3, Some(2))],
        ..Default::default()
    };
    let (_, _, panel) = setup(records);

    let admin = authed_state(test_profile(Role::Admin, None, None));
    assert_eq!(panel.selectable_churches(&admin).await.unwrap().len(), 3);

    let pastor = authed_state(test_profile(Role::Pastor, Some(1), None));
    assert_eq!(panel.selectable_churches(&pastor).await.unwrap().len(), 2);

    let iglesia = authed_state(test_profile(Role::Iglesia, None, Some(3)));
    let visible = panel.selectable_churches(&iglesia).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, ChurchId(3));

    let unscoped = authed_state(test_profile(Role::Pastor, None, None));
    assert!(panel.selectable_churches(&unscoped).await.unwrap().is_empty());
}
