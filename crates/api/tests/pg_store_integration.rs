//! Join code flows against PostgreSQL.
//!
//! These need a database at `TEST_DATABASE_URL`:
//! `cargo test -p classroom-api --test pg_store_integration -- --ignored`

mod common;

use common::{create_test_pool, insert_group, insert_profile, run_migrations};
use domain::models::join_code::GenerateJoinCodeRequest;
use domain::services::{JoinCodeError, JoinCodeService, JoinCodeSettings, JoinCodeStore};
use persistence::repositories::MembershipRepository;
use persistence::PgJoinCodeStore;
use std::sync::Arc;
use uuid::Uuid;

async fn setup() -> (PgJoinCodeStore, JoinCodeService) {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let store = PgJoinCodeStore::new(pool);
    let service = JoinCodeService::new(Arc::new(store.clone()), JoinCodeSettings::default());
    (store, service)
}

fn request(group_id: Uuid, max_uses: i32) -> GenerateJoinCodeRequest {
    GenerateJoinCodeRequest {
        group_id,
        max_uses,
        expiration_days: Some(7),
    }
}

fn unique_legacy_code() -> String {
    format!("LEG{}", &Uuid::new_v4().simple().to_string()[..8]).to_uppercase()
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_generate_and_redeem() {
    let (store, service) = setup().await;
    let teacher = insert_profile(store.pool(), "teacher").await;
    let group_id = insert_group(store.pool(), teacher, None).await;

    let code = service.generate(teacher, &request(group_id, 2)).await.unwrap();
    assert_eq!(code.current_uses, 0);
    assert!(code.expires_at.is_some());

    let info = service
        .preview(Uuid::new_v4(), &code.code.to_lowercase())
        .await
        .unwrap();
    assert_eq!(info.group_id, group_id);
    assert_eq!(info.subject.as_deref(), Some("Physics"));

    let student = insert_profile(store.pool(), "student").await;
    let redemption = service.redeem(student, &code.code).await.unwrap();
    assert_eq!(redemption.group_id, group_id);
    assert!(redemption.usage_recorded);

    let err = service.redeem(student, &code.code).await.unwrap_err();
    assert!(matches!(err, JoinCodeError::AlreadyMember));

    let stored = store.find_join_code(code.id).await.unwrap().unwrap();
    assert_eq!(stored.current_uses, 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_usage_cap_is_enforced() {
    let (store, service) = setup().await;
    let teacher = insert_profile(store.pool(), "teacher").await;
    let group_id = insert_group(store.pool(), teacher, None).await;
    let code = service.generate(teacher, &request(group_id, 1)).await.unwrap();

    let first = insert_profile(store.pool(), "student").await;
    service.redeem(first, &code.code).await.unwrap();

    let second = insert_profile(store.pool(), "student").await;
    let err = service.redeem(second, &code.code).await.unwrap_err();
    assert!(matches!(err, JoinCodeError::UsageLimitReached));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_foreign_teacher_cannot_generate() {
    let (store, service) = setup().await;
    let owner = insert_profile(store.pool(), "teacher").await;
    let intruder = insert_profile(store.pool(), "teacher").await;
    let group_id = insert_group(store.pool(), owner, None).await;

    let err = service
        .generate(intruder, &request(group_id, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, JoinCodeError::Forbidden));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_legacy_backfill_is_idempotent() {
    let (store, service) = setup().await;
    let teacher = insert_profile(store.pool(), "teacher").await;
    let legacy = unique_legacy_code();
    let group_id = insert_group(store.pool(), teacher, Some(&legacy)).await;

    let first = store
        .find_or_backfill_join_code(&legacy)
        .await
        .unwrap()
        .unwrap();
    let second = store
        .find_or_backfill_join_code(&legacy)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.group_id, group_id);
    assert_eq!(first.max_uses, -1);
    assert_eq!(first.created_by, teacher);

    let student = insert_profile(store.pool(), "student").await;
    let redemption = service
        .redeem(student, &legacy.to_lowercase())
        .await
        .unwrap();
    assert_eq!(redemption.group_id, group_id);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_unknown_code_is_not_backfilled() {
    let (store, service) = setup().await;

    let err = service
        .preview(Uuid::new_v4(), &unique_legacy_code())
        .await
        .unwrap_err();
    assert!(matches!(err, JoinCodeError::CodeNotFound));
    assert!(store.ping().await.is_ok());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_redeems_never_exceed_cap() {
    let (store, service) = setup().await;
    let teacher = insert_profile(store.pool(), "teacher").await;
    let group_id = insert_group(store.pool(), teacher, None).await;
    let code = service.generate(teacher, &request(group_id, 3)).await.unwrap();

    let mut students = Vec::new();
    for _ in 0..8 {
        students.push(insert_profile(store.pool(), "student").await);
    }

    let handles: Vec<_> = students
        .into_iter()
        .map(|student| {
            let service = service.clone();
            let code = code.code.clone();
            tokio::spawn(async move { service.redeem(student, &code).await })
        })
        .collect();

    for handle in handles {
        // Individual outcomes depend on interleaving
        let _ = handle.await.unwrap();
    }

    let stored = store.find_join_code(code.id).await.unwrap().unwrap();
    assert!(stored.current_uses <= 3);

    let members = MembershipRepository::new(store.pool().clone())
        .count_members(group_id)
        .await
        .unwrap();
    assert!(members >= i64::from(stored.current_uses));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_deactivate_and_list() {
    let (store, service) = setup().await;
    let teacher = insert_profile(store.pool(), "teacher").await;
    let group_id = insert_group(store.pool(), teacher, None).await;
    let older = service.generate(teacher, &request(group_id, 5)).await.unwrap();
    let newer = service.generate(teacher, &request(group_id, 5)).await.unwrap();

    service.deactivate(teacher, group_id, older.id).await.unwrap();

    let codes = service.list_for_group(teacher, group_id).await.unwrap();
    assert_eq!(codes.len(), 2);
    assert_eq!(codes[0].id, newer.id);
    assert!(!codes[1].is_active);

    let err = service
        .redeem(Uuid::new_v4(), &older.code)
        .await
        .unwrap_err();
    assert!(matches!(err, JoinCodeError::CodeDeactivated));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_redeem_without_profile_row() {
    let (store, service) = setup().await;
    let teacher = insert_profile(store.pool(), "teacher").await;
    let group_id = insert_group(store.pool(), teacher, None).await;
    let code = service.generate(teacher, &request(group_id, 5)).await.unwrap();

    // Signed in with the auth provider but never given a profile
    let student = Uuid::new_v4();
    let redemption = service.redeem(student, &code.code).await.unwrap();
    assert_eq!(redemption.group_id, group_id);
    assert!(store.is_member(group_id, student).await.unwrap());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_unbackfilled_legacy_code_counts_as_taken() {
    let (store, _service) = setup().await;
    let teacher = insert_profile(store.pool(), "teacher").await;
    let legacy = unique_legacy_code();
    insert_group(store.pool(), teacher, Some(&legacy)).await;

    assert!(store.code_exists(&legacy).await.unwrap());
    assert!(store.code_exists(&legacy.to_lowercase()).await.unwrap());
    assert!(!store.code_exists(&unique_legacy_code()).await.unwrap());
}
