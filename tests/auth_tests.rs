mod common;

use cirrus::db::duckdb_service::user_service;
use cirrus::db::entities::user::Theme;
use cirrus::services::auth_service::{hash_password, AuthManager};

#[tokio::test]
async fn register_stores_a_digest_never_the_password() {
    let (_dir, pool) = common::test_pool();
    let auth = AuthManager::load(pool.clone()).await.unwrap();

    assert!(auth.register("alice", "pw1", Theme::Light).await.unwrap());

    let user = user_service::get_user_by_username(pool.clone(), "alice".to_string())
        .await
        .unwrap()
        .expect("registered user exists");
    assert_ne!(user.password_hash, "pw1");
    assert_eq!(user.password_hash, hash_password("pw1").unwrap());
    assert_eq!(user.theme, Theme::Light);
}

#[tokio::test]
async fn blank_input_is_rejected_before_storage() {
    let (_dir, pool) = common::test_pool();
    let auth = AuthManager::load(pool.clone()).await.unwrap();

    assert!(!auth.register("", "pw1", Theme::Default).await.unwrap());
    assert!(!auth.register("   ", "pw1", Theme::Default).await.unwrap());
    assert!(!auth.register("alice", "", Theme::Default).await.unwrap());
    assert_eq!(user_service::user_count(pool.clone()).await.unwrap(), 0);
}

#[tokio::test]
async fn second_registration_of_a_username_fails() {
    let (_dir, pool) = common::test_pool();
    let auth = AuthManager::load(pool.clone()).await.unwrap();

    assert!(auth.register("alice", "pw1", Theme::Default).await.unwrap());
    assert!(!auth.register("alice", "pw2", Theme::Default).await.unwrap());
    assert_eq!(user_service::user_count(pool.clone()).await.unwrap(), 1);
}

#[tokio::test]
async fn registration_never_logs_in() {
    let (_dir, pool) = common::test_pool();
    let auth = AuthManager::load(pool.clone()).await.unwrap();

    auth.register("alice", "pw1", Theme::Default).await.unwrap();
    assert!(!auth.is_logged_in().await);
    assert!(auth.current_user().await.is_none());
}

#[tokio::test]
async fn login_succeeds_only_with_matching_credentials() {
    let (_dir, pool) = common::test_pool();
    let auth = AuthManager::load(pool.clone()).await.unwrap();
    auth.register("alice", "pw1", Theme::Default).await.unwrap();

    assert!(!auth.login("alice", "wrong").await.unwrap());
    assert!(!auth.login("nobody", "pw1").await.unwrap());
    assert!(!auth.login("", "pw1").await.unwrap());
    assert!(!auth.is_logged_in().await);

    assert!(auth.login("alice", "pw1").await.unwrap());
    assert!(auth.is_logged_in().await);
    assert_eq!(
        auth.current_user().await.map(|u| u.username),
        Some("alice".to_string())
    );

    auth.logout().await.unwrap();
    assert!(!auth.is_logged_in().await);
    assert!(auth.current_user().await.is_none());
}

#[tokio::test]
async fn logout_is_idempotent() {
    let (_dir, pool) = common::test_pool();
    let auth = AuthManager::load(pool.clone()).await.unwrap();
    auth.logout().await.unwrap();
    auth.logout().await.unwrap();
    assert!(!auth.is_logged_in().await);
}

#[tokio::test]
async fn session_survives_a_restart() {
    let (_dir, pool) = common::test_pool();

    {
        let auth = AuthManager::load(pool.clone()).await.unwrap();
        auth.register("alice", "pw1", Theme::Dark).await.unwrap();
        assert!(auth.login("alice", "pw1").await.unwrap());
    }

    let restarted = AuthManager::load(pool.clone()).await.unwrap();
    assert!(restarted.is_logged_in().await);
    let user = restarted.current_user().await.expect("restored session");
    assert_eq!(user.username, "alice");
    assert_eq!(user.theme, Theme::Dark);

    restarted.logout().await.unwrap();
    let after_logout = AuthManager::load(pool.clone()).await.unwrap();
    assert!(!after_logout.is_logged_in().await);
}

#[tokio::test]
async fn reset_password_updates_store_and_session() {
    let (_dir, pool) = common::test_pool();
    let auth = AuthManager::load(pool.clone()).await.unwrap();
    auth.register("alice", "pw1", Theme::Default).await.unwrap();
    assert!(auth.login("alice", "pw1").await.unwrap());

    assert!(!auth.reset_password("nobody", "pw2").await.unwrap());
    assert!(auth.reset_password("alice", "pw2").await.unwrap());

    // Session snapshot follows the store.
    let snapshot = auth.current_user().await.unwrap();
    assert_eq!(snapshot.password_hash, hash_password("pw2").unwrap());

    auth.logout().await.unwrap();
    assert!(!auth.login("alice", "pw1").await.unwrap());
    assert!(auth.login("alice", "pw2").await.unwrap());
}

#[tokio::test]
async fn profile_updates_require_a_session_and_write_through() {
    let (_dir, pool) = common::test_pool();
    let auth = AuthManager::load(pool.clone()).await.unwrap();
    auth.register("alice", "pw1", Theme::Default).await.unwrap();

    assert!(!auth.update_profile("Alice", "hello").await.unwrap());

    assert!(auth.login("alice", "pw1").await.unwrap());
    assert!(auth.update_profile("Alice", "hello").await.unwrap());

    let snapshot = auth.current_user().await.unwrap();
    assert_eq!(snapshot.name.as_deref(), Some("Alice"));
    assert_eq!(snapshot.bio.as_deref(), Some("hello"));

    let stored = user_service::get_user_by_username(pool.clone(), "alice".to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.name.as_deref(), Some("Alice"));
    assert_eq!(stored.bio.as_deref(), Some("hello"));
}

#[tokio::test]
async fn tracked_city_walkthrough() {
    use cirrus::db::duckdb_service::city_service;

    let (_dir, pool) = common::test_pool();
    let auth = AuthManager::load(pool.clone()).await.unwrap();

    assert!(auth.register("alice", "pw1", Theme::Default).await.unwrap());
    assert!(!auth.login("alice", "wrong").await.unwrap());
    assert!(auth.login("alice", "pw1").await.unwrap());

    let chicago = city_service::upsert_city(
        pool.clone(),
        "Chicago".to_string(),
        41.8781,
        -87.6298,
        "US".to_string(),
        None,
    )
    .await
    .unwrap();
    assert!(
        city_service::add_city_to_user(pool.clone(), "alice".to_string(), chicago.id)
            .await
            .unwrap()
    );

    let cities = city_service::get_user_cities(pool.clone(), "alice".to_string())
        .await
        .unwrap();
    assert_eq!(cities.len(), 1);
    assert_eq!(cities[0].name, "Chicago");

    assert!(
        city_service::remove_city_from_user(pool.clone(), "alice".to_string(), chicago.id)
            .await
            .unwrap()
    );
    assert!(city_service::get_user_cities(pool.clone(), "alice".to_string())
        .await
        .unwrap()
        .is_empty());
}
