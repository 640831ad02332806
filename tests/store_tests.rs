mod common;

use cirrus::db::duckdb_service::{city_service, user_service};
use cirrus::db::entities::user::Theme;
use cirrus::error::AppError;
use cirrus::services::auth_service::hash_password;

async fn seed_user(pool: &cirrus::db::duckdb_service::DuckDbPool, username: &str) {
    user_service::create_user(
        pool.clone(),
        username.to_string(),
        hash_password("pw1").unwrap(),
        Theme::Default,
    )
    .await
    .expect("seed user");
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
    let (_dir, pool) = common::test_pool();
    seed_user(&pool, "alice").await;

    let err = user_service::create_user(
        pool.clone(),
        "alice".to_string(),
        hash_password("other").unwrap(),
        Theme::Light,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::UserAlreadyExists(_)));
    assert_eq!(user_service::user_count(pool.clone()).await.unwrap(), 1);
}

#[tokio::test]
async fn deleting_a_user_removes_the_row() {
    let (_dir, pool) = common::test_pool();
    seed_user(&pool, "alice").await;

    assert!(user_service::delete_user(pool.clone(), "alice".to_string())
        .await
        .unwrap());
    assert!(user_service::get_user_by_username(pool.clone(), "alice".to_string())
        .await
        .unwrap()
        .is_none());
    assert!(!user_service::delete_user(pool.clone(), "alice".to_string())
        .await
        .unwrap());
}

#[tokio::test]
async fn upsert_returns_same_id_for_same_natural_key() {
    let (_dir, pool) = common::test_pool();

    let first = city_service::upsert_city(
        pool.clone(),
        "Chicago".to_string(),
        41.8781,
        -87.6298,
        "US".to_string(),
        Some("IL".to_string()),
    )
    .await
    .unwrap();

    let second = city_service::upsert_city(
        pool.clone(),
        "Chicago".to_string(),
        41.8781,
        -87.6298,
        "US".to_string(),
        Some("IL".to_string()),
    )
    .await
    .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(
        city_service::get_all_cities(pool.clone()).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn upsert_with_new_coordinates_updates_in_place() {
    let (_dir, pool) = common::test_pool();

    let city = city_service::upsert_city(
        pool.clone(),
        "Chicago".to_string(),
        41.0,
        -87.0,
        "US".to_string(),
        Some("IL".to_string()),
    )
    .await
    .unwrap();

    let updated = city_service::upsert_city(
        pool.clone(),
        "Chicago".to_string(),
        41.8781,
        -87.6298,
        "US".to_string(),
        Some("IL".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(city.id, updated.id);

    let fetched = city_service::get_city_by_id(pool.clone(), city.id)
        .await
        .unwrap()
        .expect("city exists");
    assert_eq!(fetched.latitude, 41.8781);
    assert_eq!(fetched.longitude, -87.6298);
}

#[tokio::test]
async fn absent_and_empty_state_are_the_same_key() {
    let (_dir, pool) = common::test_pool();

    let a = city_service::upsert_city(
        pool.clone(),
        "Reykjavik".to_string(),
        64.1466,
        -21.9426,
        "IS".to_string(),
        None,
    )
    .await
    .unwrap();

    let b = city_service::upsert_city(
        pool.clone(),
        "Reykjavik".to_string(),
        64.1466,
        -21.9426,
        "IS".to_string(),
        Some("   ".to_string()),
    )
    .await
    .unwrap();

    assert_eq!(a.id, b.id);
    assert_eq!(a.state, None);

    let found = city_service::get_city_by_location(
        pool.clone(),
        "Reykjavik".to_string(),
        "IS".to_string(),
        Some("".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(found.map(|c| c.id), Some(a.id));
}

#[tokio::test]
async fn no_state_is_distinct_from_a_named_state() {
    let (_dir, pool) = common::test_pool();

    let stateless = city_service::upsert_city(
        pool.clone(),
        "Springfield".to_string(),
        0.0,
        0.0,
        "US".to_string(),
        None,
    )
    .await
    .unwrap();

    let in_illinois = city_service::upsert_city(
        pool.clone(),
        "Springfield".to_string(),
        39.7817,
        -89.6501,
        "US".to_string(),
        Some("IL".to_string()),
    )
    .await
    .unwrap();

    assert_ne!(stateless.id, in_illinois.id);
}

#[tokio::test]
async fn adding_a_city_twice_is_idempotent() {
    let (_dir, pool) = common::test_pool();
    seed_user(&pool, "alice").await;

    let city = city_service::upsert_city(
        pool.clone(),
        "Chicago".to_string(),
        41.8781,
        -87.6298,
        "US".to_string(),
        None,
    )
    .await
    .unwrap();

    assert!(city_service::add_city_to_user(pool.clone(), "alice".to_string(), city.id)
        .await
        .unwrap());
    assert!(city_service::add_city_to_user(pool.clone(), "alice".to_string(), city.id)
        .await
        .unwrap());

    let ids = city_service::get_user_city_ids(pool.clone(), "alice".to_string())
        .await
        .unwrap();
    assert_eq!(ids, vec![city.id]);
}

#[tokio::test]
async fn city_list_preserves_insertion_order() {
    let (_dir, pool) = common::test_pool();
    seed_user(&pool, "alice").await;

    let mut expected = Vec::new();
    for (name, country) in [("Oslo", "NO"), ("Lima", "PE"), ("Accra", "GH")] {
        let city = city_service::upsert_city(
            pool.clone(),
            name.to_string(),
            0.0,
            0.0,
            country.to_string(),
            None,
        )
        .await
        .unwrap();
        city_service::add_city_to_user(pool.clone(), "alice".to_string(), city.id)
            .await
            .unwrap();
        expected.push(city.id);
    }

    let ids = city_service::get_user_city_ids(pool.clone(), "alice".to_string())
        .await
        .unwrap();
    assert_eq!(ids, expected);

    let names: Vec<String> = city_service::get_user_cities(pool.clone(), "alice".to_string())
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Oslo", "Lima", "Accra"]);
}

#[tokio::test]
async fn removing_an_absent_city_succeeds_and_changes_nothing() {
    let (_dir, pool) = common::test_pool();
    seed_user(&pool, "alice").await;

    let city = city_service::upsert_city(
        pool.clone(),
        "Chicago".to_string(),
        41.8781,
        -87.6298,
        "US".to_string(),
        None,
    )
    .await
    .unwrap();
    city_service::add_city_to_user(pool.clone(), "alice".to_string(), city.id)
        .await
        .unwrap();

    assert!(
        city_service::remove_city_from_user(pool.clone(), "alice".to_string(), 9999)
            .await
            .unwrap()
    );
    let ids = city_service::get_user_city_ids(pool.clone(), "alice".to_string())
        .await
        .unwrap();
    assert_eq!(ids, vec![city.id]);

    assert!(
        city_service::remove_city_from_user(pool.clone(), "alice".to_string(), city.id)
            .await
            .unwrap()
    );
    assert!(city_service::get_user_city_ids(pool.clone(), "alice".to_string())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn adding_to_an_unknown_user_fails() {
    let (_dir, pool) = common::test_pool();
    assert!(!city_service::add_city_to_user(pool.clone(), "ghost".to_string(), 1)
        .await
        .unwrap());
}

#[tokio::test]
async fn dangling_city_ids_are_skipped_when_resolving() {
    let (_dir, pool) = common::test_pool();
    seed_user(&pool, "alice").await;

    let kept = city_service::upsert_city(
        pool.clone(),
        "Oslo".to_string(),
        59.9139,
        10.7522,
        "NO".to_string(),
        None,
    )
    .await
    .unwrap();
    let doomed = city_service::upsert_city(
        pool.clone(),
        "Lima".to_string(),
        -12.0464,
        -77.0428,
        "PE".to_string(),
        None,
    )
    .await
    .unwrap();

    for id in [kept.id, doomed.id] {
        city_service::add_city_to_user(pool.clone(), "alice".to_string(), id)
            .await
            .unwrap();
    }
    assert!(city_service::delete_city(pool.clone(), doomed.id).await.unwrap());

    let resolved = city_service::get_user_cities(pool.clone(), "alice".to_string())
        .await
        .unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].name, "Oslo");
}
