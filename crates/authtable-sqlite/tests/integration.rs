//! Integration tests for the authtable-sqlite crate.
//!
//! These tests drive the full adapter facade against SQLite tables on disk
//! (via tempfile), with both canonical and remapped column names.

use std::sync::Arc;

use authtable_core::{
    AdapterConfig, AuthAdapter, AuthError, AuthStore, ColumnMap, ColumnMaps, Filter, Key, Session,
    Table, UserAttributes, UserField,
};
use authtable_sqlite::{AuthSchemas, ColumnDef, Database, SqliteTable};
use serde_json::{Value, json};
use tempfile::TempDir;

type SqliteAdapter = AuthAdapter<SqliteTable, SqliteTable, SqliteTable>;

struct Harness {
    _dir: TempDir,
    adapter: SqliteAdapter,
    users: SqliteTable,
    sessions: SqliteTable,
    keys: SqliteTable,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn harness_with(columns: ColumnMaps) -> Harness {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("auth.db")).unwrap();

    let schemas = AuthSchemas::new(&columns)
        .with_user_column(ColumnDef::text("username").nullable())
        .with_user_column(ColumnDef::text("email").nullable())
        .with_user_column(ColumnDef::real("score").nullable());
    schemas.create_all(&db).await.unwrap();

    let users = SqliteTable::new(db.clone(), schemas.user);
    let sessions = SqliteTable::new(db.clone(), schemas.session);
    let keys = SqliteTable::new(db, schemas.key);
    let adapter = AuthAdapter::with_columns(
        Arc::new(users.clone()),
        Arc::new(sessions.clone()),
        Arc::new(keys.clone()),
        columns,
    );

    Harness {
        _dir: dir,
        adapter,
        users,
        sessions,
        keys,
    }
}

async fn harness() -> Harness {
    harness_with(ColumnMaps::default()).await
}

fn attrs(value: Value) -> UserAttributes {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn session(id: &str, user_id: &str) -> Session {
    Session {
        id: id.into(),
        user_id: user_id.into(),
        active_expires: 1_700_000_000_000,
        idle_expires: 1_700_001_000_000,
    }
}

fn key(id: &str, user_id: &str, primary: bool, hashed_password: Option<&str>) -> Key {
    Key {
        id: id.into(),
        user_id: user_id.into(),
        primary_key: primary,
        hashed_password: hashed_password.map(str::to_string),
        expires: None,
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Sessions
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn session_and_user_are_joined() {
    let h = harness().await;
    let user = h
        .adapter
        .set_user("u1", attrs(json!({"username": "alice"})), None)
        .await
        .unwrap();
    h.adapter.set_session(&session("s1", "u1")).await.unwrap();

    let joined = h.adapter.get_session_and_user("s1").await.unwrap().unwrap();
    assert_eq!(joined.user, user);
    assert_eq!(joined.session, session("s1", "u1"));
}

#[tokio::test]
async fn session_for_unknown_user_is_rejected() {
    let h = harness().await;
    let err = h.adapter.set_session(&session("s1", "ghost")).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidUserId { .. }));
    assert!(h.adapter.get_session("s1").await.unwrap().is_none());
    assert_eq!(h.sessions.count_all().await.unwrap(), 0);
}

#[tokio::test]
async fn duplicate_session_id_keeps_original_row() {
    let h = harness().await;
    h.adapter.set_user("u1", UserAttributes::new(), None).await.unwrap();
    h.adapter.set_session(&session("s1", "u1")).await.unwrap();

    let mut again = session("s1", "u1");
    again.active_expires = 5;
    let err = h.adapter.set_session(&again).await.unwrap_err();
    assert_eq!(err.code(), "AUTH_DUPLICATE_SESSION_ID");

    let stored = h.adapter.get_session("s1").await.unwrap().unwrap();
    assert_eq!(stored, session("s1", "u1"));
}

#[tokio::test]
async fn sessions_by_user_and_bulk_deletes() {
    let h = harness().await;
    for user in ["u1", "u2"] {
        h.adapter.set_user(user, UserAttributes::new(), None).await.unwrap();
    }
    for (id, user) in [("s1", "u1"), ("s2", "u1"), ("s3", "u2")] {
        h.adapter.set_session(&session(id, user)).await.unwrap();
    }

    assert_eq!(h.adapter.get_sessions_by_user_id("u1").await.unwrap().len(), 2);
    assert!(h.adapter.get_sessions_by_user_id("u9").await.unwrap().is_empty());

    h.adapter.delete_session(&["s1", "s3", "missing"]).await.unwrap();
    let remaining = h.adapter.get_sessions_by_user_id("u1").await.unwrap();
    assert_eq!(remaining, vec![session("s2", "u1")]);

    h.adapter.delete_sessions_by_user_id("u1").await.unwrap();
    assert_eq!(h.sessions.count_all().await.unwrap(), 0);
}

// ═══════════════════════════════════════════════════════════════════════
//  Keys
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn user_with_key_round_trips_exactly() {
    let h = harness().await;
    let k1 = key("k1", "u1", true, Some("h1"));
    h.adapter
        .set_user("u1", UserAttributes::new(), Some(k1.clone()))
        .await
        .unwrap();

    let stored = h.adapter.get_key("k1").await.unwrap().unwrap();
    assert_eq!(stored, k1);
    assert_eq!(
        serde_json::to_value(&stored).unwrap(),
        json!({
            "id": "k1",
            "user_id": "u1",
            "primary_key": true,
            "hashed_password": "h1",
            "expires": null
        })
    );
}

#[tokio::test]
async fn primary_key_survives_non_primary_delete() {
    let h = harness().await;
    h.adapter
        .set_user("u1", UserAttributes::new(), Some(key("k1", "u1", true, Some("h1"))))
        .await
        .unwrap();
    h.adapter.set_key(&key("k2", "u1", false, None)).await.unwrap();

    h.adapter.delete_non_primary_key("k1").await.unwrap();
    h.adapter.delete_non_primary_key("k2").await.unwrap();

    assert!(h.adapter.get_key("k1").await.unwrap().is_some());
    assert!(h.adapter.get_key("k2").await.unwrap().is_none());
}

#[tokio::test]
async fn key_errors_follow_the_taxonomy() {
    let h = harness().await;
    let err = h.adapter.set_key(&key("k1", "ghost", true, None)).await.unwrap_err();
    assert_eq!(err.code(), "AUTH_INVALID_USER_ID");

    h.adapter.set_user("u1", UserAttributes::new(), None).await.unwrap();
    h.adapter.set_key(&key("k1", "u1", true, None)).await.unwrap();
    let err = h.adapter.set_key(&key("k1", "u1", false, None)).await.unwrap_err();
    assert_eq!(err.code(), "AUTH_DUPLICATE_KEY_ID");
    assert!(h.adapter.get_key("k1").await.unwrap().unwrap().primary_key);
}

#[tokio::test]
async fn password_update_and_user_key_cleanup() {
    let h = harness().await;
    h.adapter
        .set_user("u1", UserAttributes::new(), Some(key("k1", "u1", true, Some("h1"))))
        .await
        .unwrap();
    h.adapter.set_key(&key("k2", "u1", false, None)).await.unwrap();

    h.adapter.update_key_password("k1", Some("h2")).await.unwrap();
    let k1 = h.adapter.get_key("k1").await.unwrap().unwrap();
    assert_eq!(k1.hashed_password.as_deref(), Some("h2"));
    assert!(k1.primary_key);

    h.adapter.update_key_password("k1", None).await.unwrap();
    assert!(h.adapter.get_key("k1").await.unwrap().unwrap().hashed_password.is_none());

    assert_eq!(h.adapter.get_keys_by_user_id("u1").await.unwrap().len(), 2);
    h.adapter.delete_keys_by_user_id("u1").await.unwrap();
    assert!(h.adapter.get_keys_by_user_id("u1").await.unwrap().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
//  Users
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn attribute_update_changes_only_supplied_fields() {
    let h = harness().await;
    h.adapter
        .set_user("u1", attrs(json!({"username": "alice", "email": "a@example.com"})), None)
        .await
        .unwrap();

    h.adapter
        .update_user_attributes("u1", attrs(json!({"username": "bob"})))
        .await
        .unwrap();

    let user = h.adapter.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.attributes["username"], json!("bob"));
    assert_eq!(user.attributes["email"], json!("a@example.com"));
}

#[tokio::test]
async fn real_attribute_column_keeps_fractions() {
    let h = harness().await;
    h.adapter
        .set_user("u1", attrs(json!({"score": 1.5})), None)
        .await
        .unwrap();
    h.adapter
        .update_user_attributes("u1", attrs(json!({"score": 2.25})))
        .await
        .unwrap();

    let user = h.adapter.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.attributes["score"], json!(2.25));
    assert_eq!(user.attributes["username"], Value::Null);
}

#[tokio::test]
async fn delete_user_does_not_cascade() {
    let h = harness().await;
    h.adapter
        .set_user("u1", UserAttributes::new(), Some(key("k1", "u1", true, None)))
        .await
        .unwrap();
    h.adapter.set_session(&session("s1", "u1")).await.unwrap();

    h.adapter.delete_user("u1").await.unwrap();
    h.adapter.delete_user("u1").await.unwrap();

    assert!(h.adapter.get_user("u1").await.unwrap().is_none());
    assert_eq!(h.sessions.count_all().await.unwrap(), 1);
    assert_eq!(h.keys.count_all().await.unwrap(), 1);
    assert!(h.adapter.get_session_and_user("s1").await.unwrap().is_none());
}

#[tokio::test]
async fn rejected_key_leaves_user_without_it() {
    let h = harness().await;
    h.adapter
        .set_user("u1", UserAttributes::new(), Some(key("k1", "u1", true, None)))
        .await
        .unwrap();

    let err = h
        .adapter
        .set_user("u2", UserAttributes::new(), Some(key("k1", "u2", true, None)))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DuplicateKeyId { .. }));

    // No rollback: the second user row stays.
    assert!(h.adapter.get_user("u2").await.unwrap().is_some());
    assert!(h.adapter.get_keys_by_user_id("u2").await.unwrap().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
//  Column remapping
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn remapped_user_id_stays_canonical() {
    let columns = ColumnMaps::default()
        .with_user(ColumnMap::with_overrides([(UserField::Id, "user_pk")]).unwrap());
    let h = harness_with(columns).await;

    h.adapter.set_user("u1", UserAttributes::new(), None).await.unwrap();

    let user = h.adapter.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.id, "u1");
    assert!(user.attributes.values().all(Value::is_null));

    let by_storage_name = Filter::Eq {
        column: "user_pk".into(),
        value: json!("u1"),
    };
    assert_eq!(h.users.count_where(&by_storage_name).await.unwrap(), 1);

    // The id column is not writable through attributes under its storage name.
    h.adapter
        .update_user_attributes("u1", attrs(json!({"user_pk": "u9", "username": "bob"})))
        .await
        .unwrap();
    assert!(h.adapter.get_user("u9").await.unwrap().is_none());
    let user = h.adapter.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.attributes["username"], json!("bob"));
}

#[tokio::test]
async fn config_driven_remapping_persists_across_reopen() {
    init_tracing();
    let config = AdapterConfig::from_toml_str(
        r#"
        [columns.user]
        id = "user_pk"

        [columns.session]
        id = "session_token"
        user_id = "owner"

        [columns.key]
        primary_key = "is_primary"
        hashed_password = "password_hash"
        "#,
    )
    .unwrap();
    let columns = config.column_maps().unwrap();
    let schemas = AuthSchemas::new(&columns).with_table_names("users", "sessions", "credentials");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auth.db");

    {
        let db = Database::open(&path).unwrap();
        schemas.create_all(&db).await.unwrap();
        let adapter = AuthAdapter::from_config(
            Arc::new(SqliteTable::new(db.clone(), schemas.user.clone())),
            Arc::new(SqliteTable::new(db.clone(), schemas.session.clone())),
            Arc::new(SqliteTable::new(db, schemas.key.clone())),
            &config,
        )
        .unwrap();

        adapter
            .set_user("u1", UserAttributes::new(), Some(key("email:a", "u1", true, Some("h1"))))
            .await
            .unwrap();
        adapter.set_session(&session("s1", "u1")).await.unwrap();
    }

    let db = Database::open(&path).unwrap();
    let keys = SqliteTable::new(db.clone(), schemas.key.clone());
    let raw = keys.select_all().await.unwrap();
    assert_eq!(raw[0]["is_primary"], json!(true));
    assert_eq!(raw[0]["password_hash"], json!("h1"));

    let adapter = AuthAdapter::from_config(
        Arc::new(SqliteTable::new(db.clone(), schemas.user.clone())),
        Arc::new(SqliteTable::new(db, schemas.session.clone())),
        Arc::new(keys),
        &config,
    )
    .unwrap();
    let joined = adapter.get_session_and_user("s1").await.unwrap().unwrap();
    assert_eq!(joined.user.id, "u1");
    assert_eq!(joined.session, session("s1", "u1"));
    assert_eq!(
        adapter.get_key("email:a").await.unwrap(),
        Some(key("email:a", "u1", true, Some("h1")))
    );
}
