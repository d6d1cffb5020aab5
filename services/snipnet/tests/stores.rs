mod support;

use std::sync::Arc;

use snipnet::{
    StoreError,
    listing::ListQuery,
    memory::{MemorySnippetStore, MemoryUserStore},
    models::{LoginMethod, NewSnippet, NewUser},
    repositories::{SnippetField, SnippetStore, UserFieldUpdate, UserLookup, UserStore},
};
use support::{PASSWORD, verifier};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

fn new_user(username: &str, verifier_hash: String) -> NewUser {
    NewUser {
        id: None,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        avatar: None,
        login: LoginMethod::Password {
            verifier: verifier_hash,
        },
    }
}

#[tokio::test]
async fn created_user_is_found_and_verifies() {
    let verifier = verifier();
    let users = MemoryUserStore::new();

    let created = assert_ok!(
        users
            .create(new_user("alice", verifier.hash(PASSWORD).unwrap()))
            .await
    );
    let found = assert_ok!(users.get_by_field(UserLookup::Username("alice")).await);

    assert_eq!(found.id, created.id);
    let stored = found.password_hash.as_deref().unwrap();
    assert!(assert_ok!(verifier.verify(PASSWORD, stored)));
    assert!(!assert_ok!(verifier.verify("Wr0ng!pass", stored)));
}

#[tokio::test]
async fn preassigned_ids_are_kept() {
    let users = MemoryUserStore::new();
    let id = Uuid::new_v4();

    let created = assert_ok!(
        users
            .create(NewUser {
                id: Some(id),
                ..new_user("alice", "$argon2id$stub".into())
            })
            .await
    );
    assert_eq!(created.id, id);

    let raw = id.to_string();
    let lookup = assert_ok!(UserLookup::parse("id", &raw));
    assert_eq!(assert_ok!(users.get_by_field(lookup).await).username, "alice");
}

#[tokio::test]
async fn disallowed_fields_never_touch_storage() {
    let verifier = verifier();
    let users = MemoryUserStore::new();
    let alice = users
        .create(new_user("alice", verifier.hash(PASSWORD).unwrap()))
        .await
        .unwrap();

    let err = assert_err!(UserFieldUpdate::parse("is_admin", "true", &verifier));
    assert!(matches!(err, StoreError::InvalidField(ref f) if f == "is_admin"));

    let err = assert_err!("is_admin".parse::<SnippetField>());
    assert!(matches!(err, StoreError::InvalidField(_)));

    let unchanged = users.get_by_field(UserLookup::Id(alice.id)).await.unwrap();
    assert_eq!(unchanged.updated_at, alice.updated_at);
}

#[tokio::test]
async fn deletes_report_missing_rows() {
    let users = Arc::new(MemoryUserStore::new());
    let snippets = MemorySnippetStore::new(users.clone());

    assert!(matches!(
        snippets.delete(Uuid::new_v4()).await,
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        users.delete(Uuid::new_v4()).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn single_field_update_changes_only_that_field() {
    let users = Arc::new(MemoryUserStore::new());
    let snippets = MemorySnippetStore::new(users.clone());
    let owner = users
        .create(new_user("alice", "$argon2id$stub".into()))
        .await
        .unwrap();

    let created = snippets
        .create(NewSnippet {
            user_id: owner.id,
            title: "before".into(),
            description: "desc".into(),
            language: "rust".into(),
            code: "code".into(),
            is_public: true,
        })
        .await
        .unwrap();

    let updated = assert_ok!(
        snippets
            .update_field(created.id, SnippetField::Title, "after")
            .await
    );
    assert_eq!(updated.title, "after");
    assert_eq!(updated.description, created.description);
    assert_eq!(updated.user_id, owner.id);
    assert!(updated.updated_at >= created.updated_at);

    let listed = snippets.list_public(&ListQuery::default()).await.unwrap();
    assert_eq!(listed[0].snippet.title, "after");
    assert_eq!(listed[0].username, "alice");
}
