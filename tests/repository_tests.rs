//! Repository backend tests: the libsql schema against a throwaway local
//! database file, plus cross-repository flows on the in-memory backend.

mod common;

use std::collections::HashMap;

use chrono::Utc;
use orion::domain::{Entity, EntityType, Fact, ResearchSession, Source, TrustLevel};
use orion::repository::{
    LibsqlRepositories, MemorySourceRepository, MemoryUserRepository, SourceRepository,
    UserRepository, WorldModelRepository,
};
use orion::types::AppError;

fn temp_db_path() -> String {
    let dir = std::env::temp_dir();
    dir.join(format!("orion-test-{}.db", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .to_string()
}

async fn libsql_repos() -> (LibsqlRepositories, String) {
    let path = temp_db_path();
    let repos = LibsqlRepositories::new_local(&path)
        .await
        .expect("open local database");
    (repos, path)
}

fn source(user_id: i64, url: &str) -> Source {
    Source {
        id: 0,
        user_id,
        url: url.to_string(),
        name: "name".to_string(),
        trust_level: TrustLevel::Medium,
        is_user_added: true,
        created_at: Utc::now(),
    }
}

fn fact(user_id: i64, id: &str, content: &str) -> Fact {
    Fact {
        id: id.to_string(),
        user_id,
        content: content.to_string(),
        source_url: Some("https://example.com".to_string()),
        confidence: 0.9,
        extracted_at: Utc::now(),
    }
}

#[tokio::test]
async fn libsql_user_get_or_create_roundtrip() {
    let (repos, path) = libsql_repos().await;

    let created = repos.get_or_create(7, "ada").await.unwrap();
    let again = repos.get_or_create(7, "ada").await.unwrap();
    assert_eq!(created.id, again.id);

    let renamed = repos.get_or_create(7, "lovelace").await.unwrap();
    assert_eq!(renamed.id, created.id);
    assert_eq!(renamed.display_name, "lovelace");

    let fetched = UserRepository::get_by_id(&repos, created.id).await.unwrap();
    assert_eq!(fetched.principal_id, 7);

    assert!(matches!(
        UserRepository::get_by_id(&repos, 9999).await,
        Err(AppError::UserNotFound)
    ));

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn libsql_source_unique_constraint() {
    let (repos, path) = libsql_repos().await;
    let user = repos.get_or_create(1, "u").await.unwrap();

    let created = SourceRepository::create(&repos, &source(user.id, "https://example.com"))
        .await
        .unwrap();
    assert!(created.id > 0);

    let duplicate = SourceRepository::create(&repos, &source(user.id, "https://example.com")).await;
    assert!(matches!(duplicate, Err(AppError::DuplicateSource)));

    // Same URL for a different user is allowed.
    let other = repos.get_or_create(2, "v").await.unwrap();
    assert!(
        SourceRepository::create(&repos, &source(other.id, "https://example.com"))
            .await
            .is_ok()
    );

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn libsql_sources_list_newest_first_and_trust_updates() {
    let (repos, path) = libsql_repos().await;
    let user = repos.get_or_create(1, "u").await.unwrap();

    let first = SourceRepository::create(&repos, &source(user.id, "https://a.com"))
        .await
        .unwrap();
    let second = SourceRepository::create(&repos, &source(user.id, "https://b.com"))
        .await
        .unwrap();

    let listed = repos.list_by_user(user.id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[1].id, first.id);

    repos
        .update_trust_level(user.id, first.id, TrustLevel::High)
        .await
        .unwrap();
    let updated = SourceRepository::get_by_id(&repos, first.id).await.unwrap();
    assert_eq!(updated.trust_level, TrustLevel::High);

    assert!(matches!(
        repos.update_trust_level(user.id, 12345, TrustLevel::Low).await,
        Err(AppError::SourceNotFound)
    ));

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn libsql_fact_search_and_exact_lookup() {
    let (repos, path) = libsql_repos().await;

    repos
        .create_fact(&fact(1, "f1", "Open banking adoption is rising"))
        .await
        .unwrap();
    repos
        .create_fact(&fact(1, "f2", "Blockchain settlements remain niche"))
        .await
        .unwrap();

    let hits = repos.search_facts(1, "banking").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "f1");

    let exact = repos
        .find_fact_by_content(1, "Open banking adoption is rising")
        .await
        .unwrap();
    assert_eq!(exact.id, "f1");

    assert!(matches!(
        repos.find_fact_by_content(1, "missing").await,
        Err(AppError::NotFound)
    ));

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn libsql_entity_attributes_survive_update() {
    let (repos, path) = libsql_repos().await;

    let mut attributes = HashMap::new();
    attributes.insert("founded".to_string(), "2005".to_string());

    let entity = Entity {
        id: "e1".to_string(),
        user_id: 1,
        name: "Klarna".to_string(),
        entity_type: EntityType::Company,
        attributes,
        first_seen_at: Utc::now(),
        last_seen_at: Utc::now(),
    };
    repos.create_entity(&entity).await.unwrap();

    let mut loaded = repos.get_entity_by_name(1, "Klarna").await.unwrap();
    assert_eq!(loaded.attributes["founded"], "2005");

    loaded
        .attributes
        .insert("hq".to_string(), "Stockholm".to_string());
    loaded.last_seen_at = Utc::now();
    repos.update_entity(&loaded).await.unwrap();

    let reloaded = repos.get_entity_by_name(1, "Klarna").await.unwrap();
    assert_eq!(reloaded.attributes.len(), 2);
    assert_eq!(reloaded.attributes["hq"], "Stockholm");

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn libsql_session_links_are_idempotent() {
    let (repos, path) = libsql_repos().await;

    let session = ResearchSession {
        id: "s1".to_string(),
        user_id: 1,
        question: "what changed".to_string(),
        strategy: "standard".to_string(),
        created_at: Utc::now(),
    };
    repos.create_session(&session).await.unwrap();
    repos.create_fact(&fact(1, "f1", "a fact")).await.unwrap();

    repos.add_fact_to_session("s1", "f1").await.unwrap();
    repos.add_fact_to_session("s1", "f1").await.unwrap();

    let linked = repos.get_facts_by_session("s1").await.unwrap();
    assert_eq!(linked.len(), 1);

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn memory_backends_share_user_ids_consistently() {
    let users = MemoryUserRepository::new();
    let sources = MemorySourceRepository::new();

    let user = users.get_or_create(500, "dana").await.unwrap();
    SourceRepository::create(&sources, &source(user.id, "https://example.com"))
        .await
        .unwrap();

    assert_eq!(sources.count_by_user(user.id).await.unwrap(), 1);
    assert_eq!(
        sources.get_domains_by_user(user.id).await.unwrap(),
        vec!["example.com"]
    );
}
