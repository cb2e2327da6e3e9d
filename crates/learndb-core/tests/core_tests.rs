use std::collections::HashSet;

use figment::providers::{Format, Serialized, Toml};
use figment::Figment;

use learndb_core::catalog::CatalogIndex;
use learndb_core::config::{resolve_with_base, Config, Settings, StorageSettings};
use learndb_core::types::{CatalogItem, ContentKind};

fn custom_item(id: &str, body: &str) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        title: format!("Title {}", id),
        body: body.to_string(),
        kind: ContentKind::Lesson,
        category: None,
        difficulty: None,
        description: None,
    }
}

#[test]
fn seeded_catalog_has_unique_ids_and_all_kinds() {
    let catalog = CatalogIndex::seeded();
    assert_eq!(catalog.len(), 15);

    let ids: HashSet<&str> = catalog.all_items().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids.len(), catalog.len(), "ids are unique");

    let kinds: HashSet<ContentKind> = catalog.all_items().iter().map(|i| i.kind).collect();
    for kind in [ContentKind::Track, ContentKind::Lesson, ContentKind::GlossaryTerm, ContentKind::News] {
        assert!(kinds.contains(&kind), "catalog covers {kind}");
    }
}

#[test]
fn all_items_is_stable_across_calls() {
    let catalog = CatalogIndex::seeded();
    let first: Vec<String> = catalog.all_items().iter().map(|i| i.id.clone()).collect();
    let second: Vec<String> = catalog.all_items().iter().map(|i| i.id.clone()).collect();
    assert_eq!(first, second);
    assert_eq!(catalog.get("lesson-dna-structure").map(|i| i.title.as_str()), Some("The Structure of DNA"));
    assert!(catalog.get("missing").is_none());
}

#[test]
fn duplicate_ids_are_rejected() {
    let err = CatalogIndex::from_items(vec![custom_item("a", "one"), custom_item("a", "two")]);
    assert!(err.is_err());
}

#[test]
fn content_hash_tracks_body_changes() {
    let a = CatalogIndex::from_items(vec![custom_item("a", "one"), custom_item("b", "two")]).unwrap();
    let same = CatalogIndex::from_items(vec![custom_item("a", "one"), custom_item("b", "two")]).unwrap();
    let edited = CatalogIndex::from_items(vec![custom_item("a", "one"), custom_item("b", "two!")]).unwrap();
    assert_eq!(a.content_hash(), same.content_hash());
    assert_ne!(a.content_hash(), edited.content_hash());
}

#[test]
fn content_kind_parses_and_serializes_kebab_case() {
    assert_eq!("glossary-term".parse::<ContentKind>().unwrap(), ContentKind::GlossaryTerm);
    assert_eq!("Track".parse::<ContentKind>().unwrap(), ContentKind::Track);
    assert!("podcast".parse::<ContentKind>().is_err());
    assert_eq!(serde_json::to_string(&ContentKind::GlossaryTerm).unwrap(), "\"glossary-term\"");
}

#[test]
fn embedding_text_joins_title_and_body() {
    let item = custom_item("x", "body text");
    assert_eq!(item.embedding_text(), "Title x: body text");
}

#[test]
fn settings_defaults_are_overridden_by_toml() {
    let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(
        r#"
        [embedding]
        provider = "fake"
        dimension = 64

        [search]
        max_recent = 3
        "#,
    ));
    let settings = Config::from_figment(figment).unwrap().settings().unwrap();
    assert_eq!(settings.embedding.provider, "fake");
    assert_eq!(settings.embedding.dimension, 64);
    assert_eq!(settings.embedding.model, "text-embedding-3-small", "untouched keys keep defaults");
    assert_eq!(settings.search.max_recent, 3);
    assert_eq!(settings.storage.cache_key, "learndb.embeddings.v1");
}

#[test]
fn zero_dimension_is_invalid() {
    let figment = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Toml::string("[embedding]\ndimension = 0\n"));
    assert!(Config::from_figment(figment).is_err());
}

#[test]
fn relative_paths_resolve_against_base() {
    let tmp = tempfile::TempDir::new().unwrap();
    let resolved = resolve_with_base(tmp.path(), "store");
    assert_eq!(resolved, tmp.path().join("store"));
    let absolute = resolve_with_base(tmp.path(), "/var/lib/learndb");
    assert_eq!(absolute, std::path::PathBuf::from("/var/lib/learndb"));
}

#[test]
fn storage_dir_resolves_against_config_base() {
    let tmp = tempfile::TempDir::new().unwrap();
    let relative = StorageSettings { dir: "state/kv".to_string(), ..StorageSettings::default() };
    assert_eq!(relative.resolved_dir(tmp.path()), tmp.path().join("state/kv"));

    let absolute = StorageSettings { dir: "/srv/learndb".to_string(), ..StorageSettings::default() };
    assert_eq!(absolute.resolved_dir(tmp.path()), std::path::PathBuf::from("/srv/learndb"));
}
