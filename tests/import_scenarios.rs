//! End-to-end import runs against fixture module trees

use default_content::core::{
    EntityTypeConfig, ImportConfig, LocalId, RevisionId, StorageError, StorageResult, Uuid,
};
use default_content::entity::{Entity, StaticRegistry};
use default_content::events::{ChannelListener, ImportEventKind};
use default_content::scanner::{FsScanner, ScannedFile, Scanner};
use default_content::session::{Session, StackAccountSwitcher};
use default_content::storage::{Condition, EntityStorage, MemoryStorage, SavedIdentity};
use default_content::{Importer, Result};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const DOMAIN: &str = "http://drupal.org";

/// A reference embedded in a fixture payload
struct Embed<'a> {
    field: &'a str,
    entity_type: &'a str,
    uuid: Uuid,
    revision: Option<u64>,
}

fn embed<'a>(field: &'a str, entity_type: &'a str, uuid: Uuid) -> Embed<'a> {
    Embed {
        field,
        entity_type,
        uuid,
        revision: None,
    }
}

fn payload(entity_type: &str, uuid: Uuid, fields: Value, embeds: &[Embed<'_>]) -> Value {
    let mut map = match fields {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    map.insert(
        "_links".into(),
        json!({ "type": { "href": format!("{}/rest/type/{}/default", DOMAIN, entity_type) } }),
    );
    map.insert("uuid".into(), json!([{ "value": uuid.to_string() }]));

    let mut embedded = Map::new();
    for e in embeds {
        let relation = format!("{}/rest/relation/{}/default/{}", DOMAIN, entity_type, e.field);
        let href = format!("{}/rest/type/{}/default", DOMAIN, e.entity_type);
        let mut item = json!({
            "_links": { "type": { "href": href } },
            "uuid": [{ "value": e.uuid.to_string() }]
        });
        if let Some(revision) = e.revision {
            item["target_revision_id"] = json!(revision);
        }
        match embedded.get_mut(&relation) {
            Some(Value::Array(items)) => items.push(item),
            _ => {
                embedded.insert(relation, json!([item]));
            }
        }
    }
    if !embedded.is_empty() {
        map.insert("_embedded".into(), Value::Object(embedded));
    }
    Value::Object(map)
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn write(&self, module: &str, entity_type: &str, name: &str, value: &Value) -> PathBuf {
        let dir = self.dir.path().join(module).join("content").join(entity_type);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
        path
    }

    fn config(&self) -> ImportConfig {
        ImportConfig {
            modules_dir: self.dir.path().to_path_buf(),
            ..ImportConfig::default()
        }
    }
}

fn content_type(id: &str, revisionable: bool) -> EntityTypeConfig {
    EntityTypeConfig {
        id: id.to_string(),
        config: false,
        id_key: "id".to_string(),
        uuid_key: "uuid".to_string(),
        revision_key: revisionable.then(|| "revision_id".to_string()),
        owner_key: None,
    }
}

fn importer(fixture: &Fixture, registry: StaticRegistry) -> Importer<Arc<MemoryStorage>> {
    let storage = Arc::new(MemoryStorage::new(&registry));
    Importer::builder(storage)
        .config(fixture.config())
        .registry(Arc::new(registry))
        .build()
}

#[test]
fn test_embedded_image_imported_before_article() {
    let fixture = Fixture::new();
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

    let mut image_ref = embed("field_image", "image", u2);
    image_ref.revision = Some(99);
    fixture.write(
        "demo",
        "article",
        "A.json",
        &payload("article", u1, json!({ "title": [{ "value": "A" }] }), &[image_ref]),
    );
    fixture.write(
        "demo",
        "image",
        "B.json",
        &payload("image", u2, json!({ "revision_id": [{ "value": 99 }] }), &[]),
    );

    let registry =
        StaticRegistry::from_config(&[content_type("article", true), content_type("image", true)]);
    let importer = importer(&fixture, registry);
    let outcome = importer.import_content("demo", false).unwrap();

    assert_eq!(outcome.created.uuids(), &[u2, u1]);
    assert!(outcome.updated.is_empty());

    let image = outcome.created.get(&u2).unwrap();
    let article = outcome.created.get(&u1).unwrap();
    let reference = &article.references()[0];
    assert_eq!(reference.target_uuid, Some(u2));
    assert_eq!(reference.target_id, image.id());
    assert_eq!(reference.target_revision_id, image.revision_id());
    assert_ne!(reference.target_revision_id, Some(RevisionId::new(99)));
}

#[test]
fn test_reference_points_at_revision_assigned_in_this_run() {
    let fixture = Fixture::new();
    let (tag, page) = (Uuid::new_v4(), Uuid::new_v4());

    let mut tag_ref = embed("field_tags", "taxonomy_term", tag);
    tag_ref.revision = Some(12);
    fixture.write(
        "site",
        "taxonomy_term",
        "tag.json",
        &payload(
            "taxonomy_term",
            tag,
            json!({ "tid": [{ "value": 3 }], "revision_id": [{ "value": 12 }] }),
            &[],
        ),
    );
    fixture.write(
        "site",
        "node",
        "page.json",
        &payload(
            "node",
            page,
            json!({ "nid": [{ "value": 1 }], "vid": [{ "value": 30 }] }),
            &[tag_ref],
        ),
    );

    let registry = StaticRegistry::standard();
    let storage = Arc::new(MemoryStorage::new(&registry));
    // Occupy the ids and revisions the export was made with
    let session = Session::new(default_content::session::Account::new(LocalId::new(1)));
    for _ in 0..20 {
        let mut filler = Entity::new("taxonomy_term", Uuid::new_v4());
        storage.save(&mut filler, &session).unwrap();
    }

    let importer = Importer::builder(Arc::clone(&storage))
        .config(fixture.config())
        .build();
    let outcome = importer.import_content("site", false).unwrap();

    let term = outcome.created.get(&tag).unwrap();
    assert_eq!(term.revision_id(), Some(RevisionId::new(21)));
    let node = outcome.created.get(&page).unwrap();
    assert_eq!(node.references()[0].target_revision_id, Some(RevisionId::new(21)));
    assert_eq!(node.owner(), Some(LocalId::new(1)));
}

#[test]
fn test_second_run_without_update_changes_nothing() {
    let fixture = Fixture::new();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let file_ref = embed("field_file", "file", b);
    fixture.write("demo", "node", "a.json", &payload("node", a, json!({}), &[file_ref]));
    fixture.write("demo", "file", "b.json", &payload("file", b, json!({}), &[]));

    let importer = importer(&fixture, StaticRegistry::standard());
    let first = importer.import_content("demo", false).unwrap();
    assert_eq!(first.created.len(), 2);
    let before = importer.storage().entities("node");

    let second = importer.import_content("demo", false).unwrap();
    assert!(second.created.is_empty());
    assert!(second.updated.is_empty());
    assert_eq!(second.skipped, 2);
    assert_eq!(importer.storage().total(), 2);
    assert_eq!(importer.storage().entities("node"), before);
}

#[test]
fn test_second_run_with_update_preserves_identity() {
    let fixture = Fixture::new();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let file_ref = embed("field_file", "file", b);
    fixture.write("demo", "node", "a.json", &payload("node", a, json!({}), &[file_ref]));
    fixture.write("demo", "file", "b.json", &payload("file", b, json!({}), &[]));

    let importer = importer(&fixture, StaticRegistry::standard());
    let first = importer.import_content("demo", false).unwrap();
    let second = importer.import_content("demo", true).unwrap();

    assert!(second.created.is_empty());
    assert_eq!(second.updated.len(), 2);
    for uuid in [a, b] {
        let before = first.created.get(&uuid).unwrap();
        let after = second.updated.get(&uuid).unwrap();
        assert_eq!(after.uuid(), before.uuid());
        assert_eq!(after.id(), before.id());
    }
    assert_eq!(importer.storage().total(), 2);
}

#[test]
fn test_duplicate_uuid_aborts_before_any_save() {
    let fixture = Fixture::new();
    let (dup, other) = (Uuid::new_v4(), Uuid::new_v4());
    fixture.write("demo", "file", "first.json", &payload("file", dup, json!({}), &[]));
    fixture.write("demo", "node", "other.json", &payload("node", other, json!({}), &[]));
    fixture.write("demo", "node", "second.json", &payload("node", dup, json!({}), &[]));

    let (listener, events) = ChannelListener::new();
    let registry = StaticRegistry::standard();
    let importer = Importer::builder(MemoryStorage::new(&registry))
        .config(fixture.config())
        .listener(listener)
        .build();

    let err = importer.import_content("demo", false).unwrap_err();
    assert!(err.is_duplicate_identifier());
    assert!(err.to_string().contains(&dup.to_string()));
    assert!(err.to_string().contains("demo"));
    assert_eq!(importer.storage().total(), 0);
    assert!(events.try_recv().is_err());
}

#[test]
fn test_cycle_is_imported() {
    let fixture = Fixture::new();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let next = |uuid| [embed("field_next", "paragraph", uuid)];
    fixture.write("demo", "paragraph", "a.json", &payload("paragraph", a, json!({}), &next(b)));
    fixture.write("demo", "paragraph", "b.json", &payload("paragraph", b, json!({}), &next(a)));

    let importer = importer(&fixture, StaticRegistry::standard());
    let outcome = importer.import_content("demo", false).unwrap();

    assert_eq!(outcome.created.len(), 2);
    assert_eq!(importer.storage().count("paragraph"), 2);
}

/// Scanner handing out files in reverse path order
struct ReverseScanner(FsScanner);

impl Scanner for ReverseScanner {
    fn scan(&self, dir: &Path) -> Result<Vec<ScannedFile>> {
        let mut files = self.0.scan(dir)?;
        files.reverse();
        Ok(files)
    }
}

#[test]
fn test_order_independent_of_enumeration() {
    let fixture = Fixture::new();
    let (top, middle, leaf) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    fixture.write("demo", "node", "1.json", &payload("node", leaf, json!({}), &[]));
    let points_at = |uuid| [embed("field_ref", "node", uuid)];
    fixture.write("demo", "node", "2.json", &payload("node", top, json!({}), &points_at(middle)));
    fixture.write("demo", "node", "3.json", &payload("node", middle, json!({}), &points_at(leaf)));

    for reversed in [false, true] {
        let registry = StaticRegistry::standard();
        let builder = Importer::builder(MemoryStorage::new(&registry)).config(fixture.config());
        let importer = if reversed {
            builder.scanner(ReverseScanner(FsScanner::default())).build()
        } else {
            builder.build()
        };

        let outcome = importer.import_content("demo", false).unwrap();
        let position = |uuid| outcome.created.position(&uuid).unwrap();
        assert!(position(leaf) < position(middle));
        assert!(position(middle) < position(top));
    }
}

#[test]
fn test_events_announce_created_and_updated() {
    let fixture = Fixture::new();
    let uuid = Uuid::new_v4();
    fixture.write("demo", "media", "m.json", &payload("media", uuid, json!({}), &[]));

    let (listener, events) = ChannelListener::new();
    let registry = StaticRegistry::standard();
    let importer = Importer::builder(MemoryStorage::new(&registry))
        .config(fixture.config())
        .listener(listener)
        .build();

    importer.import_content("demo", false).unwrap();
    let imported = events.try_recv().unwrap();
    assert_eq!(imported.kind, ImportEventKind::Imported);
    assert_eq!(imported.module, "demo");
    assert!(imported.entities.contains(&uuid));
    assert!(events.try_recv().is_err());

    importer.import_content("demo", false).unwrap();
    assert!(events.try_recv().is_err());

    importer.import_content("demo", true).unwrap();
    let updated = events.try_recv().unwrap();
    assert_eq!(updated.kind.name(), "default_content.update");
    assert_eq!(updated.entities.uuids(), &[uuid]);
}

#[test]
fn test_config_types_and_stray_directories_ignored() {
    let fixture = Fixture::new();
    let uuid = Uuid::new_v4();
    fixture.write("demo", "node", "n.json", &payload("node", uuid, json!({}), &[]));
    fixture.write("demo", "node_type", "article.json", &json!({ "type": "article" }));
    fixture.write("demo", "comment", "c.json", &json!("not even an object"));

    let importer = importer(&fixture, StaticRegistry::standard());
    let outcome = importer.import_content("demo", false).unwrap();
    assert_eq!(outcome.created.uuids(), &[uuid]);
}

#[test]
fn test_malformed_file_aborts_run() {
    let fixture = Fixture::new();
    fixture.write("demo", "node", "bad.json", &json!({ "title": [{ "value": "no uuid" }] }));

    let importer = importer(&fixture, StaticRegistry::standard());
    let err = importer.import_content("demo", false).unwrap_err();
    assert!(err.is_decode());
    assert!(err.to_string().contains("bad.json"));
}

#[test]
fn test_embedded_author_becomes_owner() {
    let fixture = Fixture::new();
    let (author, page) = (Uuid::new_v4(), Uuid::new_v4());
    fixture.write(
        "demo",
        "user",
        "author.json",
        &payload("user", author, json!({ "uid": [{ "value": 5 }] }), &[]),
    );
    fixture.write(
        "demo",
        "node",
        "page.json",
        &payload("node", page, json!({}), &[embed("uid", "user", author)]),
    );

    let importer = importer(&fixture, StaticRegistry::standard());
    let outcome = importer.import_content("demo", false).unwrap();

    assert_eq!(outcome.created.uuids(), &[author, page]);
    let node = outcome.created.get(&page).unwrap();
    assert_eq!(node.owner(), Some(LocalId::new(5)));
    let stored = importer.storage().load("node", node.id().unwrap()).unwrap().unwrap();
    assert_eq!(stored.owner(), Some(LocalId::new(5)));
}

#[test]
fn test_configured_uuid_key() {
    let fixture = Fixture::new();
    let uuid = Uuid::new_v4();
    let mut item = payload("item", uuid, json!({ "id": [{ "value": 2 }] }), &[]);
    let fields = item.as_object_mut().unwrap();
    fields.remove("uuid");
    fields.insert("guid".into(), json!([{ "value": uuid.to_string() }]));
    fixture.write("demo", "item", "item.json", &item);

    let registry = StaticRegistry::from_config(&[EntityTypeConfig {
        uuid_key: "guid".to_string(),
        ..content_type("item", false)
    }]);
    let importer = importer(&fixture, registry);
    let outcome = importer.import_content("demo", false).unwrap();

    assert_eq!(outcome.created.uuids(), &[uuid]);
    assert_eq!(importer.storage().count("item"), 1);
}

/// Storage whose saves always fail
struct FailingStorage(MemoryStorage);

impl EntityStorage for FailingStorage {
    fn query(
        &self,
        entity_type: &str,
        conditions: &[Condition],
    ) -> StorageResult<Option<LocalId>> {
        self.0.query(entity_type, conditions)
    }

    fn load(&self, entity_type: &str, id: LocalId) -> StorageResult<Option<Entity>> {
        self.0.load(entity_type, id)
    }

    fn save(&self, _entity: &mut Entity, _session: &Session) -> StorageResult<SavedIdentity> {
        Err(StorageError::Backend("disk full".to_string()))
    }
}

#[test]
fn test_account_restored_after_failed_run() {
    let fixture = Fixture::new();
    let uuid = Uuid::new_v4();
    fixture.write("demo", "file", "f.json", &payload("file", uuid, json!({}), &[]));

    let registry = StaticRegistry::standard();
    let switcher = Arc::new(StackAccountSwitcher::new());
    let importer = Importer::builder(FailingStorage(MemoryStorage::new(&registry)))
        .config(fixture.config())
        .switcher(switcher.clone())
        .build();

    let err = importer.import_content("demo", false).unwrap_err();
    assert!(err.is_persistence());
    assert!(err.to_string().contains(&uuid.to_string()));
    assert_eq!(switcher.depth(), 0);
}
