use std::sync::LazyLock;

use recordlayer::{bson::oid::ObjectId, memory::InMemoryStore, prelude::*};

struct Note;

impl Model for Note {
    fn collection_name() -> &'static str {
        "notes"
    }

    fn schema() -> &'static Schema {
        static SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
            Schema::builder()
                .field("field1", TextField::new().max_length(50))
                .field("field2", TextField::new().required(false))
                .build()
        });
        &SCHEMA
    }
}

struct Player;

impl Model for Player {
    fn collection_name() -> &'static str {
        "players"
    }

    fn schema() -> &'static Schema {
        static SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
            Schema::builder()
                .field("name", TextField::new().min_length(1))
                .field("team", TextField::new().with_default("red"))
                .field("score", IntegerField::new().with_default(0).max_digits(3))
                .field("rating", FloatField::new().required(false).max_decimals(1).round_decimals(true))
                .field("active", BooleanField::new().with_default(true))
                .build()
        });
        &SCHEMA
    }

    fn export_options() -> ExportOptions {
        ExportOptions {
            include_null: false,
            ..ExportOptions::default()
        }
    }
}

async fn memory_store() -> DocumentStore<InMemoryStore> {
    let backend = InMemoryStore::builder()
        .with_collection(Note::collection_name())
        .with_collection(Player::collection_name())
        .strict(true)
        .build()
        .await
        .unwrap();

    DocumentStore::new(backend)
}

async fn seed_players(store: &DocumentStore<InMemoryStore>) {
    for (name, team, score) in [("ann", "red", 30), ("bob", "blue", 10), ("cid", "red", 20), ("dee", "blue", 40)] {
        let mut player = store
            .record_from::<Player>(doc! { "name": name, "team": team, "score": score })
            .unwrap();
        player.save().await.unwrap();
    }
}

#[tokio::test]
async fn record_lifecycle_insert_get_update_delete() {
    let store = memory_store().await;

    let mut note = store
        .record_from::<Note>(doc! { "field1": "x", "field2": "y" })
        .unwrap();
    let saved = note.save().await.unwrap();

    let id = note.id().cloned().unwrap();
    assert_ne!(id, Bson::Null);
    assert_eq!(saved.id(), Some(&id));

    let lookup = store.record_from::<Note>(doc! { "id": id.clone() }).unwrap();
    assert_eq!(
        lookup.get().await,
        Some(doc! { "field1": "x", "field2": "y", "id": id.clone() })
    );

    note.set("field1", "z");
    assert!(matches!(note.save().await.unwrap(), Saved::Updated(ref r) if r.replaced == 1));
    assert_eq!(lookup.get().await.unwrap().get_str("field1").unwrap(), "z");

    let deleted = note.delete().await.unwrap();
    assert_eq!(deleted.deleted, 1);
    assert_eq!(lookup.get().await, None);
    assert!(lookup.try_get().await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn unchanged_record_is_not_written_again() {
    let store = memory_store().await;

    let mut note = store.record_from::<Note>(doc! { "field1": "x" }).unwrap();
    note.save().await.unwrap();
    assert!(!note.is_dirty());

    assert_eq!(note.save().await.unwrap(), Saved::Clean);

    note.set("field1", "x");
    assert_eq!(note.save().await.unwrap(), Saved::Clean);
    assert_eq!(store.record::<Note>().count().await.unwrap(), 1);
}

#[tokio::test]
async fn updating_a_vanished_row_reports_not_found() {
    let store = memory_store().await;

    let mut note = store.record_from::<Note>(doc! { "field1": "x" }).unwrap();
    note.save().await.unwrap();

    store
        .record::<Note>()
        .delete_where(Filter::eq("field1", "x"))
        .await
        .unwrap();

    note.set("field2", "late");
    let err = note.save().await.unwrap_err();
    assert!(matches!(err, RecordError::UpdateNotFound { ref result, .. } if result.replaced == 0 && result.errors == 0));
}

#[tokio::test]
async fn invalid_values_never_reach_the_store() {
    let store = memory_store().await;

    let long = "x".repeat(51);
    let err = store
        .record_from::<Note>(doc! { "field1": long })
        .unwrap_err();
    assert!(matches!(err, RecordError::Validation(ValidationError::TooLong { length: 51, .. })));

    let mut note = store.record_from::<Note>(doc! { "field2": "orphan" }).unwrap();
    let err = note.save().await.unwrap_err();
    assert!(matches!(err, RecordError::Validation(ValidationError::MissingRequired { .. })));
    assert_eq!(store.record::<Note>().count().await.unwrap(), 0);
}

#[tokio::test]
async fn defaults_are_written_but_not_searched() {
    let store = memory_store().await;
    seed_players(&store).await;

    let mut player = store.record_from::<Player>(doc! { "name": "eve", "rating": 4.26 }).unwrap();
    player.save().await.unwrap();

    let row = store
        .record_from::<Player>(doc! { "id": player.id().cloned().unwrap() })
        .unwrap()
        .try_get()
        .await
        .unwrap();
    assert_eq!(row.get_str("team").unwrap(), "red");
    assert_eq!(row.get_i32("score").unwrap(), 0);
    assert_eq!(row.get_bool("active").unwrap(), true);
    assert_eq!(row.get_f64("rating").unwrap(), 4.3);

    // Default team is not part of the filter, so every player matches.
    assert_eq!(store.record::<Player>().count().await.unwrap(), 5);

    let blue = store.record_from::<Player>(doc! { "team": "blue" }).unwrap();
    assert_eq!(blue.count().await.unwrap(), 2);
}

#[tokio::test]
async fn ordering_and_limit_shape_results() {
    let store = memory_store().await;
    seed_players(&store).await;

    let mut finder = store.record::<Player>();
    finder.order_by(["-score"]).limit(3);

    let names = finder
        .all()
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.get_str("name").unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["dee", "ann", "cid"]);

    let top = finder.get_as::<Player>().await.unwrap();
    assert_eq!(top.get_value("name"), Some(&Bson::String("dee".into())));
    assert!(!top.is_dirty());

    finder.order_by(["team", "-score"]).limit(0);
    let players = finder.all_as::<Player>().await.unwrap();
    let order = players
        .iter()
        .map(|p| p.get_value("name").cloned().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(order, vec![Bson::from("dee"), Bson::from("bob"), Bson::from("ann"), Bson::from("cid")]);
}

#[tokio::test]
async fn explicit_filters_count_and_delete() {
    let store = memory_store().await;
    seed_players(&store).await;

    let players = store.record::<Player>();
    assert_eq!(players.count_where(Filter::gte("score", 20)).await.unwrap(), 3);
    assert_eq!(players.count_where(doc! { "team": "red" }).await.unwrap(), 2);

    let removed = players
        .delete_where(Filter::lt("score", 25).and(Filter::eq("team", "red")))
        .await
        .unwrap();
    assert_eq!(removed.deleted, 1);
    assert_eq!(players.count().await.unwrap(), 3);
}

#[tokio::test]
async fn object_id_attributes_select_only_their_rows() {
    let store = memory_store().await;
    let owners = [ObjectId::new(), ObjectId::new(), ObjectId::new(), ObjectId::new()];

    for owner in owners {
        let mut note = store
            .record_from::<Note>(doc! { "field1": "shared", "owner": owner })
            .unwrap();
        note.save().await.unwrap();
    }

    let mine = store.record_from::<Note>(doc! { "owner": owners[1] }).unwrap();
    assert_eq!(mine.count().await.unwrap(), 1);
    assert_eq!(mine.get().await.unwrap().get_object_id("owner").unwrap(), owners[1]);

    let notes = store.record::<Note>();
    assert_eq!(notes.count_where(Filter::ne("owner", owners[1])).await.unwrap(), 3);

    let removed = notes.delete_where(Filter::eq("owner", owners[2])).await.unwrap();
    assert_eq!(removed.deleted, 1);
    assert_eq!(notes.count().await.unwrap(), 3);
}

#[tokio::test]
async fn json_export_follows_model_options() {
    let store = memory_store().await;

    let mut player = store
        .record_from::<Player>(doc! { "name": "ann", "nickname": "a", "_session": 7 })
        .unwrap();
    player.save().await.unwrap();
    let id = player.id().cloned().unwrap();

    assert_eq!(
        player.to_json().unwrap(),
        serde_json::json!({
            "id": id.as_str().unwrap(),
            "name": "ann",
            "team": "red",
            "score": 0,
            "active": true,
            "nickname": "a",
        })
    );

    let mut note = store.record_from::<Note>(doc! { "field1": "x" }).unwrap();
    note.save().await.unwrap();
    let json = note.to_json().unwrap();
    assert_eq!(json["field2"], serde_json::Value::Null);
    assert!(json["id"].is_string());
}

#[tokio::test]
async fn store_manages_collections() {
    let store = DocumentStore::new(InMemoryStore::new());

    store.create_collection("a").await.unwrap();
    store.create_collection("b").await.unwrap();
    assert_eq!(store.list_collections().await.unwrap(), vec!["a", "b"]);

    store.drop_collection("a").await.unwrap();
    assert_eq!(store.list_collections().await.unwrap(), vec!["b"]);

    store.shutdown().await.unwrap();
}
