//! Note and tag consistency against a real PostgreSQL schema.

use notekeeper_db::test_fixtures::TestDatabase;
use notekeeper_db::{
    CreateNoteRequest, NoteRepository, TagRepository, TagSet, UpdateNoteRequest,
};
use uuid::Uuid;

fn note(title: &str, tags: &str) -> CreateNoteRequest {
    CreateNoteRequest {
        title: title.to_string(),
        body: String::new(),
        tags: TagSet::parse(tags).unwrap(),
    }
}

async fn link_count(test_db: &TestDatabase, note_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM note_tags WHERE note_id = $1")
        .bind(note_id)
        .fetch_one(test_db.pool())
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_insert_links_normalized_tags() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.create_identity("a@example.com").await;

    let id = test_db
        .db
        .notes
        .insert(owner.id, note("Shopping", "Food, errand , FOOD"))
        .await
        .unwrap();

    let fetched = test_db
        .db
        .notes
        .fetch_owned(owner.id, id)
        .await
        .unwrap()
        .expect("note should exist");
    assert_eq!(fetched.note.title, "Shopping");
    assert_eq!(fetched.tag_names(), vec!["errand", "food"]);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_tags_are_shared_across_owners() {
    let test_db = TestDatabase::new().await;
    let a = test_db.create_identity("a@example.com").await;
    let b = test_db.create_identity("b@example.com").await;

    test_db.db.notes.insert(a.id, note("one", "work")).await.unwrap();
    test_db.db.notes.insert(b.id, note("two", "Work")).await.unwrap();

    let tags = test_db.db.tags.list().await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "work");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_concurrent_notes_with_new_tag_create_it_once() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.create_identity("a@example.com").await;

    let (first, second) = tokio::join!(
        test_db.db.notes.insert(owner.id, note("one", "fresh")),
        test_db.db.notes.insert(owner.id, note("two", "fresh")),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    let tag = test_db
        .db
        .tags
        .find_by_name("fresh")
        .await
        .unwrap()
        .expect("tag should exist");
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE name = 'fresh'")
        .fetch_one(test_db.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);

    for id in [first, second] {
        let fetched = test_db.db.notes.fetch_owned(owner.id, id).await.unwrap().unwrap();
        assert_eq!(fetched.tags, vec![tag.clone()]);
    }

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_failing_tag_rolls_back_whole_note() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.create_identity("a@example.com").await;

    sqlx::query(
        "CREATE FUNCTION reject_boom_tag() RETURNS trigger AS $$
         BEGIN
             IF NEW.name = 'boom' THEN
                 RAISE EXCEPTION 'tag rejected';
             END IF;
             RETURN NEW;
         END
         $$ LANGUAGE plpgsql",
    )
    .execute(test_db.pool())
    .await
    .unwrap();
    sqlx::query(
        "CREATE TRIGGER tags_reject_boom BEFORE INSERT ON tags
         FOR EACH ROW EXECUTE FUNCTION reject_boom_tag()",
    )
    .execute(test_db.pool())
    .await
    .unwrap();

    let result = test_db
        .db
        .notes
        .insert(owner.id, note("doomed", "alpha, boom"))
        .await;
    assert!(result.is_err());

    let notes = test_db.db.notes.list_for_owner(owner.id).await.unwrap();
    assert!(notes.is_empty());
    assert!(test_db.db.tags.find_by_name("alpha").await.unwrap().is_none());
    let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM note_tags")
        .fetch_one(test_db.pool())
        .await
        .unwrap();
    assert_eq!(links, 0);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_delete_removes_links_but_keeps_tags() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.create_identity("a@example.com").await;

    let id = test_db
        .db
        .notes
        .insert(owner.id, note("Shopping", "food, errand"))
        .await
        .unwrap();
    assert_eq!(link_count(&test_db, id).await, 2);

    assert!(test_db.db.notes.delete_owned(owner.id, id).await.unwrap());

    assert_eq!(link_count(&test_db, id).await, 0);
    assert!(test_db.db.notes.fetch_owned(owner.id, id).await.unwrap().is_none());
    assert_eq!(test_db.db.tags.list().await.unwrap().len(), 2);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_foreign_owner_cannot_touch_note() {
    let test_db = TestDatabase::new().await;
    let a = test_db.create_identity("a@example.com").await;
    let b = test_db.create_identity("b@example.com").await;

    let id = test_db.db.notes.insert(a.id, note("private", "secret")).await.unwrap();

    assert!(test_db.db.notes.fetch_owned(b.id, id).await.unwrap().is_none());
    assert!(!test_db.db.notes.delete_owned(b.id, id).await.unwrap());
    let edited = test_db
        .db
        .notes
        .update_owned(
            b.id,
            id,
            UpdateNoteRequest {
                title: "hijacked".to_string(),
                body: String::new(),
                tags: Some(TagSet::empty()),
            },
        )
        .await
        .unwrap();
    assert!(!edited);

    let still = test_db.db.notes.fetch_owned(a.id, id).await.unwrap().unwrap();
    assert_eq!(still.note.title, "private");
    assert_eq!(link_count(&test_db, id).await, 1);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_update_replaces_tags_when_given() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.create_identity("a@example.com").await;
    let id = test_db.db.notes.insert(owner.id, note("t", "old")).await.unwrap();

    let updated = test_db
        .db
        .notes
        .update_owned(
            owner.id,
            id,
            UpdateNoteRequest {
                title: "t2".to_string(),
                body: "b2".to_string(),
                tags: Some(TagSet::parse("new").unwrap()),
            },
        )
        .await
        .unwrap();
    assert!(updated);

    let fetched = test_db.db.notes.fetch_owned(owner.id, id).await.unwrap().unwrap();
    assert_eq!(fetched.note.title, "t2");
    assert_eq!(fetched.tag_names(), vec!["new"]);
    assert!(fetched.note.updated_at_utc >= fetched.note.created_at_utc);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_list_is_newest_first_and_owner_scoped() {
    let test_db = TestDatabase::new().await;
    let a = test_db.create_identity("a@example.com").await;
    let b = test_db.create_identity("b@example.com").await;

    let first = test_db.db.notes.insert(a.id, note("first", "")).await.unwrap();
    let second = test_db.db.notes.insert(a.id, note("second", "x")).await.unwrap();
    test_db.db.notes.insert(b.id, note("other", "")).await.unwrap();

    let listed = test_db.db.notes.list_for_owner(a.id).await.unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|n| n.note.id).collect();
    assert_eq!(ids, vec![second, first]);
    assert_eq!(listed[0].tag_names(), vec!["x"]);
    assert!(listed[1].tags.is_empty());

    test_db.cleanup().await;
}
