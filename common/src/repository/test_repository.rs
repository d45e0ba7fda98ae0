use std::{cmp::Ordering, sync::Mutex};

use async_trait::async_trait;
use mongodb::bson::{self, oid::ObjectId, Bson, Document};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{self, AddCode};

use super::{Direction, Entity, Repository, Revisioned};

/// In-memory stand-in for [`MongoRepository`](super::mongo_repository::MongoRepository).
/// Items are kept as BSON documents so filters see the same field names as the database.
pub struct TestRepository<T> {
    _t: std::marker::PhantomData<T>,
    pub db: Mutex<Vec<Document>>,
}

impl<T> TestRepository<T> {
    pub fn new() -> Self {
        Self {
            _t: std::marker::PhantomData,
            db: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> error::Result<std::sync::MutexGuard<'_, Vec<Document>>> {
        self.db
            .lock()
            .map_err(|_| anyhow::anyhow!("Test repository lock poisoned").code(500))
    }
}

impl<T> Default for TestRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = current.as_document()?.get(part)?;
    }
    Some(current)
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(path, expected)| lookup(document, path) == Some(expected))
}

fn compare(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (Some(Bson::Int64(a)), Some(Bson::Int64(b))) => a.cmp(b),
        (Some(Bson::Int32(a)), Some(Bson::Int32(b))) => a.cmp(b),
        (Some(Bson::String(a)), Some(Bson::String(b))) => a.cmp(b),
        (Some(Bson::ObjectId(a)), Some(Bson::ObjectId(b))) => a.bytes().cmp(&b.bytes()),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn id_of(document: &Document) -> Option<ObjectId> {
    document.get_object_id("_id").ok()
}

#[async_trait]
impl<T> Repository<T> for TestRepository<T>
where
    T: Entity + Revisioned + Clone + Send + Sync + Serialize + DeserializeOwned,
{
    async fn insert(&self, item: &T) -> error::Result<bool> {
        let document = bson::to_document(item)?;
        let mut db = self.lock()?;

        let contains = db.iter().any(|x| id_of(x) == Some(item.id()));
        if !contains {
            db.push(document);
        }
        Ok(!contains)
    }

    async fn find(&self, field: &str, value: &Bson) -> error::Result<Option<T>> {
        let db = self.lock()?;
        let found = db.iter().find(|x| lookup(x, field) == Some(value)).cloned();
        Ok(found.map(bson::from_document).transpose()?)
    }

    async fn find_many(
        &self,
        filter: Document,
        sort: &[(&str, Direction)],
    ) -> error::Result<Vec<T>> {
        let mut found: Vec<Document> = {
            let db = self.lock()?;
            db.iter().filter(|x| matches(x, &filter)).cloned().collect()
        };

        found.sort_by(|a, b| {
            sort.iter()
                .map(|(field, direction)| {
                    let ordering = compare(lookup(a, field), lookup(b, field));
                    match direction {
                        Direction::Ascending => ordering,
                        Direction::Descending => ordering.reverse(),
                    }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        Ok(found
            .into_iter()
            .map(bson::from_document)
            .collect::<Result<_, _>>()?)
    }

    async fn count(&self, filter: Document) -> error::Result<u64> {
        let db = self.lock()?;
        Ok(db.iter().filter(|x| matches(x, &filter)).count() as u64)
    }

    async fn update_one(&self, item: &T) -> error::Result<T> {
        let mut update = item.clone();
        update.set_revision(item.revision() + 1);
        let document = bson::to_document(&update)?;

        let mut db = self.lock()?;
        let Some(stored) = db.iter_mut().find(|x| id_of(x) == Some(item.id())) else {
            return Err(anyhow::anyhow!("Item not found").code(404));
        };

        if stored.get_i64("revision").unwrap_or_default() != item.revision() {
            return Err(anyhow::anyhow!("Failed to save changes").code(409));
        }

        *stored = document;
        Ok(update)
    }

    async fn delete(&self, field: &str, id: &ObjectId) -> error::Result<Option<T>> {
        let mut db = self.lock()?;
        let position = db
            .iter()
            .position(|x| x.get_object_id(field).ok().as_ref() == Some(id));

        Ok(position
            .map(|x| db.remove(x))
            .map(bson::from_document)
            .transpose()?)
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;
    use serde::Deserialize;

    use super::*;
    use crate::error::ErrorKind;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(rename = "_id")]
        id: ObjectId,
        owner: Owner,
        stamp: i64,
        revision: i64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Owner {
        id: String,
    }

    impl Entity for Note {
        fn id(&self) -> ObjectId {
            self.id
        }
    }

    impl Revisioned for Note {
        fn revision(&self) -> i64 {
            self.revision
        }

        fn set_revision(&mut self, revision: i64) {
            self.revision = revision;
        }
    }

    fn note(owner: &str, stamp: i64) -> Note {
        Note {
            id: ObjectId::new(),
            owner: Owner {
                id: owner.to_string(),
            },
            stamp,
            revision: 0,
        }
    }

    #[actix_web::test]
    async fn insert_never_overwrites() {
        let repo = TestRepository::<Note>::new();
        let first = note("a", 1);
        let mut clash = first.clone();
        clash.stamp = 99;

        assert!(repo.insert(&first).await.unwrap());
        assert!(!repo.insert(&clash).await.unwrap());

        let stored = repo
            .find("_id", &Bson::ObjectId(first.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.stamp, 1);
    }

    #[actix_web::test]
    async fn find_many_filters_on_nested_paths_and_sorts() {
        let repo = TestRepository::<Note>::new();
        for (owner, stamp) in [("a", 1), ("b", 2), ("a", 3), ("a", 2)] {
            repo.insert(&note(owner, stamp)).await.unwrap();
        }

        let found = repo
            .find_many(doc! {"owner.id": "a"}, &[("stamp", Direction::Descending)])
            .await
            .unwrap();

        let stamps: Vec<i64> = found.iter().map(|n| n.stamp).collect();
        assert_eq!(stamps, vec![3, 2, 1]);
        assert_eq!(repo.count(doc! {}).await.unwrap(), 4);
        assert_eq!(repo.count(doc! {"owner.id": "b"}).await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn stale_revision_is_a_conflict() {
        let repo = TestRepository::<Note>::new();
        let original = note("a", 1);
        repo.insert(&original).await.unwrap();

        let mut first = original.clone();
        first.stamp = 2;
        let written = repo.update_one(&first).await.unwrap();
        assert_eq!(written.revision, 1);

        let mut second = original.clone();
        second.stamp = 3;
        let err = repo.update_one(&second).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let stored = repo
            .find("_id", &Bson::ObjectId(original.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.stamp, 2);
    }

    #[actix_web::test]
    async fn update_and_delete_of_missing_item() {
        let repo = TestRepository::<Note>::new();
        let ghost = note("a", 1);

        let err = repo.update_one(&ghost).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(repo.delete("_id", &ghost.id).await.unwrap().is_none());
    }
}
