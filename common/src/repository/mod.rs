pub mod mongo_repository;
pub mod test_repository;

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};

use crate::error;

pub trait Entity {
    fn id(&self) -> ObjectId;
}

/// Stored records carry a revision that every write bumps, so concurrent writers can detect
/// that they raced.
pub trait Revisioned {
    fn revision(&self) -> i64;
    fn set_revision(&mut self, revision: i64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_i32(&self) -> i32 {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }
}

#[async_trait]
pub trait Repository<T>: Send + Sync {
    /// Returns `false` without writing when an item with the same id already exists.
    async fn insert(&self, item: &T) -> error::Result<bool>;
    async fn find(&self, field: &str, value: &Bson) -> error::Result<Option<T>>;
    /// `filter` is a conjunction of equality constraints keyed by dotted field paths.
    async fn find_many(
        &self,
        filter: Document,
        sort: &[(&str, Direction)],
    ) -> error::Result<Vec<T>>;
    async fn count(&self, filter: Document) -> error::Result<u64>;
    /// Replaces the stored item if its revision still matches `item`'s and returns the
    /// written value. Fails with 404 if the item is gone and 409 if someone wrote first.
    async fn update_one(&self, item: &T) -> error::Result<T>;
    async fn delete(&self, field: &str, id: &ObjectId) -> error::Result<Option<T>>;
}

pub type RepositoryObject<T> = Arc<dyn Repository<T>>;
