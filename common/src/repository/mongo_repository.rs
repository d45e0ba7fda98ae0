use async_trait::async_trait;
use futures::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOptions, IndexOptions},
    IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{self, AddCode};

use super::{Direction, Entity, Repository, Revisioned};

pub struct MongoRepository<T> {
    pub collection: mongodb::Collection<T>,
}

impl<T: Send + Sync> MongoRepository<T> {
    pub async fn new(
        mongo_uri: &str,
        database: &str,
        collection: &str,
    ) -> mongodb::error::Result<Self> {
        let collection = mongodb::Client::with_uri_str(mongo_uri)
            .await?
            .database(database)
            .collection(collection);
        Ok(Self { collection })
    }

    pub async fn ensure_index(&self, keys: &[(&str, Direction)]) -> mongodb::error::Result<()> {
        let model = IndexModel::builder()
            .keys(sort_document(keys))
            .options(IndexOptions::builder().background(true).build())
            .build();
        self.collection.create_index(model, None).await?;
        Ok(())
    }
}

const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

fn sort_document(keys: &[(&str, Direction)]) -> Document {
    keys.iter()
        .map(|(field, direction)| (field.to_string(), Bson::Int32(direction.as_i32())))
        .collect()
}

#[async_trait]
impl<T> Repository<T> for MongoRepository<T>
where
    T: Entity + Revisioned + Serialize + DeserializeOwned + Unpin + Clone + Send + Sync,
{
    async fn insert(&self, item: &T) -> error::Result<bool> {
        match self.collection.insert_one(item, None).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn find(&self, field: &str, value: &Bson) -> error::Result<Option<T>> {
        let result = self.collection.find_one(doc! {field: value}, None).await?;
        Ok(result)
    }

    async fn find_many(
        &self,
        filter: Document,
        sort: &[(&str, Direction)],
    ) -> error::Result<Vec<T>> {
        let find_options = FindOptions::builder().sort(sort_document(sort)).build();

        let result: Vec<mongodb::error::Result<T>> = self
            .collection
            .find(filter, find_options)
            .await?
            .collect()
            .await;
        Ok(result.into_iter().collect::<mongodb::error::Result<_>>()?)
    }

    async fn count(&self, filter: Document) -> error::Result<u64> {
        Ok(self.collection.count_documents(filter, None).await?)
    }

    async fn update_one(&self, item: &T) -> error::Result<T> {
        let mut update = item.clone();
        update.set_revision(item.revision() + 1);

        let result = self
            .collection
            .replace_one(
                doc! {"_id": item.id(), "revision": item.revision()},
                &update,
                None,
            )
            .await?;

        if result.matched_count == 0 {
            let exists = self
                .collection
                .find_one(doc! {"_id": item.id()}, None)
                .await?
                .is_some();

            return if exists {
                Err(anyhow::anyhow!("Failed to save changes").code(409))
            } else {
                Err(anyhow::anyhow!("Item not found").code(404))
            };
        }

        Ok(update)
    }

    async fn delete(&self, field: &str, id: &ObjectId) -> error::Result<Option<T>> {
        let result = self
            .collection
            .find_one_and_delete(doc! {field: id}, None)
            .await?;
        Ok(result)
    }
}
