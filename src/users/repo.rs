use async_trait::async_trait;
use bson::{doc, Document};
use futures_util::TryStreamExt;
use mongodb::{
    options::{FindOptions, IndexOptions},
    Collection, Database, IndexModel,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::users::repo_types::User;

pub const COLLECTION: &str = "users";

/// Persistence seam for users. Each method is a single database operation.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list(&self, limit: i64, offset: u64) -> ApiResult<Vec<User>>;

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>>;

    /// True when some user other than `except` already holds `email`.
    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> ApiResult<bool>;

    async fn create(&self, user: &User) -> ApiResult<()>;

    /// Returns false when no user matched `id`.
    async fn update_profile(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
        updated_at: OffsetDateTime,
    ) -> ApiResult<bool>;

    /// Returns false when no user matched `id`.
    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        updated_at: OffsetDateTime,
    ) -> ApiResult<bool>;

    /// Returns false when nothing was deleted.
    async fn delete(&self, id: Uuid) -> ApiResult<bool>;
}

pub fn id_filter(id: Uuid) -> Document {
    doc! { "_id": bson::Uuid::from_uuid_1(id) }
}

pub fn email_filter(email: &str, except: Option<Uuid>) -> Document {
    let mut filter = doc! { "email": email };
    if let Some(id) = except {
        filter.insert("_id", doc! { "$ne": bson::Uuid::from_uuid_1(id) });
    }
    filter
}

/// Oldest first; `_id` breaks ties so skip/limit pages don't overlap.
pub fn list_sort() -> Document {
    doc! { "created_at": 1, "_id": 1 }
}

pub struct MongoUserStore {
    collection: Collection<User>,
}

impl MongoUserStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<User>(COLLECTION),
        }
    }

    /// Unique index on `email`; the database is the final word on uniqueness.
    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("email_unique".to_string())
                    .build(),
            )
            .build();
        self.collection.create_index(index).await?;
        info!(collection = COLLECTION, "indexes ensured");
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    #[instrument(skip(self))]
    async fn list(&self, limit: i64, offset: u64) -> ApiResult<Vec<User>> {
        let options = FindOptions::builder()
            .limit(limit)
            .skip(offset)
            .sort(list_sort())
            .build();
        let cursor = self.collection.find(doc! {}).with_options(options).await?;
        let users: Vec<User> = cursor.try_collect().await?;
        Ok(users)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<User>> {
        Ok(self.collection.find_one(id_filter(id)).await?)
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    #[instrument(skip(self))]
    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> ApiResult<bool> {
        let count = self
            .collection
            .count_documents(email_filter(email, except))
            .await?;
        Ok(count > 0)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn create(&self, user: &User) -> ApiResult<()> {
        self.collection.insert_one(user).await?;
        Ok(())
    }

    #[instrument(skip(self, name, email))]
    async fn update_profile(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
        updated_at: OffsetDateTime,
    ) -> ApiResult<bool> {
        let update = doc! {
            "$set": {
                "name": name,
                "email": email,
                "updated_at": bson::DateTime::from_time_0_3(updated_at),
            }
        };
        let result = self.collection.update_one(id_filter(id), update).await?;
        Ok(result.matched_count > 0)
    }

    #[instrument(skip(self, password_hash))]
    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        updated_at: OffsetDateTime,
    ) -> ApiResult<bool> {
        let update = doc! {
            "$set": {
                "password_hash": password_hash,
                "updated_at": bson::DateTime::from_time_0_3(updated_at),
            }
        };
        let result = self.collection.update_one(id_filter(id), update).await?;
        Ok(result.matched_count > 0)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> ApiResult<bool> {
        let result = self.collection.delete_one(id_filter(id)).await?;
        Ok(result.deleted_count > 0)
    }
}
