use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::domain::{DomainError, DomainResult, NewUser, UserRecord, UserStore};
use crate::infrastructure::database::entities::user;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::database::{init_database, DatabaseConfig};

/// SQLite-backed user store.
///
/// The unique index on `email` plus a transaction around check-and-insert
/// closes the signup race.
pub struct SeaOrmUserStore {
    db: DatabaseConnection,
}

impl SeaOrmUserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Connect and bring the schema up to date.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, sea_orm::DbErr> {
        let db = init_database(config).await?;
        info!("Running database migrations...");
        Migrator::up(&db, None).await?;
        info!("Migrations completed");
        Ok(Self::new(db))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn user_model_to_domain(model: user::Model) -> UserRecord {
    UserRecord {
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        created_at: Some(model.created_at),
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(format!("Database error: {}", e))
}

fn is_unique_violation(e: &sea_orm::DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || e.to_string().contains("UNIQUE")
}

// ── Repository implementation ───────────────────────────────────

#[async_trait]
impl UserStore for SeaOrmUserStore {
    async fn load(&self) -> DomainResult<Vec<UserRecord>> {
        let models = user::Entity::find()
            .order_by_asc(user::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(user_model_to_domain).collect())
    }

    async fn exists_email(&self, email: &str) -> DomainResult<bool> {
        let count = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<UserRecord>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn add(&self, new_user: NewUser) -> DomainResult<UserRecord> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(&new_user.email))
            .one(&txn)
            .await
            .map_err(db_err)?;
        if taken.is_some() {
            return Err(DomainError::DuplicateEmail(new_user.email));
        }

        let row = user::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            username: Set(new_user.username),
            email: Set(new_user.email.clone()),
            password_hash: Set(new_user.password_hash),
            created_at: Set(Utc::now()),
        };

        let inserted = row.insert(&txn).await.map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::DuplicateEmail(new_user.email.clone())
            } else {
                db_err(e)
            }
        })?;
        txn.commit().await.map_err(db_err)?;

        debug!(email = %inserted.email, "User row inserted");
        Ok(user_model_to_domain(inserted))
    }

    async fn count(&self) -> DomainResult<u64> {
        user::Entity::find().count(&self.db).await.map_err(db_err)
    }
}
