use diesel::prelude::*;
use diesel_async::pooled_connection::deadpool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use super::*;
use crate::schema::{accounts, replays};

const MIGRATIONS: diesel_async_migrations::EmbeddedMigrations =
    diesel_async_migrations::embed_migrations!("../migrations/");

pub type Pool = deadpool::Pool<AsyncPgConnection>;

/// Postgres backed store, one row per replay entry.
///
/// Every mutation is a single targeted statement, so concurrent writers on
/// the same account never overwrite each other's entries.
#[derive(Clone)]
pub struct DieselStore {
    pool: Pool,
}

impl DieselStore {
    pub fn connect(database_url: &str, max_connections: usize) -> Result<Self, StoreError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(manager)
            .max_size(max_connections)
            .build()
            .map_err(|e| StoreError::Pool(e.to_string()))?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        MIGRATIONS
            .run_pending_migrations(&mut *conn)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))
    }

    async fn connection(&self) -> Result<deadpool::Object<AsyncPgConnection>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

/// Entries of one account, oldest upload first. Uploads sharing a
/// timestamp are ordered by id.
fn account_entries(account: &str) -> replays::BoxedQuery<'_, diesel::pg::Pg> {
    replays::table
        .filter(replays::account_id.eq(account))
        .order(replays::uploaded_at.asc())
        .then_order_by(replays::id.asc())
        .into_boxed()
}

#[async_trait::async_trait]
impl ReplayStore for DieselStore {
    #[tracing::instrument(skip(self))]
    async fn find_owner(&self, stored_path: &str) -> Result<Option<AccountId>, StoreError> {
        let mut conn = self.connection().await?;

        let query = replays::table
            .filter(replays::stored_path.eq(stored_path))
            .select(replays::account_id);
        tracing::trace!(query = %diesel::debug_query::<diesel::pg::Pg, _>(&query), "Find owner");

        let owner: Option<String> = query.first(&mut *conn).await.optional()?;
        Ok(owner.map(AccountId))
    }

    #[tracing::instrument(skip(self, data))]
    async fn attach_decoded(
        &self,
        account: &AccountId,
        stored_path: &str,
        data: &DecodedMatch,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_value(data)?;
        let mut conn = self.connection().await?;

        let updated = diesel::update(replays::table)
            .filter(replays::account_id.eq(account.as_str()))
            .filter(replays::stored_path.eq(stored_path))
            .filter(replays::processed.eq(false))
            .set((
                replays::processed.eq(true),
                replays::data.eq(Some(payload)),
            ))
            .execute(&mut *conn)
            .await?;

        if updated > 0 {
            return Ok(());
        }

        let exists: bool = diesel::select(diesel::dsl::exists(
            replays::table
                .filter(replays::account_id.eq(account.as_str()))
                .filter(replays::stored_path.eq(stored_path)),
        ))
        .get_result(&mut *conn)
        .await?;

        if exists {
            Err(StoreError::AlreadyProcessed)
        } else {
            Err(StoreError::NotFound)
        }
    }

    #[tracing::instrument(skip(self))]
    async fn remove_entry(
        &self,
        account: &AccountId,
        replay_id: &str,
    ) -> Result<ReplayFile, StoreError> {
        let mut conn = self.connection().await?;

        let removed: Option<crate::models::Replay> = diesel::delete(
            replays::table
                .filter(replays::account_id.eq(account.as_str()))
                .filter(replays::id.eq(replay_id)),
        )
        .returning(crate::models::Replay::as_returning())
        .get_result(&mut *conn)
        .await
        .optional()?;

        let removed = removed.ok_or(StoreError::NotFound)?;
        Ok(ReplayFile::try_from(removed)?)
    }

    #[tracing::instrument(skip(self))]
    async fn insert_entry(
        &self,
        account: &AccountId,
        replay: NewReplay,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;

        let stored_path = replay.stored_path.clone();
        let account_row = crate::models::AddAccount {
            account_id: account.0.clone(),
        };
        let replay_row = crate::models::AddReplay {
            id: replay.id,
            account_id: account.0.clone(),
            stored_path: replay.stored_path,
            original_name: replay.original_name,
        };

        let result = conn
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                Box::pin(async move {
                    diesel::insert_into(accounts::table)
                        .values(account_row)
                        .on_conflict_do_nothing()
                        .execute(conn)
                        .await?;
                    diesel::insert_into(replays::table)
                        .values(replay_row)
                        .execute(conn)
                        .await?;

                    Ok(())
                })
            })
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => Err(StoreError::Conflict(stored_path)),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn list_entries(&self, account: &AccountId) -> Result<Vec<ReplayFile>, StoreError> {
        let mut conn = self.connection().await?;

        let rows: Vec<crate::models::Replay> = account_entries(account.as_str())
            .select(crate::models::Replay::as_select())
            .load(&mut *conn)
            .await?;

        rows.into_iter()
            .map(|r| ReplayFile::try_from(r).map_err(StoreError::from))
            .collect()
    }
}
