use anyhow::{Context, Result};
use chrono::Local;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set, TransactionTrait,
};

use super::entities::{subscriptions, units, users};
use crate::db::types::RoomTypes;
use crate::error::SubscriptionError;

/// Lookup key for a unit name: trimmed and lowercased.
pub fn unit_key(name: &str) -> String {
    name.trim().to_lowercase()
}

pub struct Repo {
    db: DatabaseConnection,
}

impl Repo {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn ping(&self) -> Result<()> {
        self.db.ping().await.context("Database ping failed")
    }

    // ==================== Users ====================

    /// Create or reactivate a user (atomic upsert)
    /// On conflict: only flips `active` back on, preserves `is_premium`
    pub async fn register_user(&self, line_user_id: &str) -> Result<users::Model> {
        let now = Local::now().naive_local();

        let new_user = users::ActiveModel {
            line_user_id: Set(line_user_id.to_string()),
            is_premium: Set(false),
            reply_token: Set(None),
            active: Set(true),
            created_at: Set(now),
        };

        // INSERT ... ON CONFLICT(line_user_id) DO UPDATE SET active = excluded.active
        users::Entity::insert(new_user)
            .on_conflict(
                OnConflict::column(users::Column::LineUserId)
                    .update_column(users::Column::Active)
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .context("Failed to register user")?;

        users::Entity::find_by_id(line_user_id.to_string())
            .one(&self.db)
            .await
            .context("Failed to fetch registered user")?
            .ok_or_else(|| anyhow::anyhow!("User {} not found after upsert", line_user_id))
    }

    pub async fn get_user(&self, line_user_id: &str) -> Result<Option<users::Model>> {
        users::Entity::find_by_id(line_user_id.to_string())
            .one(&self.db)
            .await
            .context("Failed to get user")
    }

    /// Remember the latest reply token handed out by LINE for this user
    pub async fn update_reply_token(&self, line_user_id: &str, reply_token: &str) -> Result<()> {
        users::Entity::update_many()
            .col_expr(users::Column::ReplyToken, Expr::value(reply_token))
            .filter(users::Column::LineUserId.eq(line_user_id))
            .exec(&self.db)
            .await
            .context("Failed to update reply token")?;
        Ok(())
    }

    #[allow(dead_code)]
    pub async fn set_premium(&self, line_user_id: &str, is_premium: bool) -> Result<users::Model> {
        let user = users::Entity::find_by_id(line_user_id.to_string())
            .one(&self.db)
            .await
            .context("Failed to query user")?
            .ok_or_else(|| anyhow::anyhow!("User {} not found", line_user_id))?;

        let mut active: users::ActiveModel = user.into_active_model();
        active.is_premium = Set(is_premium);
        active
            .update(&self.db)
            .await
            .context("Failed to update premium flag")
    }

    /// Unfollow: mark the user inactive and soft-delete every active subscription.
    /// Returns the number of subscriptions retired.
    pub async fn deactivate_user(&self, line_user_id: &str) -> Result<u64> {
        let now = Local::now().naive_local();
        let txn = self
            .db
            .begin()
            .await
            .context("Failed to begin transaction")?;

        users::Entity::update_many()
            .col_expr(users::Column::Active, Expr::value(false))
            .filter(users::Column::LineUserId.eq(line_user_id))
            .exec(&txn)
            .await
            .context("Failed to deactivate user")?;

        let unit_ids = active_unit_ids_of(&txn, line_user_id).await?;

        let retired = subscriptions::Entity::update_many()
            .col_expr(subscriptions::Column::DeletedAt, Expr::value(now))
            .filter(subscriptions::Column::LineUserId.eq(line_user_id))
            .filter(subscriptions::Column::DeletedAt.is_null())
            .exec(&txn)
            .await
            .context("Failed to retire user subscriptions")?
            .rows_affected;

        for unit_id in unit_ids {
            refresh_unit_flag_in(&txn, unit_id).await?;
        }

        txn.commit().await.context("Failed to commit transaction")?;
        Ok(retired)
    }

    /// Hard-delete a user; subscriptions go with it through the foreign key.
    #[allow(dead_code)]
    pub async fn delete_user(&self, line_user_id: &str) -> Result<()> {
        let txn = self
            .db
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let unit_ids = active_unit_ids_of(&txn, line_user_id).await?;

        // Delete explicitly as well; sqlite only cascades with foreign_keys enabled
        subscriptions::Entity::delete_many()
            .filter(subscriptions::Column::LineUserId.eq(line_user_id))
            .exec(&txn)
            .await
            .context("Failed to delete user subscriptions")?;

        users::Entity::delete_by_id(line_user_id.to_string())
            .exec(&txn)
            .await
            .context("Failed to delete user")?;

        for unit_id in unit_ids {
            refresh_unit_flag_in(&txn, unit_id).await?;
        }

        txn.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }

    // ==================== Units ====================

    /// Create or update a unit by name (used when seeding from configuration)
    pub async fn upsert_unit(
        &self,
        unit_name: &str,
        unit_code: &str,
        url: Option<String>,
    ) -> Result<units::Model> {
        let now = Local::now().naive_local();
        let name_key = unit_key(unit_name);

        let new_unit = units::ActiveModel {
            unit_name: Set(unit_name.trim().to_string()),
            name_key: Set(name_key.clone()),
            unit_code: Set(unit_code.trim().to_string()),
            is_subscribed: Set(false),
            url: Set(url),
            created_at: Set(now),
            ..Default::default()
        };

        // INSERT ... ON CONFLICT(name_key) DO UPDATE, keeps is_subscribed
        units::Entity::insert(new_unit)
            .on_conflict(
                OnConflict::column(units::Column::NameKey)
                    .update_columns([
                        units::Column::UnitName,
                        units::Column::UnitCode,
                        units::Column::Url,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .context("Failed to upsert unit")?;

        units::Entity::find()
            .filter(units::Column::NameKey.eq(name_key))
            .one(&self.db)
            .await
            .context("Failed to fetch upserted unit")?
            .ok_or_else(|| anyhow::anyhow!("Unit {} not found after upsert", unit_name))
    }

    /// Case-insensitive exact-match lookup by unit name
    pub async fn resolve_unit(&self, unit_name: &str) -> Result<units::Model, SubscriptionError> {
        resolve_unit_in(&self.db, unit_name).await
    }

    #[allow(dead_code)]
    pub async fn get_unit(&self, unit_id: i32) -> Result<Option<units::Model>> {
        units::Entity::find_by_id(unit_id)
            .one(&self.db)
            .await
            .context("Failed to get unit")
    }

    /// Distinct units with at least one active subscription from an active user
    pub async fn list_subscribed_units(&self) -> Result<Vec<units::Model>> {
        units::Entity::find()
            .join(JoinType::InnerJoin, units::Relation::Subscriptions.def())
            .join(JoinType::InnerJoin, subscriptions::Relation::User.def())
            .filter(subscriptions::Column::DeletedAt.is_null())
            .filter(users::Column::Active.eq(true))
            .distinct()
            .order_by_asc(units::Column::Id)
            .all(&self.db)
            .await
            .context("Failed to list subscribed units")
    }

    /// Recompute `is_subscribed` from the active subscriptions of a unit
    pub async fn refresh_unit_flag(&self, unit_id: i32) -> Result<bool> {
        refresh_unit_flag_in(&self.db, unit_id).await
    }

    // ==================== Subscriptions ====================

    /// Subscribe a user to a unit, reactivating a retired row if one exists.
    ///
    /// Non-premium users may hold one active subscription; re-subscribing to
    /// the unit they already watch only replaces the room-type filter.
    pub async fn subscribe(
        &self,
        line_user_id: &str,
        unit_name: &str,
        room_types: RoomTypes,
    ) -> Result<(units::Model, subscriptions::Model), SubscriptionError> {
        let now = Local::now().naive_local();

        // Limit check and upsert must see the same state
        let txn = self
            .db
            .begin()
            .await
            .context("Failed to begin transaction")?;

        // Write before reading: locks the user row on postgres and takes the
        // database write lock on sqlite, so concurrent subscribes queue up
        // instead of failing on lock upgrade.
        users::Entity::update_many()
            .col_expr(users::Column::Active, Expr::col(users::Column::Active).into())
            .filter(users::Column::LineUserId.eq(line_user_id))
            .exec(&txn)
            .await
            .context("Failed to lock user")?;

        let user = users::Entity::find_by_id(line_user_id.to_string())
            .one(&txn)
            .await
            .context("Failed to query user")?
            .ok_or_else(|| anyhow::anyhow!("User {} is not registered", line_user_id))?;

        let unit = resolve_unit_in(&txn, unit_name).await?;

        if !user.is_premium {
            let others = subscriptions::Entity::find()
                .filter(subscriptions::Column::LineUserId.eq(line_user_id))
                .filter(subscriptions::Column::UnitId.ne(unit.id))
                .filter(subscriptions::Column::DeletedAt.is_null())
                .count(&txn)
                .await
                .context("Failed to count active subscriptions")?;
            if others > 0 {
                return Err(SubscriptionError::SubscriptionLimitReached);
            }
        }

        let new_sub = subscriptions::ActiveModel {
            line_user_id: Set(line_user_id.to_string()),
            unit_id: Set(unit.id),
            room_types: Set(room_types),
            deleted_at: Set(None),
            created_at: Set(now),
            ..Default::default()
        };

        // INSERT ... ON CONFLICT(line_user_id, unit_id)
        // DO UPDATE SET room_types = excluded.room_types, deleted_at = NULL
        subscriptions::Entity::insert(new_sub)
            .on_conflict(
                OnConflict::columns([
                    subscriptions::Column::LineUserId,
                    subscriptions::Column::UnitId,
                ])
                .update_columns([
                    subscriptions::Column::RoomTypes,
                    subscriptions::Column::DeletedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
            .context("Failed to upsert subscription")?;

        let sub = subscriptions::Entity::find()
            .filter(subscriptions::Column::LineUserId.eq(line_user_id))
            .filter(subscriptions::Column::UnitId.eq(unit.id))
            .one(&txn)
            .await
            .context("Failed to fetch upserted subscription")?
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Subscription for user {} unit {} not found after upsert",
                    line_user_id,
                    unit.id
                )
            })?;

        refresh_unit_flag_in(&txn, unit.id).await?;
        txn.commit().await.context("Failed to commit transaction")?;

        Ok((unit, sub))
    }

    /// Soft-delete the user's active subscription to a unit
    pub async fn unsubscribe(
        &self,
        line_user_id: &str,
        unit_name: &str,
    ) -> Result<units::Model, SubscriptionError> {
        let now = Local::now().naive_local();
        let txn = self
            .db
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let unit = resolve_unit_in(&txn, unit_name).await?;

        let retired = subscriptions::Entity::update_many()
            .col_expr(subscriptions::Column::DeletedAt, Expr::value(now))
            .filter(subscriptions::Column::LineUserId.eq(line_user_id))
            .filter(subscriptions::Column::UnitId.eq(unit.id))
            .filter(subscriptions::Column::DeletedAt.is_null())
            .exec(&txn)
            .await
            .context("Failed to retire subscription")?
            .rows_affected;

        if retired == 0 {
            return Err(SubscriptionError::NotSubscribed(unit.unit_name));
        }

        refresh_unit_flag_in(&txn, unit.id).await?;
        txn.commit().await.context("Failed to commit transaction")?;

        Ok(unit)
    }

    /// All non-deleted subscriptions of a user with their units
    pub async fn list_active(
        &self,
        line_user_id: &str,
    ) -> Result<Vec<(subscriptions::Model, units::Model)>> {
        subscriptions::Entity::find()
            .filter(subscriptions::Column::LineUserId.eq(line_user_id))
            .filter(subscriptions::Column::DeletedAt.is_null())
            .order_by_asc(subscriptions::Column::Id)
            .find_also_related(units::Entity)
            .all(&self.db)
            .await
            .context("Failed to list active subscriptions")
            .map(|results| {
                results
                    .into_iter()
                    .filter_map(|(sub, unit)| unit.map(|u| (sub, u)))
                    .collect()
            })
    }

    /// Active subscriptions of active users for a unit
    pub async fn list_unit_subscribers(&self, unit_id: i32) -> Result<Vec<subscriptions::Model>> {
        subscriptions::Entity::find()
            .join(JoinType::InnerJoin, subscriptions::Relation::User.def())
            .filter(subscriptions::Column::UnitId.eq(unit_id))
            .filter(subscriptions::Column::DeletedAt.is_null())
            .filter(users::Column::Active.eq(true))
            .order_by_asc(subscriptions::Column::Id)
            .all(&self.db)
            .await
            .context("Failed to list unit subscribers")
    }

    /// Soft-delete one subscription by id. Returns false if it was already retired.
    pub async fn retire_subscription(&self, subscription_id: i32) -> Result<bool> {
        let now = Local::now().naive_local();
        let result = subscriptions::Entity::update_many()
            .col_expr(subscriptions::Column::DeletedAt, Expr::value(now))
            .filter(subscriptions::Column::Id.eq(subscription_id))
            .filter(subscriptions::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .context("Failed to retire subscription")?;
        Ok(result.rows_affected > 0)
    }
}

async fn resolve_unit_in<C: ConnectionTrait>(
    conn: &C,
    unit_name: &str,
) -> Result<units::Model, SubscriptionError> {
    units::Entity::find()
        .filter(units::Column::NameKey.eq(unit_key(unit_name)))
        .one(conn)
        .await
        .context("Failed to resolve unit")?
        .ok_or_else(|| SubscriptionError::UnitNotFound(unit_name.trim().to_string()))
}

async fn active_unit_ids_of<C: ConnectionTrait>(conn: &C, line_user_id: &str) -> Result<Vec<i32>> {
    subscriptions::Entity::find()
        .select_only()
        .column(subscriptions::Column::UnitId)
        .filter(subscriptions::Column::LineUserId.eq(line_user_id))
        .filter(subscriptions::Column::DeletedAt.is_null())
        .into_tuple::<i32>()
        .all(conn)
        .await
        .context("Failed to list subscribed unit ids")
}

async fn refresh_unit_flag_in<C: ConnectionTrait>(conn: &C, unit_id: i32) -> Result<bool> {
    let active = subscriptions::Entity::find()
        .filter(subscriptions::Column::UnitId.eq(unit_id))
        .filter(subscriptions::Column::DeletedAt.is_null())
        .count(conn)
        .await
        .context("Failed to count unit subscriptions")?;

    let is_subscribed = active > 0;
    units::Entity::update_many()
        .col_expr(units::Column::IsSubscribed, Expr::value(is_subscribed))
        .filter(units::Column::Id.eq(unit_id))
        .exec(conn)
        .await
        .context("Failed to update unit subscription flag")?;

    Ok(is_subscribed)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    pub(crate) async fn setup_test_db() -> Result<Repo> {
        // In-memory SQLite with the real schema
        let db = Database::connect("sqlite::memory:").await?;
        migration::Migrator::up(&db, None).await?;
        Ok(Repo::new(db))
    }

    async fn seeded_repo() -> Repo {
        let repo = setup_test_db().await.unwrap();
        repo.upsert_unit("代々木ビュー", "20_1310", Some("https://example.com/yoyogi".into()))
            .await
            .unwrap();
        repo.upsert_unit("Shinjuku Heights", "20_4470", None)
            .await
            .unwrap();
        repo.register_user("U1").await.unwrap();
        repo
    }

    async fn active_count(repo: &Repo, user: &str) -> u64 {
        subscriptions::Entity::find()
            .filter(subscriptions::Column::LineUserId.eq(user))
            .filter(subscriptions::Column::DeletedAt.is_null())
            .count(&repo.db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_user_is_idempotent_and_keeps_premium() {
        let repo = setup_test_db().await.unwrap();

        repo.register_user("U1").await.unwrap();
        repo.set_premium("U1", true).await.unwrap();
        let again = repo.register_user("U1").await.unwrap();

        assert!(again.is_premium);
        assert!(again.active);
        assert_eq!(users::Entity::find().count(&repo.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_user_reactivates() {
        let repo = setup_test_db().await.unwrap();
        repo.register_user("U1").await.unwrap();
        repo.deactivate_user("U1").await.unwrap();
        assert!(!repo.get_user("U1").await.unwrap().unwrap().active);

        let user = repo.register_user("U1").await.unwrap();
        assert!(user.active);
    }

    #[tokio::test]
    async fn test_update_reply_token() {
        let repo = setup_test_db().await.unwrap();
        repo.register_user("U1").await.unwrap();
        repo.update_reply_token("U1", "token-1").await.unwrap();
        let user = repo.get_user("U1").await.unwrap().unwrap();
        assert_eq!(user.reply_token.as_deref(), Some("token-1"));
    }

    #[tokio::test]
    async fn test_upsert_unit_updates_by_name() {
        let repo = setup_test_db().await.unwrap();
        let first = repo.upsert_unit("Unit A", "20_1310", None).await.unwrap();
        let second = repo
            .upsert_unit(" unit a ", "20_1320", Some("https://example.com".into()))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.unit_code, "20_1320");
        assert_eq!(second.unit_name, "unit a");
        assert_eq!(units::Entity::find().count(&repo.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resolve_unit_case_insensitive() {
        let repo = seeded_repo().await;
        let unit = repo.resolve_unit("  shinjuku HEIGHTS ").await.unwrap();
        assert_eq!(unit.unit_name, "Shinjuku Heights");

        let err = repo.resolve_unit("Nowhere").await.unwrap_err();
        assert!(matches!(err, SubscriptionError::UnitNotFound(name) if name == "Nowhere"));
    }

    #[tokio::test]
    async fn test_subscribe_with_room_types() {
        let repo = seeded_repo().await;

        let (unit, sub) = repo
            .subscribe("U1", "代々木ビュー", RoomTypes::parse("2LDK&3LDK"))
            .await
            .unwrap();

        assert_eq!(unit.unit_name, "代々木ビュー");
        assert_eq!(sub.room_types.0, vec!["2LDK", "3LDK"]);
        assert!(sub.is_active());
        assert!(repo.get_unit(unit.id).await.unwrap().unwrap().is_subscribed);
    }

    #[tokio::test]
    async fn test_subscribe_unknown_unit() {
        let repo = seeded_repo().await;
        let err = repo
            .subscribe("U1", "Nowhere", RoomTypes::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::UnitNotFound(_)));
        assert_eq!(active_count(&repo, "U1").await, 0);
    }

    #[tokio::test]
    async fn test_non_premium_limit() {
        let repo = seeded_repo().await;
        repo.subscribe("U1", "代々木ビュー", RoomTypes::default())
            .await
            .unwrap();

        let err = repo
            .subscribe("U1", "Shinjuku Heights", RoomTypes::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::SubscriptionLimitReached));
        assert_eq!(active_count(&repo, "U1").await, 1);

        // Same unit again only replaces the filter
        let (_, sub) = repo
            .subscribe("U1", "代々木ビュー", RoomTypes::parse("1K"))
            .await
            .unwrap();
        assert_eq!(sub.room_types.0, vec!["1K"]);
        assert_eq!(active_count(&repo, "U1").await, 1);
    }

    #[tokio::test]
    async fn test_premium_user_can_hold_many() {
        let repo = seeded_repo().await;
        repo.set_premium("U1", true).await.unwrap();
        repo.subscribe("U1", "代々木ビュー", RoomTypes::default())
            .await
            .unwrap();
        repo.subscribe("U1", "Shinjuku Heights", RoomTypes::default())
            .await
            .unwrap();
        assert_eq!(active_count(&repo, "U1").await, 2);
        assert_eq!(repo.list_active("U1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_subscribe_respects_limit() {
        use std::sync::Arc;
        use tokio::task::JoinSet;

        let repo = Arc::new(seeded_repo().await);

        let mut set = JoinSet::new();
        for name in ["代々木ビュー", "Shinjuku Heights", "代々木ビュー", "Shinjuku Heights"] {
            let repo = Arc::clone(&repo);
            set.spawn(async move { repo.subscribe("U1", name, RoomTypes::default()).await });
        }
        while let Some(result) = set.join_next().await {
            let _ = result.unwrap();
        }

        assert_eq!(active_count(&repo, "U1").await, 1);
    }

    /// File-backed database with a real pool, so transactions overlap.
    async fn pooled_repo(dir: &tempfile::TempDir) -> Repo {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("urbot.db").display());
        let db = crate::db::establish_connection(&url).await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();

        let repo = Repo::new(db);
        for i in 0..8 {
            repo.upsert_unit(&format!("Unit {i}"), &format!("20_{i}0"), None)
                .await
                .unwrap();
        }
        repo.register_user("U1").await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_duplicate_subscribes_on_pool_all_succeed() {
        use std::sync::Arc;
        use tokio::task::JoinSet;

        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(pooled_repo(&dir).await);

        let mut set = JoinSet::new();
        for _ in 0..4 {
            let repo = Arc::clone(&repo);
            set.spawn(async move { repo.subscribe("U1", "Unit 0", RoomTypes::default()).await });
        }
        while let Some(result) = set.join_next().await {
            assert!(result.unwrap().is_ok());
        }

        assert_eq!(active_count(&repo, "U1").await, 1);
    }

    #[tokio::test]
    async fn test_racing_subscribes_on_pool_hit_limit_cleanly() {
        use std::sync::Arc;
        use tokio::task::JoinSet;

        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(pooled_repo(&dir).await);

        let mut set = JoinSet::new();
        for i in 0..8 {
            let repo = Arc::clone(&repo);
            set.spawn(async move {
                repo.subscribe("U1", &format!("Unit {i}"), RoomTypes::default())
                    .await
            });
        }

        let mut ok = 0;
        while let Some(result) = set.join_next().await {
            match result.unwrap() {
                Ok(_) => ok += 1,
                Err(SubscriptionError::SubscriptionLimitReached) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(ok, 1);
        assert_eq!(active_count(&repo, "U1").await, 1);
    }

    #[tokio::test]
    async fn test_resubscribe_clears_deleted_at() {
        let repo = seeded_repo().await;
        let (_, first) = repo
            .subscribe("U1", "代々木ビュー", RoomTypes::parse("2LDK"))
            .await
            .unwrap();
        repo.unsubscribe("U1", "代々木ビュー").await.unwrap();

        let (_, again) = repo
            .subscribe("U1", "代々木ビュー", RoomTypes::parse("3LDK"))
            .await
            .unwrap();

        assert_eq!(first.id, again.id);
        assert!(again.deleted_at.is_none());
        assert_eq!(again.room_types.0, vec!["3LDK"]);
    }

    #[tokio::test]
    async fn test_unsubscribe_clears_unit_flag() {
        let repo = seeded_repo().await;
        repo.register_user("U2").await.unwrap();
        let (unit, _) = repo
            .subscribe("U1", "代々木ビュー", RoomTypes::default())
            .await
            .unwrap();
        repo.subscribe("U2", "代々木ビュー", RoomTypes::default())
            .await
            .unwrap();

        repo.unsubscribe("U1", "代々木ビュー").await.unwrap();
        assert!(repo.get_unit(unit.id).await.unwrap().unwrap().is_subscribed);

        repo.unsubscribe("U2", "代々木ビュー").await.unwrap();
        assert!(!repo.get_unit(unit.id).await.unwrap().unwrap().is_subscribed);

        // Row is soft-deleted, not removed
        let rows = subscriptions::Entity::find().count(&repo.db).await.unwrap();
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    async fn test_unsubscribe_errors() {
        let repo = seeded_repo().await;

        let err = repo.unsubscribe("U1", "Nowhere").await.unwrap_err();
        assert!(matches!(err, SubscriptionError::UnitNotFound(_)));

        let err = repo.unsubscribe("U1", "代々木ビュー").await.unwrap_err();
        assert!(matches!(err, SubscriptionError::NotSubscribed(name) if name == "代々木ビュー"));
    }

    #[tokio::test]
    async fn test_deactivate_user_retires_subscriptions() {
        let repo = seeded_repo().await;
        let (unit, _) = repo
            .subscribe("U1", "代々木ビュー", RoomTypes::default())
            .await
            .unwrap();

        let retired = repo.deactivate_user("U1").await.unwrap();

        assert_eq!(retired, 1);
        assert_eq!(active_count(&repo, "U1").await, 0);
        assert!(!repo.get_user("U1").await.unwrap().unwrap().active);
        assert!(!repo.get_unit(unit.id).await.unwrap().unwrap().is_subscribed);
        assert!(repo.list_subscribed_units().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_user_removes_rows() {
        let repo = seeded_repo().await;
        let (unit, _) = repo
            .subscribe("U1", "代々木ビュー", RoomTypes::default())
            .await
            .unwrap();

        repo.delete_user("U1").await.unwrap();

        assert!(repo.get_user("U1").await.unwrap().is_none());
        assert_eq!(subscriptions::Entity::find().count(&repo.db).await.unwrap(), 0);
        assert!(!repo.get_unit(unit.id).await.unwrap().unwrap().is_subscribed);
    }

    #[tokio::test]
    async fn test_list_subscribed_units_distinct() {
        let repo = seeded_repo().await;
        repo.register_user("U2").await.unwrap();
        repo.subscribe("U1", "代々木ビュー", RoomTypes::default())
            .await
            .unwrap();
        repo.subscribe("U2", "代々木ビュー", RoomTypes::parse("2LDK"))
            .await
            .unwrap();

        let units = repo.list_subscribed_units().await.unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit_name, "代々木ビュー");

        let subs = repo.list_unit_subscribers(units[0].id).await.unwrap();
        assert_eq!(subs.len(), 2);
    }

    #[tokio::test]
    async fn test_retire_subscription_once() {
        let repo = seeded_repo().await;
        let (unit, sub) = repo
            .subscribe("U1", "代々木ビュー", RoomTypes::default())
            .await
            .unwrap();

        assert!(repo.retire_subscription(sub.id).await.unwrap());
        assert!(!repo.retire_subscription(sub.id).await.unwrap());
        assert!(repo.list_unit_subscribers(unit.id).await.unwrap().is_empty());
        assert!(!repo.refresh_unit_flag(unit.id).await.unwrap());
    }
}
