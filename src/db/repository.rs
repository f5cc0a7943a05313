//! Account repository for feedsync.

use sqlx::QueryBuilder;

use super::account::{Account, AccountFeedSettings, NewAccount};
use super::{parse_datetime, DbPool};
use crate::{FeedsyncError, Result};

/// Row type for an account from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct AccountRow {
    id: i64,
    name: String,
    feed_url: Option<String>,
    auto_publish_from_feed: bool,
    created_at: String,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            name: row.name,
            feed_url: row.feed_url,
            auto_publish_from_feed: row.auto_publish_from_feed,
            created_at: parse_datetime(&row.created_at).unwrap_or_else(chrono::Utc::now),
        }
    }
}

/// Repository for account operations.
pub struct AccountRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new account.
    pub async fn create(&self, account: &NewAccount) -> Result<Account> {
        let result = sqlx::query(
            "INSERT INTO accounts (name, feed_url, auto_publish_from_feed) VALUES (?, ?, ?)",
        )
        .bind(&account.name)
        .bind(&account.feed_url)
        .bind(account.auto_publish_from_feed)
        .execute(self.pool)
        .await?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| FeedsyncError::NotFound("account".to_string()))
    }

    /// Get an account by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, name, feed_url, auto_publish_from_feed, created_at
             FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Account::from))
    }

    /// List accounts that have a feed URL configured (ordered by ID).
    pub async fn list_with_feed_url(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT id, name, feed_url, auto_publish_from_feed, created_at
             FROM accounts
             WHERE feed_url IS NOT NULL AND feed_url <> ''
             ORDER BY id ASC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Account::from).collect())
    }

    /// Update the feed settings of an account.
    ///
    /// Returns the updated account, or None if not found.
    pub async fn update_feed_settings(
        &self,
        id: i64,
        settings: &AccountFeedSettings,
    ) -> Result<Option<Account>> {
        if settings.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE accounts SET ");
        let mut separated = query.separated(", ");

        if let Some(ref feed_url) = settings.feed_url {
            separated.push("feed_url = ");
            separated.push_bind_unseparated(feed_url.clone());
        }
        if let Some(enabled) = settings.auto_publish_from_feed {
            separated.push("auto_publish_from_feed = ");
            separated.push_bind_unseparated(enabled);
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query.build().execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Delete an account and, by cascade, its posts.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_create_and_get_account() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = AccountRepository::new(db.pool());

        let account = repo
            .create(&NewAccount::new("U1").with_auto_publish(true))
            .await
            .unwrap();
        assert!(account.id > 0);
        assert_eq!(account.name, "U1");
        assert!(account.feed_url.is_none());
        assert!(account.auto_publish_from_feed);

        let fetched = repo.get_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(fetched, account);
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_with_feed_url() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = AccountRepository::new(db.pool());

        repo.create(&NewAccount::new("no-feed")).await.unwrap();
        let a = repo
            .create(&NewAccount::new("a").with_feed_url("https://example.com/feed.xml"))
            .await
            .unwrap();
        let b = repo
            .create(&NewAccount::new("b").with_feed_url("https://example.com/feed.xml"))
            .await
            .unwrap();
        repo.create(&NewAccount::new("blank").with_feed_url(""))
            .await
            .unwrap();

        let accounts = repo.list_with_feed_url().await.unwrap();
        let ids: Vec<i64> = accounts.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn test_update_feed_settings() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = AccountRepository::new(db.pool());
        let account = repo.create(&NewAccount::new("U1")).await.unwrap();

        let updated = repo
            .update_feed_settings(
                account.id,
                &AccountFeedSettings::new()
                    .with_feed_url("https://example.com/rss")
                    .with_auto_publish(true),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.feed_url.as_deref(), Some("https://example.com/rss"));
        assert!(updated.auto_publish_from_feed);

        let cleared = repo
            .update_feed_settings(account.id, &AccountFeedSettings::new().clear_feed_url())
            .await
            .unwrap()
            .unwrap();
        assert!(cleared.feed_url.is_none());
        assert!(cleared.auto_publish_from_feed);

        let missing = repo
            .update_feed_settings(999, &AccountFeedSettings::new().with_auto_publish(false))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_account() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = AccountRepository::new(db.pool());
        let account = repo.create(&NewAccount::new("U1")).await.unwrap();

        assert!(repo.delete(account.id).await.unwrap());
        assert!(!repo.delete(account.id).await.unwrap());
        assert!(repo.get_by_id(account.id).await.unwrap().is_none());
    }
}
