//! Account Directory
//!
//! The user record store consumed by the signup and login flows. The auth
//! core only performs these lookups; it knows nothing about storage format.

use crate::error::DirectoryError;
use crate::models::{Account, NewAccount};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// User record store
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, DirectoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DirectoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DirectoryError>;

    /// Create an account; fails with `Conflict` if the username or email is taken
    async fn create(&self, account: NewAccount) -> Result<Account, DirectoryError>;

    /// Replace an account's stored credential wholesale
    async fn update_credential(&self, id: Uuid, password_hash: &str)
        -> Result<(), DirectoryError>;
}

// ============================================
// In-Memory Directory
// ============================================

/// Directory kept in process memory
#[derive(Default)]
pub struct InMemoryDirectory {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountDirectory for InMemoryDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, DirectoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DirectoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DirectoryError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn create(&self, account: NewAccount) -> Result<Account, DirectoryError> {
        let mut accounts = self.accounts.write().await;

        if accounts.values().any(|a| a.username == account.username) {
            return Err(DirectoryError::Conflict("username"));
        }
        if accounts
            .values()
            .any(|a| a.email.eq_ignore_ascii_case(&account.email))
        {
            return Err(DirectoryError::Conflict("email"));
        }

        let now = Utc::now();
        let record = Account {
            id: Uuid::new_v4(),
            username: account.username,
            email: account.email.to_lowercase(),
            password_hash: account.password_hash,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(record.id, record.clone());

        Ok(record)
    }

    async fn update_credential(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), DirectoryError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(DirectoryError::NotFound)?;
        account.password_hash = password_hash.to_string();
        account.updated_at = Utc::now();
        Ok(())
    }
}

// ============================================
// PostgreSQL Directory
// ============================================

/// Directory backed by a PostgreSQL `accounts` table
pub struct PgDirectory {
    db: PgPool,
}

impl PgDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create the accounts table if it does not exist
    pub async fn migrate(&self) -> Result<(), DirectoryError> {
        tracing::info!("Running account directory migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id UUID PRIMARY KEY,
                username VARCHAR(50) NOT NULL,
                email VARCHAR(255) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT accounts_username_key UNIQUE (username),
                CONSTRAINT accounts_email_key UNIQUE (email)
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        tracing::info!("Account directory migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for PgDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, DirectoryError> {
        let account = sqlx::query_as("SELECT * FROM accounts WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DirectoryError> {
        let account = sqlx::query_as("SELECT * FROM accounts WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DirectoryError> {
        let account = sqlx::query_as("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }

    async fn create(&self, account: NewAccount) -> Result<Account, DirectoryError> {
        let record = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&account.username)
        .bind(account.email.to_lowercase())
        .bind(&account.password_hash)
        .fetch_one(&self.db)
        .await?;

        Ok(record)
    }

    async fn update_credential(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), DirectoryError> {
        let result = sqlx::query(
            "UPDATE accounts SET password_hash = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DirectoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(username: &str, email: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "c2FsdA==.aGFzaA==".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let directory = InMemoryDirectory::new();
        let created = directory
            .create(new_account("alice", "Alice@Example.com"))
            .await
            .unwrap();

        assert_eq!(created.email, "alice@example.com");

        let by_name = directory.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);

        let by_email = directory
            .find_by_email("ALICE@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, created.id);

        let by_id = directory.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        assert!(directory.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicates_conflict() {
        let directory = InMemoryDirectory::new();
        directory
            .create(new_account("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = directory
            .create(new_account("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err, DirectoryError::Conflict("username"));

        let err = directory
            .create(new_account("bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err, DirectoryError::Conflict("email"));
    }

    #[tokio::test]
    async fn test_update_credential() {
        let directory = InMemoryDirectory::new();
        let created = directory
            .create(new_account("alice", "alice@example.com"))
            .await
            .unwrap();

        directory
            .update_credential(created.id, "bmV3.aGFzaA==")
            .await
            .unwrap();
        let updated = directory.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(updated.password_hash, "bmV3.aGFzaA==");

        let missing = directory.update_credential(Uuid::new_v4(), "x.y").await;
        assert_eq!(missing, Err(DirectoryError::NotFound));
    }
}
