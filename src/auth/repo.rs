use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo_types::User;

/// Persistence collaborator. Writes to one record must be serialised and
/// reads must observe the latest write.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn load(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_login_or_email(&self, identifier: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_session_token(&self, token: &str) -> anyhow::Result<Option<User>>;
    async fn save(&self, user: &User) -> anyhow::Result<()>;
    /// Writes only the session token, its expiry and `updated_at` of an
    /// existing record.
    async fn save_session(&self, user: &User) -> anyhow::Result<()>;
}

const USER_COLUMNS: &str = "id, name, email, login, locale, password_digest, salt, \
     session_token, session_token_expires_at, admin, designer, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause} LIMIT 1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn load(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("load user")?;
        Ok(user)
    }

    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<User>> {
        self.fetch_one_where("login = $1", login)
            .await
            .context("find user by login")
    }

    async fn find_by_login_or_email(&self, identifier: &str) -> anyhow::Result<Option<User>> {
        // Prefer a login match when one user's login is another's email.
        self.fetch_one_where(
            "login = $1 OR email = $1 ORDER BY (login = $1) DESC NULLS LAST",
            identifier,
        )
        .await
        .context("find user by login or email")
    }

    async fn find_by_session_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        self.fetch_one_where("session_token = $1", token)
            .await
            .context("find user by session token")
    }

    async fn save(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, login, locale, password_digest, salt,
                               session_token, session_token_expires_at, admin, designer,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                login = EXCLUDED.login,
                locale = EXCLUDED.locale,
                password_digest = EXCLUDED.password_digest,
                salt = EXCLUDED.salt,
                session_token = EXCLUDED.session_token,
                session_token_expires_at = EXCLUDED.session_token_expires_at,
                admin = EXCLUDED.admin,
                designer = EXCLUDED.designer,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.login)
        .bind(&user.locale)
        .bind(&user.password_digest)
        .bind(&user.salt)
        .bind(&user.session_token)
        .bind(user.session_token_expires_at)
        .bind(user.roles.admin)
        .bind(user.roles.designer)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await
        .context("save user")?;
        Ok(())
    }

    async fn save_session(&self, user: &User) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET session_token = $2, session_token_expires_at = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.session_token)
        .bind(user.session_token_expires_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await
        .context("save session")?;
        if result.rows_affected() == 0 {
            anyhow::bail!("user {} not found", user.id);
        }
        Ok(())
    }
}

/// Process-local store for tests and embedding.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn load(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.login.as_deref() == Some(login))
            .cloned())
    }

    async fn find_by_login_or_email(&self, identifier: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        let by_login = users.values().find(|u| u.login.as_deref() == Some(identifier));
        Ok(by_login
            .or_else(|| users.values().find(|u| u.email.as_deref() == Some(identifier)))
            .cloned())
    }

    async fn find_by_session_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.session_token.as_deref() == Some(token))
            .cloned())
    }

    async fn save(&self, user: &User) -> anyhow::Result<()> {
        let mut users = self.users.write().await;
        if let Some(login) = user.login.as_deref().filter(|l| !l.is_empty()) {
            if users
                .values()
                .any(|u| u.id != user.id && u.login.as_deref() == Some(login))
            {
                anyhow::bail!("login {login:?} violates users_login_key");
            }
        }
        let mut stored = user.clone();
        stored.password = None;
        stored.password_confirmation = None;
        users.insert(stored.id, stored);
        Ok(())
    }

    async fn save_session(&self, user: &User) -> anyhow::Result<()> {
        let mut users = self.users.write().await;
        let Some(stored) = users.get_mut(&user.id) else {
            anyhow::bail!("user {} not found", user.id);
        };
        stored.session_token = user.session_token.clone();
        stored.session_token_expires_at = user.session_token_expires_at;
        stored.updated_at = user.updated_at;
        Ok(())
    }
}
