use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use rentora_core::identity::{AccountStatus, UserAccount, UserRole};
use rentora_core::pagination::{PageParams, Paginated};

use crate::error::StoreError;

pub struct UserRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl UserRow {
    fn into_account(self) -> Result<UserAccount, StoreError> {
        let role: UserRole = self
            .role
            .parse()
            .map_err(|e: String| StoreError::Corrupt(e))?;
        let status = match self.status.as_str() {
            "active" => AccountStatus::Active,
            "inactive" => AccountStatus::Inactive,
            other => return Err(StoreError::Corrupt(format!("unknown status: {other}"))),
        };
        Ok(UserAccount {
            id: self.id,
            name: self.name,
            email: self.email,
            role,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, status, created_at, updated_at";

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Duplicate email surfaces as `Duplicate` via the unique index, so
    /// two concurrent registrations cannot both succeed.
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<UserAccount, StoreError> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (id, name, email, password_hash, role, status)
             VALUES ($1, $2, $3, $4, $5, 'active')
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_constraint(e, "email"))?;

        row.into_account()
    }

    /// Account plus password hash for login verification. The hash stays
    /// inside the caller's stack frame.
    pub async fn find_credentials(
        &self,
        email: &str,
        role: UserRole,
    ) -> Result<Option<(UserAccount, String)>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND role = $2"
        ))
        .bind(email)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let hash = row.password_hash.clone();
                Ok(Some((row.into_account()?, hash)))
            }
            None => Ok(None),
        }
    }

    pub async fn list_users(&self, page: PageParams) -> Result<Paginated<UserAccount>, StoreError> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ));
        if page.is_paged() {
            qb.push(" LIMIT ");
            qb.push_bind(page.limit.unwrap_or(0));
            qb.push(" OFFSET ");
            qb.push_bind(page.offset());
        }

        let rows: Vec<UserRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(UserRow::into_account)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated::new(items, total, page))
    }

    /// Exact-match filters; the first supplied filter wins.
    pub async fn find_users(
        &self,
        id: Option<Uuid>,
        name: Option<&str>,
        role: Option<UserRole>,
    ) -> Result<Vec<UserAccount>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE "
        ));
        if let Some(id) = id {
            qb.push("id = ");
            qb.push_bind(id);
        } else if let Some(name) = name {
            qb.push("name = ");
            qb.push_bind(name.to_string());
        } else if let Some(role) = role {
            qb.push("role = ");
            qb.push_bind(role.as_str());
        } else {
            return Ok(Vec::new());
        }

        let rows: Vec<UserRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(UserRow::into_account).collect()
    }
}
