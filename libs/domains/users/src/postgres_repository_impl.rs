use super::{Pagination, User, UserError, UserFilter, UserRepository, UserResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DbBackend, DbErr, FromQueryResult, SqlErr, Statement, Value};
use uuid::Uuid;

/// PostgreSQL implementation of UserRepository using SeaORM raw statements
#[derive(Clone)]
pub struct PostgresUserRepository {
    db: sea_orm::DatabaseConnection,
}

impl PostgresUserRepository {
    pub fn new(db: sea_orm::DatabaseConnection) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, operation: &str, stmt: Statement) -> UserResult<Option<User>> {
        let row = UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| UserError::internal(operation, e))?;

        Ok(row.map(Into::into))
    }
}

/// Helper struct for deserializing user rows from the database
#[derive(Debug, FromQueryResult)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    nickname: String,
    password: String,
    email: String,
    country: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            nickname: row.nickname,
            password: row.password,
            email: row.email,
            country: row.country,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

/// Unique violations become conflicts; the constraint name picks which one.
fn map_write_error(operation: &str, err: DbErr) -> UserError {
    let violation = match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => Some(message),
        _ => {
            let text = err.to_string();
            text.contains("duplicate key").then_some(text)
        }
    };

    match violation {
        Some(message) if message.contains("nickname") => UserError::NicknameExists,
        Some(_) => UserError::EmailExists,
        None => UserError::internal(operation, err),
    }
}

/// Substring pattern matching `needle` literally, for `ESCAPE '\'`
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// `WHERE` clause with one `ILIKE` per active filter, starting at `$1`
fn filter_clause(filter: &UserFilter) -> (String, Vec<Value>) {
    let active = filter.active();
    if active.is_empty() {
        return (String::new(), vec![]);
    }

    let conditions: Vec<String> = active
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("{column} ILIKE ${} ESCAPE '\\'", i + 1))
        .collect();
    let values = active
        .iter()
        .map(|(_, needle)| Value::from(contains_pattern(needle)))
        .collect();

    (format!(" WHERE {}", conditions.join(" AND ")), values)
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> UserResult<User> {
        let sql = r#"
            INSERT INTO users
                (id, first_name, last_name, nickname, password, email, country, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
        "#;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                user.id.into(),
                user.first_name.into(),
                user.last_name.into(),
                user.nickname.into(),
                user.password.into(),
                user.email.into(),
                user.country.into(),
                user.created_at.into(),
                user.updated_at.into(),
            ],
        );

        let row = UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| map_write_error("insert user", e))?
            .ok_or_else(|| UserError::Internal("insert user: no row returned".to_string()))?;

        Ok(row.into())
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT * FROM users WHERE id = $1",
            [id.into()],
        );
        self.fetch_one("select user by id", stmt).await
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT * FROM users WHERE email = $1",
            [email.into()],
        );
        self.fetch_one("select user by email", stmt).await
    }

    async fn get_by_nickname(&self, nickname: &str) -> UserResult<Option<User>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT * FROM users WHERE nickname = $1",
            [nickname.into()],
        );
        self.fetch_one("select user by nickname", stmt).await
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let sql = r#"
            UPDATE users
            SET first_name = $2, last_name = $3, nickname = $4, email = $5,
                country = $6, updated_at = $7
            WHERE id = $1
            RETURNING *
        "#;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                user.id.into(),
                user.first_name.into(),
                user.last_name.into(),
                user.nickname.into(),
                user.email.into(),
                user.country.into(),
                user.updated_at.into(),
            ],
        );

        let row = UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| map_write_error("update user", e))?;

        row.map(Into::into).ok_or(UserError::NotFound)
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: String,
        updated_at: DateTime<Utc>,
    ) -> UserResult<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE users SET password = $2, updated_at = $3 WHERE id = $1",
            [id.into(), password_hash.into(), updated_at.into()],
        );

        let result = self
            .db
            .execute_raw(stmt)
            .await
            .map_err(|e| UserError::internal("update password", e))?;

        if result.rows_affected() == 0 {
            return Err(UserError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> UserResult<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "DELETE FROM users WHERE id = $1",
            [id.into()],
        );

        let result = self
            .db
            .execute_raw(stmt)
            .await
            .map_err(|e| UserError::internal("delete user", e))?;

        if result.rows_affected() == 0 {
            return Err(UserError::NotFound);
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: UserFilter,
        pagination: Pagination,
    ) -> UserResult<(Vec<User>, u64)> {
        let (where_clause, values) = filter_clause(&filter);

        let count_stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!("SELECT COUNT(*) AS count FROM users{where_clause}"),
            values.clone(),
        );
        let total = CountRow::find_by_statement(count_stmt)
            .one(&self.db)
            .await
            .map_err(|e| UserError::internal("count users", e))?
            .map(|r| r.count.max(0) as u64)
            .unwrap_or(0);

        let next = values.len();
        let mut page_values = values;
        page_values.push((pagination.limit() as i64).into());
        page_values.push((pagination.offset() as i64).into());

        let page_stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!(
                "SELECT * FROM users{where_clause} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
                next + 1,
                next + 2
            ),
            page_values,
        );
        let rows = UserRow::find_by_statement(page_stmt)
            .all(&self.db)
            .await
            .map_err(|e| UserError::internal("list users", e))?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    async fn health_check(&self) -> UserResult<()> {
        self.db
            .ping()
            .await
            .map_err(|e| UserError::internal("ping database", e))
    }
}
