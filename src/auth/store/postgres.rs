//! Postgres-backed [`UserStore`].
//!
//! Uniqueness is enforced by `UNIQUE` constraints (see `sql/schema.sql`); every
//! write is a single statement so there is no read-modify-write window.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{Lookup, User, UserStore, UserUpdate};
use crate::auth::error::StoreError;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const USER_COLUMNS: &str = "id, email, hashed_password, session_id, reset_token";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `users` table and its constraints if missing.
    ///
    /// # Errors
    /// Returns an error if any schema statement fails.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA_SQL
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let span = query_span("DDL", statement);
            sqlx::query(statement)
                .execute(&self.pool)
                .instrument(span)
                .await?;
        }
        Ok(())
    }
}

fn query_span(operation: &'static str, statement: &str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        hashed_password: row.try_get("hashed_password")?,
        session_id: row.try_get("session_id")?,
        reset_token: row.try_get("reset_token")?,
    })
}

/// Map constraint violations onto the store taxonomy.
fn map_write_error(err: sqlx::Error) -> StoreError {
    let violated = match &err {
        sqlx::Error::Database(db_err)
            if db_err.code().is_some_and(|code| code.as_ref() == "23505") =>
        {
            Some(db_err.constraint().map(str::to_string))
        }
        _ => None,
    };
    let Some(constraint) = violated else {
        return StoreError::Database(err);
    };
    match constraint.as_deref() {
        Some("users_email_key") => StoreError::DuplicateEmail,
        Some("users_session_id_key") => StoreError::TokenConflict {
            field: "session_id",
        },
        Some("users_reset_token_key") => StoreError::TokenConflict {
            field: "reset_token",
        },
        other => StoreError::Integrity(format!(
            "unexpected unique violation on {}",
            other.unwrap_or("unknown constraint")
        )),
    }
}

/// `UPDATE users SET ...` with one bound value per set field.
fn push_assignments<'a>(builder: &mut QueryBuilder<'a, Postgres>, update: UserUpdate) {
    let mut assignments = builder.separated(", ");
    if let Some(hash) = update.hashed_password {
        assignments.push("hashed_password = ");
        assignments.push_bind_unseparated(hash);
    }
    if let Some(session_id) = update.session_id {
        assignments.push("session_id = ");
        assignments.push_bind_unseparated(session_id);
    }
    if let Some(reset_token) = update.reset_token {
        assignments.push("reset_token = ");
        assignments.push_bind_unseparated(reset_token);
    }
    assignments.push("updated_at = NOW()");
}

#[async_trait]
impl UserStore for PgStore {
    async fn add_user(&self, email: &str, hashed_password: &str) -> Result<User, StoreError> {
        let query = r"
            INSERT INTO users (id, email, hashed_password)
            VALUES ($1, $2, $3)
            RETURNING id, email, hashed_password, session_id, reset_token
        ";
        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(hashed_password)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .map_err(map_write_error)?;
        Ok(user_from_row(&row)?)
    }

    async fn find_user_by(&self, lookup: Lookup<'_>) -> Result<User, StoreError> {
        // LIMIT 2 so a broken uniqueness guarantee is detected, not hidden.
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {} = $1 LIMIT 2",
            lookup.column()
        );
        let rows = sqlx::query(&query)
            .bind(lookup.value())
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;
        match rows.as_slice() {
            [] => Err(StoreError::NotFound),
            [row] => Ok(user_from_row(row)?),
            _ => Err(StoreError::Integrity(format!(
                "multiple users share {}",
                lookup.column()
            ))),
        }
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<(), StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        push_assignments(&mut builder, update);
        builder.push(" WHERE id = ").push_bind(id);
        let span = query_span("UPDATE", builder.sql());
        let result = builder
            .build()
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(map_write_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn update_user_by(
        &self,
        lookup: Lookup<'_>,
        update: UserUpdate,
    ) -> Result<User, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        push_assignments(&mut builder, update);
        builder
            .push(" WHERE ")
            .push(lookup.column())
            .push(" = ")
            .push_bind(lookup.value().to_string())
            .push(" RETURNING ")
            .push(USER_COLUMNS);
        let span = query_span("UPDATE", builder.sql());
        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .map_err(map_write_error)?;
        match rows.as_slice() {
            [] => Err(StoreError::NotFound),
            [row] => Ok(user_from_row(row)?),
            _ => Err(StoreError::Integrity(format!(
                "multiple users share {}",
                lookup.column()
            ))),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_bind_every_set_field() {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        push_assignments(
            &mut builder,
            UserUpdate::new()
                .hashed_password("h".to_string())
                .session_id(None),
        );
        builder.push(" WHERE id = ").push_bind(Uuid::nil());
        assert_eq!(
            builder.sql(),
            "UPDATE users SET hashed_password = $1, session_id = $2, updated_at = NOW() WHERE id = $3"
        );
    }

    #[test]
    fn empty_update_only_touches_timestamp() {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        push_assignments(&mut builder, UserUpdate::new());
        assert_eq!(builder.sql(), "UPDATE users SET updated_at = NOW()");
    }

    #[test]
    fn schema_declares_unique_columns() {
        assert!(SCHEMA_SQL.contains("email TEXT NOT NULL UNIQUE"));
        assert!(SCHEMA_SQL.contains("session_id TEXT UNIQUE"));
        assert!(SCHEMA_SQL.contains("reset_token TEXT UNIQUE"));
    }

    #[test]
    fn non_database_errors_pass_through() {
        assert!(matches!(
            map_write_error(sqlx::Error::RowNotFound),
            StoreError::Database(sqlx::Error::RowNotFound)
        ));
    }
}
