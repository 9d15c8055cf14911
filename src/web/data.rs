use sqlx::SqlitePool;

use super::models::{AccountKind, AccountRow, ResourceRow};

pub async fn fetch_resources(pool: &SqlitePool) -> sqlx::Result<Vec<ResourceRow>> {
    sqlx::query_as::<_, ResourceRow>(
        "SELECT id, filename, description, filepath, thumbnail FROM resources ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

pub async fn fetch_resource(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<ResourceRow>> {
    sqlx::query_as::<_, ResourceRow>(
        "SELECT id, filename, description, filepath, thumbnail FROM resources WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn insert_resource(
    pool: &SqlitePool,
    filename: &str,
    description: &str,
    filepath: &str,
    thumbnail: Option<&str>,
) -> sqlx::Result<ResourceRow> {
    let id = sqlx::query(
        "INSERT INTO resources (filename, description, filepath, thumbnail) VALUES (?, ?, ?, ?)",
    )
    .bind(filename)
    .bind(description)
    .bind(filepath)
    .bind(thumbnail)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(ResourceRow {
        id,
        filename: filename.to_string(),
        description: Some(description.to_string()),
        filepath: filepath.to_string(),
        thumbnail: thumbnail.map(str::to_string),
    })
}

pub async fn save_resource(pool: &SqlitePool, resource: &ResourceRow) -> sqlx::Result<()> {
    sqlx::query("UPDATE resources SET filename = ?, description = ?, filepath = ? WHERE id = ?")
        .bind(&resource.filename)
        .bind(&resource.description)
        .bind(&resource.filepath)
        .bind(resource.id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_resource(pool: &SqlitePool, id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM resources WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn account_field_taken(
    pool: &SqlitePool,
    kind: AccountKind,
    column: AccountColumn,
    value: &str,
) -> sqlx::Result<bool> {
    let query = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?)",
        kind.table(),
        column.as_str()
    );
    let found: i64 = sqlx::query_scalar(&query).bind(value).fetch_one(pool).await?;
    Ok(found != 0)
}

pub async fn insert_account(
    pool: &SqlitePool,
    kind: AccountKind,
    username: &str,
    email: &str,
    password_hash: &str,
) -> sqlx::Result<i64> {
    let query = format!(
        "INSERT INTO {} (username, email, password) VALUES (?, ?, ?)",
        kind.table()
    );
    let result = sqlx::query(&query)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn fetch_account_by_username(
    pool: &SqlitePool,
    kind: AccountKind,
    username: &str,
) -> sqlx::Result<Option<AccountRow>> {
    let query = format!(
        "SELECT id, username, password FROM {} WHERE username = ?",
        kind.table()
    );
    sqlx::query_as::<_, AccountRow>(&query)
        .bind(username)
        .fetch_optional(pool)
        .await
}

/// Unique columns checked before an account insert.
#[derive(Clone, Copy, Debug)]
pub enum AccountColumn {
    Username,
    Email,
}

impl AccountColumn {
    fn as_str(self) -> &'static str {
        match self {
            AccountColumn::Username => "username",
            AccountColumn::Email => "email",
        }
    }
}
