use serde::Serialize;
use sqlx::FromRow;

#[derive(Clone, Debug, Serialize, FromRow)]
pub struct ResourceRow {
    pub id: i64,
    pub filename: String,
    pub description: Option<String>,
    pub filepath: String,
    pub thumbnail: Option<String>,
}

/// Body returned by resource updates. It has never carried the thumbnail.
#[derive(Clone, Debug, Serialize)]
pub struct ResourceSummary {
    pub id: i64,
    pub filename: String,
    pub description: Option<String>,
    pub filepath: String,
}

impl From<ResourceRow> for ResourceSummary {
    fn from(row: ResourceRow) -> Self {
        Self {
            id: row.id,
            filename: row.filename,
            description: row.description,
            filepath: row.filepath,
        }
    }
}

#[derive(Clone, FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub username: String,
    pub password: String,
}

/// Identities bound to a browser session. Either side may be empty.
#[derive(Clone, Debug, Default, FromRow)]
pub struct SessionRow {
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub admin_id: Option<i64>,
    pub admin_username: Option<String>,
}

/// The two unrelated account tables. Both share one shape.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccountKind {
    User,
    Admin,
}

impl AccountKind {
    pub fn table(self) -> &'static str {
        match self {
            AccountKind::User => "users",
            AccountKind::Admin => "admins",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AccountKind::User => "User",
            AccountKind::Admin => "Admin",
        }
    }
}
