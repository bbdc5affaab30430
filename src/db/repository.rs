//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::auth::{generate_token_key, AuthUser};
use crate::errors::{AppError, FieldErrors};
use crate::models::{
    Category, Comment, NewResource, Resource, ResourceChanges, UserSummary, DUPLICATE_USERNAME,
};

pub const DUPLICATE_CATEGORY: &str = "category with this name already exists.";
pub const DUPLICATE_TITLE: &str = "resource with this title already exists.";

/// Stored login data for a user.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub is_staff: bool,
}

/// Which resources a listing query returns.
#[derive(Debug, Clone, Copy)]
enum ResourceScope {
    All,
    InCategory(i64),
    Single(i64),
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== USER OPERATIONS ====================

    /// Create a user together with their auth token. Returns `(user_id, token_key)`.
    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        is_staff: bool,
    ) -> Result<(i64, String), AppError> {
        let now = Utc::now();
        let key = generate_token_key();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, is_staff, date_joined) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(is_staff as i32)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, "username", DUPLICATE_USERNAME))?;
        let user_id = result.last_insert_rowid();

        sqlx::query("INSERT INTO auth_tokens (key, user_id, created) VALUES (?, ?, ?)")
            .bind(&key)
            .bind(user_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok((user_id, key))
    }

    /// Check whether a username is taken.
    pub async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Look up the stored credentials for a username.
    pub async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<StoredCredentials>, AppError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, is_staff FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let is_staff: i32 = row.get("is_staff");
            StoredCredentials {
                id: row.get("id"),
                username: row.get("username"),
                password_hash: row.get("password_hash"),
                is_staff: is_staff != 0,
            }
        }))
    }

    /// Grant or revoke staff rights.
    pub async fn set_staff(&self, user_id: i64, is_staff: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET is_staff = ? WHERE id = ?")
            .bind(is_staff as i32)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Return the user's token key, creating one if the user has none.
    pub async fn token_for_user(&self, user_id: i64) -> Result<String, AppError> {
        let key = generate_token_key();
        sqlx::query("INSERT OR IGNORE INTO auth_tokens (key, user_id, created) VALUES (?, ?, ?)")
            .bind(&key)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT key FROM auth_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("key"))
    }

    /// Resolve a token key to its user.
    pub async fn user_for_token(&self, key: &str) -> Result<Option<AuthUser>, AppError> {
        let row = sqlx::query(
            r#"SELECT u.id, u.username, u.is_staff
               FROM auth_tokens t JOIN users u ON u.id = t.user_id
               WHERE t.key = ?"#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let is_staff: i32 = row.get("is_staff");
            AuthUser {
                id: row.get("id"),
                username: row.get("username"),
                is_staff: is_staff != 0,
            }
        }))
    }

    // ==================== CATEGORY OPERATIONS ====================

    /// List all categories.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(category_from_row).collect())
    }

    /// Find a category by its exact name.
    pub async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>, AppError> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(category_from_row))
    }

    /// Check whether a category name is taken.
    pub async fn category_name_exists(&self, name: &str) -> Result<bool, AppError> {
        Ok(self.find_category_by_name(name).await?.is_some())
    }

    /// Create a new category.
    pub async fn create_category(&self, name: &str) -> Result<Category, AppError> {
        let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| unique_violation(e, "name", DUPLICATE_CATEGORY))?;

        Ok(Category {
            id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    /// Return the ids from `ids` that name no existing category, in input order.
    pub async fn missing_category_ids(&self, ids: &[i64]) -> Result<Vec<i64>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // One bound JSON array, whatever the number of ids.
        let list = serde_json::to_string(ids)
            .map_err(|e| AppError::Internal(format!("Failed to encode id list: {}", e)))?;

        let rows = sqlx::query(
            r#"SELECT j.value AS id FROM json_each(?) j
               WHERE NOT EXISTS (SELECT 1 FROM categories c WHERE c.id = j.value)
               ORDER BY j.key"#,
        )
        .bind(list)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    // ==================== RESOURCE OPERATIONS ====================

    /// List all resources.
    pub async fn list_resources(&self) -> Result<Vec<Resource>, AppError> {
        self.load_resources(ResourceScope::All).await
    }

    /// List the resources filed under a category.
    pub async fn list_resources_in_category(
        &self,
        category_id: i64,
    ) -> Result<Vec<Resource>, AppError> {
        self.load_resources(ResourceScope::InCategory(category_id))
            .await
    }

    /// Get a resource by ID.
    pub async fn get_resource(&self, id: i64) -> Result<Option<Resource>, AppError> {
        Ok(self
            .load_resources(ResourceScope::Single(id))
            .await?
            .into_iter()
            .next())
    }

    /// Check whether a resource exists without loading its relations.
    pub async fn resource_exists(&self, id: i64) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM resources WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Check whether a title is used by any resource other than `exclude`.
    pub async fn title_taken(&self, title: &str, exclude: Option<i64>) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM resources WHERE title = ? AND id IS NOT ?")
            .bind(title)
            .bind(exclude)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Create a resource owned by `owner_id`.
    pub async fn create_resource(
        &self,
        owner_id: i64,
        new: &NewResource,
    ) -> Result<Resource, AppError> {
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("INSERT INTO resources (title, resource_url, owner_id) VALUES (?, ?, ?)")
                .bind(&new.title)
                .bind(&new.resource_url)
                .bind(owner_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| unique_violation(e, "title", DUPLICATE_TITLE))?;
        let id = result.last_insert_rowid();

        for category_id in &new.categories {
            sqlx::query("INSERT INTO resource_categories (resource_id, category_id) VALUES (?, ?)")
                .bind(id)
                .bind(category_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.get_resource(id).await?.ok_or(AppError::NotFound)
    }

    /// Apply a partial update. The owner never changes.
    pub async fn update_resource(
        &self,
        id: i64,
        changes: &ResourceChanges,
    ) -> Result<Resource, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"UPDATE resources SET
                   title = COALESCE(?, title),
                   resource_url = COALESCE(?, resource_url)
               WHERE id = ?"#,
        )
        .bind(&changes.title)
        .bind(&changes.resource_url)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, "title", DUPLICATE_TITLE))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        if let Some(categories) = &changes.categories {
            sqlx::query("DELETE FROM resource_categories WHERE resource_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            for category_id in categories {
                sqlx::query(
                    "INSERT INTO resource_categories (resource_id, category_id) VALUES (?, ?)",
                )
                .bind(id)
                .bind(category_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        self.get_resource(id).await?.ok_or(AppError::NotFound)
    }

    /// Delete a resource. Comments and category links go with it.
    pub async fn delete_resource(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM resources WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Load resources with owner, categories and comments attached.
    async fn load_resources(&self, scope: ResourceScope) -> Result<Vec<Resource>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            r#"SELECT r.id, r.title, r.resource_url, r.owner_id, u.username AS owner_username
               FROM resources r JOIN users u ON u.id = r.owner_id"#,
        );
        push_scope(&mut query, scope, "r.id");
        query.push(" ORDER BY r.id");

        let rows = query.build().fetch_all(&self.pool).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut categories = self.categories_for(scope).await?;
        let mut comments = self.comments_for(scope).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let id: i64 = row.get("id");
                Resource {
                    id,
                    title: row.get("title"),
                    categories: categories.remove(&id).unwrap_or_default(),
                    resource_url: row.get("resource_url"),
                    owner: UserSummary {
                        username: row.get("owner_username"),
                    },
                    comment_set: comments.remove(&id).unwrap_or_default(),
                    owner_id: row.get("owner_id"),
                }
            })
            .collect())
    }

    /// Category links for every resource in `scope`, keyed by resource id.
    async fn categories_for(
        &self,
        scope: ResourceScope,
    ) -> Result<HashMap<i64, Vec<Category>>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            r#"SELECT rc.resource_id, c.id, c.name
               FROM resource_categories rc JOIN categories c ON c.id = rc.category_id"#,
        );
        push_scope(&mut query, scope, "rc.resource_id");
        query.push(" ORDER BY c.id");

        let mut grouped: HashMap<i64, Vec<Category>> = HashMap::new();
        for row in query.build().fetch_all(&self.pool).await? {
            grouped
                .entry(row.get("resource_id"))
                .or_default()
                .push(category_from_row(&row));
        }
        Ok(grouped)
    }

    async fn comments_for(
        &self,
        scope: ResourceScope,
    ) -> Result<HashMap<i64, Vec<Comment>>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(COMMENT_SELECT);
        push_scope(&mut query, scope, "c.resource_id");
        query.push(" ORDER BY c.id");

        let mut grouped: HashMap<i64, Vec<Comment>> = HashMap::new();
        for row in query.build().fetch_all(&self.pool).await? {
            let comment = comment_from_row(&row);
            grouped.entry(comment.resource_id).or_default().push(comment);
        }
        Ok(grouped)
    }

    // ==================== COMMENT OPERATIONS ====================

    /// List the comments on a resource, oldest first.
    pub async fn list_comments(&self, resource_id: i64) -> Result<Vec<Comment>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE c.resource_id = ? ORDER BY c.id",
            COMMENT_SELECT
        ))
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    /// Get a comment, only if it belongs to the given resource.
    pub async fn get_comment(
        &self,
        resource_id: i64,
        comment_id: i64,
    ) -> Result<Option<Comment>, AppError> {
        let row = sqlx::query(&format!(
            "{} WHERE c.resource_id = ? AND c.id = ?",
            COMMENT_SELECT
        ))
        .bind(resource_id)
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(comment_from_row))
    }

    /// Post a comment. `posted_on` is assigned here and never changes.
    pub async fn create_comment(
        &self,
        resource_id: i64,
        author_id: i64,
        content: &str,
    ) -> Result<Comment, AppError> {
        let result = sqlx::query(
            "INSERT INTO comments (resource_id, content, author_id, posted_on) VALUES (?, ?, ?, ?)",
        )
        .bind(resource_id)
        .bind(content)
        .bind(author_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.get_comment(resource_id, result.last_insert_rowid())
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Replace a comment's content.
    pub async fn update_comment(
        &self,
        resource_id: i64,
        comment_id: i64,
        content: &str,
    ) -> Result<Comment, AppError> {
        let result = sqlx::query("UPDATE comments SET content = ? WHERE id = ? AND resource_id = ?")
            .bind(content)
            .bind(comment_id)
            .bind(resource_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        self.get_comment(resource_id, comment_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Delete a comment.
    pub async fn delete_comment(&self, resource_id: i64, comment_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ? AND resource_id = ?")
            .bind(comment_id)
            .bind(resource_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

const COMMENT_SELECT: &str = r#"SELECT c.id, c.resource_id, c.content, c.author_id, c.posted_on,
                                       u.username AS author_username
                                FROM comments c JOIN users u ON u.id = c.author_id"#;

/// Restrict a query to the resources in `scope`, matched on `column`.
fn push_scope(query: &mut QueryBuilder<'_, Sqlite>, scope: ResourceScope, column: &str) {
    match scope {
        ResourceScope::All => {}
        ResourceScope::InCategory(category_id) => {
            query
                .push(format!(
                    " WHERE {} IN (SELECT resource_id FROM resource_categories WHERE category_id = ",
                    column
                ))
                .push_bind(category_id)
                .push(")");
        }
        ResourceScope::Single(id) => {
            query.push(format!(" WHERE {} = ", column)).push_bind(id);
        }
    }
}

// Helper functions for row conversion

fn category_from_row(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
    }
}

fn comment_from_row(row: &sqlx::sqlite::SqliteRow) -> Comment {
    let posted_on: DateTime<Utc> = row.get("posted_on");
    Comment {
        id: row.get("id"),
        content: row.get("content"),
        author: UserSummary {
            username: row.get("author_username"),
        },
        posted_on,
        author_id: row.get("author_id"),
        resource_id: row.get("resource_id"),
    }
}

/// Turn a UNIQUE constraint failure into a field error; pass anything else through.
fn unique_violation(err: sqlx::Error, field: &str, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Validation(FieldErrors::single(field, message))
        }
        _ => err.into(),
    }
}
