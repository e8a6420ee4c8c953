use chrono::{SubsecRound, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::error::{AppError, Result};
use crate::models::{Comment, Crumb, User};

use super::repository::{crumb_from_row, datetime_column, format_datetime, Repository, CRUMB_COLUMNS};

impl Repository {
    // User operations

    pub async fn create_user(&self, username: &str, email: &str) -> Result<User> {
        let username = username.trim().to_string();
        let email = email.trim().to_string();
        if username.is_empty() || email.is_empty() {
            return Err(AppError::Validation(
                "Username and email are required.".to_string(),
            ));
        }

        let now = Utc::now().trunc_subsecs(0);
        let user = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO users (username, email, date_joined) VALUES (?1, ?2, ?3)",
                    params![username, email, format_datetime(now)],
                )?;
                Ok(User {
                    id: conn.last_insert_rowid(),
                    username,
                    email,
                    date_joined: now,
                })
            })
            .await?;
        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = self
            .conn
            .call(move |conn| {
                let user = conn
                    .query_row(
                        "SELECT id, username, email, date_joined FROM users WHERE id = ?1",
                        params![id],
                        user_from_row,
                    )
                    .optional()?;
                Ok(user)
            })
            .await?;
        Ok(user)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let username = username.to_string();
        let user = self
            .conn
            .call(move |conn| {
                let user = conn
                    .query_row(
                        "SELECT id, username, email, date_joined FROM users WHERE username = ?1",
                        params![username],
                        user_from_row,
                    )
                    .optional()?;
                Ok(user)
            })
            .await?;
        Ok(user)
    }

    // Preference operations

    pub async fn get_selected_topic_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        let ids = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT topic_id FROM user_topics WHERE user_id = ?1 ORDER BY topic_id",
                )?;
                let ids = stmt
                    .query_map(params![user_id], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<i64>, _>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids)
    }

    /// Replace the user's topic selection. Unknown topic ids fail the whole
    /// update. Limits are enforced by the caller.
    pub async fn set_selected_topics(&self, user_id: i64, topic_ids: Vec<i64>) -> Result<()> {
        let unknown = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for topic_id in &topic_ids {
                    let known: bool = tx.query_row(
                        "SELECT EXISTS(SELECT 1 FROM topics WHERE id = ?1)",
                        params![topic_id],
                        |row| row.get(0),
                    )?;
                    if !known {
                        return Ok(Some(*topic_id));
                    }
                }

                tx.execute("DELETE FROM user_topics WHERE user_id = ?1", params![user_id])?;
                for topic_id in &topic_ids {
                    tx.execute(
                        "INSERT OR IGNORE INTO user_topics (user_id, topic_id) VALUES (?1, ?2)",
                        params![user_id, topic_id],
                    )?;
                }
                tx.commit()?;
                Ok(None)
            })
            .await?;

        match unknown {
            Some(id) => Err(AppError::Validation(format!("Unknown topic id {}.", id))),
            None => Ok(()),
        }
    }

    // Saved crumbs

    /// Save the crumb for the user, or remove it if already saved.
    /// Returns whether the crumb is saved afterwards.
    pub async fn toggle_saved_crumb(&self, user_id: i64, crumb_id: i64) -> Result<bool> {
        let saved = self
            .conn
            .call(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM saved_crumbs WHERE user_id = ?1 AND crumb_id = ?2",
                    params![user_id, crumb_id],
                )?;
                if removed > 0 {
                    return Ok(false);
                }
                conn.execute(
                    "INSERT INTO saved_crumbs (user_id, crumb_id, saved_at) VALUES (?1, ?2, ?3)",
                    params![user_id, crumb_id, format_datetime(Utc::now())],
                )?;
                Ok(true)
            })
            .await?;
        Ok(saved)
    }

    /// Saved crumbs, most recently saved first.
    pub async fn list_saved_crumbs(&self, user_id: i64) -> Result<Vec<Crumb>> {
        let crumbs = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {} FROM saved_crumbs s
                     JOIN crumbs c ON s.crumb_id = c.id
                     JOIN topics t ON c.topic_id = t.id
                     WHERE s.user_id = ?1
                     ORDER BY s.saved_at DESC, s.id DESC",
                    CRUMB_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let crumbs = stmt
                    .query_map(params![user_id], crumb_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(crumbs)
            })
            .await?;
        Ok(crumbs)
    }

    // Comments

    pub async fn add_comment(&self, user: &User, crumb_id: i64, content: &str) -> Result<Comment> {
        let user_id = user.id;
        let username = user.username.clone();
        let content = content.to_string();
        let now = Utc::now().trunc_subsecs(0);
        let comment = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO comments (user_id, crumb_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![user_id, crumb_id, content, format_datetime(now)],
                )?;
                Ok(Comment {
                    id: conn.last_insert_rowid(),
                    crumb_id,
                    username,
                    content,
                    created_at: now,
                })
            })
            .await?;
        Ok(comment)
    }

    pub async fn list_comments(&self, crumb_id: i64) -> Result<Vec<Comment>> {
        let comments = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT c.id, c.crumb_id, u.username, c.content, c.created_at
                       FROM comments c
                       JOIN users u ON c.user_id = u.id
                       WHERE c.crumb_id = ?1
                       ORDER BY c.created_at, c.id"#,
                )?;
                let comments = stmt
                    .query_map(params![crumb_id], comment_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(comments)
            })
            .await?;
        Ok(comments)
    }
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        date_joined: datetime_column(row, 3)?,
    })
}

fn comment_from_row(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        crumb_id: row.get(1)?,
        username: row.get(2)?,
        content: row.get(3)?,
        created_at: datetime_column(row, 4)?,
    })
}
