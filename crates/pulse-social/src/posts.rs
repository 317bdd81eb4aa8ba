//! Posts, their reactions and comments, and post reports.

use pulse_types::ReportStatus;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::SocialError;

/// Media attached to a post.
///
/// Clients have written media either as a single URL or as a list of items,
/// so both shapes are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostMedia {
    #[default]
    None,
    Single(String),
    List(Vec<MediaItem>),
}

/// One element of a media list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaItem {
    Url(String),
    Object {
        #[serde(default)]
        url: Option<String>,
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },
}

impl MediaItem {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url),
            Self::Object { url, .. } => url.as_deref(),
        }
    }
}

impl PostMedia {
    /// URL used as the post's thumbnail in notifications.
    ///
    /// Lists always yield their first element's URL; an empty string means
    /// there is nothing to show. A plain string first element counts as its
    /// own URL rather than as an item without one.
    pub fn thumbnail_url(&self) -> &str {
        match self {
            Self::None => "",
            Self::Single(url) => url,
            Self::List(items) => items.first().and_then(MediaItem::url).unwrap_or(""),
        }
    }

    fn to_column(&self) -> Result<Option<String>, serde_json::Error> {
        match self {
            Self::None => Ok(None),
            other => serde_json::to_string(other).map(Some),
        }
    }
}

/// A post document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub post_id: String,
    pub author_id: String,
    pub caption: String,
    pub media: PostMedia,
    pub created_at: String,
}

/// A comment under a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub post_id: String,
    pub comment_id: String,
    pub author_id: String,
    pub author_name: Option<String>,
    pub text: String,
}

/// Input for [`create_report`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub post_id: String,
    pub reason: String,
    pub detail: String,
    pub reported_by: String,
}

/// A stored post report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostReport {
    pub report_id: String,
    pub post_id: String,
    pub reason: String,
    pub detail: String,
    pub reported_by: String,
    pub status: ReportStatus,
    pub created_at: String,
}

/// Creates a post, or overwrites its author, caption and media if it exists.
pub fn create_post(
    conn: &Connection,
    post_id: &str,
    author_id: &str,
    caption: &str,
    media: &PostMedia,
) -> Result<Post, SocialError> {
    let media_json = media.to_column()?;
    let post = conn.query_row(
        "INSERT INTO posts (post_id, author_id, caption, media_json) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(post_id) DO UPDATE SET
            author_id = excluded.author_id,
            caption = excluded.caption,
            media_json = excluded.media_json
         RETURNING post_id, author_id, caption, media_json, created_at",
        params![post_id, author_id, caption, media_json],
        map_row_to_post,
    )?;
    Ok(post)
}

/// Retrieves a post. A missing post is `Ok(None)`.
pub fn get_post(conn: &Connection, post_id: &str) -> Result<Option<Post>, SocialError> {
    let post = conn
        .query_row(
            "SELECT post_id, author_id, caption, media_json, created_at FROM posts WHERE post_id = ?1",
            [post_id],
            map_row_to_post,
        )
        .optional()?;
    Ok(post)
}

/// Deletes a post. Returns `true` if it existed.
pub fn delete_post(conn: &Connection, post_id: &str) -> Result<bool, SocialError> {
    let count = conn.execute("DELETE FROM posts WHERE post_id = ?1", [post_id])?;
    Ok(count > 0)
}

fn map_row_to_post(row: &Row) -> rusqlite::Result<Post> {
    let media_json: Option<String> = row.get(3)?;
    let media = match media_json {
        Some(json) => serde_json::from_str(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?,
        None => PostMedia::None,
    };

    Ok(Post {
        post_id: row.get(0)?,
        author_id: row.get(1)?,
        caption: row.get(2)?,
        media,
        created_at: row.get(4)?,
    })
}

/// Records `uid`'s reaction to a post, replacing any earlier one.
pub fn add_reaction(conn: &Connection, post_id: &str, uid: &str, reaction: &str) -> Result<(), SocialError> {
    conn.execute(
        "INSERT INTO post_reactions (post_id, uid, reaction) VALUES (?1, ?2, ?3)
         ON CONFLICT(post_id, uid) DO UPDATE SET reaction = excluded.reaction",
        params![post_id, uid, reaction],
    )?;
    Ok(())
}

/// Removes `uid`'s reaction. Returns `true` if there was one.
pub fn delete_reaction(conn: &Connection, post_id: &str, uid: &str) -> Result<bool, SocialError> {
    let count = conn.execute(
        "DELETE FROM post_reactions WHERE post_id = ?1 AND uid = ?2",
        [post_id, uid],
    )?;
    Ok(count > 0)
}

/// Writes a comment under a post. Writing the same comment id again
/// replaces its fields and keeps its position.
pub fn add_comment(conn: &Connection, comment: &Comment) -> Result<(), SocialError> {
    conn.execute(
        "INSERT INTO post_comments (post_id, comment_id, author_id, author_name, text)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(post_id, comment_id) DO UPDATE SET
            author_id = excluded.author_id,
            author_name = excluded.author_name,
            text = excluded.text",
        params![
            comment.post_id,
            comment.comment_id,
            comment.author_id,
            comment.author_name,
            comment.text,
        ],
    )?;
    Ok(())
}

/// Removes a comment. Returns `true` if it existed.
pub fn delete_comment(conn: &Connection, post_id: &str, comment_id: &str) -> Result<bool, SocialError> {
    let count = conn.execute(
        "DELETE FROM post_comments WHERE post_id = ?1 AND comment_id = ?2",
        [post_id, comment_id],
    )?;
    Ok(count > 0)
}

/// Stores a new report with status `open` and a generated id.
pub fn create_report(conn: &Connection, report: &NewReport) -> Result<PostReport, SocialError> {
    let report_id = uuid::Uuid::new_v4().to_string();
    let created_at: String = conn.query_row(
        "INSERT INTO post_reports (report_id, post_id, reason, detail, reported_by, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         RETURNING created_at",
        params![
            report_id,
            report.post_id,
            report.reason,
            report.detail,
            report.reported_by,
            ReportStatus::Open.as_str(),
        ],
        |row| row.get(0),
    )?;

    Ok(PostReport {
        report_id,
        post_id: report.post_id.clone(),
        reason: report.reason.clone(),
        detail: report.detail.clone(),
        reported_by: report.reported_by.clone(),
        status: ReportStatus::Open,
        created_at,
    })
}

/// Retrieves a report by id. A missing report is `Ok(None)`.
pub fn get_report(conn: &Connection, report_id: &str) -> Result<Option<PostReport>, SocialError> {
    let row = conn
        .query_row(
            "SELECT report_id, post_id, reason, detail, reported_by, status, created_at
             FROM post_reports WHERE report_id = ?1",
            [report_id],
            |row| {
                Ok((
                    PostReport {
                        report_id: row.get(0)?,
                        post_id: row.get(1)?,
                        reason: row.get(2)?,
                        detail: row.get(3)?,
                        reported_by: row.get(4)?,
                        status: ReportStatus::Open,
                        created_at: row.get(6)?,
                    },
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((mut report, status)) => {
            report.status = status.parse()?;
            Ok(Some(report))
        }
        None => Ok(None),
    }
}
