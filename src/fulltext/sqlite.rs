// src/fulltext/sqlite.rs
// =============================================================================
// SQLite strategy: an fts5 virtual table next to the bookmark table.
//
// The virtual table uses the bookmark id as its rowid and holds a copy of
// description, extended, tag_str and the extracted content. Every write path
// finishes by rebuilding the bookmark's fts row from bmarks + readable inside
// the same transaction, so the copy can never disagree with its sources.
//
// Searches only return ids that still have a bmarks row, the same as the
// MySQL and PostgreSQL strategies, which join bmarks directly.
// =============================================================================

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::readable::{ReadResult, ReadStatus};

use super::{limit_clause, Backend, FulltextIndex, FulltextQuery, SearchableRecord, TagString};

const CREATE_READABLE: &str = "CREATE TABLE IF NOT EXISTS readable (
    bid INTEGER NOT NULL PRIMARY KEY,
    content TEXT,
    content_type TEXT,
    status_code INTEGER NOT NULL,
    status_message TEXT,
    is_image INTEGER NOT NULL DEFAULT 0,
    imported TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

// No stemming, like postgres' 'simple' config and InnoDB
const CREATE_FULLTEXT: &str = "CREATE VIRTUAL TABLE IF NOT EXISTS fulltext USING fts5(
    description, extended, tag_str, content,
    tokenize = 'unicode61'
)";

const FILL_FULLTEXT: &str = "INSERT INTO fulltext (rowid, description, extended, tag_str, content)
    SELECT b.bid, coalesce(b.description, ''), coalesce(b.extended, ''),
           coalesce(b.tag_str, ''), coalesce(r.content, '')
    FROM bmarks b LEFT JOIN readable r ON r.bid = b.bid";

pub struct SqliteFulltext {
    pool: SqlitePool,
}

impl SqliteFulltext {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn has_tag_column(conn: &mut SqliteConnection) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('bmarks') WHERE name = 'tag_str'",
    )
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

// Rebuilds one bookmark's fts row from its source tables.
async fn refresh_row(conn: &mut SqliteConnection, bid: i64) -> Result<()> {
    sqlx::query("DELETE FROM fulltext WHERE rowid = ?")
        .bind(bid)
        .execute(&mut *conn)
        .await?;
    sqlx::query(&format!("{} WHERE b.bid = ?", FILL_FULLTEXT))
        .bind(bid)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn require_bookmark(conn: &mut SqliteConnection, bid: i64) -> Result<()> {
    let found: Option<i64> = sqlx::query_scalar("SELECT bid FROM bmarks WHERE bid = ?")
        .bind(bid)
        .fetch_optional(conn)
        .await?;
    found.map(|_| ()).ok_or(Error::MissingBookmark(bid))
}

/// `{description extended} : "term" AND {description extended} : "other"`
pub(crate) fn match_expression(query: &FulltextQuery) -> String {
    let columns: Vec<&str> = query.scope.fields().iter().map(|f| f.column()).collect();
    let colset = columns.join(" ");
    query
        .terms
        .iter()
        .map(|term| format!("{{{}}} : \"{}\"", colset, term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[async_trait]
impl FulltextIndex for SqliteFulltext {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn install(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if !has_tag_column(&mut tx).await? {
            sqlx::query("ALTER TABLE bmarks ADD COLUMN tag_str TEXT")
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(CREATE_READABLE).execute(&mut *tx).await?;
        sqlx::query(CREATE_FULLTEXT).execute(&mut *tx).await?;

        // Bookmarks that predate the index
        let filled = sqlx::query(&format!(
            "{} WHERE b.bid NOT IN (SELECT rowid FROM fulltext)",
            FILL_FULLTEXT
        ))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        info!(backfilled = filled, "installed sqlite fulltext table");
        Ok(())
    }

    async fn uninstall(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DROP TABLE IF EXISTS fulltext")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DROP TABLE IF EXISTS readable")
            .execute(&mut *tx)
            .await?;
        // bmarks.tag_str stays: DROP COLUMN needs sqlite 3.35+
        tx.commit().await?;
        info!("removed sqlite fulltext table");
        Ok(())
    }

    async fn index(&self, record: &SearchableRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE bmarks SET description = ?, extended = ?, tag_str = ? WHERE bid = ?",
        )
        .bind(&record.description)
        .bind(&record.extended)
        .bind(record.tag_string.as_str())
        .bind(record.bid)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(Error::MissingBookmark(record.bid));
        }

        match &record.content {
            Some(content) => {
                sqlx::query(
                    "INSERT INTO readable (bid, content, status_code, status_message)
                     VALUES (?, ?, ?, ?)
                     ON CONFLICT(bid) DO UPDATE SET
                        content = excluded.content,
                        content_type = NULL,
                        status_code = excluded.status_code,
                        status_message = excluded.status_message,
                        is_image = 0,
                        imported = CURRENT_TIMESTAMP",
                )
                .bind(record.bid)
                .bind(content)
                .bind(i32::from(ReadStatus::Parsed.code()))
                .bind(ReadStatus::Parsed.default_message())
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("UPDATE readable SET content = NULL WHERE bid = ?")
                    .bind(record.bid)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        refresh_row(&mut tx, record.bid).await?;
        tx.commit().await?;
        debug!(bid = record.bid, "indexed bookmark");
        Ok(())
    }

    async fn update_tags(&self, bid: i64, tags: &TagString) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query("UPDATE bmarks SET tag_str = ? WHERE bid = ?")
            .bind(tags.as_str())
            .bind(bid)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(Error::MissingBookmark(bid));
        }
        refresh_row(&mut tx, bid).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn store_readable(&self, bid: i64, read: &ReadResult) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        require_bookmark(&mut tx, bid).await?;

        sqlx::query(
            "INSERT INTO readable (bid, content, content_type, status_code, status_message, is_image)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(bid) DO UPDATE SET
                content = excluded.content,
                content_type = excluded.content_type,
                status_code = excluded.status_code,
                status_message = excluded.status_message,
                is_image = excluded.is_image,
                imported = CURRENT_TIMESTAMP",
        )
        .bind(bid)
        .bind(read.content())
        .bind(read.content_type())
        .bind(i32::from(read.status_code()))
        .bind(read.status_message())
        .bind(read.is_image())
        .execute(&mut *tx)
        .await?;

        refresh_row(&mut tx, bid).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, bid: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM readable WHERE bid = ?")
            .bind(bid)
            .execute(&mut *tx)
            .await?;
        // Metadata stays searchable while the bookmark row exists
        refresh_row(&mut tx, bid).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn search(&self, query: &FulltextQuery) -> Result<Vec<i64>> {
        let sql = format!(
            "SELECT rowid FROM fulltext WHERE fulltext MATCH ? \
             AND rowid IN (SELECT bid FROM bmarks) ORDER BY rank, rowid {}",
            limit_clause(query, "-1")
        );
        let ids: Vec<i64> = sqlx::query_scalar(&sql)
            .bind(match_expression(query))
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}
