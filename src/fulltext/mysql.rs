// src/fulltext/mysql.rs
// =============================================================================
// MySQL strategy: FULLTEXT indexes directly on the bookmark columns.
//
// There is no separate structure to keep in sync; InnoDB indexes the columns
// in place. Three indexes are installed:
// - bmarks_ft     (description, extended, tag_str)  metadata searches
// - bmarks_tag_ft (tag_str)                         tag-only searches
// - readable_ft   (content) on the readable table   content searches
//
// InnoDB only answers MATCH() over a column list that exactly matches one
// FULLTEXT index, which is why tags get an index of their own.
//
// Note: MySQL DDL commits implicitly, so install/uninstall are not atomic.
// Default innodb_ft_min_token_size (3) means one and two letter terms never
// match here while they can on the other backends. InnoDB's stopwords are
// already dropped from every query before it reaches a backend, and InnoDB
// does not stem, so otherwise the term rules agree.
// =============================================================================

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnection, MySqlPool, MySqlPoolOptions};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::readable::{ReadResult, ReadStatus};

use super::{limit_clause, Backend, FulltextIndex, FulltextQuery, SearchScope, SearchableRecord, TagString};

const METADATA_COLUMNS: &str = "b.description, b.extended, b.tag_str";
const TAG_COLUMNS: &str = "b.tag_str";
const CONTENT_COLUMNS: &str = "r.content";

const CREATE_READABLE: &str = "CREATE TABLE IF NOT EXISTS readable (
    bid INT NOT NULL PRIMARY KEY,
    content MEDIUMTEXT,
    content_type VARCHAR(255),
    status_code INT NOT NULL,
    status_message VARCHAR(255),
    is_image BOOLEAN NOT NULL DEFAULT FALSE,
    imported TIMESTAMP NULL DEFAULT CURRENT_TIMESTAMP,
    FULLTEXT KEY readable_ft (content)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

// (index name, column list) on bmarks
const BMARK_INDEXES: &[(&str, &str)] = &[
    ("bmarks_ft", "description, extended, tag_str"),
    ("bmarks_tag_ft", "tag_str"),
];

// Largest value MySQL accepts for "no limit"
const NO_LIMIT: &str = "18446744073709551615";

pub struct MysqlFulltext {
    pool: MySqlPool,
}

impl MysqlFulltext {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn has_tag_column(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.columns
             WHERE table_schema = DATABASE() AND table_name = 'bmarks' AND column_name = 'tag_str'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn has_index(&self, table: &str, index: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.statistics
             WHERE table_schema = DATABASE() AND table_name = ? AND index_name = ?",
        )
        .bind(table)
        .bind(index)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }
}

// Locks the bookmark row for the rest of the transaction so concurrent
// writers to the same bookmark queue up instead of interleaving.
async fn lock_bookmark(conn: &mut MySqlConnection, bid: i64) -> Result<()> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT CAST(bid AS SIGNED) FROM bmarks WHERE bid = ? FOR UPDATE")
            .bind(bid)
            .fetch_optional(conn)
            .await?;
    found.map(|_| ()).ok_or(Error::MissingBookmark(bid))
}

fn match_targets(scope: SearchScope) -> &'static [&'static str] {
    match scope {
        SearchScope::Metadata => &[METADATA_COLUMNS],
        SearchScope::Tags => &[TAG_COLUMNS],
        SearchScope::Content => &[CONTENT_COLUMNS],
        SearchScope::All => &[METADATA_COLUMNS, CONTENT_COLUMNS],
    }
}

/// SELECT for `query`. Placeholders: every term once per match target, then
/// the joined query once per target for ranking.
pub(crate) fn search_sql(query: &FulltextQuery) -> String {
    let targets = match_targets(query.scope);

    let term_condition = format!(
        "({})",
        targets
            .iter()
            .map(|cols| format!("MATCH ({}) AGAINST (? IN BOOLEAN MODE)", cols))
            .collect::<Vec<_>>()
            .join(" OR ")
    );
    let conditions = vec![term_condition; query.terms.len()].join(" AND ");

    let rank = targets
        .iter()
        .map(|cols| format!("MATCH ({}) AGAINST (?)", cols))
        .collect::<Vec<_>>()
        .join(" + ");

    format!(
        "SELECT CAST(b.bid AS SIGNED) FROM bmarks b LEFT JOIN readable r ON r.bid = b.bid \
         WHERE {} ORDER BY ({}) DESC, b.bid {}",
        conditions,
        rank,
        limit_clause(query, NO_LIMIT)
    )
}

/// Bind values in placeholder order for `search_sql`.
pub(crate) fn search_binds(query: &FulltextQuery) -> Vec<String> {
    let targets = match_targets(query.scope).len();
    let mut binds = Vec::with_capacity((query.terms.len() + 1) * targets);
    for term in &query.terms {
        binds.extend(std::iter::repeat(term.clone()).take(targets));
    }
    binds.extend(std::iter::repeat(query.joined()).take(targets));
    binds
}

#[async_trait]
impl FulltextIndex for MysqlFulltext {
    fn backend(&self) -> Backend {
        Backend::Mysql
    }

    async fn install(&self) -> Result<()> {
        if !self.has_tag_column().await? {
            sqlx::query("ALTER TABLE bmarks ADD COLUMN tag_str TEXT")
                .execute(&self.pool)
                .await?;
        }
        sqlx::query(CREATE_READABLE).execute(&self.pool).await?;

        for (name, columns) in BMARK_INDEXES {
            if !self.has_index("bmarks", name).await? {
                sqlx::query(&format!("ALTER TABLE bmarks ADD FULLTEXT {} ({})", name, columns))
                    .execute(&self.pool)
                    .await?;
            }
        }
        info!("installed mysql fulltext indexes");
        Ok(())
    }

    async fn uninstall(&self) -> Result<()> {
        for (name, _) in BMARK_INDEXES {
            if self.has_index("bmarks", name).await? {
                sqlx::query(&format!("ALTER TABLE bmarks DROP INDEX {}", name))
                    .execute(&self.pool)
                    .await?;
            }
        }
        sqlx::query("DROP TABLE IF EXISTS readable")
            .execute(&self.pool)
            .await?;
        if self.has_tag_column().await? {
            sqlx::query("ALTER TABLE bmarks DROP COLUMN tag_str")
                .execute(&self.pool)
                .await?;
        }
        info!("removed mysql fulltext indexes");
        Ok(())
    }

    async fn index(&self, record: &SearchableRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lock_bookmark(&mut tx, record.bid).await?;

        sqlx::query("UPDATE bmarks SET description = ?, extended = ?, tag_str = ? WHERE bid = ?")
            .bind(&record.description)
            .bind(&record.extended)
            .bind(record.tag_string.as_str())
            .bind(record.bid)
            .execute(&mut *tx)
            .await?;

        match &record.content {
            Some(content) => {
                sqlx::query(
                    "INSERT INTO readable (bid, content, status_code, status_message)
                     VALUES (?, ?, ?, ?)
                     ON DUPLICATE KEY UPDATE
                        content = VALUES(content),
                        content_type = NULL,
                        status_code = VALUES(status_code),
                        status_message = VALUES(status_message),
                        is_image = FALSE,
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

        tx.commit().await?;
        debug!(bid = record.bid, "indexed bookmark");
        Ok(())
    }

    async fn update_tags(&self, bid: i64, tags: &TagString) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lock_bookmark(&mut tx, bid).await?;
        sqlx::query("UPDATE bmarks SET tag_str = ? WHERE bid = ?")
            .bind(tags.as_str())
            .bind(bid)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn store_readable(&self, bid: i64, read: &ReadResult) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lock_bookmark(&mut tx, bid).await?;

        sqlx::query(
            "INSERT INTO readable (bid, content, content_type, status_code, status_message, is_image)
             VALUES (?, ?, ?, ?, ?, ?)
             ON DUPLICATE KEY UPDATE
                content = VALUES(content),
                content_type = VALUES(content_type),
                status_code = VALUES(status_code),
                status_message = VALUES(status_message),
                is_image = VALUES(is_image),
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

        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, bid: i64) -> Result<()> {
        // bmarks rows belong to the bookmark layer; metadata stays searchable
        sqlx::query("DELETE FROM readable WHERE bid = ?")
            .bind(bid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn search(&self, query: &FulltextQuery) -> Result<Vec<i64>> {
        let sql = search_sql(query);
        let mut statement = sqlx::query_scalar::<sqlx::MySql, i64>(&sql);
        for value in search_binds(query) {
            statement = statement.bind(value);
        }
        let ids: Vec<i64> = statement.fetch_all(&self.pool).await?;
        Ok(ids)
    }
}
