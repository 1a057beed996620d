//! SQLite storage implementation.
//!
//! Product records and coverage rows are stored as JSON documents next to
//! the columns used for lookups; evidence is an append-only table ordered
//! by rowid.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::ProductStore;
use crate::types::{
    coverage::SiteCoverage,
    evidence::Evidence,
    labels::LabelResult,
    product::{ProductRecord, StoredProduct},
    quality::{QuarantineDetail, ReviewStatus},
};

/// SQLite-based product store.
pub struct SqliteStore {
    pool: SqlitePool,
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(Box::new(e))
}

fn parse_time(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(format!("invalid timestamp {}: {}", value, e).into()))
}

impl SqliteStore {
    /// Open a store and create tables if needed.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite:inci.db?mode=rwc` - File-based, created if missing
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(backend)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// In-memory store on a single connection (every connection would
    /// otherwise see its own empty database).
    pub async fn in_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(backend)?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                canonical_url TEXT PRIMARY KEY,
                id TEXT NOT NULL UNIQUE,
                site_slug TEXT NOT NULL,
                tier TEXT NOT NULL,
                record TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_products_site_slug ON products(site_slug);
            CREATE INDEX IF NOT EXISTS idx_products_tier ON products(tier);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS evidence (
                canonical_url TEXT NOT NULL,
                field TEXT NOT NULL,
                method TEXT NOT NULL,
                row TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_evidence_url ON evidence(canonical_url);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quarantine_details (
                canonical_url TEXT PRIMARY KEY,
                site_slug TEXT NOT NULL,
                rejection_code TEXT NOT NULL,
                rejection_reason TEXT NOT NULL,
                review_status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS site_coverage (
                site_slug TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                coverage TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Record a reviewer decision on a quarantined product.
    pub async fn set_review_status(
        &self,
        canonical_url: &str,
        status: ReviewStatus,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE quarantine_details SET review_status = ? WHERE canonical_url = ?",
        )
        .bind(status.as_str())
        .bind(canonical_url)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(canonical_url.to_string()));
        }
        Ok(())
    }

    async fn append_evidence(
        conn: &mut sqlx::SqliteConnection,
        canonical_url: &str,
        evidence: &[Evidence],
    ) -> StoreResult<()> {
        for row in evidence {
            sqlx::query("INSERT INTO evidence (canonical_url, field, method, row) VALUES (?, ?, ?, ?)")
                .bind(canonical_url)
                .bind(row.field())
                .bind(row.method().as_str())
                .bind(serde_json::to_string(row)?)
                .execute(&mut *conn)
                .await
                .map_err(backend)?;
        }
        Ok(())
    }
}

// Row types for sqlx queries
#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    record: String,
    created_at: String,
    updated_at: String,
}

impl ProductRow {
    fn into_stored(self) -> StoreResult<StoredProduct> {
        Ok(StoredProduct {
            id: self.id,
            record: serde_json::from_str(&self.record)?,
            created_at: parse_time(&self.created_at)?,
            updated_at: parse_time(&self.updated_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct QuarantineRow {
    canonical_url: String,
    site_slug: String,
    rejection_code: String,
    rejection_reason: String,
    review_status: String,
    created_at: String,
}

impl QuarantineRow {
    fn into_detail(self) -> StoreResult<QuarantineDetail> {
        let review_status = match self.review_status.as_str() {
            "approved" => ReviewStatus::Approved,
            "rejected" => ReviewStatus::Rejected,
            _ => ReviewStatus::Pending,
        };
        Ok(QuarantineDetail {
            canonical_url: self.canonical_url,
            site_slug: self.site_slug,
            rejection_code: self.rejection_code,
            rejection_reason: self.rejection_reason,
            review_status,
            created_at: parse_time(&self.created_at)?,
        })
    }
}

#[async_trait]
impl ProductStore for SqliteStore {
    async fn upsert_product(
        &self,
        record: &ProductRecord,
        evidence: &[Evidence],
    ) -> StoreResult<String> {
        let now = Utc::now().to_rfc3339();
        let json = serde_json::to_string(record)?;
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            r#"
            INSERT INTO products (canonical_url, id, site_slug, tier, record, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(canonical_url) DO UPDATE SET
                site_slug = excluded.site_slug,
                tier = excluded.tier,
                record = excluded.record,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.canonical_url)
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&record.site_slug)
        .bind(record.tier.as_str())
        .bind(&json)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        let id: String = sqlx::query_scalar("SELECT id FROM products WHERE canonical_url = ?")
            .bind(&record.canonical_url)
            .fetch_one(&mut *tx)
            .await
            .map_err(backend)?;

        Self::append_evidence(&mut tx, &record.canonical_url, evidence).await?;
        tx.commit().await.map_err(backend)?;
        Ok(id)
    }

    async fn write_quarantine_detail(&self, detail: &QuarantineDetail) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO quarantine_details
                (canonical_url, site_slug, rejection_code, rejection_reason, review_status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(canonical_url) DO UPDATE SET
                site_slug = excluded.site_slug,
                rejection_code = excluded.rejection_code,
                rejection_reason = excluded.rejection_reason,
                created_at = CASE WHEN quarantine_details.review_status = 'pending'
                    THEN excluded.created_at ELSE quarantine_details.created_at END
            "#,
        )
        .bind(&detail.canonical_url)
        .bind(&detail.site_slug)
        .bind(&detail.rejection_code)
        .bind(&detail.rejection_reason)
        .bind(detail.review_status.as_str())
        .bind(detail.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn clear_quarantine_detail(&self, canonical_url: &str) -> StoreResult<()> {
        sqlx::query(
            "DELETE FROM quarantine_details WHERE canonical_url = ? AND review_status = 'pending'",
        )
        .bind(canonical_url)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn upsert_site_coverage(&self, coverage: &SiteCoverage) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO site_coverage (site_slug, status, coverage, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(site_slug) DO UPDATE SET
                status = excluded.status,
                coverage = excluded.coverage,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&coverage.site_slug)
        .bind(coverage.status.as_str())
        .bind(serde_json::to_string(coverage)?)
        .bind(coverage.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get_product(&self, canonical_url: &str) -> StoreResult<Option<StoredProduct>> {
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, record, created_at, updated_at FROM products WHERE canonical_url = ?",
        )
        .bind(canonical_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(ProductRow::into_stored).transpose()
    }

    async fn get_products_for_site(&self, site_slug: &str) -> StoreResult<Vec<StoredProduct>> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, record, created_at, updated_at FROM products
            WHERE site_slug = ?
            ORDER BY canonical_url
            "#,
        )
        .bind(site_slug)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(ProductRow::into_stored).collect()
    }

    async fn get_evidence(&self, canonical_url: &str) -> StoreResult<Vec<Evidence>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT row FROM evidence WHERE canonical_url = ? ORDER BY rowid",
        )
        .bind(canonical_url)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter()
            .map(|row| serde_json::from_str(row).map_err(StoreError::from))
            .collect()
    }

    async fn get_quarantine_detail(
        &self,
        canonical_url: &str,
    ) -> StoreResult<Option<QuarantineDetail>> {
        let row: Option<QuarantineRow> = sqlx::query_as(
            r#"
            SELECT canonical_url, site_slug, rejection_code, rejection_reason, review_status, created_at
            FROM quarantine_details WHERE canonical_url = ?
            "#,
        )
        .bind(canonical_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(QuarantineRow::into_detail).transpose()
    }

    async fn get_site_coverage(&self, site_slug: &str) -> StoreResult<Option<SiteCoverage>> {
        let row: Option<String> =
            sqlx::query_scalar("SELECT coverage FROM site_coverage WHERE site_slug = ?")
                .bind(site_slug)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;

        Ok(row.map(|json| serde_json::from_str(&json)).transpose()?)
    }

    async fn update_labels(
        &self,
        canonical_url: &str,
        labels: &LabelResult,
        evidence: &[Evidence],
    ) -> StoreResult<()> {
        let Some(stored) = self.get_product(canonical_url).await? else {
            return Err(StoreError::NotFound(canonical_url.to_string()));
        };
        let mut record = stored.record;
        record.labels = labels.clone();

        let mut tx = self.pool.begin().await.map_err(backend)?;
        sqlx::query("UPDATE products SET record = ?, updated_at = ? WHERE canonical_url = ?")
            .bind(serde_json::to_string(&record)?)
            .bind(Utc::now().to_rfc3339())
            .bind(canonical_url)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        Self::append_evidence(&mut tx, canonical_url, evidence).await?;
        tx.commit().await.map_err(backend)?;
        Ok(())
    }
}
