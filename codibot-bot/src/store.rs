//! Code record store
//!
//! Durable table of submitted codes, keyed by the code string. Every
//! operation is wrapped in a bounded timeout so a wedged database
//! surfaces as an error on the one affected event instead of stalling
//! the service.

use codibot_common::db::{CodeRecord, VehicleKind};
use codibot_common::{Error, Result};
use sqlx::SqlitePool;
use std::future::Future;
use std::time::Duration;

type CodeRow = (String, String, String, i64, i64, String, i64, i64);

/// Store handle; cheap to clone
#[derive(Clone)]
pub struct CodeStore {
    db: SqlitePool,
    timeout: Duration,
}

impl CodeStore {
    pub fn new(db: SqlitePool, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    /// Look up a record by its (already normalized) code
    pub async fn find(&self, code: &str) -> Result<Option<CodeRecord>> {
        let row = self
            .bounded("find", async {
                sqlx::query_as::<_, CodeRow>(
                    r#"
                    SELECT code, vehicle_kind, vehicle_name, persist, confirms,
                           submitted_by, created_at, updated_at
                    FROM codes
                    WHERE code = ?
                    "#,
                )
                .bind(code)
                .fetch_optional(&self.db)
                .await
            })
            .await?;

        row.map(from_row).transpose()
    }

    /// Insert a freshly created record
    pub async fn insert(&self, record: &CodeRecord) -> Result<()> {
        let record = record.clone();
        self.bounded("insert", async {
            sqlx::query(
                r#"
                INSERT INTO codes (code, vehicle_kind, vehicle_name, persist,
                                   confirms, submitted_by, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.code)
            .bind(record.vehicle_kind.as_str())
            .bind(&record.vehicle_name)
            .bind(record.persist as i64)
            .bind(record.confirms)
            .bind(&record.submitted_by)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&self.db)
            .await
        })
        .await?;

        Ok(())
    }

    /// Write back the mutable fields of an existing record
    pub async fn update(&self, record: &CodeRecord) -> Result<()> {
        let record = record.clone();
        self.bounded("update", async {
            sqlx::query(
                r#"
                UPDATE codes
                SET vehicle_kind = ?, vehicle_name = ?, persist = ?,
                    confirms = ?, submitted_by = ?, updated_at = ?
                WHERE code = ?
                "#,
            )
            .bind(record.vehicle_kind.as_str())
            .bind(&record.vehicle_name)
            .bind(record.persist as i64)
            .bind(record.confirms)
            .bind(&record.submitted_by)
            .bind(record.updated_at)
            .bind(&record.code)
            .execute(&self.db)
            .await
        })
        .await?;

        Ok(())
    }

    /// Codes considered authoritative for a (kind, name) key: confident
    /// enough or persisted. Name match is case-insensitive. Returned in
    /// the store's natural (primary key) retrieval order.
    pub async fn query_confident(
        &self,
        kind: VehicleKind,
        name: &str,
        confidence_threshold: i64,
    ) -> Result<Vec<String>> {
        let name = name.to_string();
        let codes = self
            .bounded("query", async {
                sqlx::query_scalar::<_, String>(
                    r#"
                    SELECT code FROM codes
                    WHERE vehicle_kind = ?
                      AND LOWER(vehicle_name) = LOWER(?)
                      AND (confirms >= ? OR persist = 1)
                    "#,
                )
                .bind(kind.as_str())
                .bind(&name)
                .bind(confidence_threshold)
                .fetch_all(&self.db)
                .await
            })
            .await?;

        Ok(codes)
    }

    async fn bounded<F, T>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::Timeout(format!(
                "store {} exceeded {:?}",
                op, self.timeout
            ))),
        }
    }
}

fn from_row(row: CodeRow) -> Result<CodeRecord> {
    let kind = VehicleKind::parse(&row.1)
        .ok_or_else(|| Error::Internal(format!("unknown vehicle_kind in store: {}", row.1)))?;

    Ok(CodeRecord {
        code: row.0,
        vehicle_kind: kind,
        vehicle_name: row.2,
        persist: row.3 != 0,
        confirms: row.4,
        submitted_by: row.5,
        created_at: row.6,
        updated_at: row.7,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use codibot_common::db::connect_memory;

    fn record(code: &str, confirms: i64, persist: bool) -> CodeRecord {
        CodeRecord {
            code: code.to_string(),
            vehicle_kind: VehicleKind::Bus,
            vehicle_name: "402".to_string(),
            persist,
            confirms,
            submitted_by: "u1".to_string(),
            created_at: 1_000,
            updated_at: 1_000,
        }
    }

    async fn store() -> CodeStore {
        let pool = connect_memory().await.unwrap();
        CodeStore::new(pool, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn insert_then_find_round_trips() {
        let store = store().await;
        let rec = record("TT123", 1, false);

        store.insert(&rec).await.unwrap();
        let found = store.find("TT123").await.unwrap().unwrap();
        assert_eq!(found, rec);

        assert!(store.find("TT999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_overwrites_mutable_fields() {
        let store = store().await;
        store.insert(&record("TT123", 1, false)).await.unwrap();

        let mut rec = store.find("TT123").await.unwrap().unwrap();
        rec.vehicle_kind = VehicleKind::Train;
        rec.vehicle_name = "Trento".to_string();
        rec.persist = true;
        rec.confirms = 3;
        rec.updated_at = 2_000;
        store.update(&rec).await.unwrap();

        let found = store.find("TT123").await.unwrap().unwrap();
        assert_eq!(found, rec);
        // created_at untouched
        assert_eq!(found.created_at, 1_000);
    }

    #[tokio::test]
    async fn query_filters_by_confidence_or_persist() {
        let store = store().await;
        store.insert(&record("TT100", 0, false)).await.unwrap();
        store.insert(&record("TT200", 2, false)).await.unwrap();
        store.insert(&record("TT300", 0, true)).await.unwrap();

        let codes = store
            .query_confident(VehicleKind::Bus, "402", 2)
            .await
            .unwrap();
        assert_eq!(codes, vec!["TT200".to_string(), "TT300".to_string()]);

        // name match is case-insensitive, kind match is exact
        let mut train = record("TT400", 5, false);
        train.vehicle_kind = VehicleKind::Train;
        train.vehicle_name = "Trento".to_string();
        store.insert(&train).await.unwrap();

        let codes = store
            .query_confident(VehicleKind::Train, "TRENTO", 2)
            .await
            .unwrap();
        assert_eq!(codes, vec!["TT400".to_string()]);

        let codes = store
            .query_confident(VehicleKind::Bus, "Trento", 2)
            .await
            .unwrap();
        assert!(codes.is_empty());
    }
}
