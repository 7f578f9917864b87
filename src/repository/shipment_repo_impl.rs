// ==========================================
// 货运集拼导入核心 - 运单 Repository 实现
// ==========================================
// 职责: shipment 表批量写入(使用 rusqlite)
// 红线: 超出单事务上限的批次整体拒绝,不做隐式拆分
// ==========================================

use crate::domain::staging::ShipmentRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::shipment_repo::ShipmentRepository;
use async_trait::async_trait;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const SELECT_COLUMNS: &str = "shipment_id, staging_id, row_index, voyage_id, customer_id, \
     customer_name, phone, region, address, qty, weight, courier, nationality, classification, \
     feature, invoice, cargo_category, cargo_desc, arrival_date, pod_code, discount_percent, \
     created_at";

// ==========================================
// ShipmentRepositoryImpl
// ==========================================
pub struct ShipmentRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
    max_batch_size: usize,
}

impl ShipmentRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - max_batch_size: 单事务写入上限
    pub fn new(db_path: &str, max_batch_size: usize) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            max_batch_size: max_batch_size.max(1),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>, max_batch_size: usize) -> Self {
        Self {
            conn,
            max_batch_size: max_batch_size.max(1),
        }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<ShipmentRecord> {
        let row_index: i64 = row.get(2)?;
        Ok(ShipmentRecord {
            shipment_id: row.get(0)?,
            staging_id: row.get(1)?,
            row_index: row_index.max(0) as usize,
            voyage_id: row.get(3)?,
            customer_id: row.get(4)?,
            customer_name: row.get(5)?,
            phone: row.get(6)?,
            region: row.get(7)?,
            address: row.get(8)?,
            qty: row.get(9)?,
            weight: row.get(10)?,
            courier: row.get(11)?,
            nationality: row.get(12)?,
            classification: row.get(13)?,
            feature: row.get(14)?,
            invoice: row.get(15)?,
            cargo_category: row.get(16)?,
            cargo_desc: row.get(17)?,
            arrival_date: row.get(18)?,
            pod_code: row.get(19)?,
            discount_percent: row.get(20)?,
            created_at: row.get(21)?,
        })
    }
}

#[async_trait]
impl ShipmentRepository for ShipmentRepositoryImpl {
    async fn commit_shipments(&self, batch: &[ShipmentRecord]) -> RepositoryResult<usize> {
        if batch.len() > self.max_batch_size {
            return Err(RepositoryError::BatchTooLarge {
                size: batch.len(),
                limit: self.max_batch_size,
            });
        }
        if batch.is_empty() {
            return Ok(0);
        }

        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(format!("开启事务失败: {}", e)))?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO shipment (
                    shipment_id, staging_id, row_index, voyage_id, customer_id,
                    customer_name, phone, region, address, qty, weight, courier,
                    nationality, classification, feature, invoice, cargo_category,
                    cargo_desc, arrival_date, pod_code, discount_percent, created_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                    ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22
                )
                "#,
            )?;

            for s in batch {
                stmt.execute(params![
                    s.shipment_id,
                    s.staging_id,
                    s.row_index as i64,
                    s.voyage_id,
                    s.customer_id,
                    s.customer_name,
                    s.phone,
                    s.region,
                    s.address,
                    s.qty,
                    s.weight,
                    s.courier,
                    s.nationality,
                    s.classification,
                    s.feature,
                    s.invoice,
                    s.cargo_category,
                    s.cargo_desc,
                    s.arrival_date,
                    s.pod_code,
                    s.discount_percent,
                    s.created_at,
                ])?;
                count += 1;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(format!("提交事务失败: {}", e)))?;
        Ok(count)
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    async fn list_by_voyage(&self, voyage_id: &str) -> RepositoryResult<Vec<ShipmentRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM shipment WHERE voyage_id = ?1 ORDER BY row_index",
            SELECT_COLUMNS
        ))?;
        let shipments = stmt
            .query_map(params![voyage_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(shipments)
    }

    async fn count_shipments(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM shipment", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}
