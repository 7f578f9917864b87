// ==========================================
// 货运集拼导入核心 - 客户主数据 Repository 实现
// ==========================================
// 职责: customer 表 CRUD(使用 rusqlite)
// 约束: name_key 为标准化姓名,唯一
// ==========================================

use crate::domain::customer::{Customer, CustomerPatch};
use crate::engine::identity_matcher::normalize_name;
use crate::repository::customer_repo::CustomerRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const SELECT_COLUMNS: &str = "customer_id, name, phone, region, address_detail, \
     pod_code, discount_info, discount_percent";

// ==========================================
// CustomerRepositoryImpl
// ==========================================
pub struct CustomerRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl CustomerRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
        Ok(Customer {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
            region: row.get(3)?,
            address_detail: row.get(4)?,
            pod_code: row.get(5)?,
            discount_info: row.get(6)?,
            discount_percent: row.get(7)?,
        })
    }
}

#[async_trait]
impl CustomerRepository for CustomerRepositoryImpl {
    async fn list_customers(&self) -> RepositoryResult<Vec<Customer>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM customer ORDER BY created_at, customer_id",
            SELECT_COLUMNS
        ))?;

        let customers = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(customers)
    }

    async fn find_by_id(&self, customer_id: &str) -> RepositoryResult<Option<Customer>> {
        let conn = self.get_conn()?;
        let customer = conn
            .query_row(
                &format!("SELECT {} FROM customer WHERE customer_id = ?1", SELECT_COLUMNS),
                params![customer_id],
                Self::map_row,
            )
            .optional()?;
        Ok(customer)
    }

    async fn upsert_customer(&self, customer: &Customer) -> RepositoryResult<()> {
        let name_key = normalize_name(&customer.name);
        if name_key.is_empty() {
            return Err(RepositoryError::ValidationError(format!(
                "客户姓名为空: id={}",
                customer.id
            )));
        }

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO customer (
                customer_id, name, name_key, phone, region, address_detail,
                pod_code, discount_info, discount_percent
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(customer_id) DO UPDATE SET
                name = excluded.name,
                name_key = excluded.name_key,
                phone = excluded.phone,
                region = excluded.region,
                address_detail = excluded.address_detail,
                pod_code = excluded.pod_code,
                discount_info = excluded.discount_info,
                discount_percent = excluded.discount_percent,
                updated_at = datetime('now')
            "#,
            params![
                customer.id,
                customer.name,
                name_key,
                customer.phone,
                customer.region,
                customer.address_detail,
                customer.pod_code,
                customer.discount_info,
                customer.discount_percent,
            ],
        )?;

        tracing::debug!(customer_id = %customer.id, "客户主数据已写入");
        Ok(())
    }

    async fn update_customer_fields(
        &self,
        customer_id: &str,
        patch: &CustomerPatch,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        // COALESCE: 补丁中为 NULL 的字段保持原值
        let affected = conn.execute(
            r#"
            UPDATE customer SET
                phone = COALESCE(?2, phone),
                region = COALESCE(?3, region),
                address_detail = COALESCE(?4, address_detail),
                updated_at = datetime('now')
            WHERE customer_id = ?1
            "#,
            params![
                customer_id,
                patch.phone,
                patch.region,
                patch.address_detail
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Customer".to_string(),
                id: customer_id.to_string(),
            });
        }
        Ok(())
    }
}
