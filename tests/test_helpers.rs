// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库初始化、客户种子数据、运单构造
// ==========================================
#![allow(dead_code)]

use chrono::Utc;
use freight_intake::db::{init_schema, open_sqlite_connection};
use freight_intake::domain::{Customer, ShipmentRecord};
use freight_intake::repository::{CustomerRepository, CustomerRepositoryImpl};
use rusqlite::{params, Connection};
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件(需要保持存活)
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时路径不是合法 UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试数据库连接
pub fn open_test_connection(db_path: &str) -> Result<Connection, Box<dyn Error>> {
    Ok(open_sqlite_connection(db_path)?)
}

/// 写入一条 global 配置
pub fn insert_test_config(conn: &Connection, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    conn.execute(
        "INSERT OR REPLACE INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

/// 常用客户主数据
pub fn sample_customers() -> Vec<Customer> {
    vec![
        Customer::new("C-GO", "고관영")
            .with_phone("070 985 209")
            .with_region("BKK"),
        Customer::new("C-MR", "명랑방콕(BKK)")
            .with_phone("092 240 030")
            .with_region("BKK"),
        Customer::new("C-KIM", "김민수")
            .with_phone("010-5555-1111")
            .with_region("Sen Sok"),
    ]
}

/// 写入客户种子数据
pub async fn seed_customers(
    db_path: &str,
    customers: &[Customer],
) -> Result<CustomerRepositoryImpl, Box<dyn Error>> {
    let repo = CustomerRepositoryImpl::new(db_path)?;
    for customer in customers {
        repo.upsert_customer(customer).await?;
    }
    Ok(repo)
}

/// 构造最小运单
pub fn shipment(row_index: usize, customer_id: &str, voyage_id: &str) -> ShipmentRecord {
    ShipmentRecord {
        shipment_id: format!("SH-{}-{}", voyage_id, row_index),
        staging_id: format!("ST-{}", row_index),
        row_index,
        voyage_id: Some(voyage_id.to_string()),
        customer_id: customer_id.to_string(),
        customer_name: "test".to_string(),
        phone: None,
        region: None,
        address: None,
        qty: 1,
        weight: None,
        courier: None,
        nationality: None,
        classification: None,
        feature: None,
        invoice: None,
        cargo_category: None,
        cargo_desc: None,
        arrival_date: None,
        pod_code: None,
        discount_percent: None,
        created_at: Utc::now(),
    }
}

/// 运单表行数
pub fn count_shipments(conn: &Connection) -> Result<i64, Box<dyn Error>> {
    Ok(conn.query_row("SELECT COUNT(*) FROM shipment", [], |row| row.get(0))?)
}
