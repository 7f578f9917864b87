// ==========================================
// 货运集拼导入核心 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{ConfigError, ImportConfigReader};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明: 会对传入连接再次应用统一 PRAGMA(幂等)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, ConfigError> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值(scope_id='global')
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 配置(UPSERT)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取 global 配置快照
    pub fn get_config_snapshot(&self) -> Result<HashMap<String, String>, ConfigError> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshot = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    /// 读取并解析配置值; 缺失或格式错误时回退默认值
    fn get_parsed_or_default<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        let value = self.get_global_config_value(key)?;
        Ok(match value {
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => v,
                Err(_) => {
                    tracing::warn!(config_key = key, value = %raw, "配置值格式错误,使用默认值");
                    default
                }
            },
            None => default,
        })
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    // ===== 匹配阈值 =====

    async fn get_verified_threshold(&self) -> Result<f64, ConfigError> {
        self.get_parsed_or_default(config_keys::VERIFIED_THRESHOLD, 0.95)
    }

    async fn get_similar_threshold(&self) -> Result<f64, ConfigError> {
        self.get_parsed_or_default(config_keys::SIMILAR_THRESHOLD, 0.70)
    }

    async fn get_fuzzy_name_threshold(&self) -> Result<f64, ConfigError> {
        self.get_parsed_or_default(config_keys::FUZZY_NAME_THRESHOLD, 0.70)
    }

    async fn get_region_name_threshold(&self) -> Result<f64, ConfigError> {
        self.get_parsed_or_default(config_keys::REGION_NAME_THRESHOLD, 0.50)
    }

    async fn get_min_phone_digits(&self) -> Result<usize, ConfigError> {
        self.get_parsed_or_default(config_keys::MIN_PHONE_DIGITS, 8)
    }

    async fn get_candidate_limit(&self) -> Result<usize, ConfigError> {
        self.get_parsed_or_default(config_keys::CANDIDATE_LIMIT, 5)
    }

    // ===== 批量处理 =====

    async fn get_parse_chunk_size(&self) -> Result<usize, ConfigError> {
        self.get_parsed_or_default(config_keys::PARSE_CHUNK_SIZE, 200)
    }

    async fn get_commit_batch_size(&self) -> Result<usize, ConfigError> {
        self.get_parsed_or_default(config_keys::COMMIT_BATCH_SIZE, 400)
    }

    async fn get_max_store_batch_size(&self) -> Result<usize, ConfigError> {
        self.get_parsed_or_default(config_keys::MAX_STORE_BATCH_SIZE, 500)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 匹配阈值
    pub const VERIFIED_THRESHOLD: &str = "verified_threshold";
    pub const SIMILAR_THRESHOLD: &str = "similar_threshold";
    pub const FUZZY_NAME_THRESHOLD: &str = "fuzzy_name_threshold";
    pub const REGION_NAME_THRESHOLD: &str = "region_name_threshold";
    pub const MIN_PHONE_DIGITS: &str = "min_phone_digits";
    pub const CANDIDATE_LIMIT: &str = "candidate_limit";

    // 批量处理
    pub const PARSE_CHUNK_SIZE: &str = "parse_chunk_size";
    pub const COMMIT_BATCH_SIZE: &str = "commit_batch_size";
    pub const MAX_STORE_BATCH_SIZE: &str = "max_store_batch_size";
}
