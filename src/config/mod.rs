// ==========================================
// 货运集拼导入核心 - 配置层
// ==========================================
// 职责: 匹配阈值与批量参数管理,支持 config_kv 覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;
pub mod reconcile_config;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::{ConfigError, ImportConfigReader};
pub use reconcile_config::ReconcileConfig;
