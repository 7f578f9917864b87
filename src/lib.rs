// ==========================================
// 货运集拼导入核心 - 核心库
// ==========================================
// 职责: 粘贴舱单 → 客户对账 → 运单批量落库
// 技术栈: Rust + SQLite(参考后端)
// 系统定位: 人工裁决优先,SIMILAR / NEW_CUSTOMER / CONFLICT 不自动落定
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 匹配与对账
pub mod engine;

// 导入层 - 粘贴文本解析
pub mod importer;

// 配置层 - 对账参数
pub mod config;

// 数据库基础设施(连接初始化/PRAGMA 统一/建表)
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 外壳门面
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ConflictField, ConflictResolution, MatchFactor, MatchStatus};

// 领域实体
pub use domain::{
    CommitOutcome, Customer, CustomerPatch, DuplicateGroup, FieldEdit, NewCustomerDraft,
    ParseOutcome, ParsedRow, ShipmentRecord, StagingRecord,
};

// 引擎
pub use engine::{IdentityMatcher, ShipmentCommitter, StagingSession};

// 导入
pub use importer::ManifestParser;

// 配置
pub use config::ReconcileConfig;

// API
pub use api::{ApiError, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "货运集拼导入核心";
