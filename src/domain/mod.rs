// ==========================================
// 货运集拼导入核心 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含匹配逻辑
// ==========================================

pub mod customer;
pub mod manifest;
pub mod staging;
pub mod types;

// 重导出核心类型
pub use customer::{Customer, CustomerPatch, NewCustomerDraft};
pub use manifest::{ColumnMap, DuplicateGroup, ParseOutcome, ParsedRow};
pub use staging::{
    CommitOutcome, CommitRowError, ConflictInfo, EditedFields, FieldDiff, FieldEdit,
    MatchConfidence, ShipmentRecord, StagingRecord,
};
pub use types::{ConflictField, ConflictResolution, MatchFactor, MatchStatus};
