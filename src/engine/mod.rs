// ==========================================
// 货运集拼导入核心 - 引擎层
// ==========================================
// 职责: 身份匹配、暂存对账状态机、批量提交
// 红线: Engine 不拼 SQL, 数据访问经由 Repository Trait
// ==========================================

pub mod error;
pub mod identity_matcher;
pub mod shipment_committer;
pub mod staging;
pub mod staging_session;
pub mod summary;

// 重导出核心引擎
pub use error::{ReconcileError, ReconcileResult};
pub use identity_matcher::{
    calculate_similarity, normalize_name, normalize_phone, IdentityMatcher, MatchResult,
};
pub use shipment_committer::ShipmentCommitter;
pub use staging::{MatchContext, StagingEvent};
pub use staging_session::{RegistrationOutcome, StagingSession};
