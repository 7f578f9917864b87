// ==========================================
// 货运集拼导入核心 - 对账引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::types::MatchStatus;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 对账引擎错误类型
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("暂存记录不存在: {0}")]
    StagingNotFound(String),

    #[error("客户不存在: {0}")]
    CustomerNotFound(String),

    #[error("无效的状态转换: staging_id={staging_id}, status={status}, action={action}")]
    InvalidTransition {
        staging_id: String,
        status: MatchStatus,
        action: &'static str,
    },

    #[error("PENDING 不能作为冲突裁决结果")]
    PendingResolution,

    #[error("客户姓名为空,无法登记")]
    EmptyCustomerName,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type ReconcileResult<T> = Result<T, ReconcileError>;
