// ==========================================
// 货运集拼导入核心 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型,把引擎/仓储错误转换为面向操作员的消息
// 约束: 不向外暴露原始错误结构
// ==========================================

use crate::engine::error::ReconcileError;
use crate::i18n::t;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效的状态转换: status={status} action={action}")]
    InvalidStateTransition { status: String, action: String },

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 前置条件错误
    // ==========================================
    /// 未配置运单存储后端,禁止提交
    #[error("{}", t("api.backend_not_configured"))]
    BackendNotConfigured,

    /// 同一会话只允许一个在途提交
    #[error("{}", t("api.commit_in_progress"))]
    CommitInProgress,

    #[error("{}", t("api.no_session"))]
    NoSession,

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::ValidationError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::ValidationError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::BatchTooLarge { size, limit } => {
                ApiError::InvalidInput(format!("批次{}条超出上限{}", size, limit))
            }
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ReconcileError 转换
// ==========================================
impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::StagingNotFound(id) => {
                ApiError::NotFound(format!("暂存记录(id={})不存在", id))
            }
            ReconcileError::CustomerNotFound(id) => {
                ApiError::NotFound(format!("客户(id={})不存在", id))
            }
            ReconcileError::InvalidTransition { status, action, .. } => {
                ApiError::InvalidStateTransition {
                    status: status.to_string(),
                    action: action.to_string(),
                }
            }
            ReconcileError::PendingResolution => {
                ApiError::InvalidInput("PENDING 不能作为冲突裁决结果".to_string())
            }
            ReconcileError::EmptyCustomerName => {
                ApiError::ValidationError("客户姓名为空,无法登记".to_string())
            }
            ReconcileError::Repository(inner) => inner.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
