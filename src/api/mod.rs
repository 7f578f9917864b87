// ==========================================
// 货运集拼导入核心 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供外壳(UI / CLI)调用
// ==========================================

pub mod error;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{CommitResponse, ImportApi, OpenSessionResponse};
