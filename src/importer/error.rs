// ==========================================
// 货运集拼导入核心 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 解析阶段永不整体失败,以下错误渲染为 warnings 文本
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    // ===== 行级问题(非致命) =====
    #[error("第 {row} 行: 无法识别收件人姓名,已跳过")]
    NameUnresolved { row: usize },

    #[error("第 {row} 行: 数量 '{value}' 无法解析,按 1 处理")]
    QuantityUnparsed { row: usize, value: String },

    #[error("第 {row} 行: 重量 '{value}' 无法解析,已忽略")]
    WeightUnparsed { row: usize, value: String },

    // ===== 结构问题 =====
    #[error("粘贴内容为空")]
    EmptyInput,

    #[error("表头未识别到姓名列,改用逐格推断")]
    NameColumnMissing,
}

impl ImportError {
    /// 关联行号(结构问题返回 None)
    pub fn row(&self) -> Option<usize> {
        match self {
            ImportError::NameUnresolved { row }
            | ImportError::QuantityUnparsed { row, .. }
            | ImportError::WeightUnparsed { row, .. } => Some(*row),
            ImportError::EmptyInput | ImportError::NameColumnMissing => None,
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
