// ==========================================
// 货运集拼导入核心 - 领域类型定义
// ==========================================
// 职责: 对账状态机的枚举类型
// 序列化格式: SCREAMING_SNAKE_CASE (与前端/数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 匹配状态 (Match Status)
// ==========================================
// 红线: SIMILAR / NEW_CUSTOMER / CONFLICT 必须人工裁决,不得自动落定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Verified,    // 已确认客户
    Conflict,    // 姓名命中但字段不一致
    Similar,     // 相似候选,待选择
    NewCustomer, // 新客户,待登记
    Duplicate,   // 同批次重复行
}

impl MatchStatus {
    /// 判断该状态是否需要人工裁决
    pub fn needs_review(&self) -> bool {
        matches!(
            self,
            MatchStatus::Conflict | MatchStatus::Similar | MatchStatus::NewCustomer
        )
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::Verified => write!(f, "VERIFIED"),
            MatchStatus::Conflict => write!(f, "CONFLICT"),
            MatchStatus::Similar => write!(f, "SIMILAR"),
            MatchStatus::NewCustomer => write!(f, "NEW_CUSTOMER"),
            MatchStatus::Duplicate => write!(f, "DUPLICATE"),
        }
    }
}

// ==========================================
// 冲突处理方式 (Conflict Resolution)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictResolution {
    Pending,      // 待处理(阻断提交)
    UpdateMaster, // 提交时覆写客户主数据
    UseOnce,      // 仅本次货物使用导入值
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictResolution::Pending => write!(f, "PENDING"),
            ConflictResolution::UpdateMaster => write!(f, "UPDATE_MASTER"),
            ConflictResolution::UseOnce => write!(f, "USE_ONCE"),
        }
    }
}

// ==========================================
// 匹配因子 (Match Factor)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchFactor {
    PhoneMatch,  // 电话命中
    ExactName,   // 姓名完全一致
    PartialName, // 姓名包含关系
    FuzzyName,   // 姓名相似
    RegionMatch, // 地区一致
}

impl fmt::Display for MatchFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchFactor::PhoneMatch => write!(f, "PHONE_MATCH"),
            MatchFactor::ExactName => write!(f, "EXACT_NAME"),
            MatchFactor::PartialName => write!(f, "PARTIAL_NAME"),
            MatchFactor::FuzzyName => write!(f, "FUZZY_NAME"),
            MatchFactor::RegionMatch => write!(f, "REGION_MATCH"),
        }
    }
}

// ==========================================
// 冲突字段 (Conflict Field)
// ==========================================
// 展示标签使用操作员习惯的韩文列名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictField {
    Phone,
    Region,
    Address,
}

impl ConflictField {
    pub fn label(&self) -> &'static str {
        match self {
            ConflictField::Phone => "연락처",
            ConflictField::Region => "지역",
            ConflictField::Address => "주소",
        }
    }
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictField::Phone => write!(f, "phone"),
            ConflictField::Region => write!(f, "region"),
            ConflictField::Address => write!(f, "address"),
        }
    }
}
