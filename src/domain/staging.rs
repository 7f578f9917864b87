// ==========================================
// 货运集拼导入核心 - 暂存记录领域模型
// ==========================================
// 红线: 提交资格 ⇔ is_selected && is_resolved
// 红线: CONFLICT 在 PENDING 时永不 resolved
// ==========================================

use crate::domain::customer::{Customer, CustomerPatch};
use crate::domain::manifest::ParsedRow;
use crate::domain::types::{ConflictField, ConflictResolution, MatchFactor, MatchStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// MatchConfidence - 匹配置信度
// ==========================================
// 每次(重新)匹配时重新计算,不单独持久化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfidence {
    pub score: f64, // [0, 1]
    pub factors: Vec<MatchFactor>,
    pub name_score: f64,
    pub phone_score: f64,
    pub region_score: f64,
}

impl MatchConfidence {
    pub fn none() -> Self {
        Self {
            score: 0.0,
            factors: Vec::new(),
            name_score: 0.0,
            phone_score: 0.0,
            region_score: 0.0,
        }
    }

    pub fn has_factor(&self, factor: MatchFactor) -> bool {
        self.factors.contains(&factor)
    }
}

// ==========================================
// EditedFields - 用户可修正字段
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditedFields {
    pub name: String,
    pub phone: Option<String>,
    pub region: Option<String>,
}

impl EditedFields {
    pub fn from_row(row: &ParsedRow) -> Self {
        Self {
            name: row.raw_name.clone(),
            phone: row.phone.clone(),
            region: row.region.clone(),
        }
    }
}

/// 编辑事件(None 表示该字段不变,Some("") 表示清空)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldEdit {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub region: Option<String>,
}

// ==========================================
// FieldDiff / ConflictInfo - 冲突明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub field: ConflictField,
    pub master_value: Option<String>,
    pub imported_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictInfo {
    pub customer_id: String,
    pub fields: Vec<FieldDiff>,
    pub resolution: ConflictResolution,
}

impl ConflictInfo {
    pub fn has_field(&self, field: ConflictField) -> bool {
        self.fields.iter().any(|d| d.field == field)
    }

    /// 生成覆写主数据用的补丁
    pub fn to_patch(&self) -> CustomerPatch {
        let mut patch = CustomerPatch::default();
        for diff in &self.fields {
            let value = Some(diff.imported_value.clone());
            match diff.field {
                ConflictField::Phone => patch.phone = value,
                ConflictField::Region => patch.region = value,
                ConflictField::Address => patch.address_detail = value,
            }
        }
        patch
    }
}

// ==========================================
// StagingRecord - 暂存记录
// ==========================================
// 唯一具备批次外生命周期的实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingRecord {
    pub staging_id: String,
    pub raw: ParsedRow, // 不可变快照
    pub edited: EditedFields,
    pub match_status: MatchStatus,
    pub matched_customer: Option<Customer>,
    pub confidence: MatchConfidence,
    pub similar_candidates: Vec<Customer>, // 仅 SIMILAR 使用
    pub conflict: Option<ConflictInfo>,
    pub duplicate_group_id: Option<String>,
    pub is_selected: bool,
    pub is_resolved: bool,
}

impl StagingRecord {
    /// 提交资格判定
    pub fn is_commit_eligible(&self) -> bool {
        if !(self.is_selected && self.is_resolved) {
            return false;
        }
        match self.match_status {
            MatchStatus::Verified => self.matched_customer.is_some(),
            MatchStatus::Conflict => self
                .conflict
                .as_ref()
                .map(|c| c.resolution != ConflictResolution::Pending)
                .unwrap_or(false),
            _ => false,
        }
    }

    pub fn row_index(&self) -> usize {
        self.raw.row_index
    }
}

// ==========================================
// ShipmentRecord - 待落库货物记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub shipment_id: String,
    pub staging_id: String,
    pub row_index: usize,
    pub voyage_id: Option<String>,
    pub customer_id: String,
    pub customer_name: String,
    pub phone: Option<String>,
    pub region: Option<String>,
    pub address: Option<String>,
    pub qty: u32,
    pub weight: Option<f64>,
    pub courier: Option<String>,
    pub nationality: Option<String>,
    pub classification: Option<String>,
    pub feature: Option<String>,
    pub invoice: Option<String>,
    pub cargo_category: Option<String>,
    pub cargo_desc: Option<String>,
    pub arrival_date: Option<String>,
    pub pod_code: Option<i32>,
    pub discount_percent: Option<f64>,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// CommitOutcome - 提交结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRowError {
    pub staging_id: String,
    pub row_index: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub saved_count: usize,
    pub errors: Vec<CommitRowError>,
    pub batch_count: usize,
    pub committed_staging_ids: Vec<String>,
    pub master_updates: usize,
    pub master_update_failures: Vec<String>, // 客户 ID
}
