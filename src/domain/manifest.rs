// ==========================================
// 货运集拼导入核心 - 舱单领域模型
// ==========================================
// 用途: 粘贴文本 → 结构化行 的中间产物
// 生命周期: ParsedRow 解析后不可变("原样粘贴"快照)
// ==========================================

use crate::domain::customer::Customer;
use crate::domain::staging::MatchConfidence;
use serde::{Deserialize, Serialize};

// ==========================================
// ParsedRow - 舱单单行
// ==========================================
// row_index: 原始行号(1 起,含表头行),批次内稳定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRow {
    pub row_index: usize,
    pub raw_name: String,
    pub phone: Option<String>,
    pub region: Option<String>,
    pub address: Option<String>,
    pub qty: u32, // 缺省 1
    pub weight: Option<f64>,
    pub courier: Option<String>,
    pub nationality: Option<String>,
    pub classification: Option<String>,
    pub feature: Option<String>, // 唛头/特征,电话号码主要来源
    pub remark: Option<String>,
    pub invoice: Option<String>,
    pub cargo_category: Option<String>,
    pub cargo_desc: Option<String>,
    pub arrival_date: Option<String>, // YYYY-MM-DD(尽力而为)
}

impl ParsedRow {
    /// 以姓名构造空行(其余字段缺省)
    pub fn new(row_index: usize, raw_name: impl Into<String>) -> Self {
        Self {
            row_index,
            raw_name: raw_name.into(),
            phone: None,
            region: None,
            address: None,
            qty: 1,
            weight: None,
            courier: None,
            nationality: None,
            classification: None,
            feature: None,
            remark: None,
            invoice: None,
            cargo_category: None,
            cargo_desc: None,
            arrival_date: None,
        }
    }
}

// ==========================================
// ColumnMap - 列角色推断结果
// ==========================================
// 每个角色绑定到具体列下标(命名绑定,非动态属性访问)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub name: Option<usize>,
    pub phone: Option<usize>,
    pub region: Option<usize>,
    pub address: Option<usize>,
    pub qty: Option<usize>,
    pub weight: Option<usize>,
    pub courier: Option<usize>,
    pub nationality: Option<usize>,
    pub classification: Option<usize>,
    pub feature: Option<usize>,
    pub remark: Option<usize>,
    pub invoice: Option<usize>,
    pub cargo_category: Option<usize>,
    pub cargo_desc: Option<usize>,
    pub arrival_date: Option<usize>,
}

impl ColumnMap {
    /// 已绑定的列数
    pub fn bound_count(&self) -> usize {
        [
            self.name,
            self.phone,
            self.region,
            self.address,
            self.qty,
            self.weight,
            self.courier,
            self.nationality,
            self.classification,
            self.feature,
            self.remark,
            self.invoice,
            self.cargo_category,
            self.cargo_desc,
            self.arrival_date,
        ]
        .iter()
        .filter(|c| c.is_some())
        .count()
    }
}

// ==========================================
// ParseOutcome - 解析结果
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub rows: Vec<ParsedRow>,
    pub has_header: bool,
    pub warnings: Vec<String>,
    pub column_map: Option<ColumnMap>, // 仅表头模式下存在
}

// ==========================================
// DuplicateGroup - 同批次重复组
// ==========================================
// 分组依据: 标准化电话(≥8 位)
// 生命周期: 每批次解析时生成一次,批次丢弃时销毁
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub group_id: String,
    pub phone: String, // 标准化后的共享电话
    pub primary_row_index: usize,
    pub member_row_indices: Vec<usize>, // 含 primary,≥2
    pub merged_quantity: u32,
    pub matched_customer: Option<Customer>,
    pub confidence: Option<MatchConfidence>,
}
