// ==========================================
// 货运集拼导入核心 - 客户领域模型
// ==========================================
// 用途: 客户主数据(外部维护),对账时只读
// 写入口: 仅限"登记新客户"与"冲突覆写主数据"两条窄通道
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Customer - 客户主数据
// ==========================================
// 唯一键: 标准化后的显示名
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,                       // 客户 ID
    pub name: String,                     // 显示名
    pub phone: Option<String>,            // 联系电话(原样保存)
    pub region: Option<String>,           // 地区
    pub address_detail: Option<String>,   // 详细地址
    pub pod_code: Option<i32>,            // 卸货港路由码
    pub discount_info: Option<String>,    // 折扣说明
    pub discount_percent: Option<f64>,    // 折扣比例(%)
}

impl Customer {
    /// 以最少字段构造客户(测试与登记新客户共用)
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone: None,
            region: None,
            address_detail: None,
            pod_code: None,
            discount_info: None,
            discount_percent: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address_detail = Some(address.into());
        self
    }

    /// 应用字段补丁(仅覆写 Some 字段)
    pub fn apply_patch(&mut self, patch: &CustomerPatch) {
        if let Some(phone) = &patch.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(region) = &patch.region {
            self.region = Some(region.clone());
        }
        if let Some(address) = &patch.address_detail {
            self.address_detail = Some(address.clone());
        }
    }
}

// ==========================================
// CustomerPatch - 主数据部分字段更新
// ==========================================
// 用途: 冲突以 UPDATE_MASTER 处理时的覆写内容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerPatch {
    pub phone: Option<String>,
    pub region: Option<String>,
    pub address_detail: Option<String>,
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.region.is_none() && self.address_detail.is_none()
    }
}

// ==========================================
// NewCustomerDraft - 登记新客户草稿
// ==========================================
// 字段缺省时取自暂存记录的编辑值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCustomerDraft {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub region: Option<String>,
    pub address_detail: Option<String>,
    pub pod_code: Option<i32>,
    pub discount_info: Option<String>,
    pub discount_percent: Option<f64>,
}
