// ==========================================
// 货运集拼导入核心 - 导入组件 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口(不包含实现)
// 流程: 清洗 → 列角色推断 → 电话提取 → 行构造 → 重复分组
// ==========================================

use crate::domain::manifest::{ColumnMap, DuplicateGroup, ParsedRow};

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 单元格清洗(纯函数,无副作用)
// 实现者: data_cleaner::DataCleaner
pub trait DataCleaner: Send + Sync {
    /// 清洗单元格文本
    ///
    /// # 规则
    /// - 去除 `<...>` 标签与常见 HTML 实体
    /// - 去除零宽/不可见字符
    /// - TRIM
    /// - 表格公式错误值(`#N/A`, `#REF!` 等)返回空串
    fn clean(&self, value: &str) -> String;

    /// 日期标准化(尽力而为,永不失败)
    ///
    /// # 规则
    /// - 5 位整数: 表格日期序列号(纪元 1899-12-30)
    /// - YYYY[.-/]MM[.-/]DD: 统一分隔符并补零
    /// - YYYYMMDD: 补分隔符
    /// - 其他: 返回清洗后的原文
    fn parse_date(&self, value: &str) -> String;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 表头识别与列角色推断
// 实现者: field_mapper::FieldMapper
pub trait FieldMapper: Send + Sync {
    /// 尝试把首行识别为表头
    ///
    /// # 返回
    /// - Some(ColumnMap): 首行为表头
    /// - None: 首行为数据行
    fn detect_header(&self, cells: &[String]) -> Option<ColumnMap>;

    /// 无表头时逐格推断一行
    ///
    /// # 返回
    /// - Some(ParsedRow): 成功识别姓名
    /// - None: 无可用姓名
    fn classify_cells(&self, cells: &[String], row_index: usize) -> Option<ParsedRow>;
}

// ==========================================
// DuplicateDetector Trait
// ==========================================
// 用途: 同批次按电话分组
// 实现者: duplicate_detector::DuplicateDetector
pub trait DuplicateDetector: Send + Sync {
    /// 检测同批次内共享电话的行
    ///
    /// # 返回
    /// - Vec<DuplicateGroup>: 每组 ≥2 行,按首行出现顺序
    fn detect_duplicate_groups(&self, rows: &[ParsedRow]) -> Vec<DuplicateGroup>;
}
