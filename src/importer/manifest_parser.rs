// ==========================================
// 货运集拼导入核心 - 舱单解析器
// ==========================================
// 流程: 去 \r → 丢弃幽灵行 → 分隔符判定 → 表头识别
//       → 按列映射 / 逐格推断 → 电话级联提取 → 行构造
// 失败策略: 尽力而为,永不整体失败; 所有偏差写入 warnings
// 行号: 原文中的 1 起行号(含表头行)
// ==========================================

use crate::config::ReconcileConfig;
use crate::domain::manifest::{ColumnMap, ParseOutcome, ParsedRow};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::ImportError;
use crate::importer::field_mapper::{parse_quantity, parse_weight, FieldMapper};
use crate::importer::importer_trait::{
    DataCleaner as _, FieldMapper as FieldMapperTrait,
};
use crate::importer::phone_extractor::extract_from_sources;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

static MULTI_SPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2,}").expect("分隔符正则非法"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Tab,
    MultiSpace,
}

// ==========================================
// ManifestParser - 舱单解析器
// ==========================================
pub struct ManifestParser {
    cleaner: DataCleaner,
    field_mapper: Box<dyn FieldMapperTrait>,
    chunk_size: usize,
}

impl ManifestParser {
    pub fn new(config: &ReconcileConfig) -> Self {
        Self::with_field_mapper(Box::new(FieldMapper::new()), config.parse_chunk_size)
    }

    /// 指定列角色推断器(测试/定制表头词典)
    pub fn with_field_mapper(field_mapper: Box<dyn FieldMapperTrait>, chunk_size: usize) -> Self {
        Self {
            cleaner: DataCleaner,
            field_mapper,
            chunk_size: chunk_size.max(1),
        }
    }

    /// 解析粘贴文本
    ///
    /// # 返回
    /// - ParseOutcome: 行 / 是否有表头 / 警告 / 列映射
    ///
    /// 每处理 chunk_size 行让出一次执行权,不影响行顺序与结果
    #[instrument(skip(self, raw), fields(bytes = raw.len()))]
    pub async fn parse(&self, raw: &str) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        let text = raw.replace('\r', "");

        // (原始行号, 行文本)
        let lines: Vec<(usize, &str)> = text
            .split('\n')
            .enumerate()
            .filter(|(_, line)| !self.cleaner.is_ghost_line(line))
            .map(|(idx, line)| (idx + 1, line))
            .collect();

        if lines.is_empty() {
            outcome.warnings.push(ImportError::EmptyInput.to_string());
            return outcome;
        }

        let delimiter = if text.contains('\t') {
            Delimiter::Tab
        } else {
            Delimiter::MultiSpace
        };
        debug!(?delimiter, line_count = lines.len(), "分隔符判定完成");

        let first_cells = split_cells(lines[0].1, delimiter);
        let header = self.field_mapper.detect_header(&first_cells);

        let data_lines = match header {
            Some(_) => &lines[1..],
            None => &lines[..],
        };
        outcome.has_header = header.is_some();

        // 表头存在但缺姓名列 → 退回逐格推断
        let column_map = match header {
            Some(map) if map.name.is_none() => {
                warn!("表头缺少姓名列");
                outcome.warnings.push(ImportError::NameColumnMissing.to_string());
                outcome.column_map = Some(map);
                None
            }
            Some(map) => {
                outcome.column_map = Some(map.clone());
                Some(map)
            }
            None => None,
        };

        for (processed, (line_no, line)) in data_lines.iter().enumerate() {
            if processed > 0 && processed % self.chunk_size == 0 {
                tokio::task::yield_now().await;
            }

            let cells = split_cells(line, delimiter);
            let row = match &column_map {
                Some(map) => self.row_from_columns(&cells, map, *line_no, &mut outcome.warnings),
                None => self.row_from_heuristics(&cells, *line_no),
            };

            match row {
                Some(row) => outcome.rows.push(row),
                None => {
                    let err = ImportError::NameUnresolved { row: *line_no };
                    debug!(row = *line_no, "姓名无法识别");
                    outcome.warnings.push(err.to_string());
                }
            }
        }

        info!(
            rows = outcome.rows.len(),
            has_header = outcome.has_header,
            warnings = outcome.warnings.len(),
            "舱单解析完成"
        );
        outcome
    }

    /// 表头模式: 按列下标取值
    fn row_from_columns(
        &self,
        cells: &[String],
        map: &ColumnMap,
        row_index: usize,
        warnings: &mut Vec<String>,
    ) -> Option<ParsedRow> {
        let cell = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| cells.get(i))
                .and_then(|v| self.cleaner.clean_optional(Some(v)))
        };

        let name = cell(map.name)?;
        let mut row = ParsedRow::new(row_index, name);

        row.region = cell(map.region);
        row.address = cell(map.address);
        row.courier = cell(map.courier);
        row.nationality = cell(map.nationality);
        row.classification = cell(map.classification);
        row.feature = cell(map.feature);
        row.remark = cell(map.remark);
        row.invoice = cell(map.invoice);
        row.cargo_category = cell(map.cargo_category);
        row.cargo_desc = cell(map.cargo_desc);
        row.arrival_date = cell(map.arrival_date)
            .map(|d| self.cleaner.parse_date(&d))
            .filter(|d| !d.is_empty());

        if let Some(value) = cell(map.qty) {
            match parse_quantity(&value) {
                Some(qty) => row.qty = qty,
                None => warnings.push(
                    ImportError::QuantityUnparsed {
                        row: row_index,
                        value,
                    }
                    .to_string(),
                ),
            }
        }

        if let Some(value) = cell(map.weight) {
            match parse_weight(&value) {
                Some(weight) => row.weight = Some(weight),
                None => warnings.push(
                    ImportError::WeightUnparsed {
                        row: row_index,
                        value,
                    }
                    .to_string(),
                ),
            }
        }

        row.phone = cell(map.phone).or_else(|| self.phone_from_free_text(&row, cells));
        Some(row)
    }

    /// 无表头模式: 逐格推断
    fn row_from_heuristics(&self, cells: &[String], row_index: usize) -> Option<ParsedRow> {
        let mut row = self.field_mapper.classify_cells(cells, row_index)?;
        if row.phone.is_none() {
            row.phone = self.phone_from_free_text(&row, cells);
        }
        Some(row)
    }

    /// 电话级联: 唛头 → 备注 → 货物描述 → 整行
    fn phone_from_free_text(&self, row: &ParsedRow, cells: &[String]) -> Option<String> {
        let whole_line = cells
            .iter()
            .map(|c| self.cleaner.clean(c))
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        extract_from_sources(&[
            row.feature.as_deref(),
            row.remark.as_deref(),
            row.cargo_desc.as_deref(),
            Some(whole_line.as_str()),
        ])
    }
}

fn split_cells(line: &str, delimiter: Delimiter) -> Vec<String> {
    match delimiter {
        Delimiter::Tab => line.split('\t').map(|c| c.to_string()).collect(),
        Delimiter::MultiSpace => MULTI_SPACE_RE
            .split(line.trim())
            .map(|c| c.to_string())
            .collect(),
    }
}
