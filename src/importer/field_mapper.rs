// ==========================================
// 货运集拼导入核心 - 列角色推断器实现
// ==========================================
// 职责: 表头模糊识别 → 列角色绑定; 无表头时逐格推断
// 说明: 关键词同时覆盖韩文与英文表头写法
// ==========================================

use crate::domain::manifest::{ColumnMap, ParsedRow};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::importer_trait::{DataCleaner as _, FieldMapper as FieldMapperTrait};
use crate::importer::phone_extractor::extract_phone;
use once_cell::sync::Lazy;
use regex::Regex;

// ==========================================
// 列角色与关键词族
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnRole {
    Phone,
    Invoice,
    ArrivalDate,
    Courier,
    Nationality,
    CargoCategory,
    Classification,
    CargoDesc,
    Remark,
    Feature,
    Weight,
    Qty,
    Address,
    Region,
    Name,
}

// 顺序即优先级: 组合表头(如"고객연락처")先归入更具体的族
const KEYWORD_FAMILIES: &[(ColumnRole, &[&str])] = &[
    (
        ColumnRole::Phone,
        &["연락처", "전화", "휴대폰", "핸드폰", "phone", "tel", "contact", "mobile"],
    ),
    (ColumnRole::Invoice, &["송장", "운송장", "invoice", "tracking", "awb"]),
    (
        ColumnRole::ArrivalDate,
        &["도착일", "입고일", "도착", "입고", "날짜", "일자", "arrival", "date"],
    ),
    (ColumnRole::Courier, &["택배사", "택배", "배송사", "courier", "carrier"]),
    (ColumnRole::Nationality, &["국적", "nationality", "country"]),
    (ColumnRole::CargoCategory, &["품목", "카테고리", "category", "cargotype"]),
    (
        ColumnRole::Classification,
        &["분류", "구분", "classification", "class", "type"],
    ),
    (
        ColumnRole::CargoDesc,
        &["내용물", "내용", "품명", "description", "desc", "contents", "item"],
    ),
    (ColumnRole::Remark, &["비고", "메모", "remark", "memo", "note"]),
    (
        ColumnRole::Feature,
        &["특징", "특이사항", "마킹", "feature", "marking", "mark"],
    ),
    (ColumnRole::Weight, &["무게", "중량", "weight", "kg"]),
    (
        ColumnRole::Qty,
        &["수량", "개수", "박스", "qty", "quantity", "box", "ctn", "pcs"],
    ),
    (ColumnRole::Address, &["주소", "address", "addr"]),
    (
        ColumnRole::Region,
        &["동네", "지역", "도시", "region", "area", "zone", "city"],
    ),
    (
        ColumnRole::Name,
        &[
            "이름", "성명", "고객명", "수취인", "받는분", "고객", "name", "customer", "consignee",
            "receiver",
        ],
    ),
];

/// 已知快递公司(包含匹配)
const KNOWN_COURIERS: &[&str] = &[
    "cj", "대한통운", "한진", "롯데", "우체국", "로젠", "경동", "대신", "쿠팡", "dhl", "fedex",
    "ups", "ems", "kerry", "flash", "j&t",
];

static INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,4}$").expect("数量正则非法"));

static QTY_WITH_UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,4})\s*(박스|상자|개|ea|box|boxes|ctn|ctns|pcs)?$").expect("数量正则非法")
});

static WEIGHT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,6}(?:[.,]\d+)?)\s*(kg|킬로)?$").expect("重量正则非法")
});

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("日期正则非法"));

pub struct FieldMapper {
    cleaner: DataCleaner,
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMapper {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }
}

impl FieldMapperTrait for FieldMapper {
    fn detect_header(&self, cells: &[String]) -> Option<ColumnMap> {
        let mut map = ColumnMap::default();
        let mut matched_cells = 0;
        let mut name_matched = false;

        for (idx, cell) in cells.iter().enumerate() {
            let normalized = normalize_header(cell);
            if normalized.is_empty() {
                continue;
            }

            let mut hit = false;
            for (role, keywords) in KEYWORD_FAMILIES {
                if !keywords.iter().any(|kw| header_matches(&normalized, kw)) {
                    continue;
                }
                hit = true;
                if *role == ColumnRole::Name {
                    name_matched = true;
                }
                if bind_role(&mut map, *role, idx) {
                    break;
                }
            }
            if hit {
                matched_cells += 1;
            }
        }

        // 单个命中(如数据行中的 "CJ택배")不足以判定为表头
        if name_matched || matched_cells >= 2 {
            tracing::debug!(matched_cells, name_matched, "识别到表头行");
            Some(map)
        } else {
            None
        }
    }

    fn classify_cells(&self, cells: &[String], row_index: usize) -> Option<ParsedRow> {
        let mut name: Option<String> = None;
        let mut row = ParsedRow::new(row_index, "");
        let mut qty_set = false;
        let mut leftovers: Vec<String> = Vec::new();

        for raw in cells {
            let cell = self.cleaner.clean(raw);
            if cell.is_empty() {
                continue;
            }

            if row.phone.is_none() && looks_like_phone_cell(&cell) {
                row.phone = Some(cell);
                continue;
            }

            if row.arrival_date.is_none() && !INTEGER_RE.is_match(&cell) {
                let date = self.cleaner.parse_date(&cell);
                if ISO_DATE_RE.is_match(&date) {
                    row.arrival_date = Some(date);
                    continue;
                }
            }

            if !qty_set {
                if let Some(qty) = parse_quantity(&cell) {
                    row.qty = qty;
                    qty_set = true;
                    continue;
                }
            }

            if row.weight.is_none() && (cell.contains('.') || cell.to_lowercase().ends_with("kg")) {
                if let Some(weight) = parse_weight(&cell) {
                    row.weight = Some(weight);
                    continue;
                }
            }

            if row.courier.is_none() && is_known_courier(&cell) {
                row.courier = Some(cell);
                continue;
            }

            if name.is_none() && !is_numeric_like(&cell) && looks_like_person_name(&cell) {
                name = Some(cell);
                continue;
            }

            leftovers.push(cell);
        }

        let name = name?;
        row.raw_name = name;
        if !leftovers.is_empty() {
            row.feature = Some(leftovers.join(" "));
        }
        Some(row)
    }
}

// ==========================================
// 表头匹配
// ==========================================

/// 表头标准化: 小写 + 仅保留字母数字(含韩文)
pub fn normalize_header(cell: &str) -> String {
    cell.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

fn header_matches(normalized: &str, keyword: &str) -> bool {
    if normalized == keyword {
        return true;
    }
    if keyword.chars().count() >= 2 && normalized.contains(keyword) {
        return true;
    }
    normalized.chars().count() >= 3 && keyword.contains(normalized)
}

/// 绑定列角色(每族取首个命中列); 返回是否绑定成功
fn bind_role(map: &mut ColumnMap, role: ColumnRole, idx: usize) -> bool {
    let slot = match role {
        ColumnRole::Phone => &mut map.phone,
        ColumnRole::Invoice => &mut map.invoice,
        ColumnRole::ArrivalDate => &mut map.arrival_date,
        ColumnRole::Courier => &mut map.courier,
        ColumnRole::Nationality => &mut map.nationality,
        ColumnRole::CargoCategory => &mut map.cargo_category,
        ColumnRole::Classification => &mut map.classification,
        ColumnRole::CargoDesc => &mut map.cargo_desc,
        ColumnRole::Remark => &mut map.remark,
        ColumnRole::Feature => &mut map.feature,
        ColumnRole::Weight => &mut map.weight,
        ColumnRole::Qty => &mut map.qty,
        ColumnRole::Address => &mut map.address,
        ColumnRole::Region => &mut map.region,
        ColumnRole::Name => &mut map.name,
    };
    if slot.is_none() {
        *slot = Some(idx);
        true
    } else {
        false
    }
}

// ==========================================
// 单元格判定/解析
// ==========================================

/// 解析数量("3", "3박스", "3 box")
pub fn parse_quantity(value: &str) -> Option<u32> {
    let caps = QTY_WITH_UNIT_RE.captures(value.trim())?;
    caps[1].parse::<u32>().ok().filter(|q| *q > 0)
}

/// 解析重量("12.5", "12,5kg", "8 kg")
pub fn parse_weight(value: &str) -> Option<f64> {
    let caps = WEIGHT_RE.captures(value.trim())?;
    caps[1].replace(',', ".").parse::<f64>().ok()
}

pub fn is_known_courier(value: &str) -> bool {
    let lower = value.to_lowercase();
    KNOWN_COURIERS.iter().any(|c| lower.contains(c))
}

fn is_numeric_like(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+' | ' ' | '/'))
}

fn looks_like_phone_cell(value: &str) -> bool {
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    digits >= 8
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | '.' | ' ' | '+' | '(' | ')'))
        && extract_phone(value).is_some()
}

fn is_hangul(c: char) -> bool {
    matches!(c, '\u{AC00}'..='\u{D7A3}' | '\u{3131}'..='\u{318E}')
}

/// "像人名"判定: 文字脚本 + 长度
pub fn looks_like_person_name(value: &str) -> bool {
    let len = value.chars().count();
    if !(2..=30).contains(&len) || value.contains('@') {
        return false;
    }
    let has_script = value
        .chars()
        .any(|c| is_hangul(c) || c.is_ascii_alphabetic() || c.is_alphabetic());
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    has_script && digits * 2 < len && !is_known_courier(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(line: &str) -> Vec<String> {
        line.split('\t').map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect_header_korean_english_mix() {
        let mapper = FieldMapper::new();
        let map = mapper.detect_header(&cells("이름\tContact\t동네")).unwrap();
        assert_eq!(map.name, Some(0));
        assert_eq!(map.phone, Some(1));
        assert_eq!(map.region, Some(2));
    }

    #[test]
    fn test_detect_header_full_manifest() {
        let mapper = FieldMapper::new();
        let header = cells("No\t수취인\t연락처\t수량\t무게(kg)\t택배사\t국적\t구분\t특징\t송장번호\t품목\t내용물\t도착일\t비고");
        let map = mapper.detect_header(&header).unwrap();
        assert_eq!(map.name, Some(1));
        assert_eq!(map.phone, Some(2));
        assert_eq!(map.qty, Some(3));
        assert_eq!(map.weight, Some(4));
        assert_eq!(map.courier, Some(5));
        assert_eq!(map.nationality, Some(6));
        assert_eq!(map.classification, Some(7));
        assert_eq!(map.feature, Some(8));
        assert_eq!(map.invoice, Some(9));
        assert_eq!(map.cargo_category, Some(10));
        assert_eq!(map.cargo_desc, Some(11));
        assert_eq!(map.arrival_date, Some(12));
        assert_eq!(map.remark, Some(13));
    }

    #[test]
    fn test_data_row_is_not_header() {
        let mapper = FieldMapper::new();
        assert!(mapper
            .detect_header(&cells("고관영\t070 985 209\tBKK"))
            .is_none());
        // 单个快递名不应触发表头
        assert!(mapper
            .detect_header(&cells("홍길동\tCJ택배\t3"))
            .is_none());
    }

    #[test]
    fn test_remark_not_taken_as_feature() {
        let mapper = FieldMapper::new();
        let map = mapper.detect_header(&cells("name\tremark\tmarking")).unwrap();
        assert_eq!(map.remark, Some(1));
        assert_eq!(map.feature, Some(2));
    }

    #[test]
    fn test_classify_cells_heuristic() {
        let mapper = FieldMapper::new();
        let row = mapper
            .classify_cells(&cells("3\t홍길동\t010-1234-5678\t12.5\tCJ대한통운\t2024.1.5"), 2)
            .unwrap();
        assert_eq!(row.raw_name, "홍길동");
        assert_eq!(row.qty, 3);
        assert_eq!(row.phone.as_deref(), Some("010-1234-5678"));
        assert_eq!(row.weight, Some(12.5));
        assert_eq!(row.courier.as_deref(), Some("CJ대한통운"));
        assert_eq!(row.arrival_date.as_deref(), Some("2024-01-05"));
        assert_eq!(row.row_index, 2);
    }

    #[test]
    fn test_classify_cells_without_name() {
        let mapper = FieldMapper::new();
        assert!(mapper.classify_cells(&cells("3\t12.5\t한진"), 4).is_none());
    }

    #[test]
    fn test_parse_quantity_and_weight() {
        assert_eq!(parse_quantity("3"), Some(3));
        assert_eq!(parse_quantity("3박스"), Some(3));
        assert_eq!(parse_quantity("2 BOX"), Some(2));
        assert_eq!(parse_quantity("0"), None);
        assert_eq!(parse_quantity("abc"), None);
        assert_eq!(parse_weight("12,5kg"), Some(12.5));
        assert_eq!(parse_weight("8 kg"), Some(8.0));
        assert_eq!(parse_weight("무거움"), None);
    }

    #[test]
    fn test_looks_like_person_name() {
        assert!(looks_like_person_name("고관영"));
        assert!(looks_like_person_name("John Smith"));
        assert!(!looks_like_person_name("김"));
        assert!(!looks_like_person_name("a@b.com"));
        assert!(!looks_like_person_name("한진택배"));
    }
}
