// ==========================================
// 货运集拼导入核心 - 单元格清洗器实现
// ==========================================
// 职责: 去标签 / 去不可见字符 / TRIM / 公式错误值置空 / 日期标准化
// 约束: 纯函数,永不失败
// ==========================================

use crate::importer::importer_trait::DataCleaner as DataCleanerTrait;
use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("标签正则非法"));

static FORMULA_ERROR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^#(N/A|REF!|VALUE!|DIV/0!|NAME\?|NUM!|NULL!|SPILL!|CALC!|ERROR!?)$")
        .expect("公式错误正则非法")
});

static SEPARATED_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})\s*[./\-]\s*(\d{1,2})\s*[./\-]\s*(\d{1,2})\.?$").expect("日期正则非法")
});

static COMPACT_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("日期正则非法"));

/// 表格日期序列号纪元
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn clean(&self, value: &str) -> String {
        let without_tags = TAG_RE.replace_all(value, "");
        let decoded = decode_entities(&without_tags);

        let visible: String = decoded
            .chars()
            .filter(|c| !is_invisible(*c))
            .map(|c| if is_wide_space(c) { ' ' } else { c })
            .collect();

        let trimmed = visible.trim();
        if FORMULA_ERROR_RE.is_match(trimmed) {
            return String::new();
        }
        trimmed.to_string()
    }

    fn parse_date(&self, value: &str) -> String {
        let cleaned = self.clean(value);

        // 表格日期序列号
        if cleaned.len() == 5 && cleaned.chars().all(|c| c.is_ascii_digit()) {
            if let Some(date) = serial_to_date(&cleaned) {
                return date.format("%Y-%m-%d").to_string();
            }
            return cleaned;
        }

        let caps = SEPARATED_DATE_RE
            .captures(&cleaned)
            .or_else(|| COMPACT_DATE_RE.captures(&cleaned));

        if let Some(caps) = caps {
            let year = caps[1].parse::<i32>().ok();
            let month = caps[2].parse::<u32>().ok();
            let day = caps[3].parse::<u32>().ok();
            if let (Some(y), Some(m), Some(d)) = (year, month, day) {
                if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                    return date.format("%Y-%m-%d").to_string();
                }
            }
        }

        cleaned
    }
}

impl DataCleaner {
    /// 清洗并标准化空值(空串 → None)
    pub fn clean_optional(&self, value: Option<&str>) -> Option<String> {
        value
            .map(|v| self.clean(v))
            .filter(|v| !v.is_empty())
    }

    /// 判断一行是否为"幽灵行"(仅含分隔符/空白)
    pub fn is_ghost_line(&self, line: &str) -> bool {
        line.chars()
            .all(|c| c.is_whitespace() || matches!(c, ',' | ';' | '|') || is_invisible(c))
    }
}

fn serial_to_date(serial: &str) -> Option<NaiveDate> {
    let days = serial.parse::<u64>().ok()?;
    let (y, m, d) = SERIAL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(days))
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FEFF}'
            | '\u{00AD}'
    )
}

fn is_wide_space(c: char) -> bool {
    matches!(c, '\u{00A0}' | '\u{3000}')
}
