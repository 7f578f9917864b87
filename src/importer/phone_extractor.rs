// ==========================================
// 货运集拼导入核心 - 电话号码提取
// ==========================================
// 职责: 从自由文本字段中按正则级联提取电话
// 顺序: 手机 → 座机 → 网络电话/国际前缀 → 10~11 位通用兜底
// 来源优先级: 唛头 → 备注 → 货物描述 → 整行拼接
// ==========================================

use once_cell::sync::Lazy;
use regex::Regex;

/// 号码两侧不得紧邻数字
fn bounded(pattern: &str) -> Regex {
    Regex::new(&format!(r"(?:^|[^\d+])({})(?:$|[^\d])", pattern)).expect("电话正则非法")
}

static PHONE_CASCADE: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        ("mobile", bounded(r"01[016789][-.\s]?\d{3,4}[-.\s]?\d{4}")),
        (
            "landline",
            bounded(r"0(?:2|[3-6][1-5])[-.\s)]?\d{3,4}[-.\s]?\d{4}"),
        ),
        (
            "voip",
            bounded(r"(?:070|080|050\d?)[-.\s]?\d{3,4}[-.\s]?\d{3,4}"),
        ),
        (
            "international",
            bounded(r"\+\d{1,3}[-.\s]?\d{1,4}[-.\s]?\d{3,4}[-.\s]?\d{3,4}"),
        ),
        ("generic", bounded(r"(?:\d[-.\s]?){9,10}\d")),
    ]
});

/// 从单段文本提取第一个电话(最具体的模式优先)
pub fn extract_phone(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }

    for (kind, re) in PHONE_CASCADE.iter() {
        if let Some(caps) = re.captures(text) {
            if let Some(m) = caps.get(1) {
                tracing::trace!(kind = *kind, phone = m.as_str(), "电话模式命中");
                return Some(m.as_str().trim().to_string());
            }
        }
    }
    None
}

/// 按来源优先级依次尝试,首个命中即停止
pub fn extract_from_sources(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .flatten()
        .find_map(|text| extract_phone(text))
}
