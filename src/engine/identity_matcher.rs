// ==========================================
// 货运集拼导入核心 - 客户身份匹配引擎
// ==========================================
// 职责: 姓名/电话/地区多因子打分,输出最佳客户与置信度
// 复杂度: O(行数 × 客户数),客户规模为千级,同步扫描即可
// ==========================================
// 计分规则(取各因子最大值):
// - 电话互含(双方 ≥8 位)        → 0.95
// - 标准化姓名完全一致           → 1.0
// - 姓名相似度 ≥ 0.7             → 相似度 × 0.9
// - 地区一致 且 姓名相似度 ≥ 0.5 → (相似度 + 0.1) × 0.9
// 状态: ≥0.95 VERIFIED / ≥0.70 SIMILAR / 其余 NEW_CUSTOMER
// ==========================================

use crate::config::ReconcileConfig;
use crate::domain::customer::Customer;
use crate::domain::staging::{FieldDiff, MatchConfidence};
use crate::domain::types::{ConflictField, MatchFactor, MatchStatus};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const PHONE_MATCH_SCORE: f64 = 0.95;
const EXACT_NAME_SCORE: f64 = 1.0;
const FUZZY_NAME_WEIGHT: f64 = 0.9;
const REGION_BOOST: f64 = 0.1;

static PARENTHETICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(（\[][^\)）\]]*[\)）\]]").expect("括号正则非法"));

// ==========================================
// 标准化
// ==========================================

/// 姓名标准化: 去括号后缀 → 小写 → 去空白/连字符/下划线/句点
pub fn normalize_name(name: &str) -> String {
    let without_suffix = PARENTHETICAL_RE.replace_all(name, "");
    without_suffix
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '_' | '.'))
        .collect()
}

/// 电话标准化: 仅保留数字(幂等)
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// 地区标准化: 小写 + 去空白
pub fn normalize_region(region: &str) -> String {
    region
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// 电话互含判定(双方标准化后均 ≥ min_digits 位)
pub fn phones_match(a: &str, b: &str, min_digits: usize) -> bool {
    let a = normalize_phone(a);
    let b = normalize_phone(b);
    if a.len() < min_digits || b.len() < min_digits {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// 地区一致判定(相等或互含)
pub fn regions_match(a: &str, b: &str) -> bool {
    let a = normalize_region(a);
    let b = normalize_region(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a)
}

/// 姓名相似度: (max_len − 编辑距离) / max_len,基于标准化姓名
///
/// 相同字符串为 1,空串对非空串为 0,结果对称
pub fn calculate_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);
    similarity_normalized(&a, &b)
}

fn similarity_normalized(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let distance = strsim::levenshtein(a, b);
    (max_len.saturating_sub(distance)) as f64 / max_len as f64
}

// ==========================================
// MatchResult - 匹配结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub matched_customer: Option<Customer>,
    pub confidence: MatchConfidence,
    pub status: MatchStatus,
}

/// 姓名命中方式(对账器冲突路径使用)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameHit {
    Exact,
    Partial,
}

// ==========================================
// IdentityMatcher
// ==========================================
pub struct IdentityMatcher {
    config: ReconcileConfig,
}

impl IdentityMatcher {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// 对单个客户打分
    pub fn score_customer(
        &self,
        name: &str,
        phone: Option<&str>,
        region: Option<&str>,
        customer: &Customer,
    ) -> MatchConfidence {
        let input_name = normalize_name(name);
        let master_name = normalize_name(&customer.name);
        let name_similarity = similarity_normalized(&input_name, &master_name);

        let mut score: f64 = 0.0;
        let mut factors = Vec::new();

        let phone_hit = match (phone, customer.phone.as_deref()) {
            (Some(p), Some(c)) => phones_match(p, c, self.config.min_phone_digits),
            _ => false,
        };
        if phone_hit {
            score = score.max(PHONE_MATCH_SCORE);
            factors.push(MatchFactor::PhoneMatch);
        }

        if !input_name.is_empty() && input_name == master_name {
            score = score.max(EXACT_NAME_SCORE);
            factors.push(MatchFactor::ExactName);
        } else if name_similarity >= self.config.fuzzy_name_threshold {
            score = score.max(name_similarity * FUZZY_NAME_WEIGHT);
            factors.push(MatchFactor::FuzzyName);
        }

        let region_hit = match (region, customer.region.as_deref()) {
            (Some(r), Some(c)) => regions_match(r, c),
            _ => false,
        };
        if region_hit {
            factors.push(MatchFactor::RegionMatch);
            if name_similarity >= self.config.region_name_threshold {
                score = score.max((name_similarity + REGION_BOOST) * FUZZY_NAME_WEIGHT);
            }
        }

        MatchConfidence {
            score: score.min(1.0),
            factors,
            name_score: name_similarity,
            phone_score: if phone_hit { 1.0 } else { 0.0 },
            region_score: if region_hit { 1.0 } else { 0.0 },
        }
    }

    /// 全量扫描客户列表,返回最佳匹配(同分保留先出现者)
    pub fn match_customer(
        &self,
        name: &str,
        phone: Option<&str>,
        region: Option<&str>,
        customers: &[Customer],
    ) -> MatchResult {
        let mut best: Option<(&Customer, MatchConfidence)> = None;

        for customer in customers {
            let confidence = self.score_customer(name, phone, region, customer);
            let better = match &best {
                Some((_, current)) => confidence.score > current.score,
                None => confidence.score > 0.0,
            };
            if better {
                best = Some((customer, confidence));
            }
        }

        match best {
            Some((customer, confidence)) => {
                let status = self.status_for(confidence.score);
                let matched_customer = match status {
                    MatchStatus::NewCustomer => None,
                    _ => Some(customer.clone()),
                };
                MatchResult {
                    matched_customer,
                    confidence,
                    status,
                }
            }
            None => MatchResult {
                matched_customer: None,
                confidence: MatchConfidence::none(),
                status: MatchStatus::NewCustomer,
            },
        }
    }

    /// 分数 → 状态
    pub fn status_for(&self, score: f64) -> MatchStatus {
        if score >= self.config.verified_threshold {
            MatchStatus::Verified
        } else if score >= self.config.similar_threshold {
            MatchStatus::Similar
        } else {
            MatchStatus::NewCustomer
        }
    }

    /// 相似候选排序(分数 ≥ 区域阈值,取前 candidate_limit 个)
    pub fn rank_candidates(
        &self,
        name: &str,
        phone: Option<&str>,
        region: Option<&str>,
        customers: &[Customer],
    ) -> Vec<Customer> {
        let mut scored: Vec<(f64, usize, &Customer)> = customers
            .iter()
            .enumerate()
            .map(|(idx, c)| (self.score_customer(name, phone, region, c).score, idx, c))
            .filter(|(score, _, _)| *score >= self.config.region_name_threshold)
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(self.config.candidate_limit)
            .map(|(_, _, c)| c.clone())
            .collect()
    }

    /// 按姓名查找主数据: 先完全一致,再包含关系(较短一方 ≥2 字)
    pub fn find_by_name<'a>(
        &self,
        name: &str,
        customers: &'a [Customer],
    ) -> Option<(&'a Customer, NameHit)> {
        let input = normalize_name(name);
        if input.is_empty() {
            return None;
        }

        if let Some(c) = customers.iter().find(|c| normalize_name(&c.name) == input) {
            return Some((c, NameHit::Exact));
        }

        customers
            .iter()
            .find(|c| {
                let master = normalize_name(&c.name);
                let shorter = input.chars().count().min(master.chars().count());
                shorter >= 2 && (master.contains(&input) || input.contains(&master))
            })
            .map(|c| (c, NameHit::Partial))
    }

    /// 逐字段比对导入值与主数据(导入值为空的字段不参与比对)
    pub fn diff_fields(
        &self,
        phone: Option<&str>,
        region: Option<&str>,
        address: Option<&str>,
        customer: &Customer,
    ) -> Vec<FieldDiff> {
        let mut diffs = Vec::new();

        if let Some(p) = phone.filter(|p| !normalize_phone(p).is_empty()) {
            let same = match customer.phone.as_deref() {
                Some(master) => {
                    normalize_phone(master) == normalize_phone(p)
                        || phones_match(master, p, self.config.min_phone_digits)
                }
                None => false,
            };
            if !same {
                diffs.push(FieldDiff {
                    field: ConflictField::Phone,
                    master_value: customer.phone.clone(),
                    imported_value: p.to_string(),
                });
            }
        }

        if let Some(r) = region.filter(|r| !r.trim().is_empty()) {
            let same = customer
                .region
                .as_deref()
                .map(|master| regions_match(master, r))
                .unwrap_or(false);
            if !same {
                diffs.push(FieldDiff {
                    field: ConflictField::Region,
                    master_value: customer.region.clone(),
                    imported_value: r.to_string(),
                });
            }
        }

        if let Some(a) = address.filter(|a| !a.trim().is_empty()) {
            let same = customer
                .address_detail
                .as_deref()
                .map(|master| normalize_region(master) == normalize_region(a))
                .unwrap_or(false);
            if !same {
                diffs.push(FieldDiff {
                    field: ConflictField::Address,
                    master_value: customer.address_detail.clone(),
                    imported_value: a.to_string(),
                });
            }
        }

        diffs
    }
}
