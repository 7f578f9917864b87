// ==========================================
// 货运集拼导入核心 - 同批次重复检测器实现
// ==========================================
// 职责: 同一批次内按标准化电话分组
// 规则: 电话 ≥ min_phone_digits 位才参与分组; 首次出现者为主行
// ==========================================

use crate::domain::manifest::{DuplicateGroup, ParsedRow};
use crate::engine::identity_matcher::normalize_phone;
use crate::importer::importer_trait::DuplicateDetector as DuplicateDetectorTrait;
use std::collections::HashMap;
use uuid::Uuid;

pub struct DuplicateDetector {
    min_phone_digits: usize,
}

impl DuplicateDetector {
    pub fn new(min_phone_digits: usize) -> Self {
        Self { min_phone_digits }
    }
}

impl DuplicateDetectorTrait for DuplicateDetector {
    fn detect_duplicate_groups(&self, rows: &[ParsedRow]) -> Vec<DuplicateGroup> {
        // phone → 行下标(保持首次出现顺序)
        let mut order: Vec<String> = Vec::new();
        let mut buckets: HashMap<String, Vec<&ParsedRow>> = HashMap::new();

        for row in rows {
            let Some(phone) = row.phone.as_deref() else {
                continue;
            };
            let normalized = normalize_phone(phone);
            if normalized.len() < self.min_phone_digits {
                continue;
            }
            let bucket = buckets.entry(normalized.clone()).or_default();
            if bucket.is_empty() {
                order.push(normalized);
            }
            bucket.push(row);
        }

        let groups: Vec<DuplicateGroup> = order
            .into_iter()
            .filter_map(|phone| {
                let members = buckets.remove(&phone)?;
                if members.len() < 2 {
                    return None;
                }
                Some(DuplicateGroup {
                    group_id: Uuid::new_v4().to_string(),
                    primary_row_index: members[0].row_index,
                    member_row_indices: members.iter().map(|r| r.row_index).collect(),
                    merged_quantity: members.iter().map(|r| r.qty).sum(),
                    phone,
                    matched_customer: None,
                    confidence: None,
                })
            })
            .collect();

        if !groups.is_empty() {
            tracing::info!(group_count = groups.len(), "检测到同批次重复电话");
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(idx: usize, name: &str, phone: Option<&str>, qty: u32) -> ParsedRow {
        let mut r = ParsedRow::new(idx, name);
        r.phone = phone.map(|p| p.to_string());
        r.qty = qty;
        r
    }

    #[test]
    fn test_groups_by_normalized_phone() {
        let rows = vec![
            row(1, "고관영", Some("010-1234-5678"), 2),
            row(2, "박영희", Some("010-9999-0000"), 1),
            row(3, "고관영", Some("01012345678"), 3),
            row(4, "고 관영", Some("010 1234 5678"), 1),
        ];
        let groups = DuplicateDetector::new(8).detect_duplicate_groups(&rows);

        assert_eq!(groups.len(), 1);
        let g = &groups[0];
        assert_eq!(g.phone, "01012345678");
        assert_eq!(g.primary_row_index, 1);
        assert_eq!(g.member_row_indices, vec![1, 3, 4]);
        assert_eq!(g.merged_quantity, 6);
    }

    #[test]
    fn test_short_or_missing_phone_not_grouped() {
        let rows = vec![
            row(1, "A", Some("1234567"), 1),
            row(2, "B", Some("123-4567"), 1),
            row(3, "C", None, 1),
            row(4, "D", None, 1),
        ];
        assert!(DuplicateDetector::new(8).detect_duplicate_groups(&rows).is_empty());
    }

    #[test]
    fn test_group_order_follows_first_occurrence() {
        let rows = vec![
            row(1, "A", Some("0922400300"), 1),
            row(2, "B", Some("0811112222"), 1),
            row(3, "C", Some("0811112222"), 1),
            row(4, "D", Some("0922400300"), 1),
        ];
        let groups = DuplicateDetector::new(8).detect_duplicate_groups(&rows);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].primary_row_index, 1);
        assert_eq!(groups[1].primary_row_index, 2);
        assert_ne!(groups[0].group_id, groups[1].group_id);
    }
}
