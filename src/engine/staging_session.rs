// ==========================================
// 货运集拼导入核心 - 暂存会话(键控存储)
// ==========================================
// 职责: stagingId → StagingRecord 的工作集 + 同批次重复组 + 姓名并入关系
// 说明: 所有变更经 staging::transition 纯函数产出新记录后整条替换
// 约束: 客户列表为会话快照,外部变更需新开会话才能看到
// ==========================================

use crate::config::ReconcileConfig;
use crate::domain::customer::{Customer, NewCustomerDraft};
use crate::domain::manifest::{DuplicateGroup, ParseOutcome};
use crate::domain::staging::{FieldEdit, StagingRecord};
use crate::domain::types::{ConflictResolution, MatchStatus};
use crate::engine::error::{ReconcileError, ReconcileResult};
use crate::engine::identity_matcher::{normalize_name, normalize_phone, IdentityMatcher};
use crate::engine::staging::{self, MatchContext, StagingEvent};
use crate::importer::duplicate_detector::DuplicateDetector;
use crate::importer::importer_trait::DuplicateDetector as _;
use crate::repository::customer_repo::CustomerRepository;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument};
use uuid::Uuid;

/// 登记新客户的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationOutcome {
    pub customer: Customer,
    pub linked_staging_ids: Vec<String>,
}

// ==========================================
// StagingSession
// ==========================================
pub struct StagingSession {
    session_id: String,
    voyage_id: Option<String>,
    matcher: IdentityMatcher,
    customers: Vec<Customer>,
    records: HashMap<String, StagingRecord>,
    order: Vec<String>,
    groups: HashMap<String, DuplicateGroup>,
    group_order: Vec<String>,
    /// 全量重新匹配时按姓名去重: 被并入记录 → 承载记录
    name_folds: HashMap<String, String>,
    has_header: bool,
    warnings: Vec<String>,
}

impl StagingSession {
    /// 由解析结果建立会话
    ///
    /// # 流程
    /// 1. 逐行初判(姓名命中/打分)
    /// 2. 按电话分组,主行之外的成员改为 DUPLICATE
    /// 3. 主行匹配结果传播到组
    #[instrument(skip_all, fields(rows = outcome.rows.len(), customers = customers.len()))]
    pub fn from_parse(
        outcome: ParseOutcome,
        customers: Vec<Customer>,
        config: ReconcileConfig,
        voyage_id: Option<String>,
    ) -> Self {
        let detector = DuplicateDetector::new(config.min_phone_digits);
        let groups = detector.detect_duplicate_groups(&outcome.rows);
        let matcher = IdentityMatcher::new(config);

        let mut session = Self {
            session_id: Uuid::new_v4().to_string(),
            voyage_id,
            matcher,
            customers,
            records: HashMap::new(),
            order: Vec::new(),
            groups: HashMap::new(),
            group_order: Vec::new(),
            name_folds: HashMap::new(),
            has_header: outcome.has_header,
            warnings: outcome.warnings,
        };

        let mut row_to_id: HashMap<usize, String> = HashMap::new();
        for row in outcome.rows {
            let record = {
                let ctx = session.context();
                staging::new_record(row, &ctx)
            };
            row_to_id.insert(record.row_index(), record.staging_id.clone());
            session.order.push(record.staging_id.clone());
            session.records.insert(record.staging_id.clone(), record);
        }

        for group in groups {
            for row_index in &group.member_row_indices {
                let Some(id) = row_to_id.get(row_index) else {
                    continue;
                };
                if let Some(record) = session.records.get_mut(id) {
                    record.duplicate_group_id = Some(group.group_id.clone());
                }
            }
            session.group_order.push(group.group_id.clone());
            let group_id = group.group_id.clone();
            session.groups.insert(group_id.clone(), group);
            session.sync_group(&group_id);
        }

        info!(
            session_id = %session.session_id,
            records = session.order.len(),
            groups = session.group_order.len(),
            "暂存会话已建立"
        );
        session
    }

    fn context(&self) -> MatchContext<'_> {
        MatchContext {
            matcher: &self.matcher,
            customers: &self.customers,
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn voyage_id(&self) -> Option<&str> {
        self.voyage_id.as_deref()
    }

    pub fn has_header(&self) -> bool {
        self.has_header
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 按原始顺序列出记录
    pub fn records(&self) -> Vec<&StagingRecord> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    pub fn get(&self, staging_id: &str) -> Option<&StagingRecord> {
        self.records.get(staging_id)
    }

    pub fn find_by_row(&self, row_index: usize) -> Option<&StagingRecord> {
        self.records().into_iter().find(|r| r.row_index() == row_index)
    }

    /// 按首次出现顺序列出重复组
    pub fn groups(&self) -> Vec<&DuplicateGroup> {
        self.group_order
            .iter()
            .filter_map(|id| self.groups.get(id))
            .collect()
    }

    /// 因姓名去重并入其他记录的行号(按原始顺序)
    pub fn folded_rows(&self) -> Vec<usize> {
        self.records()
            .into_iter()
            .filter(|r| self.name_folds.contains_key(&r.staging_id))
            .map(|r| r.row_index())
            .collect()
    }

    /// 各状态计数
    pub fn status_counts(&self) -> HashMap<MatchStatus, usize> {
        let mut counts = HashMap::new();
        for record in self.records.values() {
            *counts.entry(record.match_status).or_insert(0) += 1;
        }
        counts
    }

    /// 可提交记录(按原始顺序)
    pub fn eligible_records(&self) -> Vec<StagingRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.is_commit_eligible())
            .cloned()
            .collect()
    }

    /// 可提交记录的落库数量(stagingId → 数量)
    pub fn commit_quantities(&self) -> HashMap<String, u32> {
        self.records()
            .into_iter()
            .filter(|r| r.is_commit_eligible())
            .map(|r| (r.staging_id.clone(), self.commit_quantity(r)))
            .collect()
    }

    // ==========================================
    // 状态转换入口
    // ==========================================

    fn record(&self, staging_id: &str) -> ReconcileResult<&StagingRecord> {
        self.records
            .get(staging_id)
            .ok_or_else(|| ReconcileError::StagingNotFound(staging_id.to_string()))
    }

    fn apply(&mut self, staging_id: &str, event: StagingEvent) -> ReconcileResult<()> {
        let next = {
            let current = self.record(staging_id)?;
            staging::transition(current, event, &self.context())?
        };
        self.records.insert(staging_id.to_string(), next);
        Ok(())
    }

    /// 是否为重复组内的非主行
    fn is_secondary_member(&self, record: &StagingRecord) -> bool {
        record
            .duplicate_group_id
            .as_ref()
            .and_then(|gid| self.groups.get(gid))
            .map(|g| g.primary_row_index != record.row_index())
            .unwrap_or(false)
    }

    fn primary_group_of(&self, staging_id: &str) -> Option<String> {
        let record = self.records.get(staging_id)?;
        let gid = record.duplicate_group_id.as_ref()?;
        let group = self.groups.get(gid)?;
        (group.primary_row_index == record.row_index()).then(|| gid.clone())
    }

    /// 修正字段并对该记录重新匹配
    ///
    /// 非主行成员把电话改离组电话后脱离该组
    pub fn edit(&mut self, staging_id: &str, edit: FieldEdit) -> ReconcileResult<&StagingRecord> {
        let current = self.record(staging_id)?.clone();

        if self.is_secondary_member(&current) {
            let group_id = current.duplicate_group_id.clone().unwrap_or_default();
            let group_phone = self
                .groups
                .get(&group_id)
                .map(|g| g.phone.clone())
                .unwrap_or_default();

            self.apply(staging_id, StagingEvent::Edit(edit))?;
            let still_member = self
                .records
                .get(staging_id)
                .and_then(|r| r.edited.phone.as_deref())
                .map(|p| normalize_phone(p) == group_phone)
                .unwrap_or(false);

            if still_member {
                let matched = self.groups.get(&group_id).and_then(|g| g.matched_customer.clone());
                self.apply(
                    staging_id,
                    StagingEvent::MarkDuplicate {
                        group_id: Some(group_id),
                        matched_customer: matched,
                    },
                )?;
            } else {
                self.detach_from_group(staging_id, &group_id)?;
            }
        } else {
            // 被并入的记录经编辑后恢复独立匹配
            self.name_folds.remove(staging_id);
            self.apply(staging_id, StagingEvent::Edit(edit))?;
            let renamed = self
                .records
                .get(staging_id)
                .map(|r| normalize_name(&r.edited.name) != normalize_name(&current.edited.name))
                .unwrap_or(false);
            if renamed {
                self.release_folds(staging_id)?;
            }
            self.propagate(staging_id);
        }

        self.record(staging_id)
    }

    /// 选定 SIMILAR 候选
    pub fn select_candidate(
        &mut self,
        staging_id: &str,
        customer_id: &str,
    ) -> ReconcileResult<&StagingRecord> {
        self.apply(
            staging_id,
            StagingEvent::SelectCandidate {
                customer_id: customer_id.to_string(),
            },
        )?;
        self.propagate(staging_id);
        self.record(staging_id)
    }

    /// 裁决冲突(UPDATE_MASTER / USE_ONCE)
    pub fn resolve_conflict(
        &mut self,
        staging_id: &str,
        resolution: ConflictResolution,
    ) -> ReconcileResult<&StagingRecord> {
        self.apply(staging_id, StagingEvent::ResolveConflict(resolution))?;
        self.propagate(staging_id);
        self.record(staging_id)
    }

    /// 勾选/取消勾选
    pub fn set_selected(
        &mut self,
        staging_id: &str,
        selected: bool,
    ) -> ReconcileResult<&StagingRecord> {
        self.apply(staging_id, StagingEvent::SetSelected(selected))?;
        self.record(staging_id)
    }

    /// 登记新客户,并关联所有同名待定记录
    ///
    /// # 关联规则
    /// - 发起登记的记录总是关联
    /// - 其余记录: 状态为 NEW_CUSTOMER / SIMILAR,且标准化姓名等于或包含于新客户标准化姓名
    pub async fn register_customer(
        &mut self,
        staging_id: &str,
        draft: NewCustomerDraft,
        repo: &dyn CustomerRepository,
    ) -> ReconcileResult<RegistrationOutcome> {
        let source = self.record(staging_id)?.clone();
        if !matches!(
            source.match_status,
            MatchStatus::NewCustomer | MatchStatus::Similar
        ) {
            return Err(ReconcileError::InvalidTransition {
                staging_id: staging_id.to_string(),
                status: source.match_status,
                action: "register_customer",
            });
        }

        let name = draft
            .name
            .unwrap_or_else(|| source.edited.name.clone())
            .trim()
            .to_string();
        let new_key = normalize_name(&name);
        if new_key.is_empty() {
            return Err(ReconcileError::EmptyCustomerName);
        }

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name,
            phone: draft.phone.or_else(|| source.edited.phone.clone()),
            region: draft.region.or_else(|| source.edited.region.clone()),
            address_detail: draft.address_detail.or_else(|| source.raw.address.clone()),
            pod_code: draft.pod_code,
            discount_info: draft.discount_info,
            discount_percent: draft.discount_percent,
        };

        repo.upsert_customer(&customer).await?;
        self.customers.push(customer.clone());

        let targets: Vec<String> = self
            .order
            .iter()
            .filter(|id| {
                id.as_str() == staging_id
                    || self.records.get(*id).is_some_and(|r| {
                        let key = normalize_name(&r.edited.name);
                        matches!(r.match_status, MatchStatus::NewCustomer | MatchStatus::Similar)
                            && !key.is_empty()
                            && new_key.contains(&key)
                    })
            })
            .cloned()
            .collect();

        for id in &targets {
            self.apply(id, StagingEvent::LinkCustomer(customer.clone()))?;
            self.propagate(id);
        }

        info!(
            customer_id = %customer.id,
            linked = targets.len(),
            "新客户已登记"
        );
        Ok(RegistrationOutcome {
            customer,
            linked_staging_ids: targets,
        })
    }

    /// 对单条记录重新匹配
    ///
    /// 单条重新匹配不做姓名去重,被并入的记录恢复独立
    pub fn rematch(&mut self, staging_id: &str) -> ReconcileResult<&StagingRecord> {
        let secondary = self.is_secondary_member(self.record(staging_id)?);
        if secondary {
            return self.record(staging_id);
        }
        self.name_folds.remove(staging_id);
        self.apply(staging_id, StagingEvent::Rematch)?;
        self.propagate(staging_id);
        self.record(staging_id)
    }

    /// 全量重新匹配
    ///
    /// 先做编辑后姓名去重: 标准化姓名与前序记录相同者标记 DUPLICATE,
    /// 其数量并入首次出现的记录一起落库
    ///
    /// # 规则
    /// - 电话重复组的非主行不参与(数量已由组主行承载)
    /// - 组主行被并入时先离组,由下一成员接任主行
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub fn rematch_all(&mut self) -> ReconcileResult<()> {
        self.name_folds.clear();
        let mut survivors: HashMap<String, String> = HashMap::new();
        let ids = self.order.clone();

        for id in &ids {
            let current = self.record(id)?.clone();
            if self.is_secondary_member(&current) {
                continue;
            }

            let key = normalize_name(&current.edited.name);
            match survivors.get(&key).cloned() {
                Some(survivor_id) if !key.is_empty() => {
                    self.fold_into(id, &survivor_id)?;
                }
                _ => {
                    if !key.is_empty() {
                        survivors.insert(key, id.clone());
                    }
                    self.apply(id, StagingEvent::Rematch)?;
                    self.propagate(id);
                }
            }
        }

        info!(
            records = ids.len(),
            folded = self.name_folds.len(),
            "全量重新匹配完成"
        );
        Ok(())
    }

    /// 丢弃记录(移出工作集)
    pub fn discard(&mut self, staging_id: &str) -> ReconcileResult<StagingRecord> {
        let record = self.record(staging_id)?.clone();
        if let Some(gid) = record.duplicate_group_id.clone() {
            self.detach_from_group(staging_id, &gid)?;
        }
        self.name_folds.remove(staging_id);
        self.release_folds(staging_id)?;
        self.order.retain(|id| id != staging_id);
        let removed = self
            .records
            .remove(staging_id)
            .ok_or_else(|| ReconcileError::StagingNotFound(staging_id.to_string()))?;
        tracing::debug!(staging_id, "暂存记录已丢弃");
        Ok(removed)
    }

    /// 提交成功后移出工作集
    ///
    /// 并入已提交记录的行随之移出(数量已随承载记录落库)
    pub fn remove_committed(&mut self, staging_ids: &[String]) {
        let mut removed: HashSet<String> = staging_ids.iter().cloned().collect();
        let riding: Vec<String> = self
            .name_folds
            .iter()
            .filter(|(_, survivor)| removed.contains(*survivor))
            .map(|(folded, _)| folded.clone())
            .collect();
        removed.extend(riding);
        self.order.retain(|id| !removed.contains(id));
        self.records.retain(|id, _| !removed.contains(id));
        self.name_folds
            .retain(|folded, survivor| !removed.contains(folded) && !removed.contains(survivor));
    }

    /// 记录实际提交数量(组主行取合并数量,再加上并入记录的数量)
    pub fn commit_quantity(&self, record: &StagingRecord) -> u32 {
        let own = record
            .duplicate_group_id
            .as_ref()
            .and_then(|gid| self.groups.get(gid))
            .filter(|g| g.primary_row_index == record.row_index())
            .map(|g| g.merged_quantity)
            .unwrap_or(record.raw.qty);
        let folded: u32 = self
            .name_folds
            .iter()
            .filter(|(_, survivor)| *survivor == &record.staging_id)
            .filter_map(|(folded, _)| self.records.get(folded))
            .map(|r| r.raw.qty)
            .sum();
        own + folded
    }

    // ==========================================
    // 姓名并入
    // ==========================================

    /// 记录并入承载记录; 电话组主行先离组
    fn fold_into(&mut self, staging_id: &str, survivor_id: &str) -> ReconcileResult<()> {
        if let Some(gid) = self.primary_group_of(staging_id) {
            self.detach_from_group(staging_id, &gid)?;
        }
        let matched = self.settled_customer(survivor_id);
        self.apply(
            staging_id,
            StagingEvent::MarkDuplicate {
                group_id: None,
                matched_customer: matched,
            },
        )?;
        self.name_folds
            .insert(staging_id.to_string(), survivor_id.to_string());
        tracing::debug!(staging_id, survivor_id, "按姓名并入前序记录");
        Ok(())
    }

    /// 承载记录消失或改名时,并入的记录恢复独立匹配
    fn release_folds(&mut self, survivor_id: &str) -> ReconcileResult<()> {
        let folded = self.folded_into(survivor_id);
        for id in folded {
            self.name_folds.remove(&id);
            if self.records.contains_key(&id) {
                self.apply(&id, StagingEvent::Rematch)?;
            }
        }
        Ok(())
    }

    fn folded_into(&self, survivor_id: &str) -> Vec<String> {
        self.name_folds
            .iter()
            .filter(|(_, survivor)| survivor.as_str() == survivor_id)
            .map(|(folded, _)| folded.clone())
            .collect()
    }

    fn settled_customer(&self, staging_id: &str) -> Option<Customer> {
        self.records
            .get(staging_id)
            .filter(|r| r.match_status == MatchStatus::Verified)
            .and_then(|r| r.matched_customer.clone())
    }

    /// 记录变更后同步其电话组成员与并入记录
    fn propagate(&mut self, staging_id: &str) {
        if let Some(gid) = self.primary_group_of(staging_id) {
            self.sync_group(&gid);
        }

        let matched = self.settled_customer(staging_id);
        for id in self.folded_into(staging_id) {
            let next = match self.records.get(&id) {
                Some(current) => staging::transition(
                    current,
                    StagingEvent::MarkDuplicate {
                        group_id: None,
                        matched_customer: matched.clone(),
                    },
                    &self.context(),
                ),
                None => continue,
            };
            if let Ok(next) = next {
                self.records.insert(id, next);
            }
        }
    }

    // ==========================================
    // 重复组维护
    // ==========================================

    /// 主行匹配结果传播到组与成员
    fn sync_group(&mut self, group_id: &str) {
        let Some(group) = self.groups.get(group_id) else {
            return;
        };
        let primary_row = group.primary_row_index;
        let members = group.member_row_indices.clone();

        let primary = self
            .records
            .values()
            .find(|r| r.row_index() == primary_row && r.duplicate_group_id.as_deref() == Some(group_id))
            .cloned();

        let (matched, confidence) = match &primary {
            Some(p) if p.match_status == MatchStatus::Verified => {
                (p.matched_customer.clone(), Some(p.confidence.clone()))
            }
            _ => (None, None),
        };

        if let Some(group) = self.groups.get_mut(group_id) {
            group.matched_customer = matched.clone();
            group.confidence = confidence;
        }

        let secondary_ids: Vec<String> = self
            .records
            .values()
            .filter(|r| {
                r.duplicate_group_id.as_deref() == Some(group_id)
                    && r.row_index() != primary_row
                    && members.contains(&r.row_index())
            })
            .map(|r| r.staging_id.clone())
            .collect();

        for id in secondary_ids {
            let next = match self.records.get(&id) {
                Some(current) => staging::transition(
                    current,
                    StagingEvent::MarkDuplicate {
                        group_id: Some(group_id.to_string()),
                        matched_customer: matched.clone(),
                    },
                    &self.context(),
                ),
                None => continue,
            };
            if let Ok(next) = next {
                self.records.insert(id, next);
            }
        }
    }

    /// 记录脱离重复组; 主行离组时顺延下一成员,成员不足 2 时解散
    fn detach_from_group(&mut self, staging_id: &str, group_id: &str) -> ReconcileResult<()> {
        let row_index = self.record(staging_id)?.row_index();
        if let Some(record) = self.records.get_mut(staging_id) {
            record.duplicate_group_id = None;
        }

        let Some(group) = self.groups.get_mut(group_id) else {
            return Ok(());
        };
        group.member_row_indices.retain(|r| *r != row_index);
        let was_primary = group.primary_row_index == row_index;
        if was_primary {
            if let Some(next) = group.member_row_indices.first() {
                group.primary_row_index = *next;
            }
        }

        let remaining = group.member_row_indices.clone();
        let merged: u32 = self
            .records
            .values()
            .filter(|r| remaining.contains(&r.row_index()) && r.duplicate_group_id.as_deref() == Some(group_id))
            .map(|r| r.raw.qty)
            .sum();
        group.merged_quantity = merged;
        let new_primary_row = group.primary_row_index;

        // 脱离组的非主行按自身字段重新匹配
        if !was_primary && self.records.contains_key(staging_id) {
            self.apply(staging_id, StagingEvent::Rematch)?;
        }

        if remaining.len() < 2 {
            self.groups.remove(group_id);
            self.group_order.retain(|g| g != group_id);
            let leftover: Vec<String> = self
                .records
                .values()
                .filter(|r| r.duplicate_group_id.as_deref() == Some(group_id))
                .map(|r| r.staging_id.clone())
                .collect();
            for id in leftover {
                let was_duplicate = self
                    .records
                    .get_mut(&id)
                    .map(|r| {
                        r.duplicate_group_id = None;
                        r.match_status == MatchStatus::Duplicate
                    })
                    .unwrap_or(false);
                if was_duplicate {
                    self.apply(&id, StagingEvent::Rematch)?;
                }
            }
            tracing::debug!(group_id, "重复组成员不足,已解散");
            return Ok(());
        }

        if was_primary {
            // 新主行由 DUPLICATE 恢复为正常匹配
            let new_primary_id = self
                .records
                .values()
                .find(|r| r.row_index() == new_primary_row && r.duplicate_group_id.as_deref() == Some(group_id))
                .map(|r| r.staging_id.clone());
            if let Some(id) = new_primary_id {
                self.apply(&id, StagingEvent::Rematch)?;
            }
        }
        self.sync_group(group_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::manifest::ParsedRow;

    fn row(idx: usize, name: &str, phone: Option<&str>, qty: u32) -> ParsedRow {
        let mut r = ParsedRow::new(idx, name);
        r.phone = phone.map(|p| p.to_string());
        r.qty = qty;
        r
    }

    fn session(rows: Vec<ParsedRow>, customers: Vec<Customer>) -> StagingSession {
        let outcome = ParseOutcome {
            rows,
            has_header: false,
            warnings: Vec::new(),
            column_map: None,
        };
        StagingSession::from_parse(outcome, customers, ReconcileConfig::default(), None)
    }

    #[test]
    fn test_phone_group_marks_secondary_duplicate() {
        let customers = vec![Customer::new("C1", "고관영").with_phone("010-1234-5678")];
        let s = session(
            vec![
                row(1, "고관영", Some("010-1234-5678"), 2),
                row(2, "고관영 사모님", Some("01012345678"), 3),
                row(3, "박영희", Some("010-9999-0000"), 1),
            ],
            customers,
        );

        let groups = s.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].member_row_indices, vec![1, 2]);
        assert_eq!(groups[0].merged_quantity, 5);
        assert_eq!(groups[0].matched_customer.as_ref().unwrap().id, "C1");

        let primary = s.find_by_row(1).unwrap();
        assert_eq!(primary.match_status, MatchStatus::Verified);
        assert_eq!(s.commit_quantity(primary), 5);

        let member = s.find_by_row(2).unwrap();
        assert_eq!(member.match_status, MatchStatus::Duplicate);
        assert_eq!(member.matched_customer.as_ref().unwrap().id, "C1");
        assert!(!member.is_commit_eligible());
    }

    #[test]
    fn test_edit_member_phone_detaches_from_group() {
        let mut s = session(
            vec![
                row(1, "A", Some("0922400300"), 1),
                row(2, "B", Some("0922400300"), 2),
                row(3, "C", Some("0922400300"), 4),
            ],
            Vec::new(),
        );
        let id = s.find_by_row(2).unwrap().staging_id.clone();
        let edited = s
            .edit(
                &id,
                FieldEdit {
                    phone: Some("0811112222".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(edited.match_status, MatchStatus::NewCustomer);
        assert!(edited.duplicate_group_id.is_none());

        let group = s.groups()[0];
        assert_eq!(group.member_row_indices, vec![1, 3]);
        assert_eq!(group.merged_quantity, 5);
    }

    #[test]
    fn test_discard_dissolves_two_member_group() {
        let mut s = session(
            vec![
                row(1, "A", Some("0922400300"), 1),
                row(2, "B", Some("0922400300"), 2),
            ],
            Vec::new(),
        );
        let primary_id = s.find_by_row(1).unwrap().staging_id.clone();
        s.discard(&primary_id).unwrap();

        assert!(s.groups().is_empty());
        assert_eq!(s.len(), 1);
        let remaining = s.find_by_row(2).unwrap();
        assert_eq!(remaining.match_status, MatchStatus::NewCustomer);
        assert!(remaining.duplicate_group_id.is_none());
        assert_eq!(s.commit_quantity(remaining), 2);
    }

    #[test]
    fn test_rematch_all_name_duplicates() {
        let mut s = session(
            vec![row(1, "홍길동", None, 1), row(2, "홍 길동", None, 1)],
            Vec::new(),
        );
        assert_eq!(s.find_by_row(2).unwrap().match_status, MatchStatus::NewCustomer);

        s.rematch_all().unwrap();
        let first = s.find_by_row(1).unwrap();
        assert_eq!(first.match_status, MatchStatus::NewCustomer);
        assert_eq!(s.commit_quantity(first), 2);
        assert_eq!(s.find_by_row(2).unwrap().match_status, MatchStatus::Duplicate);
        assert_eq!(s.folded_rows(), vec![2]);

        // 承载记录丢弃后,并入记录恢复独立
        let first_id = first.staging_id.clone();
        s.discard(&first_id).unwrap();
        let second = s.find_by_row(2).unwrap();
        assert_eq!(second.match_status, MatchStatus::NewCustomer);
        assert!(s.folded_rows().is_empty());
        assert_eq!(s.commit_quantity(second), 1);
    }

    fn represented_quantity(s: &StagingSession) -> u32 {
        s.records()
            .into_iter()
            .filter(|r| r.match_status != MatchStatus::Duplicate)
            .map(|r| s.commit_quantity(r))
            .sum()
    }

    #[test]
    fn test_rematch_all_folds_group_primary_without_losing_quantity() {
        let customers = vec![Customer::new("C1", "홍길동").with_phone("010-1111-2222")];
        let mut s = session(
            vec![
                row(1, "홍길동", Some("010-1111-2222"), 1),
                row(2, "홍길동", Some("010-3333-4444"), 2),
                row(3, "김철수", Some("010-3333-4444"), 5),
            ],
            customers,
        );
        assert_eq!(s.groups().len(), 1);
        assert_eq!(represented_quantity(&s), 8);

        s.rematch_all().unwrap();

        let first = s.find_by_row(1).unwrap();
        assert_eq!(first.match_status, MatchStatus::Verified);
        assert_eq!(s.commit_quantity(first), 3);
        assert_eq!(s.commit_quantities().get(&first.staging_id), Some(&3));

        let folded = s.find_by_row(2).unwrap();
        assert_eq!(folded.match_status, MatchStatus::Duplicate);
        assert!(folded.duplicate_group_id.is_none());
        assert_eq!(folded.matched_customer.as_ref().unwrap().id, "C1");

        // 组只剩一人,解散后按自身字段匹配
        assert!(s.groups().is_empty());
        let other = s.find_by_row(3).unwrap();
        assert_eq!(other.match_status, MatchStatus::NewCustomer);
        assert_eq!(s.commit_quantity(other), 5);

        assert_eq!(represented_quantity(&s), 8);
    }

    #[test]
    fn test_rematch_all_promotes_next_member_when_primary_folds() {
        let mut s = session(
            vec![
                row(1, "홍길동", None, 1),
                row(2, "홍길동", Some("010-3333-4444"), 2),
                row(3, "김철수", Some("010-3333-4444"), 5),
                row(4, "박영희", Some("010-3333-4444"), 4),
            ],
            Vec::new(),
        );

        s.rematch_all().unwrap();

        let groups = s.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].primary_row_index, 3);
        assert_eq!(groups[0].merged_quantity, 9);
        assert_ne!(s.find_by_row(3).unwrap().match_status, MatchStatus::Duplicate);
        assert_eq!(s.find_by_row(4).unwrap().match_status, MatchStatus::Duplicate);
        assert_eq!(s.commit_quantity(s.find_by_row(1).unwrap()), 3);
        assert_eq!(represented_quantity(&s), 12);
    }

    #[test]
    fn test_rematch_all_ignores_names_of_group_members() {
        let mut s = session(
            vec![
                row(1, "홍길동", Some("010-1111-2222"), 1),
                row(2, "김철수", Some("010-1111-2222"), 2),
                row(3, "김철수", Some("010-5555-6666"), 4),
            ],
            Vec::new(),
        );

        s.rematch_all().unwrap();
        assert_eq!(s.find_by_row(3).unwrap().match_status, MatchStatus::NewCustomer);
        assert!(s.folded_rows().is_empty());
        assert_eq!(represented_quantity(&s), 7);
    }

    #[test]
    fn test_remove_committed_takes_folded_rows() {
        let customers = vec![Customer::new("C1", "홍길동").with_phone("010-1111-2222")];
        let mut s = session(
            vec![
                row(1, "홍길동", Some("010-1111-2222"), 1),
                row(2, "홍길동", None, 2),
                row(3, "박영희", None, 1),
            ],
            customers,
        );
        s.rematch_all().unwrap();
        let first_id = s.find_by_row(1).unwrap().staging_id.clone();

        s.remove_committed(&[first_id]);
        assert_eq!(s.len(), 1);
        assert!(s.find_by_row(2).is_none());
        assert!(s.folded_rows().is_empty());
    }

    #[test]
    fn test_unknown_staging_id() {
        let mut s = session(vec![row(1, "A", None, 1)], Vec::new());
        assert!(matches!(
            s.rematch("missing"),
            Err(ReconcileError::StagingNotFound(_))
        ));
    }

    #[test]
    fn test_remove_committed() {
        let mut s = session(vec![row(1, "A", None, 1), row(2, "B", None, 1)], Vec::new());
        let id = s.find_by_row(1).unwrap().staging_id.clone();
        s.remove_committed(&[id.clone()]);
        assert_eq!(s.len(), 1);
        assert!(s.get(&id).is_none());
    }
}
