// ==========================================
// 货运集拼导入核心 - 暂存记录状态机
// ==========================================
// 职责: 纯函数状态转换 (旧记录 + 事件 → 新记录)
// 状态: VERIFIED / CONFLICT(PENDING|UPDATE_MASTER|USE_ONCE) /
//       SIMILAR / NEW_CUSTOMER / DUPLICATE
// 红线: 转换本身不做任何持久化
// 红线: CONFLICT 只能由人工裁决,PENDING 永不 resolved
// ==========================================

use crate::domain::customer::Customer;
use crate::domain::manifest::ParsedRow;
use crate::domain::staging::{ConflictInfo, EditedFields, FieldEdit, MatchConfidence, StagingRecord};
use crate::domain::types::{ConflictResolution, MatchFactor, MatchStatus};
use crate::engine::error::{ReconcileError, ReconcileResult};
use crate::engine::identity_matcher::{IdentityMatcher, NameHit};
use tracing::debug;
use uuid::Uuid;

// ==========================================
// MatchContext - 匹配上下文
// ==========================================
// 客户列表为会话内只读快照
pub struct MatchContext<'a> {
    pub matcher: &'a IdentityMatcher,
    pub customers: &'a [Customer],
}

// ==========================================
// Evaluation - 单条记录的对账结论
// ==========================================
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub status: MatchStatus,
    pub matched_customer: Option<Customer>,
    pub confidence: MatchConfidence,
    pub similar_candidates: Vec<Customer>,
    pub conflict: Option<ConflictInfo>,
}

/// 对账判定
///
/// # 顺序
/// 1. 姓名命中(完全一致 → 包含关系): 逐字段比对,有差异 CONFLICT;
///    无差异时完全一致 VERIFIED,包含关系需佐证,否则 SIMILAR
/// 2. 否则走打分器: VERIFIED / SIMILAR(附候选) / NEW_CUSTOMER
pub fn evaluate(ctx: &MatchContext<'_>, edited: &EditedFields, address: Option<&str>) -> Evaluation {
    let matcher = ctx.matcher;
    let phone = edited.phone.as_deref();
    let region = edited.region.as_deref();

    if let Some((customer, hit)) = matcher.find_by_name(&edited.name, ctx.customers) {
        let mut confidence = matcher.score_customer(&edited.name, phone, region, customer);
        let name_factor = match hit {
            NameHit::Exact => MatchFactor::ExactName,
            NameHit::Partial => MatchFactor::PartialName,
        };
        if !confidence.has_factor(name_factor) {
            confidence.factors.push(name_factor);
        }

        let diffs = matcher.diff_fields(phone, region, address, customer);
        if !diffs.is_empty() {
            return Evaluation {
                status: MatchStatus::Conflict,
                matched_customer: Some(customer.clone()),
                confidence,
                similar_candidates: Vec::new(),
                conflict: Some(ConflictInfo {
                    customer_id: customer.id.clone(),
                    fields: diffs,
                    resolution: ConflictResolution::Pending,
                }),
            };
        }

        if hit == NameHit::Exact || partial_hit_corroborated(matcher, &confidence) {
            return Evaluation {
                status: MatchStatus::Verified,
                matched_customer: Some(customer.clone()),
                confidence,
                similar_candidates: Vec::new(),
                conflict: None,
            };
        }

        // 包含关系命中但无电话/地区佐证: 交人工确认,命中客户排首位
        let mut similar_candidates = vec![customer.clone()];
        similar_candidates.extend(
            matcher
                .rank_candidates(&edited.name, phone, region, ctx.customers)
                .into_iter()
                .filter(|c| c.id != customer.id),
        );
        similar_candidates.truncate(matcher.config().candidate_limit.max(1));
        return Evaluation {
            status: MatchStatus::Similar,
            matched_customer: Some(customer.clone()),
            confidence,
            similar_candidates,
            conflict: None,
        };
    }

    let result = matcher.match_customer(&edited.name, phone, region, ctx.customers);
    let similar_candidates = match result.status {
        MatchStatus::Similar => matcher.rank_candidates(&edited.name, phone, region, ctx.customers),
        _ => Vec::new(),
    };

    Evaluation {
        status: result.status,
        matched_customer: result.matched_customer,
        confidence: result.confidence,
        similar_candidates,
        conflict: None,
    }
}

/// 包含关系命中需电话一致,或地区一致且姓名相似度达到区域阈值
fn partial_hit_corroborated(matcher: &IdentityMatcher, confidence: &MatchConfidence) -> bool {
    confidence.has_factor(MatchFactor::PhoneMatch)
        || (confidence.has_factor(MatchFactor::RegionMatch)
            && confidence.name_score >= matcher.config().region_name_threshold)
}

/// 用判定结果覆盖记录,并按状态重置勾选/裁决标志
fn apply_evaluation(record: &StagingRecord, evaluation: Evaluation) -> StagingRecord {
    let settled = evaluation.status == MatchStatus::Verified;
    StagingRecord {
        match_status: evaluation.status,
        matched_customer: evaluation.matched_customer,
        confidence: evaluation.confidence,
        similar_candidates: evaluation.similar_candidates,
        conflict: evaluation.conflict,
        is_selected: settled,
        is_resolved: settled,
        ..record.clone()
    }
}

/// 批次解析时创建暂存记录
pub fn new_record(row: ParsedRow, ctx: &MatchContext<'_>) -> StagingRecord {
    let edited = EditedFields::from_row(&row);
    let evaluation = evaluate(ctx, &edited, row.address.as_deref());
    let draft = StagingRecord {
        staging_id: Uuid::new_v4().to_string(),
        raw: row,
        edited,
        match_status: MatchStatus::NewCustomer,
        matched_customer: None,
        confidence: MatchConfidence::none(),
        similar_candidates: Vec::new(),
        conflict: None,
        duplicate_group_id: None,
        is_selected: false,
        is_resolved: false,
    };
    apply_evaluation(&draft, evaluation)
}

// ==========================================
// StagingEvent - 状态机事件
// ==========================================
#[derive(Debug, Clone)]
pub enum StagingEvent {
    /// 修正姓名/电话/地区后对该记录重新匹配
    Edit(FieldEdit),
    /// 重新匹配(不改字段)
    Rematch,
    /// 在 SIMILAR 候选中选定客户
    SelectCandidate { customer_id: String },
    /// 关联新登记的客户
    LinkCustomer(Customer),
    /// 裁决冲突
    ResolveConflict(ConflictResolution),
    /// 勾选/取消勾选
    SetSelected(bool),
    /// 标记为重复行
    MarkDuplicate {
        group_id: Option<String>,
        matched_customer: Option<Customer>,
    },
}

impl StagingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StagingEvent::Edit(_) => "edit",
            StagingEvent::Rematch => "rematch",
            StagingEvent::SelectCandidate { .. } => "select_candidate",
            StagingEvent::LinkCustomer(_) => "link_customer",
            StagingEvent::ResolveConflict(_) => "resolve_conflict",
            StagingEvent::SetSelected(_) => "set_selected",
            StagingEvent::MarkDuplicate { .. } => "mark_duplicate",
        }
    }
}

fn invalid(record: &StagingRecord, event: &StagingEvent) -> ReconcileError {
    ReconcileError::InvalidTransition {
        staging_id: record.staging_id.clone(),
        status: record.match_status,
        action: event.name(),
    }
}

/// 状态转换
///
/// # 返回
/// - Ok(StagingRecord): 新记录(原记录不变)
/// - Err(InvalidTransition): 当前状态不接受该事件
pub fn transition(
    record: &StagingRecord,
    event: StagingEvent,
    ctx: &MatchContext<'_>,
) -> ReconcileResult<StagingRecord> {
    let next = match &event {
        StagingEvent::Edit(edit) => {
            let mut edited = record.edited.clone();
            if let Some(name) = &edit.name {
                edited.name = name.trim().to_string();
            }
            if let Some(phone) = &edit.phone {
                edited.phone = non_blank(phone);
            }
            if let Some(region) = &edit.region {
                edited.region = non_blank(region);
            }
            let evaluation = evaluate(ctx, &edited, record.raw.address.as_deref());
            let updated = StagingRecord {
                edited,
                ..record.clone()
            };
            apply_evaluation(&updated, evaluation)
        }

        StagingEvent::Rematch => {
            let evaluation = evaluate(ctx, &record.edited, record.raw.address.as_deref());
            apply_evaluation(record, evaluation)
        }

        StagingEvent::SelectCandidate { customer_id } => {
            if record.match_status != MatchStatus::Similar {
                return Err(invalid(record, &event));
            }
            let customer = record
                .similar_candidates
                .iter()
                .chain(ctx.customers.iter())
                .find(|c| &c.id == customer_id)
                .cloned()
                .ok_or_else(|| ReconcileError::CustomerNotFound(customer_id.clone()))?;
            let confidence = ctx.matcher.score_customer(
                &record.edited.name,
                record.edited.phone.as_deref(),
                record.edited.region.as_deref(),
                &customer,
            );
            verified_with(record, customer, confidence)
        }

        StagingEvent::LinkCustomer(customer) => {
            if !matches!(
                record.match_status,
                MatchStatus::NewCustomer | MatchStatus::Similar
            ) {
                return Err(invalid(record, &event));
            }
            let mut confidence = ctx.matcher.score_customer(
                &record.edited.name,
                record.edited.phone.as_deref(),
                record.edited.region.as_deref(),
                customer,
            );
            confidence.score = confidence.score.max(ctx.matcher.config().verified_threshold);
            verified_with(record, customer.clone(), confidence)
        }

        StagingEvent::ResolveConflict(resolution) => {
            if record.match_status != MatchStatus::Conflict {
                return Err(invalid(record, &event));
            }
            if *resolution == ConflictResolution::Pending {
                return Err(ReconcileError::PendingResolution);
            }
            let mut conflict = record.conflict.clone().ok_or_else(|| invalid(record, &event))?;
            conflict.resolution = *resolution;
            StagingRecord {
                conflict: Some(conflict),
                is_selected: true,
                is_resolved: true,
                ..record.clone()
            }
        }

        StagingEvent::SetSelected(selected) => {
            if *selected && record.match_status == MatchStatus::Duplicate {
                return Err(invalid(record, &event));
            }
            StagingRecord {
                is_selected: *selected,
                ..record.clone()
            }
        }

        StagingEvent::MarkDuplicate {
            group_id,
            matched_customer,
        } => StagingRecord {
            match_status: MatchStatus::Duplicate,
            matched_customer: matched_customer.clone(),
            similar_candidates: Vec::new(),
            conflict: None,
            duplicate_group_id: group_id.clone(),
            is_selected: false,
            is_resolved: true,
            ..record.clone()
        },
    };

    debug!(
        staging_id = %record.staging_id,
        event = event.name(),
        from = %record.match_status,
        to = %next.match_status,
        "暂存记录状态转换"
    );
    Ok(next)
}

fn verified_with(
    record: &StagingRecord,
    customer: Customer,
    confidence: MatchConfidence,
) -> StagingRecord {
    StagingRecord {
        match_status: MatchStatus::Verified,
        matched_customer: Some(customer),
        confidence,
        similar_candidates: Vec::new(),
        conflict: None,
        is_selected: true,
        is_resolved: true,
        ..record.clone()
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
