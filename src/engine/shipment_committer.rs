// ==========================================
// 货运集拼导入核心 - 运单提交器
// ==========================================
// 流程: 过滤可提交记录 → 按批切分 → 逐批:
//       UPDATE_MASTER 主数据覆写(尽力而为) → 单事务写入运单
// 失败策略: 主数据覆写失败只记录不阻断; 整批失败记入逐行错误后继续下一批
// ==========================================

use crate::domain::staging::{
    CommitOutcome, CommitRowError, ShipmentRecord, StagingRecord,
};
use crate::domain::types::{ConflictResolution, MatchStatus};
use crate::repository::customer_repo::CustomerRepository;
use crate::repository::shipment_repo::ShipmentRepository;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ShipmentCommitter
// ==========================================
pub struct ShipmentCommitter {
    customer_repo: Arc<dyn CustomerRepository>,
    shipment_repo: Arc<dyn ShipmentRepository>,
    batch_size: usize,
}

impl ShipmentCommitter {
    /// # 参数
    /// - batch_size: 每批行数(不超过存储端单事务上限)
    pub fn new(
        customer_repo: Arc<dyn CustomerRepository>,
        shipment_repo: Arc<dyn ShipmentRepository>,
        batch_size: usize,
    ) -> Self {
        let limit = shipment_repo.max_batch_size().max(1);
        Self {
            customer_repo,
            shipment_repo,
            batch_size: batch_size.clamp(1, limit),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 提交暂存记录
    ///
    /// # 参数
    /// - records: 待提交记录(内部再次过滤提交资格)
    /// - quantities: 落库数量(stagingId → 数量,缺省取原始数量;组主行为合并数量)
    /// - voyage_id: 航次
    ///
    /// # 返回
    /// - CommitOutcome: 保存数 / 逐行错误 / 批次数 / 已提交 ID
    #[instrument(skip_all, fields(records = records.len(), batch_size = self.batch_size))]
    pub async fn commit(
        &self,
        records: &[StagingRecord],
        quantities: &HashMap<String, u32>,
        voyage_id: Option<&str>,
    ) -> CommitOutcome {
        let mut outcome = CommitOutcome::default();
        let eligible: Vec<&StagingRecord> =
            records.iter().filter(|r| r.is_commit_eligible()).collect();

        if eligible.is_empty() {
            info!("无可提交记录");
            return outcome;
        }

        for (batch_no, chunk) in eligible.chunks(self.batch_size).enumerate() {
            outcome.batch_count += 1;
            info!(batch = batch_no + 1, size = chunk.len(), "开始提交批次");

            // 主数据覆写先于运单写入
            for record in chunk {
                self.apply_master_update(record, &mut outcome).await;
            }

            let mut shipments = Vec::with_capacity(chunk.len());
            let mut staged_ids = Vec::with_capacity(chunk.len());
            for record in chunk {
                match build_shipment(record, quantities, voyage_id) {
                    Some(shipment) => {
                        staged_ids.push(record.staging_id.clone());
                        shipments.push(shipment);
                    }
                    None => outcome.errors.push(CommitRowError {
                        staging_id: record.staging_id.clone(),
                        row_index: record.row_index(),
                        message: "缺少关联客户".to_string(),
                    }),
                }
            }

            match self.shipment_repo.commit_shipments(&shipments).await {
                Ok(saved) => {
                    outcome.saved_count += saved;
                    outcome.committed_staging_ids.extend(staged_ids);
                    info!(batch = batch_no + 1, saved, "批次提交完成");
                }
                Err(e) => {
                    error!(batch = batch_no + 1, error = %e, "批次提交失败,继续下一批");
                    let message = e.to_string();
                    for s in &shipments {
                        outcome.errors.push(CommitRowError {
                            staging_id: s.staging_id.clone(),
                            row_index: s.row_index,
                            message: message.clone(),
                        });
                    }
                }
            }
        }

        info!(
            saved = outcome.saved_count,
            failed = outcome.errors.len(),
            batches = outcome.batch_count,
            master_updates = outcome.master_updates,
            "提交结束"
        );
        outcome
    }

    async fn apply_master_update(&self, record: &StagingRecord, outcome: &mut CommitOutcome) {
        if record.match_status != MatchStatus::Conflict {
            return;
        }
        let Some(conflict) = record.conflict.as_ref() else {
            return;
        };
        if conflict.resolution != ConflictResolution::UpdateMaster {
            return;
        }

        let patch = conflict.to_patch();
        if patch.is_empty() {
            return;
        }

        match self
            .customer_repo
            .update_customer_fields(&conflict.customer_id, &patch)
            .await
        {
            Ok(()) => outcome.master_updates += 1,
            Err(e) => {
                warn!(
                    customer_id = %conflict.customer_id,
                    staging_id = %record.staging_id,
                    error = %e,
                    "主数据覆写失败,运单照常写入"
                );
                outcome
                    .master_update_failures
                    .push(conflict.customer_id.clone());
            }
        }
    }
}

/// 暂存记录 → 运单
///
/// 电话/地区取编辑值(冲突裁决后即导入值),缺省回落主数据
fn build_shipment(
    record: &StagingRecord,
    quantities: &HashMap<String, u32>,
    voyage_id: Option<&str>,
) -> Option<ShipmentRecord> {
    let customer = record.matched_customer.as_ref()?;
    let customer_id = record
        .conflict
        .as_ref()
        .map(|c| c.customer_id.clone())
        .unwrap_or_else(|| customer.id.clone());

    let qty = quantities
        .get(&record.staging_id)
        .copied()
        .unwrap_or(record.raw.qty);

    let raw = &record.raw;
    Some(ShipmentRecord {
        shipment_id: Uuid::new_v4().to_string(),
        staging_id: record.staging_id.clone(),
        row_index: raw.row_index,
        voyage_id: voyage_id.map(|v| v.to_string()),
        customer_id,
        customer_name: customer.name.clone(),
        phone: record.edited.phone.clone().or_else(|| customer.phone.clone()),
        region: record.edited.region.clone().or_else(|| customer.region.clone()),
        address: raw.address.clone().or_else(|| customer.address_detail.clone()),
        qty,
        weight: raw.weight,
        courier: raw.courier.clone(),
        nationality: raw.nationality.clone(),
        classification: raw.classification.clone(),
        feature: raw.feature.clone(),
        invoice: raw.invoice.clone(),
        cargo_category: raw.cargo_category.clone(),
        cargo_desc: raw.cargo_desc.clone(),
        arrival_date: raw.arrival_date.clone(),
        pod_code: customer.pod_code,
        discount_percent: customer.discount_percent,
        created_at: Utc::now(),
    })
}
