// ==========================================
// 货运集拼导入核心 - 舱单导入API
// ==========================================
// 职责: 面向外壳(UI/CLI)的门面,串联 解析 → 对账 → 提交
// 约束: 每个 ImportApi 持有至多一个暂存会话; 同时只允许一个在途提交
// 约束: 在途提交期间会话只读,变更类操作返回 CommitInProgress
// 约束: 未配置运单存储后端时禁止提交
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ReconcileConfig};
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::customer::{Customer, NewCustomerDraft};
use crate::domain::manifest::DuplicateGroup;
use crate::domain::staging::{CommitOutcome, FieldEdit, StagingRecord};
use crate::domain::types::ConflictResolution;
use crate::engine::error::ReconcileResult;
use crate::engine::shipment_committer::ShipmentCommitter;
use crate::engine::staging_session::{RegistrationOutcome, StagingSession};
use crate::engine::summary::{commit_summary, session_summary};
use crate::importer::ManifestParser;
use crate::repository::{
    CustomerRepository, CustomerRepositoryImpl, ShipmentRepository, ShipmentRepositoryImpl,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// 打开会话响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSessionResponse {
    pub session_id: String,
    pub record_count: usize,
    pub has_header: bool,
    pub warnings: Vec<String>,
    /// 面向操作员的摘要文本
    pub summary: Vec<String>,
}

/// 提交响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResponse {
    pub outcome: CommitOutcome,
    pub summary: Vec<String>,
    /// 提交后仍留在工作集中的记录数
    pub remaining: usize,
}

// ==========================================
// ImportApi
// ==========================================
pub struct ImportApi {
    customer_repo: Arc<dyn CustomerRepository>,
    shipment_repo: Option<Arc<dyn ShipmentRepository>>,
    config: ReconcileConfig,
    parser: ManifestParser,
    session: Mutex<Option<StagingSession>>,
    committing: AtomicBool,
}

/// 在途提交标记,离开作用域时复位
struct CommitGuard<'a>(&'a AtomicBool);

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ImportApi {
    /// 以显式依赖创建
    ///
    /// # 参数
    /// - shipment_repo: None 表示未配置运单后端(只能对账,不能提交)
    pub fn new(
        customer_repo: Arc<dyn CustomerRepository>,
        shipment_repo: Option<Arc<dyn ShipmentRepository>>,
        config: ReconcileConfig,
    ) -> Self {
        let config = config.normalized();
        Self {
            parser: ManifestParser::new(&config),
            customer_repo,
            shipment_repo,
            config,
            session: Mutex::new(None),
            committing: AtomicBool::new(false),
        }
    }

    /// 基于 SQLite 参考后端创建(建表 + 读取 config_kv 覆写)
    pub async fn open(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        init_schema(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        let conn = Arc::new(StdMutex::new(conn));

        let config_manager = ConfigManager::from_connection(conn.clone())
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        let config = ReconcileConfig::load(&config_manager)
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        let customer_repo: Arc<dyn CustomerRepository> =
            Arc::new(CustomerRepositoryImpl::from_connection(conn.clone()));
        let shipment_repo: Arc<dyn ShipmentRepository> = Arc::new(ShipmentRepositoryImpl::from_connection(
            conn,
            config.max_store_batch_size,
        ));

        info!(db_path, "导入API已初始化");
        Ok(Self::new(customer_repo, Some(shipment_repo), config))
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn backend_configured(&self) -> bool {
        self.shipment_repo.is_some()
    }

    // ==========================================
    // 会话
    // ==========================================

    /// 解析粘贴文本并开启新会话(替换旧会话)
    ///
    /// 客户主数据在此读取一次,作为会话快照
    pub async fn open_session(
        &self,
        raw: &str,
        voyage_id: Option<String>,
    ) -> ApiResult<OpenSessionResponse> {
        let outcome = self.parser.parse(raw).await;
        let customers = self.customer_repo.list_customers().await?;
        let session = StagingSession::from_parse(outcome, customers, self.config.clone(), voyage_id);

        let response = OpenSessionResponse {
            session_id: session.session_id().to_string(),
            record_count: session.len(),
            has_header: session.has_header(),
            warnings: session.warnings().to_vec(),
            summary: session_summary(&session),
        };

        let mut slot = self.session.lock().await;
        self.ensure_idle()?;
        if let Some(old) = slot.as_ref() {
            warn!(old_session = %old.session_id(), remaining = old.len(), "旧会话被替换");
        }
        *slot = Some(session);
        Ok(response)
    }

    /// 关闭当前会话(未提交记录一并丢弃)
    pub async fn close_session(&self) -> ApiResult<()> {
        let mut slot = self.session.lock().await;
        self.ensure_idle()?;
        slot.take().ok_or(ApiError::NoSession)?;
        Ok(())
    }

    pub async fn list_records(&self) -> ApiResult<Vec<StagingRecord>> {
        self.with_session(|s| Ok(s.records().into_iter().cloned().collect()))
            .await
    }

    pub async fn list_groups(&self) -> ApiResult<Vec<DuplicateGroup>> {
        self.with_session(|s| Ok(s.groups().into_iter().cloned().collect()))
            .await
    }

    pub async fn get_record(&self, staging_id: &str) -> ApiResult<StagingRecord> {
        let record = self
            .with_session(|s| Ok(s.get(staging_id).cloned()))
            .await?;
        record.ok_or_else(|| ApiError::NotFound(format!("暂存记录(id={})不存在", staging_id)))
    }

    pub async fn session_summary(&self) -> ApiResult<Vec<String>> {
        self.with_session(|s| Ok(session_summary(s))).await
    }

    // ==========================================
    // 对账操作
    // ==========================================

    pub async fn edit(&self, staging_id: &str, edit: FieldEdit) -> ApiResult<StagingRecord> {
        self.with_idle_session(|s| s.edit(staging_id, edit).cloned()).await
    }

    pub async fn select_candidate(
        &self,
        staging_id: &str,
        customer_id: &str,
    ) -> ApiResult<StagingRecord> {
        self.with_idle_session(|s| s.select_candidate(staging_id, customer_id).cloned())
            .await
    }

    pub async fn resolve_conflict(
        &self,
        staging_id: &str,
        resolution: ConflictResolution,
    ) -> ApiResult<StagingRecord> {
        self.with_idle_session(|s| s.resolve_conflict(staging_id, resolution).cloned())
            .await
    }

    pub async fn set_selected(&self, staging_id: &str, selected: bool) -> ApiResult<StagingRecord> {
        self.with_idle_session(|s| s.set_selected(staging_id, selected).cloned())
            .await
    }

    pub async fn rematch(&self, staging_id: &str) -> ApiResult<StagingRecord> {
        self.with_idle_session(|s| s.rematch(staging_id).cloned()).await
    }

    pub async fn rematch_all(&self) -> ApiResult<Vec<StagingRecord>> {
        self.with_idle_session(|s| {
            s.rematch_all()?;
            Ok(s.records().into_iter().cloned().collect())
        })
        .await
    }

    pub async fn discard(&self, staging_id: &str) -> ApiResult<StagingRecord> {
        self.with_idle_session(|s| s.discard(staging_id)).await
    }

    /// 登记新客户并关联同名待定记录
    pub async fn register_customer(
        &self,
        staging_id: &str,
        draft: NewCustomerDraft,
    ) -> ApiResult<RegistrationOutcome> {
        let mut slot = self.session.lock().await;
        self.ensure_idle()?;
        let session = slot.as_mut().ok_or(ApiError::NoSession)?;
        let outcome = session
            .register_customer(staging_id, draft, self.customer_repo.as_ref())
            .await?;
        Ok(outcome)
    }

    /// 会话内客户快照(含本会话登记的新客户)
    pub async fn customers(&self) -> ApiResult<Vec<Customer>> {
        self.with_session(|s| Ok(s.customers().to_vec())).await
    }

    // ==========================================
    // 提交
    // ==========================================

    /// 提交当前会话中所有可提交记录
    ///
    /// # 错误
    /// - BackendNotConfigured: 未配置运单后端,不做任何尝试
    /// - CommitInProgress: 已有在途提交
    /// - NoSession: 未开启会话
    pub async fn commit(&self) -> ApiResult<CommitResponse> {
        let shipment_repo = self
            .shipment_repo
            .clone()
            .ok_or(ApiError::BackendNotConfigured)?;

        if self
            .committing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ApiError::CommitInProgress);
        }
        let _guard = CommitGuard(&self.committing);

        // 拍下待提交快照后释放会话锁,提交期间只读查询不被阻塞
        let (records, quantities, voyage_id) = {
            let slot = self.session.lock().await;
            let session = slot.as_ref().ok_or(ApiError::NoSession)?;
            (
                session.eligible_records(),
                session.commit_quantities(),
                session.voyage_id().map(|v| v.to_string()),
            )
        };

        let committer = ShipmentCommitter::new(
            self.customer_repo.clone(),
            shipment_repo,
            self.config.commit_batch_size,
        );
        let outcome = committer
            .commit(&records, &quantities, voyage_id.as_deref())
            .await;

        let remaining = {
            let mut slot = self.session.lock().await;
            match slot.as_mut() {
                Some(session) => {
                    session.remove_committed(&outcome.committed_staging_ids);
                    session.len()
                }
                None => 0,
            }
        };

        Ok(CommitResponse {
            summary: commit_summary(&outcome),
            outcome,
            remaining,
        })
    }

    async fn with_session<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&mut StagingSession) -> ReconcileResult<T>,
    {
        let mut slot = self.session.lock().await;
        let session = slot.as_mut().ok_or(ApiError::NoSession)?;
        Ok(f(session)?)
    }

    /// 变更类操作: 持会话锁后再检查在途提交
    ///
    /// 提交先置标记再取快照,快照需要会话锁,
    /// 因此持锁时看到标记未置位即保证变更先于快照
    async fn with_idle_session<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&mut StagingSession) -> ReconcileResult<T>,
    {
        let mut slot = self.session.lock().await;
        self.ensure_idle()?;
        let session = slot.as_mut().ok_or(ApiError::NoSession)?;
        Ok(f(session)?)
    }

    fn ensure_idle(&self) -> ApiResult<()> {
        if self.committing.load(Ordering::Acquire) {
            return Err(ApiError::CommitInProgress);
        }
        Ok(())
    }
}
