// ==========================================
// 货运集拼导入核心 - 运单 Repository Trait
// ==========================================
// 职责: 货物数据的唯一落库出口
// 约束: 单次调用 = 单个事务,批次大小受存储上限约束
// ==========================================

use crate::domain::staging::ShipmentRecord;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ShipmentRepository Trait
// ==========================================
// 实现者: ShipmentRepositoryImpl(使用 rusqlite)
#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    /// 单事务写入一批运单
    ///
    /// # 返回
    /// - Ok(usize): 写入条数
    /// - Err: 整批回滚(含 BatchTooLarge)
    async fn commit_shipments(&self, batch: &[ShipmentRecord]) -> RepositoryResult<usize>;

    /// 单事务上限
    fn max_batch_size(&self) -> usize;

    /// 按航次查询已落库运单
    async fn list_by_voyage(&self, voyage_id: &str) -> RepositoryResult<Vec<ShipmentRecord>>;

    /// 运单总数
    async fn count_shipments(&self) -> RepositoryResult<usize>;
}
