// ==========================================
// 货运集拼导入核心 - 客户主数据 Repository Trait
// ==========================================
// 职责: 定义客户主数据访问接口(不包含业务逻辑)
// 红线: 对账核心只经由 upsert / update_fields 两条窄通道写主数据
// ==========================================

use crate::domain::customer::{Customer, CustomerPatch};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// CustomerRepository Trait
// ==========================================
// 实现者: CustomerRepositoryImpl(使用 rusqlite)
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// 读取全部客户(对账会话开始时的快照)
    async fn list_customers(&self) -> RepositoryResult<Vec<Customer>>;

    /// 按 ID 查询
    ///
    /// # 返回
    /// - Ok(None): 不存在
    async fn find_by_id(&self, customer_id: &str) -> RepositoryResult<Option<Customer>>;

    /// 按 ID 新增或整体替换客户
    ///
    /// # 错误
    /// - UniqueConstraintViolation: 标准化姓名与其他客户重复
    async fn upsert_customer(&self, customer: &Customer) -> RepositoryResult<()>;

    /// 部分字段覆写(仅电话/地区/地址)
    ///
    /// # 错误
    /// - NotFound: 客户不存在
    async fn update_customer_fields(
        &self,
        customer_id: &str,
        patch: &CustomerPatch,
    ) -> RepositoryResult<()>;
}
