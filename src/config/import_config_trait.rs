// ==========================================
// 货运集拼导入核心 - 导入配置读取 Trait
// ==========================================
// 职责: 定义对账流程所需的配置读取接口(不包含实现)
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

/// 配置读取错误
pub type ConfigError = Box<dyn Error + Send + Sync>;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 解析/匹配/提交阶段所需的阈值读取
// 实现者: ConfigManager(从 config_kv 表读取)
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 匹配阈值 =====

    /// VERIFIED 分数下限
    ///
    /// # 默认值
    /// - 0.95
    async fn get_verified_threshold(&self) -> Result<f64, ConfigError>;

    /// SIMILAR 分数下限
    ///
    /// # 默认值
    /// - 0.70
    async fn get_similar_threshold(&self) -> Result<f64, ConfigError>;

    /// 模糊姓名因子生效的相似度下限
    ///
    /// # 默认值
    /// - 0.70
    async fn get_fuzzy_name_threshold(&self) -> Result<f64, ConfigError>;

    /// 地区加成生效的姓名相似度下限(同时作为候选列表下限)
    ///
    /// # 默认值
    /// - 0.50
    async fn get_region_name_threshold(&self) -> Result<f64, ConfigError>;

    /// 电话参与匹配/分组的最少位数
    ///
    /// # 默认值
    /// - 8
    async fn get_min_phone_digits(&self) -> Result<usize, ConfigError>;

    /// SIMILAR 候选数量上限
    ///
    /// # 默认值
    /// - 5
    async fn get_candidate_limit(&self) -> Result<usize, ConfigError>;

    // ===== 批量处理 =====

    /// 解析时每处理多少行让出一次执行权
    ///
    /// # 默认值
    /// - 200
    async fn get_parse_chunk_size(&self) -> Result<usize, ConfigError>;

    /// 提交时每批写入行数
    ///
    /// # 默认值
    /// - 400
    async fn get_commit_batch_size(&self) -> Result<usize, ConfigError>;

    /// 外部存储单事务行数上限
    ///
    /// # 默认值
    /// - 500
    async fn get_max_store_batch_size(&self) -> Result<usize, ConfigError>;
}
