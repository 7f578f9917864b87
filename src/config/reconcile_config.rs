// ==========================================
// 货运集拼导入核心 - 对账参数
// ==========================================
// 来源: ImportConfigReader(config_kv 覆写) → 缺省值
// 约束: commit_batch_size ≤ max_store_batch_size
// ==========================================

use crate::config::import_config_trait::{ConfigError, ImportConfigReader};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub verified_threshold: f64,
    pub similar_threshold: f64,
    pub fuzzy_name_threshold: f64,
    pub region_name_threshold: f64,
    pub min_phone_digits: usize,
    pub candidate_limit: usize,
    pub parse_chunk_size: usize,
    pub commit_batch_size: usize,
    pub max_store_batch_size: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            verified_threshold: 0.95,
            similar_threshold: 0.70,
            fuzzy_name_threshold: 0.70,
            region_name_threshold: 0.50,
            min_phone_digits: 8,
            candidate_limit: 5,
            parse_chunk_size: 200,
            commit_batch_size: 400,
            max_store_batch_size: 500,
        }
    }
}

impl ReconcileConfig {
    /// 从配置读取器装配
    pub async fn load<C: ImportConfigReader + ?Sized>(reader: &C) -> Result<Self, ConfigError> {
        let config = Self {
            verified_threshold: reader.get_verified_threshold().await?,
            similar_threshold: reader.get_similar_threshold().await?,
            fuzzy_name_threshold: reader.get_fuzzy_name_threshold().await?,
            region_name_threshold: reader.get_region_name_threshold().await?,
            min_phone_digits: reader.get_min_phone_digits().await?,
            candidate_limit: reader.get_candidate_limit().await?,
            parse_chunk_size: reader.get_parse_chunk_size().await?,
            commit_batch_size: reader.get_commit_batch_size().await?,
            max_store_batch_size: reader.get_max_store_batch_size().await?,
        };
        Ok(config.normalized())
    }

    /// 修正越界取值
    pub fn normalized(mut self) -> Self {
        self.max_store_batch_size = self.max_store_batch_size.max(1);
        self.commit_batch_size = self.commit_batch_size.clamp(1, self.max_store_batch_size);
        self.parse_chunk_size = self.parse_chunk_size.max(1);
        if self.similar_threshold > self.verified_threshold {
            tracing::warn!(
                similar = self.similar_threshold,
                verified = self.verified_threshold,
                "SIMILAR 阈值高于 VERIFIED 阈值,已对齐"
            );
            self.similar_threshold = self.verified_threshold;
        }
        self
    }
}
