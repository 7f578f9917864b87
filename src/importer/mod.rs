// ==========================================
// 货运集拼导入核心 - 导入层
// ==========================================
// 职责: 粘贴文本 → ParsedRow 列表 + 同批次重复组
// 支持: 制表符分隔 / 多空格分隔,有表头 / 无表头
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod duplicate_detector;
pub mod error;
pub mod field_mapper;
pub mod importer_trait;
pub mod manifest_parser;
pub mod phone_extractor;

// 重导出核心类型
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use duplicate_detector::DuplicateDetector as DuplicateDetectorImpl;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper as FieldMapperImpl;
pub use manifest_parser::ManifestParser;
pub use phone_extractor::{extract_from_sources, extract_phone};

// 重导出 Trait 接口
pub use importer_trait::{DataCleaner, DuplicateDetector, FieldMapper};
