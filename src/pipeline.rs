//! 掲載データのエンリッチメント（前処理 → 生成 → 分類 → 出力）。
pub mod company;
pub mod enrich;
pub mod export;
pub mod listing;
pub mod preprocess;
pub mod prompts;
pub mod solution;

pub use company::CompanyExtractor;
pub use enrich::{EnrichOptions, Enricher, SUMMARY_FAILED};
pub use export::{ExportError, ExportPaths, export_records};
pub use listing::{RawListing, ServiceRecord};
pub use preprocess::prepare_listings;
pub use solution::SolutionCategory;
