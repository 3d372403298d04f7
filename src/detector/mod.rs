//! 检测模块：链接追踪参数检测核心逻辑
pub mod engine;
pub mod heuristics;
pub mod report;
pub mod detector;

// 导出核心接口
pub use self::engine::RuleEngine;
pub use self::heuristics::{
    HeuristicCheck, HeuristicRegistry, QueryParamCheck, ShortLinkHostCheck, TRACKING_SHORT_LINK_HOSTS,
    heuristic_error,
};
pub use self::report::{Complaint, ComplaintKind, LinkCandidate, Report, ReportAssembler, ReportEntry};
pub use self::detector::TrackingDetector;
