mod calculator;
mod engine;
mod error;
mod extractor;
mod names;
mod normalizer;
mod radar;
mod recommend;
mod registry;
mod report;
mod snapshot;
mod trend;

pub use calculator::{composite_index, fibonacci_weights, CompositeIndex, DomainWeight, ScoreBand};
pub use engine::{HpiEngine, Scorecard};
pub use error::{EngineError, SchemaError, UnmappedMetricWarning, ValidationError};
pub use extractor::{extract_answers, Answer, DomainAnswers, ExtractedAnswers, RawAnswerSet};
pub use normalizer::{
    normalize_domain_scores, normalize_metrics, rescale, AuxiliaryMetric, DomainScore,
    MappingStatus, MetricValue, NormalizedMetric, NormalizedMetrics,
};
pub use radar::{RadarAxis, RadarChart};
pub use recommend::{
    FocusDomain, Recommendation, RecommendationError, RecommendationRequest, Recommender,
    HISTORY_DEPTH,
};
pub use registry::{AnswerScale, DomainSpec, MetricRegistry, MetricSpec, RegistryLoadError};
pub use report::{AssessmentInsights, AssessmentReport, DomainReportEntry};
pub use snapshot::{MetricsHistory, Snapshot};
pub use trend::{
    CompositeTrend, DeltaSeries, Direction, DomainSeries, DomainTrend, RollingAverage,
    SeriesPoint, TrendAnalyzer, TrendConfig, TrendDelta, TrendResult, DEFAULT_EPSILON,
    DEFAULT_ROLLING_WINDOW,
};
