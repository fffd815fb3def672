mod indicator;
mod rules;

pub use indicator::{
    AnalysisReport, Evidence, Indicator, IndicatorCategory, ProcessReasons, RiskLevel,
};
pub use rules::{IndicatorAnalyzer, REASON_NO_PATH, REASON_UNUSUAL_LOCATION, REASON_UNUSUAL_NAME};
