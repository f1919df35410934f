pub mod analysis_cache;
pub mod profile_analyzer;

pub use analysis_cache::AnalysisCache;
pub use profile_analyzer::{AnalysisOptions, ProfileAnalysis, ProfileError, analyze_profile};
