//! Fixed file and directory names used within the output directories
//!

pub const ALIGN_SETTINGS_FILENAME: &str = "align.settings.json";
pub const FLANK_STORES_FILENAME: &str = "flank.stores.json";
pub const SUPPORT_SETTINGS_FILENAME: &str = "support.settings.json";
pub const RUN_STATS_FILENAME: &str = "run.stats.json";

/// Root directory for per-gap read output
pub const GAP_SUPPORT_DIRNAME: &str = "Gap_Support";
pub const GAP_READS_FILENAME: &str = "reads.fq";
pub const SUPPORTED_GAPS_FILENAME: &str = "Supported_Gaps.txt";
