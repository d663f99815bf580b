//
//  config.rs
//  Lattice
//
//  Created by hak (tharun)
//

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Resolution pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Hard depth limit for the inheritance walk.
    #[serde(default = "default_inheritance_depth")]
    pub max_inheritance_depth: usize,
    /// Upper bound on fuzzy-search candidates considered before ranking.
    #[serde(default = "default_fuzzy_candidates")]
    pub max_fuzzy_candidates: usize,
}

/// Analytics iteration caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// PageRank iteration cap.
    #[serde(default = "default_pagerank_iterations")]
    pub max_pagerank_iterations: usize,
    /// Community detection level cap.
    #[serde(default = "default_community_levels")]
    pub max_community_levels: usize,
    /// Local-move sweeps per community level.
    #[serde(default = "default_community_sweeps")]
    pub max_community_sweeps: usize,
    /// Hard ceiling for enumerated cycles per call.
    #[serde(default = "default_cycle_limit")]
    pub max_cycle_limit: usize,
}

/// Per-tool timeout settings, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_timeout_hotspots")]
    pub hotspots_timeout_secs: u64,
    #[serde(default = "default_timeout_dead_code")]
    pub dead_code_timeout_secs: u64,
    #[serde(default = "default_timeout_cycles")]
    pub cycles_timeout_secs: u64,
    #[serde(default = "default_timeout_communities")]
    pub communities_timeout_secs: u64,
    #[serde(default = "default_timeout_path")]
    pub path_timeout_secs: u64,
    #[serde(default = "default_timeout")]
    pub default_timeout_secs: u64,
}

fn default_inheritance_depth() -> usize {
    8
}

fn default_fuzzy_candidates() -> usize {
    200
}

fn default_pagerank_iterations() -> usize {
    100
}

fn default_community_levels() -> usize {
    10
}

fn default_community_sweeps() -> usize {
    50
}

fn default_cycle_limit() -> usize {
    100
}

fn default_timeout_hotspots() -> u64 {
    5
}

fn default_timeout_dead_code() -> u64 {
    10
}

fn default_timeout_cycles() -> u64 {
    15
}

fn default_timeout_communities() -> u64 {
    30
}

fn default_timeout_path() -> u64 {
    10
}

fn default_timeout() -> u64 {
    10
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            max_inheritance_depth: default_inheritance_depth(),
            max_fuzzy_candidates: default_fuzzy_candidates(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            max_pagerank_iterations: default_pagerank_iterations(),
            max_community_levels: default_community_levels(),
            max_community_sweeps: default_community_sweeps(),
            max_cycle_limit: default_cycle_limit(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            hotspots_timeout_secs: default_timeout_hotspots(),
            dead_code_timeout_secs: default_timeout_dead_code(),
            cycles_timeout_secs: default_timeout_cycles(),
            communities_timeout_secs: default_timeout_communities(),
            path_timeout_secs: default_timeout_path(),
            default_timeout_secs: default_timeout(),
        }
    }
}

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Timeout for a tool, by tool name.
    pub fn timeout_for(&self, tool: &str) -> Duration {
        let secs = match tool {
            "find_hotspots" => self.tools.hotspots_timeout_secs,
            "find_dead_code" => self.tools.dead_code_timeout_secs,
            "find_cycles" => self.tools.cycles_timeout_secs,
            "detect_communities" => self.tools.communities_timeout_secs,
            "find_path" => self.tools.path_timeout_secs,
            _ => self.tools.default_timeout_secs,
        };
        Duration::from_secs(secs)
    }
}
