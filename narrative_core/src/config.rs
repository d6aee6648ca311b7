//! Engine configuration.
//!
//! Every field has a default, so a TOML document only needs the values it
//! changes:
//!
//! ```toml
//! allow_position_actions = true
//!
//! [retrieval]
//! tier_thresholds = [70, 55, 40]
//!
//! [budgets]
//! max_impasses = 5
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::instantiation::ForbiddenMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub retrieval: RetrievalConfig,
    pub guidance: GuidanceConfig,
    pub usage: UsageConfig,
    pub budgets: BudgetConfig,
    pub instantiation: InstantiationConfig,
    /// Whether Engagement may pick actions that move characters around.
    pub allow_position_actions: bool,
    /// Whether runs keep a step-by-step trace.
    pub record_trace: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retrieval: RetrievalConfig::default(),
            guidance: GuidanceConfig::default(),
            usage: UsageConfig::default(),
            budgets: BudgetConfig::default(),
            instantiation: InstantiationConfig::default(),
            allow_position_actions: false,
            record_trace: true,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(t) = self.retrieval.tier_thresholds.iter().find(|t| **t > 100) {
            return Err(EngineError::InvalidConfig(format!(
                "tier threshold {} exceeds 100",
                t
            )));
        }
        let b = &self.guidance.novelty_breakpoints;
        if !(b.low <= b.medium && b.medium <= b.strict && b.strict <= b.high && b.high <= 100) {
            return Err(EngineError::InvalidConfig(
                "novelty breakpoints must be non-decreasing and at most 100".to_string(),
            ));
        }
        if self.budgets.max_engagement_attempts == 0
            || self.budgets.max_reflection_attempts == 0
            || self.budgets.max_story_length == 0
        {
            return Err(EngineError::InvalidConfig(
                "attempt budgets and story length must be positive".to_string(),
            ));
        }
        if self.usage.max_instance_uses == 0 || self.usage.max_template_uses == 0 {
            return Err(EngineError::InvalidConfig(
                "usage caps must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Upper bound on Engagement/Reflection cycles per run.
    pub fn max_cycles(&self) -> u32 {
        self.budgets.max_engagement_attempts
            + self.budgets.max_reflection_attempts
            + self.budgets.max_impasses
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Minimum similarity score (0-100) for tiers 1, 2 and 3.
    pub tier_thresholds: [u8; 3],
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            tier_thresholds: [60, 50, 40],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    /// Steps ahead in the exemplar curve used for tension guidance.
    pub tension_lookahead: usize,
    pub social_lookahead: usize,
    pub novelty_breakpoints: NoveltyBreakpoints,
    /// Evaluate social norms and steer by the social curve.
    pub social_analysis: bool,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            tension_lookahead: 2,
            social_lookahead: 2,
            novelty_breakpoints: NoveltyBreakpoints::default(),
            social_analysis: true,
        }
    }
}

/// Repetition percentages at which each novelty band starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoveltyBreakpoints {
    pub low: u8,
    pub medium: u8,
    pub strict: u8,
    pub high: u8,
}

impl Default for NoveltyBreakpoints {
    fn default() -> Self {
        Self {
            low: 0,
            medium: 30,
            strict: 60,
            high: 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Same template with the same characters, per story.
    pub max_instance_uses: u32,
    /// Same template with any characters, per story.
    pub max_template_uses: u32,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            max_instance_uses: 1,
            max_template_uses: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub max_engagement_attempts: u32,
    pub max_reflection_attempts: u32,
    pub max_impasses: u32,
    pub max_story_length: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_engagement_attempts: 8,
            max_reflection_attempts: 8,
            max_impasses: 3,
            max_story_length: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstantiationConfig {
    pub forbidden_characters: ForbiddenMode,
    /// Allow characters not yet in the story as a last resort.
    pub partial_instantiation: bool,
}

impl Default for InstantiationConfig {
    fn default() -> Self {
        Self {
            forbidden_characters: ForbiddenMode::HalfActive,
            partial_instantiation: true,
        }
    }
}
