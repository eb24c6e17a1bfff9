//! Verdict synthesis.
//!
//! Tiers and diagnoses are both decided by ordered rule lists evaluated top
//! down, first match wins. Precedence is the list order, never a magnitude
//! comparison, so the same breakdown always yields the same explanation.

use crate::config::ScoringConfig;
use crate::types::{
    CompetitionLevel, FavorableFactor, LimitingFactor, ScoreBreakdown, Verdict, VerdictTier,
};

/// Everything a verdict may look at. The breakdown carries the score; the
/// rest is marketplace and trend context.
#[derive(Debug, Clone, Copy)]
pub struct VerdictInput<'a> {
    pub breakdown: &'a ScoreBreakdown,
    /// Largest single-marketplace listing count, if any marketplace reported.
    pub max_single_marketplace: Option<u64>,
    /// Raw `1 - std/mean`; may be negative.
    pub consistency: Option<f64>,
    pub is_rising: bool,
}

// ---------------------------------------------------------------------------
// Tier rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TierRule {
    /// Supply unavailable: unscored, never ranked.
    NoSupplyData,
    /// One marketplace alone is flooded with listings.
    MarketplaceOverflow { max_single: u64 },
    /// Fixed score thresholds.
    ScoreThreshold { excellent: f64, viable: f64, risky: f64 },
}

impl TierRule {
    pub fn name(&self) -> &'static str {
        match self {
            TierRule::NoSupplyData => "no_supply_data",
            TierRule::MarketplaceOverflow { .. } => "marketplace_overflow",
            TierRule::ScoreThreshold { .. } => "score_threshold",
        }
    }

    pub fn evaluate(&self, input: &VerdictInput<'_>) -> Option<VerdictTier> {
        let b = input.breakdown;
        match self {
            TierRule::NoSupplyData => (!b.is_scored()).then_some(VerdictTier::NoData),
            TierRule::MarketplaceOverflow { max_single } => input
                .max_single_marketplace
                .filter(|n| n > max_single)
                .map(|_| VerdictTier::Avoid),
            TierRule::ScoreThreshold { excellent, viable, risky } => {
                let s = b.final_score;
                Some(if s >= *excellent {
                    VerdictTier::Excellent
                } else if s >= *viable {
                    VerdictTier::Viable
                } else if s >= *risky {
                    VerdictTier::Risky
                } else {
                    VerdictTier::Avoid
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Diagnosis rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosisRule {
    ExtremeSaturation { threshold: u64 },
    InsufficientDemand { threshold: f64 },
    /// Catch-all; always matches.
    UnfavorableRatio,
}

impl DiagnosisRule {
    #[cfg(test)]
    pub fn name(&self) -> &'static str {
        match self {
            DiagnosisRule::ExtremeSaturation { .. } => "extreme_saturation",
            DiagnosisRule::InsufficientDemand { .. } => "insufficient_demand",
            DiagnosisRule::UnfavorableRatio => "unfavorable_ratio",
        }
    }

    pub fn evaluate(&self, b: &ScoreBreakdown) -> Option<LimitingFactor> {
        match self {
            DiagnosisRule::ExtremeSaturation { threshold } => b
                .total_supply
                .filter(|n| n >= threshold)
                .map(|_| LimitingFactor::ExtremeSaturation),
            DiagnosisRule::InsufficientDemand { threshold } => {
                (b.demand_signal < *threshold).then_some(LimitingFactor::InsufficientDemand)
            }
            DiagnosisRule::UnfavorableRatio => Some(LimitingFactor::UnfavorableRatio),
        }
    }
}

/// Momentum at or above this counts as a strength worth naming.
const STRONG_MOMENTUM: f64 = 1.5;

fn favorable_factor(b: &ScoreBreakdown) -> FavorableFactor {
    if b.competition == Some(CompetitionLevel::BlueOcean) {
        FavorableFactor::BlueOceanSupply
    } else if b.momentum_multiplier >= STRONG_MOMENTUM {
        FavorableFactor::StrongMomentum
    } else {
        FavorableFactor::StrongRatio
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct VerdictGenerator {
    tier_rules: Vec<TierRule>,
    diagnosis_rules: Vec<DiagnosisRule>,
    saturation_threshold: u64,
    low_demand_threshold: f64,
}

impl VerdictGenerator {
    pub fn new(cfg: &ScoringConfig) -> Self {
        Self {
            tier_rules: vec![
                TierRule::NoSupplyData,
                TierRule::MarketplaceOverflow { max_single: cfg.max_single_marketplace },
                TierRule::ScoreThreshold {
                    excellent: cfg.verdict_excellent,
                    viable: cfg.verdict_viable,
                    risky: cfg.verdict_risky,
                },
            ],
            diagnosis_rules: vec![
                DiagnosisRule::ExtremeSaturation { threshold: cfg.saturation_high_threshold },
                DiagnosisRule::InsufficientDemand { threshold: cfg.low_demand_threshold },
                DiagnosisRule::UnfavorableRatio,
            ],
            saturation_threshold: cfg.saturation_high_threshold,
            low_demand_threshold: cfg.low_demand_threshold,
        }
    }

    #[cfg(test)]
    pub fn tier_rules(&self) -> &[TierRule] {
        &self.tier_rules
    }

    #[cfg(test)]
    pub fn diagnosis_rules(&self) -> &[DiagnosisRule] {
        &self.diagnosis_rules
    }

    /// First matching tier rule, with the rule's name.
    pub fn classify(&self, input: &VerdictInput<'_>) -> (VerdictTier, &'static str) {
        self.tier_rules
            .iter()
            .find_map(|r| r.evaluate(input).map(|t| (t, r.name())))
            .unwrap_or((VerdictTier::Avoid, "default"))
    }

    pub fn diagnose(&self, b: &ScoreBreakdown) -> LimitingFactor {
        self.diagnosis_rules
            .iter()
            .find_map(|r| r.evaluate(b))
            .unwrap_or(LimitingFactor::UnfavorableRatio)
    }

    pub fn generate(&self, input: &VerdictInput<'_>) -> Verdict {
        let b = input.breakdown;
        let (tier, rule) = self.classify(input);

        if tier == VerdictTier::NoData {
            return Verdict {
                tier,
                rule,
                diagnosis: None,
                strength: None,
                headline: "NO SUPPLY DATA: marketplace listing counts could not be retrieved; keyword left unscored.".to_string(),
                details: Vec::new(),
            };
        }

        let (diagnosis, strength) = match tier {
            VerdictTier::Excellent => (None, Some(favorable_factor(b))),
            _ => (Some(self.diagnose(b)), None),
        };

        let headline = format!(
            "{} (score {:.1}/100).",
            match tier {
                VerdictTier::Excellent => "EXCELLENT OPPORTUNITY",
                VerdictTier::Viable => "VIABLE OPPORTUNITY",
                VerdictTier::Risky => "RISKY",
                _ => "AVOID",
            },
            b.final_score
        );

        let total = b.total_supply.unwrap_or(0);
        let mut details = vec![
            format!(
                "Qualified demand of {} searches/month against {} listings ({} competition).",
                group_thousands(b.demand_signal.round() as u64),
                group_thousands(total),
                b.competition.map_or("unknown", |c| c.label()),
            ),
            format!(
                "Demand/supply ratio {:.1} with {:.2}x momentum{}.",
                b.base_ratio,
                b.momentum_multiplier,
                if input.is_rising { ", interest rising" } else { ", interest flat or falling" },
            ),
        ];
        if let Some(c) = input.consistency {
            details.push(format!(
                "Interest consistency {:.0}%.",
                c.clamp(0.0, 1.0) * 100.0
            ));
        }
        if b.saturation_penalty > 0.0 {
            details.push(format!("Saturation penalty of -{:.0} applied.", b.saturation_penalty));
        }
        if rule == "marketplace_overflow" {
            if let Some(max) = input.max_single_marketplace {
                details.push(format!(
                    "A single marketplace already lists {} products.",
                    group_thousands(max)
                ));
            }
        }

        if let Some(factor) = diagnosis {
            details.push(match factor {
                LimitingFactor::ExtremeSaturation => format!(
                    "Limiting factor: {factor}, {} listings is at or above the {} saturation line.",
                    group_thousands(total),
                    group_thousands(self.saturation_threshold),
                ),
                LimitingFactor::InsufficientDemand => format!(
                    "Limiting factor: {factor}, qualified demand is below {}.",
                    group_thousands(self.low_demand_threshold.round() as u64),
                ),
                LimitingFactor::UnfavorableRatio => format!(
                    "Limiting factor: {factor}, demand does not outweigh supply pressure {:.2}.",
                    b.supply_pressure,
                ),
            });
        }
        if let Some(factor) = strength {
            details.push(format!("Key strength: {factor}."));
        }

        Verdict { tier, rule, diagnosis, strength, headline, details }
    }
}

/// 1234567 → "1,234,567"
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
