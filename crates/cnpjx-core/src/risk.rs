use crate::{CompanyProfile, RegistryRecord, RiskAssessment, RiskTier};

const BASE_SCORE: i32 = 500;
const MAX_SCORE: i32 = 1000;

/// Deterministic risk score over a normalized profile.
///
/// | Signal | Effect |
/// |--------|--------|
/// | active registration | +100 |
/// | enrolled in Simples Nacional | +50 |
/// | founded before 2010 / before 2015 | +70 / +40 |
/// | each financial / fiscal / labor issue | -30 / -50 / -40 |
///
/// The result starts at 500 and is clamped to `0..=1000`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, profile: &CompanyProfile) -> RiskAssessment {
        let score = score(profile);
        RiskAssessment {
            score,
            tier: tier_for(score),
        }
    }

    /// Failure records carry no data to score and get [`RiskAssessment::unrated`].
    pub fn assess_record(&self, record: &RegistryRecord) -> RiskAssessment {
        match record {
            RegistryRecord::Profile(profile) => self.assess(profile),
            RegistryRecord::Failure(_) => RiskAssessment::unrated(),
        }
    }
}

fn score(profile: &CompanyProfile) -> u16 {
    let mut score = BASE_SCORE;

    if profile.is_active() {
        score += 100;
    }
    if profile.simples.enrolled {
        score += 50;
    }
    match profile.founding_year() {
        Some(year) if year < 2010 => score += 70,
        Some(year) if year < 2015 => score += 40,
        _ => {}
    }

    if let Some(issues) = profile.pending_issues {
        score = score
            .saturating_sub(penalty(issues.financial, 30))
            .saturating_sub(penalty(issues.fiscal, 50))
            .saturating_sub(penalty(issues.labor, 40));
    }

    u16::try_from(score.clamp(0, MAX_SCORE)).unwrap_or(0)
}

fn penalty(count: u32, weight: i32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX).saturating_mul(weight)
}

fn tier_for(score: u16) -> RiskTier {
    match score {
        800.. => RiskTier::Low,
        600..=799 => RiskTier::Moderate,
        400..=599 => RiskTier::Medium,
        200..=399 => RiskTier::High,
        _ => RiskTier::VeryHigh,
    }
}
