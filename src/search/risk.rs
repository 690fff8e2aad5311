//! Risk scoring.
//!
//! Every scorer is a pure function of a summary (plus raw phone results for
//! line classification). Sensitive-category overrides are checked before any
//! additive weighting, and every score is clamped to 0..=100.

use super::normalize::line_classes;
use crate::models::{EmailSummary, LineType, NameSummary, PhoneSummary, SourceResult, UsernameSummary};
use serde::Serialize;

pub const MAX_SCORE: u8 = 100;

const PHONE_BASE: i32 = 50;
const PHONE_VOIP: i32 = 30;
const PHONE_PREPAID: i32 = 20;
const PHONE_VALID: i32 = -10;
const PHONE_CARRIER_KNOWN: i32 = -5;

const NAME_BASE: u32 = 30;
const NAME_PER_CASE: u32 = 5;
const NAME_CASES_CAP: u32 = 30;
const NAME_PEOPLE_MATCH: u32 = 20;

const EMAIL_PER_BREACH: u64 = 15;

fn clamp(score: i64) -> u8 {
    score.clamp(0, i64::from(MAX_SCORE)) as u8
}

/// Exposure from the deduplicated hit count
pub fn score_username(summary: &UsernameSummary) -> u8 {
    if summary.adult_profiles_found > 0 {
        return MAX_SCORE;
    }
    match summary.total_profiles {
        n if n >= 10 => 80,
        n if n >= 5 => 60,
        n if n >= 2 => 40,
        n if n >= 1 => 20,
        _ => 10,
    }
}

/// Each adjustment applies at most once per search, whichever source reports it
pub fn score_phone(summary: &PhoneSummary, results: &[SourceResult]) -> u8 {
    let classes = line_classes(results);
    let mut score = PHONE_BASE;
    if classes.contains(&LineType::Voip) {
        score += PHONE_VOIP;
    }
    if classes.contains(&LineType::Prepaid) {
        score += PHONE_PREPAID;
    }
    if summary.valid {
        score += PHONE_VALID;
    }
    if summary.carrier.is_some() {
        score += PHONE_CARRIER_KNOWN;
    }
    clamp(i64::from(score))
}

pub fn score_name(summary: &NameSummary) -> u8 {
    let cases = u32::try_from(summary.legal_cases_found).unwrap_or(u32::MAX);
    let mut score = NAME_BASE + cases.saturating_mul(NAME_PER_CASE).min(NAME_CASES_CAP);
    if !summary.people_profiles.is_empty() {
        score += NAME_PEOPLE_MATCH;
    }
    clamp(i64::from(score))
}

/// Breaches plus half the derived username's score; a sensitive hit on the
/// username overrides everything
pub fn score_email(summary: &EmailSummary, username_score: u8) -> u8 {
    if summary.adult_profiles_found > 0 {
        return MAX_SCORE;
    }
    let breaches = summary.breaches_found.saturating_mul(EMAIL_PER_BREACH);
    let score = breaches.saturating_add(u64::from(username_score / 2));
    score.min(u64::from(MAX_SCORE)) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskBand {
    Critical,
    High,
    Moderate,
    Low,
    Minimal,
}

impl RiskBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => RiskBand::Critical,
            60..=79 => RiskBand::High,
            40..=59 => RiskBand::Moderate,
            20..=39 => RiskBand::Low,
            _ => RiskBand::Minimal,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskBand::Critical => "CRITICAL",
            RiskBand::High => "HIGH",
            RiskBand::Moderate => "MODERATE",
            RiskBand::Low => "LOW",
            RiskBand::Minimal => "MINIMAL",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskBand::Critical => {
                "CRITICAL: Immediate action required. Change all passwords, enable 2FA on all accounts, and consider identity monitoring."
            }
            RiskBand::High => {
                "HIGH RISK: Change passwords for any breached accounts. Enable 2FA. Review account activity."
            }
            RiskBand::Moderate => {
                "MODERATE RISK: Review exposed accounts. Consider changing passwords and enabling 2FA."
            }
            RiskBand::Low => {
                "LOW RISK: Your digital footprint exists. Ensure strong, unique passwords and 2FA where available."
            }
            RiskBand::Minimal => "MINIMAL EXPOSURE: Good security hygiene. Continue monitoring periodically.",
        }
    }
}

pub fn recommendation(score: u8) -> &'static str {
    RiskBand::from_score(score).recommendation()
}
