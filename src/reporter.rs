//! Console and JSON rendering of a finished profile.

use crate::errors::{FootprintError, FootprintResult};
use crate::models::{
    EmailSummary, NameSummary, PhoneSummary, Profile, ProfileHit, RiskSummary, UsernameSummary,
};
use crate::search::RiskBand;
use console::style;
use serde_json::Value;
use std::fmt::Write as _;
use std::path::Path;

/// Render the human-readable summary block
pub fn render_summary(profile: &Profile) -> String {
    let mut out = String::new();
    let band = RiskBand::from_score(profile.risk_score);

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", style("🛰️  FOOTPRINT REPORT").cyan().bold());
    let _ = writeln!(out, "═══════════════════════════════════════");
    let _ = writeln!(out, "🎯 Query: {} ({})", style(&profile.query).white().bold(), profile.query_type);
    let _ = writeln!(
        out,
        "📊 Risk score: {} {}",
        styled_band(band, &format!("{}/100", profile.risk_score)),
        styled_band(band, band.label())
    );

    match &profile.summary {
        RiskSummary::Username(summary) => render_username(&mut out, summary),
        RiskSummary::Email(summary) => render_email(&mut out, summary),
        RiskSummary::Phone(summary) => render_phone(&mut out, summary),
        RiskSummary::Name(summary) => render_name(&mut out, summary),
    }

    let failures: Vec<String> = profile
        .results
        .iter()
        .filter_map(|r| {
            r.failure_kind()
                .filter(|kind| *kind != "not_found")
                .map(|kind| format!("{} ({})", r.source, kind))
        })
        .collect();
    if !failures.is_empty() {
        let _ = writeln!(out, "\n⚠️  {} sources did not answer", failures.len());
        for failure in failures {
            let _ = writeln!(out, "   {} {}", style("·").dim(), style(failure).dim());
        }
    }

    let _ = writeln!(out, "\n💡 {}", profile.recommendation);
    out
}

pub fn print_summary(profile: &Profile) {
    print!("{}", render_summary(profile));
}

/// Write the full profile as pretty JSON
pub fn write_json_report(profile: &Profile, path: &Path) -> FootprintResult<()> {
    let json = profile.to_json_pretty()?;
    std::fs::write(path, json).map_err(|e| FootprintError::io(e, Some(path.to_path_buf())))?;
    log::info!("JSON report written to {}", path.display());
    Ok(())
}

fn styled_band(band: RiskBand, text: &str) -> String {
    let styled = match band {
        RiskBand::Critical => style(text).red().bold(),
        RiskBand::High => style(text).red(),
        RiskBand::Moderate => style(text).yellow(),
        RiskBand::Low => style(text).green(),
        RiskBand::Minimal => style(text).green().dim(),
    };
    styled.to_string()
}

fn render_profiles(out: &mut String, profiles: &[ProfileHit], total: usize) {
    if profiles.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n🔍 PROFILES");
    for hit in profiles {
        let marker = if hit.sensitive {
            style("🔞").red().to_string()
        } else {
            style("✔").green().to_string()
        };
        let _ = writeln!(
            out,
            "   {} {} {}",
            marker,
            style(&hit.platform).white().bold(),
            hit.url.as_deref().unwrap_or("")
        );
    }
    if total > profiles.len() {
        let _ = writeln!(out, "   ... and {} more", total - profiles.len());
    }
}

fn render_username(out: &mut String, summary: &UsernameSummary) {
    let _ = writeln!(out, "👤 Profiles found: {}", summary.total_profiles);
    if summary.adult_profiles_found > 0 {
        let _ = writeln!(
            out,
            "{}",
            style(format!("🚨 Sensitive-category profiles: {}", summary.adult_profiles_found))
                .red()
                .bold()
        );
    }
    let _ = writeln!(out, "🧭 Sources checked: {}", summary.sources_checked);
    render_profiles(out, &summary.profiles, summary.total_profiles);
}

fn render_email(out: &mut String, summary: &EmailSummary) {
    let _ = writeln!(out, "🔓 Breaches found: {}", summary.breaches_found);
    for breach in &summary.breaches {
        let _ = writeln!(out, "   {} {}", style("•").red(), breach);
    }
    let _ = writeln!(out, "👤 Linked profiles: {}", summary.social_profiles);
    if summary.adult_profiles_found > 0 {
        let _ = writeln!(
            out,
            "{}",
            style(format!("🚨 Sensitive-category profiles: {}", summary.adult_profiles_found))
                .red()
                .bold()
        );
    }
    let _ = writeln!(out, "🧭 Sources checked: {}", summary.sources_checked);
    render_profiles(out, &summary.profiles, summary.social_profiles);
}

fn render_phone(out: &mut String, summary: &PhoneSummary) {
    let validity = if summary.valid {
        style("valid").green().to_string()
    } else {
        style("not validated").yellow().to_string()
    };
    let _ = writeln!(out, "📞 Number: {}", validity);
    let rows = [
        ("Formatted", summary.formatted.clone()),
        ("Country", summary.country.clone()),
        ("Carrier", summary.carrier.clone()),
        ("Line type", summary.line_type.map(|t| t.to_string())),
        ("Location", summary.location.clone()),
    ];
    for (label, value) in rows {
        if let Some(value) = value {
            let _ = writeln!(out, "   ├─ {}: {}", label, style(value).white().bold());
        }
    }
    let _ = writeln!(out, "🧭 Sources checked: {}", summary.sources_checked);
}

fn value_str<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

fn render_name(out: &mut String, summary: &NameSummary) {
    let _ = writeln!(out, "⚖️  Court records: {}", summary.legal_cases_found);
    for case in &summary.legal_cases {
        let _ = writeln!(
            out,
            "   {} {} {}",
            style("•").yellow(),
            value_str(case, "case_name"),
            style(format!("({}, {})", value_str(case, "court"), value_str(case, "date_filed"))).dim()
        );
    }
    if !summary.people_profiles.is_empty() {
        let _ = writeln!(out, "👥 People-data matches: {}", summary.people_profiles.len());
        for person in &summary.people_profiles {
            let _ = writeln!(
                out,
                "   {} {} {}",
                style("•").cyan(),
                value_str(person, "full_name"),
                style(value_str(person, "location")).dim()
            );
        }
    }
    if !summary.manual_search_links.is_empty() {
        let _ = writeln!(out, "🔗 Manual search links:");
        for link in &summary.manual_search_links {
            let _ = writeln!(out, "   {}: {}", value_str(link, "site"), value_str(link, "url"));
        }
    }
    let _ = writeln!(out, "🧭 Sources checked: {}", summary.sources_checked);
}
