//! Result normalization: flatten reported profiles into `ProfileHit`s,
//! deduplicate them by canonical URL, and build per-type summaries.
//!
//! Everything here is a pure function of the input slice. Input order is
//! submission order, which decides which source "owns" a duplicated hit.

use crate::models::{
    EmailSummary, LineType, NameSummary, PhoneSummary, ProfileHit, SourceResult, UsernameSummary,
};
use crate::sources::people::MANUAL_LINKS_KEY;
use crate::sources::phone::LINE_CLASS_KEY;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};

/// Legal case entries kept in a name summary
pub const LEGAL_CASE_DISPLAY_LIMIT: usize = 5;

/// Dedup key for a profile URL.
///
/// Lowercases scheme and host, drops a leading `www.`, the fragment and any
/// trailing slash. Path case is kept; unparseable input is only trimmed.
pub fn canonical_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = url::Url::parse(trimmed) else {
        return trimmed.trim_end_matches('/').to_string();
    };

    url.set_fragment(None);
    if let Some(host) = url.host_str().map(str::to_lowercase) {
        if let Some(bare) = host.strip_prefix("www.") {
            let _ = url.set_host(Some(bare));
        }
    }

    let mut canonical = url.to_string();
    if url.query().is_none() {
        while canonical.ends_with('/') {
            canonical.pop();
        }
    }
    canonical
}

/// Flatten every result's reported profiles, in result order
pub fn collect_hits(results: &[SourceResult]) -> Vec<ProfileHit> {
    results
        .iter()
        .filter(|r| r.found)
        .flat_map(|result| {
            result.reported_profiles().into_iter().map(move |profile| ProfileHit {
                platform: profile.platform,
                url: profile.url.as_deref().map(canonical_url).filter(|u| !u.is_empty()),
                source: result.source.clone(),
                sensitive: profile.sensitive,
                category: profile.category,
                name: profile.name,
                email: profile.email,
                bio: profile.bio,
                location: profile.location,
            })
        })
        .collect()
}

/// First occurrence of each URL wins; URL-less hits are always kept
pub fn dedupe(hits: Vec<ProfileHit>) -> Vec<ProfileHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| match &hit.url {
            Some(url) => seen.insert(url.clone()),
            None => true,
        })
        .collect()
}

pub fn summarize_username(results: &[SourceResult], display_limit: usize) -> UsernameSummary {
    let hits = dedupe(collect_hits(results));
    let platforms: BTreeSet<String> = hits.iter().map(|h| h.platform.clone()).collect();

    UsernameSummary {
        total_profiles: hits.len(),
        adult_profiles_found: hits.iter().filter(|h| h.sensitive).count(),
        platforms: platforms.into_iter().collect(),
        profiles: hits.into_iter().take(display_limit).collect(),
        sources_checked: results.len(),
    }
}

/// Breach count reported across found results
pub fn breach_count(results: &[SourceResult]) -> u64 {
    results
        .iter()
        .filter(|r| r.found)
        .filter_map(|r| r.u64_field("breaches_found"))
        .sum()
}

/// Email summary from the breach results and the derived-username results
pub fn summarize_email(
    breach_results: &[SourceResult],
    username_summary: &UsernameSummary,
    display_limit: usize,
) -> EmailSummary {
    let breaches = breach_results
        .iter()
        .filter(|r| r.found)
        .filter_map(|r| r.data.get("breaches").and_then(Value::as_array))
        .flatten()
        .filter_map(|b| b.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .take(display_limit)
        .collect();

    EmailSummary {
        breaches_found: breach_count(breach_results),
        breaches,
        social_profiles: username_summary.total_profiles,
        adult_profiles_found: username_summary.adult_profiles_found,
        platforms: username_summary.platforms.clone(),
        profiles: username_summary.profiles.clone(),
        sources_checked: breach_results.len() + username_summary.sources_checked,
    }
}

/// Canonical line classes reported by found phone results
pub fn line_classes(results: &[SourceResult]) -> BTreeSet<LineType> {
    results
        .iter()
        .filter(|r| r.found)
        .filter_map(|r| r.str_field(LINE_CLASS_KEY))
        .filter_map(LineType::from_canonical)
        .collect()
}

pub fn summarize_phone(results: &[SourceResult]) -> PhoneSummary {
    let found: Vec<&SourceResult> = results.iter().filter(|r| r.found).collect();
    let first_str = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| found.iter().find_map(|r| r.str_field(key)))
            .map(str::to_string)
    };

    let classes: Vec<LineType> = found
        .iter()
        .filter_map(|r| r.str_field(LINE_CLASS_KEY))
        .filter_map(LineType::from_canonical)
        .collect();
    // Specific classes beat the ambiguous fixed-line-or-mobile
    let line_type = classes
        .iter()
        .copied()
        .find(|c| !matches!(c, LineType::Unknown | LineType::FixedLineOrMobile))
        .or_else(|| classes.iter().copied().find(|c| *c != LineType::Unknown))
        .or_else(|| classes.first().copied());

    PhoneSummary {
        valid: found.iter().any(|r| r.bool_field("valid")),
        formatted: first_str(&["e164", "international"]),
        country: first_str(&["country"]),
        carrier: first_str(&["carrier"]),
        line_type,
        location: first_str(&["location"]),
        sources_checked: results.len(),
    }
}

pub fn summarize_name(results: &[SourceResult]) -> NameSummary {
    let mut summary = NameSummary {
        sources_checked: results.len(),
        ..Default::default()
    };

    for result in results {
        if let Some(Value::Array(links)) = result.data.get(MANUAL_LINKS_KEY) {
            summary.manual_search_links.extend(links.iter().cloned());
        }
        if !result.found {
            continue;
        }
        if let Some(Value::Array(cases)) = result.data.get("cases") {
            summary.legal_cases_found += result.u64_field("total_results").unwrap_or(cases.len() as u64);
            let room = LEGAL_CASE_DISPLAY_LIMIT.saturating_sub(summary.legal_cases.len());
            summary.legal_cases.extend(cases.iter().take(room).cloned());
        }
        if let Some(Value::Array(people)) = result.data.get("people") {
            summary.people_profiles.extend(people.iter().cloned());
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportedProfile, PROFILES_KEY};
    use serde_json::{json, Map};

    fn presence(source: &str, platform: &str, url: &str, sensitive: bool) -> SourceResult {
        let profile = ReportedProfile {
            sensitive,
            category: sensitive.then(|| "adult".to_string()),
            ..ReportedProfile::new(platform, url)
        };
        let mut data = Map::new();
        data.insert(PROFILES_KEY.into(), Value::Array(vec![profile.to_value()]));
        SourceResult::found(source, data)
    }

    #[test]
    fn test_canonical_url() {
        assert_eq!(canonical_url("https://GitHub.com/alice/"), "https://github.com/alice");
        assert_eq!(canonical_url("https://www.github.com/alice#top"), "https://github.com/alice");
        assert_eq!(canonical_url(" https://example.com/u?id=7 "), "https://example.com/u?id=7");
        assert_eq!(canonical_url("https://example.com/"), "https://example.com");
        assert_eq!(canonical_url("not a url/"), "not a url");
    }

    #[test]
    fn test_dedupe_first_submission_wins() {
        let results = vec![
            presence("presence:github", "github", "https://github.com/alice123", false),
            presence("sherlock", "GitHub", "https://www.github.com/alice123/", false),
            presence("sherlock", "Reddit", "https://reddit.com/user/alice123", false),
        ];
        let hits = dedupe(collect_hits(&results));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "presence:github");
        assert_eq!(hits[0].platform, "github");
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let results = vec![
            presence("a", "x", "https://x.test/alice", false),
            presence("b", "x", "https://X.test/alice", true),
            presence("c", "y", "https://y.test/alice", false),
        ];
        let mut hits = collect_hits(&results);
        hits.push(ProfileHit {
            url: None,
            ..hits[0].clone()
        });
        hits.push(ProfileHit {
            url: None,
            ..hits[0].clone()
        });

        let once = dedupe(hits);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 4);
        assert!(!once[0].sensitive);
    }

    #[test]
    fn test_display_cap_does_not_touch_counts() {
        let results: Vec<SourceResult> = (0..30)
            .map(|i| presence(&format!("p{}", i), &format!("site{}", i), &format!("https://s{}.test/a", i), i % 10 == 0))
            .collect();
        let summary = summarize_username(&results, 20);
        assert_eq!(summary.total_profiles, 30);
        assert_eq!(summary.adult_profiles_found, 3);
        assert_eq!(summary.profiles.len(), 20);
        assert_eq!(summary.platforms.len(), 30);
        assert_eq!(summary.sources_checked, 30);
    }

    #[test]
    fn test_not_found_results_contribute_nothing() {
        let mut missing = presence("presence:onlyfans", "onlyfans", "https://onlyfans.com/a", true);
        missing.found = false;
        let summary = summarize_username(&[missing], 20);
        assert_eq!(summary.total_profiles, 0);
        assert_eq!(summary.adult_profiles_found, 0);
    }

    #[test]
    fn test_phone_summary_prefers_known_line_class() {
        let mut offline = Map::new();
        offline.insert("valid".into(), json!(true));
        offline.insert("e164".into(), json!("+14155550100"));
        offline.insert("country".into(), json!("US"));
        offline.insert(LINE_CLASS_KEY.into(), json!("fixed_line_or_mobile"));
        let mut validator = Map::new();
        validator.insert("carrier".into(), json!("Bandwidth"));
        validator.insert(LINE_CLASS_KEY.into(), json!("voip"));

        let results = vec![
            SourceResult::found("offline_phone", offline),
            SourceResult::found("numverify", validator),
            SourceResult::failure("veriphone", crate::models::ProbeFailure::Timeout),
        ];
        let summary = summarize_phone(&results);
        assert!(summary.valid);
        assert_eq!(summary.formatted.as_deref(), Some("+14155550100"));
        assert_eq!(summary.carrier.as_deref(), Some("Bandwidth"));
        assert_eq!(summary.line_type, Some(LineType::Voip));
        assert_eq!(summary.sources_checked, 3);

        let classes = line_classes(&results);
        assert!(classes.contains(&LineType::Voip));
        assert!(classes.contains(&LineType::Unknown));
    }

    #[test]
    fn test_name_summary() {
        let mut legal = Map::new();
        legal.insert("total_results".into(), json!(12));
        legal.insert("cases".into(), json!([{"case_name": "a"}, {"case_name": "b"}, {"case_name": "c"}, {"case_name": "d"}, {"case_name": "e"}, {"case_name": "f"}]));
        let mut people = SourceResult::failure(
            "people_data_labs",
            crate::models::ProbeFailure::NotConfigured("not configured".into()),
        );
        people.data.insert(MANUAL_LINKS_KEY.into(), json!([{"site": "Whitepages"}]));

        let summary = summarize_name(&[SourceResult::found("courtlistener", legal), people]);
        assert_eq!(summary.legal_cases_found, 12);
        assert_eq!(summary.legal_cases.len(), LEGAL_CASE_DISPLAY_LIMIT);
        assert!(summary.people_profiles.is_empty());
        assert_eq!(summary.manual_search_links.len(), 1);
    }

    #[test]
    fn test_email_summary_counts_breaches() {
        let mut data = Map::new();
        data.insert("breaches_found".into(), json!(2));
        data.insert("breaches".into(), json!([{"name": "ExampleForum"}, {"name": "ShopDB"}]));
        let breach = vec![SourceResult::found("leakcheck", data)];
        let username = UsernameSummary {
            total_profiles: 3,
            sources_checked: 5,
            ..Default::default()
        };

        let summary = summarize_email(&breach, &username, 20);
        assert_eq!(summary.breaches_found, 2);
        assert_eq!(summary.breaches, vec!["ExampleForum", "ShopDB"]);
        assert_eq!(summary.social_profiles, 3);
        assert_eq!(summary.sources_checked, 6);
    }
}
