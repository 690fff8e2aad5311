//! Typed search queries.
//!
//! A `Query` is validated when constructed and never changes afterwards.
//! Anything that fails validation is rejected here, before a single probe runs.

use crate::errors::{FootprintError, FootprintResult};
use serde::{Deserialize, Serialize};

const MAX_USERNAME_LEN: usize = 64;
const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

/// The kind of identifier being searched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Email,
    Username,
    Phone,
    Name,
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryType::Email => write!(f, "email"),
            QueryType::Username => write!(f, "username"),
            QueryType::Phone => write!(f, "phone"),
            QueryType::Name => write!(f, "name"),
        }
    }
}

/// One logical search subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Email(String),
    Username(String),
    Phone {
        number: String,
        /// ISO 3166-1 alpha-2 hint for national-format numbers
        region: Option<String>,
    },
    Name {
        first: String,
        last: String,
        /// Two-letter state/region hint
        state: Option<String>,
    },
}

impl Query {
    /// Build a validated email query
    pub fn email(address: &str) -> FootprintResult<Self> {
        let address = address.trim();
        let (local, domain) = address
            .rsplit_once('@')
            .ok_or_else(|| FootprintError::invalid_query("email", address, "missing '@'"))?;

        let local_ok = !local.is_empty()
            && local.starts_with(|c: char| c.is_ascii_alphanumeric())
            && local
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+'));
        if !local_ok {
            return Err(FootprintError::invalid_query("email", address, "malformed local part"));
        }

        let domain_ok = domain.contains('.')
            && domain.split('.').all(|label| {
                !label.is_empty()
                    && !label.starts_with('-')
                    && !label.ends_with('-')
                    && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            });
        if !domain_ok {
            return Err(FootprintError::invalid_query("email", address, "malformed domain"));
        }

        Ok(Query::Email(address.to_string()))
    }

    /// Build a validated username query
    pub fn username(name: &str) -> FootprintResult<Self> {
        let name = name.trim().trim_start_matches('@');
        if name.is_empty() {
            return Err(FootprintError::invalid_query("username", name, "empty username"));
        }
        if name.len() > MAX_USERNAME_LEN {
            return Err(FootprintError::invalid_query(
                "username",
                name,
                format!("longer than {} characters", MAX_USERNAME_LEN),
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(FootprintError::invalid_query(
                "username",
                name,
                "only letters, digits, '.', '_' and '-' are allowed",
            ));
        }
        Ok(Query::Username(name.to_string()))
    }

    /// Build a validated phone query
    pub fn phone(number: &str, region: Option<&str>) -> FootprintResult<Self> {
        let number = number.trim();
        if !number
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')' | '.'))
        {
            return Err(FootprintError::invalid_query("phone", number, "unexpected characters"));
        }
        if number.chars().skip(1).any(|c| c == '+') {
            return Err(FootprintError::invalid_query("phone", number, "'+' must lead the number"));
        }

        let digits = number.chars().filter(|c| c.is_ascii_digit()).count();
        if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
            return Err(FootprintError::invalid_query(
                "phone",
                number,
                format!("expected {}-{} digits, got {}", MIN_PHONE_DIGITS, MAX_PHONE_DIGITS, digits),
            ));
        }

        let region = match region.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) if r.len() == 2 && r.chars().all(|c| c.is_ascii_alphabetic()) => {
                Some(r.to_ascii_uppercase())
            }
            Some(r) => {
                return Err(FootprintError::invalid_query(
                    "phone",
                    number,
                    format!("region '{}' is not a two-letter country code", r),
                ))
            }
            None => None,
        };

        Ok(Query::Phone {
            number: number.to_string(),
            region,
        })
    }

    /// Build a validated name query
    pub fn name(first: &str, last: &str, state: Option<&str>) -> FootprintResult<Self> {
        let first = first.trim();
        let last = last.trim();
        if first.is_empty() || last.is_empty() {
            return Err(FootprintError::invalid_query(
                "name",
                format!("{} {}", first, last).trim().to_string(),
                "both first and last name are required",
            ));
        }

        let state = match state.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) if s.chars().all(|c| c.is_ascii_alphabetic()) => Some(s.to_ascii_uppercase()),
            Some(s) => {
                return Err(FootprintError::invalid_query(
                    "name",
                    format!("{} {}", first, last),
                    format!("state '{}' must be alphabetic", s),
                ))
            }
            None => None,
        };

        Ok(Query::Name {
            first: first.to_string(),
            last: last.to_string(),
            state,
        })
    }

    pub fn query_type(&self) -> QueryType {
        match self {
            Query::Email(_) => QueryType::Email,
            Query::Username(_) => QueryType::Username,
            Query::Phone { .. } => QueryType::Phone,
            Query::Name { .. } => QueryType::Name,
        }
    }

    /// Display form used as the profile's `query` field
    pub fn display(&self) -> String {
        match self {
            Query::Email(address) => address.clone(),
            Query::Username(name) => name.clone(),
            Query::Phone { number, .. } => number.clone(),
            Query::Name { first, last, state } => match state {
                Some(state) => format!("{} {}, {}", first, last, state),
                None => format!("{} {}", first, last),
            },
        }
    }

    /// Username derived from an email's local part (`+tag` suffixes dropped)
    pub fn derived_username(&self) -> Option<Query> {
        let Query::Email(address) = self else {
            return None;
        };
        let local = address.rsplit_once('@').map(|(local, _)| local)?;
        let base = local.split('+').next().unwrap_or(local);
        Query::username(base).ok()
    }
}
