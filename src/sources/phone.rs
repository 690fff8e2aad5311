//! Phone number sources: an offline libphonenumber parse that always runs,
//! and two credentialed validation APIs (Numverify, Veriphone).
//!
//! Each source has its own line-type vocabulary. Every adapter writes the raw
//! upstream value under `line_type` and the canonical `LineType` under
//! `line_class`; only `line_class` is consumed downstream.

use super::{carry, http_error, parse_body, send, unsupported, ProbeClass, ProbeOptions, SourceAdapter};
use crate::config::{NUMVERIFY_ENV, VERIPHONE_ENV};
use crate::http::{HttpClient, HttpRequest};
use crate::models::{LineType, ProbeFailure, Query, SourceResult};
use async_trait::async_trait;
use phonenumber::metadata::DATABASE;
use phonenumber::{country, Mode, PhoneNumber, Type};
use serde_json::{Map, Value};
use std::sync::Arc;

pub const OFFLINE_SOURCE_ID: &str = "offline_phone";
pub const NUMVERIFY_SOURCE_ID: &str = "numverify";
pub const VERIPHONE_SOURCE_ID: &str = "veriphone";

/// Payload key holding the canonical classification
pub const LINE_CLASS_KEY: &str = "line_class";

const NUMVERIFY_URL: &str = "http://apilayer.net/api/validate";
const VERIPHONE_URL: &str = "https://api.veriphone.io/v2/verify";

/// Numverify `line_type` vocabulary
pub fn numverify_line_type(raw: &str) -> LineType {
    match raw.trim().to_lowercase().as_str() {
        "mobile" => LineType::Mobile,
        "landline" => LineType::FixedLine,
        "voip" => LineType::Voip,
        "toll_free" => LineType::TollFree,
        "premium_rate" => LineType::PremiumRate,
        "paging" => LineType::Pager,
        "prepaid" => LineType::Prepaid,
        _ => LineType::Unknown,
    }
}

/// Veriphone `phone_type` vocabulary (libphonenumber-style names)
pub fn veriphone_line_type(raw: &str) -> LineType {
    match raw.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
        "mobile" => LineType::Mobile,
        "fixed_line" => LineType::FixedLine,
        "fixed_line_or_mobile" => LineType::FixedLineOrMobile,
        "voip" => LineType::Voip,
        "toll_free" => LineType::TollFree,
        "premium_rate" => LineType::PremiumRate,
        "shared_cost" => LineType::SharedCost,
        "personal_number" => LineType::Personal,
        "pager" => LineType::Pager,
        "prepaid" => LineType::Prepaid,
        _ => LineType::Unknown,
    }
}

/// libphonenumber `number_type` vocabulary
pub fn libphonenumber_line_type(kind: &Type) -> LineType {
    match kind {
        Type::Mobile => LineType::Mobile,
        Type::FixedLine => LineType::FixedLine,
        Type::FixedLineOrMobile => LineType::FixedLineOrMobile,
        Type::Voip => LineType::Voip,
        Type::TollFree => LineType::TollFree,
        Type::PremiumRate => LineType::PremiumRate,
        Type::SharedCost => LineType::SharedCost,
        Type::PersonalNumber => LineType::Personal,
        Type::Pager => LineType::Pager,
        _ => LineType::Unknown,
    }
}

/// Offline parse of a phone number against the libphonenumber metadata
#[derive(Debug, Clone)]
pub struct ParsedPhone {
    number: PhoneNumber,
    pub region: Option<String>,
    pub valid: bool,
    pub number_type: Type,
}

impl ParsedPhone {
    pub fn e164(&self) -> String {
        self.number.format().mode(Mode::E164).to_string()
    }

    pub fn international(&self) -> String {
        self.number.format().mode(Mode::International).to_string()
    }

    pub fn national(&self) -> String {
        self.number.format().mode(Mode::National).to_string()
    }

    pub fn calling_code(&self) -> u16 {
        self.number.code().value()
    }

    pub fn national_number(&self) -> u64 {
        self.number.national().value()
    }

    pub fn line_type(&self) -> LineType {
        libphonenumber_line_type(&self.number_type)
    }
}

/// Parse with an optional ISO region hint for national-format input.
///
/// Without a hint the number must carry its country code (`+` prefix).
pub fn parse_phone(raw: &str, region_hint: Option<&str>) -> Result<ParsedPhone, ProbeFailure> {
    let trimmed = raw.trim();
    let hint = match region_hint {
        Some(iso) => Some(iso.trim().to_ascii_uppercase().parse::<country::Id>().map_err(|_| {
            ProbeFailure::Parse(format!("unknown region '{}'", iso))
        })?),
        None => None,
    };
    let international = trimmed
        .strip_prefix("00")
        .map(|rest| format!("+{}", rest))
        .unwrap_or_else(|| trimmed.to_string());

    let number = phonenumber::parse(hint, &international)
        .map_err(|e| ProbeFailure::Parse(format!("cannot parse '{}': {}", trimmed, e)))?;

    Ok(ParsedPhone {
        region: number.country().id().map(|id| format!("{:?}", id)),
        valid: phonenumber::is_valid(&number),
        number_type: number.number_type(&DATABASE),
        number,
    })
}

/// Always-available offline parser; no credential, no network
#[derive(Default)]
pub struct OfflinePhoneAdapter;

impl OfflinePhoneAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceAdapter for OfflinePhoneAdapter {
    fn source_id(&self) -> &str {
        OFFLINE_SOURCE_ID
    }

    fn class(&self) -> ProbeClass {
        ProbeClass::Api
    }

    async fn probe(&self, query: &Query, _options: &ProbeOptions) -> SourceResult {
        let Query::Phone { number, region } = query else {
            return unsupported(OFFLINE_SOURCE_ID, query);
        };

        let parsed = match parse_phone(number, region.as_deref()) {
            Ok(parsed) => parsed,
            Err(failure) => return SourceResult::failure(OFFLINE_SOURCE_ID, failure),
        };

        let mut data = Map::new();
        data.insert("valid".into(), Value::from(parsed.valid));
        data.insert("e164".into(), Value::from(parsed.e164()));
        data.insert("international".into(), Value::from(parsed.international()));
        data.insert("national".into(), Value::from(parsed.national()));
        data.insert("country_code".into(), Value::from(parsed.calling_code()));
        data.insert("national_number".into(), Value::from(parsed.national_number().to_string()));
        if let Some(region) = &parsed.region {
            data.insert("region".into(), Value::from(region.as_str()));
            data.insert("country".into(), Value::from(region.as_str()));
        }
        data.insert("number_type".into(), Value::from(format!("{:?}", parsed.number_type)));
        data.insert(LINE_CLASS_KEY.into(), Value::from(parsed.line_type().as_str()));

        if parsed.valid {
            SourceResult::found(OFFLINE_SOURCE_ID, data)
        } else {
            data.insert("message".into(), Value::from("Number is not valid for its region"));
            SourceResult::absent(OFFLINE_SOURCE_ID, data)
        }
    }
}

pub struct NumverifyAdapter {
    http: Arc<dyn HttpClient>,
    api_key: Option<String>,
    endpoint: String,
}

impl NumverifyAdapter {
    pub fn new(http: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            endpoint: NUMVERIFY_URL.to_string(),
        }
    }

    async fn lookup(&self, number: &str, api_key: &str, options: &ProbeOptions) -> Result<SourceResult, ProbeFailure> {
        let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
        let request = HttpRequest::get(&self.endpoint)
            .query("access_key", api_key)
            .query("number", digits)
            .query("format", "1")
            .timeout(options.timeout);

        let response = send(self.http.as_ref(), request).await?;
        if !response.is_success() {
            return Err(http_error(&response));
        }
        interpret_numverify(&parse_body(&response)?)
    }
}

pub(crate) fn interpret_numverify(body: &Value) -> Result<SourceResult, ProbeFailure> {
    if let Some(error) = body.get("error") {
        let info = error
            .get("info")
            .or_else(|| error.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(ProbeFailure::Transport(format!("numverify error: {}", info)));
    }

    if !body.get("valid").and_then(Value::as_bool).unwrap_or(false) {
        return Err(ProbeFailure::NotFound("Number not recognized as valid".into()));
    }

    let mut data = Map::new();
    data.insert("valid".into(), Value::from(true));
    carry(&mut data, "number", body.get("number"));
    carry(&mut data, "local_format", body.get("local_format"));
    carry(&mut data, "international", body.get("international_format"));
    carry(&mut data, "country", body.get("country_name"));
    carry(&mut data, "country_code", body.get("country_code"));
    carry(&mut data, "location", body.get("location"));
    carry(&mut data, "carrier", body.get("carrier"));
    carry(&mut data, "line_type", body.get("line_type"));

    let class = body
        .get("line_type")
        .and_then(Value::as_str)
        .map(numverify_line_type)
        .unwrap_or(LineType::Unknown);
    data.insert(LINE_CLASS_KEY.into(), Value::from(class.as_str()));

    Ok(SourceResult::found(NUMVERIFY_SOURCE_ID, data))
}

#[async_trait]
impl SourceAdapter for NumverifyAdapter {
    fn source_id(&self) -> &str {
        NUMVERIFY_SOURCE_ID
    }

    fn class(&self) -> ProbeClass {
        ProbeClass::Api
    }

    async fn probe(&self, query: &Query, options: &ProbeOptions) -> SourceResult {
        let Query::Phone { number, .. } = query else {
            return unsupported(NUMVERIFY_SOURCE_ID, query);
        };
        let Some(api_key) = self.api_key.as_deref() else {
            return SourceResult::failure(
                NUMVERIFY_SOURCE_ID,
                ProbeFailure::missing_credential("Numverify", NUMVERIFY_ENV),
            );
        };

        self.lookup(number, api_key, options)
            .await
            .unwrap_or_else(|failure| SourceResult::failure(NUMVERIFY_SOURCE_ID, failure))
    }
}

pub struct VeriphoneAdapter {
    http: Arc<dyn HttpClient>,
    api_key: Option<String>,
    endpoint: String,
}

impl VeriphoneAdapter {
    pub fn new(http: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            endpoint: VERIPHONE_URL.to_string(),
        }
    }

    async fn lookup(
        &self,
        number: &str,
        region: Option<&str>,
        api_key: &str,
        options: &ProbeOptions,
    ) -> Result<SourceResult, ProbeFailure> {
        let mut request = HttpRequest::get(&self.endpoint)
            .query("key", api_key)
            .query("phone", number)
            .timeout(options.timeout);
        if let Some(region) = region {
            request = request.query("default_country", region);
        }

        let response = send(self.http.as_ref(), request).await?;
        if !response.is_success() {
            return Err(http_error(&response));
        }
        interpret_veriphone(&parse_body(&response)?)
    }
}

pub(crate) fn interpret_veriphone(body: &Value) -> Result<SourceResult, ProbeFailure> {
    let status = body.get("status").and_then(Value::as_str).unwrap_or("");
    if status != "success" {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unexpected status");
        return Err(ProbeFailure::Transport(format!("veriphone error: {}", message)));
    }
    if !body.get("phone_valid").and_then(Value::as_bool).unwrap_or(false) {
        return Err(ProbeFailure::NotFound("Number not recognized as valid".into()));
    }

    let mut data = Map::new();
    data.insert("valid".into(), Value::from(true));
    carry(&mut data, "phone", body.get("phone"));
    carry(&mut data, "e164", body.get("e164"));
    carry(&mut data, "international", body.get("international_number"));
    carry(&mut data, "country", body.get("country"));
    carry(&mut data, "location", body.get("phone_region"));
    carry(&mut data, "carrier", body.get("carrier"));
    carry(&mut data, "line_type", body.get("phone_type"));

    let class = body
        .get("phone_type")
        .and_then(Value::as_str)
        .map(veriphone_line_type)
        .unwrap_or(LineType::Unknown);
    data.insert(LINE_CLASS_KEY.into(), Value::from(class.as_str()));

    Ok(SourceResult::found(VERIPHONE_SOURCE_ID, data))
}

#[async_trait]
impl SourceAdapter for VeriphoneAdapter {
    fn source_id(&self) -> &str {
        VERIPHONE_SOURCE_ID
    }

    fn class(&self) -> ProbeClass {
        ProbeClass::Api
    }

    async fn probe(&self, query: &Query, options: &ProbeOptions) -> SourceResult {
        let Query::Phone { number, region } = query else {
            return unsupported(VERIPHONE_SOURCE_ID, query);
        };
        let Some(api_key) = self.api_key.as_deref() else {
            return SourceResult::failure(
                VERIPHONE_SOURCE_ID,
                ProbeFailure::missing_credential("Veriphone", VERIPHONE_ENV),
            );
        };

        self.lookup(number, region.as_deref(), api_key, options)
            .await
            .unwrap_or_else(|failure| SourceResult::failure(VERIPHONE_SOURCE_ID, failure))
    }
}
