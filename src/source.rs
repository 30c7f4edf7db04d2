use anyhow::{Context, Result};
use chrono::FixedOffset;
use reqwest::Client;
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

use crate::error::LoadError;
use crate::models::{parse_day, Dataset, PlanRecord, YearGroup};

/// Canonical field name followed by every spelling the endpoints use for it.
const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("id", &["id", "ID", "Id"]),
    ("date", &["date", "Date"]),
    ("time", &["time", "Time"]),
    ("title", &["title", "Title"]),
    ("description", &["description", "Description"]),
    ("status", &["status", "Status"]),
    ("amount", &["amount", "Amount"]),
    ("details", &["details", "Details"]),
    ("photos", &["photos", "Photos"]),
    ("color", &["color", "Color"]),
    ("visited", &["visited", "Visited"]),
    ("year", &["year", "Year"]),
    ("plans", &["plans", "Plans"]),
    ("success", &["success", "Success"]),
    ("data", &["data", "Data"]),
    ("error", &["error", "Error"]),
];

/// Anything that can hand back the raw JSON body of the plan endpoint.
pub trait PlanSource {
    fn describe(&self) -> String;
    fn fetch(&self) -> Result<String, LoadError>;
}

pub struct HttpSource {
    client: Client,
    url: String,
    runtime: tokio::runtime::Runtime,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start HTTP runtime")?;
        Ok(Self {
            client: Client::new(),
            url: url.into(),
            runtime,
        })
    }
}

impl PlanSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<String, LoadError> {
        self.runtime.block_on(async {
            let response = self.client.get(&self.url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(LoadError::Http { status: status.as_u16() });
            }
            Ok(response.text().await?)
        })
    }
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PlanSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<String, LoadError> {
        Ok(fs::read_to_string(&self.path)?)
    }
}

/// `http://` and `https://` locations go over the network, anything else is a file path.
pub fn open_source(location: &str) -> Result<Box<dyn PlanSource>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Box::new(HttpSource::new(location)?))
    } else {
        Ok(Box::new(FileSource::new(location)))
    }
}

/// One fetch, one normalization. No retry: callers re-invoke on user request.
pub fn load(source: &dyn PlanSource, offset: FixedOffset) -> Result<Dataset, LoadError> {
    let result = source.fetch().and_then(|body| normalize(&body, offset));
    match &result {
        Ok(dataset) => log::info!("Loaded {} plan records from {}", dataset.len(), source.describe()),
        Err(LoadError::EmptyData) => log::info!("No plan records in {}", source.describe()),
        Err(LoadError::Parse(msg)) => log::error!("Could not parse {}: {}", source.describe(), msg),
        Err(err) => log::warn!("Loading {} failed: {}", source.describe(), err),
    }
    result
}

pub fn normalize(body: &str, offset: FixedOffset) -> Result<Dataset, LoadError> {
    let value: Value = serde_json::from_str(body)?;
    let dataset = normalize_value(value, offset)?;
    if dataset.is_empty() {
        return Err(LoadError::EmptyData);
    }
    Ok(dataset)
}

fn normalize_value(value: Value, offset: FixedOffset) -> Result<Dataset, LoadError> {
    match value {
        Value::Array(items) => Ok(normalize_array(items, offset)),
        Value::Object(map) => {
            let mut map = canonicalize(map);
            let Some(success) = map.get("success") else {
                return Err(LoadError::Parse(
                    "expected an array or a {success, data} envelope".to_string(),
                ));
            };
            if success.as_bool() != Some(true) {
                let message = map
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                return Err(LoadError::Rejected(message.to_string()));
            }
            match map.remove("data") {
                Some(Value::Array(items)) => Ok(normalize_array(items, offset)),
                None | Some(Value::Null) => Err(LoadError::EmptyData),
                Some(_) => Err(LoadError::Parse("envelope data is not an array".to_string())),
            }
        }
        _ => Err(LoadError::Parse(
            "expected an array or a {success, data} envelope".to_string(),
        )),
    }
}

fn normalize_array(items: Vec<Value>, offset: FixedOffset) -> Dataset {
    if is_grouped(&items) {
        let groups = items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| group_from_value(item, index, offset))
            .collect();
        Dataset::Grouped(groups)
    } else {
        Dataset::Flat(records_from_values(items, 0, offset))
    }
}

fn is_grouped(items: &[Value]) -> bool {
    match items.first() {
        Some(Value::Object(map)) => map
            .iter()
            .any(|(key, value)| canonical_name(key) == Some("plans") && value.is_array()),
        _ => false,
    }
}

fn group_from_value(value: Value, index: usize, offset: FixedOffset) -> Option<YearGroup> {
    let Value::Object(map) = value else {
        log::warn!("Skipping year group #{}: not an object", index);
        return None;
    };
    let mut map = canonicalize(map);
    let plans = match map.remove("plans") {
        Some(Value::Array(items)) => records_from_values(items, index, offset),
        _ => Vec::new(),
    };
    let year = map
        .get("year")
        .and_then(value_as_i32)
        .or_else(|| plans.iter().find_map(|p| p.year()))
        .unwrap_or(0);
    Some(YearGroup { year, plans })
}

fn records_from_values(items: Vec<Value>, group: usize, offset: FixedOffset) -> Vec<PlanRecord> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match item {
            Value::Object(map) => Some(record_from_map(map, format!("{}-{}", group, index), offset)),
            _ => {
                log::warn!("Skipping record {}-{}: not an object", group, index);
                None
            }
        })
        .collect()
}

fn record_from_map(map: Map<String, Value>, fallback_id: String, offset: FixedOffset) -> PlanRecord {
    let map = canonicalize(map);
    let field = |name: &str| map.get(name).and_then(value_as_text);

    let date = field("date").map(|d| d.trim().to_string()).unwrap_or_default();
    let title = field("title");
    let description = field("description");

    PlanRecord {
        id: field("id").unwrap_or(fallback_id),
        day: parse_day(&date, offset),
        date,
        time: field("time").map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        title: title.clone().or_else(|| description.clone()).unwrap_or_default(),
        description: description.or(title).unwrap_or_default(),
        status: field("status").unwrap_or_default(),
        amount: map.get("amount").and_then(value_as_amount),
        details: field("details").filter(|d| !d.trim().is_empty()),
        photos: map.get("photos").map(value_as_photos).unwrap_or_default(),
        color: field("color").filter(|c| !c.trim().is_empty()),
        visited: map.get("visited").and_then(Value::as_bool).unwrap_or(false),
    }
}

fn canonical_name(key: &str) -> Option<&'static str> {
    FIELD_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&key))
        .or_else(|| FIELD_ALIASES.iter().find(|(name, _)| name.eq_ignore_ascii_case(key)))
        .map(|(name, _)| *name)
}

/// Renames every key through the alias table. The first spelling seen wins.
fn canonicalize(map: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in map {
        let name = canonical_name(&key).map(str::to_string).unwrap_or(key);
        out.entry(name).or_insert(value);
    }
    out
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_as_i32(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }?;
    (amount.is_finite() && amount >= 0.0).then_some(amount)
}

fn value_as_photos(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect(),
        Value::String(url) if !url.trim().is_empty() => vec![url.trim().to_string()],
        _ => Vec::new(),
    }
}
