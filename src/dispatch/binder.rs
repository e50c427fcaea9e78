//! Parameter binding
//!
//! Builds positional argument lists from request bodies. Body fields are
//! bound by name to the descriptor's declared columns, never by the order
//! the client wrote them. Values travel as text and are cast in SQL.

use crate::error::{GatewayError, Result};
use crate::pool::SqlParam;
use crate::registry::{Column, ColumnKind, ResourceDescriptor};
use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Distinct `$n` placeholder indices in a statement
pub fn placeholder_indices(sql: &str) -> BTreeSet<usize> {
    let re = Regex::new(r"\$(\d+)").unwrap();
    re.captures_iter(sql)
        .filter_map(|cap| cap[1].parse().ok())
        .collect()
}

pub fn placeholder_count(sql: &str) -> usize {
    placeholder_indices(sql).len()
}

/// Parse a request body into a JSON object
pub fn parse_body(resource: &ResourceDescriptor, body: &[u8]) -> Result<Map<String, Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(invalid(resource, "request body is required".to_string()));
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(invalid(resource, "request body must be a JSON object".to_string())),
        Err(e) => Err(invalid(resource, format!("invalid JSON: {}", e))),
    }
}

/// Arguments for the insert statement: one per column, in column order
pub fn bind_insert(resource: &ResourceDescriptor, body: &Map<String, Value>) -> Result<Vec<SqlParam>> {
    let query = resource.insert_query.as_deref().unwrap_or_default();
    let params = bind_columns(resource, body)?;
    Ok(fit_to(params, placeholder_count(query)))
}

/// Arguments for the update statement: the columns, then the identifier
pub fn bind_update(
    resource: &ResourceDescriptor,
    body: &Map<String, Value>,
    id: &str,
) -> Result<Vec<SqlParam>> {
    let query = resource.update_query.as_deref().unwrap_or_default();
    let mut params = fit_to(bind_columns(resource, body)?, placeholder_count(query));

    // The update's last placeholder is always the write key
    if let Some(last) = params.last_mut() {
        *last = Some(id.to_string());
    }
    Ok(params)
}

/// Arguments for item reads and deletes
pub fn bind_identifier(id: &str) -> Vec<SqlParam> {
    vec![Some(id.to_string())]
}

fn bind_columns(resource: &ResourceDescriptor, body: &Map<String, Value>) -> Result<Vec<SqlParam>> {
    let mut problems = Vec::new();

    for field in body.keys() {
        let known = resource.columns.iter().any(|c| c.name == field)
            || field == resource.read_key
            || resource.write_key == Some(field.as_str());
        if !known {
            problems.push(format!("unknown field '{}'", field));
        }
    }

    let mut params = Vec::with_capacity(resource.columns.len());
    for column in &resource.columns {
        match bind_value(column, body.get(column.name)) {
            Ok(param) => params.push(param),
            Err(problem) => problems.push(problem),
        }
    }

    if !problems.is_empty() {
        return Err(invalid(resource, problems.join("; ")));
    }
    Ok(params)
}

fn bind_value(column: &Column, value: Option<&Value>) -> std::result::Result<SqlParam, String> {
    let value = match value {
        None | Some(Value::Null) if column.required => {
            return Err(format!("missing required field '{}'", column.name));
        }
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };

    let text = match (column.kind, value) {
        (ColumnKind::Text, Value::String(s)) => Some(s.clone()),

        (ColumnKind::Integer, Value::Number(n)) => n
            .as_i64()
            .or_else(|| integral_f64(n.as_f64()?))
            .map(|v| v.to_string()),
        (ColumnKind::Integer, Value::String(s)) => {
            s.trim().parse::<i64>().ok().map(|v| v.to_string())
        }

        (ColumnKind::Numeric, Value::Number(n)) => Some(n.to_string()),
        (ColumnKind::Numeric, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|_| s.trim().to_string()),

        (ColumnKind::Date, Value::String(s)) => {
            let is_date = NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                || DateTime::parse_from_rfc3339(s).is_ok();
            is_date.then(|| s.clone())
        }

        _ => None,
    };

    text.map(Some).ok_or_else(|| {
        format!(
            "field '{}' must be {}",
            column.name,
            match column.kind {
                ColumnKind::Text => "a string",
                ColumnKind::Integer => "an integer",
                ColumnKind::Numeric => "a number",
                ColumnKind::Date => "a date (YYYY-MM-DD)",
            }
        )
    })
}

/// `10.0` is an integer; `10.5` and out-of-range values are not
fn integral_f64(v: f64) -> Option<i64> {
    let in_range = v >= i64::MIN as f64 && v < i64::MAX as f64;
    (v.is_finite() && v.fract() == 0.0 && in_range).then(|| v as i64)
}

/// Truncate or pad with NULLs to exactly `n` arguments
fn fit_to(mut params: Vec<SqlParam>, n: usize) -> Vec<SqlParam> {
    params.resize(n, None);
    params
}

fn invalid(resource: &ResourceDescriptor, message: String) -> GatewayError {
    GatewayError::Validation {
        resource: resource.name.to_string(),
        message,
    }
}
