//! Human-readable dumps printed ahead of the response line in verbose mode.
//!
//! These are a debugging aid for operators running the filter by hand; the
//! walker never parses them.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use time::OffsetDateTime;
use time::macros::format_description;
use worm_protocol::{COLUMN_HEADING, DomainInfo, ObjectHandle, RETAIN_FOREVER, describe_offset};

use crate::resolver::PathStat;
use crate::shape::WormObject;

const LABEL_WIDTH: usize = 19;

/// Everything the breakdown shows about one request.
#[derive(Debug, Clone, Copy)]
pub struct Breakdown<'a> {
    /// Handle that was looked up.
    pub handle: ObjectHandle,
    /// Reference timestamp of the lookup.
    pub ref_date: i64,
    /// `lstat` result, when the input was a pathname.
    pub stat: Option<&'a PathStat>,
    /// The record that passed the shape filter.
    pub object: &'a WormObject,
}

/// Renders the record as one line of JSON with sorted keys.
///
/// # Errors
///
/// Returns an error if the record cannot be serialised.
pub fn raw_compact(info: &DomainInfo) -> serde_json::Result<String> {
    serde_json::to_value(info).and_then(|value| serde_json::to_string(&sort_keys(value)))
}

/// Renders the record as key-sorted JSON indented by four spaces.
///
/// # Errors
///
/// Returns an error if the record cannot be serialised.
pub fn raw_pretty(info: &DomainInfo) -> serde_json::Result<String> {
    let value = sort_keys(serde_json::to_value(info)?);
    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    // serde_json only ever writes UTF-8.
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(left, _), (right, _)| left.cmp(right));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, item)| (key, sort_keys(item)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Formats a timestamp as UTC `YYYY-MM-DD HH:MM:SS`.
///
/// Zero renders as `-` and the retain-forever sentinel as `FOREVER`.
#[must_use]
pub fn calendar(seconds: i64) -> String {
    match seconds {
        0 => String::from("-"),
        RETAIN_FOREVER => String::from("FOREVER"),
        _ => OffsetDateTime::from_unix_timestamp(seconds)
            .ok()
            .and_then(|moment| {
                moment
                    .format(format_description!(
                        "[year]-[month]-[day] [hour]:[minute]:[second]"
                    ))
                    .ok()
            })
            .unwrap_or_else(|| String::from("out of range")),
    }
}

/// Renders the domain, file, and WORM sections plus the column legend.
#[must_use]
pub fn render_breakdown(breakdown: &Breakdown<'_>) -> String {
    let domain = &breakdown.object.domain;
    let state = &breakdown.object.state;
    let mut out = String::new();

    out.push_str("DOMAIN INFO:\n");
    field(&mut out, "flags", &domain.flags);
    field(&mut out, "id", &domain.id);
    field(&mut out, "generation", &domain.generation);
    field(&mut out, "root_lin", &domain.root_lin);
    offset(&mut out, "w_auto_offset", domain.autocommit_offset);
    offset(&mut out, "w_min_offset", domain.min_offset);
    offset(&mut out, "w_max_offset", domain.max_offset);
    offset(&mut out, "w_def_offset", domain.default_offset);
    date(&mut out, "w_override_date", domain.override_retention);

    out.push_str("\nFILE INFO:\n");
    field(&mut out, "lin", &breakdown.handle);
    date(&mut out, "w_ref_date", breakdown.ref_date);
    if let Some(stat) = breakdown.stat {
        date(&mut out, "st_atime", stat.atime);
        date(&mut out, "st_mtime", stat.mtime);
        date(&mut out, "st_ctime", stat.ctime);
        if let Some(birthtime) = stat.birthtime {
            date(&mut out, "st_birthtime", birthtime);
        }
    }

    out.push_str("\nFILE WORM INFO:\n");
    field(&mut out, "w_committed", &state.committed);
    date(&mut out, "w_ctime", state.ctime);
    date(&mut out, "w_retention_date", state.retention_date);

    out.push_str("\nCOLUMN HEADING:\n");
    out.push_str(COLUMN_HEADING);
    out.push('\n');
    out
}

fn field(out: &mut String, label: &str, value: &dyn std::fmt::Display) {
    // Writing to a String cannot fail.
    drop(writeln!(out, "{label:>LABEL_WIDTH$} = {value}"));
}

fn offset(out: &mut String, label: &str, seconds: i64) {
    match describe_offset(seconds) {
        Some(name) => drop(writeln!(out, "{label:>LABEL_WIDTH$} = {seconds} ({name})")),
        None => field(out, label, &seconds),
    }
}

fn date(out: &mut String, label: &str, seconds: i64) {
    drop(writeln!(
        out,
        "{label:>LABEL_WIDTH$} = {seconds} ({})",
        calendar(seconds)
    ));
}
