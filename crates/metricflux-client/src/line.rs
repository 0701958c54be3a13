//! Line protocol encoding.
//!
//! `series[,tag=value...] field=value[,field=value...] timestamp`
//!
//! Tags and fields are written sorted by key. Tags with an empty value
//! are omitted.

use std::fmt::Write;

use crate::point::{FieldValue, Point};

pub(crate) fn write_point(out: &mut String, point: &Point, timestamp: i128) {
    escape_into(out, point.series(), &[',', ' ']);

    let mut tags: Vec<(&String, &String)> = point
        .tags()
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .collect();
    tags.sort_unstable_by(|a, b| a.0.cmp(b.0));
    for (key, value) in tags {
        out.push(',');
        escape_into(out, key, &[',', '=', ' ']);
        out.push('=');
        escape_into(out, value, &[',', '=', ' ']);
    }

    out.push(' ');
    let mut fields: Vec<(&String, &FieldValue)> = point.fields().iter().collect();
    fields.sort_unstable_by(|a, b| a.0.cmp(b.0));
    for (i, (key, value)) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        escape_into(out, key, &[',', '=', ' ']);
        out.push('=');
        write_field_value(out, value);
    }

    let _ = write!(out, " {timestamp}");
}

fn write_field_value(out: &mut String, value: &FieldValue) {
    let _ = match value {
        FieldValue::Integer(v) => write!(out, "{v}i"),
        FieldValue::Float(v) => write!(out, "{v}"),
        FieldValue::Boolean(v) => write!(out, "{v}"),
    };
}

fn escape_into(out: &mut String, s: &str, special: &[char]) {
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}
