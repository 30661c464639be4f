//! Minimal HTML template renderer.
//!
//! Syntax: `{{ user.full_name }}` inserts a value, HTML-escaped;
//! `{{#user.phone}}...{{/user.phone}}` keeps its body only when the value is
//! present and not empty. Missing values render as the empty string.

use regex::{Captures, Regex};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::debug;

use crate::contract::TemplateRenderer;
use crate::error::RenderError;

pub const BUSINESS_CARD: &str = "business-card";

const BUNDLED_BUSINESS_CARD: &str = include_str!("../templates/business-card.html");

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][\w.]*)\s*\}\}").expect("valid variable pattern")
    });
static SECTION_OPEN: LazyLock<Regex> =
    LazyLock::new(|| {
        Regex::new(r"\{\{#\s*([A-Za-z_][\w.]*)\s*\}\}").expect("valid section pattern")
    });

/// Loads `<template_dir>/<name>.html`, or the bundled templates when no
/// directory is configured.
#[derive(Debug, Clone, Default)]
pub struct FsTemplateRenderer {
    template_dir: Option<PathBuf>,
}

impl FsTemplateRenderer {
    pub fn new(template_dir: Option<PathBuf>) -> Self {
        Self { template_dir }
    }

    pub fn bundled() -> Self {
        Self::default()
    }

    fn load(&self, template_name: &str) -> Result<String, RenderError> {
        match &self.template_dir {
            Some(dir) => {
                let path = dir.join(format!("{template_name}.html"));
                debug!(path = %path.display(), "Loading template");
                fs::read_to_string(&path).map_err(|source| {
                    if source.kind() == ErrorKind::NotFound {
                        RenderError::NotFound(path.display().to_string())
                    } else {
                        RenderError::Io { path, source }
                    }
                })
            }
            None if template_name == BUSINESS_CARD => Ok(BUNDLED_BUSINESS_CARD.to_string()),
            None => Err(RenderError::NotFound(template_name.to_string())),
        }
    }
}

impl TemplateRenderer for FsTemplateRenderer {
    fn render(&self, template_name: &str, context: &Value) -> Result<String, RenderError> {
        let template = self.load(template_name)?;
        render_str(&template, context)
    }
}

pub fn render_str(template: &str, context: &Value) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = SECTION_OPEN.captures(rest) {
        let (Some(whole), Some(name)) = (open.get(0), open.get(1)) else {
            break;
        };
        let name = name.as_str();
        out.push_str(&substitute(&rest[..whole.start()], context));

        let after_open = &rest[whole.end()..];
        let (close_start, close_end) = find_close(after_open, name)
            .ok_or_else(|| RenderError::UnclosedSection(name.to_string()))?;
        if is_truthy(lookup(context, name)) {
            out.push_str(&render_str(&after_open[..close_start], context)?);
        }
        rest = &after_open[close_end..];
    }

    out.push_str(&substitute(rest, context));
    Ok(out)
}

/// Byte range of the `{{/name}}` tag closing a section.
fn find_close(body: &str, name: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    while let Some(pos) = body[offset..].find("{{/") {
        let start = offset + pos;
        let tail = &body[start + 3..];
        let end = tail.find("}}")?;
        if tail[..end].trim() == name {
            return Some((start, start + 3 + end + 2));
        }
        offset = start + 3;
    }
    None
}

fn substitute(text: &str, context: &Value) -> String {
    VARIABLE
        .replace_all(text, |caps: &Captures| {
            escape_html(&display_value(lookup(context, &caps[1])))
        })
        .into_owned()
}

fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(context, |value, key| value.get(key))
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(_) => true,
    }
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
