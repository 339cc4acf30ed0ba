//! Attribute rules and checkout filters
//!
//! Only the attributes that change how blob content lands on disk are
//! understood: `text`, `-text`, `text=auto`, `binary`, `eol=crlf|lf` and
//! `ident`. Rules come from `<root>/.gitattributes` and `info/attributes`,
//! the latter taking precedence. Within a source, later lines win.

use crate::artifacts::core::slash_path;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use bytes::Bytes;
use std::path::Path;

pub const ATTRIBUTES_FILE: &str = ".gitattributes";

const IDENT_REGEX: &str = r"\$Id(:[^$\n]*)?\$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextSetting {
    #[default]
    Unspecified,
    Text,
    Binary,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eol {
    Lf,
    Crlf,
}

/// Attributes resolved for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileAttributes {
    pub text: TextSetting,
    pub eol: Option<Eol>,
    pub ident: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttributeValue {
    Set,
    Unset,
    Value(String),
}

#[derive(Debug, Clone)]
struct AttributeRule {
    pattern: String,
    anchored: bool,
    assignments: Vec<(String, AttributeValue)>,
}

impl AttributeRule {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let mut fields = line.split_whitespace();
        let pattern = fields.next()?;
        let assignments = fields
            .map(|field| {
                if let Some(name) = field.strip_prefix('-') {
                    (name.to_string(), AttributeValue::Unset)
                } else if let Some((name, value)) = field.split_once('=') {
                    (name.to_string(), AttributeValue::Value(value.to_string()))
                } else {
                    (field.to_string(), AttributeValue::Set)
                }
            })
            .collect();

        Some(AttributeRule {
            anchored: pattern.contains('/'),
            pattern: pattern.trim_start_matches('/').to_string(),
            assignments,
        })
    }

    fn matches(&self, path: &str) -> bool {
        if self.anchored {
            glob_match::glob_match(&self.pattern, path)
        } else {
            let basename = path.rsplit('/').next().unwrap_or(path);
            glob_match::glob_match(&self.pattern, basename)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttributeRules {
    rules: Vec<AttributeRule>,
}

impl AttributeRules {
    pub fn load(git_dir: &Path, root: &Path) -> anyhow::Result<Self> {
        let mut rules = AttributeRules::default();

        rules.add_file(&root.join(ATTRIBUTES_FILE))?;
        rules.add_file(&git_dir.join("info").join("attributes"))?;

        Ok(rules)
    }

    fn add_file(&mut self, path: &Path) -> anyhow::Result<()> {
        match std::fs::read(path) {
            Ok(content) => {
                self.add_rules(&String::from_utf8_lossy(&content));
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    pub fn add_rules(&mut self, text: &str) {
        self.rules.extend(text.lines().filter_map(AttributeRule::parse));
    }

    pub fn attributes_for(&self, path: &Path) -> FileAttributes {
        let path = slash_path(path);
        let mut attributes = FileAttributes::default();

        for rule in self.rules.iter().filter(|rule| rule.matches(&path)) {
            for (name, value) in &rule.assignments {
                match (name.as_str(), value) {
                    ("text", AttributeValue::Set) => attributes.text = TextSetting::Text,
                    ("text", AttributeValue::Unset) => attributes.text = TextSetting::Binary,
                    ("text", AttributeValue::Value(v)) if v == "auto" => {
                        attributes.text = TextSetting::Auto
                    }
                    ("binary", AttributeValue::Set) => attributes.text = TextSetting::Binary,
                    ("eol", AttributeValue::Value(v)) if v == "crlf" => {
                        attributes.eol = Some(Eol::Crlf)
                    }
                    ("eol", AttributeValue::Value(v)) if v == "lf" => {
                        attributes.eol = Some(Eol::Lf)
                    }
                    ("eol", AttributeValue::Unset) => attributes.eol = None,
                    ("ident", AttributeValue::Set) => attributes.ident = true,
                    ("ident", AttributeValue::Unset) => attributes.ident = false,
                    _ => {}
                }
            }
        }

        attributes
    }
}

/// Applies checkout ("smudge") filters using rules captured once.
///
/// Rule changes on disk after construction are not observed.
#[derive(Debug)]
pub struct FilterCache {
    rules: AttributeRules,
    ident_regex: regex::bytes::Regex,
}

impl FilterCache {
    pub fn new(rules: AttributeRules) -> anyhow::Result<Self> {
        let ident_regex = regex::bytes::Regex::new(IDENT_REGEX)
            .with_context(|| format!("invalid ident regex: {IDENT_REGEX}"))?;

        Ok(FilterCache { rules, ident_regex })
    }

    pub fn attributes_for(&self, path: &Path) -> FileAttributes {
        self.rules.attributes_for(path)
    }

    /// Turn blob content into the bytes written to the working tree.
    pub fn smudge(&self, path: &Path, oid: &ObjectId, content: Bytes) -> Bytes {
        let attributes = self.attributes_for(path);
        if attributes.text == TextSetting::Binary || is_binary(&content) {
            return content;
        }

        let content = if attributes.ident {
            let replacement = format!("$$Id: {oid} $$");
            Bytes::from(
                self.ident_regex
                    .replace_all(&content, replacement.as_bytes())
                    .into_owned(),
            )
        } else {
            content
        };

        match attributes.eol {
            Some(Eol::Crlf) => lf_to_crlf(&content),
            _ => content,
        }
    }
}

/// Content holding a NUL byte is treated as binary.
pub fn is_binary(content: &[u8]) -> bool {
    content.contains(&0)
}

fn lf_to_crlf(content: &[u8]) -> Bytes {
    let mut converted = Vec::with_capacity(content.len() + content.len() / 16);
    let mut previous = None;

    for &byte in content {
        if byte == b'\n' && previous != Some(b'\r') {
            converted.push(b'\r');
        }
        converted.push(byte);
        previous = Some(byte);
    }

    Bytes::from(converted)
}
