//! Prompt templates and interpolation
//!
//! Templates live outside the code (TOML files with a `prompt` string and an
//! optional `response_schema` table) so wording can change without touching
//! the pipeline. Interpolation is plain substitution of `{name}` placeholders;
//! `{{` and `}}` produce literal braces.

use crate::{AudienceError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

const GENERATE_AUDIENCES: &str = include_str!("../../prompts/generate_audiences.toml");
const GROUND_TRUTH_VALIDATION: &str = include_str!("../../prompts/ground_truth_validation.toml");

/// Placeholders supplied by the audience pipeline
pub const AUDIENCE_PLACEHOLDERS: &[&str] = &["attribute_goal", "schema_str", "sample_json_str"];

/// Placeholders supplied by the validation pipeline
pub const VALIDATION_PLACEHOLDERS: &[&str] = &[
    "nl_query",
    "filter_clause",
    "ground_truth_clause",
    "schema_str",
    "sample_json_str",
];

#[derive(Deserialize)]
struct PromptFile {
    prompt: String,
    #[serde(default)]
    response_schema: Option<Value>,
}

/// A prompt template plus the structured-output schema its answer must follow
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    pub name: String,
    pub text: String,
    pub response_schema: Option<Value>,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, text: impl Into<String>, response_schema: Option<Value>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            response_schema,
        }
    }

    /// Parse a TOML template document
    pub fn from_toml(name: &str, source: &str) -> Result<Self> {
        let file: PromptFile = toml::from_str(source)
            .map_err(|e| AudienceError::Template(format!("{name}: invalid template file: {e}")))?;
        Ok(Self::new(name, file.prompt, file.response_schema))
    }

    /// Names of all `{placeholder}`s, in order of appearance
    pub fn placeholders(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        scan(&self.text, |segment| {
            if let Segment::Placeholder(name) = segment {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
            Ok(())
        })
        .map_err(|e| self.named(e))?;
        Ok(names)
    }

    /// Fail unless every placeholder is one the caller will supply
    pub fn check_placeholders(&self, supplied: &[&str]) -> Result<()> {
        let unknown: Vec<String> = self
            .placeholders()?
            .into_iter()
            .filter(|p| !supplied.contains(&p.as_str()))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(AudienceError::Template(format!(
                "{}: unsupported placeholders: {}",
                self.name,
                unknown.join(", ")
            )))
        }
    }

    /// Substitute `vars` into the template
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String> {
        render_template(&self.text, vars).map_err(|e| self.named(e))
    }

    fn named(&self, e: AudienceError) -> AudienceError {
        match e {
            AudienceError::Template(msg) => AudienceError::Template(format!("{}: {msg}", self.name)),
            other => other,
        }
    }
}

enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Placeholder(&'a str),
}

fn scan<'a>(template: &'a str, mut emit: impl FnMut(Segment<'a>) -> Result<()>) -> Result<()> {
    let bytes = template.as_bytes();
    let mut i = 0;
    let mut lit_start = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                emit(Segment::Literal(&template[lit_start..i]))?;
                emit(Segment::Brace('{'))?;
                i += 2;
                lit_start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                emit(Segment::Literal(&template[lit_start..i]))?;
                emit(Segment::Brace('}'))?;
                i += 2;
                lit_start = i;
            }
            b'{' => {
                let close = template[i + 1..].find('}').map(|off| i + 1 + off).ok_or_else(|| {
                    AudienceError::Template(format!("unclosed '{{' at byte {i}"))
                })?;
                let name = &template[i + 1..close];
                if name.is_empty()
                    || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    return Err(AudienceError::Template(format!(
                        "invalid placeholder '{{{name}}}' at byte {i}"
                    )));
                }
                emit(Segment::Literal(&template[lit_start..i]))?;
                emit(Segment::Placeholder(name))?;
                i = close + 1;
                lit_start = i;
            }
            b'}' => {
                return Err(AudienceError::Template(format!(
                    "single '}}' at byte {i}; use '}}}}' for a literal brace"
                )));
            }
            _ => i += 1,
        }
    }
    emit(Segment::Literal(&template[lit_start..]))
}

/// Pure `{name}` interpolation.
///
/// A placeholder with no entry in `vars` is an error; entries that the
/// template never references are ignored.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(template.len() + vars.iter().map(|(_, v)| v.len()).sum::<usize>());
    scan(template, |segment| {
        match segment {
            Segment::Literal(s) => out.push_str(s),
            Segment::Brace(c) => out.push(c),
            Segment::Placeholder(name) => {
                let value = vars
                    .iter()
                    .find(|(k, _)| *k == name)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| {
                        AudienceError::Template(format!("no value supplied for placeholder '{name}'"))
                    })?;
                out.push_str(value);
            }
        }
        Ok(())
    })?;
    Ok(out)
}

/// Fill the audience template with a goal and its grounding text
pub fn build_prompt(
    template: &PromptTemplate,
    goal: &str,
    schema_text: &str,
    values_text: &str,
) -> Result<String> {
    template.render(&[
        ("attribute_goal", goal),
        ("schema_str", schema_text),
        ("sample_json_str", values_text),
    ])
}

/// The two templates the agent uses, loaded once at startup
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    pub audience: PromptTemplate,
    pub validation: PromptTemplate,
}

impl PromptLibrary {
    /// Templates compiled into the crate
    pub fn builtin() -> Result<Self> {
        Self::from_sources(GENERATE_AUDIENCES, GROUND_TRUTH_VALIDATION)
    }

    /// Load `generate_audiences.toml` and `ground_truth_validation.toml` from `dir`
    pub fn from_dir(dir: &Path) -> Result<Self> {
        debug!(target: "prompt", dir = %dir.display(), "Loading prompt templates");
        let audience = std::fs::read_to_string(dir.join("generate_audiences.toml"))?;
        let validation = std::fs::read_to_string(dir.join("ground_truth_validation.toml"))?;
        Self::from_sources(&audience, &validation)
    }

    /// `from_dir` when a directory is configured, otherwise the built-ins
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(d) => Self::from_dir(d),
            None => Self::builtin(),
        }
    }

    fn from_sources(audience: &str, validation: &str) -> Result<Self> {
        let lib = Self {
            audience: PromptTemplate::from_toml("generate_audiences", audience)?,
            validation: PromptTemplate::from_toml("ground_truth_validation", validation)?,
        };
        lib.audience.check_placeholders(AUDIENCE_PLACEHOLDERS)?;
        lib.validation.check_placeholders(VALIDATION_PLACEHOLDERS)?;
        Ok(lib)
    }
}
