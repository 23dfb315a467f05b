//! Legacy JSON build template
//!
//! A template is a single JSON document with builders, provisioners,
//! post-processors and user variables. Component settings other than the few
//! well-known keys (`type`, `name`, `only`, ...) are kept as an untyped
//! [`Mapping`] so the converter can carry them over verbatim.

use serde::Deserialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::value::{Mapping, Value};

/// A decoded legacy template
#[derive(Debug, Clone, Default)]
pub struct Template {
    /// `min_packer_version`
    pub min_version: Option<String>,
    pub description: Option<String>,
    /// User variables, sorted by name
    pub variables: Vec<Variable>,
    /// Names listed under `sensitive-variables`
    pub sensitive_variables: BTreeSet<String>,
    pub builders: Vec<Builder>,
    pub provisioners: Vec<Provisioner>,
    /// Post-processor chains, each an ordered group
    pub post_processors: Vec<Vec<PostProcessor>>,
}

/// A user variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub key: String,
    pub default: String,
    /// A `null` default marks the variable as required
    pub required: bool,
}

/// A builder definition
#[derive(Debug, Clone, PartialEq)]
pub struct Builder {
    pub builder_type: String,
    pub name: Option<String>,
    pub config: Mapping,
}

impl Builder {
    /// The name the legacy tool would use: the explicit name, or the type
    pub fn effective_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.builder_type)
    }

    /// Unnamed builders, and builders named after their type, need a generated name
    pub fn needs_generated_name(&self) -> bool {
        match self.name.as_deref() {
            None | Some("") => true,
            Some(name) => name == self.builder_type,
        }
    }
}

/// A provisioner definition
#[derive(Debug, Clone, PartialEq)]
pub struct Provisioner {
    pub provisioner_type: String,
    pub config: Mapping,
    pub only: Vec<String>,
    pub except: Vec<String>,
    pub max_retries: Option<String>,
    pub timeout: Option<Duration>,
    pub pause_before: Option<Duration>,
}

/// A post-processor definition
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessor {
    pub pp_type: String,
    pub name: Option<String>,
    pub config: Mapping,
    pub only: Vec<String>,
    pub except: Vec<String>,
    pub keep_input_artifact: Option<bool>,
}

impl PostProcessor {
    fn bare(pp_type: String) -> Self {
        Self {
            pp_type,
            name: None,
            config: Mapping::new(),
            only: Vec::new(),
            except: Vec::new(),
            keep_input_artifact: None,
        }
    }
}

// =============================================================================
// DECODING
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawTemplate {
    #[serde(default)]
    min_packer_version: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    variables: BTreeMap<String, Option<JsonValue>>,
    #[serde(default, rename = "sensitive-variables")]
    sensitive_variables: Vec<String>,
    #[serde(default)]
    builders: Vec<RawBuilder>,
    #[serde(default)]
    provisioners: Vec<RawProvisioner>,
    #[serde(default, rename = "post-processors")]
    post_processors: Vec<RawPostProcessorEntry>,
}

#[derive(Debug, Deserialize)]
struct RawBuilder {
    #[serde(rename = "type")]
    builder_type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(flatten)]
    config: JsonMap<String, JsonValue>,
}

#[derive(Debug, Deserialize)]
struct RawProvisioner {
    #[serde(rename = "type")]
    provisioner_type: String,
    #[serde(default)]
    only: Vec<String>,
    #[serde(default)]
    except: Vec<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    max_retries: Option<String>,
    #[serde(default, with = "humantime_serde")]
    timeout: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pause_before: Option<Duration>,
    #[serde(default, rename = "override")]
    overrides: Option<JsonValue>,
    #[serde(flatten)]
    config: JsonMap<String, JsonValue>,
}

#[derive(Debug, Deserialize)]
struct RawPostProcessor {
    #[serde(rename = "type")]
    pp_type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    only: Vec<String>,
    #[serde(default)]
    except: Vec<String>,
    #[serde(default)]
    keep_input_artifact: Option<bool>,
    #[serde(flatten)]
    config: JsonMap<String, JsonValue>,
}

/// One element of a post-processor chain: a bare type name or a full definition
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPostProcessorItem {
    Type(String),
    Full(RawPostProcessor),
}

/// A top-level `post-processors` entry
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPostProcessorEntry {
    Group(Vec<RawPostProcessorItem>),
    Single(RawPostProcessorItem),
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<JsonValue>::deserialize(deserializer)? {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or a number, got {}",
            other
        ))),
    }
}

fn into_mapping(map: JsonMap<String, JsonValue>) -> Mapping {
    map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
}

impl From<RawPostProcessorItem> for PostProcessor {
    fn from(item: RawPostProcessorItem) -> Self {
        match item {
            RawPostProcessorItem::Type(pp_type) => PostProcessor::bare(pp_type),
            RawPostProcessorItem::Full(raw) => PostProcessor {
                pp_type: raw.pp_type,
                name: raw.name,
                config: into_mapping(raw.config),
                only: raw.only,
                except: raw.except,
                keep_input_artifact: raw.keep_input_artifact,
            },
        }
    }
}

impl Template {
    /// Decode a template from its JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawTemplate = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    /// Load and decode a template file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    fn from_raw(raw: RawTemplate) -> Result<Self> {
        if raw.builders.is_empty() {
            return Err(CoreError::invalid("at least one builder must be defined"));
        }

        let variables = raw
            .variables
            .into_iter()
            .map(|(key, default)| decode_variable(key, default))
            .collect::<Result<Vec<_>>>()?;

        let builders = raw
            .builders
            .into_iter()
            .map(|b| Builder {
                builder_type: b.builder_type,
                name: b.name,
                config: into_mapping(b.config),
            })
            .collect();

        let provisioners = raw
            .provisioners
            .into_iter()
            .map(|p| {
                if p.overrides.is_some() {
                    tracing::warn!(
                        provisioner = %p.provisioner_type,
                        "provisioner 'override' settings are not carried over"
                    );
                }
                Provisioner {
                    provisioner_type: p.provisioner_type,
                    config: into_mapping(p.config),
                    only: p.only,
                    except: p.except,
                    max_retries: p.max_retries,
                    timeout: p.timeout,
                    pause_before: p.pause_before,
                }
            })
            .collect();

        let post_processors = raw
            .post_processors
            .into_iter()
            .map(|entry| match entry {
                RawPostProcessorEntry::Single(item) => vec![PostProcessor::from(item)],
                RawPostProcessorEntry::Group(items) => {
                    items.into_iter().map(PostProcessor::from).collect()
                }
            })
            .collect();

        Ok(Template {
            min_version: raw.min_packer_version.filter(|v| !v.is_empty()),
            description: raw.description.filter(|d| !d.is_empty()),
            variables,
            sensitive_variables: raw.sensitive_variables.into_iter().collect(),
            builders,
            provisioners,
            post_processors,
        })
    }

    /// Whether a variable is listed as sensitive
    pub fn is_sensitive(&self, key: &str) -> bool {
        self.sensitive_variables.contains(key)
    }
}

/// Legacy variables are strings; scalars are accepted and stringified
fn decode_variable(key: String, default: Option<JsonValue>) -> Result<Variable> {
    let (default, required) = match default {
        None | Some(JsonValue::Null) => (String::new(), true),
        Some(JsonValue::String(s)) => (s, false),
        Some(JsonValue::Number(n)) => (n.to_string(), false),
        Some(JsonValue::Bool(b)) => (b.to_string(), false),
        Some(other) => {
            return Err(CoreError::invalid(format!(
                "variable '{}' must have a string default, got {}",
                key,
                Value::from(other).kind()
            )));
        }
    };
    Ok(Variable {
        key,
        default,
        required,
    })
}
