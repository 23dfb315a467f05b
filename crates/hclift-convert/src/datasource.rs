//! Datasource deduplication
//!
//! Secret lookups and source image filters found while converting are folded
//! into shared datasource declarations. Both stores live in a [`Datasources`]
//! context that is created fresh for every conversion run, so ids never leak
//! between runs.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

use hclift_core::Mapping;

static INVALID_ID_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("valid regex"));

/// Datasource type for secret lookups
pub const SECRETS_MANAGER: &str = "amazon-secretsmanager";

/// Datasource type for source image filters
pub const AMAZON_AMI: &str = "amazon-ami";

/// Run-scoped datasource stores
#[derive(Debug, Default)]
pub struct Datasources {
    pub secrets: SecretStore,
    pub image_filters: ImageFilterStore,
}

impl Datasources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference expression to a secret datasource's value
    pub fn secret_reference(id: &str) -> String {
        format!("${{data.{}.{}.value}}", SECRETS_MANAGER, id)
    }
}

// =============================================================================
// SECRETS
// =============================================================================

/// Canonical key of a secret lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretLookup {
    pub name: String,
    pub key: Option<String>,
}

/// Secret lookups keyed by generated id
#[derive(Debug, Default)]
pub struct SecretStore {
    entries: BTreeMap<String, SecretLookup>,
    /// Variables whose declaration was replaced by a datasource
    promoted: BTreeSet<String>,
}

impl SecretStore {
    /// Id of the datasource for this lookup, registering it on first use
    pub fn resolve(&mut self, name: &str, key: Option<&str>) -> String {
        let lookup = SecretLookup {
            name: name.to_string(),
            key: key.map(str::to_string),
        };

        if let Some(id) = self.find(&lookup) {
            tracing::debug!(id = %id, "reusing secret datasource");
            return id.to_string();
        }

        let base = match key {
            Some(key) => sanitize_id(&format!("{}_{}", name, key)),
            None => sanitize_id(name),
        };
        let id = self.unique_id(base);

        tracing::debug!(id = %id, name = %name, "creating secret datasource");
        self.entries.insert(id.clone(), lookup);
        id
    }

    /// Replace a variable by a datasource named after it
    pub fn promote(&mut self, variable: &str, name: &str, key: Option<&str>) -> String {
        tracing::debug!(variable = %variable, "promoting variable to secret datasource");
        self.entries.insert(
            variable.to_string(),
            SecretLookup {
                name: name.to_string(),
                key: key.map(str::to_string),
            },
        );
        self.promoted.insert(variable.to_string());
        variable.to_string()
    }

    pub fn is_promoted(&self, variable: &str) -> bool {
        self.promoted.contains(variable)
    }

    pub fn get(&self, id: &str) -> Option<&SecretLookup> {
        self.entries.get(id)
    }

    /// Entries in id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SecretLookup)> {
        self.entries.iter().map(|(id, lookup)| (id.as_str(), lookup))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, lookup: &SecretLookup) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, existing)| *existing == lookup)
            .map(|(id, _)| id.as_str())
    }

    fn unique_id(&self, base: String) -> String {
        if !self.entries.contains_key(&base) {
            return base;
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !self.entries.contains_key(candidate))
            .unwrap_or(base)
    }
}

/// Turn a secret name into a usable datasource label
fn sanitize_id(raw: &str) -> String {
    let id = INVALID_ID_CHARS.replace_all(raw.trim(), "_").into_owned();
    if id.is_empty() { "secret".to_string() } else { id }
}

// =============================================================================
// IMAGE FILTERS
// =============================================================================

/// Source image filters, in first-seen order
#[derive(Debug, Default)]
pub struct ImageFilterStore {
    filters: Vec<Mapping>,
}

impl ImageFilterStore {
    /// Name of the datasource for this filter, registering it on first use
    ///
    /// Filters are compared by deep structural equality.
    pub fn resolve(&mut self, filter: &Mapping) -> String {
        if let Some(index) = self.filters.iter().position(|f| f == filter) {
            let name = Self::name_for(index);
            tracing::debug!(name = %name, "reusing image filter datasource");
            return name;
        }

        self.filters.push(filter.clone());
        let name = Self::name_for(self.filters.len() - 1);
        tracing::debug!(name = %name, "creating image filter datasource");
        name
    }

    /// Reference expression, in legacy call syntax, to a datasource's image id
    pub fn reference(name: &str) -> String {
        format!("{{{{ data `{}.{}.id` }}}}", AMAZON_AMI, name)
    }

    /// Entries in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (String, &Mapping)> {
        self.filters
            .iter()
            .enumerate()
            .map(|(i, filter)| (Self::name_for(i), filter))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    fn name_for(index: usize) -> String {
        format!("autogenerated_{}", index + 1)
    }
}
