//! Main converter logic
//!
//! Assembles the HCL2 document from a decoded legacy template. Each section
//! is built as an HCL block, rendered to text, then reinterpreted so legacy
//! calls left in its strings become HCL2 expressions. A section that cannot
//! be reinterpreted is kept verbatim behind a comment and never affects its
//! siblings.
//!
//! Output order is fixed: packer settings, variables, the timestamp local,
//! secret datasources, image filter datasources, sources, then a single build
//! block holding provisioners and post-processors.

use std::collections::BTreeMap;
use std::path::Path;

use hclift_core::{Builder, Mapping, PostProcessor, Provisioner, Template, Value, Variable, format_duration};

use crate::body::Block;
use crate::builders::{BuilderRegistry, KnownBuilders};
use crate::datasource::{AMAZON_AMI, Datasources, ImageFilterStore, SECRETS_MANAGER};
use crate::error::{
    ConversionWarning, ConvertError, Result, WarningCategory, WarningSeverity, warnings,
};
use crate::reinterpret::{Mode, reinterpret};
use crate::transcode::{transcode, transcode_into};

const FILE_HEADER: &str = "\
# This file was autogenerated by hclift from a legacy JSON template. We
# recommend double checking that everything is correct before going forward.
# We also recommend treating this file as disposable. The HCL2 blocks in this
# file can be moved to other files. For example, the variable blocks could be
# moved to their own 'variables.pkr.hcl' file, etc. Those files need to be
# suffixed with '.pkr.hcl' to be visible to Packer. To use multiple files at
# once they also need to be in the same folder. 'packer inspect folder/'
# will describe to you what is in that folder.

# Avoid mixing go templating calls ( for example ```{{ upper(`string`) }}``` )
# and HCL2 calls (for example '${ var.string_value_example }' ). They won't be
# executed together and the outcome will be unknown.
";

const PACKER_HEADER: &str = "
# See https://www.packer.io/docs/templates/hcl_templates/blocks/packer for more info
";

const INPUT_VAR_HEADER: &str = "
# All generated input variables will be of 'string' type as this is how Packer JSON
# views them; you can change their type later on. Read the variables type
# constraints documentation
# https://www.packer.io/docs/templates/hcl_templates/variables#type-constraints for more info.
";

const TIMESTAMP_LOCAL: &str = "\
# \"timestamp\" template function replacement
locals { timestamp = regex_replace(timestamp(), \"[- TZ:]\", \"\") }
";

const SECRETS_HEADER: &str = "
# The amazon-secretsmanager data block is generated from your aws_secretsmanager template function; a data
# from this block can be referenced in source and locals blocks.
# Read the documentation for data blocks here:
# https://www.packer.io/docs/templates/hcl_templates/blocks/data
# Read the documentation for the Amazon Secrets Manager Data Source here:
# https://www.packer.io/docs/datasources/amazon/secretsmanager";

const AMI_HEADER: &str = "
# The amazon-ami data block is generated from your amazon builder source_ami_filter; a data
# from this block can be referenced in source and locals blocks.
# Read the documentation for data blocks here:
# https://www.packer.io/docs/templates/hcl_templates/blocks/data
# Read the documentation for the Amazon AMI Data Source here:
# https://www.packer.io/docs/datasources/amazon/ami";

const SOURCES_HEADER: &str = "
# source blocks are generated from your builders; a source can be referenced in
# build blocks. A build block runs provisioner and post-processors on a
# source. Read the documentation for source blocks here:
# https://www.packer.io/docs/templates/hcl_templates/blocks/source";

const BUILD_HEADER: &str = "
# a build block invokes sources and runs provisioning steps on them. The
# documentation for build blocks can be found here:
# https://www.packer.io/docs/templates/hcl_templates/blocks/build
build {
";

/// Options for the converter
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Builder types accepted in addition to the built-in ones
    pub extra_builders: Vec<String>,
}

/// Result of a conversion
#[derive(Debug)]
pub struct ConversionResult {
    /// The generated HCL2 document
    pub output: String,
    /// One warning per section left unconverted, plus informational notes
    pub warnings: Vec<ConversionWarning>,
    pub sources: usize,
    pub secret_datasources: usize,
    pub image_datasources: usize,
}

impl ConversionResult {
    /// Get warnings grouped by severity
    pub fn warnings_by_severity(&self) -> BTreeMap<WarningSeverity, Vec<&ConversionWarning>> {
        let mut grouped = BTreeMap::new();
        for warning in &self.warnings {
            grouped.entry(warning.severity).or_insert_with(Vec::new).push(warning);
        }
        grouped
    }

    /// Get warnings grouped by category
    pub fn warnings_by_category(&self) -> BTreeMap<WarningCategory, Vec<&ConversionWarning>> {
        let mut grouped = BTreeMap::new();
        for warning in &self.warnings {
            grouped.entry(warning.category).or_insert_with(Vec::new).push(warning);
        }
        grouped
    }

    /// Get count of warnings by severity
    pub fn count_by_severity(&self, severity: WarningSeverity) -> usize {
        self.warnings.iter().filter(|w| w.severity == severity).count()
    }

    /// Check if any legacy call needs a manual upgrade
    pub fn has_unsupported(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| w.severity == WarningSeverity::Unsupported)
    }

    /// Get a success message
    pub fn success_message(&self) -> String {
        let mut msg = format!(
            "Converted {} source{}",
            self.sources,
            if self.sources == 1 { "" } else { "s" }
        );

        let datasources = self.secret_datasources + self.image_datasources;
        if datasources > 0 {
            msg.push_str(&format!(
                ", generated {} datasource{}",
                datasources,
                if datasources == 1 { "" } else { "s" }
            ));
        }

        let count = self.warnings.len() - self.count_by_severity(WarningSeverity::Info);
        if count > 0 {
            msg.push_str(&format!(
                " with {} warning{}",
                count,
                if count == 1 { "" } else { "s" }
            ));
        }

        msg
    }
}

/// Convert a legacy JSON template to an HCL2 document
pub struct Converter {
    registry: Box<dyn BuilderRegistry>,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self::with_registry(KnownBuilders::with_extra(options.extra_builders))
    }

    /// Use a custom set of known builder types
    pub fn with_registry(registry: impl BuilderRegistry + 'static) -> Self {
        Self {
            registry: Box::new(registry),
        }
    }

    /// Load a template file and convert it
    pub fn convert_file(&self, path: &Path) -> Result<ConversionResult> {
        let template = Template::from_file(path)?;
        self.convert(&template)
    }

    /// Convert a decoded template
    pub fn convert(&self, template: &Template) -> Result<ConversionResult> {
        for builder in &template.builders {
            if !self.registry.has(&builder.builder_type) {
                return Err(ConvertError::UnknownBuilder {
                    builder_type: builder.builder_type.clone(),
                    name: builder.effective_name().to_string(),
                });
            }
        }

        let mut builders = template.builders.clone();
        builders.sort_by_cached_key(|b| format!("{}{}", b.builder_type, b.effective_name()));

        let mut run = Run::default();

        let variables = run.variables(template);
        let image_datasources = run.image_filters(&mut builders)?;
        let (sources, source_names) = run.sources(&builders);

        let mut build = String::new();
        if let Some(description) = &template.description {
            let mut block = Block::new("build", Vec::new());
            block.body.set_attribute("description", description.as_str());
            build.push_str(&block.body.to_hcl());
            build.push('\n');
        }
        let mut block = Block::new("build", Vec::new());
        block.body.set_attribute("sources", Value::from(source_names.clone()));
        build.push_str(&block.body.to_hcl());
        build.push_str(&run.provisioners(&template.provisioners));
        build.push_str(&run.post_processors(&template.post_processors));

        let secrets = run.secrets();

        let mut output = String::from(FILE_HEADER);
        if let Some(min_version) = &template.min_version {
            output.push_str(PACKER_HEADER);
            let mut packer = Block::new("packer", Vec::new());
            packer
                .body
                .set_attribute("required_version", format!(">= {}", min_version));
            output.push_str(&packer.to_hcl());
        }
        output.push_str(INPUT_VAR_HEADER);
        output.push_str(&variables);
        output.push_str(TIMESTAMP_LOCAL);
        if !run.datasources.secrets.is_empty() {
            output.push_str(SECRETS_HEADER);
            output.push_str(&secrets);
        }
        if !run.datasources.image_filters.is_empty() {
            output.push_str(AMI_HEADER);
            output.push_str(&image_datasources);
        }
        output.push_str(SOURCES_HEADER);
        output.push_str(&sources);
        output.push_str(BUILD_HEADER);
        output.push_str(&indent(&build));
        output.push_str("}\n");

        tracing::debug!(
            sources = source_names.len(),
            secrets = run.datasources.secrets.len(),
            images = run.datasources.image_filters.len(),
            warnings = run.warnings.len(),
            "conversion finished"
        );

        Ok(ConversionResult {
            output,
            sources: source_names.len(),
            secret_datasources: run.datasources.secrets.len(),
            image_datasources: run.datasources.image_filters.len(),
            warnings: run.warnings,
        })
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

/// State of one conversion run
#[derive(Default)]
struct Run {
    datasources: Datasources,
    warnings: Vec<ConversionWarning>,
}

impl Run {
    /// Render a block and rewrite its legacy calls, recording any fallback
    fn emit(&mut self, block: &Block, mode: Mode<'_>) -> String {
        let rewritten = reinterpret(&block.to_hcl(), &mut self.datasources, mode);
        if let Some(error) = &rewritten.error {
            let section = describe(block);
            tracing::debug!(section = %section, error = %error, "section left unconverted");
            self.warnings.push(warnings::fragment_fallback(&section, error));
        }
        rewritten.text
    }

    fn variables(&mut self, template: &Template) -> String {
        let mut out = String::new();

        for variable in &template.variables {
            let block = variable_block(variable, template.is_sensitive(&variable.key));
            let text = self.emit(&block, Mode::Variable(&variable.key));

            if self.datasources.secrets.is_promoted(&variable.key) {
                self.warnings.push(warnings::variable_promoted(&variable.key));
                continue;
            }
            out.push_str(&text);
            out.push('\n');
        }

        out
    }

    /// Fold `source_ami_filter` of amazon builders into shared datasources
    fn image_filters(&mut self, builders: &mut [Builder]) -> Result<String> {
        let mut out = String::new();

        for builder in builders.iter_mut() {
            if !builder.builder_type.starts_with("amazon-") {
                continue;
            }
            let filter = match builder.config.get("source_ami_filter") {
                None => continue,
                Some(Value::Mapping(filter)) => filter.clone(),
                Some(other) => {
                    return Err(ConvertError::FilterDecode {
                        builder: builder.effective_name().to_string(),
                        found: other.kind(),
                    });
                }
            };

            let known = self.datasources.image_filters.len();
            let name = self.datasources.image_filters.resolve(&filter);

            builder.config.shift_remove("source_ami_filter");
            builder
                .config
                .insert("source_ami".to_string(), Value::String(ImageFilterStore::reference(&name)));

            if self.datasources.image_filters.len() > known {
                let mut block = Block::new("data", vec![AMAZON_AMI.to_string(), name]);
                transcode_into(&mut block.body, &filter);
                out.push('\n');
                out.push_str(&self.emit(&block, Mode::Generic));
            }
        }

        Ok(out)
    }

    /// One source per builder; returns the text and the source references
    fn sources(&mut self, builders: &[Builder]) -> (String, Vec<String>) {
        let mut out = String::new();
        let mut names = Vec::with_capacity(builders.len());

        for (i, builder) in builders.iter().enumerate() {
            let name = if builder.needs_generated_name() {
                format!("autogenerated_{}", i + 1)
            } else {
                builder.effective_name().to_string()
            };

            let mut block = Block::new("source", vec![builder.builder_type.clone(), name.clone()]);
            block.body = transcode(&builder.config);

            out.push('\n');
            out.push_str(&self.emit(&block, Mode::Generic));
            names.push(format!("source.{}.{}", builder.builder_type, name));
        }

        (out, names)
    }

    fn provisioners(&mut self, provisioners: &[Provisioner]) -> String {
        let mut out = String::new();

        for provisioner in provisioners {
            let mut block = Block::new("provisioner", vec![provisioner.provisioner_type.clone()]);
            block.body = transcode(&provisioner_config(provisioner));

            out.push('\n');
            out.push_str(&self.emit(&block, Mode::Generic));
        }

        out
    }

    fn post_processors(&mut self, groups: &[Vec<PostProcessor>]) -> String {
        let mut out = String::new();

        for group in groups {
            let block = match group.as_slice() {
                [] => continue,
                [single] => post_processor_block(single),
                many => {
                    let mut parallel = Block::new("post-processors", Vec::new());
                    for pp in many {
                        parallel.body.push_block(post_processor_block(pp));
                    }
                    parallel
                }
            };

            out.push('\n');
            out.push_str(&self.emit(&block, Mode::Generic));
        }

        out
    }

    /// Secret datasources are plain declarations and are not reinterpreted
    fn secrets(&self) -> String {
        let mut out = String::new();

        for (id, lookup) in self.datasources.secrets.iter() {
            let mut config = Mapping::new();
            config.insert("name".to_string(), Value::from(lookup.name.as_str()));
            if let Some(key) = &lookup.key {
                config.insert("key".to_string(), Value::from(key.as_str()));
            }

            let mut block = Block::new("data", vec![SECRETS_MANAGER.to_string(), id.to_string()]);
            block.body = transcode(&config);

            out.push('\n');
            out.push_str(&block.to_hcl());
        }

        out
    }
}

fn variable_block(variable: &Variable, sensitive: bool) -> Block {
    let mut block = Block::new("variable", vec![variable.key.clone()]);
    block.body.set_raw("type", "string");
    if !variable.default.is_empty() || !variable.required {
        block.body.set_attribute("default", variable.default.as_str());
    }
    if sensitive {
        block.body.set_attribute("sensitive", true);
    }
    block
}

/// Provisioner config with the lifted settings merged back in
fn provisioner_config(provisioner: &Provisioner) -> Mapping {
    let mut config = provisioner.config.clone();
    if !provisioner.except.is_empty() {
        config.insert("except".to_string(), Value::from(provisioner.except.clone()));
    }
    if !provisioner.only.is_empty() {
        config.insert("only".to_string(), Value::from(provisioner.only.clone()));
    }
    if let Some(max_retries) = provisioner.max_retries.as_deref().filter(|m| !m.is_empty()) {
        config.insert("max_retries".to_string(), Value::from(max_retries));
    }
    if let Some(timeout) = provisioner.timeout.filter(|t| !t.is_zero()) {
        config.insert("timeout".to_string(), Value::from(format_duration(timeout)));
    }
    if let Some(pause) = provisioner.pause_before.filter(|p| !p.is_zero()) {
        config.insert("pause_before".to_string(), Value::from(format_duration(pause)));
    }
    config
}

fn post_processor_block(pp: &PostProcessor) -> Block {
    let mut block = Block::new("post-processor", vec![pp.pp_type.clone()]);
    if let Some(keep) = pp.keep_input_artifact {
        block.body.set_attribute("keep_input_artifact", keep);
    }

    let mut config = pp.config.clone();
    if !pp.except.is_empty() {
        config.insert("except".to_string(), Value::from(pp.except.clone()));
    }
    if !pp.only.is_empty() {
        config.insert("only".to_string(), Value::from(pp.only.clone()));
    }
    if let Some(name) = pp.name.as_deref().filter(|n| !n.is_empty() && *n != pp.pp_type) {
        config.insert("name".to_string(), Value::from(name));
    }
    transcode_into(&mut block.body, &config);
    block
}

/// `kind "label" ...` header of a block, used to locate warnings
fn describe(block: &Block) -> String {
    let mut header = block.kind.clone();
    for label in &block.labels {
        header.push_str(&format!(" \"{}\"", label));
    }
    header
}

/// Indent every non-empty line by one level
fn indent(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            out.push_str(line.trim_start_matches([' ', '\t']));
        } else {
            out.push_str("  ");
            out.push_str(line);
        }
    }
    out
}

/// Convert a template with the default options
pub fn convert(template: &Template) -> Result<ConversionResult> {
    Converter::default().convert(template)
}

/// Convert a template with custom options
pub fn convert_with_options(template: &Template, options: ConvertOptions) -> Result<ConversionResult> {
    Converter::new(options).convert(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn run(json: &str) -> ConversionResult {
        let template = Template::from_json(json).unwrap();
        convert(&template).unwrap()
    }

    #[test]
    fn test_section_order() {
        let result = run(r#"{
            "min_packer_version": "1.6.0",
            "variables": {"db": "{{ aws_secretsmanager `prod/db` }}", "region": "us-east-1"},
            "builders": [{
                "type": "amazon-ebs",
                "region": "{{ user `region` }}",
                "source_ami_filter": {"owners": ["amazon"], "filters": {"name": "al2*"}, "most_recent": true}
            }],
            "provisioners": [{"type": "shell", "inline": ["echo hi"]}],
            "post-processors": ["manifest"]
        }"#);
        let out = &result.output;

        let positions: Vec<usize> = [
            "packer {",
            "variable \"region\"",
            "locals { timestamp",
            "data \"amazon-secretsmanager\" \"db\"",
            "data \"amazon-ami\" \"autogenerated_1\"",
            "source \"amazon-ebs\" \"autogenerated_1\"",
            "build {",
            "provisioner \"shell\"",
            "post-processor \"manifest\"",
        ]
        .iter()
        .map(|needle| out.find(needle).unwrap_or_else(|| panic!("missing {}", needle)))
        .collect();

        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
        assert!(out.starts_with("# This file was autogenerated by hclift"));
        assert!(out.ends_with("}\n"));
    }

    #[test]
    fn test_packer_block() {
        let result = run(r#"{"min_packer_version": "1.6.0", "builders": [{"type": "null"}]}"#);
        assert!(result.output.contains("packer {\n  required_version = \">= 1.6.0\"\n}\n"));

        let result = run(r#"{"builders": [{"type": "null"}]}"#);
        assert!(!result.output.contains("packer {"));
    }

    #[test]
    fn test_variables() {
        let result = run(r#"{
            "variables": {"region": "us-east-1", "token": null, "password": "x"},
            "sensitive-variables": ["password"],
            "builders": [{"type": "null"}]
        }"#);
        let out = &result.output;

        assert!(out.contains("variable \"region\" {\n  type    = string\n  default = \"us-east-1\"\n}\n"));
        assert!(out.contains("variable \"token\" {\n  type = string\n}\n"));
        assert!(out.contains(
            "variable \"password\" {\n  type      = string\n  default   = \"x\"\n  sensitive = true\n}\n"
        ));
        assert!(out.contains(
            "# \"timestamp\" template function replacement\nlocals { timestamp = regex_replace(timestamp(), \"[- TZ:]\", \"\") }\n"
        ));
    }

    #[test]
    fn test_promoted_variable_replaced_by_datasource() {
        let result = run(r#"{
            "variables": {"db_password": "{{ aws_secretsmanager `prod/db` `password` }}"},
            "builders": [{"type": "docker", "image": "ubuntu", "env": {"PW": "{{ user `db_password` }}"}}]
        }"#);
        let out = &result.output;

        assert!(!out.contains("variable \"db_password\""));
        assert!(out.contains(
            "data \"amazon-secretsmanager\" \"db_password\" {\n  key  = \"password\"\n  name = \"prod/db\"\n}\n"
        ));
        assert!(out.contains("PW = \"${data.amazon-secretsmanager.db_password.value}\""));
        assert_eq!(result.secret_datasources, 1);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.severity == WarningSeverity::Info && w.section == "variable \"db_password\""));
    }

    #[test]
    fn test_secret_dedup() {
        let result = run(r#"{
            "builders": [{"type": "docker", "image": "{{ aws_secretsmanager `db` `password` }}"}],
            "provisioners": [{"type": "shell", "environment_vars": ["PW={{ aws_secretsmanager `db` `password` }}"]}]
        }"#);
        let out = &result.output;

        assert_eq!(out.matches("data \"amazon-secretsmanager\"").count(), 1);
        assert_eq!(out.matches("${data.amazon-secretsmanager.db_password.value}").count(), 2);
        assert_eq!(result.secret_datasources, 1);
    }

    #[test]
    fn test_image_filter_dedup() {
        let result = run(r#"{
            "builders": [
                {"type": "amazon-ebs", "name": "a", "source_ami_filter": {"owners": ["amazon"], "most_recent": true, "filters": {"name": "al2*"}}},
                {"type": "amazon-ebs", "name": "b", "source_ami_filter": {"most_recent": true, "filters": {"name": "al2*"}, "owners": ["amazon"]}}
            ]
        }"#);
        let out = &result.output;

        assert_eq!(out.matches("data \"amazon-ami\"").count(), 1);
        assert_eq!(out.matches("source_ami = \"${data.amazon-ami.autogenerated_1.id}\"").count(), 2);
        assert!(!out.contains("source_ami_filter {"));
        assert!(!out.contains("source_ami_filter ="));
        assert!(out.contains("data \"amazon-ami\" \"autogenerated_1\" {\n  filters = {\n    name = \"al2*\"\n  }\n  most_recent = true\n  owners      = [\"amazon\"]\n}\n"));
        assert_eq!(result.image_datasources, 1);
    }

    #[test]
    fn test_distinct_filters_numbered_in_builder_order() {
        let result = run(r#"{
            "builders": [
                {"type": "amazon-ebs", "name": "z", "source_ami_filter": {"owners": ["2"], "filters": {"n": "x"}}},
                {"type": "amazon-ebs", "name": "a", "source_ami_filter": {"owners": ["1"], "filters": {"n": "x"}}}
            ]
        }"#);
        let out = &result.output;

        let a = out.find("source \"amazon-ebs\" \"a\"").unwrap();
        let z = out.find("source \"amazon-ebs\" \"z\"").unwrap();
        assert!(a < z);
        assert!(out[a..z].contains("autogenerated_1"));
        assert!(out[z..].contains("autogenerated_2"));
        assert!(out.contains("owners  = [\"1\"]") || out.contains("owners = [\"1\"]"));
    }

    #[test]
    fn test_filter_only_for_amazon_builders() {
        let result = run(r#"{
            "builders": [{"type": "docker", "image": "x", "source_ami_filter": {"owners": ["1"], "filters": {"n": "x"}}}]
        }"#);
        assert!(result.output.contains("source_ami_filter {"));
        assert_eq!(result.image_datasources, 0);
    }

    #[test]
    fn test_invalid_filter_is_fatal() {
        let template = Template::from_json(
            r#"{"builders": [{"type": "amazon-ebs", "source_ami_filter": "ami-123"}]}"#,
        )
        .unwrap();
        let err = convert(&template).unwrap_err();
        assert!(matches!(err, ConvertError::FilterDecode { found: "string", .. }));
    }

    #[test]
    fn test_source_naming_and_order() {
        let result = run(r#"{
            "builders": [
                {"type": "virtualbox-iso", "name": "vbox"},
                {"type": "docker"},
                {"type": "null", "name": "null"}
            ]
        }"#);
        let out = &result.output;

        assert!(out.contains("source \"docker\" \"autogenerated_1\" {\n}\n"));
        assert!(out.contains("source \"null\" \"autogenerated_2\" {\n}\n"));
        assert!(out.contains("source \"virtualbox-iso\" \"vbox\" {\n}\n"));
        assert!(out.contains(
            "  sources = [\"source.docker.autogenerated_1\", \"source.null.autogenerated_2\", \"source.virtualbox-iso.vbox\"]\n"
        ));
    }

    #[test]
    fn test_build_description() {
        let result = run(r#"{"description": "web image", "builders": [{"type": "null"}]}"#);
        assert!(result.output.contains(
            "build {\n  description = \"web image\"\n\n  sources = [\"source.null.autogenerated_1\"]\n"
        ));
    }

    #[test]
    fn test_unknown_builder_is_fatal() {
        let template = Template::from_json(r#"{"builders": [{"type": "nope", "name": "x"}]}"#).unwrap();
        let err = convert(&template).unwrap_err();
        assert!(matches!(err, ConvertError::UnknownBuilder { ref builder_type, .. } if builder_type == "nope"));
    }

    #[test]
    fn test_extra_builders() {
        let template = Template::from_json(r#"{"builders": [{"type": "my-plugin"}]}"#).unwrap();
        let options = ConvertOptions {
            extra_builders: vec!["my-plugin".to_string()],
        };
        assert!(convert_with_options(&template, options).is_ok());

        let registry: HashSet<String> = ["my-plugin".to_string()].into_iter().collect();
        assert!(Converter::with_registry(registry).convert(&template).is_ok());
    }

    #[test]
    fn test_provisioner_settings_merged() {
        let result = run(r#"{
            "builders": [{"type": "null"}],
            "provisioners": [{
                "type": "shell",
                "inline": ["echo {{ user `greeting` }}"],
                "only": ["web"],
                "except": ["db"],
                "max_retries": 5,
                "timeout": "1h30m",
                "pause_before": "10s"
            }]
        }"#);
        let out = &result.output;

        assert!(out.contains("  provisioner \"shell\" {\n"));
        assert!(out.contains("    except       = [\"db\"]\n"));
        assert!(out.contains("    inline       = [\"echo ${var.greeting}\"]\n"));
        assert!(out.contains("    max_retries  = \"5\"\n"));
        assert!(out.contains("    only         = [\"web\"]\n"));
        assert!(out.contains("    pause_before = \"10s\"\n"));
        assert!(out.contains("    timeout      = \"1h30m0s\"\n"));
    }

    #[test]
    fn test_post_processor_groups() {
        let result = run(r#"{
            "builders": [{"type": "null"}],
            "post-processors": [
                [],
                {"type": "manifest", "keep_input_artifact": true, "output": "m.json"},
                [
                    {"type": "shell-local", "name": "cleanup", "inline": ["ls"]},
                    {"type": "checksum", "name": "checksum", "only": ["web"]}
                ]
            ]
        }"#);
        let out = &result.output;

        assert!(out.contains(
            "  post-processor \"manifest\" {\n    keep_input_artifact = true\n    output              = \"m.json\"\n  }\n"
        ));
        assert!(out.contains("  post-processors {\n    post-processor \"shell-local\" {\n"));
        assert!(out.contains("      inline = [\"ls\"]\n      name   = \"cleanup\"\n"));
        assert!(out.contains("    post-processor \"checksum\" {\n      only = [\"web\"]\n    }\n"));
        assert_eq!(out.matches("post-processors {").count(), 1);
    }

    #[test]
    fn test_unconvertible_call_is_local() {
        let result = run(r#"{
            "builders": [{"type": "docker", "image": "ubuntu"}],
            "provisioners": [
                {"type": "shell", "inline": ["echo {{ lower `X` }}"]},
                {"type": "shell", "inline": ["echo {{ user `y` }}"]}
            ]
        }"#);
        let out = &result.output;

        assert!(out.contains("# unhandled \"lower\" call:"));
        assert!(out.contains("# Please manually upgrade to `lower(var.example)`"));
        assert!(out.contains("inline = [\"echo {{ lower `X` }}\"]"));
        assert!(out.contains("inline = [\"echo ${var.y}\"]"));
        assert!(out.contains("image = \"ubuntu\""));

        let unsupported: Vec<_> = result
            .warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Unsupported)
            .collect();
        assert_eq!(unsupported.len(), 1);
        assert_eq!(unsupported[0].pattern, "lower");
        assert_eq!(unsupported[0].section, "provisioner \"shell\"");
        assert!(result.has_unsupported());
    }

    #[test]
    fn test_boot_command_placeholders_survive() {
        let result = run(r#"{
            "builders": [{"type": "qemu", "boot_command": ["<esc> ks=http://{{ .HTTPIP }}:{{ .HTTPPort }}/ks.cfg<enter>"]}]
        }"#);
        assert!(result
            .output
            .contains("boot_command = [\"<esc> ks=http://{{ .HTTPIP }}:{{ .HTTPPort }}/ks.cfg<enter>\"]"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_timestamp_and_builtins() {
        let result = run(r#"{
            "builders": [{"type": "amazon-ebs", "ami_name": "web-{{ timestamp }}", "dir": "{{ template_dir }}/files"}]
        }"#);
        assert!(result.output.contains("ami_name = \"web-${local.timestamp}\""));
        assert!(result.output.contains("dir      = \"${path.root}/files\""));
    }

    #[test]
    fn test_deterministic_output() {
        let json = r#"{
            "variables": {"b": "1", "a": "{{ aws_secretsmanager `s` `k` }}"},
            "builders": [
                {"type": "amazon-ebs", "name": "y", "source_ami_filter": {"owners": ["1"], "filters": {"n": "x"}}},
                {"type": "amazon-ebs", "name": "x", "tags": {"b": "2", "a": "1"}, "source_ami_filter": {"owners": ["1"], "filters": {"n": "x"}}}
            ]
        }"#;
        assert_eq!(run(json).output, run(json).output);
    }

    #[test]
    fn test_runs_are_isolated() {
        let json = r#"{"builders": [{"type": "docker", "image": "{{ aws_secretsmanager `db` }}"}]}"#;
        let converter = Converter::default();
        let template = Template::from_json(json).unwrap();

        let first = converter.convert(&template).unwrap();
        let second = converter.convert(&template).unwrap();
        assert_eq!(first.output, second.output);
        assert_eq!(second.secret_datasources, 1);
    }

    #[test]
    fn test_success_message() {
        let result = run(r#"{"builders": [{"type": "null"}, {"type": "docker"}]}"#);
        assert_eq!(result.success_message(), "Converted 2 sources");
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent("a\n\nb {\n  c\n}\n"), "  a\n\n  b {\n    c\n  }\n");
    }
}
