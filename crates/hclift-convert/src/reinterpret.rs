//! Template-call reinterpreter
//!
//! Rendered HCL text still carries the legacy `{{ ... }}` calls inside its
//! string literals. Each fragment is parsed, every call is checked against
//! the [registry](crate::registry), and only then are calls rewritten into
//! HCL2 expressions. Checking everything before rewriting means a fragment
//! that falls back never registers datasources it does not reference.
//!
//! A fragment that cannot be rewritten is returned unchanged, prefixed with a
//! comment explaining why. Reinterpretation never fails a run.

use crate::ast::{Argument, CallSite, Element, Fragment};
use crate::datasource::Datasources;
use crate::error::CallError;
use crate::parser;
use crate::registry::{self, CallSpec, Rewrite};

/// Boot-command placeholders kept as-is
const PASSTHROUGH_FIELDS: &[&str] = &["HTTPIP", "HTTPPort"];

/// Which block the fragment comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode<'a> {
    /// Sources, provisioners, post-processors and datasources
    Generic,
    /// The declaration of the named variable; a secret lookup there replaces
    /// the variable by a datasource of the same name
    Variable(&'a str),
}

/// Outcome of reinterpreting one fragment
#[derive(Debug)]
pub struct Reinterpreted {
    /// Text to emit: the rewrite, or the original prefixed with a comment
    pub text: String,
    /// Why the fragment was left unconverted
    pub error: Option<CallError>,
}

impl Reinterpreted {
    pub fn is_rewritten(&self) -> bool {
        self.error.is_none()
    }
}

/// Rewrite every legacy call in `fragment`, falling back to an annotated copy
pub fn reinterpret(fragment: &str, datasources: &mut Datasources, mode: Mode<'_>) -> Reinterpreted {
    match rewrite(fragment, datasources, mode) {
        Ok(text) => Reinterpreted { text, error: None },
        Err(error) => {
            tracing::debug!(error = %error, "leaving fragment unconverted");
            Reinterpreted {
                text: format!("{}{}", error.fallback_comment(), fragment),
                error: Some(error),
            }
        }
    }
}

/// Rewrite every legacy call in `fragment`
pub fn rewrite(
    fragment: &str,
    datasources: &mut Datasources,
    mode: Mode<'_>,
) -> Result<String, CallError> {
    let parsed = parser::parse(fragment)?;
    check(&parsed)?;

    let mut out = String::with_capacity(fragment.len());
    for element in &parsed.elements {
        match element {
            Element::RawText(text) => out.push_str(text),
            Element::Field { name, .. } => {
                out.push_str("{{ .");
                out.push_str(name);
                out.push_str(" }}");
            }
            Element::Call(call) => {
                let spec = resolve(call)?;
                out.push_str(&apply(spec.rewrite, &call.args, datasources, mode));
            }
        }
    }

    Ok(out)
}

/// Validate every action without side effects
fn check(fragment: &Fragment) -> Result<(), CallError> {
    for element in &fragment.elements {
        match element {
            Element::RawText(_) => {}
            Element::Field { name, .. } => {
                if !PASSTHROUGH_FIELDS.contains(&name.as_str()) {
                    return Err(CallError::UnknownField(name.clone()));
                }
            }
            Element::Call(call) => {
                let spec = resolve(call)?;
                spec.signature.check(&call.name, &call.args)?;
                if let Rewrite::Unconvertible(u) = spec.rewrite {
                    return Err(CallError::Unhandled(u));
                }
            }
        }
    }
    Ok(())
}

fn resolve(call: &CallSite) -> Result<&'static CallSpec, CallError> {
    registry::lookup(&call.name).ok_or_else(|| CallError::UndefinedFunction(call.name.clone()))
}

/// Produce the HCL2 expression for a checked call
fn apply(
    rewrite: Rewrite,
    args: &[Argument],
    datasources: &mut Datasources,
    mode: Mode<'_>,
) -> String {
    let first = string_arg(args, 0);

    match rewrite {
        Rewrite::Constant(expr) => expr.to_string(),
        Rewrite::Traversal(prefix) => format!("${{{}.{}}}", prefix, first),
        Rewrite::Env => format!("${{env({:?})}}", first),
        Rewrite::User => {
            if datasources.secrets.is_promoted(first) {
                Datasources::secret_reference(first)
            } else {
                format!("${{var.{}}}", first)
            }
        }
        Rewrite::SecretsManager => {
            // Two arguments select a key inside the secret; any other count
            // looks the secret up by name only
            let key = (args.len() == 2).then(|| string_arg(args, 1));
            let id = match mode {
                Mode::Generic => datasources.secrets.resolve(first, key),
                Mode::Variable(variable) => datasources.secrets.promote(variable, first, key),
            };
            Datasources::secret_reference(&id)
        }
        // Rejected by `check`
        Rewrite::Unconvertible(_) => String::new(),
    }
}

fn string_arg(args: &[Argument], index: usize) -> &str {
    args.get(index).and_then(Argument::as_str).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(fragment: &str) -> Reinterpreted {
        let mut ds = Datasources::new();
        reinterpret(fragment, &mut ds, Mode::Generic)
    }

    #[test]
    fn test_plain_text_unchanged() {
        let out = convert("source \"docker\" \"web\" {\n  image = \"ubuntu\"\n}\n");
        assert!(out.is_rewritten());
        assert_eq!(out.text, "source \"docker\" \"web\" {\n  image = \"ubuntu\"\n}\n");
    }

    #[test]
    fn test_user_rewrite() {
        let out = convert("region = \"{{ user `region` }}\"");
        assert_eq!(out.text, "region = \"${var.region}\"");
    }

    #[test]
    fn test_escaped_quote_argument() {
        let out = convert(r#"region = "{{ user \"region\" }}""#);
        assert_eq!(out.text, r#"region = "${var.region}""#);
    }

    #[test]
    fn test_timestamp_rewrite() {
        assert_eq!(convert("{{ timestamp }}").text, "${local.timestamp}");
        assert_eq!(convert("{{isotime}}").text, "${local.timestamp}");
    }

    #[test]
    fn test_builtin_rewrites() {
        assert_eq!(convert("{{ env `HOME` }}").text, "${env(\"HOME\")}");
        assert_eq!(convert("{{ build `ID` }}").text, "${build.ID}");
        assert_eq!(convert("{{ template_dir }}").text, "${path.root}");
        assert_eq!(convert("{{ pwd }}").text, "${path.cwd}");
        assert_eq!(convert("{{ packer_version }}").text, "${packer.version}");
        assert_eq!(convert("{{ uuid }}").text, "${uuidv4()}");
        assert_eq!(convert("{{ build_name }}-{{ build_type }}").text, "${build.name}-${build.type}");
        assert_eq!(
            convert("{{ data `amazon-ami.autogenerated_1.id` }}").text,
            "${data.amazon-ami.autogenerated_1.id}"
        );
    }

    #[test]
    fn test_http_placeholders_pass_through() {
        let out = convert("\"http://{{ .HTTPIP }}:{{.HTTPPort}}/ks.cfg\"");
        assert!(out.is_rewritten());
        assert_eq!(out.text, "\"http://{{ .HTTPIP }}:{{ .HTTPPort }}/ks.cfg\"");
    }

    #[test]
    fn test_unknown_field_falls_back() {
        let out = convert("name = \"{{ .Name }}\"");
        assert!(matches!(out.error, Some(CallError::UnknownField(ref f)) if f == "Name"));
        assert!(out.text.starts_with("\n# could not parse template for following block: "));
        assert!(out.text.ends_with("name = \"{{ .Name }}\""));
    }

    #[test]
    fn test_unconvertible_call_falls_back() {
        let fragment = "name = \"{{ lower `X` }}\"\n";
        let out = convert(fragment);

        assert!(matches!(out.error, Some(CallError::Unhandled(_))));
        assert!(out.text.contains("# unhandled \"lower\" call:"));
        assert!(out.text.contains("`lower(var.example)`"));
        assert!(out.text.contains("functions/string/lower"));
        assert!(out.text.ends_with(fragment));
    }

    #[test]
    fn test_undefined_function_falls_back() {
        let out = convert("a = \"{{ trimspace `x` }}\"");
        assert!(matches!(out.error, Some(CallError::UndefinedFunction(_))));
        assert!(out.text.contains("function \\\"trimspace\\\" not defined"));
    }

    #[test]
    fn test_wrong_arity_falls_back() {
        let out = convert("a = \"{{ user }}\"");
        assert!(matches!(out.error, Some(CallError::WrongArgCount { .. })));
    }

    #[test]
    fn test_parse_error_falls_back() {
        let out = convert("a = \"{{ user `x`\"");
        assert!(matches!(out.error, Some(CallError::Parse(_))));
        assert!(out.text.ends_with("a = \"{{ user `x`\""));
    }

    #[test]
    fn test_secret_dedup_across_fragments() {
        let mut ds = Datasources::new();
        let a = reinterpret(
            "password = \"{{ aws_secretsmanager `db` `password` }}\"",
            &mut ds,
            Mode::Generic,
        );
        let b = reinterpret(
            "pw = \"{{ aws_secretsmanager \\\"db\\\" \\\"password\\\" }}\"",
            &mut ds,
            Mode::Generic,
        );

        assert_eq!(a.text, "password = \"${data.amazon-secretsmanager.db_password.value}\"");
        assert_eq!(b.text, "pw = \"${data.amazon-secretsmanager.db_password.value}\"");
        assert_eq!(ds.secrets.len(), 1);
    }

    #[test]
    fn test_secret_with_extra_args_uses_name_only() {
        let mut ds = Datasources::new();
        let out = reinterpret("{{ aws_secretsmanager `db` `a` `b` }}", &mut ds, Mode::Generic);
        assert_eq!(out.text, "${data.amazon-secretsmanager.db.value}");
        assert_eq!(ds.secrets.get("db").unwrap().key, None);
    }

    #[test]
    fn test_variable_mode_promotes() {
        let mut ds = Datasources::new();
        let out = reinterpret(
            "variable \"db_pw\" {\n  default = \"{{ aws_secretsmanager `prod/db` `pw` }}\"\n}\n",
            &mut ds,
            Mode::Variable("db_pw"),
        );

        assert!(out.text.contains("${data.amazon-secretsmanager.db_pw.value}"));
        assert!(ds.secrets.is_promoted("db_pw"));

        let later = reinterpret("p = \"{{ user `db_pw` }}\"", &mut ds, Mode::Generic);
        assert_eq!(later.text, "p = \"${data.amazon-secretsmanager.db_pw.value}\"");
    }

    #[test]
    fn test_fallback_registers_no_datasource() {
        let mut ds = Datasources::new();
        let out = reinterpret(
            "a = \"{{ aws_secretsmanager `db` }}-{{ upper `x` }}\"",
            &mut ds,
            Mode::Generic,
        );
        assert!(!out.is_rewritten());
        assert!(ds.secrets.is_empty());
    }
}
