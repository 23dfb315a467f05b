//! Call registry
//!
//! Fixed table of the legacy functions the reinterpreter understands. Every
//! entry carries the signature the legacy engine enforced and the rule used
//! to rewrite a call into an HCL2 expression. Functions without a safe
//! automatic rewrite are registered as [`Rewrite::Unconvertible`] so they are
//! reported with manual-upgrade guidance instead of being guessed.

use phf::phf_map;

use crate::ast::Argument;
use crate::error::CallError;

// =============================================================================
// SIGNATURES
// =============================================================================

/// Kind of a positional parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Int,
}

impl ParamKind {
    fn name(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Int => "int",
        }
    }

    fn accepts(self, arg: &Argument) -> bool {
        matches!(
            (self, arg),
            (ParamKind::String, Argument::String(_)) | (ParamKind::Int, Argument::Int(_))
        )
    }
}

/// Positional parameters plus an optional variadic tail
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub params: &'static [ParamKind],
    pub variadic: Option<ParamKind>,
}

impl Signature {
    /// Check a call's arguments the way the legacy engine did before invoking it
    pub fn check(&self, call: &str, args: &[Argument]) -> Result<(), CallError> {
        let arity_ok = match self.variadic {
            Some(_) => args.len() >= self.params.len(),
            None => args.len() == self.params.len(),
        };
        if !arity_ok {
            let expected = match self.variadic {
                Some(_) => format!("at least {}", self.params.len()),
                None => self.params.len().to_string(),
            };
            return Err(CallError::WrongArgCount {
                call: call.to_string(),
                expected,
                found: args.len(),
            });
        }

        for (i, arg) in args.iter().enumerate() {
            let kind = match self.params.get(i).copied().or(self.variadic) {
                Some(kind) => kind,
                None => continue,
            };
            if !kind.accepts(arg) {
                return Err(CallError::WrongArgType {
                    call: call.to_string(),
                    position: i + 1,
                    expected: kind.name(),
                    found: arg.kind(),
                });
            }
        }

        Ok(())
    }
}

const NO_ARGS: &[ParamKind] = &[];
const ONE_STRING: &[ParamKind] = &[ParamKind::String];

// =============================================================================
// REWRITE RULES
// =============================================================================

/// Manual-upgrade guidance for a call that cannot be rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unconvertible {
    /// Legacy function name
    pub call: &'static str,
    /// The HCL2 call to use instead
    pub correspondence: &'static str,
    /// Documentation link(s)
    pub docs: &'static str,
}

/// How a registered call is rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    /// Fixed expression
    Constant(&'static str),
    /// `${<prefix>.<arg>}`
    Traversal(&'static str),
    /// `${env("<arg>")}`
    Env,
    /// Variable reference, or the secret datasource the variable was promoted to
    User,
    /// Secret lookup folded into a shared datasource
    SecretsManager,
    /// Never rewritten
    Unconvertible(Unconvertible),
}

impl Rewrite {
    /// Human-readable description of the rewrite, for listings
    pub fn describe(&self) -> String {
        match self {
            Rewrite::Constant(expr) => expr.to_string(),
            Rewrite::Traversal(prefix) => format!("${{{}.<arg>}}", prefix),
            Rewrite::Env => "${env(\"<name>\")}".to_string(),
            Rewrite::User => "${var.<name>}".to_string(),
            Rewrite::SecretsManager => "${data.amazon-secretsmanager.<id>.value}".to_string(),
            Rewrite::Unconvertible(u) => format!("manual: {}", u.correspondence),
        }
    }
}

/// A registry entry
#[derive(Debug, Clone, Copy)]
pub struct CallSpec {
    pub signature: Signature,
    pub rewrite: Rewrite,
}

const REPLACE_DOCS: &str = "https://www.packer.io/docs/templates/hcl_templates/functions/string/replace or https://www.packer.io/docs/templates/hcl_templates/functions/string/regex_replace";
const REPLACE_CORRESPONDENCE: &str =
    "`replace(string, substring, replacement)` or `regex_replace(string, substring, replacement)`";

static CALLS: phf::Map<&'static str, CallSpec> = phf_map! {
    // Timestamps share one derived local
    "timestamp" => CallSpec {
        signature: Signature { params: NO_ARGS, variadic: None },
        rewrite: Rewrite::Constant("${local.timestamp}"),
    },
    "isotime" => CallSpec {
        signature: Signature { params: NO_ARGS, variadic: None },
        rewrite: Rewrite::Constant("${local.timestamp}"),
    },

    // Environment and variables
    "env" => CallSpec {
        signature: Signature { params: ONE_STRING, variadic: None },
        rewrite: Rewrite::Env,
    },
    "user" => CallSpec {
        signature: Signature { params: ONE_STRING, variadic: None },
        rewrite: Rewrite::User,
    },
    "aws_secretsmanager" => CallSpec {
        signature: Signature { params: ONE_STRING, variadic: Some(ParamKind::String) },
        rewrite: Rewrite::SecretsManager,
    },

    // Built-in references
    "build" => CallSpec {
        signature: Signature { params: ONE_STRING, variadic: None },
        rewrite: Rewrite::Traversal("build"),
    },
    "data" => CallSpec {
        signature: Signature { params: ONE_STRING, variadic: None },
        rewrite: Rewrite::Traversal("data"),
    },
    "template_dir" => CallSpec {
        signature: Signature { params: NO_ARGS, variadic: None },
        rewrite: Rewrite::Constant("${path.root}"),
    },
    "pwd" => CallSpec {
        signature: Signature { params: NO_ARGS, variadic: None },
        rewrite: Rewrite::Constant("${path.cwd}"),
    },
    "packer_version" => CallSpec {
        signature: Signature { params: NO_ARGS, variadic: None },
        rewrite: Rewrite::Constant("${packer.version}"),
    },
    "uuid" => CallSpec {
        signature: Signature { params: NO_ARGS, variadic: None },
        rewrite: Rewrite::Constant("${uuidv4()}"),
    },
    "build_name" => CallSpec {
        signature: Signature { params: NO_ARGS, variadic: None },
        rewrite: Rewrite::Constant("${build.name}"),
    },
    "build_type" => CallSpec {
        signature: Signature { params: NO_ARGS, variadic: None },
        rewrite: Rewrite::Constant("${build.type}"),
    },

    // No automatic upgrade
    "lower" => CallSpec {
        signature: Signature { params: ONE_STRING, variadic: None },
        rewrite: Rewrite::Unconvertible(Unconvertible {
            call: "lower",
            correspondence: "`lower(var.example)`",
            docs: "https://www.packer.io/docs/templates/hcl_templates/functions/string/lower",
        }),
    },
    "upper" => CallSpec {
        signature: Signature { params: ONE_STRING, variadic: None },
        rewrite: Rewrite::Unconvertible(Unconvertible {
            call: "upper",
            correspondence: "`upper(var.example)`",
            docs: "https://www.packer.io/docs/templates/hcl_templates/functions/string/upper",
        }),
    },
    "split" => CallSpec {
        signature: Signature {
            params: &[ParamKind::String, ParamKind::String, ParamKind::Int],
            variadic: None,
        },
        rewrite: Rewrite::Unconvertible(Unconvertible {
            call: "split",
            correspondence: "`split(separator, string)`",
            docs: "https://www.packer.io/docs/templates/hcl_templates/functions/string/split",
        }),
    },
    "replace" => CallSpec {
        signature: Signature {
            params: &[ParamKind::String, ParamKind::String, ParamKind::String, ParamKind::Int],
            variadic: None,
        },
        rewrite: Rewrite::Unconvertible(Unconvertible {
            call: "replace",
            correspondence: REPLACE_CORRESPONDENCE,
            docs: REPLACE_DOCS,
        }),
    },
    "replace_all" => CallSpec {
        signature: Signature {
            params: &[ParamKind::String, ParamKind::String, ParamKind::String],
            variadic: None,
        },
        rewrite: Rewrite::Unconvertible(Unconvertible {
            call: "replace_all",
            correspondence: REPLACE_CORRESPONDENCE,
            docs: REPLACE_DOCS,
        }),
    },
    "clean_resource_name" => CallSpec {
        signature: Signature { params: ONE_STRING, variadic: None },
        rewrite: Rewrite::Unconvertible(Unconvertible {
            call: "clean_resource_name",
            correspondence: "use custom validation rules, `replace(string, substring, replacement)` or `regex_replace(string, substring, replacement)`",
            docs: "https://packer.io/docs/templates/hcl_templates/variables#custom-validation-rules , https://www.packer.io/docs/templates/hcl_templates/functions/string/replace or https://www.packer.io/docs/templates/hcl_templates/functions/string/regex_replace",
        }),
    },
};

/// Look up a legacy function
pub fn lookup(name: &str) -> Option<&'static CallSpec> {
    CALLS.get(name)
}

/// All registered functions, sorted by name
pub fn all() -> Vec<(&'static str, &'static CallSpec)> {
    let mut entries: Vec<_> = CALLS.entries().map(|(name, spec)| (*name, spec)).collect();
    entries.sort_by_key(|(name, _)| *name);
    entries
}
