//! Calls command - list the legacy template calls and their HCL2 rewrites

use console::style;
use hclift_convert::registry::{self, ParamKind, Rewrite, Signature};

use crate::error::Result;

pub fn run() -> Result<()> {
    let entries = registry::all();
    let width = entries
        .iter()
        .map(|(name, spec)| usage(name, &spec.signature).len())
        .max()
        .unwrap_or(0);

    println!();
    println!("  {}", style("Legacy Calls").bold());
    println!("  {}", style("────────────").dim());

    for (name, spec) in &entries {
        let call = format!("{:<width$}", usage(name, &spec.signature), width = width);
        match spec.rewrite {
            Rewrite::Unconvertible(u) => {
                println!(
                    "  {} {}  {}",
                    style("✗").magenta(),
                    style(call).bold(),
                    style(format!("manual: {}", u.correspondence)).dim()
                );
            }
            ref rewrite => {
                println!(
                    "  {} {}  {}",
                    style("✓").green(),
                    style(call).bold(),
                    rewrite.describe()
                );
            }
        }
    }

    println!();
    Ok(())
}

/// `{{ name <string> <int> ... }}` shape of a call
fn usage(name: &str, signature: &Signature) -> String {
    let mut parts = vec![name.to_string()];
    parts.extend(signature.params.iter().map(|p| placeholder(*p)));
    if let Some(tail) = signature.variadic {
        parts.push(format!("[{}...]", placeholder(tail)));
    }
    parts.join(" ")
}

fn placeholder(kind: ParamKind) -> String {
    match kind {
        ParamKind::String => "<string>".to_string(),
        ParamKind::Int => "<int>".to_string(),
    }
}
