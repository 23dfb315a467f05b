//! Upgrade command - convert a legacy JSON template to HCL2
//!
//! The generated document is written next to the template by default. With
//! `--dry-run` it goes to stdout and the report goes to stderr instead, so
//! the output can be piped.

use console::{Term, style};
use hclift_convert::{
    ConversionResult, ConversionWarning, ConvertOptions, Converter, WarningCategory,
    WarningSeverity,
};
use hclift_core::Template;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

pub fn run(
    template_path: &Path,
    output: Option<&Path>,
    allow_builder: Vec<String>,
    dry_run: bool,
    force: bool,
) -> Result<()> {
    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(template_path));

    if !dry_run && !force && output_path.exists() {
        return Err(CliError::output_exists(&output_path));
    }

    let template = Template::from_file(template_path)?;
    tracing::debug!(
        builders = template.builders.len(),
        provisioners = template.provisioners.len(),
        post_processors = template.post_processors.len(),
        "decoded template"
    );

    let converter = Converter::new(ConvertOptions {
        extra_builders: allow_builder,
    });
    let result = converter.convert(&template)?;

    let term = if dry_run { Term::stderr() } else { Term::stdout() };

    print_header(&term, template_path, &output_path, dry_run)?;

    if dry_run {
        print!("{}", result.output);
    } else {
        if let Some(parent) = output_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&output_path, &result.output)?;
        tracing::debug!(path = %output_path.display(), "wrote configuration");
    }

    print_warnings(&term, &result)?;
    print_summary(&term, &result, &output_path, dry_run)?;

    Ok(())
}

/// `<TEMPLATE>.pkr.hcl`, keeping the template's own extension
fn default_output_path(template_path: &Path) -> PathBuf {
    let mut name = OsString::from(template_path.as_os_str());
    name.push(".pkr.hcl");
    PathBuf::from(name)
}

fn print_header(term: &Term, template_path: &Path, output_path: &Path, dry_run: bool) -> Result<()> {
    term.write_line("")?;
    term.write_line(&format!(
        "  {} {} {}",
        style("hclift upgrade").bold().cyan(),
        style("─").dim(),
        style("JSON → HCL2").dim()
    ))?;
    term.write_line("")?;
    term.write_line(&format!(
        "  {} {}",
        style("Source:").dim(),
        style(template_path.display()).cyan()
    ))?;
    let target = if dry_run {
        style("stdout".to_string()).green()
    } else {
        style(output_path.display().to_string()).green()
    };
    term.write_line(&format!("  {} {}", style("Target:").dim(), target))?;
    term.write_line("")?;
    Ok(())
}

fn print_warnings(term: &Term, result: &ConversionResult) -> Result<()> {
    if result.warnings.is_empty() {
        return Ok(());
    }

    term.write_line(&format!("  {}", style("Conversion Notes").bold()))?;
    term.write_line(&format!("  {}", style("────────────────").dim()))?;
    term.write_line("")?;

    for (category, warnings) in result.warnings_by_category() {
        let heading = match category {
            WarningCategory::UnsupportedCall => format!(
                "{} {}",
                style("Unsupported").magenta().bold(),
                style("─ manual upgrade needed").dim()
            ),
            WarningCategory::Syntax => format!(
                "{} {}",
                style("Unconverted").yellow().bold(),
                style("─ left as-is behind a comment").dim()
            ),
            WarningCategory::Datasource => format!(
                "{} {}",
                style("Datasources").cyan().bold(),
                style("─ generated declarations").dim()
            ),
        };
        term.write_line(&format!("  {}", heading))?;
        for warning in warnings {
            print_warning(term, warning)?;
        }
        term.write_line("")?;
    }

    Ok(())
}

fn print_warning(term: &Term, warning: &ConversionWarning) -> Result<()> {
    let icon = match warning.severity {
        WarningSeverity::Info => style(warning.severity.icon()).cyan(),
        WarningSeverity::Warning => style(warning.severity.icon()).yellow(),
        WarningSeverity::Unsupported => style(warning.severity.icon()).magenta(),
    };

    term.write_line(&format!(
        "    {} {} {}",
        icon,
        style(&warning.pattern).bold(),
        style(format!("in {}", warning.section)).dim()
    ))?;
    term.write_line(&format!("      {}", style(&warning.message).dim()))?;

    if let Some(ref suggestion) = warning.suggestion {
        term.write_line(&format!("      {} {}", style("→").green(), suggestion))?;
    }

    if let Some(ref link) = warning.doc_link {
        term.write_line(&format!(
            "      {} {}",
            style("📖").dim(),
            style(link).underlined().dim()
        ))?;
    }

    Ok(())
}

fn print_summary(
    term: &Term,
    result: &ConversionResult,
    output_path: &Path,
    dry_run: bool,
) -> Result<()> {
    let unsupported = result.count_by_severity(WarningSeverity::Unsupported);
    let unconverted = result.count_by_severity(WarningSeverity::Warning);

    term.write_line(&format!("  {}", style("Summary").bold()))?;
    term.write_line(&format!("  {}", style("───────").dim()))?;

    term.write_line(&format!(
        "  {} {}",
        style(format!("{:>3}", result.sources)).green().bold(),
        plural(result.sources, "source")
    ))?;

    if result.secret_datasources > 0 {
        term.write_line(&format!(
            "  {} {}",
            style(format!("{:>3}", result.secret_datasources)).blue().bold(),
            plural(result.secret_datasources, "secret datasource")
        ))?;
    }

    if result.image_datasources > 0 {
        term.write_line(&format!(
            "  {} {}",
            style(format!("{:>3}", result.image_datasources)).blue().bold(),
            plural(result.image_datasources, "image datasource")
        ))?;
    }

    if unsupported > 0 {
        term.write_line(&format!(
            "  {} {} {}",
            style(format!("{:>3}", unsupported)).magenta().bold(),
            plural(unsupported, "unsupported call"),
            style("(needs manual fix)").dim()
        ))?;
    }

    if unconverted > 0 {
        term.write_line(&format!(
            "  {} {} {}",
            style(format!("{:>3}", unconverted)).yellow().bold(),
            plural(unconverted, "unconverted block"),
            style("(review recommended)").dim()
        ))?;
    }

    term.write_line("")?;

    if dry_run {
        term.write_line(&format!(
            "  {} {}",
            style("ℹ").cyan(),
            style("Dry run mode - no files were written").dim()
        ))?;
    } else {
        term.write_line(&format!(
            "  {} {} {}",
            style("✓").green().bold(),
            result.success_message(),
            style(format!("→ {}", output_path.display())).dim()
        ))?;
    }
    term.write_line("")?;

    Ok(())
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{}s", noun)
    }
}
