//! Implementation of the `kodu template` commands.

use super::read_input;
use crate::agent::prompt::template::expand;
use crate::agent::prompt::{ConditionalBlock, FeatureFlags, validate_template};
use crate::cli::{TemplateExpandArgs, TemplateFileArgs};
use crate::error::{KoduError, Result};

/// Execute `kodu template validate`.
///
/// Errors are printed and fail the command with a configuration error;
/// warnings go to stderr and do not.
pub fn cmd_validate(args: TemplateFileArgs) -> Result<()> {
    let source = read_input(&args.file)?;
    let report = validate_template(&source);

    for warning in &report.warnings {
        eprintln!("Warning: {}", warning);
    }

    if !report.is_valid {
        for error in &report.errors {
            println!("  - {}", error);
        }
        return Err(KoduError::ConfigError(format!(
            "template '{}' has {} error(s)",
            args.file,
            report.errors.len()
        )));
    }

    println!("Template '{}' is valid.", args.file);
    Ok(())
}

/// Execute `kodu template expand`.
pub fn cmd_expand(args: TemplateExpandArgs) -> Result<()> {
    let source = read_input(&args.file)?;
    print!("{}", expand_source(&source, args.vision)?);
    Ok(())
}

pub(super) fn expand_source(source: &str, vision: bool) -> Result<String> {
    let flags = FeatureFlags::new().with(ConditionalBlock::Vision, vision);
    expand(source, &flags)
}
