//! Parse command implementation.
//!
//! Compiles a filter expression against a collection hierarchy and prints the
//! canonical expression, or the full compile result with `--json`.

use std::path::{Path, PathBuf};

use calfilter::{FilterCompiler, MemoryHierarchy};
use tracing::debug;

use super::config::load_config;
use super::{CommandContext, CommandError, Result};
use crate::output::{format_filter_text, format_result_json};

/// Options for the parse command.
#[derive(Debug, Default)]
pub struct ParseOptions {
    /// The filter expression.
    pub expr: String,
    /// Hierarchy file overriding the configured one.
    pub hierarchy: Option<PathBuf>,
    /// Whether the selection is explicit.
    pub explicit: bool,
    /// Label prefixed to error messages.
    pub source: String,
}

/// Executes the parse command.
pub fn execute(ctx: &CommandContext, opts: &ParseOptions) -> Result<()> {
    let config = load_config(ctx)?;
    let hierarchy_path = opts.hierarchy.as_deref().or(config.hierarchy.as_deref());
    let hierarchy = load_hierarchy(hierarchy_path)?;

    let compiler = FilterCompiler::with_config(&hierarchy, config.compiler);
    let result = compiler.parse(&opts.expr, opts.explicit, &opts.source);

    if ctx.json_output {
        // Failures are printed too; the exit code still reflects them.
        println!("{}", format_result_json(&result)?);
    }
    if !result.ok {
        return Err(CommandError::from(result));
    }

    if let (false, Some(filter)) = (ctx.json_output, result.filter.as_ref()) {
        println!("{}", format_filter_text(filter, ctx.use_colors));
    }

    Ok(())
}

/// Loads the hierarchy file, or an empty hierarchy when none is configured.
fn load_hierarchy(path: Option<&Path>) -> Result<MemoryHierarchy> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading hierarchy");
            Ok(MemoryHierarchy::load(path)?)
        }
        None => {
            debug!("no hierarchy configured, using an empty one");
            Ok(MemoryHierarchy::new())
        }
    }
}
