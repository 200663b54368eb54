//! `sysbundle build`.

use figment::providers::Serialized;
use serde_json::json;
use sysbundle_bundler::{FailurePolicy, Pipeline};

use super::{Override, load_options};
use crate::cli::BuildArgs;
use crate::error::Result;
use crate::ui;

/// CLI flags that override configuration values.
fn overrides(args: &BuildArgs) -> Vec<Override> {
    let mut overrides = Vec::new();
    if args.prod {
        overrides.push(Serialized::default("is_prod", json!(true)));
    }
    if let Some(max_parallel) = args.max_parallel {
        overrides.push(Serialized::default("max_parallel", json!(max_parallel)));
    }
    if args.detach_on_failure {
        overrides.push(Serialized::default("on_failure", json!(FailurePolicy::Detach)));
    }
    overrides
}

/// Load options, run the full pipeline and report the result.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let options = load_options(&args.project, overrides(&args))?;

    if !args.json {
        ui::info(&format!(
            "Building {} external dependencies ({})",
            options.targets.node.len() + options.targets.browser.len(),
            if options.is_prod { "production" } else { "development" }
        ));
        if options.on_failure == FailurePolicy::Detach {
            ui::warning("Jobs keep running after a failure; outputs of a failed build may be partial");
        }
    }

    let summary = Pipeline::new(options).run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        ui::print_build_summary(&summary);
        ui::success(&format!(
            "Build completed in {}",
            ui::format_duration(summary.elapsed)
        ));
    }
    Ok(())
}
