//! `sysbundle clean-cache`.

use sysbundle_bundler::clean_cache;

use super::load_options;
use crate::cli::CleanCacheArgs;
use crate::error::Result;
use crate::ui;

pub async fn execute(args: CleanCacheArgs) -> Result<()> {
    let options = load_options(&args.project, Vec::new())?;
    for dir in clean_cache(&options).await? {
        ui::success(&format!("Removed {}", dir.display()));
    }
    Ok(())
}
