//! `sysbundle classify`.

use std::sync::Arc;

use owo_colors::OwoColorize;
use serde::Serialize;
use sysbundle_bundler::{
    ClassificationResult, ClassifierPolicy, ModuleClassifier, NodeModulesProbe, ResolutionError,
};

use super::load_options;
use crate::cli::ClassifyArgs;
use crate::error::Result;
use crate::ui::paint;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Row {
    Internal { id: String },
    Redirect { id: String, target: String },
    External { id: String },
    Unresolvable { id: String },
}

fn row(id: &str, result: std::result::Result<ClassificationResult, ResolutionError>) -> Row {
    let id = id.to_string();
    match result {
        Ok(ClassificationResult::Internal) => Row::Internal { id },
        Ok(ClassificationResult::Redirect(target)) => Row::Redirect { id, target },
        Ok(ClassificationResult::External(_)) => Row::External { id },
        Err(_) => Row::Unresolvable { id },
    }
}

/// Classify each id; fails with the first resolution error after printing
/// every row.
pub async fn execute(args: ClassifyArgs) -> Result<()> {
    let options = load_options(&args.project, Vec::new())?;
    let classifier = ModuleClassifier::new(
        ClassifierPolicy::from_config(&options.classifier),
        Arc::new(NodeModulesProbe::from_options(&options)),
    );

    let mut first_error = None;
    let mut rows = Vec::with_capacity(args.ids.len());
    for id in &args.ids {
        let result = classifier.classify(id);
        if let Err(err) = &result {
            first_error.get_or_insert_with(|| err.clone());
        }
        rows.push(row(id, result));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            match row {
                Row::Internal { id } => {
                    println!("{id}  {}", paint("internal", |s| s.dimmed().to_string()))
                }
                Row::Redirect { id, target } => {
                    println!("{id}  {} {target}", paint("redirect →", |s| s.cyan().to_string()))
                }
                Row::External { id } => {
                    println!("{id}  {}", paint("external", |s| s.green().to_string()))
                }
                Row::Unresolvable { id } => {
                    println!("{id}  {}", paint("unresolvable", |s| s.red().to_string()))
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(sysbundle_bundler::Error::from(err).into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_serialization() {
        let rows = vec![
            row("./a", Ok(ClassificationResult::Internal)),
            row(
                "@stencil/core/mock-doc",
                Ok(ClassificationResult::Redirect("../../mock-doc".to_string())),
            ),
            row(
                "typescript",
                Err(ResolutionError {
                    module_id: "typescript".to_string(),
                }),
            ),
        ];
        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(json[0]["kind"], "internal");
        assert_eq!(json[1]["target"], "../../mock-doc");
        assert_eq!(json[2]["kind"], "unresolvable");
    }
}
