//! Tag reconciliation

use crate::commands::project::Project;

/// Extractor tags followed by the project techstack, verbatim
///
/// Order is kept and duplicates are not removed.
pub fn reconcile_tags(extracted: &[String], project: &Project) -> Vec<String> {
    extracted
        .iter()
        .chain(project.techstack.iter())
        .cloned()
        .collect()
}
