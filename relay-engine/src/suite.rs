//! Test suite builders
//!
//! Turn source files or a unified diff into test generation jobs.

use relay_core::domain::job::{Job, TestKind};
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

/// Priority given to jobs built from whole files
pub const FILE_PRIORITY: u8 = 1;

/// Priority given to jobs built from diff sections
pub const DIFF_PRIORITY: u8 = 2;

const DIFF_SECTION_MARKER: &str = "diff --git";

pub struct TestSuiteBuilder;

impl TestSuiteBuilder {
    /// One job per readable file; unreadable files are skipped
    pub async fn from_file_list<P: AsRef<Path>>(
        paths: &[P],
        language: &str,
        kind: TestKind,
    ) -> Vec<Job> {
        let mut jobs = Vec::with_capacity(paths.len());

        for (index, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            match tokio::fs::read_to_string(path).await {
                Ok(code) => {
                    let id = format!("file-{}-{}", index, Uuid::new_v4());
                    debug!("Built job {} from {}", id, path.display());
                    jobs.push(
                        Job::test_generation(id, code, language, kind)
                            .with_priority(FILE_PRIORITY),
                    );
                }
                Err(e) => warn!("Could not read file {}: {}", path.display(), e),
            }
        }

        jobs
    }

    /// One job per file section of a unified diff, built from its added lines
    ///
    /// Sections without added lines produce no job, and anything before the
    /// first section (a commit message, say) is ignored.
    pub fn from_git_diff(diff: &str, language: &str, kind: TestKind) -> Vec<Job> {
        diff.split(DIFF_SECTION_MARKER)
            .skip(1)
            .filter_map(added_lines)
            .enumerate()
            .map(|(index, added)| {
                Job::test_generation(
                    format!("diff-{}-{}", index, Uuid::new_v4()),
                    added,
                    language,
                    kind,
                )
                .with_priority(DIFF_PRIORITY)
            })
            .collect()
    }
}

fn added_lines(section: &str) -> Option<String> {
    let added: Vec<&str> = section
        .lines()
        .filter(|line| !line.starts_with("+++"))
        .filter_map(|line| line.strip_prefix('+'))
        .collect();

    if added.is_empty() {
        None
    } else {
        Some(added.join("\n"))
    }
}
