//! Job sources shared by `submit` and `execute`

use anyhow::{Context, Result, bail};
use clap::Args;
use relay_core::domain::job::{Job, TestKind};
use relay_engine::TestSuiteBuilder;
use std::path::PathBuf;

/// Where test generation jobs come from
#[derive(Args, Debug)]
pub struct JobSource {
    /// Source files, one job each
    #[arg(long = "file", short = 'f')]
    pub files: Vec<PathBuf>,

    /// Unified diff, one job per changed file
    #[arg(long, conflicts_with = "files")]
    pub diff: Option<PathBuf>,

    /// Language of the code under test
    #[arg(long, short = 'l', default_value = "typescript")]
    pub language: String,

    /// Kind of tests to generate (unit, integration, mutation)
    #[arg(long, short = 'k', default_value = "unit")]
    pub kind: TestKind,
}

impl JobSource {
    pub async fn load(&self) -> Result<Vec<Job>> {
        let jobs = match &self.diff {
            Some(path) => {
                let diff = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read diff {}", path.display()))?;
                TestSuiteBuilder::from_git_diff(&diff, &self.language, self.kind)
            }
            None => TestSuiteBuilder::from_file_list(&self.files, &self.language, self.kind).await,
        };

        if jobs.is_empty() {
            bail!("No jobs to run: pass --file or a --diff with added lines");
        }
        Ok(jobs)
    }
}
