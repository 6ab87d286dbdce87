use std::path::PathBuf;

use thiserror::Error;
use tokio::task::JoinError;

use crate::harmonize::error::HarmonizeError;
use crate::pvgis::error::ProviderError;
use crate::reanalysis::error::ReanalysisError;

#[derive(Debug, Error)]
pub enum SolarMetError {
    #[error(transparent)]
    Reanalysis(#[from] ReanalysisError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Harmonize(#[from] HarmonizeError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrame(#[from] polars::error::PolarsError),

    #[error("Failed to determine data directory")]
    DataDirResolution(#[source] std::io::Error),

    #[error("Failed to create data directory '{0}'")]
    DataDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to write weather table to '{0}'")]
    SaveIo(PathBuf, #[source] std::io::Error),

    #[error("Failed to serialize weather table to '{0}'")]
    SavePolars(PathBuf, #[source] polars::error::PolarsError),

    #[error("Failed to run blocking task: {0}")]
    TaskJoin(#[from] JoinError),
}
