use std::io;
use std::path::{Path, PathBuf};

use log::info;

const DATA_DIR_NAME: &str = "solarmet";

/// Default root for downloaded weather data, under the OS cache directory.
pub fn default_data_dir() -> io::Result<PathBuf> {
    dirs::cache_dir()
        .map(|p| p.join(DATA_DIR_NAME))
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine system cache directory",
            )
        })
}

pub async fn ensure_dir_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("Data path exists but is not a directory: {}", path.display()),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating data directory: {}", path.display());
            tokio::fs::create_dir_all(path).await
        }
        Err(e) => Err(e),
    }
}
