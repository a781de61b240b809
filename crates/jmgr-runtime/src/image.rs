use crate::gateway::{Invocation, ProcessGateway};
use crate::{host, tools, RuntimeError};
use std::path::{Path, PathBuf};
use tracing::info;

/// Local cache of FreeBSD `base.txz` archives, one per release.
pub struct OsImageCache {
    media_dir: PathBuf,
    url_prefix: String,
}

impl OsImageCache {
    pub fn new(media_dir: &Path, url_prefix: &str) -> Self {
        Self {
            media_dir: media_dir.to_path_buf(),
            url_prefix: url_prefix.trim_end_matches('/').to_owned(),
        }
    }

    pub fn archive_path(&self, release: &str) -> PathBuf {
        self.media_dir.join(format!("{release}.txz"))
    }

    /// Present and non-empty.
    pub fn is_cached(&self, release: &str) -> bool {
        std::fs::metadata(self.archive_path(release)).is_ok_and(|m| m.is_file() && m.len() > 0)
    }

    pub fn download_url(&self, machine: &str, release: &str) -> String {
        format!("{}/{machine}/{release}/base.txz", self.url_prefix)
    }

    /// Return the archive for `release`, downloading it first if needed.
    pub fn ensure_release(
        &self,
        gw: &dyn ProcessGateway,
        release: &str,
        progress: &dyn Fn(&str),
    ) -> Result<PathBuf, RuntimeError> {
        let archive = self.archive_path(release);
        if self.is_cached(release) {
            progress(&format!("using cached {}", archive.display()));
            return Ok(archive);
        }

        std::fs::create_dir_all(&self.media_dir)?;
        let machine = host::machine(gw)?;
        let url = self.download_url(&machine, release);
        progress(&format!("downloading FreeBSD: {url}"));
        let fetched = gw.output(
            &Invocation::new(tools::FETCH)
                .args(["-q", "-o"])
                .arg(archive.display().to_string())
                .arg(&url),
        );
        if let Err(e) = fetched {
            let _ = std::fs::remove_file(&archive);
            return Err(e);
        }
        info!("downloaded {url} to {}", archive.display());
        Ok(archive)
    }

    /// Unpack a cached archive into a jail root.
    pub fn unpack(
        &self,
        gw: &dyn ProcessGateway,
        archive: &Path,
        root: &Path,
        progress: &dyn Fn(&str),
    ) -> Result<(), RuntimeError> {
        progress(&format!(
            "unpacking {} to {}",
            archive.display(),
            root.display()
        ));
        gw.output(
            &Invocation::new(tools::TAR)
                .arg("-xf")
                .arg(archive.display().to_string())
                .arg("-C")
                .arg(root.display().to_string()),
        )?;
        Ok(())
    }
}
