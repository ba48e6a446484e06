//! Cookbook packaging.
//!
//! Configured cookbook directories that exist locally are archived into a
//! gzipped tarball, uploaded to the workspace and extracted there. Each
//! directory keeps its configured relative path inside the archive, which is
//! also the path `solo.rb` declares.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::event::Event;
use crate::exec::Executor;
use crate::provision::{PreconditionError, ProvisionError};
use crate::remote::Remote;
use crate::workspace::Workspace;

/// Archive name inside the workspace.
pub const ARCHIVE: &str = "cookbooks.tar.gz";

/// Metadata files macOS sprinkles into directories.
const MACOS_METADATA: &[&str] = &[".DS_Store"];
const APPLEDOUBLE_PREFIX: &str = "._";

const CURRENT_DIR: &str = ".";

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("failed to walk {path}: {message}")]
  Walk { path: String, message: String },

  #[error("failed to write cookbook archive: {0}")]
  Io(#[from] std::io::Error),
}

/// The configured directories that exist under `base_dir`, in configured order.
pub fn existing_cookbooks(configured: &[String], base_dir: &Path) -> Vec<String> {
  configured
    .iter()
    .filter(|dir| base_dir.join(dir).is_dir())
    .cloned()
    .collect()
}

/// Path of a cookbook directory inside the archive and the extracted workspace.
///
/// Root, `.` and `..` components are dropped, so every directory lands
/// inside the workspace. A directory with nothing left (the project root
/// itself) is archived at the top level and named `.`.
pub fn archive_name(dir: &str) -> String {
  let name = Path::new(dir)
    .components()
    .filter_map(|component| match component {
      Component::Normal(part) => Some(part.to_string_lossy().to_string()),
      _ => None,
    })
    .collect::<Vec<_>>()
    .join("/");
  if name.is_empty() { CURRENT_DIR.to_string() } else { name }
}

fn is_macos_metadata(name: &str) -> bool {
  name.starts_with(APPLEDOUBLE_PREFIX) || MACOS_METADATA.contains(&name)
}

/// Write a gzipped tarball of `dirs` (relative to `base_dir`) into `writer`.
///
/// Symlinks are archived as links. With `skip_metadata`, AppleDouble (`._*`)
/// and `.DS_Store` files are left out.
pub fn build_archive<W: Write>(dirs: &[String], base_dir: &Path, writer: W, skip_metadata: bool) -> Result<W, PackageError> {
  let mut builder = tar::Builder::new(GzEncoder::new(writer, Compression::default()));
  builder.follow_symlinks(false);

  for dir in dirs {
    let root = base_dir.join(dir);
    let name = match archive_name(dir) {
      top if top == CURRENT_DIR => PathBuf::new(),
      name => PathBuf::from(name),
    };

    let walker = WalkDir::new(&root)
      .follow_links(false)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(|entry| {
        !skip_metadata || entry.depth() == 0 || !entry.file_name().to_str().is_some_and(is_macos_metadata)
      });

    for entry in walker {
      let entry = entry.map_err(|e| PackageError::Walk {
        path: root.display().to_string(),
        message: e.to_string(),
      })?;
      let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
      let entry_name = if rel.as_os_str().is_empty() {
        name.clone()
      } else {
        name.join(rel)
      };
      // The top-level directory has no entry of its own.
      if entry_name.as_os_str().is_empty() {
        continue;
      }
      builder.append_path_with_name(entry.path(), &entry_name)?;
    }
  }

  let mut writer = builder.into_inner()?.finish()?;
  writer.flush()?;
  Ok(writer)
}

/// Archives local cookbooks and unpacks them in the workspace.
#[derive(Debug, Clone)]
pub struct ArtifactPackager {
  base_dir: PathBuf,
  copyfile_disable: bool,
}

impl ArtifactPackager {
  /// Cookbook directories are resolved against `base_dir`.
  pub fn new(base_dir: impl Into<PathBuf>, copyfile_disable: bool) -> Self {
    Self {
      base_dir: base_dir.into(),
      copyfile_disable,
    }
  }

  fn skip_metadata(&self) -> bool {
    self.copyfile_disable && cfg!(target_os = "macos")
  }

  /// Package the existing directories among `configured`, returning them.
  ///
  /// Fails before touching the host when none exist. The local archive is a
  /// temporary file removed whether or not the upload succeeds.
  pub async fn package<R: Remote>(
    &self,
    exec: &Executor<'_, R>,
    workspace: &mut Workspace,
    configured: &[String],
  ) -> Result<Vec<String>, ProvisionError> {
    let dirs = existing_cookbooks(configured, &self.base_dir);
    if dirs.is_empty() {
      return Err(
        PreconditionError::NoCookbooks {
          searched: configured.to_vec(),
        }
        .into(),
      );
    }

    let mut archive = tempfile::Builder::new()
      .prefix("cookbooks")
      .suffix(".tar.gz")
      .tempfile()
      .map_err(PackageError::from)?;
    build_archive(&dirs, &self.base_dir, archive.as_file_mut(), self.skip_metadata())?;
    let bytes = archive.as_file().metadata().map_err(PackageError::from)?.len();
    debug!(path = ?archive.path(), bytes, "built cookbook archive");

    let remote_path = workspace.path(exec, &[ARCHIVE]).await?;
    exec.remote().upload(archive.path(), &remote_path).await?;
    exec
      .execute(&format!("cd {} && tar -xzf {}", workspace.base_path(), ARCHIVE))
      .await?;

    exec.reporter().report(Event::CookbooksPackaged {
      paths: dirs.clone(),
      bytes,
    });
    Ok(dirs)
  }
}
