//! The regression locker: a reference library of locked component geometry.
//!
//! For every registered component type the library directory holds a
//! `<type>.gds` file plus two sidecars: `<type>.json` (the settings the
//! component was built with) and `<type>.ports` (its port list). Locking a
//! component accepts its current geometry as the new baseline; comparing
//! rebuilds it into a scratch directory and checks the geometry hash against
//! the locked reference.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::{LumenCtx, TechnologyConfig};
use crate::deps::arcstr::ArcStr;
use crate::error::{ErrorSource, Result};
use crate::io;
use crate::layout::cell::{Cell, Flatten, Instance};
use crate::log;
use crate::registry::ComponentRegistry;

use self::diff::{diff_settings, SettingsDiff};
use self::hash::gds_hash;

pub mod diff;
pub mod hash;

/// The file extensions making up one library entry. All three files are
/// written and promoted together.
const SIDECAR_EXTS: [&str; 3] = ["gds", "json", "ports"];

/// On-disk locker configuration, loadable from `lumen.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockerConfig {
    /// The reference library directory.
    pub gdslib: PathBuf,
    /// The scratch directory test builds are written into.
    pub gdslib_test: PathBuf,
    /// Optional technology override (name and grid).
    pub technology: Option<TechnologyConfig>,
}

impl Default for LockerConfig {
    fn default() -> Self {
        Self {
            gdslib: PathBuf::from("gdslib"),
            gdslib_test: PathBuf::from("build/gdslib_test"),
            technology: None,
        }
    }
}

impl LockerConfig {
    /// Loads a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = io::read_to_string(path)?;
        let config = toml::from_str(&data).map_err(ErrorSource::TomlParsing)?;
        Ok(config)
    }

    /// Loads `lumen.toml` from the current directory if it exists, falling
    /// back to the defaults.
    pub fn discover() -> Result<Self> {
        let path = Path::new("lumen.toml");
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Options controlling how components are written to the library.
#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    /// Flatten cells before writing them.
    ///
    /// Flat references hash identically regardless of how sub-cells were
    /// shared during generation, at the cost of larger files for big
    /// components.
    pub flatten: bool,
    /// On a hash mismatch, write a `<type>_diff.gds` overlay of the old and
    /// new geometry into the test directory for visual inspection.
    pub write_overlay: bool,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            flatten: true,
            write_overlay: false,
        }
    }
}

/// The outcome of comparing one component against the reference library.
#[derive(Debug, Clone)]
pub enum CompareStatus {
    /// The geometry hash matches the locked reference.
    Match,
    /// No reference existed; the component was written as the new baseline.
    /// This is a first write, not a failure.
    New,
    /// The geometry hash differs from the locked reference.
    Mismatch {
        /// The settings diff between the locked entry and the fresh build.
        /// Empty if the settings are identical and only the geometry
        /// generation changed.
        diff: SettingsDiff,
    },
}

impl CompareStatus {
    /// Returns `true` if the component does not need re-locking.
    pub fn is_ok(&self) -> bool {
        !matches!(self, CompareStatus::Mismatch { .. })
    }
}

/// The per-entry outcome of a batch operation.
#[derive(Debug, Clone)]
pub enum BatchStatus {
    /// Hash matches the reference; no files were touched.
    Unchanged,
    /// First write of a new reference entry.
    New,
    /// Hash differed from the reference.
    Changed { diff: SettingsDiff },
    /// The component could not be built or compared.
    Failed(String),
}

/// One line of a batch report.
#[derive(Debug, Clone)]
pub struct BatchRecord {
    pub component_type: ArcStr,
    pub status: BatchStatus,
}

/// The regression locker: builds registered components and compares them
/// against a reference library on disk.
///
/// The locker assumes exclusive, sequential access to the library directory
/// for the duration of a batch run.
pub struct Locker {
    registry: ComponentRegistry,
    path_library: PathBuf,
    path_test: PathBuf,
    options: LockOptions,
}

impl Locker {
    /// Creates a locker over the given registry and directories.
    pub fn new(
        registry: ComponentRegistry,
        path_library: impl Into<PathBuf>,
        path_test: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            path_library: path_library.into(),
            path_test: path_test.into(),
            options: LockOptions::default(),
        }
    }

    /// Replaces the locker's options.
    pub fn with_options(mut self, options: LockOptions) -> Self {
        self.options = options;
        self
    }

    /// The locker's registry.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// The reference library directory.
    pub fn path_library(&self) -> &Path {
        &self.path_library
    }

    /// Builds `component_type` and writes it into the reference library as
    /// the new baseline.
    pub fn lock(&self, ctx: &LumenCtx, component_type: &str) -> Result<Arc<Cell>> {
        let cell = self.registry.build(ctx, component_type)?;
        log::info!(
            "locking {} to {}",
            component_type,
            self.path_library.display()
        );
        self.write_entry(ctx, &cell, &self.path_library, component_type)?;
        Ok(cell)
    }

    /// Builds `component_type` into the test directory and compares its
    /// geometry hash against the reference library.
    ///
    /// If no reference exists yet, the fresh build is written as the new
    /// baseline and [`CompareStatus::New`] is returned; this is not a
    /// failure.
    pub fn compare(&self, ctx: &LumenCtx, component_type: &str) -> Result<CompareStatus> {
        let cell = self.registry.build(ctx, component_type)?;
        self.write_entry(ctx, &cell, &self.path_test, component_type)?;

        let gds_test = self.entry_path(&self.path_test, component_type, "gds");
        let gds_library = self.entry_path(&self.path_library, component_type, "gds");

        if !gds_library.is_file() {
            log::info!(
                "writing new component {} into {}",
                component_type,
                self.path_library.display()
            );
            self.write_entry(ctx, &cell, &self.path_library, component_type)?;
            return Ok(CompareStatus::New);
        }

        let hash_test = gds_hash(&gds_test)?;
        let hash_library = gds_hash(&gds_library)?;
        if hash_test == hash_library {
            return Ok(CompareStatus::Match);
        }

        let diff = self.settings_diff(component_type)?;
        if self.options.write_overlay {
            let overlay = self.write_overlay(ctx, &cell, &gds_library, component_type)?;
            log::info!(
                "geometry overlay for {} written to {}",
                component_type,
                overlay.display()
            );
        }
        Ok(CompareStatus::Mismatch { diff })
    }

    /// Compares every registry entry and re-locks the entries whose hash
    /// changed.
    ///
    /// Entries whose hash matches are not touched on disk. A failing entry
    /// is recorded and skipped; it does not abort the rest of the batch.
    pub fn lock_changed(&self, ctx: &LumenCtx) -> Vec<BatchRecord> {
        self.for_each_entry(ctx, |component_type, status| {
            if let BatchStatus::Changed { .. } = status {
                if let Err(err) = self.lock(ctx, component_type) {
                    return BatchStatus::Failed(format!("{err}"));
                }
            }
            status
        })
    }

    /// Compares every registry entry and reports the result without
    /// mutating the library.
    pub fn report_changed(&self, ctx: &LumenCtx) -> Vec<BatchRecord> {
        self.for_each_entry(ctx, |_, status| status)
    }

    /// Asserts that every registry entry matches the locked reference.
    ///
    /// Unlike the batch operations, this is strict: the first build failure
    /// or hash mismatch fails the whole run. First writes of new entries are
    /// not failures.
    pub fn assert_unchanged(&self, ctx: &LumenCtx) -> Result<()> {
        for component_type in self.registry.names() {
            let status = self.compare(ctx, &component_type)?;
            if let CompareStatus::Mismatch { diff } = status {
                log::error!("{} changed:\n{}", component_type, diff);
                return Err(ErrorSource::ReferenceMismatch(component_type).into());
            }
        }
        Ok(())
    }

    /// Best-effort `git pull` of the reference library directory.
    ///
    /// Reference libraries are often shared through a git repository;
    /// pulling before a batch comparison avoids spurious mismatches against
    /// a stale checkout. Failures (no git, no remote, offline) are logged
    /// and ignored, never retried.
    pub fn pull_library(&self) {
        if !self.path_library.is_dir() {
            return;
        }
        log::info!("git pull: {}", self.path_library.display());
        match Command::new("git")
            .arg("pull")
            .current_dir(&self.path_library)
            .output()
        {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                log::warn!(
                    "error pulling {}: {}",
                    self.path_library.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Err(err) => {
                log::warn!("error pulling {}: {}", self.path_library.display(), err);
            }
        }
    }

    /// Promotes a test build into the reference library, copying the GDS
    /// file and both sidecars together.
    pub fn promote(&self, component_type: &str) -> Result<()> {
        io::create_dir_all(&self.path_library)?;
        for ext in SIDECAR_EXTS {
            let src = self.entry_path(&self.path_test, component_type, ext);
            let dst = self.entry_path(&self.path_library, component_type, ext);
            std::fs::copy(&src, &dst).map_err(ErrorSource::Io)?;
        }
        Ok(())
    }

    fn for_each_entry(
        &self,
        ctx: &LumenCtx,
        mut handle: impl FnMut(&str, BatchStatus) -> BatchStatus,
    ) -> Vec<BatchRecord> {
        let mut records = Vec::new();
        for component_type in self.registry.names() {
            let status = match self.compare(ctx, &component_type) {
                Ok(CompareStatus::Match) => BatchStatus::Unchanged,
                Ok(CompareStatus::New) => BatchStatus::New,
                Ok(CompareStatus::Mismatch { diff }) => BatchStatus::Changed { diff },
                Err(err) => {
                    log::error!("error processing {}: {}", component_type, err);
                    BatchStatus::Failed(format!("{err}"))
                }
            };
            let status = handle(component_type.as_str(), status);
            records.push(BatchRecord {
                component_type,
                status,
            });
        }
        records
    }

    fn entry_path(&self, dir: &Path, component_type: &str, ext: &str) -> PathBuf {
        dir.join(format!("{component_type}.{ext}"))
    }

    /// Writes one library entry: the GDS file plus its settings and port
    /// sidecars.
    fn write_entry(
        &self,
        ctx: &LumenCtx,
        cell: &Arc<Cell>,
        dir: &Path,
        component_type: &str,
    ) -> Result<()> {
        io::create_dir_all(dir)?;

        let gds_path = self.entry_path(dir, component_type, "gds");
        if self.options.flatten {
            let mut flat = (**cell).clone();
            flat.thaw();
            flat.flatten();
            ctx.write_cell(Arc::new(flat), &gds_path)?;
        } else {
            ctx.write_cell(cell.clone(), &gds_path)?;
        }

        let settings = serde_json::json!({
            "component": component_type,
            "name": cell.name().as_str(),
            "settings": self.registry.settings(component_type)?,
        });
        let json_path = self.entry_path(dir, component_type, "json");
        io::write_string(
            json_path,
            &serde_json::to_string_pretty(&settings).map_err(ErrorSource::Json)?,
        )?;

        let mut ports = String::new();
        for port in cell.ports_sorted() {
            ports.push_str(&format!(
                "{} {} {} {} {}\n",
                port.name(),
                port.midpoint().x,
                port.midpoint().y,
                port.width(),
                port.orientation(),
            ));
        }
        let ports_path = self.entry_path(dir, component_type, "ports");
        io::write_string(ports_path, &ports)?;

        Ok(())
    }

    /// The settings diff between the locked entry's sidecar and the
    /// registry's current settings for `component_type`.
    fn settings_diff(&self, component_type: &str) -> Result<SettingsDiff> {
        let json_path = self.entry_path(&self.path_library, component_type, "json");
        let locked: serde_json::Value =
            serde_json::from_str(&io::read_to_string(json_path)?).map_err(ErrorSource::Json)?;
        let locked_settings = locked
            .get("settings")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        Ok(diff_settings(
            &locked_settings,
            self.registry.settings(component_type)?,
        ))
    }

    /// Writes a flat overlay of the fresh and locked geometry into the
    /// test directory, for visual inspection of a mismatch.
    fn write_overlay(
        &self,
        ctx: &LumenCtx,
        fresh: &Arc<Cell>,
        gds_library: &Path,
        component_type: &str,
    ) -> Result<PathBuf> {
        let imported = ctx.from_gds(gds_library)?;

        // Only overlay the imported top cells: cells referenced by another
        // imported cell are already part of their parent's flattened
        // geometry.
        let referenced: std::collections::HashSet<ArcStr> = imported
            .values()
            .flat_map(|cell| cell.insts().map(|inst| inst.cell().name().clone()))
            .collect();

        let mut overlay = Cell::default();
        overlay.set_name(arcstr::format!("{}_diff", component_type));
        let mut new_flat = (**fresh).clone();
        new_flat.thaw();
        new_flat.flatten();
        overlay.absorb(Instance::new(Arc::new(new_flat)));
        for (name, cell) in imported.iter() {
            if referenced.contains(name) {
                continue;
            }
            let mut lib_flat = (**cell).clone();
            lib_flat.thaw();
            lib_flat.flatten();
            overlay.absorb(Instance::new(Arc::new(lib_flat)));
        }

        let path = self
            .path_test
            .join(format!("{component_type}_diff.gds"));
        ctx.write_cell(Arc::new(overlay), &path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_missing_keys() {
        let config: LockerConfig = toml::from_str("gdslib = \"refs\"\n").unwrap();
        assert_eq!(config.gdslib, PathBuf::from("refs"));
        assert_eq!(config.gdslib_test, PathBuf::from("build/gdslib_test"));
        assert!(config.technology.is_none());
    }

    #[test]
    fn config_technology_override() {
        let config: LockerConfig =
            toml::from_str("[technology]\nname = \"foundry_a\"\ngrid = 5\n").unwrap();
        let tech = config.technology.unwrap().to_technology();
        assert_eq!(tech.name, "foundry_a");
        assert_eq!(tech.grid, 5);
    }
}
