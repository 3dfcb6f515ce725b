//! The kernel update sequence.
//!
//! A full update syncs the configuration of the newest installed kernel into
//! the source tree, compiles, installs, optionally rebuilds out-of-tree
//! modules, retires old versions and optionally regenerates the bootloader
//! menu. The first failing stage aborts the run.

use std::fmt;
use std::fs;

use kbuild_registry::{KernelLayout, NamingScheme, Registry};
use serde::Serialize;

use crate::config::KbuildConfig;
use crate::error::{UpdateError, UpdateResult};
use crate::preflight;
use crate::retention::{RetentionEngine, RetentionPolicy, RetentionReport};
use crate::runner::{CommandRunner, Invocation};

const FALLBACK_JOBS: usize = 4;

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Take the config from the newest installed kernel, then build and install.
    Full,
    /// The user already edited `.config`; build and install as-is.
    ManualConfig,
    /// Only retire old kernels.
    CleanOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStage {
    ConfigSync,
    Compile,
    InstallArtifacts,
    RebuildExtraModules,
    Retention,
    RegenerateBootloader,
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UpdateStage::ConfigSync => "config sync",
            UpdateStage::Compile => "compile",
            UpdateStage::InstallArtifacts => "install",
            UpdateStage::RebuildExtraModules => "module rebuild",
            UpdateStage::Retention => "retention",
            UpdateStage::RegenerateBootloader => "bootloader regeneration",
        })
    }
}

/// Optional stages and build knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    pub regenerate_bootloader: bool,
    pub rebuild_extra_modules: bool,
    /// Parallel jobs for `make`; detected from the host when unset.
    pub jobs: Option<usize>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            regenerate_bootloader: true,
            rebuild_extra_modules: true,
            jobs: None,
        }
    }
}

/// Stages of `mode`, in execution order.
pub fn stages(mode: UpdateMode, options: &UpdateOptions) -> Vec<UpdateStage> {
    let mut stages = Vec::new();
    if mode == UpdateMode::CleanOnly {
        stages.push(UpdateStage::Retention);
        return stages;
    }

    if mode == UpdateMode::Full {
        stages.push(UpdateStage::ConfigSync);
    }
    stages.push(UpdateStage::Compile);
    stages.push(UpdateStage::InstallArtifacts);
    if options.rebuild_extra_modules {
        stages.push(UpdateStage::RebuildExtraModules);
    }
    stages.push(UpdateStage::Retention);
    if options.regenerate_bootloader {
        stages.push(UpdateStage::RegenerateBootloader);
    }
    stages
}

/// What a completed run did.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    pub stages_run: Vec<UpdateStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention: Option<RetentionReport>,
}

/// Drives the update sequence through a [`CommandRunner`].
pub struct KernelUpdater<R> {
    layout: KernelLayout,
    scheme: NamingScheme,
    policy: RetentionPolicy,
    options: UpdateOptions,
    runner: R,
}

impl<R: CommandRunner> KernelUpdater<R> {
    pub fn new(
        layout: KernelLayout,
        scheme: NamingScheme,
        policy: RetentionPolicy,
        options: UpdateOptions,
        runner: R,
    ) -> Self {
        Self {
            layout,
            scheme,
            policy,
            options,
            runner,
        }
    }

    /// Build an updater from loaded configuration.
    pub fn from_config(config: &KbuildConfig, runner: R) -> Self {
        let options = UpdateOptions {
            regenerate_bootloader: config.settings.regenerate_grub_config,
            rebuild_extra_modules: config.settings.emerge_module_rebuild,
            jobs: None,
        };
        Self::new(
            config.layout(),
            config.naming(),
            config.retention_policy(),
            options,
            runner,
        )
    }

    pub fn with_dry_run(mut self) -> Self {
        self.policy = self.policy.with_dry_run();
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.options.jobs = Some(jobs);
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn stages(&self, mode: UpdateMode) -> Vec<UpdateStage> {
        stages(mode, &self.options)
    }

    /// Host tools `mode` needs, as `(command, package)` pairs.
    pub fn required_tools(&self, mode: UpdateMode) -> Vec<(&'static str, &'static str)> {
        self.stages(mode)
            .into_iter()
            .filter_map(|stage| match stage {
                UpdateStage::Compile => Some(("make", "sys-devel/make")),
                UpdateStage::RebuildExtraModules => Some(("emerge", "sys-apps/portage")),
                UpdateStage::RegenerateBootloader => Some(("grub-mkconfig", "sys-boot/grub")),
                _ => None,
            })
            .collect()
    }

    /// Verify the tools `mode` runs are on `PATH`.
    pub fn preflight(&self, mode: UpdateMode) -> UpdateResult<()> {
        preflight::check_required_tools(&self.required_tools(mode))
    }

    /// Run every stage of `mode`, stopping at the first error.
    pub fn run(&self, mode: UpdateMode) -> UpdateResult<UpdateOutcome> {
        let mut outcome = UpdateOutcome {
            stages_run: Vec::new(),
            retention: None,
        };

        for stage in self.stages(mode) {
            tracing::info!(%stage, "starting stage");
            match stage {
                UpdateStage::ConfigSync => self.sync_config()?,
                UpdateStage::Compile => self.compile()?,
                UpdateStage::InstallArtifacts => self.install()?,
                UpdateStage::RebuildExtraModules => self.rebuild_extra_modules()?,
                UpdateStage::Retention => outcome.retention = Some(self.retain()?),
                UpdateStage::RegenerateBootloader => self.regenerate_bootloader()?,
            }
            outcome.stages_run.push(stage);
        }

        Ok(outcome)
    }

    /// Copy the newest installed config into the source tree and run
    /// `make oldconfig` on it.
    fn sync_config(&self) -> UpdateResult<()> {
        let registry = Registry::discover(&self.layout.install_dir, &self.scheme)?;
        let newest = registry
            .newest()
            .ok_or_else(|| UpdateError::NoInstalledKernel(self.layout.install_dir.clone()))?;

        let dest = self.layout.source_root.join(".config");
        tracing::info!(from = %newest.config().display(), to = %dest.display(), "copying kernel config");
        fs::copy(newest.config(), &dest).map_err(|e| UpdateError::Io {
            path: dest.clone(),
            source: e,
        })?;

        self.make(["oldconfig"])
    }

    fn compile(&self) -> UpdateResult<()> {
        let jobs = self.jobs().to_string();
        self.make(["--jobs", jobs.as_str(), "--load-average", jobs.as_str()])
    }

    fn install(&self) -> UpdateResult<()> {
        self.make(["modules_install"])?;
        let install_path = self.layout.install_dir.to_string_lossy().into_owned();
        self.runner.run(
            &Invocation::new("make")
                .arg("install")
                .current_dir(&self.layout.source_root)
                .env("INSTALL_PATH", install_path),
        )
    }

    fn rebuild_extra_modules(&self) -> UpdateResult<()> {
        self.runner
            .run(&Invocation::new("emerge").arg("@module-rebuild"))
    }

    fn retain(&self) -> UpdateResult<RetentionReport> {
        let engine = RetentionEngine::new(self.layout.clone(), self.scheme.clone(), self.policy);
        Ok(engine.run()?)
    }

    fn regenerate_bootloader(&self) -> UpdateResult<()> {
        let grub_cfg = self.layout.install_dir.join("grub").join("grub.cfg");
        self.runner.run(
            &Invocation::new("grub-mkconfig")
                .arg("-o")
                .arg(grub_cfg.to_string_lossy()),
        )
    }

    fn make<const N: usize>(&self, args: [&str; N]) -> UpdateResult<()> {
        self.runner.run(
            &Invocation::new("make")
                .args(args)
                .current_dir(&self.layout.source_root),
        )
    }

    fn jobs(&self) -> usize {
        if let Some(jobs) = self.options.jobs {
            return jobs;
        }
        match std::thread::available_parallelism() {
            Ok(n) => n.get(),
            Err(e) => {
                tracing::warn!(error = %e, fallback = FALLBACK_JOBS, "could not detect CPU count");
                FALLBACK_JOBS
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_stages() {
        assert_eq!(
            stages(UpdateMode::Full, &UpdateOptions::default()),
            vec![
                UpdateStage::ConfigSync,
                UpdateStage::Compile,
                UpdateStage::InstallArtifacts,
                UpdateStage::RebuildExtraModules,
                UpdateStage::Retention,
                UpdateStage::RegenerateBootloader,
            ]
        );
    }

    #[test]
    fn test_manual_config_skips_sync() {
        let options = UpdateOptions {
            regenerate_bootloader: false,
            rebuild_extra_modules: false,
            jobs: None,
        };
        assert_eq!(
            stages(UpdateMode::ManualConfig, &options),
            vec![
                UpdateStage::Compile,
                UpdateStage::InstallArtifacts,
                UpdateStage::Retention,
            ]
        );
    }

    #[test]
    fn test_clean_only_ignores_options() {
        assert_eq!(
            stages(UpdateMode::CleanOnly, &UpdateOptions::default()),
            vec![UpdateStage::Retention]
        );
    }

    #[test]
    fn test_required_tools_follow_stages() {
        let updater = KernelUpdater::new(
            KernelLayout::default(),
            NamingScheme::default(),
            RetentionPolicy::default(),
            UpdateOptions {
                regenerate_bootloader: true,
                rebuild_extra_modules: false,
                jobs: None,
            },
            crate::mock::RecordingRunner::new(),
        );

        let tools: Vec<&str> = updater
            .required_tools(UpdateMode::Full)
            .into_iter()
            .map(|(tool, _)| tool)
            .collect();
        assert_eq!(tools, vec!["make", "grub-mkconfig"]);
        assert!(updater.required_tools(UpdateMode::CleanOnly).is_empty());
    }
}
