//! Supervises daemon launch sequencing and runtime orchestration.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use jailpoll_config::Config;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::desktop::XdgCatalogue;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::policy::{FirejailEnforcer, PolicyApplier};
use crate::poller::{PollerDeps, SandboxPoller};
use crate::sandbox::SignalProbe;
use crate::settings::SharedSettings;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::runtime::Runtime;
use super::signals::{SignalForwarder, SystemSignals};
use super::watch::WatchPlan;

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) signals: S,
    pub(crate) reporter: Arc<dyn HealthReporter>,
}

/// Runs the daemon using the production collaborators.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(LaunchPlan {
        loader: SystemConfigLoader,
        signals: SystemSignals,
        reporter: Arc::new(StructuredHealthReporter::new()),
    })
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: SignalForwarder,
{
    let LaunchPlan {
        loader,
        signals,
        reporter,
    } = plan;

    let daemon = bootstrap_with(&loader, reporter.as_ref())?;
    let (config, settings) = daemon.into_parts();
    let poller = build_poller(&config, settings.reader());
    let runtime = Runtime::new(poller, settings, watch_plan(&config), reporter);
    signals.forward(runtime.sender())?;

    info!(
        target: PROCESS_TARGET,
        runtime_dir = %config.runtime_dir(),
        "starting sandbox poller"
    );
    runtime.run();
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}

/// Wires the production collaborators into a poller.
pub(crate) fn build_poller(config: &Config, settings: SharedSettings) -> SandboxPoller {
    let enforcer = FirejailEnforcer::new(config.enforcement_program(), config.safe_path());
    SandboxPoller::new(PollerDeps {
        runtime_dir: config.runtime_dir().into_std_path_buf(),
        environment_file: config.environment_file().to_owned(),
        probe: Arc::new(SignalProbe),
        catalogue: Arc::new(XdgCatalogue::new(config.application_dirs())),
        applier: PolicyApplier::new(Arc::new(settings), Arc::new(enforcer)),
        retry_interval: config.retry_interval(),
        retry_attempts: config.retry_attempts(),
    })
}

/// Paths watched for `config`.
pub(crate) fn watch_plan(config: &Config) -> WatchPlan {
    WatchPlan {
        runtime_dir: config.runtime_dir().into_std_path_buf(),
        application_dirs: config
            .application_dirs()
            .in_priority_order()
            .iter()
            .map(|dir| PathBuf::from(dir.as_std_path()))
            .collect(),
        settings_file: config.settings_file().into_std_path_buf(),
    }
}
