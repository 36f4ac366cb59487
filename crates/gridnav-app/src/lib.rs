//! Shared plumbing for the gridnav driver: configuration files, environment assembly, and
//! the policy-driven run loop with its summary statistics.

use anyhow::{Context, Result};
use gridnav_core::{
    Action, Channel, CounterLimits, Environment, NavConfig, PatternTable, Scale, TickReport,
    WorldGrid,
};
use gridnav_popcode::{GaussianCodec, GaussianCodecConfig};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::{info, warn};

/// RNG stream used for generated default patterns; matches the environment's own choice.
const PATTERN_STREAM: u64 = 1;

/// Epoch limit applied to a run that nothing else bounds.
pub const DEFAULT_EPOCHS: u64 = 5;

/// Contents of a `--config` JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub nav: NavConfig,
    pub codec: GaussianCodecConfig,
}

impl AppConfig {
    /// Read a JSON config; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Without a tick limit a run only ends when Epoch wraps, which needs both a trial and an
    /// epoch limit. Fill in defaults for whichever is missing.
    pub fn bound_run(&mut self, max_ticks: Option<u64>) {
        if max_ticks.is_some() {
            return;
        }
        let limits = &mut self.nav.limits;
        if limits.trial_max.is_none() {
            let trial_max = CounterLimits::default().trial_max;
            warn!(?trial_max, "run is unbounded; applying default trial limit");
            limits.trial_max = trial_max;
        }
        if limits.epoch_max.is_none() {
            warn!(epochs = DEFAULT_EPOCHS, "run is unbounded; applying default epoch limit");
            limits.epoch_max = Some(DEFAULT_EPOCHS);
        }
    }
}

/// Optional files that replace the generated world and pattern table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Assets<'a> {
    pub map: Option<&'a Path>,
    pub patterns: Option<&'a Path>,
}

/// Assemble an environment from `config`, loading any supplied assets.
pub fn build_environment(config: &AppConfig, assets: Assets<'_>) -> Result<Environment> {
    let nav = config.nav.clone();
    nav.validate().context("invalid navigation config")?;
    let codec = GaussianCodec::boxed(config.codec.clone()).context("invalid codec config")?;

    let world = match assets.map {
        Some(path) => {
            let report = gridnav_storage::load_map(path, &nav)
                .with_context(|| format!("failed to load map {}", path.display()))?;
            if !report.is_clean() {
                warn!(
                    unknown = report.unknown.len(),
                    "map contained unknown materials"
                );
            }
            report.world
        }
        None => WorldGrid::with_wall_ring(&nav).context("failed to build default world")?,
    };
    let patterns = match assets.patterns {
        Some(path) => gridnav_storage::load_patterns(path, &nav)
            .with_context(|| format!("failed to load patterns {}", path.display()))?,
        None => PatternTable::generate(&nav, &mut nav.derived_rng(PATTERN_STREAM)),
    };

    let env = Environment::new(nav, world, codec, patterns)
        .context("failed to build environment")?;
    Ok(env)
}

/// Action counts and blocked forward moves.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ActionTally {
    pub left: u64,
    pub right: u64,
    pub forward: u64,
    pub blocked: u64,
}

impl ActionTally {
    pub fn record(&mut self, report: &TickReport) {
        match report.action {
            Action::Left => self.left += 1,
            Action::Right => self.right += 1,
            Action::Forward => self.forward += 1,
        }
        if report.outcome.is_blocked() {
            self.blocked += 1;
        }
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.left + self.right + self.forward
    }

    pub fn merge(&mut self, other: &Self) {
        self.left += other.left;
        self.right += other.right;
        self.forward += other.forward;
        self.blocked += other.blocked;
    }
}

/// Running mean and maximum of one decode error.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct ErrorStat {
    pub samples: u64,
    pub sum: f64,
    pub max: f64,
}

impl ErrorStat {
    pub fn record(&mut self, error: f64) {
        self.samples += 1;
        self.sum += error;
        self.max = self.max.max(error);
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.sum / self.samples as f64
        }
    }
}

/// Round-trip fidelity of the published heading and position codes.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct DecodeError {
    /// Absolute circular error in degrees.
    pub heading: ErrorStat,
    /// Euclidean error in cells.
    pub position: ErrorStat,
}

impl DecodeError {
    /// Decode the published channels of `env` and compare with its true pose.
    pub fn sample(&mut self, env: &Environment) {
        let pose = env.pose();
        let decoded = env.decode_heading(env.channel(Channel::Heading).values());
        let diff = (f64::from(decoded) - f64::from(pose.angle)).rem_euclid(360.0);
        self.heading.record(diff.min(360.0 - diff));

        let [x, y] = env.decode_position(env.channel(Channel::Position));
        let dx = f64::from(x - pose.pos_f[0]);
        let dy = f64::from(y - pose.pos_f[1]);
        self.position.record(dx.hypot(dy));
    }
}

/// Outcome of [`run`].
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub epochs: u64,
    /// `true` when the epoch counter wrapped before the tick limit.
    pub finished: bool,
    pub actions: ActionTally,
    pub decode: DecodeError,
}

/// Drive `env` with the reactive policy until the run ends or `max_ticks` elapse.
///
/// Action tallies are logged and reset at every epoch boundary.
pub fn run(env: &mut Environment, max_ticks: Option<u64>) -> RunSummary {
    let mut summary = RunSummary::default();
    let mut epoch_tally = ActionTally::default();
    while max_ticks.is_none_or(|max| summary.ticks < max) {
        let report = env.tick();
        summary.ticks += 1;
        epoch_tally.record(&report);
        summary.decode.sample(env);

        let epoch = env.counter(Scale::Epoch);
        if epoch.changed {
            summary.epochs += 1;
            info!(
                epoch = epoch.prv,
                left = epoch_tally.left,
                right = epoch_tally.right,
                forward = epoch_tally.forward,
                blocked = epoch_tally.blocked,
                "epoch complete"
            );
            summary.actions.merge(&epoch_tally);
            epoch_tally = ActionTally::default();
        }
        if !report.running {
            summary.finished = true;
            break;
        }
    }
    summary.actions.merge(&epoch_tally);
    info!(
        ticks = summary.ticks,
        epochs = summary.epochs,
        finished = summary.finished,
        heading_err_mean = summary.decode.heading.mean(),
        heading_err_max = summary.decode.heading.max,
        position_err_mean = summary.decode.position.mean(),
        position_err_max = summary.decode.position.max,
        "run summary"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridnav_core::{GridPos, MoveOutcome};

    fn report(action: Action, outcome: MoveOutcome) -> TickReport {
        TickReport {
            action,
            outcome,
            running: true,
        }
    }

    #[test]
    fn tally_counts_blocked_moves() {
        let mut tally = ActionTally::default();
        tally.record(&report(Action::Left, MoveOutcome::Rotated { delta: -15 }));
        tally.record(&report(
            Action::Forward,
            MoveOutcome::Blocked {
                cell: GridPos::new(0, 0),
                material: 1,
            },
        ));
        tally.record(&report(
            Action::Forward,
            MoveOutcome::Moved {
                cell: GridPos::new(1, 1),
            },
        ));
        assert_eq!(tally.total(), 3);
        assert_eq!(tally.forward, 2);
        assert_eq!(tally.blocked, 1);
    }

    #[test]
    fn error_stat_tracks_mean_and_max() {
        let mut stat = ErrorStat::default();
        assert_eq!(stat.mean(), 0.0);
        stat.record(1.0);
        stat.record(3.0);
        assert_eq!(stat.mean(), 2.0);
        assert_eq!(stat.max, 3.0);
    }

    #[test]
    fn unbounded_runs_get_trial_and_epoch_limits() {
        let mut config: AppConfig =
            serde_json::from_str(r#"{ "nav": { "limits": { "trial_max": null } } }"#)
                .expect("json");
        assert_eq!(config.nav.limits.trial_max, None);
        config.bound_run(None);
        assert_eq!(config.nav.limits.trial_max, Some(100));
        assert_eq!(config.nav.limits.epoch_max, Some(DEFAULT_EPOCHS));

        let mut capped = AppConfig::default();
        capped.nav.limits.trial_max = None;
        capped.bound_run(Some(50));
        assert_eq!(capped.nav.limits.trial_max, None);
        assert_eq!(capped.nav.limits.epoch_max, None);

        let mut explicit = AppConfig::default();
        explicit.nav.limits.epoch_max = Some(2);
        explicit.bound_run(None);
        assert_eq!(explicit.nav.limits.epoch_max, Some(2));
        assert_eq!(explicit.nav.limits.trial_max, Some(100));
    }

    #[test]
    fn config_json_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "nav": { "world_width": 9 }, "codec": { "ring_units": 24 } }"#)
                .expect("json");
        assert_eq!(config.nav.world_width, 9);
        assert_eq!(config.nav.angle_increment, 15);
        assert_eq!(config.codec.ring_units, 24);
        assert_eq!(config.codec.grid_rows, 8);
    }
}
