//! The navigation environment: one owned instance driven tick by tick.

use rand::{Rng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::codec::PopulationCodec;
use crate::counters::{CounterReading, EpisodeCounters, Scale};
use crate::frame::{Channel, SensorFrame};
use crate::kinematics::{AgentPose, MoveOutcome};
use crate::pattern::{PatternTable, Tensor2};
use crate::policy::{Action, ReactivePolicy};
use crate::sensor::{Contacts, Direction, ProximalScan};
use crate::world::{GridPos, WorldGrid};
use crate::{EnvError, NavConfig, StartPose};

/// RNG stream used for generated default patterns.
const PATTERN_STREAM: u64 = 1;

/// Summary of one policy-driven tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickReport {
    pub action: Action,
    pub outcome: MoveOutcome,
    /// `false` once the epoch counter wrapped, ending the run.
    pub running: bool,
}

/// Grid-world navigation environment.
///
/// Not shareable across threads while stepping: the caller owns the instance and drives it
/// through [`Environment::action`] / [`Environment::step`] or [`Environment::tick`].
pub struct Environment {
    config: NavConfig,
    world: WorldGrid,
    pose: AgentPose,
    scan: ProximalScan,
    last_action: Option<Action>,
    counters: EpisodeCounters,
    frame: SensorFrame,
    codec: Box<dyn PopulationCodec>,
    patterns: PatternTable,
    policy: ReactivePolicy,
    rng: SmallRng,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("config", &self.config)
            .field("pose", &self.pose)
            .field("last_action", &self.last_action)
            .field("codec", &self.codec.kind())
            .field("tick", &self.counters.get(Scale::Tick).cur)
            .finish()
    }
}

impl Environment {
    /// Build an environment over `world`, rendering the initial state.
    pub fn new(
        config: NavConfig,
        world: WorldGrid,
        codec: Box<dyn PopulationCodec>,
        patterns: PatternTable,
    ) -> Result<Self, EnvError> {
        config.validate()?;
        check_world(&world, &config.materials, config.barrier_index)?;
        patterns.validate(world.materials(), &config)?;
        let ring_units = codec.ring_units();
        if ring_units == 0 || codec.encode_ring(0.0, config.ring_width).len() != ring_units {
            return Err(EnvError::InvalidConfig(
                "codec ring output does not match its declared unit count",
            ));
        }
        let grid_shape = codec.grid_shape();
        if grid_shape[0] == 0 || grid_shape[1] == 0 {
            return Err(EnvError::InvalidConfig("codec grid shape must be non-empty"));
        }

        let frame = SensorFrame::new(|channel| match channel {
            Channel::Proximal => [Direction::ALL.len(), 2],
            Channel::Heading => [1, ring_units],
            Channel::Rotation => [1, 3],
            Channel::Position => grid_shape,
            Channel::Action => config.action_pattern_shape,
            Channel::Material => config.material_pattern_shape,
        });
        let pose = AgentPose::at(world.center(), 0);
        let scan = ProximalScan::scan(&world, &pose);
        let mut env = Self {
            counters: EpisodeCounters::new(&config.limits),
            rng: config.seeded_rng(),
            config,
            world,
            pose,
            scan,
            last_action: None,
            frame,
            codec,
            patterns,
            policy: ReactivePolicy::new(),
        };
        env.init(0);
        Ok(env)
    }

    /// Build an environment over the default walled world with generated patterns.
    pub fn with_default_world(
        config: NavConfig,
        codec: Box<dyn PopulationCodec>,
    ) -> Result<Self, EnvError> {
        config.validate()?;
        let world = WorldGrid::with_wall_ring(&config)?;
        let mut pattern_rng = config.derived_rng(PATTERN_STREAM);
        let patterns = PatternTable::generate(&config, &mut pattern_rng);
        Self::new(config, world, codec, patterns)
    }

    /// Start run `run`: reset counters, pose, and last action, and publish the initial state.
    pub fn init(&mut self, run: u64) {
        self.counters = EpisodeCounters::new(&self.config.limits);
        self.counters.get_mut(Scale::Run).set(run);
        self.last_action = None;
        self.reset_pose();
        self.frame.publish();
        info!(
            run,
            x = self.pose.pos_i.x,
            y = self.pose.pos_i.y,
            angle = self.pose.angle,
            codec = self.codec.kind(),
            "Initialised navigation environment"
        );
    }

    /// Place the agent per [`StartPose`] and render into the pending buffers.
    pub fn reset_pose(&mut self) {
        let (cell, angle) = match self.config.start {
            StartPose::Center => {
                let center = self.world.center();
                let cell = self.world.nearest_passable(center).unwrap_or(center);
                if cell != center {
                    warn!(
                        %center,
                        %cell,
                        "center cell is a barrier; starting at the nearest passable cell"
                    );
                }
                (cell, 0)
            }
            StartPose::Random => self.random_start(),
        };
        self.pose = AgentPose::at(cell, angle);
        self.rescan();
    }

    fn random_start(&mut self) -> (GridPos, i32) {
        let (w, h) = (self.world.width() as i32, self.world.height() as i32);
        let free: Vec<GridPos> = (0..h)
            .flat_map(|y| (0..w).map(move |x| GridPos::new(x, y)))
            .filter(|&pos| {
                self.world
                    .get(pos)
                    .is_some_and(|material| !self.world.is_barrier(material))
            })
            .collect();
        let steps = 360 / self.config.angle_increment;
        let angle = self.rng.random_range(0..steps) * self.config.angle_increment;
        if free.is_empty() {
            warn!("world has no passable cell; starting at the center");
            return (self.world.center(), angle);
        }
        (free[self.rng.random_range(0..free.len())], angle)
    }

    /// Move the agent to `cell` facing `angle`, keeping counters and last action.
    pub fn place(&mut self, cell: GridPos, angle: i32) -> Result<(), EnvError> {
        let material = self
            .world
            .get(cell)
            .ok_or(EnvError::OutOfBounds { x: cell.x, y: cell.y })?;
        if self.world.is_barrier(material) {
            return Err(EnvError::InvalidConfig("cannot place the agent on a barrier"));
        }
        if angle % self.config.angle_increment != 0 {
            return Err(EnvError::InvalidConfig(
                "angle must be a multiple of angle_increment",
            ));
        }
        self.pose = AgentPose::at(cell, angle);
        self.rescan();
        Ok(())
    }

    /// Replace the world between runs and restart run `run`.
    pub fn set_world(&mut self, world: WorldGrid, run: u64) -> Result<(), EnvError> {
        check_world(&world, &self.config.materials, self.config.barrier_index)?;
        self.world = world;
        self.init(run);
        Ok(())
    }

    /// Published tensor for channel `name`; unknown names yield `None`.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<&Tensor2> {
        self.frame.state(name)
    }

    /// Published tensor for `channel`.
    #[must_use]
    pub fn channel(&self, channel: Channel) -> &Tensor2 {
        self.frame.current(channel)
    }

    /// Apply the action called `name`. Unknown names are reported and ignored.
    ///
    /// `param` is accepted for interface compatibility; no current action uses it.
    pub fn action(&mut self, name: &str, param: Option<&Tensor2>) -> bool {
        let Some(action) = Action::from_name(name) else {
            warn!(action = name, "unrecognized action; ignoring");
            return false;
        };
        if param.is_some() {
            debug!(%action, "action parameter ignored");
        }
        self.act(action);
        true
    }

    /// Apply `action` to the pose, rescan, and render the pending state.
    pub fn act(&mut self, action: Action) -> MoveOutcome {
        let outcome = match action.turn() {
            Some(turn) => self.pose.rotate(turn, self.config.angle_increment),
            None => self.pose.move_forward(&self.world),
        };
        self.last_action = Some(action);
        self.rescan();
        debug!(%action, ?outcome, angle = self.pose.angle, "applied action");
        outcome
    }

    /// Advance the counters and publish the pending state.
    ///
    /// Returns `false` when the epoch counter wrapped (carrying into the run counter).
    pub fn step(&mut self) -> bool {
        self.counters.same(Scale::Epoch);
        self.frame.publish();
        self.counters.increment(Scale::Tick);
        self.counters.increment(Scale::Event);
        let mut running = true;
        if self.counters.increment(Scale::Trial) {
            if self.counters.increment(Scale::Epoch) {
                self.counters.increment(Scale::Run);
                running = false;
            }
            debug!(
                epoch = self.counters.get(Scale::Epoch).cur,
                run = self.counters.get(Scale::Run).cur,
                "trial counter wrapped"
            );
        }
        running
    }

    /// Policy-driven tick using the environment's own RNG.
    pub fn tick(&mut self) -> TickReport {
        let contacts = self.contacts();
        let action = self.policy.choose(contacts, self.last_action, &mut self.rng);
        self.finish_tick(action)
    }

    /// Policy-driven tick drawing randomness from `rng`.
    pub fn tick_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TickReport {
        let action = self.policy.choose(self.contacts(), self.last_action, rng);
        self.finish_tick(action)
    }

    fn finish_tick(&mut self, action: Action) -> TickReport {
        let outcome = self.act(action);
        let running = self.step();
        TickReport {
            action,
            outcome,
            running,
        }
    }

    /// `(cur, prv, changed)` for `scale`.
    #[must_use]
    pub const fn counter(&self, scale: Scale) -> CounterReading {
        self.counters.reading(scale)
    }

    #[must_use]
    pub const fn counters(&self) -> &EpisodeCounters {
        &self.counters
    }

    #[must_use]
    pub const fn config(&self) -> &NavConfig {
        &self.config
    }

    #[must_use]
    pub const fn world(&self) -> &WorldGrid {
        &self.world
    }

    #[must_use]
    pub const fn pose(&self) -> &AgentPose {
        &self.pose
    }

    #[must_use]
    pub const fn scan(&self) -> &ProximalScan {
        &self.scan
    }

    /// Barrier contacts of the current scan.
    #[must_use]
    pub fn contacts(&self) -> Contacts {
        self.scan.contacts(&self.world)
    }

    #[must_use]
    pub const fn last_action(&self) -> Option<Action> {
        self.last_action
    }

    #[must_use]
    pub const fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    #[must_use]
    pub fn codec(&self) -> &dyn PopulationCodec {
        self.codec.as_ref()
    }

    /// Borrow the environment RNG mutably for deterministic sampling.
    #[must_use]
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Continuous position scaled into the unit square.
    #[must_use]
    pub fn normalized_position(&self) -> [f32; 2] {
        let span_x = (self.world.width() - 1).max(1) as f32;
        let span_y = (self.world.height() - 1).max(1) as f32;
        [
            (self.pose.pos_f[0] / span_x).clamp(0.0, 1.0),
            (self.pose.pos_f[1] / span_y).clamp(0.0, 1.0),
        ]
    }

    /// Decode a heading ring code into degrees in `[0, 360)`.
    #[must_use]
    pub fn decode_heading(&self, activity: &[f32]) -> f32 {
        (self.codec.decode_ring(activity) * 360.0).rem_euclid(360.0)
    }

    /// Decode a position grid into cell coordinates.
    #[must_use]
    pub fn decode_position(&self, grid: &Tensor2) -> [f32; 2] {
        let [x, y] = self.codec.decode_2d(grid);
        [
            x * (self.world.width() - 1) as f32,
            y * (self.world.height() - 1) as f32,
        ]
    }

    fn rescan(&mut self) {
        self.scan = ProximalScan::scan(&self.world, &self.pose);
        self.render_next();
    }

    fn render_next(&mut self) {
        let contacts = self.scan.contacts(&self.world);
        let position = self.normalized_position();
        let heading = self
            .codec
            .encode_ring(self.pose.angle as f32 / 360.0, self.config.ring_width);
        let bump = self.codec.encode_2d(position);

        let proximal = self.frame.next_mut(Channel::Proximal);
        for direction in Direction::ALL {
            let contact = contacts.get(direction);
            proximal.set(direction.index(), 0, if contact { 0.0 } else { 1.0 });
            proximal.set(direction.index(), 1, if contact { 1.0 } else { 0.0 });
        }

        if let Err(err) = self.frame.next_mut(Channel::Heading).copy_from_slice(&heading) {
            warn!(%err, "heading code does not fit the heading channel");
        }

        let rotation = self.frame.next_mut(Channel::Rotation);
        rotation.fill(0.0);
        rotation.set(0, (self.pose.rot_ang.signum() + 1) as usize, 1.0);

        if let Err(err) = self.frame.next_mut(Channel::Position).copy_from(&bump) {
            warn!(%err, "position code does not fit the position channel");
        }

        let action_pattern = self
            .last_action
            .and_then(|action| self.patterns.action(action));
        copy_pattern(self.frame.next_mut(Channel::Action), action_pattern);

        let front = self.scan.get(Direction::Front).material;
        let material_pattern = self
            .world
            .material_name(front)
            .and_then(|name| self.patterns.material(name));
        copy_pattern(self.frame.next_mut(Channel::Material), material_pattern);
    }
}

/// A world must share the configured vocabulary and leave the agent somewhere to stand.
fn check_world(
    world: &WorldGrid,
    materials: &[String],
    barrier_index: u16,
) -> Result<(), EnvError> {
    if world.materials() != materials || world.barrier_index() != barrier_index {
        return Err(EnvError::InvalidConfig(
            "world materials differ from the configuration",
        ));
    }
    if world.nearest_passable(world.center()).is_none() {
        return Err(EnvError::InvalidConfig("world has no passable cell"));
    }
    Ok(())
}

/// Copy `pattern` into `target`, or clear `target` when there is none.
fn copy_pattern(target: &mut Tensor2, pattern: Option<&Tensor2>) {
    match pattern {
        Some(pattern) => {
            if let Err(err) = target.copy_from(pattern) {
                warn!(%err, "pattern does not fit its channel");
                target.fill(0.0);
            }
        }
        None => target.fill(0.0),
    }
}
