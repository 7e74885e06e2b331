//! # Game Loop
//!
//! Drives a [`World`] through its frame phases and keeps timing statistics.
//!
//! ```text
//! Frame N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. DELTA                                                            │
//! │    └─ Time since last frame, clamped to max_delta_seconds           │
//! │                                                                     │
//! │ 2. INPUT   ─ World::input(dt)                                       │
//! │ 3. UPDATE  ─ World::update(dt), frame counter advances              │
//! │ 4. DRAW    ─ World::draw()                                          │
//! │                                                                     │
//! │ 5. END FRAME                                                        │
//! │    └─ Record FrameStats, warn if over budget                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use signet_core::{EcsError, EcsResult, World};

/// Target frame time for 60 FPS.
pub const TARGET_FRAME_TIME: Duration = Duration::from_micros(16_666);

/// Largest delta handed to systems unless configured otherwise.
pub const DEFAULT_MAX_DELTA_SECONDS: f32 = 0.1;

/// Configuration for the game loop.
///
/// ```toml
/// target_fps = 30
/// max_delta_seconds = 0.25
/// enable_timing_logs = true
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameLoopConfig {
    /// Target frames per second; sets the frame budget.
    pub target_fps: u32,
    /// Deltas above this are clamped, so a stall does not explode physics.
    pub max_delta_seconds: f32,
    /// Enable frame timing logs.
    pub enable_timing_logs: bool,
}

impl Default for GameLoopConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            max_delta_seconds: DEFAULT_MAX_DELTA_SECONDS,
            enable_timing_logs: false,
        }
    }
}

impl GameLoopConfig {
    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on malformed TOML or bad values.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Io`] if the file cannot be read, otherwise the
    /// errors of [`GameLoopConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EcsError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks the values.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] for a zero frame rate or a
    /// non-positive delta ceiling.
    pub fn validate(&self) -> EcsResult<()> {
        if self.target_fps == 0 {
            return Err(EcsError::InvalidConfig(
                "target_fps must be greater than zero".into(),
            ));
        }
        if self.max_delta_seconds.is_nan() || self.max_delta_seconds <= 0.0 {
            return Err(EcsError::InvalidConfig(format!(
                "max_delta_seconds must be positive, got {}",
                self.max_delta_seconds
            )));
        }
        Ok(())
    }

    /// Frame budget derived from the target frame rate.
    #[must_use]
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs(1) / self.target_fps.max(1)
    }
}

/// Frame timing statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    /// Total frame time in microseconds.
    pub total_us: u64,
    /// Input phase time in microseconds.
    pub input_us: u64,
    /// Update phase time in microseconds.
    pub update_us: u64,
    /// Draw phase time in microseconds.
    pub draw_us: u64,
    /// Frame number, before this frame's update.
    pub frame: u64,
    /// Delta handed to the systems, after clamping.
    pub delta_time: f32,
}

/// The main loop orchestrator.
///
/// Owns the world, measures frame deltas and accumulates timing statistics.
pub struct GameLoop {
    /// The ECS world.
    world: World,
    /// Configuration.
    config: GameLoopConfig,
    /// Whether systems have been initialized.
    initialized: bool,
    /// Last frame start time.
    last_frame_time: Instant,
    /// Accumulated frame statistics.
    stats_accumulator: FrameStatsAccumulator,
}

impl GameLoop {
    /// Creates a loop around `world`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the config fails validation.
    pub fn new(world: World, config: GameLoopConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self {
            world,
            config,
            initialized: false,
            last_frame_time: Instant::now(),
            stats_accumulator: FrameStatsAccumulator::new(),
        })
    }

    /// Runs every system's `init` hook. Later calls do nothing.
    ///
    /// # Errors
    ///
    /// The first failure of [`World::init`].
    pub fn init(&mut self) -> EcsResult<()> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;
        self.last_frame_time = Instant::now();
        self.world.init()
    }

    /// Runs one frame with the wall-clock delta since the previous one.
    ///
    /// # Errors
    ///
    /// The first failure of init or any phase.
    pub fn run_frame(&mut self) -> EcsResult<FrameStats> {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame_time);
        self.last_frame_time = now;
        self.step(delta.as_secs_f32())
    }

    /// Runs one frame with a caller-supplied delta, for fixed-step hosts.
    ///
    /// The delta is clamped to `max_delta_seconds`.
    ///
    /// # Errors
    ///
    /// The first failure of init or any phase.
    pub fn step(&mut self, delta_seconds: f32) -> EcsResult<FrameStats> {
        self.init()?;

        let delta_time = delta_seconds.clamp(0.0, self.config.max_delta_seconds);
        let frame = self.world.frame_count();
        let frame_start = Instant::now();

        let phase_start = Instant::now();
        self.world.input(delta_time)?;
        let input_us = elapsed_us(phase_start);

        let phase_start = Instant::now();
        self.world.update(delta_time)?;
        let update_us = elapsed_us(phase_start);

        let phase_start = Instant::now();
        self.world.draw()?;
        let draw_us = elapsed_us(phase_start);

        let stats = FrameStats {
            total_us: elapsed_us(frame_start),
            input_us,
            update_us,
            draw_us,
            frame,
            delta_time,
        };
        self.end_frame(stats);
        Ok(stats)
    }

    /// Runs `frames` fixed-step frames of `delta_seconds` each.
    ///
    /// # Errors
    ///
    /// Stops at the first failing frame.
    pub fn run_fixed(&mut self, frames: u64, delta_seconds: f32) -> EcsResult<()> {
        for _ in 0..frames {
            self.step(delta_seconds)?;
        }
        Ok(())
    }

    fn end_frame(&mut self, stats: FrameStats) {
        let budget = self.config.frame_budget();
        self.stats_accumulator.record(stats, budget);

        if self.config.enable_timing_logs && Duration::from_micros(stats.total_us) > budget {
            tracing::warn!(
                frame = stats.frame,
                total_us = stats.total_us,
                budget_us = budget.as_micros(),
                "frame exceeded budget"
            );
        }
    }

    /// Frames completed by the world.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.world.frame_count()
    }

    /// The world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The world, mutably, for setup between frames.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The loop configuration.
    #[must_use]
    pub fn config(&self) -> &GameLoopConfig {
        &self.config
    }

    /// Returns the accumulated statistics.
    #[must_use]
    pub fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats_accumulator
    }

    /// Gives the world back.
    #[must_use]
    pub fn into_world(self) -> World {
        self.world
    }
}

fn elapsed_us(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX)
}

/// Accumulator for frame statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Sum of total frame times.
    pub total_us_sum: u64,
    /// Sum of input phase times.
    pub input_us_sum: u64,
    /// Sum of update phase times.
    pub update_us_sum: u64,
    /// Sum of draw phase times.
    pub draw_us_sum: u64,
    /// Min frame time.
    pub min_frame_us: u64,
    /// Max frame time.
    pub max_frame_us: u64,
    /// Frames that exceeded budget.
    pub frames_over_budget: u64,
}

impl FrameStatsAccumulator {
    /// Creates a new accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames_recorded: 0,
            total_us_sum: 0,
            input_us_sum: 0,
            update_us_sum: 0,
            draw_us_sum: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            frames_over_budget: 0,
        }
    }

    /// Records a frame's statistics against a frame budget.
    pub fn record(&mut self, stats: FrameStats, budget: Duration) {
        self.frames_recorded += 1;
        self.total_us_sum = self.total_us_sum.saturating_add(stats.total_us);
        self.input_us_sum = self.input_us_sum.saturating_add(stats.input_us);
        self.update_us_sum = self.update_us_sum.saturating_add(stats.update_us);
        self.draw_us_sum = self.draw_us_sum.saturating_add(stats.draw_us);
        self.min_frame_us = self.min_frame_us.min(stats.total_us);
        self.max_frame_us = self.max_frame_us.max(stats.total_us);

        if Duration::from_micros(stats.total_us) > budget {
            self.frames_over_budget += 1;
        }
    }

    /// Returns average frame time in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Returns average FPS.
    #[must_use]
    pub fn avg_fps(&self) -> f64 {
        let avg_ms = self.avg_frame_ms();
        if avg_ms <= 0.0 {
            return 0.0;
        }
        1000.0 / avg_ms
    }

    /// Returns the fraction of frames over budget.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.frames_over_budget as f64 / self.frames_recorded as f64
    }

    #[allow(clippy::cast_precision_loss)]
    fn avg_ms(&self, sum_us: u64) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (sum_us as f64 / self.frames_recorded as f64) / 1000.0
    }
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FrameStatsAccumulator {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let min_us = if self.frames_recorded == 0 { 0 } else { self.min_frame_us };
        writeln!(f, "┌─ TIMING ───────────────────────────────────────────────┐")?;
        writeln!(f, "│ Frames Recorded:    {}", self.frames_recorded)?;
        writeln!(
            f,
            "│ Average Frame:      {:.3} ms ({:.1} FPS)",
            self.avg_frame_ms(),
            self.avg_fps()
        )?;
        writeln!(f, "│ Min Frame:          {:.3} ms", min_us as f64 / 1000.0)?;
        writeln!(f, "│ Max Frame:          {:.3} ms", self.max_frame_us as f64 / 1000.0)?;
        writeln!(
            f,
            "│ Over Budget:        {} frames ({:.1}%)",
            self.frames_over_budget,
            self.over_budget_ratio() * 100.0
        )?;
        writeln!(f, "├─ BREAKDOWN ────────────────────────────────────────────┤")?;
        writeln!(f, "│ Input:              {:.3} ms", self.avg_ms(self.input_us_sum))?;
        writeln!(f, "│ Update:             {:.3} ms", self.avg_ms(self.update_us_sum))?;
        writeln!(f, "│ Draw:               {:.3} ms", self.avg_ms(self.draw_us_sum))?;
        write!(f, "└────────────────────────────────────────────────────────┘")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signet_core::{Component, System, SystemContext, SystemState};

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Elapsed(f32);
    impl Component for Elapsed {}

    /// Accumulates every delta it is handed.
    struct Clock {
        state: SystemState,
        inits: u32,
    }

    impl System for Clock {
        fn state(&self) -> &SystemState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut SystemState {
            &mut self.state
        }

        fn init(&mut self, _ctx: &mut SystemContext<'_>) -> EcsResult<()> {
            self.inits += 1;
            Ok(())
        }

        fn update(&mut self, ctx: &mut SystemContext<'_>, dt: f32) -> EcsResult<()> {
            for id in self.state.interest().iter() {
                ctx.get_mut::<Elapsed>(id)?.0 += dt;
            }
            Ok(())
        }
    }

    fn clock_loop(config: GameLoopConfig) -> (GameLoop, signet_core::EntityId) {
        let mut world = World::new();
        world.register_component::<Elapsed>().unwrap();
        let signature = world.signature_of::<Elapsed>().unwrap();
        world
            .add_system(Clock {
                state: SystemState::new(signature),
                inits: 0,
            })
            .unwrap();
        let id = world.create_entity();
        world.add_component(id, Elapsed::default()).unwrap();
        (GameLoop::new(world, config).unwrap(), id)
    }

    #[test]
    fn test_game_loop_creation() {
        let (game_loop, _) = clock_loop(GameLoopConfig::default());
        assert_eq!(game_loop.frame_count(), 0);
        assert_eq!(game_loop.stats().frames_recorded, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GameLoopConfig {
            target_fps: 0,
            ..Default::default()
        };
        assert!(matches!(
            GameLoop::new(World::new(), config),
            Err(EcsError::InvalidConfig(_))
        ));

        let config = GameLoopConfig {
            max_delta_seconds: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fixed_steps_advance_frames() {
        let (mut game_loop, id) = clock_loop(GameLoopConfig::default());
        game_loop.run_fixed(10, 0.05).unwrap();

        assert_eq!(game_loop.frame_count(), 10);
        assert_eq!(game_loop.stats().frames_recorded, 10);
        let elapsed = game_loop.world().get_component::<Elapsed>(id).unwrap().0;
        assert!((elapsed - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_delta_is_clamped() {
        let (mut game_loop, id) = clock_loop(GameLoopConfig::default());
        let stats = game_loop.step(5.0).unwrap();

        assert!((stats.delta_time - DEFAULT_MAX_DELTA_SECONDS).abs() < f32::EPSILON);
        assert_eq!(stats.frame, 0);
        let elapsed = game_loop.world().get_component::<Elapsed>(id).unwrap().0;
        assert!((elapsed - DEFAULT_MAX_DELTA_SECONDS).abs() < f32::EPSILON);
    }

    #[test]
    fn test_init_runs_once() {
        let (mut game_loop, _) = clock_loop(GameLoopConfig::default());
        game_loop.init().unwrap();
        game_loop.run_frame().unwrap();
        game_loop.run_frame().unwrap();
        assert_eq!(game_loop.frame_count(), 2);

        let world = game_loop.into_world();
        let described = world.to_string();
        assert!(described.contains("Clock"));
    }

    #[test]
    fn test_config_from_toml() {
        let config = GameLoopConfig::from_toml_str("target_fps = 30\n").unwrap();
        assert_eq!(config.target_fps, 30);
        assert!(!config.enable_timing_logs);
        assert_eq!(config.frame_budget(), Duration::from_secs(1) / 30);

        assert!(GameLoopConfig::from_toml_str("target_fps = \"fast\"").is_err());
        assert!(matches!(
            GameLoopConfig::load("/nonexistent/signet_loop.toml"),
            Err(EcsError::Io(_))
        ));
    }

    #[test]
    fn test_stats_accumulator() {
        let mut acc = FrameStatsAccumulator::new();

        for i in 0..100 {
            acc.record(
                FrameStats {
                    total_us: 10_000 + (i * 100),
                    input_us: 1000,
                    update_us: 7000,
                    draw_us: 2000,
                    frame: i,
                    delta_time: 0.016,
                },
                TARGET_FRAME_TIME,
            );
        }

        assert_eq!(acc.frames_recorded, 100);
        assert!(acc.avg_fps() > 50.0);
        assert!(acc.avg_fps() < 100.0);
        assert_eq!(acc.min_frame_us, 10_000);
        assert_eq!(acc.max_frame_us, 19_900);
        assert!(acc.to_string().contains("Frames Recorded:    100"));
    }
}
