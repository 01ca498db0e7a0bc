//! System trait and the priority-ordered runner

use std::time::{Duration, Instant};

use anyhow::Result;

use crate::config::Tuning;
use crate::ecs::World;
use crate::events::GameEvent;
use crate::rng::RngManager;

/// Per-tick context: the simulated clock, the tuning table and the
/// outbound event queue. Rebuilt every tick; cross-system signaling goes
/// through here or through transient tags, never long-lived fields.
pub struct TickContext<'a> {
    pub tick: u64,
    /// Simulated seconds since world start (tick * dt).
    pub now: f64,
    pub dt: f64,
    pub tuning: &'a Tuning,
    pub events: Vec<GameEvent>,
}

impl<'a> TickContext<'a> {
    pub fn new(tick: u64, dt: f64, tuning: &'a Tuning) -> Self {
        Self {
            tick,
            now: tick as f64 * dt,
            dt,
            tuning,
            events: Vec::new(),
        }
    }

    pub fn dt_f32(&self) -> f32 {
        self.dt as f32
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}

/// One ordered per-tick unit of gameplay logic.
pub trait System: Send + Sync {
    fn name(&self) -> &'static str;
    /// Ascending run order; the documented ordering contract lives in
    /// `systems::priority`.
    fn priority(&self) -> i32;
    fn run(
        &mut self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        rng: &mut RngManager,
    ) -> Result<()>;
}

/// Statistics for a single tick
#[derive(Debug, Clone)]
pub struct TickStats {
    pub tick: u64,
    pub duration: Duration,
    pub system_times: Vec<(&'static str, Duration)>,
}

/// Runs every registered system once per tick, synchronously, in
/// ascending priority order. No system may skip or reorder another.
pub struct SystemRunner {
    systems: Vec<Box<dyn System>>,
    stats_history: Vec<TickStats>,
    max_stats_history: usize,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            stats_history: Vec::new(),
            max_stats_history: 100,
        }
    }

    /// Register a system; insertion order breaks priority ties.
    pub fn register(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
        self.systems.sort_by_key(|s| s.priority());
    }

    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    /// Execute one tick over all systems.
    pub fn run(
        &mut self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        rng: &mut RngManager,
    ) -> Result<TickStats> {
        let tick_start = Instant::now();
        let mut system_times = Vec::with_capacity(self.systems.len());

        for system in &mut self.systems {
            let system_start = Instant::now();
            system.run(ctx, world, rng)?;
            system_times.push((system.name(), system_start.elapsed()));
        }

        let stats = TickStats {
            tick: ctx.tick,
            duration: tick_start.elapsed(),
            system_times,
        };
        self.stats_history.push(stats.clone());
        if self.stats_history.len() > self.max_stats_history {
            self.stats_history.remove(0);
        }
        Ok(stats)
    }

    pub fn recent_stats(&self) -> &[TickStats] {
        &self.stats_history
    }

    pub fn average_tick_time(&self) -> Option<Duration> {
        if self.stats_history.is_empty() {
            return None;
        }
        let total: Duration = self.stats_history.iter().map(|s| s.duration).sum();
        Some(total / self.stats_history.len() as u32)
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}
