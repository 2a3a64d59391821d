#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for emitting monster spawn commands.

use bastion_core::{Command, Event, MonsterKind, Rect, SpawningConfig};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Pure system that deterministically emits spawn commands along the world edge.
///
/// Bursts fire every `interval_ticks`. Every `wave_length_ticks` a new wave
/// starts: bursts grow by one monster and tougher kinds join the roster.
#[derive(Debug)]
pub struct Spawning {
    interval_ticks: u64,
    wave_length_ticks: u64,
    initial_burst: u32,
    seed: u64,
    accumulator: u64,
    elapsed: u64,
    rng: ChaCha8Rng,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: &SpawningConfig) -> Self {
        Self {
            interval_ticks: config.interval_ticks,
            wave_length_ticks: config.wave_length_ticks,
            initial_burst: config.initial_burst,
            seed: config.seed,
            accumulator: 0,
            elapsed: 0,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        }
    }

    /// Zero-based index of the current wave.
    #[must_use]
    pub fn wave(&self) -> u64 {
        if self.wave_length_ticks == 0 {
            0
        } else {
            self.elapsed / self.wave_length_ticks
        }
    }

    /// Consumes events and emits spawn commands for every elapsed interval.
    pub fn handle(&mut self, events: &[Event], bounds: Rect, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::WorldConfigured { .. } => self.restart(),
                Event::TimeAdvanced { .. } => {
                    self.elapsed = self.elapsed.saturating_add(1);
                    self.accumulator = self.accumulator.saturating_add(1);
                }
                _ => {}
            }
        }

        if self.interval_ticks == 0 {
            return;
        }
        while self.accumulator >= self.interval_ticks {
            self.accumulator -= self.interval_ticks;
            self.emit_burst(bounds, out);
        }
    }

    fn restart(&mut self) {
        self.accumulator = 0;
        self.elapsed = 0;
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
    }

    fn emit_burst(&mut self, bounds: Rect, out: &mut Vec<Command>) {
        let wave = self.wave();
        let size = u64::from(self.initial_burst).saturating_add(wave);
        let roster = &MonsterKind::ALL[..MonsterKind::ALL.len().min(1 + wave as usize)];
        log::debug!("wave {wave}: spawning {size} monsters");

        for _ in 0..size {
            let kind = roster[self.rng.gen_range(0..roster.len())];
            let position = self.edge_position(bounds);
            out.push(Command::SpawnMonster { kind, position });
        }
    }

    fn edge_position(&mut self, bounds: Rect) -> Vec2 {
        let (min, max) = (bounds.min(), bounds.max());
        let along = self.rng.gen::<f32>();
        let x = min.x + (max.x - min.x) * along;
        let y = min.y + (max.y - min.y) * along;
        match self.rng.gen_range(0..4u8) {
            0 => Vec2::new(x, min.y),
            1 => Vec2::new(max.x, y),
            2 => Vec2::new(x, max.y),
            _ => Vec2::new(min.x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(count: usize) -> Vec<Event> {
        (1..=count as u64)
            .map(|tick| Event::TimeAdvanced { tick })
            .collect()
    }

    #[test]
    fn zero_interval_never_spawns() {
        let mut spawning = Spawning::new(&SpawningConfig {
            interval_ticks: 0,
            ..SpawningConfig::default()
        });
        let mut out = Vec::new();
        spawning.handle(&ticks(100), Rect::from_size(100.0, 100.0), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn spawns_land_on_the_world_edge() {
        let bounds = Rect::from_size(400.0, 300.0);
        let mut spawning = Spawning::new(&SpawningConfig {
            interval_ticks: 1,
            ..SpawningConfig::default()
        });
        let mut out = Vec::new();
        spawning.handle(&ticks(50), bounds, &mut out);

        assert_eq!(out.len(), 50);
        for command in out {
            let Command::SpawnMonster { position, .. } = command else {
                panic!("unexpected command: {command:?}");
            };
            assert!(bounds.contains_point(position));
            let on_edge = position.x == 0.0
                || position.x == 400.0
                || position.y == 0.0
                || position.y == 300.0;
            assert!(on_edge, "{position} is not on the edge");
        }
    }
}
