//! Per-tick update pipeline.
//!
//! A tick opens by resyncing the spatial indices and sweeping entities flagged
//! during the previous tick. Commands applied after the opening (spawns, most
//! notably) take part in the same tick. The tick then runs three global phases
//! over every entity class: state resolution, movement, and collision/attack.
//! No phase starts before the previous one finished for all entities, so
//! collision checks always see post-movement positions regardless of iteration
//! order.

use bastion_core::{
    sweep_collides_relative, Circle, Event, Impact, MobileClass, MobileId, MonsterKind,
    ProjectileKind, SpatialBody, StructureId,
};
use glam::Vec2;

use crate::{
    mobiles::{position_of, Monster, Projectile},
    World,
};

impl World {
    pub(crate) fn run_tick<F>(&mut self, visible: &mut F, out: &mut Vec<Event>)
    where
        F: FnMut(Vec2, f32) -> bool,
    {
        self.open_tick(out);
        self.run_phases(visible, out);
    }

    pub(crate) fn open_tick(&mut self, out: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        out.push(Event::TimeAdvanced {
            tick: self.tick_index,
        });

        self.spatial.sync(
            self.tick_index,
            self.structures.iter(),
            &self.monsters,
            &self.projectiles,
        );
        self.cleanup();
    }

    pub(crate) fn run_phases<F>(&mut self, visible: &mut F, out: &mut Vec<Event>)
    where
        F: FnMut(Vec2, f32) -> bool,
    {
        self.resolve_states(out);
        self.movement();
        self.strike_with_projectiles(out);
        self.strike_with_monsters(out);
        self.fire_weapons(visible, out);
    }

    fn cleanup(&mut self) {
        for id in self.structures.sweep() {
            self.spatial.notify_static_removed(id);
        }

        let spatial = &mut self.spatial;
        self.monsters.retain(|monster| {
            if monster.killed {
                spatial.notify_mobile_removed(MobileClass::Monster, monster.id);
            }
            !monster.killed
        });
        self.projectiles.retain(|projectile| {
            let keep = projectile.is_alive();
            if !keep {
                spatial.notify_mobile_removed(MobileClass::Projectile, projectile.id);
            }
            keep
        });

        self.spatial.rebuild_statics_if_dirty(self.structures.iter());
    }

    fn resolve_states(&mut self, out: &mut Vec<Event>) {
        for structure in self.structures.iter_mut() {
            if structure.is_flagged() {
                continue;
            }
            if structure.health.is_depleted() {
                structure.destroyed = true;
                log::info!("{:?} {:?} destroyed", structure.kind, structure.id);
                out.push(Event::StructureDestroyed {
                    structure: structure.id,
                });
                continue;
            }
            structure.fire_cooldown = structure.fire_cooldown.saturating_sub(1);
        }

        for monster in &mut self.monsters {
            if monster.killed {
                continue;
            }
            if monster.health.is_depleted() {
                monster.killed = true;
                out.push(Event::MonsterKilled {
                    monster: monster.id,
                });
                continue;
            }
            monster.contact_cooldown = monster.contact_cooldown.saturating_sub(1);
        }

        for projectile in &mut self.projectiles {
            if projectile.is_alive() && projectile.age >= projectile.kind.lifetime_ticks() {
                projectile.expired = true;
                out.push(Event::ProjectileExpired {
                    projectile: projectile.id,
                });
            }
        }
    }

    fn movement(&mut self) {
        let goal = self.structures.root().map(SpatialBody::circle);

        for monster in self.monsters.iter_mut().filter(|monster| monster.is_alive()) {
            match goal {
                Some(goal) if !monster.engaged => monster.advance_toward(goal),
                _ => monster.previous = monster.position,
            }
            if monster.position != monster.previous {
                self.spatial
                    .notify_mobile_moved(MobileClass::Monster, monster.id);
            }
        }

        for projectile in self.projectiles.iter_mut().filter(|shot| shot.is_alive()) {
            projectile.advance();
            self.spatial
                .notify_mobile_moved(MobileClass::Projectile, projectile.id);
        }

        self.spatial
            .flush_moved(MobileClass::Monster, &self.monsters);
        self.spatial
            .flush_moved(MobileClass::Projectile, &self.projectiles);
    }

    fn strike_with_projectiles(&mut self, out: &mut Vec<Event>) {
        let monster_reach = fastest_monster_speed();

        for index in 0..self.projectiles.len() {
            let shot = &self.projectiles[index];
            if !shot.is_alive() {
                continue;
            }

            // Any monster the shot could have met this tick overlaps this circle.
            let center = (shot.previous + shot.position) * 0.5;
            let radius = shot.previous.distance(shot.position) * 0.5
                + shot.kind.radius()
                + monster_reach;
            let struck = self
                .spatial
                .mobiles_in_range(MobileClass::Monster, center, radius, &self.monsters)
                .into_iter()
                .filter_map(|id| position_of(&self.monsters, id))
                .filter(|candidate| {
                    let monster = &self.monsters[*candidate];
                    monster.is_alive() && connects(shot, monster)
                })
                .min_by(|a, b| {
                    let from = shot.previous;
                    from.distance_squared(self.monsters[*a].position)
                        .total_cmp(&from.distance_squared(self.monsters[*b].position))
                });
            let Some(struck) = struck else {
                continue;
            };

            let (projectile, kind, source) = (shot.id, shot.kind, shot.source);
            let victim = self.monsters[struck].id;
            self.apply_impact(kind, struck);
            self.projectiles[index].spent = true;
            log::trace!("{kind:?} {projectile:?} fired by {source:?} struck {victim:?}");
            out.push(Event::ProjectileHit {
                projectile,
                monster: victim,
            });
        }
    }

    fn apply_impact(&mut self, kind: ProjectileKind, struck: usize) {
        match kind.impact() {
            Impact::Single => {
                let monster = &mut self.monsters[struck];
                monster.health = monster.health.damaged(kind.damage());
            }
            Impact::Splash { radius } => {
                let splash = Circle::new(self.monsters[struck].position, radius);
                let caught = self.spatial.mobiles_in_range(
                    MobileClass::Monster,
                    splash.center,
                    splash.radius,
                    &self.monsters,
                );
                for id in caught {
                    let Some(index) = position_of(&self.monsters, id) else {
                        continue;
                    };
                    let monster = &mut self.monsters[index];
                    if monster.is_alive() && monster.circle().overlaps_circle(&splash) {
                        monster.health = monster.health.damaged(kind.damage());
                    }
                }
            }
        }
    }

    fn strike_with_monsters(&mut self, out: &mut Vec<Event>) {
        for index in 0..self.monsters.len() {
            if !self.monsters[index].is_alive() {
                continue;
            }
            let body = self.monsters[index].circle();
            let touched = self
                .spatial
                .statics_in_range(body.center, body.radius, self.structures.iter())
                .into_iter()
                .filter_map(|id| self.structures.get(id))
                .find(|structure| {
                    structure.is_alive() && structure.circle().overlaps_circle(&body)
                })
                .map(|structure| structure.id);

            let monster = &mut self.monsters[index];
            monster.engaged = touched.is_some();
            let Some(structure) = touched else {
                continue;
            };
            if monster.contact_cooldown > 0 {
                continue;
            }
            monster.contact_cooldown = monster.kind.contact_cooldown_ticks();
            let damage = monster.kind.contact_damage();
            let attacker = monster.id;

            if let Some(target) = self.structures.get_mut(structure) {
                target.health = target.health.damaged(damage);
            }
            out.push(Event::StructureStruck {
                structure,
                monster: attacker,
                damage,
            });
        }
    }

    fn fire_weapons<F>(&mut self, visible: &mut F, out: &mut Vec<Event>)
    where
        F: FnMut(Vec2, f32) -> bool,
    {
        let factor = self.penalty_factor;
        let mut volleys = Vec::new();

        for structure in self.structures.iter_mut() {
            if !structure.is_alive() || structure.fire_cooldown > 0 {
                continue;
            }
            let (Some(weapon), Some(interval)) =
                (structure.kind.weapon(), structure.fire_interval(factor))
            else {
                continue;
            };

            let mut best: Option<BestCandidate> = None;
            let candidates = self.spatial.mobiles_in_range(
                MobileClass::Monster,
                structure.position,
                weapon.range,
                &self.monsters,
            );
            for index in candidates
                .into_iter()
                .filter_map(|id| position_of(&self.monsters, id))
            {
                let monster = &self.monsters[index];
                if !monster.is_alive() {
                    continue;
                }
                let reach = weapon.range + monster.kind.radius();
                let distance_sq = structure.position.distance_squared(monster.position);
                if distance_sq > reach * reach {
                    continue;
                }
                if !visible(monster.position, monster.kind.radius()) {
                    continue;
                }

                let current = BestCandidate {
                    distance_sq,
                    monster: monster.id,
                    position: monster.position,
                };
                match &mut best {
                    Some(existing) => {
                        if current.precedes(existing) {
                            *existing = current;
                        }
                    }
                    None => best = Some(current),
                }
            }

            if let Some(target) = best {
                structure.fire_cooldown = interval;
                volleys.push(Volley {
                    structure: structure.id,
                    kind: weapon.projectile,
                    origin: structure.position,
                    target,
                });
            }
        }

        for volley in volleys {
            let id = self.allocate_mobile_id();
            let projectile = Projectile::launch(
                id,
                volley.kind,
                volley.structure,
                volley.origin,
                volley.target.position,
            );
            self.spatial.notify_mobile_spawned(
                MobileClass::Projectile,
                id,
                projectile.circle(),
            );
            self.projectiles.push(projectile);
            out.push(Event::ProjectileFired {
                projectile: id,
                structure: volley.structure,
                target: volley.target.monster,
            });
        }
    }
}

/// Reports whether `shot` met `monster` during the tick just simulated.
///
/// Post-movement overlap settles most cases. Shots that travelled farther than
/// their own diameter also run the swept test so they cannot skip over a
/// target between two ticks.
fn connects(shot: &Projectile, monster: &Monster) -> bool {
    if shot.circle().overlaps_circle(&monster.circle()) {
        return true;
    }
    shot.outran_itself()
        && sweep_collides_relative(
            shot.previous,
            shot.position,
            shot.kind.radius(),
            monster.previous,
            monster.position,
            monster.kind.radius(),
        )
}

fn fastest_monster_speed() -> f32 {
    MonsterKind::ALL
        .iter()
        .map(|kind| kind.speed())
        .fold(0.0, f32::max)
}

#[derive(Clone, Copy, Debug)]
struct BestCandidate {
    distance_sq: f32,
    monster: MobileId,
    position: Vec2,
}

impl BestCandidate {
    fn precedes(&self, other: &Self) -> bool {
        if self.distance_sq != other.distance_sq {
            return self.distance_sq < other.distance_sq;
        }
        self.monster < other.monster
    }
}

struct Volley {
    structure: StructureId,
    kind: ProjectileKind,
    origin: Vec2,
    target: BestCandidate,
}
