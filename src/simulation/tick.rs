//! Tick system - orchestrates world updates
//!
//! Each sub-step runs, in order:
//! index rebuild -> clock -> agent pass -> interactions -> decay -> maintenance
//!
//! Real time is sliced into sub-steps no longer than `max_substep_seconds`
//! so a frame hitch never produces one oversized state change.

use crate::core::types::GameHours;
use crate::simulation::agents::update_agents;
use crate::simulation::decay::apply_decay;
use crate::simulation::events::{GameOutcome, SimulationEvent};
use crate::simulation::interactions::resolve_interactions;
use crate::simulation::maintenance::run_maintenance;
use crate::world::World;

/// Advance the world by `real_seconds` of wall-clock time
///
/// Stops early once the game is over.
pub fn advance(world: &mut World, real_seconds: f64) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    let max_step = world.config.max_substep_seconds;
    let mut remaining = real_seconds.max(0.0);

    while remaining > 0.0 && !world.game_over {
        let step = remaining.min(max_step);
        remaining -= step;
        events.extend(run_substep(world, step));
    }
    events
}

/// One bounded slice of simulation
pub fn run_substep(world: &mut World, real_seconds: f64) -> Vec<SimulationEvent> {
    if world.game_over {
        return Vec::new();
    }

    world.rebuild_index();
    let dt: GameHours = world.clock.advance_real(real_seconds);

    let mut events = update_agents(world, dt);
    events.extend(resolve_interactions(world));
    apply_decay(world, dt);

    if world.clock.now() >= world.next_maintenance_at {
        events.extend(run_maintenance(world));
    }

    let outcome = check_game_over(world);
    if outcome != GameOutcome::InProgress {
        world.game_over = true;
        tracing::info!(at = world.clock.now(), ?outcome, "game over");
        events.push(SimulationEvent::GameOver {
            at: world.clock.now(),
            outcome,
        });
    }
    events
}

/// The game ends when no human is left alive
pub fn check_game_over(world: &World) -> GameOutcome {
    if world.living_humans() == 0 {
        GameOutcome::Extinction {
            births: world.births,
            deaths: world.deaths,
        }
    } else {
        GameOutcome::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{Gender, Vec2};

    #[test]
    fn test_advance_substeps_the_clock() {
        let mut world = World::new(SimulationConfig::default()).unwrap();
        world.spawn_human(Vec2::new(100.0, 100.0), Gender::Female, 20.0);

        advance(&mut world, 0.5);
        let expected = 0.5 * world.config.game_hours_per_real_second;
        assert!((world.clock.now() - expected).abs() < 1e-9);
        assert!(!world.game_over);
    }

    #[test]
    fn test_empty_world_is_game_over() {
        let mut world = World::new(SimulationConfig::default()).unwrap();
        let events = advance(&mut world, 1.0);

        assert!(world.game_over);
        assert_eq!(
            events,
            vec![SimulationEvent::GameOver {
                at: world.clock.now(),
                outcome: GameOutcome::Extinction { births: 0, deaths: 0 },
            }]
        );
        // Only the first sub-step ran
        let one_step = world.config.max_substep_seconds * world.config.game_hours_per_real_second;
        assert!((world.clock.now() - one_step).abs() < 1e-9);
        assert!(advance(&mut world, 1.0).is_empty());
    }

    #[test]
    fn test_last_death_ends_the_game() {
        let mut world = World::new(SimulationConfig::default()).unwrap();
        let max_age = world.config.human_max_age;
        let id = world.spawn_human(Vec2::new(100.0, 100.0), Gender::Male, max_age - 0.0001);
        let events = advance(&mut world, 1.0);

        assert!(world.entities.get(id).is_none());
        assert!(matches!(
            events.last(),
            Some(SimulationEvent::GameOver {
                outcome: GameOutcome::Extinction { births: 0, deaths: 1 },
                ..
            })
        ));
    }
}
