//! Look-ahead velocity planning.
//!
//! Two linear passes over the queue:
//!
//! - Backward, from the tail (which must be able to stop): each block's
//!   braking velocity is the highest entry from which it can still slow to
//!   the next block's braking velocity.
//! - Forward, from the head: each block enters at the previous exit and gets
//!   the highest cruise and exit that fit its length.
//!
//! The block the segment generator is slicing keeps its entry and cruise; only
//! its exit may move, bounded by the generator's `exit_cap`.

use crate::motion::Profile;

use super::queue::MoveQueue;

/// Recompute braking, entry, cruise and exit velocities for every block.
///
/// `current_velocity` is the velocity at which the segment generator will
/// start the head block if it is not running yet. Returns whether any planned
/// velocity changed.
pub fn replan<const N: usize>(queue: &mut MoveQueue<N>, current_velocity: f32) -> bool {
    backward_pass(queue);
    forward_pass(queue, current_velocity)
}

fn backward_pass<const N: usize>(queue: &mut MoveQueue<N>) {
    let mut exit_limit = 0.0_f32;
    for i in (0..queue.len()).rev() {
        let Some(block) = queue.get_mut(i) else {
            continue;
        };

        if block.is_barrier() {
            block.braking_velocity = 0.0;
            exit_limit = 0.0;
            continue;
        }

        let cap = block.cruise_vmax;
        let braking = block
            .kinematics
            .braking_velocity(exit_limit.min(cap), block.length, cap);
        block.braking_velocity = block.entry_vmax.min(braking);
        exit_limit = block.braking_velocity;
    }
}

fn forward_pass<const N: usize>(queue: &mut MoveQueue<N>, current_velocity: f32) -> bool {
    let mut changed = false;
    let mut prev_exit = current_velocity;

    for i in 0..queue.len() {
        let exit_limit = queue.get(i + 1).map_or(0.0, |next| next.braking_velocity);
        let Some(block) = queue.get_mut(i) else {
            break;
        };

        let (entry, cruise, exit) = if block.is_barrier() {
            (0.0, 0.0, 0.0)
        } else if block.running {
            let exit = exit_limit.min(block.cruise_velocity).min(block.exit_cap);
            (block.entry_velocity, block.cruise_velocity, exit)
        } else {
            let profile = Profile::fit(
                prev_exit,
                block.cruise_vmax,
                exit_limit,
                block.length,
                block.kinematics,
            );
            (prev_exit, profile.cruise, profile.exit)
        };

        if block.entry_velocity != entry
            || block.cruise_velocity != cruise
            || block.exit_velocity != exit
        {
            block.entry_velocity = entry;
            block.cruise_velocity = cruise;
            block.exit_velocity = exit;
            changed = true;
        }
        prev_exit = exit;
    }

    changed
}
