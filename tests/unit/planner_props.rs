//! Property tests for look-ahead planning and profile fitting.

use proptest::prelude::*;
use stepper_planner::exec::{Pipeline, SegmentBuffer};
use stepper_planner::planner::replan;
use stepper_planner::{Kinematics, MotionPlanner, MoveRequest, Profile, RtShared};

use crate::common::{settings, Rig};

fn xy(x: f32, y: f32) -> [f32; 6] {
    [x, y, 0.0, 0.0, 0.0, 0.0]
}

fn target() -> impl Strategy<Value = (f32, f32)> {
    (-40.0f32..40.0, -40.0f32..40.0)
}

proptest! {
    /// Planned velocities chain block to block, respect each block's
    /// limits and bring the tail to rest.
    #[test]
    fn test_queue_velocities_are_consistent(
        targets in prop::collection::vec(target(), 1..40),
        feed in 600.0f32..9000.0,
    ) {
        let rt = RtShared::new();
        let mut buffer = SegmentBuffer::new();
        let (staging, _) = buffer.split();
        let mut planner = MotionPlanner::new(settings(), &rt, staging);
        for (x, y) in targets {
            // Too-short moves are rejected; the rest must still plan
            let _ = planner.submit_move(&MoveRequest::line(xy(x, y)).feed(feed));
        }

        let queue = planner.queue();
        let mut prev_exit = 0.0_f32;
        for block in queue.iter() {
            prop_assert_eq!(block.entry_velocity, prev_exit);
            prop_assert!(block.entry_velocity <= block.cruise_velocity + 1e-3);
            prop_assert!(block.exit_velocity <= block.cruise_velocity + 1e-3);
            prop_assert!(block.cruise_velocity <= block.cruise_vmax * (1.0 + 1e-4));
            prop_assert!(block.exit_velocity >= 0.0);
            prop_assert!(block.cruise_velocity.is_finite());
            prev_exit = block.exit_velocity;
        }
        if let Some(tail) = queue.peek_tail() {
            prop_assert!(tail.exit_velocity < 1e-3);
        }

        // A second replan over the same queue finds nothing to change
        let mut again = queue.clone();
        prop_assert!(!replan(&mut again, 0.0));
    }

    /// A fitted profile stays within its caps and its length.
    #[test]
    fn test_profile_fit_bounds(
        entry in 0.0f32..100.0,
        cap in 0.0f32..150.0,
        exit in 0.0f32..150.0,
        length in 0.01f32..50.0,
        acceleration in 100.0f32..5000.0,
        jerk in 1000.0f32..100_000.0,
    ) {
        let profile = Profile::fit(entry, cap, exit, length, Kinematics::new(acceleration, jerk));
        let ceiling = cap.max(entry);

        prop_assert!(profile.exit >= 0.0);
        prop_assert!(profile.exit <= ceiling + 1e-3);
        prop_assert!(profile.cruise >= entry.max(profile.exit) - 1e-3);
        prop_assert!(profile.cruise <= ceiling + 1e-3);
        prop_assert!(profile.body_length >= 0.0);
        prop_assert!(
            profile.head.length() + profile.tail.length() <= length * (1.0 + 1e-4) + 1e-5
        );

        let duration = profile.duration();
        prop_assert!(duration.is_finite());
        for i in 0..=16 {
            let t = duration * i as f32 / 16.0;
            prop_assert!(profile.velocity_at(t) <= profile.cruise * (1.0 + 1e-3) + 1e-3);
            prop_assert!(profile.position_at(t) <= length);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Whatever the path, the motors end exactly on the commanded position.
    #[test]
    fn test_pipeline_lands_on_final_position(
        targets in prop::collection::vec((-5.0f32..5.0, -5.0f32..5.0), 1..8),
    ) {
        let rt = RtShared::new();
        let mut pipeline = Pipeline::new();
        let mut rig = Rig::new(&rt, &mut pipeline);

        for (x, y) in targets {
            let _ = rig.planner.submit_move(&MoveRequest::line(xy(x, y)).feed(6000.0));
        }
        rig.run_to_rest();

        let expected = rig.planner.settings().motor_steps(&rig.planner.position());
        prop_assert_eq!(rig.net(), [expected[0], expected[1], expected[2]]);
        prop_assert!(!rig.pulse.outputs().double_pulse);
    }
}
