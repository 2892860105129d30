//! Motion timeline validation

use intersection_sim::simulation::{MotionTimeline, Point};

#[test]
fn test_linear_interpolation() {
    let mut timeline = MotionTimeline::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 10.0);
    assert_eq!(timeline.position(), Point::new(0.0, 0.0));

    let mid = timeline.advance(5.0);
    assert!((mid.x - 50.0).abs() < 1e-3);
    assert!((timeline.progress() - 0.5).abs() < 1e-3);

    let end = timeline.advance(5.0);
    assert!((end.x - 100.0).abs() < 1e-3);
    assert!(timeline.is_finished());
}

#[test]
fn test_pause_freezes_progress() {
    let mut timeline = MotionTimeline::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 10.0);
    timeline.advance(2.0);
    timeline.pause();
    assert!(timeline.is_paused());

    let frozen = timeline.position();
    let after = timeline.advance(5.0);
    assert_eq!(after, frozen);
    assert!((timeline.progress() - 0.2).abs() < 1e-3);

    timeline.resume();
    timeline.advance(3.0);
    assert!((timeline.progress() - 0.5).abs() < 1e-3);
}

#[test]
fn test_complete_forces_finish() {
    let mut timeline = MotionTimeline::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 10.0);
    timeline.advance(1.0);
    timeline.complete();
    assert!(timeline.is_finished());
    assert_eq!(timeline.position(), Point::new(100.0, 0.0));
}

#[test]
fn test_killed_timeline_stays_dead() {
    let mut timeline = MotionTimeline::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 10.0);
    timeline.advance(1.0);
    timeline.kill();
    let position = timeline.position();
    timeline.advance(5.0);
    assert_eq!(timeline.position(), position);
    // A killed timeline cannot be force-finished.
    timeline.complete();
    assert!(!timeline.is_finished());
}

#[test]
fn test_zero_duration_is_tolerated() {
    let mut timeline = MotionTimeline::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 0.0);
    let position = timeline.advance(0.1);
    assert!((position.x - 10.0).abs() < 1e-3);
    assert!(timeline.is_finished());
}
