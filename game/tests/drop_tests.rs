use std::time::Duration;

use engine::store::MemoryStore;
use game::config::GameConfig;
use game::drop::{CommitOutcome, DropPhase};
use game::events::GameEvent;
use game::piece::{GoldenState, Vec2f};
use game::session::{GamePhase, GameSession};

fn session() -> GameSession {
    GameSession::new(
        GameConfig::default(),
        Box::new(MemoryStore::new()),
        "20260806",
        7,
    )
}

/// Drops the held piece at `x` and moves the committed body below the
/// game-over line, standing in for the physics host.
fn commit_at(session: &mut GameSession, x: f32) -> CommitOutcome {
    let id = session.dropper().held().expect("a piece is held");
    session.pointer_pressed();
    session.pointer_moved(x);
    let outcome = session.pointer_released();
    if outcome == CommitOutcome::Committed {
        let pos = session.pool().get(id).expect("committed piece").pos;
        session.sync_motion(id, Vec2f::new(pos.x, -2.5), Vec2f::ZERO);
    }
    outcome
}

#[test]
fn activation_spawns_a_held_kinematic_piece_with_a_queued_rank() {
    let mut session = session();
    session.start_game();

    let held = session.dropper().held().expect("held piece after start");
    let piece = session.pool().get(held).expect("held piece active");
    assert!(piece.dropping);
    assert!(!piece.can_merge);
    assert_eq!(session.dropper().phase(), DropPhase::AwaitingInput);

    let events = session.drain_events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, GameEvent::QueuedRankChanged { .. }))
    );
}

#[test]
fn pointer_is_clamped_so_the_radius_stays_inside_the_container() {
    let mut session = session();
    session.start_game();
    let held = session.dropper().held().unwrap();

    session.pointer_pressed();
    session.pointer_moved(100.0);
    let piece = session.pool().get(held).unwrap();
    let max_x = session.config().drop.max_x;
    assert!((piece.pos.x - (max_x - piece.radius())).abs() < 1e-5);

    session.pointer_moved(-100.0);
    let piece = session.pool().get(held).unwrap();
    let min_x = session.config().drop.min_x;
    assert!((piece.pos.x - (min_x + piece.radius())).abs() < 1e-5);
}

#[test]
fn commits_inside_the_exclusion_band_are_rejected() {
    let mut session = session();
    session.start_game();

    assert_eq!(commit_at(&mut session, 0.0), CommitOutcome::Committed);
    // Wait out the cooldown so the next piece spawns.
    session.tick(Duration::from_millis(300));
    assert!(session.dropper().held().is_some());
    session.drain_events();

    // x = 0.2 is within exclusion_radius (0.4) of the previous commit.
    assert_eq!(commit_at(&mut session, 0.2), CommitOutcome::Rejected);
    let events = session.drain_events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, GameEvent::DropRejected { .. }))
    );
    // The reject leaves the held piece in place; a valid spot still works.
    assert!(session.dropper().held().is_some());
    assert_eq!(commit_at(&mut session, 0.6), CommitOutcome::Committed);
}

#[test]
fn forced_timeout_relocates_outside_the_exclusion_band() {
    let mut session = session();
    session.start_game();
    assert_eq!(commit_at(&mut session, 0.0), CommitOutcome::Committed);
    session.tick(Duration::from_millis(300));
    session.drain_events();

    // The fresh piece spawns at x = 0, inside the band. Left alone, the hold
    // timer forces a commit that must land outside the band.
    let held = session.dropper().held().expect("fresh held piece");
    session.tick(session.config().drop.auto_drop_time);
    assert!(session.dropper().held().is_none());

    let events = session.drain_events();
    let committed_x = events
        .iter()
        .find_map(|e| match e {
            GameEvent::DropCommitted { x, .. } => Some(*x),
            _ => None,
        })
        .expect("forced commit fired");
    assert!(committed_x.abs() >= session.config().drop.exclusion_radius - 1e-4);
    assert!(!session.pool().get(held).unwrap().dropping);
}

#[test]
fn landing_grace_gates_merging_then_enables_it() {
    let mut session = session();
    session.start_game();
    let held = session.dropper().held().unwrap();

    commit_at(&mut session, 0.0);
    assert!(!session.pool().get(held).unwrap().can_merge);

    session.tick(session.config().drop.merge_grace);
    assert!(session.pool().get(held).unwrap().can_merge);
}

#[test]
fn cooldown_gates_the_next_spawn() {
    let mut session = session();
    session.start_game();
    commit_at(&mut session, 0.0);
    assert!(session.dropper().held().is_none());
    assert_eq!(session.dropper().phase(), DropPhase::Committed);

    session.tick(Duration::from_millis(150));
    assert!(session.dropper().held().is_none());

    session.tick(Duration::from_millis(150));
    assert!(session.dropper().held().is_some());
    assert_eq!(session.dropper().phase(), DropPhase::AwaitingInput);
}

#[test]
fn queue_promotes_the_second_rolled_rank() {
    let mut session = session();
    session.start_game();
    let queued = session.dropper().queued_rank();

    commit_at(&mut session, 0.0);
    session.tick(Duration::from_millis(300));
    assert_eq!(session.dropper().current_rank(), queued);
}

#[test]
fn deactivation_on_game_over_returns_the_held_piece() {
    let mut session = session();
    session.start_game();
    let held = session.dropper().held().unwrap();

    // A settled piece parked above the line for the full delay ends the game.
    let line = session.config().container.game_over_line_y;
    session.spawn_piece_for_test(2, Vec2f::new(-1.0, line + 1.0), GoldenState::None);
    session.tick(Duration::from_secs(2));

    assert_eq!(session.phase(), GamePhase::GameOver);
    assert_eq!(session.dropper().phase(), DropPhase::Idle);
    assert!(session.dropper().held().is_none());
    assert!(!session.pool().contains(held));
}

#[test]
fn release_without_dragging_is_a_no_op() {
    let mut session = session();
    session.start_game();
    assert_eq!(session.pointer_released(), CommitOutcome::NotHolding);
    assert!(session.dropper().held().is_some());
}
