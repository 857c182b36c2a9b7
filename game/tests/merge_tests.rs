use std::time::Duration;

use engine::events::EventQueue;
use engine::store::MemoryStore;
use game::config::{GameConfig, MAX_RANK};
use game::merge::{MergeEngine, MergeResolution};
use game::physics::PhysicsCommand;
use game::piece::{BodyKind, GoldenState, PieceId, Vec2f};
use game::pool::PiecePool;
use game::session::GameSession;

const ANIM: Duration = Duration::from_millis(100);

fn landed(pool: &mut PiecePool, rank: u8, x: f32) -> PieceId {
    let id = pool.acquire();
    let piece = pool.get_mut(id).expect("acquired piece is active");
    piece.init_mergeable(rank, Vec2f::new(x, 0.0), false);
    piece.can_merge = true;
    id
}

fn fixture() -> (MergeEngine, PiecePool, EventQueue<PhysicsCommand>, GameConfig) {
    (
        MergeEngine::new(),
        PiecePool::new(),
        EventQueue::new(),
        GameConfig::default(),
    )
}

fn session() -> GameSession {
    GameSession::new(
        GameConfig::default(),
        Box::new(MemoryStore::new()),
        "20260806",
        42,
    )
}

#[test]
fn rank_up_consumes_the_pair_and_produces_the_next_rank() {
    for rank in 0..MAX_RANK {
        let (mut engine, mut pool, mut physics, config) = fixture();
        let a = landed(&mut pool, rank, -0.5);
        let b = landed(&mut pool, rank, 0.5);

        assert!(engine.notify_contact(a, b, &mut pool, &mut physics, &config));
        assert!(pool.get(a).unwrap().is_merging);
        assert!(pool.get(b).unwrap().is_merging);
        assert_eq!(pool.get(a).unwrap().body, BodyKind::Kinematic);

        // Nothing resolves before the animation interval elapses.
        assert!(
            engine
                .tick(Duration::from_millis(40), &mut pool, &mut physics, 5.0)
                .is_empty()
        );
        let resolutions = engine.tick(Duration::from_millis(60), &mut pool, &mut physics, 5.0);
        assert_eq!(resolutions.len(), 1);
        match &resolutions[0] {
            MergeResolution::RankUp { new_rank, .. } => assert_eq!(*new_rank, rank + 1),
            other => panic!("expected rank-up, got {other:?}"),
        }

        let upgraded: Vec<_> = pool.active().iter().filter(|p| p.rank == rank + 1).collect();
        assert_eq!(upgraded.len(), 1);
        assert!(!upgraded[0].is_merging);
        assert_eq!(upgraded[0].body, BodyKind::Dynamic);
        assert_eq!(pool.active().iter().filter(|p| p.rank == rank).count(), 0);
    }
}

#[test]
fn max_rank_pair_annihilates_leaving_nothing() {
    let (mut engine, mut pool, mut physics, config) = fixture();
    let a = landed(&mut pool, MAX_RANK, -1.0);
    let b = landed(&mut pool, MAX_RANK, 1.0);

    assert!(engine.notify_contact(a, b, &mut pool, &mut physics, &config));
    // Annihilations run half again as long as a rank-up.
    assert!(engine.tick(ANIM, &mut pool, &mut physics, 5.0).is_empty());
    let resolutions = engine.tick(Duration::from_millis(50), &mut pool, &mut physics, 5.0);
    assert!(matches!(resolutions[0], MergeResolution::Annihilated { .. }));
    assert_eq!(pool.active_count(), 0);
}

#[test]
fn only_the_lower_id_perspective_initiates() {
    let (mut engine, mut pool, mut physics, config) = fixture();
    let a = landed(&mut pool, 2, -0.5);
    let b = landed(&mut pool, 2, 0.5);

    // The symmetric notification from the higher id is dropped.
    assert!(!engine.notify_contact(b, a, &mut pool, &mut physics, &config));
    assert_eq!(engine.in_flight(), 0);
    assert!(engine.notify_contact(a, b, &mut pool, &mut physics, &config));
    assert_eq!(engine.in_flight(), 1);
}

#[test]
fn locked_pieces_cannot_join_a_second_transaction() {
    let (mut engine, mut pool, mut physics, config) = fixture();
    let a = landed(&mut pool, 3, -1.0);
    let b = landed(&mut pool, 3, 0.0);
    let c = landed(&mut pool, 3, 1.0);

    assert!(engine.notify_contact(a, b, &mut pool, &mut physics, &config));
    // b touching c in the same tick: b is already locked.
    assert!(!engine.notify_contact(b, c, &mut pool, &mut physics, &config));
    assert!(!engine.notify_contact(a, c, &mut pool, &mut physics, &config));
    assert!(!engine.is_locked(c));

    engine.tick(ANIM, &mut pool, &mut physics, 5.0);
    // c is unlocked afterwards, but the rank-4 survivor no longer matches it.
    let survivor = pool.active().iter().find(|p| p.rank == 4).unwrap().id;
    let (lo, hi) = (survivor.min(c), survivor.max(c));
    assert!(!engine.notify_contact(lo, hi, &mut pool, &mut physics, &config));
}

#[test]
fn mismatched_ranks_grace_period_and_obstacles_are_ineligible() {
    let (mut engine, mut pool, mut physics, config) = fixture();
    let a = landed(&mut pool, 1, -1.0);
    let b = landed(&mut pool, 2, 0.0);
    assert!(!engine.notify_contact(a, b, &mut pool, &mut physics, &config));

    let fresh = pool.acquire();
    pool.get_mut(fresh)
        .unwrap()
        .init_mergeable(1, Vec2f::new(1.0, 0.0), false);
    // Still inside the landing grace period: can_merge is false.
    assert!(!engine.notify_contact(a, fresh, &mut pool, &mut physics, &config));

    let rock = pool.acquire();
    pool.get_mut(rock)
        .unwrap()
        .init_obstacle(Vec2f::new(2.0, 0.0), 1.0);
    assert!(!engine.notify_contact(a, rock, &mut pool, &mut physics, &config));
}

#[test]
fn vanished_participant_aborts_the_transaction_silently() {
    let (mut engine, mut pool, mut physics, config) = fixture();
    let a = landed(&mut pool, 2, -0.5);
    let b = landed(&mut pool, 2, 0.5);

    assert!(engine.notify_contact(a, b, &mut pool, &mut physics, &config));
    // b is removed mid-flight (bomb skill, revive sweep...).
    pool.release(b);

    let resolutions = engine.tick(ANIM, &mut pool, &mut physics, 5.0);
    assert!(resolutions.is_empty());
    assert!(!engine.is_locked(a));
    assert!(!engine.is_locked(b));

    let survivor = pool.get(a).expect("a still active");
    assert!(!survivor.is_merging);
    assert_eq!(survivor.body, BodyKind::Dynamic);
    assert_eq!(survivor.rank, 2);
}

#[test]
fn golden_status_propagates_exactly_one_hop() {
    let (mut engine, mut pool, mut physics, config) = fixture();
    let a = landed(&mut pool, 1, -0.5);
    let b = landed(&mut pool, 1, 0.5);
    pool.get_mut(a).unwrap().golden = GoldenState::Original;

    engine.notify_contact(a, b, &mut pool, &mut physics, &config);
    let resolutions = engine.tick(ANIM, &mut pool, &mut physics, 5.0);
    let MergeResolution::RankUp { id, golden_parent, .. } = resolutions[0] else {
        panic!("expected rank-up");
    };
    assert!(golden_parent);
    assert_eq!(pool.get(id).unwrap().golden, GoldenState::Transferred);

    // Merge the transferred-golden result again: golden still multiplies the
    // score (golden_parent) but does not propagate a second time.
    let c = landed(&mut pool, 2, 1.5);
    let (lo, hi) = (id.min(c), id.max(c));
    engine.notify_contact(lo, hi, &mut pool, &mut physics, &config);
    let resolutions = engine.tick(ANIM, &mut pool, &mut physics, 5.0);
    let MergeResolution::RankUp { id, golden_parent, .. } = resolutions[0] else {
        panic!("expected rank-up");
    };
    assert!(golden_parent);
    assert_eq!(pool.get(id).unwrap().golden, GoldenState::None);
}

#[test]
fn cancel_all_force_returns_participants() {
    let (mut engine, mut pool, mut physics, config) = fixture();
    let a = landed(&mut pool, 2, -0.5);
    let b = landed(&mut pool, 2, 0.5);

    engine.notify_contact(a, b, &mut pool, &mut physics, &config);
    engine.cancel_all(&mut pool, &mut physics);
    assert_eq!(engine.in_flight(), 0);
    assert!(!pool.contains(a));
    assert!(!pool.contains(b));
    // Cancelled transactions never resolve later.
    assert!(engine.tick(Duration::from_secs(1), &mut pool, &mut physics, 5.0).is_empty());
}

// ── Scoring through the session ──

#[test]
fn first_merge_scores_base_plus_first_reach_bonus() {
    let mut session = session();
    session.start_game();
    let a = session.spawn_piece_for_test(0, Vec2f::new(-0.5, -2.0), GoldenState::None);
    let b = session.spawn_piece_for_test(0, Vec2f::new(0.5, -2.0), GoldenState::None);

    assert!(session.notify_contact(a, b));
    session.tick(ANIM);
    // merge_score(1, combo 1) = 3, plus 100 * (1 + 1) first-reach.
    assert_eq!(session.score(), 203);
}

#[test]
fn combo_scoring_adds_multiplier_and_chain_bonus() {
    let mut session = session();
    session.start_game();

    let a = session.spawn_piece_for_test(0, Vec2f::new(-2.0, -2.0), GoldenState::None);
    let b = session.spawn_piece_for_test(0, Vec2f::new(-1.5, -2.0), GoldenState::None);
    session.notify_contact(a, b);
    session.tick(ANIM);
    assert_eq!(session.score(), 203);

    // Second merge 100 ms later: well inside the 1.5 s combo window.
    let c = session.spawn_piece_for_test(0, Vec2f::new(1.5, -2.0), GoldenState::None);
    let d = session.spawn_piece_for_test(0, Vec2f::new(2.0, -2.0), GoldenState::None);
    session.notify_contact(c, d);
    session.tick(ANIM);
    // merge_score(1, combo 2) = round(3 * 1.5 + 5) = 10, no fresh first-reach.
    assert_eq!(session.score(), 213);
}

#[test]
fn golden_parent_multiplies_the_whole_merge_by_five() {
    let mut session = session();
    session.start_game();
    let a = session.spawn_piece_for_test(0, Vec2f::new(-0.5, -2.0), GoldenState::Original);
    let b = session.spawn_piece_for_test(0, Vec2f::new(0.5, -2.0), GoldenState::None);

    session.notify_contact(a, b);
    session.tick(ANIM);
    assert_eq!(session.score(), (3 + 200) * 5);
}

#[test]
fn annihilation_awards_the_fixed_mega_score() {
    let mut session = session();
    session.start_game();
    let a = session.spawn_piece_for_test(MAX_RANK, Vec2f::new(-1.0, -2.0), GoldenState::Original);
    let b = session.spawn_piece_for_test(MAX_RANK, Vec2f::new(1.0, -2.0), GoldenState::None);

    session.notify_contact(a, b);
    session.tick(Duration::from_millis(150));
    // baseScore[MAX] * 5, untouched by combo, golden or fever.
    assert_eq!(session.score(), 500);
    assert_eq!(
        session
            .pool()
            .active()
            .iter()
            .filter(|p| !p.dropping)
            .count(),
        0
    );
}

#[test]
fn fever_doubles_merges_after_the_triggering_one() {
    let mut session = session();
    session.start_game();

    for i in 0..5 {
        let x = -2.0 + i as f32 * 0.8;
        let a = session.spawn_piece_for_test(0, Vec2f::new(x, -2.0), GoldenState::None);
        let b = session.spawn_piece_for_test(0, Vec2f::new(x + 0.4, -2.0), GoldenState::None);
        session.notify_contact(a, b);
        session.tick(ANIM);
    }
    assert!(session.fever().is_active());

    let before = session.score();
    let a = session.spawn_piece_for_test(0, Vec2f::new(1.8, -2.0), GoldenState::None);
    let b = session.spawn_piece_for_test(0, Vec2f::new(2.2, -2.0), GoldenState::None);
    session.notify_contact(a, b);
    session.tick(ANIM);
    // Sixth merge of the streak: merge_score(1, 6) = round(3 * 3.5 + 25) = 36,
    // doubled by fever.
    assert_eq!(session.score() - before, 72);
}
