// SPDX-License-Identifier: GPL-3.0-or-later

extern crate polyfish;

use std::sync::Arc;

use polyfish::evaluate::evaluate;
use polyfish::movegen::{Legal, MoveList};
use polyfish::position::Position;
use polyfish::search::LimitsType;
use polyfish::threads::{start_thinking, RootSpec, ThreadCtrl};
use polyfish::tt::TranspositionTable;
use polyfish::types::variant::Variant;
use polyfish::types::{mate_in, Move, MoveType, Value};
use polyfish::uci;

fn pos_from(fen: &str, variant: Variant) -> Position {
    polyfish::init_for_test();
    let mut pos = Position::new();
    pos.set(fen, false, variant).unwrap();
    pos.alloc_tables();
    pos
}

fn search_fen(fen: &str, variant: Variant, depth: i32) -> (Value, Vec<Move>) {
    polyfish::init_for_test();
    let spec = RootSpec {
        fen: String::from(fen),
        moves: Vec::new(),
        variant,
        chess960: false,
    };
    let tt = Arc::new(TranspositionTable::new(16));
    let ctrl = Arc::new(ThreadCtrl::new());
    let mut limits = LimitsType::new();
    limits.depth = depth;
    let result = start_thinking(&spec, &tt, &limits, &ctrl, 1);
    (result.score, result.pv)
}

// Walking the whole legal move tree two plies deep and requiring a
// bit-exact unmake exercises every special move the variants can throw at
// the board.
fn assert_do_undo_round_trip(fen: &str, variant: Variant, depth: i32) {
    fn walk(pos: &mut Position, depth: i32) {
        if depth == 0 {
            return;
        }
        let fen_before = pos.fen();
        let key_before = pos.key();
        let moves: Vec<Move> = MoveList::new::<Legal>(pos).iter().collect();
        for m in moves {
            let gives_check = pos.gives_check(m);
            pos.do_move(m, gives_check);
            assert!(pos.state_consistent(), "inconsistent state in {fen_before}");
            walk(pos, depth - 1);
            pos.undo_move(m);
            assert_eq!(pos.fen(), fen_before);
            assert_eq!(pos.key(), key_before);
        }
    }
    let mut pos = pos_from(fen, variant);
    walk(&mut pos, depth);
}

#[test]
fn test_do_undo_chess() {
    assert_do_undo_round_trip(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        Variant::Chess,
        2,
    );
}

#[test]
fn test_do_undo_atomic() {
    assert_do_undo_round_trip(
        "r1bqkbnr/ppp1pppp/2n5/3p4/3PP3/8/PPP2PPP/RNBQKBNR b KQkq - 0 2",
        Variant::Atomic,
        2,
    );
}

#[test]
fn test_do_undo_crazyhouse() {
    assert_do_undo_round_trip(
        "rnb1kbnr/ppp1pppp/8/3p4/8/5N2/PPPPPPPP/RNBQKB1R[Qp] b KQkq - 0 4",
        Variant::Crazyhouse,
        2,
    );
}

#[test]
fn test_do_undo_antichess() {
    assert_do_undo_round_trip(
        "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w - - 0 2",
        Variant::Anti,
        2,
    );
}

#[test]
fn test_do_undo_horde() {
    assert_do_undo_round_trip(
        "rnbqkbnr/pppppppp/8/1PP2PP1/PPPPPPPP/PPPPPPPP/PPPPPPPP/PPPPPPPP w kq - 0 1",
        Variant::Horde,
        2,
    );
}

#[test]
fn test_do_undo_three_check() {
    assert_do_undo_round_trip(
        "rnbqkbnr/ppp2ppp/3p4/4p3/2B1P3/8/PPPP1PPP/RNBQK1NR w KQkq - 0 3 +3+3",
        Variant::ThreeCheck,
        2,
    );
}

#[test]
fn test_mate_in_one_orthodox() {
    let (score, pv) = search_fen("6k1/5ppp/8/8/8/8/5PPP/4R1K1 w - - 0 1", Variant::Chess, 4);
    assert_eq!(score, mate_in(1));
    assert_eq!(pv.first().map(|m| uci::move_str(*m, false)), Some("e1e8".into()));
}

#[test]
fn test_kpk_fortress_recognized_drawn() {
    // The rook pawn cannot be escorted past the corner king.
    let (score, _) = search_fen("k7/8/K7/P7/8/8/8/8 b - - 0 1", Variant::Chess, 16);
    assert!(score.abs() <= Value(50), "score {}", score.0);
}

#[test]
fn test_three_check_last_check_is_mate() {
    // White has a single check left to give, and Bxf7+ gives it.
    let (score, pv) = search_fen(
        "rnbqkbnr/ppp2ppp/3p4/4p3/2B1P3/8/PPPP1PPP/RNBQK1NR w KQkq - 0 3 +1+3",
        Variant::ThreeCheck,
        4,
    );
    assert_eq!(score, mate_in(1));
    assert_eq!(pv.len(), 1);
}

#[test]
fn test_atomic_castling_kings_adjacent_exception() {
    // The f1 and g1 squares are covered by the rook on f8 and the king on
    // g2, which forbids castling in orthodox chess. In atomic chess both
    // squares lie next to the enemy king, whose embrace makes them safe.
    let fen = "5r2/8/8/8/8/8/6k1/4K2R w K - 0 1";

    let pos = pos_from(fen, Variant::Atomic);
    let castle = MoveList::new::<Legal>(&pos)
        .iter()
        .find(|m| m.move_type() == MoveType::Castling);
    assert!(castle.is_some(), "atomic castling through the shielded path");
    assert!(pos.legal(castle.unwrap()));

    let pos = pos_from(fen, Variant::Chess);
    let castle = MoveList::new::<Legal>(&pos)
        .iter()
        .find(|m| m.move_type() == MoveType::Castling);
    assert!(castle.is_none(), "orthodox castling through check");
}

#[test]
fn test_repetition_draw_after_root() {
    polyfish::init_for_test();
    let mut pos = pos_from(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        Variant::Chess,
    );
    let cycle = ["g1f3", "g8f6", "f3g1", "f6g8"];
    for _ in 0..2 {
        for ms in &cycle {
            let m = uci::to_move(&pos, ms).unwrap();
            let gives_check = pos.gives_check(m);
            pos.do_move(m, gives_check);
        }
    }
    assert!(pos.is_draw(8));
}

#[test]
fn test_eval_symmetry_across_variants() {
    polyfish::init_for_test();
    let cases = [
        (
            "r1bq1rk1/pppp1ppp/2n2n2/2b1p3/2B1P3/2NP1N2/PPP2PPP/R1BQ1RK1 w - - 0 6",
            Variant::Chess,
        ),
        (
            "r1bq1rk1/pppp1ppp/2n2n2/2b1p3/2B1P3/2NP1N2/PPP2PPP/R1BQ1RK1 w - - 0 6",
            Variant::Koth,
        ),
        (
            "r1bq1rk1/pppp1ppp/2n2n2/2b1p3/2B1P3/2NP1N2/PPP2PPP/R1BQ1RK1 w - - 0 6",
            Variant::ThreeCheck,
        ),
        (
            "rnb2bnr/ppp1kppp/4p3/3p4/3P4/4P3/PPP1KPPP/RNB2BNR w - - 0 5",
            Variant::Atomic,
        ),
    ];
    for (fen, variant) in &cases {
        let mut pos = pos_from(fen, *variant);
        let v1 = evaluate(&pos);
        pos.flip();
        pos.alloc_tables();
        let v2 = evaluate(&pos);
        assert_eq!(v1, v2, "asymmetric eval for {fen} in {variant:?}");
    }
}

#[test]
fn test_see_threshold_monotone() {
    polyfish::init_for_test();
    let pos = pos_from(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        Variant::Chess,
    );
    for m in MoveList::new::<Legal>(&pos).iter() {
        let mut prev = true;
        for v in (-1000..=1000).step_by(50) {
            let now = pos.see_ge(m, Value(v));
            assert!(prev || !now, "see_ge not monotone for {}", uci::move_str(m, false));
            prev = now;
        }
    }
}

#[test]
fn test_tt_concurrent_smoke() {
    use std::thread;

    let tt = Arc::new(TranspositionTable::new(4));
    let mut handles = Vec::new();
    for t in 0..4u64 {
        let tt = Arc::clone(&tt);
        handles.push(thread::spawn(move || {
            use polyfish::types::bound::Bound;
            use polyfish::types::depth::Depth;
            use polyfish::types::key::Key;
            for i in 0..20_000u64 {
                let key = Key((i.wrapping_mul(0x9e37_79b9_7f4a_7c15)) ^ t);
                tt.store(
                    key,
                    Value((i % 1000) as i32),
                    Bound::LOWER,
                    Depth((i % 20) as i32),
                    Move::NONE,
                    Value(0),
                );
                // Whatever comes back must carry a key that was stored at
                // this cluster; torn entries may miss, never invent.
                let _ = tt.probe(key);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn test_crazyhouse_drop_mate_found() {
    // White holds a rook in hand; R@e8 is the classic back-rank drop mate.
    let (score, pv) = search_fen(
        "6k1/5ppp/8/8/8/8/5PPP/6K1[R] w - - 0 1",
        Variant::Crazyhouse,
        6,
    );
    assert_eq!(score, mate_in(1));
    assert_eq!(pv.first().map(|m| uci::move_str(*m, false)), Some("R@e8".into()));
}
