// SPDX-License-Identifier: GPL-3.0-or-later

extern crate polyfish;

use polyfish::movegen::perft;
use polyfish::position::Position;
use polyfish::types::variant::Variant;

fn perft_for_fen(fen: &str, variant: Variant, depth: i32) -> u64 {
    polyfish::init_for_test();
    let mut pos = Position::new();
    pos.set(fen, false, variant).unwrap();
    perft(&mut pos, depth)
}

#[test]
fn test_perft_startpos() {
    let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    assert_eq!(1, perft_for_fen(fen, Variant::Chess, 0));
    assert_eq!(20, perft_for_fen(fen, Variant::Chess, 1));
    assert_eq!(400, perft_for_fen(fen, Variant::Chess, 2));
    assert_eq!(8902, perft_for_fen(fen, Variant::Chess, 3));
    assert_eq!(197_281, perft_for_fen(fen, Variant::Chess, 4));
    assert_eq!(4_865_609, perft_for_fen(fen, Variant::Chess, 5));
}

#[test]
fn test_perft_kiwipete() {
    let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    assert_eq!(48, perft_for_fen(fen, Variant::Chess, 1));
    assert_eq!(2039, perft_for_fen(fen, Variant::Chess, 2));
    assert_eq!(97_862, perft_for_fen(fen, Variant::Chess, 3));
    assert_eq!(4_085_603, perft_for_fen(fen, Variant::Chess, 4));
}

#[test]
fn test_perft_endgame_position() {
    let fen = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";

    assert_eq!(14, perft_for_fen(fen, Variant::Chess, 1));
    assert_eq!(191, perft_for_fen(fen, Variant::Chess, 2));
    assert_eq!(2812, perft_for_fen(fen, Variant::Chess, 3));
    assert_eq!(43_238, perft_for_fen(fen, Variant::Chess, 4));
    assert_eq!(674_624, perft_for_fen(fen, Variant::Chess, 5));
}

#[test]
fn test_perft_promotion_position() {
    let fen = "r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1";

    assert_eq!(6, perft_for_fen(fen, Variant::Chess, 1));
    assert_eq!(264, perft_for_fen(fen, Variant::Chess, 2));
    assert_eq!(9467, perft_for_fen(fen, Variant::Chess, 3));
    assert_eq!(422_333, perft_for_fen(fen, Variant::Chess, 4));
}

#[test]
fn test_perft_talkchess_position() {
    let fen = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8";

    assert_eq!(44, perft_for_fen(fen, Variant::Chess, 1));
    assert_eq!(1486, perft_for_fen(fen, Variant::Chess, 2));
    assert_eq!(62_379, perft_for_fen(fen, Variant::Chess, 3));
    assert_eq!(2_103_487, perft_for_fen(fen, Variant::Chess, 4));
}

#[test]
fn test_perft_steven_edwards_position() {
    let fen = "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10";

    assert_eq!(46, perft_for_fen(fen, Variant::Chess, 1));
    assert_eq!(2079, perft_for_fen(fen, Variant::Chess, 2));
    assert_eq!(89_890, perft_for_fen(fen, Variant::Chess, 3));
}

// The check counter changes nothing about move generation until a third
// check appears, so the shallow counts match orthodox chess exactly.
#[test]
fn test_perft_three_check_matches_chess_shallow() {
    let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 +3+3";

    assert_eq!(20, perft_for_fen(fen, Variant::ThreeCheck, 1));
    assert_eq!(400, perft_for_fen(fen, Variant::ThreeCheck, 2));
    assert_eq!(8902, perft_for_fen(fen, Variant::ThreeCheck, 3));
    assert_eq!(197_281, perft_for_fen(fen, Variant::ThreeCheck, 4));
}

#[test]
fn test_perft_koth_matches_chess_shallow() {
    let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    assert_eq!(20, perft_for_fen(fen, Variant::Koth, 1));
    assert_eq!(400, perft_for_fen(fen, Variant::Koth, 2));
    assert_eq!(8902, perft_for_fen(fen, Variant::Koth, 3));
}

#[test]
fn test_perft_atomic_startpos_shallow() {
    let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    assert_eq!(20, perft_for_fen(fen, Variant::Atomic, 1));
    assert_eq!(400, perft_for_fen(fen, Variant::Atomic, 2));
}

#[test]
fn test_perft_crazyhouse_startpos_shallow() {
    let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR[] w KQkq - 0 1";

    assert_eq!(20, perft_for_fen(fen, Variant::Crazyhouse, 1));
    assert_eq!(400, perft_for_fen(fen, Variant::Crazyhouse, 2));
    assert_eq!(8902, perft_for_fen(fen, Variant::Crazyhouse, 3));
}

#[test]
fn test_perft_horde_startpos() {
    let fen = "rnbqkbnr/pppppppp/8/1PP2PP1/PPPPPPPP/PPPPPPPP/PPPPPPPP/PPPPPPPP w kq - 0 1";

    // Only the eight pawns with an empty square in front can move.
    assert_eq!(8, perft_for_fen(fen, Variant::Horde, 1));
}

#[test]
fn test_perft_racingkings_startpos() {
    let fen = "8/8/8/8/8/8/krbnNBRK/qrbnNBRQ w - - 0 1";

    assert_eq!(21, perft_for_fen(fen, Variant::Race, 1));
}

#[test]
fn test_perft_antichess_startpos() {
    let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w - - 0 1";

    assert_eq!(20, perft_for_fen(fen, Variant::Anti, 1));
    assert_eq!(400, perft_for_fen(fen, Variant::Anti, 2));
    assert_eq!(8067, perft_for_fen(fen, Variant::Anti, 3));
}
