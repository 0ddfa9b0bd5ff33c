// SPDX-License-Identifier: GPL-3.0-or-later

#![allow(dead_code)]

use crate::bitboard::{
    attacks_bb, forward_file_bb, more_than_one, popcount, pseudo_attacks, Bitboard, Distance,
};
use crate::material;
use crate::pawns;
use crate::position::Position;
use crate::types::scale_factor::ScaleFactor;
use crate::types::variant::{Variant, VARIANT_NB};
use crate::types::{
    Black, Color, ColorTrait, Piece, PieceType, Score, Square, Value, White, EG, FILE_A, FILE_D,
    FILE_E, FILE_H, MG, PHASE_MIDGAME, RANK_1, RANK_2, RANK_5, RANK_7, TEMPO,
};

macro_rules! S {
    ($x:expr, $y:expr) => {
        Score(($y << 16) + $x)
    };
}

// Evaluation weights and bonuses. A single default table serves all
// variants; only genuinely diverged parameters carry per-variant entries.

// MOBILITY_BONUS[PieceType-2][attacked] contains bonuses for middle and
// end game, indexed by piece type and number of attacked squares in the
// mobility area.
#[rustfmt::skip]
const MOBILITY_BONUS: [[Score; 32]; 4] = [
    [ // Knight
        S!(-75, -76), S!(-57, -54), S!(-9, -28), S!(-2, -10), S!(6, 5), S!(14, 12),
        S!(22, 26), S!(29, 29), S!(36, 29),
        Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO,
        Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO,
        Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO,
        Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO,
    ],
    [ // Bishop
        S!(-48, -59), S!(-20, -23), S!(16, -3), S!(26, 13), S!(38, 24), S!(51, 42),
        S!(55, 54), S!(63, 57), S!(63, 65), S!(68, 73), S!(81, 78), S!(81, 86),
        S!(91, 88), S!(98, 97),
        Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO,
        Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO,
        Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO,
    ],
    [ // Rook
        S!(-58, -76), S!(-27, -18), S!(-15, 28), S!(-10, 55), S!(-5, 69), S!(-2, 82),
        S!(9, 112), S!(16, 118), S!(30, 132), S!(29, 142), S!(32, 155), S!(38, 165),
        S!(46, 166), S!(48, 169), S!(58, 171),
        Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO,
        Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO,
        Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO,
    ],
    [ // Queen
        S!(-39, -36), S!(-21, -15), S!(3, 8), S!(3, 18), S!(14, 34), S!(22, 54),
        S!(28, 61), S!(41, 73), S!(43, 79), S!(48, 92), S!(56, 94), S!(60, 104),
        S!(60, 113), S!(66, 120), S!(67, 123), S!(70, 126), S!(71, 133), S!(73, 136),
        S!(79, 140), S!(88, 143), S!(88, 148), S!(99, 166), S!(102, 170), S!(102, 175),
        S!(106, 184), S!(109, 191), S!(113, 206), S!(116, 212),
        Score::ZERO, Score::ZERO, Score::ZERO, Score::ZERO,
    ],
];

// OUTPOST[knight/bishop][supported by pawn]
const OUTPOST: [[Score; 2]; 2] = [
    [S!(22, 6), S!(36, 12)], // Knight
    [S!(9, 2), S!(15, 5)],   // Bishop
];

// ROOK_ON_FILE[semiopen/open]
const ROOK_ON_FILE: [Score; 2] = [S!(20, 7), S!(45, 20)];

// THREAT_BY_MINOR/BY_ROOK[attacked PieceType]
const THREAT_BY_MINOR: [Score; 8] = [
    Score::ZERO,
    S!(0, 33),
    S!(45, 43),
    S!(46, 47),
    S!(72, 107),
    S!(48, 118),
    Score::ZERO,
    Score::ZERO,
];

const THREAT_BY_ROOK: [Score; 8] = [
    Score::ZERO,
    S!(0, 25),
    S!(40, 62),
    S!(40, 59),
    S!(0, 34),
    S!(35, 48),
    Score::ZERO,
    Score::ZERO,
];

// THREAT_BY_KING[on one/on many]
const THREAT_BY_KING: [Score; 2] = [S!(3, 65), S!(9, 145)];

// PASSED[mg/eg][Rank] contains midgame and endgame bonuses for passed
// pawns. The default covers orthodox play; the variants whose tuning
// genuinely diverged override it.
const PASSED: [[i32; 8]; 2] = [
    [0, 5, 5, 31, 73, 166, 252, 0],
    [0, 7, 14, 38, 73, 166, 252, 0],
];

const PASSED_HORDE: [[i32; 8]; 2] = [
    [0, 21, 16, 47, 100, 211, 315, 0],
    [0, 17, 30, 56, 100, 205, 300, 0],
];

const PASSED_THREE_CHECK: [[i32; 8]; 2] = [
    [0, 5, 9, 35, 79, 171, 258, 0],
    [0, 9, 16, 42, 78, 171, 257, 0],
];

fn passed_bonus(v: Variant, phase: usize, r: u32) -> i32 {
    match v.main() {
        Variant::Horde => PASSED_HORDE[phase][r as usize],
        Variant::ThreeCheck => PASSED_THREE_CHECK[phase][r as usize],
        _ => PASSED[phase][r as usize],
    }
}

// PASSED_FILE[File] contains a bonus according to the file of a passed
// pawn.
const PASSED_FILE: [Score; 8] = [
    S!(9, 10),
    S!(2, 10),
    S!(1, -8),
    S!(-20, -12),
    S!(-20, -12),
    S!(1, -8),
    S!(2, 10),
    S!(9, 10),
];

// Assorted bonuses and penalties used by evaluation
const MINOR_BEHIND_PAWN: Score = S!(16, 0);
const BISHOP_PAWNS: Score = S!(8, 12);
const LONG_RANGED_BISHOP: Score = S!(22, 0);
const ROOK_ON_PAWN: Score = S!(8, 24);
const TRAPPED_ROOK: Score = S!(92, 0);
const WEAK_QUEEN: Score = S!(50, 10);
const KING_PROTECTOR: Score = S!(6, 6);
const HANGING: Score = S!(52, 30);
const THREAT_BY_SAFE_PAWN: Score = S!(173, 102);
const THREAT_BY_PAWN_PUSH: Score = S!(45, 40);
const THREAT_BY_ATTACK_ON_QUEEN: Score = S!(38, 22);
const HINDER_PASSED_PAWN: Score = S!(8, 1);
const WEAK_UNOPPOSED_PAWN: Score = S!(5, 25);
const PAWNLESS_FLANK: Score = S!(20, 80);
const CLOSE_ENEMIES: Score = S!(7, 0);

// Variant bonuses
const KOTH_DISTANCE: [Score; 8] = [
    S!(96, 96),
    S!(54, 54),
    S!(27, 27),
    S!(12, 12),
    Score::ZERO,
    Score::ZERO,
    Score::ZERO,
    Score::ZERO,
];
const KOTH_SAFE_CENTER: Score = S!(163, 163);
const THREE_CHECK_GIVEN: [Score; 4] = [Score::ZERO, S!(444, 181), S!(2425, 603), Score::ZERO];
const ATOMIC_CONFINED_KING: Score = S!(97, 84);
const ATOMIC_THREAT_BY_BLAST: Score = S!(80, 80);
const RACE_KING_RANK: [Score; 8] = [
    Score::ZERO,
    S!(17, 17),
    S!(39, 39),
    S!(67, 67),
    S!(105, 105),
    S!(160, 160),
    S!(237, 237),
    S!(342, 342),
];
const HORDE_SHELTER_BREAK: Score = S!(39, 59);

// KING_ATTACK_WEIGHTS[PieceType] contains king attack weights by piece
// type.
const KING_ATTACK_WEIGHTS: [i32; 8] = [0, 0, 78, 56, 45, 11, 0, 0];

// Penalties for enemy's safe checks
const QUEEN_SAFE_CHECK: i32 = 780;
const ROOK_SAFE_CHECK: i32 = 880;
const BISHOP_SAFE_CHECK: i32 = 435;
const KNIGHT_SAFE_CHECK: i32 = 790;

// Upper bound of the midgame king-danger penalty per variant.
const MAX_DANGER: [i32; VARIANT_NB] = [
    2000, // Chess
    0,    // Anti
    2800, // Atomic
    3500, // Crazyhouse
    2000, // Extinction
    2000, // Grid
    2200, // Horde
    2200, // Koth
    0,    // Losers
    0,    // Race
    3000, // ThreeCheck
    2000, // TwoKings
];

// Threshold for lazy evaluation: the first bound skips everything past
// the pawn stage, the second one skips threats and space.
const LAZY_THRESHOLD_1: Value = Value(1500);
const LAZY_THRESHOLD_2: Value = Value(2300);
const SPACE_THRESHOLD: Value = Value(12222);

struct EvalInfo<'a> {
    pi: &'a mut pawns::Entry,
    me: &'a mut material::Entry,
    // attacked_by[color][piece type] contains all squares attacked by a
    // given color and piece type; index 0 is all piece types combined.
    attacked_by: [[Bitboard; 8]; 2],
    attacked_by2: [Bitboard; 2],
    king_ring: [Bitboard; 2],
    king_attackers_count: [i32; 2],
    king_attackers_weight: [i32; 2],
    king_adjacent_zone_attacks_count: [i32; 2],
    mobility_area: [Bitboard; 2],
    mobility: [Score; 2],
}

fn king_flank(f: u32) -> Bitboard {
    let center = if f <= FILE_D {
        Bitboard::FILEC_BB | Bitboard::FILED_BB
    } else {
        Bitboard::FILEE_BB | Bitboard::FILEF_BB
    };
    match f {
        FILE_A | 1 => Bitboard::FILEA_BB | Bitboard::FILEB_BB | center,
        6 | FILE_H => Bitboard::FILEG_BB | Bitboard::FILEH_BB | center,
        _ => center,
    }
}

// initialize() computes king and pawn attacks, and the king ring bitboard
// for a given color.
fn initialize<Us: ColorTrait>(pos: &Position, ei: &mut EvalInfo) {
    let us = Us::COLOR;
    let them = !us;
    let up = if us == Color::WHITE {
        crate::types::direction::Direction::NORTH
    } else {
        crate::types::direction::Direction::SOUTH
    };
    let low_ranks = if us == Color::WHITE {
        Bitboard::RANK2_BB | Bitboard::RANK3_BB
    } else {
        Bitboard::RANK7_BB | Bitboard::RANK6_BB
    };

    // Find our pawns on the first two ranks, and those which are blocked
    let b = pos.pieces_cp(us, PieceType::PAWN)
        & (pos.pieces().shift(-up) | low_ranks);

    // Squares occupied by those pawns, by our king, or controlled by enemy
    // pawns are excluded from the mobility area.
    ei.mobility_area[us.0 as usize] = !(b
        | pos.pieces_cp(us, PieceType::KING)
        | ei.pi.pawn_attacks(them));

    // Initialise the attack bitboards with the king and pawn information
    let has_king = pos.count(us, PieceType::KING) > 0 && !pos.is_anti();
    let b = if has_king {
        pseudo_attacks(PieceType::KING, pos.royal_king(us))
    } else {
        Bitboard(0)
    };
    ei.attacked_by[us.0 as usize][PieceType::KING.0 as usize] = b;
    ei.attacked_by[us.0 as usize][PieceType::PAWN.0 as usize] = ei.pi.pawn_attacks(us);
    ei.attacked_by[us.0 as usize][PieceType::ALL_PIECES.0 as usize] =
        b | ei.pi.pawn_attacks(us);
    ei.attacked_by2[us.0 as usize] = b & ei.pi.pawn_attacks(us);

    // Init our king safety tables only if we are going to use them
    if has_king && pos.non_pawn_material_c(them) >= Value::RookValueMg + Value::KnightValueMg {
        let ksq = pos.royal_king(us);
        ei.king_ring[us.0 as usize] = pseudo_attacks(PieceType::KING, ksq) | ksq;
        if ksq.relative_rank(us) == RANK_1 {
            ei.king_ring[us.0 as usize] |=
                pseudo_attacks(PieceType::KING, ksq).shift(up);
        }

        ei.king_attackers_count[them.0 as usize] =
            popcount(ei.king_ring[us.0 as usize] & ei.pi.pawn_attacks(them)) as i32;
        ei.king_adjacent_zone_attacks_count[them.0 as usize] = 0;
        ei.king_attackers_weight[them.0 as usize] = 0;
    } else {
        ei.king_ring[us.0 as usize] = Bitboard(0);
        ei.king_attackers_count[them.0 as usize] = 0;
        ei.king_adjacent_zone_attacks_count[them.0 as usize] = 0;
        ei.king_attackers_weight[them.0 as usize] = 0;
    }
}

// evaluate_pieces() assigns bonuses and penalties to the pieces of a given
// color and type.
#[allow(clippy::too_many_lines)]
fn evaluate_pieces<Us: ColorTrait>(pos: &Position, ei: &mut EvalInfo) -> Score {
    let us = Us::COLOR;
    let them = !us;
    let outpost_ranks = if us == Color::WHITE {
        Bitboard::RANK4_BB | Bitboard::RANK5_BB | Bitboard::RANK6_BB
    } else {
        Bitboard::RANK5_BB | Bitboard::RANK4_BB | Bitboard::RANK3_BB
    };

    let mut score = Score::ZERO;

    for pt in 2..6 {
        let pt = PieceType(pt);
        ei.attacked_by[us.0 as usize][pt.0 as usize] = Bitboard(0);

        for s in pos.square_list(us, pt) {
            // Find attacked squares, including x-ray attacks for bishops
            // and rooks
            let mut b = match pt {
                PieceType::BISHOP => attacks_bb(
                    PieceType::BISHOP,
                    s,
                    pos.pieces() ^ pos.pieces_p(PieceType::QUEEN),
                ),
                PieceType::ROOK => attacks_bb(
                    PieceType::ROOK,
                    s,
                    pos.pieces()
                        ^ pos.pieces_p(PieceType::QUEEN)
                        ^ pos.pieces_cp(us, PieceType::ROOK),
                ),
                _ => pos.attacks_from(pt, s),
            };

            if pos.blockers_for_king(us) & s != 0 && pos.count(us, PieceType::KING) > 0 {
                b &= crate::bitboard::line_bb(pos.royal_king(us), s);
            }

            ei.attacked_by2[us.0 as usize] |=
                ei.attacked_by[us.0 as usize][PieceType::ALL_PIECES.0 as usize] & b;
            ei.attacked_by[us.0 as usize][pt.0 as usize] |= b;
            ei.attacked_by[us.0 as usize][PieceType::ALL_PIECES.0 as usize] |= b;

            if b & ei.king_ring[them.0 as usize] != 0 {
                ei.king_attackers_count[us.0 as usize] += 1;
                ei.king_attackers_weight[us.0 as usize] +=
                    KING_ATTACK_WEIGHTS[pt.0 as usize];
                ei.king_adjacent_zone_attacks_count[us.0 as usize] += popcount(
                    b & ei.attacked_by[them.0 as usize][PieceType::KING.0 as usize],
                ) as i32;
            }

            let mob = popcount(b & ei.mobility_area[us.0 as usize]) as usize;
            ei.mobility[us.0 as usize] += MOBILITY_BONUS[pt.0 as usize - 2][mob];

            // Piece promoted in crazyhouse loses its identity when captured,
            // discount it slightly.
            if pos.is_house() && pos.is_promoted(s) {
                score -= S!(20, 20);
            }

            if pt == PieceType::KNIGHT || pt == PieceType::BISHOP {
                // Bonus for outpost squares
                let mut bb = outpost_ranks
                    & !ei.pi.pawn_attacks_span(them);
                if bb & s != 0 {
                    score += OUTPOST[usize::from(pt == PieceType::BISHOP)][usize::from(
                        ei.attacked_by[us.0 as usize][PieceType::PAWN.0 as usize] & s != 0,
                    )] * 2;
                } else {
                    bb &= b & !pos.pieces_c(us);
                    if bb != 0 {
                        score += OUTPOST[usize::from(pt == PieceType::BISHOP)][usize::from(
                            ei.attacked_by[us.0 as usize][PieceType::PAWN.0 as usize] & bb
                                != 0,
                        )];
                    }
                }

                // Bonus when behind a pawn
                if s.relative_rank(us) < RANK_5
                    && pos.pieces_p(PieceType::PAWN)
                        & (s + crate::types::direction::pawn_push(us))
                        != 0
                {
                    score += MINOR_BEHIND_PAWN;
                }

                if pt == PieceType::BISHOP {
                    // Penalty according to number of pawns on the same color
                    // square as the bishop
                    score -= BISHOP_PAWNS * ei.pi.pawns_on_same_color_squares(us, s);

                    // Bonus for bishop on a long diagonal which can "see"
                    // both center squares
                    if more_than_one(
                        attacks_bb(PieceType::BISHOP, s, pos.pieces_p(PieceType::PAWN))
                            & Bitboard(0x0000_0018_1800_0000),
                    ) {
                        score += LONG_RANGED_BISHOP;
                    }
                }

                // King protector: penalty by king distance
                if pos.count(us, PieceType::KING) > 0 && !pos.is_anti() {
                    score -=
                        KING_PROTECTOR * Square::distance(s, pos.royal_king(us)) as i32;
                }
            }

            if pt == PieceType::ROOK {
                // Bonus for aligning with enemy pawns on the same rank/file
                if s.relative_rank(us) >= RANK_5 {
                    score += ROOK_ON_PAWN
                        * popcount(
                            pos.pieces_cp(them, PieceType::PAWN)
                                & pseudo_attacks(PieceType::ROOK, s),
                        ) as i32;
                }

                // Bonus when on an open or semi-open file
                if ei.pi.semiopen_file(us, s.file()) != 0 {
                    score +=
                        ROOK_ON_FILE[usize::from(ei.pi.semiopen_file(them, s.file()) != 0)];
                }
                // Penalty when trapped by the king, even more if the king
                // cannot castle
                else if mob <= 3 && pos.count(us, PieceType::KING) > 0 {
                    let ksq = pos.royal_king(us);
                    if (ksq.file() < FILE_E) == (s.file() < ksq.file())
                        && ei.pi.semiopen_file(us, ksq.file()) == 0
                    {
                        score -= (TRAPPED_ROOK - S!(mob as i32 * 22, 0))
                            * (1 + i32::from(!pos.can_castle(us)));
                    }
                }
            }

            if pt == PieceType::QUEEN {
                // Penalty if any relative pin or discovered attack against
                // the queen
                let mut pinners = Bitboard(0);
                if pos.slider_blockers(
                    pos.pieces_cpp(them, PieceType::ROOK, PieceType::BISHOP),
                    s,
                    &mut pinners,
                ) != 0
                {
                    score -= WEAK_QUEEN;
                }
            }
        }
    }

    score
}

// evaluate_king() assigns bonuses and penalties to a king of a given
// color.
#[allow(clippy::too_many_lines)]
fn evaluate_king<Us: ColorTrait>(pos: &Position, ei: &mut EvalInfo) -> Score {
    let us = Us::COLOR;
    let them = !us;

    if pos.count(us, PieceType::KING) == 0 || pos.is_anti() {
        return Score::ZERO;
    }

    let ksq = pos.royal_king(us);
    let camp = if us == Color::WHITE {
        Bitboard::ALL ^ Bitboard::RANK6_BB ^ Bitboard::RANK7_BB ^ Bitboard::RANK8_BB
    } else {
        Bitboard::ALL ^ Bitboard::RANK1_BB ^ Bitboard::RANK2_BB ^ Bitboard::RANK3_BB
    };

    // King shelter and enemy pawns storm
    let mut score = ei.pi.king_safety::<Us>(pos, ksq);

    // Main king safety evaluation
    if ei.king_attackers_count[them.0 as usize] > 1 - pos.count(them, PieceType::QUEEN) {
        // Attacked squares defended at most once by our queen or king
        let weak = ei.attacked_by[them.0 as usize][PieceType::ALL_PIECES.0 as usize]
            & !ei.attacked_by2[us.0 as usize]
            & (ei.attacked_by[us.0 as usize][PieceType::KING.0 as usize]
                | ei.attacked_by[us.0 as usize][PieceType::QUEEN.0 as usize]
                | !ei.attacked_by[us.0 as usize][PieceType::ALL_PIECES.0 as usize]);

        // Analyse the safe enemy's checks which are possible on next move
        let safe = !pos.pieces_c(them)
            & (!ei.attacked_by[us.0 as usize][PieceType::ALL_PIECES.0 as usize]
                | (weak & ei.attacked_by2[them.0 as usize]));

        let b1 = attacks_bb(PieceType::ROOK, ksq, pos.pieces() ^ pos.pieces_cp(us, PieceType::QUEEN));
        let b2 = attacks_bb(
            PieceType::BISHOP,
            ksq,
            pos.pieces() ^ pos.pieces_cp(us, PieceType::QUEEN),
        );

        let mut king_danger = 0;

        // Enemy queen safe checks
        if (b1 | b2)
            & ei.attacked_by[them.0 as usize][PieceType::QUEEN.0 as usize]
            & safe
            & !ei.attacked_by[us.0 as usize][PieceType::QUEEN.0 as usize]
            != 0
        {
            king_danger += QUEEN_SAFE_CHECK;
        }

        // Enemy rooks checks
        if b1 & ei.attacked_by[them.0 as usize][PieceType::ROOK.0 as usize] & safe != 0 {
            king_danger += ROOK_SAFE_CHECK;
        }

        // Enemy bishops checks
        if b2 & ei.attacked_by[them.0 as usize][PieceType::BISHOP.0 as usize] & safe != 0 {
            king_danger += BISHOP_SAFE_CHECK;
        }

        // Enemy knights checks
        if pseudo_attacks(PieceType::KNIGHT, ksq)
            & ei.attacked_by[them.0 as usize][PieceType::KNIGHT.0 as usize]
            & safe
            != 0
        {
            king_danger += KNIGHT_SAFE_CHECK;
        }

        king_danger += ei.king_attackers_count[them.0 as usize]
            * ei.king_attackers_weight[them.0 as usize]
            + 102 * ei.king_adjacent_zone_attacks_count[them.0 as usize]
            + 191 * popcount(ei.king_ring[us.0 as usize] & weak) as i32
            + 143 * popcount(pos.blockers_for_king(us) & pos.pieces_c(us)) as i32
            - 848 * i32::from(pos.count(them, PieceType::QUEEN) == 0)
            - 9 * score.mg().0 / 8
            + 40;

        // In the drop variants the attack never runs out of material.
        if pos.is_house() {
            king_danger += king_danger / 2;
        }

        if king_danger > 0 {
            let max_danger = MAX_DANGER[pos.variant().index()];
            let penalty = std::cmp::min(king_danger * king_danger / 4096, max_danger);
            score -= Score::make(penalty, king_danger / 16);
        }
    }

    // King tropism: firstly, find attacked squares in our king flank
    let kf = king_flank(ksq.file());
    let mut b = ei.attacked_by[them.0 as usize][PieceType::ALL_PIECES.0 as usize] & kf & camp;

    // Secondly, add the squares which are attacked twice in that flank and
    // which are not defended by our pawns.
    let b2 = b & ei.attacked_by2[them.0 as usize]
        & !ei.attacked_by[us.0 as usize][PieceType::PAWN.0 as usize];

    score -= CLOSE_ENEMIES * (popcount(b) + popcount(b2)) as i32;

    // Penalty when our king is on a pawnless flank
    if pos.pieces_p(PieceType::PAWN) & kf == 0 {
        score -= PAWNLESS_FLANK;
    }

    score
}

// evaluate_threats() assigns bonuses according to the types of the
// attacking and the attacked pieces.
fn evaluate_threats<Us: ColorTrait>(pos: &Position, ei: &mut EvalInfo) -> Score {
    let us = Us::COLOR;
    let them = !us;
    let up = crate::types::direction::pawn_push(us);
    let t_rank3_bb = if us == Color::WHITE {
        Bitboard::RANK3_BB
    } else {
        Bitboard::RANK6_BB
    };

    let mut score = Score::ZERO;

    // Non-pawn enemies attacked by a pawn
    let weak = (pos.pieces_c(them) ^ pos.pieces_cp(them, PieceType::PAWN))
        & ei.attacked_by[us.0 as usize][PieceType::PAWN.0 as usize];

    if weak != 0 {
        let b = pos.pieces_cp(us, PieceType::PAWN)
            & (!ei.attacked_by[them.0 as usize][PieceType::ALL_PIECES.0 as usize]
                | ei.attacked_by[us.0 as usize][PieceType::ALL_PIECES.0 as usize]);

        let safe_threats = (b.shift(if us == Color::WHITE {
            crate::types::direction::Direction::NORTH_EAST
        } else {
            crate::types::direction::Direction::SOUTH_WEST
        }) | b.shift(if us == Color::WHITE {
            crate::types::direction::Direction::NORTH_WEST
        } else {
            crate::types::direction::Direction::SOUTH_EAST
        })) & weak;

        score += THREAT_BY_SAFE_PAWN * popcount(safe_threats) as i32;
    }

    // Squares strongly protected by the enemy, either because they defend
    // the square with a pawn, or because they defend the square twice and
    // we don't.
    let strongly_protected = ei.attacked_by[them.0 as usize][PieceType::PAWN.0 as usize]
        | (ei.attacked_by2[them.0 as usize] & !ei.attacked_by2[us.0 as usize]);

    // Non-pawn enemies, strongly protected
    let defended =
        (pos.pieces_c(them) ^ pos.pieces_cp(them, PieceType::PAWN)) & strongly_protected;

    // Enemies not strongly protected and under our attack
    let weak = pos.pieces_c(them)
        & !strongly_protected
        & ei.attacked_by[us.0 as usize][PieceType::ALL_PIECES.0 as usize];

    if defended | weak != 0 {
        // Threats by minors
        let mut b = (defended | weak)
            & (ei.attacked_by[us.0 as usize][PieceType::KNIGHT.0 as usize]
                | ei.attacked_by[us.0 as usize][PieceType::BISHOP.0 as usize]);
        while b != 0 {
            let s = crate::bitboard::pop_lsb(&mut b);
            score += THREAT_BY_MINOR[pos.piece_on(s).piece_type().0 as usize];
        }

        // Threats by rooks
        let mut b = weak & ei.attacked_by[us.0 as usize][PieceType::ROOK.0 as usize];
        while b != 0 {
            let s = crate::bitboard::pop_lsb(&mut b);
            score += THREAT_BY_ROOK[pos.piece_on(s).piece_type().0 as usize];
        }

        // Threats by king
        let b = weak & ei.attacked_by[us.0 as usize][PieceType::KING.0 as usize];
        if b != 0 {
            score += THREAT_BY_KING[usize::from(more_than_one(b))];
        }

        // Bonus for hanging pieces
        score += HANGING
            * popcount(
                weak & !ei.attacked_by[them.0 as usize][PieceType::ALL_PIECES.0 as usize],
            ) as i32;
    }

    // Bonus for opponent unopposed weak pawns
    if pos.pieces_cpp(us, PieceType::ROOK, PieceType::QUEEN) != 0 {
        score += WEAK_UNOPPOSED_PAWN * ei.pi.weak_unopposed(them);
    }

    // Find the squares reachable by a single pawn push
    let mut b = pos.pieces_cp(us, PieceType::PAWN).shift(up) & !pos.pieces();
    b |= (b & t_rank3_bb).shift(up) & !pos.pieces();

    // Keep only those squares which are not completely unsafe
    b &= !ei.attacked_by[them.0 as usize][PieceType::PAWN.0 as usize]
        & (ei.attacked_by[us.0 as usize][PieceType::ALL_PIECES.0 as usize]
            | !ei.attacked_by[them.0 as usize][PieceType::ALL_PIECES.0 as usize]);

    // Bonus for safe pawn threats on the next move
    let b = (b.shift(if us == Color::WHITE {
        crate::types::direction::Direction::NORTH_EAST
    } else {
        crate::types::direction::Direction::SOUTH_WEST
    }) | b.shift(if us == Color::WHITE {
        crate::types::direction::Direction::NORTH_WEST
    } else {
        crate::types::direction::Direction::SOUTH_EAST
    })) & (pos.pieces_c(them) ^ pos.pieces_cp(them, PieceType::PAWN))
        & !ei.attacked_by[us.0 as usize][PieceType::PAWN.0 as usize];

    score += THREAT_BY_PAWN_PUSH * popcount(b) as i32;

    // Bonus for safe slider attack threats on the next move on the enemy
    // queen
    if pos.count(them, PieceType::QUEEN) == 1 {
        let q = pos.square(them, PieceType::QUEEN);
        let safe_threats = ei.mobility_area[us.0 as usize]
            & !strongly_protected
            & ((ei.attacked_by[us.0 as usize][PieceType::KNIGHT.0 as usize]
                & pseudo_attacks(PieceType::KNIGHT, q))
                | ((ei.attacked_by[us.0 as usize][PieceType::BISHOP.0 as usize]
                    & attacks_bb(PieceType::BISHOP, q, pos.pieces()))
                    | (ei.attacked_by[us.0 as usize][PieceType::ROOK.0 as usize]
                        & attacks_bb(PieceType::ROOK, q, pos.pieces()))));

        score += THREAT_BY_ATTACK_ON_QUEEN * popcount(safe_threats) as i32;
    }

    score
}

// evaluate_passed_pawns() evaluates the passed pawns and candidate passed
// pawns of the given color.
fn evaluate_passed_pawns<Us: ColorTrait>(pos: &Position, ei: &mut EvalInfo) -> Score {
    let us = Us::COLOR;
    let them = !us;
    let up = crate::types::direction::pawn_push(us);

    let mut score = Score::ZERO;

    let mut b = ei.pi.passed_pawns(us);
    while b != 0 {
        let s = crate::bitboard::pop_lsb(&mut b);

        debug_assert!(
            pos.pieces_cp(them, PieceType::PAWN) & forward_file_bb(us, s + up) == 0
        );

        let bb = forward_file_bb(us, s)
            & (ei.attacked_by[them.0 as usize][PieceType::ALL_PIECES.0 as usize]
                | pos.pieces_c(them));
        score -= HINDER_PASSED_PAWN * popcount(bb) as i32;

        let r = s.relative_rank(us);
        let rr = ((r as i32 - RANK_2 as i32) * (r as i32 - RANK_2 as i32 - 1)) / 2;

        let mut mbonus = passed_bonus(pos.variant(), MG, r);
        let mut ebonus = passed_bonus(pos.variant(), EG, r);

        if rr != 0 {
            let block_sq = s + up;

            if pos.count(us, PieceType::KING) > 0
                && pos.count(them, PieceType::KING) > 0
                && !pos.is_anti()
            {
                // Adjust bonus based on the king's proximity
                ebonus += (Square::distance(pos.royal_king(them), block_sq) as i32 * 5
                    - Square::distance(pos.royal_king(us), block_sq) as i32 * 2)
                    * rr;

                // If block_sq is not the queening square then consider also
                // a second push
                if r != RANK_7 {
                    ebonus -=
                        Square::distance(pos.royal_king(us), block_sq + up) as i32 * rr;
                }
            }

            // If the pawn is free to advance, then increase the bonus
            if pos.empty(block_sq) {
                // If there is a rook or queen attacking/defending the pawn
                // from behind, consider all the squaresToQueen. Otherwise
                // consider only the squares in the pawn's path attacked or
                // occupied by the enemy.
                let squares_to_queen = forward_file_bb(us, s);
                let mut unsafe_squares = passed_pawn_span_unsafe(pos, ei, us, s);

                let behind = forward_file_bb(them, s)
                    & pos.pieces_pp(PieceType::ROOK, PieceType::QUEEN);
                if behind & pos.pieces_c(us) == 0 {
                    unsafe_squares &= squares_to_queen;
                }

                // If there aren't any enemy attacks, assign a big bonus.
                // Otherwise assign a smaller bonus if the block square isn't
                // attacked.
                let k = if unsafe_squares == 0 {
                    18
                } else if unsafe_squares & block_sq == 0 {
                    8
                } else {
                    0
                };

                // Assign a larger bonus if the block square is defended
                let k = if (behind & pos.pieces_c(us) != 0)
                    || ei.attacked_by[us.0 as usize][PieceType::ALL_PIECES.0 as usize]
                        & block_sq
                        != 0
                {
                    k + 5
                } else {
                    k
                };

                mbonus += k * rr;
                ebonus += k * rr;
            } else if pos.pieces_c(us) & block_sq != 0 {
                mbonus += rr + r as i32 * 2;
                ebonus += rr + r as i32 * 2;
            }
        }

        // Scale down bonus for candidate passers which need more than one
        // pawn push to become passed, or have a pawn in front of them.
        if !pos.pawn_passed(us, s + up) || pos.pieces_p(PieceType::PAWN) & forward_file_bb(us, s) != 0
        {
            mbonus /= 2;
            ebonus /= 2;
        }

        score += Score::make(mbonus, ebonus) + PASSED_FILE[s.file() as usize];
    }

    score
}

fn passed_pawn_span_unsafe(
    pos: &Position,
    ei: &EvalInfo,
    us: Color,
    s: Square,
) -> Bitboard {
    let them = !us;
    forward_file_bb(us, s)
        & (ei.attacked_by[them.0 as usize][PieceType::ALL_PIECES.0 as usize]
            | pos.pieces_c(them))
}

// evaluate_space() computes the space evaluation for a given side. The
// space evaluation is a simple bonus based on the number of safe squares
// available for minor pieces on the central four files on ranks 2--4.
fn evaluate_space<Us: ColorTrait>(pos: &Position, ei: &mut EvalInfo) -> Score {
    let us = Us::COLOR;
    let them = !us;
    let space_mask = if us == Color::WHITE {
        (Bitboard::FILEC_BB | Bitboard::FILED_BB | Bitboard::FILEE_BB | Bitboard::FILEF_BB)
            & (Bitboard::RANK2_BB | Bitboard::RANK3_BB | Bitboard::RANK4_BB)
    } else {
        (Bitboard::FILEC_BB | Bitboard::FILED_BB | Bitboard::FILEE_BB | Bitboard::FILEF_BB)
            & (Bitboard::RANK7_BB | Bitboard::RANK6_BB | Bitboard::RANK5_BB)
    };

    // Find the safe squares for our pieces inside the area defined by
    // space_mask. A square is safe if it is not attacked by an enemy pawn,
    // or if it is undefended and attacked by an enemy piece.
    let safe = if pos.is_horde() {
        !ei.attacked_by[them.0 as usize][PieceType::PAWN.0 as usize]
            & (ei.attacked_by[us.0 as usize][PieceType::ALL_PIECES.0 as usize]
                | !ei.attacked_by[them.0 as usize][PieceType::ALL_PIECES.0 as usize])
    } else {
        space_mask
            & !pos.pieces_cp(us, PieceType::PAWN)
            & !ei.attacked_by[them.0 as usize][PieceType::PAWN.0 as usize]
            & (ei.attacked_by[us.0 as usize][PieceType::ALL_PIECES.0 as usize]
                | !ei.attacked_by[them.0 as usize][PieceType::ALL_PIECES.0 as usize])
    };

    // Find all squares which are at most three squares behind some friendly
    // pawn
    let mut behind = pos.pieces_cp(us, PieceType::PAWN);
    behind |= if us == Color::WHITE {
        behind >> 8
    } else {
        behind << 8
    };
    behind |= if us == Color::WHITE {
        behind >> 16
    } else {
        behind << 16
    };
    if pos.is_horde() {
        behind |= if us == Color::WHITE {
            behind >> 24
        } else {
            behind << 24
        };
    }

    let bonus = if pos.is_horde() {
        (popcount(safe) + popcount(behind & safe)) as i32
    } else {
        std::cmp::min(
            16,
            popcount(
                (if us == Color::WHITE {
                    safe << 32
                } else {
                    safe >> 32
                }) | (behind & safe),
            ) as i32,
        )
    };
    let mut weight = pos.count_all(us) - 2 * ei.pi.open_files();
    if pos.is_three_check() {
        weight -= pos.checks_count();
    }

    if pos.is_horde() && pos.is_horde_color(us) {
        return Score::make(bonus * weight * weight / 200, 0);
    }
    if pos.is_koth() {
        return Score::make(bonus * weight * weight / 22, 0)
            + KOTH_SAFE_CENTER
                * popcount(
                    safe & behind
                        & (Bitboard::RANK4_BB | Bitboard::RANK5_BB)
                        & (Bitboard::FILED_BB | Bitboard::FILEE_BB),
                ) as i32;
    }

    Score::make(bonus * weight * weight / 18, 0)
}

// evaluate_variant() computes the variant specific bonuses: the confined
// atomic king, the horde breakthrough, the hill race and so on.
fn evaluate_variant<Us: ColorTrait>(pos: &Position, ei: &mut EvalInfo) -> Score {
    let us = Us::COLOR;
    let them = !us;
    let mut score = Score::ZERO;

    match pos.variant().main() {
        Variant::Atomic => {
            if pos.count(us, PieceType::KING) > 0 {
                let ksq = pos.royal_king(us);
                // Few flight squares invite a winning blast nearby.
                let ring = pseudo_attacks(PieceType::KING, ksq);
                let confined = popcount(ring) as i32 - popcount(ring & !pos.pieces()) as i32;
                score -= ATOMIC_CONFINED_KING * confined / 8;
            }
            if pos.count(them, PieceType::KING) > 0 {
                // Attacked squares next to the enemy king threaten the
                // decisive explosion.
                let ring = pseudo_attacks(PieceType::KING, pos.royal_king(them));
                score += ATOMIC_THREAT_BY_BLAST
                    * popcount(
                        ring & pos.pieces_c(them)
                            & ei.attacked_by[us.0 as usize]
                                [PieceType::ALL_PIECES.0 as usize],
                    ) as i32
                    / 4;
            }
        }
        Variant::Horde => {
            if pos.is_horde_color(us) {
                // Pawns tearing into the shelter files are the horde's
                // main resource.
                let mut breaks = 0;
                for s in pos.square_list(us, PieceType::PAWN) {
                    if s.relative_rank(us) >= RANK_5
                        && ei.attacked_by[us.0 as usize][PieceType::PAWN.0 as usize] & s != 0
                    {
                        breaks += 1;
                    }
                }
                score += HORDE_SHELTER_BREAK * breaks;
            }
        }
        Variant::Koth => {
            if pos.count(us, PieceType::KING) > 0 {
                let d = pos.koth_distance(us);
                score += KOTH_DISTANCE[d as usize];
            }
        }
        Variant::Race => {
            if pos.count(us, PieceType::KING) > 0 {
                let r = pos.square(us, PieceType::KING).rank();
                score += RACE_KING_RANK[r as usize];
            }
        }
        Variant::ThreeCheck => {
            let given = pos.checks_given(us);
            score += THREE_CHECK_GIVEN[given.clamp(0, 3) as usize];
        }
        _ => {}
    }

    score
}

// evaluate_initiative() computes the initiative correction value for the
// position, i.e., second order bonus/malus based on the known
// attacking/defending status of the players.
fn evaluate_initiative(pos: &Position, asymmetry: i32, eg: Value) -> Score {
    let king_distance = if pos.is_anti()
        || pos.count(Color::WHITE, PieceType::KING) == 0
        || pos.count(Color::BLACK, PieceType::KING) == 0
    {
        // Assume an average king distance without royal pieces around.
        5
    } else {
        u32::distance(
            pos.royal_king(Color::WHITE).file(),
            pos.royal_king(Color::BLACK).file(),
        ) as i32
            - u32::distance(
                pos.royal_king(Color::WHITE).rank(),
                pos.royal_king(Color::BLACK).rank(),
            ) as i32
    };
    let pawns =
        pos.count(Color::WHITE, PieceType::PAWN) + pos.count(Color::BLACK, PieceType::PAWN);

    // Compute the initiative bonus for the attacking side
    let initiative = 8 * (asymmetry + king_distance - 17) + 12 * pawns;

    // Now apply the bonus: note that we find the attacking side by
    // extracting the sign of the endgame value, and that we carefully cap
    // the bonus so that the endgame score will never change sign after the
    // correction.
    let sign = i32::from(eg.0 > 0) - i32::from(eg.0 < 0);
    let value = sign * std::cmp::max(initiative, -eg.0.abs() / 2);

    Score::make(0, value)
}

// evaluate_scale_factor() computes the scale factor for the winning side
fn evaluate_scale_factor(pos: &Position, ei: &EvalInfo, eg: Value) -> ScaleFactor {
    let strong_side = if eg > Value::DRAW {
        Color::WHITE
    } else {
        Color::BLACK
    };
    let sf = ei.me.scale_factor(pos, strong_side);

    // If we don't already have an unusual scale factor, check for certain
    // types of endgames, and use a lower scale for those.
    if pos.variant() == Variant::Chess
        && ei.me.game_phase() < PHASE_MIDGAME
        && (sf == ScaleFactor::NORMAL || sf == ScaleFactor::ONEPAWN)
    {
        if pos.opposite_bishops() {
            // Endgame with opposite-colored bishops and no other pieces
            // (ignoring pawns) is almost a draw, in case of KBP vs KB, it
            // is even more a draw.
            if pos.non_pawn_material_c(Color::WHITE) == Value::BishopValueMg
                && pos.non_pawn_material_c(Color::BLACK) == Value::BishopValueMg
            {
                return if more_than_one(pos.pieces_p(PieceType::PAWN)) {
                    ScaleFactor(31)
                } else {
                    ScaleFactor(9)
                };
            }
            // Endgame with opposite-colored bishops, but also other pieces.
            // Still a bit drawish, but not as drawish as with only the two
            // bishops.
            return ScaleFactor(46);
        }
        // Endings where weaker side can place his king in front of the
        // opponent's pawns are drawish.
        if eg.abs() <= Value::BishopValueEg
            && pos.count(strong_side, PieceType::PAWN) <= 2
            && !pos.pawn_passed(!strong_side, pos.square(!strong_side, PieceType::KING))
        {
            return ScaleFactor(37 + 7 * pos.count(strong_side, PieceType::PAWN));
        }
    }

    sf
}

// evaluate() is the main evaluation function. It returns a static
// evaluation of the position from the point of view of the side to move.
#[allow(clippy::too_many_lines)]
pub fn evaluate(pos: &Position) -> Value {
    debug_assert!(pos.checkers() == 0);

    // Variant-terminal positions have a known value.
    if let Some(v) = pos.variant_result(0, Value::DRAW) {
        return v;
    }

    // Probe the material hash table
    let me = material::probe(pos);

    // If we have a specialized evaluation function for the current material
    // configuration, call it and return.
    if me.specialized_eval_exists() {
        return me.evaluate(pos);
    }

    // Probe the pawn hash table
    let pi = pawns::probe(pos);

    let mut ei = EvalInfo {
        pi,
        me,
        attacked_by: [[Bitboard(0); 8]; 2],
        attacked_by2: [Bitboard(0); 2],
        king_ring: [Bitboard(0); 2],
        king_attackers_count: [0; 2],
        king_attackers_weight: [0; 2],
        king_adjacent_zone_attacks_count: [0; 2],
        mobility_area: [Bitboard(0); 2],
        mobility: [Score::ZERO; 2],
    };

    // Initialize score by reading the incrementally updated scores included
    // in the position (material + piece square tables) and the material
    // imbalance. Score is computed internally from the white point of view.
    let mut score = pos.psq_score() + ei.me.imbalance() + ei.pi.pawns_score();

    // Early exit if the score is already far beyond the winnable bounds.
    let lazy = (score.mg() + score.eg()) / 2;
    if lazy.abs() > LAZY_THRESHOLD_1 {
        return side_to_move_view(pos, lazy);
    }

    initialize::<White>(pos, &mut ei);
    initialize::<Black>(pos, &mut ei);

    score += evaluate_pieces::<White>(pos, &mut ei) - evaluate_pieces::<Black>(pos, &mut ei);
    score += ei.mobility[Color::WHITE.0 as usize] - ei.mobility[Color::BLACK.0 as usize];

    score += evaluate_king::<White>(pos, &mut ei) - evaluate_king::<Black>(pos, &mut ei);

    score += evaluate_passed_pawns::<White>(pos, &mut ei)
        - evaluate_passed_pawns::<Black>(pos, &mut ei);

    // Second lazy exit, with the king and passed-pawn terms settled.
    let lazy = (score.mg() + score.eg()) / 2;
    if lazy.abs() > LAZY_THRESHOLD_2 {
        return side_to_move_view(pos, lazy);
    }

    score += evaluate_threats::<White>(pos, &mut ei) - evaluate_threats::<Black>(pos, &mut ei);

    if pos.non_pawn_material() >= SPACE_THRESHOLD {
        score += evaluate_space::<White>(pos, &mut ei) - evaluate_space::<Black>(pos, &mut ei);
    }

    score += evaluate_variant::<White>(pos, &mut ei) - evaluate_variant::<Black>(pos, &mut ei);

    score += evaluate_initiative(pos, ei.pi.pawn_asymmetry(), score.eg());

    // Interpolate between a middlegame and a (scaled by 'sf') endgame score
    let sf = evaluate_scale_factor(pos, &ei, score.eg());
    let phase = ei.me.game_phase();
    let v = (score.mg().0 * phase
        + score.eg().0 * (PHASE_MIDGAME - phase) * sf.0 / ScaleFactor::NORMAL.0)
        / PHASE_MIDGAME;

    side_to_move_view(pos, Value(v))
}

// The final value is normalised to the side to move, gets the tempo bonus,
// and drifts toward the draw score as the fifty-move counter runs down.
fn side_to_move_view(pos: &Position, v: Value) -> Value {
    let v = if pos.side_to_move() == Color::WHITE {
        v
    } else {
        -v
    };
    let v = v + TEMPO;
    Value(v.0 * (100 - pos.rule50_count()) / 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::variant::Variant;

    fn pos_from(fen: &str, v: Variant) -> Position {
        crate::init_for_test();
        let mut pos = Position::new();
        pos.set(fen, false, v).unwrap();
        pos.alloc_tables();
        pos
    }

    #[test]
    fn test_startpos_near_balance() {
        let pos = pos_from(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            Variant::Chess,
        );
        let v = evaluate(&pos);
        // White keeps roughly the tempo bonus.
        assert!(v.0.abs() < 200, "startpos eval too large: {}", v.0);
    }

    #[test]
    fn test_flip_symmetry() {
        crate::init_for_test();
        let fens = [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
        ];
        for fen in &fens {
            let mut pos = pos_from(fen, Variant::Chess);
            let v1 = evaluate(&pos);
            pos.flip();
            let v2 = evaluate(&pos);
            assert_eq!(v1, v2, "asymmetric eval for {fen}");
        }
    }

    #[test]
    fn test_material_advantage_shows() {
        // White is a queen up.
        let pos = pos_from("3qk3/8/8/8/8/8/8/Q2QK3 w - - 0 1", Variant::Chess);
        let v = evaluate(&pos);
        assert!(v > Value(500));
    }

    #[test]
    fn test_koth_center_preference() {
        // The same material, but the white king far closer to the centre.
        let near = pos_from("4k3/8/8/8/4K3/8/8/RR6 w - - 0 1", Variant::Koth);
        let far = pos_from("4k3/8/8/8/8/8/8/RR4K1 w - - 0 1", Variant::Koth);
        assert!(evaluate(&near) > evaluate(&far));
    }

    #[test]
    fn test_three_check_counter_matters() {
        let none = pos_from(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 +3+3",
            Variant::ThreeCheck,
        );
        let two = pos_from(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 +1+3",
            Variant::ThreeCheck,
        );
        assert!(evaluate(&two) > evaluate(&none));
    }

    #[test]
    fn test_rule50_damping() {
        let fresh = pos_from("3qk3/8/8/8/8/8/8/Q2QK3 w - - 0 1", Variant::Chess);
        let stale = pos_from("3qk3/8/8/8/8/8/8/Q2QK3 w - - 90 60", Variant::Chess);
        assert!(evaluate(&fresh) > evaluate(&stale));
    }
}
