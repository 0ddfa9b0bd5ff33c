// SPDX-License-Identifier: GPL-3.0-or-later

#![allow(dead_code)]

use crate::types::variant::{Variant, MAIN_VARIANTS, VARIANT_NB};
use crate::types::{piece_value_var, Color, Piece, PieceType, Score, Square, EG, MG};

// Bonus[PieceType][Rank][File/2] contains piece-square scores relative to the
// bare piece value. The tables are symmetric about the d/e file boundary and
// defined for white; scores for black are mirrored and negated in init().
// Variant divergence is carried entirely by the per-variant piece values, so
// a single bonus set serves every variant.

macro_rules! S {
    ($x:expr, $y:expr) => {
        Score(($y << 16) + $x)
    };
}

#[rustfmt::skip]
const BONUS: [[[Score; 4]; 8]; 7] = [
    [[Score::ZERO; 4]; 8], // NO_PIECE_TYPE
    [ // Pawn
        [S!(0, 0),    S!(0, 0),   S!(0, 0),   S!(0, 0)],
        [S!(-11, 7),  S!(6, -4),  S!(7, 8),   S!(3, -2)],
        [S!(-18, -4), S!(-2, -5), S!(19, 5),  S!(24, 4)],
        [S!(-17, 3),  S!(-9, 3),  S!(20, -8), S!(35, -3)],
        [S!(-6, 8),   S!(5, 9),   S!(3, 7),   S!(21, -6)],
        [S!(-6, 8),   S!(-8, -5), S!(-6, 2),  S!(-2, 4)],
        [S!(-4, 3),   S!(20, -9), S!(-8, 1),  S!(-4, 18)],
        [S!(0, 0),    S!(0, 0),   S!(0, 0),   S!(0, 0)],
    ],
    [ // Knight
        [S!(-161, -105), S!(-96, -82), S!(-80, -46), S!(-73, -14)],
        [S!(-83, -69),   S!(-43, -54), S!(-21, -17), S!(-10, 9)],
        [S!(-71, -50),   S!(-22, -39), S!(0, -7),    S!(9, 28)],
        [S!(-25, -41),   S!(18, -25),  S!(43, 6),    S!(47, 38)],
        [S!(-26, -46),   S!(16, -25),  S!(38, 3),    S!(50, 40)],
        [S!(-11, -54),   S!(37, -38),  S!(56, -7),   S!(65, 27)],
        [S!(-63, -65),   S!(-19, -50), S!(5, -24),   S!(14, 13)],
        [S!(-195, -109), S!(-67, -89), S!(-42, -50), S!(-29, -13)],
    ],
    [ // Bishop
        [S!(-44, -58), S!(-13, -31), S!(-25, -37), S!(-34, -19)],
        [S!(-20, -34), S!(20, -9),   S!(12, -14),  S!(1, 4)],
        [S!(-9, -23),  S!(27, 0),    S!(21, -3),   S!(11, 16)],
        [S!(-11, -26), S!(28, -3),   S!(21, -5),   S!(10, 16)],
        [S!(-11, -26), S!(27, -4),   S!(16, -7),   S!(9, 14)],
        [S!(-17, -24), S!(16, -2),   S!(12, 0),    S!(2, 13)],
        [S!(-23, -34), S!(17, -10),  S!(6, -12),   S!(-2, 6)],
        [S!(-35, -55), S!(-11, -32), S!(-19, -36), S!(-29, -17)],
    ],
    [ // Rook
        [S!(-25, 0), S!(-16, 0), S!(-16, 0), S!(-9, 0)],
        [S!(-21, 0), S!(-8, 0),  S!(-3, 0),  S!(0, 0)],
        [S!(-21, 0), S!(-9, 0),  S!(-4, 0),  S!(2, 0)],
        [S!(-22, 0), S!(-6, 0),  S!(-1, 0),  S!(2, 0)],
        [S!(-22, 0), S!(-7, 0),  S!(0, 0),   S!(1, 0)],
        [S!(-21, 0), S!(-7, 0),  S!(0, 0),   S!(2, 0)],
        [S!(-12, 0), S!(4, 0),   S!(8, 0),   S!(12, 0)],
        [S!(-23, 0), S!(-15, 0), S!(-11, 0), S!(-5, 0)],
    ],
    [ // Queen
        [S!(0, -71), S!(-4, -56), S!(-3, -42), S!(-1, -29)],
        [S!(-4, -56), S!(6, -30),  S!(9, -21),  S!(8, -5)],
        [S!(-2, -39), S!(6, -17),  S!(9, -8),   S!(9, 5)],
        [S!(-1, -29), S!(8, -5),   S!(10, 9),   S!(7, 19)],
        [S!(-3, -27), S!(9, -5),   S!(8, 10),   S!(7, 21)],
        [S!(-2, -40), S!(6, -16),  S!(8, -10),  S!(10, 3)],
        [S!(-2, -55), S!(7, -30),  S!(7, -21),  S!(6, -6)],
        [S!(-1, -74), S!(-4, -55), S!(-1, -43), S!(0, -30)],
    ],
    [ // King
        [S!(267, 0),  S!(320, 48),  S!(270, 75),  S!(195, 84)],
        [S!(264, 43), S!(304, 92),  S!(238, 143), S!(180, 132)],
        [S!(200, 83), S!(245, 138), S!(176, 167), S!(110, 165)],
        [S!(177, 106), S!(185, 169), S!(148, 169), S!(110, 179)],
        [S!(149, 108), S!(177, 163), S!(115, 200), S!(66, 203)],
        [S!(118, 95),  S!(159, 155), S!(84, 176),  S!(41, 174)],
        [S!(87, 50),   S!(128, 99),  S!(63, 122),  S!(20, 139)],
        [S!(63, 9),    S!(88, 55),   S!(47, 80),   S!(0, 90)],
    ],
];

static mut PSQ: [[[Score; 64]; 16]; VARIANT_NB] = [[[Score(0); 64]; 16]; VARIANT_NB];

pub fn psq(v: Variant, pc: Piece, s: Square) -> Score {
    unsafe { PSQ[v.index()][pc.0 as usize][s.0 as usize] }
}

// init() initializes the piece-square tables: the white halves are copied
// from the bonus tables added to the variant piece value, and the black
// halves are initialized by flipping and changing the sign of the white
// scores.
pub fn init() {
    for &v in &MAIN_VARIANTS {
        for pt in 1..7 {
            let w = Piece::make(Color::WHITE, PieceType(pt));
            let b = !w;
            let value = Score::make(
                piece_value_var(v, MG, w).0,
                piece_value_var(v, EG, w).0,
            );

            for s in 0..64u32 {
                let sq = Square(s);
                let f = std::cmp::min(sq.file(), 7 - sq.file());
                let score =
                    value + BONUS[pt as usize][sq.rank() as usize][f as usize];
                unsafe {
                    PSQ[v.index()][w.0 as usize][s as usize] = score;
                    PSQ[v.index()][b.0 as usize][(!sq).0 as usize] = -score;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_antisymmetry() {
        crate::init_for_test();
        for &v in &MAIN_VARIANTS {
            for pt in 1..7 {
                let w = Piece::make(Color::WHITE, PieceType(pt));
                for s in 0..64u32 {
                    let sq = Square(s);
                    let ws = psq(v, w, sq);
                    let bs = psq(v, !w, !sq);
                    assert_eq!(ws.mg(), -bs.mg());
                    assert_eq!(ws.eg(), -bs.eg());
                }
            }
        }
    }

    #[test]
    fn test_pawn_value_included() {
        crate::init_for_test();
        use crate::types::Value;
        let s = psq(Variant::Chess, Piece::W_PAWN, Square::E4);
        assert!(s.mg() > Value(0));
    }
}
