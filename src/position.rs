// SPDX-License-Identifier: GPL-3.0-or-later

use crate::bitboard::{
    aligned, attacks_bb, between_bb, grid_bb, lsb, more_than_one, pawn_attacks, popcount,
    pseudo_attacks, rank_bb, Bitboard,
};
use crate::movegen::{Legal, MoveList};
use crate::movepick::{
    ButterflyHistory, CapturePieceToHistory, ContinuationHistory, CounterMoveHistory,
};
use crate::psqt;
use crate::search;
use crate::threads::ThreadCtrl;
use crate::types::depth::Depth;
use crate::types::direction::{pawn_push, Direction};
use crate::types::key::Key;
use crate::types::variant::Variant;
use crate::types::{
    mate_in, mated_in, opposite_colors, piece_value, piece_value_var, relative_rank,
    relative_square, CastlingRight, CastlingSide, Color, Move, MoveType, Piece, PieceType, Score,
    Square, SquareList, Value, FILE_D, FILE_E, MG, RANK_1, RANK_2, RANK_3, RANK_4, RANK_5, RANK_6,
    RANK_7, RANK_8,
};
use crate::{material, pawns};

use std::sync::Arc;
use thiserror::Error;

pub mod zobrist {
    use crate::misc;
    use crate::types::key::Key;
    use crate::types::variant::{Variant, MAIN_VARIANTS, VARIANT_NB};
    use crate::types::{CastlingRight, Color, File, Piece, Square};

    static mut PSQ: [[Key; 64]; 16] = [[Key(0); 64]; 16];
    static mut ENPASSANT: [Key; 8] = [Key(0); 8];
    static mut CASTLING: [Key; 16] = [Key(0); 16];
    static mut SIDE: Key = Key(0);
    static mut NO_PAWNS: Key = Key(0);
    static mut VARIANT: [Key; VARIANT_NB] = [Key(0); VARIANT_NB];
    static mut CHECKS: [[Key; 4]; 2] = [[Key(0); 4]; 2];
    static mut IN_HAND: [[Key; 17]; 16] = [[Key(0); 17]; 16];

    pub fn psq(pc: Piece, s: Square) -> Key {
        unsafe { PSQ[pc.0 as usize][s.0 as usize] }
    }

    // The first piece-square keys double as material-count keys, exactly as
    // many as a side can ever own of one piece.
    pub fn material(pc: Piece, num: i32) -> Key {
        unsafe { PSQ[pc.0 as usize][num as usize] }
    }

    pub fn enpassant(f: File) -> Key {
        unsafe { ENPASSANT[f as usize] }
    }

    pub fn castling(cr: CastlingRight) -> Key {
        unsafe { CASTLING[cr.0 as usize] }
    }

    pub fn side() -> Key {
        unsafe { SIDE }
    }

    pub fn no_pawns() -> Key {
        unsafe { NO_PAWNS }
    }

    pub fn variant(v: Variant) -> Key {
        unsafe { VARIANT[v.index()] }
    }

    pub fn checks(c: Color, n: i32) -> Key {
        unsafe { CHECKS[c.0 as usize][n as usize] }
    }

    pub fn in_hand(pc: Piece, n: i32) -> Key {
        unsafe { IN_HAND[pc.0 as usize][n as usize] }
    }

    // zobrist::init() initializes at startup the various arrays used to
    // compute hash keys.
    pub fn init() {
        let mut rng = misc::Prng::new(1_070_372);

        unsafe {
            (1..15).for_each(|i| {
                if i != 7 && i != 8 {
                    for s in 0..64 {
                        PSQ[i][s] = Key(rng.rand64());
                    }
                }
            });

            (0..8).for_each(|f| {
                ENPASSANT[f] = Key(rng.rand64());
            });

            for cr in 0..16 {
                let b = crate::bitboard::Bitboard(cr);
                for s in b {
                    let k = CASTLING[1usize << s.0];
                    CASTLING[cr as usize] ^= if k.0 != 0 { k } else { Key(rng.rand64()) };
                }
            }

            SIDE = Key(rng.rand64());
            NO_PAWNS = Key(rng.rand64());

            for &v in MAIN_VARIANTS.iter() {
                VARIANT[v.index()] = if v == Variant::Chess {
                    Key(0)
                } else {
                    Key(rng.rand64())
                };
            }

            for c in 0..2 {
                for n in 0..4 {
                    CHECKS[c][n] = Key(rng.rand64());
                }
            }

            (1..15).for_each(|i| {
                if i != 7 && i != 8 {
                    for n in 0..17 {
                        IN_HAND[i][n] = Key(rng.rand64());
                    }
                }
            });
        }
    }
}

// Marcel van Kervinck's cuckoo tables for fast upcoming-repetition
// detection. Both tables are filled at startup with the Zobrist deltas of
// every reversible non-pawn move.

const CUCKOO_SIZE: usize = 8192;

static mut CUCKOO: [Key; CUCKOO_SIZE] = [Key(0); CUCKOO_SIZE];
static mut CUCKOO_MOVE: [Move; CUCKOO_SIZE] = [Move::NONE; CUCKOO_SIZE];

fn h1(key: Key) -> usize {
    (key.0 & 0x1fff) as usize
}

fn h2(key: Key) -> usize {
    ((key.0 >> 16) & 0x1fff) as usize
}

pub fn init_cuckoo() {
    let mut count = 0;
    for i in 1..15 {
        if i == 7 || i == 8 {
            continue;
        }
        let pc = Piece(i);
        if pc.piece_type() == PieceType::PAWN {
            continue;
        }
        for s1 in 0..63u32 {
            for s2 in (s1 + 1)..64u32 {
                let (s1, s2) = (Square(s1), Square(s2));
                if attacks_bb(pc.piece_type(), s1, Bitboard(0)) & s2 == 0 {
                    continue;
                }
                let mut mv = Move::make(s1, s2);
                let mut key = zobrist::psq(pc, s1) ^ zobrist::psq(pc, s2) ^ zobrist::side();
                let mut i = h1(key);
                loop {
                    unsafe {
                        std::mem::swap(&mut CUCKOO[i], &mut key);
                        std::mem::swap(&mut CUCKOO_MOVE[i], &mut mv);
                    }
                    if mv == Move::NONE {
                        break;
                    }
                    i = if i == h1(key) { h2(key) } else { h1(key) };
                }
                count += 1;
            }
        }
    }
    debug_assert!(count == 3668);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("invalid piece placement")]
    InvalidPiecePlacement,
    #[error("invalid side to move")]
    InvalidSideToMove,
    #[error("invalid castling availability")]
    InvalidCastling,
    #[error("invalid en passant square")]
    InvalidEnPassant,
    #[error("invalid move counter")]
    InvalidCounter,
    #[error("invalid hand")]
    InvalidHand,
    #[error("invalid check count")]
    InvalidCheckCount,
}

#[derive(Clone)]
pub struct StateInfo {
    // Copied when making a move
    pub pawn_key: Key,
    pub material_key: Key,
    pub non_pawn_material: [Value; 2],
    pub castling_rights: CastlingRight,
    pub rule50: i32,
    pub plies_from_null: i32,
    pub checks_given: [i32; 2],
    pub psq: Score,
    pub ep_square: Square,

    // Not copied when making a move (will be recomputed anyhow)
    pub key: Key,
    pub checkers_bb: Bitboard,
    pub captured_piece: Piece,
    pub captured_promoted: bool,
    // Non-pawn pieces removed by an atomic explosion, in king-ring bit
    // order around the destination square, plus the capturer itself.
    pub blast: [Piece; 8],
    pub blast_mover: Piece,
    pub blockers_for_king: [Bitboard; 2],
    pub pinners_for_king: [Bitboard; 2],
    pub check_squares: [Bitboard; 8],
    pub repetition: i32,
}

impl StateInfo {
    pub fn new() -> StateInfo {
        StateInfo {
            pawn_key: Key(0),
            material_key: Key(0),
            non_pawn_material: [Value::ZERO; 2],
            castling_rights: CastlingRight(0),
            rule50: 0,
            plies_from_null: 0,
            checks_given: [0; 2],
            psq: Score::ZERO,
            ep_square: Square::NONE,
            key: Key(0),
            checkers_bb: Bitboard(0),
            captured_piece: Piece::NO_PIECE,
            captured_promoted: false,
            blast: [Piece::NO_PIECE; 8],
            blast_mover: Piece::NO_PIECE,
            blockers_for_king: [Bitboard(0); 2],
            pinners_for_king: [Bitboard(0); 2],
            check_squares: [Bitboard(0); 8],
            repetition: 0,
        }
    }
}

impl Default for StateInfo {
    fn default() -> Self {
        StateInfo::new()
    }
}

pub struct Position {
    board: [Piece; 64],
    by_color_bb: [Bitboard; 2],
    by_type_bb: [Bitboard; 8],
    piece_count: [i32; 16],
    piece_list: [[Square; 64]; 16],
    index: [i32; 64],
    piece_count_in_hand: [[i32; 8]; 2],
    promoted: Bitboard,
    castling_rights_mask: [CastlingRight; 64],
    castling_rook_square: [Square; 16],
    castling_king_square: [Square; 2],
    castling_path: [Bitboard; 16],
    game_ply: i32,
    side_to_move: Color,
    states: Vec<StateInfo>,
    chess960: bool,
    variant: Variant,
    // Thread variables from here
    // only for main thread:
    pub failed_low: bool,
    pub best_move_changes: f64,
    pub previous_time_reduction: f64,
    pub previous_score: Value,
    pub calls_cnt: i32,
    // for all threads:
    pub thread_ctrl: Option<Arc<ThreadCtrl>>,
    pub is_main: bool,
    pub thread_idx: i16,
    pub pv_idx: usize,
    pub pv_last: usize,
    pub sel_depth: i32,
    pub nmp_ply: i32,
    pub nmp_odd: i32,
    pub nodes: u64,
    pub tb_hits: u64,
    pub completed_depth: Depth,
    pub root_moves: search::RootMoves,
    // thread-specific tables
    pub pawns_table: Vec<std::cell::UnsafeCell<pawns::Entry>>,
    pub material_table: Vec<std::cell::UnsafeCell<material::Entry>>,
    pub counter_moves: CounterMoveHistory,
    pub main_history: ButterflyHistory,
    pub capture_history: CapturePieceToHistory,
    pub cont_history: Box<ContinuationHistory>,
}

pub const PIECE_TO_CHAR: &str = " PNBRQK  pnbrqk";

impl Position {
    pub fn new() -> Position {
        Position {
            board: [Piece::NO_PIECE; 64],
            by_color_bb: [Bitboard(0); 2],
            by_type_bb: [Bitboard(0); 8],
            piece_count: [0; 16],
            piece_list: [[Square::NONE; 64]; 16],
            index: [0; 64],
            piece_count_in_hand: [[0; 8]; 2],
            promoted: Bitboard(0),
            castling_rights_mask: [CastlingRight(0); 64],
            castling_rook_square: [Square::NONE; 16],
            castling_king_square: [Square::NONE; 2],
            castling_path: [Bitboard(0); 16],
            game_ply: 0,
            side_to_move: Color::WHITE,
            states: Vec::new(),
            chess960: false,
            variant: Variant::Chess,
            failed_low: false,
            best_move_changes: 0.0,
            previous_time_reduction: 0.0,
            previous_score: Value::ZERO,
            calls_cnt: 0,
            thread_ctrl: None,
            is_main: false,
            thread_idx: 0,
            pv_idx: 0,
            pv_last: 0,
            sel_depth: 0,
            nmp_ply: 0,
            nmp_odd: 0,
            nodes: 0,
            tb_hits: 0,
            completed_depth: Depth::ZERO,
            root_moves: Vec::new(),
            pawns_table: Vec::new(),
            material_table: Vec::new(),
            counter_moves: unsafe { std::mem::zeroed() },
            main_history: unsafe { std::mem::zeroed() },
            capture_history: unsafe { std::mem::zeroed() },
            cont_history: ContinuationHistory::boxed(),
        }
    }

    pub fn init_states(&mut self) {
        self.states.truncate(0);
        self.states.push(StateInfo::new());
    }

    // The pawn and material hash tables are per thread; they are allocated
    // once the position is attached to its owning worker.
    pub fn alloc_tables(&mut self) {
        if self.pawns_table.is_empty() {
            self.pawns_table = (0..16384)
                .map(|_| std::cell::UnsafeCell::new(pawns::Entry::new()))
                .collect();
            self.material_table = (0..8192)
                .map(|_| std::cell::UnsafeCell::new(material::Entry::new()))
                .collect();
        }
    }

    #[inline(always)]
    fn st(&self) -> &StateInfo {
        self.states.last().unwrap()
    }

    #[inline(always)]
    fn st_mut(&mut self) -> &mut StateInfo {
        self.states.last_mut().unwrap()
    }

    #[inline(always)]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline(always)]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    #[inline(always)]
    pub fn is_house(&self) -> bool {
        self.variant.main() == Variant::Crazyhouse
    }

    #[inline(always)]
    pub fn is_anti(&self) -> bool {
        self.variant.main() == Variant::Anti
    }

    #[inline(always)]
    pub fn is_atomic(&self) -> bool {
        self.variant.main() == Variant::Atomic
    }

    #[inline(always)]
    pub fn is_extinction(&self) -> bool {
        self.variant.main() == Variant::Extinction
    }

    #[inline(always)]
    pub fn is_grid(&self) -> bool {
        self.variant.main() == Variant::Grid
    }

    #[inline(always)]
    pub fn is_horde(&self) -> bool {
        self.variant.main() == Variant::Horde
    }

    #[inline(always)]
    pub fn is_koth(&self) -> bool {
        self.variant.main() == Variant::Koth
    }

    #[inline(always)]
    pub fn is_losers(&self) -> bool {
        self.variant.main() == Variant::Losers
    }

    #[inline(always)]
    pub fn is_race(&self) -> bool {
        self.variant.main() == Variant::Race
    }

    #[inline(always)]
    pub fn is_three_check(&self) -> bool {
        self.variant.main() == Variant::ThreeCheck
    }

    #[inline(always)]
    pub fn is_two_kings(&self) -> bool {
        self.variant.main() == Variant::TwoKings
    }

    #[inline(always)]
    pub fn is_suicide(&self) -> bool {
        self.variant == Variant::Suicide
    }

    #[inline(always)]
    pub fn is_bughouse(&self) -> bool {
        self.variant == Variant::Bughouse
    }

    #[inline(always)]
    pub fn is_loop(&self) -> bool {
        self.variant == Variant::Loop
    }

    #[inline(always)]
    pub fn is_placement(&self) -> bool {
        self.variant == Variant::Placement
    }

    #[inline(always)]
    pub fn is_relay(&self) -> bool {
        self.variant == Variant::Relay
    }

    #[inline(always)]
    pub fn is_knight_relay(&self) -> bool {
        self.variant == Variant::KnightRelay
    }

    #[inline(always)]
    pub fn empty(&self, s: Square) -> bool {
        self.board[s.0 as usize] == Piece::NO_PIECE
    }

    #[inline(always)]
    pub fn piece_on(&self, s: Square) -> Piece {
        self.board[s.0 as usize]
    }

    #[inline(always)]
    pub fn moved_piece(&self, m: Move) -> Piece {
        if m.move_type() == MoveType::Drop {
            m.dropped_piece()
        } else {
            self.board[m.from().0 as usize]
        }
    }

    #[inline(always)]
    pub fn pieces(&self) -> Bitboard {
        self.by_type_bb[PieceType::ALL_PIECES.0 as usize]
    }

    #[inline(always)]
    pub fn pieces_p(&self, pt: PieceType) -> Bitboard {
        self.by_type_bb[pt.0 as usize]
    }

    #[inline(always)]
    pub fn pieces_pp(&self, pt1: PieceType, pt2: PieceType) -> Bitboard {
        self.pieces_p(pt1) | self.pieces_p(pt2)
    }

    #[inline(always)]
    pub fn pieces_c(&self, c: Color) -> Bitboard {
        self.by_color_bb[c.0 as usize]
    }

    #[inline(always)]
    pub fn pieces_cp(&self, c: Color, pt: PieceType) -> Bitboard {
        self.pieces_c(c) & self.pieces_p(pt)
    }

    #[inline(always)]
    pub fn pieces_cpp(&self, c: Color, pt1: PieceType, pt2: PieceType) -> Bitboard {
        self.pieces_c(c) & self.pieces_pp(pt1, pt2)
    }

    #[inline(always)]
    pub fn count(&self, c: Color, pt: PieceType) -> i32 {
        self.piece_count[Piece::make(c, pt).0 as usize]
    }

    #[inline(always)]
    pub fn count_all(&self, c: Color) -> i32 {
        self.piece_count[Piece::make(c, PieceType::ALL_PIECES).0 as usize]
    }

    #[inline(always)]
    pub fn squares(&self, c: Color, pt: PieceType) -> &[Square] {
        &self.piece_list[Piece::make(c, pt).0 as usize]
    }

    #[inline(always)]
    pub fn square_list(&self, c: Color, pt: PieceType) -> SquareList {
        SquareList::construct(self.squares(c, pt))
    }

    #[inline(always)]
    pub fn square(&self, c: Color, pt: PieceType) -> Square {
        self.squares(c, pt)[0]
    }

    // The king whose safety decides check in this variant. With two kings
    // on the board the lower square is the royal one.
    #[inline(always)]
    pub fn royal_king(&self, c: Color) -> Square {
        let kings = self.pieces_cp(c, PieceType::KING);
        if kings == 0 {
            Square::NONE
        } else {
            lsb(kings)
        }
    }

    #[inline(always)]
    pub fn count_in_hand(&self, c: Color, pt: PieceType) -> i32 {
        self.piece_count_in_hand[c.0 as usize][pt.0 as usize]
    }

    pub fn count_in_hand_all(&self, c: Color) -> i32 {
        (1..7)
            .map(|pt| self.piece_count_in_hand[c.0 as usize][pt])
            .sum()
    }

    fn add_to_hand(&mut self, c: Color, pt: PieceType) {
        self.piece_count_in_hand[c.0 as usize][pt.0 as usize] += 1;
    }

    fn remove_from_hand(&mut self, c: Color, pt: PieceType) {
        self.piece_count_in_hand[c.0 as usize][pt.0 as usize] -= 1;
        debug_assert!(self.piece_count_in_hand[c.0 as usize][pt.0 as usize] >= 0);
    }

    #[inline(always)]
    pub fn is_promoted(&self, s: Square) -> bool {
        self.promoted & s != 0
    }

    #[inline(always)]
    pub fn checks_given(&self, c: Color) -> i32 {
        self.st().checks_given[c.0 as usize]
    }

    #[inline(always)]
    pub fn checks_count(&self) -> i32 {
        self.st().checks_given[0] + self.st().checks_given[1]
    }

    #[inline(always)]
    pub fn ep_square(&self) -> Square {
        self.st().ep_square
    }

    #[inline(always)]
    pub fn has_castling_right(&self, cr: CastlingRight) -> bool {
        self.st().castling_rights & cr != 0
    }

    #[inline(always)]
    pub fn castling_rights(&self, c: Color) -> CastlingRight {
        self.st().castling_rights & CastlingRight(3 << (2 * c.0))
    }

    #[inline(always)]
    pub fn can_castle(&self, c: Color) -> bool {
        self.castling_rights(c) != 0
    }

    #[inline(always)]
    pub fn castling_impeded(&self, cr: CastlingRight) -> bool {
        self.pieces() & self.castling_path[cr.0 as usize] != Bitboard(0)
    }

    #[inline(always)]
    pub fn castling_rook_square(&self, cr: CastlingRight) -> Square {
        self.castling_rook_square[cr.0 as usize]
    }

    // The king that holds the castling rights. Relevant in variants where a
    // side may own several kings.
    #[inline(always)]
    pub fn castling_king_square(&self, c: Color) -> Square {
        self.castling_king_square[c.0 as usize]
    }

    #[inline(always)]
    pub fn attacks_from_pawn(&self, s: Square, c: Color) -> Bitboard {
        pawn_attacks(c, s)
    }

    pub fn attacks_from(&self, pt: PieceType, s: Square) -> Bitboard {
        debug_assert!(pt != PieceType::PAWN);
        match pt {
            PieceType::BISHOP | PieceType::ROOK => attacks_bb(pt, s, self.pieces()),
            PieceType::QUEEN => {
                self.attacks_from(PieceType::ROOK, s) | self.attacks_from(PieceType::BISHOP, s)
            }
            _ => pseudo_attacks(pt, s),
        }
    }

    // Attack set of the piece standing on 's', with the variant's attack
    // augmentations applied (grid cells, relayed powers).
    pub fn attacks_from_piece(&self, pc: Piece, s: Square) -> Bitboard {
        let mut b = if pc.piece_type() == PieceType::PAWN {
            pawn_attacks(pc.color(), s)
        } else {
            self.attacks_from(pc.piece_type(), s)
        };
        if self.is_grid() {
            b &= !grid_bb(self.variant.grid_layout(), s);
        } else if self.is_relay() {
            let defenders = self.attackers_to(s) & self.pieces_c(pc.color());
            if defenders & self.pieces_p(PieceType::KNIGHT) != 0 {
                b |= self.attacks_from(PieceType::KNIGHT, s);
            }
            if defenders & self.pieces_pp(PieceType::QUEEN, PieceType::BISHOP) != 0 {
                b |= self.attacks_from(PieceType::BISHOP, s);
            }
            if defenders & self.pieces_pp(PieceType::QUEEN, PieceType::ROOK) != 0 {
                b |= self.attacks_from(PieceType::ROOK, s);
            }
            if defenders & self.pieces_p(PieceType::KING) != 0 {
                b |= self.attacks_from(PieceType::KING, s);
            }
        } else if self.is_knight_relay()
            && pc.piece_type() != PieceType::KNIGHT
            && pc.piece_type() != PieceType::KING
            && pseudo_attacks(PieceType::KNIGHT, s) & self.pieces_cp(pc.color(), PieceType::KNIGHT)
                != 0
        {
            b |= pseudo_attacks(PieceType::KNIGHT, s);
        }
        b
    }

    // Attackers of 'c' color to square 's' relayed through a same-type
    // defender adjacent in movement terms. Used by the relay variants.
    fn relayed_attackers_to(
        &self,
        s: Square,
        c: Color,
        occ: Bitboard,
        pt_min: u32,
        pt_max: u32,
    ) -> Bitboard {
        let mut b = Bitboard(0);
        for pt in pt_min..=pt_max {
            let pt = PieceType(pt);
            let mut attackers = self.pieces_cp(c, pt);
            let relayers = if self.is_relay() {
                self.pieces_c(c) ^ self.pieces_cp(c, PieceType::PAWN)
            } else {
                self.pieces_cp(c, pt)
            };
            let relays = attacks_bb(pt, s, occ) & relayers;
            if relays == 0 {
                continue;
            }
            while attackers != 0 {
                let a = crate::bitboard::pop_lsb(&mut attackers);
                b |= attacks_bb(pt, a, occ) & relays;
            }
        }
        b
    }

    pub fn attackers_to_occ(&self, s: Square, occ: Bitboard) -> Bitboard {
        let base = (self.attacks_from_pawn(s, Color::BLACK)
            & self.pieces_cp(Color::WHITE, PieceType::PAWN))
            | (self.attacks_from_pawn(s, Color::WHITE)
                & self.pieces_cp(Color::BLACK, PieceType::PAWN))
            | (pseudo_attacks(PieceType::KNIGHT, s) & self.pieces_p(PieceType::KNIGHT))
            | (attacks_bb(PieceType::ROOK, s, occ)
                & self.pieces_pp(PieceType::ROOK, PieceType::QUEEN))
            | (attacks_bb(PieceType::BISHOP, s, occ)
                & self.pieces_pp(PieceType::BISHOP, PieceType::QUEEN))
            | (pseudo_attacks(PieceType::KING, s) & self.pieces_p(PieceType::KING));

        if self.is_grid() {
            return base & !grid_bb(self.variant.grid_layout(), s);
        }
        if self.is_knight_relay() {
            let mut b = base;
            if !self.empty(s) {
                b &= !(pseudo_attacks(PieceType::KNIGHT, s) & self.pieces_p(PieceType::KNIGHT));
            }
            for &c in &[Color::WHITE, Color::BLACK] {
                b |= self.relayed_attackers_to(s, c, occ, 2, 2);
            }
            return b & !self.pieces_p(PieceType::KNIGHT);
        }
        if self.is_relay() {
            let mut b = base;
            for &c in &[Color::WHITE, Color::BLACK] {
                b |= self.relayed_attackers_to(s, c, occ, 2, 6);
            }
            return b;
        }
        base
    }

    #[inline(always)]
    pub fn attackers_to(&self, s: Square) -> Bitboard {
        self.attackers_to_occ(s, self.by_type_bb[PieceType::ALL_PIECES.0 as usize])
    }

    fn slider_attackers_to(&self, s: Square, occ: Bitboard) -> Bitboard {
        (attacks_bb(PieceType::ROOK, s, occ) & self.pieces_pp(PieceType::ROOK, PieceType::QUEEN))
            | (attacks_bb(PieceType::BISHOP, s, occ)
                & self.pieces_pp(PieceType::BISHOP, PieceType::QUEEN))
    }

    #[inline(always)]
    pub fn checkers(&self) -> Bitboard {
        self.st().checkers_bb
    }

    #[inline(always)]
    pub fn blockers_for_king(&self, c: Color) -> Bitboard {
        self.st().blockers_for_king[c.0 as usize]
    }

    #[inline(always)]
    pub fn pinners_for_king(&self, c: Color) -> Bitboard {
        self.st().pinners_for_king[c.0 as usize]
    }

    #[inline(always)]
    pub fn check_squares(&self, pt: PieceType) -> Bitboard {
        self.st().check_squares[pt.0 as usize]
    }

    #[inline(always)]
    pub fn discovered_check_candidates(&self) -> Bitboard {
        self.blockers_for_king(!self.side_to_move) & self.pieces_c(self.side_to_move)
    }

    #[inline(always)]
    pub fn pawn_passed(&self, c: Color, s: Square) -> bool {
        if self.is_race() {
            return true;
        }
        if self.is_horde() && self.is_horde_color(c) {
            return self.pieces_cp(!c, PieceType::PAWN)
                & crate::bitboard::forward_file_bb(c, s)
                == 0;
        }
        self.pieces_cp(!c, PieceType::PAWN) & crate::bitboard::passed_pawn_mask(c, s) == 0
    }

    #[inline(always)]
    pub fn advanced_pawn_push(&self, m: Move) -> bool {
        if self.is_race() {
            return self.moved_piece(m).piece_type() == PieceType::KING
                && m.from().rank() > RANK_4;
        }
        m.move_type() != MoveType::Drop
            && self.moved_piece(m).piece_type() == PieceType::PAWN
            && m.from().relative_rank(self.side_to_move()) > RANK_4
    }

    #[inline(always)]
    pub fn key(&self) -> Key {
        self.st().key
    }

    #[inline(always)]
    pub fn pawn_key(&self) -> Key {
        self.st().pawn_key
    }

    #[inline(always)]
    pub fn material_key(&self) -> Key {
        self.st().material_key
    }

    #[inline(always)]
    pub fn psq_score(&self) -> Score {
        self.st().psq
    }

    #[inline(always)]
    pub fn non_pawn_material_c(&self, c: Color) -> Value {
        self.st().non_pawn_material[c.0 as usize]
    }

    #[inline(always)]
    pub fn non_pawn_material(&self) -> Value {
        self.non_pawn_material_c(Color::WHITE) + self.non_pawn_material_c(Color::BLACK)
    }

    #[inline(always)]
    pub fn game_ply(&self) -> i32 {
        self.game_ply
    }

    #[inline(always)]
    pub fn rule50_count(&self) -> i32 {
        self.st().rule50
    }

    #[inline(always)]
    pub fn plies_from_null(&self) -> i32 {
        self.st().plies_from_null
    }

    #[inline(always)]
    pub fn opposite_bishops(&self) -> bool {
        self.piece_count[Piece::W_BISHOP.0 as usize] == 1
            && self.piece_count[Piece::B_BISHOP.0 as usize] == 1
            && opposite_colors(
                self.square(Color::WHITE, PieceType::BISHOP),
                self.square(Color::BLACK, PieceType::BISHOP),
            )
    }

    #[inline(always)]
    pub fn is_chess960(&self) -> bool {
        self.chess960
    }

    pub fn capture_or_promotion(&self, m: Move) -> bool {
        debug_assert!(m.is_ok());
        if self.is_race() && m.move_type() == MoveType::Normal {
            let (from, to) = (m.from(), m.to());
            return (self.piece_on(from).piece_type() == PieceType::KING
                && to.rank() >= from.rank())
                || !self.empty(to);
        }
        match m.move_type() {
            MoveType::Normal => !self.empty(m.to()),
            MoveType::Castling | MoveType::Drop => false,
            _ => true,
        }
    }

    pub fn capture(&self, m: Move) -> bool {
        debug_assert!(m.is_ok());
        match m.move_type() {
            MoveType::Castling | MoveType::Drop => false,
            MoveType::EnPassant => true,
            _ => !self.empty(m.to()),
        }
    }

    #[inline(always)]
    pub fn captured_piece(&self) -> Piece {
        self.st().captured_piece
    }

    // Variant status helpers. "Win"/"loss" are from the point of view of the
    // side to move.

    #[inline(always)]
    pub fn is_horde_color(&self, c: Color) -> bool {
        self.piece_count[Piece::make(c, PieceType::KING).0 as usize] == 0
    }

    pub fn kings_adjacent(&self) -> bool {
        debug_assert!(self.is_atomic());
        let wk = self.pieces_cp(Color::WHITE, PieceType::KING);
        let bk = self.pieces_cp(Color::BLACK, PieceType::KING);
        if wk == 0 || bk == 0 {
            return false;
        }
        pseudo_attacks(PieceType::KING, lsb(wk)) & bk != 0
    }

    // Will the two kings stand next to each other once 'm' is played?
    pub fn kings_adjacent_after(&self, m: Move) -> bool {
        debug_assert!(self.is_atomic());
        let us = self.side_to_move;
        let them_king = self.pieces_cp(!us, PieceType::KING);
        if them_king == 0 {
            return false;
        }
        let ksq = if m.move_type() != MoveType::Drop
            && self.piece_on(m.from()).piece_type() == PieceType::KING
        {
            if m.move_type() == MoveType::Castling {
                relative_square(us, if m.to() > m.from() { Square::G1 } else { Square::C1 })
            } else {
                m.to()
            }
        } else {
            let our_king = self.pieces_cp(us, PieceType::KING);
            if our_king == 0 {
                return false;
            }
            lsb(our_king)
        };
        pseudo_attacks(PieceType::KING, ksq) & them_king != 0
    }

    pub fn is_atomic_win(&self) -> bool {
        self.count(!self.side_to_move, PieceType::KING) == 0
    }

    pub fn is_atomic_loss(&self) -> bool {
        self.count(self.side_to_move, PieceType::KING) == 0
    }

    pub fn is_anti_win(&self) -> bool {
        self.count_all(self.side_to_move) == 0
    }

    pub fn is_anti_loss(&self) -> bool {
        self.count_all(!self.side_to_move) == 0
    }

    pub fn is_losers_win(&self) -> bool {
        self.count_all(self.side_to_move) == 1
    }

    pub fn is_losers_loss(&self) -> bool {
        self.count_all(!self.side_to_move) == 1
    }

    pub fn is_horde_loss(&self) -> bool {
        let horde = if self.is_horde_color(Color::WHITE) {
            Color::WHITE
        } else {
            Color::BLACK
        };
        self.count_all(horde) == 0
    }

    pub fn is_koth_win(&self) -> bool {
        let ksq = self.square(self.side_to_move, PieceType::KING);
        (ksq.rank() == RANK_4 || ksq.rank() == RANK_5)
            && (ksq.file() == FILE_D || ksq.file() == FILE_E)
    }

    pub fn is_koth_loss(&self) -> bool {
        let ksq = self.square(!self.side_to_move, PieceType::KING);
        (ksq.rank() == RANK_4 || ksq.rank() == RANK_5)
            && (ksq.file() == FILE_D || ksq.file() == FILE_E)
    }

    pub fn koth_distance(&self, c: Color) -> i32 {
        use crate::bitboard::Distance;
        let ksq = self.square(c, PieceType::KING);
        ((Square::distance(ksq, Square::D4)
            + Square::distance(ksq, Square::E4)
            + Square::distance(ksq, Square::D5)
            + Square::distance(ksq, Square::E5))
            / 4) as i32
    }

    pub fn is_race_win(&self) -> bool {
        self.square(self.side_to_move, PieceType::KING).rank() == RANK_8
            && self.square(!self.side_to_move, PieceType::KING).rank() < RANK_8
    }

    pub fn is_race_draw(&self) -> bool {
        self.square(self.side_to_move, PieceType::KING).rank() == RANK_8
            && self.square(!self.side_to_move, PieceType::KING).rank() == RANK_8
    }

    // Black moves second, so when the white king has touched the eighth rank
    // black gets one move to join it.
    pub fn is_race_loss(&self) -> bool {
        let us = self.side_to_move;
        if self.square(!us, PieceType::KING).rank() != RANK_8 {
            return false;
        }
        if self.square(us, PieceType::KING).rank()
            < (if us == Color::WHITE { RANK_8 } else { RANK_7 })
        {
            return true;
        }
        let mut b = self.attacks_from(PieceType::KING, self.square(us, PieceType::KING))
            & rank_bb(RANK_8)
            & !self.pieces_c(us);
        while b != 0 {
            let s = crate::bitboard::pop_lsb(&mut b);
            if self.attackers_to(s) & self.pieces_c(!us) == 0 {
                return false;
            }
        }
        true
    }

    pub fn is_three_check_win(&self) -> bool {
        self.st().checks_given[self.side_to_move.0 as usize] == 3
    }

    pub fn is_three_check_loss(&self) -> bool {
        self.st().checks_given[(!self.side_to_move).0 as usize] == 3
    }

    pub fn is_extinction_loss(&self) -> bool {
        (1..7).any(|pt| self.count(self.side_to_move, PieceType(pt)) == 0)
    }

    pub fn is_extinction_win(&self) -> bool {
        (1..7).any(|pt| self.count(!self.side_to_move, PieceType(pt)) == 0)
    }

    // is_variant_end() reports whether the game is over for a reason other
    // than checkmate or stalemate.
    pub fn is_variant_end(&self) -> bool {
        match self.variant.main() {
            Variant::Atomic => self.is_atomic_win() || self.is_atomic_loss(),
            Variant::Anti => self.is_anti_win() || self.is_anti_loss(),
            Variant::Extinction => self.is_extinction_win() || self.is_extinction_loss(),
            Variant::Horde => self.is_horde_loss(),
            Variant::Koth => self.is_koth_win() || self.is_koth_loss(),
            Variant::Losers => self.is_losers_win() || self.is_losers_loss(),
            Variant::Race => {
                self.is_race_draw() || self.is_race_win() || self.is_race_loss()
            }
            Variant::ThreeCheck => self.is_three_check_win() || self.is_three_check_loss(),
            _ => false,
        }
    }

    // variant_result() returns the game value, relative to the side to move,
    // of a variant-terminal position.
    pub fn variant_result(&self, ply: i32, draw_value: Value) -> Option<Value> {
        match self.variant.main() {
            Variant::Atomic => {
                if self.is_atomic_loss() {
                    Some(mated_in(ply))
                } else if self.is_atomic_win() {
                    Some(mate_in(ply))
                } else {
                    None
                }
            }
            Variant::Anti => {
                if self.is_anti_win() {
                    Some(mate_in(ply))
                } else if self.is_anti_loss() {
                    Some(mated_in(ply))
                } else {
                    None
                }
            }
            Variant::Extinction => {
                if self.is_extinction_loss() {
                    Some(mated_in(ply))
                } else if self.is_extinction_win() {
                    Some(mate_in(ply))
                } else {
                    None
                }
            }
            Variant::Horde => {
                if self.is_horde_loss() {
                    let horde = if self.is_horde_color(Color::WHITE) {
                        Color::WHITE
                    } else {
                        Color::BLACK
                    };
                    Some(if horde == self.side_to_move {
                        mated_in(ply)
                    } else {
                        mate_in(ply)
                    })
                } else {
                    None
                }
            }
            Variant::Koth => {
                if self.is_koth_win() {
                    Some(mate_in(ply))
                } else if self.is_koth_loss() {
                    Some(mated_in(ply))
                } else {
                    None
                }
            }
            Variant::Losers => {
                if self.is_losers_win() {
                    Some(mate_in(ply))
                } else if self.is_losers_loss() {
                    Some(mated_in(ply))
                } else {
                    None
                }
            }
            Variant::Race => {
                if self.is_race_draw() {
                    Some(draw_value)
                } else if self.is_race_win() {
                    Some(mate_in(ply))
                } else if self.is_race_loss() {
                    Some(mated_in(ply))
                } else {
                    None
                }
            }
            Variant::ThreeCheck => {
                if self.is_three_check_win() {
                    Some(mate_in(ply))
                } else if self.is_three_check_loss() {
                    Some(mated_in(ply))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    // The value of a stalemate, relative to the stalemated side to move.
    pub fn stalemate_value(&self, ply: i32, draw_value: Value) -> Value {
        if self.is_anti() {
            if self.is_suicide() {
                let balance = popcount(self.pieces_c(self.side_to_move)) as i32
                    - popcount(self.pieces_c(!self.side_to_move)) as i32;
                if balance > 0 {
                    return mated_in(ply);
                }
                if balance < 0 {
                    return mate_in(ply + 1);
                }
                return draw_value;
            }
            return mate_in(ply);
        }
        if self.is_losers() {
            return mated_in(ply);
        }
        draw_value
    }

    // can_capture() tests whether the side to move has any capture at all,
    // which in antichess forces the capture.
    pub fn can_capture(&self) -> bool {
        if self.ep_square() != Square::NONE
            && self.attackers_to(self.ep_square())
                & self.pieces_cp(self.side_to_move, PieceType::PAWN)
                != 0
        {
            return true;
        }
        let mut b = self.pieces_c(self.side_to_move);
        while b != 0 {
            let s = crate::bitboard::pop_lsb(&mut b);
            if self.attacks_from_piece(self.piece_on(s), s) & self.pieces_c(!self.side_to_move)
                != 0
            {
                return true;
            }
        }
        false
    }

    // can_capture_losers() tests whether the side to move has a legal
    // capture in a losers position, where pins and checks still apply.
    pub fn can_capture_losers(&self) -> bool {
        let us = self.side_to_move;
        if self.ep_square() != Square::NONE
            && self.checkers() == 0
            && self.attackers_to(self.ep_square())
                & self.pieces_cp(us, PieceType::PAWN)
                & !(self.blockers_for_king(us) & self.pieces_c(us))
                != 0
        {
            return true;
        }
        let mut b = self.pieces_c(us);
        if more_than_one(self.checkers()) {
            b &= self.pieces_cp(us, PieceType::KING);
        }
        while b != 0 {
            let s = crate::bitboard::pop_lsb(&mut b);
            let mut attacked =
                self.attacks_from_piece(self.piece_on(s), s) & self.pieces_c(!us);
            if self.blockers_for_king(us) & self.pieces_c(us) & s != 0 {
                attacked &= crate::bitboard::line_bb(s, self.square(us, PieceType::KING));
            }
            if self.piece_on(s).piece_type() == PieceType::KING {
                while attacked != 0 {
                    let t = crate::bitboard::pop_lsb(&mut attacked);
                    if self.attackers_to(t) & self.pieces_c(!us) == 0 {
                        return true;
                    }
                }
            } else if self.checkers() != 0 {
                if attacked & self.checkers() != 0 {
                    return true;
                }
            } else if attacked != 0 {
                return true;
            }
        }
        false
    }

    // set() initializes the position object for the given FEN string and
    // variant. The caller keeps the previous position if parsing fails.
    pub fn set(
        &mut self,
        fen_str: &str,
        is_chess960: bool,
        v: Variant,
    ) -> Result<(), FenError> {
        self.by_color_bb.iter_mut().for_each(|bb| *bb = Bitboard(0));
        self.by_type_bb.iter_mut().for_each(|bb| *bb = Bitboard(0));
        self.piece_count.iter_mut().for_each(|pc| *pc = 0);
        self.piece_count_in_hand = [[0; 8]; 2];
        self.promoted = Bitboard(0);
        self.castling_path
            .iter_mut()
            .for_each(|cp| *cp = Bitboard(0));
        self.castling_rook_square
            .iter_mut()
            .for_each(|cr| *cr = Square::NONE);
        self.castling_king_square = [Square::NONE; 2];
        self.board.iter_mut().for_each(|b| *b = Piece::NO_PIECE);
        self.castling_rights_mask
            .iter_mut()
            .for_each(|crm| *crm = CastlingRight(0));
        self.piece_list
            .iter_mut()
            .for_each(|pl| pl.iter_mut().for_each(|p| *p = Square::NONE));
        self.variant = v;
        self.init_states();

        let mut iter = fen_str.split_whitespace();

        // 1. Piece placement, with an optional bracketed hand and '~'
        // promotion marks in the crazyhouse family.
        let pieces = iter.next().ok_or(FenError::InvalidPiecePlacement)?;
        let mut sq = Square::A8;
        let mut chars = pieces.chars().peekable();
        while let Some(c) = chars.next() {
            if let Some(d) = c.to_digit(10) {
                if d < 1 || d > 8 {
                    return Err(FenError::InvalidPiecePlacement);
                }
                sq += (d as i32) * Direction::EAST;
            } else if c == '/' {
                sq += 2 * Direction::SOUTH;
                // Stepping below the first rank wraps the square index;
                // lichess-style FENs put the hand there as an extra rank.
                if self.is_house() && !sq.is_ok() {
                    // Lichess-style FENs append the hand as an extra rank.
                    for h in chars.by_ref() {
                        if let Some(idx) = PIECE_TO_CHAR.find(h) {
                            let pc = Piece(idx as u32);
                            self.add_to_hand(pc.color(), pc.piece_type());
                        } else {
                            return Err(FenError::InvalidHand);
                        }
                    }
                    break;
                }
            } else if c == '~' {
                let prev = sq - Direction::EAST;
                if !prev.is_ok() {
                    return Err(FenError::InvalidPiecePlacement);
                }
                if self.is_house() && !self.is_loop() {
                    self.promoted |= prev;
                }
            } else if c == '[' {
                if !self.is_house() {
                    return Err(FenError::InvalidPiecePlacement);
                }
                for h in chars.by_ref() {
                    if h == ']' {
                        break;
                    }
                    if let Some(idx) = PIECE_TO_CHAR.find(h) {
                        let pc = Piece(idx as u32);
                        self.add_to_hand(pc.color(), pc.piece_type());
                    } else {
                        return Err(FenError::InvalidHand);
                    }
                }
                break;
            } else if let Some(idx) = PIECE_TO_CHAR.find(c) {
                if !sq.is_ok() {
                    return Err(FenError::InvalidPiecePlacement);
                }
                self.put_piece(Piece(idx as u32), sq);
                sq += Direction::EAST;
            } else {
                return Err(FenError::InvalidPiecePlacement);
            }
        }

        // Each side needs its royal material before the rest of the record
        // can make sense.
        if !self.variant.king_is_ordinary() && !self.is_placement() {
            if self.count(Color::WHITE, PieceType::KING) == 0
                || self.count(Color::BLACK, PieceType::KING) == 0
            {
                return Err(FenError::InvalidPiecePlacement);
            }
        }
        if !self.is_horde()
            && self.pieces_p(PieceType::PAWN) & (Bitboard::RANK1_BB | Bitboard::RANK8_BB) != 0
        {
            return Err(FenError::InvalidPiecePlacement);
        }

        // 2. Active color
        self.side_to_move = match iter.next() {
            Some("w") => Color::WHITE,
            Some("b") => Color::BLACK,
            _ => return Err(FenError::InvalidSideToMove),
        };

        // 3. Castling availability: KQkq, Shredder-FEN file letters or '-'.
        let castling = iter.next().ok_or(FenError::InvalidCastling)?;
        if castling != "-" {
            for c in castling.chars() {
                let color = if c.is_lowercase() {
                    Color::BLACK
                } else {
                    Color::WHITE
                };
                if self.is_horde() && self.is_horde_color(color) {
                    continue;
                }
                if self.is_placement() && self.count_in_hand(color, PieceType::KING) > 0 {
                    continue;
                }
                if self.count(color, PieceType::KING) == 0 {
                    continue;
                }
                let rank = relative_rank(color, RANK_1);
                // With more than one king the first one on the back rank
                // holds the rights.
                let mut ksq = Square::NONE;
                for s in self.square_list(color, PieceType::KING) {
                    if s.rank() == rank {
                        ksq = s;
                        break;
                    }
                }
                if ksq == Square::NONE {
                    continue;
                }
                let rook = Piece::make(color, PieceType::ROOK);
                let side = c.to_ascii_uppercase();
                let rsq = match side {
                    'K' => {
                        let mut s = Square::H1.relative(color);
                        while s != ksq && self.piece_on(s) != rook {
                            s += Direction::WEST;
                        }
                        s
                    }
                    'Q' => {
                        let mut s = Square::A1.relative(color);
                        while s != ksq && self.piece_on(s) != rook {
                            s += Direction::EAST;
                        }
                        s
                    }
                    'A'..='H' => Square::make(side as u32 - 'A' as u32, rank),
                    _ => return Err(FenError::InvalidCastling),
                };
                if rsq != ksq && self.piece_on(rsq) == rook {
                    self.set_castling_right(color, ksq, rsq);
                }
            }
        }

        // 4. En passant square
        let enpassant = iter.next().ok_or(FenError::InvalidEnPassant)?;
        self.st_mut().ep_square = Square::NONE;
        if enpassant != "-" {
            let mut ep = enpassant.chars();
            let file = match ep.next() {
                Some(c @ 'a'..='h') => c as u32 - 'a' as u32,
                _ => return Err(FenError::InvalidEnPassant),
            };
            let rank = match ep.next() {
                Some('6') if self.side_to_move == Color::WHITE => RANK_6,
                Some('3') if self.side_to_move == Color::BLACK => RANK_3,
                _ => return Err(FenError::InvalidEnPassant),
            };
            let ep_sq = Square::make(file, rank);
            let us = self.side_to_move;
            let mut ok = pawn_attacks(!us, ep_sq) & self.pieces_cp(us, PieceType::PAWN) != 0
                && self.pieces_cp(!us, PieceType::PAWN) & (ep_sq + pawn_push(!us)) != 0
                && self.pieces() & (ep_sq.bb() | (ep_sq + pawn_push(us)).bb()) == 0;
            if self.is_atomic()
                && ok
                && self.count(us, PieceType::KING) > 0
                && pseudo_attacks(PieceType::KING, ep_sq)
                    & self.pieces_cp(us, PieceType::KING)
                    != 0
            {
                ok = false;
            }
            if ok {
                self.st_mut().ep_square = ep_sq;
            }
        }

        // Remaining-checks field, lichess style "3+3", before the counters.
        self.st_mut().checks_given = [0; 2];
        let mut next = iter.next();
        if self.is_three_check() {
            if let Some(tok) = next {
                if let Some((w, b)) = parse_checks_field(tok) {
                    self.st_mut().checks_given = [w, b];
                    next = iter.next();
                }
            }
        }

        // 5-6. Halfmove clock and fullmove number
        self.st_mut().rule50 = match next {
            Some(tok) => tok.parse().map_err(|_| FenError::InvalidCounter)?,
            None => 0,
        };
        let mut fullmove = 1;
        if let Some(tok) = iter.next() {
            fullmove = tok.parse::<i32>().map_err(|_| FenError::InvalidCounter)?;
        }
        self.game_ply = std::cmp::max(2 * (fullmove - 1), 0);
        if self.side_to_move == Color::BLACK {
            self.game_ply += 1;
        }

        // Trailing "+W+B" remaining-checks field.
        if self.is_three_check() {
            if let Some(tok) = iter.next() {
                match parse_checks_field(tok) {
                    Some((w, b)) => self.st_mut().checks_given = [w, b],
                    None => return Err(FenError::InvalidCheckCount),
                }
            }
        }

        self.chess960 = is_chess960;
        self.set_state();
        debug_assert!(self.is_ok());
        Ok(())
    }

    // set_castling_right() is a helper function used to set castling rights
    // given the corresponding color and the king and rook starting squares.
    fn set_castling_right(&mut self, c: Color, kfrom: Square, rfrom: Square) {
        let cs = if kfrom < rfrom {
            CastlingSide::King
        } else {
            CastlingSide::Queen
        };
        let cr = c | cs;

        self.st_mut().castling_rights |= cr;
        self.castling_rights_mask[kfrom.0 as usize] |= cr;
        self.castling_rights_mask[rfrom.0 as usize] |= cr;
        self.castling_rook_square[cr.0 as usize] = rfrom;
        self.castling_king_square[c.0 as usize] = kfrom;

        let kto = relative_square(
            c,
            if cs == CastlingSide::King {
                Square::G1
            } else {
                Square::C1
            },
        );
        let rto = relative_square(
            c,
            if cs == CastlingSide::King {
                Square::F1
            } else {
                Square::D1
            },
        );

        let mut s = std::cmp::min(rfrom, rto);
        while s <= std::cmp::max(rfrom, rto) {
            if s != kfrom && s != rfrom {
                self.castling_path[cr.0 as usize] |= s;
            }
            s += Direction::EAST;
        }

        let mut s = std::cmp::min(kfrom, kto);
        while s <= std::cmp::max(kfrom, kto) {
            if s != kfrom && s != rfrom {
                self.castling_path[cr.0 as usize] |= s;
            }
            s += Direction::EAST;
        }
    }

    // set_check_info() sets king attacks to detect if a move gives check
    fn set_check_info(&mut self) {
        let no_pins = self.is_anti()
            || self.is_extinction()
            || (self.is_atomic()
                && (self.count(self.side_to_move, PieceType::KING) == 0
                    || self.kings_adjacent()))
            || (self.is_placement()
                && (self.count_in_hand(Color::WHITE, PieceType::KING) > 0
                    || self.count_in_hand(Color::BLACK, PieceType::KING) > 0));

        if no_pins {
            self.st_mut().blockers_for_king = [Bitboard(0); 2];
            self.st_mut().pinners_for_king = [Bitboard(0); 2];
        } else {
            for &c in &[Color::WHITE, Color::BLACK] {
                if self.count(c, PieceType::KING) == 0 {
                    self.st_mut().blockers_for_king[c.0 as usize] = Bitboard(0);
                    self.st_mut().pinners_for_king[c.0 as usize] = Bitboard(0);
                    continue;
                }
                let mut sliders = self.pieces_c(!c);
                let ksq = self.royal_king(c);
                if self.is_grid() {
                    sliders &= !grid_bb(self.variant.grid_layout(), ksq);
                }
                let mut pinners = Bitboard(0);
                let blockers = self.slider_blockers(sliders, ksq, &mut pinners);
                self.st_mut().blockers_for_king[c.0 as usize] = blockers;
                self.st_mut().pinners_for_king[c.0 as usize] = pinners;
            }
        }

        let them = !self.side_to_move;
        let no_checks = self.is_anti()
            || self.is_extinction()
            || (self.is_horde() && self.is_horde_color(them))
            || (self.is_placement()
                && (self.count_in_hand(Color::WHITE, PieceType::KING) > 0
                    || self.count_in_hand(Color::BLACK, PieceType::KING) > 0))
            || self.count(them, PieceType::KING) == 0;

        if no_checks {
            self.st_mut().check_squares = [Bitboard(0); 8];
            return;
        }

        let ksq = self.royal_king(them);
        let occ = self.pieces();

        self.st_mut().check_squares[PieceType::PAWN.0 as usize] = pawn_attacks(them, ksq);
        self.st_mut().check_squares[PieceType::KNIGHT.0 as usize] =
            pseudo_attacks(PieceType::KNIGHT, ksq);
        self.st_mut().check_squares[PieceType::BISHOP.0 as usize] =
            attacks_bb(PieceType::BISHOP, ksq, occ);
        self.st_mut().check_squares[PieceType::ROOK.0 as usize] =
            attacks_bb(PieceType::ROOK, ksq, occ);
        self.st_mut().check_squares[PieceType::QUEEN.0 as usize] = self.st().check_squares
            [PieceType::BISHOP.0 as usize]
            | self.st().check_squares[PieceType::ROOK.0 as usize];
        self.st_mut().check_squares[PieceType::KING.0 as usize] = if self.is_two_kings() {
            pseudo_attacks(PieceType::KING, ksq)
        } else {
            Bitboard(0)
        };

        if self.is_grid() {
            let mask = !grid_bb(self.variant.grid_layout(), ksq);
            for pt in 1..7 {
                self.st_mut().check_squares[pt] &= mask;
            }
        }

        if self.is_knight_relay() {
            let relayed = self.st().check_squares[PieceType::KNIGHT.0 as usize]
                & (self.pieces_c(self.side_to_move)
                    ^ self.pieces_cp(self.side_to_move, PieceType::PAWN));
            for s in relayed {
                self.st_mut().check_squares[PieceType::KNIGHT.0 as usize] |=
                    pseudo_attacks(PieceType::KNIGHT, s);
            }
        }
        if self.is_relay() {
            for pt in 2..7 {
                let relayed = self.st().check_squares[pt]
                    & (self.pieces_c(self.side_to_move)
                        ^ self.pieces_cp(self.side_to_move, PieceType::PAWN));
                for s in relayed {
                    self.st_mut().check_squares[pt] |=
                        attacks_bb(PieceType(pt as u32), s, Bitboard(0));
                }
            }
        }
    }

    // Checkers of the current side to move under the variant's check rules.
    fn compute_checkers(&self) -> Bitboard {
        let us = self.side_to_move;
        if self.is_anti()
            || self.is_extinction()
            || (self.is_horde() && self.is_horde_color(us))
            || (self.is_atomic()
                && (self.count(us, PieceType::KING) == 0 || self.kings_adjacent()))
            || (self.is_placement() && self.count_in_hand(us, PieceType::KING) > 0)
            || self.count(us, PieceType::KING) == 0
        {
            return Bitboard(0);
        }
        self.attackers_to(self.royal_king(us)) & self.pieces_c(!us)
    }

    // set_state() computes the hash keys of the position, and other data
    // that once computed is updated incrementally as moves are made. The
    // function is used only when a new position is set up, and to verify
    // the correctness of the StateInfo data when running in debug mode.
    fn set_state(&mut self) {
        self.st_mut().key = zobrist::variant(self.variant);
        self.st_mut().material_key = zobrist::variant(self.variant);
        self.st_mut().pawn_key = zobrist::no_pawns();
        self.st_mut().non_pawn_material = [Value::ZERO; 2];
        self.st_mut().psq = Score::ZERO;
        self.st_mut().repetition = 0;

        self.set_check_info();
        self.st_mut().checkers_bb = self.compute_checkers();

        for s in self.pieces() {
            let pc = self.piece_on(s);
            let tmp = zobrist::psq(pc, s);
            self.st_mut().key ^= tmp;
            let tmp = psqt::psq(self.variant, pc, s);
            self.st_mut().psq += tmp;

            if pc.piece_type() == PieceType::PAWN {
                let tmp = zobrist::psq(pc, s);
                self.st_mut().pawn_key ^= tmp;
            } else if pc.piece_type() != PieceType::KING {
                let tmp = piece_value(MG, pc);
                self.st_mut().non_pawn_material[pc.color().0 as usize] += tmp;
            }
        }

        if self.st().ep_square != Square::NONE {
            let tmp = zobrist::enpassant(self.st().ep_square.file());
            self.st_mut().key ^= tmp;
        }

        if self.side_to_move == Color::BLACK {
            self.st_mut().key ^= zobrist::side();
        }

        {
            let tmp = zobrist::castling(self.st().castling_rights);
            self.st_mut().key ^= tmp;
        }

        for c in 0..2 {
            for pt in 1..7 {
                let pc = Piece::make(Color(c), PieceType(pt));
                for cnt in 0..self.count(Color(c), PieceType(pt)) {
                    let tmp = zobrist::material(pc, cnt);
                    self.st_mut().material_key ^= tmp;
                }

                if self.is_house() {
                    let held = self.count_in_hand(Color(c), PieceType(pt));
                    if pt != 1 && pt != 6 {
                        let tmp = held * piece_value(MG, pc);
                        self.st_mut().non_pawn_material[c as usize] += tmp;
                    }
                    let tmp = zobrist::in_hand(pc, held);
                    self.st_mut().key ^= tmp;
                    self.st_mut().material_key ^= tmp;
                }
            }
        }

        if self.is_three_check() {
            for c in 0..2 {
                let tmp = zobrist::checks(Color(c), self.st().checks_given[c as usize]);
                self.st_mut().key ^= tmp;
            }
        }
    }

    // fen() returns a FEN representation of the position. In case of
    // Chess960 the Shredder-FEN notation is used.
    pub fn fen(&self) -> String {
        let mut ss = String::new();

        for r in (0..8).rev() {
            let mut f = 0;
            while f < 8 {
                let mut empty_cnt = 0u8;
                while f < 8 && self.empty(Square::make(f, r)) {
                    empty_cnt += 1;
                    f += 1;
                }
                if empty_cnt > 0 {
                    ss.push((b'0' + empty_cnt) as char);
                }
                if f < 8 {
                    let sq = Square::make(f, r);
                    let c = PIECE_TO_CHAR
                        .chars()
                        .nth(self.piece_on(sq).0 as usize)
                        .unwrap();
                    ss.push(c);
                    if self.is_house() && self.is_promoted(sq) {
                        ss.push('~');
                    }
                    f += 1;
                }
            }
            if r > 0 {
                ss.push('/');
            }
        }

        if self.is_house() {
            ss.push('[');
            for &c in &[Color::WHITE, Color::BLACK] {
                let top = if self.is_placement() { 6 } else { 5 };
                for pt in (1..=top).rev() {
                    let pc = Piece::make(c, PieceType(pt));
                    let ch = PIECE_TO_CHAR.chars().nth(pc.0 as usize).unwrap();
                    for _ in 0..self.count_in_hand(c, PieceType(pt)) {
                        ss.push(ch);
                    }
                }
            }
            ss.push(']');
        }

        ss.push_str(match self.side_to_move {
            Color::WHITE => " w ",
            _ => " b ",
        });

        self.castle_helper(&mut ss, CastlingRight::WHITE_OO, 'K');
        self.castle_helper(&mut ss, CastlingRight::WHITE_OOO, 'Q');
        self.castle_helper(&mut ss, CastlingRight::BLACK_OO, 'k');
        self.castle_helper(&mut ss, CastlingRight::BLACK_OOO, 'q');

        if !self.has_castling_right(CastlingRight::ANY_CASTLING) {
            ss.push('-');
        }

        match self.ep_square() {
            Square::NONE => ss.push_str(" - "),
            square => {
                ss.push(' ');
                ss.push_str(&crate::uci::square(square));
                ss.push(' ');
            }
        }

        ss.push_str(&self.rule50_count().to_string());
        ss.push(' ');
        ss.push_str(&(1 + (self.game_ply - i32::from(self.side_to_move == Color::BLACK)) / 2)
            .to_string());

        if self.is_three_check() {
            ss.push_str(&format!(
                " +{}+{}",
                3 - self.st().checks_given[0],
                3 - self.st().checks_given[1]
            ));
        }

        ss
    }

    fn castle_helper(&self, ss: &mut String, cr: CastlingRight, c: char) {
        if !self.has_castling_right(cr) {
            return;
        }

        if !self.chess960 {
            ss.push(c);
        } else {
            let castling_rook_square = self.castling_rook_square(cr);
            let f = castling_rook_square.file();
            let r = castling_rook_square.rank();
            let mut c = 65 + f;
            if r == RANK_8 {
                c += 32;
            }
            ss.push(char::from(c as u8));
        }
    }

    // slider_blockers() returns a bitboard of all the pieces (both colors)
    // that are blocking attacks on the square 's' from 'sliders'. A piece
    // blocks a slider if removing that piece from the board would result
    // in a position where square 's' is attacked. For example, a king attack
    // blocking piece can be either a pinned or a discovered check piece,
    // depending on whether its color is the opposite of or the same as the
    // color of the slider.
    pub fn slider_blockers(
        &self,
        sliders: Bitboard,
        s: Square,
        pinners: &mut Bitboard,
    ) -> Bitboard {
        let mut blockers = Bitboard(0);
        *pinners = Bitboard(0);

        // Snipers are sliders that attack 's' when a piece is removed
        let snipers = ((pseudo_attacks(PieceType::ROOK, s)
            & self.pieces_pp(PieceType::QUEEN, PieceType::ROOK))
            | (pseudo_attacks(PieceType::BISHOP, s)
                & self.pieces_pp(PieceType::QUEEN, PieceType::BISHOP)))
            & sliders;

        for sniper_sq in snipers {
            let b = between_bb(s, sniper_sq) & self.pieces();

            if b != 0 && !more_than_one(b) {
                blockers |= b;
                if b & self.pieces_c(self.piece_on(s).color()) != 0 {
                    *pinners |= sniper_sq;
                }
            }
        }
        blockers
    }

    // legal() tests whether a pseudo-legal move is legal
    pub fn legal(&self, m: Move) -> bool {
        debug_assert!(m.is_ok());

        let us = self.side_to_move;

        // If a player can capture, that player must capture. The move
        // generator enforces this, everything it emits is legal.
        if self.is_anti() {
            return true;
        }
        if self.is_extinction() {
            return true;
        }

        if m.move_type() == MoveType::Drop {
            if self.is_placement() {
                let to = m.to();
                let mut b = !self.pieces() & rank_bb(relative_rank(us, RANK_1));
                if m.dropped_piece().piece_type() == PieceType::BISHOP {
                    if self.pieces_cp(us, PieceType::BISHOP) & Bitboard::DARK_SQUARES != 0 {
                        b &= !Bitboard::DARK_SQUARES;
                    }
                    if self.pieces_cp(us, PieceType::BISHOP) & !Bitboard::DARK_SQUARES != 0 {
                        b &= Bitboard::DARK_SQUARES;
                    }
                } else if self.count_in_hand(us, PieceType::BISHOP) > 0 {
                    if self.pieces_cp(us, PieceType::BISHOP) & Bitboard::DARK_SQUARES == 0
                        && !more_than_one(b & Bitboard::DARK_SQUARES)
                    {
                        b &= !Bitboard::DARK_SQUARES;
                    }
                    if self.pieces_cp(us, PieceType::BISHOP) & !Bitboard::DARK_SQUARES == 0
                        && !more_than_one(b & !Bitboard::DARK_SQUARES)
                    {
                        b &= Bitboard::DARK_SQUARES;
                    }
                }
                if b & to == 0 {
                    return false;
                }
            }
            return self.pseudo_legal(m);
        }

        if self.is_placement() && self.count_in_hand_all(us) > 0 {
            return false;
        }

        let from = m.from();

        // Moves may not stay within a grid cell.
        if self.is_grid() && grid_bb(self.variant.grid_layout(), from) & m.to() != 0 {
            return false;
        }

        // Pseudo-illegal moves slip through the variant generators more
        // easily than through the orthodox ones.
        if self.variant != Variant::Chess
            && m.move_type() == MoveType::Normal
            && !self.pseudo_legal(m)
        {
            return false;
        }

        // Checking moves are forbidden in racing kings.
        if self.is_race() && self.gives_check(m) {
            return false;
        }

        // All pseudo-legal moves by the horde are legal.
        if self.is_horde() && self.is_horde_color(us) {
            return true;
        }

        // Atomic normal, en passant and promotion moves. The blast resolves
        // checks by itself when it removes the checking pieces or the enemy
        // king, and adjacent kings shield each other.
        if self.is_atomic() && m.move_type() != MoveType::Castling {
            if self.kings_adjacent_after(m) {
                return true;
            }
            if self.capture(m) {
                let to = m.to();
                let capsq = if m.move_type() == MoveType::EnPassant {
                    Square::make(to.file(), from.rank())
                } else {
                    to
                };
                let blast =
                    pseudo_attacks(PieceType::KING, to) & (self.pieces() ^ self.pieces_p(PieceType::PAWN));
                if blast & self.pieces_cp(!us, PieceType::KING) != 0 {
                    return true;
                }
                let b = self.pieces() ^ (blast | capsq.bb() | from.bb());
                let ksq = self.square(us, PieceType::KING);

                if self.checkers() & b != 0 {
                    return false;
                }
                if (attacks_bb(PieceType::ROOK, ksq, b)
                    & self.pieces_cpp(!us, PieceType::QUEEN, PieceType::ROOK)
                    & b)
                    != 0
                    || (attacks_bb(PieceType::BISHOP, ksq, b)
                        & self.pieces_cpp(!us, PieceType::QUEEN, PieceType::BISHOP)
                        & b)
                        != 0
                {
                    return false;
                }
                return true;
            }
        }

        // En passant captures are a tricky special case. Because they are
        // uncommon, we do it simply by testing whether the king is attacked
        // after the move is made.
        if m.move_type() == MoveType::EnPassant {
            if self.is_knight_relay() {
                return false;
            }
            let ksq = self.square(us, PieceType::KING);
            let to = m.to();
            let capsq = to - pawn_push(us);
            let occupied = (self.pieces() ^ from ^ capsq) | to;

            debug_assert!(to == self.ep_square());
            debug_assert!(self.moved_piece(m) == Piece::make(us, PieceType::PAWN));
            debug_assert!(self.piece_on(capsq) == Piece::make(!us, PieceType::PAWN));
            debug_assert!(self.piece_on(to) == Piece::NO_PIECE);

            if self.is_grid() {
                let mask = !grid_bb(self.variant.grid_layout(), ksq);
                return attacks_bb(PieceType::ROOK, ksq, occupied)
                    & self.pieces_cpp(!us, PieceType::QUEEN, PieceType::ROOK)
                    & mask
                    == 0
                    && attacks_bb(PieceType::BISHOP, ksq, occupied)
                        & self.pieces_cpp(!us, PieceType::QUEEN, PieceType::BISHOP)
                        & mask
                        == 0;
            }
            if self.is_relay()
                && self.relayed_attackers_to(ksq, !us, occupied, 3, 5) != 0
            {
                return false;
            }

            return attacks_bb(PieceType::ROOK, ksq, occupied)
                & self.pieces_cpp(!us, PieceType::QUEEN, PieceType::ROOK)
                == 0
                && attacks_bb(PieceType::BISHOP, ksq, occupied)
                    & self.pieces_cpp(!us, PieceType::QUEEN, PieceType::BISHOP)
                    == 0;
        }

        // Castling moves generation does not check if the castling path is
        // clear of enemy attacks, it is delayed to here.
        if m.move_type() == MoveType::Castling {
            let to = relative_square(us, if m.to() > from { Square::G1 } else { Square::C1 });
            let step = if m.to() > from {
                Direction::WEST
            } else {
                Direction::EAST
            };

            let mut s = to;
            while s != from {
                if self.is_atomic() {
                    // The atomic king may castle through check if the kings
                    // end up adjacent, and a FICS-style early rook move may
                    // block a check on the way.
                    let occupied = if s == to {
                        self.pieces()
                    } else {
                        self.pieces() ^ from
                    };
                    if self.count(!us, PieceType::KING) > 0
                        && pseudo_attacks(
                            PieceType::KING,
                            self.square(!us, PieceType::KING),
                        ) & s
                            == 0
                        && self.attackers_to_occ(s, occupied) & self.pieces_c(!us) != 0
                    {
                        return false;
                    }
                } else if self.attackers_to(s) & self.pieces_c(!us) != 0 {
                    return false;
                }
                s += step;
            }

            if self.is_two_kings() {
                let kings = self.pieces_cp(us, PieceType::KING) ^ from ^ to;
                let ksq = lsb(kings);
                if self.attackers_to(ksq) & self.pieces_c(!us) != 0 {
                    return false;
                }
            }

            return !self.chess960
                || (self.is_atomic() && self.kings_adjacent_after(m))
                || attacks_bb(PieceType::ROOK, to, self.pieces() ^ m.to())
                    & self.pieces_cpp(!us, PieceType::ROOK, PieceType::QUEEN)
                    == 0;
        }

        // If the moving piece is a king, check whether the destination
        // square is attacked by the opponent.
        if self.piece_on(from).piece_type() == PieceType::KING {
            if self.is_atomic() && self.kings_adjacent() && !self.kings_adjacent_after(m) {
                let to = m.to();
                if self.attackers_to(to)
                    & self.pieces_cpp(!us, PieceType::KNIGHT, PieceType::PAWN)
                    != 0
                {
                    return false;
                }
                return self.slider_attackers_to(to, (self.pieces() ^ from) | to)
                    & self.pieces_c(!us)
                    == 0;
            }
            if self.is_two_kings() {
                let kings = self.pieces_cp(us, PieceType::KING) ^ from ^ m.to();
                let ksq = lsb(kings);
                return self.attackers_to_occ(ksq, (self.pieces() ^ from) | m.to())
                    & (self.pieces_c(!us) & !m.to().bb())
                    == 0;
            }
            if self.is_grid() {
                return self.attackers_to_occ(m.to(), self.pieces() ^ from)
                    & self.pieces_c(!us)
                    == 0;
            }
            if self.is_relay()
                && self.checkers() != 0
                && self.relayed_attackers_to(m.to(), !us, self.pieces() ^ from, 3, 5) != 0
            {
                return false;
            }
            return self.attackers_to(m.to()) & self.pieces_c(!us) == 0;
        }

        if self.is_relay()
            && self
                .relayed_attackers_to(
                    self.square(us, PieceType::KING),
                    !us,
                    self.pieces() ^ from,
                    3,
                    5,
                )
                != 0
        {
            return false;
        }

        // A non-king move is legal if and only if it is not pinned or it
        // is moving along the ray towards or away from the king.
        self.blockers_for_king(us) & from == 0
            || aligned(from, m.to(), self.square(us, PieceType::KING))
    }

    // pseudo_legal() takes a random move and tests whether the move is
    // pseudo legal. It is used to validate moves from the TT that can be
    // corrupted due to SMP concurrent access or hash position key aliasing.
    pub fn pseudo_legal(&self, m: Move) -> bool {
        let us = self.side_to_move();
        let to = m.to();

        if m.move_type() == MoveType::Drop && !self.is_house() {
            return false;
        }

        // If the game is already won or lost, further moves are illegal.
        if self.is_variant_end() {
            return false;
        }

        if m.move_type() == MoveType::Drop {
            let pc = m.dropped_piece();
            if pc.color() != us
                || self.count_in_hand(us, pc.piece_type()) <= 0
                || !self.empty(to)
            {
                return false;
            }
            if pc.piece_type() == PieceType::PAWN
                && (Bitboard::RANK1_BB | Bitboard::RANK8_BB) & to != 0
            {
                return false;
            }
            if self.checkers() != 0 {
                // A drop must block the only check.
                if more_than_one(self.checkers()) {
                    return false;
                }
                if between_bb(lsb(self.checkers()), self.square(us, PieceType::KING)) & to == 0 {
                    return false;
                }
            }
            return true;
        }

        let from = m.from();
        let pc = self.moved_piece(m);

        if pc == Piece::NO_PIECE || pc.color() != us {
            return false;
        }

        if self.is_atomic() {
            if self.capture(m) {
                if pc.piece_type() == PieceType::KING {
                    return false;
                }
                let ksq = self.square(us, PieceType::KING);
                if self.pieces_c(us) & to != 0
                    || pseudo_attacks(PieceType::KING, ksq) & to != 0
                {
                    return false;
                }
                if !self.kings_adjacent() {
                    // Illegal pawn capture generated by the killer heuristic
                    if pc.piece_type() == PieceType::PAWN && from.file() == to.file() {
                        return false;
                    }
                    let capsq = if m.move_type() == MoveType::EnPassant {
                        Square::make(to.file(), from.rank())
                    } else {
                        to
                    };
                    if pseudo_attacks(PieceType::KING, to)
                        & self.pieces_cp(!us, PieceType::KING)
                        == 0
                    {
                        let blast = pseudo_attacks(PieceType::KING, to)
                            & (self.pieces() ^ self.pieces_p(PieceType::PAWN));
                        let b = self.pieces() ^ (blast | capsq.bb() | from.bb());
                        if self.checkers() & b != 0 {
                            return false;
                        }
                        if (attacks_bb(PieceType::ROOK, ksq, b)
                            & self.pieces_cpp(!us, PieceType::QUEEN, PieceType::ROOK)
                            & b)
                            != 0
                            || (attacks_bb(PieceType::BISHOP, ksq, b)
                                & self.pieces_cpp(!us, PieceType::QUEEN, PieceType::BISHOP)
                                & b)
                                != 0
                        {
                            return false;
                        }
                    }
                }
            }
        }

        if self.is_anti() && !self.capture(m) && self.can_capture() {
            return false;
        }
        if self.is_losers() && !self.capture(m) && self.can_capture_losers() {
            return false;
        }

        // Use a slower but simpler function for uncommon cases
        if m.move_type() != MoveType::Normal {
            return MoveList::new::<Legal>(self).contains(m);
        }

        // It is not a promotion, so promotion piece must be empty
        if m.promotion_type() != PieceType::KNIGHT {
            return false;
        }

        // The destination square cannot be occupied by a friendly piece
        if self.pieces_c(us) & to != 0 {
            return false;
        }

        // Handle the special case of a pawn move
        if self.is_knight_relay()
            && pc.piece_type() != PieceType::KNIGHT
            && pc.piece_type() != PieceType::KING
            && pseudo_attacks(PieceType::KNIGHT, from) & to != 0
        {
            if pc.piece_type() == PieceType::PAWN
                && (Bitboard::RANK8_BB | Bitboard::RANK1_BB) & to != 0
            {
                return false;
            }
            if pseudo_attacks(PieceType::KNIGHT, from)
                & self.pieces_cp(us, PieceType::KNIGHT)
                == 0
            {
                return false;
            }
            // Knight-relayed moves may not capture.
            if !self.empty(to) {
                return false;
            }
        } else if pc.piece_type() == PieceType::PAWN {
            if to.rank() == relative_rank(us, RANK_8) {
                return false;
            }

            let double_push_rank = from.relative_rank(us) == RANK_2
                || (self.is_horde() && from.relative_rank(us) == RANK_1);

            if self.attacks_from_pawn(from, us) & self.pieces_c(!us) & to == 0
                && !((from + pawn_push(us) == to) && self.empty(to))
                && !(from + 2 * pawn_push(us) == to
                    && double_push_rank
                    && self.empty(to)
                    && self.empty(to - pawn_push(us)))
            {
                return false;
            }
        } else if self.attacks_from(pc.piece_type(), from) & to == 0 {
            if self.is_relay() {
                let mut b = Bitboard(0);
                for pt in 2..7 {
                    if pseudo_attacks(PieceType(pt), from)
                        & self.pieces_cp(us, PieceType(pt))
                        != 0
                    {
                        b |= pseudo_attacks(PieceType(pt), from);
                    }
                }
                if b & to == 0 {
                    return false;
                }
            } else {
                return false;
            }
        }

        if self.is_grid() && grid_bb(self.variant.grid_layout(), from) & to != 0 {
            return false;
        }

        // Evasions generator already takes care of avoiding certain kinds of
        // illegal moves and legal() relies on this. We therefore have to take
        // care that the same kind of moves are filtered out here.
        if self.checkers() != 0 {
            if self.is_atomic() && self.kings_adjacent_after(m) {
                return true;
            }
            if self.is_atomic() && self.capture(m) {
                let blast = pseudo_attacks(PieceType::KING, to)
                    & (self.pieces() ^ self.pieces_p(PieceType::PAWN));
                if blast & self.pieces_cp(!us, PieceType::KING) != 0
                    || self.checkers() & !blast == 0
                {
                    return true;
                }
            }
            if self.is_two_kings() && self.count(us, PieceType::KING) > 1 {
                // A spare king may ignore the check.
            } else if pc.piece_type() != PieceType::KING {
                // Double check? In this case a king move is required
                if more_than_one(self.checkers()) {
                    return false;
                }

                // Our move must be a blocking evasion or a capture of the
                // checking piece
                if (between_bb(lsb(self.checkers()), self.square(us, PieceType::KING))
                    | self.checkers())
                    & to
                    == 0
                {
                    return false;
                }
            } else if self.is_grid() {
                if self.attackers_to_occ(to, self.pieces() ^ from)
                    & self.pieces_c(!us)
                    & !grid_bb(self.variant.grid_layout(), to)
                    != 0
                {
                    return false;
                }
            } else if self.attackers_to_occ(to, self.pieces() ^ from) & self.pieces_c(!us) != 0 {
                return false;
            }
        }

        true
    }

    // gives_check() tests whether a pseudo-legal move gives a check
    pub fn gives_check(&self, m: Move) -> bool {
        debug_assert!(m.is_ok());
        debug_assert!(self.moved_piece(m).color() == self.side_to_move());

        if m.move_type() == MoveType::Drop {
            return self.st().check_squares[m.dropped_piece().piece_type().0 as usize] & m.to()
                != 0;
        }

        if self.is_anti() || self.is_extinction() {
            return false;
        }
        if self.is_horde() && self.is_horde_color(!self.side_to_move) {
            return false;
        }

        let from = m.from();
        let to = m.to();

        if self.is_atomic() {
            let them_kings = self.pieces_cp(!self.side_to_move, PieceType::KING);
            if them_kings == 0 {
                return false;
            }
            let ksq = lsb(them_kings);

            match m.move_type() {
                MoveType::Castling => {
                    // Standard rules apply unless the kings connect after
                    // castling.
                    if ksq.relative_rank(self.side_to_move) != RANK_2 {
                        // fall through to the generic castling handling below
                    } else {
                        if self.kings_adjacent_after(m) {
                            return false;
                        }
                        return self.kings_adjacent()
                            && self.attackers_to(ksq)
                                & (self.pieces_c(self.side_to_move) ^ from ^ to)
                                != 0;
                    }
                }
                _ => {
                    if self.kings_adjacent_after(m) {
                        return false;
                    }
                    if self.piece_on(from).piece_type() == PieceType::KING
                        && self.kings_adjacent()
                    {
                        return self.attackers_to_occ(ksq, (self.pieces() ^ from) | to)
                            & (self.pieces_c(self.side_to_move) ^ from)
                            != 0;
                    }
                    if self.capture(m) {
                        if pseudo_attacks(PieceType::KING, ksq) & to != 0 {
                            return false;
                        }
                        // Blasted pieces may discover checks
                        let mut blast = pseudo_attacks(PieceType::KING, to)
                            & (self.pieces() ^ self.pieces_p(PieceType::PAWN));
                        blast |= if m.move_type() == MoveType::EnPassant {
                            Square::make(to.file(), from.rank()).bb()
                        } else {
                            to.bb()
                        };

                        return self
                            .slider_attackers_to(ksq, self.pieces() ^ (blast | from.bb()))
                            & (self.pieces_c(self.side_to_move) ^ from)
                            & !blast
                            != 0;
                    }
                }
            }
        }

        // Is there a direct check?
        if self.st().check_squares[self.piece_on(from).piece_type().0 as usize] & to != 0 {
            return true;
        }

        let them = !self.side_to_move;
        let their_king = self.royal_king(them);

        // Is there a discovered check?
        if self.blockers_for_king(them) & from != 0 && !aligned(from, to, their_king) {
            return true;
        }

        // In grid chess a piece can also check by leaving the king's cell.
        if self.is_grid()
            && grid_bb(self.variant.grid_layout(), their_king) & from != 0
            && aligned(from, to, their_king)
            && self.piece_on(from).piece_type() != PieceType::PAWN
            && attacks_bb(self.piece_on(from).piece_type(), to, self.pieces() ^ from)
                & their_king
                != 0
        {
            return true;
        }

        match m.move_type() {
            MoveType::Normal => false,

            MoveType::Promotion => {
                attacks_bb(m.promotion_type(), to, self.pieces() ^ from) & their_king != 0
            }

            // En passant capture with check? We have already handled the
            // case of direct checks and ordinary discovered check, so the
            // only case we need to handle is the unusual case of a
            // discovered check through the captured pawn.
            MoveType::EnPassant => {
                let capsq = Square::make(to.file(), from.rank());
                let b = (self.pieces() ^ from ^ capsq) | to;

                (attacks_bb(PieceType::ROOK, their_king, b)
                    & self.pieces_cpp(self.side_to_move(), PieceType::QUEEN, PieceType::ROOK))
                    | (attacks_bb(PieceType::BISHOP, their_king, b)
                        & self.pieces_cpp(
                            self.side_to_move(),
                            PieceType::QUEEN,
                            PieceType::BISHOP,
                        ))
                    != 0
            }

            MoveType::Castling => {
                let kfrom = from;
                let rfrom = to; // Castling is encoded as king captures rook
                let kto = relative_square(
                    self.side_to_move(),
                    if rfrom > kfrom { Square::G1 } else { Square::C1 },
                );
                let rto = relative_square(
                    self.side_to_move(),
                    if rfrom > kfrom { Square::F1 } else { Square::D1 },
                );

                (pseudo_attacks(PieceType::ROOK, rto) & their_king) != 0
                    && (attacks_bb(
                        PieceType::ROOK,
                        rto,
                        (self.pieces() ^ kfrom ^ rfrom) | rto | kto,
                    ) & their_king)
                        != 0
            }

            _ => {
                debug_assert!(false);
                false
            }
        }
    }

    // do_move() makes a move and saves all information necessary to a
    // StateInfo object. The move is assumed to be legal. Pseudo-legal
    // moves should be filtered out before this function is called.
    #[allow(clippy::too_many_lines)]
    pub fn do_move(&mut self, m: Move, gives_check: bool) {
        debug_assert!(m.is_ok());

        self.nodes += 1;
        let mut k = self.st().key ^ zobrist::side();

        // Copy some fields of the old state to our new StateInfo object
        // except the ones which are going to be recalculated from scratch
        // anyway.
        let st_copy = self.st().clone();
        self.states.push(st_copy);
        self.st_mut().blast = [Piece::NO_PIECE; 8];
        self.st_mut().blast_mover = Piece::NO_PIECE;
        self.st_mut().captured_promoted = false;

        // Increment ply counters. The rule50 field will be reset to zero
        // later on in case of a capture or a pawn move.
        self.game_ply += 1;
        self.st_mut().rule50 += 1;
        self.st_mut().plies_from_null += 1;

        let us = self.side_to_move();
        let them = !us;
        let is_drop = m.move_type() == MoveType::Drop;
        let from = if is_drop { Square::NONE } else { m.from() };
        let mut to = m.to();
        let pc = if is_drop {
            m.dropped_piece()
        } else {
            self.piece_on(from)
        };
        let mut captured = if m.move_type() == MoveType::EnPassant {
            Piece::make(them, PieceType::PAWN)
        } else if is_drop {
            Piece::NO_PIECE
        } else {
            self.piece_on(to)
        };

        debug_assert!(pc.color() == us);

        if m.move_type() == MoveType::Castling {
            debug_assert!(pc == Piece::make(us, PieceType::KING));
            debug_assert!(captured == Piece::make(us, PieceType::ROOK));

            let mut rfrom = Square::A1;
            let mut rto = Square::A1;
            self.do_castling::<true>(us, from, &mut to, &mut rfrom, &mut rto);

            let tmp = psqt::psq(self.variant, captured, rto)
                - psqt::psq(self.variant, captured, rfrom);
            self.st_mut().psq += tmp;
            k ^= zobrist::psq(captured, rfrom) ^ zobrist::psq(captured, rto);
            captured = Piece::NO_PIECE;
        }

        if captured != Piece::NO_PIECE {
            let mut capsq = to;

            // If the captured piece is a pawn, update pawn hash key, otherwise
            // update non-pawn material.
            if captured.piece_type() == PieceType::PAWN {
                if m.move_type() == MoveType::EnPassant {
                    capsq -= pawn_push(us);

                    debug_assert!(pc == Piece::make(us, PieceType::PAWN));
                    debug_assert!(to == self.st().ep_square);
                    debug_assert!(to.relative_rank(us) == RANK_6);
                    debug_assert!(self.piece_on(to) == Piece::NO_PIECE);
                    debug_assert!(self.piece_on(capsq) == Piece::make(them, PieceType::PAWN));
                }

                let tmp = zobrist::psq(captured, capsq);
                self.st_mut().pawn_key ^= tmp;
            } else {
                let tmp = piece_value(MG, captured);
                self.st_mut().non_pawn_material[them.0 as usize] -= tmp;
                if self.is_house()
                    && !self.is_promoted(capsq)
                    && !self.is_bughouse()
                    && !self.is_placement()
                {
                    self.st_mut().non_pawn_material[us.0 as usize] += tmp;
                }
            }

            // Update board and piece lists. In atomic chess the capturer
            // never lands, so the destination must be cleared explicitly.
            self.remove_piece(captured, capsq);
            if m.move_type() == MoveType::EnPassant || self.is_atomic() {
                self.board[capsq.0 as usize] = Piece::NO_PIECE;
            }

            // Captured pieces go to the capturing side's hand, demoted back
            // to pawns when they had been promoted.
            if self.is_house() {
                self.st_mut().captured_promoted = self.is_promoted(capsq);
                if !self.is_bughouse() && !self.is_placement() {
                    let add = if self.is_promoted(capsq) {
                        Piece::make(us, PieceType::PAWN)
                    } else {
                        !captured
                    };
                    self.add_to_hand(add.color(), add.piece_type());
                    let held = self.count_in_hand(add.color(), add.piece_type());
                    let dk = zobrist::in_hand(add, held - 1) ^ zobrist::in_hand(add, held);
                    k ^= dk;
                    self.st_mut().material_key ^= dk;
                }
                self.promoted &= !capsq.bb();
            }

            // Update material hash key
            k ^= zobrist::psq(captured, capsq);
            {
                let tmp = zobrist::material(captured, self.piece_count[captured.0 as usize]);
                self.st_mut().material_key ^= tmp;
            }

            // Update incremental scores
            let tmp = psqt::psq(self.variant, captured, capsq);
            self.st_mut().psq -= tmp;

            // In atomic chess every non-pawn piece around the destination
            // explodes together with the capturer.
            if self.is_atomic() {
                let ring = pseudo_attacks(PieceType::KING, to);
                let mut slot = 0usize;
                for bsq in ring {
                    if bsq != from {
                        let bpc = self.piece_on(bsq);
                        if bpc != Piece::NO_PIECE && bpc.piece_type() != PieceType::PAWN {
                            self.st_mut().blast[slot] = bpc;
                            let bc = bpc.color();
                            if bpc.piece_type() != PieceType::KING {
                                let tmp = piece_value(MG, bpc);
                                self.st_mut().non_pawn_material[bc.0 as usize] -= tmp;
                            }
                            self.remove_piece(bpc, bsq);
                            self.board[bsq.0 as usize] = Piece::NO_PIECE;

                            k ^= zobrist::psq(bpc, bsq);
                            {
                                let tmp =
                                    zobrist::material(bpc, self.piece_count[bpc.0 as usize]);
                                self.st_mut().material_key ^= tmp;
                            }
                            let tmp = psqt::psq(self.variant, bpc, bsq);
                            self.st_mut().psq -= tmp;

                            if self.st().castling_rights != 0
                                && self.castling_rights_mask[bsq.0 as usize] != 0
                            {
                                let cr = self.castling_rights_mask[bsq.0 as usize];
                                k ^= zobrist::castling(self.st().castling_rights);
                                self.st_mut().castling_rights &= !cr;
                                k ^= zobrist::castling(self.st().castling_rights);
                            }
                        }
                    }
                    slot += 1;
                }
            }

            // Reset rule 50 counter
            self.st_mut().rule50 = 0;
        }

        // Update hash key for the moving piece
        if self.is_atomic() && captured != Piece::NO_PIECE {
            k ^= zobrist::psq(pc, from);
        } else if is_drop {
            let held = self.count_in_hand(us, pc.piece_type());
            let dk = zobrist::in_hand(pc, held) ^ zobrist::in_hand(pc, held - 1);
            k ^= zobrist::psq(pc, to) ^ dk;
            self.st_mut().material_key ^= dk;
        } else {
            k ^= zobrist::psq(pc, from) ^ zobrist::psq(pc, to);
        }

        // Reset en passant square
        if self.st().ep_square != Square::NONE {
            let tmp = zobrist::enpassant(self.st().ep_square.file());
            k ^= tmp;
            self.st_mut().ep_square = Square::NONE;
        }

        // Update castling rights if needed
        if !is_drop
            && self.st().castling_rights != 0
            && (self.castling_rights_mask[from.0 as usize]
                | self.castling_rights_mask[to.0 as usize]
                != 0
                || (self.is_two_kings() && pc.piece_type() == PieceType::KING))
        {
            let cr = if self.is_two_kings() && pc.piece_type() == PieceType::KING {
                self.castling_rights_mask[from.0 as usize]
                    | self.castling_rights_mask[to.0 as usize]
                    | CastlingRight(3 << (2 * us.0))
            } else {
                self.castling_rights_mask[from.0 as usize]
                    | self.castling_rights_mask[to.0 as usize]
            };
            k ^= zobrist::castling(self.st().castling_rights);
            self.st_mut().castling_rights &= !cr;
            k ^= zobrist::castling(self.st().castling_rights);
        }

        // A delivered check moves the three-check counter.
        if self.is_three_check() && gives_check {
            let given = self.st().checks_given[us.0 as usize];
            k ^= zobrist::checks(us, given) ^ zobrist::checks(us, given + 1);
            self.st_mut().checks_given[us.0 as usize] = given + 1;
        }

        // Move the piece, or remove the exploded capturer, or drop.
        if self.is_atomic() && captured != Piece::NO_PIECE {
            self.st_mut().blast_mover = pc;
            self.remove_piece(pc, from);
            self.board[from.0 as usize] = Piece::NO_PIECE;
            {
                let tmp = zobrist::material(pc, self.piece_count[pc.0 as usize]);
                self.st_mut().material_key ^= tmp;
            }
            if pc.piece_type() != PieceType::PAWN {
                let tmp = piece_value(MG, pc);
                self.st_mut().non_pawn_material[us.0 as usize] -= tmp;
            }
            let tmp = psqt::psq(self.variant, pc, from);
            self.st_mut().psq -= tmp;
        } else if is_drop {
            self.drop_piece(pc, to);
            {
                let tmp = zobrist::material(pc, self.piece_count[pc.0 as usize] - 1);
                self.st_mut().material_key ^= tmp;
            }
            if pc.piece_type() != PieceType::PAWN && pc.piece_type() != PieceType::KING {
                // Material stays with the dropping side, nothing to update.
            }
            let tmp = psqt::psq(self.variant, pc, to);
            self.st_mut().psq += tmp;
            if pc.piece_type() == PieceType::PAWN {
                let tmp = zobrist::psq(pc, to);
                self.st_mut().pawn_key ^= tmp;
                self.st_mut().rule50 = 0;
            }
            // The placement phase ends for a side once its hand is empty;
            // castling rights appear if king and rooks stand on their home
            // squares.
            if self.is_placement() && self.count_in_hand_all(us) == 0 {
                let ksq = relative_square(us, Square::E1);
                if self.piece_on(ksq) == Piece::make(us, PieceType::KING) {
                    let rook = Piece::make(us, PieceType::ROOK);
                    for rsq in [relative_square(us, Square::H1), relative_square(us, Square::A1)]
                    {
                        if self.piece_on(rsq) == rook {
                            self.set_castling_right(us, ksq, rsq);
                        }
                    }
                    k ^= zobrist::castling(
                        self.st().castling_rights
                            & self.castling_rights_mask[ksq.0 as usize],
                    );
                }
            }
        } else if m.move_type() != MoveType::Castling {
            self.move_piece(pc, from, to);
        }

        // If the moving piece is a pawn do some special extra work
        if pc.piece_type() == PieceType::PAWN && !is_drop {
            if self.is_atomic() && captured != Piece::NO_PIECE {
                let tmp = zobrist::psq(Piece::make(us, PieceType::PAWN), from);
                self.st_mut().pawn_key ^= tmp;
            } else {
                // Set en-passant square if the moved pawn can be captured
                let horde_home_push =
                    self.is_horde() && from.relative_rank(us) == RANK_1;
                if to.0 ^ from.0 == 16
                    && !horde_home_push
                    && !(self.is_atomic()
                        && self.count(them, PieceType::KING) > 0
                        && pseudo_attacks(PieceType::KING, to - pawn_push(us))
                            & self.pieces_cp(them, PieceType::KING)
                            != 0)
                    && self.attacks_from_pawn(to - pawn_push(us), us)
                        & self.pieces_cp(them, PieceType::PAWN)
                        != 0
                {
                    self.st_mut().ep_square = to - pawn_push(us);
                    k ^= zobrist::enpassant(self.st().ep_square.file());
                } else if m.move_type() == MoveType::Promotion {
                    let promotion = Piece::make(us, m.promotion_type());

                    debug_assert!(to.relative_rank(us) == RANK_8);
                    debug_assert!(
                        promotion.piece_type() >= PieceType::KNIGHT
                            && promotion.piece_type()
                                <= if self.is_anti() || self.is_extinction() {
                                    PieceType::KING
                                } else {
                                    PieceType::QUEEN
                                }
                    );

                    self.remove_piece(pc, to);
                    self.put_piece(promotion, to);
                    if self.is_house() && !self.is_loop() {
                        self.promoted |= to;
                    }

                    // Update hash keys
                    k ^= zobrist::psq(pc, to) ^ zobrist::psq(promotion, to);
                    self.st_mut().pawn_key ^= zobrist::psq(pc, to);
                    {
                        let tmp = zobrist::material(
                            promotion,
                            self.piece_count[promotion.0 as usize] - 1,
                        ) ^ zobrist::material(pc, self.piece_count[pc.0 as usize]);
                        self.st_mut().material_key ^= tmp;
                    }

                    // Update incremental score
                    let tmp = psqt::psq(self.variant, promotion, to)
                        - psqt::psq(self.variant, pc, to);
                    self.st_mut().psq += tmp;

                    // Update material
                    let tmp = piece_value(MG, promotion);
                    self.st_mut().non_pawn_material[us.0 as usize] += tmp;
                }

                // Update pawn hash key
                let tmp = zobrist::psq(pc, from) ^ zobrist::psq(pc, to);
                self.st_mut().pawn_key ^= tmp;
            }

            // Reset rule 50 draw counter
            self.st_mut().rule50 = 0;
        }

        // Update incremental scores
        if !(self.is_atomic() && captured != Piece::NO_PIECE)
            && !is_drop
            && m.move_type() != MoveType::Castling
        {
            let tmp =
                psqt::psq(self.variant, pc, to) - psqt::psq(self.variant, pc, from);
            self.st_mut().psq += tmp;
        }

        // Track promoted pieces sliding around the board.
        if self.is_house()
            && !is_drop
            && m.move_type() != MoveType::Castling
            && self.is_promoted(from)
        {
            self.promoted = (self.promoted ^ from.bb()) | to.bb();
        }

        // Set captured piece
        self.st_mut().captured_piece = captured;

        // Update the key with the final value
        self.st_mut().key = k;

        self.side_to_move = them;

        // Calculate checkers bitboard. The relay powers shift with every
        // move, so recompute from scratch there.
        let force_recompute = (self.is_knight_relay()
            && self.pieces_p(PieceType::KNIGHT) != 0)
            || (self.is_relay()
                && self.pieces() ^ self.pieces_pp(PieceType::PAWN, PieceType::KING) != 0);
        self.st_mut().checkers_bb = if gives_check || force_recompute {
            self.compute_checkers()
        } else {
            Bitboard(0)
        };

        // Update king attacks used for fast check detection
        self.set_check_info();

        // Calculate the repetition info. It is the ply distance from the
        // previous occurrence of the same position, negative in the 3-fold
        // case, or zero if the position was not repeated.
        self.st_mut().repetition = 0;
        let end = if self.is_house() {
            self.st().plies_from_null
        } else {
            std::cmp::min(self.st().rule50, self.st().plies_from_null)
        };
        if end >= 4 {
            let len = self.states.len();
            let key = self.st().key;
            let mut i = 4;
            while i <= end {
                if len < (i as usize) + 1 {
                    break;
                }
                let stp = &self.states[len - 1 - i as usize];
                if stp.key == key {
                    self.st_mut().repetition = if stp.repetition != 0 { -i } else { i };
                    break;
                }
                i += 2;
            }
        }

        debug_assert!(self.is_ok());
    }

    // undo_move() unmakes a move. When it returns, the position should be
    // restored to exactly the same state as before the move was made.
    pub fn undo_move(&mut self, m: Move) {
        debug_assert!(m.is_ok());

        self.side_to_move = !self.side_to_move;

        let us = self.side_to_move;
        let is_drop = m.move_type() == MoveType::Drop;
        let from = if is_drop { Square::NONE } else { m.from() };
        let mut to = m.to();
        let mut pc = self.piece_on(to);

        let atomic_blast = self.is_atomic() && self.st().captured_piece != Piece::NO_PIECE;
        if atomic_blast {
            // The capturer exploded together with the ring.
            pc = Piece::NO_PIECE;
        }

        if m.move_type() == MoveType::Promotion && !atomic_blast {
            debug_assert!(to.relative_rank(us) == RANK_8);
            debug_assert!(pc.piece_type() == m.promotion_type());

            self.remove_piece(pc, to);
            pc = Piece::make(us, PieceType::PAWN);
            self.put_piece(pc, to);
            if self.is_house() {
                self.promoted &= !to.bb();
            }
        }

        if m.move_type() == MoveType::Castling {
            let mut rfrom = Square(0);
            let mut rto = Square(0);
            self.do_castling::<false>(us, from, &mut to, &mut rfrom, &mut rto);
        } else if atomic_blast {
            // Restore the exploded ring, the capturer and the victim.
            let capsq = if m.move_type() == MoveType::EnPassant {
                to - pawn_push(us)
            } else {
                to
            };
            let ring = pseudo_attacks(PieceType::KING, to);
            let mut slot = 0usize;
            for bsq in ring {
                if bsq != from {
                    let bpc = self.st().blast[slot];
                    if bpc != Piece::NO_PIECE {
                        self.put_piece(bpc, bsq);
                    }
                }
                slot += 1;
            }
            let moved = self.st().blast_mover;
            debug_assert!(moved != Piece::NO_PIECE && moved.color() == us);
            self.put_piece(moved, from);
            let cap_piece = self.st().captured_piece;
            self.put_piece(cap_piece, capsq);
        } else {
            if is_drop {
                self.undrop_piece(pc, to);
                if self.is_placement() {
                    // Re-opening the drop phase cancels any rights granted
                    // by the final drop.
                    let ksq = relative_square(us, Square::E1);
                    let cr = self.castling_rights_mask[ksq.0 as usize]
                        & CastlingRight(3 << (2 * us.0));
                    if cr != 0 {
                        for s in 0..64 {
                            self.castling_rights_mask[s] &= !cr;
                        }
                    }
                }
            } else {
                // Put the piece back at the source square
                self.move_piece(pc, to, from);
                if self.is_house() && self.is_promoted(to) {
                    self.promoted = (self.promoted ^ to.bb()) | from.bb();
                }
            }

            if self.st().captured_piece != Piece::NO_PIECE {
                let mut capsq = to;

                if m.move_type() == MoveType::EnPassant {
                    capsq -= pawn_push(us);

                    debug_assert!(pc.piece_type() == PieceType::PAWN);
                    debug_assert!(to.relative_rank(us) == RANK_6);
                    debug_assert!(self.piece_on(capsq) == Piece::NO_PIECE);
                    debug_assert!(
                        self.st().captured_piece == Piece::make(!us, PieceType::PAWN)
                    );
                }

                // Restore the captured piece
                let cap_piece = self.st().captured_piece;
                self.put_piece(cap_piece, capsq);
                if self.is_house() {
                    if !self.is_bughouse() && !self.is_placement() {
                        let held = if self.st().captured_promoted {
                            PieceType::PAWN
                        } else {
                            cap_piece.piece_type()
                        };
                        self.remove_from_hand(!cap_piece.color(), held);
                    }
                    if self.st().captured_promoted {
                        self.promoted |= to;
                    }
                }
            }
        }

        let new_len = self.states.len() - 1;
        self.states.truncate(new_len);
        self.game_ply -= 1;

        debug_assert!(self.is_ok());
    }

    // do_castling() is a helper used to do/undo a castling move. This is
    // a bit tricky in Chess960 where from/to squares can overlap.
    fn do_castling<const DOIT: bool>(
        &mut self,
        us: Color,
        from: Square,
        to: &mut Square,
        rfrom: &mut Square,
        rto: &mut Square,
    ) {
        let king_side = *to > from;
        *rfrom = *to; // Castling is encoded as king captures rook
        *rto = relative_square(us, if king_side { Square::F1 } else { Square::D1 });
        *to = relative_square(us, if king_side { Square::G1 } else { Square::C1 });

        // Remove both pieces first since squares could overlap in Chess960
        self.remove_piece(
            Piece::make(us, PieceType::KING),
            if DOIT { from } else { *to },
        );
        self.remove_piece(
            Piece::make(us, PieceType::ROOK),
            if DOIT { *rfrom } else { *rto },
        );
        self.board[(if DOIT { from } else { *to }).0 as usize] = Piece::NO_PIECE;
        self.board[(if DOIT { *rfrom } else { *rto }).0 as usize] = Piece::NO_PIECE;
        self.put_piece(
            Piece::make(us, PieceType::KING),
            if DOIT { *to } else { from },
        );
        self.put_piece(
            Piece::make(us, PieceType::ROOK),
            if DOIT { *rto } else { *rfrom },
        );
    }

    // do(undo)_null_move() is used to do(undo) a "null move": it flips the
    // side to move without executing any move on the board.
    pub fn do_null_move(&mut self) {
        debug_assert!(self.checkers() == 0);

        let st_copy = (*self.st()).clone(); // full copy
        self.states.push(st_copy);

        if self.st().ep_square != Square::NONE {
            let tmp = zobrist::enpassant(self.st().ep_square.file());
            self.st_mut().key ^= tmp;
            self.st_mut().ep_square = Square::NONE;
        }

        self.st_mut().key ^= zobrist::side();

        self.st_mut().rule50 += 1;
        self.st_mut().plies_from_null = 0;
        self.st_mut().repetition = 0;

        self.side_to_move = !self.side_to_move;

        self.set_check_info();

        debug_assert!(self.is_ok());
    }

    pub fn undo_null_move(&mut self) {
        debug_assert!(self.checkers() == 0);

        let new_len = self.states.len() - 1;
        self.states.truncate(new_len);
        self.side_to_move = !self.side_to_move;
    }

    fn drop_piece(&mut self, pc: Piece, s: Square) {
        debug_assert!(self.count_in_hand(pc.color(), pc.piece_type()) > 0);
        self.put_piece(pc, s);
        self.remove_from_hand(pc.color(), pc.piece_type());
    }

    fn undrop_piece(&mut self, pc: Piece, s: Square) {
        self.remove_piece(pc, s);
        self.board[s.0 as usize] = Piece::NO_PIECE;
        self.add_to_hand(pc.color(), pc.piece_type());
    }

    // key_after() computes the new hash key after the given move. Needed for
    // speculative prefetch; it doesn't recognize special moves.
    pub fn key_after(&self, m: Move) -> Key {
        if m.move_type() == MoveType::Drop {
            let pc = m.dropped_piece();
            let held = self.count_in_hand(pc.color(), pc.piece_type());
            return self.st().key
                ^ zobrist::side()
                ^ zobrist::psq(pc, m.to())
                ^ zobrist::in_hand(pc, held)
                ^ zobrist::in_hand(pc, held - 1);
        }

        let from = m.from();
        let to = m.to();
        let pc = self.piece_on(from);
        let captured = self.piece_on(to);
        let mut k = self.st().key ^ zobrist::side();

        if captured != Piece::NO_PIECE {
            k ^= zobrist::psq(captured, to);
            if self.is_atomic() {
                let blast = pseudo_attacks(PieceType::KING, to)
                    & (self.pieces() ^ self.pieces_p(PieceType::PAWN))
                    & !from.bb();
                for bsq in blast {
                    let bpc = self.piece_on(bsq);
                    if bpc != Piece::NO_PIECE {
                        k ^= zobrist::psq(bpc, bsq);
                    }
                }
                return k ^ zobrist::psq(pc, from);
            }
            if self.is_house() && !self.is_bughouse() && !self.is_placement() {
                let add = if self.is_promoted(to) {
                    Piece::make(pc.color(), PieceType::PAWN)
                } else {
                    !captured
                };
                let held = self.count_in_hand(add.color(), add.piece_type());
                k ^= zobrist::in_hand(add, held + 1) ^ zobrist::in_hand(add, held);
            }
        }

        k ^ zobrist::psq(pc, from) ^ zobrist::psq(pc, to)
    }

    // see_ge() tests if the SEE value of move is greater than or equal to
    // the given threshold. We use an algorithm similar to alpha-beta pruning
    // with a null window.
    #[allow(clippy::too_many_lines)]
    pub fn see_ge(&self, m: Move, threshold: Value) -> bool {
        debug_assert!(m.is_ok());

        let mut threshold = threshold;

        // Crazyhouse captures count double, the piece comes back in hand.
        if self.is_house() && self.moved_piece(m).color() == self.side_to_move {
            threshold = Value(threshold.0 / 2);
        }

        // A check is always worth investigating on the way to the third one.
        if self.is_three_check()
            && self.moved_piece(m).color() == self.side_to_move
            && self.gives_check(m)
        {
            return true;
        }

        // Only deal with normal moves and drops, assume others pass a
        // simple SEE.
        if m.move_type() == MoveType::Drop {
            // A drop stands on its own square: the exchange starts with the
            // opponent's capture of the dropped piece.
        } else if m.move_type() != MoveType::Normal {
            return Value::ZERO >= threshold;
        }

        let to = m.to();

        if self.is_atomic() {
            let from = m.from();
            let next_victim = self.piece_on(from).piece_type();
            let stm = self.piece_on(from).color();
            if self.capture(m) {
                return self.see_atomic(m, next_victim, to) >= threshold + 1;
            }
            if threshold > Value::ZERO {
                return false;
            }

            let occupied = self.pieces() ^ from;
            let mut stm_attackers = self.attackers_to_occ(to, occupied)
                & occupied
                & self.pieces_c(stm)
                & !self.pieces_p(PieceType::KING);

            // Loop over attacking pieces
            while stm_attackers != 0 {
                let s = crate::bitboard::pop_lsb(&mut stm_attackers);
                if self.see_atomic(m, next_victim, s) < threshold {
                    return false;
                }
            }
            return true;
        }

        // Capturing the defender's last piece of a type ends the game at
        // once, so the move wins the exchange outright.
        if self.is_extinction() && self.capture(m) {
            let mover_color = self.piece_on(m.from()).color();
            let victim = if m.move_type() == MoveType::EnPassant {
                PieceType::PAWN
            } else {
                self.piece_on(to).piece_type()
            };
            if !more_than_one(self.pieces_cp(!mover_color, victim)) {
                return true;
            }
        }

        let var = self.variant;
        let mut swap;
        let (occ_init, stm_init) = if m.move_type() == MoveType::Drop {
            swap = -threshold;
            if swap < Value::ZERO {
                return false;
            }
            swap = piece_value_var(var, MG, m.dropped_piece()) - swap;
            if swap <= Value::ZERO {
                return true;
            }
            (self.pieces() ^ to, m.dropped_piece().color())
        } else {
            let from = m.from();
            swap = piece_value_var(var, MG, self.piece_on(to)) - threshold;
            if swap < Value::ZERO {
                return false;
            }
            swap = piece_value_var(var, MG, self.piece_on(from)) - swap;
            if swap <= Value::ZERO {
                return true;
            }

            // The extinction refutation: if the mover is the last piece of
            // its type, any recapture ends the game against us.
            if self.is_extinction()
                && !more_than_one(
                    self.pieces_cp(self.piece_on(from).color(), self.piece_on(from).piece_type()),
                )
            {
                let mut occupied = self.pieces() ^ from ^ to;
                if m.move_type() == MoveType::EnPassant {
                    occupied ^= Square::make(to.file(), from.rank());
                }
                if self.attackers_to_occ(to, occupied)
                    & occupied
                    & self.pieces_c(!self.piece_on(from).color())
                    != 0
                {
                    return false;
                }
            }

            (self.pieces() ^ from ^ to, self.piece_on(from).color())
        };

        let mut occ = occ_init;
        let mut stm = stm_init;
        let mut attackers = self.attackers_to_occ(to, occ);
        let mut res = 1;

        loop {
            stm = !stm;
            attackers &= occ;
            let mut stm_attackers = attackers & self.pieces_c(stm);
            if stm_attackers == 0 {
                break;
            }
            if self.pinners_for_king(stm) & occ != 0 {
                stm_attackers &= !self.blockers_for_king(stm);
            }
            if self.is_race() {
                // Checking recaptures are illegal in racing kings.
                let their_king = self.square(!stm, PieceType::KING);
                for pt in 2..6 {
                    if attacks_bb(PieceType(pt), to, Bitboard(0)) & their_king != 0 {
                        stm_attackers &= !self.pieces_cp(stm, PieceType(pt));
                    }
                }
            }
            if stm_attackers == 0 {
                break;
            }
            res ^= 1;

            let bb = stm_attackers & self.pieces_p(PieceType::PAWN);
            if bb != 0 {
                swap = piece_value_var(var, MG, Piece::make(stm, PieceType::PAWN)) - swap;
                if swap < Value(res) {
                    break;
                }
                occ ^= bb & -bb;
                attackers |= attacks_bb(PieceType::BISHOP, to, occ)
                    & self.pieces_pp(PieceType::BISHOP, PieceType::QUEEN);
                continue;
            }
            let bb = stm_attackers & self.pieces_p(PieceType::KNIGHT);
            if bb != 0 {
                swap = piece_value_var(var, MG, Piece::make(stm, PieceType::KNIGHT)) - swap;
                if swap < Value(res) {
                    break;
                }
                occ ^= bb & -bb;
                continue;
            }
            let bb = stm_attackers & self.pieces_p(PieceType::BISHOP);
            if bb != 0 {
                swap = piece_value_var(var, MG, Piece::make(stm, PieceType::BISHOP)) - swap;
                if swap < Value(res) {
                    break;
                }
                occ ^= bb & -bb;
                attackers |= attacks_bb(PieceType::BISHOP, to, occ)
                    & self.pieces_pp(PieceType::BISHOP, PieceType::QUEEN);
                continue;
            }
            let bb = stm_attackers & self.pieces_p(PieceType::ROOK);
            if bb != 0 {
                swap = piece_value_var(var, MG, Piece::make(stm, PieceType::ROOK)) - swap;
                if swap < Value(res) {
                    break;
                }
                occ ^= bb & -bb;
                attackers |= attacks_bb(PieceType::ROOK, to, occ)
                    & self.pieces_pp(PieceType::ROOK, PieceType::QUEEN);
                continue;
            }
            let bb = stm_attackers & self.pieces_p(PieceType::QUEEN);
            if bb != 0 {
                swap = piece_value_var(var, MG, Piece::make(stm, PieceType::QUEEN)) - swap;
                if swap < Value(res) {
                    break;
                }
                occ ^= bb & -bb;
                attackers |= (attacks_bb(PieceType::BISHOP, to, occ)
                    & self.pieces_pp(PieceType::BISHOP, PieceType::QUEEN))
                    | (attacks_bb(PieceType::ROOK, to, occ)
                        & self.pieces_pp(PieceType::ROOK, PieceType::QUEEN));
                continue;
            }
            // King capture: if the opponent still has attackers, reverse the
            // result.
            if attackers & !self.pieces_c(stm) != 0 {
                return res == 0;
            } else {
                return res != 0;
            }
        }
        res != 0
    }

    // The atomic exchange value of capturing on 's': the whole blast is
    // summed with middlegame piece-square values.
    fn see_atomic(&self, m: Move, next_victim: PieceType, s: Square) -> Value {
        let from = m.from();
        let us = self.piece_on(from).color();
        let mut blast = pseudo_attacks(PieceType::KING, m.to())
            & (self.pieces() ^ self.pieces_p(PieceType::PAWN))
            & !from.bb();
        if s != m.to() {
            blast &= !s.bb();
        }

        if blast & self.pieces_cp(!us, PieceType::KING) != 0 {
            return Value::MATE;
        }
        if s != m.to() && blast & self.pieces_cp(us, PieceType::KING) != 0 {
            return -Value::MATE;
        }

        let mut blast_eval = psqt::psq(self.variant, Piece::make(us, next_victim), from).mg()
            + psqt::psq(self.variant, self.piece_on(s), s).mg();
        for b in blast {
            blast_eval += psqt::psq(self.variant, self.piece_on(b), b).mg();
        }

        if us == Color::WHITE {
            -blast_eval
        } else {
            blast_eval
        }
    }

    // is_draw() tests whether the position is drawn by 50-move rule or by
    // repetition. It does not detect stalemates.
    pub fn is_draw(&self, ply: i32) -> bool {
        if !self.is_house()
            && self.st().rule50 > 99
            && (self.checkers() == 0 || MoveList::new::<Legal>(self).len() != 0)
        {
            return true;
        }

        // Return a draw score if a position repeats once earlier but
        // strictly after the root, or repeats twice before or at the root.
        self.st().repetition != 0 && self.st().repetition < ply
    }

    // has_repeated() tests whether there has been at least one repetition
    // of positions since the last capture or pawn move.
    pub fn has_repeated(&self) -> bool {
        let mut i = self.states.len() - 1;
        let mut end = std::cmp::min(self.st().rule50, self.st().plies_from_null);
        while end >= 4 && i > 0 {
            if self.states[i].repetition != 0 {
                return true;
            }
            i -= 1;
            end -= 1;
        }
        false
    }

    // has_game_cycle() tests if the position has a move which draws by
    // repetition, or an earlier position has a move that directly reaches
    // the current position.
    pub fn has_game_cycle(&self, ply: i32) -> bool {
        if self.is_anti() || self.is_losers() {
            return false;
        }

        let end = std::cmp::min(self.st().rule50, self.st().plies_from_null);
        if end < 3 {
            return false;
        }

        let original_key = self.st().key;
        let len = self.states.len();

        let mut i = 3;
        while i <= end {
            if len <= i as usize {
                break;
            }
            let stp = &self.states[len - 1 - i as usize];

            let move_key = original_key ^ stp.key;
            let mut j = h1(move_key);
            let hit = unsafe {
                if CUCKOO[j] == move_key {
                    true
                } else {
                    j = h2(move_key);
                    CUCKOO[j] == move_key
                }
            };
            if hit {
                let mv = unsafe { CUCKOO_MOVE[j] };
                let s1 = mv.from();
                let s2 = mv.to();

                if between_bb(s1, s2) & self.pieces() == 0 {
                    if ply > i {
                        return true;
                    }
                    // For nodes before or at the root, check that the move
                    // is a repetition rather than a move to the current
                    // position.
                    let occupied = if self.empty(s1) { s2 } else { s1 };
                    if self.piece_on(occupied).color() == self.side_to_move
                        && stp.repetition != 0
                    {
                        return true;
                    }
                }
            }
            i += 2;
        }

        false
    }

    // flip() mirrors the position along the horizontal axis with reversed
    // colors. Used to validate the evaluation symmetry.
    pub fn flip(&mut self) {
        let fen = self.fen();
        let mut fields = fen.split(' ').map(String::from).collect::<Vec<_>>();

        // Flip the board
        let placement = fields[0].clone();
        let (board_part, hand_part) = match placement.find('[') {
            Some(i) => (placement[..i].to_string(), Some(placement[i..].to_string())),
            None => (placement, None),
        };
        let flipped: Vec<String> = board_part
            .split('/')
            .rev()
            .map(|rank| {
                rank.chars()
                    .map(|c| {
                        if c.is_ascii_uppercase() {
                            c.to_ascii_lowercase()
                        } else if c.is_ascii_lowercase() {
                            c.to_ascii_uppercase()
                        } else {
                            c
                        }
                    })
                    .collect()
            })
            .collect();
        let mut placement = flipped.join("/");
        if let Some(hand) = hand_part {
            let hand: String = hand
                .chars()
                .map(|c| {
                    if c.is_ascii_uppercase() {
                        c.to_ascii_lowercase()
                    } else if c.is_ascii_lowercase() {
                        c.to_ascii_uppercase()
                    } else {
                        c
                    }
                })
                .collect();
            placement.push_str(&hand);
        }
        fields[0] = placement;

        // Side to move
        fields[1] = if fields[1] == "w" { "b".into() } else { "w".into() };

        // Castling rights
        fields[2] = fields[2]
            .chars()
            .map(|c| {
                if c.is_ascii_uppercase() {
                    c.to_ascii_lowercase()
                } else if c.is_ascii_lowercase() {
                    c.to_ascii_uppercase()
                } else {
                    c
                }
            })
            .collect();

        // En passant square
        if fields[3] != "-" {
            let mut chars = fields[3].chars();
            let file = chars.next().unwrap();
            let rank = chars.next().unwrap();
            let rank = if rank == '6' { '3' } else { '6' };
            fields[3] = format!("{file}{rank}");
        }

        // Swap the three-check counters
        if fields.len() > 6 && fields[6].starts_with('+') {
            let parts: Vec<&str> = fields[6].trim_start_matches('+').split('+').collect();
            if parts.len() == 2 {
                fields[6] = format!("+{}+{}", parts[1], parts[0]);
            }
        }

        let fen = fields.join(" ");
        let chess960 = self.chess960;
        let variant = self.variant;
        self.set(&fen, chess960, variant).unwrap();
    }

    fn put_piece(&mut self, pc: Piece, s: Square) {
        self.board[s.0 as usize] = pc;
        self.by_type_bb[PieceType::ALL_PIECES.0 as usize] |= s;
        self.by_type_bb[pc.piece_type().0 as usize] |= s;
        self.by_color_bb[pc.color().0 as usize] |= s;
        self.index[s.0 as usize] = self.piece_count[pc.0 as usize];
        self.piece_count[pc.0 as usize] += 1;
        self.piece_list[pc.0 as usize][self.index[s.0 as usize] as usize] = s;
        self.piece_count[Piece::make(pc.color(), PieceType::ALL_PIECES).0 as usize] += 1;
    }

    fn remove_piece(&mut self, pc: Piece, s: Square) {
        self.by_type_bb[PieceType::ALL_PIECES.0 as usize] ^= s;
        self.by_type_bb[pc.piece_type().0 as usize] ^= s;
        self.by_color_bb[pc.color().0 as usize] ^= s;
        self.piece_count[pc.0 as usize] -= 1;
        let last_square = self.piece_list[pc.0 as usize][self.piece_count[pc.0 as usize] as usize];
        self.index[last_square.0 as usize] = self.index[s.0 as usize];
        self.piece_list[pc.0 as usize][self.index[last_square.0 as usize] as usize] = last_square;
        self.piece_list[pc.0 as usize][self.piece_count[pc.0 as usize] as usize] = Square::NONE;
        self.piece_count[Piece::make(pc.color(), PieceType::ALL_PIECES).0 as usize] -= 1;
    }

    fn move_piece(&mut self, pc: Piece, from: Square, to: Square) {
        let from_to_bb = from.bb() ^ to.bb();
        self.by_type_bb[PieceType::ALL_PIECES.0 as usize] ^= from_to_bb;
        self.by_type_bb[pc.piece_type().0 as usize] ^= from_to_bb;
        self.by_color_bb[pc.color().0 as usize] ^= from_to_bb;
        self.board[from.0 as usize] = Piece::NO_PIECE;
        self.board[to.0 as usize] = pc;
        self.index[to.0 as usize] = self.index[from.0 as usize];
        self.piece_list[pc.0 as usize][self.index[to.0 as usize] as usize] = to;
    }

    // state_consistent() recomputes the derived state from scratch and
    // compares it against the incrementally maintained one. Debugging aid.
    pub fn state_consistent(&mut self) -> bool {
        let saved = self.st().clone();
        self.set_state();
        let ok = self.st().key == saved.key
            && self.st().pawn_key == saved.pawn_key
            && self.st().material_key == saved.material_key
            && self.st().psq == saved.psq
            && self.st().non_pawn_material == saved.non_pawn_material
            && self.st().checkers_bb == saved.checkers_bb;
        *self.st_mut() = saved;
        ok
    }

    // is_ok() performs some consistency checks for the position object and
    // raises an assert if something wrong is detected. This is meant to be
    // helpful when debugging.
    pub fn is_ok(&self) -> bool {
        if self.side_to_move != Color::WHITE && self.side_to_move != Color::BLACK {
            panic!("pos_is_ok: side to move");
        }

        if !self.variant.king_is_ordinary() && !self.is_placement() {
            if self.count(Color::WHITE, PieceType::KING) < 1
                || self.count(Color::BLACK, PieceType::KING) < 1
            {
                panic!("pos_is_ok: kings");
            }
        }

        if self.by_color_bb[0] & self.by_color_bb[1] != 0 {
            panic!("pos_is_ok: color overlap");
        }
        if self.by_color_bb[0] | self.by_color_bb[1]
            != self.by_type_bb[PieceType::ALL_PIECES.0 as usize]
        {
            panic!("pos_is_ok: occupancy");
        }

        if !self.is_horde()
            && self.pieces_p(PieceType::PAWN) & (Bitboard::RANK1_BB | Bitboard::RANK8_BB) != 0
        {
            panic!("pos_is_ok: pawns on back rank");
        }

        for p1 in 1..7 {
            for p2 in 1..7 {
                assert!(
                    !(p1 != p2
                        && self.pieces_p(PieceType(p1)) & self.pieces_p(PieceType(p2)) != 0),
                    "pos_is_ok: bitboards"
                );
            }
        }

        for p in 1..15 {
            if p == 7 || p == 8 {
                continue;
            }
            let pc = Piece(p);
            if self.piece_count[pc.0 as usize]
                != popcount(self.pieces_cp(pc.color(), pc.piece_type())) as i32
            {
                panic!("pos_is_ok: piece count {p}");
            }

            for i in 0..self.piece_count[pc.0 as usize] {
                if self.board[self.piece_list[pc.0 as usize][i as usize].0 as usize] != pc
                    || self.index[self.piece_list[pc.0 as usize][i as usize].0 as usize] != i
                {
                    panic!("pos_is_ok: index {p}, {i}");
                }
            }
        }

        true
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::new()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        writeln!(f, "\n +---+---+---+---+---+---+---+---+")?;
        for r in (0..8).rev() {
            for fl in 0..8 {
                write!(
                    f,
                    " | {}",
                    PIECE_TO_CHAR
                        .chars()
                        .nth(self.piece_on(Square::make(fl, r)).0 as usize)
                        .unwrap()
                )?;
            }
            writeln!(f, " |\n +---+---+---+---+---+---+---+---+")?;
        }
        write!(f, "\nFen: {}\nKey: {}", self.fen(), self.key())
    }
}

fn parse_checks_field(tok: &str) -> Option<(i32, i32)> {
    // Accepts both the lichess "3+3" form and the trailing "+3+3" form,
    // counting checks remaining; the state stores checks given.
    let trimmed = tok.strip_prefix('+').unwrap_or(tok);
    let mut parts = trimmed.split('+');
    let w: i32 = parts.next()?.parse().ok()?;
    let b: i32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !(0..=3).contains(&w) || !(0..=3).contains(&b) {
        return None;
    }
    Some((3 - w, 3 - b))
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    fn pos_from(fen: &str, v: Variant) -> Position {
        crate::init_for_test();
        let mut pos = Position::new();
        pos.set(fen, false, v).unwrap();
        pos
    }

    #[test]
    fn test_fen_round_trip() {
        for fen in &[
            START_FEN,
            KIWIPETE,
            "8/8/8/8/8/8/8/4K2k w - - 10 42",
            "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3",
        ] {
            let pos = pos_from(fen, Variant::Chess);
            assert_eq!(&pos.fen(), fen);
        }
    }

    #[test]
    fn test_fen_round_trip_crazyhouse() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR[] w KQkq - 0 1";
        let pos = pos_from(fen, Variant::Crazyhouse);
        assert_eq!(pos.fen(), fen);

        let fen = "rnb1kbnr/ppp1pppp/8/3p4/8/5N2/PPPPPPPP/RNBQKB1R[Qp] b KQkq - 0 4";
        let pos = pos_from(fen, Variant::Crazyhouse);
        assert_eq!(pos.fen(), fen);
        assert_eq!(pos.count_in_hand(Color::WHITE, PieceType::QUEEN), 1);
        assert_eq!(pos.count_in_hand(Color::BLACK, PieceType::PAWN), 1);
    }

    #[test]
    fn test_fen_round_trip_three_check() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 +2+3";
        let pos = pos_from(fen, Variant::ThreeCheck);
        assert_eq!(pos.fen(), fen);
        assert_eq!(pos.checks_given(Color::WHITE), 1);
        assert_eq!(pos.checks_given(Color::BLACK), 0);
    }

    #[test]
    fn test_bad_fens() {
        crate::init_for_test();
        let mut pos = Position::new();
        assert_eq!(
            pos.set("rnbqkbnr/ppppppp/8/8", false, Variant::Chess),
            Err(FenError::InvalidPiecePlacement)
        );
        assert_eq!(
            pos.set(
                "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
                false,
                Variant::Chess
            ),
            Err(FenError::InvalidSideToMove)
        );
        assert_eq!(
            pos.set(
                "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - x 1",
                false,
                Variant::Chess
            ),
            Err(FenError::InvalidCounter)
        );
        assert_eq!(
            pos.set(
                "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e9 0 1",
                false,
                Variant::Chess
            ),
            Err(FenError::InvalidEnPassant)
        );
    }

    #[test]
    fn test_do_undo_restores_state() {
        let mut pos = pos_from(KIWIPETE, Variant::Chess);
        let before_key = pos.key();
        let before_fen = pos.fen();

        let moves: Vec<Move> = MoveList::new::<Legal>(&pos).iter().collect();
        assert!(!moves.is_empty());
        for m in moves {
            let gives_check = pos.gives_check(m);
            pos.do_move(m, gives_check);
            assert!(pos.state_consistent());
            pos.undo_move(m);
            assert_eq!(pos.key(), before_key);
            assert_eq!(pos.fen(), before_fen);
        }
    }

    #[test]
    fn test_do_undo_atomic_blast() {
        // Capturing on d5 blasts the knight on c6 but not the pawns.
        let mut pos = pos_from(
            "r1bqkbnr/ppp1pppp/2n5/3p4/3P4/5N2/PPP1PPPP/RNBQKB1R w KQkq - 0 3",
            Variant::Atomic,
        );
        let before_fen = pos.fen();
        let moves: Vec<Move> = MoveList::new::<Legal>(&pos).iter().collect();
        for m in moves {
            let gives_check = pos.gives_check(m);
            pos.do_move(m, gives_check);
            assert!(pos.state_consistent());
            pos.undo_move(m);
            assert_eq!(pos.fen(), before_fen);
        }
    }

    #[test]
    fn test_do_undo_crazyhouse_drop() {
        let mut pos = pos_from(
            "rnb1kbnr/ppp1pppp/8/3p4/8/5N2/PPPPPPPP/RNBQKB1R[Qp] b KQkq - 0 4",
            Variant::Crazyhouse,
        );
        let before_fen = pos.fen();
        let moves: Vec<Move> = MoveList::new::<Legal>(&pos).iter().collect();
        assert!(moves
            .iter()
            .any(|m| m.move_type() == MoveType::Drop));
        for m in moves {
            let gives_check = pos.gives_check(m);
            pos.do_move(m, gives_check);
            assert!(pos.state_consistent());
            pos.undo_move(m);
            assert_eq!(pos.fen(), before_fen);
        }
    }

    #[test]
    fn test_repetition_draw() {
        let mut pos = pos_from(START_FEN, Variant::Chess);
        let seq = [
            Move::make(Square(6), Square(21)),  // Ng1-f3
            Move::make(Square(62), Square(45)), // Ng8-f6
            Move::make(Square(21), Square(6)),  // Nf3-g1
            Move::make(Square(45), Square(62)), // Nf6-g8
        ];
        for _ in 0..2 {
            for &m in &seq {
                assert!(!pos.is_draw(1));
                pos.do_move(m, false);
            }
        }
        // Third occurrence of the starting position after the root.
        assert!(pos.is_draw(20));
    }

    #[test]
    fn test_game_cycle_detection() {
        let mut pos = pos_from(START_FEN, Variant::Chess);
        pos.do_move(Move::make(Square(6), Square(21)), false); // Ng1-f3
        pos.do_move(Move::make(Square(62), Square(45)), false); // Ng8-f6
        pos.do_move(Move::make(Square(21), Square(6)), false); // Nf3-g1
        // Black can play Nf6-g8 and repeat: a cycle is upcoming.
        assert!(pos.has_game_cycle(10));
    }

    #[test]
    fn test_see_monotone_in_threshold() {
        let pos = pos_from(KIWIPETE, Variant::Chess);
        let moves: Vec<Move> = MoveList::new::<Legal>(&pos).iter().collect();
        for m in moves.iter().filter(|m| pos.capture(**m)) {
            let mut prev = true;
            for v in (-400..400).step_by(100) {
                let now = pos.see_ge(*m, Value(v));
                // Raising the threshold can only turn true into false.
                assert!(prev || !now);
                prev = now;
            }
        }
    }

    #[test]
    fn test_atomic_kings_adjacent_shield() {
        // With the kings adjacent there are no checks in atomic chess.
        let pos = pos_from("8/8/8/3kK3/8/8/4r3/8 w - - 0 1", Variant::Atomic);
        assert_eq!(pos.checkers(), Bitboard(0));
    }

    #[test]
    fn test_variant_result_koth() {
        let pos = pos_from("8/8/8/4K3/8/8/8/2k5 b - - 0 1", Variant::Koth);
        // The white king reached the centre: black to move is lost.
        assert_eq!(pos.variant_result(0, Value::DRAW), Some(mated_in(0)));
    }

    #[test]
    fn test_variant_result_three_check() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1 +0+3";
        let pos = pos_from(fen, Variant::ThreeCheck);
        assert!(pos.is_three_check_loss());
        assert_eq!(pos.variant_result(3, Value::DRAW), Some(mated_in(3)));
    }
}
