// SPDX-License-Identifier: GPL-3.0-or-later

#![allow(dead_code)]

use crate::evaluate;
use crate::movegen::{Legal, MoveList};
use crate::movepick::{MovePicker, MovePickerPC, MovePickerQ, PieceToHistory};
use crate::position::Position;
use crate::tb;
use crate::threads::ThreadCtrl;
use crate::timeman;
use crate::tt::TranspositionTable;
use crate::types::bound::Bound;
use crate::types::depth::{Depth, ONE_PLY};
use crate::types::key::Key;
use crate::types::{
    mate_in, mated_in, Color, Move, MoveType, Piece, PieceType, Square, Value, EG, MAX_PLY,
};
use crate::uci;
use crate::ucioption;

use std::sync::atomic::Ordering;
use std::time::Instant;

// Counter-move history pruning threshold.
pub const CM_THRESHOLD: i32 = 0;

#[derive(Clone)]
pub struct LimitsType {
    pub time: [i64; 2],
    pub inc: [i64; 2],
    pub movestogo: i32,
    pub depth: i32,
    pub movetime: i64,
    pub mate: i32,
    pub perft: i32,
    pub infinite: bool,
    pub ponder: bool,
    pub nodes: u64,
    pub searchmoves: Vec<String>,
    pub start_time: Option<Instant>,
}

impl LimitsType {
    pub fn new() -> LimitsType {
        LimitsType {
            time: [0; 2],
            inc: [0; 2],
            movestogo: 0,
            depth: 0,
            movetime: 0,
            mate: 0,
            perft: 0,
            infinite: false,
            ponder: false,
            nodes: 0,
            searchmoves: Vec::new(),
            start_time: Some(Instant::now()),
        }
    }

    pub fn use_time_management(&self) -> bool {
        self.mate == 0
            && self.movetime == 0
            && self.depth == 0
            && self.nodes == 0
            && self.perft == 0
            && !self.infinite
    }
}

impl Default for LimitsType {
    fn default() -> Self {
        LimitsType::new()
    }
}

#[derive(Clone)]
pub struct RootMove {
    pub pv: Vec<Move>,
    pub score: Value,
    pub previous_score: Value,
    pub sel_depth: i32,
}

impl RootMove {
    pub fn new(m: Move) -> RootMove {
        RootMove {
            pv: vec![m],
            score: -Value::INFINITE,
            previous_score: -Value::INFINITE,
            sel_depth: 0,
        }
    }
}

pub type RootMoves = Vec<RootMove>;

#[derive(Clone, Copy)]
pub struct Stack {
    pub ply: i32,
    pub current_move: Move,
    pub excluded_move: Move,
    pub killers: [Move; 2],
    pub static_eval: Value,
    pub stat_score: i32,
    pub move_count: i32,
    pub cont_history: &'static PieceToHistory,
}

// Reductions[pv][improving][depth][move number]
static mut REDUCTIONS: [[[[i32; 64]; 64]; 2]; 2] = [[[[0; 64]; 64]; 2]; 2];

// Futility move counts[improving][depth]
static mut FUTILITY_MOVE_COUNTS: [[i32; 16]; 2] = [[0; 16]; 2];

const RAZOR_MARGIN: [i32; 3] = [0, 590, 604];

const SKIP_SIZE: [i32; 20] = [1, 1, 1, 2, 2, 2, 1, 3, 2, 2, 1, 3, 3, 2, 2, 1, 2, 3, 2, 2];
const SKIP_PHASE: [i32; 20] = [0, 1, 0, 1, 2, 3, 0, 1, 2, 3, 0, 1, 2, 3, 4, 5, 0, 1, 2, 3];

fn futility_margin(d: Depth) -> Value {
    Value(150 * d.0)
}

fn reduction(pv_node: bool, improving: bool, d: Depth, move_count: i32) -> Depth {
    unsafe {
        Depth(
            REDUCTIONS[usize::from(pv_node)][usize::from(improving)]
                [std::cmp::min(d.0, 63) as usize][std::cmp::min(move_count, 63) as usize],
        )
    }
}

fn stat_bonus(depth: Depth) -> i32 {
    let d = depth.0;
    if d > 17 {
        0
    } else {
        d * d + 2 * d - 2
    }
}

pub fn init() {
    unsafe {
        for imp in 0..2 {
            for d in 1..64 {
                for mc in 1..64 {
                    let r = (d as f64).ln() * (mc as f64).ln() / 1.95;

                    REDUCTIONS[0][imp][d][mc] = r.round() as i32;
                    REDUCTIONS[1][imp][d][mc] =
                        std::cmp::max(REDUCTIONS[0][imp][d][mc] - 1, 0);

                    // Increase reduction for non-PV nodes when eval is not
                    // improving
                    if imp == 0 && r > 1.0 {
                        REDUCTIONS[0][imp][d][mc] += 1;
                    }
                }
            }
        }

        for d in 0..16 {
            FUTILITY_MOVE_COUNTS[0][d] = (2.4 + 0.74 * (d as f64).powf(1.78)) as i32;
            FUTILITY_MOVE_COUNTS[1][d] = (5.0 + 1.0 * (d as f64).powf(2.0)) as i32;
        }
    }
}

struct SearchCtx<'a> {
    tt: &'a TranspositionTable,
    limits: &'a LimitsType,
    ctrl: &'a ThreadCtrl,
    root_color: Color,
    contempt: Value,
}

impl SearchCtx<'_> {
    // The draw score leans away from the contempt side.
    fn draw_value(&self, pos: &Position) -> Value {
        if pos.side_to_move() == self.root_color {
            Value::DRAW - self.contempt
        } else {
            Value::DRAW + self.contempt
        }
    }
}

// value_to_tt() adjusts a mate score from "plies to mate from the root" to
// "plies to mate from the current position". value_from_tt() is the
// inverse.
fn value_to_tt(v: Value, ply: i32) -> Value {
    debug_assert!(v != Value::NONE);
    if v >= Value::MATE_IN_MAX_PLY {
        v + ply
    } else if v <= Value::MATED_IN_MAX_PLY {
        v - ply
    } else {
        v
    }
}

fn value_from_tt(v: Value, ply: i32) -> Value {
    if v == Value::NONE {
        Value::NONE
    } else if v >= Value::MATE_IN_MAX_PLY {
        v - ply
    } else if v <= Value::MATED_IN_MAX_PLY {
        v + ply
    } else {
        v
    }
}

fn new_stack(pos: &Position) -> Vec<Stack> {
    let sentinel = pos.cont_history.get(Piece::NO_PIECE, Square(0));
    vec![
        Stack {
            ply: 0,
            current_move: Move::NONE,
            excluded_move: Move::NONE,
            killers: [Move::NONE; 2],
            static_eval: Value::ZERO,
            stat_score: 0,
            move_count: 0,
            cont_history: sentinel,
        };
        MAX_PLY as usize + 10
    ]
}

// think() is the per-thread iterative deepening loop. It returns the
// result of this thread's search; only the main thread emits output.
pub fn think(
    pos: &mut Position,
    tt: &TranspositionTable,
    limits: &LimitsType,
    ctrl: &ThreadCtrl,
) -> crate::threads::SearchResult {
    let mut ctx = SearchCtx {
        tt,
        limits,
        ctrl,
        root_color: pos.side_to_move(),
        contempt: Value(
            ucioption::get_i64("Contempt") as i32 * Value::PawnValueEg.0 / 100,
        ),
    };

    // Build the root move list
    pos.root_moves = MoveList::new::<Legal>(pos)
        .iter()
        .filter(|m| {
            limits.searchmoves.is_empty()
                || limits
                    .searchmoves
                    .iter()
                    .any(|s| *s == uci::move_str(*m, pos.is_chess960()))
        })
        .map(RootMove::new)
        .collect();

    if pos.root_moves.is_empty() {
        if pos.is_main {
            println!("info depth 0 score {}", uci::value(root_terminal_value(pos)));
        }
        return crate::threads::SearchResult {
            completed_depth: Depth::ZERO,
            score: root_terminal_value(pos),
            pv: Vec::new(),
        };
    }

    let multi_pv = std::cmp::min(
        ucioption::get_u32("MultiPV") as usize,
        pos.root_moves.len(),
    );
    let mut stack = new_stack(pos);
    let mut best_value = -Value::INFINITE;
    let mut last_best_move = pos.root_moves[0].pv[0];
    let mut time_reduction = 1.0f64;

    pos.completed_depth = Depth::ZERO;
    pos.best_move_changes = 0.0;
    pos.failed_low = false;

    let mut root_depth = Depth::ZERO;
    while root_depth < Depth::MAX - ONE_PLY {
        root_depth += ONE_PLY;

        if ctrl.stopped() {
            break;
        }
        if limits.depth != 0 && root_depth.0 > limits.depth {
            break;
        }

        // Helper threads skip some depths to desynchronize from the main
        // thread.
        if pos.thread_idx > 0 {
            let i = ((pos.thread_idx - 1) % 20) as usize;
            if ((root_depth.0 + pos.game_ply() + SKIP_PHASE[i]) / SKIP_SIZE[i]) % 2 != 0 {
                continue;
            }
        }

        // Age out PV variability and save the previous scores
        if pos.is_main {
            pos.best_move_changes *= 0.517;
            pos.failed_low = false;
        }
        for rm in &mut pos.root_moves {
            rm.previous_score = rm.score;
        }

        // Multi-PV loop
        pos.pv_last = pos.root_moves.len();
        for pv_idx in 0..multi_pv {
            pos.pv_idx = pv_idx;
            if ctrl.stopped() {
                break;
            }

            pos.sel_depth = 0;

            // Aspiration window around the previous iteration's score
            let mut delta = Value(18);
            let prev = pos.root_moves[pv_idx].previous_score;
            let (mut alpha, mut beta) = if root_depth.0 >= 5 && prev.abs() < Value::KNOWN_WIN {
                (
                    std::cmp::max(prev - delta, -Value::INFINITE),
                    std::cmp::min(prev + delta, Value::INFINITE),
                )
            } else {
                (-Value::INFINITE, Value::INFINITE)
            };

            loop {
                best_value = search(
                    pos, &mut ctx, &mut stack, 0, alpha, beta, root_depth, false, true,
                );

                // Bring the best move of this PV line to the front,
                // preserving the order of the remaining moves.
                pos.root_moves[pv_idx..].sort_by(|a, b| b.score.cmp(&a.score));

                if ctrl.stopped() {
                    break;
                }

                if pos.is_main
                    && multi_pv == 1
                    && (best_value <= alpha || best_value >= beta)
                    && timeman::elapsed(limits) > 3000
                {
                    print_pv(pos, &ctx, root_depth, alpha, beta);
                }

                if best_value <= alpha {
                    beta = Value((alpha.0 + beta.0) / 2);
                    alpha = std::cmp::max(best_value - delta, -Value::INFINITE);
                    if pos.is_main {
                        pos.failed_low = true;
                    }
                } else if best_value >= beta {
                    beta = std::cmp::min(best_value + delta, Value::INFINITE);
                } else {
                    break;
                }

                delta += delta / 4 + 5;

                debug_assert!(alpha >= -Value::INFINITE && beta <= Value::INFINITE);
            }

            pos.root_moves[..=pv_idx].sort_by(|a, b| b.score.cmp(&a.score));

            if pos.is_main
                && (ctrl.stopped() || pv_idx + 1 == multi_pv || timeman::elapsed(limits) > 3000)
            {
                print_pv(pos, &ctx, root_depth, alpha, beta);
            }
        }

        if !ctrl.stopped() {
            pos.completed_depth = root_depth;
        }

        if pos.root_moves[0].pv[0] != last_best_move {
            last_best_move = pos.root_moves[0].pv[0];
        }

        // Have we found a "mate in x"?
        if limits.mate != 0
            && best_value >= Value::MATE_IN_MAX_PLY
            && Value::MATE.0 - best_value.0 <= 2 * limits.mate
        {
            ctrl.stop.store(true, Ordering::Relaxed);
        }

        // Time management: stop early when the position is stable and the
        // budget is spent.
        if pos.is_main && limits.use_time_management() && !ctrl.stopped() {
            let fl = if pos.failed_low { 1.0 } else { 0.0 };
            let improving_factor = (232.0
                + 119.0 * fl
                + 6.0 * (pos.previous_score.0 - best_value.0) as f64)
                .clamp(246.0, 832.0);

            // Stop the search if we have only one legal move, or if all
            // of the available time has been used.
            time_reduction = if pos.completed_depth.0 >= 10 && pos.best_move_changes < 0.1 {
                1.25
            } else {
                1.0
            };
            let unstable =
                1.0 + pos.best_move_changes + 0.2 * pos.previous_time_reduction / time_reduction;

            if pos.root_moves.len() == 1
                || timeman::elapsed(limits) as f64
                    > timeman::optimum() as f64 * unstable * improving_factor / 628.0
            {
                if ctrl.ponder.load(Ordering::Relaxed) {
                    ctrl.stop_on_ponderhit.store(true, Ordering::Relaxed);
                } else {
                    ctrl.stop.store(true, Ordering::Relaxed);
                }
            }
        }
    }

    if pos.is_main {
        pos.previous_time_reduction = time_reduction;
        pos.previous_score = pos.root_moves[0].score;
    }

    crate::threads::SearchResult {
        completed_depth: pos.completed_depth,
        score: pos.root_moves[0].score,
        pv: pos.root_moves[0].pv.clone(),
    }
}

// The value of a root position without legal moves.
fn root_terminal_value(pos: &Position) -> Value {
    if let Some(v) = pos.variant_result(0, Value::DRAW) {
        return v;
    }
    if pos.checkers() != 0 {
        mated_in(0)
    } else {
        pos.stalemate_value(0, Value::DRAW)
    }
}

// check_time() polls the clock and the input-driven flags between nodes.
fn check_time(pos: &mut Position, ctx: &mut SearchCtx) {
    pos.calls_cnt -= 1;
    if pos.calls_cnt > 0 {
        return;
    }
    pos.calls_cnt = if ctx.limits.nodes != 0 { 1024 } else { 4096 };

    // Flush this worker's node count to the shared total.
    ctx.ctrl
        .nodes
        .fetch_add(pos.calls_cnt as u64, Ordering::Relaxed);

    if !pos.is_main {
        return;
    }
    if ctx.ctrl.ponder.load(Ordering::Relaxed) {
        return;
    }

    let elapsed = timeman::elapsed(ctx.limits);
    if (ctx.limits.use_time_management() && elapsed > timeman::maximum() - 10)
        || (ctx.limits.movetime != 0 && elapsed >= ctx.limits.movetime)
        || (ctx.limits.nodes != 0
            && ctx.ctrl.nodes.load(Ordering::Relaxed) + pos.nodes >= ctx.limits.nodes)
    {
        ctx.ctrl.stop.store(true, Ordering::Relaxed);
    }
}

// search() is the main alpha-beta routine for PV, non-PV and root nodes.
#[allow(clippy::too_many_arguments)]
#[allow(clippy::too_many_lines)]
fn search(
    pos: &mut Position,
    ctx: &mut SearchCtx,
    stack: &mut Vec<Stack>,
    ply: i32,
    mut alpha: Value,
    mut beta: Value,
    depth: Depth,
    cut_node: bool,
    pv_node: bool,
) -> Value {
    debug_assert!(-Value::INFINITE <= alpha && alpha < beta && beta <= Value::INFINITE);
    debug_assert!(pv_node || alpha == beta - 1);

    if depth < ONE_PLY {
        return qsearch(pos, ctx, stack, ply, alpha, beta, Depth::ZERO, pv_node);
    }

    let root_node = ply == 0;
    let idx = (ply + 5) as usize;
    let in_check = pos.checkers() != 0;
    let draw_value = ctx.draw_value(pos);

    stack[idx].ply = ply;
    stack[idx + 1].killers = [Move::NONE; 2];
    stack[idx].move_count = 0;

    check_time(pos, ctx);

    if !root_node {
        // Variant-specific win and loss conditions end the game here.
        if let Some(v) = pos.variant_result(ply, draw_value) {
            return v;
        }

        // Check for draws by repetition and the fifty-move rule, and for
        // the maximum ply reached.
        if ctx.ctrl.stopped() || pos.is_draw(ply) || ply >= MAX_PLY {
            return if ply >= MAX_PLY && !in_check {
                evaluate::evaluate(pos)
            } else {
                draw_value
            };
        }

        // An upcoming repetition helps salvaging a bad position.
        if alpha < draw_value && pos.has_game_cycle(ply) {
            alpha = draw_value;
            if alpha >= beta {
                return alpha;
            }
        }

        // Mate distance pruning
        alpha = std::cmp::max(mated_in(ply), alpha);
        beta = std::cmp::min(mate_in(ply + 1), beta);
        if alpha >= beta {
            return alpha;
        }
    }

    let excluded_move = stack[idx].excluded_move;
    let pos_key = Key(pos.key().0 ^ (u64::from(excluded_move.0) << 16));

    // Transposition table lookup
    let tt_hit = ctx.tt.probe(pos_key);
    let (mut tt_move, tt_value, tt_eval, tt_depth, tt_bound) = match tt_hit {
        Some(hit) => (
            hit.mv,
            value_from_tt(hit.value, ply),
            hit.eval,
            hit.depth,
            hit.bound,
        ),
        None => (Move::NONE, Value::NONE, Value::NONE, Depth::NONE, Bound::NONE),
    };
    if root_node {
        tt_move = pos.root_moves[pos.pv_idx].pv[0];
    } else if tt_move != Move::NONE && !pos.pseudo_legal(tt_move) {
        // A corrupted or aliased entry; ignore its move.
        tt_move = Move::NONE;
    }

    // At non-PV nodes we check for an early TT cutoff
    if !pv_node
        && tt_hit.is_some()
        && tt_depth >= depth
        && tt_value != Value::NONE
        && (if tt_value >= beta {
            tt_bound & Bound::LOWER != 0
        } else {
            tt_bound & Bound::UPPER != 0
        })
    {
        // Update move ordering heuristics on a TT hit
        if tt_move != Move::NONE {
            if tt_value >= beta {
                if !pos.capture_or_promotion(tt_move) {
                    update_quiet_stats(pos, stack, idx, tt_move, stat_bonus(depth));
                }
            } else if !pos.capture_or_promotion(tt_move) {
                let penalty = -stat_bonus(depth);
                let pc = pos.moved_piece(tt_move);
                pos.main_history
                    .update(pos.side_to_move(), tt_move, penalty);
                update_continuation_histories(stack, idx, pc, tt_move.to(), penalty);
            }
        }
        return tt_value;
    }

    // Tablebase probe
    if !root_node && tb::max_cardinality() > 0 {
        let piece_count = crate::bitboard::popcount(pos.pieces());
        if piece_count <= tb::max_cardinality()
            && pos.rule50_count() == 0
            && !pos.has_castling_right(crate::types::CastlingRight::ANY_CASTLING)
        {
            let mut success = 0;
            let wdl = tb::probe_wdl(pos, &mut success);
            if success != 0 {
                pos.tb_hits += 1;
                let value = tb::wdl_to_value(wdl, ply);
                ctx.tt.store(
                    pos_key,
                    value_to_tt(value, ply),
                    Bound::EXACT,
                    std::cmp::min(Depth::MAX - ONE_PLY, depth + 6 * ONE_PLY),
                    Move::NONE,
                    Value::NONE,
                );
                return value;
            }
        }
    }

    // Static evaluation of the position
    let mut eval;
    let improving;
    if in_check {
        eval = Value::NONE;
        stack[idx].static_eval = Value::NONE;
        improving = false;
    } else {
        if tt_hit.is_some() {
            eval = if tt_eval == Value::NONE {
                evaluate::evaluate(pos)
            } else {
                tt_eval
            };
            stack[idx].static_eval = eval;

            // The tt value can be used as a better position evaluation
            if tt_value != Value::NONE
                && tt_bound
                    & (if tt_value > eval {
                        Bound::LOWER
                    } else {
                        Bound::UPPER
                    })
                    != 0
            {
                eval = tt_value;
            }
        } else {
            eval = if stack[idx - 1].current_move != Move::NULL {
                evaluate::evaluate(pos)
            } else {
                -stack[idx - 1].static_eval + 2 * crate::types::TEMPO
            };
            stack[idx].static_eval = eval;
            ctx.tt.store(
                pos_key,
                Value::NONE,
                Bound::NONE,
                Depth::NONE,
                Move::NONE,
                stack[idx].static_eval,
            );
        }

        improving = stack[idx].static_eval >= stack[idx - 2].static_eval
            || stack[idx - 2].static_eval == Value::NONE;

        // Razoring: at shallow depths jump straight into quiescence when
        // the eval is hopeless.
        if !pv_node && depth.0 < 3 && eval <= alpha - RAZOR_MARGIN[depth.0 as usize] {
            let ralpha = alpha - Value(i32::from(depth.0 >= 2) * RAZOR_MARGIN[depth.0 as usize]);
            let v = qsearch(pos, ctx, stack, ply, ralpha, ralpha + 1, Depth::ZERO, false);
            if depth.0 < 2 || v <= ralpha {
                return v;
            }
        }

        // Futility pruning: child node
        if !root_node
            && depth.0 < 7
            && eval - futility_margin(depth) >= beta
            && eval < Value::KNOWN_WIN
        {
            return eval;
        }

        // Null move search with verification search
        if !pv_node
            && eval >= beta
            && stack[idx].static_eval >= beta - 36 * depth.0 + 225
            && excluded_move == Move::NONE
            && pos.non_pawn_material_c(pos.side_to_move()) > Value::ZERO
            && (pos.nmp_ply == 0 || pos.nmp_odd != ply % 2)
            && !(pos.is_anti() && pos.can_capture())
            && !(pos.is_losers() && pos.can_capture_losers())
        {
            debug_assert!(eval - beta >= Value::ZERO);

            let r = Depth(((823 + 67 * depth.0) / 256 + std::cmp::min((eval - beta).0 / 200, 3))
                .min(depth.0));

            stack[idx].current_move = Move::NULL;
            stack[idx].cont_history = pos.cont_history.get(Piece::NO_PIECE, Square(0));

            pos.do_null_move();
            let mut null_value = -search(
                pos,
                ctx,
                stack,
                ply + 1,
                -beta,
                -beta + 1,
                depth - r,
                !cut_node,
                false,
            );
            pos.undo_null_move();

            if null_value >= beta {
                // Do not return unproven mate scores
                if null_value >= Value::MATE_IN_MAX_PLY {
                    null_value = beta;
                }

                if (depth.0 < 12 || pos.nmp_ply != 0) && beta.abs() < Value::KNOWN_WIN {
                    return null_value;
                }

                // Do verification search at high depths, disabling null
                // move on the current side to move.
                pos.nmp_ply = ply + 3 * (depth.0 - r.0) / 4;
                pos.nmp_odd = ply % 2;

                let v = search(pos, ctx, stack, ply, beta - 1, beta, depth - r, false, false);

                pos.nmp_odd = 0;
                pos.nmp_ply = 0;

                if v >= beta {
                    return null_value;
                }
            }
        }

        // ProbCut: if we have a good enough capture and a reduced search
        // returns a value much above beta, we can (almost) safely prune
        // the previous move.
        if !pv_node && depth.0 >= 5 && beta.abs() < Value::MATE_IN_MAX_PLY {
            let rbeta = std::cmp::min(beta + 200, Value::INFINITE);

            let mut mp = MovePickerPC::new(pos, tt_move, rbeta - stack[idx].static_eval);
            loop {
                let m = mp.next_move(pos);
                if m == Move::NONE {
                    break;
                }
                if !pos.legal(m) {
                    continue;
                }

                stack[idx].current_move = m;
                stack[idx].cont_history =
                    pos.cont_history.get(pos.moved_piece(m), m.to());

                let gives_check = pos.gives_check(m);
                pos.do_move(m, gives_check);
                let value = -search(
                    pos,
                    ctx,
                    stack,
                    ply + 1,
                    -rbeta,
                    -rbeta + 1,
                    depth - 4 * ONE_PLY,
                    !cut_node,
                    false,
                );
                pos.undo_move(m);
                if value >= rbeta {
                    return value;
                }
            }
        }

        // Internal iterative deepening
        if depth.0 >= 6 && tt_move == Move::NONE && (pv_node || stack[idx].static_eval + 256 >= beta)
        {
            let d = 3 * depth.0 / 4 - 2;
            search(pos, ctx, stack, ply, alpha, beta, Depth(d), cut_node, pv_node);
            if let Some(hit) = ctx.tt.probe(pos_key) {
                if pos.pseudo_legal(hit.mv) {
                    tt_move = hit.mv;
                }
            }
        }
    }

    // Loop through all pseudo-legal moves until no moves remain or a beta
    // cutoff occurs.
    let window: [Stack; 6] = stack[ply as usize..(ply + 6) as usize]
        .try_into()
        .unwrap();
    let mut mp = MovePicker::new(pos, tt_move, depth, &window);

    let mut value;
    let mut best_value = -Value::INFINITE;
    let mut best_move = Move::NONE;
    let mut move_count = 0;
    let mut quiets_searched: Vec<Move> = Vec::with_capacity(64);
    let mut captures_searched: Vec<Move> = Vec::with_capacity(32);
    let mut skip_quiets = false;
    let singular_extension_node = !root_node
        && depth.0 >= 8
        && tt_move != Move::NONE
        && tt_value != Value::NONE
        && excluded_move == Move::NONE
        && tt_bound & Bound::LOWER != 0
        && tt_depth >= depth - 3 * ONE_PLY;

    loop {
        let m = mp.next_move(pos, skip_quiets);
        if m == Move::NONE {
            break;
        }
        debug_assert!(m.is_ok());

        if m == excluded_move {
            continue;
        }

        // At root obey the "searchmoves" option and skip moves not listed
        // in the root move list.
        if root_node
            && !pos.root_moves[pos.pv_idx..pos.pv_last]
                .iter()
                .any(|rm| rm.pv[0] == m)
        {
            continue;
        }

        move_count += 1;
        stack[idx].move_count = move_count;

        if root_node && pos.is_main && timeman::elapsed(ctx.limits) > 3000 {
            println!(
                "info depth {} currmove {} currmovenumber {}",
                depth.0,
                uci::move_str(m, pos.is_chess960()),
                move_count + pos.pv_idx as i32
            );
        }

        let capture_or_promotion = pos.capture_or_promotion(m);
        let moved_piece = pos.moved_piece(m);
        let gives_check = if m.move_type() == MoveType::Normal
            && pos.blockers_for_king((!pos.side_to_move())) & pos.pieces_c(pos.side_to_move())
                == 0
        {
            pos.check_squares(moved_piece.piece_type()) & m.to() != 0
        } else {
            pos.gives_check(m)
        };

        // Step: extensions
        let mut extension = Depth::ZERO;

        // Singular extension search: if the TT move is singularly better
        // than the alternatives, extend it.
        if singular_extension_node
            && m == tt_move
            && tt_value.abs() < Value::KNOWN_WIN
            && pos.legal(m)
        {
            let rbeta = std::cmp::max(tt_value - 2 * depth.0, -Value::MATE);
            let d = Depth(depth.0 / 2);
            stack[idx].excluded_move = m;
            let value = search(pos, ctx, stack, ply, rbeta - 1, rbeta, d, cut_node, false);
            stack[idx].excluded_move = Move::NONE;

            if value < rbeta {
                extension = ONE_PLY;
            }
        } else if gives_check && !pos.advanced_pawn_push(m) && pos.see_ge(m, Value::ZERO) {
            extension = ONE_PLY;
        }

        let new_depth = depth - ONE_PLY + extension;

        // Step: pruning at shallow depth
        if !root_node
            && best_value > Value::MATED_IN_MAX_PLY
            && pos.non_pawn_material_c(pos.side_to_move()) > Value::ZERO
        {
            if !capture_or_promotion
                && !gives_check
                && !pos.advanced_pawn_push(m)
            {
                // Move count based pruning
                if move_count
                    >= unsafe {
                        FUTILITY_MOVE_COUNTS[usize::from(improving)]
                            [std::cmp::min(depth.0, 15) as usize]
                    }
                {
                    skip_quiets = true;
                }

                // Reduced depth of the next LMR search
                let lmr_depth = std::cmp::max(
                    new_depth.0 - reduction(pv_node, improving, depth, move_count).0,
                    0,
                );

                // Countermoves based pruning
                if lmr_depth < 3
                    && m.move_type() != MoveType::Drop
                    && stack[idx - 1].cont_history.get(moved_piece, m.to()) < CM_THRESHOLD
                    && stack[idx - 2].cont_history.get(moved_piece, m.to()) < CM_THRESHOLD
                {
                    continue;
                }

                // Futility pruning: parent node
                if lmr_depth < 7
                    && !in_check
                    && stack[idx].static_eval + 256 + 200 * lmr_depth <= alpha
                {
                    continue;
                }

                // Prune moves with negative SEE
                if lmr_depth < 8 && !pos.see_ge(m, Value(-35 * lmr_depth * lmr_depth)) {
                    continue;
                }
            } else if extension == Depth::ZERO
                && depth.0 < 7
                && !pos.see_ge(m, -Value::PawnValueEg * depth.0)
            {
                continue;
            }
        }

        // Check for legality just before making the move
        if !root_node && !pos.legal(m) {
            move_count -= 1;
            stack[idx].move_count = move_count;
            continue;
        }

        stack[idx].current_move = m;
        stack[idx].cont_history = pos.cont_history.get(moved_piece, m.to());

        // Step: make the move
        pos.do_move(m, gives_check);

        // Step: late move reductions
        let do_full_depth;
        if depth.0 >= 3 && move_count > 1 && (!capture_or_promotion || skip_quiets) {
            let mut r = reduction(pv_node, improving, depth, move_count);

            if capture_or_promotion {
                r -= if r.0 > 0 { ONE_PLY } else { Depth::ZERO };
            } else {
                // Decrease reduction for exact PV nodes
                if pv_node {
                    r -= ONE_PLY;
                }

                // Increase reduction for cut nodes
                if cut_node {
                    r += 2 * ONE_PLY;
                }

                let stat = pos.main_history.get(!pos.side_to_move(), m)
                    + stack[idx].cont_history.get(moved_piece, m.to());
                stack[idx].stat_score = stat;

                if stat >= 0 && r.0 > 0 {
                    r -= ONE_PLY;
                } else if stat < -4000 {
                    r += ONE_PLY;
                }
            }

            let r = Depth(r.0.clamp(0, new_depth.0 - 1));
            let d = new_depth - r;

            value = -search(pos, ctx, stack, ply + 1, -(alpha + 1), -alpha, d, true, false);

            do_full_depth = value > alpha && r != Depth::ZERO;
        } else {
            value = -Value::INFINITE;
            do_full_depth = !pv_node || move_count > 1;
        }

        // Step: full depth search when LMR is skipped or fails high
        if do_full_depth {
            value = -search(
                pos,
                ctx,
                stack,
                ply + 1,
                -(alpha + 1),
                -alpha,
                new_depth,
                !cut_node,
                false,
            );
        }

        if pv_node && (move_count == 1 || (value > alpha && (root_node || value < beta))) {
            value = -search(
                pos, ctx, stack, ply + 1, -beta, -alpha, new_depth, false, true,
            );
        }

        // Step: undo move
        pos.undo_move(m);

        debug_assert!(value > -Value::INFINITE && value < Value::INFINITE);

        // Step: check for a new best move
        if ctx.ctrl.stopped() {
            return Value::ZERO;
        }

        if root_node {
            let rm_idx = pos
                .root_moves
                .iter()
                .position(|rm| rm.pv[0] == m)
                .unwrap();
            if move_count == 1 || value > alpha {
                let new_pv = extract_pv(pos, ctx, m);
                pos.root_moves[rm_idx].score = value;
                pos.root_moves[rm_idx].sel_depth = pos.sel_depth;
                pos.root_moves[rm_idx].pv = new_pv;
                if move_count > 1 && pos.is_main {
                    pos.best_move_changes += 1.0;
                }
            } else {
                pos.root_moves[rm_idx].score = -Value::INFINITE;
            }
        }

        if value > best_value {
            best_value = value;

            if value > alpha {
                best_move = m;

                if pv_node && !root_node {
                    // The PV is recovered from the transposition table.
                }

                if pv_node && value < beta {
                    alpha = value;
                } else {
                    debug_assert!(value >= beta); // Fail high
                    break;
                }
            }
        }

        if m != best_move {
            if capture_or_promotion && captures_searched.len() < 32 {
                captures_searched.push(m);
            } else if !capture_or_promotion && quiets_searched.len() < 64 {
                quiets_searched.push(m);
            }
        }
    }

    // Step: check for mate and stalemate
    if move_count == 0 {
        best_value = if excluded_move != Move::NONE {
            alpha
        } else if in_check {
            mated_in(ply)
        } else {
            pos.stalemate_value(ply, draw_value)
        };
    } else if best_move != Move::NONE {
        // Quiet best move: update move sorting heuristics
        if !pos.capture_or_promotion(best_move) {
            update_quiet_stats(pos, stack, idx, best_move, stat_bonus(depth));
            for &q in &quiets_searched {
                let pc = pos.moved_piece(q);
                pos.main_history
                    .update(pos.side_to_move(), q, -stat_bonus(depth));
                update_continuation_histories(stack, idx, pc, q.to(), -stat_bonus(depth));
            }
        } else {
            pos.capture_history.update(
                pos.moved_piece(best_move),
                best_move.to(),
                captured_type(pos, best_move),
                stat_bonus(depth),
            );
        }
        for &c in &captures_searched {
            pos.capture_history.update(
                pos.moved_piece(c),
                c.to(),
                captured_type(pos, c),
                -stat_bonus(depth),
            );
        }

        // Extra penalty for the TT move at previous ply when this node
        // fails low.
    } else if depth.0 >= 3
        && pos.captured_piece() == Piece::NO_PIECE
        && stack[idx - 1].current_move.is_ok()
        && stack[idx - 1].current_move.move_type() != MoveType::Drop
    {
        let prev_to = stack[idx - 1].current_move.to();
        let prev_piece = pos.piece_on(prev_to);
        update_continuation_histories(stack, idx - 1, prev_piece, prev_to, -stat_bonus(depth));
    }

    if excluded_move == Move::NONE {
        let bound = if best_value >= beta {
            Bound::LOWER
        } else if pv_node && best_move != Move::NONE {
            Bound::EXACT
        } else {
            Bound::UPPER
        };
        ctx.tt.store(
            pos_key,
            value_to_tt(best_value, ply),
            bound,
            depth,
            best_move,
            stack[idx].static_eval,
        );
    }

    debug_assert!(best_value > -Value::INFINITE && best_value < Value::INFINITE);

    best_value
}

fn captured_type(pos: &Position, m: Move) -> PieceType {
    if m.move_type() == MoveType::EnPassant {
        PieceType::PAWN
    } else {
        pos.piece_on(m.to()).piece_type()
    }
}

// qsearch() is the quiescence search function, called by the main search
// with zero depth, or recursively with further decreasing depth.
#[allow(clippy::too_many_arguments)]
#[allow(clippy::too_many_lines)]
fn qsearch(
    pos: &mut Position,
    ctx: &mut SearchCtx,
    stack: &mut Vec<Stack>,
    ply: i32,
    mut alpha: Value,
    beta: Value,
    depth: Depth,
    pv_node: bool,
) -> Value {
    debug_assert!(alpha >= -Value::INFINITE && alpha < beta && beta <= Value::INFINITE);
    debug_assert!(depth <= Depth::ZERO);

    let idx = (ply + 5) as usize;
    let in_check = pos.checkers() != 0;
    let draw_value = ctx.draw_value(pos);
    let old_alpha = alpha;

    stack[idx].ply = ply;

    check_time(pos, ctx);

    if pos.sel_depth < ply + 1 {
        pos.sel_depth = ply + 1;
    }

    if let Some(v) = pos.variant_result(ply, draw_value) {
        return v;
    }
    if ctx.ctrl.stopped() || pos.is_draw(ply) || ply >= MAX_PLY {
        return if ply >= MAX_PLY && !in_check {
            evaluate::evaluate(pos)
        } else {
            draw_value
        };
    }

    // Decide whether to include checks: only at the first ply of the
    // quiescence search.
    let tt_depth = if in_check || depth >= Depth::QS_CHECKS {
        Depth::QS_CHECKS
    } else {
        Depth::QS_NO_CHECKS
    };

    // Transposition table lookup
    let pos_key = pos.key();
    let tt_hit = ctx.tt.probe(pos_key);
    let (tt_move, tt_value, tt_eval, tt_entry_depth, tt_bound) = match tt_hit {
        Some(hit) => (
            hit.mv,
            value_from_tt(hit.value, ply),
            hit.eval,
            hit.depth,
            hit.bound,
        ),
        None => (Move::NONE, Value::NONE, Value::NONE, Depth::NONE, Bound::NONE),
    };

    if !pv_node
        && tt_hit.is_some()
        && tt_entry_depth >= tt_depth
        && tt_value != Value::NONE
        && (if tt_value >= beta {
            tt_bound & Bound::LOWER != 0
        } else {
            tt_bound & Bound::UPPER != 0
        })
    {
        return tt_value;
    }

    // Evaluate the position statically
    let mut best_value;
    let futility_base;
    if in_check {
        stack[idx].static_eval = Value::NONE;
        best_value = -Value::INFINITE;
        futility_base = -Value::INFINITE;
    } else {
        if tt_hit.is_some() {
            best_value = if tt_eval == Value::NONE {
                evaluate::evaluate(pos)
            } else {
                tt_eval
            };
            stack[idx].static_eval = best_value;

            if tt_value != Value::NONE
                && tt_bound
                    & (if tt_value > best_value {
                        Bound::LOWER
                    } else {
                        Bound::UPPER
                    })
                    != 0
            {
                best_value = tt_value;
            }
        } else {
            best_value = if stack[idx - 1].current_move != Move::NULL {
                evaluate::evaluate(pos)
            } else {
                -stack[idx - 1].static_eval + 2 * crate::types::TEMPO
            };
            stack[idx].static_eval = best_value;
        }

        // Stand pat
        if best_value >= beta {
            if tt_hit.is_none() {
                ctx.tt.store(
                    pos_key,
                    value_to_tt(best_value, ply),
                    Bound::LOWER,
                    Depth::NONE,
                    Move::NONE,
                    stack[idx].static_eval,
                );
            }
            return best_value;
        }

        if pv_node && best_value > alpha {
            alpha = best_value;
        }

        futility_base = best_value + 128;
    }

    // Loop through the moves until no moves remain or a beta cutoff
    let recapture_sq = if stack[idx - 1].current_move.is_ok() {
        stack[idx - 1].current_move.to()
    } else {
        Square::NONE
    };
    let mut mp = MovePickerQ::new(pos, tt_move, depth, recapture_sq);
    let mut best_move = Move::NONE;
    let mut move_count = 0;

    loop {
        let m = mp.next_move(pos);
        if m == Move::NONE {
            break;
        }
        debug_assert!(m.is_ok());

        let gives_check = pos.gives_check(m);
        move_count += 1;

        // Futility pruning
        if !in_check
            && !gives_check
            && futility_base > -Value::KNOWN_WIN
            && m.move_type() != MoveType::Drop
            && !pos.advanced_pawn_push(m)
        {
            let futility_value = futility_base
                + crate::types::piece_value_var(pos.variant(), EG, pos.piece_on(m.to()));

            if futility_value <= alpha {
                best_value = std::cmp::max(best_value, futility_value);
                continue;
            }

            if futility_base <= alpha && !pos.see_ge(m, Value(1)) {
                best_value = std::cmp::max(best_value, futility_base);
                continue;
            }
        }

        // Do not search moves with negative SEE values
        let evasion_prunable = in_check
            && (depth != Depth::ZERO || move_count > 2)
            && best_value > Value::MATED_IN_MAX_PLY
            && !pos.capture(m);
        if (!in_check || evasion_prunable)
            && m.move_type() != MoveType::Promotion
            && !pos.see_ge(m, Value::ZERO)
        {
            continue;
        }

        // Check for legality just before making the move
        if !pos.legal(m) {
            move_count -= 1;
            continue;
        }

        stack[idx].current_move = m;
        stack[idx].cont_history = pos.cont_history.get(pos.moved_piece(m), m.to());

        pos.do_move(m, gives_check);
        let value = -qsearch(
            pos,
            ctx,
            stack,
            ply + 1,
            -beta,
            -alpha,
            depth - ONE_PLY,
            pv_node,
        );
        pos.undo_move(m);

        debug_assert!(value > -Value::INFINITE && value < Value::INFINITE);

        if value > best_value {
            best_value = value;

            if value > alpha {
                best_move = m;

                if pv_node && value < beta {
                    alpha = value;
                } else {
                    break; // Fail high
                }
            }
        }
    }

    // No legal moves while in check: checkmate (or the variant's analog).
    if in_check && best_value == -Value::INFINITE {
        return mated_in(ply);
    }

    let bound = if best_value >= beta {
        Bound::LOWER
    } else if pv_node && best_value > old_alpha {
        Bound::EXACT
    } else {
        Bound::UPPER
    };
    ctx.tt.store(
        pos_key,
        value_to_tt(best_value, ply),
        bound,
        tt_depth,
        best_move,
        stack[idx].static_eval,
    );

    debug_assert!(best_value > -Value::INFINITE && best_value < Value::INFINITE);

    best_value
}

// update_quiet_stats() updates killers, history, countermove and
// countermove plus follow-up move history when a new quiet best move is
// found.
fn update_quiet_stats(pos: &Position, stack: &mut [Stack], idx: usize, m: Move, bonus: i32) {
    if stack[idx].killers[0] != m {
        stack[idx].killers[1] = stack[idx].killers[0];
        stack[idx].killers[0] = m;
    }

    let us = pos.side_to_move();
    pos.main_history.update(us, m, bonus);
    update_continuation_histories(stack, idx, pos.moved_piece(m), m.to(), bonus);

    if stack[idx - 1].current_move.is_ok()
        && stack[idx - 1].current_move.move_type() != MoveType::Drop
    {
        let prev_sq = stack[idx - 1].current_move.to();
        pos.counter_moves.set(pos.piece_on(prev_sq), prev_sq, m);
    }
}

// update_continuation_histories() updates the histories of the move pairs
// formed by the current move at one, two and four plies back.
fn update_continuation_histories(
    stack: &mut [Stack],
    idx: usize,
    pc: Piece,
    to: Square,
    bonus: i32,
) {
    for back in &[1usize, 2, 4] {
        if stack[idx - back].current_move.is_ok() {
            stack[idx - back].cont_history.update(pc, to, bonus);
        }
    }
}

// extract_pv() reconstructs the principal variation of a root move from
// the transposition table.
fn extract_pv(pos: &mut Position, ctx: &SearchCtx, first: Move) -> Vec<Move> {
    let mut pv = vec![first];
    let mut undo = Vec::new();

    let gives_check = pos.gives_check(first);
    pos.do_move(first, gives_check);
    undo.push(first);

    while pv.len() < MAX_PLY as usize {
        let m = match ctx.tt.probe(pos.key()) {
            Some(hit) => hit.mv,
            None => break,
        };
        if m == Move::NONE || !pos.pseudo_legal(m) || !pos.legal(m) {
            break;
        }
        // A repetition inside the PV would loop forever.
        if pos.is_draw(2) {
            break;
        }
        pv.push(m);
        let gives_check = pos.gives_check(m);
        pos.do_move(m, gives_check);
        undo.push(m);
    }

    for m in undo.into_iter().rev() {
        pos.undo_move(m);
    }
    pv
}

// print_pv() emits the "info" line for every active PV at the end of an
// iteration.
fn print_pv(pos: &Position, ctx: &SearchCtx, depth: Depth, alpha: Value, beta: Value) {
    let elapsed = std::cmp::max(timeman::elapsed(ctx.limits), 1);
    let nodes = ctx.ctrl.nodes.load(Ordering::Relaxed) + pos.nodes;
    let multi_pv = std::cmp::min(
        ucioption::get_u32("MultiPV") as usize,
        pos.root_moves.len(),
    );

    for i in 0..multi_pv {
        let updated = pos.root_moves[i].score != -Value::INFINITE;
        if depth == ONE_PLY && !updated {
            continue;
        }

        let (d, v) = if updated {
            (depth, pos.root_moves[i].score)
        } else {
            (depth - ONE_PLY, pos.root_moves[i].previous_score)
        };
        if v == -Value::INFINITE {
            continue;
        }

        let mut line = format!(
            "info depth {} seldepth {} multipv {} score {}",
            d.0,
            pos.root_moves[i].sel_depth,
            i + 1,
            uci::value(v)
        );
        if i == pos.pv_idx {
            if v >= beta {
                line.push_str(" lowerbound");
            } else if v <= alpha {
                line.push_str(" upperbound");
            }
        }
        line.push_str(&format!(
            " nodes {} nps {} hashfull {} tbhits {} time {} pv",
            nodes,
            nodes * 1000 / elapsed as u64,
            ctx.tt.hashfull(),
            pos.tb_hits,
            elapsed
        ));
        for m in &pos.root_moves[i].pv {
            line.push(' ');
            line.push_str(&uci::move_str(*m, pos.is_chess960()));
        }
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threads;
    use crate::types::variant::Variant;
    use std::sync::Arc;

    fn run_search(fen: &str, v: Variant, depth: i32) -> threads::SearchResult {
        crate::init_for_test();
        let spec = threads::RootSpec {
            fen: String::from(fen),
            moves: Vec::new(),
            variant: v,
            chess960: false,
        };
        let tt = Arc::new(TranspositionTable::new(16));
        let ctrl = Arc::new(ThreadCtrl::new());
        let mut limits = LimitsType::new();
        limits.depth = depth;
        threads::start_thinking(&spec, &tt, &limits, &ctrl, 1)
    }

    #[test]
    fn test_mate_in_one() {
        let result = run_search("6k1/5ppp/8/8/8/8/5PPP/4R1K1 w - - 0 1", Variant::Chess, 4);
        assert_eq!(result.score, mate_in(1));
        assert_eq!(
            result.pv.first().map(|m| uci::move_str(*m, false)),
            Some(String::from("e1e8"))
        );
    }

    #[test]
    fn test_three_check_mate_in_one() {
        // One check remaining for white: any check ends the game.
        let result = run_search(
            "rnbqkbnr/ppp2ppp/3p4/4p3/2B1P3/8/PPPP1PPP/RNBQK1NR w KQkq - 0 3 +1+3",
            Variant::ThreeCheck,
            4,
        );
        assert_eq!(result.score, mate_in(1));
        assert_eq!(result.pv.len(), 1);
    }

    #[test]
    fn test_kpk_draw_recognized_by_search() {
        // Rook pawn against the corner king is a book draw.
        let result = run_search("k7/8/K7/P7/8/8/8/8 b - - 0 1", Variant::Chess, 12);
        assert!(result.score.abs() <= Value(50), "score {}", result.score.0);
    }

    #[test]
    fn test_back_rank_defense_found() {
        // White must spot the back-rank weakness: Re8 trades into a won
        // pawn ending is not available, instead the search must not lose
        // material at depth 6.
        let result = run_search(
            "r5k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1",
            Variant::Chess,
            6,
        );
        assert!(result.score.abs() < Value(200));
    }

    #[test]
    fn test_koth_reaches_center() {
        // Kd3-d4 enters the hill and wins on the spot.
        let result = run_search("8/8/8/8/8/3K4/8/2k5 w - - 0 1", Variant::Koth, 4);
        assert_eq!(result.score, mate_in(1));
    }
}
