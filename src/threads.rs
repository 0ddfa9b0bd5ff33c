// SPDX-License-Identifier: GPL-3.0-or-later

// Lazy SMP driver: every worker runs its own iterative deepening loop over
// a private Position, sharing only the transposition table and the stop
// and ponder flags. The workers desynchronize through the skip-depth
// scheme inside the search itself.

use crate::position::Position;
use crate::search;
use crate::search::LimitsType;
use crate::timeman;
use crate::tt::TranspositionTable;
use crate::types::depth::Depth;
use crate::types::variant::Variant;
use crate::types::{Move, Value};
use crate::uci;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

pub struct ThreadCtrl {
    pub stop: AtomicBool,
    pub ponder: AtomicBool,
    pub stop_on_ponderhit: AtomicBool,
    // Node counts the workers flush periodically, so the main thread can
    // report fleet-wide totals.
    pub nodes: AtomicU64,
}

impl ThreadCtrl {
    pub fn new() -> ThreadCtrl {
        ThreadCtrl {
            stop: AtomicBool::new(false),
            ponder: AtomicBool::new(false),
            stop_on_ponderhit: AtomicBool::new(false),
            nodes: AtomicU64::new(0),
        }
    }

    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

impl Default for ThreadCtrl {
    fn default() -> Self {
        ThreadCtrl::new()
    }
}

// The root position is broadcast as FEN plus the move list, each worker
// replays it into a private Position.
#[derive(Clone)]
pub struct RootSpec {
    pub fen: String,
    pub moves: Vec<String>,
    pub variant: Variant,
    pub chess960: bool,
}

pub struct SearchResult {
    pub completed_depth: Depth,
    pub score: Value,
    pub pv: Vec<Move>,
}

fn build_position(spec: &RootSpec) -> Position {
    let mut pos = Position::new();
    pos.set(&spec.fen, spec.chess960, spec.variant)
        .expect("root position was validated before the search started");
    for ms in &spec.moves {
        if let Some(m) = uci::to_move(&pos, ms) {
            let gives_check = pos.gives_check(m);
            pos.do_move(m, gives_check);
        }
    }
    pos.alloc_tables();
    pos.cont_history.init();
    pos
}

// The position owns multi-megabyte history tables, so every worker gets a
// roomy stack of its own.
const WORKER_STACK_SIZE: usize = 64 * 1024 * 1024;

// start_thinking() launches the workers, waits for them and returns the
// best result over all of them. Worker 0 is the main thread: it drives the
// clock and is the only one that prints.
pub fn start_thinking(
    spec: &RootSpec,
    tt: &Arc<TranspositionTable>,
    limits: &LimitsType,
    ctrl: &Arc<ThreadCtrl>,
    num_threads: usize,
) -> SearchResult {
    tt.new_search();

    let mut handles = Vec::new();
    for idx in 0..num_threads {
        let spec = spec.clone();
        let tt = Arc::clone(tt);
        let limits = limits.clone();
        let ctrl = Arc::clone(ctrl);
        let handle = thread::Builder::new()
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || {
                let mut pos = build_position(&spec);
                pos.thread_idx = idx as i16;
                pos.is_main = idx == 0;
                pos.thread_ctrl = Some(Arc::clone(&ctrl));
                if pos.is_main {
                    timeman::init(&limits, pos.side_to_move(), pos.game_ply());
                }
                let result = search::think(&mut pos, &tt, &limits, &ctrl);
                if pos.is_main {
                    // The main thread is done: release the helpers.
                    ctrl.stop.store(true, Ordering::Relaxed);
                }
                result
            })
            .expect("failed to spawn search thread");
        handles.push(handle);
    }

    let mut best: Option<SearchResult> = None;
    for h in handles {
        if let Ok(result) = h.join() {
            best = Some(match best.take() {
                None => result,
                // Prefer a deeper search with a better score.
                Some(b)
                    if result.completed_depth >= b.completed_depth
                        && result.score > b.score
                        && !result.pv.is_empty() =>
                {
                    result
                }
                Some(b) => b,
            });
        }
    }

    best.expect("at least the main search thread reports a result")
}

// Helpers split the table clearing between them on ucinewgame.
pub fn clear_tt_parallel(tt: &Arc<TranspositionTable>, num_threads: usize) {
    let mut handles = Vec::new();
    for idx in 1..num_threads {
        let tt = Arc::clone(tt);
        handles.push(thread::spawn(move || {
            tt.clear_range(idx, num_threads);
        }));
    }
    tt.clear_range(0, num_threads);
    for h in handles {
        let _ = h.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_thread_mate_in_one() {
        crate::init_for_test();
        let spec = RootSpec {
            fen: String::from("6k1/5ppp/8/8/8/8/5PPP/4R1K1 w - - 0 1"),
            moves: Vec::new(),
            variant: Variant::Chess,
            chess960: false,
        };
        let tt = Arc::new(TranspositionTable::new(16));
        let ctrl = Arc::new(ThreadCtrl::new());
        let mut limits = LimitsType::new();
        limits.depth = 6;
        let result = start_thinking(&spec, &tt, &limits, &ctrl, 1);
        assert_eq!(
            result.pv.first().map(|m| uci::move_str(*m, false)),
            Some(String::from("e1e8"))
        );
        assert_eq!(result.score, crate::types::mate_in(1));
    }

    #[test]
    fn test_two_threads_agree_on_simple_position() {
        crate::init_for_test();
        let spec = RootSpec {
            fen: String::from("6k1/5ppp/8/8/8/8/5PPP/4R1K1 w - - 0 1"),
            moves: Vec::new(),
            variant: Variant::Chess,
            chess960: false,
        };
        let tt = Arc::new(TranspositionTable::new(16));
        let ctrl = Arc::new(ThreadCtrl::new());
        let mut limits = LimitsType::new();
        limits.depth = 6;
        let result = start_thinking(&spec, &tt, &limits, &ctrl, 2);
        assert_eq!(
            result.pv.first().map(|m| uci::move_str(*m, false)),
            Some(String::from("e1e8"))
        );
    }
}
