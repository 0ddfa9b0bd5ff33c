// SPDX-License-Identifier: GPL-3.0-or-later

// The UCI protocol driver: line-based commands on stdin, engine output on
// stdout. Searches run on a dedicated thread so that "stop" and
// "ponderhit" keep being served.

use crate::misc;
use crate::movegen::{self, Legal, MoveList};
use crate::position::Position;
use crate::search::LimitsType;
use crate::threads::{self, RootSpec, ThreadCtrl};
use crate::tt::TranspositionTable;
use crate::types::variant::Variant;
use crate::types::{Move, MoveType, Square, Value, FILE_A, RANK_1};
use crate::ucioption;

use log::warn;
use std::io::BufRead;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

// square() converts a Square to a string in coordinate notation (g1, a7).
pub fn square(s: Square) -> String {
    let mut out = String::with_capacity(2);
    out.push((b'a' + (s.file() - FILE_A) as u8) as char);
    out.push((b'1' + (s.rank() - RANK_1) as u8) as char);
    out
}

// move_str() converts a Move to a string in long algebraic notation. The
// only special cases are castling, where the black box encoding is "king
// captures rook" and printed either way the GUI expects, drops, and
// promotions including the king promotion of the giveaway family.
pub fn move_str(m: Move, chess960: bool) -> String {
    if m == Move::NONE {
        return String::from("(none)");
    }
    if m == Move::NULL {
        return String::from("0000");
    }

    if m.move_type() == MoveType::Drop {
        let pc = m.dropped_piece();
        let letter = crate::position::PIECE_TO_CHAR
            .chars()
            .nth(pc.piece_type().0 as usize)
            .unwrap();
        return format!("{}@{}", letter, square(m.to()));
    }

    let from = m.from();
    let mut to = m.to();

    if m.move_type() == MoveType::Castling && !chess960 {
        to = Square::make(if to > from { 6 } else { 2 }, from.rank());
    }

    let mut s = format!("{}{}", square(from), square(to));

    if m.move_type() == MoveType::Promotion {
        s.push(
            crate::position::PIECE_TO_CHAR
                .chars()
                .nth(8 + m.promotion_type().0 as usize)
                .unwrap(),
        );
    }

    s
}

// to_move() converts a string to the corresponding legal Move, if any.
pub fn to_move(pos: &Position, s: &str) -> Option<Move> {
    MoveList::new::<Legal>(pos)
        .iter()
        .find(|m| move_str(*m, pos.is_chess960()) == s)
}

// value() converts a Value to the "cp <x>" or "mate <y>" protocol string.
pub fn value(v: Value) -> String {
    if v.abs() < Value::MATE_IN_MAX_PLY {
        format!("cp {}", v.0 * 100 / Value::PawnValueEg.0)
    } else {
        let dist = if v > Value::ZERO {
            (Value::MATE.0 - v.0 + 1) / 2
        } else {
            -(Value::MATE.0 + v.0 + 1) / 2
        };
        format!("mate {dist}")
    }
}

struct UciState {
    fen: String,
    moves: Vec<String>,
    variant: Variant,
    chess960: bool,
    tt: Arc<TranspositionTable>,
    ctrl: Arc<ThreadCtrl>,
    searcher: Option<JoinHandle<()>>,
}

impl UciState {
    fn new() -> UciState {
        UciState {
            fen: String::from(Variant::Chess.start_fen()),
            moves: Vec::new(),
            variant: Variant::Chess,
            chess960: false,
            tt: Arc::new(TranspositionTable::new(
                ucioption::get_i64("Hash") as usize
            )),
            ctrl: Arc::new(ThreadCtrl::new()),
            searcher: None,
        }
    }

    fn wait_for_search(&mut self) {
        if let Some(handle) = self.searcher.take() {
            self.ctrl.stop.store(true, Ordering::Relaxed);
            let _ = handle.join();
        }
    }

    fn build_position(&self) -> Option<Position> {
        let mut pos = Position::new();
        if let Err(e) = pos.set(&self.fen, self.chess960, self.variant) {
            warn!("rejecting position: {e}");
            return None;
        }
        for ms in &self.moves {
            match to_move(&pos, ms) {
                Some(m) => {
                    let gives_check = pos.gives_check(m);
                    pos.do_move(m, gives_check);
                }
                None => {
                    warn!("ignoring illegal move {ms}");
                    return None;
                }
            }
        }
        Some(pos)
    }

    fn cmd_position(&mut self, args: &[&str]) {
        let mut fen = String::new();
        let mut moves = Vec::new();
        let mut it = args.iter();

        match it.next() {
            Some(&"startpos") => {
                fen = String::from(self.variant.start_fen());
                if let Some(&"moves") = it.next() {
                    moves = it.map(|s| String::from(*s)).collect();
                }
            }
            Some(&"fen") => {
                let mut in_moves = false;
                for tok in it {
                    if *tok == "moves" {
                        in_moves = true;
                    } else if in_moves {
                        moves.push(String::from(*tok));
                    } else {
                        if !fen.is_empty() {
                            fen.push(' ');
                        }
                        fen.push_str(tok);
                    }
                }
            }
            _ => return,
        }

        let old_fen = std::mem::replace(&mut self.fen, fen);
        let old_moves = std::mem::replace(&mut self.moves, moves);

        // Parse eagerly; a bad FEN or an illegal move leaves the previous
        // position in place.
        if self.build_position().is_none() {
            self.fen = old_fen;
            self.moves = old_moves;
        }
    }

    fn cmd_setoption(&mut self, args: &[&str]) {
        // setoption name <name tokens> [value <value tokens>]
        let mut name = String::new();
        let mut val = String::new();
        let mut in_value = false;
        for tok in args {
            match *tok {
                "name" => {}
                "value" => in_value = true,
                t => {
                    let target = if in_value { &mut val } else { &mut name };
                    if !target.is_empty() {
                        target.push(' ');
                    }
                    target.push_str(t);
                }
            }
        }

        if !ucioption::set(&name, &val) {
            warn!("unknown option: {name}");
            return;
        }

        match name.as_str() {
            "Hash" => {
                self.wait_for_search();
                if let Some(tt) = Arc::get_mut(&mut self.tt) {
                    tt.resize(ucioption::get_i64("Hash") as usize);
                }
            }
            "Clear Hash" => {
                self.wait_for_search();
                self.tt.clear();
            }
            "UCI_Variant" => {
                if let Some(v) = Variant::from_name(&ucioption::get_string("UCI_Variant")) {
                    self.variant = v;
                    self.fen = String::from(v.start_fen());
                    self.moves.clear();
                }
            }
            "UCI_Chess960" => {
                self.chess960 = ucioption::get_bool("UCI_Chess960");
            }
            "SyzygyPath" => {
                let path = ucioption::get_string("SyzygyPath");
                if !crate::tb::init(&path) {
                    warn!("no tablebases found at {path}");
                }
            }
            _ => {}
        }
    }

    fn cmd_go(&mut self, args: &[&str]) {
        self.wait_for_search();

        let mut limits = LimitsType::new();
        limits.start_time = Some(Instant::now());
        let mut it = args.iter().peekable();
        while let Some(tok) = it.next() {
            let mut num = |it: &mut std::iter::Peekable<std::slice::Iter<&str>>| -> i64 {
                it.next().and_then(|v| v.parse().ok()).unwrap_or(0)
            };
            match *tok {
                "wtime" => limits.time[0] = num(&mut it),
                "btime" => limits.time[1] = num(&mut it),
                "winc" => limits.inc[0] = num(&mut it),
                "binc" => limits.inc[1] = num(&mut it),
                "movestogo" => limits.movestogo = num(&mut it) as i32,
                "depth" => limits.depth = num(&mut it) as i32,
                "nodes" => limits.nodes = num(&mut it) as u64,
                "movetime" => limits.movetime = num(&mut it),
                "mate" => limits.mate = num(&mut it) as i32,
                "perft" => limits.perft = num(&mut it) as i32,
                "infinite" => limits.infinite = true,
                "ponder" => limits.ponder = true,
                "searchmoves" => {
                    while let Some(m) = it.peek() {
                        limits.searchmoves.push(String::from(**m));
                        it.next();
                    }
                }
                _ => {}
            }
        }

        let pos = match self.build_position() {
            Some(p) => p,
            None => return,
        };

        if limits.perft > 0 {
            let mut pos = pos;
            let start = Instant::now();
            let nodes = movegen::perft(&mut pos, limits.perft);
            let ms = start.elapsed().as_millis().max(1);
            println!("info string perft time {ms} ms nps {}", nodes as u128 * 1000 / ms);
            println!("Nodes searched: {nodes}");
            return;
        }

        self.ctrl = Arc::new(ThreadCtrl::new());
        self.ctrl.ponder.store(limits.ponder, Ordering::Relaxed);

        let spec = RootSpec {
            fen: self.fen.clone(),
            moves: self.moves.clone(),
            variant: self.variant,
            chess960: self.chess960,
        };
        let tt = Arc::clone(&self.tt);
        let ctrl = Arc::clone(&self.ctrl);
        let num_threads = ucioption::get_i64("Threads").max(1) as usize;

        self.searcher = Some(std::thread::spawn(move || {
            let result = threads::start_thinking(&spec, &tt, &limits, &ctrl, num_threads);

            // An infinite or pondering search reports only once the GUI
            // says stop or the ponder move was played.
            while (limits.infinite || ctrl.ponder.load(Ordering::Relaxed)) && !ctrl.stopped() {
                std::thread::sleep(std::time::Duration::from_millis(1));
            }

            match result.pv.first() {
                None => println!("bestmove (none)"),
                Some(best) => {
                    let best_str = move_str(*best, spec.chess960);
                    if let Some(ponder) = result.pv.get(1) {
                        println!(
                            "bestmove {} ponder {}",
                            best_str,
                            move_str(*ponder, spec.chess960)
                        );
                    } else {
                        println!("bestmove {best_str}");
                    }
                }
            }
        }));
    }
}

// cmd_loop() waits for a command from stdin, parses it and performs the
// corresponding action.
pub fn cmd_loop() {
    let mut state = UciState::new();
    let stdin = std::io::stdin();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        match tokens[0] {
            "uci" => {
                println!("id name {}", misc::engine_info(true));
                ucioption::print_all();
                println!("uciok");
            }
            "isready" => println!("readyok"),
            "setoption" => state.cmd_setoption(&tokens[1..]),
            "ucinewgame" => {
                state.wait_for_search();
                let num_threads = ucioption::get_i64("Threads").max(1) as usize;
                threads::clear_tt_parallel(&state.tt, num_threads);
            }
            "position" => state.cmd_position(&tokens[1..]),
            "go" => state.cmd_go(&tokens[1..]),
            "stop" => {
                state.ctrl.stop.store(true, Ordering::Relaxed);
            }
            "ponderhit" => {
                if state.ctrl.stop_on_ponderhit.load(Ordering::Relaxed) {
                    state.ctrl.stop.store(true, Ordering::Relaxed);
                }
                state.ctrl.ponder.store(false, Ordering::Relaxed);
            }
            "quit" => {
                state.wait_for_search();
                break;
            }
            "d" => {
                if let Some(pos) = state.build_position() {
                    println!("{pos}");
                }
            }
            _ => warn!("unknown command: {line}"),
        }
    }

    state.wait_for_search();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos_from(fen: &str, v: Variant) -> Position {
        crate::init_for_test();
        let mut pos = Position::new();
        pos.set(fen, false, v).unwrap();
        pos
    }

    #[test]
    fn test_square_names() {
        assert_eq!(square(Square::A1), "a1");
        assert_eq!(square(Square::H8), "h8");
        assert_eq!(square(Square::E4), "e4");
    }

    #[test]
    fn test_move_round_trip() {
        let pos = pos_from(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            Variant::Chess,
        );
        for m in MoveList::new::<Legal>(&pos).iter() {
            let s = move_str(m, false);
            assert_eq!(to_move(&pos, &s), Some(m));
        }
    }

    #[test]
    fn test_castling_rendering() {
        let pos = pos_from(
            "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1",
            Variant::Chess,
        );
        let moves: Vec<String> = MoveList::new::<Legal>(&pos)
            .iter()
            .map(|m| move_str(m, false))
            .collect();
        assert!(moves.contains(&String::from("e1g1")));
        assert!(moves.contains(&String::from("e1c1")));
    }

    #[test]
    fn test_drop_rendering() {
        let pos = pos_from(
            "rnb1kbnr/ppp1pppp/8/3p4/8/5N2/PPPPPPPP/RNBQKB1R[Qp] b KQkq - 0 4",
            Variant::Crazyhouse,
        );
        let moves: Vec<String> = MoveList::new::<Legal>(&pos)
            .iter()
            .map(|m| move_str(m, false))
            .collect();
        assert!(moves.iter().any(|s| s.contains('@')));
        for s in moves.iter().filter(|s| s.contains('@')) {
            assert!(to_move(&pos, s).is_some());
        }
    }

    #[test]
    fn test_king_promotion_rendering() {
        let pos = pos_from("8/4P3/8/8/7k/8/8/7K w - - 0 1", Variant::Anti);
        let moves: Vec<String> = MoveList::new::<Legal>(&pos)
            .iter()
            .map(|m| move_str(m, false))
            .collect();
        assert!(moves.contains(&String::from("e7e8k")));
        assert!(moves.contains(&String::from("e7e8q")));
    }

    #[test]
    fn test_value_strings() {
        assert_eq!(value(Value(Value::PawnValueEg.0)), "cp 100");
        assert_eq!(value(crate::types::mate_in(1)), "mate 1");
        assert_eq!(value(crate::types::mate_in(3)), "mate 2");
        assert_eq!(value(crate::types::mated_in(2)), "mate -1");
    }
}
