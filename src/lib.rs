// SPDX-License-Identifier: GPL-3.0-or-later

pub mod bitbases;
pub mod bitboard;
pub mod endgame;
pub mod evaluate;
pub mod material;
pub mod misc;
pub mod movegen;
pub mod movepick;
pub mod pawns;
pub mod position;
pub mod psqt;
pub mod search;
pub mod tb;
pub mod threads;
pub mod timeman;
pub mod tt;
pub mod types;
pub mod uci;
pub mod ucioption;

use std::sync::Once;

static INIT: Once = Once::new();

// Tests from any module funnel through here so the tables are only built once.
pub fn init_for_test() {
    INIT.call_once(init);
}

// One-time initialization of all precomputed tables. Must run before any
// Position is created.
pub fn init() {
    ucioption::init();
    bitboard::init();
    position::zobrist::init();
    position::init_cuckoo();
    psqt::init();
    bitbases::init();
    pawns::init();
    endgame::init();
    search::init();
}
