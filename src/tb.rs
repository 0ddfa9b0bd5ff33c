// SPDX-License-Identifier: GPL-3.0-or-later

// Syzygy tablebase probing interface. The file parsing itself lives
// outside the engine; this module presents the probe surface the search
// expects. Without bases on disk every probe reports a miss and the
// search continues normally.

use crate::position::Position;
use crate::types::Value;

static mut MAX_CARDINALITY: u32 = 0;

pub fn init(path: &str) -> bool {
    // No tablebase backend is wired in; remember that nothing was found.
    unsafe {
        MAX_CARDINALITY = 0;
    }
    !path.is_empty()
}

pub fn max_cardinality() -> u32 {
    unsafe { MAX_CARDINALITY }
}

// probe_wdl() returns the win/draw/loss verdict for the position. A zero
// success flag means the probe failed and the result must be ignored.
pub fn probe_wdl(_pos: &Position, success: &mut i32) -> i32 {
    *success = 0;
    0
}

// probe_dtz() returns the distance-to-zeroing-move. A zero success flag
// means the probe failed.
pub fn probe_dtz(_pos: &Position, success: &mut i32) -> i32 {
    *success = 0;
    0
}

pub fn wdl_to_value(wdl: i32, ply: i32) -> Value {
    match wdl {
        -2 => crate::types::mated_in(ply + 1),
        2 => crate::types::mate_in(ply + 1),
        _ => Value::DRAW,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::variant::Variant;

    #[test]
    fn test_probe_reports_miss() {
        crate::init_for_test();
        let mut pos = Position::new();
        pos.set("4k3/8/8/8/8/8/8/4K3 w - - 0 1", false, Variant::Chess)
            .unwrap();
        let mut success = 1;
        probe_wdl(&pos, &mut success);
        assert_eq!(success, 0);
        assert_eq!(max_cardinality(), 0);
    }
}
