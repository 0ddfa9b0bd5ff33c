// SPDX-License-Identifier: GPL-3.0-or-later

use crate::types::bound::Bound;
use crate::types::depth::Depth;
use crate::types::key::Key;
use crate::types::{Move, Value};

use std::sync::atomic::{AtomicU16, AtomicU64, AtomicU8, Ordering};

// A TTEntry is a 10-byte transposition table entry:
//
// key        16 bit
// move       16 bit
// value      16 bit
// eval value 16 bit
// generation  6 bit
// bound type  2 bit
// depth       8 bit
//
// The first four fields share one atomic word, generation/bound/depth the
// second. All loads and stores are relaxed: a torn entry either fails the
// 16-bit key test or produces a move that pseudo_legal() rejects, so the
// table is advisory, never authoritative.
struct TTEntry {
    data: AtomicU64,
    gen_depth: AtomicU16,
}

const CLUSTER_SIZE: usize = 3;

struct Cluster {
    entry: [TTEntry; CLUSTER_SIZE],
    _padding: u32,
}

#[derive(Clone, Copy)]
pub struct TTHit {
    pub value: Value,
    pub eval: Value,
    pub depth: Depth,
    pub bound: Bound,
    pub mv: Move,
}

fn pack_data(key16: u16, m: Move, value: Value, eval: Value) -> u64 {
    (u64::from(key16))
        | (u64::from(m.0 as u16) << 16)
        | ((value.0 as i16 as u16 as u64) << 32)
        | ((eval.0 as i16 as u16 as u64) << 48)
}

fn unpack_key(data: u64) -> u16 {
    data as u16
}

fn unpack_move(data: u64) -> Move {
    Move(u32::from((data >> 16) as u16))
}

fn unpack_value(data: u64) -> Value {
    Value(i32::from((data >> 32) as u16 as i16))
}

fn unpack_eval(data: u64) -> Value {
    Value(i32::from((data >> 48) as u16 as i16))
}

fn pack_gen_depth(generation: u8, bound: Bound, depth: Depth) -> u16 {
    u16::from(generation | bound.0 as u8) | (((depth.0 - Depth::NONE.0) as u16) << 8)
}

fn unpack_bound(gd: u16) -> Bound {
    Bound(u32::from(gd) & 0x3)
}

fn unpack_generation(gd: u16) -> u8 {
    (gd as u8) & 0xfc
}

fn unpack_depth(gd: u16) -> Depth {
    Depth(i32::from((gd >> 8) as u8) + Depth::NONE.0)
}

pub struct TranspositionTable {
    clusters: Vec<Cluster>,
    cluster_mask: u64,
    generation: AtomicU8,
}

impl TranspositionTable {
    pub fn new(mb_size: usize) -> TranspositionTable {
        let mut tt = TranspositionTable {
            clusters: Vec::new(),
            cluster_mask: 0,
            generation: AtomicU8::new(0),
        };
        tt.resize(mb_size);
        tt
    }

    // resize() sets the size of the table, measured in megabytes, rounded
    // down to a power of two number of clusters.
    pub fn resize(&mut self, mb_size: usize) {
        let bytes = mb_size * 1024 * 1024;
        let count = (bytes / std::mem::size_of::<Cluster>()).next_power_of_two();
        let count = if count * std::mem::size_of::<Cluster>() > bytes {
            std::cmp::max(1, count / 2)
        } else {
            std::cmp::max(1, count)
        };

        self.clusters = Vec::with_capacity(count);
        for _ in 0..count {
            self.clusters.push(Cluster {
                entry: [
                    TTEntry {
                        data: AtomicU64::new(0),
                        gen_depth: AtomicU16::new(0),
                    },
                    TTEntry {
                        data: AtomicU64::new(0),
                        gen_depth: AtomicU16::new(0),
                    },
                    TTEntry {
                        data: AtomicU64::new(0),
                        gen_depth: AtomicU16::new(0),
                    },
                ],
                _padding: 0,
            });
        }
        self.cluster_mask = (count - 1) as u64;
    }

    // clear() overwrites the entire transposition table with zeros. The
    // work can be split between helper threads.
    pub fn clear_range(&self, thread_no: usize, total_threads: usize) {
        let chunk = (self.clusters.len() + total_threads - 1) / total_threads;
        let begin = std::cmp::min(thread_no * chunk, self.clusters.len());
        let end = std::cmp::min(begin + chunk, self.clusters.len());
        for cluster in &self.clusters[begin..end] {
            for e in &cluster.entry {
                e.data.store(0, Ordering::Relaxed);
                e.gen_depth.store(0, Ordering::Relaxed);
            }
        }
    }

    pub fn clear(&self) {
        self.clear_range(0, 1);
        self.generation.store(0, Ordering::Relaxed);
    }

    // new_search() is called at the beginning of every root search to age
    // out entries from previous searches. The lower 2 bits are used by the
    // bound type.
    pub fn new_search(&self) {
        self.generation.fetch_add(4, Ordering::Relaxed);
    }

    pub fn generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed) & 0xfc
    }

    fn cluster_index(&self, key: Key) -> usize {
        (key.0 & self.cluster_mask) as usize
    }

    // probe() looks up the current position in the transposition table. A
    // hit also refreshes the entry's generation to protect it from early
    // replacement.
    pub fn probe(&self, key: Key) -> Option<TTHit> {
        let key16 = (key.0 >> 48) as u16;
        let cluster = &self.clusters[self.cluster_index(key)];

        for e in &cluster.entry {
            let data = e.data.load(Ordering::Relaxed);
            if unpack_key(data) == key16 && data != 0 {
                let gd = e.gen_depth.load(Ordering::Relaxed);
                // Refresh generation
                e.gen_depth.store(
                    pack_gen_depth(self.generation(), unpack_bound(gd), unpack_depth(gd)),
                    Ordering::Relaxed,
                );
                return Some(TTHit {
                    value: unpack_value(data),
                    eval: unpack_eval(data),
                    depth: unpack_depth(gd),
                    bound: unpack_bound(gd),
                    mv: unpack_move(data),
                });
            }
        }
        None
    }

    // store() saves the given data in the cluster of the key. The victim
    // is an empty slot, the slot of the same position, or the entry whose
    // depth minus twice its age distance is the smallest.
    pub fn store(&self, key: Key, value: Value, bound: Bound, depth: Depth, m: Move, eval: Value) {
        let key16 = (key.0 >> 48) as u16;
        let cluster = &self.clusters[self.cluster_index(key)];
        let generation = self.generation();

        let mut replace = 0;
        let mut replace_score = i32::MAX;
        for (i, e) in cluster.entry.iter().enumerate() {
            let data = e.data.load(Ordering::Relaxed);
            if data == 0 {
                replace = i;
                replace_score = i32::MIN;
                break;
            }
            if unpack_key(data) == key16 {
                replace = i;
                replace_score = i32::MIN;
                break;
            }
            let gd = e.gen_depth.load(Ordering::Relaxed);
            let age_diff =
                i32::from(generation.wrapping_sub(unpack_generation(gd)) & 0xfc) >> 2;
            let score = unpack_depth(gd).0 - 2 * age_diff;
            if score < replace_score {
                replace_score = score;
                replace = i;
            }
        }

        let e = &cluster.entry[replace];
        let old_data = e.data.load(Ordering::Relaxed);
        let old_gd = e.gen_depth.load(Ordering::Relaxed);

        // Preserve any existing move for the same position
        let m = if m == Move::NONE && unpack_key(old_data) == key16 {
            unpack_move(old_data)
        } else {
            m
        };

        // Don't overwrite deeper, recent information about the same position
        // unless the new bound is exact.
        if bound != Bound::EXACT
            && unpack_key(old_data) == key16
            && depth.0 < unpack_depth(old_gd).0 - 4
        {
            return;
        }

        e.data
            .store(pack_data(key16, m, value, eval), Ordering::Relaxed);
        e.gen_depth
            .store(pack_gen_depth(generation, bound, depth), Ordering::Relaxed);
    }

    // hashfull() returns an approximation of the table fill level in
    // permille, sampling the first clusters.
    pub fn hashfull(&self) -> i32 {
        let generation = self.generation();
        let sample = std::cmp::min(333, self.clusters.len());
        let mut cnt = 0;
        for cluster in &self.clusters[..sample] {
            for e in &cluster.entry {
                if e.data.load(Ordering::Relaxed) != 0
                    && unpack_generation(e.gen_depth.load(Ordering::Relaxed)) == generation
                {
                    cnt += 1;
                }
            }
        }
        (cnt * 1000 / (sample as i32 * CLUSTER_SIZE as i32)).min(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_probe_round_trip() {
        let tt = TranspositionTable::new(1);
        let key = Key(0x1234_5678_9abc_def0);
        let m = Move::make(crate::types::Square(12), crate::types::Square(28));
        tt.store(key, Value(123), Bound::EXACT, Depth(7), m, Value(99));

        let hit = tt.probe(key).expect("entry vanished");
        assert_eq!(hit.value, Value(123));
        assert_eq!(hit.eval, Value(99));
        assert_eq!(hit.depth, Depth(7));
        assert_eq!(hit.bound, Bound::EXACT);
        assert_eq!(hit.mv, m);
    }

    #[test]
    fn test_miss_on_unknown_key() {
        let tt = TranspositionTable::new(1);
        assert!(tt.probe(Key(0xdead_beef_0000_0001)).is_none());
    }

    #[test]
    fn test_negative_values_survive() {
        let tt = TranspositionTable::new(1);
        let key = Key(0x0f0f_0f0f_0f0f_0f0f);
        tt.store(
            key,
            Value(-31000),
            Bound::LOWER,
            Depth(3),
            Move::NONE,
            Value(-250),
        );
        let hit = tt.probe(key).unwrap();
        assert_eq!(hit.value, Value(-31000));
        assert_eq!(hit.eval, Value(-250));
        assert_eq!(hit.bound, Bound::LOWER);
    }

    #[test]
    fn test_aging_prefers_old_victims() {
        let tt = TranspositionTable::new(1);
        let base = Key(0x42);
        tt.store(base, Value(1), Bound::EXACT, Depth(20), Move::NONE, Value(0));
        tt.new_search();
        // After aging, a fresh shallow entry may evict the stale deep one
        // only when it scores better; the key from the old search is still
        // probeable until then.
        assert!(tt.probe(base).is_some());
    }

    #[test]
    fn test_clear_empties_table() {
        let tt = TranspositionTable::new(1);
        let key = Key(0x7777_7777_7777_7777);
        tt.store(key, Value(5), Bound::UPPER, Depth(1), Move::NONE, Value(5));
        tt.clear();
        assert!(tt.probe(key).is_none());
    }
}
