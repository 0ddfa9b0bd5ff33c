// SPDX-License-Identifier: GPL-3.0-or-later

// The UCI option registry. Values arriving from the protocol are clamped
// into their declared ranges; unknown options are reported by the caller.

use std::sync::Mutex;
use std::sync::OnceLock;

#[derive(Clone)]
pub enum OptionValue {
    Check(bool),
    Spin(i64, i64, i64), // value, min, max
    Combo(String, &'static [&'static str]),
    StringOpt(String),
    Button,
}

#[derive(Clone)]
struct Option_ {
    name: &'static str,
    value: OptionValue,
}

static OPTIONS: OnceLock<Mutex<Vec<Option_>>> = OnceLock::new();

fn options() -> &'static Mutex<Vec<Option_>> {
    OPTIONS.get_or_init(|| Mutex::new(Vec::new()))
}

const VARIANTS: &[&str] = &[
    "chess",
    "antichess",
    "atomic",
    "crazyhouse",
    "extinction",
    "grid",
    "horde",
    "kingofthehill",
    "losers",
    "racingkings",
    "3check",
    "twokings",
    "giveaway",
    "suicide",
    "bughouse",
    "loop",
    "placement",
    "knightrelay",
    "relay",
    "displacedgrid",
    "slippedgrid",
    "twokingssymmetric",
];

pub fn init() {
    let mut opts = options().lock().unwrap();
    if !opts.is_empty() {
        return;
    }
    let mut add = |name, value| opts.push(Option_ { name, value });

    add("Hash", OptionValue::Spin(16, 1, 131072));
    add("Threads", OptionValue::Spin(1, 1, 512));
    add("MultiPV", OptionValue::Spin(1, 1, 500));
    add("Contempt", OptionValue::Spin(20, -100, 100));
    add("Move Overhead", OptionValue::Spin(30, 0, 5000));
    add("Minimum Thinking Time", OptionValue::Spin(20, 0, 5000));
    add("Slow Mover", OptionValue::Spin(89, 10, 1000));
    add("Ponder", OptionValue::Check(false));
    add("UCI_Chess960", OptionValue::Check(false));
    add(
        "UCI_Variant",
        OptionValue::Combo(String::from("chess"), VARIANTS),
    );
    add("SyzygyPath", OptionValue::StringOpt(String::new()));
    add("SyzygyProbeDepth", OptionValue::Spin(1, 1, 100));
    add("Skill Level", OptionValue::Spin(20, 0, 20));
    add("Clear Hash", OptionValue::Button);
}

// set() assigns a new value to an option, clamping spins into their
// range. Returns false for unknown option names.
pub fn set(name: &str, value: &str) -> bool {
    let mut opts = options().lock().unwrap();
    for opt in opts.iter_mut() {
        if opt.name.eq_ignore_ascii_case(name) {
            match &mut opt.value {
                OptionValue::Check(b) => *b = value == "true",
                OptionValue::Spin(v, min, max) => {
                    if let Ok(parsed) = value.parse::<i64>() {
                        *v = parsed.clamp(*min, *max);
                    }
                }
                OptionValue::Combo(v, allowed) => {
                    let lower = value.to_ascii_lowercase();
                    if allowed.contains(&lower.as_str()) {
                        *v = lower;
                    }
                }
                OptionValue::StringOpt(v) => *v = String::from(value),
                OptionValue::Button => {}
            }
            return true;
        }
    }
    false
}

pub fn get_i64(name: &str) -> i64 {
    let opts = options().lock().unwrap();
    for opt in opts.iter() {
        if opt.name.eq_ignore_ascii_case(name) {
            if let OptionValue::Spin(v, _, _) = opt.value {
                return v;
            }
        }
    }
    0
}

pub fn get_u32(name: &str) -> u32 {
    get_i64(name).max(0) as u32
}

pub fn get_bool(name: &str) -> bool {
    let opts = options().lock().unwrap();
    for opt in opts.iter() {
        if opt.name.eq_ignore_ascii_case(name) {
            if let OptionValue::Check(b) = opt.value {
                return b;
            }
        }
    }
    false
}

pub fn get_string(name: &str) -> String {
    let opts = options().lock().unwrap();
    for opt in opts.iter() {
        if opt.name.eq_ignore_ascii_case(name) {
            match &opt.value {
                OptionValue::StringOpt(v) | OptionValue::Combo(v, _) => return v.clone(),
                _ => {}
            }
        }
    }
    String::new()
}

// print_all() emits the option list in the format the "uci" command
// expects.
pub fn print_all() {
    let opts = options().lock().unwrap();
    for opt in opts.iter() {
        match &opt.value {
            OptionValue::Check(b) => {
                println!("option name {} type check default {}", opt.name, b);
            }
            OptionValue::Spin(v, min, max) => {
                println!(
                    "option name {} type spin default {} min {} max {}",
                    opt.name, v, min, max
                );
            }
            OptionValue::Combo(v, allowed) => {
                print!("option name {} type combo default {}", opt.name, v);
                for a in allowed.iter() {
                    print!(" var {a}");
                }
                println!();
            }
            OptionValue::StringOpt(v) => {
                println!("option name {} type string default {}", opt.name, v);
            }
            OptionValue::Button => {
                println!("option name {} type button", opt.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spin_clamping() {
        init();
        assert!(set("Hash", "999999999"));
        assert_eq!(get_i64("Hash"), 131072);
        assert!(set("Hash", "0"));
        assert_eq!(get_i64("Hash"), 1);
        assert!(set("Hash", "64"));
        assert_eq!(get_i64("Hash"), 64);
        set("Hash", "16");
    }

    #[test]
    fn test_unknown_option() {
        init();
        assert!(!set("NoSuchOption", "1"));
    }

    #[test]
    fn test_variant_combo() {
        init();
        assert!(set("UCI_Variant", "atomic"));
        assert_eq!(get_string("UCI_Variant"), "atomic");
        set("UCI_Variant", "nonsense");
        assert_eq!(get_string("UCI_Variant"), "atomic");
        set("UCI_Variant", "chess");
    }
}
