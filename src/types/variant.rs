#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    // main variants
    Chess,
    Anti,
    Atomic,
    Crazyhouse,
    Extinction,
    Grid,
    Horde,
    Koth,
    Losers,
    Race,
    ThreeCheck,
    TwoKings,
    // sub-variants
    Giveaway,
    Suicide,
    Bughouse,
    Loop,
    Placement,
    KnightRelay,
    Relay,
    DisplacedGrid,
    SlippedGrid,
    TwoKingsSymmetric,
}

pub const VARIANT_NB: usize = 12;

pub const MAIN_VARIANTS: [Variant; VARIANT_NB] = [
    Variant::Chess,
    Variant::Anti,
    Variant::Atomic,
    Variant::Crazyhouse,
    Variant::Extinction,
    Variant::Grid,
    Variant::Horde,
    Variant::Koth,
    Variant::Losers,
    Variant::Race,
    Variant::ThreeCheck,
    Variant::TwoKings,
];

impl Variant {
    // The main variant whose rules and tables govern this (sub-)variant.
    pub fn main(self) -> Variant {
        match self {
            Variant::Giveaway | Variant::Suicide => Variant::Anti,
            Variant::Bughouse | Variant::Loop | Variant::Placement => Variant::Crazyhouse,
            Variant::KnightRelay | Variant::Relay => Variant::Chess,
            Variant::DisplacedGrid | Variant::SlippedGrid => Variant::Grid,
            Variant::TwoKingsSymmetric => Variant::TwoKings,
            v => v,
        }
    }

    // Index into tables dimensioned [VARIANT_NB]; sub-variants share their
    // main variant's slot.
    pub fn index(self) -> usize {
        match self.main() {
            Variant::Chess => 0,
            Variant::Anti => 1,
            Variant::Atomic => 2,
            Variant::Crazyhouse => 3,
            Variant::Extinction => 4,
            Variant::Grid => 5,
            Variant::Horde => 6,
            Variant::Koth => 7,
            Variant::Losers => 8,
            Variant::Race => 9,
            Variant::ThreeCheck => 10,
            _ => 11,
        }
    }

    pub fn from_name(name: &str) -> Option<Variant> {
        Some(match name {
            "chess" | "standard" => Variant::Chess,
            "antichess" => Variant::Anti,
            "atomic" => Variant::Atomic,
            "crazyhouse" => Variant::Crazyhouse,
            "extinction" => Variant::Extinction,
            "grid" => Variant::Grid,
            "horde" => Variant::Horde,
            "kingofthehill" => Variant::Koth,
            "losers" => Variant::Losers,
            "racingkings" => Variant::Race,
            "3check" | "threecheck" => Variant::ThreeCheck,
            "twokings" => Variant::TwoKings,
            "giveaway" => Variant::Giveaway,
            "suicide" => Variant::Suicide,
            "bughouse" => Variant::Bughouse,
            "loop" => Variant::Loop,
            "placement" => Variant::Placement,
            "knightrelay" => Variant::KnightRelay,
            "relay" => Variant::Relay,
            "displacedgrid" => Variant::DisplacedGrid,
            "slippedgrid" => Variant::SlippedGrid,
            "twokingssymmetric" => Variant::TwoKingsSymmetric,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Variant::Chess => "chess",
            Variant::Anti => "antichess",
            Variant::Atomic => "atomic",
            Variant::Crazyhouse => "crazyhouse",
            Variant::Extinction => "extinction",
            Variant::Grid => "grid",
            Variant::Horde => "horde",
            Variant::Koth => "kingofthehill",
            Variant::Losers => "losers",
            Variant::Race => "racingkings",
            Variant::ThreeCheck => "3check",
            Variant::TwoKings => "twokings",
            Variant::Giveaway => "giveaway",
            Variant::Suicide => "suicide",
            Variant::Bughouse => "bughouse",
            Variant::Loop => "loop",
            Variant::Placement => "placement",
            Variant::KnightRelay => "knightrelay",
            Variant::Relay => "relay",
            Variant::DisplacedGrid => "displacedgrid",
            Variant::SlippedGrid => "slippedgrid",
            Variant::TwoKingsSymmetric => "twokingssymmetric",
        }
    }

    // The default starting position of the variant.
    pub fn start_fen(self) -> &'static str {
        match self.main() {
            Variant::Crazyhouse => {
                if self == Variant::Placement {
                    "8/pppppppp/8/8/8/8/PPPPPPPP/8[KQRRBBNNkqrrbbnn] w - - 0 1"
                } else {
                    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR[] w KQkq - 0 1"
                }
            }
            Variant::Horde => {
                "rnbqkbnr/pppppppp/8/1PP2PP1/PPPPPPPP/PPPPPPPP/PPPPPPPP/PPPPPPPP w kq - 0 1"
            }
            Variant::Race => "8/8/8/8/8/8/krbnNBRK/qrbnNBRQ w - - 0 1",
            Variant::ThreeCheck => "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 3+3 0 1",
            Variant::TwoKings => "rnbqkknr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKKNR w KQkq - 0 1",
            _ => "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        }
    }

    pub fn is_house(self) -> bool {
        self.main() == Variant::Crazyhouse
    }

    pub fn is_anti(self) -> bool {
        self.main() == Variant::Anti
    }

    pub fn is_grid(self) -> bool {
        self.main() == Variant::Grid
    }

    // Variants in which the king may be captured or promoted, so there can
    // be zero, one or several of them per side.
    pub fn king_is_ordinary(self) -> bool {
        matches!(self.main(), Variant::Anti | Variant::Extinction | Variant::Horde)
    }

    pub fn grid_layout(self) -> GridLayout {
        match self {
            Variant::DisplacedGrid => GridLayout::Displaced,
            Variant::SlippedGrid => GridLayout::Slipped,
            _ => GridLayout::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLayout {
    Normal,
    Displaced,
    Slipped,
}

pub const GRID_LAYOUT_NB: usize = 3;

impl GridLayout {
    pub fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod variant_tests {
    use super::*;

    #[test]
    fn test_main_variant() {
        assert_eq!(Variant::Suicide.main(), Variant::Anti);
        assert_eq!(Variant::Loop.main(), Variant::Crazyhouse);
        assert_eq!(Variant::Placement.main(), Variant::Crazyhouse);
        assert_eq!(Variant::Relay.main(), Variant::Chess);
        assert_eq!(Variant::SlippedGrid.main(), Variant::Grid);
        assert_eq!(Variant::Chess.main(), Variant::Chess);
    }

    #[test]
    fn test_index_covers_all_main_variants() {
        for (i, v) in MAIN_VARIANTS.iter().enumerate() {
            assert_eq!(v.index(), i);
        }
    }

    #[test]
    fn test_name_round_trip() {
        for &v in &MAIN_VARIANTS {
            assert_eq!(Variant::from_name(v.name()), Some(v));
        }
        assert_eq!(Variant::from_name("3check"), Some(Variant::ThreeCheck));
        assert_eq!(Variant::from_name("nonsense"), None);
    }
}
