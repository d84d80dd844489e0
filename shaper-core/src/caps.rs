use std::{
    fmt,
    ops::{BitOr, BitOrAssign},
};

/// Set of capability flags a device advertises for one scope.
///
/// A flag grants the corresponding configurable field or behavior on that
/// scope. The empty set is a valid answer: the scope is supported, but no
/// optional feature is.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u32);

impl Capabilities {
    /// The empty set.
    pub const NONE: Self = Self(0);
    /// The scope supports a minimum guaranteed bandwidth.
    pub const BW_MIN: Self = Self(1 << 0);
    /// The scope supports a maximum bandwidth bound.
    pub const BW_MAX: Self = Self(1 << 1);
    /// The scope supports rates expressed in bits per second.
    pub const METRIC_BPS: Self = Self(1 << 2);
    /// The scope supports a burst allowance.
    pub const BURST: Self = Self(1 << 3);
    /// The scope supports strict scheduling priorities.
    pub const PRIORITY: Self = Self(1 << 4);
    /// The scope supports weighted round-robin weights.
    pub const WEIGHT: Self = Self(1 << 5);
    /// Nodes of the scope may be nested under detached shapers.
    pub const NESTING: Self = Self(1 << 6);

    const FLAGS: [(Self, &'static str); 7] = [
        (Self::BW_MIN, "support-bw-min"),
        (Self::BW_MAX, "support-bw-max"),
        (Self::METRIC_BPS, "support-metric-bps"),
        (Self::BURST, "support-burst"),
        (Self::PRIORITY, "support-priority"),
        (Self::WEIGHT, "support-weight"),
        (Self::NESTING, "support-nesting"),
    ];

    /// Every flag set.
    pub const fn all() -> Self {
        Self((1 << 7) - 1)
    }

    /// Returns `true` when every flag in `other` is present in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` when no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the raw flag word.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Builds a set from a raw flag word, ignoring unknown bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & Self::all().0)
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Capabilities {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Capabilities(")?;
        if self.is_empty() {
            f.write_str("none")?;
        } else {
            let mut first = true;
            for (flag, name) in Self::FLAGS {
                if self.contains(flag) {
                    if !first {
                        f.write_str(" | ")?;
                    }
                    f.write_str(name)?;
                    first = false;
                }
            }
        }
        f.write_str(")")
    }
}
