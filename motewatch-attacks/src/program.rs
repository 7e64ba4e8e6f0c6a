//! Fault programs: ordered byte values written while an attack is active.

/// One scheduled write. `at_us` is absolute simulation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultStep {
    pub at_us: u64,
    pub value: u8,
}

impl FaultStep {
    pub fn at_ms(at_ms: u64, value: u8) -> Self {
        Self {
            at_us: at_ms.saturating_mul(1_000),
            value,
        }
    }
}

/// Steps are kept in the order they were configured and applied in that
/// order, even if their times are not sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FaultProgram {
    symbol: Option<String>,
    steps: Vec<FaultStep>,
}

impl FaultProgram {
    /// `symbol` overrides the attack's switch symbol as the write target.
    pub fn new(symbol: Option<String>, steps: Vec<FaultStep>) -> Self {
        Self { symbol, steps }
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn steps(&self) -> &[FaultStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The step at `cursor` if it is due at `now`.
    #[inline]
    pub fn due(&self, cursor: usize, now: u64) -> Option<FaultStep> {
        self.steps.get(cursor).copied().filter(|s| s.at_us <= now)
    }
}
