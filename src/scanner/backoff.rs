/// What the scanner should do after a failed scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Infrastructure noise, not counted.
    Ignored,
    /// First counted failure since the last reset; worth a soft notice.
    FirstFailure,
    Counted(u32),
    /// The limit was reached. The counter has already been reset.
    Exhausted,
}

/// Counts real scan failures since the last success or reset.
#[derive(Debug, Clone)]
pub struct ErrorBackoff {
    count: u32,
    limit: u32,
}

impl ErrorBackoff {
    pub fn new(limit: u32) -> Self {
        Self {
            count: 0,
            limit: limit.max(1),
        }
    }

    pub fn record(&mut self, transient: bool) -> FailureAction {
        if transient {
            return FailureAction::Ignored;
        }

        self.count += 1;
        if self.count >= self.limit {
            self.count = 0;
            FailureAction::Exhausted
        } else if self.count == 1 {
            FailureAction::FirstFailure
        } else {
            FailureAction::Counted(self.count)
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}
