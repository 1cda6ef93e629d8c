/// Deterministic step budgeting for bounded iteration.
///
/// Every iterative geometry walk (subdivision, clip stitching, outline
/// tracing, simplification, skeleton search) draws from a budget. Running out
/// is a defect signal for the operation, never a silent truncation, so callers
/// turn a failed [`StepBudget::try_consume`] into an error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StepBudget {
    limit: usize,
    remaining_units: usize,
}

impl StepBudget {
    pub fn new(units: usize) -> Self {
        Self {
            limit: units,
            remaining_units: units,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn remaining_units(&self) -> usize {
        self.remaining_units
    }

    pub fn consumed_units(&self) -> usize {
        self.limit - self.remaining_units
    }

    /// Attempts to consume `units` from the budget.
    ///
    /// Returns `true` if the budget had enough remaining units.
    pub fn try_consume(&mut self, units: usize) -> bool {
        if self.remaining_units < units {
            return false;
        }
        self.remaining_units -= units;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::StepBudget;

    #[test]
    fn consumes_units() {
        let mut b = StepBudget::new(3);
        assert!(b.try_consume(2));
        assert_eq!(b.remaining_units(), 1);
        assert!(!b.try_consume(2));
        assert_eq!(b.remaining_units(), 1);
        assert!(b.try_consume(1));
        assert_eq!(b.remaining_units(), 0);
        assert_eq!(b.consumed_units(), 3);
        assert_eq!(b.limit(), 3);
    }
}
