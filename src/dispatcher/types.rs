use std::fmt;

/// Result of writing one batch to a backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Lines the transport accepted
    pub lines_written: usize,

    /// Lines the transport failed to write
    pub lines_failed: usize,
}

impl DispatchReport {
    pub fn total(&self) -> usize {
        self.lines_written + self.lines_failed
    }

    pub fn is_complete(&self) -> bool {
        self.lines_failed == 0
    }
}

impl fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} lines written",
            self.lines_written,
            self.total()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report() {
        let report = DispatchReport {
            lines_written: 3,
            lines_failed: 1,
        };
        assert_eq!(report.total(), 4);
        assert!(!report.is_complete());
        assert_eq!(report.to_string(), "3 of 4 lines written");
        assert!(DispatchReport::default().is_complete());
    }
}
