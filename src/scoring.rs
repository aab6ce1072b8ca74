use crate::types::{ClaimVerdict, OverallVerdict, Verdict};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerdictCounts { pub supported: usize, pub contradicted: usize, pub insufficient: usize, pub mixed: usize, pub total: usize }

impl VerdictCounts {
    pub fn tally(breakdown: &[ClaimVerdict]) -> Self {
        let mut c = VerdictCounts { total: breakdown.len(), ..Default::default() };
        for v in breakdown {
            match v.verdict {
                Verdict::Supported => c.supported += 1,
                Verdict::Contradicted => c.contradicted += 1,
                Verdict::InsufficientInfo => c.insufficient += 1,
                Verdict::Mixed => c.mixed += 1,
            }
        }
        c
    }
}

/// Evidence-free score and verdict from verdict ratios alone.
/// Contradiction thresholds are checked before support thresholds.
pub fn ratio_assessment(c: &VerdictCounts) -> (u8, OverallVerdict) {
    if c.total == 0 {
        return (0, OverallVerdict::InsufficientInformation);
    }
    let total = c.total as f64;
    let supported = c.supported as f64 / total;
    let contradicted = c.contradicted as f64 / total;

    if contradicted >= 0.8 {
        (15, OverallVerdict::False)
    } else if contradicted >= 0.6 {
        (35, OverallVerdict::MostlyFalse)
    } else if supported >= 0.8 {
        (85, OverallVerdict::True)
    } else if supported >= 0.6 {
        (72, OverallVerdict::MostlyTrue)
    } else {
        (50, OverallVerdict::Mixed)
    }
}
