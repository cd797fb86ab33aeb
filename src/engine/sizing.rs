//! Instance sizing policy from CPU utilization.

/// What to do about an instance, given its CPU utilization percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    ScaleDown,
    ScaleUp,
    NoAction,
}

/// Below this, the instance is oversized.
pub const SCALE_DOWN_BELOW: f64 = 20.0;
/// Above this, the instance is undersized.
pub const SCALE_UP_ABOVE: f64 = 80.0;

impl Recommendation {
    /// Only strictly-below 20 and strictly-above 80 are actionable; both
    /// boundary values are in the optimal band.
    pub fn for_cpu(cpu_percent: f64) -> Self {
        if cpu_percent < SCALE_DOWN_BELOW {
            Recommendation::ScaleDown
        } else if cpu_percent > SCALE_UP_ABOVE {
            Recommendation::ScaleUp
        } else {
            Recommendation::NoAction
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Recommendation::ScaleDown => "Scale down to a smaller instance to reduce costs.",
            Recommendation::ScaleUp => "Scale up to a larger instance type for better performance.",
            Recommendation::NoAction => {
                "CPU utilization is within an optimal range. No action needed."
            }
        }
    }
}
