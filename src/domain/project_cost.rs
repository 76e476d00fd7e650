#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProjectCostError {
    #[error("{0} is not a valid integer cost")]
    NotAnInteger(String),
    #[error("Cost cannot be negative")]
    Negative,
}

/// Whether negative costs are a legal business state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostPolicy {
    NonNegative,
    AllowNegative,
}

impl CostPolicy {
    pub fn from_flag(allow_negative: bool) -> Self {
        if allow_negative {
            CostPolicy::AllowNegative
        } else {
            CostPolicy::NonNegative
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectCost(i32);

impl ProjectCost {
    pub fn parse(s: &str, policy: CostPolicy) -> Result<ProjectCost, ProjectCostError> {
        let cost: i32 = s
            .trim()
            .parse()
            .map_err(|_| ProjectCostError::NotAnInteger(s.to_string()))?;

        if cost < 0 && policy == CostPolicy::NonNegative {
            return Err(ProjectCostError::Negative);
        }

        Ok(Self(cost))
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}
