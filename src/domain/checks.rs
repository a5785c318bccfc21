//! Pass/fail reports printed by the verifiers.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckOutcome {
    pub fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: detail.into(),
        }
    }

    /// `PASS name: detail` / `FAIL name: detail`.
    pub fn line(&self) -> String {
        let tag = if self.passed { "PASS" } else { "FAIL" };
        if self.detail.is_empty() {
            format!("{} {}", tag, self.name)
        } else {
            format!("{} {}: {}", tag, self.name, self.detail)
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CheckReport {
    pub checks: Vec<CheckOutcome>,
}

impl CheckReport {
    pub fn push(&mut self, outcome: CheckOutcome) {
        self.checks.push(outcome);
    }

    pub fn failures(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }

    /// Zero iff every check passed.
    pub fn exit_code(&self) -> u8 {
        if self.failures() == 0 {
            0
        } else {
            1
        }
    }
}
