//! Per-site ceiling on model-assisted extraction calls.
//!
//! One tracker per site run, owned by the orchestrator and passed down by
//! `&mut` reference. Nothing here is global, so separate site runs never
//! share a counter.

use crate::error::{ModelError, ModelResult};
use crate::types::coverage::BudgetSummary;

#[derive(Debug, Clone)]
pub struct BudgetTracker {
    max_calls: u32,
    total_calls: u32,
    denied_calls: u32,
    total_input_tokens: u64,
    total_output_tokens: u64,
}

impl BudgetTracker {
    pub fn new(max_calls: u32) -> Self {
        Self {
            max_calls,
            total_calls: 0,
            denied_calls: 0,
            total_input_tokens: 0,
            total_output_tokens: 0,
        }
    }

    pub fn can_call(&self) -> bool {
        self.total_calls < self.max_calls
    }

    /// Take one unit of budget, or record the denial.
    pub fn try_acquire(&mut self) -> ModelResult<()> {
        if !self.can_call() {
            self.denied_calls += 1;
            return Err(ModelError::BudgetExhausted);
        }
        self.total_calls += 1;
        Ok(())
    }

    /// Add the token usage reported for the last call.
    pub fn record_usage(&mut self, input_tokens: u64, output_tokens: u64) {
        self.total_input_tokens += input_tokens;
        self.total_output_tokens += output_tokens;
    }

    pub fn total_calls(&self) -> u32 {
        self.total_calls
    }

    pub fn denied_calls(&self) -> u32 {
        self.denied_calls
    }

    pub fn remaining(&self) -> u32 {
        self.max_calls.saturating_sub(self.total_calls)
    }

    /// A call was wanted after the ceiling was reached.
    pub fn exceeded(&self) -> bool {
        self.denied_calls > 0
    }

    pub fn summary(&self) -> BudgetSummary {
        BudgetSummary {
            max_calls: self.max_calls,
            total_calls: self.total_calls,
            denied_calls: self.denied_calls,
            total_input_tokens: self.total_input_tokens,
            total_output_tokens: self.total_output_tokens,
            budget_remaining: self.remaining(),
            budget_exceeded: self.exceeded(),
        }
    }
}
