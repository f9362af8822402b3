//! State threaded through one top-level expansion

use chrono::NaiveDateTime;

use crate::params::Parameters;

use super::counter::CounterRegistry;

/// Context for template expansion
///
/// Created once per top-level `process` call and passed by `&mut` into every
/// recursive evaluation, so the reference timestamp and the global counters
/// are shared by all loop iterations of that call and by nothing else.
#[derive(Debug)]
pub struct ExpansionContext<'p> {
    /// Timestamp every date placeholder is computed from
    pub reference: NaiveDateTime,
    /// Parameters for this expansion
    pub params: &'p Parameters,
    /// Global `INC` counters
    pub counters: CounterRegistry,
    /// Loop iterations currently being expanded
    depth: usize,
}

impl<'p> ExpansionContext<'p> {
    pub fn new(reference: NaiveDateTime, params: &'p Parameters) -> Self {
        Self {
            reference,
            params,
            counters: CounterRegistry::new(),
            depth: 0,
        }
    }

    /// Current loop nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn enter_iteration(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn leave_iteration(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_depth_tracking() {
        let params = Parameters::new();
        let reference = NaiveDate::from_ymd_opt(2023, 6, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut ctx = ExpansionContext::new(reference, &params);
        assert_eq!(ctx.depth(), 0);

        ctx.enter_iteration();
        ctx.enter_iteration();
        assert_eq!(ctx.depth(), 2);
        ctx.leave_iteration();
        assert_eq!(ctx.depth(), 1);
        assert!(ctx.counters.is_empty());
    }
}
