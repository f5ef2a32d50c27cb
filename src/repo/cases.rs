use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::{Case, CaseId, TransformerId};
use crate::error::{GridError, Result};

/// One page of the case history
#[derive(Debug, Clone, Serialize)]
pub struct CasePage {
    pub cases: Vec<Case>,
    pub total: usize,
    pub page: usize,
    pub pages: usize,
}

#[derive(Debug, Default)]
pub struct CaseRegistry {
    cases: RwLock<HashMap<CaseId, Case>>,
}

impl CaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, case: Case) {
        self.cases.write().insert(case.id.clone(), case);
    }

    pub fn get(&self, id: &CaseId) -> Option<Case> {
        self.cases.read().get(id).cloned()
    }

    /// Apply `f` to the stored case under the write lock. Changes are kept
    /// only when `f` succeeds, so a rejected transition leaves no trace.
    pub fn update<T>(&self, id: &CaseId, f: impl FnOnce(&mut Case) -> Result<T>) -> Result<(Case, T)> {
        let mut cases = self.cases.write();
        let stored = cases.get_mut(id).ok_or_else(|| GridError::not_found("Case", id))?;
        let mut draft = stored.clone();
        let out = f(&mut draft)?;
        *stored = draft.clone();
        Ok((draft, out))
    }

    /// The NEW or PLANNED case for `transformer`, if any
    pub fn find_active(&self, transformer: &TransformerId) -> Option<Case> {
        self.cases
            .read()
            .values()
            .find(|c| &c.transformer_ref == transformer && c.state.is_active())
            .cloned()
    }

    /// Active cases, newest first
    pub fn list_active(&self) -> Vec<Case> {
        let mut cases: Vec<Case> = self
            .cases
            .read()
            .values()
            .filter(|c| c.state.is_active())
            .cloned()
            .collect();
        sort_newest_first(&mut cases);
        cases
    }

    /// All cases newest first, paginated (`page` starts at 1)
    pub fn list(&self, page: usize, limit: usize) -> CasePage {
        let page = page.max(1);
        let limit = limit.max(1);
        let mut cases: Vec<Case> = self.cases.read().values().cloned().collect();
        sort_newest_first(&mut cases);
        let total = cases.len();
        let cases = cases.into_iter().skip((page - 1) * limit).take(limit).collect();
        CasePage {
            cases,
            total,
            page,
            pages: total.div_ceil(limit),
        }
    }
}

fn sort_newest_first(cases: &mut [Case]) {
    cases.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CaseState, EdgeId, IsolationPlan};
    use std::collections::BTreeSet;

    fn case(transformer: &str) -> Case {
        Case::new(TransformerId::new(transformer), EdgeId::new("E1"), 0.8, BTreeSet::new())
    }

    #[test]
    fn test_failed_update_leaves_case_untouched() {
        let reg = CaseRegistry::new();
        let c = case("T1");
        let id = c.id.clone();
        reg.insert(c.clone());

        let result = reg.update(&id, |c| {
            c.block_reason = Some("scribble".into());
            c.mark_executed()
        });
        assert!(result.is_err());
        assert_eq!(reg.get(&id).unwrap(), c);
    }

    #[test]
    fn test_find_active_ignores_terminal_cases() {
        let reg = CaseRegistry::new();
        let mut closed = case("T1");
        closed.block("dup").unwrap();
        reg.insert(closed);
        assert!(reg.find_active(&TransformerId::new("T1")).is_none());

        let mut planned = case("T1");
        planned.attach_plan(IsolationPlan::notify_only()).unwrap();
        reg.insert(planned.clone());
        assert_eq!(reg.find_active(&TransformerId::new("T1")).unwrap().id, planned.id);
        assert_eq!(reg.list_active().len(), 1);
        assert_eq!(reg.list_active()[0].state, CaseState::Planned);
    }

    #[test]
    fn test_pagination() {
        let reg = CaseRegistry::new();
        for i in 0..5 {
            reg.insert(case(&format!("T{i}")));
        }
        let page = reg.list(2, 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 3);
        assert_eq!(page.cases.len(), 2);
        assert_eq!(reg.list(3, 2).cases.len(), 1);
    }
}
