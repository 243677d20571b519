//! Backend selection policies.

use tool_primitives::{Backend, BackendKind};

/// Chooses one backend from the candidates resolved for a tool.
///
/// Returning `None` is treated by the runner as "no backends available".
pub trait BackendSelector: Send + Sync {
    /// Picks a backend from `backends`.
    fn select(&self, backends: &[Backend]) -> Option<Backend>;
}

impl<F> BackendSelector for F
where
    F: Fn(&[Backend]) -> Option<Backend> + Send + Sync,
{
    fn select(&self, backends: &[Backend]) -> Option<Backend> {
        (self)(backends)
    }
}

/// Default selector: local handlers first, then providers, then remote
/// servers. Candidates of equal priority keep their list order.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrioritySelector;

impl PrioritySelector {
    const ORDER: [BackendKind; 3] = [BackendKind::Local, BackendKind::Provider, BackendKind::Remote];
}

impl BackendSelector for PrioritySelector {
    fn select(&self, backends: &[Backend]) -> Option<Backend> {
        Self::ORDER
            .iter()
            .find_map(|kind| backends.iter().find(|backend| backend.kind() == *kind))
            .or_else(|| backends.first())
            .cloned()
    }
}
