//! Viewer lifecycle: `Unloaded -> Loading -> Loaded`, or `Loading -> Failed`.
//!
//! Everything that needs the globe to exist checks [`Lifecycle::is_loaded`].
//! `Failed` is terminal; there is no retry path.

use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Unloaded => "unloaded",
            Phase::Loading => "loading",
            Phase::Loaded => "loaded",
            Phase::Failed => "failed",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transition {
    BeginLoading,
    FinishLoading,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    InvalidTransition { from: Phase, transition: Transition },
}

impl std::fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleError::InvalidTransition { from, transition } => {
                write!(f, "cannot apply {transition:?} in phase {}", from.as_str())
            }
        }
    }
}

impl std::error::Error for LifecycleError {}

#[derive(Debug, Default, Clone)]
pub struct Lifecycle {
    phase: Phase,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loaded(&self) -> bool {
        self.phase == Phase::Loaded
    }

    /// Applies `transition`, returning the new phase. The phase is left
    /// unchanged on error.
    pub fn apply(&mut self, transition: Transition) -> Result<Phase, LifecycleError> {
        let next = match (self.phase, transition) {
            (Phase::Unloaded, Transition::BeginLoading) => Phase::Loading,
            (Phase::Loading, Transition::FinishLoading) => Phase::Loaded,
            (Phase::Unloaded | Phase::Loading, Transition::Fail) => Phase::Failed,
            (from, transition) => {
                return Err(LifecycleError::InvalidTransition { from, transition });
            }
        };
        debug!(from = self.phase.as_str(), to = next.as_str(), "lifecycle transition");
        self.phase = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::{Lifecycle, LifecycleError, Phase, Transition};
    use pretty_assertions::assert_eq;

    #[test]
    fn happy_path_reaches_loaded() {
        let mut lc = Lifecycle::new();
        assert_eq!(lc.phase(), Phase::Unloaded);
        assert_eq!(lc.apply(Transition::BeginLoading), Ok(Phase::Loading));
        assert!(!lc.is_loaded());
        assert_eq!(lc.apply(Transition::FinishLoading), Ok(Phase::Loaded));
        assert!(lc.is_loaded());
    }

    #[test]
    fn failure_is_terminal() {
        let mut lc = Lifecycle::new();
        lc.apply(Transition::BeginLoading).expect("begin");
        assert_eq!(lc.apply(Transition::Fail), Ok(Phase::Failed));
        assert_eq!(
            lc.apply(Transition::BeginLoading),
            Err(LifecycleError::InvalidTransition {
                from: Phase::Failed,
                transition: Transition::BeginLoading,
            })
        );
        assert_eq!(lc.phase(), Phase::Failed);
    }

    #[test]
    fn cannot_finish_without_loading() {
        let mut lc = Lifecycle::new();
        assert!(lc.apply(Transition::FinishLoading).is_err());
        assert_eq!(lc.phase(), Phase::Unloaded);
    }
}
