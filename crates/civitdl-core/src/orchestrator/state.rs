//! Stages of one fetch.

use std::fmt;

/// `ResolvingMetadata -> CheckingDisk -> (Cached | Downloading) -> Verifying -> (Done | Failed)`.
/// `Retrying` is entered when a file already at the target path fails its
/// hash check and is downloaded again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    ResolvingMetadata,
    CheckingDisk,
    Cached,
    Retrying,
    Downloading,
    Verifying,
    Done,
    Failed,
}

impl FetchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FetchState::Done | FetchState::Failed)
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchState::ResolvingMetadata => "resolving metadata",
            FetchState::CheckingDisk => "checking disk",
            FetchState::Cached => "cached",
            FetchState::Retrying => "retrying",
            FetchState::Downloading => "downloading",
            FetchState::Verifying => "verifying",
            FetchState::Done => "done",
            FetchState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Ordered record of the states a fetch went through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateTrail(Vec<FetchState>);

impl StateTrail {
    pub(crate) fn enter(&mut self, state: FetchState) {
        tracing::debug!(%state, "fetch state");
        self.0.push(state);
    }

    pub fn states(&self) -> &[FetchState] {
        &self.0
    }

    pub fn current(&self) -> Option<FetchState> {
        self.0.last().copied()
    }

    pub fn contains(&self, state: FetchState) -> bool {
        self.0.contains(&state)
    }
}
