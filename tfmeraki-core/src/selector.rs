//! Selector - Choose the remote operation that fits the supplied identifiers
//!
//! Candidates are registered from least to most specific. The last candidate
//! whose identifying parameters were all supplied wins, so a configuration that
//! pins both a collection and an item is served by the single-item call.

use log::debug;

/// Which identifying parameters of one candidate operation were supplied
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PresenceSignature(Vec<bool>);

impl PresenceSignature {
    pub fn new(presence: Vec<bool>) -> Self {
        Self(presence)
    }

    /// An empty signature is never satisfied
    pub fn is_satisfied(&self) -> bool {
        is_satisfied(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[bool]> for PresenceSignature {
    fn as_ref(&self) -> &[bool] {
        &self.0
    }
}

impl From<Vec<bool>> for PresenceSignature {
    fn from(presence: Vec<bool>) -> Self {
        Self(presence)
    }
}

impl FromIterator<bool> for PresenceSignature {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn is_satisfied(presence: &[bool]) -> bool {
    !presence.is_empty() && presence.iter().all(|p| *p)
}

/// Return the 1-based index of the last satisfied signature
///
/// `None` means no candidate operation can be issued.
pub fn select_index<S: AsRef<[bool]>>(signatures: &[S]) -> Option<usize> {
    signatures
        .iter()
        .rposition(|s| is_satisfied(s.as_ref()))
        .map(|i| i + 1)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    #[error(
        "no applicable operation: none of the {candidates} candidate operations has all of its identifying attributes set"
    )]
    NoApplicableMethod { candidates: usize },
}

/// Ordered set of candidate operations with their presence signatures
#[derive(Debug, Clone)]
pub struct MethodSelector<M> {
    candidates: Vec<(M, PresenceSignature)>,
}

impl<M> Default for MethodSelector<M> {
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }
}

impl<M> MethodSelector<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the next, more specific, candidate
    pub fn candidate(mut self, method: M, presence: impl Into<PresenceSignature>) -> Self {
        self.push(method, presence);
        self
    }

    pub fn push(&mut self, method: M, presence: impl Into<PresenceSignature>) {
        self.candidates.push((method, presence.into()));
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn select_index(&self) -> Option<usize> {
        let signatures: Vec<&PresenceSignature> = self.candidates.iter().map(|(_, s)| s).collect();
        select_index(&signatures)
    }

    pub fn select(&self) -> Result<&M, SelectError> {
        match self.select_index() {
            Some(index) => {
                debug!("selected candidate operation {} of {}", index, self.len());
                Ok(&self.candidates[index - 1].0)
            }
            None => Err(SelectError::NoApplicableMethod {
                candidates: self.len(),
            }),
        }
    }
}
