//! Phase state machine for a single environment.
//!
//! ```text
//! UNCREATED -> CREATED -> (INSTALLING)* -> ACTIVE -> FINALIZED(retained|destroyed)
//! ```
//!
//! Any non-terminal phase may jump straight to `FINALIZED`; that is how
//! creation failures, install failures and interrupts reach cleanup. Nothing
//! leaves `FINALIZED`.

use std::fmt;

use thiserror::Error;

/// What `finalize` did with the environment root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Root left on disk for later use.
    Retained,
    /// Root removed (best-effort).
    Destroyed,
}

/// Lifecycle phase of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Root directory allocated, environment not yet created in it.
    Uncreated,
    /// Environment created by the creation collaborator.
    Created,
    /// An install step is running (entered once per step).
    Installing,
    /// Script, interactive session or editor handed control.
    Active,
    /// Terminal phase.
    Finalized(Disposition),
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Finalized(_))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Uncreated => f.write_str("UNCREATED"),
            Phase::Created => f.write_str("CREATED"),
            Phase::Installing => f.write_str("INSTALLING"),
            Phase::Active => f.write_str("ACTIVE"),
            Phase::Finalized(Disposition::Retained) => f.write_str("FINALIZED(retained)"),
            Phase::Finalized(Disposition::Destroyed) => f.write_str("FINALIZED(destroyed)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid lifecycle transition {from} -> {to}")]
pub struct TransitionError {
    pub from: Phase,
    pub to: Phase,
}

/// Current phase plus every phase entered so far, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    phase: Phase,
    history: Vec<Phase>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: Phase::Uncreated,
            history: vec![Phase::Uncreated],
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    pub fn is_finalized(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Move to `next`, rejecting transitions the state machine does not allow.
    pub fn advance(&mut self, next: Phase) -> Result<(), TransitionError> {
        if !is_allowed(self.phase, next) {
            return Err(TransitionError {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        self.history.push(next);
        Ok(())
    }
}

fn is_allowed(from: Phase, to: Phase) -> bool {
    match (from, to) {
        (Phase::Finalized(_), _) => false,
        (_, Phase::Finalized(_)) => true,
        (Phase::Uncreated, Phase::Created) => true,
        (Phase::Created | Phase::Installing, Phase::Installing) => true,
        (Phase::Created | Phase::Installing, Phase::Active) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_records_history() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(Phase::Created).expect("created");
        lifecycle.advance(Phase::Installing).expect("install 1");
        lifecycle.advance(Phase::Installing).expect("install 2");
        lifecycle.advance(Phase::Active).expect("active");
        lifecycle
            .advance(Phase::Finalized(Disposition::Destroyed))
            .expect("finalize");

        assert_eq!(
            lifecycle.history(),
            &[
                Phase::Uncreated,
                Phase::Created,
                Phase::Installing,
                Phase::Installing,
                Phase::Active,
                Phase::Finalized(Disposition::Destroyed),
            ]
        );
        assert!(lifecycle.is_finalized());
    }

    #[test]
    fn any_live_phase_can_finalize() {
        for live in [Phase::Uncreated, Phase::Created, Phase::Installing, Phase::Active] {
            assert!(is_allowed(live, Phase::Finalized(Disposition::Retained)));
        }
    }

    #[test]
    fn finalize_is_terminal() {
        let mut lifecycle = Lifecycle::new();
        lifecycle
            .advance(Phase::Finalized(Disposition::Destroyed))
            .expect("finalize");

        let err = lifecycle
            .advance(Phase::Finalized(Disposition::Destroyed))
            .unwrap_err();
        assert_eq!(err.from, Phase::Finalized(Disposition::Destroyed));
        assert_eq!(lifecycle.history().len(), 2);
    }

    #[test]
    fn cannot_skip_creation() {
        let mut lifecycle = Lifecycle::new();
        let err = lifecycle.advance(Phase::Installing).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid lifecycle transition UNCREATED -> INSTALLING"
        );
        assert!(lifecycle.advance(Phase::Active).is_err());
    }

    #[test]
    fn active_cannot_return_to_installing() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(Phase::Created).expect("created");
        lifecycle.advance(Phase::Active).expect("active");
        assert!(lifecycle.advance(Phase::Installing).is_err());
    }
}
