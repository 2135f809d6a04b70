//! Scenario failure types

use std::time::Duration;
use thiserror::Error;
use wlan_ctrl::CtrlError;

/// Why a scenario failed
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// A collaborator call failed or an observer assertion did not hold
    #[error(transparent)]
    Ctrl(#[from] CtrlError),

    /// A scenario-level check did not hold
    #[error("{0}")]
    Expectation(String),

    /// A station joined a network it must not be able to join
    #[error("PMF required STA {station} connected to no PMF AP")]
    UnexpectedConnection { station: String },

    /// The testbed has fewer stations than the scenario needs
    #[error("scenario needs station #{index} but the testbed has {available}")]
    MissingStation { index: usize, available: usize },

    /// The scenario did not finish in time
    #[error("scenario timed out after {0:?}")]
    Timeout(Duration),
}

impl ScenarioError {
    pub fn expectation(message: impl Into<String>) -> Self {
        Self::Expectation(message.into())
    }
}
