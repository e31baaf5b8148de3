//! Fetch-render-sleep cycle state machine
//!
//! Drives the firmware loop: WiFi up, fetch, render, sleep, again. Only one
//! cycle is ever in flight; `Fetching` is only entered from `WiFiConnecting`
//! and `Rendering` only from `Fetching`.

use crate::extractor::TemperatureSample;
use crate::{BoardError, config};
use embassy_time::Duration;
use heapless::Vec;

/// Cycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    // Boot
    SystemInit,

    // One cycle
    WiFiConnecting,
    Fetching,
    Rendering,
    Sleeping,

    // Errors
    Backoff,
    DeviceFault,
}

/// Things that happen to the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEvent {
    SystemStarted,

    WiFiConnected,
    WiFiConnectionFailed,

    FetchCompleted(TemperatureSample),
    FetchFailed(BoardError),

    RenderCompleted,
    RenderFailed(BoardError),

    /// Sleep or backoff delay is over
    SleepElapsed,
}

/// State transition result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTransition {
    /// Keep the current state
    Stay,
    /// Move to a new state
    Transition(CycleState),
    /// Move to a new state and reset the failure count
    TransitionWithReset(CycleState),
}

/// Work the caller has to do for the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Bring the WiFi link up
    ConnectWiFi,
    /// Run one fetch cycle, then drop the WiFi link
    FetchForecast,
    /// Play the sequence for these temperatures
    Render(TemperatureSample),
    /// Switch every LED off
    ClearStrip,
    /// Count down this many seconds before the next cycle
    Sleep(u32),
    /// Wait before retrying the cycle
    Backoff(Duration),
    /// Report an error
    LogError(BoardError),
}

/// Whether a sample with sentinel values is shown at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoDataPolicy {
    /// Render whatever came back, sentinels included
    Always,
    /// Render as long as the current temperature was found
    RequireCurrent,
    /// Render only when current, min and max were all found
    #[default]
    RequireAll,
}

impl NoDataPolicy {
    pub fn allows(self, sample: &TemperatureSample) -> bool {
        match self {
            NoDataPolicy::Always => true,
            NoDataPolicy::RequireCurrent => sample.has_current(),
            NoDataPolicy::RequireAll => sample.is_complete(),
        }
    }
}

/// Cycle configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleConfig {
    /// Seconds between the end of a render and the next fetch
    pub refresh_countdown_secs: u32,
    pub no_data_policy: NoDataPolicy,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            refresh_countdown_secs: config::REFRESH_COUNTDOWN_SECS,
            no_data_policy: NoDataPolicy::default(),
        }
    }
}

/// Most actions a single state asks for; `DeviceFault` needs three
pub const MAX_ACTIONS: usize = 4;

fn queue(actions: &mut Vec<Action, MAX_ACTIONS>, action: Action) {
    let queued = actions.push(action).is_ok();
    debug_assert!(queued, "more than {} actions for one state", MAX_ACTIONS);
}

/// Cycle state machine
pub struct CycleStateMachine {
    config: CycleConfig,
    current_state: CycleState,
    previous_state: Option<CycleState>,
    pending_sample: Option<TemperatureSample>,
    last_error: Option<BoardError>,
    failure_count: u32,
    cycles_completed: u32,
}

impl CycleStateMachine {
    /// Create a new state machine
    pub fn new(config: CycleConfig) -> Self {
        Self {
            config,
            current_state: CycleState::SystemInit,
            previous_state: None,
            pending_sample: None,
            last_error: None,
            failure_count: 0,
            cycles_completed: 0,
        }
    }

    pub fn current_state(&self) -> CycleState {
        self.current_state
    }

    pub fn previous_state(&self) -> Option<CycleState> {
        self.previous_state
    }

    /// Failures since the last completed cycle
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Cycles that ended in a render or a deliberate skip
    pub fn cycles_completed(&self) -> u32 {
        self.cycles_completed
    }

    pub fn last_error(&self) -> Option<BoardError> {
        self.last_error
    }

    /// Feed an event in
    pub fn handle_event(&mut self, event: CycleEvent) -> StateTransition {
        let transition = self.get_state_transition(self.current_state, event);

        match event {
            CycleEvent::FetchCompleted(sample) if self.current_state == CycleState::Fetching => {
                self.pending_sample = Some(sample);
            }
            CycleEvent::WiFiConnectionFailed if self.current_state == CycleState::WiFiConnecting => {
                self.record_failure(BoardError::WiFiError);
            }
            CycleEvent::FetchFailed(e) if self.current_state == CycleState::Fetching => {
                self.record_failure(e);
            }
            CycleEvent::RenderFailed(e) if self.current_state == CycleState::Rendering => {
                self.record_failure(e);
            }
            _ => {}
        }

        match transition {
            StateTransition::Transition(new_state) => {
                self.transition_to_state(new_state);
            }
            StateTransition::TransitionWithReset(new_state) => {
                self.failure_count = 0;
                self.last_error = None;
                self.cycles_completed = self.cycles_completed.wrapping_add(1);
                self.transition_to_state(new_state);
            }
            StateTransition::Stay => {}
        }

        transition
    }

    /// Actions for the current state
    pub fn update(&self) -> Vec<Action, MAX_ACTIONS> {
        let mut actions = Vec::new();

        match self.current_state {
            CycleState::SystemInit => {}

            CycleState::WiFiConnecting => {
                queue(&mut actions, Action::ConnectWiFi);
            }

            CycleState::Fetching => {
                queue(&mut actions, Action::FetchForecast);
            }

            CycleState::Rendering => {
                if let Some(sample) = self.pending_sample {
                    queue(&mut actions, Action::Render(sample));
                }
            }

            CycleState::Sleeping => {
                queue(&mut actions, Action::Sleep(self.config.refresh_countdown_secs));
            }

            CycleState::Backoff => {
                let error = self.last_error.unwrap_or(BoardError::ConnectError);
                queue(&mut actions, Action::LogError(error));
                queue(&mut actions, Action::Backoff(error.backoff()));
            }

            CycleState::DeviceFault => {
                let error = self.last_error.unwrap_or(BoardError::DeviceError);
                queue(&mut actions, Action::LogError(error));
                queue(&mut actions, Action::ClearStrip);
                queue(&mut actions, Action::Backoff(error.backoff()));
            }
        }

        actions
    }

    fn record_failure(&mut self, error: BoardError) {
        self.last_error = Some(error);
        self.failure_count = self.failure_count.saturating_add(1);
    }

    fn transition_to_state(&mut self, new_state: CycleState) {
        if new_state != self.current_state {
            match new_state {
                CycleState::Backoff | CycleState::DeviceFault => {
                    log!(
                        "[STATE] Error state: {:?} ({:?}, failures={})",
                        new_state,
                        self.last_error,
                        self.failure_count
                    );
                }
                _ => {}
            }

            if new_state != CycleState::Rendering {
                self.pending_sample = None;
            }

            self.previous_state = Some(self.current_state);
            self.current_state = new_state;
        }
    }

    fn get_state_transition(&self, current_state: CycleState, event: CycleEvent) -> StateTransition {
        match (current_state, event) {
            (CycleState::SystemInit, CycleEvent::SystemStarted) => {
                StateTransition::Transition(CycleState::WiFiConnecting)
            }

            (CycleState::WiFiConnecting, CycleEvent::WiFiConnected) => {
                StateTransition::Transition(CycleState::Fetching)
            }
            (CycleState::WiFiConnecting, CycleEvent::WiFiConnectionFailed) => {
                StateTransition::Transition(CycleState::Backoff)
            }

            (CycleState::Fetching, CycleEvent::FetchCompleted(sample)) => {
                if self.config.no_data_policy.allows(&sample) {
                    StateTransition::Transition(CycleState::Rendering)
                } else {
                    log!("[STATE] No usable temperatures ({:?}), skipping render", sample);
                    StateTransition::TransitionWithReset(CycleState::Sleeping)
                }
            }
            (CycleState::Fetching, CycleEvent::FetchFailed(_)) => {
                StateTransition::Transition(CycleState::Backoff)
            }

            (CycleState::Rendering, CycleEvent::RenderCompleted) => {
                StateTransition::TransitionWithReset(CycleState::Sleeping)
            }
            (CycleState::Rendering, CycleEvent::RenderFailed(_)) => {
                StateTransition::Transition(CycleState::DeviceFault)
            }

            (CycleState::Sleeping | CycleState::Backoff | CycleState::DeviceFault, CycleEvent::SleepElapsed) => {
                StateTransition::Transition(CycleState::WiFiConnecting)
            }

            _ => StateTransition::Stay,
        }
    }

    /// Checks whether the cycle is in an error state
    pub fn is_error_state(&self) -> bool {
        matches!(self.current_state, CycleState::Backoff | CycleState::DeviceFault)
    }
}

impl Default for CycleStateMachine {
    fn default() -> Self {
        Self::new(CycleConfig::default())
    }
}
