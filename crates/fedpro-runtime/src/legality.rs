//! Session legality state machine
//!
//! Client-side flags deciding which operations may be transmitted. Checking
//! a precondition and marking the resulting pending state happen under one
//! lock, so two racing callers cannot both pass the same gate. Callback
//! arrival moves the flags forward before the handler sees the callback.

use fedpro_core::{RtiError, RtiResult};
use fedpro_time::TimeFactory;
use fedpro_wire::OperationTag;
use parking_lot::Mutex;

use crate::{Callback, Operation};

/// Regulation / constrained switch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Switch {
    #[default]
    Disabled,
    /// Requested, waiting for the enabling callback
    Pending,
    Enabled,
}

/// Outstanding time-advance request, if any
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TimeAdvance {
    #[default]
    None,
    Requested,
    RequestedAvailable,
    NextMessage,
    NextMessageAvailable,
    Flush,
}

impl TimeAdvance {
    fn for_request(tag: OperationTag) -> Option<TimeAdvance> {
        match tag {
            OperationTag::TimeAdvanceRequest => Some(TimeAdvance::Requested),
            OperationTag::TimeAdvanceRequestAvailable => Some(TimeAdvance::RequestedAvailable),
            OperationTag::NextMessageRequest => Some(TimeAdvance::NextMessage),
            OperationTag::NextMessageRequestAvailable => Some(TimeAdvance::NextMessageAvailable),
            OperationTag::FlushQueueRequest => Some(TimeAdvance::Flush),
            _ => None,
        }
    }
}

/// Save or restore progress
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    None,
    Requested,
    InProgress,
    AwaitingFederationAck,
}

impl Phase {
    /// Phases in which ordinary operations are refused.
    pub fn blocks(self) -> bool {
        matches!(self, Phase::InProgress | Phase::AwaitingFederationAck)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LegalityFlags {
    pub connected: bool,
    pub joined: bool,
    pub regulation: Switch,
    pub constrained: Switch,
    pub advance: TimeAdvance,
    pub save: Phase,
    pub restore: Phase,
    /// Time family negotiated at join
    pub time_factory: Option<TimeFactory>,
}

impl LegalityFlags {
    fn leave_federation(&mut self) {
        *self = LegalityFlags {
            connected: self.connected,
            ..LegalityFlags::default()
        };
    }
}

#[derive(Debug, Default)]
pub struct Legality {
    flags: Mutex<LegalityFlags>,
}

impl Legality {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> LegalityFlags {
        *self.flags.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.flags.lock().connected
    }

    pub fn time_factory(&self) -> Option<TimeFactory> {
        self.flags.lock().time_factory
    }

    pub fn mark_connected(&self) {
        *self.flags.lock() = LegalityFlags {
            connected: true,
            ..LegalityFlags::default()
        };
    }

    /// Forget everything; used on disconnect and connection loss.
    pub fn reset(&self) {
        *self.flags.lock() = LegalityFlags::default();
    }

    pub fn joined(&self, factory: TimeFactory) {
        let mut flags = self.flags.lock();
        flags.joined = true;
        flags.time_factory = Some(factory);
    }

    /// Check every precondition of `op` and mark any pending state it
    /// starts. Faults are reported in a fixed order: connection, callback
    /// reentrancy, membership, save, restore, then operation specifics.
    pub fn admit(&self, op: Operation, in_callback: bool) -> RtiResult<()> {
        let mut flags = self.flags.lock();
        let rules = op.rules();

        match op.known() {
            Some(OperationTag::Connect) => {
                if in_callback {
                    return Err(from_callback(op));
                }
                if flags.connected {
                    return Err(RtiError::AlreadyConnected(
                        "connect called on a connected session".into(),
                    ));
                }
                return Ok(());
            }
            Some(OperationTag::Disconnect) => {
                if in_callback {
                    return Err(from_callback(op));
                }
                if flags.joined {
                    return Err(RtiError::FederateIsExecutionMember(
                        "resign before disconnecting".into(),
                    ));
                }
                return Ok(());
            }
            _ => {}
        }

        if !flags.connected {
            return Err(RtiError::NotConnected(format!("{} needs a connection", op)));
        }
        if rules.forbidden_in_callback && in_callback {
            return Err(from_callback(op));
        }
        if rules.needs_join && !flags.joined {
            return Err(RtiError::FederateNotExecutionMember(format!(
                "{} needs a joined federate",
                op
            )));
        }
        if rules.blocked_by_save && flags.save.blocks() {
            return Err(RtiError::SaveInProgress(format!("{} refused during save", op)));
        }
        if rules.blocked_by_restore && flags.restore.blocks() {
            return Err(RtiError::RestoreInProgress(format!(
                "{} refused during restore",
                op
            )));
        }

        match op.known() {
            Some(tag) => check_and_mark(&mut flags, tag),
            None => Ok(()),
        }
    }

    /// Record a successful remote outcome for `op`.
    pub fn confirm(&self, op: Operation) {
        let Some(tag) = op.known() else {
            return;
        };
        let mut flags = self.flags.lock();
        match tag {
            OperationTag::ResignFederationExecution => flags.leave_federation(),
            OperationTag::DisableTimeRegulation => flags.regulation = Switch::Disabled,
            OperationTag::DisableTimeConstrained => flags.constrained = Switch::Disabled,
            OperationTag::RequestFederationSave if flags.save == Phase::None => {
                flags.save = Phase::Requested;
            }
            // federationSaved may already have closed the save.
            OperationTag::FederateSaveComplete | OperationTag::FederateSaveNotComplete
                if flags.save == Phase::InProgress =>
            {
                flags.save = Phase::AwaitingFederationAck;
            }
            OperationTag::AbortFederationSave => flags.save = Phase::None,
            OperationTag::FederateRestoreComplete | OperationTag::FederateRestoreNotComplete
                if flags.restore == Phase::InProgress =>
            {
                flags.restore = Phase::AwaitingFederationAck;
            }
            OperationTag::AbortFederationRestore => flags.restore = Phase::None,
            _ => {}
        }
    }

    /// Undo the pending mark `admit` placed, if it is still there.
    pub fn rollback(&self, op: Operation) {
        let Some(tag) = op.known() else {
            return;
        };
        let mut flags = self.flags.lock();
        match tag {
            OperationTag::EnableTimeRegulation if flags.regulation == Switch::Pending => {
                flags.regulation = Switch::Disabled;
            }
            OperationTag::EnableTimeConstrained if flags.constrained == Switch::Pending => {
                flags.constrained = Switch::Disabled;
            }
            other => {
                if TimeAdvance::for_request(other) == Some(flags.advance) {
                    flags.advance = TimeAdvance::None;
                }
            }
        }
    }

    /// Apply the state change a callback carries. Runs before the handler.
    pub fn apply_callback(&self, callback: &Callback) {
        let mut flags = self.flags.lock();
        match callback {
            Callback::TimeRegulationEnabled { .. } => flags.regulation = Switch::Enabled,
            Callback::TimeConstrainedEnabled { .. } => flags.constrained = Switch::Enabled,
            Callback::TimeAdvanceGrant { .. } | Callback::FlushQueueGrant { .. } => {
                flags.advance = TimeAdvance::None;
            }

            Callback::InitiateFederateSave { .. } => flags.save = Phase::InProgress,
            Callback::FederationSaved | Callback::FederationNotSaved { .. } => {
                flags.save = Phase::None;
            }

            Callback::RequestFederationRestoreSucceeded { .. } => flags.restore = Phase::Requested,
            Callback::RequestFederationRestoreFailed { .. } => flags.restore = Phase::None,
            Callback::FederationRestoreBegun | Callback::InitiateFederateRestore { .. } => {
                flags.restore = Phase::InProgress;
            }
            Callback::FederationRestored | Callback::FederationNotRestored { .. } => {
                flags.restore = Phase::None;
            }

            Callback::FederateResigned { .. } => flags.leave_federation(),
            Callback::ConnectionLost { .. } => *flags = LegalityFlags::default(),
            _ => {}
        }
    }
}

fn from_callback(op: Operation) -> RtiError {
    RtiError::CallNotAllowedFromWithinCallback(format!("{} called from a callback handler", op))
}

fn check_and_mark(flags: &mut LegalityFlags, tag: OperationTag) -> RtiResult<()> {
    use OperationTag::*;

    match tag {
        JoinFederationExecution if flags.joined => Err(RtiError::FederateAlreadyExecutionMember(
            "already joined".into(),
        )),

        EnableTimeRegulation => {
            match flags.regulation {
                Switch::Enabled => {
                    return Err(RtiError::TimeRegulationAlreadyEnabled(String::new()));
                }
                Switch::Pending => {
                    return Err(RtiError::RequestForTimeRegulationPending(String::new()));
                }
                Switch::Disabled => {}
            }
            advance_idle(flags)?;
            flags.regulation = Switch::Pending;
            Ok(())
        }
        EnableTimeConstrained => {
            match flags.constrained {
                Switch::Enabled => {
                    return Err(RtiError::TimeConstrainedAlreadyEnabled(String::new()));
                }
                Switch::Pending => {
                    return Err(RtiError::RequestForTimeConstrainedPending(String::new()));
                }
                Switch::Disabled => {}
            }
            advance_idle(flags)?;
            flags.constrained = Switch::Pending;
            Ok(())
        }
        DisableTimeRegulation if flags.regulation != Switch::Enabled => {
            Err(RtiError::TimeRegulationIsNotEnabled(String::new()))
        }
        DisableTimeConstrained if flags.constrained != Switch::Enabled => {
            Err(RtiError::TimeConstrainedIsNotEnabled(String::new()))
        }

        TimeAdvanceRequest | TimeAdvanceRequestAvailable | NextMessageRequest
        | NextMessageRequestAvailable | FlushQueueRequest => {
            advance_idle(flags)?;
            if flags.regulation == Switch::Pending {
                return Err(RtiError::RequestForTimeRegulationPending(String::new()));
            }
            if flags.constrained == Switch::Pending {
                return Err(RtiError::RequestForTimeConstrainedPending(String::new()));
            }
            if let Some(advance) = TimeAdvance::for_request(tag) {
                flags.advance = advance;
            }
            Ok(())
        }

        FederateSaveBegun if flags.save != Phase::InProgress => Err(RtiError::SaveNotInitiated(
            "no initiateFederateSave received".into(),
        )),
        FederateSaveComplete | FederateSaveNotComplete if flags.save != Phase::InProgress => {
            Err(RtiError::SaveNotInProgress(String::new()))
        }
        AbortFederationSave if flags.save == Phase::None => {
            Err(RtiError::SaveNotInProgress(String::new()))
        }

        FederateRestoreComplete | FederateRestoreNotComplete => match flags.restore {
            Phase::InProgress => Ok(()),
            Phase::None => Err(RtiError::RestoreNotRequested(String::new())),
            _ => Err(RtiError::RestoreNotInProgress(String::new())),
        },
        AbortFederationRestore if flags.restore == Phase::None => {
            Err(RtiError::RestoreNotInProgress(String::new()))
        }

        _ => Ok(()),
    }
}

fn advance_idle(flags: &LegalityFlags) -> RtiResult<()> {
    if flags.advance == TimeAdvance::None {
        Ok(())
    } else {
        Err(RtiError::InTimeAdvancingState(format!(
            "{:?} still awaiting its grant",
            flags.advance
        )))
    }
}
