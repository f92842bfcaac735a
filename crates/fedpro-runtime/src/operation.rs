//! Remote operations and the gates they pass before transmission

use std::fmt;

use fedpro_wire::OperationTag;

/// Which session state an operation needs before it may be sent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rules {
    pub needs_join: bool,
    pub forbidden_in_callback: bool,
    pub blocked_by_save: bool,
    pub blocked_by_restore: bool,
}

impl Rules {
    const CONNECTION: Rules = Rules {
        needs_join: false,
        forbidden_in_callback: false,
        blocked_by_save: false,
        blocked_by_restore: false,
    };

    const FEDERATION: Rules = Rules {
        needs_join: true,
        forbidden_in_callback: false,
        blocked_by_save: true,
        blocked_by_restore: true,
    };

    /// Support services stay available while a save or restore runs.
    const SUPPORT: Rules = Rules {
        needs_join: true,
        forbidden_in_callback: false,
        blocked_by_save: false,
        blocked_by_restore: false,
    };
}

/// How an operation reached through [`crate::RtiAmbassador::invoke`] is gated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InvokeScope {
    /// Needs a connection only (federation administration)
    Connection,
    /// Needs a joined federate and no save or restore in progress
    #[default]
    Federation,
}

/// One remote operation as seen by the legality gate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Known(OperationTag),
    Other { tag: u16, scope: InvokeScope },
}

impl Operation {
    pub fn tag(&self) -> u16 {
        match self {
            Operation::Known(tag) => tag.to_u16(),
            Operation::Other { tag, .. } => *tag,
        }
    }

    pub fn known(&self) -> Option<OperationTag> {
        match self {
            Operation::Known(tag) => Some(*tag),
            Operation::Other { .. } => None,
        }
    }

    pub fn forbidden_in_callback(&self) -> bool {
        self.rules().forbidden_in_callback
    }

    pub fn rules(&self) -> Rules {
        use OperationTag::*;

        let tag = match self {
            Operation::Other { scope: InvokeScope::Connection, .. } => return Rules::CONNECTION,
            Operation::Other { scope: InvokeScope::Federation, .. } => return Rules::FEDERATION,
            Operation::Known(tag) => *tag,
        };

        match tag {
            Connect | Disconnect => Rules {
                forbidden_in_callback: true,
                ..Rules::CONNECTION
            },
            JoinFederationExecution => Rules {
                forbidden_in_callback: true,
                ..Rules::CONNECTION
            },
            ResignFederationExecution => Rules {
                forbidden_in_callback: true,
                ..Rules::SUPPORT
            },

            FederateSaveBegun | FederateSaveComplete | FederateSaveNotComplete
            | AbortFederationSave | QueryFederationSaveStatus => Rules {
                blocked_by_save: false,
                ..Rules::FEDERATION
            },
            FederateRestoreComplete | FederateRestoreNotComplete | AbortFederationRestore
            | QueryFederationRestoreStatus => Rules {
                blocked_by_restore: false,
                ..Rules::FEDERATION
            },

            GetObjectClassHandle | GetAttributeHandle | GetInteractionClassHandle
            | GetParameterHandle | QueryLogicalTime | QueryGalt | QueryLookahead => Rules::SUPPORT,

            _ => Rules::FEDERATION,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Known(tag) => f.write_str(tag.name()),
            Operation::Other { tag, .. } => write!(f, "operation#{}", tag),
        }
    }
}

impl From<OperationTag> for Operation {
    fn from(tag: OperationTag) -> Self {
        Operation::Known(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_from_callback() {
        let forbidden: Vec<OperationTag> = OperationTag::ALL
            .iter()
            .copied()
            .filter(|t| Operation::Known(*t).forbidden_in_callback())
            .collect();
        assert_eq!(
            forbidden,
            vec![
                OperationTag::Connect,
                OperationTag::Disconnect,
                OperationTag::JoinFederationExecution,
                OperationTag::ResignFederationExecution,
            ]
        );
    }

    #[test]
    fn test_save_steps_pass_save_gate() {
        let rules = Operation::Known(OperationTag::FederateSaveComplete).rules();
        assert!(!rules.blocked_by_save);
        assert!(rules.blocked_by_restore);
        assert!(Operation::Known(OperationTag::TimeAdvanceRequest).rules().blocked_by_save);
    }

    #[test]
    fn test_generic_scopes() {
        let admin = Operation::Other {
            tag: 500,
            scope: InvokeScope::Connection,
        };
        assert!(!admin.rules().needs_join);
        assert_eq!(admin.to_string(), "operation#500");
        assert_eq!(admin.known(), None);

        let fed = Operation::Other {
            tag: 501,
            scope: InvokeScope::Federation,
        };
        assert!(fed.rules().needs_join && fed.rules().blocked_by_save);
    }
}
