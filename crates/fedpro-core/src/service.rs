//! Service enumerations

use std::fmt;

use crate::{Payload, PayloadReader, PayloadWriter, RtiError, RtiResult};

/// How pushed callbacks reach the federate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum CallbackModel {
    /// A dedicated thread delivers callbacks as they arrive
    Immediate,
    /// Callbacks queue up until the application evokes them
    #[default]
    Evoked,
}

impl CallbackModel {
    pub fn name(self) -> &'static str {
        match self {
            CallbackModel::Immediate => "HLA_IMMEDIATE",
            CallbackModel::Evoked => "HLA_EVOKED",
        }
    }
}

impl fmt::Display for CallbackModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the RTI does with owned attributes on resign
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResignAction {
    UnconditionallyDivestAttributes = 0,
    DeleteObjects = 1,
    CancelPendingOwnershipAcquisitions = 2,
    DeleteObjectsThenDivest = 3,
    CancelThenDeleteThenDivest = 4,
    NoAction = 5,
}

impl ResignAction {
    pub fn from_u8(v: u8) -> RtiResult<Self> {
        match v {
            0 => Ok(ResignAction::UnconditionallyDivestAttributes),
            1 => Ok(ResignAction::DeleteObjects),
            2 => Ok(ResignAction::CancelPendingOwnershipAcquisitions),
            3 => Ok(ResignAction::DeleteObjectsThenDivest),
            4 => Ok(ResignAction::CancelThenDeleteThenDivest),
            5 => Ok(ResignAction::NoAction),
            other => Err(RtiError::InvalidResignAction(format!("resign action {}", other))),
        }
    }
}

impl Payload for ResignAction {
    fn write(&self, w: &mut PayloadWriter) {
        w.put_u8(*self as u8);
    }

    fn read(r: &mut PayloadReader) -> RtiResult<Self> {
        Self::from_u8(r.get_u8()?).map_err(|e| RtiError::CouldNotDecode(e.to_string()))
    }
}

/// Message delivery order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OrderType {
    Receive = 0,
    Timestamp = 1,
}

impl Payload for OrderType {
    fn write(&self, w: &mut PayloadWriter) {
        w.put_u8(*self as u8);
    }

    fn read(r: &mut PayloadReader) -> RtiResult<Self> {
        match r.get_u8()? {
            0 => Ok(OrderType::Receive),
            1 => Ok(OrderType::Timestamp),
            other => Err(RtiError::CouldNotDecode(format!("order type {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_model_names() {
        assert_eq!(CallbackModel::Immediate.to_string(), "HLA_IMMEDIATE");
        assert_eq!(CallbackModel::default(), CallbackModel::Evoked);
    }

    #[test]
    fn test_resign_action_range() {
        assert_eq!(ResignAction::from_u8(5).unwrap(), ResignAction::NoAction);
        assert!(matches!(
            ResignAction::from_u8(9),
            Err(RtiError::InvalidResignAction(_))
        ));
    }
}
