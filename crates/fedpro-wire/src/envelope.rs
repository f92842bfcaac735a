//! Call and callback envelopes
//!
//! An envelope is the body of a `CALL_REQUEST` or `CALLBACK_REQUEST`:
//! `tag (u16) | payload`. The tag names the remote operation or callback
//! kind; the payload is opaque at this layer.

use bytes::Bytes;
use fedpro_core::{PayloadReader, PayloadWriter, RtiResult};

/// Tag plus opaque payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub tag: u16,
    pub payload: Bytes,
}

impl Envelope {
    pub fn new(tag: u16, payload: impl Into<Bytes>) -> Self {
        Envelope {
            tag,
            payload: payload.into(),
        }
    }

    pub fn encoded_len(&self) -> usize {
        2 + self.payload.len()
    }

    pub fn write(&self, w: &mut PayloadWriter) {
        w.put_u16(self.tag).put_raw(&self.payload);
    }

    /// Consume the tag and everything after it.
    pub fn read(r: &mut PayloadReader) -> RtiResult<Self> {
        let tag = r.get_u16()?;
        Ok(Envelope {
            tag,
            payload: r.rest(),
        })
    }
}

macro_rules! wire_tags {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:literal => $wire:literal,)* }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u16)]
        pub enum $name {
            $($variant = $value,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            pub fn from_u16(v: u16) -> Option<Self> {
                match v {
                    $($value => Some($name::$variant),)*
                    _ => None,
                }
            }

            #[inline]
            pub fn to_u16(self) -> u16 {
                self as u16
            }

            /// Operation name as the coordinator spells it
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)*
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

wire_tags! {
    /// Remote operations with a typed client entry point
    OperationTag {
        Connect = 1 => "connect",
        Disconnect = 2 => "disconnect",

        JoinFederationExecution = 10 => "joinFederationExecution",
        ResignFederationExecution = 11 => "resignFederationExecution",
        RegisterFederationSynchronizationPoint = 12 => "registerFederationSynchronizationPoint",
        SynchronizationPointAchieved = 13 => "synchronizationPointAchieved",

        RequestFederationSave = 20 => "requestFederationSave",
        FederateSaveBegun = 21 => "federateSaveBegun",
        FederateSaveComplete = 22 => "federateSaveComplete",
        FederateSaveNotComplete = 23 => "federateSaveNotComplete",
        AbortFederationSave = 24 => "abortFederationSave",
        QueryFederationSaveStatus = 25 => "queryFederationSaveStatus",
        RequestFederationRestore = 26 => "requestFederationRestore",
        FederateRestoreComplete = 27 => "federateRestoreComplete",
        FederateRestoreNotComplete = 28 => "federateRestoreNotComplete",
        AbortFederationRestore = 29 => "abortFederationRestore",
        QueryFederationRestoreStatus = 30 => "queryFederationRestoreStatus",

        PublishObjectClassAttributes = 40 => "publishObjectClassAttributes",
        UnpublishObjectClass = 41 => "unpublishObjectClass",
        SubscribeObjectClassAttributes = 42 => "subscribeObjectClassAttributes",
        UnsubscribeObjectClass = 43 => "unsubscribeObjectClass",
        PublishInteractionClass = 44 => "publishInteractionClass",
        UnpublishInteractionClass = 45 => "unpublishInteractionClass",
        SubscribeInteractionClass = 46 => "subscribeInteractionClass",
        UnsubscribeInteractionClass = 47 => "unsubscribeInteractionClass",

        RegisterObjectInstance = 50 => "registerObjectInstance",
        UpdateAttributeValues = 51 => "updateAttributeValues",
        SendInteraction = 52 => "sendInteraction",
        DeleteObjectInstance = 53 => "deleteObjectInstance",
        ReserveObjectInstanceName = 54 => "reserveObjectInstanceName",
        RequestAttributeValueUpdate = 55 => "requestAttributeValueUpdate",

        GetObjectClassHandle = 60 => "getObjectClassHandle",
        GetAttributeHandle = 61 => "getAttributeHandle",
        GetInteractionClassHandle = 62 => "getInteractionClassHandle",
        GetParameterHandle = 63 => "getParameterHandle",

        EnableTimeRegulation = 70 => "enableTimeRegulation",
        DisableTimeRegulation = 71 => "disableTimeRegulation",
        EnableTimeConstrained = 72 => "enableTimeConstrained",
        DisableTimeConstrained = 73 => "disableTimeConstrained",
        TimeAdvanceRequest = 74 => "timeAdvanceRequest",
        TimeAdvanceRequestAvailable = 75 => "timeAdvanceRequestAvailable",
        NextMessageRequest = 76 => "nextMessageRequest",
        NextMessageRequestAvailable = 77 => "nextMessageRequestAvailable",
        FlushQueueRequest = 78 => "flushQueueRequest",
        QueryLogicalTime = 79 => "queryLogicalTime",
        QueryGalt = 80 => "queryGALT",
        QueryLookahead = 81 => "queryLookahead",

        UnconditionalAttributeOwnershipDivestiture = 90 => "unconditionalAttributeOwnershipDivestiture",
        AttributeOwnershipAcquisition = 91 => "attributeOwnershipAcquisition",
        QueryAttributeOwnership = 92 => "queryAttributeOwnership",
    }
}

wire_tags! {
    /// Callbacks pushed by the coordinator
    CallbackTag {
        ConnectionLost = 1 => "connectionLost",

        SynchronizationPointRegistrationSucceeded = 10 => "synchronizationPointRegistrationSucceeded",
        SynchronizationPointRegistrationFailed = 11 => "synchronizationPointRegistrationFailed",
        AnnounceSynchronizationPoint = 12 => "announceSynchronizationPoint",
        FederationSynchronized = 13 => "federationSynchronized",

        InitiateFederateSave = 20 => "initiateFederateSave",
        FederationSaved = 21 => "federationSaved",
        FederationNotSaved = 22 => "federationNotSaved",
        FederationSaveStatusResponse = 23 => "federationSaveStatusResponse",
        RequestFederationRestoreSucceeded = 24 => "requestFederationRestoreSucceeded",
        RequestFederationRestoreFailed = 25 => "requestFederationRestoreFailed",
        FederationRestoreBegun = 26 => "federationRestoreBegun",
        InitiateFederateRestore = 27 => "initiateFederateRestore",
        FederationRestored = 28 => "federationRestored",
        FederationNotRestored = 29 => "federationNotRestored",
        FederationRestoreStatusResponse = 30 => "federationRestoreStatusResponse",

        StartRegistrationForObjectClass = 40 => "startRegistrationForObjectClass",
        StopRegistrationForObjectClass = 41 => "stopRegistrationForObjectClass",
        TurnInteractionsOn = 42 => "turnInteractionsOn",
        TurnInteractionsOff = 43 => "turnInteractionsOff",
        ObjectInstanceNameReservationSucceeded = 44 => "objectInstanceNameReservationSucceeded",
        ObjectInstanceNameReservationFailed = 45 => "objectInstanceNameReservationFailed",

        DiscoverObjectInstance = 50 => "discoverObjectInstance",
        ReflectAttributeValues = 51 => "reflectAttributeValues",
        ReceiveInteraction = 52 => "receiveInteraction",
        RemoveObjectInstance = 53 => "removeObjectInstance",
        AttributesInScope = 54 => "attributesInScope",
        AttributesOutOfScope = 55 => "attributesOutOfScope",
        ProvideAttributeValueUpdate = 56 => "provideAttributeValueUpdate",
        TurnUpdatesOnForObjectInstance = 57 => "turnUpdatesOnForObjectInstance",
        TurnUpdatesOffForObjectInstance = 58 => "turnUpdatesOffForObjectInstance",

        RequestAttributeOwnershipAssumption = 70 => "requestAttributeOwnershipAssumption",
        AttributeOwnershipAcquisitionNotification = 71 => "attributeOwnershipAcquisitionNotification",
        AttributeOwnershipUnavailable = 72 => "attributeOwnershipUnavailable",
        RequestAttributeOwnershipRelease = 73 => "requestAttributeOwnershipRelease",
        InformAttributeOwnership = 74 => "informAttributeOwnership",
        AttributeIsNotOwned = 75 => "attributeIsNotOwned",
        AttributeIsOwnedByRti = 76 => "attributeIsOwnedByRTI",

        TimeRegulationEnabled = 80 => "timeRegulationEnabled",
        TimeConstrainedEnabled = 81 => "timeConstrainedEnabled",
        TimeAdvanceGrant = 82 => "timeAdvanceGrant",
        FlushQueueGrant = 83 => "flushQueueGrant",
        RequestRetraction = 84 => "requestRetraction",

        FederateResigned = 90 => "federateResigned",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_envelope_layout() {
        let env = Envelope::new(OperationTag::TimeAdvanceRequest.to_u16(), vec![9u8, 8]);
        let mut w = PayloadWriter::new();
        env.write(&mut w);
        let bytes = w.finish();
        assert_eq!(&bytes[..], &[0, 74, 9, 8]);
        assert_eq!(env.encoded_len(), bytes.len());

        let back = Envelope::read(&mut PayloadReader::new(bytes)).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn test_empty_payload_envelope() {
        let back = Envelope::read(&mut PayloadReader::new(Bytes::from_static(&[0, 2]))).unwrap();
        assert_eq!(back.tag, 2);
        assert!(back.payload.is_empty());
        assert!(Envelope::read(&mut PayloadReader::new(Bytes::from_static(&[1]))).is_err());
    }

    #[test]
    fn test_tags_unique() {
        let ops: HashSet<u16> = OperationTag::ALL.iter().map(|t| t.to_u16()).collect();
        assert_eq!(ops.len(), OperationTag::ALL.len());
        let cbs: HashSet<&str> = CallbackTag::ALL.iter().map(|t| t.name()).collect();
        assert_eq!(cbs.len(), CallbackTag::ALL.len());
    }

    #[test]
    fn test_tag_lookup() {
        for tag in OperationTag::ALL {
            assert_eq!(OperationTag::from_u16(tag.to_u16()), Some(*tag));
        }
        assert_eq!(CallbackTag::from_u16(82), Some(CallbackTag::TimeAdvanceGrant));
        assert_eq!(CallbackTag::from_u16(999), None);
        assert_eq!(CallbackTag::AttributeIsOwnedByRti.to_string(), "attributeIsOwnedByRTI");
    }
}
