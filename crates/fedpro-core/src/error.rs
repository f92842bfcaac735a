//! RTI fault taxonomy
//!
//! Every fault the coordinator can report has one variant here, carrying the
//! details string from the wire. The variant list doubles as the registry used
//! by [`crate::exception`] to rebuild a typed fault from its wire name.

use thiserror::Error;

macro_rules! rti_faults {
    ($( $variant:ident => $wire:literal ),* $(,)?) => {
        /// RTI faults, one variant per wire exception name
        #[derive(Error, Debug, Clone, PartialEq, Eq)]
        pub enum RtiError {
            $(
                #[error("{0}")]
                $variant(String),
            )*

            /// Fault name with no registered kind; name and details are kept
            #[error("Unexpected exception '{name}': {details}")]
            Unexpected { name: String, details: String },

            /// Operation the value at hand cannot perform
            #[error("Unsupported operation: {0}")]
            Unsupported(String),
        }

        impl RtiError {
            /// Registered fault kinds keyed by their wire name.
            pub const KINDS: &'static [(&'static str, fn(String) -> RtiError)] = &[
                $( ($wire, RtiError::$variant as fn(String) -> RtiError), )*
            ];

            /// Wire name of this fault.
            pub fn name(&self) -> &str {
                match self {
                    $( RtiError::$variant(_) => $wire, )*
                    RtiError::Unexpected { .. } => "RTIinternalError",
                    RtiError::Unsupported(_) => "UnsupportedOperation",
                }
            }

            /// Details string as delivered (or raised) with the fault.
            pub fn details(&self) -> &str {
                match self {
                    $( RtiError::$variant(details) => details, )*
                    RtiError::Unexpected { details, .. } => details,
                    RtiError::Unsupported(details) => details,
                }
            }
        }
    };
}

rti_faults! {
    AlreadyConnected => "AlreadyConnected",
    AsynchronousDeliveryAlreadyDisabled => "AsynchronousDeliveryAlreadyDisabled",
    AsynchronousDeliveryAlreadyEnabled => "AsynchronousDeliveryAlreadyEnabled",
    AttributeAcquisitionWasNotRequested => "AttributeAcquisitionWasNotRequested",
    AttributeAlreadyBeingAcquired => "AttributeAlreadyBeingAcquired",
    AttributeAlreadyBeingChanged => "AttributeAlreadyBeingChanged",
    AttributeAlreadyBeingDivested => "AttributeAlreadyBeingDivested",
    AttributeAlreadyOwned => "AttributeAlreadyOwned",
    AttributeDivestitureWasNotRequested => "AttributeDivestitureWasNotRequested",
    AttributeNotDefined => "AttributeNotDefined",
    AttributeNotOwned => "AttributeNotOwned",
    AttributeNotPublished => "AttributeNotPublished",
    AttributeNotRecognized => "AttributeNotRecognized",
    AttributeNotSubscribed => "AttributeNotSubscribed",
    AttributeRelevanceAdvisorySwitchIsOff => "AttributeRelevanceAdvisorySwitchIsOff",
    AttributeRelevanceAdvisorySwitchIsOn => "AttributeRelevanceAdvisorySwitchIsOn",
    AttributeScopeAdvisorySwitchIsOff => "AttributeScopeAdvisorySwitchIsOff",
    AttributeScopeAdvisorySwitchIsOn => "AttributeScopeAdvisorySwitchIsOn",
    CallNotAllowedFromWithinCallback => "CallNotAllowedFromWithinCallback",
    ConnectionFailed => "ConnectionFailed",
    CouldNotCreateLogicalTimeFactory => "CouldNotCreateLogicalTimeFactory",
    CouldNotDecode => "CouldNotDecode",
    CouldNotEncode => "CouldNotEncode",
    CouldNotOpenFdd => "CouldNotOpenFDD",
    CouldNotOpenMim => "CouldNotOpenMIM",
    DeletePrivilegeNotHeld => "DeletePrivilegeNotHeld",
    DesignatorIsHlaStandardMim => "DesignatorIsHLAstandardMIM",
    ErrorReadingFdd => "ErrorReadingFDD",
    ErrorReadingMim => "ErrorReadingMIM",
    FederateAlreadyExecutionMember => "FederateAlreadyExecutionMember",
    FederateHandleNotKnown => "FederateHandleNotKnown",
    FederateHasNotBegunSave => "FederateHasNotBegunSave",
    FederateInternalError => "FederateInternalError",
    FederateIsExecutionMember => "FederateIsExecutionMember",
    FederateNameAlreadyInUse => "FederateNameAlreadyInUse",
    FederateNotExecutionMember => "FederateNotExecutionMember",
    FederateOwnsAttributes => "FederateOwnsAttributes",
    FederateServiceInvocationsAreBeingReportedViaMom => "FederateServiceInvocationsAreBeingReportedViaMOM",
    FederateUnableToUseTime => "FederateUnableToUseTime",
    FederatesCurrentlyJoined => "FederatesCurrentlyJoined",
    FederationExecutionAlreadyExists => "FederationExecutionAlreadyExists",
    FederationExecutionDoesNotExist => "FederationExecutionDoesNotExist",
    IllegalName => "IllegalName",
    IllegalTimeArithmetic => "IllegalTimeArithmetic",
    InTimeAdvancingState => "InTimeAdvancingState",
    InconsistentFdd => "InconsistentFDD",
    InteractionClassAlreadyBeingChanged => "InteractionClassAlreadyBeingChanged",
    InteractionClassNotDefined => "InteractionClassNotDefined",
    InteractionClassNotPublished => "InteractionClassNotPublished",
    InteractionParameterNotDefined => "InteractionParameterNotDefined",
    InteractionRelevanceAdvisorySwitchIsOff => "InteractionRelevanceAdvisorySwitchIsOff",
    InteractionRelevanceAdvisorySwitchIsOn => "InteractionRelevanceAdvisorySwitchIsOn",
    InvalidAttributeHandle => "InvalidAttributeHandle",
    InvalidDimensionHandle => "InvalidDimensionHandle",
    InvalidFederateHandle => "InvalidFederateHandle",
    InvalidInteractionClassHandle => "InvalidInteractionClassHandle",
    InvalidLocalSettingsDesignator => "InvalidLocalSettingsDesignator",
    InvalidLogicalTime => "InvalidLogicalTime",
    InvalidLogicalTimeInterval => "InvalidLogicalTimeInterval",
    InvalidLookahead => "InvalidLookahead",
    InvalidMessageRetractionHandle => "InvalidMessageRetractionHandle",
    InvalidObjectClassHandle => "InvalidObjectClassHandle",
    InvalidOrderName => "InvalidOrderName",
    InvalidOrderType => "InvalidOrderType",
    InvalidParameterHandle => "InvalidParameterHandle",
    InvalidRangeBound => "InvalidRangeBound",
    InvalidRegion => "InvalidRegion",
    InvalidRegionContext => "InvalidRegionContext",
    InvalidResignAction => "InvalidResignAction",
    InvalidServiceGroup => "InvalidServiceGroup",
    InvalidTransportationName => "InvalidTransportationName",
    InvalidTransportationType => "InvalidTransportationType",
    InvalidUpdateRateDesignator => "InvalidUpdateRateDesignator",
    LogicalTimeAlreadyPassed => "LogicalTimeAlreadyPassed",
    MessageCanNoLongerBeRetracted => "MessageCanNoLongerBeRetracted",
    NameNotFound => "NameNotFound",
    NameSetWasEmpty => "NameSetWasEmpty",
    NoAcquisitionPending => "NoAcquisitionPending",
    NoRequestToEnableTimeConstrainedWasPending => "NoRequestToEnableTimeConstrainedWasPending",
    NoRequestToEnableTimeRegulationWasPending => "NoRequestToEnableTimeRegulationWasPending",
    NotConnected => "NotConnected",
    ObjectClassNotDefined => "ObjectClassNotDefined",
    ObjectClassNotPublished => "ObjectClassNotPublished",
    ObjectClassRelevanceAdvisorySwitchIsOff => "ObjectClassRelevanceAdvisorySwitchIsOff",
    ObjectClassRelevanceAdvisorySwitchIsOn => "ObjectClassRelevanceAdvisorySwitchIsOn",
    ObjectInstanceNameInUse => "ObjectInstanceNameInUse",
    ObjectInstanceNameNotReserved => "ObjectInstanceNameNotReserved",
    ObjectInstanceNotKnown => "ObjectInstanceNotKnown",
    OwnershipAcquisitionPending => "OwnershipAcquisitionPending",
    RtiException => "RTIexception",
    RtiInternalError => "RTIinternalError",
    RegionDoesNotContainSpecifiedDimension => "RegionDoesNotContainSpecifiedDimension",
    RegionInUseForUpdateOrSubscription => "RegionInUseForUpdateOrSubscription",
    RegionNotCreatedByThisFederate => "RegionNotCreatedByThisFederate",
    RequestForTimeConstrainedPending => "RequestForTimeConstrainedPending",
    RequestForTimeRegulationPending => "RequestForTimeRegulationPending",
    RestoreInProgress => "RestoreInProgress",
    RestoreNotInProgress => "RestoreNotInProgress",
    RestoreNotRequested => "RestoreNotRequested",
    SaveInProgress => "SaveInProgress",
    SaveNotInProgress => "SaveNotInProgress",
    SaveNotInitiated => "SaveNotInitiated",
    SynchronizationPointLabelNotAnnounced => "SynchronizationPointLabelNotAnnounced",
    TimeConstrainedAlreadyEnabled => "TimeConstrainedAlreadyEnabled",
    TimeConstrainedIsNotEnabled => "TimeConstrainedIsNotEnabled",
    TimeRegulationAlreadyEnabled => "TimeRegulationAlreadyEnabled",
    TimeRegulationIsNotEnabled => "TimeRegulationIsNotEnabled",
    UnableToPerformSave => "UnableToPerformSave",
    UnknownName => "UnknownName",
    UnsupportedCallbackModel => "UnsupportedCallbackModel",
}

impl RtiError {
    /// Wire name the coordinator originally sent, which differs from
    /// [`RtiError::name`] only for unregistered faults.
    pub fn original_name(&self) -> &str {
        match self {
            RtiError::Unexpected { name, .. } => name,
            other => other.name(),
        }
    }

}

/// Result type for RTI operations
pub type RtiResult<T> = Result<T, RtiError>;
