//! Typed callbacks
//!
//! A callback envelope is decoded into [`Callback`] before anything else
//! happens to it, so legality updates and handler dispatch both work from
//! one typed value. Payload layouts use the big-endian codec from
//! `fedpro-core`; logical times are their eight raw bytes, interpreted with
//! the time factory negotiated at join.

use bytes::Bytes;
use fedpro_core::{
    AttributeHandle, AttributeHandleSet, AttributeHandleValueMap, FederateHandle,
    FederateHandleSet, InteractionClassHandle, MessageRetractionHandle, ObjectClassHandle,
    ObjectInstanceHandle, ParameterHandleValueMap, PayloadReader, PayloadWriter, RtiError,
    RtiResult,
};
use fedpro_time::{TimeFactory, TimeValue};
use fedpro_wire::{CallbackTag, Envelope};

use crate::{FederateAmbassador, MessageInfo};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Callback {
    ConnectionLost {
        reason: String,
    },

    SynchronizationPointRegistrationSucceeded {
        label: String,
    },
    SynchronizationPointRegistrationFailed {
        label: String,
        reason: String,
    },
    AnnounceSynchronizationPoint {
        label: String,
        tag: Bytes,
    },
    FederationSynchronized {
        label: String,
        failed: FederateHandleSet,
    },

    InitiateFederateSave {
        label: String,
        time: Option<TimeValue>,
    },
    FederationSaved,
    FederationNotSaved {
        reason: String,
    },
    FederationSaveStatusResponse {
        statuses: Vec<(FederateHandle, String)>,
    },
    RequestFederationRestoreSucceeded {
        label: String,
    },
    RequestFederationRestoreFailed {
        label: String,
    },
    FederationRestoreBegun,
    InitiateFederateRestore {
        label: String,
        federate_name: String,
        federate: FederateHandle,
    },
    FederationRestored,
    FederationNotRestored {
        reason: String,
    },
    FederationRestoreStatusResponse {
        statuses: Vec<(FederateHandle, String)>,
    },

    StartRegistrationForObjectClass {
        class: ObjectClassHandle,
    },
    StopRegistrationForObjectClass {
        class: ObjectClassHandle,
    },
    TurnInteractionsOn {
        class: InteractionClassHandle,
    },
    TurnInteractionsOff {
        class: InteractionClassHandle,
    },
    ObjectInstanceNameReservationSucceeded {
        name: String,
    },
    ObjectInstanceNameReservationFailed {
        name: String,
    },

    DiscoverObjectInstance {
        object: ObjectInstanceHandle,
        class: ObjectClassHandle,
        name: String,
        producer: FederateHandle,
    },
    ReflectAttributeValues {
        object: ObjectInstanceHandle,
        values: AttributeHandleValueMap,
        tag: Bytes,
        info: MessageInfo,
    },
    ReceiveInteraction {
        class: InteractionClassHandle,
        parameters: ParameterHandleValueMap,
        tag: Bytes,
        info: MessageInfo,
    },
    RemoveObjectInstance {
        object: ObjectInstanceHandle,
        tag: Bytes,
        info: MessageInfo,
    },
    AttributesInScope {
        object: ObjectInstanceHandle,
        attributes: AttributeHandleSet,
    },
    AttributesOutOfScope {
        object: ObjectInstanceHandle,
        attributes: AttributeHandleSet,
    },
    ProvideAttributeValueUpdate {
        object: ObjectInstanceHandle,
        attributes: AttributeHandleSet,
        tag: Bytes,
    },
    TurnUpdatesOnForObjectInstance {
        object: ObjectInstanceHandle,
        attributes: AttributeHandleSet,
    },
    TurnUpdatesOffForObjectInstance {
        object: ObjectInstanceHandle,
        attributes: AttributeHandleSet,
    },

    RequestAttributeOwnershipAssumption {
        object: ObjectInstanceHandle,
        attributes: AttributeHandleSet,
        tag: Bytes,
    },
    AttributeOwnershipAcquisitionNotification {
        object: ObjectInstanceHandle,
        attributes: AttributeHandleSet,
        tag: Bytes,
    },
    AttributeOwnershipUnavailable {
        object: ObjectInstanceHandle,
        attributes: AttributeHandleSet,
    },
    RequestAttributeOwnershipRelease {
        object: ObjectInstanceHandle,
        attributes: AttributeHandleSet,
        tag: Bytes,
    },
    InformAttributeOwnership {
        object: ObjectInstanceHandle,
        attribute: AttributeHandle,
        owner: FederateHandle,
    },
    AttributeIsNotOwned {
        object: ObjectInstanceHandle,
        attribute: AttributeHandle,
    },
    AttributeIsOwnedByRti {
        object: ObjectInstanceHandle,
        attribute: AttributeHandle,
    },

    TimeRegulationEnabled {
        time: TimeValue,
    },
    TimeConstrainedEnabled {
        time: TimeValue,
    },
    TimeAdvanceGrant {
        time: TimeValue,
    },
    FlushQueueGrant {
        time: TimeValue,
        optimistic: TimeValue,
    },
    RequestRetraction {
        retraction: MessageRetractionHandle,
    },

    FederateResigned {
        reason: String,
    },
}

/// Append a logical time.
pub fn write_time(w: &mut PayloadWriter, time: &TimeValue) {
    time.write_to(w);
}

/// Presence byte, then the time when present.
pub fn write_opt_time(w: &mut PayloadWriter, time: Option<&TimeValue>) {
    match time {
        Some(t) => {
            w.put_bool(true);
            t.write_to(w);
        }
        None => {
            w.put_bool(false);
        }
    }
}

fn require_factory(factory: Option<TimeFactory>) -> RtiResult<TimeFactory> {
    factory.ok_or_else(|| {
        RtiError::CouldNotDecode("logical time received before a time factory was negotiated".into())
    })
}

pub fn read_time(r: &mut PayloadReader, factory: Option<TimeFactory>) -> RtiResult<TimeValue> {
    require_factory(factory)?.read_time(r)
}

pub fn read_opt_time(
    r: &mut PayloadReader,
    factory: Option<TimeFactory>,
) -> RtiResult<Option<TimeValue>> {
    if r.get_bool()? {
        read_time(r, factory).map(Some)
    } else {
        Ok(None)
    }
}

fn write_info(w: &mut PayloadWriter, info: &MessageInfo) {
    w.put(&info.order).put(&info.transportation).put(&info.producer);
    write_opt_time(w, info.time.as_ref());
}

fn read_info(r: &mut PayloadReader, factory: Option<TimeFactory>) -> RtiResult<MessageInfo> {
    Ok(MessageInfo {
        order: r.get()?,
        transportation: r.get()?,
        producer: r.get()?,
        time: read_opt_time(r, factory)?,
    })
}

impl Callback {
    pub fn tag(&self) -> CallbackTag {
        use Callback as C;
        match self {
            C::ConnectionLost { .. } => CallbackTag::ConnectionLost,
            C::SynchronizationPointRegistrationSucceeded { .. } => {
                CallbackTag::SynchronizationPointRegistrationSucceeded
            }
            C::SynchronizationPointRegistrationFailed { .. } => {
                CallbackTag::SynchronizationPointRegistrationFailed
            }
            C::AnnounceSynchronizationPoint { .. } => CallbackTag::AnnounceSynchronizationPoint,
            C::FederationSynchronized { .. } => CallbackTag::FederationSynchronized,
            C::InitiateFederateSave { .. } => CallbackTag::InitiateFederateSave,
            C::FederationSaved => CallbackTag::FederationSaved,
            C::FederationNotSaved { .. } => CallbackTag::FederationNotSaved,
            C::FederationSaveStatusResponse { .. } => CallbackTag::FederationSaveStatusResponse,
            C::RequestFederationRestoreSucceeded { .. } => {
                CallbackTag::RequestFederationRestoreSucceeded
            }
            C::RequestFederationRestoreFailed { .. } => CallbackTag::RequestFederationRestoreFailed,
            C::FederationRestoreBegun => CallbackTag::FederationRestoreBegun,
            C::InitiateFederateRestore { .. } => CallbackTag::InitiateFederateRestore,
            C::FederationRestored => CallbackTag::FederationRestored,
            C::FederationNotRestored { .. } => CallbackTag::FederationNotRestored,
            C::FederationRestoreStatusResponse { .. } => {
                CallbackTag::FederationRestoreStatusResponse
            }
            C::StartRegistrationForObjectClass { .. } => CallbackTag::StartRegistrationForObjectClass,
            C::StopRegistrationForObjectClass { .. } => CallbackTag::StopRegistrationForObjectClass,
            C::TurnInteractionsOn { .. } => CallbackTag::TurnInteractionsOn,
            C::TurnInteractionsOff { .. } => CallbackTag::TurnInteractionsOff,
            C::ObjectInstanceNameReservationSucceeded { .. } => {
                CallbackTag::ObjectInstanceNameReservationSucceeded
            }
            C::ObjectInstanceNameReservationFailed { .. } => {
                CallbackTag::ObjectInstanceNameReservationFailed
            }
            C::DiscoverObjectInstance { .. } => CallbackTag::DiscoverObjectInstance,
            C::ReflectAttributeValues { .. } => CallbackTag::ReflectAttributeValues,
            C::ReceiveInteraction { .. } => CallbackTag::ReceiveInteraction,
            C::RemoveObjectInstance { .. } => CallbackTag::RemoveObjectInstance,
            C::AttributesInScope { .. } => CallbackTag::AttributesInScope,
            C::AttributesOutOfScope { .. } => CallbackTag::AttributesOutOfScope,
            C::ProvideAttributeValueUpdate { .. } => CallbackTag::ProvideAttributeValueUpdate,
            C::TurnUpdatesOnForObjectInstance { .. } => CallbackTag::TurnUpdatesOnForObjectInstance,
            C::TurnUpdatesOffForObjectInstance { .. } => {
                CallbackTag::TurnUpdatesOffForObjectInstance
            }
            C::RequestAttributeOwnershipAssumption { .. } => {
                CallbackTag::RequestAttributeOwnershipAssumption
            }
            C::AttributeOwnershipAcquisitionNotification { .. } => {
                CallbackTag::AttributeOwnershipAcquisitionNotification
            }
            C::AttributeOwnershipUnavailable { .. } => CallbackTag::AttributeOwnershipUnavailable,
            C::RequestAttributeOwnershipRelease { .. } => {
                CallbackTag::RequestAttributeOwnershipRelease
            }
            C::InformAttributeOwnership { .. } => CallbackTag::InformAttributeOwnership,
            C::AttributeIsNotOwned { .. } => CallbackTag::AttributeIsNotOwned,
            C::AttributeIsOwnedByRti { .. } => CallbackTag::AttributeIsOwnedByRti,
            C::TimeRegulationEnabled { .. } => CallbackTag::TimeRegulationEnabled,
            C::TimeConstrainedEnabled { .. } => CallbackTag::TimeConstrainedEnabled,
            C::TimeAdvanceGrant { .. } => CallbackTag::TimeAdvanceGrant,
            C::FlushQueueGrant { .. } => CallbackTag::FlushQueueGrant,
            C::RequestRetraction { .. } => CallbackTag::RequestRetraction,
            C::FederateResigned { .. } => CallbackTag::FederateResigned,
        }
    }

    pub fn name(&self) -> &'static str {
        self.tag().name()
    }

    /// Build the envelope the coordinator would push for this callback.
    pub fn encode(&self) -> Envelope {
        use Callback as C;
        let mut w = PayloadWriter::new();
        match self {
            C::ConnectionLost { reason }
            | C::FederationNotSaved { reason }
            | C::FederationNotRestored { reason }
            | C::FederateResigned { reason } => {
                w.put_str(reason);
            }
            C::SynchronizationPointRegistrationSucceeded { label }
            | C::RequestFederationRestoreSucceeded { label }
            | C::RequestFederationRestoreFailed { label } => {
                w.put_str(label);
            }
            C::SynchronizationPointRegistrationFailed { label, reason } => {
                w.put_str(label).put_str(reason);
            }
            C::AnnounceSynchronizationPoint { label, tag } => {
                w.put_str(label).put_bytes(tag);
            }
            C::FederationSynchronized { label, failed } => {
                w.put_str(label).put(failed);
            }
            C::InitiateFederateSave { label, time } => {
                w.put_str(label);
                write_opt_time(&mut w, time.as_ref());
            }
            C::FederationSaved | C::FederationRestoreBegun | C::FederationRestored => {}
            C::FederationSaveStatusResponse { statuses }
            | C::FederationRestoreStatusResponse { statuses } => {
                w.put(statuses);
            }
            C::InitiateFederateRestore {
                label,
                federate_name,
                federate,
            } => {
                w.put_str(label).put_str(federate_name).put(federate);
            }
            C::StartRegistrationForObjectClass { class }
            | C::StopRegistrationForObjectClass { class } => {
                w.put(class);
            }
            C::TurnInteractionsOn { class } | C::TurnInteractionsOff { class } => {
                w.put(class);
            }
            C::ObjectInstanceNameReservationSucceeded { name }
            | C::ObjectInstanceNameReservationFailed { name } => {
                w.put_str(name);
            }
            C::DiscoverObjectInstance {
                object,
                class,
                name,
                producer,
            } => {
                w.put(object).put(class).put_str(name).put(producer);
            }
            C::ReflectAttributeValues {
                object,
                values,
                tag,
                info,
            } => {
                w.put(object).put(values).put_bytes(tag);
                write_info(&mut w, info);
            }
            C::ReceiveInteraction {
                class,
                parameters,
                tag,
                info,
            } => {
                w.put(class).put(parameters).put_bytes(tag);
                write_info(&mut w, info);
            }
            C::RemoveObjectInstance { object, tag, info } => {
                w.put(object).put_bytes(tag);
                write_info(&mut w, info);
            }
            C::AttributesInScope { object, attributes }
            | C::AttributesOutOfScope { object, attributes }
            | C::TurnUpdatesOnForObjectInstance { object, attributes }
            | C::TurnUpdatesOffForObjectInstance { object, attributes }
            | C::AttributeOwnershipUnavailable { object, attributes } => {
                w.put(object).put(attributes);
            }
            C::ProvideAttributeValueUpdate {
                object,
                attributes,
                tag,
            }
            | C::RequestAttributeOwnershipAssumption {
                object,
                attributes,
                tag,
            }
            | C::AttributeOwnershipAcquisitionNotification {
                object,
                attributes,
                tag,
            }
            | C::RequestAttributeOwnershipRelease {
                object,
                attributes,
                tag,
            } => {
                w.put(object).put(attributes).put_bytes(tag);
            }
            C::InformAttributeOwnership {
                object,
                attribute,
                owner,
            } => {
                w.put(object).put(attribute).put(owner);
            }
            C::AttributeIsNotOwned { object, attribute }
            | C::AttributeIsOwnedByRti { object, attribute } => {
                w.put(object).put(attribute);
            }
            C::TimeRegulationEnabled { time }
            | C::TimeConstrainedEnabled { time }
            | C::TimeAdvanceGrant { time } => {
                write_time(&mut w, time);
            }
            C::FlushQueueGrant { time, optimistic } => {
                write_time(&mut w, time);
                write_time(&mut w, optimistic);
            }
            C::RequestRetraction { retraction } => {
                w.put(retraction);
            }
        }
        Envelope::new(self.tag().to_u16(), w.finish())
    }

    /// Decode a pushed envelope. `factory` is the federation's time factory,
    /// if one has been negotiated yet.
    pub fn decode(envelope: &Envelope, factory: Option<TimeFactory>) -> RtiResult<Callback> {
        use CallbackTag as T;

        let tag = CallbackTag::from_u16(envelope.tag).ok_or_else(|| {
            RtiError::CouldNotDecode(format!("unknown callback tag {}", envelope.tag))
        })?;
        let mut r = PayloadReader::new(envelope.payload.clone());
        let r = &mut r;

        let callback = match tag {
            T::ConnectionLost => Callback::ConnectionLost { reason: r.get_str()? },
            T::SynchronizationPointRegistrationSucceeded => {
                Callback::SynchronizationPointRegistrationSucceeded { label: r.get_str()? }
            }
            T::SynchronizationPointRegistrationFailed => {
                Callback::SynchronizationPointRegistrationFailed {
                    label: r.get_str()?,
                    reason: r.get_str()?,
                }
            }
            T::AnnounceSynchronizationPoint => Callback::AnnounceSynchronizationPoint {
                label: r.get_str()?,
                tag: r.get_bytes()?,
            },
            T::FederationSynchronized => Callback::FederationSynchronized {
                label: r.get_str()?,
                failed: r.get()?,
            },
            T::InitiateFederateSave => Callback::InitiateFederateSave {
                label: r.get_str()?,
                time: read_opt_time(r, factory)?,
            },
            T::FederationSaved => Callback::FederationSaved,
            T::FederationNotSaved => Callback::FederationNotSaved { reason: r.get_str()? },
            T::FederationSaveStatusResponse => {
                Callback::FederationSaveStatusResponse { statuses: r.get()? }
            }
            T::RequestFederationRestoreSucceeded => {
                Callback::RequestFederationRestoreSucceeded { label: r.get_str()? }
            }
            T::RequestFederationRestoreFailed => {
                Callback::RequestFederationRestoreFailed { label: r.get_str()? }
            }
            T::FederationRestoreBegun => Callback::FederationRestoreBegun,
            T::InitiateFederateRestore => Callback::InitiateFederateRestore {
                label: r.get_str()?,
                federate_name: r.get_str()?,
                federate: r.get()?,
            },
            T::FederationRestored => Callback::FederationRestored,
            T::FederationNotRestored => Callback::FederationNotRestored { reason: r.get_str()? },
            T::FederationRestoreStatusResponse => {
                Callback::FederationRestoreStatusResponse { statuses: r.get()? }
            }
            T::StartRegistrationForObjectClass => {
                Callback::StartRegistrationForObjectClass { class: r.get()? }
            }
            T::StopRegistrationForObjectClass => {
                Callback::StopRegistrationForObjectClass { class: r.get()? }
            }
            T::TurnInteractionsOn => Callback::TurnInteractionsOn { class: r.get()? },
            T::TurnInteractionsOff => Callback::TurnInteractionsOff { class: r.get()? },
            T::ObjectInstanceNameReservationSucceeded => {
                Callback::ObjectInstanceNameReservationSucceeded { name: r.get_str()? }
            }
            T::ObjectInstanceNameReservationFailed => {
                Callback::ObjectInstanceNameReservationFailed { name: r.get_str()? }
            }
            T::DiscoverObjectInstance => Callback::DiscoverObjectInstance {
                object: r.get()?,
                class: r.get()?,
                name: r.get_str()?,
                producer: r.get()?,
            },
            T::ReflectAttributeValues => Callback::ReflectAttributeValues {
                object: r.get()?,
                values: r.get()?,
                tag: r.get_bytes()?,
                info: read_info(r, factory)?,
            },
            T::ReceiveInteraction => Callback::ReceiveInteraction {
                class: r.get()?,
                parameters: r.get()?,
                tag: r.get_bytes()?,
                info: read_info(r, factory)?,
            },
            T::RemoveObjectInstance => Callback::RemoveObjectInstance {
                object: r.get()?,
                tag: r.get_bytes()?,
                info: read_info(r, factory)?,
            },
            T::AttributesInScope => Callback::AttributesInScope {
                object: r.get()?,
                attributes: r.get()?,
            },
            T::AttributesOutOfScope => Callback::AttributesOutOfScope {
                object: r.get()?,
                attributes: r.get()?,
            },
            T::ProvideAttributeValueUpdate => Callback::ProvideAttributeValueUpdate {
                object: r.get()?,
                attributes: r.get()?,
                tag: r.get_bytes()?,
            },
            T::TurnUpdatesOnForObjectInstance => Callback::TurnUpdatesOnForObjectInstance {
                object: r.get()?,
                attributes: r.get()?,
            },
            T::TurnUpdatesOffForObjectInstance => Callback::TurnUpdatesOffForObjectInstance {
                object: r.get()?,
                attributes: r.get()?,
            },
            T::RequestAttributeOwnershipAssumption => {
                Callback::RequestAttributeOwnershipAssumption {
                    object: r.get()?,
                    attributes: r.get()?,
                    tag: r.get_bytes()?,
                }
            }
            T::AttributeOwnershipAcquisitionNotification => {
                Callback::AttributeOwnershipAcquisitionNotification {
                    object: r.get()?,
                    attributes: r.get()?,
                    tag: r.get_bytes()?,
                }
            }
            T::AttributeOwnershipUnavailable => Callback::AttributeOwnershipUnavailable {
                object: r.get()?,
                attributes: r.get()?,
            },
            T::RequestAttributeOwnershipRelease => Callback::RequestAttributeOwnershipRelease {
                object: r.get()?,
                attributes: r.get()?,
                tag: r.get_bytes()?,
            },
            T::InformAttributeOwnership => Callback::InformAttributeOwnership {
                object: r.get()?,
                attribute: r.get()?,
                owner: r.get()?,
            },
            T::AttributeIsNotOwned => Callback::AttributeIsNotOwned {
                object: r.get()?,
                attribute: r.get()?,
            },
            T::AttributeIsOwnedByRti => Callback::AttributeIsOwnedByRti {
                object: r.get()?,
                attribute: r.get()?,
            },
            T::TimeRegulationEnabled => Callback::TimeRegulationEnabled {
                time: read_time(r, factory)?,
            },
            T::TimeConstrainedEnabled => Callback::TimeConstrainedEnabled {
                time: read_time(r, factory)?,
            },
            T::TimeAdvanceGrant => Callback::TimeAdvanceGrant {
                time: read_time(r, factory)?,
            },
            T::FlushQueueGrant => Callback::FlushQueueGrant {
                time: read_time(r, factory)?,
                optimistic: read_time(r, factory)?,
            },
            T::RequestRetraction => Callback::RequestRetraction {
                retraction: r.get()?,
            },
            T::FederateResigned => Callback::FederateResigned { reason: r.get_str()? },
        };

        if r.remaining() > 0 {
            return Err(RtiError::CouldNotDecode(format!(
                "{} trailing bytes after {}",
                r.remaining(),
                tag
            )));
        }
        Ok(callback)
    }

    /// Hand this callback to the matching handler method.
    pub fn deliver(&self, fed: &mut dyn FederateAmbassador) -> RtiResult<()> {
        use Callback as C;
        match self {
            C::ConnectionLost { reason } => fed.connection_lost(reason),
            C::SynchronizationPointRegistrationSucceeded { label } => {
                fed.synchronization_point_registration_succeeded(label)
            }
            C::SynchronizationPointRegistrationFailed { label, reason } => {
                fed.synchronization_point_registration_failed(label, reason)
            }
            C::AnnounceSynchronizationPoint { label, tag } => {
                fed.announce_synchronization_point(label, tag)
            }
            C::FederationSynchronized { label, failed } => {
                fed.federation_synchronized(label, failed)
            }
            C::InitiateFederateSave { label, time } => {
                fed.initiate_federate_save(label, time.as_ref())
            }
            C::FederationSaved => fed.federation_saved(),
            C::FederationNotSaved { reason } => fed.federation_not_saved(reason),
            C::FederationSaveStatusResponse { statuses } => {
                fed.federation_save_status_response(statuses)
            }
            C::RequestFederationRestoreSucceeded { label } => {
                fed.request_federation_restore_succeeded(label)
            }
            C::RequestFederationRestoreFailed { label } => {
                fed.request_federation_restore_failed(label)
            }
            C::FederationRestoreBegun => fed.federation_restore_begun(),
            C::InitiateFederateRestore {
                label,
                federate_name,
                federate,
            } => fed.initiate_federate_restore(label, federate_name, federate),
            C::FederationRestored => fed.federation_restored(),
            C::FederationNotRestored { reason } => fed.federation_not_restored(reason),
            C::FederationRestoreStatusResponse { statuses } => {
                fed.federation_restore_status_response(statuses)
            }
            C::StartRegistrationForObjectClass { class } => {
                fed.start_registration_for_object_class(class)
            }
            C::StopRegistrationForObjectClass { class } => {
                fed.stop_registration_for_object_class(class)
            }
            C::TurnInteractionsOn { class } => fed.turn_interactions_on(class),
            C::TurnInteractionsOff { class } => fed.turn_interactions_off(class),
            C::ObjectInstanceNameReservationSucceeded { name } => {
                fed.object_instance_name_reservation_succeeded(name)
            }
            C::ObjectInstanceNameReservationFailed { name } => {
                fed.object_instance_name_reservation_failed(name)
            }
            C::DiscoverObjectInstance {
                object,
                class,
                name,
                producer,
            } => fed.discover_object_instance(object, class, name, producer),
            C::ReflectAttributeValues {
                object,
                values,
                tag,
                info,
            } => fed.reflect_attribute_values(object, values, tag, info),
            C::ReceiveInteraction {
                class,
                parameters,
                tag,
                info,
            } => fed.receive_interaction(class, parameters, tag, info),
            C::RemoveObjectInstance { object, tag, info } => {
                fed.remove_object_instance(object, tag, info)
            }
            C::AttributesInScope { object, attributes } => {
                fed.attributes_in_scope(object, attributes)
            }
            C::AttributesOutOfScope { object, attributes } => {
                fed.attributes_out_of_scope(object, attributes)
            }
            C::ProvideAttributeValueUpdate {
                object,
                attributes,
                tag,
            } => fed.provide_attribute_value_update(object, attributes, tag),
            C::TurnUpdatesOnForObjectInstance { object, attributes } => {
                fed.turn_updates_on_for_object_instance(object, attributes)
            }
            C::TurnUpdatesOffForObjectInstance { object, attributes } => {
                fed.turn_updates_off_for_object_instance(object, attributes)
            }
            C::RequestAttributeOwnershipAssumption {
                object,
                attributes,
                tag,
            } => fed.request_attribute_ownership_assumption(object, attributes, tag),
            C::AttributeOwnershipAcquisitionNotification {
                object,
                attributes,
                tag,
            } => fed.attribute_ownership_acquisition_notification(object, attributes, tag),
            C::AttributeOwnershipUnavailable { object, attributes } => {
                fed.attribute_ownership_unavailable(object, attributes)
            }
            C::RequestAttributeOwnershipRelease {
                object,
                attributes,
                tag,
            } => fed.request_attribute_ownership_release(object, attributes, tag),
            C::InformAttributeOwnership {
                object,
                attribute,
                owner,
            } => fed.inform_attribute_ownership(object, attribute, owner),
            C::AttributeIsNotOwned { object, attribute } => {
                fed.attribute_is_not_owned(object, attribute)
            }
            C::AttributeIsOwnedByRti { object, attribute } => {
                fed.attribute_is_owned_by_rti(object, attribute)
            }
            C::TimeRegulationEnabled { time } => fed.time_regulation_enabled(time),
            C::TimeConstrainedEnabled { time } => fed.time_constrained_enabled(time),
            C::TimeAdvanceGrant { time } => fed.time_advance_grant(time),
            C::FlushQueueGrant { time, optimistic } => fed.flush_queue_grant(time, optimistic),
            C::RequestRetraction { retraction } => fed.request_retraction(retraction),
            C::FederateResigned { reason } => fed.federate_resigned(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedpro_core::{OrderType, TransportationTypeHandle};
    use fedpro_time::{Float64Time, Integer64Time};

    fn int_time(v: i64) -> TimeValue {
        TimeValue::from(Integer64Time::new(v).unwrap())
    }

    #[test]
    fn test_reflect_with_time() {
        let mut values = AttributeHandleValueMap::new();
        values.insert(AttributeHandle::from_u32(3), Bytes::from_static(b"pos"));
        let cb = Callback::ReflectAttributeValues {
            object: ObjectInstanceHandle::from_u32(9),
            values,
            tag: Bytes::from_static(b"t"),
            info: MessageInfo {
                order: OrderType::Timestamp,
                transportation: TransportationTypeHandle::HLA_RELIABLE,
                producer: FederateHandle::from_u32(2),
                time: Some(int_time(40)),
            },
        };
        let env = cb.encode();
        assert_eq!(env.tag, CallbackTag::ReflectAttributeValues.to_u16());
        assert_eq!(Callback::decode(&env, Some(TimeFactory::Integer64)).unwrap(), cb);
    }

    #[test]
    fn test_time_needs_factory() {
        let env = Callback::TimeAdvanceGrant { time: int_time(1) }.encode();
        assert!(matches!(
            Callback::decode(&env, None),
            Err(RtiError::CouldNotDecode(_))
        ));
    }

    #[test]
    fn test_grant_decodes_in_negotiated_family() {
        let env = Callback::TimeAdvanceGrant {
            time: TimeValue::from(Float64Time::new(2.5)),
        }
        .encode();
        let cb = Callback::decode(&env, Some(TimeFactory::Float64)).unwrap();
        assert_eq!(
            cb,
            Callback::TimeAdvanceGrant {
                time: TimeValue::from(Float64Time::new(2.5))
            }
        );
    }

    #[test]
    fn test_unknown_tag_and_truncation() {
        let unknown = Envelope::new(999, Bytes::new());
        assert!(Callback::decode(&unknown, None).is_err());

        let mut env = Callback::FederationNotSaved {
            reason: "disk full".into(),
        }
        .encode();
        env.payload = env.payload.slice(..env.payload.len() - 1);
        assert!(matches!(
            Callback::decode(&env, None),
            Err(RtiError::CouldNotDecode(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let env = Envelope::new(CallbackTag::FederationSaved.to_u16(), vec![0u8]);
        assert!(Callback::decode(&env, None).is_err());
    }

    #[test]
    fn test_deliver_routes_to_handler() {
        #[derive(Default)]
        struct Grants(Vec<String>);
        impl FederateAmbassador for Grants {
            fn time_advance_grant(&mut self, time: &TimeValue) -> RtiResult<()> {
                self.0.push(time.to_string());
                Ok(())
            }
        }

        let mut fed = Grants::default();
        Callback::TimeAdvanceGrant { time: int_time(5) }.deliver(&mut fed).unwrap();
        Callback::FederationSaved.deliver(&mut fed).unwrap();
        assert_eq!(fed.0, vec!["HLAinteger64Time<5>".to_string()]);
    }

    #[test]
    fn test_every_tag_has_a_name() {
        for tag in CallbackTag::ALL {
            assert!(!tag.name().is_empty());
        }
        assert_eq!(Callback::FederationSaved.name(), "federationSaved");
    }
}
