//! Federate handler interface
//!
//! One method per callback kind, each with a no-op default. Handlers run one
//! at a time, in arrival order, on either the dispatch thread (immediate
//! model) or the thread that evoked them (evoked model). Returning an error
//! reports the callback as failed to the coordinator; it never stops
//! delivery of later callbacks.

use bytes::Bytes;
use fedpro_core::{
    AttributeHandle, AttributeHandleSet, AttributeHandleValueMap, FederateHandle,
    FederateHandleSet, InteractionClassHandle, MessageRetractionHandle, ObjectClassHandle,
    ObjectInstanceHandle, OrderType, ParameterHandleValueMap, RtiResult,
    TransportationTypeHandle,
};
use fedpro_time::TimeValue;

/// Delivery details shared by reflections, interactions and removals
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageInfo {
    pub order: OrderType,
    pub transportation: TransportationTypeHandle,
    pub producer: FederateHandle,
    /// Present for timestamp-ordered deliveries
    pub time: Option<TimeValue>,
}

#[allow(unused_variables)]
pub trait FederateAmbassador: Send {
    fn connection_lost(&mut self, reason: &str) -> RtiResult<()> {
        Ok(())
    }

    // Synchronization points

    fn synchronization_point_registration_succeeded(&mut self, label: &str) -> RtiResult<()> {
        Ok(())
    }

    fn synchronization_point_registration_failed(
        &mut self,
        label: &str,
        reason: &str,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn announce_synchronization_point(&mut self, label: &str, tag: &Bytes) -> RtiResult<()> {
        Ok(())
    }

    fn federation_synchronized(&mut self, label: &str, failed: &FederateHandleSet) -> RtiResult<()> {
        Ok(())
    }

    // Save and restore

    fn initiate_federate_save(&mut self, label: &str, time: Option<&TimeValue>) -> RtiResult<()> {
        Ok(())
    }

    fn federation_saved(&mut self) -> RtiResult<()> {
        Ok(())
    }

    fn federation_not_saved(&mut self, reason: &str) -> RtiResult<()> {
        Ok(())
    }

    fn federation_save_status_response(
        &mut self,
        statuses: &[(FederateHandle, String)],
    ) -> RtiResult<()> {
        Ok(())
    }

    fn request_federation_restore_succeeded(&mut self, label: &str) -> RtiResult<()> {
        Ok(())
    }

    fn request_federation_restore_failed(&mut self, label: &str) -> RtiResult<()> {
        Ok(())
    }

    fn federation_restore_begun(&mut self) -> RtiResult<()> {
        Ok(())
    }

    fn initiate_federate_restore(
        &mut self,
        label: &str,
        federate_name: &str,
        federate: &FederateHandle,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn federation_restored(&mut self) -> RtiResult<()> {
        Ok(())
    }

    fn federation_not_restored(&mut self, reason: &str) -> RtiResult<()> {
        Ok(())
    }

    fn federation_restore_status_response(
        &mut self,
        statuses: &[(FederateHandle, String)],
    ) -> RtiResult<()> {
        Ok(())
    }

    // Declaration advisories

    fn start_registration_for_object_class(&mut self, class: &ObjectClassHandle) -> RtiResult<()> {
        Ok(())
    }

    fn stop_registration_for_object_class(&mut self, class: &ObjectClassHandle) -> RtiResult<()> {
        Ok(())
    }

    fn turn_interactions_on(&mut self, class: &InteractionClassHandle) -> RtiResult<()> {
        Ok(())
    }

    fn turn_interactions_off(&mut self, class: &InteractionClassHandle) -> RtiResult<()> {
        Ok(())
    }

    // Objects

    fn object_instance_name_reservation_succeeded(&mut self, name: &str) -> RtiResult<()> {
        Ok(())
    }

    fn object_instance_name_reservation_failed(&mut self, name: &str) -> RtiResult<()> {
        Ok(())
    }

    fn discover_object_instance(
        &mut self,
        object: &ObjectInstanceHandle,
        class: &ObjectClassHandle,
        name: &str,
        producer: &FederateHandle,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn reflect_attribute_values(
        &mut self,
        object: &ObjectInstanceHandle,
        values: &AttributeHandleValueMap,
        tag: &Bytes,
        info: &MessageInfo,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn receive_interaction(
        &mut self,
        class: &InteractionClassHandle,
        parameters: &ParameterHandleValueMap,
        tag: &Bytes,
        info: &MessageInfo,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn remove_object_instance(
        &mut self,
        object: &ObjectInstanceHandle,
        tag: &Bytes,
        info: &MessageInfo,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn attributes_in_scope(
        &mut self,
        object: &ObjectInstanceHandle,
        attributes: &AttributeHandleSet,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn attributes_out_of_scope(
        &mut self,
        object: &ObjectInstanceHandle,
        attributes: &AttributeHandleSet,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn provide_attribute_value_update(
        &mut self,
        object: &ObjectInstanceHandle,
        attributes: &AttributeHandleSet,
        tag: &Bytes,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn turn_updates_on_for_object_instance(
        &mut self,
        object: &ObjectInstanceHandle,
        attributes: &AttributeHandleSet,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn turn_updates_off_for_object_instance(
        &mut self,
        object: &ObjectInstanceHandle,
        attributes: &AttributeHandleSet,
    ) -> RtiResult<()> {
        Ok(())
    }

    // Ownership

    fn request_attribute_ownership_assumption(
        &mut self,
        object: &ObjectInstanceHandle,
        attributes: &AttributeHandleSet,
        tag: &Bytes,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn attribute_ownership_acquisition_notification(
        &mut self,
        object: &ObjectInstanceHandle,
        attributes: &AttributeHandleSet,
        tag: &Bytes,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn attribute_ownership_unavailable(
        &mut self,
        object: &ObjectInstanceHandle,
        attributes: &AttributeHandleSet,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn request_attribute_ownership_release(
        &mut self,
        object: &ObjectInstanceHandle,
        attributes: &AttributeHandleSet,
        tag: &Bytes,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn inform_attribute_ownership(
        &mut self,
        object: &ObjectInstanceHandle,
        attribute: &AttributeHandle,
        owner: &FederateHandle,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn attribute_is_not_owned(
        &mut self,
        object: &ObjectInstanceHandle,
        attribute: &AttributeHandle,
    ) -> RtiResult<()> {
        Ok(())
    }

    fn attribute_is_owned_by_rti(
        &mut self,
        object: &ObjectInstanceHandle,
        attribute: &AttributeHandle,
    ) -> RtiResult<()> {
        Ok(())
    }

    // Time management

    fn time_regulation_enabled(&mut self, time: &TimeValue) -> RtiResult<()> {
        Ok(())
    }

    fn time_constrained_enabled(&mut self, time: &TimeValue) -> RtiResult<()> {
        Ok(())
    }

    fn time_advance_grant(&mut self, time: &TimeValue) -> RtiResult<()> {
        Ok(())
    }

    fn flush_queue_grant(&mut self, time: &TimeValue, optimistic: &TimeValue) -> RtiResult<()> {
        Ok(())
    }

    fn request_retraction(&mut self, retraction: &MessageRetractionHandle) -> RtiResult<()> {
        Ok(())
    }

    fn federate_resigned(&mut self, reason: &str) -> RtiResult<()> {
        Ok(())
    }
}

/// A federate that ignores every callback
#[derive(Clone, Copy, Debug, Default)]
pub struct NullFederate;

impl FederateAmbassador for NullFederate {}
