//! Recording federate
//!
//! Keeps every delivered callback in order, with the thread it ran on, so
//! scenarios can assert ordering and threading after the fact.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use bytes::Bytes;
use fedpro_core::{
    AttributeHandleSet, AttributeHandleValueMap, FederateHandle, FederateHandleSet,
    InteractionClassHandle, ObjectClassHandle, ObjectInstanceHandle, ParameterHandleValueMap,
    RtiError, RtiResult,
};
use fedpro_runtime::{FederateAmbassador, MessageInfo};
use fedpro_time::TimeValue;
use parking_lot::Mutex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// Callback name as it appears on the wire
    pub name: String,
    pub detail: String,
    pub thread: ThreadId,
}

pub type Deliveries = Arc<Mutex<Vec<Delivery>>>;

type Hook = Box<dyn FnMut(&str) + Send>;

#[derive(Default)]
pub struct RecordingFederate {
    deliveries: Deliveries,
    hook: Option<Hook>,
    fail_on: Option<String>,
}

impl RecordingFederate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of what has been delivered so far
    pub fn deliveries(&self) -> Deliveries {
        Arc::clone(&self.deliveries)
    }

    /// Run `hook` inside every handler, after the delivery is recorded.
    pub fn with_hook(mut self, hook: impl FnMut(&str) + Send + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Fail the handler for callbacks named `name`.
    pub fn failing_on(mut self, name: &str) -> Self {
        self.fail_on = Some(name.to_string());
        self
    }

    fn record(&mut self, name: &str, detail: String) -> RtiResult<()> {
        self.deliveries.lock().push(Delivery {
            name: name.to_string(),
            detail,
            thread: thread::current().id(),
        });
        if let Some(hook) = self.hook.as_mut() {
            hook(name);
        }
        if self.fail_on.as_deref() == Some(name) {
            return Err(RtiError::FederateInternalError(format!("{} refused", name)));
        }
        Ok(())
    }
}

/// Names of everything delivered, in order
pub fn delivered_names(deliveries: &Deliveries) -> Vec<String> {
    deliveries.lock().iter().map(|d| d.name.clone()).collect()
}

fn status_detail(statuses: &[(FederateHandle, String)]) -> String {
    statuses
        .iter()
        .map(|(federate, status)| format!("{}={}", federate, status))
        .collect::<Vec<_>>()
        .join(",")
}

impl FederateAmbassador for RecordingFederate {
    fn connection_lost(&mut self, reason: &str) -> RtiResult<()> {
        self.record("connectionLost", reason.to_string())
    }

    fn synchronization_point_registration_succeeded(&mut self, label: &str) -> RtiResult<()> {
        self.record("synchronizationPointRegistrationSucceeded", label.to_string())
    }

    fn announce_synchronization_point(&mut self, label: &str, _tag: &Bytes) -> RtiResult<()> {
        self.record("announceSynchronizationPoint", label.to_string())
    }

    fn federation_synchronized(&mut self, label: &str, failed: &FederateHandleSet) -> RtiResult<()> {
        self.record("federationSynchronized", format!("{} failed={}", label, failed.len()))
    }

    fn initiate_federate_save(&mut self, label: &str, time: Option<&TimeValue>) -> RtiResult<()> {
        let detail = match time {
            Some(time) => format!("{}@{}", label, time),
            None => label.to_string(),
        };
        self.record("initiateFederateSave", detail)
    }

    fn federation_saved(&mut self) -> RtiResult<()> {
        self.record("federationSaved", String::new())
    }

    fn federation_not_saved(&mut self, reason: &str) -> RtiResult<()> {
        self.record("federationNotSaved", reason.to_string())
    }

    fn federation_save_status_response(
        &mut self,
        statuses: &[(FederateHandle, String)],
    ) -> RtiResult<()> {
        self.record("federationSaveStatusResponse", status_detail(statuses))
    }

    fn request_federation_restore_succeeded(&mut self, label: &str) -> RtiResult<()> {
        self.record("requestFederationRestoreSucceeded", label.to_string())
    }

    fn request_federation_restore_failed(&mut self, label: &str) -> RtiResult<()> {
        self.record("requestFederationRestoreFailed", label.to_string())
    }

    fn federation_restore_begun(&mut self) -> RtiResult<()> {
        self.record("federationRestoreBegun", String::new())
    }

    fn initiate_federate_restore(
        &mut self,
        label: &str,
        federate_name: &str,
        _federate: &FederateHandle,
    ) -> RtiResult<()> {
        self.record("initiateFederateRestore", format!("{} as {}", label, federate_name))
    }

    fn federation_restored(&mut self) -> RtiResult<()> {
        self.record("federationRestored", String::new())
    }

    fn federation_not_restored(&mut self, reason: &str) -> RtiResult<()> {
        self.record("federationNotRestored", reason.to_string())
    }

    fn federation_restore_status_response(
        &mut self,
        statuses: &[(FederateHandle, String)],
    ) -> RtiResult<()> {
        self.record("federationRestoreStatusResponse", status_detail(statuses))
    }

    fn start_registration_for_object_class(&mut self, class: &ObjectClassHandle) -> RtiResult<()> {
        self.record("startRegistrationForObjectClass", class.to_string())
    }

    fn turn_interactions_on(&mut self, class: &InteractionClassHandle) -> RtiResult<()> {
        self.record("turnInteractionsOn", class.to_string())
    }

    fn discover_object_instance(
        &mut self,
        object: &ObjectInstanceHandle,
        class: &ObjectClassHandle,
        name: &str,
        _producer: &FederateHandle,
    ) -> RtiResult<()> {
        self.record("discoverObjectInstance", format!("{} {} {}", object, class, name))
    }

    fn reflect_attribute_values(
        &mut self,
        object: &ObjectInstanceHandle,
        values: &AttributeHandleValueMap,
        tag: &Bytes,
        info: &MessageInfo,
    ) -> RtiResult<()> {
        let mut detail = format!("{} n={} tag={:?}", object, values.len(), tag);
        if let Some(time) = &info.time {
            detail.push_str(&format!(" @{}", time));
        }
        self.record("reflectAttributeValues", detail)
    }

    fn receive_interaction(
        &mut self,
        class: &InteractionClassHandle,
        parameters: &ParameterHandleValueMap,
        tag: &Bytes,
        _info: &MessageInfo,
    ) -> RtiResult<()> {
        self.record(
            "receiveInteraction",
            format!("{} n={} tag={:?}", class, parameters.len(), tag),
        )
    }

    fn remove_object_instance(
        &mut self,
        object: &ObjectInstanceHandle,
        _tag: &Bytes,
        _info: &MessageInfo,
    ) -> RtiResult<()> {
        self.record("removeObjectInstance", object.to_string())
    }

    fn provide_attribute_value_update(
        &mut self,
        object: &ObjectInstanceHandle,
        attributes: &AttributeHandleSet,
        _tag: &Bytes,
    ) -> RtiResult<()> {
        self.record(
            "provideAttributeValueUpdate",
            format!("{} n={}", object, attributes.len()),
        )
    }

    fn time_regulation_enabled(&mut self, time: &TimeValue) -> RtiResult<()> {
        self.record("timeRegulationEnabled", time.to_string())
    }

    fn time_constrained_enabled(&mut self, time: &TimeValue) -> RtiResult<()> {
        self.record("timeConstrainedEnabled", time.to_string())
    }

    fn time_advance_grant(&mut self, time: &TimeValue) -> RtiResult<()> {
        self.record("timeAdvanceGrant", time.to_string())
    }

    fn flush_queue_grant(&mut self, time: &TimeValue, optimistic: &TimeValue) -> RtiResult<()> {
        self.record("flushQueueGrant", format!("{} {}", time, optimistic))
    }

    fn federate_resigned(&mut self, reason: &str) -> RtiResult<()> {
        self.record("federateResigned", reason.to_string())
    }
}
