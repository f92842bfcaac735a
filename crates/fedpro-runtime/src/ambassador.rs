//! RTI ambassador: the application's entry point
//!
//! Every remote operation follows the same path: legality gate, one call
//! through the session, then confirm or roll back the legality change. The
//! typed methods only marshal arguments and unmarshal results.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use fedpro_core::{
    AttributeHandle, AttributeHandleSet, AttributeHandleValueMap, CallbackModel,
    FederateHandle, FederateHandleSet, InteractionClassHandle, MessageRetractionHandle,
    ObjectClassHandle, ObjectInstanceHandle, ParameterHandle, ParameterHandleValueMap,
    PayloadReader, PayloadWriter, ResignAction, RtiError, RtiResult,
};
use fedpro_time::{IntervalValue, TimeFactory, TimeValue};
use fedpro_transport::Connector;
use fedpro_wire::{Envelope, OperationTag};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::callback::{read_opt_time, write_opt_time, write_time};
use crate::dispatch::{CallbackGuard, CallbackQueue, Dispatcher};
use crate::engine::{Session, SessionTimers};
use crate::stats::Counters;
use crate::{
    ClientSettings, FederateAmbassador, InvokeScope, Legality, LegalityFlags, Operation,
    RuntimeStats,
};

struct Connection {
    session: Arc<Session>,
    dispatcher: Arc<Dispatcher>,
    counters: Arc<Counters>,
    settings: ClientSettings,
}

pub struct RtiAmbassador {
    settings: ClientSettings,
    connector: Arc<dyn Connector>,
    legality: Arc<Legality>,
    guard: Arc<CallbackGuard>,
    /// Serializes connect and disconnect
    lifecycle: Mutex<()>,
    connection: Mutex<Option<Connection>>,
}

impl RtiAmbassador {
    pub fn new(settings: ClientSettings, connector: Arc<dyn Connector>) -> Self {
        RtiAmbassador {
            settings,
            connector,
            legality: Arc::new(Legality::new()),
            guard: Arc::new(CallbackGuard::default()),
            lifecycle: Mutex::new(()),
            connection: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn is_connected(&self) -> bool {
        self.legality.is_connected()
    }

    /// Current legality flags
    pub fn flags(&self) -> LegalityFlags {
        self.legality.snapshot()
    }

    pub fn session_id(&self) -> Option<u64> {
        self.connection.lock().as_ref().map(|c| c.session.id())
    }

    /// Counters of the current (or last) session
    pub fn stats(&self) -> RuntimeStats {
        self.connection
            .lock()
            .as_ref()
            .map(|c| c.counters.snapshot())
            .unwrap_or_default()
    }

    /// Frames the current session's transport has sent
    pub fn frames_sent(&self) -> u64 {
        self.connection
            .lock()
            .as_ref()
            .map(|c| c.session.frames_sent())
            .unwrap_or(0)
    }

    fn in_callback(&self) -> bool {
        self.guard.is_current()
    }

    fn session(&self) -> RtiResult<Arc<Session>> {
        self.connection
            .lock()
            .as_ref()
            .map(|c| c.session.clone())
            .ok_or_else(|| RtiError::NotConnected("no session".into()))
    }

    fn dispatcher(&self) -> Option<Arc<Dispatcher>> {
        self.connection.lock().as_ref().map(|c| c.dispatcher.clone())
    }

    fn async_updates(&self) -> bool {
        self.connection
            .lock()
            .as_ref()
            .map(|c| c.settings.async_updates)
            .unwrap_or(false)
    }

    // Connection lifecycle

    /// Open a session to the coordinator and register `federate` as the
    /// callback handler. `local_settings` is layered over the settings this
    /// ambassador was built with.
    pub fn connect(
        &self,
        federate: Box<dyn FederateAmbassador>,
        model: CallbackModel,
        local_settings: Option<&str>,
    ) -> RtiResult<()> {
        let op = Operation::Known(OperationTag::Connect);
        self.legality.admit(op, self.in_callback())?;
        let _lifecycle = self.lifecycle.lock();
        self.legality.admit(op, false)?;

        let settings = match local_settings {
            Some(line) => self.settings.with_local_settings(line)?,
            None => self.settings.clone(),
        };

        // A session lost earlier is still parked here for its connectionLost.
        if let Some(stale) = self.connection.lock().take() {
            stale.dispatcher.stop();
            stale.session.terminate();
        }

        let endpoint = settings.endpoint();
        let transport = self.connector.connect(&endpoint)?;
        let counters = Arc::new(Counters::default());
        let queue = Arc::new(CallbackQueue::new(settings.message_queue_size as usize));
        let session = Session::open(
            transport,
            SessionTimers::from_settings(&settings),
            queue.clone(),
            self.legality.clone(),
            counters.clone(),
        )?;

        let mut w = PayloadWriter::new();
        w.put_str(model.name()).put_str(local_settings.unwrap_or(""));
        if let Err(e) = session.call(Envelope::new(OperationTag::Connect.to_u16(), w.finish())) {
            session.terminate();
            return Err(e);
        }

        self.legality.mark_connected();
        if session.is_lost() {
            self.legality.reset();
        }

        let dispatcher = Dispatcher::new(
            model,
            queue,
            self.guard.clone(),
            federate,
            self.legality.clone(),
            session.clone(),
            counters.clone(),
        );
        if let Err(e) = dispatcher.start() {
            session.terminate();
            self.legality.reset();
            return Err(e);
        }

        info!(session = session.id(), model = %model, endpoint = %endpoint, "connected");
        *self.connection.lock() = Some(Connection {
            session,
            dispatcher,
            counters,
            settings,
        });
        Ok(())
    }

    /// Close the session. A no-op when not connected.
    pub fn disconnect(&self) -> RtiResult<()> {
        let op = Operation::Known(OperationTag::Disconnect);
        self.legality.admit(op, self.in_callback())?;
        let _lifecycle = self.lifecycle.lock();
        self.legality.admit(op, false)?;

        let Some(connection) = self.connection.lock().take() else {
            return Ok(());
        };
        let session = connection.session;
        if !session.is_lost() {
            if let Err(e) = session.call(Envelope::new(op.tag(), Bytes::new())) {
                debug!(session = session.id(), fault = e.name(), "disconnect call failed");
            }
        }
        session.terminate();
        connection.dispatcher.stop();
        self.legality.reset();
        info!(session = session.id(), "disconnected");
        Ok(())
    }

    // Generic call path

    fn call(&self, op: Operation, payload: Bytes) -> RtiResult<Bytes> {
        self.legality.admit(op, self.in_callback())?;
        let result = self
            .session()
            .and_then(|session| session.call(Envelope::new(op.tag(), payload)));
        match &result {
            Ok(_) => self.legality.confirm(op),
            Err(e) => {
                self.legality.rollback(op);
                debug!(op = %op, fault = e.name(), details = e.details(), "call failed");
            }
        }
        result
    }

    fn call_known(&self, tag: OperationTag, payload: Bytes) -> RtiResult<Bytes> {
        self.call(Operation::Known(tag), payload)
    }

    fn call_empty(&self, tag: OperationTag) -> RtiResult<()> {
        self.call_known(tag, Bytes::new()).map(|_| ())
    }

    /// Updates and interactions go out unacknowledged in async mode.
    fn send_update(&self, tag: OperationTag, payload: Bytes) -> RtiResult<Option<MessageRetractionHandle>> {
        if !self.async_updates() {
            let response = self.call_known(tag, payload)?;
            return read_retraction(response);
        }
        let op = Operation::Known(tag);
        self.legality.admit(op, self.in_callback())?;
        self.session()?.cast(Envelope::new(op.tag(), payload))?;
        Ok(None)
    }

    /// Reject a time of the wrong family once the federation's is known.
    fn check_time(&self, time: &TimeValue) -> RtiResult<()> {
        match self.legality.time_factory() {
            Some(factory) => time.expect_factory(factory),
            None => Ok(()),
        }
    }

    fn check_interval(&self, interval: &IntervalValue) -> RtiResult<()> {
        match self.legality.time_factory() {
            Some(factory) => interval.expect_factory(factory),
            None => Ok(()),
        }
    }

    fn factory(&self) -> RtiResult<TimeFactory> {
        self.legality
            .time_factory()
            .ok_or_else(|| RtiError::FederateNotExecutionMember("no time factory yet".into()))
    }

    /// Call an operation that has no typed entry point. Tags of typed
    /// operations are refused so their legality rules cannot be bypassed.
    pub fn invoke(&self, tag: u16, payload: Bytes, scope: InvokeScope) -> RtiResult<Bytes> {
        if let Some(known) = OperationTag::from_u16(tag) {
            return Err(RtiError::Unsupported(format!(
                "{} has a typed entry point",
                known
            )));
        }
        self.call(Operation::Other { tag, scope }, payload)
    }

    // Federation membership

    /// Join and return the federate handle. The federation's time factory
    /// comes back with the handle.
    pub fn join_federation_execution(
        &self,
        federate_name: Option<&str>,
        federate_type: &str,
        federation: &str,
        fom_modules: &[String],
    ) -> RtiResult<FederateHandle> {
        let mut w = PayloadWriter::new();
        w.put_bool(federate_name.is_some())
            .put_str(federate_name.unwrap_or(""))
            .put_str(federate_type)
            .put_str(federation)
            .put(&fom_modules.to_vec());

        let response = self.call_known(OperationTag::JoinFederationExecution, w.finish())?;
        let mut r = PayloadReader::new(response);
        let federate: FederateHandle = r.get()?;
        let factory: TimeFactory = r.get()?;
        r.finish()?;

        self.legality.joined(factory);
        info!(federate = %federate, federation, time = %factory, "joined");
        Ok(federate)
    }

    pub fn resign_federation_execution(&self, action: ResignAction) -> RtiResult<()> {
        let mut w = PayloadWriter::new();
        w.put(&action);
        self.call_known(OperationTag::ResignFederationExecution, w.finish())
            .map(|_| ())
    }

    /// `synchronization_set` limits the point to those federates; `None`
    /// means the whole federation.
    pub fn register_federation_synchronization_point(
        &self,
        label: &str,
        tag: &[u8],
        synchronization_set: Option<&FederateHandleSet>,
    ) -> RtiResult<()> {
        let mut w = PayloadWriter::new();
        w.put_str(label).put_bytes(tag);
        match synchronization_set {
            Some(set) => w.put_bool(true).put(set),
            None => w.put_bool(false),
        };
        self.call_known(OperationTag::RegisterFederationSynchronizationPoint, w.finish())
            .map(|_| ())
    }

    pub fn synchronization_point_achieved(&self, label: &str, successfully: bool) -> RtiResult<()> {
        let mut w = PayloadWriter::new();
        w.put_str(label).put_bool(successfully);
        self.call_known(OperationTag::SynchronizationPointAchieved, w.finish())
            .map(|_| ())
    }

    // Save and restore

    pub fn request_federation_save(&self, label: &str, time: Option<&TimeValue>) -> RtiResult<()> {
        if let Some(time) = time {
            self.check_time(time)?;
        }
        let mut w = PayloadWriter::new();
        w.put_str(label);
        write_opt_time(&mut w, time);
        self.call_known(OperationTag::RequestFederationSave, w.finish())
            .map(|_| ())
    }

    pub fn federate_save_begun(&self) -> RtiResult<()> {
        self.call_empty(OperationTag::FederateSaveBegun)
    }

    pub fn federate_save_complete(&self) -> RtiResult<()> {
        self.call_empty(OperationTag::FederateSaveComplete)
    }

    pub fn federate_save_not_complete(&self) -> RtiResult<()> {
        self.call_empty(OperationTag::FederateSaveNotComplete)
    }

    pub fn abort_federation_save(&self) -> RtiResult<()> {
        self.call_empty(OperationTag::AbortFederationSave)
    }

    /// The answer arrives as a `federationSaveStatusResponse` callback.
    pub fn query_federation_save_status(&self) -> RtiResult<()> {
        self.call_empty(OperationTag::QueryFederationSaveStatus)
    }

    pub fn request_federation_restore(&self, label: &str) -> RtiResult<()> {
        let mut w = PayloadWriter::new();
        w.put_str(label);
        self.call_known(OperationTag::RequestFederationRestore, w.finish())
            .map(|_| ())
    }

    pub fn federate_restore_complete(&self) -> RtiResult<()> {
        self.call_empty(OperationTag::FederateRestoreComplete)
    }

    pub fn federate_restore_not_complete(&self) -> RtiResult<()> {
        self.call_empty(OperationTag::FederateRestoreNotComplete)
    }

    pub fn abort_federation_restore(&self) -> RtiResult<()> {
        self.call_empty(OperationTag::AbortFederationRestore)
    }

    pub fn query_federation_restore_status(&self) -> RtiResult<()> {
        self.call_empty(OperationTag::QueryFederationRestoreStatus)
    }

    // Declarations

    pub fn publish_object_class_attributes(
        &self,
        class: &ObjectClassHandle,
        attributes: &AttributeHandleSet,
    ) -> RtiResult<()> {
        let mut w = PayloadWriter::new();
        w.put(class).put(attributes);
        self.call_known(OperationTag::PublishObjectClassAttributes, w.finish())
            .map(|_| ())
    }

    pub fn unpublish_object_class(&self, class: &ObjectClassHandle) -> RtiResult<()> {
        let mut w = PayloadWriter::new();
        w.put(class);
        self.call_known(OperationTag::UnpublishObjectClass, w.finish())
            .map(|_| ())
    }

    pub fn subscribe_object_class_attributes(
        &self,
        class: &ObjectClassHandle,
        attributes: &AttributeHandleSet,
    ) -> RtiResult<()> {
        let mut w = PayloadWriter::new();
        w.put(class).put(attributes);
        self.call_known(OperationTag::SubscribeObjectClassAttributes, w.finish())
            .map(|_| ())
    }

    pub fn unsubscribe_object_class(&self, class: &ObjectClassHandle) -> RtiResult<()> {
        let mut w = PayloadWriter::new();
        w.put(class);
        self.call_known(OperationTag::UnsubscribeObjectClass, w.finish())
            .map(|_| ())
    }

    pub fn publish_interaction_class(&self, class: &InteractionClassHandle) -> RtiResult<()> {
        self.interaction_class_op(OperationTag::PublishInteractionClass, class)
    }

    pub fn unpublish_interaction_class(&self, class: &InteractionClassHandle) -> RtiResult<()> {
        self.interaction_class_op(OperationTag::UnpublishInteractionClass, class)
    }

    pub fn subscribe_interaction_class(&self, class: &InteractionClassHandle) -> RtiResult<()> {
        self.interaction_class_op(OperationTag::SubscribeInteractionClass, class)
    }

    pub fn unsubscribe_interaction_class(&self, class: &InteractionClassHandle) -> RtiResult<()> {
        self.interaction_class_op(OperationTag::UnsubscribeInteractionClass, class)
    }

    fn interaction_class_op(
        &self,
        tag: OperationTag,
        class: &InteractionClassHandle,
    ) -> RtiResult<()> {
        let mut w = PayloadWriter::new();
        w.put(class);
        self.call_known(tag, w.finish()).map(|_| ())
    }

    // Objects and interactions

    pub fn reserve_object_instance_name(&self, name: &str) -> RtiResult<()> {
        let mut w = PayloadWriter::new();
        w.put_str(name);
        self.call_known(OperationTag::ReserveObjectInstanceName, w.finish())
            .map(|_| ())
    }

    pub fn register_object_instance(
        &self,
        class: &ObjectClassHandle,
        name: Option<&str>,
    ) -> RtiResult<ObjectInstanceHandle> {
        let mut w = PayloadWriter::new();
        w.put(class)
            .put_bool(name.is_some())
            .put_str(name.unwrap_or(""));
        let response = self.call_known(OperationTag::RegisterObjectInstance, w.finish())?;
        let mut r = PayloadReader::new(response);
        let object = r.get()?;
        r.finish()?;
        Ok(object)
    }

    /// Returns the retraction handle of a timestamped update. Always `None`
    /// when updates are sent without waiting.
    pub fn update_attribute_values(
        &self,
        object: &ObjectInstanceHandle,
        values: &AttributeHandleValueMap,
        tag: &[u8],
        time: Option<&TimeValue>,
    ) -> RtiResult<Option<MessageRetractionHandle>> {
        if let Some(time) = time {
            self.check_time(time)?;
        }
        let mut w = PayloadWriter::new();
        w.put(object).put(values).put_bytes(tag);
        write_opt_time(&mut w, time);
        self.send_update(OperationTag::UpdateAttributeValues, w.finish())
    }

    pub fn send_interaction(
        &self,
        class: &InteractionClassHandle,
        parameters: &ParameterHandleValueMap,
        tag: &[u8],
        time: Option<&TimeValue>,
    ) -> RtiResult<Option<MessageRetractionHandle>> {
        if let Some(time) = time {
            self.check_time(time)?;
        }
        let mut w = PayloadWriter::new();
        w.put(class).put(parameters).put_bytes(tag);
        write_opt_time(&mut w, time);
        self.send_update(OperationTag::SendInteraction, w.finish())
    }

    pub fn delete_object_instance(
        &self,
        object: &ObjectInstanceHandle,
        tag: &[u8],
        time: Option<&TimeValue>,
    ) -> RtiResult<Option<MessageRetractionHandle>> {
        if let Some(time) = time {
            self.check_time(time)?;
        }
        let mut w = PayloadWriter::new();
        w.put(object).put_bytes(tag);
        write_opt_time(&mut w, time);
        let response = self.call_known(OperationTag::DeleteObjectInstance, w.finish())?;
        read_retraction(response)
    }

    pub fn request_attribute_value_update(
        &self,
        object: &ObjectInstanceHandle,
        attributes: &AttributeHandleSet,
        tag: &[u8],
    ) -> RtiResult<()> {
        let mut w = PayloadWriter::new();
        w.put(object).put(attributes).put_bytes(tag);
        self.call_known(OperationTag::RequestAttributeValueUpdate, w.finish())
            .map(|_| ())
    }

    // Name lookups

    pub fn get_object_class_handle(&self, name: &str) -> RtiResult<ObjectClassHandle> {
        let mut w = PayloadWriter::new();
        w.put_str(name);
        self.lookup(OperationTag::GetObjectClassHandle, w)
    }

    pub fn get_attribute_handle(
        &self,
        class: &ObjectClassHandle,
        name: &str,
    ) -> RtiResult<AttributeHandle> {
        let mut w = PayloadWriter::new();
        w.put(class).put_str(name);
        self.lookup(OperationTag::GetAttributeHandle, w)
    }

    pub fn get_interaction_class_handle(&self, name: &str) -> RtiResult<InteractionClassHandle> {
        let mut w = PayloadWriter::new();
        w.put_str(name);
        self.lookup(OperationTag::GetInteractionClassHandle, w)
    }

    pub fn get_parameter_handle(
        &self,
        class: &InteractionClassHandle,
        name: &str,
    ) -> RtiResult<ParameterHandle> {
        let mut w = PayloadWriter::new();
        w.put(class).put_str(name);
        self.lookup(OperationTag::GetParameterHandle, w)
    }

    fn lookup<P: fedpro_core::Payload>(&self, tag: OperationTag, w: PayloadWriter) -> RtiResult<P> {
        let response = self.call_known(tag, w.finish())?;
        let mut r = PayloadReader::new(response);
        let value = r.get()?;
        r.finish()?;
        Ok(value)
    }

    // Time management

    /// Regulation takes effect with the `timeRegulationEnabled` callback.
    pub fn enable_time_regulation(&self, lookahead: &IntervalValue) -> RtiResult<()> {
        self.check_interval(lookahead)?;
        let mut w = PayloadWriter::new();
        lookahead.write_to(&mut w);
        self.call_known(OperationTag::EnableTimeRegulation, w.finish())
            .map(|_| ())
    }

    pub fn disable_time_regulation(&self) -> RtiResult<()> {
        self.call_empty(OperationTag::DisableTimeRegulation)
    }

    pub fn enable_time_constrained(&self) -> RtiResult<()> {
        self.call_empty(OperationTag::EnableTimeConstrained)
    }

    pub fn disable_time_constrained(&self) -> RtiResult<()> {
        self.call_empty(OperationTag::DisableTimeConstrained)
    }

    pub fn time_advance_request(&self, time: &TimeValue) -> RtiResult<()> {
        self.advance(OperationTag::TimeAdvanceRequest, time)
    }

    pub fn time_advance_request_available(&self, time: &TimeValue) -> RtiResult<()> {
        self.advance(OperationTag::TimeAdvanceRequestAvailable, time)
    }

    pub fn next_message_request(&self, time: &TimeValue) -> RtiResult<()> {
        self.advance(OperationTag::NextMessageRequest, time)
    }

    pub fn next_message_request_available(&self, time: &TimeValue) -> RtiResult<()> {
        self.advance(OperationTag::NextMessageRequestAvailable, time)
    }

    pub fn flush_queue_request(&self, time: &TimeValue) -> RtiResult<()> {
        self.advance(OperationTag::FlushQueueRequest, time)
    }

    fn advance(&self, tag: OperationTag, time: &TimeValue) -> RtiResult<()> {
        self.check_time(time)?;
        let mut w = PayloadWriter::new();
        write_time(&mut w, time);
        self.call_known(tag, w.finish()).map(|_| ())
    }

    pub fn query_logical_time(&self) -> RtiResult<TimeValue> {
        let response = self.call_known(OperationTag::QueryLogicalTime, Bytes::new())?;
        let mut r = PayloadReader::new(response);
        let time = self.factory()?.read_time(&mut r)?;
        r.finish()?;
        Ok(time)
    }

    /// `None` when no greatest available logical time is defined.
    pub fn query_galt(&self) -> RtiResult<Option<TimeValue>> {
        let response = self.call_known(OperationTag::QueryGalt, Bytes::new())?;
        let mut r = PayloadReader::new(response);
        let time = read_opt_time(&mut r, Some(self.factory()?))?;
        r.finish()?;
        Ok(time)
    }

    pub fn query_lookahead(&self) -> RtiResult<IntervalValue> {
        let response = self.call_known(OperationTag::QueryLookahead, Bytes::new())?;
        let mut r = PayloadReader::new(response);
        let lookahead = self.factory()?.read_interval(&mut r)?;
        r.finish()?;
        Ok(lookahead)
    }

    // Ownership

    pub fn unconditional_attribute_ownership_divestiture(
        &self,
        object: &ObjectInstanceHandle,
        attributes: &AttributeHandleSet,
    ) -> RtiResult<()> {
        let mut w = PayloadWriter::new();
        w.put(object).put(attributes);
        self.call_known(
            OperationTag::UnconditionalAttributeOwnershipDivestiture,
            w.finish(),
        )
        .map(|_| ())
    }

    pub fn attribute_ownership_acquisition(
        &self,
        object: &ObjectInstanceHandle,
        attributes: &AttributeHandleSet,
        tag: &[u8],
    ) -> RtiResult<()> {
        let mut w = PayloadWriter::new();
        w.put(object).put(attributes).put_bytes(tag);
        self.call_known(OperationTag::AttributeOwnershipAcquisition, w.finish())
            .map(|_| ())
    }

    /// The answer arrives as an ownership callback.
    pub fn query_attribute_ownership(
        &self,
        object: &ObjectInstanceHandle,
        attribute: &AttributeHandle,
    ) -> RtiResult<()> {
        let mut w = PayloadWriter::new();
        w.put(object).put(attribute);
        self.call_known(OperationTag::QueryAttributeOwnership, w.finish())
            .map(|_| ())
    }

    // Callback delivery

    /// Deliver at most one callback, waiting up to `min_wait` for it.
    /// Returns whether more callbacks are queued.
    pub fn evoke_callback(&self, min_wait: Duration) -> RtiResult<bool> {
        match self.dispatcher() {
            Some(dispatcher) => dispatcher.evoke_callback(min_wait),
            None => self.evoke_without_session(),
        }
    }

    /// Wait up to `min_wait` for a first callback, then keep delivering
    /// until the queue is empty or `max_wait` has passed.
    pub fn evoke_multiple_callbacks(&self, min_wait: Duration, max_wait: Duration) -> RtiResult<bool> {
        match self.dispatcher() {
            Some(dispatcher) => dispatcher.evoke_multiple_callbacks(min_wait, max_wait),
            None => self.evoke_without_session(),
        }
    }

    fn evoke_without_session(&self) -> RtiResult<bool> {
        if self.in_callback() {
            return Err(RtiError::CallNotAllowedFromWithinCallback(
                "evoke called from a callback handler".into(),
            ));
        }
        Ok(false)
    }

    pub fn enable_callbacks(&self) {
        if let Some(dispatcher) = self.dispatcher() {
            dispatcher.enable();
        }
    }

    /// Hold callbacks back. Returns once a handler that is already running
    /// has finished, unless called from that handler.
    pub fn disable_callbacks(&self) {
        if let Some(dispatcher) = self.dispatcher() {
            dispatcher.disable();
        }
    }

    pub fn callback_model(&self) -> Option<CallbackModel> {
        self.dispatcher().map(|d| d.model())
    }
}

impl Drop for RtiAmbassador {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.get_mut().take() {
            connection.session.terminate();
            connection.dispatcher.stop();
        }
    }
}

fn read_retraction(response: Bytes) -> RtiResult<Option<MessageRetractionHandle>> {
    if response.is_empty() {
        return Ok(None);
    }
    let mut r = PayloadReader::new(response);
    let retraction = if r.get_bool()? { Some(r.get()?) } else { None };
    r.finish()?;
    Ok(retraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedpro_transport::{Endpoint, MemoryConnector, MemoryPeer};

    fn ambassador() -> RtiAmbassador {
        let connector = MemoryConnector::new(|peer: MemoryPeer, _: &Endpoint| drop(peer));
        RtiAmbassador::new(ClientSettings::default(), Arc::new(connector))
    }

    #[test]
    fn test_operations_need_a_connection() {
        let rti = ambassador();
        assert!(matches!(
            rti.time_advance_request(&TimeFactory::Integer64.make_initial()),
            Err(RtiError::NotConnected(_))
        ));
        assert!(matches!(
            rti.get_object_class_handle("HLAobjectRoot"),
            Err(RtiError::NotConnected(_))
        ));
        assert_eq!(rti.frames_sent(), 0);
        assert_eq!(rti.stats(), RuntimeStats::default());
    }

    #[test]
    fn test_disconnect_when_idle() {
        let rti = ambassador();
        rti.disconnect().unwrap();
        assert!(!rti.is_connected());
    }

    #[test]
    fn test_evoke_without_session() {
        let rti = ambassador();
        assert_eq!(rti.evoke_callback(Duration::ZERO), Ok(false));
        assert_eq!(
            rti.evoke_multiple_callbacks(Duration::ZERO, Duration::from_millis(1)),
            Ok(false)
        );
        rti.enable_callbacks();
        rti.disable_callbacks();
    }

    #[test]
    fn test_invoke_refuses_typed_tags() {
        let rti = ambassador();
        let err = rti
            .invoke(
                OperationTag::TimeAdvanceRequest.to_u16(),
                Bytes::new(),
                InvokeScope::Federation,
            )
            .unwrap_err();
        assert!(matches!(err, RtiError::Unsupported(_)));
    }

    #[test]
    fn test_read_retraction() {
        assert_eq!(read_retraction(Bytes::new()), Ok(None));
        let mut w = PayloadWriter::new();
        w.put_bool(true).put(&MessageRetractionHandle::from_u32(4));
        assert_eq!(
            read_retraction(w.finish()),
            Ok(Some(MessageRetractionHandle::from_u32(4)))
        );
        assert!(read_retraction(Bytes::from_static(&[2])).is_err());
    }

    #[test]
    fn test_bad_local_settings() {
        let rti = ambassador();
        let err = rti
            .connect(
                Box::new(crate::NullFederate),
                CallbackModel::Evoked,
                Some("connect.port=nope"),
            )
            .unwrap_err();
        assert_eq!(err.name(), "InvalidLocalSettingsDesignator");
    }
}
