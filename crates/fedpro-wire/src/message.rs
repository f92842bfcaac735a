//! Session and HLA messages
//!
//! [`Frame::encode`] produces one complete packet; [`Frame::decode`] accepts
//! exactly one. Resume messages are recognised by the header but are never
//! produced or accepted here, since this client does not resume sessions.

use bytes::{Bytes, BytesMut};
use fedpro_core::{PayloadReader, PayloadWriter};

use crate::{Envelope, MessageHeader, MessageType, WireError, WireResult, HEADER_SIZE};

/// `NEW_SESSION_STATUS` reason codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SessionStatus {
    Ok = 0,
    UnsupportedProtocolVersion = 1,
    OutOfResources = 2,
    BadMessage = 3,
    OtherError = 99,
}

impl SessionStatus {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(SessionStatus::Ok),
            1 => Some(SessionStatus::UnsupportedProtocolVersion),
            2 => Some(SessionStatus::OutOfResources),
            3 => Some(SessionStatus::BadMessage),
            99 => Some(SessionStatus::OtherError),
            _ => None,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            SessionStatus::Ok => "ok",
            SessionStatus::UnsupportedProtocolVersion => "unsupported protocol version",
            SessionStatus::OutOfResources => "server out of resources",
            SessionStatus::BadMessage => "bad message",
            SessionStatus::OtherError => "other error",
        }
    }
}

/// Outcome carried by a `CALL_RESPONSE`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    Result(Bytes),
    Exception { name: String, details: String },
}

/// Outcome carried by a `CALLBACK_RESPONSE`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    Succeeded,
    Failed { name: String, details: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    NewSession { protocol_version: u32 },
    NewSessionStatus { status: SessionStatus },
    Heartbeat,
    HeartbeatResponse { response_to: u32 },
    TerminateSession,
    SessionTerminated,
    CallRequest(Envelope),
    CallResponse { response_to: u32, outcome: CallOutcome },
    CallbackRequest(Envelope),
    CallbackResponse { response_to: u32, outcome: CallbackOutcome },
}

const STATUS_OK: u8 = 0;
const STATUS_FAILED: u8 = 1;

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::NewSession { .. } => MessageType::NewSession,
            Message::NewSessionStatus { .. } => MessageType::NewSessionStatus,
            Message::Heartbeat => MessageType::Heartbeat,
            Message::HeartbeatResponse { .. } => MessageType::HeartbeatResponse,
            Message::TerminateSession => MessageType::TerminateSession,
            Message::SessionTerminated => MessageType::SessionTerminated,
            Message::CallRequest(_) => MessageType::CallRequest,
            Message::CallResponse { .. } => MessageType::CallResponse,
            Message::CallbackRequest(_) => MessageType::CallbackRequest,
            Message::CallbackResponse { .. } => MessageType::CallbackResponse,
        }
    }

    fn write_body(&self, w: &mut PayloadWriter) {
        match self {
            Message::NewSession { protocol_version } => {
                w.put_u32(*protocol_version);
            }
            Message::NewSessionStatus { status } => {
                w.put_u32(*status as u32);
            }
            Message::Heartbeat | Message::TerminateSession | Message::SessionTerminated => {}
            Message::HeartbeatResponse { response_to } => {
                w.put_u32(*response_to);
            }
            Message::CallRequest(env) | Message::CallbackRequest(env) => env.write(w),
            Message::CallResponse {
                response_to,
                outcome,
            } => {
                w.put_u32(*response_to);
                match outcome {
                    CallOutcome::Result(payload) => {
                        w.put_u8(STATUS_OK).put_raw(payload);
                    }
                    CallOutcome::Exception { name, details } => {
                        w.put_u8(STATUS_FAILED).put_str(name).put_str(details);
                    }
                }
            }
            Message::CallbackResponse {
                response_to,
                outcome,
            } => {
                w.put_u32(*response_to);
                match outcome {
                    CallbackOutcome::Succeeded => {
                        w.put_u8(STATUS_OK);
                    }
                    CallbackOutcome::Failed { name, details } => {
                        w.put_u8(STATUS_FAILED).put_str(name).put_str(details);
                    }
                }
            }
        }
    }

    fn read_body(message_type: MessageType, body: Bytes) -> WireResult<Self> {
        let mut r = PayloadReader::new(body);
        let message = match message_type {
            MessageType::NewSession => Message::NewSession {
                protocol_version: r.get_u32()?,
            },
            MessageType::NewSessionStatus => {
                let raw = r.get_u32()?;
                let status = SessionStatus::from_u32(raw)
                    .ok_or_else(|| WireError::BadMessage(format!("session status {}", raw)))?;
                Message::NewSessionStatus { status }
            }
            MessageType::Heartbeat => Message::Heartbeat,
            MessageType::HeartbeatResponse => Message::HeartbeatResponse {
                response_to: r.get_u32()?,
            },
            MessageType::TerminateSession => Message::TerminateSession,
            MessageType::SessionTerminated => Message::SessionTerminated,
            MessageType::CallRequest => Message::CallRequest(Envelope::read(&mut r)?),
            MessageType::CallbackRequest => Message::CallbackRequest(Envelope::read(&mut r)?),
            MessageType::CallResponse => {
                let response_to = r.get_u32()?;
                let outcome = match r.get_u8()? {
                    STATUS_OK => CallOutcome::Result(r.rest()),
                    STATUS_FAILED => CallOutcome::Exception {
                        name: r.get_str()?,
                        details: r.get_str()?,
                    },
                    other => {
                        return Err(WireError::BadMessage(format!("call status {}", other)));
                    }
                };
                Message::CallResponse {
                    response_to,
                    outcome,
                }
            }
            MessageType::CallbackResponse => {
                let response_to = r.get_u32()?;
                let outcome = match r.get_u8()? {
                    STATUS_OK => CallbackOutcome::Succeeded,
                    STATUS_FAILED => CallbackOutcome::Failed {
                        name: r.get_str()?,
                        details: r.get_str()?,
                    },
                    other => {
                        return Err(WireError::BadMessage(format!("callback status {}", other)));
                    }
                };
                Message::CallbackResponse {
                    response_to,
                    outcome,
                }
            }
            MessageType::ResumeRequest => {
                return Err(WireError::UnexpectedMessageType(MessageType::ResumeRequest.name()))
            }
            MessageType::ResumeStatus => {
                return Err(WireError::UnexpectedMessageType(MessageType::ResumeStatus.name()))
            }
        };
        r.finish()?;
        Ok(message)
    }
}

/// Header plus decoded message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub header: MessageHeader,
    pub message: Message,
}

impl Frame {
    /// Serialize `message` into one packet.
    pub fn encode(
        message: &Message,
        sequence_number: u32,
        session_id: u64,
        last_received_sequence_number: u32,
    ) -> Bytes {
        let mut body = PayloadWriter::new();
        message.write_body(&mut body);
        let body = body.finish();

        let header = MessageHeader::new(
            message.message_type(),
            sequence_number,
            session_id,
            last_received_sequence_number,
            body.len(),
        );

        let mut buf = BytesMut::zeroed(HEADER_SIZE);
        // The buffer is exactly one header long.
        let _ = header.serialize(&mut buf);
        buf.extend_from_slice(&body);
        buf.freeze()
    }

    /// Parse one complete packet.
    pub fn decode(packet: &[u8]) -> WireResult<Self> {
        let header = MessageHeader::parse(packet)?;
        let size = header.packet_size as usize;
        if packet.len() < size {
            return Err(WireError::BufferTooShort {
                expected: size,
                actual: packet.len(),
            });
        }
        if packet.len() > size {
            return Err(WireError::BadMessage(format!(
                "{} bytes past declared packet size {}",
                packet.len() - size,
                size
            )));
        }
        let body = Bytes::copy_from_slice(&packet[HEADER_SIZE..size]);
        let message = Message::read_body(header.message_type, body)?;
        Ok(Frame { header, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(message: &Message) -> Frame {
        Frame::decode(&Frame::encode(message, 5, 42, 4)).unwrap()
    }

    #[test]
    fn test_call_request_frame() {
        let msg = Message::CallRequest(Envelope::new(74, vec![1u8, 2, 3]));
        let frame = decode(&msg);
        assert_eq!(frame.message, msg);
        assert_eq!(frame.header.sequence_number, 5);
        assert_eq!(frame.header.session_id, 42);
        assert_eq!(frame.header.last_received_sequence_number, 4);
        assert_eq!(frame.header.packet_size as usize, HEADER_SIZE + 5);
    }

    #[test]
    fn test_call_response_layout() {
        let msg = Message::CallResponse {
            response_to: 9,
            outcome: CallOutcome::Exception {
                name: "SaveInProgress".into(),
                details: "x".into(),
            },
        };
        let packet = Frame::encode(&msg, 1, 1, 0);
        let body = &packet[HEADER_SIZE..];
        assert_eq!(&body[..5], &[0, 0, 0, 9, 1]);
        assert_eq!(decode(&msg).message, msg);

        let ok = Message::CallResponse {
            response_to: 3,
            outcome: CallOutcome::Result(Bytes::from_static(b"abc")),
        };
        assert_eq!(decode(&ok).message, ok);
    }

    #[test]
    fn test_control_messages() {
        for msg in [
            Message::NewSession {
                protocol_version: crate::PROTOCOL_VERSION,
            },
            Message::NewSessionStatus {
                status: SessionStatus::OutOfResources,
            },
            Message::Heartbeat,
            Message::HeartbeatResponse { response_to: 12 },
            Message::TerminateSession,
            Message::SessionTerminated,
            Message::CallbackResponse {
                response_to: 2,
                outcome: CallbackOutcome::Succeeded,
            },
        ] {
            assert_eq!(decode(&msg).message, msg);
        }
    }

    #[test]
    fn test_unknown_session_status() {
        let mut packet = Frame::encode(
            &Message::NewSessionStatus {
                status: SessionStatus::Ok,
            },
            1,
            0,
            0,
        )
        .to_vec();
        packet[HEADER_SIZE + 3] = 7;
        assert!(matches!(Frame::decode(&packet), Err(WireError::BadMessage(_))));
    }

    #[test]
    fn test_truncated_packet() {
        let packet = Frame::encode(&Message::CallRequest(Envelope::new(1, vec![0u8; 8])), 1, 0, 0);
        let err = Frame::decode(&packet[..packet.len() - 1]).unwrap_err();
        assert!(matches!(err, WireError::BufferTooShort { .. }));
    }

    #[test]
    fn test_trailing_garbage() {
        let mut packet = Frame::encode(&Message::Heartbeat, 1, 0, 0).to_vec();
        packet.push(0);
        assert!(Frame::decode(&packet).is_err());
    }

    #[test]
    fn test_body_trailing_bytes_rejected() {
        let mut packet = Frame::encode(&Message::HeartbeatResponse { response_to: 1 }, 1, 0, 0).to_vec();
        packet.push(0);
        let size = packet.len() as u32;
        packet[0..4].copy_from_slice(&size.to_be_bytes());
        assert!(matches!(Frame::decode(&packet), Err(WireError::BadMessage(_))));
    }

    #[test]
    fn test_resume_rejected() {
        let header = MessageHeader::new(MessageType::ResumeRequest, 1, 0, 0, 0);
        let mut buf = [0u8; HEADER_SIZE];
        header.serialize(&mut buf).unwrap();
        assert_eq!(
            Frame::decode(&buf),
            Err(WireError::UnexpectedMessageType("RESUME_REQUEST"))
        );
    }
}
