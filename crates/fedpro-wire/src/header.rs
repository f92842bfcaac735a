//! Message header
//!
//! Fixed header is 24 bytes, all fields big-endian:
//! - Bytes 0-3: Packet size (header included)
//! - Bytes 4-7: Sequence number
//! - Bytes 8-15: Session ID
//! - Bytes 16-19: Last received sequence number
//! - Bytes 20-23: Message type

use crate::{WireError, WireResult};

/// Header size in bytes
pub const HEADER_SIZE: usize = 24;

/// Protocol version sent in `NEW_SESSION`
pub const PROTOCOL_VERSION: u32 = 1;

/// Message types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    NewSession = 1,
    NewSessionStatus = 2,
    Heartbeat = 3,
    HeartbeatResponse = 4,
    TerminateSession = 5,
    SessionTerminated = 6,
    ResumeRequest = 10,
    ResumeStatus = 11,
    CallRequest = 20,
    CallResponse = 21,
    CallbackRequest = 22,
    CallbackResponse = 23,
}

impl MessageType {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            1 => Some(MessageType::NewSession),
            2 => Some(MessageType::NewSessionStatus),
            3 => Some(MessageType::Heartbeat),
            4 => Some(MessageType::HeartbeatResponse),
            5 => Some(MessageType::TerminateSession),
            6 => Some(MessageType::SessionTerminated),
            10 => Some(MessageType::ResumeRequest),
            11 => Some(MessageType::ResumeStatus),
            20 => Some(MessageType::CallRequest),
            21 => Some(MessageType::CallResponse),
            22 => Some(MessageType::CallbackRequest),
            23 => Some(MessageType::CallbackResponse),
            _ => None,
        }
    }

    #[inline]
    pub fn to_u32(self) -> u32 {
        self as u32
    }

    /// HLA traffic as opposed to session control
    pub fn is_hla(self) -> bool {
        matches!(
            self,
            MessageType::CallRequest
                | MessageType::CallResponse
                | MessageType::CallbackRequest
                | MessageType::CallbackResponse
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageType::NewSession => "NEW_SESSION",
            MessageType::NewSessionStatus => "NEW_SESSION_STATUS",
            MessageType::Heartbeat => "HEARTBEAT",
            MessageType::HeartbeatResponse => "HEARTBEAT_RESPONSE",
            MessageType::TerminateSession => "TERMINATE_SESSION",
            MessageType::SessionTerminated => "SESSION_TERMINATED",
            MessageType::ResumeRequest => "RESUME_REQUEST",
            MessageType::ResumeStatus => "RESUME_STATUS",
            MessageType::CallRequest => "CALL_REQUEST",
            MessageType::CallResponse => "CALL_RESPONSE",
            MessageType::CallbackRequest => "CALLBACK_REQUEST",
            MessageType::CallbackResponse => "CALLBACK_RESPONSE",
        }
    }
}

/// Fixed header structure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    /// Total packet length, header included
    pub packet_size: u32,
    pub sequence_number: u32,
    pub session_id: u64,
    /// Highest sequence number seen from the other side
    pub last_received_sequence_number: u32,
    pub message_type: MessageType,
}

impl MessageHeader {
    pub fn new(
        message_type: MessageType,
        sequence_number: u32,
        session_id: u64,
        last_received_sequence_number: u32,
        body_len: usize,
    ) -> Self {
        MessageHeader {
            packet_size: (HEADER_SIZE + body_len) as u32,
            sequence_number,
            session_id,
            last_received_sequence_number,
            message_type,
        }
    }

    /// Body length implied by the packet size
    #[inline]
    pub fn body_len(&self) -> usize {
        self.packet_size as usize - HEADER_SIZE
    }

    /// Parse header from bytes
    pub fn parse(buf: &[u8]) -> WireResult<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::BufferTooShort {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let packet_size = read_u32(buf, 0);
        if (packet_size as usize) < HEADER_SIZE {
            return Err(WireError::InvalidPacketSize(packet_size));
        }

        let sequence_number = read_u32(buf, 4);

        let mut session = [0u8; 8];
        session.copy_from_slice(&buf[8..16]);
        let session_id = u64::from_be_bytes(session);

        let last_received_sequence_number = read_u32(buf, 16);

        let raw_type = read_u32(buf, 20);
        let message_type =
            MessageType::from_u32(raw_type).ok_or(WireError::UnknownMessageType(raw_type))?;

        Ok(MessageHeader {
            packet_size,
            sequence_number,
            session_id,
            last_received_sequence_number,
            message_type,
        })
    }

    /// Serialize header to bytes
    pub fn serialize(&self, buf: &mut [u8]) -> WireResult<()> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::BufferTooShort {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        buf[0..4].copy_from_slice(&self.packet_size.to_be_bytes());
        buf[4..8].copy_from_slice(&self.sequence_number.to_be_bytes());
        buf[8..16].copy_from_slice(&self.session_id.to_be_bytes());
        buf[16..20].copy_from_slice(&self.last_received_sequence_number.to_be_bytes());
        buf[20..24].copy_from_slice(&self.message_type.to_u32().to_be_bytes());

        Ok(())
    }
}

#[inline]
fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[at..at + 4]);
    u32::from_be_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> MessageHeader {
        MessageHeader::new(MessageType::CallRequest, 7, 0x0102_0304_0506_0708, 3, 10)
    }

    #[test]
    fn test_header_roundtrip() {
        let header = sample();
        let mut buf = [0u8; HEADER_SIZE];
        header.serialize(&mut buf).unwrap();

        let parsed = MessageHeader::parse(&buf).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.body_len(), 10);
    }

    #[test]
    fn test_header_layout() {
        let mut buf = [0u8; HEADER_SIZE];
        sample().serialize(&mut buf).unwrap();
        assert_eq!(&buf[0..4], &[0, 0, 0, 34]);
        assert_eq!(&buf[4..8], &[0, 0, 0, 7]);
        assert_eq!(&buf[8..16], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&buf[16..20], &[0, 0, 0, 3]);
        assert_eq!(&buf[20..24], &[0, 0, 0, 20]);
    }

    #[test]
    fn test_header_too_short() {
        let buf = [0u8; 10];
        assert_eq!(
            MessageHeader::parse(&buf),
            Err(WireError::BufferTooShort {
                expected: HEADER_SIZE,
                actual: 10
            })
        );
        assert!(sample().serialize(&mut [0u8; 23]).is_err());
    }

    #[test]
    fn test_undersized_packet_rejected() {
        let mut buf = [0u8; HEADER_SIZE];
        sample().serialize(&mut buf).unwrap();
        buf[0..4].copy_from_slice(&23u32.to_be_bytes());
        assert_eq!(MessageHeader::parse(&buf), Err(WireError::InvalidPacketSize(23)));
    }

    #[test]
    fn test_unknown_message_type() {
        let mut buf = [0u8; HEADER_SIZE];
        sample().serialize(&mut buf).unwrap();
        buf[20..24].copy_from_slice(&99u32.to_be_bytes());
        assert_eq!(MessageHeader::parse(&buf), Err(WireError::UnknownMessageType(99)));
    }

    #[test]
    fn test_message_type_classes() {
        assert!(MessageType::CallbackResponse.is_hla());
        assert!(!MessageType::Heartbeat.is_hla());
        assert_eq!(MessageType::from_u32(11), Some(MessageType::ResumeStatus));
        assert_eq!(MessageType::from_u32(12), None);
        assert_eq!(MessageType::NewSessionStatus.name(), "NEW_SESSION_STATUS");
    }

    proptest! {
        #[test]
        fn prop_parse_inverts_serialize(
            body in 0usize..65_536,
            seq in any::<u32>(),
            session in any::<u64>(),
            last in any::<u32>(),
            idx in 0usize..12,
        ) {
            let types = [1u32, 2, 3, 4, 5, 6, 10, 11, 20, 21, 22, 23];
            let ty = MessageType::from_u32(types[idx]).unwrap();
            let header = MessageHeader::new(ty, seq, session, last, body);
            let mut buf = [0u8; HEADER_SIZE];
            header.serialize(&mut buf).unwrap();
            prop_assert_eq!(MessageHeader::parse(&buf).unwrap(), header);
        }
    }
}
