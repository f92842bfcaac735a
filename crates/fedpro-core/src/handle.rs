//! Handle types for the FedPro protocol
//!
//! Handles are opaque byte strings assigned by the coordinator. Every kind
//! shares one representation, [`Handle<K>`], but kinds never mix at the type
//! level: an `AttributeHandle` cannot be passed where a `ParameterHandle` is
//! expected.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use bytes::Bytes;

use crate::{Payload, PayloadReader, PayloadWriter, RtiError, RtiResult};

/// Marker for one handle kind
pub trait HandleKind: Copy + fmt::Debug + Eq + Ord + Hash + 'static {
    const NAME: &'static str;
}

macro_rules! handle_kinds {
    ($( $(#[$doc:meta])* $kind:ident => $alias:ident ),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub enum $kind {}

            impl HandleKind for $kind {
                const NAME: &'static str = stringify!($alias);
            }

            pub type $alias = Handle<$kind>;
        )*
    };
}

handle_kinds! {
    Federate => FederateHandle,
    ObjectClass => ObjectClassHandle,
    InteractionClass => InteractionClassHandle,
    ObjectInstance => ObjectInstanceHandle,
    Attribute => AttributeHandle,
    Parameter => ParameterHandle,
    Dimension => DimensionHandle,
    MessageRetraction => MessageRetractionHandle,
    /// Region registered with the federation
    Region => RegisteredRegionHandle,
}

/// Opaque, fixed-width identifier of kind `K`
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle<K: HandleKind> {
    bytes: Bytes,
    kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind> Handle<K> {
    /// Wrap raw handle bytes. An empty sequence is not a handle.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> RtiResult<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(RtiError::CouldNotDecode(format!("empty {}", K::NAME)));
        }
        Ok(Handle {
            bytes,
            kind: PhantomData,
        })
    }

    /// Decode from `buf[offset..]`, copying only that slice.
    pub fn decode(buf: &[u8], offset: usize) -> RtiResult<Self> {
        let slice = buf.get(offset..).ok_or_else(|| {
            RtiError::CouldNotDecode(format!(
                "{}: offset {} past end of {}-byte buffer",
                K::NAME,
                offset,
                buf.len()
            ))
        })?;
        Self::from_bytes(Bytes::copy_from_slice(slice))
    }

    /// Four-byte handle holding a big-endian integer
    #[inline]
    pub fn from_u32(value: u32) -> Self {
        Handle {
            bytes: Bytes::copy_from_slice(&value.to_be_bytes()),
            kind: PhantomData,
        }
    }

    /// Eight-byte handle holding a big-endian integer
    #[inline]
    pub fn from_u64(value: u64) -> Self {
        Handle {
            bytes: Bytes::copy_from_slice(&value.to_be_bytes()),
            kind: PhantomData,
        }
    }

    #[inline]
    pub fn encoded_length(&self) -> usize {
        self.bytes.len()
    }

    /// Write the handle bytes at `offset`, returning the bytes written.
    pub fn encode(&self, buf: &mut [u8], offset: usize) -> RtiResult<usize> {
        let buf_len = buf.len();
        let dest = offset
            .checked_add(self.bytes.len())
            .and_then(|end| buf.get_mut(offset..end))
            .ok_or_else(|| {
                RtiError::CouldNotEncode(format!(
                    "{} needs {} bytes at offset {}, buffer holds {}",
                    K::NAME,
                    self.bytes.len(),
                    offset,
                    buf_len
                ))
            })?;
        dest.copy_from_slice(&self.bytes);
        Ok(self.bytes.len())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bytes.len() {
            4 => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&self.bytes);
                write!(f, "{}", i32::from_be_bytes(raw))
            }
            8 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&self.bytes);
                write!(f, "{}", i64::from_be_bytes(raw))
            }
            _ => write!(f, "{:02x?}", &self.bytes[..]),
        }
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", K::NAME)?;
        self.fmt_value(f)?;
        write!(f, ")")
    }
}

impl<K: HandleKind> fmt::Display for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_value(f)
    }
}

impl<K: HandleKind> Payload for Handle<K> {
    fn write(&self, w: &mut PayloadWriter) {
        w.put_bytes(&self.bytes);
    }

    fn read(r: &mut PayloadReader) -> RtiResult<Self> {
        Self::from_bytes(r.get_bytes()?)
    }
}

/// Ordered, de-duplicated set of handles of one kind
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct HandleSet<K: HandleKind>(BTreeSet<Handle<K>>);

pub type AttributeHandleSet = HandleSet<Attribute>;
pub type FederateHandleSet = HandleSet<Federate>;
pub type InteractionClassHandleSet = HandleSet<InteractionClass>;
pub type DimensionHandleSet = HandleSet<Dimension>;

impl<K: HandleKind> HandleSet<K> {
    pub fn new() -> Self {
        HandleSet(BTreeSet::new())
    }

    pub fn insert(&mut self, handle: Handle<K>) -> bool {
        self.0.insert(handle)
    }

    pub fn remove(&mut self, handle: &Handle<K>) -> bool {
        self.0.remove(handle)
    }

    pub fn contains(&self, handle: &Handle<K>) -> bool {
        self.0.contains(handle)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Handle<K>> {
        self.0.iter()
    }
}

impl<K: HandleKind> Default for HandleSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: HandleKind> FromIterator<Handle<K>> for HandleSet<K> {
    fn from_iter<I: IntoIterator<Item = Handle<K>>>(iter: I) -> Self {
        HandleSet(iter.into_iter().collect())
    }
}

impl<K: HandleKind> fmt::Debug for HandleSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

impl<K: HandleKind> Payload for HandleSet<K> {
    fn write(&self, w: &mut PayloadWriter) {
        w.put_u32(self.0.len() as u32);
        for handle in &self.0 {
            handle.write(w);
        }
    }

    fn read(r: &mut PayloadReader) -> RtiResult<Self> {
        let count = r.get_u32()?;
        let mut set = HandleSet::new();
        for _ in 0..count {
            set.insert(Handle::read(r)?);
        }
        Ok(set)
    }
}

/// Handle-keyed map of opaque values (attribute or parameter values)
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct HandleValueMap<K: HandleKind>(BTreeMap<Handle<K>, Bytes>);

pub type AttributeHandleValueMap = HandleValueMap<Attribute>;
pub type ParameterHandleValueMap = HandleValueMap<Parameter>;

impl<K: HandleKind> HandleValueMap<K> {
    pub fn new() -> Self {
        HandleValueMap(BTreeMap::new())
    }

    pub fn insert(&mut self, handle: Handle<K>, value: impl Into<Bytes>) -> Option<Bytes> {
        self.0.insert(handle, value.into())
    }

    pub fn get(&self, handle: &Handle<K>) -> Option<&Bytes> {
        self.0.get(handle)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Handle<K>, &Bytes)> {
        self.0.iter()
    }

    /// Keys as a handle set
    pub fn handles(&self) -> HandleSet<K> {
        self.0.keys().cloned().collect()
    }
}

impl<K: HandleKind> Default for HandleValueMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: HandleKind> fmt::Debug for HandleValueMap<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

impl<K: HandleKind> Payload for HandleValueMap<K> {
    fn write(&self, w: &mut PayloadWriter) {
        w.put_u32(self.0.len() as u32);
        for (handle, value) in &self.0 {
            handle.write(w);
            w.put_bytes(value);
        }
    }

    fn read(r: &mut PayloadReader) -> RtiResult<Self> {
        let count = r.get_u32()?;
        let mut map = HandleValueMap::new();
        for _ in 0..count {
            let handle = Handle::read(r)?;
            let value = r.get_bytes()?;
            map.insert(handle, value);
        }
        Ok(map)
    }
}

/// Transportation type: a closed set of two well-known values
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransportationTypeHandle {
    Reliable,
    BestEffort,
}

impl TransportationTypeHandle {
    pub const HLA_RELIABLE: TransportationTypeHandle = TransportationTypeHandle::Reliable;
    pub const HLA_BEST_EFFORT: TransportationTypeHandle = TransportationTypeHandle::BestEffort;

    const RELIABLE_BYTES: [u8; 4] = [0, 0, 0, 1];
    const BEST_EFFORT_BYTES: [u8; 4] = [0, 0, 0, 2];

    #[inline]
    pub fn to_bytes(self) -> [u8; 4] {
        match self {
            TransportationTypeHandle::Reliable => Self::RELIABLE_BYTES,
            TransportationTypeHandle::BestEffort => Self::BEST_EFFORT_BYTES,
        }
    }

    /// Resolve raw bytes to one of the two singletons.
    pub fn from_bytes(bytes: &[u8]) -> RtiResult<Self> {
        if bytes == Self::RELIABLE_BYTES {
            Ok(TransportationTypeHandle::Reliable)
        } else if bytes == Self::BEST_EFFORT_BYTES {
            Ok(TransportationTypeHandle::BestEffort)
        } else {
            Err(RtiError::CouldNotDecode(format!(
                "unknown transportation type {:02x?}",
                bytes
            )))
        }
    }

    pub fn decode(buf: &[u8], offset: usize) -> RtiResult<Self> {
        let slice = buf.get(offset..).ok_or_else(|| {
            RtiError::CouldNotDecode(format!("offset {} past end of buffer", offset))
        })?;
        Self::from_bytes(slice)
    }

    #[inline]
    pub fn encoded_length(self) -> usize {
        4
    }

    pub fn encode(self, buf: &mut [u8], offset: usize) -> RtiResult<usize> {
        let dest = offset
            .checked_add(4)
            .and_then(|end| buf.get_mut(offset..end))
            .ok_or_else(|| {
                RtiError::CouldNotEncode(format!(
                    "transportation type needs 4 bytes at offset {}",
                    offset
                ))
            })?;
        dest.copy_from_slice(&self.to_bytes());
        Ok(4)
    }

    /// Standard transportation name
    pub fn name(self) -> &'static str {
        match self {
            TransportationTypeHandle::Reliable => "HLAreliable",
            TransportationTypeHandle::BestEffort => "HLAbestEffort",
        }
    }

    pub fn from_name(name: &str) -> RtiResult<Self> {
        match name {
            "HLAreliable" => Ok(TransportationTypeHandle::Reliable),
            "HLAbestEffort" => Ok(TransportationTypeHandle::BestEffort),
            other => Err(RtiError::InvalidTransportationName(other.to_owned())),
        }
    }
}

impl fmt::Debug for TransportationTypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportationTypeHandle::Reliable => write!(f, "HLA_RELIABLE"),
            TransportationTypeHandle::BestEffort => write!(f, "HLA_BEST_EFFORT"),
        }
    }
}

impl Payload for TransportationTypeHandle {
    fn write(&self, w: &mut PayloadWriter) {
        w.put_bytes(&self.to_bytes());
    }

    fn read(r: &mut PayloadReader) -> RtiResult<Self> {
        Self::from_bytes(&r.get_bytes()?)
    }
}

/// Inclusive range along one dimension
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RangeBounds {
    lower: u64,
    upper: u64,
}

impl RangeBounds {
    pub fn new(lower: u64, upper: u64) -> RtiResult<Self> {
        if lower > upper {
            return Err(RtiError::InvalidRangeBound(format!(
                "lower bound {} above upper bound {}",
                lower, upper
            )));
        }
        Ok(RangeBounds { lower, upper })
    }

    #[inline]
    pub fn lower(&self) -> u64 {
        self.lower
    }

    #[inline]
    pub fn upper(&self) -> u64 {
        self.upper
    }
}

impl Payload for RangeBounds {
    fn write(&self, w: &mut PayloadWriter) {
        w.put_u64(self.lower).put_u64(self.upper);
    }

    fn read(r: &mut PayloadReader) -> RtiResult<Self> {
        let lower = r.get_u64()?;
        let upper = r.get_u64()?;
        RangeBounds::new(lower, upper).map_err(|e| RtiError::CouldNotDecode(e.to_string()))
    }
}

/// Region described inline by its dimension ranges instead of an id
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ConveyedRegion {
    ranges: BTreeMap<DimensionHandle, RangeBounds>,
}

impl ConveyedRegion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, dimension: DimensionHandle, range: RangeBounds) -> Self {
        self.ranges.insert(dimension, range);
        self
    }

    pub fn dimensions(&self) -> DimensionHandleSet {
        self.ranges.keys().cloned().collect()
    }

    pub fn range(&self, dimension: &DimensionHandle) -> RtiResult<RangeBounds> {
        self.ranges.get(dimension).copied().ok_or_else(|| {
            RtiError::RegionDoesNotContainSpecifiedDimension(format!("{:?}", dimension))
        })
    }
}

/// Region reference: either a federation-registered id or an inline
/// description, which may only be inspected.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RegionHandle {
    Registered(RegisteredRegionHandle),
    Conveyed(ConveyedRegion),
}

impl RegionHandle {
    pub fn is_conveyed(&self) -> bool {
        matches!(self, RegionHandle::Conveyed(_))
    }

    pub fn encoded_length(&self) -> RtiResult<usize> {
        match self {
            RegionHandle::Registered(handle) => Ok(handle.encoded_length()),
            RegionHandle::Conveyed(_) => Err(Self::conveyed_not_encodable()),
        }
    }

    pub fn encode(&self, buf: &mut [u8], offset: usize) -> RtiResult<usize> {
        match self {
            RegionHandle::Registered(handle) => handle.encode(buf, offset),
            RegionHandle::Conveyed(_) => Err(Self::conveyed_not_encodable()),
        }
    }

    /// The registered id, for operations that need a federation region.
    pub fn registered(&self) -> RtiResult<&RegisteredRegionHandle> {
        match self {
            RegionHandle::Registered(handle) => Ok(handle),
            RegionHandle::Conveyed(_) => Err(RtiError::InvalidRegion(
                "conveyed region is not registered with the federation".into(),
            )),
        }
    }

    fn conveyed_not_encodable() -> RtiError {
        RtiError::Unsupported("conveyed region handles cannot be encoded".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_debug_renders_integers() {
        assert_eq!(format!("{:?}", FederateHandle::from_u32(42)), "FederateHandle(42)");
        assert_eq!(
            format!("{:?}", ObjectInstanceHandle::from_u64(7)),
            "ObjectInstanceHandle(7)"
        );
        let odd = AttributeHandle::from_bytes(vec![0xAB, 0x01]).unwrap();
        assert_eq!(format!("{:?}", odd), "AttributeHandle([ab, 01])");
    }

    #[test]
    fn test_debug_negative_four_byte() {
        let h = ParameterHandle::from_u32(u32::MAX);
        assert_eq!(format!("{}", h), "-1");
    }

    #[test]
    fn test_empty_decode_fails() {
        assert!(matches!(
            ObjectClassHandle::decode(&[1, 2, 3], 3),
            Err(RtiError::CouldNotDecode(_))
        ));
        assert!(ObjectClassHandle::from_bytes(Vec::new()).is_err());
        assert!(ObjectClassHandle::decode(&[1], 5).is_err());
    }

    #[test]
    fn test_decode_copies_only_slice() {
        let buf = [9, 9, 0, 0, 0, 5];
        let h = InteractionClassHandle::decode(&buf, 2).unwrap();
        assert_eq!(h, InteractionClassHandle::from_u32(5));
        assert_eq!(h.encoded_length(), 4);
    }

    #[test]
    fn test_encode_too_small() {
        let h = DimensionHandle::from_u64(1);
        let mut buf = [0u8; 6];
        assert!(matches!(h.encode(&mut buf, 0), Err(RtiError::CouldNotEncode(_))));
    }

    #[test]
    fn test_encode_offset_overflow() {
        let mut buf = [0u8; 16];
        let h = ObjectInstanceHandle::from_u32(3);
        assert!(matches!(
            h.encode(&mut buf, usize::MAX - 1),
            Err(RtiError::CouldNotEncode(_))
        ));
        assert!(matches!(
            TransportationTypeHandle::HLA_RELIABLE.encode(&mut buf, usize::MAX - 1),
            Err(RtiError::CouldNotEncode(_))
        ));
        assert_eq!(buf, [0u8; 16]);
    }

    #[test]
    fn test_transportation_singletons() {
        let mut buf = [0u8; 4];
        TransportationTypeHandle::HLA_RELIABLE.encode(&mut buf, 0).unwrap();
        assert_eq!(buf, [0, 0, 0, 1]);
        assert_eq!(
            TransportationTypeHandle::decode(&[0, 0, 0, 2], 0).unwrap(),
            TransportationTypeHandle::HLA_BEST_EFFORT
        );
        assert!(TransportationTypeHandle::decode(&[0, 0, 0, 3], 0).is_err());
        assert!(TransportationTypeHandle::decode(&[0, 0, 1], 0).is_err());
        assert_eq!(format!("{:?}", TransportationTypeHandle::HLA_RELIABLE), "HLA_RELIABLE");
        assert_eq!(
            format!("{:?}", TransportationTypeHandle::HLA_BEST_EFFORT),
            "HLA_BEST_EFFORT"
        );
    }

    #[test]
    fn test_conveyed_region_not_encodable() {
        let dim = DimensionHandle::from_u32(1);
        let region = RegionHandle::Conveyed(
            ConveyedRegion::new().with_range(dim.clone(), RangeBounds::new(0, 10).unwrap()),
        );
        let mut buf = [0u8; 16];
        assert!(matches!(region.encode(&mut buf, 0), Err(RtiError::Unsupported(_))));
        assert!(region.registered().is_err());

        let RegionHandle::Conveyed(inner) = &region else {
            unreachable!()
        };
        assert_eq!(inner.range(&dim).unwrap().upper(), 10);
        assert!(inner.range(&DimensionHandle::from_u32(2)).is_err());
    }

    #[test]
    fn test_conveyed_region_equality() {
        let a = ConveyedRegion::new().with_range(DimensionHandle::from_u32(1), RangeBounds::new(1, 2).unwrap());
        let b = ConveyedRegion::new().with_range(DimensionHandle::from_u32(1), RangeBounds::new(1, 2).unwrap());
        assert_eq!(RegionHandle::Conveyed(a), RegionHandle::Conveyed(b));
    }

    #[test]
    fn test_range_bounds_order() {
        assert!(matches!(RangeBounds::new(5, 1), Err(RtiError::InvalidRangeBound(_))));
    }

    #[test]
    fn test_handle_set_payload() {
        let set: AttributeHandleSet = (1..4).map(AttributeHandle::from_u32).collect();
        let mut w = PayloadWriter::new();
        w.put(&set);
        let back: AttributeHandleSet = PayloadReader::new(w.finish()).get().unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_value_map_payload() {
        let mut values = ParameterHandleValueMap::new();
        values.insert(ParameterHandle::from_u32(1), &b"hello"[..]);
        values.insert(ParameterHandle::from_u32(2), Vec::new());
        let mut w = PayloadWriter::new();
        w.put(&values);
        let back: ParameterHandleValueMap = PayloadReader::new(w.finish()).get().unwrap();
        assert_eq!(back, values);
        assert_eq!(back.handles().len(), 2);
    }

    fn check_kind<K: HandleKind>(bytes: &[u8]) {
        let direct = Handle::<K>::from_bytes(bytes.to_vec()).unwrap();
        let mut buf = vec![0u8; direct.encoded_length() + 3];
        let written = direct.encode(&mut buf, 3).unwrap();
        assert_eq!(written, bytes.len());
        let decoded = Handle::<K>::decode(&buf, 3).unwrap();
        assert_eq!(decoded, direct);
        assert_eq!(hash_of(&decoded), hash_of(&direct));
    }

    proptest! {
        #[test]
        fn prop_every_kind_roundtrips(bytes in proptest::collection::vec(any::<u8>(), 1..16)) {
            check_kind::<Federate>(&bytes);
            check_kind::<ObjectClass>(&bytes);
            check_kind::<InteractionClass>(&bytes);
            check_kind::<ObjectInstance>(&bytes);
            check_kind::<Attribute>(&bytes);
            check_kind::<Parameter>(&bytes);
            check_kind::<Dimension>(&bytes);
            check_kind::<MessageRetraction>(&bytes);
            check_kind::<Region>(&bytes);
        }

        #[test]
        fn prop_u32_constructor_matches_bytes(value in any::<u32>()) {
            let a = FederateHandle::from_u32(value);
            let b = FederateHandle::from_bytes(value.to_be_bytes().to_vec()).unwrap();
            prop_assert_eq!(hash_of(&a), hash_of(&b));
            prop_assert_eq!(a, b);
        }
    }
}
