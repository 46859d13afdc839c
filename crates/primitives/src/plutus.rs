//! Plutus data and its CBOR encoding.
//!
//! Records and operation selectors are exchanged with the authorization scripts as plutus data,
//! so the encoding here has to match what the scripts expect byte for byte:
//!
//! - constructor `i < 7` is tagged `121 + i`, `7 <= i < 128` is tagged `1280 + (i - 7)`, anything
//!   larger uses the general form `102([i, fields])`;
//! - non-empty lists (including constructor fields) are indefinite-length arrays, empty lists are
//!   `0x80`;
//! - byte strings longer than 64 bytes are split into 64-byte chunks of an indefinite byte string;
//! - integers outside the 64-bit range use the bignum tags 2 and 3.

use minicbor::{
    data::{IanaTag, Int, Tag, Type},
    decode,
    encode::{self, Write},
    Decode, Decoder, Encode, Encoder,
};

use crate::errors::DecodeError;

/// Maximum length of a single byte string chunk.
const BYTES_CHUNK_SIZE: usize = 64;

const TAG_GENERAL_CONSTR: u64 = 102;
const TAG_CONSTR_BASE: u64 = 121;
const TAG_CONSTR_EXT_BASE: u64 = 1280;

/// The universal data type understood by the authorization scripts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlutusData {
    /// A tagged constructor with positional fields.
    Constr(u64, Vec<PlutusData>),
    /// An association list.
    Map(Vec<(PlutusData, PlutusData)>),
    /// A list.
    List(Vec<PlutusData>),
    /// An arbitrary-precision integer (bounded to `i128` here).
    Integer(i128),
    /// A byte string.
    Bytes(Vec<u8>),
}

/// Conversion of a Rust value into [`PlutusData`].
pub trait ToPlutusData {
    /// Encodes `self` as plutus data.
    fn to_plutus_data(&self) -> PlutusData;
}

/// Conversion of [`PlutusData`] into a Rust value.
pub trait FromPlutusData: Sized {
    /// Decodes `Self` from plutus data.
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError>;
}

impl PlutusData {
    /// The unit value, i.e. constructor 0 with no fields.
    pub const fn unit() -> Self {
        PlutusData::Constr(0, Vec::new())
    }

    /// Shorthand for a constructor.
    pub const fn constr(tag: u64, fields: Vec<PlutusData>) -> Self {
        PlutusData::Constr(tag, fields)
    }

    /// Shorthand for a byte string.
    pub fn bytes(bytes: impl AsRef<[u8]>) -> Self {
        PlutusData::Bytes(bytes.as_ref().to_vec())
    }

    /// Shorthand for a non-negative integer.
    pub fn uint(value: u64) -> Self {
        PlutusData::Integer(value.into())
    }

    fn shape(&self) -> String {
        match self {
            PlutusData::Constr(tag, fields) => format!("constr {tag} with {} fields", fields.len()),
            PlutusData::Map(entries) => format!("map with {} entries", entries.len()),
            PlutusData::List(items) => format!("list with {} items", items.len()),
            PlutusData::Integer(_) => "integer".to_string(),
            PlutusData::Bytes(_) => "bytes".to_string(),
        }
    }

    /// Returns the constructor tag and fields, or an error if this is not a constructor.
    pub fn as_constr(&self) -> Result<(u64, &[PlutusData]), DecodeError> {
        match self {
            PlutusData::Constr(tag, fields) => Ok((*tag, fields)),
            other => Err(DecodeError::UnexpectedShape {
                expected: "constr".to_string(),
                got: other.shape(),
            }),
        }
    }

    /// Returns the fields of a constructor with the given tag and arity.
    pub fn expect_constr(&self, tag: u64, arity: usize) -> Result<&[PlutusData], DecodeError> {
        let (got_tag, fields) = self.as_constr()?;
        if got_tag != tag || fields.len() != arity {
            return Err(DecodeError::UnexpectedShape {
                expected: format!("constr {tag} with {arity} fields"),
                got: self.shape(),
            });
        }
        Ok(fields)
    }

    /// Returns the bytes of a byte string.
    pub fn as_bytes(&self) -> Result<&[u8], DecodeError> {
        match self {
            PlutusData::Bytes(bytes) => Ok(bytes),
            other => Err(DecodeError::UnexpectedShape {
                expected: "bytes".to_string(),
                got: other.shape(),
            }),
        }
    }

    /// Returns the value of an integer.
    pub fn as_integer(&self) -> Result<i128, DecodeError> {
        match self {
            PlutusData::Integer(value) => Ok(*value),
            other => Err(DecodeError::UnexpectedShape {
                expected: "integer".to_string(),
                got: other.shape(),
            }),
        }
    }

    /// Returns the value of an integer that must fit in a `u64`.
    pub fn as_u64(&self) -> Result<u64, DecodeError> {
        let value = self.as_integer()?;
        u64::try_from(value).map_err(|_| DecodeError::IntegerOutOfRange(value))
    }

    /// Returns the items of a list.
    pub fn as_list(&self) -> Result<&[PlutusData], DecodeError> {
        match self {
            PlutusData::List(items) => Ok(items),
            other => Err(DecodeError::UnexpectedShape {
                expected: "list".to_string(),
                got: other.shape(),
            }),
        }
    }

    /// Encodes the data as CBOR.
    pub fn to_cbor(&self) -> Vec<u8> {
        let mut encoder = Encoder::new(Vec::new());
        // the encoder never raises errors of its own and writes into a vector cannot fail
        let _ = self.encode(&mut encoder, &mut ());
        encoder.into_writer()
    }

    /// Decodes a single data item from CBOR, rejecting trailing bytes.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut decoder = Decoder::new(bytes);
        let data: Self = decoder.decode().map_err(|err| {
            if err.is_end_of_input() {
                DecodeError::UnexpectedEof
            } else {
                DecodeError::UnsupportedCbor(err.to_string())
            }
        })?;
        match bytes.len() - decoder.position() {
            0 => Ok(data),
            trailing => Err(DecodeError::TrailingBytes(trailing)),
        }
    }
}

impl ToPlutusData for PlutusData {
    fn to_plutus_data(&self) -> PlutusData {
        self.clone()
    }
}

impl FromPlutusData for PlutusData {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
        Ok(data.clone())
    }
}

impl ToPlutusData for u64 {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::uint(*self)
    }
}

impl FromPlutusData for u64 {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
        data.as_u64()
    }
}

impl<T: ToPlutusData> ToPlutusData for Vec<T> {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::List(self.iter().map(ToPlutusData::to_plutus_data).collect())
    }
}

impl<T: FromPlutusData> FromPlutusData for Vec<T> {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
        data.as_list()?.iter().map(T::from_plutus_data).collect()
    }
}

impl<C> Encode<C> for PlutusData {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        match self {
            PlutusData::Constr(tag, fields) => match *tag {
                0..=6 => {
                    e.tag(Tag::new(TAG_CONSTR_BASE + tag))?;
                    encode_list(fields, e, ctx)
                }
                7..=127 => {
                    e.tag(Tag::new(TAG_CONSTR_EXT_BASE + tag - 7))?;
                    encode_list(fields, e, ctx)
                }
                _ => {
                    e.tag(Tag::new(TAG_GENERAL_CONSTR))?.array(2)?.u64(*tag)?;
                    encode_list(fields, e, ctx)
                }
            },
            PlutusData::Map(entries) => {
                e.map(entries.len() as u64)?;
                for (key, value) in entries {
                    key.encode(e, ctx)?;
                    value.encode(e, ctx)?;
                }
                Ok(())
            }
            PlutusData::List(items) => encode_list(items, e, ctx),
            PlutusData::Integer(value) => encode_integer(*value, e),
            PlutusData::Bytes(bytes) => encode_bytes(bytes, e),
        }
    }
}

fn encode_bytes<W: Write>(
    bytes: &[u8],
    e: &mut Encoder<W>,
) -> Result<(), encode::Error<W::Error>> {
    if bytes.len() <= BYTES_CHUNK_SIZE {
        e.bytes(bytes)?;
        return Ok(());
    }

    e.begin_bytes()?;
    for chunk in bytes.chunks(BYTES_CHUNK_SIZE) {
        e.bytes(chunk)?;
    }
    e.end()?;
    Ok(())
}

fn encode_list<C, W: Write>(
    items: &[PlutusData],
    e: &mut Encoder<W>,
    ctx: &mut C,
) -> Result<(), encode::Error<W::Error>> {
    if items.is_empty() {
        e.array(0)?;
        return Ok(());
    }

    e.begin_array()?;
    for item in items {
        item.encode(e, ctx)?;
    }
    e.end()?;
    Ok(())
}

fn encode_integer<W: Write>(
    value: i128,
    e: &mut Encoder<W>,
) -> Result<(), encode::Error<W::Error>> {
    if let Ok(int) = Int::try_from(value) {
        e.int(int)?;
        return Ok(());
    }

    // bignums carry `n` for positive values and `-1 - n` for negative ones
    let (tag, magnitude) = if value < 0 {
        (IanaTag::NegBignum, (-1 - value).unsigned_abs())
    } else {
        (IanaTag::PosBignum, value.unsigned_abs())
    };
    let be = magnitude.to_be_bytes();
    let first_nonzero = be.iter().position(|b| *b != 0).unwrap_or(be.len() - 1);
    e.tag(tag)?;
    encode_bytes(&be[first_nonzero..], e)
}

impl<'b, C> Decode<'b, C> for PlutusData {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
        match d.datatype()? {
            Type::U8 | Type::U16 | Type::U32 | Type::U64 => {
                Ok(PlutusData::Integer(d.u64()?.into()))
            }
            Type::I8 | Type::I16 | Type::I32 | Type::I64 | Type::Int => {
                Ok(PlutusData::Integer(d.int()?.into()))
            }
            Type::Bytes | Type::BytesIndef => Ok(PlutusData::Bytes(decode_bytes(d)?)),
            Type::Array | Type::ArrayIndef => Ok(PlutusData::List(decode_list(d, ctx)?)),
            Type::Map | Type::MapIndef => {
                let mut entries = Vec::new();
                match d.map()? {
                    Some(n) => {
                        for _ in 0..n {
                            entries.push((Self::decode(d, ctx)?, Self::decode(d, ctx)?));
                        }
                    }
                    None => {
                        while !at_break(d)? {
                            entries.push((Self::decode(d, ctx)?, Self::decode(d, ctx)?));
                        }
                    }
                }
                Ok(PlutusData::Map(entries))
            }
            Type::Tag => decode_tagged(d, ctx),
            other => Err(decode::Error::message(format!("unsupported cbor type {other}"))),
        }
    }
}

fn decode_tagged<C>(d: &mut Decoder<'_>, ctx: &mut C) -> Result<PlutusData, decode::Error> {
    let tag = d.tag()?;
    if tag == Tag::from(IanaTag::PosBignum) {
        return Ok(PlutusData::Integer(decode_bignum(d)?));
    }
    if tag == Tag::from(IanaTag::NegBignum) {
        return Ok(PlutusData::Integer(-1 - decode_bignum(d)?));
    }

    match tag.as_u64() {
        index @ 121..=127 => Ok(PlutusData::Constr(
            index - TAG_CONSTR_BASE,
            decode_fields(d, ctx)?,
        )),
        index @ 1280..=1400 => Ok(PlutusData::Constr(
            index - TAG_CONSTR_EXT_BASE + 7,
            decode_fields(d, ctx)?,
        )),
        TAG_GENERAL_CONSTR => {
            if d.array()? != Some(2) {
                return Err(decode::Error::message(
                    "general constructor must be a 2-element array",
                ));
            }
            let index = d.u64()?;
            Ok(PlutusData::Constr(index, decode_fields(d, ctx)?))
        }
        other => Err(decode::Error::message(format!("unsupported tag {other}"))),
    }
}

/// Consumes a break marker if one is next.
fn at_break(d: &mut Decoder<'_>) -> Result<bool, decode::Error> {
    if d.datatype()? == Type::Break {
        d.set_position(d.position() + 1);
        return Ok(true);
    }
    Ok(false)
}

fn decode_bytes(d: &mut Decoder<'_>) -> Result<Vec<u8>, decode::Error> {
    match d.datatype()? {
        Type::Bytes => Ok(d.bytes()?.to_vec()),
        Type::BytesIndef => {
            let mut out = Vec::new();
            for chunk in d.bytes_iter()? {
                out.extend_from_slice(chunk?);
            }
            Ok(out)
        }
        other => Err(decode::Error::type_mismatch(other)),
    }
}

fn decode_list<C>(d: &mut Decoder<'_>, ctx: &mut C) -> Result<Vec<PlutusData>, decode::Error> {
    let mut items = Vec::new();
    match d.array()? {
        Some(n) => {
            for _ in 0..n {
                items.push(PlutusData::decode(d, ctx)?);
            }
        }
        None => {
            while !at_break(d)? {
                items.push(PlutusData::decode(d, ctx)?);
            }
        }
    }
    Ok(items)
}

fn decode_fields<C>(d: &mut Decoder<'_>, ctx: &mut C) -> Result<Vec<PlutusData>, decode::Error> {
    match d.datatype()? {
        Type::Array | Type::ArrayIndef => decode_list(d, ctx),
        _ => Err(decode::Error::message("constructor fields must be an array")),
    }
}

fn decode_bignum(d: &mut Decoder<'_>) -> Result<i128, decode::Error> {
    let bytes = decode_bytes(d)?;
    let significant: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();
    if significant.len() > 15 {
        return Err(decode::Error::message("bignum does not fit in 120 bits"));
    }
    Ok(significant
        .iter()
        .fold(0i128, |acc, b| (acc << 8) | i128::from(*b)))
}
