/*!
 Contains logic to load values from a Ruby `Marshal` stream, version 4.8.

 Logic referenced from the format description located at:
   - [`marshal_format.rdoc`](https://docs.ruby-lang.org/en/3.0/marshal_rdoc.html)
   - [`marshal.c`](https://github.com/ruby/ruby/blob/master/marshal.c)
*/
use num_bigint::{BigInt, Sign};

use crate::{
    error::marshal::{EncodingError, MarshalError},
    util::marshal::models::{ObjectWrapper, RubyType, Value, WrapperKind, WrapperTag},
};

/// The only major version of the format we can read
const MAJOR_VERSION: u8 = 4;
/// The only minor version of the format we can read
const MINOR_VERSION: u8 = 8;
/// Marks a negative [`RubyType::Bignum`]; any other sign byte is read as positive
const SIGN_NEGATIVE: u8 = b'-';
/// How deeply values may be nested before loading stops
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Contains logic and data used to load a value from a `Marshal` stream
#[derive(Debug)]
pub struct MarshalReader<'a> {
    /// The `Marshal` data we want to load
    stream: &'a [u8],
    /// The current index we are at in the stream
    idx: usize,
    /// As we read the stream, build a table of spelled symbols to resolve links against
    ///
    /// The first time a symbol is seen it is present in the stream literally,
    /// afterwards it may be referenced by index in order of appearance.
    symbols: Vec<String>,
    /// How many values we are currently nested inside of
    depth: usize,
    /// How many nested values are allowed before loading fails
    max_depth: usize,
}

impl<'a> MarshalReader<'a> {
    pub fn new(stream: &'a [u8]) -> Self {
        Self::with_max_depth(stream, DEFAULT_MAX_DEPTH)
    }

    /// Create a reader that fails with [`MarshalError::ExcessiveNesting`] past `max_depth` nested values
    pub fn with_max_depth(stream: &'a [u8], max_depth: usize) -> Self {
        Self {
            stream,
            idx: 0,
            symbols: vec![],
            depth: 0,
            max_depth,
        }
    }

    /// Number of bytes left to read
    fn remaining(&self) -> usize {
        self.stream.len() - self.idx
    }

    /// Read the current byte as stored
    fn read_unsigned_byte(&mut self) -> Result<u8, MarshalError> {
        let byte = *self
            .stream
            .get(self.idx)
            .ok_or(MarshalError::UnexpectedEndOfInput(self.idx, 1))?;
        self.idx += 1;
        Ok(byte)
    }

    /// Read the current byte as a two's-complement [`i8`]
    fn read_byte(&mut self) -> Result<i8, MarshalError> {
        Ok(i8::from_le_bytes([self.read_unsigned_byte()?]))
    }

    /// Read exactly `n` bytes from the stream
    fn read_exact_bytes(&mut self, n: usize) -> Result<&'a [u8], MarshalError> {
        let stream = self.stream;
        let range = self
            .idx
            .checked_add(n)
            .and_then(|end| stream.get(self.idx..end))
            .ok_or(MarshalError::UnexpectedEndOfInput(self.idx, n))?;
        self.idx += n;
        Ok(range)
    }

    /// Read `n` bytes as UTF-8 text
    fn read_exact_as_str(&mut self, n: usize) -> Result<&'a str, MarshalError> {
        std::str::from_utf8(self.read_exact_bytes(n)?)
            .map_err(|why| MarshalError::InvalidEncoding(EncodingError::Utf8(why)))
    }

    /// Read a packed fixnum.
    ///
    /// The first byte either carries a small value directly or gives the number of
    /// little-endian bytes that follow; its sign is the sign of the result.
    fn read_int(&mut self) -> Result<i64, MarshalError> {
        let code = self.read_byte()?;
        match code {
            0 => Ok(0),
            5..=i8::MAX => Ok(i64::from(code) - 5),
            i8::MIN..=-5 => Ok(i64::from(code) + 5),
            1..=4 => {
                let bytes = self.read_exact_bytes(code.unsigned_abs() as usize)?;
                Ok(bytes
                    .iter()
                    .enumerate()
                    .fold(0, |acc, (i, byte)| acc | (i64::from(*byte) << (8 * i))))
            }
            _ => {
                // Start from all ones and overwrite one byte window at a time
                let bytes = self.read_exact_bytes(code.unsigned_abs() as usize)?;
                Ok(bytes.iter().enumerate().fold(-1, |acc, (i, byte)| {
                    let shift = 8 * i;
                    (acc & !(0xff << shift)) | (i64::from(*byte) << shift)
                }))
            }
        }
    }

    /// Read a packed fixnum that prefixes a length or a count
    fn read_length(&mut self) -> Result<usize, MarshalError> {
        let idx = self.idx;
        let length = self.read_int()?;
        usize::try_from(length).map_err(|_| MarshalError::InvalidLength(length, idx))
    }

    /// Read a symbol spelled out in the stream and remember it for later links
    fn read_symbol(&mut self) -> Result<String, MarshalError> {
        let length = self.read_length()?;
        let symbol = format!(":{}", self.read_exact_as_str(length)?);
        self.symbols.push(symbol.clone());
        Ok(symbol)
    }

    /// Read a reference to a symbol in the table
    fn read_symbol_link(&mut self) -> Result<String, MarshalError> {
        let link = self.read_int()?;
        usize::try_from(link)
            .ok()
            .and_then(|idx| self.symbols.get(idx))
            .cloned()
            .ok_or(MarshalError::InvalidSymbolLink(link, self.symbols.len()))
    }

    /// Read a symbol in a position where nothing else is allowed, i.e. a class name
    fn read_symbol_or_link(&mut self) -> Result<String, MarshalError> {
        let idx = self.idx;
        let byte = self.read_unsigned_byte()?;
        match RubyType::from_byte(byte) {
            Some(RubyType::Symbol) => self.read_symbol(),
            Some(RubyType::SymbolLink) => self.read_symbol_link(),
            _ => Err(MarshalError::UnexpectedType("SYMBOL", byte, idx)),
        }
    }

    /// Read an integer stored as a sign and a run of 16-bit little-endian words
    fn read_bignum(&mut self) -> Result<BigInt, MarshalError> {
        let sign = self.read_unsigned_byte()?;
        let idx = self.idx;
        let words = self.read_length()?;
        let size = words
            .checked_mul(2)
            .ok_or(MarshalError::InvalidLength(words as i64, idx))?;
        let magnitude = BigInt::from_bytes_le(Sign::Plus, self.read_exact_bytes(size)?);

        if sign == SIGN_NEGATIVE {
            return Ok(-magnitude);
        }
        Ok(magnitude)
    }

    /// Read String data
    fn read_string(&mut self) -> Result<String, MarshalError> {
        let length = self.read_length()?;
        Ok(self.read_exact_as_str(length)?.to_string())
    }

    fn read_array(&mut self) -> Result<Vec<Value>, MarshalError> {
        let length = self.read_length()?;
        // Every item takes at least one byte, so a forged length cannot reserve more than the stream
        let mut items = Vec::with_capacity(length.min(self.remaining()));
        for _ in 0..length {
            items.push(self.read_value()?);
        }
        Ok(items)
    }

    fn read_hash(&mut self) -> Result<Vec<(Value, Value)>, MarshalError> {
        let length = self.read_length()?;
        let mut pairs = Vec::with_capacity(length.min(self.remaining() / 2));
        for _ in 0..length {
            let key = self.read_value()?;
            let value = self.read_value()?;
            pairs.push((key, value));
        }
        Ok(pairs)
    }

    /// Read a value followed by its instance variables.
    ///
    /// The instance variables, usually just the string encoding, are read but not kept.
    fn read_ivars(&mut self) -> Result<Value, MarshalError> {
        let value = self.read_value()?;
        let count = self.read_length()?;
        for _ in 0..count {
            self.read_symbol_or_link()?;
            self.read_value()?;
        }
        Ok(value)
    }

    fn read_object(&mut self) -> Result<ObjectWrapper, MarshalError> {
        let class_name = self.read_symbol_or_link()?;
        let mut wrapper =
            ObjectWrapper::new(WrapperKind::Object, Some(WrapperTag::Symbol(class_name)));

        let count = self.read_length()?;
        for _ in 0..count {
            let name = self.read_value()?;
            wrapper.add(name);
            let value = self.read_value()?;
            wrapper.add(value);
        }
        Ok(wrapper)
    }

    /// The payload of a `_dump` is opaque binary data, i.e. for `Time`, so it is not decoded strictly
    fn read_userdef(&mut self) -> Result<ObjectWrapper, MarshalError> {
        let class_name = self.read_symbol_or_link()?;
        let length = self.read_length()?;
        let payload = String::from_utf8_lossy(self.read_exact_bytes(length)?).into_owned();

        let mut wrapper =
            ObjectWrapper::new(WrapperKind::UserDef, Some(WrapperTag::Symbol(class_name)));
        wrapper.add(Value::String(payload));
        Ok(wrapper)
    }

    fn read_usr_marshal(&mut self) -> Result<ObjectWrapper, MarshalError> {
        let class_name = self.read_symbol_or_link()?;
        let value = self.read_value()?;

        let mut wrapper =
            ObjectWrapper::new(WrapperKind::UsrMarshal, Some(WrapperTag::Symbol(class_name)));
        wrapper.add(value);
        Ok(wrapper)
    }

    /// Object links are not resolved; the caller gets the index into the object table
    fn read_link(&mut self) -> Result<ObjectWrapper, MarshalError> {
        let index = self.read_int()?;
        Ok(ObjectWrapper::new(
            WrapperKind::Link,
            Some(WrapperTag::Link(index)),
        ))
    }

    /// Read the next value, including everything nested inside of it
    fn read_value(&mut self) -> Result<Value, MarshalError> {
        if self.depth >= self.max_depth {
            return Err(MarshalError::ExcessiveNesting(self.max_depth));
        }
        self.depth += 1;
        let value = self.read_tagged_value();
        self.depth -= 1;
        value
    }

    fn read_tagged_value(&mut self) -> Result<Value, MarshalError> {
        let idx = self.idx;
        let byte = self.read_unsigned_byte()?;
        let ruby_type =
            RubyType::from_byte(byte).ok_or(MarshalError::UnsupportedType(byte, idx))?;

        match ruby_type {
            RubyType::Nil => Ok(Value::Nil),
            RubyType::True => Ok(Value::Bool(true)),
            RubyType::False => Ok(Value::Bool(false)),
            RubyType::Int => Ok(Value::from(self.read_int()?)),
            RubyType::Bignum => Ok(Value::Integer(self.read_bignum()?)),
            RubyType::String => Ok(Value::String(self.read_string()?)),
            RubyType::Symbol => Ok(Value::Symbol(self.read_symbol()?)),
            RubyType::SymbolLink => Ok(Value::Symbol(self.read_symbol_link()?)),
            RubyType::Array => Ok(Value::Array(self.read_array()?)),
            RubyType::Hash => Ok(Value::Hash(self.read_hash()?)),
            RubyType::Ivars => self.read_ivars(),
            RubyType::Object => Ok(Value::Object(self.read_object()?)),
            RubyType::UserDef => Ok(Value::Object(self.read_userdef()?)),
            RubyType::UsrMarshal => Ok(Value::Object(self.read_usr_marshal()?)),
            // The extending module and the extended object are not read
            RubyType::Extended => Ok(Value::Object(ObjectWrapper::new(
                WrapperKind::Extended,
                None,
            ))),
            RubyType::Link => Ok(Value::Object(self.read_link()?)),
        }
    }

    /// Only version 4.8 has been written by Ruby since 1.8
    pub fn validate_header(&mut self) -> Result<(), MarshalError> {
        let header = self.read_exact_bytes(2)?;
        if header != [MAJOR_VERSION, MINOR_VERSION] {
            return Err(MarshalError::UnsupportedVersion(header[0], header[1]));
        }
        Ok(())
    }

    /// Load the single root value stored in the stream
    ///
    /// Bytes after the root value are ignored, as Ruby does.
    pub fn parse(&mut self) -> Result<Value, MarshalError> {
        self.validate_header()?;
        self.read_value()
    }
}

impl<'a> From<&'a [u8]> for MarshalReader<'a> {
    fn from(stream: &'a [u8]) -> Self {
        Self::new(stream)
    }
}

impl<'a> From<&'a Vec<u8>> for MarshalReader<'a> {
    fn from(stream: &'a Vec<u8>) -> Self {
        Self::new(stream)
    }
}
