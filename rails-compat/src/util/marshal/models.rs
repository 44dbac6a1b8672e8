/*!
 Data structures produced when loading `Marshal` data.
*/

use std::fmt::{Display, Formatter, Result};

use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// Type tags that can begin a value in a `Marshal` stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RubyType {
    Nil,
    True,
    False,
    /// A packed fixnum
    Int,
    /// An integer too wide for a fixnum
    Bignum,
    String,
    /// A newly spelled symbol, appended to the symbol table
    Symbol,
    /// A reference to an already-seen symbol
    SymbolLink,
    Array,
    Hash,
    /// A value followed by instance variables, usually the string encoding
    Ivars,
    /// An instance of a class with instance variables
    Object,
    /// An instance serialized by the class' own `_dump`
    UserDef,
    /// An instance serialized by the class' own `marshal_dump`
    UsrMarshal,
    /// An object extended by a module
    Extended,
    /// A reference to an already-seen object
    Link,
}

impl RubyType {
    /// Get the tag for a type byte, if the byte is part of the format
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x30 => Some(Self::Nil),
            0x54 => Some(Self::True),
            0x46 => Some(Self::False),
            0x69 => Some(Self::Int),
            0x6c => Some(Self::Bignum),
            0x22 => Some(Self::String),
            0x3a => Some(Self::Symbol),
            0x3b => Some(Self::SymbolLink),
            0x5b => Some(Self::Array),
            0x7b => Some(Self::Hash),
            0x49 => Some(Self::Ivars),
            0x6f => Some(Self::Object),
            0x75 => Some(Self::UserDef),
            0x55 => Some(Self::UsrMarshal),
            0x65 => Some(Self::Extended),
            0x40 => Some(Self::Link),
            _ => None,
        }
    }

    /// The byte that marks this type in the stream
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::Nil => b'0',
            Self::True => b'T',
            Self::False => b'F',
            Self::Int => b'i',
            Self::Bignum => b'l',
            Self::String => b'"',
            Self::Symbol => b':',
            Self::SymbolLink => b';',
            Self::Array => b'[',
            Self::Hash => b'{',
            Self::Ivars => b'I',
            Self::Object => b'o',
            Self::UserDef => b'u',
            Self::UsrMarshal => b'U',
            Self::Extended => b'e',
            Self::Link => b'@',
        }
    }
}

impl Display for RubyType {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        let name = match self {
            Self::Nil => "NIL",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Int => "INT",
            Self::Bignum => "BIGNUM",
            Self::String => "STRING",
            Self::Symbol => "SYMBOL",
            Self::SymbolLink => "SYMBOL_LINK",
            Self::Array => "ARRAY",
            Self::Hash => "HASH",
            Self::Ivars => "IVARS",
            Self::Object => "OBJECT",
            Self::UserDef => "USERDEF",
            Self::UsrMarshal => "USR_MARSHAL",
            Self::Extended => "EXTENDED",
            Self::Link => "LINK",
        };
        write!(fmt, "{name}")
    }
}

/// The shapes of Ruby objects that are kept as an [`ObjectWrapper`] instead of being rehydrated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperKind {
    Object,
    UserDef,
    UsrMarshal,
    Extended,
    Link,
}

impl WrapperKind {
    /// The stream type this wrapper was read from
    pub fn ruby_type(&self) -> RubyType {
        match self {
            Self::Object => RubyType::Object,
            Self::UserDef => RubyType::UserDef,
            Self::UsrMarshal => RubyType::UsrMarshal,
            Self::Extended => RubyType::Extended,
            Self::Link => RubyType::Link,
        }
    }
}

impl Display for WrapperKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        write!(fmt, "{}", self.ruby_type())
    }
}

/// Identifies what an [`ObjectWrapper`] refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrapperTag {
    /// The class name, as a symbol with its leading `:`
    Symbol(String),
    /// The raw index into the stream's object table; it is not resolved
    Link(i64),
}

impl Display for WrapperTag {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            WrapperTag::Symbol(symbol) => write!(fmt, "{symbol}"),
            WrapperTag::Link(index) => write!(fmt, "@{index}"),
        }
    }
}

/// A Ruby object graph shape that is preserved structurally
///
/// - [`WrapperKind::Object`]: `children` alternate instance variable name and value
/// - [`WrapperKind::UserDef`]: the single child is the `_dump` payload as a string
/// - [`WrapperKind::UsrMarshal`]: the single child is the `marshal_dump` value
/// - [`WrapperKind::Extended`]: no tag and no children
/// - [`WrapperKind::Link`]: no children, the tag carries the object index
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectWrapper {
    pub kind: WrapperKind,
    pub tag: Option<WrapperTag>,
    pub children: Vec<Value>,
}

impl ObjectWrapper {
    pub(crate) fn new(kind: WrapperKind, tag: Option<WrapperTag>) -> Self {
        Self {
            kind,
            tag,
            children: vec![],
        }
    }

    pub(crate) fn add(&mut self, value: Value) {
        self.children.push(value);
    }

    /// The class name for wrappers that carry one
    pub fn class_name(&self) -> Option<&str> {
        match &self.tag {
            Some(WrapperTag::Symbol(symbol)) => Some(symbol.trim_start_matches(':')),
            _ => None,
        }
    }

    /// The instance variables of an [`WrapperKind::Object`] as name/value pairs
    pub fn fields(&self) -> impl Iterator<Item = (&Value, &Value)> {
        let pairs = match self.kind {
            WrapperKind::Object => self.children.as_slice(),
            _ => &[],
        };
        pairs.chunks_exact(2).map(|pair| (&pair[0], &pair[1]))
    }
}

/// Rust structures containing data stored in the `Marshal` stream
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    /// Fixnums and bignums are both coerced into this container
    Integer(BigInt),
    /// Text data, decoded as UTF-8
    String(String),
    /// A symbol name, including its leading `:`
    Symbol(String),
    Array(Vec<Value>),
    /// Key/value pairs in stream order; duplicate keys are kept
    Hash(Vec<(Value, Value)>),
    Object(ObjectWrapper),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Get the integer, if it fits in an [`i64`]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(number) => number.to_i64(),
            _ => None,
        }
    }

    pub fn as_bigint(&self) -> Option<&BigInt> {
        match self {
            Value::Integer(number) => Some(number),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    /// Get the symbol name without its leading `:`
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(symbol) => Some(symbol.trim_start_matches(':')),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Hash(pairs) => Some(pairs),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectWrapper> {
        match self {
            Value::Object(wrapper) => Some(wrapper),
            _ => None,
        }
    }

    /// Look up a hash entry whose key is a string or symbol spelled `key`
    ///
    /// If the stream repeats a key, the last pair wins, as it would when Ruby builds the hash.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_hash()?
            .iter()
            .rev()
            .find(|(candidate, _)| match candidate {
                Value::String(text) => text == key,
                Value::Symbol(_) => candidate.as_symbol() == Some(key),
                _ => false,
            })
            .map(|(_, value)| value)
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Value::Integer(BigInt::from(number))
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(text.to_string())
    }
}

/// Writes `items` separated by `, `
fn write_joined<T: Display>(fmt: &mut Formatter<'_>, items: impl Iterator<Item = T>) -> Result {
    for (idx, item) in items.enumerate() {
        if idx > 0 {
            write!(fmt, ", ")?;
        }
        write!(fmt, "{item}")?;
    }
    Ok(())
}

struct Pair<'a>(&'a Value, &'a Value);

impl Display for Pair<'_> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        write!(fmt, "{} => {}", self.0, self.1)
    }
}

/// Renders values the way Ruby's `inspect` would, approximately
impl Display for Value {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            Value::Nil => write!(fmt, "nil"),
            Value::Bool(flag) => write!(fmt, "{flag}"),
            Value::Integer(number) => write!(fmt, "{number}"),
            Value::String(text) => write!(fmt, "{text:?}"),
            Value::Symbol(symbol) => write!(fmt, "{symbol}"),
            Value::Array(items) => {
                write!(fmt, "[")?;
                write_joined(fmt, items.iter())?;
                write!(fmt, "]")
            }
            Value::Hash(pairs) => {
                write!(fmt, "{{")?;
                write_joined(fmt, pairs.iter().map(|(key, value)| Pair(key, value)))?;
                write!(fmt, "}}")
            }
            Value::Object(wrapper) => {
                write!(fmt, "#<{}", wrapper.kind)?;
                if let Some(tag) = &wrapper.tag {
                    write!(fmt, " {tag}")?;
                }
                if !wrapper.children.is_empty() {
                    write!(fmt, " ")?;
                    write_joined(fmt, wrapper.children.iter())?;
                }
                write!(fmt, ">")
            }
        }
    }
}
