//! Call-shape descriptions and the construction-time shape validator.
//!
//! A [`FunctionDescriptor`] lists the ordered parameter and return types of a
//! target or injector as [`TypeTag`]s. It is built once, when the handler is
//! constructed, and only read afterwards.

use std::any::{type_name, TypeId};
use std::fmt;

use axum::http::request::Parts;

use crate::error::{Result, SetupError};
use crate::exchange::ResponseSink;

/// The shape class of a parameter or return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Plain values: scalars, strings, structs, `Option`.
    Value,
    /// `Box<T>`; the per-request slot holds the pointee.
    Pointer,
    Sequence,
    Map,
    Array,
    /// A channel endpoint. Never allowed in a handler signature.
    Channel,
    /// The ambient [`RequestContext`](crate::RequestContext).
    Context,
    /// The response sink and request parts handed to injectors.
    Exchange,
    /// The error side of a function's `Result`.
    Failure,
}

/// Runtime description of one type in a call shape.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
    kind: Kind,
}

impl TypeTag {
    pub fn of<T: 'static + ?Sized>(kind: Kind) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, as reported by the compiler.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Type name with module paths stripped, e.g. `Vec<String>`.
    pub fn short_name(&self) -> String {
        short_type_name(self.name)
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.short_name(), self.kind)
    }
}

/// Ordered parameter and return types of a function.
///
/// The last entry of `results` is the outcome indicator.
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    name: &'static str,
    params: Vec<TypeTag>,
    results: Vec<TypeTag>,
}

impl FunctionDescriptor {
    pub fn new(name: &'static str, params: Vec<TypeTag>, results: Vec<TypeTag>) -> Self {
        Self {
            name,
            params,
            results,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &[TypeTag] {
        &self.params
    }

    pub fn results(&self) -> &[TypeTag] {
        &self.results
    }

    /// Every return type except the trailing outcome indicator.
    pub fn normal_results(&self) -> &[TypeTag] {
        match self.results.split_last() {
            Some((_, normal)) => normal,
            None => &[],
        }
    }

    pub fn takes_context_first(&self) -> bool {
        self.params
            .first()
            .is_some_and(|tag| tag.kind == Kind::Context)
    }
}

impl fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn({}) -> ", join_names(&self.params))?;
        match self.results.as_slice() {
            [single] => write!(f, "{}", single.short_name()),
            results => write!(f, "({})", join_names(results)),
        }
    }
}

/// Comma separated short names, as used in setup error messages.
pub(crate) fn join_names(tags: &[TypeTag]) -> String {
    tags.iter()
        .map(TypeTag::short_name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Checks the rules every handler function has to satisfy: the last return
/// value is a failure type and no parameter or return value is a channel.
pub fn validate_target(descriptor: &FunctionDescriptor) -> Result<()> {
    match descriptor.results.last() {
        Some(tag) if tag.kind == Kind::Failure => {}
        last => {
            return Err(SetupError::MissingFailure {
                function: descriptor.to_string(),
                found: last.map_or_else(|| "nothing".to_string(), TypeTag::short_name),
            })
        }
    }

    let positions = descriptor
        .params
        .iter()
        .enumerate()
        .map(|(i, tag)| (format!("argument {}", i + 1), tag))
        .chain(
            descriptor
                .results
                .iter()
                .enumerate()
                .map(|(i, tag)| (format!("return value {}", i + 1), tag)),
        );
    for (position, tag) in positions {
        if tag.kind == Kind::Channel {
            return Err(SetupError::ChannelType {
                function: descriptor.to_string(),
                position,
                type_name: tag.short_name(),
            });
        }
    }
    Ok(())
}

/// [`validate_target`] plus the injector contract: the only accepted inputs are the
/// response sink and the request parts, in that order.
pub fn validate_injector(descriptor: &FunctionDescriptor) -> Result<()> {
    validate_target(descriptor)?;
    let exchange = [
        TypeTag::of::<ResponseSink>(Kind::Exchange),
        TypeTag::of::<Parts>(Kind::Exchange),
    ];
    if descriptor.params != exchange {
        return Err(SetupError::InjectorParams {
            function: descriptor.to_string(),
            found: join_names(&descriptor.params),
        });
    }
    Ok(())
}

fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    let mut chars = full.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(segment_start);
            continue;
        }
        out.push(c);
        if !(c.is_alphanumeric() || c == '_') {
            segment_start = out.len();
        }
    }
    out
}
