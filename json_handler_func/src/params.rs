//! Parameter types, per-request slots and the request body decoder.

use std::any::Any;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::{BuildHasher, Hash};

use serde::de::{DeserializeOwned, Error as _};
use serde::Deserialize;
use serde_json::Value;

use crate::exchange::RequestContext;
use crate::shape::{Kind, TypeTag};

/// A type-erased argument on its way into a function call.
pub type Arg = Box<dyn Any + Send>;

pub type SlotFactory = fn() -> ParameterSlot;

type DecodeFn = fn(&Value) -> serde_json::Result<Arg>;
type FinishFn = fn(Arg) -> Arg;

/// A type that can appear as a handler parameter.
///
/// `KIND` feeds the shape validator and `slot` allocates the per-request
/// storage the body decoder writes into. The default slot refuses JSON input,
/// which suits types that only ever arrive through an injector:
///
/// ```
/// use json_handler_func::Param;
///
/// struct DbPool;
/// impl Param for DbPool {}
/// ```
///
/// Types decoded from the request body use [`json_param!`](crate::json_param).
pub trait Param: Send + Sized + 'static {
    const KIND: Kind = Kind::Value;

    fn slot() -> ParameterSlot {
        ParameterSlot::opaque::<Self>()
    }

    fn tag() -> TypeTag {
        TypeTag::of::<Self>(Self::KIND)
    }
}

/// Implements [`Param`] for types decoded from JSON with serde.
///
/// ```
/// use serde::Deserialize;
///
/// #[derive(Deserialize, Default)]
/// struct Address {
///     zipcode: i32,
/// }
///
/// json_handler_func::json_param!(Address);
/// ```
#[macro_export]
macro_rules! json_param {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Param for $ty {
                fn slot() -> $crate::ParameterSlot {
                    $crate::ParameterSlot::json::<Self>()
                }
            }
        )+
    };
}

/// Storage for one parameter of one request.
///
/// Pointer parameters (`Box<T>`) store the pointee and hand the box itself to
/// the call. Every other kind stores the declared type, which is moved out of
/// its box at the call.
pub struct ParameterSlot {
    tag: TypeTag,
    decode: DecodeFn,
    finish: FinishFn,
    storage: Option<Arg>,
}

impl ParameterSlot {
    pub fn json<T: Param + DeserializeOwned>() -> Self {
        Self::with(T::tag(), decode_json::<T>, pass_value)
    }

    pub fn opaque<T: Param>() -> Self {
        Self::with(T::tag(), decode_opaque::<T>, pass_value)
    }

    pub fn pointer<T: Param + Default>() -> Self {
        Self::with(<Box<T>>::tag(), decode_pointee::<T>, pass_pointer::<T>)
    }

    fn with(tag: TypeTag, decode: DecodeFn, finish: FinishFn) -> Self {
        Self {
            tag,
            decode,
            finish,
            storage: None,
        }
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn by_ref(&self) -> bool {
        self.tag.kind() == Kind::Pointer
    }

    pub fn fill(&mut self, value: &Value) -> serde_json::Result<()> {
        self.storage = Some((self.decode)(value)?);
        Ok(())
    }

    /// Converts the filled slot to the calling convention of its parameter.
    pub fn into_arg(self) -> Option<Arg> {
        let finish = self.finish;
        self.storage.map(finish)
    }
}

fn decode_json<T: DeserializeOwned + Send + 'static>(value: &Value) -> serde_json::Result<Arg> {
    Ok(Box::new(<T as Deserialize>::deserialize(value)?))
}

fn decode_opaque<T: Param>(_: &Value) -> serde_json::Result<Arg> {
    Err(serde_json::Error::custom(format!(
        "{} can not be decoded from JSON",
        T::tag().short_name()
    )))
}

// The pointee keeps its zero value when the caller sends null.
fn decode_pointee<T: Param + Default>(value: &Value) -> serde_json::Result<Arg> {
    if value.is_null() {
        return Ok(Box::new(T::default()));
    }
    let mut pointee = T::slot();
    pointee.fill(value)?;
    pointee
        .into_arg()
        .ok_or_else(|| serde_json::Error::custom("pointee slot left empty"))
}

fn pass_value(storage: Arg) -> Arg {
    storage
}

fn pass_pointer<T: Send + 'static>(storage: Arg) -> Arg {
    match storage.downcast::<T>() {
        Ok(pointee) => Box::new(pointee),
        Err(other) => other,
    }
}

/// Arguments decoded from one request body, plus the raw `params` array.
#[derive(Default)]
pub struct DecodedParams {
    pub args: Vec<Arg>,
    pub raw: Vec<Value>,
}

/// Decodes `{"params": [...]}`: element `i` fills slot `i`.
///
/// Surplus elements or missing ones are left for the arity check.
pub fn decode_params(body: &[u8], slots: Vec<ParameterSlot>) -> serde_json::Result<DecodedParams> {
    let params = call_params(serde_json::from_slice(body)?)?;
    let mut args = Vec::with_capacity(slots.len());
    for (position, (mut slot, value)) in slots.into_iter().zip(&params).enumerate() {
        slot.fill(value).map_err(|err| {
            serde_json::Error::custom(format!("params[{position}] ({}): {err}", slot.tag().short_name()))
        })?;
        args.extend(slot.into_arg());
    }
    Ok(DecodedParams { args, raw: params })
}

// The body must be an object; a missing `params` field means no arguments.
fn call_params(body: Value) -> serde_json::Result<Vec<Value>> {
    let Value::Object(mut fields) = body else {
        return Err(serde_json::Error::custom(
            "request body must be an object with a `params` array",
        ));
    };
    match fields.remove("params") {
        None => Ok(Vec::new()),
        Some(Value::Array(params)) => Ok(params),
        Some(other) => Err(serde_json::Error::custom(format!(
            "`params` must be an array, found {other}"
        ))),
    }
}

macro_rules! json_params {
    ($kind:ident: $($ty:ty),+ $(,)?) => {
        $(
            impl Param for $ty {
                const KIND: Kind = Kind::$kind;

                fn slot() -> ParameterSlot {
                    ParameterSlot::json::<Self>()
                }
            }
        )+
    };
}

json_params!(Value:
    bool, char, String, serde_json::Value,
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64,
);

impl<T: DeserializeOwned + Send + 'static> Param for Option<T> {
    fn slot() -> ParameterSlot {
        ParameterSlot::json::<Self>()
    }
}

impl<T: DeserializeOwned + Send + 'static> Param for Vec<T> {
    const KIND: Kind = Kind::Sequence;

    fn slot() -> ParameterSlot {
        ParameterSlot::json::<Self>()
    }
}

impl<T: DeserializeOwned + Send + 'static> Param for VecDeque<T> {
    const KIND: Kind = Kind::Sequence;

    fn slot() -> ParameterSlot {
        ParameterSlot::json::<Self>()
    }
}

impl<K, V, S> Param for HashMap<K, V, S>
where
    K: DeserializeOwned + Eq + Hash + Send + 'static,
    V: DeserializeOwned + Send + 'static,
    S: BuildHasher + Default + Send + 'static,
{
    const KIND: Kind = Kind::Map;

    fn slot() -> ParameterSlot {
        ParameterSlot::json::<Self>()
    }
}

impl<K, V> Param for BTreeMap<K, V>
where
    K: DeserializeOwned + Ord + Send + 'static,
    V: DeserializeOwned + Send + 'static,
{
    const KIND: Kind = Kind::Map;

    fn slot() -> ParameterSlot {
        ParameterSlot::json::<Self>()
    }
}

impl<T, const N: usize> Param for [T; N]
where
    T: Send + 'static,
    [T; N]: DeserializeOwned,
{
    const KIND: Kind = Kind::Array;

    fn slot() -> ParameterSlot {
        ParameterSlot::json::<Self>()
    }
}

impl<T: Param + Default> Param for Box<T> {
    const KIND: Kind = Kind::Pointer;

    fn slot() -> ParameterSlot {
        ParameterSlot::pointer::<T>()
    }
}

impl Param for RequestContext {
    const KIND: Kind = Kind::Context;
}

macro_rules! channel_params {
    ($($ty:ident)::+ <T>, $($rest:tt)*) => {
        impl<T: Send + 'static> Param for $($ty)::+<T> {
            const KIND: Kind = Kind::Channel;
        }
        channel_params!($($rest)*);
    };
    () => {};
}

channel_params!(
    std::sync::mpsc::Sender<T>,
    std::sync::mpsc::SyncSender<T>,
    std::sync::mpsc::Receiver<T>,
    tokio::sync::mpsc::Sender<T>,
    tokio::sync::mpsc::Receiver<T>,
    tokio::sync::mpsc::UnboundedSender<T>,
    tokio::sync::mpsc::UnboundedReceiver<T>,
    tokio::sync::oneshot::Sender<T>,
    tokio::sync::oneshot::Receiver<T>,
);
