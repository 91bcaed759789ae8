//! Target functions: their descriptors, argument assembly and invocation.

use std::any::type_name;
use std::marker::PhantomData;

use serde::Serialize;
use serde_json::Value;

use crate::error::HandlerError;
use crate::failure::{BoxFailure, Failure};
use crate::params::{Arg, DecodedParams, Param, SlotFactory};
use crate::shape::{FunctionDescriptor, Kind, TypeTag};

/// The success side of a function's `Result`: `()`, one value or a tuple.
///
/// Each value is `Param + Serialize + Default`. A type that is only ever
/// returned needs no `Deserialize`; an empty `impl Param for T {}` will do.
/// The `Param` bound keeps the single-value impl apart from the `()` and
/// tuple impls.
pub trait Results: Sized + 'static {
    fn tags() -> Vec<TypeTag>;

    fn encode(self) -> serde_json::Result<Vec<Value>>;

    /// Zero-valued placeholders reported alongside a failure.
    fn zero() -> serde_json::Result<Vec<Value>>;
}

impl Results for () {
    fn tags() -> Vec<TypeTag> {
        Vec::new()
    }

    fn encode(self) -> serde_json::Result<Vec<Value>> {
        Ok(Vec::new())
    }

    fn zero() -> serde_json::Result<Vec<Value>> {
        Ok(Vec::new())
    }
}

impl<T: Param + Serialize + Default> Results for T {
    fn tags() -> Vec<TypeTag> {
        vec![T::tag()]
    }

    fn encode(self) -> serde_json::Result<Vec<Value>> {
        Ok(vec![serde_json::to_value(self)?])
    }

    fn zero() -> serde_json::Result<Vec<Value>> {
        T::default().encode()
    }
}

macro_rules! impl_results_tuple {
    ($($T:ident),+) => {
        impl<$($T: Param + Serialize + Default),+> Results for ($($T,)+) {
            fn tags() -> Vec<TypeTag> {
                vec![$($T::tag()),+]
            }

            #[allow(non_snake_case)]
            fn encode(self) -> serde_json::Result<Vec<Value>> {
                let ($($T,)+) = self;
                Ok(vec![$(serde_json::to_value($T)?),+])
            }

            fn zero() -> serde_json::Result<Vec<Value>> {
                <Self as Default>::default().encode()
            }
        }
    };
}

impl_results_tuple!(R1);
impl_results_tuple!(R1, R2);
impl_results_tuple!(R1, R2, R3);
impl_results_tuple!(R1, R2, R3, R4);
impl_results_tuple!(R1, R2, R3, R4, R5);
impl_results_tuple!(R1, R2, R3, R4, R5, R6);

/// What a call produced: the encoded normal results and the outcome.
pub struct Returns {
    pub values: Vec<Value>,
    pub failure: Option<BoxFailure>,
}

impl Returns {
    /// On `Err` the normal results are zero placeholders.
    pub fn from_result<R: Results, E: Failure>(result: Result<R, E>) -> Result<Self, HandlerError> {
        match result {
            Ok(values) => Ok(Self {
                values: values.encode().map_err(HandlerError::Encode)?,
                failure: None,
            }),
            Err(err) => Ok(Self {
                values: R::zero().map_err(HandlerError::Encode)?,
                failure: Some(Box::new(err)),
            }),
        }
    }
}

/// A function that can sit behind a [`JsonHandler`](crate::JsonHandler).
///
/// Implemented for every `Fn(A1, .., An) -> Result<R, E>` with up to eight
/// [`Param`] arguments, [`Results`] `R` and [`Failure`] `E`. `Args` is the
/// argument tuple and only disambiguates the implementations.
pub trait Target<Args>: Send + Sync + 'static {
    fn descriptor(&self) -> FunctionDescriptor;

    fn slots(&self) -> Vec<SlotFactory>;

    fn zero_results(&self) -> serde_json::Result<Vec<Value>>;

    fn call(&self, args: Vec<Arg>) -> Result<Returns, HandlerError>;
}

fn take<T: Param>(arg: Option<Arg>, position: usize) -> Result<T, HandlerError> {
    arg.and_then(|arg| arg.downcast::<T>().ok())
        .map(|value| *value)
        .ok_or(HandlerError::ArgumentType {
            position,
            expected: type_name::<T>(),
        })
}

macro_rules! impl_target {
    ($($A:ident),*) => {
        impl<F, R, E, $($A,)*> Target<($($A,)*)> for F
        where
            F: Fn($($A),*) -> Result<R, E> + Send + Sync + 'static,
            R: Results,
            E: Failure,
            $($A: Param,)*
        {
            fn descriptor(&self) -> FunctionDescriptor {
                let mut results = R::tags();
                results.push(TypeTag::of::<E>(Kind::Failure));
                FunctionDescriptor::new(type_name::<F>(), vec![$($A::tag()),*], results)
            }

            fn slots(&self) -> Vec<SlotFactory> {
                vec![$($A::slot as SlotFactory),*]
            }

            fn zero_results(&self) -> serde_json::Result<Vec<Value>> {
                R::zero()
            }

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn call(&self, args: Vec<Arg>) -> Result<Returns, HandlerError> {
                let mut args = args.into_iter();
                let mut position = 0;
                $(
                    let $A = take::<$A>(args.next(), position)?;
                    position += 1;
                )*
                Returns::from_result((self)($($A),*))
            }
        }
    };
}

impl_target!();
impl_target!(A1);
impl_target!(A1, A2);
impl_target!(A1, A2, A3);
impl_target!(A1, A2, A3, A4);
impl_target!(A1, A2, A3, A4, A5);
impl_target!(A1, A2, A3, A4, A5, A6);
impl_target!(A1, A2, A3, A4, A5, A6, A7);
impl_target!(A1, A2, A3, A4, A5, A6, A7, A8);

/// Object-safe view of a [`Target`], with its argument tuple erased.
pub(crate) trait Invoke: Send + Sync {
    fn zero(&self) -> serde_json::Result<Vec<Value>>;

    fn invoke(&self, args: Vec<Arg>) -> Result<Returns, HandlerError>;
}

pub(crate) struct Bound<F, Args> {
    target: F,
    _args: PhantomData<fn() -> Args>,
}

impl<F, Args> Bound<F, Args> {
    pub(crate) fn new(target: F) -> Self {
        Self {
            target,
            _args: PhantomData,
        }
    }
}

impl<F, Args> Invoke for Bound<F, Args>
where
    F: Target<Args>,
    Args: 'static,
{
    fn zero(&self) -> serde_json::Result<Vec<Value>> {
        self.target.zero_results()
    }

    fn invoke(&self, args: Vec<Arg>) -> Result<Returns, HandlerError> {
        self.target.call(args)
    }
}

/// Concatenates the injected prefix with the decoded parameters.
///
/// The supplied count is the injected prefix plus the length of the posted
/// `params` array, so both short and long arrays are rejected.
pub(crate) fn assemble(
    prefix: Vec<Arg>,
    decoded: DecodedParams,
    required: usize,
) -> Result<Vec<Arg>, HandlerError> {
    let supplied = prefix.len() + decoded.raw.len();
    if supplied != required {
        return Err(HandlerError::Arity {
            required,
            supplied,
            params: Value::Array(decoded.raw),
        });
    }
    let mut args = prefix;
    args.extend(decoded.args);
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::ErrorMessage;
    use serde_json::json;

    fn greet(name: String, gender: i32) -> Result<String, ErrorMessage> {
        match gender {
            1 => Ok(format!("Hi, Mr. {name}")),
            2 => Ok(format!("Hi, Mrs. {name}")),
            _ => Err(ErrorMessage::new("Sorry, I don't know about your gender.")),
        }
    }

    fn args(values: Vec<Arg>) -> Vec<Arg> {
        values
    }

    #[test]
    fn describes_parameters_and_results() {
        let descriptor = Target::descriptor(&greet);
        assert_eq!(descriptor.params().len(), 2);
        assert_eq!(descriptor.results().len(), 2);
        assert_eq!(descriptor.results()[1].kind(), Kind::Failure);
        assert_eq!(descriptor.to_string(), "fn(String, i32) -> (String, ErrorMessage)");
        assert_eq!(Target::slots(&greet).len(), 2);
    }

    #[test]
    fn calls_with_erased_arguments() {
        let returns = Target::call(
            &greet,
            args(vec![Box::new("Gates".to_string()), Box::new(1i32)]),
        )
        .unwrap();
        assert_eq!(returns.values, vec![json!("Hi, Mr. Gates")]);
        assert!(returns.failure.is_none());
    }

    #[test]
    fn failure_comes_with_zero_results() {
        let returns = Target::call(
            &greet,
            args(vec![Box::new("Gates".to_string()), Box::new(3i32)]),
        )
        .unwrap();
        assert_eq!(returns.values, vec![json!("")]);
        assert_eq!(
            returns.failure.unwrap().to_string(),
            "Sorry, I don't know about your gender."
        );
    }

    #[test]
    fn wrong_argument_type_is_reported() {
        let err = Target::call(&greet, args(vec![Box::new(1i32), Box::new(1i32)]))
            .err()
            .unwrap();
        assert!(matches!(err, HandlerError::ArgumentType { position: 0, .. }));
    }

    #[test]
    fn tuple_and_unit_results() {
        let pair = |a: i32| -> Result<(i32, String), ErrorMessage> { Ok((a, a.to_string())) };
        let returns = Target::call(&pair, args(vec![Box::new(7i32)])).unwrap();
        assert_eq!(returns.values, vec![json!(7), json!("7")]);
        assert_eq!(Target::zero_results(&pair).unwrap(), vec![json!(0), json!("")]);

        let unit = || -> Result<(), ErrorMessage> { Ok(()) };
        let returns = Target::call(&unit, Vec::new()).unwrap();
        assert!(returns.values.is_empty());
        assert_eq!(Target::descriptor(&unit).results().len(), 1);
    }

    #[derive(Debug, Default, Serialize)]
    struct Summary {
        total: i32,
    }

    impl Param for Summary {}

    #[test]
    fn output_only_types_need_no_deserialize() {
        let sum = |a: i32, b: i32| -> Result<Summary, ErrorMessage> { Ok(Summary { total: a + b }) };
        let returns = Target::call(&sum, args(vec![Box::new(2i32), Box::new(3i32)])).unwrap();
        assert_eq!(returns.values, vec![json!({"total": 5})]);
        assert_eq!(Target::zero_results(&sum).unwrap(), vec![json!({"total": 0})]);
    }

    #[test]
    fn arity_counts_the_posted_array() {
        let decoded = DecodedParams {
            args: vec![Box::new(vec!["Felix".to_string()])],
            raw: vec![json!(["Felix"])],
        };
        let err = assemble(Vec::new(), decoded, 4).err().unwrap();
        assert_eq!(
            err.to_string(),
            r#"require 4 parameters, but only passed in 1 parameters: [["Felix"]]"#
        );

        let decoded = DecodedParams {
            args: vec![Box::new("X".to_string())],
            raw: vec![json!("X")],
        };
        let args = assemble(vec![Box::new(20i32), Box::new("100".to_string())], decoded, 3).unwrap();
        assert_eq!(args.len(), 3);
    }
}
