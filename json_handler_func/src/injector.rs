//! Argument injectors and the chain that runs them before the target.

use std::any::type_name;
use std::convert::Infallible;
use std::marker::PhantomData;
use std::sync::Arc;

use axum::http::request::Parts;
use serde_json::Value;

use crate::error::{HandlerError, Result, SetupError};
use crate::exchange::{RequestContext, ResponseSink};
use crate::failure::{BoxFailure, Failure};
use crate::params::{Arg, Param};
use crate::shape::{self, join_names, FunctionDescriptor, Kind, TypeTag};
use crate::target::{Results, Returns};

/// Values an injector hands to the target: `()`, one value or a tuple.
pub trait Produced: Send + Sized + 'static {
    fn tags() -> Vec<TypeTag>;

    fn into_args(self) -> Vec<Arg>;
}

impl Produced for () {
    fn tags() -> Vec<TypeTag> {
        Vec::new()
    }

    fn into_args(self) -> Vec<Arg> {
        Vec::new()
    }
}

impl<T: Param> Produced for T {
    fn tags() -> Vec<TypeTag> {
        vec![T::tag()]
    }

    fn into_args(self) -> Vec<Arg> {
        vec![Box::new(self)]
    }
}

macro_rules! impl_produced_tuple {
    ($($T:ident),+) => {
        impl<$($T: Param),+> Produced for ($($T,)+) {
            fn tags() -> Vec<TypeTag> {
                vec![$($T::tag()),+]
            }

            #[allow(non_snake_case)]
            fn into_args(self) -> Vec<Arg> {
                let ($($T,)+) = self;
                vec![$(Box::new($T) as Arg),+]
            }
        }
    };
}

impl_produced_tuple!(P1);
impl_produced_tuple!(P1, P2);
impl_produced_tuple!(P1, P2, P3);
impl_produced_tuple!(P1, P2, P3, P4);
impl_produced_tuple!(P1, P2, P3, P4, P5);
impl_produced_tuple!(P1, P2, P3, P4, P5, P6);

/// An injector with its produced types erased.
///
/// Function injectors get this through [`IntoInjector`]; hand-written
/// implementations are validated the same way when registered.
pub trait Inject: Send + Sync + 'static {
    fn descriptor(&self) -> FunctionDescriptor;

    fn inject(&self, sink: &mut ResponseSink, parts: &Parts) -> std::result::Result<Vec<Arg>, BoxFailure>;
}

/// Conversion of `Fn(&mut ResponseSink, &Parts) -> Result<O, E>` into an [`Inject`].
pub trait IntoInjector<T> {
    fn into_injector(self) -> Arc<dyn Inject>;
}

impl<F, O, E> IntoInjector<(O, E)> for F
where
    F: Fn(&mut ResponseSink, &Parts) -> std::result::Result<O, E> + Send + Sync + 'static,
    O: Produced,
    E: Failure,
{
    fn into_injector(self) -> Arc<dyn Inject> {
        Arc::new(InjectorFn::<F, O, E>::new(self))
    }
}

pub(crate) struct InjectorFn<F, O, E> {
    f: F,
    _marker: PhantomData<fn() -> (O, E)>,
}

impl<F, O, E> InjectorFn<F, O, E> {
    pub(crate) fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

fn exchange_tags() -> Vec<TypeTag> {
    vec![
        TypeTag::of::<ResponseSink>(Kind::Exchange),
        TypeTag::of::<Parts>(Kind::Exchange),
    ]
}

fn injector_descriptor<F, O: Produced, E: 'static>() -> FunctionDescriptor {
    let mut results = O::tags();
    results.push(TypeTag::of::<E>(Kind::Failure));
    FunctionDescriptor::new(type_name::<F>(), exchange_tags(), results)
}

impl<F, O, E> Inject for InjectorFn<F, O, E>
where
    F: Fn(&mut ResponseSink, &Parts) -> std::result::Result<O, E> + Send + Sync + 'static,
    O: Produced,
    E: Failure,
{
    fn descriptor(&self) -> FunctionDescriptor {
        injector_descriptor::<F, O, E>()
    }

    fn inject(&self, sink: &mut ResponseSink, parts: &Parts) -> std::result::Result<Vec<Arg>, BoxFailure> {
        match (self.f)(sink, parts) {
            Ok(produced) => Ok(produced.into_args()),
            Err(err) => Err(Box::new(err)),
        }
    }
}

/// An injector serving as its own target: its outputs are the results.
pub(crate) trait Standalone: Send + Sync {
    fn descriptor(&self) -> FunctionDescriptor;

    fn zero(&self) -> serde_json::Result<Vec<Value>>;

    fn run(&self, sink: &mut ResponseSink, parts: &Parts) -> std::result::Result<Returns, HandlerError>;
}

impl<F, O, E> Standalone for InjectorFn<F, O, E>
where
    F: Fn(&mut ResponseSink, &Parts) -> std::result::Result<O, E> + Send + Sync + 'static,
    O: Produced + Results,
    E: Failure,
{
    fn descriptor(&self) -> FunctionDescriptor {
        injector_descriptor::<F, O, E>()
    }

    fn zero(&self) -> serde_json::Result<Vec<Value>> {
        O::zero()
    }

    fn run(&self, sink: &mut ResponseSink, parts: &Parts) -> std::result::Result<Returns, HandlerError> {
        Returns::from_result((self.f)(sink, parts))
    }
}

/// Hands the request's ambient context to a target taking it first.
pub(crate) struct ContextInjector;

impl Inject for ContextInjector {
    fn descriptor(&self) -> FunctionDescriptor {
        FunctionDescriptor::new(
            "context",
            exchange_tags(),
            vec![RequestContext::tag(), TypeTag::of::<Infallible>(Kind::Failure)],
        )
    }

    fn inject(&self, _sink: &mut ResponseSink, parts: &Parts) -> std::result::Result<Vec<Arg>, BoxFailure> {
        Ok(vec![Box::new(RequestContext::from_parts(parts))])
    }
}

/// Injectors in declaration order, validated at construction.
pub(crate) struct InjectorChain {
    injectors: Vec<Arc<dyn Inject>>,
    produced: Vec<TypeTag>,
}

impl InjectorChain {
    pub(crate) fn new(injectors: Vec<Arc<dyn Inject>>) -> Result<Self> {
        let mut produced = Vec::new();
        for injector in &injectors {
            let descriptor = injector.descriptor();
            shape::validate_injector(&descriptor)?;
            produced.extend_from_slice(descriptor.normal_results());
        }
        Ok(Self {
            injectors,
            produced,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.injectors.len()
    }

    /// Number of leading target arguments the chain supplies.
    pub(crate) fn produced_len(&self) -> usize {
        self.produced.len()
    }

    /// The produced types must match the target's leading parameters.
    pub(crate) fn check_compatible(&self, target: &FunctionDescriptor) -> Result<()> {
        if target.params().get(..self.produced.len()) != Some(self.produced.as_slice()) {
            return Err(SetupError::InjectorMismatch {
                target: target.to_string(),
                expected: join_names(target.params()),
                injected: join_names(&self.produced),
            });
        }
        Ok(())
    }

    /// Runs every injector; the first failure stops the chain.
    pub(crate) fn run(
        &self,
        sink: &mut ResponseSink,
        parts: &Parts,
    ) -> std::result::Result<Vec<Arg>, BoxFailure> {
        let mut prefix = Vec::with_capacity(self.produced.len());
        for injector in &self.injectors {
            prefix.extend(injector.inject(sink, parts)?);
        }
        Ok(prefix)
    }
}

impl Failure for Infallible {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{with_status, ErrorMessage};
    use crate::target::Target;
    use axum::http::{Request, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn parts() -> Parts {
        Request::builder().body(()).unwrap().into_parts().0
    }

    fn cart_id(_: &mut ResponseSink, _: &Parts) -> std::result::Result<i32, ErrorMessage> {
        Ok(20)
    }

    fn user_id(_: &mut ResponseSink, _: &Parts) -> std::result::Result<String, ErrorMessage> {
        Ok("100".to_string())
    }

    fn hello(cart: i32, user: String, name: String) -> std::result::Result<String, ErrorMessage> {
        Ok(format!("{cart} {user} {name}"))
    }

    #[test]
    fn chain_concatenates_in_order() {
        let chain = InjectorChain::new(vec![cart_id.into_injector(), user_id.into_injector()]).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.produced_len(), 2);
        chain.check_compatible(&Target::descriptor(&hello)).unwrap();

        let prefix = chain.run(&mut ResponseSink::default(), &parts()).unwrap();
        let mut prefix = prefix.into_iter();
        assert_eq!(*prefix.next().unwrap().downcast::<i32>().unwrap(), 20);
        assert_eq!(*prefix.next().unwrap().downcast::<String>().unwrap(), "100");
    }

    #[test]
    fn mismatch_names_both_type_lists() {
        let inj = |_: &mut ResponseSink, _: &Parts| -> std::result::Result<(f64, String), ErrorMessage> {
            Ok((1.0, String::new()))
        };
        let target = |_a: String, _b: String, _c: String| -> std::result::Result<(), ErrorMessage> { Ok(()) };
        let chain = InjectorChain::new(vec![inj.into_injector()]).unwrap();
        let err = chain.check_compatible(&Target::descriptor(&target)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "fn(String, String, String) -> ErrorMessage params type is [String, String, String], but injecting [f64, String]"
        );
    }

    #[test]
    fn injecting_more_than_the_target_takes_is_rejected() {
        let chain = InjectorChain::new(vec![cart_id.into_injector(), user_id.into_injector()]).unwrap();
        let target = |_a: i32| -> std::result::Result<(), ErrorMessage> { Ok(()) };
        assert!(chain.check_compatible(&Target::descriptor(&target)).is_err());
    }

    #[test]
    fn first_failure_short_circuits() {
        static LATER: AtomicUsize = AtomicUsize::new(0);
        let deny = |_: &mut ResponseSink, _: &Parts| -> std::result::Result<i32, _> {
            Err(with_status(StatusCode::FORBIDDEN, ErrorMessage::new("you can't access it")))
        };
        let later = |_: &mut ResponseSink, _: &Parts| -> std::result::Result<String, ErrorMessage> {
            LATER.fetch_add(1, Ordering::SeqCst);
            Ok(String::new())
        };
        let chain = InjectorChain::new(vec![deny.into_injector(), later.into_injector()]).unwrap();
        let failure = chain.run(&mut ResponseSink::default(), &parts()).err().unwrap();
        assert_eq!(failure.status_code(), Some(StatusCode::FORBIDDEN));
        assert_eq!(LATER.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn context_injector_forwards_extensions() {
        let mut parts = parts();
        parts.extensions.insert("123".to_string());
        let args = ContextInjector.inject(&mut ResponseSink::default(), &parts).unwrap();
        let context = args.into_iter().next().unwrap().downcast::<RequestContext>().unwrap();
        assert_eq!(context.get::<String>().map(String::as_str), Some("123"));
        shape::validate_injector(&ContextInjector.descriptor()).unwrap();
    }

    #[test]
    fn standalone_returns_its_own_outputs() {
        let injector = InjectorFn::<_, i32, ErrorMessage>::new(cart_id);
        let returns = Standalone::run(&injector, &mut ResponseSink::default(), &parts()).unwrap();
        assert_eq!(returns.values, vec![serde_json::json!(20)]);
        assert!(returns.failure.is_none());
    }
}
