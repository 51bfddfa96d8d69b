use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use spec_core::{CodeLocation, ConfigError, FunctionKind, NodeResult, SpecContext};

use crate::params::{Param, ParamType, Rest, TableParam, bind, bind_rest};

/// Parameter list of a table function, computed once from its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<ParamType>,
    variadic: Option<ParamType>,
    context: bool,
}

impl Signature {
    pub fn new(params: Vec<ParamType>, variadic: Option<ParamType>, context: bool) -> Self {
        Self {
            params,
            variadic,
            context,
        }
    }

    /// Positional parameters, excluding a leading context and a trailing variadic.
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    pub fn variadic(&self) -> Option<ParamType> {
        self.variadic
    }

    /// Returns `true` when the function takes a leading [`SpecContext`].
    pub fn takes_context(&self) -> bool {
        self.context
    }

    /// Check an entry's arguments against this signature.
    pub fn validate(
        &self,
        args: &[Param],
        kind: FunctionKind,
        location: &CodeLocation,
    ) -> Result<(), ConfigError> {
        let expected = self.params.len();
        if args.len() < expected {
            return Err(ConfigError::TooFewParameters {
                expected,
                actual: args.len(),
                kind,
                location: location.clone(),
            });
        }
        if args.len() > expected && self.variadic.is_none() {
            return Err(ConfigError::TooManyParameters {
                expected,
                actual: args.len(),
                kind,
                location: location.clone(),
            });
        }

        for (index, (param, arg)) in self.params.iter().zip(args).enumerate() {
            if !param.accepts(arg) {
                return Err(ConfigError::IncorrectParameterType {
                    position: index + 1,
                    expected: param.name(),
                    actual: arg.type_name(),
                    kind,
                    location: location.clone(),
                });
            }
        }

        if let Some(variadic) = self.variadic {
            if let Some(arg) = args[expected..].iter().find(|arg| !variadic.accepts(arg)) {
                return Err(ConfigError::IncorrectVariadicParameterType {
                    expected: variadic.name(),
                    actual: arg.type_name(),
                    kind,
                    location: location.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Marker for functions taking only positional parameters.
pub struct Plain<Args>(PhantomData<Args>);
/// Marker for functions taking a leading [`SpecContext`].
pub struct Ctx<Args>(PhantomData<Args>);
/// Marker for functions ending in a [`Rest`] parameter.
pub struct Var<Args, T>(PhantomData<(Args, T)>);
/// Marker for functions taking a leading context and a trailing [`Rest`].
pub struct CtxVar<Args, T>(PhantomData<(Args, T)>);

/// Functions usable as a table body (`Out = NodeResult`) or naming function
/// (`Out = String`).
///
/// Implemented for closures of up to six [`TableParam`] parameters, optionally
/// preceded by a [`SpecContext`] and optionally followed by a [`Rest`].
/// `Marker` only disambiguates those shapes and is always inferred.
pub trait TableFunction<Marker, Out>: Send + Sync + 'static {
    fn signature() -> Signature;

    /// Invoke with already-validated arguments.
    fn call(&self, ctx: Option<&SpecContext>, args: &[Param]) -> Out;
}

macro_rules! impl_table_function {
    ($count:expr; $($ty:ident => $idx:tt),*) => {
        impl<F, Out, $($ty,)*> TableFunction<Plain<($($ty,)*)>, Out> for F
        where
            F: Fn($($ty),*) -> Out + Send + Sync + 'static,
            $($ty: TableParam,)*
        {
            fn signature() -> Signature {
                Signature::new(vec![$(ParamType::of::<$ty>()),*], None, false)
            }

            #[allow(unused_variables)]
            fn call(&self, _ctx: Option<&SpecContext>, args: &[Param]) -> Out {
                (self)($(bind::<$ty>(args, $idx)),*)
            }
        }

        impl<F, Out, $($ty,)*> TableFunction<Ctx<($($ty,)*)>, Out> for F
        where
            F: Fn(SpecContext $(, $ty)*) -> Out + Send + Sync + 'static,
            $($ty: TableParam,)*
        {
            fn signature() -> Signature {
                Signature::new(vec![$(ParamType::of::<$ty>()),*], None, true)
            }

            #[allow(unused_variables)]
            fn call(&self, ctx: Option<&SpecContext>, args: &[Param]) -> Out {
                (self)(ctx.cloned().unwrap_or_default() $(, bind::<$ty>(args, $idx))*)
            }
        }

        impl<F, Out, V, $($ty,)*> TableFunction<Var<($($ty,)*), V>, Out> for F
        where
            F: Fn($($ty,)* Rest<V>) -> Out + Send + Sync + 'static,
            V: TableParam,
            $($ty: TableParam,)*
        {
            fn signature() -> Signature {
                Signature::new(
                    vec![$(ParamType::of::<$ty>()),*],
                    Some(ParamType::of::<V>()),
                    false,
                )
            }

            fn call(&self, _ctx: Option<&SpecContext>, args: &[Param]) -> Out {
                (self)($(bind::<$ty>(args, $idx),)* bind_rest::<V>(args, $count))
            }
        }

        impl<F, Out, V, $($ty,)*> TableFunction<CtxVar<($($ty,)*), V>, Out> for F
        where
            F: Fn(SpecContext, $($ty,)* Rest<V>) -> Out + Send + Sync + 'static,
            V: TableParam,
            $($ty: TableParam,)*
        {
            fn signature() -> Signature {
                Signature::new(
                    vec![$(ParamType::of::<$ty>()),*],
                    Some(ParamType::of::<V>()),
                    true,
                )
            }

            fn call(&self, ctx: Option<&SpecContext>, args: &[Param]) -> Out {
                (self)(
                    ctx.cloned().unwrap_or_default(),
                    $(bind::<$ty>(args, $idx),)*
                    bind_rest::<V>(args, $count),
                )
            }
        }
    };
}

impl_table_function!(0;);
impl_table_function!(1; A => 0);
impl_table_function!(2; A => 0, B => 1);
impl_table_function!(3; A => 0, B => 1, C => 2);
impl_table_function!(4; A => 0, B => 1, C => 2, D => 3);
impl_table_function!(5; A => 0, B => 1, C => 2, D => 3, E => 4);
impl_table_function!(6; A => 0, B => 1, C => 2, D => 3, E => 4, G => 5);

/// A table function with its type erased behind its [`Signature`].
pub struct ErasedFn<Out> {
    signature: Signature,
    call: Arc<dyn Fn(Option<&SpecContext>, &[Param]) -> Out + Send + Sync>,
}

/// Erased table body.
pub type TableBody = ErasedFn<NodeResult>;
/// Erased naming function.
pub type Describer = ErasedFn<String>;

impl<Out: 'static> ErasedFn<Out> {
    pub fn new<M, F>(function: F) -> Self
    where
        F: TableFunction<M, Out>,
    {
        Self {
            signature: F::signature(),
            call: Arc::new(move |ctx, args| function.call(ctx, args)),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Invoke without validating; callers run [`Signature::validate`] first.
    pub fn call(&self, ctx: Option<&SpecContext>, args: &[Param]) -> Out {
        (self.call)(ctx, args)
    }
}

impl<Out> Clone for ErasedFn<Out> {
    fn clone(&self) -> Self {
        Self {
            signature: self.signature.clone(),
            call: Arc::clone(&self.call),
        }
    }
}

impl<Out> fmt::Debug for ErasedFn<Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedFn")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}
