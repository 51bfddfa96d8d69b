use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use crate::{Decoration, EntryArg};

/// Values a table function can declare as a parameter.
///
/// `nil` arguments bind to [`Default::default`]; bound values are cloned out
/// of the entry so every invocation sees the same arguments.
pub trait TableParam: Any + Send + Sync + Clone + Default {}

macro_rules! table_params {
    ($($ty:ty),* $(,)?) => {
        $(impl TableParam for $ty {})*
    };
}

table_params!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, &'static str, Duration, (),
);

impl<T: TableParam> TableParam for Vec<T> {}
impl<T: TableParam> TableParam for Option<T> {}
impl<T: TableParam> TableParam for Arc<T> {}
impl<A: TableParam, B: TableParam> TableParam for (A, B) {}
impl<A: TableParam, B: TableParam, C: TableParam> TableParam for (A, B, C) {}

/// Trailing variadic parameter; collects every argument past the positional ones.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rest<T>(pub Vec<T>);

impl<T> Rest<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Deref for Rest<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

/// Declared parameter type, compared by identity during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamType {
    id: TypeId,
    name: &'static str,
}

impl ParamType {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` when `param` can bind to this type; `nil` binds to anything.
    ///
    /// String literals also bind to `String` parameters.
    pub fn accepts(&self, param: &Param) -> bool {
        match &param.value {
            None => true,
            Some(_) if param.type_id == Some(self.id) => true,
            Some(_) => self.id == TypeId::of::<String>() && param.is_str_literal(),
        }
    }
}

/// One type-erased entry argument.
#[derive(Clone)]
pub struct Param {
    value: Option<Arc<dyn Any + Send + Sync>>,
    type_id: Option<TypeId>,
    type_name: &'static str,
    display: String,
}

impl Param {
    /// Wrap a value rendered through its `Display` impl.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Display,
    {
        let display = value.to_string();
        Self::erase(value, display)
    }

    /// Wrap a value rendered through its `Debug` impl.
    pub fn debug<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Debug,
    {
        let display = format!("{value:?}");
        Self::erase(value, display)
    }

    /// The `nil` argument: skips type checking and binds the parameter's default.
    pub fn nil() -> Self {
        Self {
            value: None,
            type_id: None,
            type_name: "nil",
            display: "<nil>".to_string(),
        }
    }

    fn erase<T: Any + Send + Sync>(value: T, display: String) -> Self {
        Self {
            value: Some(Arc::new(value)),
            type_id: Some(TypeId::of::<T>()),
            type_name: type_name::<T>(),
            display,
        }
    }

    pub fn is_nil(&self) -> bool {
        self.value.is_none()
    }

    fn is_str_literal(&self) -> bool {
        self.type_id == Some(TypeId::of::<&'static str>())
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Rendered form used by default entry names and templates.
    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.as_deref().and_then(|value| value.downcast_ref::<T>())
    }

    /// Clone the value out as `T`; `nil` yields `T::default()`.
    pub fn bind<T: TableParam>(&self) -> Option<T> {
        let value = match &self.value {
            None => return Some(T::default()),
            Some(value) => value,
        };
        if let Some(bound) = value.downcast_ref::<T>() {
            return Some(bound.clone());
        }
        let literal = value.downcast_ref::<&'static str>()?;
        let owned: Box<dyn Any> = Box::new(literal.to_string());
        owned.downcast::<T>().ok().map(|owned| *owned)
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("type", &self.type_name)
            .field("display", &self.display)
            .finish()
    }
}

/// Conversion used by [`args!`](crate::args) for each listed value.
pub trait IntoEntryArg {
    fn into_entry_arg(self) -> EntryArg;
}

impl<T> IntoEntryArg for T
where
    T: Any + Send + Sync + fmt::Display,
{
    fn into_entry_arg(self) -> EntryArg {
        EntryArg::Param(Param::new(self))
    }
}

impl IntoEntryArg for Param {
    fn into_entry_arg(self) -> EntryArg {
        EntryArg::Param(self)
    }
}

impl IntoEntryArg for Decoration {
    fn into_entry_arg(self) -> EntryArg {
        EntryArg::Decoration(self)
    }
}

impl IntoEntryArg for EntryArg {
    fn into_entry_arg(self) -> EntryArg {
        self
    }
}

/// Build an entry's argument list; decorations may be mixed in.
///
/// ```
/// use spec_table::{Decoration, Param, args};
///
/// let list = args![1, "two", Param::nil(), Decoration::Focus];
/// assert_eq!(list.len(), 4);
/// ```
#[macro_export]
macro_rules! args {
    ($($value:expr),* $(,)?) => {
        ::std::vec![$($crate::IntoEntryArg::into_entry_arg($value)),*]
    };
}

pub(crate) fn bind<T: TableParam>(args: &[Param], index: usize) -> T {
    args.get(index)
        .and_then(Param::bind::<T>)
        .unwrap_or_default()
}

pub(crate) fn bind_rest<T: TableParam>(args: &[Param], from: usize) -> Rest<T> {
    Rest(
        args.iter()
            .skip(from)
            .map(|param| param.bind::<T>().unwrap_or_default())
            .collect(),
    )
}
