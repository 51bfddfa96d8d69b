use std::fmt;
use std::time::Duration;

use spec_core::{CodeLocation, Flag};

use crate::params::Param;
use crate::signature::{Describer, ErasedFn, TableFunction};

/// Markers that can be attached to a table or an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoration {
    Focus,
    Pending,
    /// Timeout for context-taking bodies.
    Timeout(Duration),
}

/// One item of an entry's argument list: a decoration or a parameter.
#[derive(Debug, Clone)]
pub enum EntryArg {
    Decoration(Decoration),
    Param(Param),
}

impl From<Param> for EntryArg {
    fn from(param: Param) -> Self {
        EntryArg::Param(param)
    }
}

impl From<Decoration> for EntryArg {
    fn from(decoration: Decoration) -> Self {
        EntryArg::Decoration(decoration)
    }
}

/// Split decorations from parameters, preserving the order of each.
pub fn partition_decorations<I>(args: I) -> (Vec<Decoration>, Vec<Param>)
where
    I: IntoIterator<Item = EntryArg>,
{
    let mut decorations = Vec::new();
    let mut params = Vec::new();
    for arg in args {
        match arg {
            EntryArg::Decoration(decoration) => decorations.push(decoration),
            EntryArg::Param(param) => params.push(param),
        }
    }
    (decorations, params)
}

/// Combine decoration flags; `Pending` wins over `Focus`.
pub(crate) fn merged_flag<'a, I>(decorations: I) -> Flag
where
    I: IntoIterator<Item = &'a Decoration>,
{
    let mut flag = Flag::None;
    for decoration in decorations {
        match decoration {
            Decoration::Pending => return Flag::Pending,
            Decoration::Focus => flag = Flag::Focused,
            Decoration::Timeout(_) => {}
        }
    }
    flag
}

/// Last timeout decoration in the list, if any.
pub(crate) fn timeout_of<'a, I>(decorations: I) -> Option<Duration>
where
    I: IntoIterator<Item = &'a Decoration>,
{
    decorations
        .into_iter()
        .filter_map(|decoration| match decoration {
            Decoration::Timeout(timeout) => Some(*timeout),
            Decoration::Focus | Decoration::Pending => None,
        })
        .last()
}

/// Format template used to name entries, e.g. `"{} plus {} is {}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryDescription(pub String);

impl EntryDescription {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// How an entry's display name is produced.
#[derive(Clone, Default)]
pub enum Description {
    /// Fall back to the table-level renderer.
    #[default]
    Auto,
    Text(String),
    Template(EntryDescription),
    Function(Describer),
    /// A value that cannot name an entry; reported when the entry is run.
    Unsupported(&'static str),
}

impl Description {
    /// Naming function invoked with the entry's arguments.
    pub fn function<M, F>(function: F) -> Self
    where
        F: TableFunction<M, String>,
    {
        Description::Function(ErasedFn::new(function))
    }

    /// Interpret a dynamically-typed value as a description.
    pub fn from_param(param: &Param) -> Self {
        if param.is_nil() {
            Description::Auto
        } else if let Some(text) = param.downcast_ref::<String>() {
            Description::Text(text.clone())
        } else if let Some(text) = param.downcast_ref::<&'static str>() {
            Description::Text((*text).to_string())
        } else if let Some(template) = param.downcast_ref::<EntryDescription>() {
            Description::Template(template.clone())
        } else {
            Description::Unsupported(param.type_name())
        }
    }
}

impl fmt::Debug for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Description::Auto => f.write_str("Auto"),
            Description::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Description::Template(template) => f.debug_tuple("Template").field(template).finish(),
            Description::Function(_) => f.write_str("Function(..)"),
            Description::Unsupported(name) => f.debug_tuple("Unsupported").field(name).finish(),
        }
    }
}

impl From<&str> for Description {
    fn from(text: &str) -> Self {
        Description::Text(text.to_string())
    }
}

impl From<String> for Description {
    fn from(text: String) -> Self {
        Description::Text(text)
    }
}

impl From<EntryDescription> for Description {
    fn from(template: EntryDescription) -> Self {
        Description::Template(template)
    }
}

/// One row of a table: a description, arguments and decorations.
#[derive(Debug, Clone)]
pub struct Entry {
    description: Description,
    decorations: Vec<Decoration>,
    params: Vec<Param>,
    location: CodeLocation,
}

impl Entry {
    /// Create an entry located at the caller.
    #[track_caller]
    pub fn new<I>(description: impl Into<Description>, args: I) -> Self
    where
        I: IntoIterator<Item = EntryArg>,
    {
        let (decorations, params) = partition_decorations(args);
        Self {
            description: description.into(),
            decorations,
            params,
            location: CodeLocation::caller(),
        }
    }

    /// Entry named by the table-level renderer.
    #[track_caller]
    pub fn unnamed<I>(args: I) -> Self
    where
        I: IntoIterator<Item = EntryArg>,
    {
        Self::new(Description::Auto, args)
    }

    #[track_caller]
    pub fn focused<I>(description: impl Into<Description>, args: I) -> Self
    where
        I: IntoIterator<Item = EntryArg>,
    {
        Self::new(description, args).decorate(Decoration::Focus)
    }

    #[track_caller]
    pub fn pending<I>(description: impl Into<Description>, args: I) -> Self
    where
        I: IntoIterator<Item = EntryArg>,
    {
        Self::new(description, args).decorate(Decoration::Pending)
    }

    pub fn decorate(mut self, decoration: Decoration) -> Self {
        self.decorations.push(decoration);
        self
    }

    pub fn with_location(mut self, location: CodeLocation) -> Self {
        self.location = location;
        self
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    pub fn decorations(&self) -> &[Decoration] {
        &self.decorations
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn location(&self) -> &CodeLocation {
        &self.location
    }
}
