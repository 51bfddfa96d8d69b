//! Table-driven specs: one table body expanded into one subject per entry.
//!
//! Entries carry type-erased arguments that are checked against the body's
//! parameter list. Argument mismatches never fail the build; the affected
//! entry's subject reports them when it runs, so sibling entries still run.

mod entry;
mod params;
mod signature;
mod table;
mod template;

pub use entry::{Decoration, Description, Entry, EntryArg, EntryDescription, partition_decorations};
pub use params::{IntoEntryArg, Param, ParamType, Rest, TableParam};
pub use signature::{
    Ctx, CtxVar, Describer, ErasedFn, Plain, Signature, TableBody, TableFunction, Var,
};
pub use table::{ExpandedTable, TableArg, TableBuilder, describe_table, focus_table, pending_table};
pub use template::render_template;
