use std::panic;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use spec_core::{
    AsyncBody, CodeLocation, ConfigError, Container, Flag, FunctionKind, NodeError, NodeResult,
    SpecContext, Subject, SubjectBody, SyncBody,
};
use spec_exec::{ExecConfig, Example, SpecTree};
use tracing::{debug, instrument, trace};

use crate::entry::{Decoration, Description, Entry, EntryDescription, merged_flag, timeout_of};
use crate::params::Param;
use crate::signature::{Describer, ErasedFn, TableBody, TableFunction};
use crate::template::render_template;

/// One argument of a table declaration, in declaration order.
#[derive(Debug, Clone)]
pub enum TableArg {
    Body(TableBody),
    Entry(Entry),
    Entries(Vec<Entry>),
    /// Table-level naming function for entries without a description.
    Describer(Describer),
    /// Table-level format template for entries without a description.
    Template(EntryDescription),
    Decoration(Decoration),
    /// An absent argument; always rejected.
    Nil,
}

/// Start declaring a table located at the caller.
#[track_caller]
pub fn describe_table(text: impl Into<String>) -> TableBuilder {
    TableBuilder::new(text, CodeLocation::caller())
}

/// Focused table; every generated subject is focused unless pending.
#[track_caller]
pub fn focus_table(text: impl Into<String>) -> TableBuilder {
    describe_table(text).decorate(Decoration::Focus)
}

/// Pending table; every generated subject is pending.
#[track_caller]
pub fn pending_table(text: impl Into<String>) -> TableBuilder {
    describe_table(text).decorate(Decoration::Pending)
}

/// Collects table arguments until [`TableBuilder::build`] expands them.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    text: String,
    location: CodeLocation,
    args: Vec<TableArg>,
}

impl TableBuilder {
    pub fn new(text: impl Into<String>, location: CodeLocation) -> Self {
        Self {
            text: text.into(),
            location,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: TableArg) -> Self {
        self.args.push(arg);
        self
    }

    /// Function shared by every entry.
    pub fn body<M, F>(self, function: F) -> Self
    where
        F: TableFunction<M, NodeResult>,
    {
        self.arg(TableArg::Body(ErasedFn::new(function)))
    }

    pub fn entry(self, entry: Entry) -> Self {
        self.arg(TableArg::Entry(entry))
    }

    pub fn entries<I>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = Entry>,
    {
        self.arg(TableArg::Entries(entries.into_iter().collect()))
    }

    /// Name undescribed entries with a function of their arguments.
    pub fn describe_with<M, F>(self, function: F) -> Self
    where
        F: TableFunction<M, String>,
    {
        self.arg(TableArg::Describer(ErasedFn::new(function)))
    }

    /// Name undescribed entries with a format template.
    pub fn template(self, template: impl Into<String>) -> Self {
        self.arg(TableArg::Template(EntryDescription::new(template)))
    }

    pub fn decorate(self, decoration: Decoration) -> Self {
        self.arg(TableArg::Decoration(decoration))
    }

    /// Default timeout for context-taking bodies.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.decorate(Decoration::Timeout(timeout))
    }

    pub fn with_location(mut self, location: CodeLocation) -> Self {
        self.location = location;
        self
    }

    /// Expand the table into a container and one subject per entry.
    ///
    /// Structural mistakes fail here. Argument mismatches for a single entry
    /// are carried by that entry's subject and reported when it runs.
    #[instrument(level = "debug", skip_all, fields(table = %self.text))]
    pub fn build(self) -> Result<ExpandedTable, ConfigError> {
        let mut body: Option<TableBody> = None;
        let mut entries = Vec::new();
        let mut renderer = Renderer::Default;
        let mut decorations = Vec::new();

        for (index, arg) in self.args.into_iter().enumerate() {
            match arg {
                TableArg::Nil => {
                    return Err(ConfigError::NilTableArgument {
                        index,
                        location: self.location,
                    });
                }
                TableArg::Body(function) => {
                    if body.is_some() {
                        return Err(ConfigError::MultipleTableBodies {
                            location: self.location,
                        });
                    }
                    body = Some(function);
                }
                TableArg::Entry(entry) => entries.push(entry),
                TableArg::Entries(more) => entries.extend(more),
                TableArg::Describer(function) => renderer = Renderer::Function(function),
                TableArg::Template(template) => renderer = Renderer::Template(template),
                TableArg::Decoration(decoration) => decorations.push(decoration),
            }
        }

        let Some(body) = body else {
            return Err(ConfigError::MissingTableBody {
                location: self.location,
            });
        };

        let table = TableScope {
            flag: merged_flag(&decorations),
            timeout: timeout_of(&decorations),
            decorations,
            renderer,
        };
        let container = Container::with_location(self.text, self.location).with_flag(table.flag);
        let subjects: Vec<Subject> = entries
            .into_iter()
            .map(|entry| expand_entry(entry, &body, &table))
            .collect();
        debug!(entries = subjects.len(), "expanded table");

        Ok(ExpandedTable {
            container: Arc::new(container),
            subjects,
        })
    }
}

/// A table after expansion: its container and the generated subjects.
#[derive(Debug)]
pub struct ExpandedTable {
    container: Arc<Container>,
    subjects: Vec<Subject>,
}

impl ExpandedTable {
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn into_parts(self) -> (Arc<Container>, Vec<Subject>) {
        (self.container, self.subjects)
    }

    /// One example per entry, nested under `ancestors` (outermost first).
    pub fn examples(&self, ancestors: &[Arc<Container>]) -> Vec<Example> {
        self.examples_with_config(ancestors, &ExecConfig::default())
    }

    pub fn examples_with_config(
        &self,
        ancestors: &[Arc<Container>],
        config: &ExecConfig,
    ) -> Vec<Example> {
        let mut chain = ancestors.to_vec();
        chain.push(Arc::clone(&self.container));
        self.subjects
            .iter()
            .map(|subject| {
                Example::new(subject.clone(), chain.clone()).with_config(config.clone())
            })
            .collect()
    }

    /// Nest the table under `tree`.
    pub fn attach_to(self, tree: &mut SpecTree) {
        tree.push_group(self.container, self.subjects);
    }
}

enum Renderer {
    Default,
    Function(Describer),
    Template(EntryDescription),
}

impl Renderer {
    fn render(&self, params: &[Param], location: &CodeLocation) -> Result<String, ConfigError> {
        match self {
            Renderer::Default => {
                let shown: Vec<&str> = params.iter().map(Param::display).collect();
                Ok(format!("Entry: {}", shown.join(", ")))
            }
            Renderer::Function(function) => describe(function, params, location),
            Renderer::Template(template) => Ok(render_template(template.as_str(), params)),
        }
    }
}

struct TableScope {
    flag: Flag,
    timeout: Option<Duration>,
    decorations: Vec<Decoration>,
    renderer: Renderer,
}

fn describe(
    function: &Describer,
    params: &[Param],
    location: &CodeLocation,
) -> Result<String, ConfigError> {
    let signature = function.signature();
    if signature.takes_context() {
        return Err(ConfigError::MissingContext {
            kind: FunctionKind::EntryDescription,
            location: location.clone(),
        });
    }
    signature.validate(params, FunctionKind::EntryDescription, location)?;
    Ok(function.call(None, params))
}

fn expand_entry(entry: Entry, body: &TableBody, table: &TableScope) -> Subject {
    let location = entry.location().clone();
    let params = entry.params();

    let description = match entry.description() {
        Description::Auto => table.renderer.render(params, &location),
        Description::Text(text) => Ok(text.clone()),
        Description::Template(template) => Ok(render_template(template.as_str(), params)),
        Description::Function(function) => describe(function, params, &location),
        Description::Unsupported(_) => Err(ConfigError::InvalidEntryDescription {
            location: location.clone(),
        }),
    };
    let (text, description_error) = match description {
        Ok(text) => (text, None),
        Err(err) => (String::new(), Some(err)),
    };

    let signature = body.signature();
    let error = description_error.or_else(|| {
        signature
            .validate(params, FunctionKind::TableBody, &location)
            .err()
    });
    if let Some(diagnostic) = error.as_ref().and_then(ConfigError::diagnostic) {
        debug!(
            code = diagnostic.code.code,
            summary = diagnostic.code.summary,
            %location,
            "deferring entry configuration error: {}",
            diagnostic.message
        );
    }

    let flag = merged_flag(entry.decorations().iter().chain(&table.decorations));
    let params: Arc<[Param]> = params.into();
    let subject_body = if signature.takes_context() {
        let timeout = timeout_of(entry.decorations()).or(table.timeout);
        SubjectBody::Async {
            body: async_body(body.clone(), params, error),
            timeout,
        }
    } else {
        SubjectBody::Sync(sync_body(body.clone(), params, error))
    };
    trace!(%text, ?flag, %location, "generated subject");

    Subject::from_parts(text, location, flag, subject_body)
}

fn sync_body(function: TableBody, params: Arc<[Param]>, error: Option<ConfigError>) -> SyncBody {
    Arc::new(move || match &error {
        Some(err) => Err(NodeError::Fault(err.clone())),
        None => function.call(None, &params),
    })
}

/// Run the function on the blocking pool and signal completion when it returns Ok.
fn async_body(function: TableBody, params: Arc<[Param]>, error: Option<ConfigError>) -> AsyncBody {
    Arc::new(move |ctx: SpecContext| {
        let function = function.clone();
        let params = Arc::clone(&params);
        let error = error.clone();
        async move {
            if let Some(err) = error {
                return Err(NodeError::Fault(err));
            }
            let signal = ctx.clone();
            let joined =
                tokio::task::spawn_blocking(move || function.call(Some(&ctx), &params)).await;
            let result = match joined {
                Ok(result) => result,
                Err(join_err) => match join_err.try_into_panic() {
                    Ok(payload) => panic::resume_unwind(payload),
                    Err(join_err) => Err(NodeError::new(format!(
                        "table body did not finish: {join_err}"
                    ))),
                },
            };
            if result.is_ok() {
                signal.done();
            }
            result
        }
        .boxed()
    })
}
