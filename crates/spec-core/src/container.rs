use crate::location::CodeLocation;
use crate::node::{Flag, SetupKind, SetupNode};

/// One nesting scope holding ordered setup nodes.
#[derive(Debug, Clone)]
pub struct Container {
    text: String,
    location: CodeLocation,
    flag: Flag,
    befores: Vec<SetupNode>,
    just_befores: Vec<SetupNode>,
    afters: Vec<SetupNode>,
}

impl Container {
    /// Create an empty container located at the caller.
    #[track_caller]
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_location(text, CodeLocation::caller())
    }

    pub fn with_location(text: impl Into<String>, location: CodeLocation) -> Self {
        Self {
            text: text.into(),
            location,
            flag: Flag::None,
            befores: Vec::new(),
            just_befores: Vec::new(),
            afters: Vec::new(),
        }
    }

    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flag = flag;
        self
    }

    /// Register a setup node in the list matching its kind.
    pub fn push(&mut self, node: SetupNode) {
        match node.kind() {
            SetupKind::BeforeEach => self.befores.push(node),
            SetupKind::JustBeforeEach => self.just_befores.push(node),
            SetupKind::AfterEach => self.afters.push(node),
        }
    }

    /// Builder form of [`Container::push`].
    pub fn with_node(mut self, node: SetupNode) -> Self {
        self.push(node);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn location(&self) -> &CodeLocation {
        &self.location
    }

    pub fn flag(&self) -> Flag {
        self.flag
    }

    pub fn befores(&self) -> &[SetupNode] {
        &self.befores
    }

    pub fn just_befores(&self) -> &[SetupNode] {
        &self.just_befores
    }

    pub fn afters(&self) -> &[SetupNode] {
        &self.afters
    }

    /// Setup nodes of the given kind, in declaration order.
    pub fn nodes(&self, kind: SetupKind) -> &[SetupNode] {
        match kind {
            SetupKind::BeforeEach => &self.befores,
            SetupKind::JustBeforeEach => &self.just_befores,
            SetupKind::AfterEach => &self.afters,
        }
    }
}
