use std::sync::Arc;

use spec_core::{Container, Subject};

use crate::{ExecConfig, Example};

#[derive(Debug)]
enum Child {
    Tree(SpecTree),
    Subject(Subject),
}

/// Declaration-ordered tree of containers and subjects.
///
/// [`SpecTree::examples`] flattens the tree into one [`Example`] per subject,
/// each carrying its full container chain from the root down.
#[derive(Debug)]
pub struct SpecTree {
    container: Arc<Container>,
    children: Vec<Child>,
}

impl SpecTree {
    pub fn new(container: Container) -> Self {
        Self::from_shared(Arc::new(container))
    }

    pub fn from_shared(container: Arc<Container>) -> Self {
        Self {
            container,
            children: Vec::new(),
        }
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn push_tree(&mut self, tree: SpecTree) {
        self.children.push(Child::Tree(tree));
    }

    pub fn push_subject(&mut self, subject: Subject) {
        self.children.push(Child::Subject(subject));
    }

    /// Attach a container and its subjects as a nested scope, e.g. an expanded table.
    pub fn push_group<I>(&mut self, container: Arc<Container>, subjects: I)
    where
        I: IntoIterator<Item = Subject>,
    {
        let mut group = SpecTree::from_shared(container);
        group.children.extend(subjects.into_iter().map(Child::Subject));
        self.push_tree(group);
    }

    pub fn with_tree(mut self, tree: SpecTree) -> Self {
        self.push_tree(tree);
        self
    }

    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.push_subject(subject);
        self
    }

    /// Number of subjects reachable from this tree.
    pub fn len(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                Child::Tree(tree) => tree.len(),
                Child::Subject(_) => 1,
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into examples using the default engine config.
    pub fn examples(&self) -> Vec<Example> {
        self.examples_with_config(&ExecConfig::default())
    }

    pub fn examples_with_config(&self, config: &ExecConfig) -> Vec<Example> {
        let mut out = Vec::with_capacity(self.len());
        self.collect(&mut Vec::new(), config, &mut out);
        out
    }

    fn collect(
        &self,
        chain: &mut Vec<Arc<Container>>,
        config: &ExecConfig,
        out: &mut Vec<Example>,
    ) {
        chain.push(Arc::clone(&self.container));
        for child in &self.children {
            match child {
                Child::Tree(tree) => tree.collect(chain, config, out),
                Child::Subject(subject) => {
                    let example = Example::new(subject.clone(), chain.clone());
                    out.push(example.with_config(config.clone()));
                }
            }
        }
        chain.pop();
    }
}
