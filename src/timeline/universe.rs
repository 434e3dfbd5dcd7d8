use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::events::Event;
use crate::DynamicsError;

/// Fixed subject and variable axes shared by every epoch snapshot.
///
/// Slot indices are assigned once, before any epoch is built, and stay
/// stable across the whole table.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUniverse {
    subjects: Vec<Arc<str>>,
    subject_index: HashMap<Arc<str>, usize>,
    variables: Vec<Arc<str>>,
    variable_index: HashMap<Arc<str>, usize>,
}

impl StateUniverse {
    /// Universe with explicitly declared subjects and variables.
    pub fn declared<S, V>(subjects: S, variables: V) -> Result<Self, DynamicsError>
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        let (subjects, subject_index) = index_names(subjects, DynamicsError::DuplicateSubject)?;
        let (variables, variable_index) =
            index_names(variables, DynamicsError::DuplicateVariable)?;
        Ok(Self {
            subjects,
            subject_index,
            variables,
            variable_index,
        })
    }

    /// Universe whose subjects are the distinct subjects of `events`, in the
    /// order they first appear.
    pub fn inferred<V>(variables: V, events: &[Event]) -> Result<Self, DynamicsError>
    where
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut subjects = Vec::new();
        for event in events {
            if seen.insert(Arc::clone(&event.subject)) {
                subjects.push(Arc::clone(&event.subject));
            }
        }
        Self::declared(subjects, variables)
    }

    /// Number of subjects (N).
    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    /// Number of tracked state variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Subject names in slot order.
    pub fn subjects(&self) -> &[Arc<str>] {
        &self.subjects
    }

    /// Variable names in slot order.
    pub fn variables(&self) -> &[Arc<str>] {
        &self.variables
    }

    /// Slot index of a subject.
    pub fn subject_index(&self, subject: &str) -> Option<usize> {
        self.subject_index.get(subject).copied()
    }

    /// Slot index of a variable.
    pub fn variable_index(&self, variable: &str) -> Option<usize> {
        self.variable_index.get(variable).copied()
    }

    /// Resolve a subject and variable name pair to its slot. The variable is
    /// checked first.
    pub fn resolve_names(
        &self,
        subject: &str,
        variable: &str,
    ) -> Result<(usize, usize), DynamicsError> {
        let variable = self
            .variable_index(variable)
            .ok_or_else(|| DynamicsError::UnknownVariable(variable.to_string()))?;
        let subject = self
            .subject_index(subject)
            .ok_or_else(|| DynamicsError::UnknownSubject(subject.to_string()))?;
        Ok((subject, variable))
    }

    /// Resolve an event to its (subject, variable) slot.
    pub fn resolve(&self, event: &Event) -> Result<(usize, usize), DynamicsError> {
        self.resolve_names(&event.subject, &event.variable)
    }
}

type NameIndex = (Vec<Arc<str>>, HashMap<Arc<str>, usize>);

fn index_names<I>(names: I, duplicate: fn(String) -> DynamicsError) -> Result<NameIndex, DynamicsError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut ordered: Vec<Arc<str>> = Vec::new();
    let mut index = HashMap::new();
    for name in names {
        let name: Arc<str> = Arc::from(name.as_ref());
        if index.contains_key(&name) {
            return Err(duplicate(name.to_string()));
        }
        index.insert(Arc::clone(&name), ordered.len());
        ordered.push(name);
    }
    Ok((ordered, index))
}
