use indexmap::IndexMap;

/// Lifecycle classification of an entity seen in the trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Exists for the whole diagram
    Any,
    /// Explicitly created in the trace
    DynamicCreated,
    /// Deleted in the trace; created before tracing started unless also created
    DynamicDeleted,
}

impl Classification {
    pub fn is_dynamic(self) -> bool {
        !matches!(self, Self::Any)
    }

    /// Combine an existing classification with a new reference.
    ///
    /// `Any` takes whatever the new reference says; a dynamic classification
    /// is never replaced, neither by `Any` nor by the other dynamic kind.
    pub fn merge(self, hint: Classification) -> Classification {
        match self {
            Self::Any => hint,
            dynamic => dynamic,
        }
    }
}

/// Every entity referenced by a statement, in first-reference order
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: IndexMap<String, Classification>,
}

impl EntityRegistry {
    /// Record a reference to `name`, promoting its classification if needed
    pub fn register(&mut self, name: &str, hint: Classification) {
        match self.entities.get_mut(name) {
            Some(existing) => *existing = existing.merge(hint),
            None => {
                self.entities.insert(name.to_string(), hint);
            }
        }
    }

    #[cfg(test)]
    pub fn classification(&self, name: &str) -> Option<Classification> {
        self.entities.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Classification)> + '_ {
        self.entities.iter().map(|(name, class)| (name.as_str(), *class))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Split the registry into maximal runs of the same broad class,
    /// preserving insertion order
    pub fn declaration_runs(&self) -> Vec<(bool, Vec<&str>)> {
        let mut runs: Vec<(bool, Vec<&str>)> = Vec::new();
        for (name, class) in self.iter() {
            let dynamic = class.is_dynamic();
            match runs.last_mut() {
                Some((run_dynamic, names)) if *run_dynamic == dynamic => names.push(name),
                _ => runs.push((dynamic, vec![name])),
            }
        }
        runs
    }

    /// Entities deleted in the trace without ever being created in it
    pub fn orphan_deletes(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter()
            .filter(|(_, class)| *class == Classification::DynamicDeleted)
            .map(|(name, _)| name)
    }
}
