use std::collections::HashMap;

/// Assigns dense integer ids to commit authors.
///
/// Authors are matched by lowercased e-mail. Display names are unique: a name already
/// taken by another e-mail gets the e-mail appended.
#[derive(Debug, Clone, Default)]
pub struct IdentityTable {
    by_email: HashMap<String, usize>,
    names: Vec<String>,
}

impl IdentityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, name: &str, email: &str) -> usize {
        let key = email.trim().to_lowercase();
        if let Some(&id) = self.by_email.get(&key) {
            return id;
        }

        let name = name.trim();
        let display = if self.names.iter().any(|n| n == name) {
            format!("{name} <{key}>")
        } else {
            name.to_string()
        };
        let id = self.names.len();
        self.names.push(display);
        self.by_email.insert(key, id);
        id
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Display names indexed by author id.
    pub fn reversed_people_dict(&self) -> Vec<String> {
        self.names.clone()
    }
}
