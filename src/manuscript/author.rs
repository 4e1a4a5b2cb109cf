use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// An author of the book, sorted by prominence in descending order at
/// render time.
#[derive(Builder, Debug, Eq, Default, Clone, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct Author {
    #[builder(setter(into, strip_option), default)]
    pub name: Option<String>,
    #[builder(setter(into, strip_option), default)]
    pub email: Option<String>,
    /// Credit line, e.g. "Editor" or "Illustrator"
    #[builder(setter(into, strip_option), default)]
    pub role: Option<String>,
    #[builder(default)]
    #[serde(default)]
    pub prominence: usize,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::default();

        match (&self.name, &self.email) {
            (Some(name), Some(email)) => parts.push(format!("{name} <{email}>")),
            (Some(name), None) => parts.push(name.clone()),
            (None, Some(email)) => parts.push(email.clone()),
            _ => {}
        }

        write!(f, "{}", parts.join(" "))?;

        if let Some(role) = &self.role {
            if !parts.is_empty() {
                write!(f, ", {role}")?;
            } else {
                write!(f, "{role}")?;
            }
        }

        Ok(())
    }
}

impl PartialEq for Author {
    fn eq(&self, other: &Author) -> bool {
        if self.email.is_some() && self.email == other.email {
            return true;
        }

        self.name.is_some() && self.name == other.name
    }
}

impl PartialOrd for Author {
    fn partial_cmp(&self, other: &Author) -> Option<Ordering> {
        match other.prominence.partial_cmp(&self.prominence) {
            Some(Ordering::Equal) => self.to_string().partial_cmp(&other.to_string()),
            ordering => ordering,
        }
    }
}

impl Ord for Author {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
}

impl<S: Into<String>> From<S> for Author {
    fn from(s: S) -> Self {
        Author {
            name: Some(s.into()),
            email: None,
            role: None,
            prominence: 0,
        }
    }
}

/// Format a list of authors as a single credit line, most prominent first.
pub fn credit_line(authors: &[Author]) -> String {
    let mut authors: Vec<&Author> = authors.iter().collect();
    authors.sort();
    authors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
