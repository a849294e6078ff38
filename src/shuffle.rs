//! Resolution of `@Key` declarations into typed shuffle keys.
//!
//! A key declaration names the grouping properties of an input and the order in
//! which the records of one group are delivered. Order entries are written as
//! `"name"`, `"name ASC"` or `"name DESC"`; a missing direction means ascending.

use crate::error::KeyError;
use crate::graph::{DataModel, PropertyType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A key exactly as it was declared on an operator input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyDeclaration {
    #[serde(default)]
    pub group: Vec<String>,
    #[serde(default)]
    pub order: Vec<String>,
}

impl KeyDeclaration {
    pub fn new<G, O>(group: G, order: O) -> Self
    where
        G: IntoIterator,
        G::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            group: group.into_iter().map(Into::into).collect(),
            order: order.into_iter().map(Into::into).collect(),
        }
    }

    /// A key grouping on the given properties with no ordering.
    pub fn group<G>(group: G) -> Self
    where
        G: IntoIterator,
        G::Item: Into<String>,
    {
        Self::new(group, Vec::<String>::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "ASC")]
    Ascendant,
    #[serde(rename = "DESC")]
    Descendant,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ascendant => f.write_str("ASC"),
            Direction::Descendant => f.write_str("DESC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ordering {
    pub property: String,
    pub direction: Direction,
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.property, self.direction)
    }
}

/// A validated shuffle key. Every name refers to a declared property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ShuffleKey {
    group: Vec<String>,
    order: Vec<Ordering>,
    group_types: Vec<PropertyType>,
}

impl ShuffleKey {
    pub fn group(&self) -> &[String] {
        &self.group
    }

    pub fn order(&self) -> &[Ordering] {
        &self.order
    }

    /// Two keys may feed the same reducer when their groupings line up by
    /// arity and property type. Orderings are free to differ.
    pub fn is_compatible_with(&self, other: &ShuffleKey) -> bool {
        self.group_types == other.group_types
    }
}

impl fmt::Display for ShuffleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group=[{}]", self.group.join(", "))?;
        if !self.order.is_empty() {
            let order: Vec<String> = self.order.iter().map(ToString::to_string).collect();
            write!(f, " order=[{}]", order.join(", "))?;
        }
        Ok(())
    }
}

/// Resolves a key declaration against the data model of the keyed port.
pub fn resolve(declaration: &KeyDeclaration, model: &DataModel) -> Result<ShuffleKey, KeyError> {
    let mut group = Vec::with_capacity(declaration.group.len());
    let mut group_types = Vec::with_capacity(declaration.group.len());
    for name in &declaration.group {
        let name = name.trim();
        let property = model
            .find_property(name)
            .ok_or_else(|| KeyError::PropertyNotFound {
                model: model.name.clone(),
                property: name.to_string(),
            })?;
        let duplicated = group
            .iter()
            .any(|seen: &String| model.find_property(seen) == Some(property));
        if duplicated {
            return Err(KeyError::DuplicateGroupProperty {
                model: model.name.clone(),
                property: name.to_string(),
            });
        }
        group.push(name.to_string());
        group_types.push(property.ty);
    }

    let mut order = Vec::with_capacity(declaration.order.len());
    for entry in &declaration.order {
        let ordering = parse_ordering(entry)?;
        if model.find_property(&ordering.property).is_none() {
            return Err(KeyError::PropertyNotFound {
                model: model.name.clone(),
                property: ordering.property,
            });
        }
        order.push(ordering);
    }

    Ok(ShuffleKey {
        group,
        order,
        group_types,
    })
}

fn parse_ordering(entry: &str) -> Result<Ordering, KeyError> {
    let malformed = || KeyError::MalformedOrdering {
        entry: entry.to_string(),
    };
    let mut tokens = entry.split_whitespace();
    let property = tokens.next().ok_or_else(malformed)?;
    let direction = match tokens.next() {
        None => Direction::Ascendant,
        Some(token) if token.eq_ignore_ascii_case("ASC") => Direction::Ascendant,
        Some(token) if token.eq_ignore_ascii_case("DESC") => Direction::Descendant,
        Some(_) => return Err(malformed()),
    };
    if tokens.next().is_some() {
        return Err(malformed());
    }
    Ok(Ordering {
        property: property.to_string(),
        direction,
    })
}
