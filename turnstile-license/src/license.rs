//! The license aggregate: features, fields and restrictions.
//!
//! A [`License`] is produced by a trusted source (see [`crate::SignedLicense`])
//! after its signature has been verified. It is immutable once built.

use crate::error::{LicenseError, LicenseResult};
use crate::restriction::Restriction;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// Opaque license identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseId(Uuid);

impl LicenseId {
    /// Creates a new random license ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a license ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses a license ID from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for LicenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LicenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named grant carried by a license.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub description: Option<String>,
    /// Free-form payload attached by the issuer.
    pub data: Option<String>,
}

impl Feature {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// Typed value of a [`Field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A named attribute carried by a license.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

impl Field {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::default(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: FieldValue) -> Self {
        self.value = value;
        self
    }
}

/// A verified license.
#[derive(Debug, Clone, PartialEq)]
pub struct License {
    id: LicenseId,
    features: Vec<Feature>,
    fields: Vec<Field>,
    restrictions: Vec<Restriction>,
}

impl License {
    /// Starts building a license with the given ID.
    #[must_use]
    pub fn builder(id: LicenseId) -> LicenseBuilder {
        LicenseBuilder {
            id,
            features: Vec::new(),
            fields: Vec::new(),
            restrictions: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> LicenseId {
        self.id
    }

    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Restrictions in the order the issuer stored them.
    #[must_use]
    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Builder for [`License`]; enforces name uniqueness on `build`.
#[derive(Debug)]
pub struct LicenseBuilder {
    id: LicenseId,
    features: Vec<Feature>,
    fields: Vec<Field>,
    restrictions: Vec<Restriction>,
}

impl LicenseBuilder {
    #[must_use]
    pub fn feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn restriction(mut self, restriction: impl Into<Restriction>) -> Self {
        self.restrictions.push(restriction.into());
        self
    }

    /// Finishes the license.
    ///
    /// # Errors
    ///
    /// Returns `MalformedEncoding` if two features or two fields share a name.
    pub fn build(self) -> LicenseResult<License> {
        ensure_unique("feature", self.features.iter().map(|f| f.name.as_str()))?;
        ensure_unique("field", self.fields.iter().map(|f| f.name.as_str()))?;
        Ok(License {
            id: self.id,
            features: self.features,
            fields: self.fields,
            restrictions: self.restrictions,
        })
    }
}

fn ensure_unique<'a>(what: &str, names: impl Iterator<Item = &'a str>) -> LicenseResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(LicenseError::malformed(format!("duplicate {what} name: {name}")));
        }
    }
    Ok(())
}
