use itertools::Itertools;

/// A source attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// `u8` values.
    Byte(Vec<u8>),
    /// `i8` values.
    Int8(Vec<i8>),
    /// `i16` values.
    Int16(Vec<i16>),
    /// `u16` values.
    UInt16(Vec<u16>),
    /// `i32` values.
    Int32(Vec<i32>),
    /// `u32` values.
    UInt32(Vec<u32>),
    /// `i64` values.
    Int64(Vec<i64>),
    /// `u64` values.
    UInt64(Vec<u64>),
    /// `f32` values.
    Float32(Vec<f32>),
    /// `f64` values.
    Float64(Vec<f64>),
    /// Text values.
    String(Vec<String>),
    /// URL values.
    Url(Vec<String>),
    /// An XML fragment.
    OtherXml(String),
    /// A nested attribute table.
    Container(Attributes),
}

impl AttributeValue {
    /// A single text value.
    #[must_use]
    pub fn text(value: &str) -> Self {
        Self::String(vec![value.to_string()])
    }

    /// The number of values, or the number of attributes of a container.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Byte(v) => v.len(),
            Self::Int8(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::UInt16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::UInt32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::UInt64(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::String(v) | Self::Url(v) => v.len(),
            Self::OtherXml(_) => 1,
            Self::Container(attributes) => attributes.len(),
        }
    }

    /// Returns true if there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The name of the attribute type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Byte(_) => "byte",
            Self::Int8(_) => "int8",
            Self::Int16(_) => "int16",
            Self::UInt16(_) => "uint16",
            Self::Int32(_) => "int32",
            Self::UInt32(_) => "uint32",
            Self::Int64(_) => "int64",
            Self::UInt64(_) => "uint64",
            Self::Float32(_) => "float32",
            Self::Float64(_) => "float64",
            Self::String(_) => "string",
            Self::Url(_) => "url",
            Self::OtherXml(_) => "otherxml",
            Self::Container(_) => "container",
        }
    }

    /// The values joined by newlines, if the attribute is text.
    #[must_use]
    pub fn joined_text(&self) -> Option<String> {
        match self {
            Self::String(v) | Self::Url(v) => Some(v.iter().join("\n")),
            Self::OtherXml(xml) => Some(xml.clone()),
            _ => None,
        }
    }
}

/// A named attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// The attribute name.
    pub name: String,
    /// The attribute value.
    pub value: AttributeValue,
}

/// An ordered attribute table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    /// Create an empty attribute table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute and return the table.
    #[must_use]
    pub fn with(mut self, name: &str, value: AttributeValue) -> Self {
        self.push(name, value);
        self
    }

    /// Add an attribute, replacing any attribute of the same name in place.
    pub fn push(&mut self, name: &str, value: AttributeValue) {
        if let Some(existing) = self.get_mut(name) {
            *existing = value;
        } else {
            self.0.push(Attribute {
                name: name.to_string(),
                value,
            });
        }
    }

    /// Get an attribute value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| &attribute.value)
    }

    /// Get a mutable attribute value by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut AttributeValue> {
        self.0
            .iter_mut()
            .find(|attribute| attribute.name == name)
            .map(|attribute| &mut attribute.value)
    }

    /// Iterate over the attributes in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    /// Iterate mutably over the attributes in order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Attribute> {
        self.0.iter_mut()
    }

    /// The number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append the attributes of `other`, replacing attributes of the same name.
    pub fn extend(&mut self, other: &Attributes) {
        for attribute in other.iter() {
            self.push(&attribute.name, attribute.value.clone());
        }
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
