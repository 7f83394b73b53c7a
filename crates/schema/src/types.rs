use itertools::Itertools;
use std::fmt;

/// The type of a column or of a scalar expression.
///
/// Two columns have the same type iff their [`AlgebraicType`]s are equal,
/// including precision, scale and length parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlgebraicType {
    Bool,
    I32,
    I64,
    U64,
    F64,
    Decimal { precision: u8, scale: u8 },
    Char(u32),
    Varchar(u32),
    Date,
    Timestamp,
}

impl fmt::Display for AlgebraicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "BOOLEAN"),
            Self::I32 => write!(f, "INTEGER"),
            Self::I64 => write!(f, "BIGINT"),
            Self::U64 => write!(f, "UBIGINT"),
            Self::F64 => write!(f, "DOUBLE"),
            Self::Decimal { precision, scale } => write!(f, "DECIMAL({precision}, {scale})"),
            Self::Char(n) => write!(f, "CHAR({n})"),
            Self::Varchar(n) => write!(f, "VARCHAR({n})"),
            Self::Date => write!(f, "DATE"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

/// A named field of a [`ProductType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductTypeElement {
    pub name: Box<str>,
    pub algebraic_type: AlgebraicType,
}

impl ProductTypeElement {
    pub fn new(name: impl Into<Box<str>>, algebraic_type: AlgebraicType) -> Self {
        Self {
            name: name.into(),
            algebraic_type,
        }
    }
}

/// The row type of a relational operator:
/// an ordered sequence of `(name, type)` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ProductType {
    elements: Box<[ProductTypeElement]>,
}

impl ProductType {
    pub fn new(elements: Box<[ProductTypeElement]>) -> Self {
        Self { elements }
    }

    /// Builds a row type from parallel lists of types and names.
    ///
    /// Panics if the two lists differ in length.
    pub fn from_parts(types: Vec<AlgebraicType>, names: Vec<Box<str>>) -> Self {
        assert_eq!(types.len(), names.len(), "a field name is required for every type");
        names
            .into_iter()
            .zip(types)
            .map(|(name, ty)| ProductTypeElement::new(name, ty))
            .collect()
    }

    pub fn elements(&self) -> &[ProductTypeElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&ProductTypeElement> {
        self.elements.get(pos)
    }

    pub fn field_type(&self, pos: usize) -> Option<&AlgebraicType> {
        self.get(pos).map(|elem| &elem.algebraic_type)
    }

    pub fn field_name(&self, pos: usize) -> Option<&str> {
        self.get(pos).map(|elem| &*elem.name)
    }
}

impl FromIterator<ProductTypeElement> for ProductType {
    fn from_iter<T: IntoIterator<Item = ProductTypeElement>>(iter: T) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})",
            self.elements
                .iter()
                .map(|elem| format!("{}: {}", elem.name, elem.algebraic_type))
                .join(", ")
        )
    }
}
