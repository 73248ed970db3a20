//! Repository method descriptors.

use std::fmt;

/// Identity of a repository method: the repository it belongs to and its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId {
    repository: String,
    name: String,
}

impl MethodId {
    pub fn new(repository: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            name: name.into(),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.repository, self.name)
    }
}

/// The entity type a repository method returns rows for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainType(String);

impl DomainType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shape of the value a method declares as its return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnShape {
    /// A single optional entity.
    Single,
    /// Every matching entity.
    #[default]
    Collection,
    /// One page of entities plus the requested page.
    Page,
}

/// What a declared method parameter carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterKind {
    /// A value that can be bound into a query template.
    Value { name: Option<String> },
    /// Paging directive; never bound into a template.
    Pageable,
    /// Sort directive; never bound into a template.
    Sort,
}

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Position in the full declared parameter list.
    pub position: usize,
    pub kind: ParameterKind,
}

impl Parameter {
    /// Returns the declared name of a value parameter.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ParameterKind::Value { name } => name.as_deref(),
            _ => None,
        }
    }

    /// Whether this parameter can appear in a query template.
    pub fn is_bindable(&self) -> bool {
        matches!(self.kind, ParameterKind::Value { .. })
    }
}

/// Everything the engine knows about one repository method.
///
/// Built once when the repository is assembled and never mutated.
///
/// # Example
///
/// ```
/// use gremlin_repository::query::{DomainType, MethodDescriptor, ReturnShape};
///
/// let method = MethodDescriptor::builder("PersonRepository", "find_by_name", DomainType::new("Person"))
///     .param("name")
///     .pageable()
///     .returns(ReturnShape::Page)
///     .build();
///
/// assert_eq!(method.named_query_name(), "Person.find_by_name");
/// assert_eq!(method.bindable_parameters().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    id: MethodId,
    parameters: Vec<Parameter>,
    return_shape: ReturnShape,
    domain_type: DomainType,
}

impl MethodDescriptor {
    pub fn builder(
        repository: impl Into<String>,
        name: impl Into<String>,
        domain_type: DomainType,
    ) -> MethodDescriptorBuilder {
        MethodDescriptorBuilder {
            id: MethodId::new(repository, name),
            parameters: Vec::new(),
            return_shape: ReturnShape::default(),
            domain_type,
        }
    }

    pub fn id(&self) -> &MethodId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.id.name()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn return_shape(&self) -> ReturnShape {
        self.return_shape
    }

    pub fn domain_type(&self) -> &DomainType {
        &self.domain_type
    }

    /// Value parameters in declaration order. Their order defines the
    /// positional indices used by templates and by the argument accessor.
    pub fn bindable_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.is_bindable())
    }

    /// Name under which a named query for this method is registered:
    /// `<DomainType>.<method>`.
    pub fn named_query_name(&self) -> String {
        format!("{}.{}", self.domain_type, self.id.name())
    }
}

/// Builder for [`MethodDescriptor`].
pub struct MethodDescriptorBuilder {
    id: MethodId,
    parameters: Vec<Parameter>,
    return_shape: ReturnShape,
    domain_type: DomainType,
}

impl MethodDescriptorBuilder {
    /// Adds a named value parameter.
    pub fn param(self, name: &str) -> Self {
        self.push(ParameterKind::Value {
            name: Some(name.to_string()),
        })
    }

    /// Adds a value parameter without a declared name. It can only be
    /// referenced positionally.
    pub fn unnamed_param(self) -> Self {
        self.push(ParameterKind::Value { name: None })
    }

    pub fn pageable(self) -> Self {
        self.push(ParameterKind::Pageable)
    }

    pub fn sort(self) -> Self {
        self.push(ParameterKind::Sort)
    }

    pub fn returns(mut self, shape: ReturnShape) -> Self {
        self.return_shape = shape;
        self
    }

    pub fn build(self) -> MethodDescriptor {
        MethodDescriptor {
            id: self.id,
            parameters: self.parameters,
            return_shape: self.return_shape,
            domain_type: self.domain_type,
        }
    }

    fn push(mut self, kind: ParameterKind) -> Self {
        let position = self.parameters.len();
        self.parameters.push(Parameter { position, kind });
        self
    }
}
