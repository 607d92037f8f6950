use std::fmt;

/// One generic type argument of an interface descriptor.
///
/// Descriptors built from Rust types via [`InterfaceDescriptor::of`] only ever
/// carry `Concrete` arguments (monomorphization resolves them); `Variable`
/// arguments appear when a descriptor is assembled from provider metadata
/// that left a parameter unsubstituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArg {
    Concrete(String),
    Variable(String),
}

impl TypeArg {
    pub fn concrete(name: impl Into<String>) -> Self {
        TypeArg::Concrete(name.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        TypeArg::Variable(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            TypeArg::Concrete(n) | TypeArg::Variable(n) => n,
        }
    }
}

/// Identity of one API surface: a raw type plus its ordered generic
/// arguments. A descriptor is usable for binding only when every argument is
/// concrete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    type_path: String,
    type_args: Vec<TypeArg>,
}

impl InterfaceDescriptor {
    /// Build a descriptor from metadata (the explicit construction form).
    pub fn new(type_path: impl Into<String>, type_args: Vec<TypeArg>) -> Self {
        Self {
            type_path: type_path.into(),
            type_args,
        }
    }

    /// Natural instantiation from a Rust type. Always fully resolved.
    pub fn of<T: ?Sized>() -> Self {
        Self {
            type_path: std::any::type_name::<T>().to_string(),
            type_args: Vec::new(),
        }
    }

    pub fn type_path(&self) -> &str {
        &self.type_path
    }

    pub fn type_args(&self) -> &[TypeArg] {
        &self.type_args
    }

    /// True when no generic argument is an unsubstituted variable.
    pub fn is_fully_resolved(&self) -> bool {
        self.first_unresolved().is_none()
    }

    /// Name of the first unresolved type variable, if any.
    pub fn first_unresolved(&self) -> Option<&str> {
        self.type_args.iter().find_map(|arg| match arg {
            TypeArg::Variable(name) => Some(name.as_str()),
            TypeArg::Concrete(_) => None,
        })
    }
}

// Display as `path<A, B>` to keep error messages readable.
impl fmt::Display for InterfaceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_path)?;
        if !self.type_args.is_empty() {
            let args: Vec<&str> = self.type_args.iter().map(|a| a.name()).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        Ok(())
    }
}
