//! C++ type descriptors parsed from parser type spellings.

use std::fmt;

/// Parse comma-separated template arguments, respecting nested templates
/// and parenthesized function types.
/// Returns a vector of trimmed argument strings.
///
/// # Example
/// ```ignore
/// let args = parse_template_args("int, ea::vector<int>, double");
/// assert_eq!(args, vec!["int", "ea::vector<int>", "double"]);
/// ```
pub fn parse_template_args(args: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;

    for ch in args.chars() {
        match ch {
            '<' | '(' => {
                depth += 1;
                current.push(ch);
            }
            '>' | ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                let trimmed = current.trim().to_string();
                if !trimmed.is_empty() {
                    result.push(trimmed);
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    let trimmed = current.trim().to_string();
    if !trimmed.is_empty() {
        result.push(trimmed);
    }

    result
}

/// A C++ type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CppType {
    /// void
    Void,
    /// bool
    Bool,
    /// char, signed char, unsigned char
    Char { signed: bool },
    /// wchar_t, char16_t, char32_t
    WideChar { bits: u8 },
    /// short, unsigned short
    Short { signed: bool },
    /// int, unsigned int
    Int { signed: bool },
    /// long, unsigned long
    Long { signed: bool },
    /// long long, unsigned long long
    LongLong { signed: bool },
    /// float
    Float,
    /// double
    Double,
    /// long double
    LongDouble,
    /// std::nullptr_t
    NullPtr,
    /// Pointer type: T*
    Pointer {
        pointee: Box<CppType>,
        /// Whether the pointee is const (`const T*`)
        is_const: bool,
    },
    /// Reference type: T& (lvalue) or T&& (rvalue)
    Reference {
        referent: Box<CppType>,
        is_const: bool,
        /// Whether this is an rvalue reference (T&&) vs lvalue reference (T&)
        is_rvalue: bool,
    },
    /// Array type: T[N]
    Array {
        element: Box<CppType>,
        size: Option<usize>,
    },
    /// Named type (struct, class, enum, typedef), as spelled
    Named(String),
    /// Template instantiation: `Name<Args...>`
    Template { name: String, args: Vec<CppType> },
    /// Anything we don't model (function types, decltype, lambdas).
    /// Always handled as an opaque handle.
    Opaque(String),
}

impl CppType {
    /// Create a signed int type.
    pub fn int() -> Self {
        CppType::Int { signed: true }
    }

    /// Create an unsigned int type.
    pub fn uint() -> Self {
        CppType::Int { signed: false }
    }

    pub fn named(name: impl Into<String>) -> Self {
        CppType::Named(name.into())
    }

    /// Create a pointer to this type.
    pub fn ptr(self) -> Self {
        CppType::Pointer {
            pointee: Box::new(self),
            is_const: false,
        }
    }

    /// Create a const pointer to this type.
    pub fn const_ptr(self) -> Self {
        CppType::Pointer {
            pointee: Box::new(self),
            is_const: true,
        }
    }

    /// Create a const lvalue reference to this type.
    pub fn const_ref(self) -> Self {
        CppType::Reference {
            referent: Box::new(self),
            is_const: true,
            is_rvalue: false,
        }
    }

    /// Parse a type spelling such as `const Urho3D::Vector3 &`.
    pub fn parse(spelling: &str) -> Self {
        parse_qualified(spelling).0
    }

    /// Look up a builtin type by its spelling.
    pub fn builtin(spelling: &str) -> Option<Self> {
        let normalized = spelling.split_whitespace().collect::<Vec<_>>().join(" ");
        let ty = match normalized.as_str() {
            "void" => CppType::Void,
            "bool" | "_Bool" => CppType::Bool,
            "char" | "signed char" => CppType::Char { signed: true },
            "unsigned char" | "char8_t" => CppType::Char { signed: false },
            "wchar_t" => CppType::WideChar { bits: 32 },
            "char16_t" => CppType::WideChar { bits: 16 },
            "char32_t" => CppType::WideChar { bits: 32 },
            "short" | "short int" | "signed short" | "signed short int" => {
                CppType::Short { signed: true }
            }
            "unsigned short" | "unsigned short int" => CppType::Short { signed: false },
            "int" | "signed" | "signed int" => CppType::Int { signed: true },
            "unsigned" | "unsigned int" => CppType::Int { signed: false },
            "long" | "long int" | "signed long" | "signed long int" => {
                CppType::Long { signed: true }
            }
            "unsigned long" | "unsigned long int" => CppType::Long { signed: false },
            "long long" | "long long int" | "signed long long" | "signed long long int" => {
                CppType::LongLong { signed: true }
            }
            "unsigned long long" | "unsigned long long int" => CppType::LongLong { signed: false },
            "float" => CppType::Float,
            "double" => CppType::Double,
            "long double" => CppType::LongDouble,
            "std::nullptr_t" | "nullptr_t" | "decltype(nullptr)" => CppType::NullPtr,
            _ => return None,
        };
        Some(ty)
    }

    /// Whether this is a language builtin (not a user or library type).
    pub fn is_builtin(&self) -> bool {
        matches!(
            self,
            CppType::Void
                | CppType::Bool
                | CppType::Char { .. }
                | CppType::WideChar { .. }
                | CppType::Short { .. }
                | CppType::Int { .. }
                | CppType::Long { .. }
                | CppType::LongLong { .. }
                | CppType::Float
                | CppType::Double
                | CppType::LongDouble
                | CppType::NullPtr
        )
    }

    /// Builtin numeric or boolean type (anything a literal constant can have).
    pub fn is_numeric_or_bool(&self) -> bool {
        self.is_builtin() && !matches!(self, CppType::Void | CppType::NullPtr)
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            CppType::Char { signed: false }
                | CppType::Short { signed: false }
                | CppType::Int { signed: false }
                | CppType::Long { signed: false }
                | CppType::LongLong { signed: false }
        )
    }

    pub fn is_void(&self) -> bool {
        matches!(self, CppType::Void)
    }

    /// `const char*` / `char*`.
    pub fn is_c_string(&self) -> bool {
        matches!(self, CppType::Pointer { pointee, .. } if matches!(**pointee, CppType::Char { signed: true }))
    }

    /// Follow pointers, references and arrays down to the underlying type.
    pub fn strip(&self) -> &CppType {
        match self {
            CppType::Pointer { pointee, .. } => pointee.strip(),
            CppType::Reference { referent, .. } => referent.strip(),
            CppType::Array { element, .. } => element.strip(),
            other => other,
        }
    }

    /// Drop a top-level reference, keeping everything below it.
    pub fn without_reference(&self) -> &CppType {
        match self {
            CppType::Reference { referent, .. } => referent,
            other => other,
        }
    }

    /// The same type with the constness of a top-level pointee dropped
    /// (`const Node*` becomes `Node*`).
    pub fn without_pointee_const(&self) -> CppType {
        match self {
            CppType::Pointer { pointee, .. } => CppType::Pointer {
                pointee: pointee.clone(),
                is_const: false,
            },
            other => other.clone(),
        }
    }

    /// Name of a named or template type (`Urho3D::FlagSet` for `Urho3D::FlagSet<T>`).
    pub fn name(&self) -> Option<&str> {
        match self {
            CppType::Named(name) => Some(name),
            CppType::Template { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for CppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CppType::Void => write!(f, "void"),
            CppType::Bool => write!(f, "bool"),
            CppType::Char { signed: true } => write!(f, "char"),
            CppType::Char { signed: false } => write!(f, "unsigned char"),
            CppType::WideChar { bits: 16 } => write!(f, "char16_t"),
            CppType::WideChar { .. } => write!(f, "char32_t"),
            CppType::Short { signed: true } => write!(f, "short"),
            CppType::Short { signed: false } => write!(f, "unsigned short"),
            CppType::Int { signed: true } => write!(f, "int"),
            CppType::Int { signed: false } => write!(f, "unsigned int"),
            CppType::Long { signed: true } => write!(f, "long"),
            CppType::Long { signed: false } => write!(f, "unsigned long"),
            CppType::LongLong { signed: true } => write!(f, "long long"),
            CppType::LongLong { signed: false } => write!(f, "unsigned long long"),
            CppType::Float => write!(f, "float"),
            CppType::Double => write!(f, "double"),
            CppType::LongDouble => write!(f, "long double"),
            CppType::NullPtr => write!(f, "std::nullptr_t"),
            CppType::Pointer { pointee, is_const } => {
                if *is_const {
                    write!(f, "const ")?;
                }
                write!(f, "{pointee} *")
            }
            CppType::Reference {
                referent,
                is_const,
                is_rvalue,
            } => {
                if *is_const {
                    write!(f, "const ")?;
                }
                write!(f, "{referent} {}", if *is_rvalue { "&&" } else { "&" })
            }
            CppType::Array { element, size } => match size {
                Some(n) => write!(f, "{element}[{n}]"),
                None => write!(f, "{element}[]"),
            },
            CppType::Named(name) => write!(f, "{}", name.trim_start_matches("::")),
            CppType::Template { name, args } => {
                write!(f, "{}<", name.trim_start_matches("::"))?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
            CppType::Opaque(spelling) => write!(f, "{spelling}"),
        }
    }
}

/// Type of a declaration: the type as written plus its canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDesc {
    /// Type as spelled at the declaration (may be unqualified or an alias)
    pub written: CppType,
    /// Fully desugared type as resolved by the parser
    pub canonical: CppType,
    /// Top-level `const`
    pub is_const: bool,
}

impl TypeDesc {
    /// Build a descriptor from the parser's written and desugared spellings.
    pub fn from_spellings(written: &str, desugared: Option<&str>) -> Self {
        let (written_ty, written_const) = parse_qualified(written);
        let (canonical, canonical_const) = match desugared {
            Some(spelling) => parse_qualified(spelling),
            None => (written_ty.clone(), written_const),
        };
        Self {
            written: written_ty,
            canonical,
            is_const: written_const || canonical_const,
        }
    }

    pub fn new(ty: CppType) -> Self {
        Self {
            written: ty.clone(),
            canonical: ty,
            is_const: false,
        }
    }

    pub fn with_const(mut self, is_const: bool) -> Self {
        self.is_const = is_const;
        self
    }

    /// The value type with top-level const and reference qualification removed.
    ///
    /// `const Vector3&` and `Vector3` normalize to the same type.
    pub fn value_type(&self) -> &CppType {
        self.canonical.without_reference()
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            write!(f, "const ")?;
        }
        write!(f, "{}", self.written)
    }
}

/// Parse a spelling into a type plus its top-level constness.
pub fn parse_qualified(spelling: &str) -> (CppType, bool) {
    let s = spelling.trim();
    if s.is_empty() {
        return (CppType::Opaque(String::new()), false);
    }

    if let Some(rest) = s.strip_suffix("&&") {
        let (referent, is_const) = parse_qualified(rest);
        return (
            CppType::Reference {
                referent: Box::new(referent),
                is_const,
                is_rvalue: true,
            },
            false,
        );
    }
    if let Some(rest) = s.strip_suffix('&') {
        let (referent, is_const) = parse_qualified(rest);
        return (
            CppType::Reference {
                referent: Box::new(referent),
                is_const,
                is_rvalue: false,
            },
            false,
        );
    }
    if let Some(rest) = s.strip_suffix('*') {
        let (pointee, is_const) = parse_qualified(rest);
        return (
            CppType::Pointer {
                pointee: Box::new(pointee),
                is_const,
            },
            false,
        );
    }
    for qualifier in ["const", "volatile"] {
        if let Some(rest) = strip_trailing_keyword(s, qualifier) {
            let (ty, is_const) = parse_qualified(rest);
            return (ty, is_const || qualifier == "const");
        }
    }
    if s.ends_with(']') {
        if let Some(open) = s.rfind('[') {
            let size = s[open + 1..s.len() - 1].trim().parse().ok();
            let (element, is_const) = parse_qualified(&s[..open]);
            return (
                CppType::Array {
                    element: Box::new(element),
                    size,
                },
                is_const,
            );
        }
    }
    if s.ends_with(')') {
        return (CppType::Opaque(s.to_string()), false);
    }

    for qualifier in ["const ", "volatile "] {
        if let Some(rest) = s.strip_prefix(qualifier) {
            let (ty, is_const) = parse_qualified(rest);
            return (ty, is_const || qualifier == "const ");
        }
    }
    for tag in ["struct ", "class ", "enum ", "union ", "typename "] {
        if let Some(rest) = s.strip_prefix(tag) {
            return parse_qualified(rest);
        }
    }

    if let Some(builtin) = CppType::builtin(s) {
        return (builtin, false);
    }

    if s.ends_with('>') {
        if let Some(open) = matching_open_angle(s) {
            let name = s[..open].trim().to_string();
            let args = parse_template_args(&s[open + 1..s.len() - 1])
                .iter()
                .map(|arg| CppType::parse(arg))
                .collect();
            return (CppType::Template { name, args }, false);
        }
    }

    (CppType::Named(s.to_string()), false)
}

/// Strip `keyword` from the end of `s` when it stands as its own token.
fn strip_trailing_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = s.strip_suffix(keyword)?;
    match rest.chars().last() {
        None => None,
        Some(c) if c.is_alphanumeric() || c == '_' || c == ':' => None,
        Some(_) => Some(rest),
    }
}

/// Index of the `<` matching the final `>` of `s`.
fn matching_open_angle(s: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, ch) in s.char_indices().rev() {
        match ch {
            '>' => depth += 1,
            '<' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a function type spelling (`const Vector3 &(int) const`) into its
/// return type spelling and whether the function is const-qualified.
pub fn split_function_spelling(spelling: &str) -> Option<(String, bool)> {
    let mut s = spelling.trim();
    if let Some(idx) = s.rfind(") -> ") {
        // Trailing return type: `auto (int) -> float`
        return Some((s[idx + 5..].trim().to_string(), false));
    }

    let mut is_const = false;
    loop {
        if let Some(rest) = s.strip_suffix("noexcept") {
            s = rest.trim_end();
        } else if let Some(rest) = strip_trailing_keyword(s, "const") {
            is_const = true;
            s = rest.trim_end();
        } else if let Some(rest) = strip_trailing_keyword(s, "volatile") {
            s = rest.trim_end();
        } else if let Some(rest) = s.strip_suffix("&&") {
            s = rest.trim_end();
        } else if let Some(rest) = s.strip_suffix('&') {
            s = rest.trim_end();
        } else {
            break;
        }
    }

    if !s.ends_with(')') {
        return None;
    }
    let mut depth = 0i32;
    for (i, ch) in s.char_indices().rev() {
        match ch {
            ')' => depth += 1,
            '(' => {
                depth -= 1;
                if depth == 0 {
                    return Some((s[..i].trim().to_string(), is_const));
                }
            }
            _ => {}
        }
    }
    None
}
