//! Builtin registry: names the runtime provides, and the reserved-name
//! protocol that keeps compiler-internal identifiers from colliding with
//! user names.
//!
//! Each builtin maps to the list of standard C headers its generated call
//! site needs; the C backend unions these across a program and sorts them
//! into the `standard_libraries` slot.

/// name -> headers it needs `#include`d.
const BUILTIN_TABLE: &[(&str, &[&str])] = &[
    ("print", &["stdio.h"]),
    ("pow", &["math.h"]),
    ("__add__", &[]),
    ("__subtract__", &[]),
    ("__multiply__", &[]),
    ("__integer_divide__", &[]),
    ("__modular_divide__", &[]),
    ("__concat__", &["string.h", "stdlib.h"]),
    ("__lt__", &[]),
    ("__gt__", &[]),
    ("__lte__", &[]),
    ("__gte__", &[]),
    ("__eq__", &[]),
    ("__neq__", &[]),
    ("__negate__", &[]),
    ("__field__", &["string.h"]),
    ("__get__", &[]),
    ("__unit__", &[]),
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_TABLE.iter().any(|(n, _)| *n == name)
}

/// Headers required by a builtin call, empty slice if the builtin needs
/// none or the name is not a builtin at all.
pub fn headers_for(name: &str) -> &'static [&'static str] {
    BUILTIN_TABLE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, headers)| *headers)
        .unwrap_or(&[])
}

/// True for identifiers reserved for compiler-generated names: any name
/// both beginning and ending with a double underscore (the desugared
/// operator / builtin convention, `__add__`), and any name containing a
/// `$` at all (fresh normalization temporaries `$0`, `$1`, ... and
/// per-name SIR labels like `f$0`).
pub fn is_reserved_name(name: &str) -> bool {
    (name.starts_with("__") && name.ends_with("__")) || name.contains('$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_builtins() {
        assert!(is_builtin("print"));
        assert!(is_builtin("__add__"));
        assert!(!is_builtin("my_function"));
    }

    #[test]
    fn print_requires_stdio() {
        assert_eq!(headers_for("print"), &["stdio.h"]);
    }

    #[test]
    fn fresh_variable_names_are_reserved() {
        assert!(is_reserved_name("$0"));
        assert!(is_reserved_name("$42"));
        assert!(is_reserved_name("$"));
    }

    #[test]
    fn any_name_containing_dollar_is_reserved() {
        assert!(is_reserved_name("f$0"));
        assert!(is_reserved_name("__lambda$3"));
    }

    #[test]
    fn dunder_convention_is_reserved() {
        assert!(is_reserved_name("__add__"));
        assert!(!is_reserved_name("__hidden"));
        assert!(!is_reserved_name("hidden__"));
        assert!(!is_reserved_name("ordinary_name"));
    }
}
