#[macro_export]
macro_rules! value {
    ($val:expr) => {
        $crate::core::expression::Operand::Value($crate::core::value::Value::from($val))
    };
}

/// Trusted raw SQL, exempt from quoting and parameterization.
#[macro_export]
macro_rules! raw {
    ($sql:expr) => {
        $crate::core::expression::Expression::new($sql)
    };
}

#[macro_export]
macro_rules! ident {
    ($name:expr) => {
        $crate::core::expression::Ident::Name($name.to_string())
    };
    ($qualifier:expr, $name:expr) => {
        $crate::core::expression::Ident::Name(format!("{}.{}", $qualifier, $name))
    };
}

/// Creates an aliased identifier, e.g. `ident_as!("users", "u")` for `users as u`.
#[macro_export]
macro_rules! ident_as {
    ($name:expr, $alias:expr) => {
        $crate::core::expression::Ident::Name(format!("{} as {}", $name, $alias))
    };
    ($qualifier:expr, $name:expr, $alias:expr) => {
        $crate::core::expression::Ident::Name(format!("{}.{} as {}", $qualifier, $name, $alias))
    };
}
