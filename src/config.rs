use std::env;
use std::fmt::Debug;
use std::str::FromStr;

/// Returns the value of the named environment variable if it exists or panics.
pub fn get_variable(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("must define {} environment variable", name))
}

/// Parses the named environment variable or panics.
pub fn parse_variable<T: FromStr>(name: &str) -> T
where
    T::Err: Debug,
{
    let raw = get_variable(name);

    raw.parse()
        .unwrap_or_else(|e| panic!("parse {} ({:?}): {:?}", name, raw, e))
}

/// Parses the named environment variable, falling back to `default`
/// when it is not set.
pub fn parse_variable_or<T: FromStr>(name: &str, default: T) -> T
where
    T::Err: Debug,
{
    match env::var(name) {
        Ok(_) => parse_variable(name),
        Err(_) => default,
    }
}
