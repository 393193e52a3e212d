#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a [`CompositeDefinition`](crate::CompositeDefinition) from a name and
/// a list of alternative patterns.
///
/// ```
/// let def = amalgam::composite!("outfit" => ["@color @product", "@product in @color"]);
/// assert_eq!(def.patterns.len(), 2);
/// ```
#[macro_export]
macro_rules! composite {
    ($name:expr => [ $($pat:expr),* $(,)? ]) => {
        $crate::CompositeDefinition {
            name: ::std::string::ToString::to_string(&$name),
            patterns: vec![ $(::std::string::ToString::to_string(&$pat)),* ],
        }
    };
}
