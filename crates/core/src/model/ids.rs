use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a string-backed block identifier.
///
/// Block ids come from the content service verbatim (`block-v1:...` keys or
/// short test ids), so they are kept as owned strings rather than parsed.
macro_rules! block_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the raw id string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

block_id!(
    /// Identifier of a course run.
    CourseId
);
block_id!(
    /// Identifier of a top-level section (chapter).
    SectionId
);
block_id!(
    /// Identifier of a sequence (subsection).
    SequenceId
);
block_id!(
    /// Identifier of a unit (vertical), the leaf of the course hierarchy.
    UnitId
);

impl SequenceId {
    /// Re-reads this id as a unit id.
    ///
    /// Deep links sometimes carry a unit key in the sequence slot.
    #[must_use]
    pub fn as_unit(&self) -> UnitId {
        UnitId::new(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prints_raw_id() {
        let id = SequenceId::new("block-v1:edX+Demo+2024+type@sequential+block@intro");
        assert_eq!(
            id.to_string(),
            "block-v1:edX+Demo+2024+type@sequential+block@intro"
        );
    }

    #[test]
    fn debug_names_the_kind() {
        assert_eq!(format!("{:?}", UnitId::new("u1")), "UnitId(u1)");
        assert_eq!(format!("{:?}", SectionId::new("s1")), "SectionId(s1)");
    }

    #[test]
    fn sequence_id_reinterprets_as_unit() {
        let id = SequenceId::from("u7");
        assert_eq!(id.as_unit(), UnitId::new("u7"));
    }
}
