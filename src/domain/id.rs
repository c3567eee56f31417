//! Domain identifier types with proper encapsulation.
//!
//! Identifiers are opaque strings assigned by the store. Each table gets its
//! own newtype so a venue id can never be passed where a trial id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Create a new `", stringify!($name), "` from a string.")]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// Venue identifier (row of the `venues` table).
    VenueId
);

string_id!(
    /// Trial identifier (row of the `trials` table).
    TrialId
);

string_id!(
    /// Product identifier, shared by own and competitor products.
    ProductId
);

string_id!(
    /// Outcome reason identifier.
    ReasonId
);

string_id!(
    /// Sales representative identifier.
    RepId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn venue_id_new_and_as_str() {
        let id = VenueId::new("venue-1");
        assert_eq!(id.as_str(), "venue-1");
    }

    #[test]
    fn trial_id_from_string_and_display() {
        let id = TrialId::from("trial-9".to_string());
        assert_eq!(format!("{id}"), "trial-9");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = RepId::from("rep-3");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"rep-3\"");

        let back: RepId = serde_json::from_str("\"rep-3\"").unwrap();
        assert_eq!(back, id);
    }
}
