use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(RunId, "Identifies one end-to-end pipeline execution.");
uuid_id!(KeywordId, "Identifies one Keyword within a Run.");
uuid_id!(ClusterId, "Identifies one semantic Cluster within a Run.");
uuid_id!(JobId, "Identifies one orchestrator Job within a Run.");
uuid_id!(RoadmapItemId, "Identifies one scheduled roadmap entry.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_roundtrips_through_parse() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ids_of_different_kinds_are_distinct_types() {
        let run = RunId::new();
        let job = JobId::from_uuid(run.as_uuid());
        assert_eq!(run.as_uuid(), job.as_uuid());
    }
}
