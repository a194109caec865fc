use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an id from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map(Self::new).map_err(|_| ParseIdError {
                    kind: stringify!($name),
                })
            }
        }
    };
}

numeric_id!(
    /// Stable identity of an authenticated user.
    UserId
);
numeric_id!(
    /// Unique identifier for a project template.
    TemplateId
);
numeric_id!(
    /// Unique identifier for a step of a template.
    StepId
);
numeric_id!(
    /// Unique identifier for a quiz question.
    QuestionId
);
numeric_id!(
    /// Unique identifier for a recorded quiz attempt.
    AttemptId
);
numeric_id!(
    /// Unique identifier for a started project instance.
    InstanceId
);
numeric_id!(
    /// Unique identifier for a showcase submission.
    SubmissionId
);

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_id_display() {
        assert_eq!(StepId::new(42).to_string(), "42");
        assert_eq!(format!("{:?}", StepId::new(42)), "StepId(42)");
    }

    #[test]
    fn template_id_from_str() {
        let id: TemplateId = "123".parse().unwrap();
        assert_eq!(id, TemplateId::new(123));
    }

    #[test]
    fn from_str_rejects_garbage() {
        let err = "not-a-number".parse::<UserId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse UserId from string");
    }

    #[test]
    fn ids_order_numerically() {
        let mut ids = vec![StepId::new(3), StepId::new(1), StepId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![StepId::new(1), StepId::new(2), StepId::new(3)]);
    }
}
