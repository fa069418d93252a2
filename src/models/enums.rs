use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// Strings match the coded values exchanged with the FHIR server.
str_enum!(Ward {
    RegularWard => "regular ward",
    SemiIntensive => "semi-intensive unit",
    IntensiveCare => "intensive care unit",
    NoAllocation => "no allocation",
});

impl Ward {
    /// Lenient parse for remote codes: anything unrecognised is no allocation.
    pub fn from_code(code: &str) -> Self {
        code.trim().parse().unwrap_or(Self::NoAllocation)
    }
}

str_enum!(HealthStatus {
    Emergent => "emergent",
    SemiUrgent => "semi_urgent",
    Warning => "warning",
    Good => "good",
});

str_enum!(Gender {
    Female => "female",
    Male => "male",
});

impl Gender {
    /// Name prefix used on published Patient resources.
    pub fn name_prefix(&self) -> &'static str {
        match self {
            Self::Female => "Ms.",
            Self::Male => "Mr.",
        }
    }
}

// Clinical signals used as ranking keys.
str_enum!(Signal {
    TestResult => "test_result",
    DiseasePresence => "has_disease",
    Leukocytes => "leukocytes",
    Platelets => "platelets",
    MeanPlateletVolume => "mean_platelet_volume",
    Eosinophils => "eosinophils",
    Monocytes => "monocytes",
});

impl Signal {
    pub const ALL: [Signal; 7] = [
        Signal::TestResult,
        Signal::DiseasePresence,
        Signal::Leukocytes,
        Signal::Platelets,
        Signal::MeanPlateletVolume,
        Signal::Eosinophils,
        Signal::Monocytes,
    ];

    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::TestResult | Self::DiseasePresence)
    }
}
