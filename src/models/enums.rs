use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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
    };
}

str_enum!(PatientStatus {
    Admitted => "admitted",
    Discharged => "discharged",
});

str_enum!(MedicationStatus {
    Active => "active",
    Stopped => "stopped",
});

str_enum!(AdministrationStatus {
    Administered => "administered",
    Missed => "missed",
    Refused => "refused",
    Held => "held",
});

str_enum!(AuditAction {
    PatientRegistered => "patient_registered",
    PatientDischarged => "patient_discharged",
    MedicationPrescribed => "medication_prescribed",
    MedicationStopped => "medication_stopped",
    AdministrationRecorded => "administration_recorded",
});
