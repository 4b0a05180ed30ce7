use crate::db::StoreError;
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
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(DoseStatus {
    Taken => "taken",
    Missed => "missed",
    Skipped => "skipped",
    Delayed => "delayed",
});

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

impl AppointmentStatus {
    /// Statuses that occupy the doctor's calendar slot.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Confirmed)
    }

    /// Terminal statuses have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn dose_status_round_trip() {
        for (variant, s) in [
            (DoseStatus::Taken, "taken"),
            (DoseStatus::Missed, "missed"),
            (DoseStatus::Skipped, "skipped"),
            (DoseStatus::Delayed, "delayed"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(DoseStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn appointment_status_round_trip() {
        for (variant, s) in [
            (AppointmentStatus::Scheduled, "scheduled"),
            (AppointmentStatus::Confirmed, "confirmed"),
            (AppointmentStatus::Completed, "completed"),
            (AppointmentStatus::Cancelled, "cancelled"),
            (AppointmentStatus::NoShow, "no_show"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(AppointmentStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn blocking_and_terminal_partition() {
        for status in [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
        ] {
            assert_ne!(status.is_blocking(), status.is_terminal());
        }
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(DoseStatus::from_str("unknown").is_err());
        assert!(AppointmentStatus::from_str("").is_err());
        assert!(AppointmentStatus::from_str("no-show").is_err());
    }
}
