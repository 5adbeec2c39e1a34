use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form doubles as the JSON wire value.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
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

str_enum!(
    /// Canonical appointment status held by the store.
    AppointmentStatus {
        Scheduled => "scheduled",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

str_enum!(
    /// Booking status used by the hospital backend and the wider app.
    ///
    /// Richer than [`AppointmentStatus`]. Convert with `From<AppointmentStatus>`
    /// and [`BookingStatus::to_canonical`]; the two sets are never merged.
    BookingStatus {
        Scheduled => "scheduled",
        Confirmed => "confirmed",
        Completed => "completed",
        Cancelled => "cancelled",
        NoShow => "no-show",
    }
);

str_enum!(AppointmentType {
    Checkup => "checkup",
    Followup => "followup",
    Consultation => "consultation",
});

impl AppointmentStatus {
    /// Completed and cancelled appointments never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Only `scheduled → completed` and `scheduled → cancelled` are allowed.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Scheduled, Self::Completed) | (Self::Scheduled, Self::Cancelled)
        )
    }
}

impl BookingStatus {
    /// Collapse to the canonical set.
    ///
    /// | booking     | canonical  |
    /// |-------------|------------|
    /// | scheduled   | scheduled  |
    /// | confirmed   | scheduled  |
    /// | completed   | completed  |
    /// | cancelled   | cancelled  |
    /// | no-show     | cancelled  |
    ///
    /// `confirmed` and `no-show` do not survive a round trip.
    pub fn to_canonical(&self) -> AppointmentStatus {
        match self {
            Self::Scheduled | Self::Confirmed => AppointmentStatus::Scheduled,
            Self::Completed => AppointmentStatus::Completed,
            Self::Cancelled | Self::NoShow => AppointmentStatus::Cancelled,
        }
    }
}

impl From<AppointmentStatus> for BookingStatus {
    fn from(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Scheduled => Self::Scheduled,
            AppointmentStatus::Completed => Self::Completed,
            AppointmentStatus::Cancelled => Self::Cancelled,
        }
    }
}
