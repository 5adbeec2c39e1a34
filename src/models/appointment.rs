use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::enums::{AppointmentStatus, AppointmentType, BookingStatus};
use super::ids::{AppointmentId, UserId};
use super::ModelError;

const TIME_FORMAT: &str = "%H:%M";

/// Time of day in 24-hour `HH:MM` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppointmentTime(NaiveTime);

impl AppointmentTime {
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, ModelError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(|| ModelError::InvalidTime(format!("{hour:02}:{minute:02}")))
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl std::str::FromStr for AppointmentTime {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // chrono accepts single-digit hours; the wire format does not.
        if s.len() != 5 {
            return Err(ModelError::InvalidTime(s.into()));
        }
        NaiveTime::parse_from_str(s, TIME_FORMAT)
            .map(Self)
            .map_err(|_| ModelError::InvalidTime(s.into()))
    }
}

impl std::fmt::Display for AppointmentTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(TIME_FORMAT))
    }
}

impl Serialize for AppointmentTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AppointmentTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Status as the service stores it, collapsed to the canonical set.
fn booking_status<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<AppointmentStatus, D::Error> {
    BookingStatus::deserialize(deserializer).map(|status| status.to_canonical())
}

/// An appointment that has not been persisted yet. Has no id and is not addressable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub patient_id: UserId,
    pub doctor_id: UserId,
    pub date: NaiveDate,
    pub time: AppointmentTime,
    #[serde(deserialize_with = "booking_status")]
    pub status: AppointmentStatus,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A persisted appointment, as returned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: UserId,
    pub doctor_id: UserId,
    pub date: NaiveDate,
    pub time: AppointmentTime,
    #[serde(deserialize_with = "booking_status")]
    pub status: AppointmentStatus,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Appointment {
    /// Attach a service-assigned id to a pending appointment.
    pub fn from_new(id: AppointmentId, new: NewAppointment) -> Self {
        Self {
            id,
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            date: new.date,
            time: new.time,
            status: new.status,
            appointment_type: new.appointment_type,
            notes: new.notes,
        }
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time.as_naive())
    }

    /// Cancelled appointments never count as upcoming.
    pub fn is_upcoming(&self, now: NaiveDateTime) -> bool {
        self.status != AppointmentStatus::Cancelled && self.starts_at() > now
    }
}
