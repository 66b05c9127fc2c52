//! Car change notifications published after a committed mutation.

use serde::{Deserialize, Serialize};

use dealership_events::Event;

use crate::car::Car;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CarEventKind {
    Create,
    Update,
    Delete,
}

impl CarEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarEventKind::Create => "CREATE",
            CarEventKind::Update => "UPDATE",
            CarEventKind::Delete => "DELETE",
        }
    }
}

/// Wire shape: `{"eventType": "CREATE"|"UPDATE"|"DELETE", "car": {...}}`.
///
/// `car` is the post-mutation row for CREATE/UPDATE and the pre-delete row for DELETE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarEvent {
    #[serde(rename = "eventType")]
    pub event_type: CarEventKind,
    pub car: Car,
}

impl CarEvent {
    pub fn new(event_type: CarEventKind, car: Car) -> Self {
        Self { event_type, car }
    }

    pub fn created(car: Car) -> Self {
        Self::new(CarEventKind::Create, car)
    }

    pub fn updated(car: Car) -> Self {
        Self::new(CarEventKind::Update, car)
    }

    pub fn deleted(car: Car) -> Self {
        Self::new(CarEventKind::Delete, car)
    }
}

impl Event for CarEvent {
    fn event_type(&self) -> &'static str {
        self.event_type.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealership_core::{CarId, DealerId};

    fn car() -> Car {
        Car {
            id: CarId::new(11),
            firm: "Toyota".to_string(),
            model: "Camry".to_string(),
            year: 2019,
            power: 181,
            color: None,
            price: 2_500_000,
            dealer_id: DealerId::new(2),
        }
    }

    #[test]
    fn encodes_to_sink_payload_shape() {
        let payload = dealership_events::encode(&CarEvent::deleted(car())).unwrap();
        let v: serde_json::Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(v["eventType"], "DELETE");
        assert_eq!(v["car"]["id"], 11);
        assert_eq!(v["car"]["firm"], "Toyota");
        assert_eq!(v["car"]["dealer_id"], 2);
        assert!(v["car"]["color"].is_null());
        assert_eq!(v.as_object().unwrap().len(), 2);
    }

    #[test]
    fn event_type_tag_matches_kind() {
        assert_eq!(CarEvent::created(car()).event_type(), "CREATE");
        assert_eq!(CarEvent::updated(car()).event_type(), "UPDATE");
        assert_eq!(CarEvent::deleted(car()).event_type(), "DELETE");
    }
}
