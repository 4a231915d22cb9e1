//! Booking request validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::Holder;
use crate::ids::{SlotId, UnitId};

/// A request to book a slot, as received from the API surface.
///
/// Field names follow the client wire contract (`id`, `fullName`, `unitId`).
/// Validation happens before any store interaction: all fields present and
/// non-empty, email well-formed.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(rename = "id")]
    pub slot_id: SlotId,
    #[validate(length(min = 1, message = "fullName must not be empty"))]
    pub full_name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "phone must not be empty"))]
    pub phone: String,
    pub unit_id: UnitId,
}

impl BookingRequest {
    /// The holder details to attach to the slot row.
    pub fn holder(&self) -> Holder {
        Holder {
            name: self.full_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn valid_request() -> BookingRequest {
        BookingRequest {
            slot_id: SlotId::from_i64(1),
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "555-0100".to_string(),
            unit_id: UnitId::from_i64(2),
        }
    }

    #[test]
    fn accepts_complete_request() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn rejects_empty_name() {
        let mut req = valid_request();
        req.full_name.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_malformed_email() {
        let mut req = valid_request();
        req.email = "not-an-address".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn deserializes_client_field_names() {
        let req: BookingRequest = serde_json::from_str(
            r#"{"id":5,"fullName":"Ada","email":"ada@example.com","phone":"555-0100","unitId":2}"#,
        )
        .unwrap();
        assert_eq!(req.slot_id, SlotId::from_i64(5));
        assert_eq!(req.unit_id, UnitId::from_i64(2));
    }

    #[test]
    fn holder_copies_contact_fields() {
        let holder = valid_request().holder();
        assert_eq!(holder.name, "Ada Lovelace");
        assert_eq!(holder.phone, "555-0100");
    }
}
