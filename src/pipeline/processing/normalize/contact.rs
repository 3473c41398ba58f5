use serde::Deserialize;

/// Structured contact blob stored as JSON text on each raw student row.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub mailing_address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// A mailing address split into its four comma separated parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MailingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// Flattened contact fields as they land on the cleaned row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactFields {
    pub email: String,
    pub address: MailingAddress,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContactDecode {
    Decoded(ContactInfo),
    Malformed(String),
    Absent,
}

pub fn decode_contact_info(raw: Option<&str>) -> ContactDecode {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => ContactDecode::Absent,
        Some(text) => match serde_json::from_str::<ContactInfo>(text) {
            Ok(info) => ContactDecode::Decoded(info),
            Err(e) => ContactDecode::Malformed(e.to_string()),
        },
    }
}

/// Splits `street, city, state, zip`. Anything other than four parts yields
/// an empty address.
pub fn split_mailing_address(address: &str) -> Option<MailingAddress> {
    let parts: Vec<&str> = address.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [street, city, state, zip_code] => Some(MailingAddress {
            street: street.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            zip_code: zip_code.to_string(),
        }),
        _ => None,
    }
}

impl ContactDecode {
    /// Flattens the decode result. Returns the fields plus a note when the
    /// blob or its address could not be used.
    pub fn flatten(self) -> (ContactFields, Option<String>) {
        let info = match self {
            ContactDecode::Decoded(info) => info,
            ContactDecode::Malformed(reason) => {
                return (ContactFields::default(), Some(format!("malformed contact_info: {}", reason)))
            }
            ContactDecode::Absent => return (ContactFields::default(), None),
        };

        let email = info.email.unwrap_or_default();
        match info.mailing_address.as_deref() {
            Some(address) => match split_mailing_address(address) {
                Some(address) => (ContactFields { email, address }, None),
                None => (
                    ContactFields {
                        email,
                        address: MailingAddress::default(),
                    },
                    Some(format!("unsplittable mailing_address: {}", address)),
                ),
            },
            None => (
                ContactFields {
                    email,
                    address: MailingAddress::default(),
                },
                None,
            ),
        }
    }
}
