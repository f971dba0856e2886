use serde::{Deserialize, Serialize};

/// One entry of an account's cookie jar. Injected into the browser context
/// verbatim, in jar order, before the first navigation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
}

/// A shop account owned by the operator. The automation core only ever reads
/// accounts; credential-refresh flows live elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub display_name: String,
    pub cookies: Vec<Cookie>,
    pub is_active: bool,
}

impl Account {
    pub fn cookie(name: &str, value: &str, domain: &str) -> Cookie {
        Cookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
        }
    }
}
