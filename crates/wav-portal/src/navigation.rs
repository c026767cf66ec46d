use serde::{Deserialize, Serialize};

/// Views a finished flow can send the client to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Landing,
    Login,
    Register,
    Dashboard,
}

impl Page {
    pub const fn label(self) -> &'static str {
        match self {
            Page::Landing => "landing",
            Page::Login => "login",
            Page::Register => "register",
            Page::Dashboard => "dashboard",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_route_label() {
        for page in [Page::Landing, Page::Login, Page::Register, Page::Dashboard] {
            let encoded = serde_json::to_value(page).expect("page serializes");
            assert_eq!(encoded, serde_json::Value::from(page.label()));
        }
    }
}
