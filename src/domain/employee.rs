use serde::{Deserialize, Serialize};

use crate::domain::ticket::{TicketId, lenient_string};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    #[serde(default)]
    pub id: TicketId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_employee_list() {
        let employees: Vec<Employee> =
            serde_json::from_str(r#"[{"id":3,"title":"Alice"},{"id":4}]"#).unwrap();

        assert_eq!(employees.len(), 2);
        assert_eq!(employees[0].title, "Alice");
        assert_eq!(employees[1].title, "");
    }
}
