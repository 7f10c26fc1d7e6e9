use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::record::{require_text, Entity, Meta, RecordError};
use crate::database::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmploymentStatus {
    #[default]
    Active,
    OnLeave,
    Suspended,
    Terminated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    #[serde(flatten)]
    pub meta: Meta,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub employment_status: EmploymentStatus,
    #[serde(default)]
    pub subjects: Vec<Uuid>,
    #[serde(default)]
    pub classes: Vec<Uuid>,
    #[serde(default)]
    pub user: Option<Uuid>,
}

impl Staff {
    /// Add a subject. Returns false if it was already assigned.
    pub fn assign_subject(&mut self, subject: Uuid) -> bool {
        add_unique(&mut self.subjects, subject)
    }

    pub fn unassign_subject(&mut self, subject: Uuid) -> bool {
        remove_all(&mut self.subjects, subject)
    }

    pub fn assign_class(&mut self, class: Uuid) -> bool {
        add_unique(&mut self.classes, class)
    }

    pub fn unassign_class(&mut self, class: Uuid) -> bool {
        remove_all(&mut self.classes, class)
    }
}

fn add_unique(list: &mut Vec<Uuid>, id: Uuid) -> bool {
    if list.contains(&id) {
        false
    } else {
        list.push(id);
        true
    }
}

fn remove_all(list: &mut Vec<Uuid>, id: Uuid) -> bool {
    let before = list.len();
    list.retain(|existing| *existing != id);
    list.len() != before
}

impl Entity for Staff {
    const COLLECTION: Collection = Collection::Staff;
    const LABEL: &'static str = "Staff member";

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn managed_fields() -> &'static [&'static str] {
        &["user"]
    }

    fn recompute(&mut self) {
        self.email = self.email.trim().to_lowercase();
        let mut seen = Vec::with_capacity(self.subjects.len());
        self.subjects.retain(|id| add_unique(&mut seen, *id));
        let mut seen = Vec::with_capacity(self.classes.len());
        self.classes.retain(|id| add_unique(&mut seen, *id));
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_text("fullName", &self.full_name)?;
        require_text("email", &self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::record::from_api_input;
    use serde_json::json;

    #[test]
    fn defaults_and_deduplicates_assignments() {
        let subject = Uuid::new_v4();
        let staff: Staff = from_api_input(json!({
            "fullName": "Grace Akello",
            "email": "Grace@School.org",
            "subjects": [subject, subject],
            "user": Uuid::new_v4()
        }))
        .unwrap();

        assert_eq!(staff.employment_status, EmploymentStatus::Active);
        assert_eq!(staff.subjects, vec![subject]);
        assert_eq!(staff.email, "grace@school.org");
        assert!(staff.user.is_none());
    }

    #[test]
    fn assignment_helpers_report_changes() {
        let mut staff: Staff = from_api_input(json!({"fullName": "A", "email": "a@b.c"})).unwrap();
        let class = Uuid::new_v4();
        assert!(staff.assign_class(class));
        assert!(!staff.assign_class(class));
        assert!(staff.unassign_class(class));
        assert!(!staff.unassign_class(class));
    }
}
