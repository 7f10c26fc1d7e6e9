use std::sync::Arc;

use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::{DocQuery, DocumentStore, Repository};
use crate::error::ApiError;
use crate::models::parent::Relationship;
use crate::models::student::ParentLink;
use crate::models::{Parent, Student, User};

#[derive(Debug, thiserror::Error)]
pub enum FamilyError {
    #[error("Parent is already linked to this student")]
    AlreadyLinked,
    #[error("Parent is not linked to this student")]
    NotLinked,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<FamilyError> for ApiError {
    fn from(err: FamilyError) -> Self {
        match err {
            FamilyError::Database(e) => e.into(),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

/// Keeps `Student.parents` and `Parent.students` in step.
pub struct FamilyLinks {
    students: Repository<Student>,
    parents: Repository<Parent>,
    users: Repository<User>,
}

impl FamilyLinks {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            students: Repository::new(store.clone()),
            parents: Repository::new(store.clone()),
            users: Repository::new(store),
        }
    }

    /// Link both sides. `relationship` defaults to the parent's own.
    pub async fn link(
        &self,
        student_id: Uuid,
        parent_id: Uuid,
        relationship: Option<Relationship>,
        primary: bool,
    ) -> Result<(Student, Parent), FamilyError> {
        let mut student = self.students.select_404(student_id).await?;
        let mut parent = self.parents.select_404(parent_id).await?;

        let added = student.link_parent(ParentLink {
            parent: parent_id,
            relationship: relationship.unwrap_or(parent.relationship),
            is_primary_contact: primary,
        });
        if !added {
            return Err(FamilyError::AlreadyLinked);
        }
        self.students.save(&mut student).await?;

        if parent.link_student(student_id) {
            self.parents.save(&mut parent).await?;
        }
        tracing::info!("Linked parent {} to student {}", parent_id, student_id);
        Ok((student, parent))
    }

    pub async fn unlink(&self, student_id: Uuid, parent_id: Uuid) -> Result<(Student, Parent), FamilyError> {
        let mut student = self.students.select_404(student_id).await?;
        let mut parent = self.parents.select_404(parent_id).await?;

        let on_student = student.unlink_parent(parent_id);
        let on_parent = parent.unlink_student(student_id);
        if !on_student && !on_parent {
            return Err(FamilyError::NotLinked);
        }
        if on_student {
            self.students.save(&mut student).await?;
        }
        if on_parent {
            self.parents.save(&mut parent).await?;
        }
        tracing::info!("Unlinked parent {} from student {}", parent_id, student_id);
        Ok((student, parent))
    }

    pub async fn set_primary_contact(&self, student_id: Uuid, parent_id: Uuid) -> Result<Student, FamilyError> {
        let mut student = self.students.select_404(student_id).await?;
        self.parents.select_404(parent_id).await?;

        if !student.set_primary_contact(parent_id) {
            return Err(FamilyError::NotLinked);
        }
        self.students.save(&mut student).await?;
        Ok(student)
    }

    /// Drop a deleted student from every parent that lists it.
    pub async fn forget_student(&self, student_id: Uuid) -> Result<usize, DatabaseError> {
        let parents = self.parents.select_any(DocQuery::new().any("students", student_id)).await?;
        let count = parents.len();
        for mut parent in parents {
            parent.unlink_student(student_id);
            self.parents.save(&mut parent).await?;
        }
        Ok(count)
    }

    /// Drop a deleted parent from its students and detach its login accounts.
    pub async fn forget_parent(&self, parent_id: Uuid) -> Result<usize, DatabaseError> {
        let students = self
            .students
            .select_any(DocQuery::new().any("parents", serde_json::json!({ "parent": parent_id })))
            .await?;
        let count = students.len();
        for mut student in students {
            student.unlink_parent(parent_id);
            self.students.save(&mut student).await?;
        }

        for mut user in self.users.select_any(DocQuery::new().eq("parentId", parent_id)).await? {
            user.parent_id = None;
            self.users.save(&mut user).await?;
        }
        Ok(count)
    }
}
