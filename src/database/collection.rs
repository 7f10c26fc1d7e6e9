use serde::{Deserialize, Serialize};
use std::fmt;

/// Every document collection the service persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Users,
    AcademicYears,
    AcademicTerms,
    Classes,
    Subjects,
    Staff,
    Students,
    Parents,
    Requirements,
    RequirementSets,
    RequirementFulfillments,
    SchoolFees,
    Metadata,
}

impl Collection {
    pub const ALL: [Collection; 13] = [
        Collection::Users,
        Collection::AcademicYears,
        Collection::AcademicTerms,
        Collection::Classes,
        Collection::Subjects,
        Collection::Staff,
        Collection::Students,
        Collection::Parents,
        Collection::Requirements,
        Collection::RequirementSets,
        Collection::RequirementFulfillments,
        Collection::SchoolFees,
        Collection::Metadata,
    ];

    /// Table name used by the postgres backend.
    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::AcademicYears => "academic_years",
            Collection::AcademicTerms => "academic_terms",
            Collection::Classes => "school_classes",
            Collection::Subjects => "subjects",
            Collection::Staff => "staff",
            Collection::Students => "students",
            Collection::Parents => "parents",
            Collection::Requirements => "requirements",
            Collection::RequirementSets => "requirement_sets",
            Collection::RequirementFulfillments => "requirement_fulfillments",
            Collection::SchoolFees => "school_fees",
            Collection::Metadata => "metadata",
        }
    }

    /// Top-level document fields whose non-null values must be unique.
    pub fn unique_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Users => &["email"],
            Collection::AcademicYears => &["name"],
            Collection::Classes => &["name", "shortName"],
            Collection::Staff => &["email"],
            Collection::Requirements => &["name"],
            Collection::RequirementSets => &["name"],
            Collection::Metadata => &["name"],
            _ => &[],
        }
    }

    /// Fields worth a plain expression index for the lookups the handlers run.
    pub fn indexed_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::AcademicTerms => &["academicYear"],
            Collection::Students => &["currentClass", "academicStatus"],
            Collection::RequirementFulfillments => &["student", "requirementSet", "schoolClass", "academicTerm"],
            Collection::SchoolFees => &["student", "academicTerm", "studentClass"],
            _ => &[],
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}
