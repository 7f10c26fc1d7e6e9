use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::record::{Entity, Meta, RecordError};
use crate::database::Collection;
use crate::models::dates;
use crate::models::requirement_set::RequirementSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FulfillmentStatus {
    #[default]
    Incomplete,
    Partial,
    Complete,
}

/// Overall status from (required, fulfilled) pairs.
///
/// Complete when every item is covered (vacuously so for no items), Partial
/// when at least one item has something handed in, otherwise Incomplete.
pub fn derive_status<I>(items: I) -> FulfillmentStatus
where
    I: IntoIterator<Item = (u32, u32)>,
{
    let mut total = 0usize;
    let mut complete = 0usize;
    let mut started = 0usize;

    for (required, fulfilled) in items {
        total += 1;
        if fulfilled >= required {
            complete += 1;
        } else if fulfilled > 0 {
            started += 1;
        }
    }

    if complete == total {
        FulfillmentStatus::Complete
    } else if complete > 0 || started > 0 {
        FulfillmentStatus::Partial
    } else {
        FulfillmentStatus::Incomplete
    }
}

/// Outstanding quantity. Negative when more than required was handed in.
pub fn item_balance(required: u32, fulfilled: u32) -> i64 {
    i64::from(required) - i64::from(fulfilled)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfilledItem {
    pub requirement: Uuid,
    pub required_quantity: u32,
    pub fulfilled_quantity: u32,
    #[serde(default)]
    pub balance: i64,
    #[serde(default)]
    pub notes: String,
}

/// Client-supplied progress for one item. The required quantity always
/// comes from the requirement set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    pub requirement: Uuid,
    pub fulfilled_quantity: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementFulfillment {
    #[serde(flatten)]
    pub meta: Meta,
    pub student: Uuid,
    pub requirement_set: Uuid,
    pub school_class: Uuid,
    pub academic_term: Uuid,
    #[serde(deserialize_with = "dates::deserialize")]
    pub fulfillment_date: DateTime<Utc>,
    #[serde(default)]
    pub fulfilled_items: Vec<FulfilledItem>,
    #[serde(default)]
    pub receipt_number: Option<String>,
    #[serde(default)]
    pub status: FulfillmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub recorded_by: Option<Uuid>,
    #[serde(default)]
    pub total_balance: i64,
}

impl RequirementFulfillment {
    /// Fresh record for a student with every set item outstanding.
    pub fn seeded(student: Uuid, set: &RequirementSet, recorded_by: Option<Uuid>) -> Self {
        let mut record = Self {
            meta: Meta::new(),
            student,
            requirement_set: set.meta.id,
            school_class: set.school_class,
            academic_term: set.academic_term,
            fulfillment_date: Utc::now(),
            fulfilled_items: set
                .requirement_items
                .iter()
                .map(|item| FulfilledItem {
                    requirement: item.requirement,
                    required_quantity: item.quantity,
                    fulfilled_quantity: 0,
                    balance: 0,
                    notes: String::new(),
                })
                .collect(),
            receipt_number: None,
            status: FulfillmentStatus::Incomplete,
            notes: None,
            recorded_by,
            total_balance: 0,
        };
        record.recompute();
        record
    }

    /// Apply progress updates. Items must belong to the set the record was
    /// seeded from; required quantities are refreshed from the set.
    pub fn apply_items(&mut self, set: &RequirementSet, updates: &[ItemUpdate]) -> Result<(), RecordError> {
        for update in updates {
            let required = set.quantity_of(update.requirement).ok_or_else(|| {
                RecordError::invalid(
                    "fulfilledItems",
                    format!("Requirement {} is not part of this requirement set", update.requirement),
                )
            })?;

            match self
                .fulfilled_items
                .iter_mut()
                .find(|item| item.requirement == update.requirement)
            {
                Some(item) => {
                    item.required_quantity = required;
                    item.fulfilled_quantity = update.fulfilled_quantity;
                    if let Some(notes) = &update.notes {
                        item.notes = notes.clone();
                    }
                }
                None => self.fulfilled_items.push(FulfilledItem {
                    requirement: update.requirement,
                    required_quantity: required,
                    fulfilled_quantity: update.fulfilled_quantity,
                    balance: 0,
                    notes: update.notes.clone().unwrap_or_default(),
                }),
            }
        }
        self.recompute();
        Ok(())
    }
}

impl Entity for RequirementFulfillment {
    const COLLECTION: Collection = Collection::RequirementFulfillments;
    const LABEL: &'static str = "Fulfillment record";

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn managed_fields() -> &'static [&'static str] {
        &["status", "totalBalance"]
    }

    fn recompute(&mut self) {
        for item in &mut self.fulfilled_items {
            item.balance = item_balance(item.required_quantity, item.fulfilled_quantity);
        }
        self.status = derive_status(
            self.fulfilled_items
                .iter()
                .map(|item| (item.required_quantity, item.fulfilled_quantity)),
        );
        self.total_balance = self.fulfilled_items.iter().map(|item| item.balance).sum();
    }
}

/// Progress across every fulfillment of one requirement set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentStats {
    /// Active students in the set's class
    pub total_students: u64,
    pub total_fulfillments: u64,
    pub complete_fulfillments: u64,
    pub partial_fulfillments: u64,
    pub incomplete_fulfillments: u64,
    /// Negative when records exist for students who left the class
    pub students_with_no_record: i64,
    /// Percentages of `total_students`
    pub fulfillment_rate: f64,
    pub complete_rate: f64,
    pub total_outstanding_items: i64,
}

impl FulfillmentStats {
    pub fn compute(total_students: u64, records: &[RequirementFulfillment]) -> Self {
        let count = |status: FulfillmentStatus| records.iter().filter(|r| r.status == status).count() as u64;
        let total_fulfillments = records.len() as u64;
        let complete_fulfillments = count(FulfillmentStatus::Complete);
        let rate = |n: u64| {
            if total_students > 0 {
                n as f64 / total_students as f64 * 100.0
            } else {
                0.0
            }
        };

        Self {
            total_students,
            total_fulfillments,
            complete_fulfillments,
            partial_fulfillments: count(FulfillmentStatus::Partial),
            incomplete_fulfillments: count(FulfillmentStatus::Incomplete),
            students_with_no_record: total_students as i64 - total_fulfillments as i64,
            fulfillment_rate: rate(total_fulfillments),
            complete_rate: rate(complete_fulfillments),
            total_outstanding_items: records.iter().map(|r| r.total_balance).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::requirement_set::RequirementItem;

    fn set(items: &[(Uuid, u32)]) -> RequirementSet {
        RequirementSet {
            meta: Meta::new(),
            name: "P1 Term 1".into(),
            description: "Supplies".into(),
            requirement_items: items
                .iter()
                .map(|(requirement, quantity)| RequirementItem { requirement: *requirement, quantity: *quantity })
                .collect(),
            school_class: Uuid::new_v4(),
            academic_term: Uuid::new_v4(),
        }
    }

    fn update(requirement: Uuid, fulfilled_quantity: u32) -> ItemUpdate {
        ItemUpdate { requirement, fulfilled_quantity, notes: None }
    }

    #[test]
    fn status_rules() {
        assert_eq!(derive_status([(2, 2), (3, 5)]), FulfillmentStatus::Complete);
        assert_eq!(derive_status([(2, 2), (3, 0)]), FulfillmentStatus::Partial);
        assert_eq!(derive_status([(2, 1), (3, 0)]), FulfillmentStatus::Partial);
        assert_eq!(derive_status([(2, 0), (3, 0)]), FulfillmentStatus::Incomplete);
        assert_eq!(derive_status(Vec::<(u32, u32)>::new()), FulfillmentStatus::Complete);
        // Nothing required counts as covered
        assert_eq!(derive_status([(0, 0)]), FulfillmentStatus::Complete);
    }

    #[test]
    fn seeding_then_applying_items_recomputes_balances() {
        let (pens, books) = (Uuid::new_v4(), Uuid::new_v4());
        let set = set(&[(pens, 4), (books, 2)]);

        let mut record = RequirementFulfillment::seeded(Uuid::new_v4(), &set, None);
        assert_eq!(record.status, FulfillmentStatus::Incomplete);
        assert_eq!(record.total_balance, 6);
        assert_eq!(record.school_class, set.school_class);

        record.apply_items(&set, &[update(pens, 5)]).unwrap();
        assert_eq!(record.status, FulfillmentStatus::Partial);
        assert_eq!(record.fulfilled_items[0].balance, -1);
        assert_eq!(record.total_balance, 1);

        record.apply_items(&set, &[update(books, 2)]).unwrap();
        assert_eq!(record.status, FulfillmentStatus::Complete);
    }

    #[test]
    fn rejects_items_outside_the_set() {
        let set = set(&[(Uuid::new_v4(), 1)]);
        let mut record = RequirementFulfillment::seeded(Uuid::new_v4(), &set, None);
        let err = record.apply_items(&set, &[update(Uuid::new_v4(), 1)]).unwrap_err();
        assert_eq!(err.field(), Some("fulfilledItems"));
    }

    #[test]
    fn stored_balances_are_never_trusted() {
        let requirement = Uuid::new_v4();
        let mut record = RequirementFulfillment::seeded(Uuid::new_v4(), &set(&[(requirement, 3)]), None);
        record.fulfilled_items[0].balance = 99;
        record.status = FulfillmentStatus::Complete;
        record.recompute();
        assert_eq!(record.fulfilled_items[0].balance, 3);
        assert_eq!(record.status, FulfillmentStatus::Incomplete);
    }

    #[test]
    fn stats_count_statuses_and_rates() {
        let requirement = Uuid::new_v4();
        let set = set(&[(requirement, 2)]);
        let mut done = RequirementFulfillment::seeded(Uuid::new_v4(), &set, None);
        done.apply_items(&set, &[update(requirement, 2)]).unwrap();
        let mut half = RequirementFulfillment::seeded(Uuid::new_v4(), &set, None);
        half.apply_items(&set, &[update(requirement, 1)]).unwrap();
        let none = RequirementFulfillment::seeded(Uuid::new_v4(), &set, None);

        let stats = FulfillmentStats::compute(4, &[done, half, none]);
        assert_eq!(stats.total_fulfillments, 3);
        assert_eq!(
            (stats.complete_fulfillments, stats.partial_fulfillments, stats.incomplete_fulfillments),
            (1, 1, 1)
        );
        assert_eq!(stats.students_with_no_record, 1);
        assert_eq!(stats.fulfillment_rate, 75.0);
        assert_eq!(stats.complete_rate, 25.0);
        assert_eq!(stats.total_outstanding_items, 3);

        assert_eq!(FulfillmentStats::compute(0, &[]).fulfillment_rate, 0.0);
    }
}
