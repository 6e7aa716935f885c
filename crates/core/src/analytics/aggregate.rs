use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::ledger::LedgerEntry;
use crate::document::UserId;
use crate::models::PurchaseStatus;

pub const TOP_COURSES_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerAnalytics {
    pub total_revenue: f64,
    pub total_sales: usize,
    /// `"YYYY-MM"` (UTC) to revenue in that month.
    pub revenue_by_month: BTreeMap<String, f64>,
    pub top_courses: Vec<TopCourse>,
    pub total_instructors: usize,
    pub instructor_revenue: BTreeMap<UserId, InstructorRevenue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopCourse {
    pub title: String,
    pub sales: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstructorRevenue {
    pub total: f64,
    pub name: String,
    pub email: String,
}

/// Fold ledger entries into the owner report.
///
/// Entries that are not completed are ignored. A missing amount counts as 0,
/// a missing course title groups under `""`, and entries without an
/// instructor count towards the totals but not `instructor_revenue`. Top
/// courses are ranked by sales with ties kept in first-seen order.
pub fn aggregate(entries: &[LedgerEntry], total_instructors: usize) -> OwnerAnalytics {
    let mut report = OwnerAnalytics {
        total_instructors,
        ..OwnerAnalytics::default()
    };
    let mut course_sales: Vec<TopCourse> = Vec::new();
    let mut course_index: HashMap<&str, usize> = HashMap::new();

    for entry in entries
        .iter()
        .filter(|e| e.status == PurchaseStatus::Completed)
    {
        let amount = entry.amount.unwrap_or(0.0);
        report.total_revenue += amount;
        report.total_sales += 1;

        let month = entry.created_at.format("%Y-%m").to_string();
        *report.revenue_by_month.entry(month).or_insert(0.0) += amount;

        let title = entry.course_title.as_deref().unwrap_or_default();
        match course_index.get(title) {
            Some(&i) => course_sales[i].sales += 1,
            None => {
                course_index.insert(title, course_sales.len());
                course_sales.push(TopCourse {
                    title: title.to_string(),
                    sales: 1,
                });
            }
        }

        if let Some(instructor) = &entry.instructor {
            report
                .instructor_revenue
                .entry(instructor.id)
                .or_insert_with(|| InstructorRevenue {
                    total: 0.0,
                    name: instructor.name.clone(),
                    email: instructor.email.clone(),
                })
                .total += amount;
        }
    }

    // Stable: equal counts keep first-seen order.
    course_sales.sort_by(|a, b| b.sales.cmp(&a.sales));
    course_sales.truncate(TOP_COURSES_LIMIT);
    report.top_courses = course_sales;

    report
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::analytics::ledger::LedgerInstructor;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn entry(amount: f64, created_at: DateTime<Utc>, title: &str) -> LedgerEntry {
        LedgerEntry {
            amount: Some(amount),
            status: PurchaseStatus::Completed,
            created_at,
            course_title: Some(title.to_string()),
            instructor: None,
        }
    }

    #[test]
    fn totals_and_monthly_revenue() {
        let entries = vec![
            entry(100.0, at(2024, 1, 3), "A"),
            entry(50.0, at(2024, 1, 28), "B"),
            entry(200.0, at(2024, 2, 1), "A"),
        ];

        let report = aggregate(&entries, 0);
        assert_eq!(report.total_revenue, 350.0);
        assert_eq!(report.total_sales, 3);
        assert_eq!(
            report.revenue_by_month,
            BTreeMap::from([("2024-01".to_string(), 150.0), ("2024-02".to_string(), 200.0)])
        );
    }

    #[test]
    fn empty_ledger_yields_zeroes() {
        let report = aggregate(&[], 3);
        assert_eq!(report.total_revenue, 0.0);
        assert_eq!(report.total_sales, 0);
        assert!(report.revenue_by_month.is_empty());
        assert!(report.top_courses.is_empty());
        assert_eq!(report.total_instructors, 3);
    }

    #[test]
    fn only_completed_entries_count() {
        let mut pending = entry(999.0, at(2024, 3, 1), "Pending");
        pending.status = PurchaseStatus::Pending;
        let entries = vec![entry(10.0, at(2024, 3, 1), "Done"), pending];

        let report = aggregate(&entries, 0);
        assert_eq!(report.total_revenue, 10.0);
        assert_eq!(report.total_sales, 1);
        assert_eq!(report.top_courses.len(), 1);
    }

    #[test]
    fn missing_amount_and_title_are_tolerated() {
        let entries = vec![LedgerEntry {
            amount: None,
            status: PurchaseStatus::Completed,
            created_at: at(2024, 5, 5),
            course_title: None,
            instructor: None,
        }];

        let report = aggregate(&entries, 0);
        assert_eq!(report.total_revenue, 0.0);
        assert_eq!(report.total_sales, 1);
        assert_eq!(report.revenue_by_month["2024-05"], 0.0);
        assert_eq!(
            report.top_courses,
            vec![TopCourse {
                title: String::new(),
                sales: 1
            }]
        );
    }

    #[test]
    fn top_courses_ranked_with_stable_ties() {
        let d = at(2024, 1, 1);
        let titles = ["C", "A", "B", "A", "D", "E", "F", "B", "G", "A"];
        let entries: Vec<_> = titles.iter().map(|t| entry(1.0, d, t)).collect();

        let report = aggregate(&entries, 0);
        let ranked: Vec<(&str, usize)> = report
            .top_courses
            .iter()
            .map(|c| (c.title.as_str(), c.sales))
            .collect();
        assert_eq!(ranked, vec![("A", 3), ("B", 2), ("C", 1), ("D", 1), ("E", 1)]);
        assert!(report.top_courses.len() <= TOP_COURSES_LIMIT);
        assert!(report
            .top_courses
            .windows(2)
            .all(|w| w[0].sales >= w[1].sales));
    }

    #[test]
    fn instructor_revenue_skips_unresolved_instructors() {
        let ada = LedgerInstructor {
            id: UserId::new(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
        };
        let mut first = entry(40.0, at(2024, 1, 1), "A");
        first.instructor = Some(ada.clone());
        let mut second = entry(60.0, at(2024, 2, 1), "B");
        second.instructor = Some(ada.clone());
        let orphan = entry(25.0, at(2024, 2, 1), "C");

        let report = aggregate(&[first, second, orphan], 1);
        assert_eq!(report.total_revenue, 125.0);
        assert_eq!(report.instructor_revenue.len(), 1);
        assert_eq!(
            report.instructor_revenue[&ada.id],
            InstructorRevenue {
                total: 100.0,
                name: "Ada".into(),
                email: "ada@example.com".into(),
            }
        );
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let report = aggregate(&[entry(100.0, at(2024, 1, 1), "A")], 2);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["totalRevenue"], 100.0);
        assert_eq!(json["totalSales"], 1);
        assert_eq!(json["revenueByMonth"]["2024-01"], 100.0);
        assert_eq!(json["topCourses"][0]["title"], "A");
        assert_eq!(json["topCourses"][0]["sales"], 1);
        assert_eq!(json["totalInstructors"], 2);
        assert!(json["instructorRevenue"].as_object().unwrap().is_empty());
    }
}
