//! Human resources roster

use super::Domain;
use crate::coerce::{self, number_or, text_or, NormalizeContext};
use crate::config::{sheet_candidates, ExportVariant, SourceConfig, DEPARTMENT_SHEET_ID};
use crate::filter::{Criteria, DateRange, Record};
use crate::metrics::{self, ratio};
use dash_common::RawRecord;
use serde::{Deserialize, Serialize};

const SHEET_GID: &str = "1844316831";

/// Attrition above this fraction is flagged
const ATTRITION_ALERT: f64 = 0.15;
/// Per-department attrition, in percent, worth naming
const DEPARTMENT_ATTRITION_ALERT: f64 = 20.0;
const ATTENDANCE_TARGET: f64 = 0.85;

pub struct Hr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrRecord {
    pub employee_id: String,
    pub employee_name: String,
    pub email: String,
    pub gender: String,
    pub age: f64,
    pub department_name: String,
    pub job_title: String,
    pub job_level: String,
    pub manager_name: String,
    pub office_location: String,
    pub employment_type: String,
    pub employment_status: String,
    pub hire_date: String,
    pub exit_date: String,
    pub tenure_years: f64,
    pub total_working_days: f64,
    pub days_present: f64,
    pub days_absent: f64,
    pub leave_days: f64,
    pub attendance_rate_percent: f64,
    pub total_days_not_working: f64,
    pub performance_rating: f64,
    pub last_appraisal_date: String,
    pub performance_category: String,
    pub promotion_eligibility: String,
    pub base_salary: f64,
    pub bonus: f64,
    pub deductions: f64,
    pub net_salary: f64,
    pub job_satisfaction_score: f64,
    pub attrition_risk_level: String,
}

impl HrRecord {
    fn is_active(&self) -> bool {
        self.employment_status == "Active"
    }

    fn is_terminated(&self) -> bool {
        self.employment_status == "Terminated"
    }
}

impl Record for HrRecord {
    const DIMENSIONS: &'static [&'static str] = &[
        "departments",
        "jobLevels",
        "managers",
        "locations",
        "employmentTypes",
        "employmentStatuses",
        "performanceCategories",
        "promotionEligibility",
        "attritionRiskLevels",
        "genders",
    ];

    fn id(&self) -> &str {
        &self.employee_id
    }

    fn date(&self) -> &str {
        &self.hire_date
    }

    fn dimension(&self, key: &str) -> Option<&str> {
        let value = match key {
            "departments" => &self.department_name,
            "jobLevels" => &self.job_level,
            "managers" => &self.manager_name,
            "locations" => &self.office_location,
            "employmentTypes" => &self.employment_type,
            "employmentStatuses" => &self.employment_status,
            "performanceCategories" => &self.performance_category,
            "promotionEligibility" => &self.promotion_eligibility,
            "attritionRiskLevels" => &self.attrition_risk_level,
            "genders" => &self.gender,
            _ => return None,
        };
        Some(value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HrCriteria {
    /// Applied to the hire date
    pub date_range: DateRange,
    pub departments: Vec<String>,
    pub job_levels: Vec<String>,
    pub managers: Vec<String>,
    pub locations: Vec<String>,
    pub employment_types: Vec<String>,
    pub employment_statuses: Vec<String>,
    pub performance_categories: Vec<String>,
    pub promotion_eligibility: Vec<String>,
    pub attrition_risk_levels: Vec<String>,
    pub genders: Vec<String>,
    pub search_query: String,
}

impl Criteria for HrCriteria {
    fn date_range(&self) -> &DateRange {
        &self.date_range
    }

    fn selections(&self) -> Vec<(&'static str, &[String])> {
        vec![
            ("departments", self.departments.as_slice()),
            ("jobLevels", self.job_levels.as_slice()),
            ("managers", self.managers.as_slice()),
            ("locations", self.locations.as_slice()),
            ("employmentTypes", self.employment_types.as_slice()),
            ("employmentStatuses", self.employment_statuses.as_slice()),
            ("performanceCategories", self.performance_categories.as_slice()),
            ("promotionEligibility", self.promotion_eligibility.as_slice()),
            ("attritionRiskLevels", self.attrition_risk_levels.as_slice()),
            ("genders", self.genders.as_slice()),
        ]
    }

    fn search(&self) -> &str {
        &self.search_query
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HrKpis {
    pub total_employees: usize,
    pub active_employees: usize,
    pub terminated_employees: usize,
    pub attrition_rate: f64,
    pub average_tenure: f64,
    /// Fraction, not percent
    pub average_attendance_rate: f64,
    pub average_age: f64,
    pub promotion_eligible: usize,
    pub high_performers: usize,
    pub average_days_not_working: f64,
    /// Mean net salary
    pub average_salary: f64,
    pub average_job_satisfaction: f64,
}

impl Domain for Hr {
    type Record = HrRecord;
    type Criteria = HrCriteria;
    type Kpis = HrKpis;

    const KEY: &'static str = "hr";

    fn default_config() -> SourceConfig {
        SourceConfig::new(
            Self::KEY,
            sheet_candidates(
                DEPARTMENT_SHEET_ID,
                SHEET_GID,
                &[ExportVariant::Export, ExportVariant::Gviz, ExportVariant::Published],
            ),
        )
    }

    fn normalize(raw: &RawRecord, index: usize, _ctx: &NormalizeContext) -> Option<HrRecord> {
        let text = |aliases: &[&str], fallback: &str| text_or(raw, aliases, fallback);
        let num = |aliases: &[&str], fallback: f64| number_or(raw, aliases, fallback);

        let employee_id = coerce::text(raw, &["employee_id", "emp_id", "id", "employee_number"])
            .map(str::to_string)
            .unwrap_or_else(|| format!("EMP-{}", index + 1));
        if employee_id.trim().is_empty() {
            return None;
        }

        Some(HrRecord {
            employee_id,
            employee_name: coerce::text(raw, &["employee_name", "name", "emp_name", "full_name"])
                .map(str::to_string)
                .unwrap_or_else(|| format!("Employee {}", index + 1)),
            email: text(&["email", "emp_email", "email_address"], ""),
            gender: text(&["gender", "sex"], ""),
            age: num(&["age", "employee_age"], 25.0),
            department_name: text(&["department_name", "department", "dept", "division"], "General"),
            job_title: text(&["job_title", "title", "position", "role"], "Employee"),
            job_level: text(&["job_level", "level", "grade"], "Mid"),
            manager_name: text(&["manager_name", "manager", "supervisor"], "Manager"),
            office_location: text(&["office_location", "location", "office", "site"], "Main Office"),
            employment_type: text(&["employment_type", "emp_type", "type"], "Full-time"),
            employment_status: text(&["employment_status", "status"], "Active"),
            hire_date: text(&["hire_date", "date_hired", "start_date", "joining_date"], ""),
            exit_date: text(&["exit_date", "date_exit", "end_date", "termination_date"], ""),
            tenure_years: num(&["tenure_years", "tenure", "years_service", "experience"], 2.0),
            total_working_days: num(&["total_working_days", "working_days", "work_days"], 250.0),
            days_present: num(&["days_present", "present_days", "attendance_days"], 200.0),
            days_absent: num(&["days_absent", "absent_days", "absences"], 10.0),
            leave_days: num(&["leave_days", "leaves", "vacation_days", "pto"], 15.0),
            attendance_rate_percent: num(
                &["attendance_rate_percent", "attendance_rate", "attendance"],
                85.0,
            ),
            total_days_not_working: num(&["total_days_not_working", "days_not_working"], 25.0),
            performance_rating: num(&["performance_rating", "rating", "performance", "score"], 3.5),
            last_appraisal_date: text(&["last_appraisal_date", "appraisal_date", "review_date"], ""),
            performance_category: text(
                &["performance_category", "perf_category", "category", "performance_level"],
                "Good",
            ),
            promotion_eligibility: text(
                &["promotion_eligibility", "promotion", "eligible", "promotion_ready"],
                "No",
            ),
            base_salary: num(&["base_salary", "salary", "base_pay", "annual_salary"], 50_000.0),
            bonus: num(&["bonus", "bonus_amount", "incentive"], 5_000.0),
            deductions: num(&["deductions", "deduction_amount", "tax"], 2_000.0),
            net_salary: num(&["net_salary", "net_pay", "take_home"], 53_000.0),
            job_satisfaction_score: num(
                &["job_satisfaction_score", "satisfaction", "job_satisfaction", "satisfaction_rating"],
                4.0,
            ),
            attrition_risk_level: text(
                &["attrition_risk_level", "risk_level", "attrition_risk", "flight_risk"],
                "Low",
            ),
        })
    }

    fn aggregate(records: &[HrRecord]) -> HrKpis {
        let total = records.len();
        let terminated = metrics::count(records, HrRecord::is_terminated);

        HrKpis {
            total_employees: total,
            active_employees: metrics::count(records, HrRecord::is_active),
            terminated_employees: terminated,
            attrition_rate: ratio(terminated as f64, total as f64),
            average_tenure: metrics::mean(records, |r| r.tenure_years),
            average_attendance_rate: metrics::mean(records, |r| r.attendance_rate_percent) / 100.0,
            average_age: metrics::mean(records, |r| r.age),
            promotion_eligible: metrics::count(records, |r| r.promotion_eligibility == "Yes"),
            high_performers: metrics::count(records, |r| r.performance_category == "High"),
            average_days_not_working: metrics::mean(records, |r| r.total_days_not_working),
            average_salary: metrics::mean(records, |r| r.net_salary),
            average_job_satisfaction: metrics::mean(records, |r| r.job_satisfaction_score),
        }
    }

    fn insights(records: &[HrRecord], kpis: &HrKpis) -> Vec<String> {
        if records.is_empty() {
            return Vec::new();
        }
        let mut insights = Vec::new();

        if kpis.attrition_rate > ATTRITION_ALERT {
            insights.push(format!(
                "⚠️ High attrition rate of {}% requires immediate attention.",
                metrics::pct(kpis.attrition_rate)
            ));
        }

        // Per-department attrition in percent; first department wins ties
        let mut departments: Vec<(&str, usize, usize)> = Vec::new();
        for r in records {
            let terminated = usize::from(r.is_terminated());
            match departments.iter_mut().find(|(d, _, _)| *d == r.department_name) {
                Some((_, total, gone)) => {
                    *total += 1;
                    *gone += terminated;
                }
                None => departments.push((r.department_name.as_str(), 1, terminated)),
            }
        }
        let worst = departments
            .iter()
            .map(|(dept, total, gone)| (*dept, *gone as f64 / *total as f64 * 100.0))
            .fold(None::<(&str, f64)>, |best, (dept, rate)| match best {
                Some((_, b)) if b >= rate => best,
                _ => Some((dept, rate)),
            });
        if let Some((dept, rate)) = worst {
            if rate > DEPARTMENT_ATTRITION_ALERT {
                insights.push(format!(
                    "🔴 {} has the highest attrition rate at {}%.",
                    dept,
                    metrics::fixed(rate, 1)
                ));
            }
        }

        if kpis.average_attendance_rate < ATTENDANCE_TARGET {
            insights.push(format!(
                "📉 Average attendance rate is {}% - below target of 85%.",
                metrics::pct(kpis.average_attendance_rate)
            ));
        }

        let at_risk = metrics::count(records, |r| r.attrition_risk_level == "High" && r.is_active());
        if at_risk > 0 {
            insights.push(format!("🚨 {at_risk} active employees are at high attrition risk."));
        }

        if kpis.promotion_eligible > 0 {
            insights.push(format!(
                "⭐ {} employees are eligible for promotion.",
                kpis.promotion_eligible
            ));
        }

        let leavers: Vec<&HrRecord> = records.iter().filter(|r| r.is_terminated()).collect();
        if !leavers.is_empty() {
            let tenure = leavers.iter().map(|r| r.tenure_years).sum::<f64>() / leavers.len() as f64;
            insights.push(format!(
                "📊 Average tenure of terminated employees: {tenure:.1} years."
            ));
        }

        insights
    }
}
