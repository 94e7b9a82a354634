use anyhow::{bail, Context, Result};
use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::RwLock,
};

use crate::models::PlannedCategory;

/// Daily plans keyed by day string, persisted as one JSON blob.
///
/// The recorder reads `target_for` when a session completes, denormalizing
/// the target into the record. Plans are otherwise pure user bookkeeping.
pub struct PlanStore {
    path: PathBuf,
    data: RwLock<HashMap<String, Vec<PlannedCategory>>>,
    /// Hours one day may allocate across all categories.
    total_day_hours: f64,
}

impl PlanStore {
    pub fn new(path: PathBuf, total_day_hours: f64) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read day plans from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
            total_day_hours,
        })
    }

    pub fn plan_for_day(&self, day: &str) -> Vec<PlannedCategory> {
        self.data
            .read()
            .unwrap()
            .get(day)
            .cloned()
            .unwrap_or_default()
    }

    pub fn target_for(&self, day: &str, category: &str) -> Option<f64> {
        self.data
            .read()
            .unwrap()
            .get(day)?
            .iter()
            .find(|cat| cat.name == category)
            .map(|cat| cat.target_hours)
    }

    /// Add a category to a day's plan. Rejects empty names, non-positive
    /// targets, duplicates (case-insensitive), and plans that would exceed
    /// the day's hour budget.
    pub fn add_category(&self, day: &str, entry: PlannedCategory) -> Result<()> {
        let name = entry.name.trim();
        if name.is_empty() {
            bail!("category name cannot be empty");
        }
        if !(entry.target_hours > 0.0) {
            bail!("target must be a positive number of hours");
        }

        let mut guard = self.data.write().unwrap();
        let plan = guard.entry(day.to_string()).or_default();

        if plan
            .iter()
            .any(|cat| cat.name.eq_ignore_ascii_case(name))
        {
            bail!("category '{name}' already exists for {day}");
        }

        let allocated: f64 = plan.iter().map(|cat| cat.target_hours).sum();
        if allocated + entry.target_hours > self.total_day_hours {
            bail!(
                "adding {}h exceeds the {}h available for {day}",
                entry.target_hours,
                self.total_day_hours
            );
        }

        plan.push(PlannedCategory {
            name: name.to_string(),
            target_hours: entry.target_hours,
        });
        self.persist(&guard)
    }

    /// Remove a category from a day's plan; absent entries are a no-op.
    pub fn remove_category(&self, day: &str, name: &str) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        if let Some(plan) = guard.get_mut(day) {
            plan.retain(|cat| cat.name != name);
        }
        self.persist(&guard)
    }

    fn persist(&self, data: &HashMap<String, Vec<PlannedCategory>>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write day plans to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> PlanStore {
        PlanStore::new(dir.path().join("day_plans.json"), 9.0).unwrap()
    }

    fn cat(name: &str, target_hours: f64) -> PlannedCategory {
        PlannedCategory {
            name: name.into(),
            target_hours,
        }
    }

    #[test]
    fn add_and_look_up_targets() {
        let dir = tempfile::tempdir().unwrap();
        let plans = store(&dir);

        plans.add_category("2025-10-14", cat("Project", 3.0)).unwrap();
        plans.add_category("2025-10-14", cat("Call", 1.5)).unwrap();

        assert_eq!(plans.target_for("2025-10-14", "Project"), Some(3.0));
        assert_eq!(plans.target_for("2025-10-14", "Gym"), None);
        assert_eq!(plans.target_for("2025-10-15", "Project"), None);
        assert_eq!(plans.plan_for_day("2025-10-14").len(), 2);
    }

    #[test]
    fn rejects_duplicates_and_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let plans = store(&dir);

        plans.add_category("2025-10-14", cat("Project", 3.0)).unwrap();
        assert!(plans.add_category("2025-10-14", cat("project", 1.0)).is_err());
        assert!(plans.add_category("2025-10-14", cat("  ", 1.0)).is_err());
        assert!(plans.add_category("2025-10-14", cat("Gym", 0.0)).is_err());
        assert!(plans.add_category("2025-10-14", cat("Gym", -2.0)).is_err());
    }

    #[test]
    fn enforces_day_budget() {
        let dir = tempfile::tempdir().unwrap();
        let plans = store(&dir);

        plans.add_category("2025-10-14", cat("Project", 6.0)).unwrap();
        assert!(plans.add_category("2025-10-14", cat("Call", 4.0)).is_err());
        plans.add_category("2025-10-14", cat("Call", 3.0)).unwrap();
    }

    #[test]
    fn remove_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("day_plans.json");

        {
            let plans = PlanStore::new(path.clone(), 9.0).unwrap();
            plans.add_category("2025-10-14", cat("Project", 3.0)).unwrap();
            plans.add_category("2025-10-14", cat("Call", 1.0)).unwrap();
            plans.remove_category("2025-10-14", "Call").unwrap();
            plans.remove_category("2025-10-14", "Missing").unwrap();
        }

        let plans = PlanStore::new(path, 9.0).unwrap();
        let plan = plans.plan_for_day("2025-10-14");
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].name, "Project");
    }
}
