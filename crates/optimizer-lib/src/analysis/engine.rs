//! Rightsizing recommendation engine
//!
//! Maps a usage snapshot plus the resource's current instance type to at most
//! one recommendation. Underutilization is checked first, overutilization
//! second; when both fire the upsize replaces the downsize.

use crate::catalog::InstanceCatalog;
use crate::models::{
    Action, CandidateSelection, InstanceType, Priority, Recommendation, Resource,
    RightsizingPolicy, UsageSnapshot, HOURS_PER_MONTH,
};
use std::sync::Arc;

/// Evaluates resources against a catalog and a rightsizing policy
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    catalog: Arc<InstanceCatalog>,
    policy: RightsizingPolicy,
}

impl RecommendationEngine {
    pub fn new(catalog: Arc<InstanceCatalog>, policy: RightsizingPolicy) -> Self {
        Self { catalog, policy }
    }

    pub fn policy(&self) -> &RightsizingPolicy {
        &self.policy
    }

    pub fn catalog(&self) -> &InstanceCatalog {
        &self.catalog
    }

    /// Produce a recommendation, or `None` when the type is not in the
    /// catalog, no threshold is crossed, or no catalog entry qualifies.
    pub fn evaluate(&self, resource: &Resource, usage: &UsageSnapshot) -> Option<Recommendation> {
        let current = self.catalog.lookup(&resource.resource_type)?;
        let mut recommendation = None;

        if self.is_underutilized(usage) {
            // The smaller type must still hold the memory actually in use
            let footprint_gb = (usage.memory_utilization / 100.0) * current.memory_gb;
            if let Some(candidate) = self.select(current, |t| {
                t.vcpu < current.vcpu && t.memory_gb >= footprint_gb
            }) {
                let saving = (current.price_per_hour - candidate.price_per_hour) * HOURS_PER_MONTH;
                recommendation = Some(self.build(
                    resource,
                    current,
                    candidate,
                    Action::Downsize,
                    format!(
                        "Low utilization: CPU {:.1}%, Memory {:.1}%",
                        usage.cpu_utilization, usage.memory_utilization
                    ),
                    saving,
                    Priority::from_saving(saving),
                ));
            }
        }

        if self.is_overutilized(usage) {
            if let Some(candidate) = self.select(current, |t| t.vcpu > current.vcpu) {
                let additional_cost =
                    (candidate.price_per_hour - current.price_per_hour) * HOURS_PER_MONTH;
                recommendation = Some(self.build(
                    resource,
                    current,
                    candidate,
                    Action::Upsize,
                    format!(
                        "High utilization: CPU {:.1}%, Memory {:.1}%",
                        usage.cpu_utilization, usage.memory_utilization
                    ),
                    -additional_cost,
                    Priority::High,
                ));
            }
        }

        recommendation
    }

    fn is_underutilized(&self, usage: &UsageSnapshot) -> bool {
        usage.cpu_utilization < self.policy.min_cpu_percent
            && usage.memory_utilization < self.policy.min_memory_percent
    }

    fn is_overutilized(&self, usage: &UsageSnapshot) -> bool {
        usage.cpu_utilization > self.policy.max_cpu_percent
            || usage.memory_utilization > self.policy.max_memory_percent
    }

    /// Linear scan of the catalog for a replacement satisfying `qualifies`.
    ///
    /// `DeclarationOrder` returns the first qualifying entry in catalog order,
    /// which is not necessarily the closest fit. `NearestFit` ranks qualifying
    /// entries by vCPU distance, then price; equal ranks keep catalog order.
    fn select<'a>(
        &'a self,
        current: &InstanceType,
        qualifies: impl Fn(&InstanceType) -> bool,
    ) -> Option<&'a InstanceType> {
        let mut candidates = self.catalog.iter().filter(|t| qualifies(t));

        match self.policy.candidate_selection {
            CandidateSelection::DeclarationOrder => candidates.next(),
            CandidateSelection::NearestFit => candidates.fold(None, |best, t| match best {
                None => Some(t),
                Some(b) if fit_rank(current, t) < fit_rank(current, b) => Some(t),
                keep => keep,
            }),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &self,
        resource: &Resource,
        current: &InstanceType,
        candidate: &InstanceType,
        action: Action,
        reason: String,
        saving: f64,
        priority: Priority,
    ) -> Recommendation {
        Recommendation {
            resource_id: resource.id.clone(),
            resource_type: resource.resource_type.clone(),
            current_spec: current.clone(),
            recommended_spec: candidate.clone(),
            action,
            reason,
            projected_monthly_saving: saving,
            current_monthly_cost: current.monthly_cost(),
            priority,
        }
    }
}

fn fit_rank(current: &InstanceType, candidate: &InstanceType) -> (u32, f64) {
    (
        current.vcpu.abs_diff(candidate.vcpu),
        candidate.price_per_hour,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resource(resource_type: &str) -> Resource {
        Resource {
            id: "i-0abc".to_string(),
            name: "api".to_string(),
            resource_type: resource_type.to_string(),
            region: "us-east-1".to_string(),
            provider: "aws".to_string(),
            labels: HashMap::new(),
        }
    }

    fn usage(cpu: f64, memory: f64) -> UsageSnapshot {
        UsageSnapshot {
            cpu_utilization: cpu,
            memory_utilization: memory,
            ..Default::default()
        }
    }

    fn engine_with(types: Vec<InstanceType>) -> RecommendationEngine {
        RecommendationEngine::new(
            Arc::new(InstanceCatalog::new(types)),
            RightsizingPolicy::default(),
        )
    }

    fn default_engine() -> RecommendationEngine {
        RecommendationEngine::new(
            Arc::new(InstanceCatalog::default()),
            RightsizingPolicy::default(),
        )
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_unknown_type_yields_none() {
        let engine = default_engine();
        assert!(engine.evaluate(&resource("m5.large"), &usage(5.0, 5.0)).is_none());
        assert!(engine.evaluate(&resource("m5.large"), &usage(95.0, 95.0)).is_none());
    }

    #[test]
    fn test_no_smaller_vcpu_type_yields_none() {
        // Every type below t3.xlarge has 2 vCPUs, so nothing is strictly smaller
        let engine = default_engine();
        assert!(engine.evaluate(&resource("t3.medium"), &usage(10.0, 15.0)).is_none());
        assert!(engine.evaluate(&resource("t3.micro"), &usage(1.0, 1.0)).is_none());
    }

    #[test]
    fn test_downsize_to_first_smaller_type() {
        let engine = default_engine();
        let rec = engine
            .evaluate(&resource("t3.xlarge"), &usage(10.0, 15.0))
            .unwrap();

        assert_eq!(rec.action, Action::Downsize);
        // 15% of 16GB is 2.4GB; t3.micro is first in order but t3.micro has 1GB
        assert_eq!(rec.recommended_spec.name, "t3.medium");
        assert!(close(
            rec.projected_monthly_saving,
            (0.1664 - 0.0416) * 720.0
        ));
        assert!(close(rec.current_monthly_cost, 0.1664 * 720.0));
        assert_eq!(rec.priority, Priority::Medium);
        assert_eq!(rec.reason, "Low utilization: CPU 10.0%, Memory 15.0%");
    }

    #[test]
    fn test_downsize_takes_first_match_not_closest() {
        let engine = default_engine();
        let rec = engine
            .evaluate(&resource("t3.2xlarge"), &usage(5.0, 2.0))
            .unwrap();

        // 2% of 32GB fits in t3.micro, which precedes t3.xlarge in the catalog
        assert_eq!(rec.recommended_spec.name, "t3.micro");
        assert!(close(
            rec.projected_monthly_saving,
            (0.3328 - 0.0104) * 720.0
        ));
        assert_eq!(rec.priority, Priority::High);
    }

    #[test]
    fn test_downsize_priority_low() {
        let engine = engine_with(vec![
            InstanceType::new("small", 1, 2.0, 0.05),
            InstanceType::new("big", 2, 4.0, 0.10),
        ]);
        let rec = engine.evaluate(&resource("big"), &usage(5.0, 5.0)).unwrap();
        // (0.10 - 0.05) * 720 = 36
        assert!(close(rec.projected_monthly_saving, 36.0));
        assert_eq!(rec.priority, Priority::Low);
    }

    #[test]
    fn test_both_thresholds_required_for_downsize() {
        let engine = default_engine();
        assert!(engine.evaluate(&resource("t3.xlarge"), &usage(10.0, 50.0)).is_none());
        assert!(engine.evaluate(&resource("t3.xlarge"), &usage(50.0, 10.0)).is_none());
    }

    #[test]
    fn test_upsize_on_high_cpu() {
        let engine = default_engine();
        let rec = engine
            .evaluate(&resource("t3.medium"), &usage(91.0, 40.0))
            .unwrap();

        assert_eq!(rec.action, Action::Upsize);
        assert_eq!(rec.recommended_spec.name, "t3.xlarge");
        assert_eq!(rec.priority, Priority::High);
        assert!(close(
            rec.projected_monthly_saving,
            -(0.1664 - 0.0416) * 720.0
        ));
        assert!(rec.projected_monthly_saving < 0.0);
        assert_eq!(rec.reason, "High utilization: CPU 91.0%, Memory 40.0%");
    }

    #[test]
    fn test_upsize_on_high_memory_only() {
        let engine = default_engine();
        let rec = engine
            .evaluate(&resource("t3.large"), &usage(30.0, 85.0))
            .unwrap();
        assert_eq!(rec.action, Action::Upsize);
    }

    #[test]
    fn test_upsize_overrides_downsize() {
        // A policy where low CPU and high CPU can both hold
        let policy = RightsizingPolicy {
            min_cpu_percent: 50.0,
            max_cpu_percent: 30.0,
            ..Default::default()
        };
        let engine = RecommendationEngine::new(Arc::new(InstanceCatalog::default()), policy);

        let rec = engine
            .evaluate(&resource("t3.xlarge"), &usage(40.0, 10.0))
            .unwrap();

        assert_eq!(rec.action, Action::Upsize);
        assert_eq!(rec.recommended_spec.name, "t3.2xlarge");
        assert_eq!(rec.priority, Priority::High);
        assert!(rec.projected_monthly_saving < 0.0);
    }

    #[test]
    fn test_no_larger_type_yields_none() {
        let engine = default_engine();
        assert!(engine.evaluate(&resource("t3.2xlarge"), &usage(99.0, 99.0)).is_none());
    }

    #[test]
    fn test_overutilized_without_candidate_keeps_downsize() {
        let policy = RightsizingPolicy {
            min_cpu_percent: 50.0,
            max_cpu_percent: 30.0,
            ..Default::default()
        };
        let engine = RecommendationEngine::new(Arc::new(InstanceCatalog::default()), policy);

        // Nothing is larger than t3.2xlarge, so the downsize stands
        let rec = engine
            .evaluate(&resource("t3.2xlarge"), &usage(40.0, 10.0))
            .unwrap();
        assert_eq!(rec.action, Action::Downsize);
    }

    #[test]
    fn test_within_thresholds_yields_none() {
        let engine = default_engine();
        assert!(engine.evaluate(&resource("t3.large"), &usage(50.0, 50.0)).is_none());
    }

    #[test]
    fn test_nearest_fit_variant() {
        let policy = RightsizingPolicy {
            candidate_selection: CandidateSelection::NearestFit,
            ..Default::default()
        };
        let engine = RecommendationEngine::new(Arc::new(InstanceCatalog::default()), policy);

        let rec = engine
            .evaluate(&resource("t3.2xlarge"), &usage(5.0, 2.0))
            .unwrap();
        // t3.xlarge (4 vCPU) is closer to 8 vCPU than any 2 vCPU type
        assert_eq!(rec.recommended_spec.name, "t3.xlarge");

        // Among the 2 vCPU types the cheapest qualifying one wins
        let rec = engine
            .evaluate(&resource("t3.xlarge"), &usage(10.0, 15.0))
            .unwrap();
        assert_eq!(rec.recommended_spec.name, "t3.medium");
    }
}
