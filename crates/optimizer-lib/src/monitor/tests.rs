//! Scheduler tests against in-memory providers
//!
//! Timer tests run on a paused clock, so intervals elapse instantly.

#[cfg(test)]
mod scheduler_tests {
    use crate::error::{ProviderError, ProviderResult};
    use crate::health::{components, ComponentStatus, HealthRegistry};
    use crate::models::{metric_names, Datapoint, MetricWindow, Resource, Statistic};
    use crate::monitor::{
        AlertRule, MonitorConfig, MonitorScheduler, MonitorSchedulerBuilder, MonitorState,
    };
    use crate::provider::{async_trait, CloudProvider, Inventory, InventoryProvider};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, OnceLock};
    use std::time::Duration;
    use tokio::sync::{broadcast, watch, Notify, Semaphore};

    fn resource(id: &str) -> Resource {
        Resource {
            id: id.to_string(),
            name: id.to_string(),
            resource_type: "t3.large".to_string(),
            region: "us-east-1".to_string(),
            provider: String::new(),
            labels: HashMap::new(),
        }
    }

    fn inventory_provider() -> Arc<dyn CloudProvider> {
        Arc::new(InventoryProvider::new(
            Inventory::new("aws")
                .with_resource(resource("i-hot"))
                .with_current("i-hot", metric_names::CPU_UTILIZATION, 85.0)
                .with_resource(resource("i-cool"))
                .with_current("i-cool", metric_names::CPU_UTILIZATION, 79.0),
        ))
    }

    /// Lists resources but fails the metric fetch for ids starting with "bad"
    struct FlakyProvider {
        name: String,
        list_fails: bool,
        ids: Vec<String>,
        state_probe: OnceLock<watch::Receiver<MonitorState>>,
        states_seen: Mutex<Vec<MonitorState>>,
    }

    impl FlakyProvider {
        fn new(name: &str, list_fails: bool, ids: &[&str]) -> Self {
            Self {
                name: name.to_string(),
                list_fails,
                ids: ids.iter().map(|s| s.to_string()).collect(),
                state_probe: OnceLock::new(),
                states_seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CloudProvider for FlakyProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn list_resources(&self) -> ProviderResult<Vec<Resource>> {
            if let Some(rx) = self.state_probe.get() {
                self.states_seen.lock().unwrap().push(*rx.borrow());
            }
            if self.list_fails {
                return Err(ProviderError::Unavailable {
                    provider: self.name.clone(),
                    message: "timeout".to_string(),
                });
            }
            Ok(self.ids.iter().map(|id| resource(id)).collect())
        }

        async fn fetch_metric_series(
            &self,
            _resource_id: &str,
            _metric: &str,
            _window: MetricWindow,
            _granularity: Duration,
            _statistic: Statistic,
        ) -> ProviderResult<Vec<Datapoint>> {
            Ok(vec![])
        }

        async fn current_metrics(&self, resource_id: &str) -> ProviderResult<HashMap<String, f64>> {
            if resource_id.starts_with("bad") {
                return Err(ProviderError::Api {
                    provider: self.name.clone(),
                    code: "Throttling".to_string(),
                    message: "slow down".to_string(),
                });
            }
            Ok(HashMap::from([(metric_names::MEMORY_UTILIZATION.to_string(), 50.0)]))
        }
    }

    /// One resource whose CPU reads `80 + n` on the n-th refresh. Each
    /// refresh signals `parked` and then waits for a permit on `gate`.
    struct GatedProvider {
        refreshes: AtomicUsize,
        parked: Notify,
        gate: Semaphore,
    }

    impl GatedProvider {
        fn new(permits: usize) -> Self {
            Self {
                refreshes: AtomicUsize::new(0),
                parked: Notify::new(),
                gate: Semaphore::new(permits),
            }
        }
    }

    #[async_trait]
    impl CloudProvider for GatedProvider {
        fn name(&self) -> &str {
            "gated"
        }

        async fn list_resources(&self) -> ProviderResult<Vec<Resource>> {
            Ok(vec![resource("i-1")])
        }

        async fn fetch_metric_series(
            &self,
            _resource_id: &str,
            _metric: &str,
            _window: MetricWindow,
            _granularity: Duration,
            _statistic: Statistic,
        ) -> ProviderResult<Vec<Datapoint>> {
            Ok(vec![])
        }

        async fn current_metrics(&self, _resource_id: &str) -> ProviderResult<HashMap<String, f64>> {
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
            self.parked.notify_one();
            self.gate.acquire().await.unwrap().forget();
            Ok(HashMap::from([(
                metric_names::CPU_UTILIZATION.to_string(),
                80.0 + n as f64,
            )]))
        }
    }

    /// Every published CPU reading must already carry the alert it raised
    fn assert_consistent(entry: &crate::monitor::ResourceMetrics) {
        let cpu = entry.metrics[metric_names::CPU_UTILIZATION];
        assert_eq!(entry.alert_history.len(), (cpu - 80.0) as usize);
        assert_eq!(entry.alert_history.back().unwrap().value, cpu);
    }

    fn cpu_rule() -> Vec<AlertRule> {
        vec![AlertRule::above(metric_names::CPU_UTILIZATION, 80.0)]
    }

    #[tokio::test]
    async fn test_cycle_raises_alert_for_high_cpu() {
        let scheduler = MonitorSchedulerBuilder::new()
            .provider(inventory_provider())
            .rules(cpu_rule())
            .build()
            .unwrap();

        let report = scheduler.run_cycle().await;
        assert_eq!(report.providers_polled, 1);
        assert_eq!(report.resources_refreshed, 2);
        assert_eq!(report.alerts_raised, 1);

        let hot = scheduler.get_metrics("i-hot").await.unwrap();
        assert_eq!(hot.provider, "aws");
        assert_eq!(hot.alert_history.len(), 1);
        assert_eq!(hot.alert_history[0].value, 85.0);
        assert_eq!(hot.alert_history[0].threshold, 80.0);

        let cool = scheduler.get_metrics("i-cool").await.unwrap();
        assert!(cool.alert_history.is_empty());
    }

    #[tokio::test]
    async fn test_get_all_metrics_is_stable_between_cycles() {
        let scheduler = MonitorSchedulerBuilder::new()
            .provider(inventory_provider())
            .build()
            .unwrap();
        scheduler.run_cycle().await;

        let first = scheduler.get_all_metrics().await;
        let second = scheduler.get_all_metrics().await;
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let health = HealthRegistry::new();
        let scheduler = MonitorSchedulerBuilder::new()
            .provider(Arc::new(FlakyProvider::new("down", true, &[])))
            .provider(Arc::new(FlakyProvider::new("gcp", false, &["vm-1", "bad-2"])))
            .provider(inventory_provider())
            .rules(cpu_rule())
            .health(health.clone())
            .build()
            .unwrap();

        let report = scheduler.run_cycle().await;
        assert_eq!(report.providers_polled, 3);
        assert_eq!(report.provider_failures, 1);
        assert_eq!(report.refresh_failures, 1);
        assert_eq!(report.resources_refreshed, 3);

        let all = scheduler.get_all_metrics().await;
        assert!(all.contains_key("vm-1"));
        assert!(!all.contains_key("bad-2"));
        assert_eq!(all["vm-1"].provider, "gcp");

        let providers = health.component(components::PROVIDERS).await.unwrap();
        assert_eq!(providers.status, ComponentStatus::Degraded);
        let monitor = health.component(components::MONITOR).await.unwrap();
        assert_eq!(monitor.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_all_providers_down_is_unhealthy() {
        let health = HealthRegistry::new();
        let scheduler = MonitorSchedulerBuilder::new()
            .provider(Arc::new(FlakyProvider::new("a", true, &[])))
            .provider(Arc::new(FlakyProvider::new("b", true, &[])))
            .health(health.clone())
            .build()
            .unwrap();

        let report = scheduler.run_cycle().await;
        assert_eq!(report.provider_failures, 2);
        assert!(scheduler.get_all_metrics().await.is_empty());
        assert_eq!(
            health.component(components::PROVIDERS).await.unwrap().status,
            ComponentStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_history_survives_refresh() {
        let scheduler = MonitorSchedulerBuilder::new()
            .provider(inventory_provider())
            .rules(cpu_rule())
            .build()
            .unwrap();
        scheduler.run_cycle().await;
        let before = scheduler.get_metrics("i-hot").await.unwrap();

        scheduler.run_cycle().await;
        let after = scheduler.get_metrics("i-hot").await.unwrap();
        assert_eq!(after.alert_history.len(), 2);
        assert!(after.last_updated >= before.last_updated);
    }

    #[tokio::test]
    async fn test_history_limit_applies() {
        let scheduler = MonitorSchedulerBuilder::new()
            .provider(inventory_provider())
            .rules(cpu_rule())
            .alert_history_limit(2)
            .build()
            .unwrap();

        for _ in 0..5 {
            scheduler.run_cycle().await;
        }
        let hot = scheduler.get_metrics("i-hot").await.unwrap();
        assert_eq!(hot.alert_history.len(), 2);
    }

    #[tokio::test]
    async fn test_unrecognized_rule_never_fires() {
        let rule: AlertRule = serde_json::from_value(serde_json::json!({
            "metric": "CPUUtilization",
            "threshold": 0.0,
            "condition": "equals"
        }))
        .unwrap();

        let scheduler = MonitorSchedulerBuilder::new()
            .provider(inventory_provider())
            .rules(vec![rule])
            .build()
            .unwrap();

        assert_eq!(scheduler.run_cycle().await.alerts_raised, 0);
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let probe = Arc::new(FlakyProvider::new("probe", false, &["vm-1"]));
        let scheduler = MonitorSchedulerBuilder::new()
            .provider(probe.clone())
            .build()
            .unwrap();
        probe
            .state_probe
            .set(scheduler.subscribe_state())
            .unwrap();

        assert_eq!(scheduler.state(), MonitorState::Idle);
        scheduler.run_cycle().await;
        assert_eq!(scheduler.state(), MonitorState::Idle);
        assert_eq!(*probe.states_seen.lock().unwrap(), vec![MonitorState::Refreshing]);
    }

    #[tokio::test]
    async fn test_readers_see_previous_cycle_while_refresh_is_parked() {
        let provider = Arc::new(GatedProvider::new(0));
        let scheduler = Arc::new(
            MonitorSchedulerBuilder::new()
                .provider(provider.clone())
                .rules(cpu_rule())
                .build()
                .unwrap(),
        );

        let cycle = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run_cycle().await }
        });
        provider.parked.notified().await;
        assert_eq!(scheduler.state(), MonitorState::Refreshing);
        assert!(scheduler.get_metrics("i-1").await.is_none());
        assert!(scheduler.get_all_metrics().await.is_empty());
        provider.gate.add_permits(1);
        cycle.await.unwrap();

        let first = scheduler.get_metrics("i-1").await.unwrap();
        assert_consistent(&first);
        assert_eq!(first.alert_history.len(), 1);

        let cycle = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run_cycle().await }
        });
        provider.parked.notified().await;
        let during = scheduler.get_all_metrics().await;
        assert_eq!(during["i-1"], first);
        provider.gate.add_permits(1);
        cycle.await.unwrap();

        let second = scheduler.get_metrics("i-1").await.unwrap();
        assert_consistent(&second);
        assert_eq!(second.metrics[metric_names::CPU_UTILIZATION], 82.0);
        assert_eq!(second.alert_history.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_readers_never_see_unevaluated_metrics() {
        let provider = Arc::new(GatedProvider::new(Semaphore::MAX_PERMITS));
        let scheduler = Arc::new(
            MonitorSchedulerBuilder::new()
                .provider(provider.clone())
                .rules(cpu_rule())
                .build()
                .unwrap(),
        );
        let done = Arc::new(AtomicBool::new(false));

        let reader = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            let done = Arc::clone(&done);
            async move {
                let mut observed = 0;
                while !done.load(Ordering::SeqCst) {
                    if let Some(entry) = scheduler.get_all_metrics().await.get("i-1") {
                        assert_consistent(entry);
                        observed += 1;
                    }
                    tokio::task::yield_now().await;
                }
                observed
            }
        });

        for _ in 0..50 {
            scheduler.run_cycle().await;
        }
        done.store(true, Ordering::SeqCst);
        reader.await.unwrap();

        let last = scheduler.get_metrics("i-1").await.unwrap();
        assert_consistent(&last);
        assert_eq!(last.alert_history.len(), 50);
    }

    #[test]
    fn test_new_rejects_zero_interval() {
        let config = MonitorConfig {
            interval: Duration::ZERO,
            ..MonitorConfig::default()
        };
        assert!(MonitorScheduler::new(vec![], vec![], config).is_err());
        assert!(MonitorScheduler::new(vec![], vec![], MonitorConfig::default()).is_ok());
    }

    #[test]
    fn test_builder_rejects_zero_interval() {
        let result = MonitorSchedulerBuilder::new()
            .interval(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let scheduler = MonitorSchedulerBuilder::new().build().unwrap();
        assert_eq!(scheduler.rules().len(), 3);
        assert_eq!(scheduler.store().alert_history_limit(), 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_cycle_after_one_interval() {
        let scheduler: Arc<MonitorScheduler> = Arc::new(
            MonitorSchedulerBuilder::new()
                .provider(inventory_provider())
                .interval(Duration::from_secs(60))
                .build()
                .unwrap(),
        );
        let mut state = scheduler.subscribe_state();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let started = tokio::time::Instant::now();
        let handle = tokio::spawn(Arc::clone(&scheduler).run(shutdown_rx));

        state.changed().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(60));

        state.wait_for(|s| *s == MonitorState::Idle).await.unwrap();
        assert_eq!(scheduler.get_all_metrics().await.len(), 2);

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_tick() {
        let scheduler = Arc::new(
            MonitorSchedulerBuilder::new()
                .provider(inventory_provider())
                .build()
                .unwrap(),
        );
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        shutdown_tx.send(()).unwrap();

        Arc::clone(&scheduler).run(shutdown_rx).await;

        assert!(scheduler.get_all_metrics().await.is_empty());
    }
}
