use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use scaler_app::{ComponentWrapper, Dimension, ScalableApp};
use scaler_bus::InProcessBus;
use scaler_core::{Binding, ContainerMetric, HttpMetric, ThresholdPolicy};
use scaler_metrics::Aggregator;
use scaler_registry::ScalableAppManager;
use scaler_store::JsonFileStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

async fn app_with_full_buffers(resource_id: &str, buffer_size: usize) -> Arc<ScalableApp> {
    let binding = Binding::new(
        format!("binding-{resource_id}"),
        resource_id,
        "scaler",
        "service",
        0,
    );
    let cpu = ComponentWrapper::new(Dimension::Cpu, 80.0, 20.0, ThresholdPolicy::Mean);
    let ram = ComponentWrapper::new(Dimension::Ram, 1_000_000.0, 100.0, ThresholdPolicy::Mean);
    let request = ComponentWrapper::new(Dimension::Http, 1000.0, 10.0, ThresholdPolicy::Mean);
    let latency = ComponentWrapper::new(Dimension::Latency, 500.0, 1.0, ThresholdPolicy::Mean);

    let app = Arc::new(
        ScalableApp::new(binding, cpu, ram, request, latency, 1, 10, 0.5, 30, 1, 1, buffer_size)
            .expect("valid app"),
    );

    let mut guard = app.acquire().await;
    for i in 0..buffer_size {
        guard.add_container_metric(ContainerMetric {
            timestamp: i as i64,
            app_id: resource_id.to_string(),
            instance_index: 0,
            cpu: 50.0,
            ram: 1024.0,
            description: String::new(),
        });
        guard.add_http_metric(HttpMetric {
            timestamp: i as i64,
            app_id: resource_id.to_string(),
            requests: 10,
            latency: 25.0,
            description: String::new(),
        });
    }
    drop(guard);

    app
}

fn aggregator_tick_benchmark(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let mut group = c.benchmark_group("aggregator_tick");

    for buffer_size in [16usize, 64, 256, 1024].iter() {
        let (manager, aggregator) = rt.block_on(async {
            let store = Arc::new(JsonFileStore::new(dir.path()));
            let bus = InProcessBus::new(16);
            let manager = Arc::new(ScalableAppManager::new(store, bus.clone(), *buffer_size));

            let app = app_with_full_buffers("resource-bench", *buffer_size).await;
            manager.add(app, true).await.unwrap();

            let aggregator = Aggregator::new(manager.clone(), bus, 3600, Duration::from_secs(1));
            (manager, aggregator)
        });

        group.bench_with_input(
            BenchmarkId::new("full_buffer", buffer_size),
            buffer_size,
            |b, &buffer_size| {
                b.iter(|| {
                    rt.block_on(async {
                        for app in manager.get_flat_copy_of_apps().await {
                            let mut guard = app.acquire().await;
                            for i in 0..buffer_size {
                                guard.add_container_metric(ContainerMetric {
                                    timestamp: i as i64,
                                    app_id: "resource-bench".to_string(),
                                    instance_index: 0,
                                    cpu: 50.0,
                                    ram: 1024.0,
                                    description: String::new(),
                                });
                                guard.add_http_metric(HttpMetric {
                                    timestamp: i as i64,
                                    app_id: "resource-bench".to_string(),
                                    requests: 10,
                                    latency: 25.0,
                                    description: String::new(),
                                });
                            }
                            drop(guard);
                        }
                        aggregator.tick().await;
                    })
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, aggregator_tick_benchmark);
criterion_main!(benches);
