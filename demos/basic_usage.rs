//! Basic usage example for Spotlight Metrics
//!
//! Builds a tenant from a content document, backs it with the in-memory
//! mock data source, and fetches the metrics of one collection.

use spotlight_metrics::{
    raw_row, AnyMetric, CollectionTypeId, MetricTypeId, MockDataSourceBuilder, Tenant, TenantId,
};
use std::sync::Arc;
use std::time::Duration;

const CONTENT: &str = r#"{
    "name": "North Dakota",
    "description": "Public corrections data for North Dakota",
    "collections": {
        "Prison": {
            "name": "Prison",
            "description": "People in state prison",
            "metrics": ["PrisonPopulationCurrent", "PrisonPopulationHistorical", "PrisonStayLengthAggregate"]
        }
    },
    "metrics": {
        "PrisonPopulationCurrent": {
            "name": "Prison Population",
            "description": "People incarcerated today, by facility",
            "methodology": "Daily snapshot of facility rosters",
            "mapCaption": "Facility"
        },
        "PrisonPopulationHistorical": {
            "name": "Prison Population Over Time",
            "description": "Monthly incarcerated population",
            "methodology": "First-of-month counts"
        },
        "PrisonStayLengthAggregate": {
            "name": "Length of Stay",
            "description": "Time served by people released in the last three years",
            "methodology": "36-month window"
        }
    }
}"#;

fn describe(metric: AnyMetric<'_>) {
    match metric.error() {
        Some(error) => println!("   ❌ {}: {}", metric.name(), error),
        None => match metric.record_count() {
            Some(count) => println!("   ✅ {}: {} records", metric.name(), count),
            None => println!("   ⚠️  {}: no data published yet", metric.name()),
        },
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Spotlight Metrics - Basic Usage Example");
    println!("==========================================");

    // Fixture rows standing in for the metrics API
    let source = MockDataSourceBuilder::new()
        .source_name("basic-usage-example")
        .latency(Duration::from_millis(5))
        .file(
            TenantId::UsNd,
            "incarceration_population_by_facility_by_demographics",
            vec![
                raw_row([("facility", "NDSP"), ("total_population", "840")]),
                raw_row([("facility", "JRCC"), ("total_population", "410")]),
                raw_row([
                    ("facility", "NDSP"),
                    ("gender", "FEMALE"),
                    ("total_population", "12"),
                ]),
            ],
        )
        .file(
            TenantId::UsNd,
            "incarceration_lengths_by_demographics",
            vec![raw_row([
                ("metric_period_months", "36"),
                ("years_0_1", "310"),
                ("years_1_2", "120"),
                ("years_2_3", "64"),
                ("years_3_5", "40"),
                ("years_5_10", "18"),
                ("years_10_20", "4"),
                ("years_20_plus", "1"),
            ])],
        )
        .build()
        .await?;
    let source = Arc::new(source);

    println!("✅ Created mock data source");

    let tenant = Tenant::from_json(TenantId::UsNd, CONTENT, source.clone())?;
    println!(
        "🏛️  Tenant {} ({}) with {} metrics",
        tenant.name,
        tenant.id,
        tenant.metrics.len()
    );

    // Fetch everything in the Prison collection
    println!("\n📥 Fetching Prison collection...");
    let prison = tenant.collection_metrics(CollectionTypeId::Prison);
    for metric in &prison {
        if let Err(error) = metric.fetch().await {
            println!("   fetch failed: {error}");
        }
    }
    for metric in prison {
        describe(metric);
    }

    // Typed access through the mapping
    println!("\n📊 Current prison population:");
    let current = tenant.metrics.prison_population_current.as_ref();
    if let Some(records) = current.and_then(|metric| metric.records()) {
        for record in records.iter().filter(|r| r.demographics.is_total()) {
            println!("   {:<6} {:>5}", record.locality, record.population);
        }
    }

    println!("\n⏱️  Length of stay:");
    let stay_lengths = tenant.metrics.prison_stay_length_aggregate.as_ref();
    if let Some(records) = stay_lengths.and_then(|metric| metric.records()) {
        for record in records.iter() {
            println!("   {:<6} {:>5}", record.category, record.count);
        }
    }

    // Metrics that were never enabled are simply absent
    println!(
        "\n🔎 Parole population enabled: {}",
        tenant.metrics.contains(MetricTypeId::ParolePopulationCurrent)
    );

    println!("\n📨 Requests sent to the data source: {}", source.request_count().await);
    for request in source.requests().await {
        println!("   {} -> {:?}", request.tenant_id, request.metric_names);
    }

    println!("\n🎉 Example completed successfully!");
    Ok(())
}
