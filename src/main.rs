use anyhow::{Context, Result};

use largest_banks::{init_tracing, Pipeline, PipelineConfig};

fn main() -> Result<()> {
    init_tracing();

    println!("🏦 Largest Banks ETL v{}", largest_banks::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = PipelineConfig::default();
    let pipeline = Pipeline::new(config);

    println!("\n🌐 Source: {}", pipeline.config().source_url);

    let summary = pipeline.run().context("ETL run failed")?;

    println!("✓ Extracted {} banks ({} rows skipped)", summary.banks_extracted, summary.rows_skipped);
    println!("\n📋 Extracted data:");
    print!("{}", summary.extracted_table);

    println!("\n🔁 Transformed data:");
    print!("{}", summary.transformed_table);

    println!("✓ CSV written to {}", pipeline.config().csv_path.display());
    println!(
        "✓ {} rows loaded into {} ({})",
        summary.rows_written,
        pipeline.config().table_name,
        pipeline.config().db_path.display()
    );

    // Query results
    for (query, result) in &summary.queries {
        println!("\n🔎 {}", query.name());
        println!("{}", query.sql(&pipeline.config().table_name));
        print!("{}", result);
    }

    // Log verification
    println!("\n📝 Log file contents ({}):", pipeline.logger().path().display());
    print!("{}", pipeline.logger().read_all()?);

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ ETL run complete");

    Ok(())
}
