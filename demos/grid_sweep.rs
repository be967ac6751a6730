//! End-to-end grid sweep over a synthetic bilateral corpus.
//!
//! Builds two record collections with known duplicates, sweeps a small
//! parameter grid with the naive reference strategies, and writes the result
//! table to `results.csv` in the working directory.
//!
//! Run with: `cargo run --example grid_sweep`

use erbench::test_support::{
    generate_bilateral, CardinalityFilter, DeduplicateComparisons, ExactIdScoring,
    SortedWindowBlocking, UniqueMappingClustering,
};
use erbench::{
    CsvSink, GridCell, GridSpec, Harness, HarnessConfig, Pipeline, RunOutcome, SweepConfig,
};

fn build_pipeline(cell: &GridCell) -> anyhow::Result<Pipeline> {
    let filter = CardinalityFilter::new(cell.block_filter_threshold)?;
    Ok(Pipeline::new(
        Box::new(SortedWindowBlocking {
            window: cell.window,
        }),
        Box::new(ExactIdScoring),
        Box::new(UniqueMappingClustering),
        cell.clustering_threshold,
    )
    .with_block_refiner(Box::new(filter))
    .with_comparison_refiner(Box::new(DeduplicateComparisons)))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let dataset = generate_bilateral(500, 120, 42);
    let harness = Harness::with_config(
        dataset.d1.clone(),
        Some(dataset.d2.clone()),
        dataset.oracle()?,
        HarnessConfig::verbose(),
    )?;
    println!(
        "corpus: {} + {} records, {} known duplicates",
        dataset.d1.len(),
        dataset.d2.len(),
        harness.total_duplicates()
    );

    let spec = GridSpec {
        windows: vec![2, 4, 8],
        block_filter_thresholds: vec![0.5, 1.0],
        representations: vec!["token-trigrams".to_string()],
        similarity_metrics: vec!["cosine".to_string()],
        match_thresholds: vec![0.5],
        clustering_thresholds: vec![0.3, 0.7],
    };
    println!("sweeping {} configurations", spec.len());

    let mut sink = CsvSink::create("results.csv")?;
    let rows = harness.grid_search(spec, build_pipeline, SweepConfig::parallel(4), &mut sink)?;

    for row in &rows {
        match &row.outcome {
            RunOutcome::Metrics(metrics) => println!(
                "cell {:>2}: window={} filter={} cluster={} -> P={:.3} R={:.3} F1={:.3} ({} ms)",
                row.cell.index,
                row.cell.window,
                row.cell.block_filter_threshold,
                row.cell.clustering_threshold,
                metrics.precision,
                metrics.recall,
                metrics.f_measure,
                row.elapsed.as_millis(),
            ),
            RunOutcome::Failed { stage, message } => println!(
                "cell {:>2}: failed in {stage}: {message}",
                row.cell.index
            ),
        }
    }

    let best = rows
        .iter()
        .filter_map(|row| row.metrics().map(|m| (row, m)))
        .max_by(|(_, a), (_, b)| a.f_measure.total_cmp(&b.f_measure));
    if let Some((row, metrics)) = best {
        println!(
            "best configuration: cell {} with F1={:.3}",
            row.cell.index, metrics.f_measure
        );
    }
    println!("table written to results.csv");

    Ok(())
}
