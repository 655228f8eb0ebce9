//! Benchmarks for docanchor analysis and parsing performance.
//!
//! Run with: cargo bench
//!
//! These benchmarks use synthetic contracts and model responses.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use docanchor::{ExtractedDocument, LlmParsingRequest, ResponseParser, StructureAnalyzer};

/// Creates a synthetic contract with the given number of numbered sections.
fn create_test_document(section_count: usize) -> ExtractedDocument {
    let mut text = String::new();
    for i in 0..section_count {
        text.push_str(&format!("{}. SECTION NUMBER {}\n", i + 1, i + 1));
        text.push_str(&format!(
            "{}.1 Definitions for part {}\nThe parties agree that the terms in this part apply to every obligation listed below.\n\n",
            i + 1,
            i + 1
        ));
        text.push_str("- first obligation\n- second obligation\n\n");
    }
    ExtractedDocument::from_plain_text("bench.txt", &text)
}

/// Creates a translation response referencing `section_count` anchors.
fn create_test_response(section_count: usize) -> String {
    let sections: Vec<_> = (0..section_count)
        .map(|i| json!({"anchor": format!("section_{}_part", i + 1), "simplified_text": "Plain words."}))
        .collect();
    format!(
        "```json\n{}\n```",
        json!({
            "section_translations": sections,
            "document_summary": "Benchmark",
            "confidence": 0.9
        })
    )
}

/// Benchmark structure analysis at various sizes.
fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");
    let analyzer = StructureAnalyzer::default();

    for section_count in [10, 100, 500].iter() {
        let doc = create_test_document(*section_count);

        group.bench_function(format!("{}_sections", section_count), |b| {
            b.iter(|| analyzer.analyze(black_box(&doc)));
        });
    }

    group.finish();
}

/// Benchmark batch analysis.
fn bench_batch(c: &mut Criterion) {
    let docs: Vec<_> = (0..16).map(|_| create_test_document(50)).collect();
    let analyzer = StructureAnalyzer::default();

    c.bench_function("batch_16_documents", |b| {
        b.iter(|| analyzer.analyze_batch(black_box(&docs)));
    });
}

/// Benchmark response parsing, clean and truncated.
fn bench_parsing(c: &mut Criterion) {
    let parser = ResponseParser::default();
    let response = create_test_response(50);
    let anchors: Vec<String> = (0..50).map(|i| format!("section_{}_part", i + 1)).collect();
    let truncated = response.trim_end_matches("\n```").trim_end_matches('}').to_string();

    c.bench_function("parse_translation_response", |b| {
        let request = LlmParsingRequest::new(response.clone())
            .with_schema("translation_response")
            .with_original_anchors(anchors.clone());
        b.iter(|| parser.parse(black_box(&request)));
    });

    c.bench_function("parse_truncated_response", |b| {
        let request = LlmParsingRequest::new(truncated.clone());
        b.iter(|| parser.parse(black_box(&request)));
    });
}

criterion_group!(benches, bench_analysis, bench_batch, bench_parsing);
criterion_main!(benches);
