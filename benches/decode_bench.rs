use criterion::{black_box, criterion_group, criterion_main, Criterion};
use termsheet_analyzer::analysis::{safe_parse_json, strip_code_fence};
use termsheet_analyzer::llm::sse::SseDecoder;
use termsheet_analyzer::{Clause, PayoffDetails};

fn clause_array(count: usize) -> String {
    let clauses: Vec<String> = (0..count)
        .map(|i| {
            format!(
                r#"{{"name":"Clause {}","summary":"Investors hold {} of the board seats and protective provisions apply."}}"#,
                i, i
            )
        })
        .collect();
    format!("```json\n[{}]\n```", clauses.join(","))
}

fn bench_decode(c: &mut Criterion) {
    let fenced = clause_array(25);

    c.bench_function("strip_code_fence", |b| {
        b.iter(|| black_box(strip_code_fence(black_box(&fenced))))
    });

    c.bench_function("decode_clause_array", |b| {
        b.iter(|| black_box(safe_parse_json::<Vec<Clause>>(black_box(&fenced), Vec::new())))
    });

    let payoff = r#"{"securityType":"Series A Preferred","preMoneyValuation":20000000,"postMoneyValuation":25000000,"investmentAmountCurrentRound":5000000,"liquidationPreferenceMultiple":1,"isParticipatingPreferred":false,"dividendRatePercent":8,"isDividendCumulative":false,"antiDilutionType":"Broad-Based Weighted Average","optionPoolPercent":10,"optionPoolTiming":"pre-money"}"#;

    c.bench_function("decode_payoff_details", |b| {
        b.iter(|| black_box(safe_parse_json(black_box(payoff), PayoffDetails::EMPTY)))
    });

    c.bench_function("decode_malformed_to_default", |b| {
        b.iter(|| {
            black_box(safe_parse_json::<Vec<Clause>>(
                black_box("I'm sorry, I could not find any clauses."),
                Vec::new(),
            ))
        })
    });
}

fn bench_sse(c: &mut Criterion) {
    let mut body = String::new();
    for i in 0..200 {
        body.push_str(&format!(
            "data: {{\"candidates\":[{{\"content\":{{\"parts\":[{{\"text\":\"fragment {} \"}}],\"role\":\"model\"}}}}]}}\r\n\r\n",
            i
        ));
    }
    let bytes = body.into_bytes();

    c.bench_function("sse_decode_200_events_whole", |b| {
        b.iter(|| {
            let mut decoder = SseDecoder::new();
            let mut chunks = decoder.push(black_box(&bytes));
            chunks.extend(decoder.finish());
            black_box(chunks)
        })
    });

    // Network reads rarely line up with event boundaries
    c.bench_function("sse_decode_200_events_split", |b| {
        b.iter(|| {
            let mut decoder = SseDecoder::new();
            let mut count = 0;
            for piece in bytes.chunks(37) {
                count += decoder.push(black_box(piece)).len();
            }
            count += decoder.finish().len();
            black_box(count)
        })
    });
}

criterion_group!(benches, bench_decode, bench_sse);
criterion_main!(benches);
