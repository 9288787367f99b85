use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

use browsecol::collection::{Collection, NoteTypeKind, RevlogEntry};
use browsecol::columns::builtin_contributors;
use browsecol::config::EffectiveConfig;
use browsecol::sort::{SearchScope, SortDirection};
use browsecol::BrowserSession;

// Collection with `n` cards, random numeric-ish front fields and a few reviews each.
fn seeded_collection(n: usize, seed: u64) -> Collection {
    let mut rng = StdRng::seed_from_u64(seed);
    let col = Collection::open_in_memory().expect("in-memory collection");
    let deck = col.add_deck("Bench", false).expect("deck");
    let mid = col.add_notetype("Basic", NoteTypeKind::Standard, &["Front", "Back"], &["Card 1"]).expect("notetype");
    let mut review_id = 1_000_000i64;
    col.transact(|c| {
        for _ in 0..n {
            let front = if rng.gen_bool(0.1) { String::new() } else { rng.gen_range(0..100_000u32).to_string() };
            let nid = c.add_note(mid, &[front.as_str(), "back"], &["bench"])?;
            let cid = c.add_card(nid, deck, 0)?;
            for _ in 0..rng.gen_range(0..4) {
                review_id += rng.gen_range(1..10_000);
                c.add_review(&RevlogEntry::new(review_id, cid, rng.gen_range(1..=4), 1, rng.gen_range(500..20_000)))?;
            }
        }
        Ok(())
    })
    .expect("seed");
    col
}

fn bench_sort_plans(c: &mut Criterion) {
    let ns = [1_000usize, 10_000usize];
    let mut group = c.benchmark_group("sorted_search");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(20);

    for &n in &ns {
        let col = seeded_collection(n, 0xBEEF_CAFE);
        let contributors = builtin_contributors();
        group.throughput(Throughput::Elements(n as u64));

        // (column, plan kind): inline field CASE, keyed side-table, per-row side-table
        for (column, kind) in [("_field_Front", "inline"), ("deck", "keyed"), ("cfirst", "per_row"), ("cAgainCount", "per_row")] {
            let mut session = BrowserSession::open(&col, EffectiveConfig::default(), &contributors);
            session.set_sort(Some(column), SortDirection::Descending);
            group.bench_with_input(BenchmarkId::new(format!("{}_{}", kind, column), n), &n, |b, _| {
                b.iter(|| {
                    let ids = session.search(&SearchScope::All).expect("search");
                    criterion::black_box(ids);
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_sort_plans);
criterion_main!(benches);
