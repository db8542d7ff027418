use blog_api::blog::comment::{AuthorRef, CommentRecord, tree::build_comment_tree};
use chrono::{Duration, NaiveDateTime};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("blog_comments");
    for p in [(10, 0.5), (100, 0.7), (1000, 0.8), (10000, 0.9), (100000, 0.9)].iter() {
        let comments = generate_comments(p.0, p.1);
        group.bench_function(BenchmarkId::new("build_comment_tree", p.0), |b| {
            b.iter(|| build_comment_tree(comments.clone()))
        });
    }

    // every comment replies to the previous one
    let chain = generate_chain(10000);
    group.bench_function(BenchmarkId::new("build_comment_tree_chain", 10000), |b| {
        b.iter(|| build_comment_tree(chain.clone()))
    });

    group.finish();
}

fn record(id: i32, parent_id: Option<i32>, created_at: NaiveDateTime) -> CommentRecord {
    CommentRecord {
        id,
        post_id: 1,
        parent_id,
        content: "content".to_string(),
        created_at,
        updated_at: created_at,
        is_deleted: false,
        deleted_at: None,
        likes_count: 0,
        viewer_has_liked: false,
        is_comment_owner: false,
        author: AuthorRef {
            id: 1,
            username: "author".to_string(),
            avatar_url: None,
        },
    }
}

/// `reply_ratio` of the comments reply to an older comment, newest first like
/// the database returns them
fn generate_comments(n: usize, reply_ratio: f64) -> Vec<CommentRecord> {
    let mut rng = StdRng::seed_from_u64(7);
    let start = chrono::Utc::now().naive_utc();

    let mut comments = Vec::with_capacity(n);
    for i in 0..n as i32 {
        let parent_id = (i > 0 && rng.gen_bool(reply_ratio)).then(|| rng.gen_range(0..i));
        comments.push(record(i, parent_id, start + Duration::seconds(i as i64)));
    }
    comments.reverse();
    comments
}

fn generate_chain(n: usize) -> Vec<CommentRecord> {
    let start = chrono::Utc::now().naive_utc();
    let mut comments = (0..n as i32)
        .map(|i| record(i, (i > 0).then(|| i - 1), start + Duration::seconds(i as i64)))
        .collect::<Vec<_>>();
    comments.reverse();
    comments
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
