//! Timestamp safety (`spec.md` §4.5, stage 2) and the aggregator-level
//! KeyMoment URL injection that complements it (`spec.md` §4.9).

use crate::chunks::KeyMoment;
use crate::safety::SafetyTables;

const MILLISECOND_GUESS_THRESHOLD: f64 = 10_000.0;
const MIN_DURATION_SECS: f64 = 30.0;
const BUCKET_SECS: f64 = 30.0;

/// Applies the full stage-2 timestamp-safety pipeline, in the order fixed by
/// `spec.md` §4.5:
///
/// 1. Integer-looking fields above 10 000 are assumed to be milliseconds.
/// 2. Moments starting past the safety cutoff are dropped.
/// 3. Short moments are extended to the minimum duration, clamped to the
///    video's length.
/// 4. Moments matching a blacklisted vocabulary term are dropped.
/// 5. Survivors are sorted and deduplicated into 30-second buckets.
/// 6. If fewer than the configured minimum remain, the seed list tops up.
/// 7. The result is capped at the configured maximum.
pub fn apply_timestamp_safety(
    moments: Vec<KeyMoment>,
    video_duration_secs: f64,
    cutoff_secs: f64,
    min_moments: usize,
    max_moments: usize,
    tables: &SafetyTables,
) -> Vec<KeyMoment> {
    let mut moments: Vec<KeyMoment> = moments
        .into_iter()
        .map(|m| guess_milliseconds(m))
        .filter(|m| m.start_offset <= cutoff_secs)
        .map(|m| extend_short_duration(m, video_duration_secs))
        .filter(|m| !tables.is_blacklisted(&m.name))
        .collect();

    moments.sort_by(|a, b| a.start_offset.partial_cmp(&b.start_offset).unwrap());
    let mut moments = dedupe_by_bucket(moments);

    if moments.len() < min_moments {
        top_up_from_seed(&mut moments, tables, video_duration_secs, min_moments);
    }

    moments.truncate(max_moments);
    moments
}

fn guess_milliseconds(mut m: KeyMoment) -> KeyMoment {
    if m.start_offset > MILLISECOND_GUESS_THRESHOLD {
        m.start_offset /= 1000.0;
    }
    if m.end_offset > MILLISECOND_GUESS_THRESHOLD {
        m.end_offset /= 1000.0;
    }
    m
}

fn extend_short_duration(mut m: KeyMoment, video_duration_secs: f64) -> KeyMoment {
    if m.duration() < MIN_DURATION_SECS {
        m.end_offset = (m.start_offset + MIN_DURATION_SECS).min(video_duration_secs);
    }
    m
}

fn bucket_of(offset: f64) -> u64 {
    (offset / BUCKET_SECS).floor() as u64
}

fn dedupe_by_bucket(moments: Vec<KeyMoment>) -> Vec<KeyMoment> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(moments.len());
    for m in moments {
        let bucket = bucket_of(m.start_offset);
        if seen.insert(bucket) {
            out.push(m);
        }
    }
    out
}

fn top_up_from_seed(
    moments: &mut Vec<KeyMoment>,
    tables: &SafetyTables,
    video_duration_secs: f64,
    min_moments: usize,
) {
    let mut occupied: std::collections::HashSet<u64> =
        moments.iter().map(|m| bucket_of(m.start_offset)).collect();

    for seed in &tables.key_moment_seed {
        if moments.len() >= min_moments {
            break;
        }
        let bucket = bucket_of(seed.start_offset);
        if occupied.contains(&bucket) {
            continue;
        }
        if seed.end_offset > video_duration_secs {
            continue;
        }
        occupied.insert(bucket);
        moments.push(KeyMoment {
            name: seed.name.clone(),
            start_offset: seed.start_offset,
            end_offset: seed.end_offset,
            url: None,
        });
    }
    moments.sort_by(|a, b| a.start_offset.partial_cmp(&b.start_offset).unwrap());
}

/// Aggregator-level injection: `url = "/videos/<code>?t=<startOffset>"`.
pub fn inject_urls(moments: Vec<KeyMoment>, code: &str) -> Vec<KeyMoment> {
    moments
        .into_iter()
        .map(|mut m| {
            m.url = Some(format!("/videos/{code}?t={}", m.start_offset as i64));
            m
        })
        .collect()
}
