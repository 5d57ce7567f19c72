//! Per-station bucket averaging

use crate::window::Window;
use std::collections::HashMap;
use storage::Feed;
use tracing::trace;

/// Running sums for one (station, tick) bucket
struct Bucket<'a> {
    /// First feed seen for this bucket; supplies id and station
    first: &'a Feed,
    tick: i64,
    humidity_sum: f64,
    temperature_sum: f64,
    count: usize,
}

impl<'a> Bucket<'a> {
    fn new(first: &'a Feed, tick: i64) -> Self {
        Self {
            first,
            tick,
            humidity_sum: 0.0,
            temperature_sum: 0.0,
            count: 0,
        }
    }

    fn add(&mut self, feed: &Feed) {
        self.humidity_sum += feed.humidity;
        self.temperature_sum += feed.temperature;
        self.count += 1;
    }

    fn finish(self) -> Feed {
        let n = self.count as f64;
        Feed {
            id: self.first.id,
            station_id: self.first.station_id.clone(),
            tstamp: self.tick,
            humidity: self.humidity_sum / n,
            temperature: self.temperature_sum / n,
        }
    }
}

/// Average `feeds` into one feed per station per window.
///
/// Each feed lands in the bucket `(station_id, window.tick(tstamp))`.
/// Buckets are emitted in the order their first member appears in `feeds`,
/// so callers pass feeds sorted by timestamp to get a chronological result.
/// The emitted feed carries the first member's id and station, the bucket
/// tick as `tstamp`, and the mean humidity and temperature of all members.
pub fn decimate(feeds: &[Feed], window: Window) -> Vec<Feed> {
    let mut buckets: Vec<Bucket<'_>> = Vec::new();
    let mut index: HashMap<(&str, i64), usize> = HashMap::new();

    for feed in feeds {
        let tick = window.tick(feed.tstamp);
        let slot = *index
            .entry((feed.station_id.as_str(), tick))
            .or_insert_with(|| {
                buckets.push(Bucket::new(feed, tick));
                buckets.len() - 1
            });
        buckets[slot].add(feed);
    }

    trace!(
        "Decimated {} feeds into {} buckets of {} ms",
        feeds.len(),
        buckets.len(),
        window.millis()
    );

    buckets.into_iter().map(Bucket::finish).collect()
}
