//! In-memory transport mocks shared by the orchestrator tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use harufilm_protocol::CompleteUploadRequest;

use crate::transport::{ControlPlane, ObjectStorage, RequestError, RequestFuture, StoragePut};

pub(crate) const THUMBNAIL_URL: &str = "https://storage.test/thumbnail";

/// Every control-plane call, in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Initiate { logical_date: String },
    PartUrl { transfer_id: String, part_number: u32 },
    Complete,
    InitiateThumbnail,
    CompleteThumbnail,
}

pub(crate) struct MockControlPlane {
    transfer_id: String,
    calls: Mutex<Vec<Call>>,
    commits: Mutex<Vec<CompleteUploadRequest>>,
    initiated: AtomicU32,
    part_url_failures: AtomicU32,
    fail_commit: Mutex<bool>,
    fail_initiate_thumbnail: AtomicBool,
    fail_complete_thumbnail: AtomicBool,
    before_commit: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl MockControlPlane {
    /// Initiate returns `transfer_id` (suffixed with a counter after the first).
    pub(crate) fn new(transfer_id: &str) -> Self {
        Self {
            transfer_id: transfer_id.to_string(),
            calls: Mutex::new(Vec::new()),
            commits: Mutex::new(Vec::new()),
            initiated: AtomicU32::new(0),
            part_url_failures: AtomicU32::new(0),
            fail_commit: Mutex::new(false),
            fail_initiate_thumbnail: AtomicBool::new(false),
            fail_complete_thumbnail: AtomicBool::new(false),
            before_commit: Mutex::new(None),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn initiate_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Initiate { .. }))
            .count()
    }

    pub(crate) fn part_url_requests(&self, part: u32) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::PartUrl { part_number, .. } if *part_number == part))
            .count()
    }

    pub(crate) fn commits(&self) -> Vec<CompleteUploadRequest> {
        self.commits.lock().unwrap().clone()
    }

    /// The next `times` part URL requests fail.
    pub(crate) fn fail_part_urls(&self, times: u32) {
        self.part_url_failures.store(times, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_commit(&self, fail: bool) {
        *self.fail_commit.lock().unwrap() = fail;
    }

    pub(crate) fn set_fail_initiate_thumbnail(&self, fail: bool) {
        self.fail_initiate_thumbnail.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_complete_thumbnail(&self, fail: bool) {
        self.fail_complete_thumbnail.store(fail, Ordering::SeqCst);
    }

    /// Position of the first call equal to `call`.
    pub(crate) fn position(&self, call: &Call) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }

    pub(crate) fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// Runs `hook` once when the thumbnail is confirmed, just before commit.
    pub(crate) fn before_commit(&self, hook: impl FnOnce() + Send + 'static) {
        *self.before_commit.lock().unwrap() = Some(Box::new(hook));
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ControlPlane for MockControlPlane {
    fn initiate_upload<'a>(&'a self, logical_date: &'a str) -> RequestFuture<'a, String> {
        self.record(Call::Initiate {
            logical_date: logical_date.to_string(),
        });
        let n = self.initiated.fetch_add(1, Ordering::SeqCst);
        let id = if n == 0 {
            self.transfer_id.clone()
        } else {
            format!("{}-{}", self.transfer_id, n + 1)
        };
        Box::pin(async move { Ok(id) })
    }

    fn part_upload_url<'a>(
        &'a self,
        transfer_id: &'a str,
        _logical_date: &'a str,
        part_number: u32,
    ) -> RequestFuture<'a, String> {
        self.record(Call::PartUrl {
            transfer_id: transfer_id.to_string(),
            part_number,
        });
        let fail = self
            .part_url_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        Box::pin(async move {
            if fail {
                Err(RequestError::Network("connection reset".into()))
            } else {
                Ok(format!("https://storage.test/{transfer_id}/parts/{part_number}"))
            }
        })
    }

    fn complete_upload<'a>(&'a self, request: &'a CompleteUploadRequest) -> RequestFuture<'a, ()> {
        self.record(Call::Complete);
        let fail = *self.fail_commit.lock().unwrap();
        if !fail {
            self.commits.lock().unwrap().push(request.clone());
        }
        Box::pin(async move {
            if fail {
                Err(RequestError::Status {
                    status: 500,
                    message: "commit rejected".into(),
                })
            } else {
                Ok(())
            }
        })
    }

    fn initiate_thumbnail<'a>(&'a self, _logical_date: &'a str) -> RequestFuture<'a, String> {
        self.record(Call::InitiateThumbnail);
        let fail = self.fail_initiate_thumbnail.load(Ordering::SeqCst);
        Box::pin(async move {
            if fail {
                Err(RequestError::Status {
                    status: 503,
                    message: "thumbnail slot unavailable".into(),
                })
            } else {
                Ok(THUMBNAIL_URL.to_string())
            }
        })
    }

    fn complete_thumbnail<'a>(&'a self, _logical_date: &'a str) -> RequestFuture<'a, ()> {
        self.record(Call::CompleteThumbnail);
        if self.fail_complete_thumbnail.load(Ordering::SeqCst) {
            return Box::pin(async { Err(RequestError::Network("connection reset".into())) });
        }
        if let Some(hook) = self.before_commit.lock().unwrap().take() {
            hook();
        }
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    Status,
    NoEntityTag,
}

/// Object storage that answers `"etag-<n>"` for part `n`.
pub(crate) struct MockStorage {
    faults: Mutex<HashMap<u32, (Fault, u32)>>,
    delays: Mutex<HashMap<u32, Duration>>,
    default_delay: Mutex<Duration>,
    thumbnail_status: AtomicU16,
    puts: Mutex<Vec<(Option<u32>, usize)>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockStorage {
    pub(crate) fn new() -> Self {
        Self {
            faults: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            default_delay: Mutex::new(Duration::ZERO),
            thumbnail_status: AtomicU16::new(200),
            puts: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Part `n` answers HTTP 500 for its next `times` puts.
    pub(crate) fn fail_part(&self, n: u32, times: u32) {
        self.faults.lock().unwrap().insert(n, (Fault::Status, times));
    }

    /// Part `n` answers 200 without an ETag for its next `times` puts.
    pub(crate) fn omit_entity_tag(&self, n: u32, times: u32) {
        self.faults
            .lock()
            .unwrap()
            .insert(n, (Fault::NoEntityTag, times));
    }

    /// Clears every injected fault.
    pub(crate) fn heal(&self) {
        self.faults.lock().unwrap().clear();
    }

    pub(crate) fn delay_part(&self, n: u32, delay: Duration) {
        self.delays.lock().unwrap().insert(n, delay);
    }

    pub(crate) fn delay_all(&self, delay: Duration) {
        *self.default_delay.lock().unwrap() = delay;
    }

    pub(crate) fn set_thumbnail_status(&self, status: u16) {
        self.thumbnail_status.store(status, Ordering::SeqCst);
    }

    /// Part numbers of every attempted part put, in completion order.
    pub(crate) fn part_puts(&self) -> Vec<u32> {
        self.puts.lock().unwrap().iter().filter_map(|p| p.0).collect()
    }

    /// Body sizes of every part put, in completion order.
    pub(crate) fn part_sizes(&self) -> Vec<usize> {
        self.puts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.0.is_some())
            .map(|p| p.1)
            .collect()
    }

    pub(crate) fn thumbnail_puts(&self) -> usize {
        self.puts.lock().unwrap().iter().filter(|p| p.0.is_none()).count()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn take_fault(&self, n: u32) -> Option<Fault> {
        let mut faults = self.faults.lock().unwrap();
        let (fault, remaining) = faults.get_mut(&n)?;
        if *remaining == 0 {
            return None;
        }
        if *remaining != u32::MAX {
            *remaining -= 1;
        }
        Some(*fault)
    }
}

fn part_from_url(url: &str) -> Option<u32> {
    if url == THUMBNAIL_URL {
        return None;
    }
    url.rsplit('/').next().and_then(|s| s.parse().ok())
}

impl ObjectStorage for MockStorage {
    fn put<'a>(&'a self, url: &'a str, body: Bytes) -> RequestFuture<'a, StoragePut> {
        Box::pin(async move {
            let part = part_from_url(url);
            let delay = match part {
                Some(n) => self.delays.lock().unwrap().get(&n).copied(),
                None => None,
            }
            .unwrap_or_else(|| *self.default_delay.lock().unwrap());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.puts.lock().unwrap().push((part, body.len()));

            let Some(n) = part else {
                return Ok(StoragePut {
                    status: self.thumbnail_status.load(Ordering::SeqCst),
                    entity_tag: None,
                });
            };
            Ok(match self.take_fault(n) {
                Some(Fault::Status) => StoragePut {
                    status: 500,
                    entity_tag: None,
                },
                Some(Fault::NoEntityTag) => StoragePut {
                    status: 200,
                    entity_tag: None,
                },
                None => StoragePut {
                    status: 200,
                    entity_tag: Some(format!("\"etag-{n}\"")),
                },
            })
        })
    }
}
